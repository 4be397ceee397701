/// DataTable chunk server
///
/// Standalone server that hands out a dataset in offset/limit chunks to
/// remote tables.

use datatable::server::{load_dataset, run_server};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    // Get host, port and dataset from environment or use defaults
    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("PORT must be a number: {}", e)))?;

    let records = match std::env::var("DATA_FILE") {
        Ok(path) => load_dataset(&path)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?,
        Err(_) => {
            log::warn!("DATA_FILE not set; serving an empty dataset");
            Vec::new()
        }
    };

    run_server(&host, port, records).await
}
