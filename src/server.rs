/// HTTP server that serves a dataset in chunks to remote tables
use actix_web::{middleware, web, App, HttpResponse, HttpServer};
use log::info;
use std::path::Path;

use crate::error::{Error, Result};
use crate::ingest::{ingest_csv, ingest_json};
use crate::messages::{ChunkQuery, ErrorBody};
use crate::record::Record;

/// Shared, read-only dataset.
pub struct AppState {
    records: Vec<Record>,
}

impl AppState {
    pub fn new(records: Vec<Record>) -> Self {
        AppState { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn chunk(&self, query: &ChunkQuery) -> HttpResponse {
        if query.limit == Some(0) {
            return HttpResponse::BadRequest().json(ErrorBody {
                error: "limit must be positive".to_string(),
            });
        }
        HttpResponse::Ok().json(query.slice(&self.records))
    }
}

/// Load a dataset file: `.csv` with a header row, anything else as JSON.
pub fn load_dataset(path: impl AsRef<Path>) -> Result<Vec<Record>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::InvalidConfig(format!("cannot read {}: {}", path.display(), e)))?;
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => ingest_csv(&text, true, false),
        _ => ingest_json(&text),
    }
}

/// Chunk endpoint, query-string flavour
async fn data_query(query: web::Query<ChunkQuery>, state: web::Data<AppState>) -> HttpResponse {
    state.chunk(&query)
}

/// Chunk endpoint, form-body flavour
async fn data_form(form: web::Form<ChunkQuery>, state: web::Data<AppState>) -> HttpResponse {
    state.chunk(&form)
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "records": state.len()
    }))
}

/// Routes, shared by the server and its tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/data", web::get().to(data_query))
        .route("/data", web::post().to(data_form))
        .route("/health", web::get().to(health_check));
}

/// Start the HTTP server.
pub async fn run_server(host: &str, port: u16, records: Vec<Record>) -> std::io::Result<()> {
    let state = web::Data::new(AppState::new(records));

    info!("serving {} records", state.len());
    info!("data: http://{}:{}/data?offset=0&limit=180", host, port);
    info!("health check: http://{}:{}/health", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            // CORS for browser clients on other origins
            .wrap(
                actix_cors::Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .configure(configure)
    })
    .bind((host, port))?
    .run()
    .await
}
