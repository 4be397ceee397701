/// Remote Sync Example
///
/// This example demonstrates:
/// - Loading a table from a chunked remote source
/// - Local mutations while the load is still running
/// - Retries of failed chunk requests
///
/// The "server" is an in-memory fetcher with random latency, so the chunks
/// arrive out of order.

use datatable::driver::{Fetcher, LocalBoxFuture, SyncDriver};
use datatable::messages::ChunkQuery;
use datatable::{
    CellValue, ChunkRequest, DataTable, FetchOutcome, Identify, Options, Record, RemoteSource, SortSpec,
    Source, TextRenderer,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

struct InMemoryServer {
    records: Vec<Record>,
    calls: Cell<u64>,
}

impl Fetcher for InMemoryServer {
    fn fetch(&self, request: &ChunkRequest) -> LocalBoxFuture<'static, FetchOutcome> {
        let call = self.calls.get();
        self.calls.set(call + 1);

        let query = ChunkQuery::from_request(request);
        println!("  -> {} {}?{}", request.method, request.url, query.to_query_string());

        // Every fifth call fails once
        let outcome = if call % 5 == 4 {
            FetchOutcome::Transient("connection reset by peer".to_string())
        } else {
            FetchOutcome::Success(query.slice(&self.records).to_vec())
        };
        let latency = Duration::from_millis(10 + (call * 37) % 50);
        Box::pin(async move {
            tokio::time::sleep(latency).await;
            outcome
        })
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> datatable::Result<()> {
    println!("=== DataTable Remote Sync Example ===\n");

    let records: Vec<Record> = (0..95)
        .map(|i| {
            Record::from_pairs(vec![
                ("id", CellValue::from(i)),
                ("name", CellValue::from(format!("user{:03}", i))),
            ])
        })
        .collect();

    let mut source = RemoteSource::new("http://localhost:8080/data");
    source.size = Some(records.len());

    let options = Options::new()
        .page_size(10)
        .pages_shown(2)
        .sort(SortSpec::All)
        .identify(Identify::by_field("id"));
    let table = Rc::new(RefCell::new(DataTable::new(
        Source::Remote(source),
        options,
        TextRenderer::new(),
    )?));

    let server = InMemoryServer {
        records,
        calls: Cell::new(0),
    };

    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let mut driver = SyncDriver::new(Rc::clone(&table), server);
            driver.start();

            {
                let mut t = table.borrow_mut();
                t.add(Record::from_pairs(vec![
                    ("id", CellValue::from(1000)),
                    ("name", CellValue::from("added while loading")),
                ]));
                t.delete(CellValue::from(3));
                t.update(
                    CellValue::from(90),
                    Record::from_pairs(vec![("name", CellValue::from("renamed while loading"))]),
                );
            }

            let phase = driver.run_until_settled().await;
            println!("\nsync finished in phase {:?}\n", phase);
        })
        .await;

    let t = table.borrow();
    println!("{} records loaded", t.len());
    println!("{}\n", t.renderer().output());
    if let Some(record) = t.row(&CellValue::from(90)) {
        println!("record 90: {:?}", record.get("name"));
    }
    println!("record 3 present: {}", t.row(&CellValue::from(3)).is_some());
    println!("record 1000 present: {}", t.row(&CellValue::from(1000)).is_some());

    Ok(())
}
