/// DataTable - paginated, filtered and sorted views over mutable records
///
/// A client-side tabular data engine: it keeps records in memory, derives a
/// filtered, sorted, paginated view of them and keeps that view consistent
/// through local mutations and chunked reloads from a remote source.

pub mod error;
pub mod value;
pub mod record;
pub mod store;
pub mod ingest;
pub mod identify;
pub mod filter;
pub mod sort;
pub mod paging;
pub mod render;
pub mod config;
pub mod sync;
pub mod table;
pub mod messages;

pub use error::{Error, Result};
pub use value::{CellValue, ColumnType};
pub use record::Record;
pub use store::{RecordStore, RowKey};
pub use identify::Identify;
pub use filter::{FilterKind, FilterSet, FilterValue, SelectFilter, SelectOption, SelectValues};
pub use sort::{ColumnSort, SortDirection, SortSpec, SortState};
pub use paging::{Counter, PagingWindow};
pub use render::{Renderer, TextRenderer};
pub use config::{Options, RemoteSource, Settings};
pub use sync::{BulkSync, ChunkRequest, FetchOutcome, RetryPolicy, StalledChunk, SyncAction, SyncMode, SyncPhase};
pub use table::{DataTable, Source};

// Tokio driver - only when async feature is enabled
#[cfg(feature = "async")]
pub mod driver;

// Chunk server - only when server feature is enabled
#[cfg(feature = "server")]
pub mod server;
