/// Bulk-Sync Protocol
///
/// A sans-IO state machine that replaces the whole Record Store from a remote
/// source, chunk by chunk, while local mutations keep arriving.
///
/// # Lifecycle
///
/// ```text
/// Idle --begin--> Loading --last chunk--> Reconciling --finish--> Idle
///                    |  ^
///        chunk failed|  |retry_stalled
///                    v  |
///                  Stalled
/// ```
///
/// `BulkSync` never performs I/O. Its inputs are `begin` and `on_response`;
/// its outputs are `SyncAction`s a driver must execute (issue a fetch, issue
/// it after a delay, schedule the next reload). When the load completes the
/// `PendingSyncBuffer` is handed back so the engine can replay the mutations
/// it queued while the load was in flight.
///
/// # Modes
///
/// - `Paged`: the total is known. All chunk requests go out at once and may
///   complete in any order. Chunks are kept by offset so the final order does
///   not depend on arrival order.
/// - `Streaming`: the total is unknown. One request at a time, each for the
///   chunk after the previous one, until an empty chunk arrives.
/// - `AllInOne`: a single request without offset or limit.

use crate::config::RemoteSource;
use crate::error::{Error, Result};
use crate::record::Record;
use crate::value::CellValue;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// Identifies one issued chunk request.
pub type RequestId = u64;

/// Predicate of a queued bulk delete.
pub type RecordFilter = Rc<dyn Fn(&Record) -> bool>;

/// How a load splits the remote dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    Paged { total: usize },
    Streaming,
    AllInOne,
}

impl SyncMode {
    pub fn for_source(source: &RemoteSource) -> Self {
        if source.all_in_one {
            SyncMode::AllInOne
        } else {
            match source.size {
                Some(total) => SyncMode::Paged { total },
                None => SyncMode::Streaming,
            }
        }
    }
}

/// One chunk request for the driver to send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRequest {
    pub id: RequestId,
    pub url: String,
    pub method: String,
    /// `None` for an all-in-one request.
    pub offset: Option<usize>,
    pub limit: Option<usize>,
    /// Failed attempts so far.
    pub attempt: u32,
    pub timeout: Duration,
}

/// Result of one fetch, as reported by the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Success(Vec<Record>),
    /// 4xx-class response. Not retried.
    ClientError { status: u16, message: String },
    /// 5xx-class response. Not retried.
    ServerError { status: u16, message: String },
    /// Anything else, timeouts included. Retried with backoff.
    Transient(String),
}

impl FetchOutcome {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            400..=499 => FetchOutcome::ClientError { status, message },
            500..=599 => FetchOutcome::ServerError { status, message },
            _ => FetchOutcome::Transient(format!("HTTP {}: {}", status, message)),
        }
    }
}

/// A chunk request that failed terminally, with the failure that stopped it.
#[derive(Debug, Clone, PartialEq)]
pub struct StalledChunk {
    pub request: ChunkRequest,
    pub error: Error,
}

/// Work for the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncAction {
    Fetch(ChunkRequest),
    FetchAfter(ChunkRequest, Duration),
    /// Start a new streaming load after the delay, replacing any pending one.
    ScheduleReload(Duration),
}

/// Observable phase of the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Loading,
    Reconciling,
    /// A chunk failed terminally and nothing else is outstanding.
    Stalled,
}

/// Exponential backoff for transient failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub base_ms: u64,
    pub factor: u32,
    pub cap_ms: u64,
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            base_ms: 250,
            factor: 2,
            cap_ms: 10_000,
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let mut ms = self.base_ms;
        for _ in 1..attempt {
            ms = ms.saturating_mul(self.factor as u64);
            if ms >= self.cap_ms {
                break;
            }
        }
        Duration::from_millis(ms.min(self.cap_ms))
    }

    /// Backoff must grow from a positive base up to a cap no smaller than it.
    pub fn validate(&self) -> Result<()> {
        if self.base_ms == 0 {
            return Err(Error::InvalidConfig("retry base delay must be positive".to_string()));
        }
        if self.factor < 1 {
            return Err(Error::InvalidConfig("retry factor must be at least 1".to_string()));
        }
        if self.cap_ms < self.base_ms {
            return Err(Error::InvalidConfig(format!(
                "retry cap {}ms is below the base delay {}ms",
                self.cap_ms, self.base_ms
            )));
        }
        Ok(())
    }

    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempt <= max)
    }
}

/// A delete queued while loading.
#[derive(Clone)]
pub enum PendingDelete {
    Id(CellValue),
    Matching(RecordFilter),
}

impl fmt::Debug for PendingDelete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PendingDelete::Id(id) => write!(f, "Id({:?})", id),
            PendingDelete::Matching(_) => write!(f, "Matching(<fn>)"),
        }
    }
}

/// Records received so far plus the mutations issued during the load.
#[derive(Debug, Default)]
pub struct PendingSyncBuffer {
    chunks: BTreeMap<usize, Vec<Record>>,
    adds: Vec<Record>,
    deletes: Vec<PendingDelete>,
    updates: Vec<(CellValue, Record)>,
}

impl PendingSyncBuffer {
    pub fn new() -> Self {
        PendingSyncBuffer::default()
    }

    pub fn push_chunk(&mut self, offset: usize, records: Vec<Record>) {
        self.chunks.insert(offset, records);
    }

    /// Number of records received so far.
    pub fn accumulated(&self) -> usize {
        self.chunks.values().map(Vec::len).sum()
    }

    pub fn queue_add(&mut self, record: Record) {
        self.adds.push(record);
    }

    pub fn queue_delete(&mut self, delete: PendingDelete) {
        self.deletes.push(delete);
    }

    /// Queue an update; a later update for the same id replaces it.
    pub fn queue_update(&mut self, id: CellValue, patch: Record) {
        match self.updates.iter_mut().find(|(queued, _)| queued.loose_eq(&id)) {
            Some(entry) => entry.1 = patch,
            None => self.updates.push((id, patch)),
        }
    }

    pub fn adds(&self) -> &[Record] {
        &self.adds
    }

    pub fn deletes(&self) -> &[PendingDelete] {
        &self.deletes
    }

    pub fn updates(&self) -> &[(CellValue, Record)] {
        &self.updates
    }

    /// Split into the received records (in offset order) and the queued
    /// adds, deletes and updates.
    pub fn into_parts(self) -> (Vec<Record>, Vec<Record>, Vec<PendingDelete>, Vec<(CellValue, Record)>) {
        let records = self.chunks.into_values().flatten().collect();
        (records, self.adds, self.deletes, self.updates)
    }
}

/// What one input to the state machine produced.
#[derive(Debug, Default)]
pub struct SyncStep {
    pub actions: Vec<SyncAction>,
    /// Set when the load finished; the phase is then `Reconciling`.
    pub completed: Option<PendingSyncBuffer>,
    /// Load progress in `[0, 1]`, when known.
    pub progress: Option<f32>,
}

#[derive(Debug)]
struct Load {
    mode: SyncMode,
    buffer: PendingSyncBuffer,
    outstanding: BTreeMap<RequestId, ChunkRequest>,
    stalled: Vec<StalledChunk>,
}

#[derive(Debug)]
enum State {
    Idle,
    Loading(Load),
    Reconciling,
}

/// Chunked reload state machine.
#[derive(Debug)]
pub struct BulkSync {
    source: RemoteSource,
    chunk_size: usize,
    retry: RetryPolicy,
    state: State,
    next_id: RequestId,
}

impl BulkSync {
    pub fn new(source: RemoteSource, chunk_size: usize, retry: RetryPolicy) -> Self {
        BulkSync {
            source,
            chunk_size: chunk_size.max(1),
            retry,
            state: State::Idle,
            next_id: 0,
        }
    }

    pub fn source(&self) -> &RemoteSource {
        &self.source
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn phase(&self) -> SyncPhase {
        match &self.state {
            State::Idle => SyncPhase::Idle,
            State::Reconciling => SyncPhase::Reconciling,
            State::Loading(load) if load.outstanding.is_empty() && !load.stalled.is_empty() => {
                SyncPhase::Stalled
            }
            State::Loading(_) => SyncPhase::Loading,
        }
    }

    /// True while a Pending Sync Buffer exists (loading or stalled).
    pub fn is_loading(&self) -> bool {
        matches!(self.state, State::Loading(_))
    }

    /// The buffer of the load in flight.
    pub fn buffer_mut(&mut self) -> Option<&mut PendingSyncBuffer> {
        match &mut self.state {
            State::Loading(load) => Some(&mut load.buffer),
            _ => None,
        }
    }

    pub fn buffer(&self) -> Option<&PendingSyncBuffer> {
        match &self.state {
            State::Loading(load) => Some(&load.buffer),
            _ => None,
        }
    }

    /// Progress of a paged load.
    pub fn progress(&self) -> Option<f32> {
        match &self.state {
            State::Loading(Load {
                mode: SyncMode::Paged { total },
                buffer,
                ..
            }) => Some(if *total == 0 {
                1.0
            } else {
                (buffer.accumulated() as f32 / *total as f32).min(1.0)
            }),
            _ => None,
        }
    }

    /// Chunk requests that failed terminally.
    pub fn stalled(&self) -> &[StalledChunk] {
        match &self.state {
            State::Loading(load) => &load.stalled,
            _ => &[],
        }
    }

    fn request(&mut self, offset: Option<usize>, limit: Option<usize>) -> ChunkRequest {
        let id = self.next_id;
        self.next_id += 1;
        ChunkRequest {
            id,
            url: self.source.url.clone(),
            method: self.source.method.clone(),
            offset,
            limit,
            attempt: 0,
            timeout: Duration::from_millis(self.source.timeout_ms),
        }
    }

    /// Start a load. Ignored while another one is in flight.
    pub fn begin(&mut self, mode: SyncMode) -> SyncStep {
        if !matches!(self.state, State::Idle) {
            debug!("bulk sync already running; ignoring begin({:?})", mode);
            return SyncStep::default();
        }

        let requests: Vec<ChunkRequest> = match mode {
            SyncMode::AllInOne => vec![self.request(None, None)],
            SyncMode::Streaming => vec![self.request(Some(0), Some(self.chunk_size))],
            SyncMode::Paged { total } => (0..total)
                .step_by(self.chunk_size)
                .map(|offset| self.request(Some(offset), Some(self.chunk_size)))
                .collect(),
        };
        debug!("bulk sync started in {:?} mode with {} request(s)", mode, requests.len());

        let mut load = Load {
            mode,
            buffer: PendingSyncBuffer::new(),
            outstanding: BTreeMap::new(),
            stalled: Vec::new(),
        };
        let actions = requests
            .into_iter()
            .map(|request| {
                load.outstanding.insert(request.id, request.clone());
                SyncAction::Fetch(request)
            })
            .collect();
        self.state = State::Loading(load);

        let mut step = SyncStep {
            actions,
            progress: self.progress(),
            completed: None,
        };
        // A paged load of zero records has nothing to wait for
        let nothing_outstanding = matches!(&self.state, State::Loading(load) if load.outstanding.is_empty());
        if nothing_outstanding {
            step.completed = self.complete();
        }
        step
    }

    /// Feed the outcome of request `id`. Unknown ids are ignored.
    pub fn on_response(&mut self, id: RequestId, outcome: FetchOutcome) -> SyncStep {
        let State::Loading(load) = &mut self.state else {
            debug!("response {} arrived while not loading; dropped", id);
            return SyncStep::default();
        };
        let Some(request) = load.outstanding.remove(&id) else {
            debug!("response {} does not match an outstanding request; dropped", id);
            return SyncStep::default();
        };

        let mut step = SyncStep::default();
        match outcome {
            FetchOutcome::Success(records) => {
                let offset = request.offset.unwrap_or(0);
                let mode = load.mode;
                match mode {
                    SyncMode::Streaming if records.is_empty() => {
                        step.completed = self.complete();
                        return step;
                    }
                    SyncMode::Streaming => {
                        load.buffer.push_chunk(offset, records);
                        let next = self.request(Some(offset + self.chunk_size), Some(self.chunk_size));
                        if let State::Loading(load) = &mut self.state {
                            load.outstanding.insert(next.id, next.clone());
                        }
                        step.actions.push(SyncAction::Fetch(next));
                    }
                    SyncMode::Paged { .. } | SyncMode::AllInOne => {
                        load.buffer.push_chunk(offset, records);
                        if load.outstanding.is_empty() && load.stalled.is_empty() {
                            step.progress = self.progress();
                            step.completed = self.complete();
                            return step;
                        }
                    }
                }
            }
            FetchOutcome::ClientError { status, message } => {
                let error = Error::TransportClient { status, message };
                warn!("chunk request {} (offset {:?}) failed: {}", request.id, request.offset, error);
                load.stalled.push(StalledChunk { request, error });
            }
            FetchOutcome::ServerError { status, message } => {
                let error = Error::TransportServer { status, message };
                warn!("chunk request {} (offset {:?}) failed: {}", request.id, request.offset, error);
                load.stalled.push(StalledChunk { request, error });
            }
            FetchOutcome::Transient(reason) => {
                let attempt = request.attempt + 1;
                if self.retry.allows(attempt) {
                    let delay = self.retry.delay(attempt);
                    debug!(
                        "chunk request {} failed ({}); retry {} in {:?}",
                        request.id, reason, attempt, delay
                    );
                    let mut retry = self.request(request.offset, request.limit);
                    retry.attempt = attempt;
                    if let State::Loading(load) = &mut self.state {
                        load.outstanding.insert(retry.id, retry.clone());
                    }
                    step.actions.push(SyncAction::FetchAfter(retry, delay));
                } else {
                    warn!(
                        "chunk request {} (offset {:?}) gave up after {} attempts: {}",
                        request.id, request.offset, attempt, reason
                    );
                    load.stalled.push(StalledChunk {
                        request,
                        error: Error::TransportTransient(reason),
                    });
                }
            }
        }
        step.progress = self.progress();
        step
    }

    /// Re-issue every stalled chunk request.
    pub fn retry_stalled(&mut self) -> SyncStep {
        let stalled = match &mut self.state {
            State::Loading(load) => std::mem::take(&mut load.stalled),
            _ => return SyncStep::default(),
        };
        let mut actions = Vec::with_capacity(stalled.len());
        for old in stalled {
            let request = self.request(old.request.offset, old.request.limit);
            if let State::Loading(load) = &mut self.state {
                load.outstanding.insert(request.id, request.clone());
            }
            actions.push(SyncAction::Fetch(request));
        }
        SyncStep {
            actions,
            progress: self.progress(),
            completed: None,
        }
    }

    /// Drop the load in flight. Mutations already applied locally stay.
    pub fn abandon(&mut self) -> Option<PendingSyncBuffer> {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Loading(load) => Some(load.buffer),
            _ => None,
        }
    }

    fn complete(&mut self) -> Option<PendingSyncBuffer> {
        match std::mem::replace(&mut self.state, State::Reconciling) {
            State::Loading(load) => {
                debug!("bulk sync received {} records", load.buffer.accumulated());
                Some(load.buffer)
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Leave `Reconciling` once the replay is done. Returns the reload to
    /// schedule, if the source refreshes periodically.
    pub fn finish(&mut self) -> Option<SyncAction> {
        if !matches!(self.state, State::Reconciling) {
            return None;
        }
        self.state = State::Idle;
        self.source
            .refresh_ms
            .map(|ms| SyncAction::ScheduleReload(Duration::from_millis(ms)))
    }
}
