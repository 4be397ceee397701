/// Tokio driver for the bulk-sync state machine.
///
/// The engine is single-threaded (`!Send`), so the driver runs on a
/// current-thread runtime inside a `tokio::task::LocalSet`. Fetches run as
/// local tasks and report back through an mpsc channel; the driver applies
/// each completion to the table one at a time, so completions never interleave
/// with each other or with local mutations.

use crate::render::Renderer;
use crate::sync::{ChunkRequest, FetchOutcome, RequestId, SyncAction, SyncPhase};
use crate::table::DataTable;
use log::debug;
use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A boxed future that need not be `Send`.
pub type LocalBoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Transport for chunk requests.
pub trait Fetcher {
    /// Perform one request. The driver applies `request.timeout`; a request
    /// that exceeds it counts as `FetchOutcome::Transient`.
    fn fetch(&self, request: &ChunkRequest) -> LocalBoxFuture<'static, FetchOutcome>;
}

impl<F: Fetcher + ?Sized> Fetcher for Rc<F> {
    fn fetch(&self, request: &ChunkRequest) -> LocalBoxFuture<'static, FetchOutcome> {
        (**self).fetch(request)
    }
}

#[derive(Debug)]
enum Event {
    Response(RequestId, FetchOutcome),
    Reload,
}

/// Executes `SyncAction`s against a `Fetcher` and feeds the outcomes back to
/// the table.
///
/// # Examples
///
/// ```no_run
/// use datatable::driver::{Fetcher, LocalBoxFuture, SyncDriver};
/// use datatable::{ChunkRequest, DataTable, FetchOutcome, Options, RemoteSource, Source, TextRenderer};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// struct Empty;
///
/// impl Fetcher for Empty {
///     fn fetch(&self, _request: &ChunkRequest) -> LocalBoxFuture<'static, FetchOutcome> {
///         Box::pin(async { FetchOutcome::Success(Vec::new()) })
///     }
/// }
///
/// # async fn run() {
/// let source = Source::Remote(RemoteSource::new("http://localhost:8080/data"));
/// let table = DataTable::new(source, Options::new(), TextRenderer::new()).unwrap();
/// let table = Rc::new(RefCell::new(table));
///
/// let local = tokio::task::LocalSet::new();
/// local
///     .run_until(async {
///         let mut driver = SyncDriver::new(Rc::clone(&table), Empty);
///         driver.start();
///         driver.run_until_settled().await;
///     })
///     .await;
/// # }
/// ```
pub struct SyncDriver<R: Renderer, F: Fetcher + 'static> {
    table: Rc<RefCell<DataTable<R>>>,
    fetcher: Rc<F>,
    tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
    reload: Option<JoinHandle<()>>,
}

impl<R: Renderer, F: Fetcher + 'static> SyncDriver<R, F> {
    pub fn new(table: Rc<RefCell<DataTable<R>>>, fetcher: F) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        SyncDriver {
            table,
            fetcher: Rc::new(fetcher),
            tx,
            rx,
            reload: None,
        }
    }

    pub fn table(&self) -> &Rc<RefCell<DataTable<R>>> {
        &self.table
    }

    /// Begin the initial load. Must be called from within a `LocalSet`.
    pub fn start(&mut self) {
        let actions = self.table.borrow_mut().begin_sync();
        self.dispatch(actions);
    }

    /// Re-issue stalled chunk requests.
    pub fn retry_stalled(&mut self) {
        let actions = self.table.borrow_mut().retry_stalled();
        self.dispatch(actions);
    }

    /// Whether a scheduled reload is waiting for its timer.
    pub fn reload_pending(&self) -> bool {
        self.reload.as_ref().map_or(false, |handle| !handle.is_finished())
    }

    /// Cancel the pending scheduled reload, if any.
    pub fn cancel_reload(&mut self) {
        if let Some(handle) = self.reload.take() {
            handle.abort();
        }
    }

    /// Execute actions produced by the table.
    pub fn dispatch(&mut self, actions: Vec<SyncAction>) {
        for action in actions {
            match action {
                SyncAction::Fetch(request) => self.spawn_fetch(request, Duration::ZERO),
                SyncAction::FetchAfter(request, delay) => self.spawn_fetch(request, delay),
                SyncAction::ScheduleReload(delay) => self.schedule_reload(delay),
            }
        }
    }

    fn spawn_fetch(&self, request: ChunkRequest, delay: Duration) {
        let fetcher = Rc::clone(&self.fetcher);
        let tx = self.tx.clone();
        tokio::task::spawn_local(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let outcome = match tokio::time::timeout(request.timeout, fetcher.fetch(&request)).await {
                Ok(outcome) => outcome,
                Err(_) => FetchOutcome::Transient(format!(
                    "request timed out after {:?}",
                    request.timeout
                )),
            };
            // The receiver only goes away with the driver
            let _ = tx.send(Event::Response(request.id, outcome));
        });
    }

    fn schedule_reload(&mut self, delay: Duration) {
        self.cancel_reload();
        debug!("next reload in {:?}", delay);
        let tx = self.tx.clone();
        self.reload = Some(tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Event::Reload);
        }));
    }

    fn handle(&mut self, event: Event) {
        let actions = match event {
            Event::Response(id, outcome) => self.table.borrow_mut().on_chunk(id, outcome),
            Event::Reload => {
                self.reload = None;
                self.table.borrow_mut().reload()
            }
        };
        self.dispatch(actions);
    }

    /// Process one event. Returns false when no more events can arrive.
    pub async fn step(&mut self) -> bool {
        match self.rx.recv().await {
            Some(event) => {
                self.handle(event);
                true
            }
            None => false,
        }
    }

    /// Process events until the load in flight completes or stalls.
    pub async fn run_until_settled(&mut self) -> SyncPhase {
        loop {
            let phase = self.table.borrow().sync_phase();
            if matches!(phase, SyncPhase::Idle | SyncPhase::Stalled) {
                return phase;
            }
            if !self.step().await {
                return phase;
            }
        }
    }

    /// Process events forever, scheduled reloads included.
    pub async fn run(&mut self) {
        while self.step().await {}
    }
}
