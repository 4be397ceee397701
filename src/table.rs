/// DataTable - the data-view engine
///
/// Owns the Record Store and derives from it the Filter Index and the current
/// page. Every mutation goes through this type so the view stays consistent,
/// including while a bulk sync replaces the store in the background.

use crate::config::{Options, RemoteSource};
use crate::error::{Error, Result};
use crate::filter::{FilterKind, FilterSet, FilterValue, OptionState};
use crate::ingest::{ingest_csv, ingest_json, ingest_rows};
use crate::paging::{self, Counter, PagingWindow};
use crate::record::Record;
use crate::render::Renderer;
use crate::sort::{SortDirection, SortSpec, SortState};
use crate::store::{RecordStore, RowKey};
use crate::sync::{
    BulkSync, FetchOutcome, PendingDelete, PendingSyncBuffer, RequestId, StalledChunk, SyncAction, SyncMode, SyncPhase,
    SyncStep,
};
use crate::value::CellValue;
use log::{debug, warn};
use std::rc::Rc;

/// Initial data of a table.
#[derive(Debug, Clone)]
pub enum Source {
    Records(Vec<Record>),
    /// Loaded by bulk sync; the table starts empty.
    Remote(RemoteSource),
    /// Rows of cell text, numeric columns coerced unless `force_strings`.
    Rows(Vec<Vec<String>>),
    Csv { text: String, has_header: bool },
    /// A JSON array of objects or arrays.
    Json(String),
}

/// The data-view engine: one owned instance per table.
///
/// # Examples
///
/// ```
/// use datatable::{DataTable, Options, Source, Record, CellValue, TextRenderer};
/// use datatable::{FilterKind, FilterValue, Identify, SortSpec, SortDirection};
///
/// let records = (1..=50)
///     .map(|i| Record::from_pairs(vec![("id", CellValue::from(i)), ("name", CellValue::from(format!("item {}", i)))]))
///     .collect();
///
/// let options = Options::new()
///     .page_size(10)
///     .sort(SortSpec::All)
///     .sort_by("id", SortDirection::Desc)
///     .identify(Identify::by_field("id"))
///     .filter("name", FilterKind::Text);
///
/// let mut table = DataTable::new(Source::Records(records), options, TextRenderer::new()).unwrap();
/// assert_eq!(table.last_page(), 5);
///
/// table.set_filter("name", FilterValue::text("item 1")).unwrap();
/// assert_eq!(table.filter_index().len(), 11);
///
/// table.delete(CellValue::from(10));
/// assert_eq!(table.filter_index().len(), 10);
/// ```
pub struct DataTable<R: Renderer> {
    options: Options,
    store: RecordStore,
    filters: FilterSet,
    sort_state: SortState,
    filter_index: Vec<usize>,
    current_start: usize,
    sync: Option<BulkSync>,
    renderer: R,
}

impl<R: Renderer> DataTable<R> {
    /// Build a table, sort and filter its initial data and render it once.
    ///
    /// A `Source::Remote` table starts empty; call `begin_sync` to load it.
    pub fn new(source: Source, options: Options, renderer: R) -> Result<Self> {
        options.validate()?;

        let (records, remote) = match source {
            Source::Records(records) => (records, None),
            Source::Remote(remote) => {
                remote.validate()?;
                (Vec::new(), Some(remote))
            }
            Source::Rows(rows) => (ingest_rows(rows, options.force_strings), None),
            Source::Csv { text, has_header } => (ingest_csv(&text, has_header, options.force_strings)?, None),
            Source::Json(json) => (ingest_json(&json)?, None),
        };

        let store = RecordStore::from_records(records);
        let filters = FilterSet::from_specs(&options.filters, &store)?;
        let sort_state = SortState {
            key: options.sort_key.clone(),
            direction: options.sort_dir,
        };
        let sync = remote.map(|remote| {
            BulkSync::new(
                remote,
                options.page_size * options.pages_shown,
                options.retry.clone(),
            )
        });

        let mut table = DataTable {
            options,
            store,
            filters,
            sort_state,
            filter_index: Vec::new(),
            current_start: 0,
            sync,
            renderer,
        };
        table.apply_sort();
        table.apply_filter(false);
        table.refresh();
        Ok(table)
    }

    // --- Accessors ---

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn filter_index(&self) -> &[usize] {
        &self.filter_index
    }

    pub fn current_start(&self) -> usize {
        self.current_start
    }

    pub fn sort_state(&self) -> &SortState {
        &self.sort_state
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn current_page(&self) -> usize {
        paging::current_page(self.current_start, self.options.page_size)
    }

    pub fn last_page(&self) -> usize {
        paging::last_page(self.filter_index.len(), self.options.page_size)
    }

    pub fn counter(&self) -> Counter {
        Counter::compute(
            self.current_start,
            self.options.page_size,
            self.filter_index.len(),
            self.store.len(),
        )
    }

    pub fn paging_window(&self) -> PagingWindow {
        PagingWindow::new(self.current_page(), self.last_page(), self.options.pages_shown)
    }

    /// Options of a select filter, with their auto-narrow visibility.
    pub fn select_options(&self, field: &str) -> Option<Vec<OptionState>> {
        self.filters.options(field)
    }

    /// `(store position, record)` of every record on the current page.
    pub fn visible_rows(&self) -> Vec<(usize, &Record)> {
        let end = (self.current_start + self.options.page_size).min(self.filter_index.len());
        self.filter_index
            .get(self.current_start..end)
            .unwrap_or(&[])
            .iter()
            .filter_map(|&pos| self.store.get(pos).map(|record| (pos, record)))
            .collect()
    }

    // --- Queries ---

    /// Store position of the record `id` designates.
    pub fn index_of(&self, id: &CellValue) -> Option<usize> {
        self.options.identify.resolve(id, &self.store)
    }

    pub fn row(&self, id: &CellValue) -> Option<&Record> {
        self.index_of(id).and_then(|pos| self.store.get(pos))
    }

    pub fn all(&self) -> impl Iterator<Item = &Record> {
        self.store.iter()
    }

    pub fn all_matching<F>(&self, predicate: F) -> Vec<&Record>
    where
        F: Fn(&Record) -> bool,
    {
        self.store.iter().filter(|r| predicate(r)).collect()
    }

    // --- View operations ---

    /// Render the current page.
    pub fn refresh(&mut self) {
        self.renderer.before_refresh();

        let end = (self.current_start + self.options.page_size).min(self.filter_index.len());
        let mut rows = Vec::with_capacity(end.saturating_sub(self.current_start));
        for &pos in self.filter_index.get(self.current_start..end).unwrap_or(&[]) {
            if let Some(record) = self.store.get(pos) {
                rows.push(self.renderer.render_row(pos, record));
            }
        }
        self.renderer.render_body(rows);

        let window = self.paging_window();
        self.renderer.render_paging(&window);
        let counter = self.counter();
        self.renderer.render_counter(&counter);

        self.renderer.after_refresh();
    }

    /// Recompute the Filter Index and render. Without `keep_page` the view
    /// goes back to the first page.
    pub fn filter(&mut self, keep_page: bool) {
        self.apply_filter(keep_page);
        self.refresh();
    }

    /// Reorder the store with the configured comparator, re-derive the Filter
    /// Index and render.
    pub fn sort(&mut self, keep_page: bool) {
        self.apply_sort();
        self.apply_filter(keep_page);
        self.refresh();
    }

    /// Move to page `page`, clamped to the existing pages.
    pub fn load_page(&mut self, page: usize) {
        let old_page = self.current_page();
        let page = paging::clamp_page(page, self.last_page());
        self.current_start = (page - 1) * self.options.page_size;
        self.refresh();
        if let Some(hook) = self.options.on_page_change.clone() {
            hook(old_page, page);
        }
    }

    pub fn set_filter(&mut self, field: &str, value: FilterValue) -> Result<()> {
        self.filters.set_value(field, value)?;
        self.filter(false);
        Ok(())
    }

    pub fn reset_filters(&mut self) {
        self.filters.reset();
        self.filter(false);
    }

    /// Replace the whole filter configuration. Every filter starts from its
    /// initial value; on error the previous filters stay in place.
    pub fn set_filters(&mut self, filters: Vec<(String, FilterKind)>) -> Result<()> {
        self.filters = FilterSet::from_specs(&filters, &self.store)?;
        self.options.filters = filters;
        self.filter(false);
        Ok(())
    }

    /// Register or replace the filter for one field.
    pub fn add_filter(&mut self, field: impl Into<String>, kind: FilterKind) -> Result<()> {
        let field = field.into();
        self.filters.add(field.clone(), kind.clone(), &self.store)?;
        match self.options.filters.iter_mut().find(|(f, _)| *f == field) {
            Some(entry) => entry.1 = kind,
            None => self.options.filters.push((field, kind)),
        }
        self.filter(false);
        Ok(())
    }

    pub fn remove_filter(&mut self, field: &str) -> bool {
        if !self.filters.remove(field) {
            return false;
        }
        self.options.filters.retain(|(f, _)| f != field);
        self.filter(false);
        true
    }

    pub fn set_auto_narrow(&mut self, enabled: bool) {
        self.options.auto_narrow = enabled;
        if !enabled {
            self.filters.clear_narrowing();
        }
        self.filter(true);
    }

    /// Header-click sort on `key`: flips the direction of the active key,
    /// otherwise selects `key` ascending. Unsortable keys are ignored.
    pub fn toggle_sort(&mut self, key: &str) {
        if self.sort_state.toggle(key, &self.options.sort) {
            self.sort(false);
        } else {
            debug!("{}", Error::SortUnavailable(key.to_string()));
        }
    }

    pub fn set_sort(&mut self, key: impl Into<String>, direction: SortDirection) {
        self.sort_state = SortState::new(key, direction);
        self.sort(false);
    }

    /// Replace the sort configuration and re-sort with the current key and
    /// direction. A key the new configuration cannot sort is dropped.
    pub fn set_sort_spec(&mut self, spec: SortSpec) {
        if let Some(key) = &self.sort_state.key {
            if !spec.is_sortable(key) {
                debug!("{}", Error::SortUnavailable(key.clone()));
                self.sort_state.key = None;
            }
        }
        self.options.sort = spec;
        self.sort(false);
    }

    /// Change the page size and go back to the first page. Chunk sizes of an
    /// existing remote source are not affected.
    pub fn set_page_size(&mut self, page_size: usize) -> Result<()> {
        if page_size == 0 {
            return Err(Error::InvalidConfig("page size must be positive".to_string()));
        }
        self.options.page_size = page_size;
        self.current_start = 0;
        self.refresh();
        Ok(())
    }

    fn apply_sort(&mut self) {
        match self.options.sort.comparator(&self.sort_state, self.store.first()) {
            Some(compare) => self.store.sort_by(|a, b| compare(a, b)),
            None => {
                if let Some(key) = &self.sort_state.key {
                    debug!("{}", Error::SortUnavailable(key.clone()));
                }
            }
        }
    }

    fn apply_filter(&mut self, keep_page: bool) {
        let old_start = self.current_start;
        self.filter_index = self.filters.compute_index(&self.store);
        self.current_start = 0;

        if keep_page {
            let page_size = self.options.page_size;
            let mut start = old_start;
            while start >= self.filter_index.len() && start > 0 {
                start = start.saturating_sub(page_size);
            }
            self.current_start = start;
        }

        if self.options.auto_narrow {
            self.filters.narrow(&self.store, &self.filter_index);
        }
    }

    /// Point the view at the page holding the record with `key`. A record the
    /// filters hide leaves the view where it is.
    fn locate(&mut self, key: RowKey) {
        let Some(pos) = self.store.position_of(key) else {
            return;
        };
        if let Ok(i) = self.filter_index.binary_search(&pos) {
            let page_size = self.options.page_size;
            self.current_start = i / page_size * page_size;
        }
    }

    /// After a removal: keep the old start if it is still inside the Filter
    /// Index, otherwise step back one page.
    fn rebound(&mut self, old_start: usize) {
        self.apply_filter(false);
        let len = self.filter_index.len();
        let page_size = self.options.page_size;
        self.current_start = if old_start < len {
            old_start
        } else if len == 0 {
            0
        } else {
            let back = old_start.saturating_sub(page_size);
            // A bulk delete can shrink the index by more than one page
            if back < len {
                back
            } else {
                (len - 1) / page_size * page_size
            }
        };
    }

    // --- Mutations ---

    fn buffer(&mut self) -> Option<&mut PendingSyncBuffer> {
        self.sync.as_mut().and_then(BulkSync::buffer_mut)
    }

    pub fn is_loading(&self) -> bool {
        self.sync.as_ref().map_or(false, BulkSync::is_loading)
    }

    /// Append a record and show the page it lands on.
    pub fn add(&mut self, record: Record) {
        if let Some(buffer) = self.buffer() {
            buffer.queue_add(record.clone());
        }
        let key = self.store.append(record);
        self.apply_sort();
        self.apply_filter(true);
        self.locate(key);
        self.refresh();
    }

    /// Append several records and show the page of the first one.
    pub fn add_many(&mut self, records: Vec<Record>) {
        if records.is_empty() {
            return;
        }
        if let Some(buffer) = self.buffer() {
            for record in &records {
                buffer.queue_add(record.clone());
            }
        }
        let keys = self.store.append_many(records);
        self.apply_sort();
        self.apply_filter(true);
        if let Some(&first) = keys.first() {
            self.locate(first);
        }
        self.refresh();
    }

    /// Merge `patch` into the record `id` designates. Only fields the record
    /// already has are written, and never the identifying field.
    pub fn update(&mut self, id: CellValue, patch: Record) {
        if !self.options.identify.is_enabled() {
            warn!("update({}) ignored: {}", id, Error::IdentifyDisabled);
            return;
        }
        if let Some(buffer) = self.buffer() {
            buffer.queue_update(id.clone(), patch.clone());
        }
        match self.apply_update(&id, &patch) {
            Some(key) => {
                self.apply_sort();
                self.apply_filter(true);
                self.locate(key);
                self.refresh();
            }
            None => warn!("update: {}", Error::NotFound(id.to_string())),
        }
    }

    fn apply_update(&mut self, id: &CellValue, patch: &Record) -> Option<RowKey> {
        let pos = self.options.identify.resolve(id, &self.store)?;
        let key = self.store.key_at(pos)?;
        let protected = self.options.identify.protected_field().map(str::to_owned);
        let record = self.store.get_mut(pos)?;
        record.merge(patch, protected.as_deref());
        Some(key)
    }

    /// Remove the record `id` designates.
    pub fn delete(&mut self, id: CellValue) {
        if !self.options.identify.is_enabled() {
            warn!("delete({}) ignored: {}", id, Error::IdentifyDisabled);
            return;
        }
        // Queued even when absent here: the record may still arrive in a chunk
        if let Some(buffer) = self.buffer() {
            buffer.queue_delete(PendingDelete::Id(id.clone()));
        }
        let Some(pos) = self.index_of(&id) else {
            warn!("delete: {}", Error::NotFound(id.to_string()));
            return;
        };
        let old_start = self.current_start;
        self.store.remove(pos);
        self.rebound(old_start);
        self.refresh();
    }

    /// Remove every record matching `predicate`; returns how many went.
    pub fn delete_all<F>(&mut self, predicate: F) -> usize
    where
        F: Fn(&Record) -> bool + 'static,
    {
        let predicate: Rc<dyn Fn(&Record) -> bool> = Rc::new(predicate);
        if let Some(buffer) = self.buffer() {
            buffer.queue_delete(PendingDelete::Matching(Rc::clone(&predicate)));
        }
        let old_start = self.current_start;
        let removed = self.store.remove_where(|r| predicate(r));
        self.rebound(old_start);
        self.refresh();
        removed
    }

    // --- Bulk sync ---

    pub fn sync_phase(&self) -> SyncPhase {
        self.sync.as_ref().map_or(SyncPhase::Idle, BulkSync::phase)
    }

    pub fn sync(&self) -> Option<&BulkSync> {
        self.sync.as_ref()
    }

    /// Chunk requests of the current load that failed terminally, with why.
    pub fn stalled_chunks(&self) -> &[StalledChunk] {
        match self.sync.as_ref() {
            Some(sync) => sync.stalled(),
            None => &[],
        }
    }

    /// Start loading the remote source in the mode its configuration implies.
    pub fn begin_sync(&mut self) -> Vec<SyncAction> {
        match self.sync.as_ref() {
            Some(sync) => {
                let mode = SyncMode::for_source(sync.source());
                self.begin_sync_with(mode)
            }
            None => {
                debug!("begin_sync on a table without remote source");
                Vec::new()
            }
        }
    }

    /// Start a load in an explicit mode.
    pub fn begin_sync_with(&mut self, mode: SyncMode) -> Vec<SyncAction> {
        let Some(sync) = self.sync.as_mut() else {
            return Vec::new();
        };
        let step = sync.begin(mode);
        self.handle_step(step)
    }

    /// Scheduled reload: always streams.
    pub fn reload(&mut self) -> Vec<SyncAction> {
        self.begin_sync_with(SyncMode::Streaming)
    }

    /// Deliver the outcome of a chunk request.
    pub fn on_chunk(&mut self, id: RequestId, outcome: FetchOutcome) -> Vec<SyncAction> {
        let Some(sync) = self.sync.as_mut() else {
            return Vec::new();
        };
        let step = sync.on_response(id, outcome);
        self.handle_step(step)
    }

    /// Re-issue chunk requests that failed terminally.
    pub fn retry_stalled(&mut self) -> Vec<SyncAction> {
        let Some(sync) = self.sync.as_mut() else {
            return Vec::new();
        };
        let step = sync.retry_stalled();
        self.handle_step(step)
    }

    /// Give up on the load in flight and keep the current data.
    pub fn abandon_sync(&mut self) {
        if let Some(sync) = self.sync.as_mut() {
            if sync.abandon().is_some() {
                self.renderer.render_progress(1.0);
            }
        }
    }

    fn handle_step(&mut self, step: SyncStep) -> Vec<SyncAction> {
        let mut actions = step.actions;
        if let Some(progress) = step.progress {
            self.renderer.render_progress(progress);
        }
        if let Some(buffer) = step.completed {
            actions.extend(self.reconcile(buffer));
        }
        actions
    }

    /// Replace the store with the loaded records and replay what was queued
    /// during the load: adds, then deletes, then updates.
    fn reconcile(&mut self, buffer: PendingSyncBuffer) -> Option<SyncAction> {
        let (records, adds, deletes, updates) = buffer.into_parts();
        debug!(
            "reconciling {} records with {} add(s), {} delete(s), {} update(s)",
            records.len(),
            adds.len(),
            deletes.len(),
            updates.len()
        );

        self.store.replace_all(records);
        self.store.append_many(adds);

        for delete in deletes {
            match delete {
                PendingDelete::Id(id) => match self.index_of(&id) {
                    Some(pos) => {
                        self.store.remove(pos);
                    }
                    None => debug!("replayed delete: {}", Error::NotFound(id.to_string())),
                },
                PendingDelete::Matching(predicate) => {
                    self.store.remove_where(|r| predicate(r));
                }
            }
        }

        for (id, patch) in updates {
            if self.apply_update(&id, &patch).is_none() {
                debug!("replayed update: {}", Error::NotFound(id.to_string()));
            }
        }

        self.filters.refresh_auto_options(&self.store);
        self.apply_sort();
        self.apply_filter(true);
        self.refresh();
        self.renderer.render_progress(1.0);

        self.sync.as_mut().and_then(BulkSync::finish)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterKind, SelectFilter};
    use crate::identify::Identify;
    use crate::render::TextRenderer;
    use crate::sort::ColumnSort;
    use std::cell::RefCell;

    fn item(id: i64, name: &str) -> Record {
        Record::from_pairs(vec![("id", CellValue::from(id)), ("name", CellValue::from(name))])
    }

    fn items(n: i64) -> Vec<Record> {
        (0..n).map(|i| item(i, &format!("item {}", i))).collect()
    }

    fn table(records: Vec<Record>, options: Options) -> DataTable<TextRenderer> {
        DataTable::new(Source::Records(records), options, TextRenderer::new()).unwrap()
    }

    fn ids(table: &DataTable<TextRenderer>) -> Vec<i64> {
        table
            .all()
            .map(|r| r.get("id").unwrap().as_f64().unwrap() as i64)
            .collect()
    }

    fn by_id() -> Options {
        Options::new().identify(Identify::by_field("id"))
    }

    #[test]
    fn test_initial_render() {
        let table = table(items(45), Options::new());
        assert_eq!(table.filter_index().len(), 45);
        assert_eq!(table.last_page(), 3);
        assert_eq!(table.renderer().body.len(), 20);
        assert_eq!(table.renderer().refreshes, 1);
        assert_eq!(
            table.renderer().counter,
            "Page 1 on 3. Showing 1 to 20 of 45 entries."
        );
    }

    #[test]
    fn test_load_page_clamps_and_reports() {
        let changes = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&changes);
        let mut table = table(
            items(95),
            Options::new().on_page_change(move |old, new| seen.borrow_mut().push((old, new))),
        );

        assert_eq!(table.last_page(), 5);
        table.load_page(6);
        assert_eq!(table.current_page(), 5);
        assert_eq!(table.current_start(), 80);
        assert_eq!(table.visible_rows().len(), 15);

        table.load_page(0);
        assert_eq!(table.current_page(), 1);
        assert_eq!(*changes.borrow(), vec![(1, 5), (5, 1)]);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let mut table = table(items(50), Options::new().page_size(5).filter("name", FilterKind::Text));
        table.set_filter("name", FilterValue::text("1")).unwrap();
        table.load_page(2);
        assert_eq!(table.current_start(), 5);

        let index = table.filter_index().to_vec();
        let start = table.current_start();
        table.filter(true);
        table.filter(true);
        assert_eq!(table.filter_index(), index.as_slice());
        assert_eq!(table.current_start(), start);

        // A fresh filter goes back to the first page
        table.filter(false);
        assert_eq!(table.current_start(), 0);
    }

    #[test]
    fn test_keep_page_steps_back_when_index_shrinks() {
        let mut table = table(items(60), Options::new().filter("name", FilterKind::Text));
        table.load_page(3);
        assert_eq!(table.current_start(), 40);

        table.filters.set_value("name", FilterValue::text("item 1")).unwrap();
        table.filter(true);
        // 11 matches: item 1, item 10..19
        assert_eq!(table.filter_index().len(), 11);
        assert_eq!(table.current_start(), 0);
    }

    #[test]
    fn test_add_locates_record() {
        let records = (0..100).map(|i| item(i * 2, "even")).collect();
        let mut table = table(
            records,
            by_id().page_size(20).sort(SortSpec::All).sort_by("id", SortDirection::Asc),
        );

        table.add(item(83, "odd"));
        // 42 ids (0, 2, .., 82) sort before 83
        assert_eq!(table.index_of(&CellValue::from(83)), Some(42));
        assert_eq!(table.current_start(), 40);
        assert_eq!(table.current_page(), 3);
    }

    #[test]
    fn test_add_filtered_out_keeps_page() {
        let mut table = table(items(50), by_id().filter("name", FilterKind::Text));
        table.set_filter("name", FilterValue::text("item")).unwrap();
        table.load_page(2);

        table.add(item(100, "hidden"));
        assert_eq!(table.len(), 51);
        assert_eq!(table.current_start(), 20);
    }

    #[test]
    fn test_add_many_locates_first() {
        let mut table = table(items(30), by_id().page_size(10));
        table.add_many(vec![item(30, "a"), item(31, "b")]);
        assert_eq!(table.current_start(), 30);
        assert_eq!(table.len(), 32);
    }

    #[test]
    fn test_delete_last_record_rebounds_one_page() {
        let mut table = table(items(41), by_id());
        table.load_page(3);
        assert_eq!(table.current_start(), 40);

        table.delete(CellValue::from(40));
        assert_eq!(table.len(), 40);
        assert_eq!(table.current_start(), 20);

        // Deleting on a page that is still in bounds keeps it
        table.delete(CellValue::from(25));
        assert_eq!(table.current_start(), 20);
    }

    #[test]
    fn test_delete_unknown_id_is_noop() {
        let mut table = table(items(5), by_id());
        table.delete(CellValue::from(99));
        assert_eq!(table.len(), 5);

        let mut disabled = self::table(items(5), Options::new());
        disabled.delete(CellValue::from(1));
        assert_eq!(disabled.len(), 5);
    }

    #[test]
    fn test_delete_all() {
        let mut table = table(items(45), Options::new());
        table.load_page(3);
        let removed = table.delete_all(|r| r.get("id").unwrap().as_f64().unwrap() >= 10.0);
        assert_eq!(removed, 35);
        assert_eq!(table.len(), 10);
        assert_eq!(table.current_start(), 0);
    }

    #[test]
    fn test_update_merges_existing_fields_only() {
        let mut table = table(items(3), by_id());
        table.update(
            CellValue::from("1"),
            Record::from_pairs(vec![
                ("id", CellValue::from(9)),
                ("name", CellValue::from("renamed")),
                ("extra", CellValue::from("x")),
            ]),
        );
        let row = table.row(&CellValue::from(1)).unwrap();
        assert_eq!(row.get("name"), Some(&CellValue::from("renamed")));
        assert_eq!(row.get("id"), Some(&CellValue::Number(1.0)));
        assert!(!row.contains("extra"));
    }

    #[test]
    fn test_update_moves_to_record_page() {
        let mut table = table(
            items(50),
            by_id().page_size(10).sort(SortSpec::All).sort_by("name", SortDirection::Asc),
        );
        table.update(CellValue::from(5), Record::from_pairs(vec![("name", CellValue::from("zzz"))]));
        assert_eq!(table.index_of(&CellValue::from(5)), Some(49));
        assert_eq!(table.current_start(), 40);
    }

    #[test]
    fn test_numeric_column_sort_from_rows() {
        let rows = vec![
            vec!["3".to_string(), "apple".to_string()],
            vec!["10".to_string(), "banana".to_string()],
        ];
        let table = DataTable::new(
            Source::Rows(rows),
            Options::new().sort(SortSpec::All).sort_by("0", SortDirection::Asc),
            TextRenderer::new(),
        )
        .unwrap();
        let firsts: Vec<f64> = table.all().map(|r| r.get("0").unwrap().as_f64().unwrap()).collect();
        assert_eq!(firsts, vec![3.0, 10.0]);
    }

    #[test]
    fn test_toggle_sort() {
        let mut table = table(items(3), Options::new().sort(SortSpec::All));
        table.toggle_sort("id");
        assert_eq!(ids(&table), vec![0, 1, 2]);
        table.toggle_sort("id");
        assert_eq!(ids(&table), vec![2, 1, 0]);
        assert_eq!(table.sort_state().direction, SortDirection::Desc);
    }

    #[test]
    fn test_auto_narrow_select() {
        let records = vec![
            Record::from_pairs(vec![("name", CellValue::from("a")), ("color", CellValue::from("red"))]),
            Record::from_pairs(vec![("name", CellValue::from("b")), ("color", CellValue::from("blue"))]),
        ];
        let mut table = table(
            records,
            Options::new()
                .auto_narrow(true)
                .filter("name", FilterKind::Text)
                .filter("color", FilterKind::Select(SelectFilter::auto())),
        );
        table.set_filter("name", FilterValue::text("a")).unwrap();
        let visible: Vec<String> = table
            .select_options("color")
            .unwrap()
            .into_iter()
            .filter(|s| s.visible)
            .map(|s| s.option.value)
            .collect();
        assert_eq!(visible, vec!["red"]);

        table.set_auto_narrow(false);
        assert!(table.select_options("color").unwrap().iter().all(|s| s.visible));
        assert_eq!(table.filter_index().len(), 1);
    }

    #[test]
    fn test_set_filters_replaces_configuration() {
        let mut table = table(items(30), Options::new().filter("name", FilterKind::Text));
        table.set_filter("name", FilterValue::text("item 1")).unwrap();
        assert_eq!(table.filter_index().len(), 11);

        table.set_filters(vec![("id".to_string(), FilterKind::Regex)]).unwrap();
        assert_eq!(table.filter_index().len(), 30);
        assert_eq!(table.options().filters.len(), 1);
        assert!(matches!(
            table.set_filter("name", FilterValue::text("x")),
            Err(Error::InvalidConfig(_))
        ));

        table.set_filter("id", FilterValue::text("5$")).unwrap();
        assert_eq!(table.filter_index().len(), 3);

        table.add_filter("name", FilterKind::Text).unwrap();
        table.set_filter("name", FilterValue::text("item 2")).unwrap();
        assert_eq!(table.filter_index().len(), 1);

        assert!(table.remove_filter("id"));
        assert!(!table.remove_filter("id"));
        // item 2, item 20..29
        assert_eq!(table.filter_index().len(), 11);
        assert_eq!(table.filters().len(), 1);
    }

    #[test]
    fn test_added_select_filter_reads_current_data() {
        let mut table = table(items(3), Options::new());
        table
            .add_filter("name", FilterKind::Select(SelectFilter::auto()))
            .unwrap();
        let options: Vec<String> = table
            .select_options("name")
            .unwrap()
            .into_iter()
            .map(|s| s.option.value)
            .collect();
        assert_eq!(options, vec!["item 0", "item 1", "item 2"]);
    }

    #[test]
    fn test_set_sort_spec_resorts() {
        let mut table = table(items(12), Options::new());
        table.toggle_sort("name");
        assert_eq!(table.sort_state().key, None);

        table.set_sort_spec(SortSpec::All);
        table.toggle_sort("name");
        assert_eq!(ids(&table), vec![0, 1, 10, 11, 2, 3, 4, 5, 6, 7, 8, 9]);

        // "name" is not sortable under the new configuration
        table.set_sort_spec(SortSpec::columns(vec![("id", ColumnSort::Default)]));
        assert_eq!(table.sort_state().key, None);
        table.toggle_sort("name");
        assert_eq!(table.sort_state().key, None);

        table.toggle_sort("id");
        assert_eq!(ids(&table), (0..12).collect::<Vec<_>>());
    }

    #[test]
    fn test_set_sort_reindexes() {
        let mut table = table(
            items(30),
            Options::new().sort(SortSpec::All).filter("name", FilterKind::Text),
        );
        table.set_filter("name", FilterValue::text("item 1")).unwrap();
        assert_eq!(table.filter_index()[0], 1);

        table.set_sort("id", SortDirection::Desc);
        assert_eq!(ids(&table)[..3], [29, 28, 27]);
        let visible: Vec<i64> = table
            .filter_index()
            .iter()
            .map(|&i| table.store().get(i).unwrap().get("id").unwrap().as_f64().unwrap() as i64)
            .collect();
        assert_eq!(visible, vec![19, 18, 17, 16, 15, 14, 13, 12, 11, 10, 1]);
        assert_eq!(table.filter_index()[0], 10);
    }

    #[test]
    fn test_set_page_size() {
        let mut table = table(items(45), Options::new());
        table.load_page(3);
        assert_eq!(table.current_start(), 40);

        table.set_page_size(50).unwrap();
        assert_eq!(table.current_start(), 0);
        assert_eq!(table.last_page(), 1);
        assert_eq!(table.visible_rows().len(), 45);

        assert!(matches!(table.set_page_size(0), Err(Error::InvalidConfig(_))));
        assert_eq!(table.options().page_size, 50);

        table.set_page_size(7).unwrap();
        table.load_page(7);
        assert_eq!(table.current_start(), 42);
        assert_eq!(table.visible_rows().len(), 3);
    }

    fn remote_table(size: Option<usize>) -> DataTable<TextRenderer> {
        let source = RemoteSource {
            size,
            ..RemoteSource::new("http://localhost/data")
        };
        DataTable::new(
            Source::Remote(source),
            by_id().page_size(5).pages_shown(2),
            TextRenderer::new(),
        )
        .unwrap()
    }

    fn fetch_ids(actions: &[SyncAction]) -> Vec<(RequestId, Option<usize>)> {
        actions
            .iter()
            .filter_map(|a| match a {
                SyncAction::Fetch(r) => Some((r.id, r.offset)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_delete_during_paged_sync_survives_replay() {
        let mut table = remote_table(Some(30));
        let requests = fetch_ids(&table.begin_sync());
        assert_eq!(requests.len(), 3);
        assert!(table.is_loading());

        table.on_chunk(requests[0].0, FetchOutcome::Success(items(10)));
        // Record 7 is not in the live store yet; the delete still gets queued
        table.delete(CellValue::from(7));
        table.on_chunk(requests[2].0, FetchOutcome::Success((20..30).map(|i| item(i, "late")).collect()));
        let actions = table.on_chunk(requests[1].0, FetchOutcome::Success((10..20).map(|i| item(i, "mid")).collect()));

        assert!(actions.is_empty());
        assert_eq!(table.sync_phase(), SyncPhase::Idle);
        assert_eq!(table.len(), 29);
        assert!(table.row(&CellValue::from(7)).is_none());
        assert_eq!(table.renderer().progress, None);
    }

    #[test]
    fn test_mutations_during_streaming_sync_replayed() {
        let mut table = remote_table(None);
        let first = fetch_ids(&table.begin_sync())[0];
        assert_eq!(first.1, Some(0));

        let actions = table.on_chunk(first.0, FetchOutcome::Success(items(10)));
        let second = fetch_ids(&actions)[0];
        assert_eq!(second.1, Some(10));

        // Applied to the live store right away
        table.add(item(100, "added"));
        assert_eq!(table.len(), 1);
        table.update(CellValue::from(3), Record::from_pairs(vec![("name", CellValue::from("first"))]));
        table.update(CellValue::from(3), Record::from_pairs(vec![("name", CellValue::from("second"))]));
        table.delete_all(|r| r.get("name").map_or(false, |n| n.filter_text() == "item 9"));

        let actions = table.on_chunk(second.0, FetchOutcome::Success(vec![]));
        assert!(actions.is_empty());

        assert_eq!(table.len(), 10);
        assert!(table.row(&CellValue::from(100)).is_some());
        assert!(table.row(&CellValue::from(9)).is_none());
        assert_eq!(
            table.row(&CellValue::from(3)).unwrap().get("name"),
            Some(&CellValue::from("second"))
        );
    }

    #[test]
    fn test_refresh_interval_schedules_streaming_reload() {
        let source = RemoteSource {
            refresh_ms: Some(1000),
            all_in_one: true,
            ..RemoteSource::new("http://localhost/data")
        };
        let mut table = DataTable::new(Source::Remote(source), Options::new(), TextRenderer::new()).unwrap();
        let request = fetch_ids(&table.begin_sync())[0];
        assert_eq!(request.1, None);

        let actions = table.on_chunk(request.0, FetchOutcome::Success(items(3)));
        assert_eq!(actions, vec![SyncAction::ScheduleReload(std::time::Duration::from_millis(1000))]);

        let reload = fetch_ids(&table.reload());
        assert_eq!(reload[0].1, Some(0));
    }

    #[test]
    fn test_stalled_sync_keeps_live_data() {
        let mut table = remote_table(None);
        let first = fetch_ids(&table.begin_sync())[0];
        table.on_chunk(first.0, FetchOutcome::from_status(404, "Not Found"));
        assert_eq!(table.sync_phase(), SyncPhase::Stalled);
        assert_eq!(
            table.stalled_chunks()[0].error,
            Error::TransportClient {
                status: 404,
                message: "Not Found".into()
            }
        );

        let retried = fetch_ids(&table.retry_stalled())[0];
        assert_eq!(retried.1, Some(0));
        table.on_chunk(retried.0, FetchOutcome::Success(vec![]));
        assert_eq!(table.sync_phase(), SyncPhase::Idle);
    }

    #[test]
    fn test_abandon_sync_allows_restart() {
        let mut table = remote_table(Some(20));
        let requests = fetch_ids(&table.begin_sync());
        assert_eq!(requests.len(), 2);
        table.add(item(99, "local"));
        table.on_chunk(requests[0].0, FetchOutcome::Success(items(10)));

        table.abandon_sync();
        assert_eq!(table.sync_phase(), SyncPhase::Idle);
        assert!(!table.is_loading());
        assert!(table.sync().unwrap().buffer().is_none());
        assert_eq!(table.renderer().progress, None);
        // Live data stays as it was
        assert_eq!(ids(&table), vec![99]);

        // A late response of the abandoned load is dropped
        assert!(table
            .on_chunk(requests[1].0, FetchOutcome::Success(items(10)))
            .is_empty());
        assert_eq!(table.len(), 1);

        let restarted = fetch_ids(&table.begin_sync());
        assert_eq!(restarted.len(), 2);
        assert!(restarted.iter().all(|(id, _)| requests.iter().all(|(old, _)| old != id)));
        assert!(table.is_loading());
    }

    #[test]
    fn test_retry_policy_checked_on_construction() {
        let settings = crate::config::Settings::from_json(r#"{"retry": {"factor": 0}}"#).unwrap();
        assert!(matches!(Options::from_settings(&settings), Err(Error::InvalidConfig(_))));

        let options = Options::new().retry(crate::sync::RetryPolicy {
            base_ms: 0,
            ..Default::default()
        });
        let result = DataTable::new(Source::Records(vec![]), options, TextRenderer::new());
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_invalid_options() {
        let result = DataTable::new(
            Source::Records(vec![]),
            Options::new().page_size(0),
            TextRenderer::new(),
        );
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }
}
