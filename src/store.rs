/// Record Store.
///
/// The ordered sequence of records owned by a `DataTable`. Order is insertion
/// order until the first sort, after which it is the sort order. Every stored
/// record carries a `RowKey` that survives reordering, so the engine can find a
/// record again after a sort moved it.

use crate::record::Record;
use std::cmp::Ordering;

/// Stable identity of a stored record, independent of its position.
pub type RowKey = u64;

#[derive(Debug, Clone)]
struct StoredRecord {
    key: RowKey,
    record: Record,
}

/// Ordered records, each with a `RowKey` that survives sorting.
///
/// # Examples
///
/// ```
/// use datatable::{CellValue, Record, RecordStore};
///
/// let mut store = RecordStore::new();
/// store.append(Record::from_cells(vec!["10", "banana"]));
/// store.append(Record::from_cells(vec!["3", "apple"]));
///
/// store.sort_by(|a, b| a.get("1").unwrap().default_cmp(b.get("1").unwrap()));
/// assert_eq!(store.get(0).unwrap().get("1"), Some(&CellValue::Text("apple".into())));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    rows: Vec<StoredRecord>,
    next_key: RowKey,
}

impl RecordStore {
    pub fn new() -> Self {
        RecordStore::default()
    }

    pub fn from_records(records: Vec<Record>) -> Self {
        let mut store = RecordStore::new();
        store.append_many(records);
        store
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.rows.get(index).map(|r| &r.record)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Record> {
        self.rows.get_mut(index).map(|r| &mut r.record)
    }

    pub fn first(&self) -> Option<&Record> {
        self.get(0)
    }

    /// Key of the record at `index`.
    pub fn key_at(&self, index: usize) -> Option<RowKey> {
        self.rows.get(index).map(|r| r.key)
    }

    /// Current position of the record with `key`.
    pub fn position_of(&self, key: RowKey) -> Option<usize> {
        self.rows.iter().position(|r| r.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.rows.iter().map(|r| &r.record)
    }

    /// Append a record and return its key.
    pub fn append(&mut self, record: Record) -> RowKey {
        let key = self.next_key;
        self.next_key += 1;
        self.rows.push(StoredRecord { key, record });
        key
    }

    /// Append several records at once and return their keys, in input order.
    pub fn append_many(&mut self, records: Vec<Record>) -> Vec<RowKey> {
        self.rows.reserve(records.len());
        records.into_iter().map(|r| self.append(r)).collect()
    }

    pub fn remove(&mut self, index: usize) -> Option<Record> {
        if index >= self.rows.len() {
            return None;
        }
        Some(self.rows.remove(index).record)
    }

    /// Remove every record matching `predicate`; returns how many were removed.
    pub fn remove_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&Record) -> bool,
    {
        let before = self.rows.len();
        self.rows.retain(|r| !predicate(&r.record));
        before - self.rows.len()
    }

    /// Replace the whole content. Keys keep increasing so stale keys never
    /// resolve to a new record.
    pub fn replace_all(&mut self, records: Vec<Record>) {
        self.rows.clear();
        self.append_many(records);
    }

    /// Stable in-place sort.
    pub fn sort_by<F>(&mut self, mut compare: F)
    where
        F: FnMut(&Record, &Record) -> Ordering,
    {
        self.rows.sort_by(|a, b| compare(&a.record, &b.record));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::CellValue;

    fn numbered(n: usize) -> Record {
        Record::from_pairs(vec![("id", CellValue::from(n))])
    }

    #[test]
    fn test_keys_survive_sort() {
        let mut store = RecordStore::new();
        let k0 = store.append(numbered(2));
        let k1 = store.append(numbered(1));

        store.sort_by(|a, b| a.get("id").unwrap().default_cmp(b.get("id").unwrap()));

        assert_eq!(store.position_of(k1), Some(0));
        assert_eq!(store.position_of(k0), Some(1));
        assert_eq!(store.key_at(0), Some(k1));
    }

    #[test]
    fn test_remove_where() {
        let mut store = RecordStore::from_records((0..10).map(numbered).collect());
        let removed = store.remove_where(|r| r.get("id").unwrap().as_f64().unwrap() >= 5.0);
        assert_eq!(removed, 5);
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn test_replace_all_does_not_reuse_keys() {
        let mut store = RecordStore::new();
        let old = store.append(numbered(1));
        store.replace_all(vec![numbered(1)]);
        assert_eq!(store.position_of(old), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_out_of_range() {
        let mut store = RecordStore::from_records(vec![numbered(0)]);
        assert!(store.remove(3).is_none());
        assert!(store.remove(0).is_some());
        assert!(store.is_empty());
    }
}
