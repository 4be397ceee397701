/// Filter Engine.
///
/// A `FilterSet` holds one filter per field: a predicate resolved once from its
/// `FilterKind` configuration, plus the field's current `FilterValue`. A record
/// passes when every filter accepts it; an empty set lets everything through.
///
/// The Filter Index is always recomputed from scratch over the whole Record
/// Store. Record counts are client-scale, and a full rebuild cannot drift out of
/// sync with the store the way an incrementally patched index can.

use crate::error::{Error, Result};
use crate::record::Record;
use crate::store::RecordStore;
use crate::value::CellValue;
use regex::{Regex, RegexBuilder};
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

/// Predicate over one cell and the field's current filter value.
pub type CellPredicate = Rc<dyn Fn(&CellValue, &FilterValue) -> bool>;
/// Predicate over a whole record and the field's current filter value.
pub type RecordPredicate = Rc<dyn Fn(&Record, &FilterValue) -> bool>;

/// Current input of a filter.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// No restriction: the filter passes without consulting its predicate.
    Unrestricted,
    /// Text typed into a text filter.
    Text(String),
    /// Keys selected in a select filter. An empty selection excludes everything.
    Selection(Vec<String>),
}

impl FilterValue {
    pub fn text(s: impl Into<String>) -> Self {
        FilterValue::Text(s.into())
    }

    pub fn selection<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FilterValue::Selection(keys.into_iter().map(Into::into).collect())
    }
}

/// One option of a select filter.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    /// Option group label, when options are grouped.
    pub group: Option<String>,
}

impl SelectOption {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        SelectOption {
            label: value.clone(),
            value,
            group: None,
        }
    }

    pub fn labeled(value: impl Into<String>, label: impl Into<String>) -> Self {
        SelectOption {
            value: value.into(),
            label: label.into(),
            group: None,
        }
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

/// Where a select filter's options come from.
#[derive(Debug, Clone)]
pub enum SelectValues {
    /// Sorted distinct non-empty values of the column.
    Auto,
    Options(Vec<SelectOption>),
}

/// Select filter configuration.
#[derive(Clone)]
pub struct SelectFilter {
    pub values: SelectValues,
    pub multiple: bool,
    /// Label of the "show all" option; `None` means there is no such option.
    pub empty: Option<String>,
    /// Initially selected keys.
    pub default: Vec<String>,
    /// Replaces the membership test when set.
    pub predicate: Option<CellPredicate>,
}

impl SelectFilter {
    /// Single-select with automatic options and a "show all" entry.
    pub fn auto() -> Self {
        SelectFilter {
            values: SelectValues::Auto,
            multiple: false,
            empty: Some(String::new()),
            default: Vec::new(),
            predicate: None,
        }
    }

    pub fn with_options(options: Vec<SelectOption>) -> Self {
        SelectFilter {
            values: SelectValues::Options(options),
            ..SelectFilter::auto()
        }
    }

    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self.empty = None;
        self
    }

    pub fn without_empty(mut self) -> Self {
        self.empty = None;
        self
    }

    pub fn with_default<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CellValue, &FilterValue) -> bool + 'static,
    {
        self.predicate = Some(Rc::new(predicate));
        self
    }
}

/// Filter configuration for one field.
#[derive(Clone)]
pub enum FilterKind {
    /// Case-insensitive substring match.
    Text,
    /// Case-insensitive regular expression test.
    Regex,
    /// Text input evaluated by a caller-supplied predicate.
    Custom(CellPredicate),
    /// Text input evaluated against the whole record.
    Record(RecordPredicate),
    Select(SelectFilter),
}

impl FilterKind {
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&CellValue, &FilterValue) -> bool + 'static,
    {
        FilterKind::Custom(Rc::new(predicate))
    }

    pub fn record<F>(predicate: F) -> Self
    where
        F: Fn(&Record, &FilterValue) -> bool + 'static,
    {
        FilterKind::Record(Rc::new(predicate))
    }
}

impl fmt::Debug for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterKind::Text => write!(f, "Text"),
            FilterKind::Regex => write!(f, "Regex"),
            FilterKind::Custom(_) => write!(f, "Custom(<fn>)"),
            FilterKind::Record(_) => write!(f, "Record(<fn>)"),
            FilterKind::Select(s) => write!(
                f,
                "Select {{ values: {:?}, multiple: {}, empty: {:?} }}",
                s.values, s.multiple, s.empty
            ),
        }
    }
}

/// A select option together with its auto-narrow visibility.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionState {
    pub option: SelectOption,
    pub visible: bool,
}

enum Predicate {
    Cell(CellPredicate),
    Record(RecordPredicate),
    Regex(Option<Regex>),
}

struct SelectState {
    config: SelectFilter,
    options: Vec<SelectOption>,
    /// Values still reachable under the current Filter Index.
    narrowed: Option<BTreeSet<String>>,
}

impl SelectState {
    fn all_keys(&self) -> Vec<String> {
        self.options.iter().map(|o| o.value.clone()).collect()
    }

    fn initial_value(&self) -> FilterValue {
        if self.config.multiple {
            if self.config.default.is_empty() {
                FilterValue::Selection(self.all_keys())
            } else {
                FilterValue::Selection(self.config.default.clone())
            }
        } else if let Some(default) = self.config.default.first() {
            FilterValue::Selection(vec![default.clone()])
        } else if self.config.empty.is_some() {
            FilterValue::Unrestricted
        } else {
            FilterValue::Selection(self.options.first().map(|o| o.value.clone()).into_iter().collect())
        }
    }

    /// Single-selects with a "show all" option turn an empty choice into
    /// `Unrestricted`.
    fn normalize(&self, value: FilterValue) -> FilterValue {
        match value {
            FilterValue::Selection(keys)
                if !self.config.multiple
                    && self.config.empty.is_some()
                    && keys.iter().all(|k| k.is_empty()) =>
            {
                FilterValue::Unrestricted
            }
            FilterValue::Text(key) if !self.config.multiple => {
                self.normalize(FilterValue::Selection(vec![key]))
            }
            other => other,
        }
    }

    fn uses_default_predicate(&self) -> bool {
        self.config.predicate.is_none()
    }
}

struct FieldFilter {
    field: String,
    predicate: Predicate,
    value: FilterValue,
    initial: FilterValue,
    select: Option<SelectState>,
}

impl FieldFilter {
    fn accepts(&self, record: &Record) -> bool {
        if self.value == FilterValue::Unrestricted {
            return true;
        }
        match &self.predicate {
            Predicate::Record(predicate) => predicate(record, &self.value),
            Predicate::Cell(predicate) => predicate(&extract(record, &self.field), &self.value),
            Predicate::Regex(regex) => match regex {
                Some(regex) => regex.is_match(&extract(record, &self.field).filter_text()),
                None => true,
            },
        }
    }
}

/// The cell a filter looks at; missing fields read as empty text and HTML is
/// reduced to its text content.
fn extract(record: &Record, field: &str) -> CellValue {
    match record.get(field) {
        Some(CellValue::Html(html)) => CellValue::Text(crate::value::html_to_text(html)),
        Some(value) => value.clone(),
        None => CellValue::Text(String::new()),
    }
}

fn text_predicate() -> CellPredicate {
    Rc::new(|cell, value| match value {
        FilterValue::Text(needle) => cell
            .filter_text()
            .to_uppercase()
            .contains(&needle.to_uppercase()),
        FilterValue::Unrestricted => true,
        FilterValue::Selection(_) => false,
    })
}

fn membership_predicate() -> CellPredicate {
    Rc::new(|cell, value| match value {
        FilterValue::Selection(keys) => keys.iter().any(|k| cell.matches_key(k)),
        FilterValue::Text(key) => cell.matches_key(key),
        FilterValue::Unrestricted => true,
    })
}

fn compile_pattern(pattern: &str) -> Result<Option<Regex>> {
    if pattern.is_empty() {
        return Ok(None);
    }
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map(Some)
        .map_err(|e| Error::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}

/// Sorted distinct non-empty values of `field`, HTML reduced to text.
pub fn auto_options(store: &RecordStore, field: &str) -> Vec<SelectOption> {
    let mut numeric = Vec::new();
    let mut text = BTreeSet::new();
    for record in store.iter() {
        match record.get(field) {
            Some(CellValue::Number(n)) => numeric.push(*n),
            Some(cell) if !cell.is_empty() => {
                text.insert(cell.filter_text());
            }
            _ => {}
        }
    }
    numeric.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    numeric.dedup();
    numeric
        .into_iter()
        .map(crate::value::format_number)
        .chain(text)
        .map(SelectOption::new)
        .collect()
}

/// The set of per-field filters and their current values.
#[derive(Default)]
pub struct FilterSet {
    filters: Vec<FieldFilter>,
}

impl FilterSet {
    pub fn new() -> Self {
        FilterSet::default()
    }

    /// Resolve a list of filter configurations against the current data
    /// (automatic select options are read from `store`).
    pub fn from_specs(specs: &[(String, FilterKind)], store: &RecordStore) -> Result<Self> {
        let mut set = FilterSet::new();
        for (field, kind) in specs {
            set.add(field.clone(), kind.clone(), store)?;
        }
        Ok(set)
    }

    /// Register (or replace) the filter for `field`.
    pub fn add(&mut self, field: impl Into<String>, kind: FilterKind, store: &RecordStore) -> Result<()> {
        let field = field.into();
        let (predicate, select) = match kind {
            FilterKind::Text => (Predicate::Cell(text_predicate()), None),
            FilterKind::Regex => (Predicate::Regex(None), None),
            FilterKind::Custom(predicate) => (Predicate::Cell(predicate), None),
            FilterKind::Record(predicate) => (Predicate::Record(predicate), None),
            FilterKind::Select(config) => {
                let options = match &config.values {
                    SelectValues::Auto => auto_options(store, &field),
                    SelectValues::Options(options) => options.clone(),
                };
                let predicate = config.predicate.clone().unwrap_or_else(membership_predicate);
                (
                    Predicate::Cell(predicate),
                    Some(SelectState {
                        config,
                        options,
                        narrowed: None,
                    }),
                )
            }
        };

        let initial = match &select {
            Some(state) => state.initial_value(),
            None => FilterValue::Text(String::new()),
        };

        let filter = FieldFilter {
            field: field.clone(),
            predicate,
            value: initial.clone(),
            initial,
            select,
        };

        match self.filters.iter_mut().find(|f| f.field == field) {
            Some(existing) => *existing = filter,
            None => self.filters.push(filter),
        }
        Ok(())
    }

    /// Unregister the filter for `field`. Returns whether one existed.
    pub fn remove(&mut self, field: &str) -> bool {
        let before = self.filters.len();
        self.filters.retain(|f| f.field != field);
        self.filters.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.filters.iter().map(|f| f.field.as_str())
    }

    pub fn value(&self, field: &str) -> Option<&FilterValue> {
        self.find(field).map(|f| &f.value)
    }

    fn find(&self, field: &str) -> Option<&FieldFilter> {
        self.filters.iter().find(|f| f.field == field)
    }

    /// Set the current value of a filter.
    ///
    /// Regex filters compile the pattern here; an invalid pattern is rejected
    /// and the previous value stays in effect.
    pub fn set_value(&mut self, field: &str, value: FilterValue) -> Result<()> {
        let filter = self
            .filters
            .iter_mut()
            .find(|f| f.field == field)
            .ok_or_else(|| Error::InvalidConfig(format!("no filter on field '{}'", field)))?;

        let value = match &filter.select {
            Some(state) => state.normalize(value),
            None => value,
        };

        if let Predicate::Regex(compiled) = &mut filter.predicate {
            *compiled = match &value {
                FilterValue::Text(pattern) => compile_pattern(pattern)?,
                _ => None,
            };
        }

        filter.value = value;
        Ok(())
    }

    /// Restore every filter to its initial value.
    pub fn reset(&mut self) {
        for filter in &mut self.filters {
            filter.value = filter.initial.clone();
            if let Predicate::Regex(compiled) = &mut filter.predicate {
                *compiled = None;
            }
        }
    }

    pub fn passes(&self, record: &Record) -> bool {
        self.filters.iter().all(|f| f.accepts(record))
    }

    /// Positions of every record that passes all filters, in store order.
    pub fn compute_index(&self, store: &RecordStore) -> Vec<usize> {
        let mut index = Vec::new();
        for (i, record) in store.iter().enumerate() {
            if self.passes(record) {
                index.push(i);
            }
        }
        index
    }

    /// Second pass after index computation: record which select options are
    /// still reachable among the filtered rows. An empty index keeps the
    /// previous narrowing.
    pub fn narrow(&mut self, store: &RecordStore, index: &[usize]) {
        if index.is_empty() {
            return;
        }
        for filter in &mut self.filters {
            let Some(state) = filter.select.as_mut() else {
                continue;
            };
            if !state.uses_default_predicate() {
                continue;
            }
            let reachable: BTreeSet<String> = index
                .iter()
                .filter_map(|&i| store.get(i))
                .map(|record| extract(record, &filter.field).filter_text())
                .collect();
            state.narrowed = Some(reachable);
        }
    }

    /// Drop any narrowing (auto-narrow switched off).
    pub fn clear_narrowing(&mut self) {
        for filter in &mut self.filters {
            if let Some(state) = filter.select.as_mut() {
                state.narrowed = None;
            }
        }
    }

    /// Options of the select filter on `field` and whether each is visible.
    pub fn options(&self, field: &str) -> Option<Vec<OptionState>> {
        let state = self.find(field)?.select.as_ref()?;
        Some(
            state
                .options
                .iter()
                .map(|option| OptionState {
                    option: option.clone(),
                    visible: state
                        .narrowed
                        .as_ref()
                        .map_or(true, |reachable| reachable.contains(&option.value)),
                })
                .collect(),
        )
    }

    /// Re-derive automatic select options from new data. A multi-select that
    /// still had everything selected keeps everything selected.
    pub fn refresh_auto_options(&mut self, store: &RecordStore) {
        for filter in &mut self.filters {
            let Some(state) = filter.select.as_mut() else {
                continue;
            };
            if !matches!(state.config.values, SelectValues::Auto) {
                continue;
            }
            let had_initial = filter.value == filter.initial;
            state.options = auto_options(store, &filter.field);
            state.narrowed = None;
            filter.initial = state.initial_value();
            if had_initial {
                filter.value = filter.initial.clone();
            }
        }
    }
}

impl fmt::Debug for FilterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.filters.iter().map(|ff| (&ff.field, &ff.value)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fruit_store() -> RecordStore {
        RecordStore::from_records(vec![
            Record::from_pairs(vec![("name", CellValue::from("Apple")), ("color", CellValue::from("red"))]),
            Record::from_pairs(vec![("name", CellValue::from("Banana")), ("color", CellValue::from("yellow"))]),
            Record::from_pairs(vec![("name", CellValue::from("<b>Cherry</b>")), ("color", CellValue::from("red"))]),
            Record::from_pairs(vec![("name", CellValue::from("Lemon")), ("color", CellValue::from("yellow"))]),
        ])
    }

    #[test]
    fn test_no_filters_pass_everything() {
        let store = fruit_store();
        assert_eq!(FilterSet::new().compute_index(&store), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_text_filter_case_insensitive() {
        let store = fruit_store();
        let mut filters = FilterSet::new();
        filters.add("name", FilterKind::Text, &store).unwrap();

        assert_eq!(filters.compute_index(&store), vec![0, 1, 2, 3]);

        filters.set_value("name", FilterValue::text("an")).unwrap();
        assert_eq!(filters.compute_index(&store), vec![1]);

        // HTML is reduced to text before comparison
        filters.set_value("name", FilterValue::text("cherry")).unwrap();
        assert_eq!(filters.compute_index(&store), vec![2]);

        filters.set_value("name", FilterValue::text("b>")).unwrap();
        assert!(filters.compute_index(&store).is_empty());
    }

    #[test]
    fn test_regex_filter() {
        let store = fruit_store();
        let mut filters = FilterSet::new();
        filters.add("name", FilterKind::Regex, &store).unwrap();

        filters.set_value("name", FilterValue::text("^(apple|lemon)$")).unwrap();
        assert_eq!(filters.compute_index(&store), vec![0, 3]);

        let err = filters.set_value("name", FilterValue::text("("));
        assert!(matches!(err, Err(Error::InvalidPattern { .. })));
        // Previous pattern still in effect
        assert_eq!(filters.compute_index(&store), vec![0, 3]);
    }

    #[test]
    fn test_select_auto_options_and_membership() {
        let store = fruit_store();
        let mut filters = FilterSet::new();
        filters
            .add("color", FilterKind::Select(SelectFilter::auto()), &store)
            .unwrap();

        let values: Vec<String> = filters
            .options("color")
            .unwrap()
            .into_iter()
            .map(|s| s.option.value)
            .collect();
        assert_eq!(values, vec!["red", "yellow"]);

        // Show-all by default
        assert_eq!(filters.value("color"), Some(&FilterValue::Unrestricted));
        assert_eq!(filters.compute_index(&store).len(), 4);

        filters.set_value("color", FilterValue::selection(["yellow"])).unwrap();
        assert_eq!(filters.compute_index(&store), vec![1, 3]);

        // Choosing the empty option maps back to no restriction
        filters.set_value("color", FilterValue::selection([""])).unwrap();
        assert_eq!(filters.value("color"), Some(&FilterValue::Unrestricted));
    }

    #[test]
    fn test_empty_multi_selection_excludes_all() {
        let store = fruit_store();
        let mut filters = FilterSet::new();
        filters
            .add("color", FilterKind::Select(SelectFilter::auto().multiple()), &store)
            .unwrap();

        assert_eq!(filters.value("color"), Some(&FilterValue::selection(["red", "yellow"])));
        assert_eq!(filters.compute_index(&store).len(), 4);

        filters.set_value("color", FilterValue::Selection(vec![])).unwrap();
        assert!(filters.compute_index(&store).is_empty());
    }

    #[test]
    fn test_select_numeric_keys() {
        let store = RecordStore::from_records(vec![
            Record::from_cells(vec![CellValue::Number(1.0)]),
            Record::from_cells(vec![CellValue::Number(2.0)]),
            Record::from_cells(vec![CellValue::Number(10.0)]),
        ]);
        let mut filters = FilterSet::new();
        filters.add("0", FilterKind::Select(SelectFilter::auto()), &store).unwrap();

        let values: Vec<String> = filters
            .options("0")
            .unwrap()
            .into_iter()
            .map(|s| s.option.value)
            .collect();
        assert_eq!(values, vec!["1", "2", "10"]);

        filters.set_value("0", FilterValue::selection(["10"])).unwrap();
        assert_eq!(filters.compute_index(&store), vec![2]);
    }

    #[test]
    fn test_unrestricted_skips_custom_predicate() {
        let store = fruit_store();
        let mut filters = FilterSet::new();
        filters
            .add("name", FilterKind::custom(|_, _| panic!("must not be called")), &store)
            .unwrap();
        filters.set_value("name", FilterValue::Unrestricted).unwrap();
        assert_eq!(filters.compute_index(&store).len(), 4);
    }

    #[test]
    fn test_record_predicate() {
        let store = fruit_store();
        let mut filters = FilterSet::new();
        filters
            .add(
                "_any",
                FilterKind::record(|record, value| match value {
                    FilterValue::Text(t) => record.iter().any(|(_, v)| v.filter_text() == *t),
                    _ => true,
                }),
                &store,
            )
            .unwrap();
        filters.set_value("_any", FilterValue::text("red")).unwrap();
        assert_eq!(filters.compute_index(&store), vec![0, 2]);
    }

    #[test]
    fn test_narrowing_tracks_reachable_options() {
        let store = fruit_store();
        let mut filters = FilterSet::new();
        filters.add("name", FilterKind::Text, &store).unwrap();
        filters
            .add("color", FilterKind::Select(SelectFilter::auto()), &store)
            .unwrap();

        filters.set_value("name", FilterValue::text("e")).unwrap();
        let index = filters.compute_index(&store);
        assert_eq!(index, vec![0, 2, 3]);
        filters.narrow(&store, &index);
        assert!(filters.options("color").unwrap().iter().all(|s| s.visible));

        filters.set_value("name", FilterValue::text("lemon")).unwrap();
        let index = filters.compute_index(&store);
        filters.narrow(&store, &index);
        let states = filters.options("color").unwrap();
        assert!(!states[0].visible);
        assert!(states[1].visible);

        // Empty index keeps the previous narrowing
        filters.set_value("name", FilterValue::text("zzz")).unwrap();
        let index = filters.compute_index(&store);
        filters.narrow(&store, &index);
        assert_eq!(filters.options("color").unwrap(), states);
    }

    #[test]
    fn test_reset_restores_initial_values() {
        let store = fruit_store();
        let mut filters = FilterSet::new();
        filters.add("name", FilterKind::Text, &store).unwrap();
        filters
            .add(
                "color",
                FilterKind::Select(
                    SelectFilter::with_options(vec![
                        SelectOption::new("red").in_group("warm"),
                        SelectOption::labeled("yellow", "Yellow"),
                    ])
                    .without_empty()
                    .with_default(["yellow"]),
                ),
                &store,
            )
            .unwrap();
        assert_eq!(filters.compute_index(&store), vec![1, 3]);

        filters.set_value("name", FilterValue::text("zzz")).unwrap();
        filters.set_value("color", FilterValue::selection(["red"])).unwrap();
        filters.reset();

        assert_eq!(filters.value("name"), Some(&FilterValue::text("")));
        assert_eq!(filters.value("color"), Some(&FilterValue::selection(["yellow"])));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let mut filters = FilterSet::new();
        assert!(matches!(
            filters.set_value("nope", FilterValue::text("x")),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_refresh_auto_options() {
        let mut store = fruit_store();
        let mut filters = FilterSet::new();
        filters
            .add("color", FilterKind::Select(SelectFilter::auto().multiple()), &store)
            .unwrap();

        store.append(Record::from_pairs(vec![("name", CellValue::from("Lime")), ("color", CellValue::from("green"))]));
        filters.refresh_auto_options(&store);

        assert_eq!(
            filters.value("color"),
            Some(&FilterValue::selection(["green", "red", "yellow"]))
        );
        assert_eq!(filters.compute_index(&store).len(), 5);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_words() -> impl Strategy<Value = Vec<String>> {
            prop::collection::vec("[a-cA-C]{0,4}", 0..40)
        }

        proptest! {
            #[test]
            fn index_is_exactly_the_passing_positions(words in arb_words(), needle in "[a-c]{0,2}") {
                let store = RecordStore::from_records(
                    words.iter().map(|w| Record::from_cells(vec![CellValue::Text(w.clone())])).collect(),
                );
                let mut filters = FilterSet::new();
                filters.add("0", FilterKind::Text, &store).unwrap();
                filters.set_value("0", FilterValue::Text(needle.clone())).unwrap();

                let expected: Vec<usize> = words
                    .iter()
                    .enumerate()
                    .filter(|(_, w)| w.to_uppercase().contains(&needle.to_uppercase()))
                    .map(|(i, _)| i)
                    .collect();

                let index = filters.compute_index(&store);
                prop_assert_eq!(&index, &expected);
                // Recomputing with unchanged inputs is idempotent
                prop_assert_eq!(filters.compute_index(&store), index);
            }
        }
    }
}
