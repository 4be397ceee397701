/// Sort Engine.
///
/// Turns a declarative `SortSpec` plus the current `SortState` (key and
/// direction) into one record comparator. The store is reordered with a stable
/// sort, so records with equal keys keep their relative order.

use crate::record::Record;
use crate::value::CellValue;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

/// Whole-record comparator.
pub type Comparator = Rc<dyn Fn(&Record, &Record) -> Ordering>;
/// Comparator over the values of one column.
pub type CellComparator = Rc<dyn Fn(&CellValue, &CellValue) -> Ordering>;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first
    #[default]
    Asc,
    /// Largest first
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// How one column sorts.
#[derive(Clone)]
pub enum ColumnSort {
    /// The default total order (see `CellValue::default_cmp`).
    Default,
    Custom(CellComparator),
    /// The column is not sortable.
    Disabled,
}

impl ColumnSort {
    pub fn custom<F>(compare: F) -> Self
    where
        F: Fn(&CellValue, &CellValue) -> Ordering + 'static,
    {
        ColumnSort::Custom(Rc::new(compare))
    }
}

/// Sort configuration of a table.
#[derive(Clone, Default)]
pub enum SortSpec {
    /// No sorting at all.
    #[default]
    Disabled,
    /// One comparator over whole records. It owns the direction.
    Comparator(Comparator),
    /// Per-column behaviour. Keys missing from the list use the default order
    /// when sorted programmatically but cannot be toggled.
    Columns(Vec<(String, ColumnSort)>),
    /// Every column sortable with the default order.
    All,
}

impl SortSpec {
    pub fn comparator_fn<F>(compare: F) -> Self
    where
        F: Fn(&Record, &Record) -> Ordering + 'static,
    {
        SortSpec::Comparator(Rc::new(compare))
    }

    pub fn columns<I, K>(columns: I) -> Self
    where
        I: IntoIterator<Item = (K, ColumnSort)>,
        K: Into<String>,
    {
        SortSpec::Columns(columns.into_iter().map(|(k, c)| (k.into(), c)).collect())
    }

    fn column(&self, key: &str) -> Option<&ColumnSort> {
        match self {
            SortSpec::Columns(columns) => columns.iter().find(|(k, _)| k == key).map(|(_, c)| c),
            _ => None,
        }
    }

    /// Whether a header click on `key` may select it.
    pub fn is_sortable(&self, key: &str) -> bool {
        match self {
            SortSpec::Disabled | SortSpec::Comparator(_) => false,
            SortSpec::All => true,
            SortSpec::Columns(_) => matches!(
                self.column(key),
                Some(ColumnSort::Default) | Some(ColumnSort::Custom(_))
            ),
        }
    }

    /// Resolve the comparator for the current state.
    ///
    /// Returns `None` when sorting is disabled, when there are no records, when
    /// no key is selected, or when the key is absent from the first record.
    pub fn comparator(&self, state: &SortState, first: Option<&Record>) -> Option<Comparator> {
        match self {
            SortSpec::Disabled => None,
            SortSpec::Comparator(compare) => Some(Rc::clone(compare)),
            SortSpec::Columns(_) | SortSpec::All => {
                let key = state.key.clone()?;
                if !first?.contains(&key) {
                    return None;
                }
                let direction = state.direction;
                let compare_cells: CellComparator = match self.column(&key) {
                    Some(ColumnSort::Disabled) => return None,
                    Some(ColumnSort::Custom(compare)) => Rc::clone(compare),
                    _ => Rc::new(|a: &CellValue, b: &CellValue| a.default_cmp(b)),
                };
                Some(Rc::new(move |a: &Record, b: &Record| {
                    let empty = CellValue::Text(String::new());
                    let va = a.get(&key).unwrap_or(&empty);
                    let vb = b.get(&key).unwrap_or(&empty);
                    direction.apply(compare_cells(va, vb))
                }))
            }
        }
    }
}

impl fmt::Debug for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortSpec::Disabled => write!(f, "Disabled"),
            SortSpec::Comparator(_) => write!(f, "Comparator(<fn>)"),
            SortSpec::All => write!(f, "All"),
            SortSpec::Columns(columns) => {
                let mut list = f.debug_list();
                for (key, column) in columns {
                    let kind = match column {
                        ColumnSort::Default => "default",
                        ColumnSort::Custom(_) => "custom",
                        ColumnSort::Disabled => "disabled",
                    };
                    list.entry(&(key, kind));
                }
                list.finish()
            }
        }
    }
}

/// Selected sort key and direction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub key: Option<String>,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortState {
    pub fn new(key: impl Into<String>, direction: SortDirection) -> Self {
        SortState {
            key: Some(key.into()),
            direction,
        }
    }

    /// Header-click semantics: the active key flips direction, another key
    /// becomes active ascending. Returns false (state untouched) when `key`
    /// is not sortable.
    pub fn toggle(&mut self, key: &str, spec: &SortSpec) -> bool {
        if !spec.is_sortable(key) {
            return false;
        }
        if self.key.as_deref() == Some(key) {
            self.direction = self.direction.flipped();
        } else {
            self.key = Some(key.to_string());
            self.direction = SortDirection::Asc;
        }
        true
    }
}
