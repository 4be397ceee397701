/// Resolving external ids to Record Store positions.

use crate::record::Record;
use crate::store::RecordStore;
use crate::value::CellValue;
use std::fmt;
use std::rc::Rc;

/// Caller-supplied `(id, record) -> bool` resolver.
pub type Resolver = Rc<dyn Fn(&CellValue, &Record) -> bool>;

/// How `update`/`delete`/`row` find the record an id refers to.
#[derive(Clone, Default)]
pub enum Identify {
    /// Identification disabled: id-based operations are no-ops.
    #[default]
    Disabled,
    /// The id is the Record Store position itself.
    PositionIsId,
    /// First record whose field equals the id (see `CellValue::loose_eq`).
    ByField(String),
    /// First record the resolver accepts.
    ByResolver(Resolver),
}

impl Identify {
    pub fn by_field(field: impl Into<String>) -> Self {
        Identify::ByField(field.into())
    }

    pub fn by_resolver<F>(resolver: F) -> Self
    where
        F: Fn(&CellValue, &Record) -> bool + 'static,
    {
        Identify::ByResolver(Rc::new(resolver))
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, Identify::Disabled)
    }

    /// The field that must never be overwritten by an update.
    pub fn protected_field(&self) -> Option<&str> {
        match self {
            Identify::ByField(field) => Some(field),
            _ => None,
        }
    }

    /// Whether `record` is the one `id` designates. Always false for
    /// `Disabled` and `PositionIsId` (positions are not a record property).
    pub fn matches(&self, id: &CellValue, record: &Record) -> bool {
        match self {
            Identify::Disabled | Identify::PositionIsId => false,
            Identify::ByField(field) => record.get(field).map_or(false, |v| v.loose_eq(id)),
            Identify::ByResolver(resolver) => resolver(id, record),
        }
    }

    /// Position of the first record `id` designates, if any.
    pub fn resolve(&self, id: &CellValue, store: &RecordStore) -> Option<usize> {
        match self {
            Identify::Disabled => None,
            Identify::PositionIsId => {
                let n = id.as_f64().or_else(|| crate::value::parse_number(&id.filter_text()))?;
                if n < 0.0 || n.fract() != 0.0 {
                    return None;
                }
                let index = n as usize;
                (index < store.len()).then_some(index)
            }
            _ => store.iter().position(|record| self.matches(id, record)),
        }
    }
}

impl fmt::Debug for Identify {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identify::Disabled => write!(f, "Disabled"),
            Identify::PositionIsId => write!(f, "PositionIsId"),
            Identify::ByField(field) => write!(f, "ByField({:?})", field),
            Identify::ByResolver(_) => write!(f, "ByResolver(<fn>)"),
        }
    }
}
