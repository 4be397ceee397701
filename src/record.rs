/// Records: one logical row of data.
///
/// A record is an ordered list of `(field, value)` pairs. Rows that come without
/// field names (plain arrays, ingested table rows) are positional: their fields
/// are named `"0"`, `"1"`, ... so that sort keys and filter fields address them
/// the same way as named records.

use crate::error::{Error, Result};
use crate::value::CellValue;
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(String, CellValue)>,
    positional: bool,
}

impl Record {
    pub fn new() -> Self {
        Record::default()
    }

    /// Build a positional record from a list of cells.
    pub fn from_cells<I, V>(cells: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        let fields = cells
            .into_iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v.into()))
            .collect();
        Record {
            fields,
            positional: true,
        }
    }

    /// Build a named record from `(field, value)` pairs, keeping their order.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<CellValue>,
    {
        let mut record = Record::new();
        for (k, v) in pairs {
            record.set(k, v);
        }
        record
    }

    /// Convert a JSON object (named) or array (positional) into a record.
    pub fn from_json(value: &JsonValue) -> Result<Self> {
        match value {
            JsonValue::Object(map) => Ok(Record {
                fields: map
                    .iter()
                    .map(|(k, v)| (k.clone(), CellValue::from_json(v)))
                    .collect(),
                positional: false,
            }),
            JsonValue::Array(items) => Ok(Record::from_cells(items.iter().map(CellValue::from_json))),
            other => Err(Error::Parse(format!(
                "expected a JSON object or array for a record, got {}",
                other
            ))),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        if self.positional {
            JsonValue::Array(self.fields.iter().map(|(_, v)| v.to_json()).collect())
        } else {
            JsonValue::Object(
                self.fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            )
        }
    }

    pub fn is_positional(&self) -> bool {
        self.positional
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&CellValue> {
        self.fields.iter().find(|(k, _)| k == field).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, field: &str) -> Option<&mut CellValue> {
        self.fields.iter_mut().find(|(k, _)| k == field).map(|(_, v)| v)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Set a field, appending it when absent.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<CellValue>) {
        let field = field.into();
        let value = value.into();
        match self.get_mut(&field) {
            Some(slot) => *slot = value,
            None => self.fields.push((field, value)),
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Merge `patch` into this record.
    ///
    /// Only fields this record already has are written; `protected` (the
    /// identifying field) is never overwritten. Returns the number of fields
    /// changed.
    pub fn merge(&mut self, patch: &Record, protected: Option<&str>) -> usize {
        let mut changed = 0;
        for (field, value) in self.fields.iter_mut() {
            if protected == Some(field.as_str()) {
                continue;
            }
            if let Some(new_value) = patch.get(field) {
                if value != new_value {
                    *value = new_value.clone();
                    changed += 1;
                }
            }
        }
        changed
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if self.positional {
            let mut seq = serializer.serialize_seq(Some(self.fields.len()))?;
            for (_, v) in &self.fields {
                seq.serialize_element(v)?;
            }
            seq.end()
        } else {
            let mut map = serializer.serialize_map(Some(self.fields.len()))?;
            for (k, v) in &self.fields {
                map.serialize_entry(k, v)?;
            }
            map.end()
        }
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = JsonValue::deserialize(deserializer)?;
        Record::from_json(&value).map_err(serde::de::Error::custom)
    }
}
