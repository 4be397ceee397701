/// Cell values.
///
/// A cell holds a number, plain text, or an HTML fragment. HTML fragments keep
/// their markup for display but are reduced to their text content whenever a
/// filter or a select option looks at them.

use regex::Regex;
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

/// Column kinds, decided once at ingestion time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Number,
    Text,
}

/// A single cell of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Html(String),
}

impl CellValue {
    /// Build a text cell, promoting it to `Html` when it looks like markup.
    pub fn detect(s: impl Into<String>) -> Self {
        let s = s.into();
        if is_html(&s) {
            CellValue::Html(s)
        } else {
            CellValue::Text(s)
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) | CellValue::Html(s) => Some(s),
            CellValue::Number(_) => None,
        }
    }

    /// The text a filter compares against: numbers are formatted, HTML is
    /// stripped down to its text content.
    pub fn filter_text(&self) -> String {
        match self {
            CellValue::Number(n) => format_number(*n),
            CellValue::Text(s) => s.clone(),
            CellValue::Html(s) => html_to_text(s),
        }
    }

    /// True for empty text (after HTML reduction). Numbers are never empty.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Number(_) => false,
            CellValue::Text(s) => s.is_empty(),
            CellValue::Html(s) => html_to_text(s).trim().is_empty(),
        }
    }

    /// Explicit equality used by identification and select membership.
    ///
    /// - number vs number: numeric equality
    /// - number vs text: the text is parsed as a number first
    /// - text vs text: string equality, HTML compared by its text content
    pub fn loose_eq(&self, other: &CellValue) -> bool {
        match (self, other) {
            (CellValue::Number(a), CellValue::Number(b)) => a == b,
            (CellValue::Number(n), text) | (text, CellValue::Number(n)) => {
                parse_number(&text.filter_text()) == Some(*n)
            }
            _ => self.filter_text() == other.filter_text(),
        }
    }

    /// Loose equality against a raw string (select option keys are strings).
    pub fn matches_key(&self, key: &str) -> bool {
        match self {
            CellValue::Number(n) => parse_number(key) == Some(*n),
            _ => self.filter_text() == key,
        }
    }

    /// Default total order: numbers numerically, text lexicographically,
    /// numbers before text. NaN compares equal to everything numeric.
    pub fn default_cmp(&self, other: &CellValue) -> Ordering {
        match (self, other) {
            (CellValue::Number(a), CellValue::Number(b)) => {
                a.partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (CellValue::Number(_), _) => Ordering::Less,
            (_, CellValue::Number(_)) => Ordering::Greater,
            (a, b) => a.as_str().cmp(&b.as_str()),
        }
    }

    /// Convert a JSON scalar into a cell.
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Number(n) => n
                .as_f64()
                .map(CellValue::Number)
                .unwrap_or_else(|| CellValue::Text(n.to_string())),
            JsonValue::String(s) => CellValue::detect(s.clone()),
            JsonValue::Bool(b) => CellValue::Text(b.to_string()),
            JsonValue::Null => CellValue::Text(String::new()),
            other => CellValue::Text(other.to_string()),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            CellValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            CellValue::Text(s) | CellValue::Html(s) => JsonValue::String(s.clone()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(n) => write!(f, "{}", format_number(*n)),
            CellValue::Text(s) | CellValue::Html(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<usize> for CellValue {
    fn from(n: usize) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::detect(s)
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::detect(s)
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Number(n) => serializer.serialize_f64(*n),
            CellValue::Text(s) | CellValue::Html(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = JsonValue::deserialize(deserializer)?;
        Ok(CellValue::from_json(&value))
    }
}

/// Format a number the way it is displayed and compared as text:
/// integral values carry no fractional part.
pub fn format_number(n: f64) -> String {
    format!("{}", n)
}

/// Parse a whole string as a finite number. Surrounding whitespace is allowed,
/// trailing garbage is not.
pub fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn html_regex() -> &'static Regex {
    static HTML: OnceLock<Regex> = OnceLock::new();
    HTML.get_or_init(|| {
        Regex::new(r"(?i)^\s*<[A-Z].*?</[a-zA-Z]+>\s*$").expect("static HTML pattern is valid")
    })
}

/// True when `s` is a single HTML element such as `<b>x</b>`.
pub fn is_html(s: &str) -> bool {
    html_regex().is_match(s)
}

/// Reduce an HTML fragment to its text content: tags are dropped and the
/// common character entities decoded.
pub fn html_to_text(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    decode_entities(&text)
}

fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
