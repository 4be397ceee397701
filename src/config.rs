/// Configuration.
///
/// `Options` is the code-level configuration of a `DataTable` and may hold
/// closures (custom filters, comparators, resolvers, the page-change hook).
/// `Settings` is its plain-data counterpart, loadable with serde from JSON.

use crate::error::{Error, Result};
use crate::filter::{FilterKind, SelectFilter, SelectOption, SelectValues};
use crate::identify::Identify;
use crate::sort::{ColumnSort, SortDirection, SortSpec};
use crate::sync::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const DEFAULT_PAGES_SHOWN: usize = 9;
pub const DEFAULT_TIMEOUT_MS: u64 = 2000;

/// Called with `(old_page, new_page)` when `load_page` moves the view.
pub type PageChangeHook = Rc<dyn Fn(usize, usize)>;

/// Where remote data comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSource {
    pub url: String,
    /// HTTP method of chunk requests.
    pub method: String,
    /// Total number of records, when known upfront.
    pub size: Option<usize>,
    /// Per-request timeout.
    pub timeout_ms: u64,
    /// Reload the whole dataset this long after each completed load.
    pub refresh_ms: Option<u64>,
    /// Fetch everything with a single request.
    pub all_in_one: bool,
}

impl Default for RemoteSource {
    fn default() -> Self {
        RemoteSource {
            url: String::new(),
            method: "POST".to_string(),
            size: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            refresh_ms: None,
            all_in_one: false,
        }
    }
}

impl RemoteSource {
    pub fn new(url: impl Into<String>) -> Self {
        RemoteSource {
            url: url.into(),
            ..RemoteSource::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(Error::InvalidConfig("remote source needs a url".to_string()));
        }
        if self.timeout_ms == 0 {
            return Err(Error::InvalidConfig("request timeout must be positive".to_string()));
        }
        Ok(())
    }
}

/// Configuration of a `DataTable`.
#[derive(Clone)]
pub struct Options {
    pub page_size: usize,
    /// Number of page links in the paging window.
    pub pages_shown: usize,
    pub sort: SortSpec,
    pub sort_key: Option<String>,
    pub sort_dir: SortDirection,
    pub identify: Identify,
    pub filters: Vec<(String, FilterKind)>,
    /// Hide select options that no filtered record carries.
    pub auto_narrow: bool,
    /// Skip numeric column coercion on ingestion.
    pub force_strings: bool,
    pub on_page_change: Option<PageChangeHook>,
    pub retry: RetryPolicy,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            page_size: DEFAULT_PAGE_SIZE,
            pages_shown: DEFAULT_PAGES_SHOWN,
            sort: SortSpec::Disabled,
            sort_key: None,
            sort_dir: SortDirection::Asc,
            identify: Identify::Disabled,
            filters: Vec::new(),
            auto_narrow: false,
            force_strings: false,
            on_page_change: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Options::default()
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn pages_shown(mut self, pages_shown: usize) -> Self {
        self.pages_shown = pages_shown;
        self
    }

    pub fn sort(mut self, spec: SortSpec) -> Self {
        self.sort = spec;
        self
    }

    pub fn sort_by(mut self, key: impl Into<String>, dir: SortDirection) -> Self {
        self.sort_key = Some(key.into());
        self.sort_dir = dir;
        self
    }

    pub fn identify(mut self, identify: Identify) -> Self {
        self.identify = identify;
        self
    }

    pub fn filter(mut self, field: impl Into<String>, kind: FilterKind) -> Self {
        self.filters.push((field.into(), kind));
        self
    }

    pub fn auto_narrow(mut self, enabled: bool) -> Self {
        self.auto_narrow = enabled;
        self
    }

    pub fn force_strings(mut self, enabled: bool) -> Self {
        self.force_strings = enabled;
        self
    }

    pub fn on_page_change<F>(mut self, hook: F) -> Self
    where
        F: Fn(usize, usize) + 'static,
    {
        self.on_page_change = Some(Rc::new(hook));
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::InvalidConfig("page size must be positive".to_string()));
        }
        if self.pages_shown == 0 {
            return Err(Error::InvalidConfig("number of page links must be positive".to_string()));
        }
        self.retry.validate()
    }

    /// Build options from plain settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let options = Options {
            page_size: settings.page_size,
            pages_shown: settings.pages_shown,
            sort: settings.sort.to_spec()?,
            sort_key: settings.sort_key.clone(),
            sort_dir: settings.sort_dir,
            identify: settings.identify.to_identify(),
            filters: settings
                .filters
                .iter()
                .map(|f| (f.field().to_string(), f.to_kind()))
                .collect(),
            auto_narrow: settings.auto_narrow,
            force_strings: settings.force_strings,
            on_page_change: None,
            retry: settings.retry.clone(),
        };
        options.validate()?;
        Ok(options)
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("page_size", &self.page_size)
            .field("pages_shown", &self.pages_shown)
            .field("sort", &self.sort)
            .field("sort_key", &self.sort_key)
            .field("sort_dir", &self.sort_dir)
            .field("identify", &self.identify)
            .field("filters", &self.filters)
            .field("auto_narrow", &self.auto_narrow)
            .field("force_strings", &self.force_strings)
            .field("on_page_change", &self.on_page_change.as_ref().map(|_| "<fn>"))
            .field("retry", &self.retry)
            .finish()
    }
}

/// Sort configuration as plain data: `false`, `true` / `"*"` (every column),
/// or a list of `{ "field": .., "enabled": .. }` entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SortSetting {
    Enabled(bool),
    Keyword(String),
    Columns(Vec<SortColumnSetting>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortColumnSetting {
    pub field: String,
    #[serde(default = "enabled")]
    pub enabled: bool,
}

fn enabled() -> bool {
    true
}

impl Default for SortSetting {
    fn default() -> Self {
        SortSetting::Enabled(false)
    }
}

impl SortSetting {
    pub fn to_spec(&self) -> Result<SortSpec> {
        match self {
            SortSetting::Enabled(false) => Ok(SortSpec::Disabled),
            SortSetting::Enabled(true) => Ok(SortSpec::All),
            SortSetting::Keyword(k) if k == "*" => Ok(SortSpec::All),
            SortSetting::Keyword(k) => Err(Error::InvalidConfig(format!(
                "unknown sort keyword '{}'",
                k
            ))),
            SortSetting::Columns(columns) => Ok(SortSpec::columns(columns.iter().map(|c| {
                let sort = if c.enabled {
                    ColumnSort::Default
                } else {
                    ColumnSort::Disabled
                };
                (c.field.clone(), sort)
            }))),
        }
    }
}

/// Identification as plain data: `false`, `true` (position is the id), or a
/// field name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdentifySetting {
    Enabled(bool),
    Field(String),
}

impl Default for IdentifySetting {
    fn default() -> Self {
        IdentifySetting::Enabled(false)
    }
}

impl IdentifySetting {
    pub fn to_identify(&self) -> Identify {
        match self {
            IdentifySetting::Enabled(false) => Identify::Disabled,
            IdentifySetting::Enabled(true) => Identify::PositionIsId,
            IdentifySetting::Field(field) => Identify::by_field(field.clone()),
        }
    }
}

/// One select option: a bare value or `{ value, label, group }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionSetting {
    Value(String),
    Labeled {
        value: String,
        label: Option<String>,
        group: Option<String>,
    },
}

impl OptionSetting {
    fn to_option(&self) -> SelectOption {
        match self {
            OptionSetting::Value(value) => SelectOption::new(value.clone()),
            OptionSetting::Labeled { value, label, group } => SelectOption {
                value: value.clone(),
                label: label.clone().unwrap_or_else(|| value.clone()),
                group: group.clone(),
            },
        }
    }
}

/// Filter configuration as plain data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FilterSetting {
    Text {
        field: String,
    },
    Regexp {
        field: String,
    },
    Select {
        field: String,
        /// Absent means options are derived from the data.
        #[serde(default)]
        values: Option<Vec<OptionSetting>>,
        #[serde(default)]
        multiple: bool,
        /// Label of the "show all" option.
        #[serde(default)]
        empty: Option<String>,
        #[serde(default)]
        default: Vec<String>,
    },
}

impl FilterSetting {
    pub fn field(&self) -> &str {
        match self {
            FilterSetting::Text { field }
            | FilterSetting::Regexp { field }
            | FilterSetting::Select { field, .. } => field,
        }
    }

    pub fn to_kind(&self) -> FilterKind {
        match self {
            FilterSetting::Text { .. } => FilterKind::Text,
            FilterSetting::Regexp { .. } => FilterKind::Regex,
            FilterSetting::Select {
                values,
                multiple,
                empty,
                default,
                ..
            } => FilterKind::Select(SelectFilter {
                values: match values {
                    Some(options) => {
                        SelectValues::Options(options.iter().map(OptionSetting::to_option).collect())
                    }
                    None => SelectValues::Auto,
                },
                multiple: *multiple,
                empty: if *multiple { None } else { empty.clone() },
                default: default.clone(),
                predicate: None,
            }),
        }
    }
}

/// Serde-loadable table configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub page_size: usize,
    pub pages_shown: usize,
    pub sort: SortSetting,
    pub sort_key: Option<String>,
    pub sort_dir: SortDirection,
    pub identify: IdentifySetting,
    pub filters: Vec<FilterSetting>,
    pub auto_narrow: bool,
    pub force_strings: bool,
    pub remote: Option<RemoteSource>,
    pub retry: RetryPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            page_size: DEFAULT_PAGE_SIZE,
            pages_shown: DEFAULT_PAGES_SHOWN,
            sort: SortSetting::default(),
            sort_key: None,
            sort_dir: SortDirection::Asc,
            identify: IdentifySetting::default(),
            filters: Vec::new(),
            auto_narrow: false,
            force_strings: false,
            remote: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(json)?;
        if let Some(remote) = &settings.remote {
            remote.validate()?;
        }
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert_eq!(options.page_size, 20);
        assert_eq!(options.pages_shown, 9);
        assert_eq!(options.sort_dir, SortDirection::Asc);
        assert_eq!(RemoteSource::default().timeout_ms, 2000);
    }

    #[test]
    fn test_settings_from_json() {
        let settings = Settings::from_json(
            r#"{
                "page_size": 10,
                "sort": "*",
                "sort_key": "name",
                "sort_dir": "desc",
                "identify": "id",
                "filters": [
                    {"type": "text", "field": "name"},
                    {"type": "select", "field": "color", "values": ["red", {"value": "y", "label": "Yellow"}]}
                ],
                "remote": {"url": "http://localhost:8080/data", "size": 100, "refresh_ms": 30000}
            }"#,
        )
        .unwrap();

        assert_eq!(settings.page_size, 10);
        assert_eq!(settings.pages_shown, 9);
        let remote = settings.remote.clone().unwrap();
        assert_eq!(remote.size, Some(100));
        assert_eq!(remote.timeout_ms, 2000);
        assert_eq!(remote.method, "POST");

        let options = Options::from_settings(&settings).unwrap();
        assert!(matches!(options.sort, SortSpec::All));
        assert_eq!(options.sort_dir, SortDirection::Desc);
        assert_eq!(options.identify.protected_field(), Some("id"));
        assert_eq!(options.filters.len(), 2);
        match &options.filters[1].1 {
            FilterKind::Select(select) => match &select.values {
                SelectValues::Options(values) => assert_eq!(values[1].label, "Yellow"),
                other => panic!("unexpected values {:?}", other),
            },
            other => panic!("unexpected filter {:?}", other),
        }
    }

    #[test]
    fn test_sort_columns_setting() {
        let settings: Settings =
            serde_json::from_str(r#"{"sort": [{"field": "a"}, {"field": "b", "enabled": false}]}"#).unwrap();
        let spec = settings.sort.to_spec().unwrap();
        assert!(spec.is_sortable("a"));
        assert!(!spec.is_sortable("b"));
    }

    #[test]
    fn test_invalid_settings() {
        assert!(matches!(
            Settings::from_json(r#"{"remote": {"url": ""}}"#),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(Settings::from_json("{"), Err(Error::Parse(_))));

        let settings = Settings {
            page_size: 0,
            ..Settings::default()
        };
        assert!(Options::from_settings(&settings).is_err());

        let settings = Settings {
            sort: SortSetting::Keyword("name".into()),
            ..Settings::default()
        };
        assert!(Options::from_settings(&settings).is_err());
    }
}
