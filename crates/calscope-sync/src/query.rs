//! Query-parameter (de)serialization of the scope facets.
//!
//! [`QueryParams`] holds decoded values. Percent-encoding happens only when
//! parsing or rendering a raw query string.

use std::collections::{BTreeMap, BTreeSet};

use calscope_core::week::{format_iso_date, parse_iso_date, start_of_week};
use calscope_core::{DisplayMode, FocusTarget, focus};
use calscope_settings::{QueryParamNames, SyncSettings};
use calscope_store::normalize_weeks;
use chrono::NaiveDate;
use url::form_urlencoded;

/// Partial query update. `None` removes the parameter.
pub type QueryPatch = BTreeMap<String, Option<String>>;

// ─────────────────────────────────────────────────────────────────────────────
// QueryParams
// ─────────────────────────────────────────────────────────────────────────────

/// The current URL query.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryParams(BTreeMap<String, String>);

impl QueryParams {
    /// Empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Parse an `application/x-www-form-urlencoded` query (a leading `?` is
    /// allowed). Keys without `=` get an empty value. The last repeated key
    /// wins.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self::from_pairs(form_urlencoded::parse(query.as_bytes()).into_owned())
    }

    /// Value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Whether `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the query is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Set a parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let _ = self.0.insert(key.into(), value.into());
    }

    /// Merge a patch: `Some` sets, `None` removes, other keys are kept.
    pub fn apply(&mut self, patch: &QueryPatch) {
        for (key, value) in patch {
            match value {
                Some(value) => {
                    let _ = self.0.insert(key.clone(), value.clone());
                }
                None => {
                    let _ = self.0.remove(key);
                }
            }
        }
    }

    /// Render as a percent-encoded `a=1&b=2`, keys sorted.
    pub fn to_query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.0)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// QueryCodec
// ─────────────────────────────────────────────────────────────────────────────

/// Facet ⇄ parameter mapping with the configured names and delimiter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryCodec {
    names: QueryParamNames,
    delimiter: String,
}

impl QueryCodec {
    /// Create a codec.
    pub fn new(names: QueryParamNames, delimiter: impl Into<String>) -> Self {
        Self {
            names,
            delimiter: delimiter.into(),
        }
    }

    /// Build from sync settings.
    pub fn from_settings(settings: &SyncSettings) -> Self {
        Self::new(
            settings.query_param_names.clone(),
            settings.expanded_delimiter.clone(),
        )
    }

    /// Parameter names.
    pub fn names(&self) -> &QueryParamNames {
        &self.names
    }

    // ── Outbound ────────────────────────────────────────────────────────

    /// `start` entry.
    pub fn start_entry(&self, start: Option<NaiveDate>) -> (String, Option<String>) {
        (self.names.start.clone(), start.map(format_iso_date))
    }

    /// `mode` entry.
    pub fn mode_entry(&self, mode: Option<DisplayMode>) -> (String, Option<String>) {
        (self.names.mode.clone(), mode.map(|m| m.as_str().to_string()))
    }

    /// `focus` entry.
    pub fn focus_entry(&self, target: Option<&FocusTarget>) -> (String, Option<String>) {
        (self.names.focus.clone(), target.map(focus::encode))
    }

    /// `expanded` entry; an empty set removes the parameter.
    pub fn expanded_entry(&self, weeks: &BTreeSet<NaiveDate>) -> (String, Option<String>) {
        let value = (!weeks.is_empty()).then(|| {
            weeks
                .iter()
                .map(|week| format_iso_date(*week))
                .collect::<Vec<_>>()
                .join(&self.delimiter)
        });
        (self.names.expanded.clone(), value)
    }

    // ── Inbound ─────────────────────────────────────────────────────────

    /// Week-aligned start, if the value is a valid date.
    pub fn parse_start(&self, value: &str) -> Option<NaiveDate> {
        parse_iso_date(value).ok().map(start_of_week)
    }

    /// Display mode, if the value is a known wire string.
    pub fn parse_mode(&self, value: &str) -> Option<DisplayMode> {
        DisplayMode::parse(value)
    }

    /// Focus target, if the token decodes.
    pub fn parse_focus(&self, value: &str) -> Option<FocusTarget> {
        focus::decode(Some(value))
    }

    /// Normalized week set. Invalid and empty entries are skipped.
    pub fn parse_expanded(&self, value: &str) -> BTreeSet<NaiveDate> {
        normalize_weeks(
            value
                .split(self.delimiter.as_str())
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .filter_map(|entry| parse_iso_date(entry).ok()),
        )
    }
}

impl Default for QueryCodec {
    fn default() -> Self {
        Self::from_settings(&SyncSettings::default())
    }
}
