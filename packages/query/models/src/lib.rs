#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Parameter sets, parameter keys and binding state types.
//!
//! These types are shared by the transport, the query binding engine and
//! the analytics contract. A [`ParamSet`] is the ordered mapping of named
//! scalar inputs for one query; its [`ParamKey`] is the canonical identity
//! the engine compares to decide whether anything relevant changed.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single scalar query parameter.
///
/// Only primitives are allowed. Booleans are deliberately absent: none of
/// the analytics parameters are boolean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Integer value (years, page numbers, limits, ids).
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// String value, passed verbatim.
    Str(String),
}

impl ParamValue {
    /// Single-character type tag used inside a [`ParamKey`] so that `1`
    /// and `"1"` produce different keys.
    const fn tag(&self) -> char {
        match self {
            Self::Int(_) => 'i',
            Self::Float(_) => 'f',
            Self::Str(_) => 's',
        }
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => f.write_str(v),
        }
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ParamValue {
                fn from(value: $ty) -> Self {
                    Self::Int(i64::from(value))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for ParamValue {
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<&String> for ParamValue {
    fn from(value: &String) -> Self {
        Self::Str(value.clone())
    }
}

/// Ordered mapping of named scalar query inputs.
///
/// Absent values are never stored: inserting `None` through
/// [`insert_opt`](Self::insert_opt) removes the key, so `{start_year: 2001}`
/// and `{start_year: 2001, end_year: None}` are the same set. Equality is
/// independent of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamSet {
    entries: BTreeMap<String, ParamValue>,
}

impl ParamSet {
    /// Creates an empty parameter set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Sets `name` to `value`, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.entries.insert(name.into(), value.into());
    }

    /// Sets `name` to `value` when present; `None` removes `name`.
    pub fn insert_opt<V: Into<ParamValue>>(&mut self, name: impl Into<String>, value: Option<V>) {
        let name = name.into();
        match value {
            Some(value) => {
                self.entries.insert(name, value.into());
            }
            None => {
                self.entries.remove(&name);
            }
        }
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Builder form of [`insert_opt`](Self::insert_opt).
    #[must_use]
    pub fn with_opt<V: Into<ParamValue>>(mut self, name: impl Into<String>, value: Option<V>) -> Self {
        self.insert_opt(name, value);
        self
    }

    /// Returns the value stored under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries.get(name)
    }

    /// Iterates entries in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of defined entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Derives the canonical key of this set.
    #[must_use]
    pub fn key(&self) -> ParamKey {
        ParamKey::from_params(self)
    }
}

impl<'a> IntoIterator for &'a ParamSet {
    type Item = (&'a String, &'a ParamValue);
    type IntoIter = std::collections::btree_map::Iter<'a, String, ParamValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for ParamSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}

/// Canonical, order-independent identity of a parameter set.
///
/// Rendered as `name=t:value` pairs joined by `&` in ascending name order,
/// where `t` is a type tag. `%`, `&` and `=` inside names and string values
/// are escaped so distinct sets never render to the same token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamKey(String);

impl ParamKey {
    /// Builds the key for `params`.
    #[must_use]
    pub fn from_params(params: &ParamSet) -> Self {
        let mut out = String::new();
        for (i, (name, value)) in params.iter().enumerate() {
            if i > 0 {
                out.push('&');
            }
            escape_into(&mut out, name);
            out.push('=');
            out.push(value.tag());
            out.push(':');
            match value {
                ParamValue::Str(s) => escape_into(&mut out, s),
                other => {
                    let _ = write!(out, "{other}");
                }
            }
        }
        Self(out)
    }

    /// Builds a key scoped to a request path, so that path parameters take
    /// part in change detection alongside the query parameters.
    #[must_use]
    pub fn scoped(path: &str, params: &ParamSet) -> Self {
        let mut out = String::with_capacity(path.len() + 1);
        escape_into(&mut out, path);
        out.push('?');
        out.push_str(&Self::from_params(params).0);
        Self(out)
    }

    /// The canonical token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ParamKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn escape_into(out: &mut String, raw: &str) {
    for c in raw.chars() {
        match c {
            '%' => out.push_str("%25"),
            '&' => out.push_str("%26"),
            '=' => out.push_str("%3D"),
            '?' => out.push_str("%3F"),
            _ => out.push(c),
        }
    }
}

/// Per-binding request counter.
///
/// Every request a binding issues gets a strictly greater generation than
/// the ones before it. [`Generation::ZERO`] means nothing was issued yet.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Generation(u64);

impl Generation {
    /// Generation of a binding that has not issued any request.
    pub const ZERO: Self = Self(0);

    /// The generation following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Raw counter value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// State machine phase of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPhase {
    /// Created but never activated.
    Idle,
    /// A request for the current generation is in flight.
    Loading,
    /// The current generation completed successfully.
    SettledOk,
    /// The current generation failed.
    SettledErr,
}

/// What a view should render for a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryView {
    /// No data and no error yet; a request is running.
    Loading,
    /// No usable data; only an error can be shown.
    Error,
    /// Data is available. `stale_error` is set when the most recent
    /// request failed and the data is the last known good value.
    Data {
        /// Whether an error banner should accompany the data.
        stale_error: bool,
    },
    /// Nothing issued yet.
    Empty,
}

/// Snapshot of a binding's `{data, loading, error}` state.
#[derive(Debug)]
pub struct QueryState<T, E> {
    /// Last successfully applied response.
    pub data: Option<Arc<T>>,
    /// Error of the most recently applied failed response. Cleared by the
    /// next applied success.
    pub error: Option<Arc<E>>,
    /// Whether the current generation is still in flight.
    pub loading: bool,
    /// Generation of the most recently issued request.
    pub generation: Generation,
    /// Generation whose outcome `data`/`error` reflect.
    pub settled_generation: Generation,
}

impl<T, E> Clone for QueryState<T, E> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            error: self.error.clone(),
            loading: self.loading,
            generation: self.generation,
            settled_generation: self.settled_generation,
        }
    }
}

impl<T, E> Default for QueryState<T, E> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            loading: false,
            generation: Generation::ZERO,
            settled_generation: Generation::ZERO,
        }
    }
}

impl<T, E> QueryState<T, E> {
    /// Current state machine phase.
    #[must_use]
    pub const fn phase(&self) -> QueryPhase {
        if self.loading {
            QueryPhase::Loading
        } else if self.generation.value() == 0 {
            QueryPhase::Idle
        } else if self.error.is_some() {
            QueryPhase::SettledErr
        } else {
            QueryPhase::SettledOk
        }
    }

    /// Whether the state reflects the outcome of the latest request.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !self.loading && self.generation.value() > 0
    }

    /// Rendering decision for this state.
    #[must_use]
    pub const fn view(&self) -> QueryView {
        match (&self.data, &self.error) {
            (Some(_), err) => QueryView::Data {
                stale_error: err.is_some(),
            },
            (None, Some(_)) => QueryView::Error,
            (None, None) if self.loading => QueryView::Loading,
            (None, None) => QueryView::Empty,
        }
    }
}

/// A response that reached the client but does not match its schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    /// A required field is absent.
    #[error("{query}: missing field: {field}")]
    MissingField {
        /// Query whose response was rejected.
        query: &'static str,
        /// Field path or serde message.
        field: String,
    },

    /// A field is present but has the wrong type or an out-of-range value.
    #[error("{query}: invalid field {field}: {message}")]
    InvalidField {
        /// Query whose response was rejected.
        query: &'static str,
        /// Field path.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Individually valid fields violate a cross-field invariant.
    #[error("{query}: invariant violated: {message}")]
    Invariant {
        /// Query whose response was rejected.
        query: &'static str,
        /// Description of the violated invariant.
        message: String,
    },

    /// The caller supplied an unusable parameter combination.
    #[error("invalid parameters: {message}")]
    InvalidParams {
        /// Description of the problem.
        message: String,
    },
}

impl ContractError {
    /// Maps a `serde_json` decoding failure of `query`'s response.
    #[must_use]
    pub fn from_serde(query: &'static str, err: &serde_json::Error) -> Self {
        let message = err.to_string();
        if let Some(rest) = message.strip_prefix("missing field `") {
            let field = rest.split('`').next().unwrap_or(rest).to_owned();
            return Self::MissingField { query, field };
        }
        Self::InvalidField {
            query,
            field: format!("line {} column {}", err.line(), err.column()),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_and_explicit_none_produce_equal_keys() {
        let a = ParamSet::new().with("start_year", 2001);
        let b = ParamSet::new()
            .with("start_year", 2001)
            .with_opt::<i64>("end_year", None);
        assert_eq!(a, b);
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn key_is_independent_of_insertion_order() {
        let a = ParamSet::new().with("page", 2).with("limit", 10);
        let b = ParamSet::new().with("limit", 10).with("page", 2);
        assert_eq!(a.key(), b.key());
        assert_eq!(a.key().as_str(), "limit=i:10&page=i:2");
    }

    #[test]
    fn key_distinguishes_numbers_from_strings() {
        let a = ParamSet::new().with("id", 1);
        let b = ParamSet::new().with("id", "1");
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn key_escapes_separators_inside_strings() {
        let a = ParamSet::new().with("location", "a&b=c");
        let b = ParamSet::new().with("location", "a").with("b", "c");
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn insert_none_removes_existing_value() {
        let mut set = ParamSet::new().with("limit", 5);
        set.insert_opt::<i64>("limit", None);
        assert!(set.is_empty());
    }

    #[test]
    fn scoped_key_includes_path() {
        let params = ParamSet::new().with("limit", 10);
        assert_ne!(
            ParamKey::scoped("/topics/1/keywords", &params),
            ParamKey::scoped("/topics/2/keywords", &params)
        );
    }

    #[test]
    fn float_values_render_without_locale_formatting() {
        assert_eq!(ParamValue::from(1234.5).to_string(), "1234.5");
        assert_eq!(ParamValue::from(1_000_000).to_string(), "1000000");
    }

    #[test]
    fn generation_is_monotonic() {
        let g0 = Generation::ZERO;
        let g1 = g0.next();
        let g2 = g1.next();
        assert!(g0 < g1 && g1 < g2);
        assert_eq!(g2.value(), 2);
    }

    #[test]
    fn view_prefers_data_over_error() {
        let state: QueryState<u32, String> = QueryState {
            data: Some(Arc::new(1)),
            error: Some(Arc::new("boom".to_owned())),
            loading: false,
            generation: Generation::ZERO.next().next(),
            settled_generation: Generation::ZERO.next().next(),
        };
        assert_eq!(state.view(), QueryView::Data { stale_error: true });
        assert_eq!(state.phase(), QueryPhase::SettledErr);
    }

    #[test]
    fn view_without_data_shows_loading_then_error() {
        let mut state: QueryState<u32, String> = QueryState::default();
        assert_eq!(state.view(), QueryView::Empty);
        assert_eq!(state.phase(), QueryPhase::Idle);

        state.loading = true;
        state.generation = Generation::ZERO.next();
        assert_eq!(state.view(), QueryView::Loading);

        state.loading = false;
        state.error = Some(Arc::new("down".to_owned()));
        assert_eq!(state.view(), QueryView::Error);
    }

    #[test]
    fn settled_requires_an_issued_request() {
        let mut state: QueryState<u32, String> = QueryState::default();
        assert!(!state.is_settled());

        state.loading = true;
        state.generation = Generation::ZERO.next();
        assert!(!state.is_settled());

        state.loading = false;
        state.settled_generation = state.generation;
        assert!(state.is_settled());
    }

    #[test]
    fn missing_field_is_extracted_from_serde_message() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Summary {
            total: u64,
        }
        let err = serde_json::from_value::<Summary>(serde_json::json!({})).unwrap_err();
        assert_eq!(
            ContractError::from_serde("summary", &err),
            ContractError::MissingField {
                query: "summary",
                field: "total".to_owned(),
            }
        );
    }
}
