//! Match results and extracted path parameters.

use std::fmt;
use std::num::{ParseFloatError, ParseIntError};
use std::str::ParseBoolError;
use std::sync::Arc;

use crate::registry::Route;

/// Stable identifier assigned to a route at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RouteId(pub(crate) u64);

impl RouteId {
    /// Numeric value of the identifier.
    #[must_use]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Path parameters captured by a match.
///
/// Keys are the lower-cased parameter names; values preserve the casing of
/// the request. Entries keep the order in which the matcher bound them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Params {
    entries: Vec<(String, String)>,
}

impl Params {
    /// Get a parameter value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a parameter value parsed as an i32 integer.
    ///
    /// Returns `None` if the parameter doesn't exist.
    /// Returns `Some(Err(_))` if the parameter exists but can't be parsed.
    #[must_use]
    pub fn get_int(&self, name: &str) -> Option<Result<i32, ParseIntError>> {
        self.get(name).map(str::parse)
    }

    /// Get a parameter value parsed as an i64 integer.
    #[must_use]
    pub fn get_i64(&self, name: &str) -> Option<Result<i64, ParseIntError>> {
        self.get(name).map(str::parse)
    }

    /// Get a parameter value parsed as an f64 float.
    #[must_use]
    pub fn get_float(&self, name: &str) -> Option<Result<f64, ParseFloatError>> {
        self.get(name).map(str::parse)
    }

    /// Get a parameter value parsed as a bool, case-insensitively.
    #[must_use]
    pub fn get_bool(&self, name: &str) -> Option<Result<bool, ParseBoolError>> {
        self.get(name).map(|v| v.to_ascii_lowercase().parse())
    }

    /// Number of captured parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all parameters as (name, value) pairs, in binding order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Overwrite an existing entry or append a new one.
    ///
    /// Returns the displaced `(index, value)` when an entry was replaced,
    /// so the matcher can restore it while backtracking.
    pub(crate) fn set(&mut self, name: &str, value: String) -> Option<(usize, String)> {
        match self.entries.iter().position(|(n, _)| n == name) {
            Some(index) => {
                let previous = std::mem::replace(&mut self.entries[index].1, value);
                Some((index, previous))
            }
            None => {
                self.entries.push((name.to_owned(), value));
                None
            }
        }
    }

    /// Append an entry unless the name is already bound.
    pub(crate) fn insert_if_absent(&mut self, name: &str, value: &str) -> bool {
        if self.entries.iter().any(|(n, _)| n == name) {
            return false;
        }
        self.entries.push((name.to_owned(), value.to_owned()));
        true
    }

    pub(crate) fn restore(&mut self, index: usize, previous: String) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.1 = previous;
        }
    }

    pub(crate) fn pop_last(&mut self) {
        self.entries.pop();
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = (&'a str, &'a str);
    type IntoIter = std::iter::Map<
        std::slice::Iter<'a, (String, String)>,
        fn(&'a (String, String)) -> (&'a str, &'a str),
    >;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

/// The outcome of matching a request path against the route table.
///
/// Either a single matched route with its captured parameters, or a miss.
/// A miss may still carry [`best_partial`](Self::best_partial): the deepest
/// routable node seen on the way, useful for "did you mean" diagnostics.
/// A partial is never a match and exposes no parameter bindings.
#[derive(Debug, Clone)]
pub struct MatchOutcome<T> {
    matched: Option<Arc<Route<T>>>,
    params: Params,
    best_partial: Option<Arc<Route<T>>>,
}

impl<T> MatchOutcome<T> {
    pub(crate) fn hit(route: Arc<Route<T>>, params: Params) -> Self {
        Self {
            matched: Some(route),
            params,
            best_partial: None,
        }
    }

    pub(crate) fn miss(best_partial: Option<Arc<Route<T>>>) -> Self {
        Self {
            matched: None,
            params: Params::default(),
            best_partial,
        }
    }

    /// Whether a route matched the request exactly.
    #[must_use]
    pub fn is_match(&self) -> bool {
        self.matched.is_some()
    }

    /// The matched route, if any.
    #[must_use]
    pub fn route(&self) -> Option<&Route<T>> {
        self.matched.as_deref()
    }

    /// The matched route's handler, if any.
    #[must_use]
    pub fn handler(&self) -> Option<&T> {
        self.matched.as_deref().map(Route::handler)
    }

    /// Parameters captured by the match. Empty on a miss.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Consume the outcome, keeping only the parameters.
    #[must_use]
    pub fn into_params(self) -> Params {
        self.params
    }

    /// The deepest routable node passed on the way, reported on a miss.
    ///
    /// Diagnostics only: this is not a match and never exposes bindings.
    #[must_use]
    pub fn best_partial(&self) -> Option<&Route<T>> {
        self.best_partial.as_deref()
    }
}

/// A snapshot of one registered route, for listings and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RouteDescriptor {
    /// Stable identifier of the route.
    pub id: RouteId,
    /// The pattern text as registered.
    pub pattern: String,
    /// Tie-break priority; higher wins.
    pub priority: i32,
    /// Roles the caller attached at registration, passed through untouched.
    pub roles: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Params {
        let mut params = Params::default();
        params.set("id", "42".to_owned());
        params.set("flag", "TRUE".to_owned());
        params.set("ratio", "2.5".to_owned());
        params
    }

    #[test]
    fn typed_getters() {
        let params = sample();
        assert_eq!(params.get("id"), Some("42"));
        assert_eq!(params.get_int("id"), Some(Ok(42)));
        assert_eq!(params.get_i64("id"), Some(Ok(42)));
        assert_eq!(params.get_bool("flag"), Some(Ok(true)));
        assert_eq!(params.get_float("ratio"), Some(Ok(2.5)));
        assert_eq!(params.get("missing"), None);
        assert!(params.get_int("flag").expect("present").is_err());
    }

    #[test]
    fn set_reports_displaced_values() {
        let mut params = Params::default();
        assert_eq!(params.set("a", "1".to_owned()), None);
        assert_eq!(params.set("a", "2".to_owned()), Some((0, "1".to_owned())));
        assert_eq!(params.get("a"), Some("2"));
        params.restore(0, "1".to_owned());
        assert_eq!(params.get("a"), Some("1"));
    }

    #[test]
    fn iteration_preserves_binding_order() {
        let params = sample();
        let names: Vec<&str> = params.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["id", "flag", "ratio"]);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn params_serialize_in_binding_order() {
        let params = sample();
        let json = serde_json::to_value(&params).expect("serializable");
        assert_eq!(json["entries"][0][0], "id");
        assert_eq!(json["entries"][0][1], "42");
    }
}
