/*!
# Substitution Tables

Exact-match mapping from token text to replacement text. Tables are built
once from the built-in defaults plus caller additions and are immutable
afterwards, so a single table can be shared by any number of rules.
*/

use indexmap::IndexMap;

use crate::errors::{Result, UnasyncError};

/// Built-in asynchronous-to-synchronous replacements
///
/// An empty replacement removes the token (and the blanks after it).
pub const DEFAULT_REPLACEMENTS: &[(&str, &str)] = &[
    ("async", ""),
    ("await", ""),
    ("__aenter__", "__enter__"),
    ("__aexit__", "__exit__"),
    ("__aiter__", "__iter__"),
    ("__anext__", "__next__"),
    ("asynccontextmanager", "contextmanager"),
    ("AsyncIterable", "Iterable"),
    ("AsyncIterator", "Iterator"),
    ("AsyncGenerator", "Generator"),
    ("StopAsyncIteration", "StopIteration"),
];

/// Ordered, duplicate-free token replacement table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionTable {
    entries: IndexMap<String, String>,
}

impl SubstitutionTable {
    /// Merge `defaults` with `overrides`.
    ///
    /// Any key seen twice is rejected instead of silently shadowing the
    /// earlier entry.
    pub fn build<D, O, K, V, K2, V2>(defaults: D, overrides: O) -> Result<Self>
    where
        D: IntoIterator<Item = (K, V)>,
        O: IntoIterator<Item = (K2, V2)>,
        K: Into<String>,
        V: Into<String>,
        K2: Into<String>,
        V2: Into<String>,
    {
        let mut entries = IndexMap::new();
        let defaults = defaults.into_iter().map(|(k, v)| (k.into(), v.into()));
        let overrides = overrides.into_iter().map(|(k, v)| (k.into(), v.into()));

        for (key, value) in defaults.chain(overrides) {
            if entries.contains_key(&key) {
                return Err(UnasyncError::Configuration { key });
            }
            entries.insert(key, value);
        }

        Ok(Self { entries })
    }

    /// Built-in defaults plus caller additions
    pub fn with_defaults<O, K, V>(overrides: O) -> Result<Self>
    where
        O: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::build(DEFAULT_REPLACEMENTS.iter().copied(), overrides)
    }

    /// Replacement for a whole token, case-sensitive
    pub fn get(&self, token: &str) -> Option<&str> {
        self.entries.get(token).map(String::as_str)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.entries.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in construction order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Default for SubstitutionTable {
    fn default() -> Self {
        Self {
            entries: DEFAULT_REPLACEMENTS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_loaded_in_order() {
        let table = SubstitutionTable::default();
        assert_eq!(table.len(), DEFAULT_REPLACEMENTS.len());
        assert_eq!(table.get("await"), Some(""));
        assert_eq!(table.get("__aenter__"), Some("__enter__"));
        let keys: Vec<_> = table.iter().map(|(k, _)| k).take(2).collect();
        assert_eq!(keys, vec!["async", "await"]);
    }

    #[test]
    fn overrides_extend_defaults() {
        let table = SubstitutionTable::with_defaults([("ahip", "hip")]).unwrap();
        assert_eq!(table.get("ahip"), Some("hip"));
        assert_eq!(table.get("async"), Some(""));
        assert_eq!(table.len(), DEFAULT_REPLACEMENTS.len() + 1);
    }

    #[test]
    fn override_of_builtin_is_rejected() {
        let err = SubstitutionTable::with_defaults([("await", "yield")]).unwrap_err();
        assert!(matches!(err, UnasyncError::Configuration { ref key } if key == "await"));
    }

    #[test]
    fn duplicate_override_is_rejected() {
        let err = SubstitutionTable::build(
            Vec::<(String, String)>::new(),
            [("a", "b"), ("a", "c")],
        )
        .unwrap_err();
        assert!(matches!(err, UnasyncError::Configuration { ref key } if key == "a"));
    }

    #[test]
    fn lookup_is_exact_and_case_sensitive() {
        let table = SubstitutionTable::default();
        assert!(table.contains("AsyncIterator"));
        assert!(!table.contains("asynciterator"));
        assert!(!table.contains("AsyncIteratorFactory"));
        assert!(!table.contains("awaiting"));
    }
}
