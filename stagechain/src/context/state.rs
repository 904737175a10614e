//! Run-scoped shared state.

use crate::errors::StageError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The key-value store stages exchange artifacts through.
///
/// Keys are unique and the last writer wins. Reading an unset key yields
/// `None`; a key holding `null` or an empty string is still present.
/// Mutation needs `&mut self`, so only the stage currently holding the
/// pipeline's turn can write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SharedState {
    data: BTreeMap<String, serde_json::Value>,
}

impl SharedState {
    /// Creates a new empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a state from existing entries.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = (String, serde_json::Value)>) -> Self {
        Self {
            data: entries.into_iter().collect(),
        }
    }

    /// Gets a value, or `None` if the key was never written.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Gets a value that the calling stage cannot proceed without.
    ///
    /// # Errors
    ///
    /// Returns `StageError::MissingDependency` if the key is absent.
    pub fn require(&self, key: &str) -> Result<&serde_json::Value, StageError> {
        self.data.get(key).ok_or_else(|| StageError::missing(key))
    }

    /// Decodes a value into a typed shape.
    ///
    /// # Errors
    ///
    /// Returns `StageError::CollaboratorFailure` if the stored value does not
    /// match `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StageError> {
        self.data
            .get(key)
            .map(|value| decode(key, value))
            .transpose()
    }

    /// Decodes a required value into a typed shape.
    ///
    /// # Errors
    ///
    /// Returns `StageError::MissingDependency` if the key is absent, or
    /// `StageError::CollaboratorFailure` if the value does not match `T`.
    pub fn require_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, StageError> {
        decode(key, self.require(key)?)
    }

    /// Checks if a key exists.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Sets a value, returning the one it replaced.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Option<serde_json::Value> {
        let key = key.into();
        tracing::trace!(key = %key, "State key written");
        self.data.insert(key, value)
    }

    /// Serializes and stores a typed value.
    ///
    /// # Errors
    ///
    /// Returns `StageError::CollaboratorFailure` if `value` cannot be
    /// represented as JSON.
    pub fn set_as<T: Serialize>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<Option<serde_json::Value>, StageError> {
        let key = key.into();
        let encoded = serde_json::to_value(value)
            .map_err(|e| StageError::collaborator(format!("encoding state key '{key}'"), e))?;
        Ok(self.set(key, encoded))
    }

    /// Removes a key, returning its value if it was present.
    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.data.remove(key)
    }

    /// Returns an owned, key-ordered copy of every entry.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, serde_json::Value> {
        self.data.clone()
    }

    /// Returns all keys in order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.data.keys().cloned().collect()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the state is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

fn decode<T: DeserializeOwned>(key: &str, value: &serde_json::Value) -> Result<T, StageError> {
    T::deserialize(value)
        .map_err(|e| StageError::collaborator(format!("decoding state key '{key}'"), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_set_and_get() {
        let mut state = SharedState::new();
        state.set("key", json!("value"));

        assert_eq!(state.get("key"), Some(&json!("value")));
        assert!(state.contains("key"));
        assert!(!state.contains("other"));
    }

    #[test]
    fn test_get_missing_is_absent() {
        let state = SharedState::new();
        assert_eq!(state.get("nope"), None);
    }

    #[test]
    fn test_null_and_empty_are_present() {
        let mut state = SharedState::new();
        state.set("null", serde_json::Value::Null);
        state.set("empty", json!(""));

        assert_eq!(state.get("null"), Some(&serde_json::Value::Null));
        assert!(state.require("empty").is_ok());
    }

    #[test]
    fn test_last_writer_wins() {
        let mut state = SharedState::new();
        assert_eq!(state.set("k", json!(1)), None);
        assert_eq!(state.set("k", json!(2)), Some(json!(1)));
        assert_eq!(state.get("k"), Some(&json!(2)));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_require_missing() {
        let state = SharedState::new();
        assert_eq!(state.require("x").unwrap_err(), StageError::missing("x"));
    }

    #[test]
    fn test_typed_access() {
        let mut state = SharedState::new();
        state.set_as("paths", &vec!["a.csv", "b.csv"]).unwrap();

        let paths: Vec<String> = state.require_as("paths").unwrap();
        assert_eq!(paths, vec!["a.csv".to_string(), "b.csv".to_string()]);
        assert_eq!(state.get_as::<Vec<String>>("missing").unwrap(), None);
    }

    #[test]
    fn test_typed_access_mismatch() {
        let mut state = SharedState::new();
        state.set("n", json!("not a number"));

        let err = state.get_as::<u32>("n").unwrap_err();
        assert_eq!(err.kind(), "collaborator_failure");
    }

    #[test]
    fn test_snapshot_is_ordered_copy() {
        let mut state = SharedState::new();
        state.set("b", json!(2));
        state.set("a", json!(1));

        let snapshot = state.snapshot();
        state.set("c", json!(3));

        assert_eq!(snapshot.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(state.keys(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_remove() {
        let mut state = SharedState::new();
        state.set("k", json!(true));
        assert_eq!(state.remove("k"), Some(json!(true)));
        assert!(state.is_empty());
    }
}
