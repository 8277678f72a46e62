use indexmap::IndexMap;
use serde::Serialize;

/// Result values returned to the caller of an action.
pub type Reply = IndexMap<String, serde_json::Value>;

/// The desired mutation handed to the work queue: a flat, ordered string map.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct OperationIntent {
    props: IndexMap<String, String>,
}

impl OperationIntent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the intent with `key` set, replacing any previous value.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.props.get(key).map(String::as_str)
    }

    /// Returns the intent with `key` set unless it already has a value.
    pub fn with_if_absent(self, key: &str, value: &str) -> Self {
        match self.props.contains_key(key) {
            true => self,
            false => self.with(key, value),
        }
    }
}
