//! Ordered request parameters.

use crate::errors::{ConfigSetError, Result};

pub const ACTION: &str = "action";
pub const NAME: &str = "name";
pub const BASE_CONFIGSET: &str = "baseConfigSet";
pub const FILE_PATH: &str = "filePath";
pub const OVERWRITE: &str = "overwrite";
pub const CLEANUP: &str = "cleanup";

/// Parameters whose key starts with this prefix (plus a `.`) are copied onto a
/// created configset as property overrides.
pub const PROPERTY_PREFIX: &str = "configSetProp";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Params {
    pairs: Vec<(String, String)>,
}

impl Params {
    pub fn from_query(query: &str) -> Self {
        Params {
            pairs: url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Params {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Value for `key`, rejecting both absent and blank values.
    pub fn required(&self, key: &str) -> Result<&str> {
        match self.get(key) {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(ConfigSetError::bad_request(format!(
                "Missing required parameter: {key}"
            ))),
        }
    }

    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        let Some(value) = self.get(key) else {
            return Ok(default);
        };

        match value.to_ascii_lowercase().as_str() {
            "true" | "on" | "yes" => Ok(true),
            "false" | "off" | "no" => Ok(false),
            _ => Err(ConfigSetError::bad_request(format!(
                "Invalid boolean value '{value}' for parameter {key}"
            ))),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn to_query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_query() {
        let params = Params::from_query("action=CREATE&name=my%20set&name=second&flag");
        assert_eq!(params.get(ACTION), Some("CREATE"));
        assert_eq!(params.get(NAME), Some("my set"));
        assert_eq!(params.get("flag"), Some(""));
        assert_eq!(params.get("missing"), None);
        assert_eq!(params.get_or(BASE_CONFIGSET, "_default"), "_default");
    }

    #[test]
    fn test_required() {
        let params = Params::from_pairs([(NAME, "  ")]);
        let err = params.required(NAME).unwrap_err();
        assert!(matches!(err, ConfigSetError::BadRequest(_)));
        assert_eq!(err.to_string(), "Missing required parameter: name");

        let params = Params::from_pairs([(NAME, "conf")]);
        assert_eq!(params.required(NAME).unwrap(), "conf");
    }

    #[test]
    fn test_get_bool() {
        let params = Params::from_pairs([(OVERWRITE, "TRUE"), (CLEANUP, "off"), ("bad", "maybe")]);
        assert!(params.get_bool(OVERWRITE, false).unwrap());
        assert!(!params.get_bool(CLEANUP, true).unwrap());
        assert!(params.get_bool("absent", true).unwrap());
        assert!(matches!(
            params.get_bool("bad", false),
            Err(ConfigSetError::BadRequest(_))
        ));
    }

    #[test]
    fn test_query_string_roundtrip() {
        let params = Params::from_pairs([(ACTION, "LIST"), (NAME, "a b")]);
        assert_eq!(params.to_query_string(), "action=LIST&name=a+b");
        assert_eq!(Params::from_query(&params.to_query_string()), params);
    }
}
