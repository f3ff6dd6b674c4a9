//! # vaultenv core
//!
//! This crate provides the plain data types shared by the vaultenv library and
//! CLI: the decoded read response of a Vault-style secrets API, the tagged
//! value type stored under its `data` field, and the `NAME=key` export
//! mappings users declare on the command line.
//!
//! Nothing in here performs I/O. Fetching lives in the `vaultenv` crate.
//!
//! ## Response shape
//!
//! A read of `GET /v1/secret/app` returns a document like:
//!
//! ```json
//! {
//!   "request_id": "2d4a7bb4-...",
//!   "lease_id": "",
//!   "lease_duration": 2764800,
//!   "renewable": false,
//!   "data": { "password": "hunter2", "port": 5432 },
//!   "warnings": null,
//!   "wrap_info": null,
//!   "auth": null
//! }
//! ```
//!
//! Only `data` is required; every other field falls back to its default.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A decoded read response from a Vault-style secrets API.
///
/// `data` holds the secret's key/value pairs. The remaining fields are
/// metadata reported by the server; vaultenv logs them but never acts on
/// them (leases are not renewed, wrapped responses are not unwrapped).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecretResponse {
    /// Server-assigned identifier of the request
    #[serde(default, deserialize_with = "null_as_default")]
    pub request_id: String,
    /// Lease identifier, empty for static key/value secrets
    #[serde(default, deserialize_with = "null_as_default")]
    pub lease_id: String,
    /// Lease duration in seconds
    #[serde(default, deserialize_with = "null_as_default")]
    pub lease_duration: u64,
    /// Whether the lease can be renewed
    #[serde(default, deserialize_with = "null_as_default")]
    pub renewable: bool,
    /// The secret's key/value pairs
    pub data: BTreeMap<String, SecretValue>,
    /// Warnings attached to the response by the server
    #[serde(default, deserialize_with = "null_as_default")]
    pub warnings: Vec<String>,
    /// Response wrapping information, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrap_info: Option<Value>,
    /// Authentication block, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<Value>,
}

impl SecretResponse {
    /// Looks up a key in the secret's data.
    pub fn get(&self, key: &str) -> Option<&SecretValue> {
        self.data.get(key)
    }

    /// Number of entries under `data`.
    pub fn field_count(&self) -> usize {
        self.data.len()
    }
}

impl FromStr for SecretResponse {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A JSON value stored under a secret's `data` field.
///
/// Converting a value to text follows one rule set, used everywhere a value
/// is rendered (see the [`fmt::Display`] impl):
///
/// | Variant            | Text                          |
/// |--------------------|-------------------------------|
/// | `String`           | the string itself, unquoted   |
/// | `Number`           | JSON number text as received (`42`, `1.10`) |
/// | `Bool`             | `true` / `false`              |
/// | `Null`             | empty string                  |
/// | `Array` / `Object` | compact JSON text             |
///
/// Callers that only accept strings use [`SecretValue::as_str`] instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum SecretValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<SecretValue>),
    Object(BTreeMap<String, SecretValue>),
}

impl SecretValue {
    /// Returns the inner string when this is a `String`, `None` otherwise.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SecretValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Name of the JSON type, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            SecretValue::Null => "null",
            SecretValue::Bool(_) => "boolean",
            SecretValue::Number(_) => "number",
            SecretValue::String(_) => "string",
            SecretValue::Array(_) => "array",
            SecretValue::Object(_) => "object",
        }
    }
}

impl fmt::Display for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretValue::Null => Ok(()),
            SecretValue::Bool(b) => write!(f, "{}", b),
            SecretValue::Number(n) => write!(f, "{}", n),
            SecretValue::String(s) => f.write_str(s),
            SecretValue::Array(_) | SecretValue::Object(_) => {
                let text = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                f.write_str(&text)
            }
        }
    }
}

impl From<Value> for SecretValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => SecretValue::Null,
            Value::Bool(b) => SecretValue::Bool(b),
            Value::Number(n) => SecretValue::Number(n),
            Value::String(s) => SecretValue::String(s),
            Value::Array(items) => SecretValue::Array(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => {
                SecretValue::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<SecretValue> for Value {
    fn from(value: SecretValue) -> Self {
        match value {
            SecretValue::Null => Value::Null,
            SecretValue::Bool(b) => Value::Bool(b),
            SecretValue::Number(n) => Value::Number(n),
            SecretValue::String(s) => Value::String(s),
            SecretValue::Array(items) => Value::Array(items.into_iter().map(Into::into).collect()),
            SecretValue::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<&str> for SecretValue {
    fn from(s: &str) -> Self {
        SecretValue::String(s.to_string())
    }
}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue::String(s)
    }
}

/// A user-declared mapping from an environment variable name to a key in a
/// secret's data, written on the command line as `NAME=key`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExportSpec {
    /// Environment variable to assign
    pub env_name: String,
    /// Key to read from the secret's data
    pub secret_key: String,
}

impl ExportSpec {
    pub fn new(env_name: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            env_name: env_name.into(),
            secret_key: secret_key.into(),
        }
    }
}

impl FromStr for ExportSpec {
    type Err = ParseError;

    /// Parses a `NAME=key` token.
    ///
    /// The token is trimmed, then split at the first `=`; everything after
    /// it is the key, so `DSN=url=primary` maps `DSN` to the key `url=primary`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        let (name, key) =
            split_pair(token).ok_or_else(|| ParseError::MissingSeparator(token.to_string()))?;

        if name.is_empty() || key.is_empty() {
            return Err(ParseError::EmptyField(token.to_string()));
        }
        if !is_valid_env_name(name) {
            return Err(ParseError::InvalidName(name.to_string()));
        }

        Ok(Self::new(name, key))
    }
}

impl fmt::Display for ExportSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.env_name, self.secret_key)
    }
}

/// Splits a `NAME=key` token at the first `=`.
pub fn split_pair(token: &str) -> Option<(&str, &str)> {
    token.split_once('=')
}

/// Checks that a name is usable as a shell environment variable:
/// `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_valid_env_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }

    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Errors from parsing user-supplied export mappings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Token has no `=` separating name and key
    MissingSeparator(String),
    /// Name or key is empty
    EmptyField(String),
    /// Name is not a valid environment variable identifier
    InvalidName(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::MissingSeparator(token) => {
                write!(f, "'{}' is not a NAME=key pair", token)
            }
            ParseError::EmptyField(token) => {
                write!(f, "'{}' must have both a NAME and a key", token)
            }
            ParseError::InvalidName(name) => {
                write!(f, "'{}' is not a valid environment variable name", name)
            }
        }
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_pair() {
        assert_eq!(split_pair("a=b"), Some(("a", "b")));
        assert_eq!(split_pair("a=b=c"), Some(("a", "b=c")));
        assert_eq!(split_pair("ab"), None);
    }

    #[test]
    fn test_export_spec_from_str() {
        let spec: ExportSpec = "SECRET=value".parse().unwrap();
        assert_eq!(spec, ExportSpec::new("SECRET", "value"));

        // Whitespace around the token is dropped, the key keeps later '='
        let spec: ExportSpec = "  DSN=url=primary \n".parse().unwrap();
        assert_eq!(spec.env_name, "DSN");
        assert_eq!(spec.secret_key, "url=primary");
        assert_eq!(spec.to_string(), "DSN=url=primary");
    }

    #[test]
    fn test_export_spec_errors() {
        assert_eq!(
            "SECRET".parse::<ExportSpec>(),
            Err(ParseError::MissingSeparator("SECRET".to_string()))
        );
        assert_eq!(
            "=value".parse::<ExportSpec>(),
            Err(ParseError::EmptyField("=value".to_string()))
        );
        assert_eq!(
            "SECRET=".parse::<ExportSpec>(),
            Err(ParseError::EmptyField("SECRET=".to_string()))
        );
        assert_eq!(
            "1SECRET=value".parse::<ExportSpec>(),
            Err(ParseError::InvalidName("1SECRET".to_string()))
        );
        assert_eq!(
            "MY-SECRET=value".parse::<ExportSpec>(),
            Err(ParseError::InvalidName("MY-SECRET".to_string()))
        );
    }

    #[test]
    fn test_is_valid_env_name() {
        assert!(is_valid_env_name("FOO"));
        assert!(is_valid_env_name("_foo_1"));
        assert!(!is_valid_env_name(""));
        assert!(!is_valid_env_name("9LIVES"));
        assert!(!is_valid_env_name("FOO BAR"));
    }

    #[test]
    fn test_response_minimal_body() {
        let response: SecretResponse = r#"{"data":{"value1":"foo"}}"#.parse().unwrap();
        assert_eq!(response.get("value1"), Some(&SecretValue::from("foo")));
        assert_eq!(response.field_count(), 1);
        assert!(response.request_id.is_empty());
        assert!(response.warnings.is_empty());
        assert_eq!(response.wrap_info, None);
    }

    #[test]
    fn test_response_full_body() {
        let body = r#"{
            "request_id": "bd0b6a6e-0f5b-4b5c-9e1c-3a2d6f1c9d11",
            "lease_id": "",
            "lease_duration": 2764800,
            "renewable": false,
            "data": {"password": "hunter2", "port": 5432, "tls": true},
            "warnings": null,
            "wrap_info": null,
            "auth": null
        }"#;
        let response: SecretResponse = body.parse().unwrap();
        assert_eq!(response.request_id, "bd0b6a6e-0f5b-4b5c-9e1c-3a2d6f1c9d11");
        assert_eq!(response.lease_duration, 2764800);
        assert!(response.warnings.is_empty());
        assert_eq!(response.field_count(), 3);
        assert_eq!(response.get("port").unwrap().kind(), "number");
    }

    #[test]
    fn test_response_requires_data_object() {
        assert!("{}".parse::<SecretResponse>().is_err());
        assert!(r#"{"data": null}"#.parse::<SecretResponse>().is_err());
        assert!(r#"{"data": ["a", "b"]}"#.parse::<SecretResponse>().is_err());
        assert!("this is not json".parse::<SecretResponse>().is_err());
    }

    #[test]
    fn test_response_warnings() {
        let body = r#"{"data": {}, "warnings": ["Invalid path for a versioned K/V secrets engine."]}"#;
        let response: SecretResponse = body.parse().unwrap();
        assert_eq!(response.warnings.len(), 1);
    }

    #[test]
    fn test_secret_value_display() {
        let body = r#"{"data": {
            "s": "itsasecret",
            "n": 42,
            "f": 1.5,
            "b": true,
            "z": null,
            "a": [1, "two"],
            "o": {"k": "v"}
        }}"#;
        let response: SecretResponse = body.parse().unwrap();
        let text = |key: &str| response.get(key).unwrap().to_string();

        assert_eq!(text("s"), "itsasecret");
        assert_eq!(text("n"), "42");
        assert_eq!(text("f"), "1.5");
        assert_eq!(text("b"), "true");
        assert_eq!(text("z"), "");
        assert_eq!(text("a"), r#"[1,"two"]"#);
        assert_eq!(text("o"), r#"{"k":"v"}"#);
    }

    #[test]
    fn test_number_text_is_kept_verbatim() {
        let body = r#"{"data": {
            "big": 123456789012345678901234567890,
            "f": 1.10,
            "e": 1e3,
            "nested": [18446744073709551616]
        }}"#;
        let response: SecretResponse = body.parse().unwrap();
        let text = |key: &str| response.get(key).unwrap().to_string();

        assert_eq!(text("big"), "123456789012345678901234567890");
        assert_eq!(text("f"), "1.10");
        assert_eq!(text("e"), "1e3");
        assert_eq!(text("nested"), "[18446744073709551616]");
    }

    #[test]
    fn test_secret_value_as_str() {
        assert_eq!(SecretValue::from("foo").as_str(), Some("foo"));
        assert_eq!(SecretValue::Bool(false).as_str(), None);
        assert_eq!(SecretValue::Null.as_str(), None);
    }

    #[test]
    fn test_data_serializes_back_to_json() {
        let response: SecretResponse = r#"{"data":{"user":"admin","port":5432}}"#.parse().unwrap();
        let text = serde_json::to_string(&response.data).unwrap();
        assert_eq!(text, r#"{"port":5432,"user":"admin"}"#);
    }
}
