//! Error types for vaultenv operations

use thiserror::Error;

// Internal use only
use vaultenv_core::ParseError;

/// The main error type for vaultenv operations
///
/// Every failure aborts the whole invocation: there is no per-path recovery,
/// so callers simply propagate these with `?`.
#[derive(Error, Debug)]
pub enum VaultEnvError {
    #[error("Unable to create request: {0}")]
    RequestConstruction(String),
    #[error("Unable to get response: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Did not get back 200 OK, got {status}")]
    UnexpectedStatus { status: u16 },
    #[error("Unable to decode response body: {0}")]
    Decode(String),
    #[error(
        "You must provide the same amount of eks ({specs}) as values in your secret ({fields})"
    )]
    CountMismatch { specs: usize, fields: usize },
    #[error("Value under key '{key}' is a {found}, expected a string")]
    TypeCoercion { key: String, found: &'static str },
    #[error("Key '{key}' not found in secret data")]
    KeyNotFound { key: String },
    #[error("Invalid export mapping: {0}")]
    InvalidExportSpec(#[from] ParseError),
    #[error(
        "Paths ({paths}), keys ({keys}) and env vars ({env_vars}) must be given the same number of times"
    )]
    MismatchedLists {
        paths: usize,
        keys: usize,
        env_vars: usize,
    },
    #[error("No secrets requested. Pass --eks NAME=key, or --key and --evar for each --path")]
    NothingRequested,
    #[error("Export mappings (--eks) read from exactly one path, got {0}")]
    ExpectedSinglePath(usize),
    #[error(
        "No secret store URL configured.\n\nTo fix this, either:\n  1. Pass --url or set VAULT_ADDR\n  2. Run 'vaultenv config init' to save a default URL"
    )]
    MissingUrl,
    #[error("No token given. Pass --token or set VAULT_TOKEN")]
    MissingToken,
    #[error("No command specified. Usage: vaultenv run [OPTIONS] -- <command> [args...]")]
    NoCommand,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config parsing error: {0}")]
    Config(#[from] toml::de::Error),
    #[error("Config serialization error: {0}")]
    ConfigSer(#[from] toml::ser::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("User interaction error: {0}")]
    Prompt(#[from] inquire::InquireError),
}

/// A type alias for `Result<T, VaultEnvError>`
pub type Result<T> = std::result::Result<T, VaultEnvError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VaultEnvError::CountMismatch { specs: 1, fields: 2 };
        assert_eq!(
            err.to_string(),
            "You must provide the same amount of eks (1) as values in your secret (2)"
        );

        let err = VaultEnvError::UnexpectedStatus { status: 400 };
        assert_eq!(err.to_string(), "Did not get back 200 OK, got 400");
    }

    #[test]
    fn test_from_parse_error() {
        let err: VaultEnvError = ParseError::MissingSeparator("FOO".to_string()).into();
        assert!(matches!(err, VaultEnvError::InvalidExportSpec(_)));
        assert!(err.to_string().contains("'FOO' is not a NAME=key pair"));
    }
}
