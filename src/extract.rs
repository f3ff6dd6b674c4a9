//! Reading one key from each of several secret paths.
//!
//! Paths, keys and environment variable names are parallel lists matched by
//! position: `paths[i]` is read, `keys[i]` is looked up in its data, and the
//! value is assigned to `env_vars[i]`. Values must be JSON strings here;
//! nothing is stringified.

use crate::client::SecretSource;
use crate::exports::EnvAssignments;
use crate::{Result, VaultEnvError};
use std::collections::BTreeMap;
use tracing::debug;
use vaultenv_core::{ParseError, SecretValue, is_valid_env_name};

/// Reads every path in order, then extracts the matching key from each.
///
/// Each response's data is serialized back to JSON once it is fetched, and
/// the lookups run over those documents after all reads have finished.
///
/// # Errors
///
/// - [`VaultEnvError::MismatchedLists`] when the three lists differ in
///   length, and [`VaultEnvError::NothingRequested`] when they are empty;
///   both before any read
/// - any error from [`SecretSource::read`]; the first failing path aborts
///   the whole extraction
/// - [`VaultEnvError::KeyNotFound`] when a key is absent from its path's data
/// - [`VaultEnvError::TypeCoercion`] when a value is not a string
pub fn fetch_and_extract(
    source: &dyn SecretSource,
    paths: &[String],
    keys: &[String],
    env_vars: &[String],
) -> Result<EnvAssignments> {
    if paths.len() != keys.len() || keys.len() != env_vars.len() {
        return Err(VaultEnvError::MismatchedLists {
            paths: paths.len(),
            keys: keys.len(),
            env_vars: env_vars.len(),
        });
    }
    if paths.is_empty() {
        return Err(VaultEnvError::NothingRequested);
    }
    if let Some(name) = env_vars.iter().find(|name| !is_valid_env_name(name)) {
        return Err(ParseError::InvalidName(name.clone()).into());
    }

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let response = source.read(path)?;
        documents.push(serde_json::to_string(&response.data)?);
    }

    let mut assignments = EnvAssignments::new();
    for ((document, key), env_var) in documents.iter().zip(keys).zip(env_vars) {
        let value = extract_string(document, key)?;
        assignments.push(env_var.clone(), value);
    }

    debug!(count = assignments.len(), "Extracted values from secret paths");
    Ok(assignments)
}

/// Looks up `key` in a JSON object document and returns its string value.
pub fn extract_string(document: &str, key: &str) -> Result<String> {
    let data: BTreeMap<String, SecretValue> = serde_json::from_str(document)?;
    let value = data.get(key).ok_or_else(|| VaultEnvError::KeyNotFound {
        key: key.to_string(),
    })?;

    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| VaultEnvError::TypeCoercion {
            key: key.to_string(),
            found: value.kind(),
        })
}
