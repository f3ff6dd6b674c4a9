//! Mapping secret data onto environment variable assignments.

use crate::{Result, VaultEnvError};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::env;
use tracing::debug;
use vaultenv_core::{ExportSpec, SecretResponse};

/// Whether the number of export mappings must match the secret's fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportPolicy {
    /// One mapping per field in the secret, no more, no fewer
    #[default]
    ExactCount,
    /// Any subset of the secret's fields may be mapped
    AllowSubset,
}

/// How resolved assignments are written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `export NAME=value` lines for `eval` in a shell
    ///
    /// Values are written unquoted, so a value containing whitespace or shell
    /// syntax such as `;` breaks the statement under `eval`. Use `dotenv` for
    /// those, or `run`, which never goes through a shell.
    #[default]
    Export,
    /// `NAME="value"` lines in .env syntax
    Dotenv,
    /// A JSON object of name to value
    Json,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Export => "export",
            OutputFormat::Dotenv => "dotenv",
            OutputFormat::Json => "json",
        }
    }
}

/// Ordered environment variable assignments.
///
/// Order is declaration order. When a name is assigned twice the later
/// value wins once applied, as it would in a shell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvAssignments {
    entries: Vec<(String, String)>,
}

impl EnvAssignments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// The value `name` ends up with after all assignments.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value.as_str())
    }

    /// Assigns every entry into this process's environment.
    ///
    /// Child processes spawned afterwards inherit the values. Only the CLI
    /// calls this, once, before it starts any thread or child process.
    pub fn apply_to_process(&self) {
        for (name, value) in &self.entries {
            // SAFETY: the CLI is single-threaded at this point
            unsafe { env::set_var(name, value) };
        }
    }

    /// `export NAME=value` for each entry.
    pub fn export_lines(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|(name, value)| format!("export {}={}", name, value))
            .collect()
    }

    /// Renders all entries in the given format, without a trailing newline.
    pub fn render(&self, format: OutputFormat) -> Result<String> {
        let output = match format {
            OutputFormat::Export => self.export_lines().join("\n"),
            OutputFormat::Dotenv => self
                .entries
                .iter()
                .map(|(name, value)| format!("{}=\"{}\"", name, escape_dotenv(value)))
                .collect::<Vec<_>>()
                .join("\n"),
            OutputFormat::Json => serde_json::to_string_pretty(self)?,
        };
        Ok(output)
    }
}

impl Serialize for EnvAssignments {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl FromIterator<(String, String)> for EnvAssignments {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for EnvAssignments {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

fn escape_dotenv(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '$' => escaped.push_str("\\$"),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Resolves each export mapping against the secret's data, in order.
///
/// Non-string values are rendered in their natural textual form (see
/// [`vaultenv_core::SecretValue`]).
///
/// # Errors
///
/// - [`VaultEnvError::CountMismatch`] under [`ExportPolicy::ExactCount`]
///   when the mapping count differs from the field count; checked before any
///   lookup
/// - [`VaultEnvError::KeyNotFound`] when a mapping names a key that is not in
///   the data
pub fn resolve_exports(
    response: &SecretResponse,
    specs: &[ExportSpec],
    policy: ExportPolicy,
) -> Result<EnvAssignments> {
    if policy == ExportPolicy::ExactCount && specs.len() != response.field_count() {
        return Err(VaultEnvError::CountMismatch {
            specs: specs.len(),
            fields: response.field_count(),
        });
    }

    let mut assignments = EnvAssignments::new();
    for spec in specs {
        let value = response
            .get(&spec.secret_key)
            .ok_or_else(|| VaultEnvError::KeyNotFound {
                key: spec.secret_key.clone(),
            })?;
        assignments.push(spec.env_name.clone(), value.to_string());
    }

    debug!(count = assignments.len(), "Resolved export mappings");
    Ok(assignments)
}

/// Builds `export NAME=value` lines for each mapping, in order.
///
/// Same lookup and policy as [`resolve_exports`].
pub fn build_exports(
    response: &SecretResponse,
    specs: &[ExportSpec],
    policy: ExportPolicy,
) -> Result<Vec<String>> {
    Ok(resolve_exports(response, specs, policy)?.export_lines())
}
