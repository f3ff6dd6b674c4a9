//! vaultenv - secrets from a Vault-style key/value store, as environment variables
//!
//! This library reads secrets over the store's HTTP API (`GET /v1/{path}`
//! with an `X-Vault-Token` header) and maps fields of their data onto
//! environment variable names.
//!
//! # Example
//!
//! ```no_run
//! use secrecy::SecretString;
//! use vaultenv::{ExportPolicy, ExportSpec, SecretSource, VaultClient, build_exports};
//!
//! fn main() -> vaultenv::Result<()> {
//!     let token = SecretString::from("roottoken".to_string());
//!     let client = VaultClient::new("http://127.0.0.1:8200", token)?;
//!
//!     let response = client.read("secret/app")?;
//!     let specs: Vec<ExportSpec> = vec!["DB_PASSWORD=password".parse()?];
//!
//!     for line in build_exports(&response, &specs, ExportPolicy::AllowSubset)? {
//!         println!("{}", line);
//!     }
//!     Ok(())
//! }
//! ```

// Internal modules
mod client;
mod config;
mod error;
mod exports;
mod extract;
mod request;

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;

// Public API exports
pub use client::{SecretSource, VaultClient};
pub use config::{ConnectionSettings, GlobalConfig, GlobalDefaults};
pub use error::{Result, VaultEnvError};
pub use exports::{EnvAssignments, ExportPolicy, OutputFormat, build_exports, resolve_exports};
pub use extract::{extract_string, fetch_and_extract};
pub use request::{SecretRequest, TOKEN_HEADER, build_request, request_url};

pub use vaultenv_core::{ExportSpec, ParseError, SecretResponse, SecretValue};
