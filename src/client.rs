//! Blocking HTTP client for reading secrets.
//!
//! One GET per secret path, no retries, and the transport's default timeout.

use crate::request::{SecretRequest, build_request};
use crate::{Result, VaultEnvError};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use secrecy::SecretString;
use tracing::{debug, instrument, warn};
use vaultenv_core::SecretResponse;

/// Anything secrets can be read from by path.
///
/// The export and extract operations are written against this trait so
/// they do not care whether the data came over HTTP.
pub trait SecretSource {
    /// Reads the secret stored at `path`.
    fn read(&self, path: &str) -> Result<SecretResponse>;
}

/// Client for a Vault-style key/value API.
pub struct VaultClient {
    base_url: String,
    token: SecretString,
    http: Client,
}

impl VaultClient {
    /// Creates a client for the store at `base_url`, authenticating with `token`.
    pub fn new(base_url: impl Into<String>, token: SecretString) -> Result<Self> {
        let http = Client::builder().build()?;

        Ok(Self {
            base_url: base_url.into(),
            token,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends a prepared request and decodes the response.
    ///
    /// # Errors
    ///
    /// - [`VaultEnvError::Transport`] if the request cannot be sent or the
    ///   body cannot be read
    /// - [`VaultEnvError::UnexpectedStatus`] for any status other than 200
    /// - [`VaultEnvError::Decode`] if the body is not a response document
    ///   with a `data` object
    #[instrument(skip_all, fields(url = %request.url))]
    pub fn fetch_secret(&self, request: &SecretRequest) -> Result<SecretResponse> {
        debug!("Sending secret read request");

        let response = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone())
            .send()?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(VaultEnvError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }

        let body = response.text()?;
        let secret: SecretResponse =
            serde_json::from_str(&body).map_err(|e| VaultEnvError::Decode(e.to_string()))?;

        for warning in &secret.warnings {
            warn!(%warning, "Secret store returned a warning");
        }
        debug!(
            request_id = %secret.request_id,
            lease_duration = secret.lease_duration,
            renewable = secret.renewable,
            fields = secret.field_count(),
            "Decoded secret"
        );

        Ok(secret)
    }
}

impl SecretSource for VaultClient {
    fn read(&self, path: &str) -> Result<SecretResponse> {
        let request = build_request(&self.base_url, &self.token, path)?;
        self.fetch_secret(&request)
    }
}
