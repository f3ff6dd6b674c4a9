//! Construction of read requests against the secret store's `/v1/` API.

use crate::{Result, VaultEnvError};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use secrecy::{ExposeSecret, SecretString};
use url::Url;

/// Header the secret store reads the access token from.
pub const TOKEN_HEADER: &str = "x-vault-token";

/// A fully-formed, not yet sent, read request.
#[derive(Debug, Clone)]
pub struct SecretRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
}

/// Builds the URL for a secret path: `{base_url}/v1/{path}`.
///
/// The pieces are concatenated as given; path segments are neither escaped
/// nor normalized. The result must parse as an absolute `http` or `https`
/// URL.
///
/// An empty `base_url` is reported here as [`VaultEnvError::RequestConstruction`],
/// before any connection attempt, rather than as a transport failure when
/// dialing.
pub fn request_url(base_url: &str, path: &str) -> Result<Url> {
    if base_url.chars().any(char::is_whitespace) {
        return Err(VaultEnvError::RequestConstruction(format!(
            "base URL '{}' contains whitespace",
            base_url
        )));
    }

    let raw = format!("{}/v1/{}", base_url, path);
    let url = Url::parse(&raw).map_err(|e| {
        VaultEnvError::RequestConstruction(format!("invalid URL '{}': {}", raw, e))
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(VaultEnvError::RequestConstruction(format!(
            "unsupported scheme '{}' in '{}'",
            scheme, raw
        ))),
    }
}

/// Builds a GET request for `path` carrying `token` in the token header.
///
/// Nothing is sent; a malformed base URL or token fails here, before any
/// network activity.
pub fn build_request(base_url: &str, token: &SecretString, path: &str) -> Result<SecretRequest> {
    let url = request_url(base_url, path)?;

    let mut value = HeaderValue::from_str(token.expose_secret()).map_err(|_| {
        VaultEnvError::RequestConstruction("token is not a valid header value".to_string())
    })?;
    value.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(HeaderName::from_static(TOKEN_HEADER), value);

    Ok(SecretRequest {
        method: Method::GET,
        url,
        headers,
    })
}
