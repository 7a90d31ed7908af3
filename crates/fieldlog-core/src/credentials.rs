//! Service-account credential payload handling.
//!
//! The payload usually arrives through an environment variable pasted from a
//! hosting dashboard, so it is cleaned of the usual copy-paste debris before
//! parsing.

use serde::Deserialize;
use thiserror::Error;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("credential payload is empty")]
    Empty,
    #[error("credential payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("credential file {path} could not be read: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
}

/// The fields of a Google service-account key file this service needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    /// PEM-encoded PKCS#8 RSA key.
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountKey {
    /// Clean and parse an inline payload.
    pub fn from_payload(raw: &str) -> Result<Self, CredentialsError> {
        let cleaned = clean_payload(raw).ok_or(CredentialsError::Empty)?;
        Ok(serde_json::from_str(cleaned)?)
    }

    /// Read and parse a key file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, CredentialsError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CredentialsError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_payload(&raw)
    }
}

/// Strip surrounding whitespace, a leading BOM and one pair of wrapping
/// single quotes. `None` if nothing is left.
pub fn clean_payload(raw: &str) -> Option<&str> {
    let mut s = raw.trim();
    s = s.strip_prefix('\u{feff}').unwrap_or(s).trim();
    if s.len() >= 2 && s.starts_with('\'') && s.ends_with('\'') {
        s = s[1..s.len() - 1].trim();
    }
    (!s.is_empty()).then_some(s)
}
