use fieldlog_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Telegram API error: {0}")]
    Telegram(String),
    #[error("service account key rejected: {0}")]
    Key(String),
    #[error("JWT signing failed")]
    Signing,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("bad request URL: {0}")]
    Url(String),
}

impl From<SyncError> for StoreError {
    fn from(e: SyncError) -> Self {
        StoreError::Backend(Box::new(e))
    }
}

/// Turn a non-success response into [`SyncError::Server`].
pub(crate) async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, SyncError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(SyncError::Server {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp)
}
