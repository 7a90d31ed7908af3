use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("row {position} written but not formatted: {source}")]
    Unformatted {
        position: usize,
        source: Box<StoreError>,
    },

    #[error("ledger writer has shut down")]
    WriterClosed,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
