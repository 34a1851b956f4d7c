use thiserror::Error;

/// Failure writing simulated-location state to the backing store.
///
/// Loads never produce this: malformed or missing persisted data always
/// degrades to defaults so the host application keeps running.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write location store: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode location state: {0}")]
    Encode(#[from] serde_json::Error),
}
