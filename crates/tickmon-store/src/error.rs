/// Errors from loading or saving the rule document.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("rule store: {0}")]
    Io(#[from] std::io::Error),

    /// The document could not be serialized. Deserialization failures are
    /// not errors; a corrupt file falls back to the empty document.
    #[error("rule store: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rule store: failed to move document into place: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Convenience `Result` alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
