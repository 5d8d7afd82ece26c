/// Top-level Technique Lens error type.
///
/// All fallible operations in `lens-core` return [`Result<T, LensError>`](Result).
/// Each variant wraps a domain-specific error enum, allowing callers to
/// match on the error source without losing type information.
#[derive(thiserror::Error, Debug)]
pub enum LensError {
    /// Error from the record store layer (`SQLite` operations, validation).
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Error from a history service (local or remote).
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// Error reading or writing the guest session container.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Error producing or writing an export artifact.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Error in configuration parsing or validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors from the SQLite-backed record store.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// Underlying `SQLite` operation failed.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Schema migration failed (version mismatch or DDL error).
    #[error("Migration failed: {0}")]
    Migration(String),

    /// The connection guard was poisoned by a panicking writer.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A record failed validation before insertion.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// JSON serialization/deserialization of technique lists failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors surfaced by a [`HistoryService`](crate::history::HistoryService).
#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    /// The backing store could not be reached or the query failed.
    /// The payload is diagnostic detail for logs, never for end users.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Network-level failure reaching a remote history endpoint.
    #[error("Network error: {0}")]
    Network(String),

    /// The remote endpoint returned a non-success HTTP status.
    #[error("Remote API error (HTTP {status}): {body}")]
    Status {
        /// HTTP status code from the endpoint.
        status: u16,
        /// Response body text.
        body: String,
    },

    /// The remote response could not be decoded.
    #[error("Response parse error: {0}")]
    Parse(String),
}

/// Errors from the guest session container.
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    /// Stored content is not a valid serialized history array.
    #[error("Malformed local data: {0}")]
    MalformedLocalData(#[from] serde_json::Error),

    /// Filesystem I/O error on a file-backed session.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The in-memory container guard was poisoned.
    #[error("Session container unavailable")]
    Unavailable,
}

/// Errors while exporting history.
#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    /// Records could not be serialized into the requested format.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// The export artifact could not be written.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The PDF document could not be assembled.
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// The requested entry is not part of the loaded history.
    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    /// The format name is not one of `csv` or `pdf`.
    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),
}

/// Errors in configuration parsing and validation.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist at the expected path.
    #[error("Config file not found: {0}")]
    NotFound(String),

    /// Configuration values are present but semantically invalid.
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// Configuration file syntax could not be parsed (TOML error).
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Convenience alias for `Result<T, LensError>`.
pub type Result<T> = std::result::Result<T, LensError>;
