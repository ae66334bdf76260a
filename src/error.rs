//! Error types for catalog sync operations

use thiserror::Error;

/// Unified error type covering the export pipeline end to end.
#[derive(Debug, Error)]
pub enum SyncError {
    /// HTTP request failed (connection, TLS, timeout)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization or parsing failed
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Catalog database operation failed
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Settings file could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A catalog row could not be resolved into a valid product
    #[error("Invalid product: {0}")]
    InvalidProduct(String),

    /// No destination URL has been configured yet
    #[error("Destination URL not configured")]
    NotConfigured,
}

pub type Result<T> = std::result::Result<T, SyncError>;
