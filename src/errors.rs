//! Unified error type for the whole crate.
//!
//! Authorization denials are not errors: core operations report them as
//! "no rows affected" (`Ok(None)` or an empty list). Everything here is either
//! invalid input or an infrastructure failure.

use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description
        message: String,
    },

    /// The storage backend rejected or failed a query.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Caller supplied a value that breaks an entity invariant.
    #[error("Validation error: {message}")]
    Validation {
        /// Human-readable description
        message: String,
    },

    /// A price, total or quantity is negative, zero where it must not be, or not finite.
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The offending value
        amount: f64,
    },

    /// An order line referenced a product that does not exist.
    #[error("Product not found: {id}")]
    ProductNotFound {
        /// The product id that was looked up
        id: i64,
    },

    /// I/O failure, usually while reading configuration or snapshots.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Required environment variable missing or not unicode.
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Outbound HTTP call failed (assistant or object storage).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialisation failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Object storage answered with a non-success status.
    #[error("Storage error: {message}")]
    Storage {
        /// Status and body returned by the storage service
        message: String,
    },
}

impl Error {
    /// Shorthand for [`Error::Validation`].
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
