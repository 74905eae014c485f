//! Types shared across the AUM crates.
//!
//! This crate carries the workspace error type and the logging bootstrap.
//! It stays dependency-light so every other crate can depend on it.
//!
//! - [`AumError`] and [`Result`]: shared error handling
//! - [`observability`]: centralised tracing/logging initialisation
//!
//! # Examples
//!
//! ```rust
//! use aum_common::AumError;
//! use uuid::Uuid;
//!
//! let id = Uuid::nil();
//! let err = AumError::CompanyNotFound(id);
//! assert!(err.to_string().contains("00000000"));
//! ```
use uuid::Uuid;

pub mod observability;

/// Error types used across the AUM pipeline.
#[derive(thiserror::Error, Debug)]
pub enum AumError {
    /// The completion step failed to produce a usable answer.
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// A collaborator (browser, persistence, etc.) reported an error.
    #[error("External collaborator error: {0}")]
    External(#[from] anyhow::Error),

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A referenced company could not be located.
    #[error("Company not found: {0}")]
    CompanyNotFound(Uuid),

    /// No company carries the requested name.
    #[error("No company named {0:?}")]
    UnknownCompanyName(String),

    /// The completion provider answered outside the agreed response shape.
    #[error("Completion contract violated: {0}")]
    ContractViolation(String),

    /// Operation exceeded the configured timeout.
    #[error("Timeout occurred")]
    Timeout,
}

/// Convenient alias for results that use [`AumError`].
pub type Result<T> = std::result::Result<T, AumError>;
