//! Error types for userforge operations.
//!
//! Defines error types for the major subsystems:
//! - User directory (store) access
//! - Remote avatar lookup and image download
//! - Batch preconditions and batch execution

use thiserror::Error;

/// Errors raised by a [`crate::store::UserStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(#[from] sqlx::Error),

    #[error("Duplicate {field}: '{value}' is already registered")]
    Duplicate { field: String, value: String },

    #[error("User {0} not found")]
    UserNotFound(i64),

    #[error("Invalid field definition '{metakey}': {reason}")]
    InvalidField { metakey: String, reason: String },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur while talking to the avatar service or storing images.
#[derive(Debug, Error)]
pub enum AvatarError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Avatar service returned status {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Invalid avatar URL '{0}'")]
    InvalidUrl(String),

    #[error("Response from {url} is not an image (content type '{content_type}')")]
    NotAnImage { url: String, content_type: String },

    #[error("Malformed avatar listing: {0}")]
    MalformedListing(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Conditions that refuse a batch before any work begins.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PreconditionError {
    #[error("This command does not support multisite installations")]
    MultisiteUnsupported,

    #[error("An avatar API key is required (pass --key)")]
    MissingApiKey,
}

/// Errors that end a batch run.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Batch aborted at item {index} ({label}): {reason}")]
    ItemAborted {
        index: usize,
        label: String,
        reason: String,
    },

    #[error("Invalid batch state transition from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },
}
