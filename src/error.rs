//! Typed errors for the scan pipeline.
//!
//! Each failure class is contained at the smallest scope that keeps the scan
//! moving: a target, a listing, or a delivery. Only `ConfigError` and store
//! initialization failures are fatal, and only at startup.

use std::path::PathBuf;

use thiserror::Error;

/// Configuration file missing, unreadable, or semantically invalid.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no configuration file found (tried {tried})")]
    NotFound { tried: String },

    #[error("reading config from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// A single target could not be turned into page content.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {target} failed: {source}")]
    Request {
        target: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{target} answered HTTP {status}")]
    Status {
        target: String,
        status: reqwest::StatusCode,
    },

    #[error("invalid target url {target}: {message}")]
    InvalidTarget { target: String, message: String },

    #[error("no parse rule registered for portal {portal:?}")]
    UnknownPortal { portal: String },
}

/// One listing on an otherwise readable page lacked a required field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{portal}: listing #{index} has no usable {field}")]
pub struct ParseError {
    pub portal: &'static str,
    pub index: usize,
    pub field: &'static str,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("advert {source_id}/{external_id} is already stored")]
    Conflict {
        source_id: String,
        external_id: String,
    },

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("preparing database location: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// The webhook did not accept a notification.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("webhook request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("webhook answered HTTP {0}")]
    Status(reqwest::StatusCode),
}
