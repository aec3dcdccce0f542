// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod error;
pub mod store;

// Extraction: per-portal parse rules behind one fetch path
pub mod extract;

// Change detection & notifications
pub mod change_detector;
pub mod notify;

// Orchestration
pub mod scanner;
pub mod shutdown;

// ---- Re-exports for stable public API ----
pub use crate::config::{AppConfig, SourceConfig};
pub use crate::extract::types::{AdvertRecord, Extractor};
pub use crate::notify::Notifier;
pub use crate::scanner::{CycleReport, Mode, Scanner};
pub use crate::store::{AdvertStore, SqliteStore};
