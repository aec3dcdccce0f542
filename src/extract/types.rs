// src/extract/types.rs
use crate::error::FetchError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertRecord {
    pub source_id: String,   // portal identifier, e.g. "olx"
    pub external_id: String, // dedup key within the portal
    pub title: String,
    pub url: String,
    pub price: Option<String>,
}

/// Turns one configured target into the adverts currently listed there.
///
/// Each call fetches and parses from scratch; nothing is cached between calls.
#[async_trait::async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, portal: &str, target: &str) -> Result<Vec<AdvertRecord>, FetchError>;
}
