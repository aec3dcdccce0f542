// src/extract/portals/mod.rs
//! Per-portal parse rules and the table that selects them.
//!
//! A rule only maps page content to adverts; fetching is shared by
//! [`crate::extract::PageExtractor`]. To support a new portal, implement
//! [`PortalRule`] in its own module and register it in
//! [`PortalRegistry::builtin`].

pub mod olx;
pub mod otodom;
pub mod rss;

use std::collections::BTreeMap;

use reqwest::Url;

use crate::error::ParseError;
use crate::extract::types::AdvertRecord;

/// Result of parsing one page: the usable adverts plus the listings skipped.
#[derive(Debug, Default)]
pub struct ParsedPage {
    pub adverts: Vec<AdvertRecord>,
    pub skipped: Vec<ParseError>,
}

impl ParsedPage {
    pub fn push(&mut self, item: Result<AdvertRecord, ParseError>) {
        match item {
            Ok(ad) => self.adverts.push(ad),
            Err(e) => self.skipped.push(e),
        }
    }
}

pub trait PortalRule: Send + Sync {
    /// Identifier used in the `filters` table of the configuration.
    fn name(&self) -> &'static str;

    /// Parse a fetched page. Must not fail as a whole: a page that does not
    /// look like a listing page yields an empty result.
    fn parse(&self, page: &str, base: &Url) -> ParsedPage;
}

pub struct PortalRegistry {
    rules: BTreeMap<&'static str, Box<dyn PortalRule>>,
}

impl PortalRegistry {
    pub fn empty() -> Self {
        Self {
            rules: BTreeMap::new(),
        }
    }

    pub fn builtin() -> Self {
        let mut reg = Self::empty();
        reg.register(Box::new(olx::OlxRule));
        reg.register(Box::new(otodom::OtodomRule));
        reg.register(Box::new(rss::RssRule));
        reg
    }

    pub fn register(&mut self, rule: Box<dyn PortalRule>) {
        self.rules.insert(rule.name(), rule);
    }

    pub fn get(&self, portal: &str) -> Option<&dyn PortalRule> {
        self.rules.get(portal).map(|r| r.as_ref())
    }

    pub fn contains(&self, portal: &str) -> bool {
        self.rules.contains_key(portal)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.keys().copied()
    }
}

/// Text of the first element under `el` matching `sel`, normalized.
pub(crate) fn first_text(el: &scraper::ElementRef<'_>, sel: &scraper::Selector) -> Option<String> {
    el.select(sel)
        .next()
        .map(|e| crate::extract::normalize_text(&e.text().collect::<Vec<_>>().join(" ")))
        .filter(|s| !s.is_empty())
}
