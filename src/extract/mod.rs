// src/extract/mod.rs
pub mod portals;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use reqwest::Url;

use crate::error::FetchError;
use crate::extract::portals::PortalRegistry;
use crate::extract::types::{AdvertRecord, Extractor};

/// One-time metrics registration for the extraction side of a scan.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "scan_fetch_errors_total",
            "Targets that could not be fetched."
        );
        describe_counter!(
            "scan_parse_skipped_total",
            "Listings skipped because a required field was missing."
        );
        describe_histogram!("scan_parse_ms", "Page parse time in milliseconds.");
    });
}

/// Normalize scraped text: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // Non-breaking spaces are common in prices ("1 200 zł")
    out = out.replace('\u{00A0}', " ");

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();

    out.trim().to_string()
}

/// Resolve `href` against the page it came from and drop query/fragment, so
/// tracking parameters never change an advert's identity.
pub fn canonical_link(base: &Url, href: &str) -> Option<String> {
    let mut url = base.join(href.trim()).ok()?;
    url.set_query(None);
    url.set_fragment(None);
    Some(url.to_string())
}

/// Fetches targets over HTTP and hands the body to the portal's rule.
pub struct PageExtractor {
    client: reqwest::Client,
    registry: PortalRegistry,
}

impl PageExtractor {
    pub fn new(timeout: Duration, user_agent: Option<&str>) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder().timeout(timeout);
        if let Some(ua) = user_agent {
            builder = builder.user_agent(ua.to_string());
        }
        Ok(Self {
            client: builder.build()?,
            registry: PortalRegistry::builtin(),
        })
    }

    /// Swap the rule table, e.g. to add a portal outside the built-in set.
    pub fn with_registry(mut self, registry: PortalRegistry) -> Self {
        self.registry = registry;
        self
    }

    async fn fetch(&self, target: &str) -> Result<String, FetchError> {
        let resp = self
            .client
            .get(target)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                target: target.to_string(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                target: target.to_string(),
                status,
            });
        }

        resp.text().await.map_err(|source| FetchError::Request {
            target: target.to_string(),
            source,
        })
    }

    async fn extract_page(
        &self,
        portal: &str,
        target: &str,
    ) -> Result<Vec<AdvertRecord>, FetchError> {
        let rule = self
            .registry
            .get(portal)
            .ok_or_else(|| FetchError::UnknownPortal {
                portal: portal.to_string(),
            })?;
        let base = Url::parse(target).map_err(|e| FetchError::InvalidTarget {
            target: target.to_string(),
            message: e.to_string(),
        })?;

        let body = self.fetch(target).await?;

        let t0 = std::time::Instant::now();
        let page = rule.parse(&body, &base);
        histogram!("scan_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        for skipped in &page.skipped {
            tracing::warn!(portal, target, error = %skipped, "skipping malformed listing");
        }
        counter!("scan_parse_skipped_total").increment(page.skipped.len() as u64);

        tracing::debug!(
            portal,
            target,
            adverts = page.adverts.len(),
            skipped = page.skipped.len(),
            "page parsed"
        );
        Ok(page.adverts)
    }
}

#[async_trait]
impl Extractor for PageExtractor {
    async fn extract(&self, portal: &str, target: &str) -> Result<Vec<AdvertRecord>, FetchError> {
        ensure_metrics_described();
        let res = self.extract_page(portal, target).await;
        if res.is_err() {
            counter!("scan_fetch_errors_total").increment(1);
        }
        res
    }
}
