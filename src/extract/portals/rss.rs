// src/extract/portals/rss.rs
use quick_xml::de::from_str;
use reqwest::Url;
use serde::Deserialize;

use super::{ParsedPage, PortalRule};
use crate::error::ParseError;
use crate::extract::types::AdvertRecord;
use crate::extract::{canonical_link, normalize_text};

const PORTAL: &str = "rss";

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    guid: Option<Guid>,
    price: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Guid {
    #[serde(rename = "$text", default)]
    value: String,
}

/// Generic RSS 2.0 search feed, for portals that publish saved searches as feeds.
pub struct RssRule;

impl PortalRule for RssRule {
    fn name(&self) -> &'static str {
        PORTAL
    }

    fn parse(&self, page: &str, base: &Url) -> ParsedPage {
        let mut out = ParsedPage::default();
        let rss: Rss = match from_str(&scrub_html_entities_for_xml(page)) {
            Ok(rss) => rss,
            Err(e) => {
                tracing::debug!(error = %e, "not an rss document");
                return out;
            }
        };

        for (index, it) in rss.channel.item.into_iter().enumerate() {
            out.push(map_item(index, it, base));
        }
        out
    }
}

fn map_item(index: usize, it: Item, base: &Url) -> Result<AdvertRecord, ParseError> {
    let missing = |field| ParseError {
        portal: PORTAL,
        index,
        field,
    };

    let title = it
        .title
        .as_deref()
        .map(normalize_text)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| missing("title"))?;

    let url = it
        .link
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .and_then(|l| base.join(l).ok())
        .map(|u| u.to_string())
        .ok_or_else(|| missing("link"))?;

    let external_id = it
        .guid
        .map(|g| g.value.trim().to_string())
        .filter(|g| !g.is_empty())
        .or_else(|| canonical_link(base, &url))
        .ok_or_else(|| missing("guid"))?;

    Ok(AdvertRecord {
        source_id: PORTAL.to_string(),
        external_id,
        title,
        url,
        price: it
            .price
            .as_deref()
            .map(normalize_text)
            .filter(|p| !p.is_empty()),
    })
}

// Feeds generated from HTML templates leak entities XML does not define.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
}
