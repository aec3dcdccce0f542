// src/extract/portals/olx.rs
use once_cell::sync::Lazy;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use super::{first_text, ParsedPage, PortalRule};
use crate::error::ParseError;
use crate::extract::canonical_link;
use crate::extract::types::AdvertRecord;

const PORTAL: &str = "olx";

static CARD: Lazy<Selector> = Lazy::new(|| Selector::parse(r#"div[data-cy="l-card"]"#).unwrap());
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"[data-cy="ad-card-title"], h6, h4"#).unwrap());
static PRICE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"[data-testid="ad-price"]"#).unwrap());

/// Search result pages of olx.pl and its sister sites.
pub struct OlxRule;

impl PortalRule for OlxRule {
    fn name(&self) -> &'static str {
        PORTAL
    }

    fn parse(&self, page: &str, base: &Url) -> ParsedPage {
        let doc = Html::parse_document(page);
        let mut out = ParsedPage::default();
        for (index, card) in doc.select(&CARD).enumerate() {
            out.push(parse_card(index, &card, base));
        }
        out
    }
}

fn parse_card(index: usize, card: &ElementRef<'_>, base: &Url) -> Result<AdvertRecord, ParseError> {
    let missing = |field| ParseError {
        portal: PORTAL,
        index,
        field,
    };

    let url = card
        .select(&LINK)
        .next()
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| canonical_link(base, href))
        .ok_or_else(|| missing("url"))?;

    let title = first_text(card, &TITLE).ok_or_else(|| missing("title"))?;

    // Cards carry the numeric listing id; promoted cards sometimes don't.
    let external_id = card
        .value()
        .attr("id")
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| url.clone());

    Ok(AdvertRecord {
        source_id: PORTAL.to_string(),
        external_id,
        title,
        url,
        price: first_text(card, &PRICE),
    })
}
