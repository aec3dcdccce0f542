// src/extract/portals/otodom.rs
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use super::{first_text, ParsedPage, PortalRule};
use crate::error::ParseError;
use crate::extract::canonical_link;
use crate::extract::types::AdvertRecord;

const PORTAL: &str = "otodom";

static ITEM: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"article[data-cy="listing-item"]"#).unwrap());
static LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[data-cy="listing-item-link"][href]"#).unwrap());
static TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"[data-cy="listing-item-title"]"#).unwrap());
static PRICE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"[data-cy="listing-item-price"]"#).unwrap());
static SPAN: Lazy<Selector> = Lazy::new(|| Selector::parse("span").unwrap());

// Offer slugs end in "-ID4nX1a"; the token survives title edits.
static RE_OFFER_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"-(ID[0-9A-Za-z]+)/?$").unwrap());
static RE_CURRENCY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\d.*(zł|pln|€|eur)").unwrap());

/// Real-estate search results on otodom.pl.
pub struct OtodomRule;

impl PortalRule for OtodomRule {
    fn name(&self) -> &'static str {
        PORTAL
    }

    fn parse(&self, page: &str, base: &Url) -> ParsedPage {
        let doc = Html::parse_document(page);
        let mut out = ParsedPage::default();
        for (index, item) in doc.select(&ITEM).enumerate() {
            out.push(parse_item(index, &item, base));
        }
        out
    }
}

fn parse_item(index: usize, item: &ElementRef<'_>, base: &Url) -> Result<AdvertRecord, ParseError> {
    let missing = |field| ParseError {
        portal: PORTAL,
        index,
        field,
    };

    let url = item
        .select(&LINK)
        .next()
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| canonical_link(base, href))
        .ok_or_else(|| missing("url"))?;

    let title = first_text(item, &TITLE).ok_or_else(|| missing("title"))?;

    let external_id = RE_OFFER_ID
        .captures(&url)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| url.clone());

    let price = first_text(item, &PRICE).or_else(|| {
        item.select(&SPAN)
            .map(|s| crate::extract::normalize_text(&s.text().collect::<String>()))
            .find(|t| RE_CURRENCY.is_match(t))
    });

    Ok(AdvertRecord {
        source_id: PORTAL.to_string(),
        external_id,
        title,
        url,
        price,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.otodom.pl/pl/wyniki/sprzedaz/mieszkanie/warszawa").unwrap()
    }

    #[test]
    fn offer_id_comes_from_slug() {
        let html = r#"
            <article data-cy="listing-item">
              <a data-cy="listing-item-link" href="/pl/oferta/2-pokoje-mokotow-ID4nX1a?utm=1">
                <p data-cy="listing-item-title">2 pokoje, Mokotów</p>
              </a>
              <span>549&nbsp;000 zł</span>
            </article>"#;
        let page = OtodomRule.parse(html, &base());
        let ad = &page.adverts[0];
        assert_eq!(ad.external_id, "ID4nX1a");
        assert_eq!(ad.url, "https://www.otodom.pl/pl/oferta/2-pokoje-mokotow-ID4nX1a");
        assert_eq!(ad.price.as_deref(), Some("549 000 zł"));
    }

    #[test]
    fn item_without_link_is_skipped() {
        let html = r#"
            <article data-cy="listing-item"><p data-cy="listing-item-title">No link</p></article>"#;
        let page = OtodomRule.parse(html, &base());
        assert!(page.adverts.is_empty());
        assert_eq!(page.skipped[0].field, "url");
    }
}
