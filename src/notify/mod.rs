pub mod webhook;

use crate::extract::types::AdvertRecord;

pub use webhook::{WebhookFlavor, WebhookNotifier};

/// Delivers one notification per new advert.
///
/// Implementations make a single attempt and report the outcome; they never
/// retry and never fail the caller.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, record: &AdvertRecord) -> bool;
}

/// Short chat-friendly text for one advert.
pub fn format_message(record: &AdvertRecord) -> String {
    let mut text = format!("*New advert on {}:* {}", record.source_id, record.title);
    if let Some(price) = record.price.as_deref().filter(|p| !p.is_empty()) {
        text.push_str(&format!("\nPrice: {price}"));
    }
    text.push('\n');
    text.push_str(&record.url);
    text
}
