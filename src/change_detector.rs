//! Decides which extracted adverts are new, persists them, then notifies.
//!
//! Ordering is persist-then-notify: a crash between the two steps can lose a
//! notification for an advert that is already stored, but a restart can never
//! announce the same advert twice.

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;

use crate::extract::types::AdvertRecord;
use crate::notify::Notifier;
use crate::store::AdvertStore;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("adverts_new_total", "Adverts persisted for the first time.");
        describe_counter!("adverts_known_total", "Adverts already in the store.");
        describe_counter!(
            "notify_failures_total",
            "New adverts whose notification was not delivered."
        );
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Known,
    Notified,
    /// Stored, but the webhook did not accept the notification.
    DeliveryFailed,
    /// Store unavailable; not stored and not notified.
    StoreFailed,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DetectReport {
    pub known: usize,
    pub notified: usize,
    pub delivery_failed: usize,
    pub store_failed: usize,
}

impl DetectReport {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Known => self.known += 1,
            Outcome::Notified => self.notified += 1,
            Outcome::DeliveryFailed => self.delivery_failed += 1,
            Outcome::StoreFailed => self.store_failed += 1,
        }
    }

    pub fn merge(&mut self, other: DetectReport) {
        self.known += other.known;
        self.notified += other.notified;
        self.delivery_failed += other.delivery_failed;
        self.store_failed += other.store_failed;
    }

    /// Adverts that were persisted in this pass.
    pub fn new_adverts(&self) -> usize {
        self.notified + self.delivery_failed
    }
}

pub struct ChangeDetector<'a> {
    store: &'a dyn AdvertStore,
    notifier: &'a dyn Notifier,
}

impl<'a> ChangeDetector<'a> {
    pub fn new(store: &'a dyn AdvertStore, notifier: &'a dyn Notifier) -> Self {
        ensure_metrics_described();
        Self { store, notifier }
    }

    pub async fn process(&self, record: &AdvertRecord) -> Outcome {
        let portal = record.source_id.as_str();
        let external_id = record.external_id.as_str();

        match self.store.exists(portal, external_id) {
            Ok(true) => {
                tracing::trace!(portal, external_id, "already known");
                counter!("adverts_known_total").increment(1);
                return Outcome::Known;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::error!(portal, external_id, error = %e, "store lookup failed");
                return Outcome::StoreFailed;
            }
        }

        if let Err(e) = self.store.insert(record) {
            if e.is_conflict() {
                tracing::debug!(portal, external_id, "insert raced with an existing row");
                counter!("adverts_known_total").increment(1);
                return Outcome::Known;
            }
            tracing::error!(portal, external_id, error = %e, "store insert failed");
            return Outcome::StoreFailed;
        }

        tracing::info!(portal, external_id, title = %record.title, "new advert");
        counter!("adverts_new_total").increment(1);

        if self.notifier.send(record).await {
            Outcome::Notified
        } else {
            counter!("notify_failures_total").increment(1);
            Outcome::DeliveryFailed
        }
    }

    /// Each record is decided on its own, in order.
    pub async fn process_all(&self, records: &[AdvertRecord]) -> DetectReport {
        let mut report = DetectReport::default();
        for record in records {
            report.record(self.process(record).await);
        }
        report
    }
}
