//! Scan orchestration: one cycle over every configured (portal, target), or
//! repeated cycles on a fixed interval until cancelled.

use std::time::Duration;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use crate::change_detector::{ChangeDetector, DetectReport};
use crate::config::SourceConfig;
use crate::extract::types::Extractor;
use crate::notify::Notifier;
use crate::store::AdvertStore;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("scan_cycles_total", "Completed scan cycles.");
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// One cycle, then return.
    Collect,
    /// Cycle, wait, repeat until cancelled.
    Interval(Duration),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub targets_scanned: usize,
    pub targets_failed: usize,
    pub adverts_seen: usize,
    pub adverts: DetectReport,
}

pub struct Scanner {
    sources: Vec<SourceConfig>,
    extractor: Box<dyn Extractor>,
    store: Box<dyn AdvertStore>,
    notifier: Box<dyn Notifier>,
}

impl Scanner {
    pub fn new(
        sources: Vec<SourceConfig>,
        extractor: Box<dyn Extractor>,
        store: Box<dyn AdvertStore>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        ensure_metrics_described();
        Self {
            sources,
            extractor,
            store,
            notifier,
        }
    }

    pub fn store(&self) -> &dyn AdvertStore {
        self.store.as_ref()
    }

    /// Run according to `mode`; returns the number of completed cycles.
    pub async fn run(&self, mode: Mode, shutdown: &CancellationToken) -> u64 {
        match mode {
            Mode::Collect => {
                self.run_cycle().await;
                1
            }
            Mode::Interval(every) => self.run_interval(every, shutdown).await,
        }
    }

    /// One pass over all sources and targets, strictly in order. A target
    /// that cannot be fetched contributes nothing; the pass goes on.
    pub async fn run_cycle(&self) -> CycleReport {
        let detector = ChangeDetector::new(self.store.as_ref(), self.notifier.as_ref());
        let mut report = CycleReport::default();

        for source in &self.sources {
            let portal = source.portal.as_str();
            for target in &source.targets {
                report.targets_scanned += 1;
                let adverts = match self.extractor.extract(portal, target).await {
                    Ok(adverts) => adverts,
                    Err(e) => {
                        report.targets_failed += 1;
                        tracing::warn!(portal, target = %target, error = %e, "target skipped this cycle");
                        continue;
                    }
                };
                report.adverts_seen += adverts.len();
                report.adverts.merge(detector.process_all(&adverts).await);
            }
        }

        counter!("scan_cycles_total").increment(1);
        tracing::info!(
            targets = report.targets_scanned,
            failed = report.targets_failed,
            seen = report.adverts_seen,
            new = report.adverts.new_adverts(),
            notified = report.adverts.notified,
            undelivered = report.adverts.delivery_failed,
            store_failed = report.adverts.store_failed,
            "scan cycle finished"
        );
        report
    }

    /// Cycles until `shutdown` is cancelled. The token is checked before each
    /// cycle and raced against the wait, so a stop never sits out the interval.
    pub async fn run_interval(&self, every: Duration, shutdown: &CancellationToken) -> u64 {
        let mut cycles = 0u64;
        loop {
            if shutdown.is_cancelled() {
                break;
            }
            self.run_cycle().await;
            cycles += 1;

            tracing::debug!(secs = every.as_secs(), "waiting for next cycle");
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(every) => {}
            }
        }
        tracing::info!(cycles, "scan loop stopped");
        cycles
    }
}
