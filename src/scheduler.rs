//! Fetch-cycle driver
//!
//! One unbounded loop: fetch every configured source in order, process
//! and publish whatever changed, then sleep the cool-down and go
//! again. Sources are fetched and processed strictly one at a time;
//! the durable content store is the only state that survives a cycle.

use crate::fetch::{FetchOutcome, Fetcher, PayloadSource};
use crate::publish::Publisher;
use crate::sources::{self, Source};
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// What one cycle did, for logging and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub changed: usize,
    pub tables_published: usize,
}

impl CycleReport {
    pub fn all_unchanged(&self) -> bool {
        self.changed == 0
    }
}

/// Render elapsed time as `uptime: DDD HH:MM:SS`
pub fn format_uptime(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let days = (total / 86_400) % 365;
    let hours = (total / 3_600) % 24;
    let minutes = (total / 60) % 60;
    let seconds = total % 60;
    format!(
        "uptime: {:03} {:02}:{:02}:{:02}",
        days, hours, minutes, seconds
    )
}

pub struct Scheduler<S: PayloadSource, P: Publisher> {
    fetcher: Fetcher<S>,
    publisher: P,
    sources: Vec<Source>,
    cooldown: Duration,
    started: Instant,
}

impl<S: PayloadSource, P: Publisher> Scheduler<S, P> {
    pub fn new(
        fetcher: Fetcher<S>,
        publisher: P,
        sources: Vec<Source>,
        cooldown_secs: u64,
    ) -> Self {
        Self {
            fetcher,
            publisher,
            sources,
            cooldown: Duration::from_secs(cooldown_secs),
            started: Instant::now(),
        }
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Run cycles forever. Returns only on a fatal error (retry
    /// exhaustion somewhere below), which the binary turns into a
    /// non-zero exit.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        loop {
            let report = self.run_cycle().await?;

            if report.all_unchanged() {
                log::info!(
                    "💤 No source changed, sleeping {}s ({})",
                    self.cooldown.as_secs(),
                    format_uptime(self.started.elapsed())
                );
            } else {
                log::info!(
                    "💤 Published {} tables from {} changed sources, sleeping {}s ({})",
                    report.tables_published,
                    report.changed,
                    self.cooldown.as_secs(),
                    format_uptime(self.started.elapsed())
                );
            }

            sleep(self.cooldown).await;
        }
    }

    /// One full fetch/process/publish pass over the configured sources.
    ///
    /// When every source comes back `Unchanged`, no downstream stage
    /// runs at all. A source whose payload fails to parse is logged
    /// and skipped; its dedup marker is already recorded, so the bad
    /// payload will not be re-processed next cycle, but a corrected
    /// upstream file will.
    pub async fn run_cycle(&self) -> Result<CycleReport, Box<dyn std::error::Error>> {
        let mut report = CycleReport {
            fetched: 0,
            changed: 0,
            tables_published: 0,
        };

        let mut new_payloads: Vec<(&Source, Vec<u8>)> = Vec::new();

        for source in &self.sources {
            let outcome = self.fetcher.fetch(&source.url).await?;
            report.fetched += 1;

            if let FetchOutcome::NewPayload(payload) = outcome {
                report.changed += 1;
                new_payloads.push((source, payload));
            }
        }

        if new_payloads.is_empty() {
            return Ok(report);
        }

        for (source, payload) in new_payloads {
            let processed = match sources::process(source.kind, &payload) {
                Ok(processed) => processed,
                Err(e) => {
                    log::error!("❌ Skipping '{}': {}", source.name, e);
                    continue;
                }
            };

            self.publisher.publish_tables(&processed.tables).await?;
            report.tables_published += processed.tables.len();

            if let Some(summary) = &processed.summary {
                self.publisher.publish_summary(summary).await?;
            }
        }

        self.publisher.commit_and_push().await?;

        Ok(report)
    }
}
