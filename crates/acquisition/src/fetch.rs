//! Resumable fetching of segment files.
//!
//! Each key is checked against the local store first; only missing
//! artifacts are requested. A key the archive does not have is recorded as
//! absent and never retried. Other transport failures are retried with
//! exponential backoff, then reported, and the run moves on.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use metrics::counter;
use tracing::{debug, error, info, instrument, warn};

use himawari_common::{ObjectKey, ProductSpec, RemoteConfig};
use storage::{LocalArtifactStore, ObjectSource, StorageError};

/// Retry and concurrency settings of a fetch run.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Number of keys in flight at once
    pub max_concurrent: usize,
    /// Maximum number of retry attempts per key
    pub max_retries: u32,
    /// Initial retry delay (doubles each retry)
    pub initial_retry_delay: Duration,
    /// Maximum retry delay
    pub max_retry_delay: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::from(&RemoteConfig::default())
    }
}

impl From<&RemoteConfig> for FetchConfig {
    fn from(config: &RemoteConfig) -> Self {
        Self {
            max_concurrent: config.max_concurrent.max(1),
            max_retries: config.max_retries,
            initial_retry_delay: Duration::from_millis(config.initial_retry_delay_ms),
            max_retry_delay: Duration::from_millis(config.max_retry_delay_ms),
        }
    }
}

/// What happened to one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Already present locally
    Skipped,
    /// Newly written to the local store
    Fetched { bytes: u64 },
    /// Not in the archive
    Absent,
    /// Transport or local write failure after all retries
    Failed { error: String },
}

impl FetchOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            FetchOutcome::Skipped => "skipped",
            FetchOutcome::Fetched { .. } => "fetched",
            FetchOutcome::Absent => "absent",
            FetchOutcome::Failed { .. } => "failed",
        }
    }
}

/// Totals of a fetch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub skipped: usize,
    pub fetched: usize,
    pub absent: usize,
    pub failed: usize,
    pub bytes: u64,
    /// Dispatch stopped before the key space was exhausted
    pub cancelled: bool,
}

impl FetchSummary {
    pub fn record(&mut self, outcome: &FetchOutcome) {
        match outcome {
            FetchOutcome::Skipped => self.skipped += 1,
            FetchOutcome::Fetched { bytes } => {
                self.fetched += 1;
                self.bytes += bytes;
            }
            FetchOutcome::Absent => self.absent += 1,
            FetchOutcome::Failed { .. } => self.failed += 1,
        }
    }

    /// Number of keys that reached an outcome.
    pub fn total(&self) -> usize {
        self.skipped + self.fetched + self.absent + self.failed
    }
}

/// Makes remote segment files present in a local store.
pub struct Fetcher {
    remote: Arc<dyn ObjectSource>,
    local: LocalArtifactStore,
    product: ProductSpec,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(
        remote: Arc<dyn ObjectSource>,
        local: LocalArtifactStore,
        product: ProductSpec,
        config: FetchConfig,
    ) -> Self {
        Self {
            remote,
            local,
            product,
            config,
        }
    }

    pub fn local(&self) -> &LocalArtifactStore {
        &self.local
    }

    /// Resolve one key.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn fetch_one(&self, key: ObjectKey) -> FetchOutcome {
        let filename = key.filename(&self.product);
        if self.local.exists(&filename) {
            debug!(file = %filename, "Already present, skipping");
            return FetchOutcome::Skipped;
        }

        let path = key.remote_path(&self.product);
        let mut retry_count = 0;
        let mut delay = self.config.initial_retry_delay;

        loop {
            match self.remote.fetch(&path).await {
                Ok(data) => {
                    let bytes = data.len() as u64;
                    return match self.local.write(&filename, data).await {
                        Ok(stored) => {
                            debug!(path = %stored.display(), bytes, "Fetched");
                            FetchOutcome::Fetched { bytes }
                        }
                        // Another worker finished the same file first
                        Err(StorageError::AlreadyExists(_)) => FetchOutcome::Skipped,
                        Err(e) => {
                            error!(file = %filename, error = %e, "Failed to store artifact");
                            FetchOutcome::Failed {
                                error: e.to_string(),
                            }
                        }
                    };
                }
                Err(e) if e.is_not_found() => {
                    debug!(path = %path, "Not available in archive");
                    return FetchOutcome::Absent;
                }
                Err(e) => {
                    retry_count += 1;
                    if retry_count > self.config.max_retries {
                        error!(
                            path = %path,
                            error = %e,
                            retries = self.config.max_retries,
                            "Fetch failed"
                        );
                        return FetchOutcome::Failed {
                            error: e.to_string(),
                        };
                    }

                    warn!(
                        error = %e,
                        retry = retry_count,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, self.config.max_retry_delay);
                }
            }
        }
    }

    /// Resolve every key.
    pub async fn run<I>(&self, keys: I) -> FetchSummary
    where
        I: IntoIterator<Item = ObjectKey>,
    {
        self.run_until(keys, std::future::pending::<()>()).await
    }

    /// Resolve keys until they run out or `shutdown` completes. On shutdown
    /// no further keys are dispatched and in-flight transfers are dropped;
    /// a dropped transfer leaves at most a `.partial` file behind.
    pub async fn run_until<I, F>(&self, keys: I, shutdown: F) -> FetchSummary
    where
        I: IntoIterator<Item = ObjectKey>,
        F: Future<Output = ()>,
    {
        let mut results = stream::iter(keys)
            .map(|key| self.fetch_one(key))
            .buffer_unordered(self.config.max_concurrent);
        tokio::pin!(shutdown);

        let mut summary = FetchSummary::default();
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    warn!(completed = summary.total(), "Fetch run cancelled");
                    summary.cancelled = true;
                    break;
                }
                next = results.next() => match next {
                    Some(outcome) => {
                        counter!("himawari_fetch_total", "outcome" => outcome.label()).increment(1);
                        summary.record(&outcome);
                        if summary.total() % 1000 == 0 {
                            info!(
                                completed = summary.total(),
                                fetched = summary.fetched,
                                absent = summary.absent,
                                failed = summary.failed,
                                "Fetch progress"
                            );
                        }
                    }
                    None => break,
                },
            }
        }

        info!(
            skipped = summary.skipped,
            fetched = summary.fetched,
            absent = summary.absent,
            failed = summary.failed,
            bytes = summary.bytes,
            cancelled = summary.cancelled,
            "Fetch run complete"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_record() {
        let mut summary = FetchSummary::default();
        summary.record(&FetchOutcome::Fetched { bytes: 10 });
        summary.record(&FetchOutcome::Fetched { bytes: 5 });
        summary.record(&FetchOutcome::Skipped);
        summary.record(&FetchOutcome::Absent);
        summary.record(&FetchOutcome::Failed {
            error: "boom".to_string(),
        });
        assert_eq!(summary.fetched, 2);
        assert_eq!(summary.bytes, 15);
        assert_eq!(summary.total(), 5);
        assert!(!summary.cancelled);
    }

    #[test]
    fn test_config_from_remote() {
        let remote = RemoteConfig {
            max_concurrent: 0,
            initial_retry_delay_ms: 250,
            ..RemoteConfig::default()
        };
        let config = FetchConfig::from(&remote);
        assert_eq!(config.max_concurrent, 1);
        assert_eq!(config.initial_retry_delay, Duration::from_millis(250));
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(FetchOutcome::Skipped.label(), "skipped");
        assert_eq!(FetchOutcome::Fetched { bytes: 1 }.label(), "fetched");
        assert_eq!(FetchOutcome::Absent.label(), "absent");
    }
}
