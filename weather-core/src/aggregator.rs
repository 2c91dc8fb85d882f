//! Bounded concurrent fan-out of one fetch per registered district.
//!
//! Every district becomes one tokio task. At most `worker_limit` tasks exist
//! at any instant: the next task is only spawned once an earlier one has
//! completed. Completions are consumed in the order they finish.

use std::{
    collections::BTreeMap,
    fmt,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use futures::{StreamExt, stream};
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info};

use crate::{
    model::WeatherRecord,
    provider::{FetchError, WeatherFetcher},
    registry::{DistrictQuery, Registry},
};

/// Outcome of one district within a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DistrictStatus {
    Fetched,
    /// The fetch returned an error (network, status or parse).
    Failed(String),
    /// The worker task itself panicked or was cancelled.
    Crashed(String),
}

impl DistrictStatus {
    pub fn is_fetched(&self) -> bool {
        matches!(self, DistrictStatus::Fetched)
    }
}

/// Emitted once per completed district.
#[derive(Debug, Clone)]
pub struct Progress {
    pub district: String,
    pub status: DistrictStatus,
    pub completed: usize,
    pub total: usize,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            DistrictStatus::Fetched => write!(f, "{} succeeded", self.district)?,
            DistrictStatus::Failed(_) => write!(f, "{} failed", self.district)?,
            DistrictStatus::Crashed(reason) => write!(f, "{} errored: {reason}", self.district)?,
        }
        write!(f, " ({}/{})", self.completed, self.total)
    }
}

/// Result of one aggregation round.
#[derive(Debug, Clone, Default)]
pub struct Round {
    /// Successful records, in completion order.
    pub records: Vec<WeatherRecord>,
    pub statuses: BTreeMap<String, DistrictStatus>,
}

impl Round {
    pub fn failures(&self) -> impl Iterator<Item = (&str, &DistrictStatus)> {
        self.statuses.iter().filter(|(_, s)| !s.is_fetched()).map(|(d, s)| (d.as_str(), s))
    }
}

/// A spawned fetch that remembers its district and is aborted when dropped.
struct Unit {
    district: String,
    handle: JoinHandle<Result<WeatherRecord, FetchError>>,
}

impl Unit {
    fn spawn(fetcher: Arc<dyn WeatherFetcher>, query: DistrictQuery) -> Self {
        let district = query.name.clone();
        let handle = tokio::spawn(async move { fetcher.fetch(&query).await });
        Self { district, handle }
    }
}

impl Future for Unit {
    type Output = (String, Result<Result<WeatherRecord, FetchError>, JoinError>);

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        Pin::new(&mut this.handle).poll(cx).map(|joined| (this.district.clone(), joined))
    }
}

impl Drop for Unit {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Fetch every district and return the successful records in completion order.
pub async fn fetch_all(
    fetcher: Arc<dyn WeatherFetcher>,
    registry: &Registry,
    worker_limit: usize,
) -> Vec<WeatherRecord> {
    fetch_round(fetcher, registry, worker_limit, |_| {}).await.records
}

/// Run one aggregation round, reporting each completion to `on_progress`.
///
/// Never fails: fetch errors and crashed workers only mark that district as
/// absent. Returns once every district has completed.
pub async fn fetch_round<F>(
    fetcher: Arc<dyn WeatherFetcher>,
    registry: &Registry,
    worker_limit: usize,
    mut on_progress: F,
) -> Round
where
    F: FnMut(&Progress),
{
    let total = registry.len();
    let mut round = Round::default();

    let mut completions = stream::iter(registry.iter().cloned())
        .map(|query| Unit::spawn(Arc::clone(&fetcher), query))
        .buffer_unordered(worker_limit.max(1));

    let mut completed = 0;
    while let Some((district, joined)) = completions.next().await {
        completed += 1;

        let status = match joined {
            Ok(Ok(record)) => {
                round.records.push(record);
                DistrictStatus::Fetched
            }
            Ok(Err(e)) => DistrictStatus::Failed(e.to_string()),
            Err(e) => {
                error!(district = %district, error = %e, "weather worker crashed");
                DistrictStatus::Crashed(e.to_string())
            }
        };

        let progress = Progress { district, status, completed, total };
        info!("{progress}");
        on_progress(&progress);
        round.statuses.insert(progress.district, progress.status);
    }

    info!(fetched = round.records.len(), total, "aggregation round finished");
    round
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::sample_record;
    use async_trait::async_trait;
    use std::{
        collections::HashSet,
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    #[derive(Debug, Default)]
    struct FakeFetcher {
        failing: HashSet<String>,
        panicking: HashSet<String>,
        delay: Duration,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl FakeFetcher {
        fn failing(names: &[&str]) -> Self {
            Self { failing: names.iter().map(|n| n.to_string()).collect(), ..Self::default() }
        }
    }

    #[async_trait]
    impl WeatherFetcher for FakeFetcher {
        async fn fetch(&self, district: &DistrictQuery) -> Result<WeatherRecord, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.panicking.contains(&district.name) {
                panic!("fake fetcher blew up for {}", district.name);
            }
            if self.failing.contains(&district.name) {
                return Err(FetchError::Status { status: 503, body: "unavailable".into() });
            }
            Ok(sample_record(&district.name, 30.0, 70))
        }
    }

    fn registry_of(names: &[&str]) -> Registry {
        Registry::new(
            names.iter().map(|&n| DistrictQuery::new(n, [n, "East Java", "Indonesia"])).collect(),
        )
    }

    fn numbered_registry(count: usize) -> Registry {
        let names: Vec<String> = (0..count).map(|i| format!("District{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        registry_of(&refs)
    }

    #[tokio::test]
    async fn example_scenario_keeps_only_successes() {
        let fetcher = Arc::new(FakeFetcher::failing(&["B"]));
        let registry = registry_of(&["A", "B", "C"]);

        let records = fetch_all(fetcher, &registry, 2).await;

        let mut districts: Vec<_> = records.iter().map(|r| r.district.as_str()).collect();
        districts.sort_unstable();
        assert_eq!(districts, vec!["A", "C"]);
    }

    #[tokio::test]
    async fn partial_failures_are_contained() {
        let fetcher = Arc::new(FakeFetcher::failing(&["District1", "District4", "District7"]));
        let registry = numbered_registry(10);

        let round = fetch_round(fetcher.clone(), &registry, 5, |_| {}).await;

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 10);
        assert_eq!(round.records.len(), 7);
        assert_eq!(round.statuses.len(), 10);
        let failed: Vec<_> = round.failures().map(|(d, _)| d).collect();
        assert_eq!(failed, vec!["District1", "District4", "District7"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn never_exceeds_worker_limit() {
        let fetcher = Arc::new(FakeFetcher { delay: Duration::from_millis(20), ..FakeFetcher::default() });
        let registry = numbered_registry(12);

        let records = fetch_all(fetcher.clone(), &registry, 3).await;

        assert_eq!(records.len(), 12);
        let peak = fetcher.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak in-flight was {peak}");
        assert!(peak > 1, "expected some parallelism, peak was {peak}");
        assert_eq!(fetcher.in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn zero_worker_limit_runs_one_at_a_time() {
        let fetcher = Arc::new(FakeFetcher { delay: Duration::from_millis(5), ..FakeFetcher::default() });
        let registry = numbered_registry(4);

        let records = fetch_all(fetcher.clone(), &registry, 0).await;

        assert_eq!(records.len(), 4);
        assert_eq!(fetcher.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn crashed_worker_is_absent_and_reported() {
        let fetcher = Arc::new(FakeFetcher {
            panicking: ["B".to_string()].into_iter().collect(),
            ..FakeFetcher::default()
        });
        let registry = registry_of(&["A", "B", "C"]);

        let mut messages = Vec::new();
        let round = fetch_round(fetcher, &registry, 2, |p| messages.push(p.to_string())).await;

        assert_eq!(round.records.len(), 2);
        assert!(matches!(round.statuses.get("B"), Some(DistrictStatus::Crashed(_))));
        assert!(messages.iter().any(|m| m.starts_with("B errored:")));
    }

    #[tokio::test]
    async fn progress_counts_every_completion() {
        let fetcher = Arc::new(FakeFetcher::failing(&["B"]));
        let registry = registry_of(&["A", "B", "C"]);

        let mut seen = Vec::new();
        fetch_round(fetcher, &registry, 2, |p| seen.push(p.clone())).await;

        let counts: Vec<_> = seen.iter().map(|p| (p.completed, p.total)).collect();
        assert_eq!(counts, vec![(1, 3), (2, 3), (3, 3)]);

        let b = seen.iter().find(|p| p.district == "B").expect("B reported");
        assert_eq!(b.to_string(), format!("B failed ({}/3)", b.completed));
        let a = seen.iter().find(|p| p.district == "A").expect("A reported");
        assert_eq!(a.to_string(), format!("A succeeded ({}/3)", a.completed));
    }

    #[tokio::test]
    async fn empty_registry_yields_empty_round() {
        let fetcher = Arc::new(FakeFetcher::default());
        let round = fetch_round(fetcher, &Registry::new(Vec::new()), 5, |_| {}).await;

        assert!(round.records.is_empty());
        assert!(round.statuses.is_empty());
    }
}
