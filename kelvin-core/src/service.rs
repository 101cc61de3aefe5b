//! Aggregation service fanning one request out to every provider.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::model::{AggregateResult, Kelvin, ProviderId};
use crate::plugin::ProviderSet;
use crate::ports::{PortError, TemperaturePort};

#[derive(thiserror::Error, Debug)]
/// Errors that prevent an aggregate reading.
pub enum AggregateError {
    /// The first provider failure observed, passed through unchanged.
    #[error("{provider}: {source}")]
    Provider {
        /// Provider that failed.
        provider: ProviderId,
        /// What went wrong.
        #[source]
        source: PortError,
    },
    /// There is nothing to average.
    #[error("No providers configured")]
    NoProviders,
    /// Provider tasks ended without reporting an outcome.
    #[error("Only {received} of {expected} providers reported")]
    Incomplete {
        /// Outcomes collected before the channel closed.
        received: usize,
        /// Outcomes that were due.
        expected: usize,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// What happens to still-running provider calls once an aggregate has failed.
pub enum FailurePolicy {
    /// Leave them running; their outcomes are dropped when they arrive.
    #[default]
    Detach,
    /// Abort them.
    Abort,
}

#[derive(Debug, Clone, Copy, Default)]
/// Tuning knobs for [`Aggregator`]. The defaults apply no deadline and detach on failure.
pub struct AggregatorSettings {
    /// Deadline for every individual provider call.
    pub provider_timeout: Option<Duration>,
    /// Handling of sibling calls after the first failure.
    pub on_failure: FailurePolicy,
}

/// Public entry point averaging the readings of all registered providers.
pub struct Aggregator {
    providers: Arc<ProviderSet>,
    settings: AggregatorSettings,
}

impl Aggregator {
    /// Create an aggregator with default settings.
    #[must_use]
    pub fn new(providers: Arc<ProviderSet>) -> Self {
        Self::with_settings(providers, AggregatorSettings::default())
    }

    /// Create an aggregator with explicit settings.
    #[must_use]
    pub fn with_settings(providers: Arc<ProviderSet>, settings: AggregatorSettings) -> Self {
        Self {
            providers,
            settings,
        }
    }

    /// Providers consulted on every request.
    #[must_use]
    pub fn providers(&self) -> &ProviderSet {
        &self.providers
    }

    /// Settings in effect.
    #[must_use]
    pub fn settings(&self) -> AggregatorSettings {
        self.settings
    }

    /// Mean temperature for a city across every provider.
    ///
    /// # Errors
    ///
    /// Returns the first [`AggregateError`] observed; no partial mean is ever produced.
    pub async fn temperature(&self, city: &str) -> Result<AggregateResult, AggregateError> {
        aggregate(&self.providers, city, self.settings).await
    }
}

/// Mean temperature for a city across `providers`, using default settings.
///
/// # Errors
///
/// Returns the first [`AggregateError`] observed; no partial mean is ever produced.
pub async fn aggregate_temperature(
    providers: &ProviderSet,
    city: &str,
) -> Result<AggregateResult, AggregateError> {
    aggregate(providers, city, AggregatorSettings::default()).await
}

async fn aggregate(
    providers: &ProviderSet,
    city: &str,
    settings: AggregatorSettings,
) -> Result<AggregateResult, AggregateError> {
    let expected = providers.len();
    if expected == 0 {
        return Err(AggregateError::NoProviders);
    }

    let begin = Instant::now();

    // One slot per provider: a producer never waits for the reader.
    let (tx, mut rx) = mpsc::channel::<(ProviderId, Result<Kelvin, PortError>)>(expected);
    let mut in_flight = InFlight::new(settings.on_failure, expected);

    for provider in providers.iter() {
        let provider = Arc::clone(provider);
        let city = city.to_owned();
        let tx = tx.clone();
        let deadline = settings.provider_timeout;

        in_flight.push(tokio::spawn(async move {
            let outcome = measure(provider.as_ref(), &city, deadline).await;
            if tx.send((provider.id().clone(), outcome)).await.is_err() {
                debug!(provider = %provider.id(), "aggregate already settled, dropping outcome");
            }
        }));
    }
    drop(tx);

    let mut sum = 0.0;
    for received in 0..expected {
        let Some((provider, outcome)) = rx.recv().await else {
            warn!(city, received, expected, "provider tasks ended early");
            return Err(AggregateError::Incomplete { received, expected });
        };

        match outcome {
            Ok(kelvin) => {
                debug!(%provider, city, %kelvin, "reading received");
                sum += kelvin.value();
            }
            Err(source) => {
                warn!(%provider, city, error = %source, "provider failed, abandoning aggregate");
                return Err(AggregateError::Provider { provider, source });
            }
        }
    }

    #[expect(
        clippy::cast_precision_loss,
        reason = "provider counts stay far below 2^52"
    )]
    let mean = Kelvin::new(sum / expected as f64);
    let elapsed = begin.elapsed();
    info!(city, %mean, ?elapsed, providers = expected, "aggregate computed");

    Ok(AggregateResult {
        mean,
        elapsed,
        providers: expected,
    })
}

async fn measure(
    provider: &dyn TemperaturePort,
    city: &str,
    deadline: Option<Duration>,
) -> Result<Kelvin, PortError> {
    match deadline {
        Some(limit) => tokio::time::timeout(limit, provider.temperature(city))
            .await
            .map_err(|_elapsed| PortError::Timeout(limit))?,
        None => provider.temperature(city).await,
    }
}

/// Handles of the provider tasks spawned for one request.
struct InFlight {
    policy: FailurePolicy,
    handles: Vec<JoinHandle<()>>,
}

impl InFlight {
    fn new(policy: FailurePolicy, capacity: usize) -> Self {
        Self {
            policy,
            handles: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, handle: JoinHandle<()>) {
        self.handles.push(handle);
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        // Dropping a JoinHandle detaches the task.
        if self.policy == FailurePolicy::Abort {
            for handle in &self.handles {
                handle.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    enum Behaviour {
        Reading(f64),
        Missing,
        Hang,
        Panic,
    }

    struct Stub {
        id: ProviderId,
        delay: Duration,
        behaviour: Behaviour,
        in_flight: Arc<AtomicUsize>,
    }

    struct Entered(Arc<AtomicUsize>);

    impl Entered {
        fn new(counter: &Arc<AtomicUsize>) -> Self {
            counter.fetch_add(1, Ordering::SeqCst);
            Self(Arc::clone(counter))
        }
    }

    impl Drop for Entered {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl TemperaturePort for Stub {
        fn id(&self) -> &ProviderId {
            &self.id
        }

        async fn temperature(&self, _city: &str) -> Result<Kelvin, PortError> {
            let _entered = Entered::new(&self.in_flight);
            tokio::time::sleep(self.delay).await;
            match self.behaviour {
                Behaviour::Reading(value) => Kelvin::checked(value),
                Behaviour::Missing => Err(PortError::DataMissing("main.temp")),
                Behaviour::Hang => std::future::pending().await,
                Behaviour::Panic => panic!("stub provider blew up"),
            }
        }
    }

    fn alive_tasks() -> usize {
        tokio::runtime::Handle::current().metrics().num_alive_tasks()
    }

    struct Fixture {
        in_flight: Arc<AtomicUsize>,
        providers: Vec<Arc<dyn TemperaturePort>>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                in_flight: Arc::new(AtomicUsize::new(0)),
                providers: Vec::new(),
            }
        }

        fn with(mut self, tag: &str, delay_ms: u64, behaviour: Behaviour) -> Self {
            self.providers.push(Arc::new(Stub {
                id: ProviderId::new(tag),
                delay: Duration::from_millis(delay_ms),
                behaviour,
                in_flight: Arc::clone(&self.in_flight),
            }));
            self
        }

        fn set(&self) -> ProviderSet {
            ProviderSet::new(self.providers.clone())
        }

        fn aggregator(&self, settings: AggregatorSettings) -> Aggregator {
            Aggregator::with_settings(Arc::new(self.set()), settings)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn averages_all_readings() {
        let fixture = Fixture::new()
            .with("a", 0, Behaviour::Reading(280.0))
            .with("b", 5, Behaviour::Reading(282.0))
            .with("c", 1, Behaviour::Reading(278.0));

        let result = aggregate_temperature(&fixture.set(), "London")
            .await
            .expect("all providers succeed");

        assert_eq!(result.mean, Kelvin::new(280.0), "mean of the three readings");
        assert_eq!(result.providers, 3, "every provider contributed");
    }

    #[tokio::test(start_paused = true)]
    async fn single_provider_is_its_own_mean() {
        let fixture = Fixture::new().with("only", 0, Behaviour::Reading(291.25));

        let result = aggregate_temperature(&fixture.set(), "Lisbon")
            .await
            .expect("provider succeeds");

        assert_eq!(result.mean, Kelvin::new(291.25), "single reading passes through");
    }

    #[tokio::test(start_paused = true)]
    async fn any_failure_fails_the_aggregate() {
        let fixture = Fixture::new()
            .with("good", 0, Behaviour::Reading(280.0))
            .with("bad", 0, Behaviour::Missing);

        let err = aggregate_temperature(&fixture.set(), "Paris")
            .await
            .expect_err("one provider fails");

        match err {
            AggregateError::Provider { provider, source } => {
                assert_eq!(provider, ProviderId::new("bad"), "failing provider is named");
                assert!(
                    matches!(source, PortError::DataMissing("main.temp")),
                    "error passes through unchanged"
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_failure_is_not_outrun_by_fast_successes() {
        let fixture = Fixture::new()
            .with("fast-1", 0, Behaviour::Reading(280.0))
            .with("fast-2", 0, Behaviour::Reading(281.0))
            .with("fast-3", 0, Behaviour::Reading(282.0))
            .with("slow-bad", 250, Behaviour::Missing);

        let result = aggregate_temperature(&fixture.set(), "Oslo").await;

        assert!(
            matches!(result, Err(AggregateError::Provider { .. })),
            "delayed failure still wins"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn same_inputs_give_same_mean() {
        let fixture = Fixture::new()
            .with("a", 3, Behaviour::Reading(273.15))
            .with("b", 1, Behaviour::Reading(300.0))
            .with("c", 2, Behaviour::Reading(250.5));
        let aggregator = fixture.aggregator(AggregatorSettings::default());

        let first = aggregator.temperature("Berlin").await.expect("succeeds").mean;
        for _ in 0..10 {
            let again = aggregator.temperature("Berlin").await.expect("succeeds").mean;
            assert_eq!(again, first, "deterministic providers yield a stable mean");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn providers_run_concurrently() {
        let fixture = Fixture::new()
            .with("a", 100, Behaviour::Reading(280.0))
            .with("b", 100, Behaviour::Reading(280.0))
            .with("c", 100, Behaviour::Reading(280.0));

        let result = aggregate_temperature(&fixture.set(), "Rome")
            .await
            .expect("succeeds");

        assert!(
            result.elapsed < Duration::from_millis(200),
            "three 100ms calls overlap, took {:?}",
            result.elapsed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn empty_set_is_an_error() {
        let result = aggregate_temperature(&ProviderSet::default(), "Nowhere").await;

        assert!(
            matches!(result, Err(AggregateError::NoProviders)),
            "nothing to average"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_provider_times_out() {
        let fixture = Fixture::new()
            .with("fine", 0, Behaviour::Reading(280.0))
            .with("stuck", 0, Behaviour::Hang);
        let aggregator = fixture.aggregator(AggregatorSettings {
            provider_timeout: Some(Duration::from_secs(2)),
            on_failure: FailurePolicy::Detach,
        });

        let err = aggregator.temperature("Cairo").await.expect_err("times out");

        assert!(
            matches!(
                err,
                AggregateError::Provider {
                    source: PortError::Timeout(_),
                    ..
                }
            ),
            "deadline surfaces as timeout, got {err}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_provider_reports_incomplete() {
        let fixture = Fixture::new()
            .with("fine", 0, Behaviour::Reading(280.0))
            .with("broken", 5, Behaviour::Panic);

        let err = aggregate_temperature(&fixture.set(), "Madrid")
            .await
            .expect_err("one task never reports");

        assert!(
            matches!(
                err,
                AggregateError::Incomplete {
                    received: 1,
                    expected: 2
                }
            ),
            "got {err}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn detached_producers_drain_after_early_failure() {
        let fixture = Fixture::new()
            .with("bad", 0, Behaviour::Missing)
            .with("slow-1", 500, Behaviour::Reading(280.0))
            .with("slow-2", 500, Behaviour::Reading(281.0))
            .with("slow-3", 500, Behaviour::Reading(282.0));
        let aggregator = fixture.aggregator(AggregatorSettings::default());
        let baseline = alive_tasks();

        for _ in 0..50 {
            let result = aggregator.temperature("Vienna").await;
            assert!(result.is_err(), "always fails");
        }
        assert!(alive_tasks() > baseline, "slow producers outlive the failed requests");

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(
            fixture.in_flight.load(Ordering::SeqCst),
            0,
            "orphaned provider calls completed"
        );
        assert_eq!(
            alive_tasks(),
            baseline,
            "orphaned producer tasks exited instead of blocking on send"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn abort_policy_cancels_siblings() {
        let fixture = Fixture::new()
            .with("bad", 0, Behaviour::Missing)
            .with("slow-1", 60_000, Behaviour::Reading(280.0))
            .with("slow-2", 60_000, Behaviour::Reading(281.0));
        let aggregator = fixture.aggregator(AggregatorSettings {
            provider_timeout: None,
            on_failure: FailurePolicy::Abort,
        });
        let baseline = alive_tasks();

        for _ in 0..20 {
            let result = aggregator.temperature("Prague").await;
            assert!(result.is_err(), "always fails");
        }

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(
            fixture.in_flight.load(Ordering::SeqCst),
            0,
            "aborted siblings released their slots long before their delay"
        );
        assert_eq!(alive_tasks(), baseline, "aborted tasks are gone");
    }
}
