//! Refresh cycle
//!
//! Runs one pass immediately, then one pass per interval. A pass fetches each
//! metric, renders its label and publishes it, one target at a time, pausing
//! between renames. Failures are logged per target and never abort the pass.
//!
//! ```text
//! RefreshCycle::run()
//!     ↓ every interval (first tick immediate)
//! run_pass()  ── skipped if a pass is already running
//!     ↓
//! MetricProvider::fetch ─→ aggregator::combine
//!     ↓
//! ChannelPublisher::publish (pause between renames)
//! ```

use crate::{
    aggregator,
    config::RefreshPlan,
    provider::MetricProvider,
    publisher::{ChannelPublisher, PublishStatus},
    types::{MetricResult, RefreshOutcome, TargetChannel, TargetStatus, Unit},
};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::{interval, sleep, Instant, MissedTickBehavior};
use tracing::Instrument;

/// Releases the running flag when a pass ends
struct PassGuard<'a> {
    running: &'a AtomicBool,
}

impl<'a> PassGuard<'a> {
    fn acquire(running: &'a AtomicBool) -> Option<Self> {
        running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { running })
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Per-pass bookkeeping
struct PassState {
    outcome: RefreshOutcome,
    published_once: bool,
}

/// Periodic fetch-and-publish loop
pub struct RefreshCycle {
    provider: Arc<dyn MetricProvider>,
    publisher: ChannelPublisher,
    plan: RefreshPlan,
    running: AtomicBool,
}

impl RefreshCycle {
    /// Creates a cycle over an explicit provider and publisher
    pub fn new(provider: Arc<dyn MetricProvider>, publisher: ChannelPublisher, plan: RefreshPlan) -> Self {
        Self {
            provider,
            publisher,
            plan,
            running: AtomicBool::new(false),
        }
    }

    /// True while a pass is in progress
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Runs passes until `shutdown` resolves
    ///
    /// The first pass starts immediately. A tick that falls due while a pass
    /// is running is dropped, not queued. Shutdown is only observed between
    /// passes; a pass in progress always runs to completion.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut ticker = interval(self.plan.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            interval_secs = self.plan.interval.as_secs(),
            provider = self.provider.provider_name(),
            platform = self.publisher.platform_name(),
            "Starting refresh cycle"
        );

        // End of the last pass; ticks due before it fired while it was running
        let mut last_pass_end: Option<Instant> = None;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested, stopping refresh cycle");
                    break;
                }
                deadline = ticker.tick() => {
                    if last_pass_end.is_some_and(|end| deadline < end) {
                        tracing::warn!("Previous pass still running, skipping this tick");
                        continue;
                    }
                    self.run_pass().await;
                    last_pass_end = Some(Instant::now());
                }
            }
        }
    }

    /// Runs one pass
    ///
    /// Returns `None` without doing anything if another pass is in progress.
    pub async fn run_pass(&self) -> Option<RefreshOutcome> {
        let Some(_guard) = PassGuard::acquire(&self.running) else {
            tracing::warn!("Previous pass still running, skipping this tick");
            return None;
        };

        let state = PassState {
            outcome: RefreshOutcome::new(),
            published_once: false,
        };
        let span = tracing::info_span!("pass", pass_id = %state.outcome.pass_id);
        let outcome = self.execute(state).instrument(span).await;
        Some(outcome)
    }

    async fn execute(&self, mut state: PassState) -> RefreshOutcome {
        let plan = &self.plan;
        let targets = &plan.targets;

        // 1. Floor price
        let floor = self.provider.fetch(&plan.floor).await;
        self.publish_metric(&mut state, &targets.floor, &floor).await;

        // 2. Market cap, derived from the spot price
        let spot = self.provider.fetch(&plan.spot).await;
        let market_cap = aggregator::combine(
            std::slice::from_ref(&spot),
            plan.market_cap_formula,
            plan.market_cap_rounding,
            Unit::USD,
        );
        self.publish_metric(&mut state, &targets.market_cap, &market_cap).await;

        // 3. Spot price, same reading as the market cap
        self.publish_metric(&mut state, &targets.spot, &spot).await;

        // 4. Optional 24h volume
        if let Some(volume_target) = &targets.volume {
            let volume = self.provider.fetch(&plan.volume).await;
            self.publish_metric(&mut state, volume_target, &volume).await;
        }

        let outcome = state.outcome;
        tracing::info!(
            succeeded = outcome.succeeded(),
            failed = outcome.failed(),
            unavailable = outcome.unavailable(),
            elapsed_ms = (chrono::Utc::now() - outcome.started_at).num_milliseconds(),
            "Pass complete"
        );
        outcome
    }

    async fn publish_metric(&self, state: &mut PassState, target: &TargetChannel, metric: &MetricResult) {
        let Some(label) = target.label(metric) else {
            tracing::warn!(
                role = target.role.name(),
                channel_id = %target.id,
                "Metric unavailable, keeping previous channel name"
            );
            state.outcome.record(&target.id, TargetStatus::MetricUnavailable);
            return;
        };

        if state.published_once {
            sleep(self.plan.publish_pause).await;
        }
        state.published_once = true;

        let status = match self.publisher.publish(&target.id, &label).await {
            PublishStatus::Renamed => TargetStatus::Published,
            PublishStatus::Unchanged => TargetStatus::Unchanged,
            PublishStatus::Failed(e) => TargetStatus::Failed(e),
        };
        tracing::debug!(role = target.role.name(), label = %label, status = ?status, "Target processed");
        state.outcome.record(&target.id, status);
    }
}

/// Fetches every metric of a plan and renders the labels without publishing
pub async fn preview_labels(
    provider: &dyn MetricProvider,
    plan: &RefreshPlan,
) -> Vec<(TargetChannel, Option<String>)> {
    let targets = &plan.targets;
    let floor = provider.fetch(&plan.floor).await;
    let spot = provider.fetch(&plan.spot).await;
    let market_cap = aggregator::combine(
        std::slice::from_ref(&spot),
        plan.market_cap_formula,
        plan.market_cap_rounding,
        Unit::USD,
    );

    let mut labels = vec![
        (targets.floor.clone(), targets.floor.label(&floor)),
        (targets.market_cap.clone(), targets.market_cap.label(&market_cap)),
        (targets.spot.clone(), targets.spot.label(&spot)),
    ];
    if let Some(volume_target) = &targets.volume {
        let volume = provider.fetch(&plan.volume).await;
        labels.push((volume_target.clone(), volume_target.label(&volume)));
    }
    labels
}
