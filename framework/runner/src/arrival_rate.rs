//! The constant-arrival-rate executor.
//!
//! Iterations start on a fixed schedule of `time_unit / rate`, independent of how long each one
//! takes. Each iteration needs a virtual user from a fixed-size pool. When an iteration is due and
//! every virtual user is busy, the iteration is dropped rather than queued, so a slow target shows
//! up as dropped iterations instead of a drifting request rate.

use std::sync::Arc;

use parking_lot::Mutex;
use surge_instruments::OperationRecord;
use surge_summary_model::ScenarioOutcome;
use tokio::task::{JoinError, JoinSet};
use tokio::time::MissedTickBehavior;

use crate::context::{IterationContext, RunnerContext, UserValuesConstraint};
use crate::definition::IterationFn;
use crate::options::ScenarioOptions;

/// A fixed set of virtual user ids which iterations borrow while they run.
#[derive(Debug, Clone)]
struct VuPool {
    free: Arc<Mutex<Vec<usize>>>,
}

impl VuPool {
    fn new(size: usize) -> Self {
        Self {
            free: Arc::new(Mutex::new((1..=size).rev().collect())),
        }
    }

    fn checkout(&self) -> Option<VuLease> {
        let id = self.free.lock().pop()?;
        Some(VuLease {
            id,
            pool: self.clone(),
        })
    }
}

/// Returns the virtual user to its pool when dropped, including when the iteration is aborted.
#[derive(Debug)]
struct VuLease {
    id: usize,
    pool: VuPool,
}

impl Drop for VuLease {
    fn drop(&mut self) {
        self.pool.free.lock().push(self.id);
    }
}

enum IterationEnd {
    Completed,
    Failed,
}

pub(crate) async fn run_constant_arrival_rate<RV: UserValuesConstraint>(
    name: String,
    options: ScenarioOptions,
    runner_context: Arc<RunnerContext<RV>>,
    iteration_fn: IterationFn<RV>,
) -> ScenarioOutcome {
    let name: Arc<str> = name.into();
    let options = Arc::new(options);
    let pool = VuPool::new(options.pre_allocated_vus());
    let mut shutdown_listener = runner_context.new_shutdown_listener();

    log::info!(
        "Starting scenario [{}] for run {}: {}, {} iterations per {:?} for {:?} ({} expected) with {} VUs",
        name,
        runner_context.run_id(),
        options.executor(),
        options.rate(),
        options.time_unit(),
        options.duration(),
        options.expected_iterations(),
        options.pre_allocated_vus()
    );

    let mut outcome = ScenarioOutcome::default();
    let mut in_flight = JoinSet::new();
    let mut next_iteration = 0u64;

    let mut ticker = tokio::time::interval(options.iteration_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

    let deadline = tokio::time::sleep(options.duration());
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            biased;

            _ = &mut deadline => {
                log::debug!("Scenario [{}] reached its duration", name);
                break;
            }
            _ = shutdown_listener.wait_for_shutdown() => {
                log::info!("Scenario [{}] stopping early on shutdown", name);
                break;
            }
            Some(result) = in_flight.join_next(), if !in_flight.is_empty() => {
                tally(&name, &mut outcome, result);
            }
            _ = ticker.tick() => {
                let Some(lease) = pool.checkout() else {
                    outcome.dropped += 1;
                    log::debug!("Scenario [{}] dropped iteration {}, no free VU", name, next_iteration);
                    continue;
                };

                let context = IterationContext::new(
                    runner_context.clone(),
                    name.clone(),
                    options.clone(),
                    lease.id,
                    next_iteration,
                );
                next_iteration += 1;
                outcome.started += 1;

                in_flight.spawn(run_iteration(context, iteration_fn, lease));
            }
        }
    }

    let drain = async {
        while let Some(result) = in_flight.join_next().await {
            tally(&name, &mut outcome, result);
        }
    };
    if tokio::time::timeout(options.graceful_stop(), drain)
        .await
        .is_err()
    {
        log::warn!(
            "Scenario [{}] interrupting {} iterations still running after graceful stop of {:?}",
            name,
            in_flight.len(),
            options.graceful_stop()
        );
        in_flight.abort_all();
        while let Some(result) = in_flight.join_next().await {
            tally(&name, &mut outcome, result);
        }
    }

    if outcome.started + outcome.dropped < options.expected_iterations() {
        log::debug!(
            "Scenario [{}] scheduled {} of {} expected iterations",
            name,
            outcome.started + outcome.dropped,
            options.expected_iterations()
        );
    }
    if outcome.dropped > 0 {
        log::warn!(
            "Scenario [{}] dropped {} iterations, consider pre-allocating more VUs",
            name,
            outcome.dropped
        );
    }
    log::info!("Finished scenario [{}]: {:?}", name, outcome);

    outcome
}

async fn run_iteration<RV: UserValuesConstraint>(
    context: IterationContext<RV>,
    iteration_fn: IterationFn<RV>,
    lease: VuLease,
) -> IterationEnd {
    let reporter = context.reporter().clone();
    let record = OperationRecord::new(format!("iteration:{}", context.scenario_name()));

    let result = iteration_fn(context).await;
    drop(lease);

    let end = match &result {
        Ok(()) => IterationEnd::Completed,
        Err(e) => {
            log::error!("Iteration failed: {:?}", e);
            IterationEnd::Failed
        }
    };
    surge_instruments::report_operation(&reporter, record, &result);

    end
}

fn tally(name: &str, outcome: &mut ScenarioOutcome, result: Result<IterationEnd, JoinError>) {
    match result {
        Ok(IterationEnd::Completed) => outcome.completed += 1,
        Ok(IterationEnd::Failed) => outcome.failed += 1,
        Err(e) if e.is_cancelled() => outcome.interrupted += 1,
        Err(e) => {
            log::error!("Iteration in scenario [{}] panicked: {:?}", name, e);
            outcome.failed += 1;
        }
    }
}
