use std::{fmt::Debug, sync::Arc};

use surge_core::prelude::{DelegatedShutdownListener, ShutdownHandle};
use surge_instruments::Reporter;

use crate::environment::Environment;
use crate::executor::Executor;
use crate::options::ScenarioOptions;

pub trait UserValuesConstraint: Default + Debug + Send + Sync + 'static {}

/// Shared state for the whole run. Built before any scenario starts and read-only once the setup
/// hook has finished.
#[derive(Debug)]
pub struct RunnerContext<RV: UserValuesConstraint> {
    executor: Arc<Executor>,
    reporter: Arc<Reporter>,
    shutdown_handle: ShutdownHandle,
    environment: Arc<Environment>,
    run_id: String,
    value: RV,
}

impl<RV: UserValuesConstraint> RunnerContext<RV> {
    pub(crate) fn new(
        executor: Arc<Executor>,
        reporter: Arc<Reporter>,
        shutdown_handle: ShutdownHandle,
        environment: Arc<Environment>,
        run_id: String,
    ) -> Self {
        Self {
            executor,
            reporter,
            shutdown_handle,
            environment,
            run_id,
            value: Default::default(),
        }
    }

    pub fn executor(&self) -> &Arc<Executor> {
        &self.executor
    }

    pub fn reporter(&self) -> &Arc<Reporter> {
        &self.reporter
    }

    /// The environment the load test was started with.
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Stop every scenario early. In-flight iterations still get their graceful stop window.
    pub fn force_stop_scenario(&self) {
        self.shutdown_handle.shutdown();
    }

    pub(crate) fn new_shutdown_listener(&self) -> DelegatedShutdownListener {
        self.shutdown_handle.new_listener()
    }

    pub fn get_mut(&mut self) -> &mut RV {
        &mut self.value
    }

    pub fn get(&self) -> &RV {
        &self.value
    }
}

/// Everything an iteration function can see about the iteration it is running.
#[derive(Debug)]
pub struct IterationContext<RV: UserValuesConstraint> {
    runner_context: Arc<RunnerContext<RV>>,
    scenario_name: Arc<str>,
    scenario: Arc<ScenarioOptions>,
    vu_id: usize,
    iteration: u64,
}

impl<RV: UserValuesConstraint> IterationContext<RV> {
    pub(crate) fn new(
        runner_context: Arc<RunnerContext<RV>>,
        scenario_name: Arc<str>,
        scenario: Arc<ScenarioOptions>,
        vu_id: usize,
        iteration: u64,
    ) -> Self {
        Self {
            runner_context,
            scenario_name,
            scenario,
            vu_id,
            iteration,
        }
    }

    pub fn runner_context(&self) -> &Arc<RunnerContext<RV>> {
        &self.runner_context
    }

    pub fn reporter(&self) -> &Arc<Reporter> {
        self.runner_context.reporter()
    }

    pub fn scenario_name(&self) -> &str {
        &self.scenario_name
    }

    /// The virtual user running this iteration, counting from 1 within the scenario.
    pub fn vu_id(&self) -> usize {
        self.vu_id
    }

    /// The index of this iteration within the scenario, counting from 0.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Look up an environment variable, preferring the scenario's own `env` over the global
    /// environment.
    pub fn env_var(&self, name: &str) -> Option<&str> {
        self.scenario
            .env_var(name)
            .or_else(|| self.runner_context.environment().get(name))
    }
}
