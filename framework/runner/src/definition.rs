use futures::future::BoxFuture;

use crate::cli::SurgeCli;
use crate::context::{IterationContext, RunnerContext, UserValuesConstraint};
use crate::environment::Environment;
use crate::options::{EnabledScenarios, Options, UnknownScenarioPolicy};

pub type HookResult = anyhow::Result<()>;

pub type GlobalHookMut<RV> = fn(&mut RunnerContext<RV>) -> HookResult;

/// The function run once per scheduled iteration.
///
/// Returning an error marks the iteration as failed. It is logged and counted but never stops the
/// scenario.
pub type IterationFn<RV> = fn(IterationContext<RV>) -> BoxFuture<'static, HookResult>;

/// The builder for a load test definition.
///
/// This must be used at the start of a load test to define what you want to run.
pub struct LoadTestDefinitionBuilder<RV: UserValuesConstraint> {
    /// The name of the load test.
    ///
    /// Recommended value is `env!("CARGO_PKG_NAME")`.
    name: String,
    /// The parsed command line for this run.
    cli: SurgeCli,
    /// The environment the load test sees. Defaults to the process environment.
    environment: Option<Environment>,
    /// The scenarios selected from the load test's catalog.
    scenarios: Option<EnabledScenarios>,
    /// Environment variables to include in the run summary.
    summary_env: Vec<String>,
    /// Environment variables to list in the run summary with their value redacted.
    secret_env: Vec<String>,
    /// Global setup hook for this load test. It will be run once, before any scenario starts.
    setup_fn: Option<GlobalHookMut<RV>>,
    /// The function run for every iteration of every scenario.
    iteration_fn: Option<IterationFn<RV>>,
}

pub(crate) struct LoadTestDefinition<RV: UserValuesConstraint> {
    pub name: String,
    pub cli: SurgeCli,
    pub environment: Environment,
    pub options: Options,
    pub summary_env: Vec<String>,
    pub secret_env: Vec<String>,
    pub setup_fn: Option<GlobalHookMut<RV>>,
    pub iteration_fn: IterationFn<RV>,
}

impl<RV: UserValuesConstraint> LoadTestDefinitionBuilder<RV> {
    /// Initialise a new load test definition from its name and command line arguments.
    /// See the [LoadTestDefinitionBuilder::name] for more information about the name.
    pub fn new(name: &str, cli: SurgeCli) -> Self {
        Self {
            name: name.to_string(),
            cli,
            environment: None,
            scenarios: None,
            summary_env: Vec::new(),
            secret_env: Vec::new(),
            setup_fn: None,
            iteration_fn: None,
        }
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    pub fn with_scenarios(mut self, scenarios: EnabledScenarios) -> Self {
        self.scenarios = Some(scenarios);
        self
    }

    /// Record the values of these environment variables in the run summary.
    pub fn with_summary_env(mut self, names: &[&str]) -> Self {
        self.summary_env
            .extend(names.iter().map(|name| name.to_string()));
        self
    }

    /// Record that these environment variables were set, without their values.
    pub fn with_secret_env(mut self, names: &[&str]) -> Self {
        self.secret_env
            .extend(names.iter().map(|name| name.to_string()));
        self
    }

    /// Set the global setup hook [LoadTestDefinitionBuilder::setup_fn] for this load test.
    pub fn use_setup(mut self, setup_fn: GlobalHookMut<RV>) -> Self {
        self.setup_fn = Some(setup_fn);
        self
    }

    /// Set the iteration function [LoadTestDefinitionBuilder::iteration_fn] for this load test.
    pub fn use_iteration(mut self, iteration_fn: IterationFn<RV>) -> Self {
        self.iteration_fn = Some(iteration_fn);
        self
    }

    pub(crate) fn build(self) -> anyhow::Result<LoadTestDefinition<RV>> {
        let Some(iteration_fn) = self.iteration_fn else {
            anyhow::bail!("No iteration function defined for [{}]", self.name);
        };
        let Some(scenarios) = self.scenarios else {
            anyhow::bail!("No scenarios selected for [{}]", self.name);
        };

        let policy = if self.cli.strict_scenarios {
            UnknownScenarioPolicy::Reject
        } else {
            UnknownScenarioPolicy::Ignore
        };
        let options = scenarios.into_options(policy)?;
        options.validate()?;

        Ok(LoadTestDefinition {
            name: self.name,
            cli: self.cli,
            environment: self.environment.unwrap_or_else(Environment::from_process),
            options,
            summary_env: self.summary_env,
            secret_env: self.secret_env,
            setup_fn: self.setup_fn,
            iteration_fn,
        })
    }
}
