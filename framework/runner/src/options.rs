use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::Serialize;

/// How long in-flight iterations may keep running after a scenario's duration has elapsed.
pub const DEFAULT_GRACEFUL_STOP: Duration = Duration::from_secs(30);

/// The strategy used to schedule iterations for a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutorKind {
    /// Start iterations at a fixed rate, regardless of how long each one takes.
    ConstantArrivalRate,
}

impl fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorKind::ConstantArrivalRate => f.write_str("constant-arrival-rate"),
        }
    }
}

/// The load profile for one scenario.
///
/// Serialises with camelCase field names and human readable durations, as printed by `--inspect`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioOptions {
    executor: ExecutorKind,
    #[serde(with = "humantime_serde")]
    duration: Duration,
    #[serde(rename = "preAllocatedVUs")]
    pre_allocated_vus: usize,
    env: BTreeMap<String, String>,
    rate: u32,
    #[serde(with = "humantime_serde")]
    time_unit: Duration,
    #[serde(with = "humantime_serde")]
    graceful_stop: Duration,
}

impl ScenarioOptions {
    /// Start `rate` iterations every `time_unit` for `duration`, using a pool of
    /// `pre_allocated_vus` virtual users.
    pub fn constant_arrival_rate(
        rate: u32,
        time_unit: Duration,
        duration: Duration,
        pre_allocated_vus: usize,
    ) -> Self {
        Self {
            executor: ExecutorKind::ConstantArrivalRate,
            duration,
            pre_allocated_vus,
            env: BTreeMap::new(),
            rate,
            time_unit,
            graceful_stop: DEFAULT_GRACEFUL_STOP,
        }
    }

    /// Set a scenario specific environment variable, which takes precedence over the global
    /// environment for iterations of this scenario.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_graceful_stop(mut self, graceful_stop: Duration) -> Self {
        self.graceful_stop = graceful_stop;
        self
    }

    pub fn executor(&self) -> ExecutorKind {
        self.executor
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn pre_allocated_vus(&self) -> usize {
        self.pre_allocated_vus
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn env_var(&self, name: &str) -> Option<&str> {
        self.env.get(name).map(String::as_str)
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    pub fn time_unit(&self) -> Duration {
        self.time_unit
    }

    pub fn graceful_stop(&self) -> Duration {
        self.graceful_stop
    }

    /// The gap between two consecutive iteration starts.
    pub fn iteration_interval(&self) -> Duration {
        self.time_unit / self.rate.max(1)
    }

    /// The number of iterations the scenario will start if a virtual user is always free.
    pub fn expected_iterations(&self) -> u64 {
        (self.duration.as_secs_f64() / self.time_unit.as_secs_f64() * self.rate as f64).floor()
            as u64
    }

    pub(crate) fn validate(&self, name: &str) -> anyhow::Result<()> {
        if self.rate == 0 {
            anyhow::bail!("Scenario [{name}] must have a rate greater than zero");
        }
        if self.time_unit.is_zero() {
            anyhow::bail!("Scenario [{name}] must have a non-zero time unit");
        }
        if self.duration.is_zero() {
            anyhow::bail!("Scenario [{name}] must have a non-zero duration");
        }
        if self.pre_allocated_vus == 0 {
            anyhow::bail!("Scenario [{name}] must pre-allocate at least one virtual user");
        }
        if self.iteration_interval().is_zero() {
            anyhow::bail!("Scenario [{name}] has a rate too high for its time unit");
        }

        Ok(())
    }
}

/// Every scenario a load test knows how to run, keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenarioCatalog {
    scenarios: BTreeMap<String, ScenarioOptions>,
}

impl ScenarioCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scenario to the catalog. Panics if the name is already taken, since that is a
    /// mistake in the load test definition rather than in the runtime configuration.
    pub fn with_scenario(mut self, name: &str, options: ScenarioOptions) -> Self {
        let previous = self.scenarios.insert(name.to_string(), options);

        if previous.is_some() {
            panic!("Scenario [{}] is already defined", name);
        }

        self
    }

    pub fn get(&self, name: &str) -> Option<&ScenarioOptions> {
        self.scenarios.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scenarios.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Narrow the catalog to a comma-separated list of scenario names.
    ///
    /// Every requested name gets an entry in the result. Names that are not in the catalog map
    /// to `None` so that the caller can decide what to do about them. Surrounding whitespace is
    /// ignored, as are empty entries such as the one left by a trailing comma.
    pub fn select(&self, names: &str) -> EnabledScenarios {
        let scenarios = names
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| (name.to_string(), self.get(name).cloned()))
            .collect();

        EnabledScenarios { scenarios }
    }
}

/// What to do with requested scenario names that are not in the catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownScenarioPolicy {
    /// Log a warning and run the scenarios that are known.
    #[default]
    Ignore,
    /// Refuse to run.
    Reject,
}

/// The result of [ScenarioCatalog::select].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnabledScenarios {
    scenarios: BTreeMap<String, Option<ScenarioOptions>>,
}

impl EnabledScenarios {
    /// The options for a requested scenario, or `None` if it was not requested or is unknown.
    pub fn get(&self, name: &str) -> Option<&ScenarioOptions> {
        self.scenarios.get(name).and_then(Option::as_ref)
    }

    /// True if the name was requested, whether or not the catalog knows it.
    pub fn is_requested(&self, name: &str) -> bool {
        self.scenarios.contains_key(name)
    }

    pub fn known(&self) -> impl Iterator<Item = (&str, &ScenarioOptions)> {
        self.scenarios
            .iter()
            .filter_map(|(name, options)| Some((name.as_str(), options.as_ref()?)))
    }

    pub fn unknown(&self) -> impl Iterator<Item = &str> {
        self.scenarios
            .iter()
            .filter(|(_, options)| options.is_none())
            .map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Resolve the selection into the set of scenarios that will run.
    pub fn into_options(self, policy: UnknownScenarioPolicy) -> anyhow::Result<Options> {
        let unknown = self.unknown().map(str::to_string).collect::<Vec<_>>();
        if !unknown.is_empty() {
            match policy {
                UnknownScenarioPolicy::Reject => {
                    return Err(UnknownScenarioError {
                        names: unknown.join(", "),
                    }
                    .into());
                }
                UnknownScenarioPolicy::Ignore => {
                    log::warn!("Ignoring unknown scenarios: {}", unknown.join(", "));
                }
            }
        }

        let scenarios = self
            .scenarios
            .into_iter()
            .filter_map(|(name, options)| Some((name, options?)))
            .collect::<BTreeMap<_, _>>();

        if scenarios.is_empty() {
            anyhow::bail!("No known scenarios were selected");
        }

        Ok(Options { scenarios })
    }
}

#[derive(derive_more::Error, derive_more::Display, Debug)]
#[display("Unknown scenarios requested: {names}")]
pub struct UnknownScenarioError {
    names: String,
}

/// The scenarios that a run will execute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Options {
    scenarios: BTreeMap<String, ScenarioOptions>,
}

impl Options {
    pub fn scenarios(&self) -> &BTreeMap<String, ScenarioOptions> {
        &self.scenarios
    }

    /// The longest duration of any scenario. Scenarios run concurrently so this is how long the
    /// run is planned to take, ignoring graceful stop.
    pub fn peak_duration(&self) -> Duration {
        self.scenarios
            .values()
            .map(ScenarioOptions::duration)
            .max()
            .unwrap_or_default()
    }

    pub(crate) fn validate(&self) -> anyhow::Result<()> {
        for (name, options) in &self.scenarios {
            options.validate(name)?;
        }

        Ok(())
    }
}
