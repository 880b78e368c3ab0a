mod arrival_rate;
mod cli;
mod context;
mod definition;
mod environment;
mod executor;
mod init;
mod monitor;
mod options;
mod progress;
mod run;
mod shutdown;
mod types;

pub mod prelude {
    pub use crate::cli::{ReporterOpt, SurgeCli};
    pub use crate::context::UserValuesConstraint;
    pub use crate::context::{IterationContext, RunnerContext};
    pub use crate::definition::{HookResult, IterationFn, LoadTestDefinitionBuilder};
    pub use crate::environment::{Environment, MissingVariableError};
    pub use crate::executor::Executor;
    pub use crate::init::init;
    pub use crate::options::{
        EnabledScenarios, ExecutorKind, Options, ScenarioCatalog, ScenarioOptions,
        UnknownScenarioError, UnknownScenarioPolicy, DEFAULT_GRACEFUL_STOP,
    };
    pub use crate::run::run;
    pub use crate::types::SurgeResult;

    pub use futures::future::BoxFuture;
    pub use surge_instruments::prelude::*;
    pub use surge_summary_model::{CheckOutcome, RunSummary, ScenarioOutcome};
}
