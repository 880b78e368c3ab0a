use std::sync::Arc;

use anyhow::Context;
use surge_core::prelude::ShutdownHandle;
use surge_instruments::ReportConfig;
use surge_summary_model::{append_run_summary, CheckOutcome, RunSummary};

use crate::arrival_rate::run_constant_arrival_rate;
use crate::cli::ReporterOpt;
use crate::context::{RunnerContext, UserValuesConstraint};
use crate::definition::{LoadTestDefinition, LoadTestDefinitionBuilder};
use crate::executor::Executor;
use crate::monitor::start_monitor;
use crate::progress::start_progress;
use crate::shutdown::start_shutdown_listener;

const REDACTED: &str = "<redacted>";

/// Run a load test to completion and return a summary of what happened.
///
/// Configuration problems and a failing setup hook are returned as errors before any load is
/// generated. Once scenarios are running, failed iterations and failed checks are reported in the
/// summary but never turn into an error.
pub fn run<RV: UserValuesConstraint>(
    definition: LoadTestDefinitionBuilder<RV>,
) -> anyhow::Result<RunSummary> {
    let definition = definition.build()?;

    log::info!("Running load test: {}", definition.name);

    let run_id = definition
        .cli
        .run_id
        .clone()
        .unwrap_or_else(|| nanoid::nanoid!());
    let started_at = chrono::Utc::now().timestamp();
    let mut summary = RunSummary::new(
        run_id.clone(),
        definition.name.clone(),
        started_at,
        definition.options.peak_duration().as_secs(),
        env!("CARGO_PKG_VERSION").to_string(),
    );
    record_env(&definition, &mut summary);

    if definition.cli.inspect {
        println!(
            "{}",
            serde_json::to_string_pretty(&definition.options)
                .context("Failed to serialize options")?
        );
        return Ok(summary);
    }

    let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    let shutdown_handle = ShutdownHandle::new();
    let executor = Arc::new(Executor::new(
        runtime.handle().clone(),
        shutdown_handle.clone(),
    ));
    start_shutdown_listener(&executor, shutdown_handle.clone());
    let report_config = match definition.cli.reporter {
        ReporterOpt::InMemory => ReportConfig::default().enable_in_memory(),
        ReporterOpt::Noop => ReportConfig::default(),
    };
    let reporter = Arc::new(report_config.init());
    let mut runner_context = RunnerContext::new(
        executor,
        reporter,
        shutdown_handle.clone(),
        Arc::new(definition.environment.clone()),
        run_id,
    );

    if let Some(setup_fn) = &definition.setup_fn {
        setup_fn(&mut runner_context)?;
    }

    let runner_context = Arc::new(runner_context);

    if !definition.cli.no_progress {
        start_progress(
            definition.options.peak_duration(),
            shutdown_handle.new_listener(),
        )?;
    }

    // Ready to start scenarios so start the resource monitor to report high usage by the load
    // generator, which might lead to a misleading outcome.
    start_monitor(shutdown_handle.new_listener())?;

    let scenarios = definition
        .options
        .scenarios()
        .iter()
        .map(|(name, options)| {
            let name = name.clone();
            let runner_context = runner_context.clone();
            let options = options.clone();
            let iteration_fn = definition.iteration_fn;
            async move {
                let outcome = run_constant_arrival_rate(
                    name.clone(),
                    options,
                    runner_context,
                    iteration_fn,
                )
                .await;
                (name, outcome)
            }
        })
        .collect::<Vec<_>>();

    let outcomes = runtime.block_on(futures::future::join_all(scenarios));

    // Stops the progress bar and resource monitor.
    shutdown_handle.shutdown();

    runner_context.reporter().finalize();

    for (name, outcome) in outcomes {
        summary.add_scenario(name, outcome);
    }
    for (name, tally) in runner_context.reporter().check_tallies() {
        summary.add_check(
            name,
            CheckOutcome {
                passes: tally.passes,
                fails: tally.fails,
            },
        );
    }

    if let Some(path) = &definition.cli.summary_file {
        append_run_summary(&summary, path)
            .with_context(|| format!("Failed to write run summary to {}", path.display()))?;
    }

    Ok(summary)
}

fn record_env<RV: UserValuesConstraint>(
    definition: &LoadTestDefinition<RV>,
    summary: &mut RunSummary,
) {
    for name in &definition.summary_env {
        if let Some(value) = definition.environment.get(name) {
            summary.add_env(name.clone(), value.to_string());
        }
    }
    for name in &definition.secret_env {
        if definition.environment.get(name).is_some() {
            summary.add_env(name.clone(), REDACTED.to_string());
        }
    }
}
