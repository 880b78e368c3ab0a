//! Load test for the cluster endpoints.
//!
//! Pick scenarios with `SCENARIOS` (comma-separated), point them at a host with `DOMAIN` and
//! authenticate with `TOKEN`. Every iteration sends one GET to the scenario's URL and checks for
//! status 200.

mod catalog;
mod request;

use std::sync::Arc;

use anyhow::Context;
use surge_runner::prelude::*;

use crate::catalog::{enabled_scenarios, DOMAIN_ENV, SCENARIOS_ENV};
use crate::request::{check_endpoint, HttpGet, ReqwestHttpGet};

#[derive(Debug, Default)]
struct ClusterRunnerContext {
    client: Option<Arc<dyn HttpGet>>,
}

impl UserValuesConstraint for ClusterRunnerContext {}

fn setup(ctx: &mut RunnerContext<ClusterRunnerContext>) -> HookResult {
    ctx.get_mut().client = Some(Arc::new(ReqwestHttpGet::new()?));
    Ok(())
}

fn iteration(ctx: IterationContext<ClusterRunnerContext>) -> BoxFuture<'static, HookResult> {
    Box::pin(async move {
        let client = ctx
            .runner_context()
            .get()
            .client
            .clone()
            .context("HTTP client was not set up")?;

        check_endpoint(
            client.as_ref(),
            ctx.env_var("URL"),
            ctx.env_var("TOKEN"),
            ctx.reporter(),
        )
        .await;

        Ok(())
    })
}

fn main() -> SurgeResult<()> {
    let cli = init();

    let environment = Environment::from_process();
    let scenarios = enabled_scenarios(&environment)?;

    let builder = LoadTestDefinitionBuilder::<ClusterRunnerContext>::new(
        env!("CARGO_PKG_NAME"),
        cli,
    )
    .with_environment(environment)
    .with_scenarios(scenarios)
    .with_summary_env(&[DOMAIN_ENV, SCENARIOS_ENV])
    .with_secret_env(&["TOKEN"])
    .use_setup(setup)
    .use_iteration(iteration);

    let summary = run(builder)?;

    if !summary.all_checks_passed() {
        log::warn!("Some checks failed during run {}", summary.run_id);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use reqwest::header::{HeaderMap, AUTHORIZATION};
    use reqwest::StatusCode;

    use super::*;
    use crate::request::GET_STATUS_IS_200;

    const SCENARIO_URL: &str = "https://example.com/Base/shared-cluster/about";

    /// Answers 200 only for the scenario URL with the expected bearer token.
    #[derive(Debug)]
    struct ScenarioUrlOnly;

    impl HttpGet for ScenarioUrlOnly {
        fn get<'a>(
            &'a self,
            url: &'a str,
            headers: HeaderMap,
        ) -> BoxFuture<'a, anyhow::Result<StatusCode>> {
            Box::pin(async move {
                let authorized = headers[AUTHORIZATION] == "Bearer abc";
                if url == SCENARIO_URL && authorized {
                    Ok(StatusCode::OK)
                } else {
                    Ok(StatusCode::NOT_FOUND)
                }
            })
        }
    }

    fn fake_setup(ctx: &mut RunnerContext<ClusterRunnerContext>) -> HookResult {
        ctx.get_mut().client = Some(Arc::new(ScenarioUrlOnly));
        Ok(())
    }

    fn cli() -> SurgeCli {
        SurgeCli {
            strict_scenarios: true,
            no_progress: true,
            reporter: ReporterOpt::Noop,
            run_id: None,
            summary_file: None,
            inspect: false,
        }
    }

    fn short_catalog() -> ScenarioCatalog {
        ScenarioCatalog::new().with_scenario(
            "shared_about_scenario",
            ScenarioOptions::constant_arrival_rate(
                10,
                Duration::from_secs(1),
                Duration::from_millis(300),
                2,
            )
            .with_env("URL", SCENARIO_URL),
        )
    }

    fn builder(environment: Environment) -> LoadTestDefinitionBuilder<ClusterRunnerContext> {
        LoadTestDefinitionBuilder::<ClusterRunnerContext>::new("cluster_endpoints_test", cli())
            .with_environment(environment)
            .with_scenarios(short_catalog().select("shared_about_scenario"))
            .use_setup(fake_setup)
            .use_iteration(iteration)
    }

    #[test]
    fn iteration_requests_the_scenario_url_with_the_token() {
        let environment = Environment::default()
            .with_var("URL", "https://example.com/global")
            .with_var("TOKEN", "abc");

        let summary = run(builder(environment)).unwrap();

        let outcome = summary.scenarios["shared_about_scenario"];
        let check = summary.checks[GET_STATUS_IS_200];
        assert!(outcome.started > 0);
        assert_eq!(outcome.started, outcome.completed);
        assert_eq!(outcome.started, check.passes);
        assert_eq!(0, check.fails);
    }

    #[test]
    fn iteration_without_token_fails_the_check() {
        let summary = run(builder(Environment::default())).unwrap();

        let outcome = summary.scenarios["shared_about_scenario"];
        let check = summary.checks[GET_STATUS_IS_200];
        assert!(outcome.started > 0);
        assert_eq!(0, check.passes);
        assert_eq!(outcome.started, check.fails);
    }
}
