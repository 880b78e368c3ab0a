use std::time::Duration;

use surge_runner::prelude::{EnabledScenarios, Environment, ScenarioCatalog, ScenarioOptions};

pub const SHARED_ABOUT_SCENARIO: &str = "shared_about_scenario";
pub const DEDICATED_TEST_SCENARIO: &str = "dedicated_test_scenario";
pub const DEDICATED_HOSTNAME_SCENARIO: &str = "dedicated_hostname_scenario";

/// Hostname the scenario URLs are built from.
pub const DOMAIN_ENV: &str = "DOMAIN";
/// Comma-separated names of the scenarios to run.
pub const SCENARIOS_ENV: &str = "SCENARIOS";

/// Every scenario this load test can run, with URLs pointing at `domain`.
pub fn possible_scenarios(domain: &str) -> ScenarioCatalog {
    ScenarioCatalog::new()
        .with_scenario(
            SHARED_ABOUT_SCENARIO,
            cluster_scenario(format!("https://{domain}/Base/shared-cluster/about")),
        )
        .with_scenario(
            DEDICATED_TEST_SCENARIO,
            cluster_scenario(format!("https://{domain}/Base/dedicated-cluster/test")),
        )
        .with_scenario(
            DEDICATED_HOSTNAME_SCENARIO,
            cluster_scenario(format!("https://{domain}/Base/dedicated-cluster/hostname")),
        )
}

fn cluster_scenario(url: String) -> ScenarioOptions {
    ScenarioOptions::constant_arrival_rate(10, Duration::from_secs(1), Duration::from_secs(20), 10)
        .with_env("URL", url)
}

/// Select the scenarios named in `SCENARIOS` from the catalog for `DOMAIN`.
///
/// Names that are not in the catalog are kept as absent entries. Whether they stop the run is up
/// to the runner's unknown scenario policy.
pub fn enabled_scenarios(environment: &Environment) -> anyhow::Result<EnabledScenarios> {
    let domain = environment.require(DOMAIN_ENV)?;
    let names = environment.require(SCENARIOS_ENV)?;

    Ok(possible_scenarios(domain).select(names))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use surge_runner::prelude::{ExecutorKind, UnknownScenarioPolicy};

    use super::*;

    fn environment(scenarios: &str) -> Environment {
        Environment::default()
            .with_var(DOMAIN_ENV, "example.com")
            .with_var(SCENARIOS_ENV, scenarios)
            .with_var("TOKEN", "abc")
    }

    #[test]
    fn every_catalog_url_uses_the_domain() {
        let catalog = possible_scenarios("load.example.org");

        let urls = catalog
            .names()
            .map(|name| {
                let url = catalog.get(name).and_then(|s| s.env_var("URL"));
                (name, url.map(str::to_string))
            })
            .collect::<Vec<_>>();

        assert_eq!(
            vec![
                (
                    DEDICATED_HOSTNAME_SCENARIO,
                    Some("https://load.example.org/Base/dedicated-cluster/hostname".to_string())
                ),
                (
                    DEDICATED_TEST_SCENARIO,
                    Some("https://load.example.org/Base/dedicated-cluster/test".to_string())
                ),
                (
                    SHARED_ABOUT_SCENARIO,
                    Some("https://load.example.org/Base/shared-cluster/about".to_string())
                ),
            ],
            urls
        );
    }

    #[test]
    fn selected_scenarios_keep_their_catalog_options() {
        let enabled = enabled_scenarios(&environment(
            "shared_about_scenario,dedicated_hostname_scenario",
        ))
        .unwrap();
        let catalog = possible_scenarios("example.com");

        assert_eq!(2, enabled.len());
        for name in [SHARED_ABOUT_SCENARIO, DEDICATED_HOSTNAME_SCENARIO] {
            assert_eq!(catalog.get(name), enabled.get(name));
        }
        assert_eq!(None, enabled.get(DEDICATED_TEST_SCENARIO));
    }

    #[test]
    fn unknown_scenario_entry_is_absent() {
        let enabled =
            enabled_scenarios(&environment("shared_about_scenario,not_a_scenario")).unwrap();

        assert!(enabled.is_requested("not_a_scenario"));
        assert_eq!(None, enabled.get("not_a_scenario"));
        assert_eq!(vec!["not_a_scenario"], enabled.unknown().collect::<Vec<_>>());
    }

    #[test]
    fn missing_environment_is_a_configuration_error() {
        let no_scenarios = Environment::default().with_var(DOMAIN_ENV, "example.com");
        assert_eq!(
            "Environment variable `SCENARIOS` must be set",
            enabled_scenarios(&no_scenarios).unwrap_err().to_string()
        );

        let no_domain = Environment::default().with_var(SCENARIOS_ENV, SHARED_ABOUT_SCENARIO);
        assert_eq!(
            "Environment variable `DOMAIN` must be set",
            enabled_scenarios(&no_domain).unwrap_err().to_string()
        );
    }

    #[test]
    fn shared_about_scenario_end_to_end() {
        let options = enabled_scenarios(&environment("shared_about_scenario"))
            .unwrap()
            .into_options(UnknownScenarioPolicy::Reject)
            .unwrap();

        assert_eq!(1, options.scenarios().len());
        let scenario = &options.scenarios()[SHARED_ABOUT_SCENARIO];
        assert_eq!(
            Some("https://example.com/Base/shared-cluster/about"),
            scenario.env_var("URL")
        );
        assert_eq!(ExecutorKind::ConstantArrivalRate, scenario.executor());
        assert_eq!(10, scenario.rate());
        assert_eq!(Duration::from_secs(1), scenario.time_unit());
        assert_eq!(Duration::from_secs(20), scenario.duration());
        assert_eq!(10, scenario.pre_allocated_vus());
    }
}
