use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{BufRead, Read, Write};
use std::path::Path;

/// Summary of a run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    /// The unique run id
    ///
    /// Chosen by the runner. Unique for each run.
    pub run_id: String,
    /// The name of the load test that was run
    pub name: String,
    /// The time the run started
    ///
    /// This is a Unix timestamp in seconds.
    pub started_at: i64,
    /// The longest configured duration across all scenarios, in seconds
    ///
    /// Scenarios run concurrently so this is the planned length of the run, not counting the
    /// graceful stop window.
    pub run_duration: u64,
    /// The outcome of each scenario that was started, keyed by scenario name
    pub scenarios: BTreeMap<String, ScenarioOutcome>,
    /// Check results across all scenarios, keyed by check name
    pub checks: BTreeMap<String, CheckOutcome>,
    /// Environment variables set for the run
    ///
    /// This won't capture all environment variables. Just the ones that the load test declared
    /// as relevant. Secrets are redacted before they get here.
    pub env: BTreeMap<String, String>,
    /// The version of Surge that was used for this run
    pub surge_version: String,
}

/// Iteration counts for one scenario
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScenarioOutcome {
    /// Iterations that were handed to a virtual user
    pub started: u64,
    /// Iterations that ran to completion, whether or not their checks passed
    pub completed: u64,
    /// Iterations whose function returned an error
    pub failed: u64,
    /// Iterations that were due but found no free virtual user
    pub dropped: u64,
    /// Iterations that were still running when the graceful stop window ran out
    pub interrupted: u64,
}

/// Pass and fail counts for one check
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckOutcome {
    pub passes: u64,
    pub fails: u64,
}

impl RunSummary {
    /// Create a new run summary
    pub fn new(
        run_id: String,
        name: String,
        started_at: i64,
        run_duration: u64,
        surge_version: String,
    ) -> Self {
        Self {
            run_id,
            name,
            started_at,
            run_duration,
            scenarios: BTreeMap::new(),
            checks: BTreeMap::new(),
            env: BTreeMap::new(),
            surge_version,
        }
    }

    pub fn add_scenario(&mut self, name: String, outcome: ScenarioOutcome) {
        self.scenarios.insert(name, outcome);
    }

    pub fn add_check(&mut self, name: String, outcome: CheckOutcome) {
        self.checks.insert(name, outcome);
    }

    /// Add an environment variable
    pub fn add_env(&mut self, key: String, value: String) {
        self.env.insert(key, value);
    }

    /// Total number of iterations started across every scenario
    pub fn total_started(&self) -> u64 {
        self.scenarios.values().map(|s| s.started).sum()
    }

    /// True if every check that ran passed every time
    pub fn all_checks_passed(&self) -> bool {
        self.checks.values().all(|c| c.fails == 0)
    }
}

/// Append the run summary to a file
///
/// The summary will be serialized to JSON and output as a single line followed by a newline. The
/// recommended file extension is `.jsonl`.
pub fn append_run_summary(run_summary: &RunSummary, path: &Path) -> anyhow::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)?;
    store_run_summary(run_summary, &mut file)?;
    file.write_all(b"\n")?;
    Ok(())
}

/// Serialize the run summary to a writer
pub fn store_run_summary<W: Write>(run_summary: &RunSummary, writer: &mut W) -> anyhow::Result<()> {
    serde_json::to_writer(writer, run_summary)?;
    Ok(())
}

/// Load a run summary from a reader
pub fn load_run_summary<R: Read>(reader: R) -> anyhow::Result<RunSummary> {
    let reader = std::io::BufReader::new(reader);
    let run_summary: RunSummary = serde_json::from_reader(reader)?;
    Ok(run_summary)
}

/// Load run summaries from a file
///
/// The file should contain one JSON object per line. This is the format produced by
/// [append_run_summary].
pub fn load_summary_runs(path: &Path) -> anyhow::Result<Vec<RunSummary>> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let mut runs = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        runs.push(load_run_summary(line.as_bytes())?);
    }
    Ok(runs)
}
