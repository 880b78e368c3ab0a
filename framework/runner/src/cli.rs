use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Parser)]
#[command(about, long_about = None)]
pub struct SurgeCli {
    /// Refuse to start if any requested scenario name is not in the load test's catalog.
    ///
    /// Without this flag, unknown names are logged as a warning and the known scenarios still run.
    #[clap(long, default_value = "false")]
    pub strict_scenarios: bool,

    /// Do not show a progress bar on the CLI.
    ///
    /// This is recommended for CI/CD environments where the progress bar isn't being looked at by anyone and is just adding noise to the logs.
    #[clap(long, default_value = "false")]
    pub no_progress: bool,

    /// Where to send operation timings and check results.
    #[clap(long, value_enum, default_value_t = ReporterOpt::InMemory)]
    pub reporter: ReporterOpt,

    /// Identifier for this run. A random one is generated if not provided.
    #[clap(long)]
    pub run_id: Option<String>,

    /// Append a JSON summary of the run to this file, one line per run.
    #[clap(long)]
    pub summary_file: Option<PathBuf>,

    /// Print the resolved scenario options as JSON and exit without generating any load.
    #[clap(long, default_value = "false")]
    pub inspect: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReporterOpt {
    /// Keep results in memory and print summary tables at the end of the run.
    #[default]
    InMemory,
    /// Only keep the tallies needed for the run summary.
    Noop,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = SurgeCli::parse_from(["surge"]);
        assert!(!cli.strict_scenarios);
        assert!(!cli.inspect);
        assert_eq!(ReporterOpt::InMemory, cli.reporter);
        assert_eq!(None, cli.run_id);
    }

    #[test]
    fn parse_flags() {
        let cli = SurgeCli::parse_from([
            "surge",
            "--strict-scenarios",
            "--no-progress",
            "--reporter",
            "noop",
            "--run-id",
            "abc",
            "--summary-file",
            "out.jsonl",
        ]);
        assert!(cli.strict_scenarios);
        assert!(cli.no_progress);
        assert_eq!(ReporterOpt::Noop, cli.reporter);
        assert_eq!(Some("abc".to_string()), cli.run_id);
        assert_eq!(Some(PathBuf::from("out.jsonl")), cli.summary_file);
    }
}
