mod checks_table;
mod operations_table;

use std::collections::BTreeMap;
use std::time::Duration;

use tabled::settings::Style;
use tabled::Table;

use crate::check::CheckTally;
use crate::report::in_memory_reporter::checks_table::CheckRow;
use crate::report::in_memory_reporter::operations_table::OperationRow;
use crate::report::ReportCollector;
use crate::OperationRecord;

/// A very basic reporter that is useful while developing scenarios. It keeps all of the operations
/// in memory and prints a summary of the operations and checks at the end of the run.
#[derive(Debug, Default)]
pub struct InMemoryReporter {
    operation_records: Vec<OperationRecord>,
    checks: BTreeMap<String, CheckTally>,
}

impl InMemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn operation_rows(&self) -> Vec<OperationRow> {
        let grouped = self.operation_records.iter().fold(
            BTreeMap::<&str, Vec<&OperationRecord>>::new(),
            |mut acc, record| {
                acc.entry(record.operation_id()).or_default().push(record);
                acc
            },
        );

        grouped
            .into_iter()
            .map(|(operation_id, operations)| {
                let total_operations = operations.len();
                let failed_operations = operations.iter().filter(|op| op.is_error()).count();
                let durations = operations
                    .iter()
                    .filter_map(|record| record.duration())
                    .collect::<Vec<_>>();
                let total_duration = durations.iter().sum::<Duration>();

                OperationRow {
                    operation_id: operation_id.to_string(),
                    total_operations,
                    failed_operations,
                    total_duration_ms: as_ms(total_duration),
                    avg_time_ms: if durations.is_empty() {
                        0.0
                    } else {
                        as_ms(total_duration) / durations.len() as f64
                    },
                    min_time_ms: successful_durations(&operations).min().map_or(0.0, as_ms),
                    max_time_ms: successful_durations(&operations).max().map_or(0.0, as_ms),
                }
            })
            .collect()
    }

    fn check_rows(&self) -> Vec<CheckRow> {
        self.checks
            .iter()
            .map(|(name, tally)| CheckRow {
                check: name.clone(),
                passes: tally.passes,
                fails: tally.fails,
                pass_rate: tally.pass_rate().unwrap_or_default() * 100.0,
            })
            .collect()
    }

    pub(crate) fn print_summary(&self) {
        println!("\nSummary of operations");
        let mut table = Table::new(self.operation_rows());
        table.with(Style::modern());
        println!("{table}");

        println!("\nSummary of checks");
        let mut table = Table::new(self.check_rows());
        table.with(Style::modern());
        println!("{table}");
    }
}

fn successful_durations<'a>(
    operations: &'a [&'a OperationRecord],
) -> impl Iterator<Item = Duration> + 'a {
    operations
        .iter()
        .filter(|op| !op.is_error())
        .filter_map(|op| op.duration())
}

fn as_ms(duration: Duration) -> f64 {
    duration.as_micros() as f64 / 1000.0
}

impl ReportCollector for InMemoryReporter {
    fn add_operation(&mut self, operation_record: &OperationRecord) {
        self.operation_records.push(operation_record.clone());
    }

    fn add_check(&mut self, name: &str, passed: bool) {
        self.checks.entry(name.to_string()).or_default().record(passed);
    }

    fn finalize(&self) {
        self.print_summary();
    }
}
