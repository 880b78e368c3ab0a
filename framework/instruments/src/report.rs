mod in_memory_reporter;

use std::collections::BTreeMap;

use parking_lot::Mutex;

use crate::check::CheckTally;
use crate::OperationRecord;

pub use in_memory_reporter::InMemoryReporter;

pub trait ReportCollector: Send {
    fn add_operation(&mut self, operation_record: &OperationRecord);

    /// Record the outcome of a single evaluation of a named check.
    fn add_check(&mut self, name: &str, passed: bool);

    fn finalize(&self);
}

/// Choose which collectors the [Reporter] should forward to.
#[derive(Debug, Default)]
pub struct ReportConfig {
    in_memory: bool,
}

impl ReportConfig {
    /// Print a summary table of operations and checks at the end of the run.
    pub fn enable_in_memory(mut self) -> Self {
        self.in_memory = true;
        self
    }

    pub fn init(self) -> Reporter {
        let mut collectors: Vec<Box<dyn ReportCollector>> = Vec::new();
        if self.in_memory {
            collectors.push(Box::new(InMemoryReporter::new()));
        }

        Reporter {
            collectors: Mutex::new(collectors),
            checks: Mutex::new(BTreeMap::new()),
            operations: Mutex::new(OperationCounts::default()),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct OperationCounts {
    ok: u64,
    failed: u64,
}

/// Shared entry point for everything a load test reports.
///
/// Check tallies and operation counts are always kept so that the runner can summarise the run,
/// whether or not any collectors are configured.
pub struct Reporter {
    collectors: Mutex<Vec<Box<dyn ReportCollector>>>,
    checks: Mutex<BTreeMap<String, CheckTally>>,
    operations: Mutex<OperationCounts>,
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("collectors", &self.collectors.lock().len())
            .field("checks", &self.checks.lock())
            .finish()
    }
}

impl Reporter {
    pub fn add_operation(&self, operation_record: &OperationRecord) {
        {
            let mut operations = self.operations.lock();
            if operation_record.is_error() {
                operations.failed += 1;
            } else {
                operations.ok += 1;
            }
        }

        for collector in self.collectors.lock().iter_mut() {
            collector.add_operation(operation_record);
        }
    }

    /// Record a named check and return its outcome so it can be used inline.
    pub fn check(&self, name: &str, passed: bool) -> bool {
        self.checks
            .lock()
            .entry(name.to_string())
            .or_default()
            .record(passed);

        for collector in self.collectors.lock().iter_mut() {
            collector.add_check(name, passed);
        }

        passed
    }

    /// Snapshot of all check tallies seen so far, keyed by check name.
    pub fn check_tallies(&self) -> BTreeMap<String, CheckTally> {
        self.checks.lock().clone()
    }

    /// The number of successful and failed operations seen so far.
    pub fn operation_counts(&self) -> (u64, u64) {
        let operations = self.operations.lock();
        (operations.ok, operations.failed)
    }

    pub fn finalize(&self) {
        for collector in self.collectors.lock().iter() {
            collector.finalize();
        }
    }
}
