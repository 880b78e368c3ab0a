mod check;
mod report;

use std::time::{Duration, Instant};

pub use check::CheckTally;
pub use report::{InMemoryReporter, ReportCollector, ReportConfig, Reporter};

pub mod prelude {
    pub use crate::check::CheckTally;
    pub use crate::report::{ReportCollector, ReportConfig, Reporter};
    pub use crate::{report_operation, OperationRecord};
}

/// Timing for a single operation, such as one HTTP request or one whole iteration.
#[derive(Debug, Clone)]
pub struct OperationRecord {
    operation_id: String,
    started: Instant,
    elapsed: Option<Duration>,
    is_error: bool,
}

impl OperationRecord {
    pub fn new(operation_id: impl Into<String>) -> Self {
        Self {
            operation_id: operation_id.into(),
            started: Instant::now(),
            elapsed: None,
            is_error: false,
        }
    }

    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    /// The time the operation took, or `None` if it has not been finished yet.
    pub fn duration(&self) -> Option<Duration> {
        self.elapsed
    }

    pub fn is_error(&self) -> bool {
        self.is_error
    }

    pub fn finish(mut self, is_error: bool) -> Self {
        self.elapsed = Some(self.started.elapsed());
        self.is_error = is_error;
        self
    }
}

/// Finish the record based on the outcome of the operation and hand it to the reporter.
pub fn report_operation<T, E>(
    reporter: &Reporter,
    operation_record: OperationRecord,
    response: &Result<T, E>,
) {
    let record = operation_record.finish(response.is_err());
    log::trace!(
        "Operation {} took {:?}, and failed? {}",
        record.operation_id,
        record.elapsed,
        record.is_error,
    );
    reporter.add_operation(&record);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfinished_record_has_no_duration() {
        let record = OperationRecord::new("http_get");
        assert_eq!(None, record.duration());
        assert!(!record.is_error());
    }

    #[test]
    fn report_operation_marks_errors() {
        let reporter = ReportConfig::default().init();

        let ok: Result<(), ()> = Ok(());
        report_operation(&reporter, OperationRecord::new("ok"), &ok);
        let failed: Result<(), ()> = Err(());
        report_operation(&reporter, OperationRecord::new("failed"), &failed);

        let (ok, failed) = reporter.operation_counts();
        assert_eq!((1, 1), (ok, failed));
    }
}
