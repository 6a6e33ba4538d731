use std::fmt;
use tracing::{debug, error, info, trace};

use crate::error::DecodeError;
use crate::process::stats::RunStatistics;

/// Where a reported line sits in the flat file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRef {
    /// 1-based line number.
    pub line: u64,
    /// Byte offset of the line's first byte.
    pub byte_offset: u64,
}

impl LineRef {
    pub fn new(line: u64, byte_offset: u64) -> Self {
        Self { line, byte_offset }
    }
}

impl fmt::Display for LineRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {} (byte offset {})", self.line, self.byte_offset)
    }
}

/// Receives the per-line and per-run events of an aggregation.
///
/// The run owns one reporter and hands it to whichever driver it builds; the
/// drivers never log per-line outcomes on their own.
pub trait Reporter {
    fn decode_error(&mut self, line: LineRef, error: &DecodeError, raw: &str);

    fn filtered(&mut self, _line: LineRef, _situation: i64) {}

    /// `identification_number` appeared on `extra_lines + 1` lines.
    fn duplicate(&mut self, identification_number: &str, extra_lines: usize);

    fn summary(&mut self, stats: &RunStatistics);
}

/// Forwards every event to `tracing`.
#[derive(Debug, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn decode_error(&mut self, line: LineRef, error: &DecodeError, raw: &str) {
        error!(%line, raw = raw.trim_end(), "skipping line: {}", error);
    }

    fn filtered(&mut self, line: LineRef, situation: i64) {
        trace!(%line, situation, "filtered");
    }

    fn duplicate(&mut self, identification_number: &str, extra_lines: usize) {
        debug!(identification_number, extra_lines, "duplicate borrower");
    }

    fn summary(&mut self, stats: &RunStatistics) {
        info!(
            lines_read = stats.lines_read,
            lines_processed = stats.lines_processed,
            lines_filtered = stats.lines_filtered,
            parse_errors = stats.parse_errors,
            duplicate_borrowers = stats.duplicate_borrowers,
            duplicate_lines = stats.duplicate_lines,
            unique_borrowers = stats.unique_borrowers,
            borrowers_emitted = stats.borrowers_emitted,
            "run complete"
        );
    }
}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;

    /// Keeps every event for assertions.
    #[derive(Debug, Default)]
    pub struct RecordingReporter {
        pub errors: Vec<(LineRef, DecodeError)>,
        pub filtered: Vec<(LineRef, i64)>,
        pub duplicates: Vec<(String, usize)>,
        pub summaries: Vec<RunStatistics>,
    }

    impl Reporter for RecordingReporter {
        fn decode_error(&mut self, line: LineRef, error: &DecodeError, _raw: &str) {
            self.errors.push((line, error.clone()));
        }

        fn filtered(&mut self, line: LineRef, situation: i64) {
            self.filtered.push((line, situation));
        }

        fn duplicate(&mut self, identification_number: &str, extra_lines: usize) {
            self.duplicates
                .push((identification_number.to_string(), extra_lines));
        }

        fn summary(&mut self, stats: &RunStatistics) {
            self.summaries.push(stats.clone());
        }
    }
}
