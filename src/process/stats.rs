/// Counters for one run, reported once at the end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStatistics {
    /// Every line in the flat file.
    pub lines_read: u64,
    /// Lines that produced a debt record.
    pub lines_processed: u64,
    /// Lines whose situation fell outside the accepted range.
    pub lines_filtered: u64,
    /// Lines skipped for malformed situation, amount or date text.
    pub parse_errors: u64,
    /// Borrowers with more than one line.
    pub duplicate_borrowers: u64,
    /// Lines beyond the first, summed over duplicate borrowers.
    pub duplicate_lines: u64,
    pub unique_borrowers: u64,
    /// Borrowers with at least one record, i.e. JSON documents written.
    pub borrowers_emitted: u64,
}

impl RunStatistics {
    /// Each line ends up in exactly one of processed, filtered or errored.
    pub fn is_balanced(&self) -> bool {
        self.lines_processed + self.lines_filtered + self.parse_errors == self.lines_read
    }
}
