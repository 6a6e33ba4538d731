use anyhow::{Context, Result};
use std::{collections::HashMap, io::BufRead, rc::Rc, time::Instant};
use tracing::{debug, info, instrument};

use crate::process::replay::ReplayMode;
use crate::process::utils::trim_line_ending;
use crate::schema::FieldSpan;

/// Lines between two recorded byte offsets in line-number mode.
pub const CHECKPOINT_STRIDE: u64 = 1024;

/// Where one line starts: its 0-based ordinal and its byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinePosition {
    pub line: u64,
    pub offset: u64,
}

impl LinePosition {
    pub fn new(line: u64, offset: u64) -> Self {
        Self { line, offset }
    }
}

/// Every line position recorded for one borrower, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorrowerLines {
    /// Shared with the index's lookup table.
    pub identification_number: Rc<str>,
    pub positions: Vec<LinePosition>,
}

impl BorrowerLines {
    /// More than one line shares this identifier.
    pub fn is_duplicate(&self) -> bool {
        self.positions.len() > 1
    }

    /// Lines beyond the first.
    pub fn extra_lines(&self) -> usize {
        self.positions.len().saturating_sub(1)
    }
}

/// Borrower identifier → line positions, iterated in first-seen order.
/// Built once by [`BorrowerIndexer`], read-only afterwards.
#[derive(Debug)]
pub struct OffsetIndex {
    mode: ReplayMode,
    slots: HashMap<Rc<str>, usize>,
    borrowers: Vec<BorrowerLines>,
    total_lines: u64,
    checkpoints: Vec<u64>,
}

impl OffsetIndex {
    fn new(mode: ReplayMode) -> Self {
        Self {
            mode,
            slots: HashMap::new(),
            borrowers: Vec::new(),
            total_lines: 0,
            checkpoints: Vec::new(),
        }
    }

    fn record(&mut self, identification_number: &str, position: LinePosition) {
        match self.slots.get(identification_number) {
            Some(&slot) => self.borrowers[slot].positions.push(position),
            None => {
                let key: Rc<str> = Rc::from(identification_number);
                self.slots.insert(Rc::clone(&key), self.borrowers.len());
                self.borrowers.push(BorrowerLines {
                    identification_number: key,
                    positions: vec![position],
                });
            }
        }
    }

    pub fn mode(&self) -> ReplayMode {
        self.mode
    }

    pub fn total_lines(&self) -> u64 {
        self.total_lines
    }

    /// Number of distinct borrower identifiers.
    pub fn len(&self) -> usize {
        self.borrowers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.borrowers.is_empty()
    }

    pub fn get(&self, identification_number: &str) -> Option<&BorrowerLines> {
        self.slots
            .get(identification_number)
            .map(|&slot| &self.borrowers[slot])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BorrowerLines> {
        self.borrowers.iter()
    }

    /// Byte offsets of every [`CHECKPOINT_STRIDE`]th line; empty in byte-offset mode.
    pub fn checkpoints(&self) -> &[u64] {
        &self.checkpoints
    }
}

impl<'a> IntoIterator for &'a OffsetIndex {
    type Item = &'a BorrowerLines;
    type IntoIter = std::slice::Iter<'a, BorrowerLines>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// First pass: groups line positions by borrower without decoding lines.
#[derive(Debug, Clone, Copy)]
pub struct BorrowerIndexer {
    identifier: FieldSpan,
    mode: ReplayMode,
}

impl BorrowerIndexer {
    /// `identifier` must be the schema's borrower-identifier span, normally
    /// taken from [`RecordDecoder::identifier_span`](crate::process::decode::RecordDecoder::identifier_span).
    pub fn new(identifier: FieldSpan, mode: ReplayMode) -> Self {
        Self { identifier, mode }
    }

    #[instrument(level = "info", skip(self, reader), fields(mode = %self.mode))]
    pub fn build<R: BufRead>(&self, mut reader: R) -> Result<OffsetIndex> {
        let start = Instant::now();
        let mut index = OffsetIndex::new(self.mode);
        let mut buf = Vec::with_capacity(512);
        let mut offset = 0u64;
        let mut line_no = 0u64;

        loop {
            buf.clear();
            let n = reader
                .read_until(b'\n', &mut buf)
                .with_context(|| format!("reading line {} while indexing", line_no + 1))?;
            if n == 0 {
                break;
            }

            if self.mode == ReplayMode::LineNumber && line_no % CHECKPOINT_STRIDE == 0 {
                index.checkpoints.push(offset);
            }

            let text = String::from_utf8_lossy(&buf);
            let id = self.identifier.slice(trim_line_ending(&text)).trim();
            index.record(id, LinePosition::new(line_no, offset));

            offset += n as u64;
            line_no += 1;
            if line_no % 1_000_000 == 0 {
                debug!(lines = line_no, borrowers = index.len(), "indexing");
            }
        }

        index.total_lines = line_no;
        info!(
            lines = index.total_lines,
            borrowers = index.len(),
            elapsed = ?start.elapsed(),
            "index built"
        );
        Ok(index)
    }
}
