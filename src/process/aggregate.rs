use anyhow::{Context, Result};
use std::{
    collections::HashMap,
    io::{BufRead, Write},
    rc::Rc,
    time::Instant,
};
use tracing::{info, instrument};

use crate::error::DecodeError;
use crate::process::decode::{DebtRecord, Decoded, RecordDecoder};
use crate::process::emit::OutputEmitter;
use crate::process::index::OffsetIndex;
use crate::process::replay::LineSource;
use crate::process::stats::RunStatistics;
use crate::process::utils::trim_line_ending;
use crate::report::{LineRef, Reporter};

/// Records gathered for one borrower. Built, filled and consumed by
/// [`flush_into`](Self::flush_into) before the next borrower starts, so only one
/// group is ever resident during the two-pass run.
#[derive(Debug)]
pub struct BorrowerGroup<'i> {
    identification_number: &'i str,
    debts: Vec<DebtRecord>,
}

impl<'i> BorrowerGroup<'i> {
    pub fn new(identification_number: &'i str) -> Self {
        Self {
            identification_number,
            debts: Vec::new(),
        }
    }

    pub fn identification_number(&self) -> &'i str {
        self.identification_number
    }

    pub fn push(&mut self, record: DebtRecord) {
        self.debts.push(record);
    }

    /// Emit the group and drop it. A borrower whose lines were all filtered or
    /// rejected writes nothing; returns whether a document was written.
    pub fn flush_into<W: Write>(self, emitter: &mut OutputEmitter<W>) -> Result<bool> {
        if self.debts.is_empty() {
            return Ok(false);
        }
        emitter.emit(self.identification_number, &self.debts)?;
        Ok(true)
    }
}

/// Decodes lines, accumulates them per borrower and emits one document each,
/// counting every outcome along the way.
pub struct AggregationDriver<'d, 'r> {
    decoder: &'d RecordDecoder<'d>,
    reporter: &'r mut dyn Reporter,
    stats: RunStatistics,
}

impl<'d, 'r> AggregationDriver<'d, 'r> {
    pub fn new(decoder: &'d RecordDecoder<'d>, reporter: &'r mut dyn Reporter) -> Self {
        Self {
            decoder,
            reporter,
            stats: RunStatistics::default(),
        }
    }

    /// Second pass: replay each borrower's lines from `source` in index order.
    /// Decode failures are reported and skipped; a failed read aborts the run.
    #[instrument(level = "info", skip_all, fields(mode = %index.mode(), borrowers = index.len()))]
    pub fn run<W: Write>(
        mut self,
        index: &OffsetIndex,
        source: &mut dyn LineSource,
        emitter: &mut OutputEmitter<W>,
    ) -> Result<RunStatistics> {
        let start = Instant::now();
        self.stats.lines_read = index.total_lines();
        self.stats.unique_borrowers = index.len() as u64;

        let mode = index.mode();
        let mut buf = Vec::with_capacity(512);
        for borrower in index {
            self.note_duplicates(&borrower.identification_number, borrower.extra_lines());

            let mut group = BorrowerGroup::new(&borrower.identification_number);
            for &position in &borrower.positions {
                let at = LineRef::new(position.line + 1, position.offset);
                source.fetch(mode.key(position), &mut buf).with_context(|| {
                    format!(
                        "re-reading {} for borrower {:?}",
                        at, borrower.identification_number
                    )
                })?;
                let raw = String::from_utf8_lossy(&buf);
                self.absorb(&mut group, at, &raw);
            }
            if group.flush_into(emitter)? {
                self.stats.borrowers_emitted += 1;
            }
        }

        info!(
            records = self.stats.lines_processed,
            emitted = self.stats.borrowers_emitted,
            elapsed = ?start.elapsed(),
            "replay finished"
        );
        Ok(self.stats)
    }

    /// Single pass: decode every line once, hold every group in memory and
    /// emit them all at the end, in first-seen order. Documents and counters
    /// match [`run`](Self::run); peak memory grows with the whole file.
    #[instrument(level = "info", skip_all)]
    pub fn run_single_pass<R: BufRead, W: Write>(
        mut self,
        mut reader: R,
        emitter: &mut OutputEmitter<W>,
    ) -> Result<RunStatistics> {
        struct Pending {
            identification_number: Rc<str>,
            debts: Vec<DebtRecord>,
            lines: usize,
        }

        let start = Instant::now();
        let identifier = self.decoder.identifier_span();
        let mut slots: HashMap<Rc<str>, usize> = HashMap::new();
        let mut pending: Vec<Pending> = Vec::new();
        let mut buf = Vec::with_capacity(512);
        let mut offset = 0u64;

        loop {
            buf.clear();
            let n = reader
                .read_until(b'\n', &mut buf)
                .with_context(|| format!("reading line {}", self.stats.lines_read + 1))?;
            if n == 0 {
                break;
            }
            self.stats.lines_read += 1;
            let at = LineRef::new(self.stats.lines_read, offset);
            offset += n as u64;
            let raw = String::from_utf8_lossy(&buf);

            let id = identifier.slice(trim_line_ending(&raw)).trim();
            let slot = match slots.get(id) {
                Some(&slot) => slot,
                None => {
                    let key: Rc<str> = Rc::from(id);
                    slots.insert(Rc::clone(&key), pending.len());
                    pending.push(Pending {
                        identification_number: key,
                        debts: Vec::new(),
                        lines: 0,
                    });
                    pending.len() - 1
                }
            };
            pending[slot].lines += 1;

            match self.decoder.decode(&raw) {
                Decoded::Record { record, .. } => {
                    pending[slot].debts.push(record);
                    self.stats.lines_processed += 1;
                }
                Decoded::Filtered { situation } => self.on_filtered(at, situation),
                Decoded::Error(e) => self.on_error(at, &e, &raw),
            }
        }
        drop(slots);

        self.stats.unique_borrowers = pending.len() as u64;
        for p in pending {
            self.note_duplicates(&p.identification_number, p.lines.saturating_sub(1));
            let group = BorrowerGroup {
                identification_number: &*p.identification_number,
                debts: p.debts,
            };
            if group.flush_into(emitter)? {
                self.stats.borrowers_emitted += 1;
            }
        }

        info!(
            lines = self.stats.lines_read,
            emitted = self.stats.borrowers_emitted,
            elapsed = ?start.elapsed(),
            "single pass finished"
        );
        Ok(self.stats)
    }

    fn absorb(&mut self, group: &mut BorrowerGroup<'_>, at: LineRef, raw: &str) {
        match self.decoder.decode(raw) {
            Decoded::Record {
                identification_number,
                record,
            } => {
                debug_assert_eq!(identification_number, group.identification_number());
                group.push(record);
                self.stats.lines_processed += 1;
            }
            Decoded::Filtered { situation } => self.on_filtered(at, situation),
            Decoded::Error(e) => self.on_error(at, &e, raw),
        }
    }

    fn on_filtered(&mut self, at: LineRef, situation: i64) {
        self.stats.lines_filtered += 1;
        self.reporter.filtered(at, situation);
    }

    fn on_error(&mut self, at: LineRef, error: &DecodeError, raw: &str) {
        self.stats.parse_errors += 1;
        self.reporter.decode_error(at, error, raw);
    }

    fn note_duplicates(&mut self, identification_number: &str, extra_lines: usize) {
        if extra_lines == 0 {
            return;
        }
        self.stats.duplicate_borrowers += 1;
        self.stats.duplicate_lines += extra_lines as u64;
        self.reporter.duplicate(identification_number, extra_lines);
    }
}
