use std::{
    fmt,
    io::{self, BufRead, BufReader, Read, Seek, SeekFrom},
    str::FromStr,
};

use crate::process::index::{LinePosition, OffsetIndex, CHECKPOINT_STRIDE};

/// How pass two finds a line again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayMode {
    /// Positions are byte offsets; each line is one seek away.
    #[default]
    ByteOffset,
    /// Positions are 0-based line numbers, resolved through sparse checkpoints.
    LineNumber,
}

impl ReplayMode {
    /// What a [`LineSource`] opened in this mode expects for `position`:
    /// the byte offset, or the 0-based line number.
    pub fn key(self, position: LinePosition) -> u64 {
        match self {
            ReplayMode::ByteOffset => position.offset,
            ReplayMode::LineNumber => position.line,
        }
    }
}

/// Parses the command-line mode flag: `true` seeks by byte offset, `false`
/// looks lines up by number.
impl FromStr for ReplayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(ReplayMode::ByteOffset),
            "false" => Ok(ReplayMode::LineNumber),
            other => Err(format!(
                "expected `true` (byte-offset seek) or `false` (line-number lookup), got {:?}",
                other
            )),
        }
    }
}

impl fmt::Display for ReplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayMode::ByteOffset => f.write_str("byte-offset"),
            ReplayMode::LineNumber => f.write_str("line-number"),
        }
    }
}

/// Random access to the lines of the flat file, by the positions the indexer
/// recorded.
pub trait LineSource {
    /// Read the line at `position` into `buf` (cleared first), line ending
    /// included. A position past the end of the file is an `UnexpectedEof` error.
    fn fetch(&mut self, position: u64, buf: &mut Vec<u8>) -> io::Result<()>;
}

/// Open the replay strategy matching the index's mode.
pub fn open_source<'a, R: Read + Seek + 'a>(
    inner: R,
    index: &'a OffsetIndex,
) -> Box<dyn LineSource + 'a> {
    match index.mode() {
        ReplayMode::ByteOffset => Box::new(SeekSource::new(inner)),
        ReplayMode::LineNumber => Box::new(LineNumberSource::new(inner, index.checkpoints())),
    }
}

fn no_line(what: fmt::Arguments<'_>) -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, format!("no line at {}", what))
}

/// Seeks straight to a byte offset. Consecutive lines skip the seek so the
/// read buffer survives.
pub struct SeekSource<R> {
    reader: BufReader<R>,
    cursor: Option<u64>,
}

impl<R: Read + Seek> SeekSource<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            cursor: None,
        }
    }
}

impl<R: Read + Seek> LineSource for SeekSource<R> {
    fn fetch(&mut self, position: u64, buf: &mut Vec<u8>) -> io::Result<()> {
        if self.cursor != Some(position) {
            self.cursor = None;
            self.reader.seek(SeekFrom::Start(position))?;
        }
        buf.clear();
        let n = self.reader.read_until(b'\n', buf)?;
        if n == 0 {
            self.cursor = None;
            return Err(no_line(format_args!("byte offset {}", position)));
        }
        self.cursor = Some(position + n as u64);
        Ok(())
    }
}

/// Looks lines up by number: seeks to the checkpoint at or before the line and
/// reads forward, so no fetch scans more than [`CHECKPOINT_STRIDE`] lines.
pub struct LineNumberSource<'a, R> {
    reader: BufReader<R>,
    checkpoints: &'a [u64],
    next_line: Option<u64>,
    scratch: Vec<u8>,
}

impl<'a, R: Read + Seek> LineNumberSource<'a, R> {
    /// `checkpoints[k]` is the byte offset of line `k * CHECKPOINT_STRIDE`.
    pub fn new(inner: R, checkpoints: &'a [u64]) -> Self {
        Self {
            reader: BufReader::new(inner),
            checkpoints,
            next_line: None,
            scratch: Vec::new(),
        }
    }

    fn seek_checkpoint(&mut self, line: u64) -> io::Result<u64> {
        let slot = line / CHECKPOINT_STRIDE;
        let offset = usize::try_from(slot)
            .ok()
            .and_then(|s| self.checkpoints.get(s))
            .copied()
            .ok_or_else(|| no_line(format_args!("line {}", line + 1)))?;
        self.reader.seek(SeekFrom::Start(offset))?;
        Ok(slot * CHECKPOINT_STRIDE)
    }
}

impl<R: Read + Seek> LineSource for LineNumberSource<'_, R> {
    fn fetch(&mut self, line: u64, buf: &mut Vec<u8>) -> io::Result<()> {
        let mut current = match self.next_line.take() {
            Some(next) if next <= line && line - next < CHECKPOINT_STRIDE => next,
            _ => self.seek_checkpoint(line)?,
        };
        while current < line {
            self.scratch.clear();
            if self.reader.read_until(b'\n', &mut self.scratch)? == 0 {
                return Err(no_line(format_args!("line {}", line + 1)));
            }
            current += 1;
        }
        buf.clear();
        if self.reader.read_until(b'\n', buf)? == 0 {
            return Err(no_line(format_args!("line {}", line + 1)));
        }
        self.next_line = Some(line + 1);
        Ok(())
    }
}
