// src/schema/types.rs

pub const ENTITY_CODE: &str = "entity_code";
pub const SITUATION: &str = "situation";
pub const IDENTIFICATION_NUMBER: &str = "identification_number";
pub const INFORMATION_DATE: &str = "information_date";
pub const LOANS: &str = "loans";
pub const PARTICIPATIONS: &str = "participations";
pub const GUARANTEES_GRANTED: &str = "guarantees_granted";
pub const OTHER_CONCEPTS: &str = "other_concepts";

/// Monetary fields summed into a record's debt amount.
pub const DEBT_COMPONENTS: [&str; 4] = [LOANS, PARTICIPATIONS, GUARANTEES_GRANTED, OTHER_CONCEPTS];

/// Every field the decoder reads. A schema may carry more; the rest are skipped.
pub const REQUIRED_FIELDS: [&str; 8] = [
    ENTITY_CODE,
    SITUATION,
    IDENTIFICATION_NUMBER,
    INFORMATION_DATE,
    LOANS,
    PARTICIPATIONS,
    GUARANTEES_GRANTED,
    OTHER_CONCEPTS,
];

/// A single column definition: name and width in characters.
#[derive(Debug, PartialEq, Clone, Eq, Hash)]
pub struct Column {
    pub name: String,
    pub width: usize,
}

/// Character range `[start, start + width)` of one column within a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpan {
    pub start: usize,
    pub width: usize,
}

impl FieldSpan {
    /// Cut this column out of `line`. Positions count characters, not bytes;
    /// a line that ends early yields a shorter (possibly empty) slice.
    pub fn slice<'l>(&self, line: &'l str) -> &'l str {
        if line.is_ascii() {
            let start = self.start.min(line.len());
            let end = (self.start + self.width).min(line.len());
            return &line[start..end];
        }
        let rest = &line[char_boundary(line, self.start)..];
        &rest[..char_boundary(rest, self.width)]
    }
}

/// Byte index just past the first `n` characters of `s`, or `s.len()` if shorter.
pub(crate) fn char_boundary(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map(|(i, _)| i).unwrap_or(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_counts_characters_not_bytes() {
        let span = FieldSpan { start: 2, width: 3 };
        assert_eq!(span.slice("abcdefg"), "cde");
        assert_eq!(span.slice("ñañandú"), "ñan");
    }

    #[test]
    fn span_past_end_is_empty() {
        let span = FieldSpan { start: 10, width: 4 };
        assert_eq!(span.slice("short"), "");
        let tail = FieldSpan { start: 3, width: 4 };
        assert_eq!(tail.slice("short"), "rt");
    }
}
