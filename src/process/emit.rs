use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};
use std::io::{self, Write};

use crate::process::decode::DebtRecord;

#[derive(Serialize)]
struct BorrowerDocument<'a> {
    identification_number: &'a str,
    debts: &'a [DebtRecord],
}

/// `", "` and `": "` separators; anything outside printable ASCII becomes a
/// lowercase `\uXXXX` escape, astral characters as surrogate pairs.
struct SpacedAsciiFormatter;

impl Formatter for SpacedAsciiFormatter {
    fn begin_array_value<W: ?Sized + Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W: ?Sized + Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut start = 0;
        for (i, ch) in fragment.char_indices() {
            if (' '..='~').contains(&ch) {
                continue;
            }
            writer.write_all(fragment[start..i].as_bytes())?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units).iter() {
                write!(writer, "\\u{:04x}", unit)?;
            }
            start = i + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

/// Writes one JSON document per line to `out`.
pub struct OutputEmitter<W: Write> {
    out: W,
    emitted: u64,
}

impl<W: Write> OutputEmitter<W> {
    pub fn new(out: W) -> Self {
        Self { out, emitted: 0 }
    }

    /// `{"identification_number": ..., "debts": [...]}` followed by a newline.
    pub fn emit(&mut self, identification_number: &str, debts: &[DebtRecord]) -> Result<()> {
        let doc = BorrowerDocument {
            identification_number,
            debts,
        };
        let mut ser = Serializer::with_formatter(&mut self.out, SpacedAsciiFormatter);
        doc.serialize(&mut ser)
            .with_context(|| format!("writing document for {:?}", identification_number))?;
        self.out.write_all(b"\n").context("writing document separator")?;
        self.emitted += 1;
        Ok(())
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Flush and hand back the sink.
    pub fn finish(mut self) -> Result<W> {
        self.out.flush().context("flushing output")?;
        Ok(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::Value;

    #[test]
    fn one_line_per_document_with_escaping() -> Result<()> {
        let debts = vec![DebtRecord {
            entity_name: "BANCO \"EL\" SOL\tSA".into(),
            situation: "2".into(),
            debt_amount: "1500.0".into(),
            information_date: NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
        }];

        let mut emitter = OutputEmitter::new(Vec::new());
        emitter.emit("20123456789", &debts)?;
        emitter.emit("27\"x", &[])?;
        assert_eq!(emitter.emitted(), 2);
        let out = String::from_utf8(emitter.finish()?)?;

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(out.ends_with('\n'));

        let first: Value = serde_json::from_str(lines[0])?;
        assert_eq!(first["identification_number"], "20123456789");
        assert_eq!(first["debts"][0]["entity_name"], "BANCO \"EL\" SOL\tSA");
        assert_eq!(first["debts"][0]["information_date"], "2024-02-29");

        let second: Value = serde_json::from_str(lines[1])?;
        assert_eq!(second["identification_number"], "27\"x");
        assert_eq!(second["debts"].as_array().map(Vec::len), Some(0));
        Ok(())
    }

    #[test]
    fn document_bytes_use_spaced_separators_and_ascii_escapes() -> Result<()> {
        let debts = vec![DebtRecord {
            entity_name: "CAJA DE CRÉDITO \u{1F600}\u{7f}".into(),
            situation: "2".into(),
            debt_amount: "1500.0".into(),
            information_date: NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
        }];

        let mut emitter = OutputEmitter::new(Vec::new());
        emitter.emit("20123456789", &debts)?;
        emitter.emit("27", &[])?;
        let out = String::from_utf8(emitter.finish()?)?;

        let expected = concat!(
            r#"{"identification_number": "20123456789", "debts": [{"entity_name": "#,
            r#""CAJA DE CR\u00c9DITO \ud83d\ude00\u007f", "situation": "2", "#,
            r#""debt_amount": "1500.0", "information_date": "2024-02-29"}]}"#,
            "\n",
            r#"{"identification_number": "27", "debts": []}"#,
            "\n",
        );
        assert_eq!(out, expected);
        Ok(())
    }
}
