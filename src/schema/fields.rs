// src/schema/fields.rs

use anyhow::{Context, Result};
use serde::de::{self, Deserialize, Deserializer, MapAccess, Visitor};
use std::{
    collections::HashSet,
    fmt,
    fs::File,
    io::BufReader,
    path::Path,
};
use tracing::{debug, instrument};

use super::types::{char_boundary, Column, FieldSpan, REQUIRED_FIELDS};
use crate::error::ConfigError;

/// Ordered column layout of a fixed-width line.
///
/// Column order is field order: the first field starts at character 0 and each
/// following one starts where the previous ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    columns: Vec<Column>,
}

impl FieldSchema {
    /// Build a schema, rejecting zero widths and repeated names.
    pub fn new(columns: Vec<Column>) -> std::result::Result<Self, ConfigError> {
        let mut seen = HashSet::with_capacity(columns.len());
        for col in &columns {
            if col.width == 0 {
                return Err(ConfigError::ZeroWidth(col.name.clone()));
            }
            if !seen.insert(col.name.as_str()) {
                return Err(ConfigError::DuplicateField(col.name.clone()));
            }
        }
        Ok(Self { columns })
    }

    /// Load the JSON width table at `path` and check it carries every field the
    /// decoder reads.
    #[instrument(level = "debug", skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("opening column schema {}", path.display()))?;
        let schema: FieldSchema = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing column schema {}", path.display()))?;
        schema
            .require(&REQUIRED_FIELDS)
            .with_context(|| format!("validating column schema {}", path.display()))?;
        debug!(
            fields = schema.columns.len(),
            line_width = schema.line_width(),
            "column schema loaded"
        );
        Ok(schema)
    }

    /// Fail with the first name in `names` the schema does not define.
    pub fn require(&self, names: &[&'static str]) -> std::result::Result<(), ConfigError> {
        match names.iter().find(|n| self.position(n).is_none()) {
            Some(missing) => Err(ConfigError::MissingField(*missing)),
            None => Ok(()),
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Expected line length in characters.
    pub fn line_width(&self) -> usize {
        self.columns.iter().map(|c| c.width).sum()
    }

    /// Index of `name` in column order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Character range occupied by `name`.
    pub fn span(&self, name: &str) -> Option<FieldSpan> {
        let mut start = 0;
        for col in &self.columns {
            if col.name == name {
                return Some(FieldSpan {
                    start,
                    width: col.width,
                });
            }
            start += col.width;
        }
        None
    }

    /// Split `line` into one substring per column. Lines shorter than
    /// [`line_width`](Self::line_width) produce truncated or empty trailing
    /// fields; checking them is left to the caller.
    pub fn slice<'s, 'l>(&'s self, line: &'l str) -> ParsedFields<'s, 'l> {
        let mut values = Vec::with_capacity(self.columns.len());
        let ascii = line.is_ascii();
        let mut rest = line;
        for col in &self.columns {
            let end = if ascii {
                col.width.min(rest.len())
            } else {
                char_boundary(rest, col.width)
            };
            let (value, tail) = rest.split_at(end);
            values.push(value);
            rest = tail;
        }
        ParsedFields {
            schema: self,
            values,
        }
    }
}

/// One line cut into its columns. Borrowed from both the schema and the line,
/// so it cannot outlive the decode of that line.
#[derive(Debug)]
pub struct ParsedFields<'s, 'l> {
    schema: &'s FieldSchema,
    values: Vec<&'l str>,
}

impl<'s, 'l> ParsedFields<'s, 'l> {
    /// Raw text of the column at `index` (schema order).
    pub fn value(&self, index: usize) -> &'l str {
        self.values.get(index).copied().unwrap_or("")
    }

    pub fn get(&self, name: &str) -> Option<&'l str> {
        self.schema.position(name).map(|i| self.value(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'s str, &'l str)> + '_ {
        self.schema
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .zip(self.values.iter().copied())
    }
}

impl<'de> Deserialize<'de> for FieldSchema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct SchemaVisitor;

        impl<'de> Visitor<'de> for SchemaVisitor {
            type Value = FieldSchema;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping field names to column widths")
            }

            // Keep entries in document order: that order is the column order.
            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<FieldSchema, A::Error> {
                let mut columns = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, width)) = map.next_entry::<String, usize>()? {
                    columns.push(Column { name, width });
                }
                FieldSchema::new(columns).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_map(SchemaVisitor)
    }
}
