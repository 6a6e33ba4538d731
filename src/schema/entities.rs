use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::{collections::HashMap, fs::File, io::Read, path::Path};
use tracing::{info, instrument};

use crate::error::ConfigError;

/// Name reported for entity codes missing from the directory.
pub const UNKNOWN_ENTITY: &str = "Unknown";

/// Entity code → display name, loaded once from a headerless two-column TSV.
#[derive(Debug, Default, Clone)]
pub struct EntityDirectory {
    names: HashMap<String, String>,
}

impl EntityDirectory {
    #[instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("opening entity directory {}", path.display()))?;
        let directory = Self::from_reader(file)
            .with_context(|| format!("reading entity directory {}", path.display()))?;
        info!(entries = directory.len(), "entity directory loaded");
        Ok(directory)
    }

    /// Parse `code<TAB>name` rows. Extra columns are ignored; a later row for the
    /// same code replaces the earlier one.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut names = HashMap::new();
        for (idx, result) in rdr.records().enumerate() {
            let record = result.with_context(|| format!("TSV parse error at row {}", idx + 1))?;
            match (record.get(0), record.get(1)) {
                (Some(code), Some(name)) => {
                    names.insert(code.to_string(), name.to_string());
                }
                _ => {
                    return Err(ConfigError::EntityRow {
                        row: record.position().map_or(idx as u64 + 1, |p| p.line()),
                        columns: record.len(),
                    }
                    .into())
                }
            }
        }
        Ok(Self { names })
    }

    /// Display name for `code`, or [`UNKNOWN_ENTITY`]. Codes padded with spaces
    /// are retried trimmed.
    pub fn resolve(&self, code: &str) -> &str {
        self.names
            .get(code)
            .or_else(|| self.names.get(code.trim()))
            .map_or(UNKNOWN_ENTITY, String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl FromIterator<(String, String)> for EntityDirectory {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}
