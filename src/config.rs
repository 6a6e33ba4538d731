use std::path::PathBuf;

use crate::process::replay::ReplayMode;

pub const DEFAULT_WORKING_DIR: &str = "working_dir";
pub const DEFAULT_DATA_FILE: &str = "data.txt";
pub const DEFAULT_SCHEMA_PATH: &str = "cfg/parsing_config.json";
pub const DEFAULT_ENTITIES_PATH: &str = "cfg/entity_mapping.tsv";

/// Everything one run needs, resolved before any file is touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Zip archive holding the fixed-width file.
    pub archive: PathBuf,
    /// Scratch directory the archive is extracted into.
    pub working_dir: PathBuf,
    /// Name of the fixed-width file inside the archive.
    pub data_file: String,
    /// JSON object of field name → width, in column order.
    pub schema_path: PathBuf,
    /// Headerless `code<TAB>name` table.
    pub entities_path: PathBuf,
    pub mode: ReplayMode,
    /// Group everything in memory in one pass instead of indexing first.
    pub single_pass: bool,
}

impl RunConfig {
    pub fn new(archive: impl Into<PathBuf>) -> Self {
        Self {
            archive: archive.into(),
            working_dir: PathBuf::from(DEFAULT_WORKING_DIR),
            data_file: DEFAULT_DATA_FILE.to_string(),
            schema_path: PathBuf::from(DEFAULT_SCHEMA_PATH),
            entities_path: PathBuf::from(DEFAULT_ENTITIES_PATH),
            mode: ReplayMode::default(),
            single_pass: false,
        }
    }

    /// Where extraction leaves the fixed-width file.
    pub fn data_path(&self) -> PathBuf {
        self.working_dir.join(&self.data_file)
    }
}
