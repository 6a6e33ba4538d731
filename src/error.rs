use thiserror::Error;

/// Why a single line could not be turned into a debt record.
///
/// These never abort a run: the driver reports them, counts them and moves on
/// to the next line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid situation code {0:?}: expected an integer")]
    InvalidSituation(String),

    #[error("invalid amount {value:?} in field `{field}`")]
    InvalidAmount { field: &'static str, value: String },

    #[error("invalid information date {0:?}: expected YYYYMM")]
    InvalidDate(String),
}

/// Startup failures in the schema, the entity directory or the archive layout.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("field `{0}` must have a width greater than zero")]
    ZeroWidth(String),

    #[error("field `{0}` appears more than once in the schema")]
    DuplicateField(String),

    #[error("schema is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("entity directory row {row} has {columns} column(s), expected code and name")]
    EntityRow { row: u64, columns: usize },

    #[error("archive does not contain `{0}`")]
    MissingDataFile(String),
}
