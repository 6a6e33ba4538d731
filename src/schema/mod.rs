pub mod entities;
pub mod fields;
pub mod types;

pub use entities::{EntityDirectory, UNKNOWN_ENTITY};
pub use fields::{FieldSchema, ParsedFields};
pub use types::{Column, FieldSpan};
