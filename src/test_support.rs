//! Shared fixtures for unit tests.

use std::io::Write;
use tempfile::NamedTempFile;

use crate::schema::{EntityDirectory, FieldSchema};

pub const FIXTURE_SCHEMA_JSON: &str = r#"{
    "entity_code": 5,
    "information_date": 6,
    "identification_type": 2,
    "identification_number": 11,
    "situation": 2,
    "loans": 12,
    "participations": 12,
    "guarantees_granted": 12,
    "other_concepts": 12
}"#;

pub const FIXTURE_ENTITIES_TSV: &str = "00007\tBANCO DE GALICIA\n00011\tBANCO DE LA NACION\n";

pub fn fixture_schema() -> FieldSchema {
    serde_json::from_str(FIXTURE_SCHEMA_JSON).expect("fixture schema")
}

pub fn fixture_directory() -> EntityDirectory {
    EntityDirectory::from_reader(FIXTURE_ENTITIES_TSV.as_bytes()).expect("fixture directory")
}

/// One fixed-width line laid out per [`FIXTURE_SCHEMA_JSON`], without a newline.
pub fn line(entity: &str, period: &str, id: &str, situation: &str, amounts: [&str; 4]) -> String {
    format!(
        "{:<5}{:<6}{:<2}{:<11}{:>2}{:>12}{:>12}{:>12}{:>12}",
        entity, period, "11", id, situation, amounts[0], amounts[1], amounts[2], amounts[3]
    )
}

/// Write `lines` newline-terminated to a temp file.
pub fn data_file(lines: &[String]) -> NamedTempFile {
    let mut tmp = NamedTempFile::new().expect("temp file");
    for l in lines {
        writeln!(tmp, "{}", l).expect("write line");
    }
    tmp.flush().expect("flush");
    tmp
}
