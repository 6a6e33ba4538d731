// src/process/mod.rs
pub mod aggregate;
pub mod date_parser;
pub mod decode;
pub mod emit;
pub mod index;
pub mod replay;
pub mod stats;
pub mod utils;

use anyhow::{Context, Result};
use std::{
    fs::{self, File},
    io::{BufReader, Write},
    path::{Path, PathBuf},
    time::Instant,
};
use tracing::{info, instrument};
use zip::ZipArchive;

use crate::config::RunConfig;
use crate::error::ConfigError;
use crate::report::{Reporter, TracingReporter};
use crate::schema::{EntityDirectory, FieldSchema};

use aggregate::AggregationDriver;
use decode::RecordDecoder;
use emit::OutputEmitter;
use index::BorrowerIndexer;
use replay::open_source;
use stats::RunStatistics;

/// Unpack `archive` into `working_dir` and return the path of `data_file`
/// inside it. A missing data file is a configuration error.
#[instrument(level = "info", skip(archive, working_dir), fields(archive = %archive.as_ref().display()))]
pub fn extract_archive<P: AsRef<Path>, Q: AsRef<Path>>(
    archive: P,
    working_dir: Q,
    data_file: &str,
) -> Result<PathBuf> {
    let archive = archive.as_ref();
    let working_dir = working_dir.as_ref();

    let file = File::open(archive)
        .with_context(|| format!("Failed to open ZIP file: {:?}", archive))?;
    let mut zip = ZipArchive::new(BufReader::new(file))
        .with_context(|| format!("Failed to read ZIP archive: {:?}", archive))?;
    fs::create_dir_all(working_dir)
        .with_context(|| format!("creating working directory {:?}", working_dir))?;
    zip.extract(working_dir)
        .with_context(|| format!("extracting {:?} into {:?}", archive, working_dir))?;
    // drop the archive (and its file handle) before the data file is opened
    drop(zip);

    let data_path = working_dir.join(data_file);
    if !data_path.is_file() {
        return Err(ConfigError::MissingDataFile(data_file.to_string()).into());
    }
    info!(data = %data_path.display(), "archive extracted");
    Ok(data_path)
}

/// Full run with a [`TracingReporter`]: load configuration, extract, aggregate,
/// write one JSON line per borrower to `out`.
pub fn run<W: Write>(config: &RunConfig, out: W) -> Result<RunStatistics> {
    let mut reporter = TracingReporter;
    run_with_reporter(config, out, &mut reporter)
}

/// [`run`] with a caller-supplied reporter. Every configuration error surfaces
/// before the first byte is written to `out`.
#[instrument(level = "info", skip_all, fields(archive = %config.archive.display(), mode = %config.mode))]
pub fn run_with_reporter<W: Write>(
    config: &RunConfig,
    out: W,
    reporter: &mut dyn Reporter,
) -> Result<RunStatistics> {
    let start = Instant::now();

    // ─── 1) load schema + entity directory ──────────────────────────
    let schema = FieldSchema::from_path(&config.schema_path)?;
    let directory = EntityDirectory::from_path(&config.entities_path)?;
    let decoder = RecordDecoder::new(&schema, &directory)
        .with_context(|| format!("validating column schema {}", config.schema_path.display()))?;

    // ─── 2) extract the flat file ───────────────────────────────────
    let data_path = extract_archive(&config.archive, &config.working_dir, &config.data_file)?;

    // ─── 3) aggregate ───────────────────────────────────────────────
    let mut emitter = OutputEmitter::new(out);
    let stats = if config.single_pass {
        let file = File::open(&data_path)
            .with_context(|| format!("opening {}", data_path.display()))?;
        AggregationDriver::new(&decoder, reporter)
            .run_single_pass(BufReader::new(file), &mut emitter)?
    } else {
        let index = {
            let file = File::open(&data_path)
                .with_context(|| format!("opening {}", data_path.display()))?;
            BorrowerIndexer::new(decoder.identifier_span(), config.mode)
                .build(BufReader::new(file))?
        };
        let file = File::open(&data_path)
            .with_context(|| format!("reopening {}", data_path.display()))?;
        let mut source = open_source(file, &index);
        AggregationDriver::new(&decoder, reporter).run(&index, source.as_mut(), &mut emitter)?
    };
    emitter.finish()?;

    // ─── 4) report ──────────────────────────────────────────────────
    reporter.summary(&stats);
    info!(elapsed = ?start.elapsed(), "all done");
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::recording::RecordingReporter;
    use crate::test_support::{line, FIXTURE_ENTITIES_TSV, FIXTURE_SCHEMA_JSON};
    use std::io::{Cursor, Write};
    use tempfile::{tempdir, TempDir};
    use tracing_subscriber::{fmt, EnvFilter};
    use zip::write::SimpleFileOptions;
    use zip::CompressionMethod;

    fn init_logging() {
        let _ = fmt()
            .with_env_filter(EnvFilter::new("debug"))
            .with_test_writer()
            .try_init();
    }

    fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            let options =
                SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
            for (name, content) in entries {
                zip.start_file(*name, options).unwrap();
                zip.write_all(content.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        buf
    }

    /// Scratch layout: cfg files + archive, all under one temp dir.
    fn setup(data: &str) -> (TempDir, RunConfig) {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("schema.json"), FIXTURE_SCHEMA_JSON).unwrap();
        fs::write(root.join("entities.tsv"), FIXTURE_ENTITIES_TSV).unwrap();
        fs::write(root.join("input.zip"), zip_bytes(&[("data.txt", data)])).unwrap();

        let mut config = RunConfig::new(root.join("input.zip"));
        config.working_dir = root.join("work");
        config.schema_path = root.join("schema.json");
        config.entities_path = root.join("entities.tsv");
        (dir, config)
    }

    fn three_lines() -> String {
        [
            line("00007", "202402", "20111111112", "8", ["1", "0", "0", "0"]),
            line("00007", "202402", "27222222223", "1", ["1,50", "0,00", "0,00", "0,00"]),
            line("00011", "202311", "27222222223", "11", ["2", "0", "0", "0"]),
        ]
        .join("\n")
            + "\n"
    }

    #[test]
    fn extracts_the_data_file() -> Result<()> {
        let (dir, config) = setup("hello\n");
        let path = extract_archive(&config.archive, &config.working_dir, "data.txt")?;
        assert_eq!(path, config.data_path());
        assert_eq!(fs::read_to_string(&path)?, "hello\n");
        drop(dir);
        Ok(())
    }

    #[test]
    fn archive_without_data_file_is_a_config_error() {
        let dir = tempdir().unwrap();
        let zip_path = dir.path().join("other.zip");
        fs::write(&zip_path, zip_bytes(&[("other.txt", "x")])).unwrap();
        let err = extract_archive(&zip_path, dir.path().join("work"), "data.txt").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::MissingDataFile(name)) if name == "data.txt"
        ));
    }

    #[test]
    fn not_a_zip_is_rejected() {
        let dir = tempdir().unwrap();
        let bogus = dir.path().join("bogus.zip");
        fs::write(&bogus, b"definitely not a zip").unwrap();
        let err = extract_archive(&bogus, dir.path().join("work"), "data.txt").unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read ZIP archive"));
    }

    #[test]
    fn three_line_run_emits_one_document() -> Result<()> {
        init_logging();
        let (_dir, config) = setup(&three_lines());
        let mut out = Vec::new();
        let mut reporter = RecordingReporter::default();
        let stats = run_with_reporter(&config, &mut out, &mut reporter)?;

        let text = String::from_utf8(out)?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1);
        let doc: serde_json::Value = serde_json::from_str(lines[0])?;
        assert_eq!(doc["identification_number"], "27222222223");
        assert_eq!(doc["debts"].as_array().map(Vec::len), Some(2));
        assert_eq!(doc["debts"][1]["situation"], "1");

        assert_eq!(stats.lines_read, 3);
        assert_eq!(stats.lines_filtered, 1);
        assert_eq!(stats.duplicate_borrowers, 1);
        assert_eq!(stats.unique_borrowers, 2);
        assert_eq!(reporter.summaries, vec![stats]);
        Ok(())
    }

    #[test]
    fn every_strategy_writes_the_same_output() -> Result<()> {
        init_logging();
        let (_dir, mut config) = setup(&three_lines());
        let mut outputs = Vec::new();
        for (mode, single_pass) in [
            (replay::ReplayMode::ByteOffset, false),
            (replay::ReplayMode::LineNumber, false),
            (replay::ReplayMode::ByteOffset, true),
        ] {
            config.mode = mode;
            config.single_pass = single_pass;
            let mut out = Vec::new();
            run(&config, &mut out)?;
            outputs.push(out);
        }
        assert_eq!(outputs[0], outputs[1]);
        assert_eq!(outputs[0], outputs[2]);
        Ok(())
    }

    #[test]
    fn bad_schema_fails_before_any_output() {
        let (dir, mut config) = setup(&three_lines());
        let bad = dir.path().join("bad.json");
        fs::write(&bad, r#"{"entity_code": 5}"#).unwrap();
        config.schema_path = bad;

        let mut out = Vec::new();
        assert!(run(&config, &mut out).is_err());
        assert!(out.is_empty());
        assert!(!config.working_dir.exists());
    }
}
