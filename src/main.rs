use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use debt_grouper::{
    config::{
        RunConfig, DEFAULT_DATA_FILE, DEFAULT_ENTITIES_PATH, DEFAULT_SCHEMA_PATH,
        DEFAULT_WORKING_DIR,
    },
    process::{self, replay::ReplayMode},
};
use std::{
    fs::{self, File},
    io::{self, BufWriter},
    path::{Path, PathBuf},
    sync::Mutex,
};
use tracing::info;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan, writer::MakeWriterExt},
    EnvFilter,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Group a fixed-width debtor file by borrower into JSON lines"
)]
struct Args {
    /// Zip archive containing the fixed-width data file
    archive: PathBuf,

    /// `true` replays lines by byte offset, `false` by line number
    #[arg(value_name = "SEEK_MODE", default_value = "true")]
    seek_mode: ReplayMode,

    /// Directory the archive is extracted into
    #[arg(long, default_value = DEFAULT_WORKING_DIR)]
    working_dir: PathBuf,

    /// Name of the data file inside the archive
    #[arg(long, default_value = DEFAULT_DATA_FILE)]
    data_file: String,

    /// Column layout: JSON object of field name → width
    #[arg(long, default_value = DEFAULT_SCHEMA_PATH)]
    schema: PathBuf,

    /// Entity code → name table, tab separated
    #[arg(long, default_value = DEFAULT_ENTITIES_PATH)]
    entities: PathBuf,

    /// Also write logs to a timestamped file in this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Group in memory in one pass instead of indexing first
    #[arg(long)]
    single_pass: bool,
}

fn init_logging(log_dir: Option<&Path>) -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match log_dir {
        None => fmt::Subscriber::builder()
            .with_env_filter(env)
            .with_span_events(FmtSpan::CLOSE)
            .with_writer(io::stderr)
            .init(),
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
            let path = dir.join(format!(
                "logfile-{}.log",
                Local::now().format("%Y%m%d%H%M%S%6f")
            ));
            let file = File::create(&path)
                .with_context(|| format!("creating log file {}", path.display()))?;
            fmt::Subscriber::builder()
                .with_env_filter(env)
                .with_span_events(FmtSpan::CLOSE)
                .with_ansi(false)
                .with_writer(io::stderr.and(Mutex::new(file)))
                .init();
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    // ─── 1) init logging ─────────────────────────────────────────────
    init_logging(args.log_dir.as_deref())?;
    info!(archive = %args.archive.display(), mode = %args.seek_mode, "startup");

    // ─── 2) resolve configuration ────────────────────────────────────
    let config = RunConfig {
        archive: args.archive,
        working_dir: args.working_dir,
        data_file: args.data_file,
        schema_path: args.schema,
        entities_path: args.entities,
        mode: args.seek_mode,
        single_pass: args.single_pass,
    };

    // ─── 3) run, documents to stdout ─────────────────────────────────
    let stdout = io::stdout();
    let out = BufWriter::new(stdout.lock());
    let stats = process::run(&config, out)?;
    info!(emitted = stats.borrowers_emitted, "done");
    Ok(())
}
