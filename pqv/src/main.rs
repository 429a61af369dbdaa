use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use pqv::{
    CancellationToken, EngineHandle, EngineOptions, ReadProgress, RenderOptions, fold_name,
    format_schema, format_table, window_summary,
};
use rustc_hash::FxHashSet;

fn parse_positive(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|err| format!("invalid value '{value}': {err}"))?;
    if parsed == 0 {
        return Err("value must be greater than zero".into());
    }
    Ok(parsed)
}

#[derive(Parser)]
#[command(name = "pqv", about = "Inspect and read Parquet files and directories")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print record, file and row-group counts and the resolved fields.
    Schema(SchemaArgs),
    /// Print a window of rows as tab-separated text.
    Read(ReadArgs),
}

#[derive(Args)]
struct SchemaArgs {
    /// A .parquet file or a directory of them.
    #[arg(value_name = "PATH")]
    path: PathBuf,
    /// Keep INT64 columns that pandas marked as datetimes as raw integers.
    #[arg(long = "no-fix-datetime")]
    no_fix_datetime: bool,
    /// Only look at files directly inside PATH.
    #[arg(long = "no-recursive")]
    no_recursive: bool,
}

#[derive(Args)]
struct ReadArgs {
    /// A .parquet file or a directory of them.
    #[arg(value_name = "PATH")]
    path: PathBuf,
    /// Fields to read, in output order (defaults to every supported field).
    #[arg(long, short = 'f', value_delimiter = ',', value_name = "NAME")]
    fields: Vec<String>,
    /// First row of the window.
    #[arg(long, default_value_t = 0)]
    offset: u64,
    /// Number of rows to read (defaults to the rest of the dataset).
    #[arg(long, short = 'n')]
    count: Option<u64>,
    /// Keep INT64 columns that pandas marked as datetimes as raw integers.
    #[arg(long = "no-fix-datetime")]
    no_fix_datetime: bool,
    /// Upper bound on parallel read workers.
    #[arg(long, value_name = "N", value_parser = parse_positive)]
    workers: Option<usize>,
    /// Projections with more columns than this are read in parallel.
    #[arg(long, value_name = "COLUMNS")]
    threshold: Option<usize>,
    /// Rows per decoded batch.
    #[arg(long = "batch-size", value_name = "ROWS", value_parser = parse_positive)]
    batch_size: Option<usize>,
    /// Timestamp format, in `time` format description syntax.
    #[arg(long = "date-format", value_name = "FMT")]
    date_format: Option<String>,
    /// Only look at files directly inside PATH.
    #[arg(long = "no-recursive")]
    no_recursive: bool,
}

impl ReadArgs {
    fn engine_options(&self) -> EngineOptions {
        let mut options = EngineOptions::default()
            .with_fix_malformed_datetime(!self.no_fix_datetime)
            .with_max_workers(self.workers)
            .with_recursive(!self.no_recursive);
        if let Some(threshold) = self.threshold {
            options = options.with_parallel_column_threshold(threshold);
        }
        if let Some(rows) = self.batch_size {
            options = options.with_batch_size(rows);
        }
        options
    }
}

fn open(path: &Path, options: EngineOptions) -> pqv::Result<EngineHandle> {
    let handle = EngineHandle::open_with_options(path, options)?;
    if let Some(warning) = handle.skipped_warning() {
        eprintln!("warning: {warning}");
    }
    Ok(handle)
}

fn run_schema(args: SchemaArgs) -> pqv::Result<()> {
    let options = EngineOptions::default()
        .with_fix_malformed_datetime(!args.no_fix_datetime)
        .with_recursive(!args.no_recursive);
    let handle = open(&args.path, options)?;
    println!("records    {}", handle.record_count());
    println!("files      {}", handle.partition_count());
    println!("row groups {}", handle.row_group_count());
    for skipped in handle.skipped_files() {
        println!("skipped    {skipped}");
    }
    let collisions = handle.schema().case_collisions();
    for names in collisions {
        println!("note: fields {} differ only by case", names.join(", "));
    }
    println!();
    print!("{}", format_schema(handle.schema()));
    handle.close();
    Ok(())
}

fn run_read(args: ReadArgs) -> pqv::Result<()> {
    let render = match &args.date_format {
        Some(format) => RenderOptions::new(format)?,
        None => RenderOptions::default(),
    };
    let mut handle = open(&args.path, args.engine_options())?;
    let fields: Vec<String> = if args.fields.is_empty() {
        // Case-insensitive duplicates cannot be read together; keep the first.
        let mut seen = FxHashSet::default();
        handle
            .catalog()
            .supported_fields()
            .into_iter()
            .filter(|name| seen.insert(fold_name(name)))
            .map(str::to_string)
            .collect()
    } else {
        args.fields.clone()
    };

    let cancel = CancellationToken::new();
    let progress = ReadProgress::new();
    let table = handle.read(&fields, args.offset, args.count, &cancel, Some(&progress))?;
    tracing::debug!(cells = progress.cells_decoded(), "read complete");

    print!("{}", format_table(&table, &render));
    println!("{}", window_summary(args.offset, &table));
    handle.close();
    Ok(())
}

fn run() -> pqv::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Schema(args) => run_schema(args),
        Command::Read(args) => run_read(args),
    }
}

fn main() {
    // Initialize tracing subscriber to respect RUST_LOG environment variable
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run() {
        eprintln!("{err}");
        process::exit(1);
    }
}
