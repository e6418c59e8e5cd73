//! pflux CLI - Command-line interface for Prior Flux
//!
//! Commands:
//! - fetch: Download the raw dataset into the local cache
//! - process: Turn raw trial CSV into the documented trial table
//! - describe: Print column descriptions and dataset previews
//! - schema: Print the input/output column contracts
//! - doctor: Diagnose cache and configuration health

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use prior_flux::config::PipelineConfig;
use prior_flux::encoder::TableEncoder;
use prior_flux::report::Reporter;
use prior_flux::schema::{
    ColumnCatalog, RawTableAdapter, BOOKKEEPING_COLUMNS, FINAL_COLUMNS, RAW_COLUMN_MAP,
};
use prior_flux::source::DataSource;
use prior_flux::types::Table;
use prior_flux::{ComputeError, TrialProcessor, FLUX_VERSION, PRODUCER_NAME};

/// pflux - Build the analysis-ready trial table of the motion-direction prior experiment
#[derive(Parser)]
#[command(name = "pflux")]
#[command(version = FLUX_VERSION)]
#[command(about = "Transform raw motion-direction trials into an analysis-ready table", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the raw dataset into the local cache
    Fetch {
        #[command(flatten)]
        remote: RemoteArgs,

        /// Download even when the cache file already exists
        #[arg(long)]
        force: bool,
    },

    /// Process raw trial CSV into the documented trial table
    Process {
        /// Raw CSV file (use - for stdin); omit to use the cached remote dataset
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "csv")]
        output_format: OutputFormat,

        #[command(flatten)]
        remote: RemoteArgs,
    },

    /// Print column descriptions, optionally with a preview of the processed data
    Describe {
        /// Raw CSV file (use - for stdin); omit to use the cached remote dataset
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Also print the first rows of the processed table
        #[arg(long)]
        head: bool,

        /// Also print trial counts per prior standard deviation
        #[arg(long)]
        priors: bool,

        /// Wrap width for descriptions
        #[arg(long)]
        wrap_width: Option<usize>,

        /// Number of preview rows
        #[arg(long)]
        head_rows: Option<usize>,

        #[command(flatten)]
        remote: RemoteArgs,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },

    /// Diagnose cache and configuration health
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args)]
struct RemoteArgs {
    /// Remote CSV location (overrides configuration)
    #[arg(long)]
    url: Option<String>,

    /// Local cache file (overrides configuration)
    #[arg(long)]
    cache: Option<PathBuf>,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// CSV with a header row; undefined cells left empty
    Csv,
    /// Compact JSON payload with provenance
    Json,
    /// Pretty-printed JSON payload
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Raw column contract
    Input,
    /// Processed 24-column table
    Output,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), PfluxCliError> {
    let config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };

    match cli.command {
        Commands::Fetch { remote, force } => cmd_fetch(&remote.apply(config)?, force),

        Commands::Process {
            input,
            output,
            output_format,
            remote,
        } => cmd_process(
            &remote.apply(config)?,
            input.as_deref(),
            &output,
            output_format,
        ),

        Commands::Describe {
            input,
            head,
            priors,
            wrap_width,
            head_rows,
            remote,
        } => {
            let mut config = remote.apply(config)?;
            if let Some(width) = wrap_width {
                config.report.wrap_width = width;
            }
            if let Some(rows) = head_rows {
                config.report.head_rows = rows;
            }
            config.validate()?;
            cmd_describe(&config, input.as_deref(), head, priors)
        }

        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(schema_type, json_schema),

        Commands::Doctor { json } => cmd_doctor(&config, json),
    }
}

impl RemoteArgs {
    fn apply(self, mut config: PipelineConfig) -> Result<PipelineConfig, PfluxCliError> {
        if let Some(url) = self.url {
            config.url = url;
        }
        if let Some(cache) = self.cache {
            config.cache_path = cache;
        }
        config.validate()?;
        Ok(config)
    }
}

fn cmd_fetch(config: &PipelineConfig, force: bool) -> Result<(), PfluxCliError> {
    let source = config.cached_source();

    if source.is_cached() && !force {
        info!(path = %source.cache_path().display(), "cache already present, use --force to refresh");
        return Ok(());
    }

    let body = source.refresh().map_err(ComputeError::from)?;
    println!(
        "Cached {} bytes at {}",
        body.len(),
        source.cache_path().display()
    );
    Ok(())
}

fn cmd_process(
    config: &PipelineConfig,
    input: Option<&Path>,
    output: &Path,
    output_format: OutputFormat,
) -> Result<(), PfluxCliError> {
    let (csv_text, source) = read_raw(config, input)?;

    let processor = TrialProcessor::new();
    let table = processor.process_csv(&csv_text)?;

    let output_data = format_output(processor.encoder(), &table, &source, &output_format)?;

    if output.to_string_lossy() == "-" {
        let mut stdout = io::stdout();
        stdout.write_all(output_data.as_bytes())?;
        stdout.flush()?;
    } else {
        fs::write(output, output_data)?;
        debug!(path = %output.display(), "output written");
    }

    Ok(())
}

fn cmd_describe(
    config: &PipelineConfig,
    input: Option<&Path>,
    head: bool,
    priors: bool,
) -> Result<(), PfluxCliError> {
    let catalog = ColumnCatalog::standard();
    let reporter = Reporter::new(&config.report, &catalog);
    let mut stdout = io::stdout();

    if !head && !priors {
        reporter.render_catalog(&mut stdout)?;
        return Ok(());
    }

    let (csv_text, _) = read_raw(config, input)?;
    let table = TrialProcessor::new().process_csv(&csv_text)?;

    reporter.render_descriptions(&table, &mut stdout)?;
    if head {
        writeln!(stdout)?;
        reporter.render_head(&table, &mut stdout)?;
    }
    if priors {
        writeln!(stdout)?;
        reporter.render_prior_summary(&table, &mut stdout)?;
    }
    Ok(())
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), PfluxCliError> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", get_input_json_schema());
            } else {
                println!("Input Schema: raw trial CSV with a header row");
                println!();
                println!("Required columns (raw -> canonical):");
                for (raw, canonical) in RAW_COLUMN_MAP {
                    println!("  {raw:<28} -> {canonical}");
                }
                println!();
                println!("Dropped bookkeeping columns: {}", BOOKKEEPING_COLUMNS.join(", "));
                println!("Any other column is dropped as well.");
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", get_output_json_schema());
            } else {
                println!("Output Schema: {} columns, one row per trial", FINAL_COLUMNS.len());
                println!();
                let catalog = ColumnCatalog::standard();
                for spec in catalog.columns() {
                    println!("- {}: {}", spec.name, spec.description);
                }
            }
        }
    }

    Ok(())
}

fn cmd_doctor(config: &PipelineConfig, json: bool) -> Result<(), PfluxCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck::ok(
        "flux_version",
        format!("{} version {}", PRODUCER_NAME, FLUX_VERSION),
    ));

    checks.push(match config.validate() {
        Ok(()) => DoctorCheck::ok("config", format!("Source URL {}", config.url)),
        Err(e) => DoctorCheck::error("config", e.to_string()),
    });

    // Catalog must document exactly the projected columns, in order
    let catalog = ColumnCatalog::standard();
    checks.push(if catalog.names() == FINAL_COLUMNS.to_vec() {
        DoctorCheck::ok(
            "catalog",
            format!("{} documented columns", FINAL_COLUMNS.len()),
        )
    } else {
        DoctorCheck::error("catalog", "Column catalog out of sync with output columns".to_string())
    });

    checks.push(check_cache(&config.cache_path));

    let stdout_check = if atty::is(atty::Stream::Stdout) {
        DoctorCheck::ok("stdout", "stdout is a TTY (interactive mode)".to_string())
    } else {
        DoctorCheck::ok("stdout", "stdout is a pipe (output redirected)".to_string())
    };
    checks.push(stdout_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: FLUX_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("pflux Doctor Report");
        println!("===================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(PfluxCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

/// Raw CSV text and a provenance label for it
fn read_raw(config: &PipelineConfig, input: Option<&Path>) -> Result<(String, String), PfluxCliError> {
    match input {
        Some(path) if path.to_string_lossy() == "-" => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok((buffer, "stdin".to_string()))
        }
        Some(path) => Ok((fs::read_to_string(path)?, path.display().to_string())),
        None => {
            let source = config.cached_source();
            let body = source.fetch().map_err(ComputeError::from)?;
            Ok((body, source.describe()))
        }
    }
}

fn check_cache(cache_path: &Path) -> DoctorCheck {
    if !cache_path.exists() {
        return DoctorCheck::warning(
            "cache",
            format!("{} does not exist (run 'pflux fetch')", cache_path.display()),
        );
    }

    let file = match fs::File::open(cache_path) {
        Ok(file) => file,
        Err(e) => return DoctorCheck::error("cache", format!("Cannot read cache file: {}", e)),
    };

    match RawTableAdapter::from_reader(file) {
        Ok(raw) => {
            let missing = raw.missing_columns();
            if missing.is_empty() {
                DoctorCheck::ok(
                    "cache",
                    format!("{} ({} trials)", cache_path.display(), raw.n_rows()),
                )
            } else {
                DoctorCheck::error(
                    "cache",
                    format!("Cache lacks required columns: {}", missing.join(", ")),
                )
            }
        }
        Err(e) => DoctorCheck::error("cache", format!("Invalid cache CSV: {}", e)),
    }
}

fn format_output(
    encoder: &TableEncoder,
    table: &Table,
    source: &str,
    format: &OutputFormat,
) -> Result<String, PfluxCliError> {
    let data = match format {
        OutputFormat::Csv => encoder.to_csv_string(table)?,
        OutputFormat::Json => encoder.encode_to_json(table, source, false)? + "\n",
        OutputFormat::JsonPretty => encoder.encode_to_json(table, source, true)? + "\n",
    };
    Ok(data)
}

fn get_input_json_schema() -> String {
    let properties: serde_json::Map<String, serde_json::Value> = RAW_COLUMN_MAP
        .iter()
        .map(|(raw, canonical)| {
            (
                raw.to_string(),
                serde_json::json!({
                    "type": ["number", "null"],
                    "description": format!("Renamed to {canonical}")
                }),
            )
        })
        .collect();
    let required: Vec<&str> = RAW_COLUMN_MAP.iter().map(|(raw, _)| *raw).collect();

    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "prior_flux.raw_trial",
        "description": "One row of the raw motion-direction trial CSV",
        "type": "object",
        "required": required,
        "properties": properties,
        "x-dropped": BOOKKEEPING_COLUMNS
    })
    .to_string()
}

fn get_output_json_schema() -> String {
    let catalog = ColumnCatalog::standard();
    let properties: serde_json::Map<String, serde_json::Value> = catalog
        .columns()
        .iter()
        .map(|spec| {
            (
                spec.name.clone(),
                serde_json::json!({
                    "type": ["number", "null"],
                    "description": spec.description
                }),
            )
        })
        .collect();

    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "prior_flux.trial_table",
        "description": "One processed trial; null marks an undefined value",
        "type": "object",
        "required": FINAL_COLUMNS,
        "properties": properties,
        "additionalProperties": false
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum PfluxCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    DoctorFailed,
}

impl From<io::Error> for PfluxCliError {
    fn from(e: io::Error) -> Self {
        PfluxCliError::Io(e)
    }
}

impl From<ComputeError> for PfluxCliError {
    fn from(e: ComputeError) -> Self {
        PfluxCliError::Compute(e)
    }
}

impl From<serde_json::Error> for PfluxCliError {
    fn from(e: serde_json::Error) -> Self {
        PfluxCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<PfluxCliError> for CliError {
    fn from(e: PfluxCliError) -> Self {
        match e {
            PfluxCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            PfluxCliError::Compute(e) => {
                let (code, hint) = match &e {
                    ComputeError::Fetch(_) => (
                        "FETCH_ERROR",
                        "Check network access, or pass a local file with --input",
                    ),
                    ComputeError::ConfigError(_) => ("CONFIG_ERROR", "Check the --config file and flags"),
                    ComputeError::CsvError(_) => {
                        ("PARSE_ERROR", "Ensure input is a CSV with a header row")
                    }
                    e if e.is_schema_error() => {
                        ("SCHEMA_ERROR", "Run 'pflux schema input' for the required columns")
                    }
                    _ => ("PROCESS_ERROR", "Re-run with --verbose for details"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            PfluxCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            PfluxCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

impl DoctorCheck {
    fn ok(name: &str, message: String) -> Self {
        Self::with_status(name, CheckStatus::Ok, message)
    }

    fn warning(name: &str, message: String) -> Self {
        Self::with_status(name, CheckStatus::Warning, message)
    }

    fn error(name: &str, message: String) -> Self {
        Self::with_status(name, CheckStatus::Error, message)
    }

    fn with_status(name: &str, status: CheckStatus, message: String) -> Self {
        Self {
            name: name.to_string(),
            status,
            message,
        }
    }
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
