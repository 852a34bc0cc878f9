//! Drowsewatch CLI
//!
//! Commands:
//! - replay: drive a monitor through a recorded stream (batch mode)
//! - run: live session on stdin via the async runtime
//! - validate: schema-check a stream
//! - schema: print stream format information

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use drowsewatch::baseline::EvictionPolicy;
use drowsewatch::config::{DetectorConfig, MonitorConfig, RuntimeConfig, TelemetryConfig};
use drowsewatch::monitor::DriveMonitor;
use drowsewatch::runtime::SessionRuntime;
use drowsewatch::schema::{ControlAction, StreamRecord, STREAM_SCHEMA_VERSION};
use drowsewatch::sinks::LogAlertSink;
use drowsewatch::telemetry::{HttpCollector, LogCollector, TelemetryCollector};
use drowsewatch::ENGINE_VERSION;

/// Drowsewatch - drowsiness detection over heart-rate streams
#[derive(Parser)]
#[command(name = "drowsewatch")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Detect drowsiness from heart-rate streams", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded stream through a monitor (batch mode)
    Replay {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Baseline multiplier forming the alert threshold
        #[arg(long, default_value = "0.93")]
        drop_ratio: f64,

        /// Sample buffer capacity
        #[arg(long, default_value = "60")]
        capacity: usize,

        /// Buffer-full policy
        #[arg(long, value_enum, default_value = "slide")]
        eviction: EvictionArg,

        /// Absolute alert floor in bpm (off by default)
        #[arg(long)]
        floor: Option<u32>,
    },

    /// Run a live session from stdin (streaming mode)
    Run {
        /// Telemetry collector base URL; log-only when omitted
        #[arg(long)]
        collector_url: Option<String>,

        /// Subject id attached to telemetry records
        #[arg(long, default_value = "default")]
        user_id: String,

        /// Seconds between elapsed-time ticks
        #[arg(long, default_value = "1")]
        tick_secs: u64,
    },

    /// Validate a stream against drowse.stream_record.v1
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print stream schema information
    Schema {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum EvictionArg {
    /// Evict the oldest reading once full (rolling window)
    Slide,
    /// Ignore new readings once full
    Freeze,
}

impl From<EvictionArg> for EvictionPolicy {
    fn from(arg: EvictionArg) -> Self {
        match arg {
            EvictionArg::Slide => EvictionPolicy::Slide,
            EvictionArg::Freeze => EvictionPolicy::Freeze,
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let exit = e.exit_code();
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            exit
        }
    }
}

fn run(cli: Cli) -> Result<(), DrowseCliError> {
    match cli.command {
        Commands::Replay {
            input,
            drop_ratio,
            capacity,
            eviction,
            floor,
        } => cmd_replay(&input, drop_ratio, capacity, eviction, floor),

        Commands::Run {
            collector_url,
            user_id,
            tick_secs,
        } => cmd_run(collector_url, user_id, tick_secs),

        Commands::Validate { input, json } => cmd_validate(&input, json),

        Commands::Schema { json } => cmd_schema(json),
    }
}

fn read_input(input: &Path) -> Result<String, DrowseCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn cmd_replay(
    input: &Path,
    drop_ratio: f64,
    capacity: usize,
    eviction: EvictionArg,
    floor: Option<u32>,
) -> Result<(), DrowseCliError> {
    let config = MonitorConfig {
        buffer_capacity: capacity,
        eviction: eviction.into(),
        detector: DetectorConfig {
            drop_ratio,
            min_bpm_floor: floor,
        },
    };
    let monitor = DriveMonitor::try_new(config)?;

    let input_data = read_input(input)?;
    let records = StreamRecord::parse_ndjson(&input_data);
    if records.is_empty() {
        return Err(DrowseCliError::NoRecords);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut readings = 0usize;
    let mut alerts = 0usize;
    let mut skipped = 0usize;

    for (index, parsed) in records {
        let record = match parsed {
            Ok(record) => record,
            Err(e) => {
                eprintln!("line {}: skipped invalid record: {}", index + 1, e);
                skipped += 1;
                continue;
            }
        };

        match record.record_type {
            drowsewatch::schema::RecordType::Reading => {
                // validate() guarantees both fields are present
                let bpm = record.bpm.unwrap_or_default();
                let taken_at = record.taken_at.unwrap_or_else(chrono::Utc::now);
                let outcome = monitor.record_reading(bpm, taken_at)?;
                readings += 1;
                if outcome.alert.is_some() {
                    alerts += 1;
                }
                writeln!(out, "{}", serde_json::to_string(&outcome)?)?;
            }
            drowsewatch::schema::RecordType::Control => {
                let event = match record.action.unwrap_or(ControlAction::Stop) {
                    ControlAction::Start => monitor.start_session()?.map(|e| serde_json::json!(e)),
                    ControlAction::Pause => monitor.pause_session()?.map(|e| serde_json::json!(e)),
                    ControlAction::Resume => {
                        monitor.resume_session()?.map(|e| serde_json::json!(e))
                    }
                    ControlAction::Stop => monitor.end_session()?.map(|s| serde_json::json!(s)),
                };
                if let Some(event) = event {
                    writeln!(out, "{}", event)?;
                }
            }
        }
    }

    eprintln!(
        "replayed {} readings, {} alerts, {} invalid lines skipped",
        readings, alerts, skipped
    );
    Ok(())
}

fn cmd_run(
    collector_url: Option<String>,
    user_id: String,
    tick_secs: u64,
) -> Result<(), DrowseCliError> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let collector: Arc<dyn TelemetryCollector> = match collector_url {
            Some(base_url) => Arc::new(HttpCollector::new(TelemetryConfig::new(
                base_url, user_id,
            ))?),
            None => Arc::new(LogCollector),
        };

        let config = RuntimeConfig {
            tick_interval: std::time::Duration::from_secs(tick_secs.max(1)),
            ..Default::default()
        };
        let mut session = SessionRuntime::new(
            DriveMonitor::default(),
            Arc::new(LogAlertSink),
            collector,
            config,
        )?;

        use tokio::io::AsyncBufReadExt;
        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

        while let Some(line) = lines.next_line().await? {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let record = match serde_json::from_str::<StreamRecord>(trimmed)
                .map_err(|e| e.to_string())
                .and_then(|r| r.validate().map(|_| r).map_err(|e| e.to_string()))
            {
                Ok(record) => record,
                Err(e) => {
                    log::warn!("skipped invalid record: {}", e);
                    continue;
                }
            };

            match record.record_type {
                drowsewatch::schema::RecordType::Reading => {
                    let bpm = record.bpm.unwrap_or_default();
                    let taken_at = record.taken_at.unwrap_or_else(chrono::Utc::now);
                    session.record_reading(bpm, taken_at)?;
                }
                drowsewatch::schema::RecordType::Control => {
                    match record.action.unwrap_or(ControlAction::Stop) {
                        ControlAction::Start => {
                            session.start_session()?;
                        }
                        ControlAction::Pause => {
                            session.pause_session().await?;
                        }
                        ControlAction::Resume => {
                            session.resume_session()?;
                        }
                        ControlAction::Stop => {
                            if let Some(summary) = session.end_session().await? {
                                println!("{}", serde_json::to_string(&summary)?);
                            }
                        }
                    }
                }
            }
        }

        // EOF: close any open session, then flush telemetry
        if let Some(summary) = session.end_session().await? {
            println!("{}", serde_json::to_string(&summary)?);
        }
        session.shutdown().await;
        Ok(())
    })
}

fn cmd_validate(input: &Path, json: bool) -> Result<(), DrowseCliError> {
    let input_data = read_input(input)?;
    let results = StreamRecord::parse_ndjson(&input_data);

    let errors: Vec<ValidationErrorDetail> = results
        .iter()
        .filter_map(|(index, result)| {
            result.as_ref().err().map(|e| ValidationErrorDetail {
                line: index + 1,
                error: e.clone(),
            })
        })
        .collect();

    let report = ValidationReport {
        total_records: results.len(),
        valid_records: results.len() - errors.len(),
        invalid_records: errors.len(),
        errors,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total records:   {}", report.total_records);
        println!("Valid records:   {}", report.valid_records);
        println!("Invalid records: {}", report.invalid_records);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - line {}: {}", err.line, err.error);
            }
        }
    }

    if report.invalid_records > 0 {
        Err(DrowseCliError::ValidationFailed(report.invalid_records))
    } else {
        Ok(())
    }
}

fn cmd_schema(json: bool) -> Result<(), DrowseCliError> {
    if json {
        println!(
            "{}",
            serde_json::json!({
                "$schema": "http://json-schema.org/draft-07/schema#",
                "title": STREAM_SCHEMA_VERSION,
                "type": "object",
                "required": ["record_type"],
                "properties": {
                    "schema_version": { "type": "string", "const": STREAM_SCHEMA_VERSION },
                    "record_type": { "enum": ["reading", "control"] },
                    "bpm": { "type": "integer", "minimum": 1 },
                    "taken_at": { "type": "string", "format": "date-time" },
                    "action": { "enum": ["start", "pause", "resume", "stop"] }
                }
            })
        );
    } else {
        println!("Stream Schema: {}", STREAM_SCHEMA_VERSION);
        println!();
        println!("One JSON object per line, two record types:");
        println!();
        println!("1. reading - heart-rate sample from the sensor source");
        println!("   {{\"record_type\": \"reading\", \"bpm\": 72, \"taken_at\": \"2024-01-15T08:30:00Z\"}}");
        println!("   Zero bpm readings are discarded as sensor noise.");
        println!();
        println!("2. control - session transition from the controller");
        println!("   {{\"record_type\": \"control\", \"action\": \"start\"}}");
        println!("   Actions: start, pause, resume, stop.");
    }

    Ok(())
}

// Error types

#[derive(Debug)]
enum DrowseCliError {
    Io(io::Error),
    Monitor(drowsewatch::MonitorError),
    Telemetry(drowsewatch::TelemetryError),
    Json(serde_json::Error),
    NoRecords,
    ValidationFailed(usize),
}

impl DrowseCliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            DrowseCliError::ValidationFailed(_) => ExitCode::from(1),
            _ => ExitCode::from(2),
        }
    }
}

impl From<io::Error> for DrowseCliError {
    fn from(e: io::Error) -> Self {
        DrowseCliError::Io(e)
    }
}

impl From<drowsewatch::MonitorError> for DrowseCliError {
    fn from(e: drowsewatch::MonitorError) -> Self {
        DrowseCliError::Monitor(e)
    }
}

impl From<drowsewatch::TelemetryError> for DrowseCliError {
    fn from(e: drowsewatch::TelemetryError) -> Self {
        DrowseCliError::Telemetry(e)
    }
}

impl From<serde_json::Error> for DrowseCliError {
    fn from(e: serde_json::Error) -> Self {
        DrowseCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<DrowseCliError> for CliError {
    fn from(e: DrowseCliError) -> Self {
        match e {
            DrowseCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            DrowseCliError::Monitor(e) => CliError {
                code: "MONITOR_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check detector configuration values".to_string()),
            },
            DrowseCliError::Telemetry(e) => CliError {
                code: "TELEMETRY_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check the collector URL".to_string()),
            },
            DrowseCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            DrowseCliError::NoRecords => CliError {
                code: "NO_RECORDS".to_string(),
                message: "No records found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            DrowseCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} records failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_records: usize,
    valid_records: usize,
    invalid_records: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    line: usize,
    error: String,
}
