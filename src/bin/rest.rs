//! rest - Command-line interface for BetterRest
//!
//! Commands:
//! - estimate: Estimate a bedtime from form values
//! - run: Estimate bedtimes for NDJSON requests on stdin (streaming mode)
//! - doctor: Diagnose model artifact and environment
//! - model: Describe the model artifact

#![recursion_limit = "256"]

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use better_rest::form::{self, SleepForm};
use better_rest::model::{ModelArtifact, MODEL_FORMAT_VERSION};
use better_rest::report::{BedtimeReport, ReportOutcome};
use better_rest::types::{parse_wake_time, FEATURE_NAMES, OUTPUT_ACTUAL_SLEEP};
use better_rest::{
    BedtimeEstimator, EstimationError, InputError, ModelError, PredictionModel, ReportEncoder,
    SleepCalculator, UserInput, PRODUCER_NAME, VERSION,
};

/// rest - Estimate your ideal bedtime
#[derive(Parser)]
#[command(name = "rest")]
#[command(version = VERSION)]
#[command(about = "Estimate an ideal bedtime from wake time, sleep goal and coffee intake", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate a bedtime from form values
    Estimate {
        /// Wake-up time (HH:MM, 24h)
        #[arg(long, default_value = "07:00")]
        wake: String,

        /// Desired amount of sleep in hours (4-12, quarter-hour steps)
        #[arg(long, default_value_t = form::DEFAULT_SLEEP_HOURS)]
        sleep: f64,

        /// Daily coffee intake (1-10)
        #[arg(long, default_value_t = form::DEFAULT_COFFEE)]
        coffee: u32,

        /// Model artifact (defaults to the bundled model)
        #[arg(long, env = "BETTER_REST_MODEL")]
        model: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },

    /// Estimate bedtimes for NDJSON requests on stdin (streaming mode)
    Run {
        /// Model artifact (defaults to the bundled model)
        #[arg(long, env = "BETTER_REST_MODEL")]
        model: Option<PathBuf>,

        /// Flush output after each record
        #[arg(long, default_value = "true")]
        flush: bool,
    },

    /// Diagnose model artifact and environment
    Doctor {
        /// Model artifact to check (defaults to the bundled model)
        #[arg(long, env = "BETTER_REST_MODEL")]
        model: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Describe the model artifact
    Model {
        /// Model artifact (defaults to the bundled model)
        #[arg(long, env = "BETTER_REST_MODEL")]
        model: Option<PathBuf>,

        /// Print the artifact itself as JSON
        #[arg(long)]
        json: bool,

        /// Print the JSON schema of the artifact format
        #[arg(long, conflicts_with = "json")]
        json_schema: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable form and result
    Text,
    /// Single-line JSON report
    Json,
    /// Pretty-printed JSON report
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean for piping
    let default_filter = match cli.verbose {
        0 => "better_rest=warn,rest=warn",
        1 => "better_rest=debug,rest=debug",
        _ => "better_rest=trace,rest=trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), RestCliError> {
    match cli.command {
        Commands::Estimate {
            wake,
            sleep,
            coffee,
            model,
            format,
        } => cmd_estimate(&wake, sleep, coffee, model.as_deref(), format),

        Commands::Run { model, flush } => cmd_run(model.as_deref(), flush),

        Commands::Doctor { model, json } => cmd_doctor(model.as_deref(), json),

        Commands::Model {
            model,
            json,
            json_schema,
        } => cmd_model(model.as_deref(), json, json_schema),
    }
}

fn cmd_estimate(
    wake: &str,
    sleep: f64,
    coffee: u32,
    model: Option<&Path>,
    format: OutputFormat,
) -> Result<(), RestCliError> {
    // Flags behave like the form controls: values are brought into range
    let form = SleepForm::with_values(parse_wake_time(wake)?, sleep, coffee);
    let input = form.input();
    debug!(?input, "estimate requested");

    let (result, model_name) = match BedtimeEstimator::load_or_bundled(model) {
        Ok(estimator) => (
            estimator.estimate(&input),
            estimator.model().name().to_string(),
        ),
        Err(e) => (Err(e), model_label(model)),
    };

    let report = ReportEncoder::new(model_name).encode(&input, &result);

    match format {
        OutputFormat::Text => print_text_report(&form, &report),
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::JsonPretty => println!("{}", report.to_json_pretty()?),
    }

    match result {
        Ok(_) => Ok(()),
        Err(e) => Err(RestCliError::Estimation(e)),
    }
}

fn cmd_run(model: Option<&Path>, flush: bool) -> Result<(), RestCliError> {
    let estimator = BedtimeEstimator::load_or_bundled(model)?;
    let encoder = ReportEncoder::new(estimator.model().name());

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for (index, line) in stdin.lock().lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        let input = UserInput::from_json(trimmed).map_err(|e| RestCliError::Request {
            line: index + 1,
            source: e,
        })?;

        let result = estimator.estimate(&input);
        writeln!(stdout, "{}", encoder.encode_to_json(&input, &result)?)?;

        if flush {
            stdout.flush()?;
        }
    }

    stdout.flush()?;
    Ok(())
}

fn cmd_doctor(model: Option<&Path>, json: bool) -> Result<(), RestCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("{} {}", PRODUCER_NAME, VERSION),
    });

    if let Some(path) = model {
        if !path.exists() {
            checks.push(DoctorCheck {
                name: "model_file".to_string(),
                status: CheckStatus::Error,
                message: format!("Model file {} does not exist", path.display()),
            });
        }
    }

    match SleepCalculator::load_or_bundled(model) {
        Ok(calculator) => {
            let artifact = calculator.artifact();
            checks.push(DoctorCheck {
                name: "model".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "{} ({} regressor, {}) from {}",
                    artifact.name,
                    artifact.regressor_kind(),
                    artifact.format_version,
                    calculator.source()
                ),
            });

            let probe = SleepForm::default().input();
            let estimator = BedtimeEstimator::new(calculator);
            checks.push(match estimator.estimate(&probe) {
                Ok(bedtime) => {
                    let implied_hours = bedtime.predicted_sleep_seconds / 3600.0;
                    let plausible = (0.0..=probe.desired_sleep_hours).contains(&implied_hours);
                    DoctorCheck {
                        name: "probe".to_string(),
                        status: if plausible {
                            CheckStatus::Ok
                        } else {
                            CheckStatus::Warning
                        },
                        message: format!(
                            "Wake 07:00, 8 hours, coffee 1 -> bedtime {} ({:.2}h predicted sleep)",
                            bedtime.formatted(),
                            implied_hours
                        ),
                    }
                }
                Err(e) => DoctorCheck {
                    name: "probe".to_string(),
                    status: CheckStatus::Error,
                    message: e.to_string(),
                },
            });
        }
        Err(e) => checks.push(DoctorCheck {
            name: "model".to_string(),
            status: CheckStatus::Error,
            message: e.to_string(),
        }),
    }

    // Check stdin is available (for streaming mode)
    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (streaming mode ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("BetterRest Doctor Report");
        println!("========================");
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

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(RestCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_model(model: Option<&Path>, json: bool, json_schema: bool) -> Result<(), RestCliError> {
    if json_schema {
        println!("{}", get_artifact_json_schema());
        return Ok(());
    }

    let calculator = SleepCalculator::load_or_bundled(model)?;
    let artifact: &ModelArtifact = calculator.artifact();

    if json {
        println!("{}", artifact.to_json()?);
        return Ok(());
    }

    println!("Model:     {}", artifact.name);
    println!("Format:    {}", artifact.format_version);
    println!("Source:    {}", calculator.source());
    println!("Regressor: {}", artifact.regressor_kind());
    if let Some(description) = &artifact.description {
        println!("About:     {}", description);
    }
    println!();
    println!("Inputs:");
    for input in &artifact.inputs {
        match &input.description {
            Some(d) => println!("  - {}: {}", input.name, d),
            None => println!("  - {}", input.name),
        }
    }
    println!("Output:");
    match &artifact.output.description {
        Some(d) => println!("  - {}: {}", artifact.output.name, d),
        None => println!("  - {}", artifact.output.name),
    }

    Ok(())
}

// Helper functions

fn print_text_report(form: &SleepForm, report: &BedtimeReport) {
    println!("{}", form::WAKE_SECTION_TITLE);
    println!("  {}", form.wake_time.format("%H:%M"));
    println!("{}", form::SLEEP_SECTION_TITLE);
    println!("  {}", form.sleep.label());
    println!("{}", form::COFFEE_SECTION_TITLE);
    println!("  {}", form.coffee.label());
    println!();
    println!("{}", report.title);
    println!("  {}", report.message);

    if let ReportOutcome::Bedtime(outcome) = &report.outcome {
        if outcome.previous_day {
            println!("  (the night before)");
        }
    }
}

fn model_label(model: Option<&Path>) -> String {
    match model {
        Some(path) => path.display().to_string(),
        None => better_rest::BUNDLED_MODEL_NAME.to_string(),
    }
}

fn get_artifact_json_schema() -> String {
    let feature = serde_json::json!({
        "type": "object",
        "required": ["name"],
        "properties": {
            "name": { "type": "string" },
            "description": { "type": "string" }
        }
    });

    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": MODEL_FORMAT_VERSION,
        "description": "BetterRest sleep model artifact",
        "type": "object",
        "required": ["format_version", "name", "inputs", "output", "regressor"],
        "properties": {
            "format_version": { "type": "string", "const": MODEL_FORMAT_VERSION },
            "name": { "type": "string" },
            "description": { "type": "string" },
            "inputs": {
                "type": "array",
                "items": feature,
                "prefixItems": FEATURE_NAMES
                    .iter()
                    .map(|n| serde_json::json!({ "properties": { "name": { "const": n } } }))
                    .collect::<Vec<_>>(),
                "minItems": FEATURE_NAMES.len(),
                "maxItems": FEATURE_NAMES.len()
            },
            "output": {
                "allOf": [feature, { "properties": { "name": { "const": OUTPUT_ACTUAL_SLEEP } } }]
            },
            "regressor": {
                "oneOf": [
                    {
                        "type": "object",
                        "required": ["type", "intercept", "coefficients"],
                        "properties": {
                            "type": { "const": "linear" },
                            "intercept": { "type": "number" },
                            "coefficients": {
                                "type": "object",
                                "required": FEATURE_NAMES,
                                "additionalProperties": false
                            }
                        }
                    },
                    {
                        "type": "object",
                        "required": ["type", "trees"],
                        "properties": {
                            "type": { "const": "tree_ensemble" },
                            "base_prediction": { "type": "number" },
                            "trees": {
                                "type": "array",
                                "minItems": 1,
                                "items": {
                                    "type": "object",
                                    "required": ["nodes"],
                                    "properties": {
                                        "nodes": {
                                            "type": "array",
                                            "minItems": 1,
                                            "items": {
                                                "oneOf": [
                                                    {
                                                        "required": ["feature", "threshold", "left", "right"],
                                                        "properties": {
                                                            "feature": { "enum": FEATURE_NAMES },
                                                            "threshold": { "type": "number" },
                                                            "left": { "type": "integer", "minimum": 1 },
                                                            "right": { "type": "integer", "minimum": 1 }
                                                        }
                                                    },
                                                    {
                                                        "required": ["value"],
                                                        "properties": { "value": { "type": "number" } }
                                                    }
                                                ]
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    }
                ]
            }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum RestCliError {
    Io(io::Error),
    Json(serde_json::Error),
    Input(InputError),
    Model(ModelError),
    Estimation(EstimationError),
    Request { line: usize, source: InputError },
    DoctorFailed,
}

impl From<io::Error> for RestCliError {
    fn from(e: io::Error) -> Self {
        RestCliError::Io(e)
    }
}

impl From<serde_json::Error> for RestCliError {
    fn from(e: serde_json::Error) -> Self {
        RestCliError::Json(e)
    }
}

impl From<InputError> for RestCliError {
    fn from(e: InputError) -> Self {
        RestCliError::Input(e)
    }
}

impl From<ModelError> for RestCliError {
    fn from(e: ModelError) -> Self {
        RestCliError::Model(e)
    }
}

impl From<EstimationError> for RestCliError {
    fn from(e: EstimationError) -> Self {
        RestCliError::Estimation(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<RestCliError> for CliError {
    fn from(e: RestCliError) -> Self {
        match e {
            RestCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            RestCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            RestCliError::Input(e) => CliError {
                code: "INPUT_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Wake time must be HH:MM, e.g. 07:00".to_string()),
            },
            RestCliError::Model(e) => CliError {
                code: "MODEL_UNAVAILABLE".to_string(),
                message: e.to_string(),
                hint: Some("Run 'rest doctor' to check the model artifact".to_string()),
            },
            RestCliError::Estimation(e) => CliError {
                code: "MODEL_UNAVAILABLE".to_string(),
                message: e.to_string(),
                hint: Some("Run 'rest doctor' to check the model artifact".to_string()),
            },
            RestCliError::Request { line, source } => CliError {
                code: "REQUEST_ERROR".to_string(),
                message: format!("Line {}: {}", line, source),
                hint: Some(
                    r#"Each line must look like {"wake_time":"07:00","desired_sleep_hours":8.0,"coffee_count":1}"#
                        .to_string(),
                ),
            },
            RestCliError::DoctorFailed => CliError {
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

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
