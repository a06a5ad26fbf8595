//! Sleepviz CLI - Command-line interface for sleepviz
//!
//! Commands:
//! - heatmap: Aggregate a survey CSV and render the heatmap (SVG or JSON)
//! - score: Compute the sleep score for five factor levels
//! - validate: Report how many rows survive categorization
//! - doctor: Diagnose configuration and environment

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tracing::warn;
use tracing_subscriber::EnvFilter;

use sleepviz::filter::{AgeOption, FilterEvent};
use sleepviz::loader::{DatasetLoader, LoadStats, REQUIRED_COLUMNS};
use sleepviz::pipeline::HeatmapProcessor;
use sleepviz::render::RenderConfig;
use sleepviz::score::{Factor, FactorLevels, ScoreEvent};
use sleepviz::{VizError, PRODUCER_NAME, VIZ_VERSION};

/// Sleepviz - sleep and caffeine survey visualizations
#[derive(Parser)]
#[command(name = "sleepviz")]
#[command(version = VIZ_VERSION)]
#[command(about = "Render sleep/caffeine heatmaps and sleep scores", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate a survey CSV into the sleep × caffeine heatmap
    Heatmap {
        /// Input CSV path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Age groups to include (repeatable, e.g. --age 20-29 --age 30-39); default All
        #[arg(long = "age")]
        ages: Vec<String>,

        /// Output format
        #[arg(long, default_value = "svg")]
        format: OutputFormat,

        /// Render configuration JSON file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Compute the sleep score from five factor levels (0-4)
    Score {
        #[arg(long, default_value = "1")]
        age: u8,

        #[arg(long, default_value = "0")]
        weekend: u8,

        #[arg(long, default_value = "1")]
        coffee: u8,

        #[arg(long, default_value = "2")]
        activity: u8,

        #[arg(long, default_value = "0")]
        bmi: u8,

        /// Advance a factor by one level before scoring (repeatable)
        #[arg(long)]
        cycle: Vec<String>,

        /// Output the score report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Report row retention for a survey CSV
    Validate {
        /// Input CSV path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Check a render configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Standalone SVG document
    Svg,
    /// Compact JSON snapshot
    Json,
    /// Pretty-printed JSON snapshot
    JsonPretty,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("SLEEPVIZ_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

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

fn run(cli: Cli) -> Result<(), VizCliError> {
    match cli.command {
        Commands::Heatmap {
            input,
            output,
            ages,
            format,
            config,
        } => cmd_heatmap(&input, &output, &ages, format, config.as_deref()),

        Commands::Score {
            age,
            weekend,
            coffee,
            activity,
            bmi,
            cycle,
            json,
        } => cmd_score(FactorLevels::new(age, weekend, coffee, activity, bmi)?, &cycle, json),

        Commands::Validate { input, json } => cmd_validate(&input, json),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

fn read_input(input: &Path) -> Result<String, VizCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn load_config(path: Option<&Path>) -> Result<RenderConfig, VizCliError> {
    match path {
        Some(path) => Ok(RenderConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(RenderConfig::default()),
    }
}

fn cmd_heatmap(
    input: &Path,
    output: &Path,
    ages: &[String],
    format: OutputFormat,
    config: Option<&Path>,
) -> Result<(), VizCliError> {
    let config = load_config(config)?;
    let csv = read_input(input)?;
    let output_data = render_heatmap(&csv, ages, &format, config)?;

    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

/// Load, filter and render; a dataset with no retained rows still yields the
/// full all-zero grid
fn render_heatmap(
    csv: &str,
    ages: &[String],
    format: &OutputFormat,
    config: RenderConfig,
) -> Result<String, VizCliError> {
    let selection = ages
        .iter()
        .map(|a| a.parse::<AgeOption>())
        .collect::<Result<Vec<_>, _>>()?;

    let dataset = DatasetLoader::load_csv(csv)?;
    if dataset.is_empty() {
        warn!(
            total = dataset.stats().total_rows,
            "no rows survived categorization; rendering an empty grid"
        );
    }

    let mut processor = HeatmapProcessor::with_config(dataset, config)?;
    if !selection.is_empty() {
        processor.apply(FilterEvent::SetSelection(selection));
    }

    Ok(match format {
        OutputFormat::Svg => processor.render_svg(),
        OutputFormat::Json => processor.to_json()? + "\n",
        OutputFormat::JsonPretty => processor.to_json_pretty()? + "\n",
    })
}

fn cmd_score(levels: FactorLevels, cycle: &[String], json: bool) -> Result<(), VizCliError> {
    let mut levels = levels;
    for name in cycle {
        let factor: Factor = name.parse()?;
        levels = levels.apply(ScoreEvent::Cycle(factor));
    }

    let report = levels.report();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Sleep Score");
        println!("===========");
        for factor in Factor::ALL {
            println!("  {:<9} {}", factor.as_str(), levels.get(factor));
        }
        println!();
        println!("Risk:          {}", report.risk);
        println!("Sleep quality: {}%", report.quality);
        println!();
        println!("{}", report.advice.main);
        println!("Tip: {}", report.advice.tip);
    }

    Ok(())
}

fn cmd_validate(input: &Path, json: bool) -> Result<(), VizCliError> {
    let csv = read_input(input)?;
    let dataset = DatasetLoader::load_csv(&csv)?;

    let report = ValidationReport {
        stats: dataset.stats(),
        age_options: dataset
            .age_options()
            .iter()
            .map(|o| o.label().to_string())
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total rows:    {}", report.stats.total_rows);
        println!("Retained rows: {}", report.stats.retained_rows);
        println!("Dropped rows:  {}", report.stats.dropped_rows);
        println!("Age options:   {}", report.age_options.join(", "));
    }

    if report.stats.retained_rows == 0 {
        warn!("no rows survived categorization");
    }

    Ok(())
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), VizCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("sleepviz version {}", VIZ_VERSION),
    });

    checks.push(DoctorCheck {
        name: "input_columns".to_string(),
        status: CheckStatus::Ok,
        message: format!("Required CSV columns: {}", REQUIRED_COLUMNS.join(", ")),
    });

    if let Some(config_path) = config {
        let check = if !config_path.exists() {
            DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Config file does not exist".to_string(),
            }
        } else {
            match fs::read_to_string(config_path) {
                Ok(content) => match RenderConfig::from_json(&content) {
                    Ok(cfg) => DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Ok,
                        message: format!(
                            "Config valid ({}x{}, plot area {}x{})",
                            cfg.width,
                            cfg.height,
                            cfg.inner_width(),
                            cfg.inner_height()
                        ),
                    },
                    Err(e) => DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Error,
                        message: format!("Invalid config: {}", e),
                    },
                },
                Err(e) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Cannot read config file: {}", e),
                },
            }
        };
        checks.push(check);
    }

    let stdin_message = if atty::is(atty::Stream::Stdin) {
        "stdin is a TTY (pass a file with --input)"
    } else {
        "stdin is a pipe (--input - ready)"
    };
    checks.push(DoctorCheck {
        name: "stdin".to_string(),
        status: CheckStatus::Ok,
        message: stdin_message.to_string(),
    });

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: VIZ_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Sleepviz Doctor Report");
        println!("======================");
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
        Err(VizCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Error types

#[derive(Debug)]
enum VizCliError {
    Io(io::Error),
    Viz(VizError),
    Json(serde_json::Error),
    DoctorFailed,
}

impl From<io::Error> for VizCliError {
    fn from(e: io::Error) -> Self {
        VizCliError::Io(e)
    }
}

impl From<VizError> for VizCliError {
    fn from(e: VizError) -> Self {
        VizCliError::Viz(e)
    }
}

impl From<serde_json::Error> for VizCliError {
    fn from(e: serde_json::Error) -> Self {
        VizCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<VizCliError> for CliError {
    fn from(e: VizCliError) -> Self {
        match e {
            VizCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            VizCliError::Viz(e) if e.is_load_error() => CliError {
                code: "LOAD_ERROR".to_string(),
                message: e.to_string(),
                hint: Some(format!(
                    "Ensure the CSV has a header row with {}",
                    REQUIRED_COLUMNS.join(", ")
                )),
            },
            VizCliError::Viz(e) => CliError {
                code: "INVALID_INPUT".to_string(),
                message: e.to_string(),
                hint: Some("Run 'sleepviz --help' for accepted values".to_string()),
            },
            VizCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            VizCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    stats: LoadStats,
    age_options: Vec<String>,
}

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
