//! Surveymeta CLI - Turn questionnaire exports into `.meta` files
//!
//! ```bash
//! surveymeta results-survey.csv meta/              # strict code matching
//! surveymeta -r -d results-survey.csv meta/        # relaxed, debug logging
//! surveymeta --scan-root corpus/ results.csv meta/ # scan another tree
//! surveymeta --print-matrix > matrix.json          # dump the built-in matrix
//! ```

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use surveymeta::logging::{init_logging, LogConfig};
use surveymeta::{
    rueg_matrix, run, DuplicatePolicy, ExtractOptions, GroupOptions, MissingResponsePolicy,
    PipelineOptions, PipelineReport,
};

#[derive(Parser)]
#[command(name = "surveymeta")]
#[command(about = "Create .meta files from questionnaire results", long_about = None)]
struct Cli {
    /// Survey results export (CSV)
    #[arg(required_unless_present = "print_matrix")]
    survey_results_file: Option<PathBuf>,

    /// Directory receiving the .meta files
    #[arg(required_unless_present = "print_matrix")]
    target_dir: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    debug: bool,

    /// Accept codes that do not match the code pattern
    #[arg(short, long)]
    relaxed: bool,

    /// Root of the file-name scan
    #[arg(long, env = "SURVEYMETA_SCAN_ROOT", default_value = ".")]
    scan_root: PathBuf,

    /// CSV delimiter
    #[arg(long, default_value = ",")]
    delimiter: char,

    /// Extraction matrix file (JSON) instead of the built-in one
    #[arg(long)]
    matrix: Option<PathBuf>,

    /// Print the built-in matrix as JSON and exit
    #[arg(long)]
    print_matrix: bool,

    /// Resolution of conflicting values between rows of one code
    #[arg(long, value_enum, default_value_t = DuplicatesArg::LastWins)]
    duplicates: DuplicatesArg,

    /// Score of a TIPI trait with a missing answer
    #[arg(long, value_enum, default_value_t = TipiMissingArg::Neutral)]
    tipi_missing: TipiMissingArg,

    /// Only rows whose projectid equals this
    #[arg(long)]
    project: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum DuplicatesArg {
    LastWins,
    FirstWins,
    Reject,
}

impl From<DuplicatesArg> for DuplicatePolicy {
    fn from(arg: DuplicatesArg) -> Self {
        match arg {
            DuplicatesArg::LastWins => DuplicatePolicy::LastWins,
            DuplicatesArg::FirstWins => DuplicatePolicy::FirstWins,
            DuplicatesArg::Reject => DuplicatePolicy::Reject,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum TipiMissingArg {
    Neutral,
    NotAvailable,
}

impl From<TipiMissingArg> for MissingResponsePolicy {
    fn from(arg: TipiMissingArg) -> Self {
        match arg {
            TipiMissingArg::Neutral => MissingResponsePolicy::Neutral,
            TipiMissingArg::NotAvailable => MissingResponsePolicy::NotAvailable,
        }
    }
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(&LogConfig::from_debug_flag(cli.debug));

    if let Err(e) = execute(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.print_matrix {
        println!("{}", rueg_matrix().to_json()?);
        return Ok(());
    }

    let (Some(survey), Some(target)) = (&cli.survey_results_file, &cli.target_dir) else {
        return Err("survey results file and target directory are required".into());
    };

    let options = PipelineOptions {
        scan_root: cli.scan_root.clone(),
        delimiter: cli.delimiter,
        matrix_path: cli.matrix.clone(),
        group: GroupOptions {
            relaxed: cli.relaxed,
            duplicates: cli.duplicates.into(),
            project: cli.project.clone(),
        },
        extract: ExtractOptions {
            tipi_missing: cli.tipi_missing.into(),
        },
    };

    let report = run(survey, target, &options)?;
    print_summary(&report);
    Ok(())
}

fn print_summary(report: &PipelineReport) {
    eprintln!("   Rows: {}", report.rows);
    if report.filtered > 0 {
        eprintln!("   Other projects: {}", report.filtered);
    }
    eprintln!("   Codes: {}", report.codes);
    if !report.dropped.is_empty() {
        eprintln!("   Dropped rows: {}", report.dropped.len());
    }
    if !report.conflicts.is_empty() {
        eprintln!("   Conflicting values: {}", report.conflicts.len());
    }
    if !report.written.codes_without_suffix.is_empty() {
        eprintln!(
            "   Codes without files: {}",
            report.written.codes_without_suffix.join(", ")
        );
    }
    eprintln!("   Files written: {}", report.written.files.len());
}
