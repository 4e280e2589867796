use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use govreport::{
    AssessmentRecord, BuildSummary, OverallStats, PdfInspectError, Principle, PrincipleStats,
    ReportEngine, ReportError, TestResultSummary, aggregate, inspect_pdf_path, load_assessment,
    normalize_path,
};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "govreport",
    version,
    about = "Compile AI governance assessments into PDF summary reports"
)]
struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    json: bool,
    #[arg(short, long, global = true, help = "Debug logging unless RUST_LOG is set")]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the PDF report for an assessment record.
    Build {
        #[arg(long)]
        record: PathBuf,
        #[arg(long, help = "Technical test artifact; defaults to the one the record references")]
        test_result: Option<PathBuf>,
        #[arg(long, help = "Directory with logo.png, background.png and optional fonts/chart.ttf")]
        assets: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, help = "Report date as YYYY-MM-DD (default: today)")]
        date: Option<NaiveDate>,
        #[arg(long)]
        chart_font: Option<PathBuf>,
        #[arg(long, default_value_t = 300)]
        chart_dpi: u32,
        #[arg(long, help = "Write a JSON-lines layout trace")]
        debug_log: Option<PathBuf>,
        #[arg(long, default_value_t = false)]
        serial_charts: bool,
    },
    /// Print Yes/No/N-A counts overall and per principle.
    Stats {
        #[arg(long)]
        record: PathBuf,
    },
    /// Normalize a technical test artifact and print the summary.
    ValidateTestResult { file: PathBuf },
    /// Print version and page count of a PDF.
    Inspect { file: PathBuf },
}

#[derive(Serialize)]
struct JsonOut<T: Serialize> {
    ok: bool,
    data: T,
}

#[derive(Serialize)]
struct JsonError {
    ok: bool,
    code: &'static str,
    message: String,
}

#[derive(Debug)]
struct CliFailure {
    code: &'static str,
    message: String,
}

impl From<ReportError> for CliFailure {
    fn from(err: ReportError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

impl From<PdfInspectError> for CliFailure {
    fn from(err: PdfInspectError) -> Self {
        Self {
            code: err.code.as_str(),
            message: err.message,
        }
    }
}

impl From<serde_json::Error> for CliFailure {
    fn from(err: serde_json::Error) -> Self {
        ReportError::from(err).into()
    }
}

#[derive(Serialize)]
struct BuildOut {
    out: PathBuf,
    #[serde(flatten)]
    summary: BuildSummary,
}

#[derive(Serialize)]
struct PrincipleStatsOut {
    principle: &'static str,
    #[serde(flatten)]
    stats: PrincipleStats,
}

#[derive(Serialize)]
struct StatsOut {
    overall: OverallStats,
    principles: Vec<PrincipleStatsOut>,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn print_out<T: Serialize>(
    json: bool,
    data: &T,
    text: impl FnOnce(&T) -> String,
) -> Result<(), CliFailure> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&JsonOut { ok: true, data })?
        );
    } else {
        println!("{}", text(data));
    }
    Ok(())
}

fn build_text(out: &BuildOut) -> String {
    let mut lines = vec![format!(
        "wrote {} ({} pages, {} bytes)",
        out.out.display(),
        out.summary.page_count,
        out.summary.byte_len
    )];
    lines.push(format!("framework {}", out.summary.framework_fingerprint));
    for (chart, fingerprint) in &out.summary.chart_fingerprints {
        lines.push(format!("{}\t{}", chart, fingerprint));
    }
    lines.join("\n")
}

fn stats_text(stats: &StatsOut) -> String {
    let o = &stats.overall;
    let mut lines = vec![format!(
        "overall\tyes={}\tno={}\tna={}\tunanswered={}\ttotal={}",
        o.yes, o.no, o.na, o.unanswered, o.total
    )];
    for entry in &stats.principles {
        let p = &entry.stats;
        lines.push(format!(
            "{}\tyes={}\tno={}\tna={}\tall_yes={}",
            entry.principle, p.yes, p.no, p.na, p.all_yes
        ));
    }
    lines.join("\n")
}

fn test_result_text(summary: &TestResultSummary) -> String {
    let counts = summary.total_tests;
    let mut lines = vec![format!(
        "status={}\tsuccess={}\tfail={}\tskip={}",
        summary.status, counts.success, counts.fail, counts.skip
    )];
    for evaluation in &summary.evaluation_summaries {
        lines.push(format!(
            "{}\t{}",
            evaluation.test_name,
            evaluation.score_or_grade.replace('\n', " | ")
        ));
    }
    lines.join("\n")
}

fn collect_stats(record: &AssessmentRecord) -> StatsOut {
    let (overall, per_principle) = aggregate(record);
    // Canonical order, principles without checks included as zeros.
    let principles = Principle::ALL
        .iter()
        .map(|p| PrincipleStatsOut {
            principle: p.key(),
            stats: per_principle.get(p).copied().unwrap_or_default(),
        })
        .collect();
    StatsOut {
        overall,
        principles,
    }
}

fn run(cli: Cli) -> Result<(), CliFailure> {
    match cli.command {
        Commands::Build {
            record,
            test_result,
            assets,
            out,
            date,
            chart_font,
            chart_dpi,
            debug_log,
            serial_charts,
        } => {
            let assessment = load_assessment(&record, test_result.as_deref())?;
            let mut builder = ReportEngine::builder()
                .assets_dir(assets)
                .chart_dpi(chart_dpi)
                .parallel_charts(!serial_charts);
            if let Some(date) = date {
                builder = builder.report_date(date);
            }
            if let Some(font) = chart_font {
                builder = builder.chart_font_path(font);
            }
            if let Some(path) = debug_log {
                builder = builder.debug_path(path);
            }
            let engine = builder.build()?;
            let summary = engine.build_to_path(&assessment, &out)?;
            print_out(cli.json, &BuildOut { out, summary }, build_text)
        }
        Commands::Stats { record } => {
            let assessment = AssessmentRecord::from_path(&record)?;
            print_out(cli.json, &collect_stats(&assessment), stats_text)
        }
        Commands::ValidateTestResult { file } => {
            let summary = normalize_path(&file)?;
            print_out(cli.json, &summary, test_result_text)
        }
        Commands::Inspect { file } => {
            let report = inspect_pdf_path(&file)?;
            print_out(cli.json, &report, |r| {
                format!("pdf {}\tpages={}\tbytes={}", r.pdf_version, r.page_count, r.file_size_bytes)
            })
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let json = cli.json;
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            if json {
                let body = JsonError {
                    ok: false,
                    code: failure.code,
                    message: failure.message.clone(),
                };
                match serde_json::to_string(&body) {
                    Ok(line) => eprintln!("{}", line),
                    Err(_) => eprintln!("error[{}]: {}", failure.code, failure.message),
                }
            } else {
                eprintln!("error[{}]: {}", failure.code, failure.message);
            }
            ExitCode::FAILURE
        }
    }
}
