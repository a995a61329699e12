use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use cohort_load::application::bootstrap::bootstrap_workspace;
use cohort_load::application::commands::{
    apply_week_edits_impl, list_cohorts_impl, load_week_impl, AppState, FeedSource, WeekEdits,
    WeekReportResponse,
};
use cohort_load::infrastructure::error::InfraError;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const CLI_SESSION: &str = "cli";

#[derive(Parser)]
#[command(name = "cohort-load")]
#[command(about = "Weekly contact-hour load and free slots for a cohort timetable")]
#[command(version)]
struct Cli {
    /// Directory holding config/ (defaults to the current directory)
    #[arg(long, value_name = "DIR", global = true)]
    workspace: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the workspace and write default config files
    Init,
    /// List the cohorts of the directory
    Cohorts {
        #[arg(long)]
        json: bool,
    },
    /// Load a week and report load, free slots and suggestions
    Week {
        /// Cohort name from cohorts.json
        #[arg(long, conflicts_with = "url", required_unless_present = "url")]
        cohort: Option<String>,
        /// Full iCalendar feed URL
        #[arg(long)]
        url: Option<String>,
        /// Any date of the week (YYYY-MM-DD)
        #[arg(long, value_name = "YYYY-MM-DD")]
        week: Option<String>,
        /// Weekly target in hours
        #[arg(long, value_name = "HOURS")]
        target: Option<f64>,
        /// Manual block as local START/END (YYYY-MM-DDTHH:MM)
        #[arg(long = "add", value_name = "START/END")]
        add: Vec<String>,
        /// Remove the manual block at INDEX, applied after --add
        #[arg(long = "remove", value_name = "INDEX")]
        remove: Vec<usize>,
        /// Accept the suggestion at INDEX, applied after --remove
        #[arg(long = "accept", value_name = "INDEX")]
        accept: Vec<usize>,
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let workspace_root = match cli.workspace {
        Some(path) => path,
        None => std::env::current_dir().map_err(|error| error.to_string())?,
    };

    if let Commands::Init = cli.command {
        let result = bootstrap_workspace(&workspace_root).map_err(|error| error.to_string())?;
        println!("Config written to {}", result.config_dir.display());
        return Ok(());
    }

    let state = AppState::new(workspace_root).map_err(|error| error.to_string())?;
    match cli.command {
        Commands::Init => Ok(()),
        Commands::Cohorts { json } => {
            let cohorts =
                list_cohorts_impl(&state).map_err(|error| state.command_error("cohorts", &error))?;
            if json {
                return print_json(&cohorts);
            }
            for cohort in cohorts {
                println!("{}\t{}", cohort.name, cohort.resources);
            }
            Ok(())
        }
        Commands::Week {
            cohort,
            url,
            week,
            target,
            add,
            remove,
            accept,
            json,
        } => {
            let source = match (cohort, url) {
                (Some(name), _) => FeedSource::Cohort(name),
                (None, Some(url)) => FeedSource::Url(url),
                (None, None) => return Err("either --cohort or --url is required".to_string()),
            };
            let edits = WeekEdits {
                additions: add,
                removals: remove,
                acceptances: accept,
            };
            let report = week_report(&state, source, week, target, edits)
                .await
                .map_err(|error| state.command_error("week", &error))?;
            if json {
                return print_json(&report);
            }
            let tz = state
                .config()
                .timezone()
                .map_err(|error| state.command_error("week", &error))?;
            print_report(&report, tz);
            Ok(())
        }
    }
}

async fn week_report(
    state: &AppState,
    source: FeedSource,
    week: Option<String>,
    target: Option<f64>,
    edits: WeekEdits,
) -> Result<WeekReportResponse, InfraError> {
    load_week_impl(state, CLI_SESSION.to_string(), source, week, target).await?;
    apply_week_edits_impl(state, CLI_SESSION.to_string(), edits)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let rendered = serde_json::to_string_pretty(value).map_err(|error| error.to_string())?;
    println!("{rendered}");
    Ok(())
}

fn print_report(report: &WeekReportResponse, tz: Tz) {
    let summary = &report.summary;
    println!("{}", report.cohort_label);
    println!("Week of {} ({} events)", report.week_start, report.events.len());
    if let Some(failure) = &report.feed.failure {
        println!("  Could not load the schedule: {}", failure.message);
    }
    println!(
        "  Courses    {:>7.2}h  (sessions {:.2}h + breaks {:.2}h)",
        summary.course_hours(),
        summary.occupied_hours,
        summary.break_hours
    );
    println!("  Added      {:>7.2}h", summary.added_hours);
    println!("  Total      {:>7.2}h / {}h", summary.total_hours, report.target_hours);
    if report.target_met {
        println!("  Target met");
    } else {
        println!("  Missing    {:>7.2}h", summary.remaining_hours);
    }

    if !report.manual_blocks.is_empty() {
        println!("Manual blocks:");
        for block in &report.manual_blocks {
            println!("  [{}] {} -> {} ({:.2}h)", block.index, block.start, block.end, block.hours);
        }
    }

    if !report.suggestions.is_empty() {
        println!("Suggestions:");
        for (index, suggestion) in report.suggestions.iter().enumerate() {
            let start = suggestion.block.start.with_timezone(&tz);
            let end = suggestion.block.end.with_timezone(&tz);
            println!(
                "  [{index}] {} {}-{} ({:.2}h)",
                start.format("%a %d/%m"),
                start.format("%H:%M"),
                end.format("%H:%M"),
                suggestion.hours
            );
        }
    }

    if let Some(draft) = &report.submission {
        println!("Submission draft:");
        if let Some(recipient) = &draft.recipient {
            println!("  To: {recipient}");
        }
        println!("  Subject: {}", draft.subject);
        println!("  {}", draft.mailto);
    }
}
