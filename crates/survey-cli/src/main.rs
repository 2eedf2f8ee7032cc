use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde_json::{Value, json};
use survey_spec::cache::{DEFAULT_LOCALE, DEFAULT_TTL_SECS};
use survey_spec::{
    AnswerSet, CacheConfig, EvaluationPass, MemorySurveyStore, SchemaCache, SchemaSnapshot,
    Survey, ValidationMode, ValidationReport, next_question, progress, validate,
};
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Survey logic evaluation CLI",
    long_about = "Builds schema snapshots for a survey document and evaluates answer sets against its branching rules"
)]
struct Cli {
    /// Emit debug logs on stderr (RUST_LOG takes precedence).
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct SurveyArgs {
    /// Path to the survey JSON document.
    #[arg(long, value_name = "SURVEY")]
    survey: PathBuf,
    /// Locale used to resolve titles, question text and choice labels.
    #[arg(long, env = "SURVEY_LOCALE", default_value = DEFAULT_LOCALE)]
    locale: String,
    /// Snapshot cache expiry in seconds.
    #[arg(long, env = "SURVEY_CACHE_TTL_SECS", default_value_t = DEFAULT_TTL_SECS)]
    cache_ttl_secs: u64,
}

#[derive(Subcommand)]
enum Command {
    /// Print the schema snapshot built from a survey document.
    Snapshot {
        #[command(flatten)]
        survey: SurveyArgs,
    },
    /// Validate an answer set against a survey.
    Validate {
        #[command(flatten)]
        survey: SurveyArgs,
        /// Path to the answers JSON file.
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
        /// Treat the answers as a final submission (required questions must be answered).
        #[arg(long)]
        complete: bool,
    },
    /// Show visibility, allowed choices and progress for an answer set.
    Inspect {
        #[command(flatten)]
        survey: SurveyArgs,
        /// Path to the answers JSON file.
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
    },
    /// Print the JSON Schema of the snapshot document.
    Schema {
        /// Describe the authored survey document instead.
        #[arg(long)]
        input: bool,
    },
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Command::Snapshot { survey } => run_snapshot(&survey),
        Command::Validate {
            survey,
            answers,
            complete,
        } => run_validate(&survey, &answers, complete),
        Command::Inspect { survey, answers } => run_inspect(&survey, &answers),
        Command::Schema { input } => run_schema(input),
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}

fn load_snapshot(args: &SurveyArgs) -> CliResult<Arc<SchemaSnapshot>> {
    let survey: Survey = serde_json::from_str(&fs::read_to_string(&args.survey)?)?;
    let survey_id = survey.id;

    let config = CacheConfig::builder()
        .ttl_secs(args.cache_ttl_secs)
        .build();
    let cache = Arc::new(SchemaCache::new(config));
    let store = MemorySurveyStore::with_cache(Arc::clone(&cache));
    store.upsert_survey(survey)?;

    tracing::debug!(survey_id, locale = %args.locale, "loaded survey document");
    Ok(cache.get_or_build(&store, survey_id, &args.locale)?)
}

fn load_answers(path: &Path) -> CliResult<AnswerSet> {
    let value: Value = serde_json::from_str(&fs::read_to_string(path)?)?;
    Ok(AnswerSet::try_from(value)?)
}

fn print_json(value: &impl serde::Serialize) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_snapshot(args: &SurveyArgs) -> CliResult<()> {
    let snapshot = load_snapshot(args)?;
    print_json(snapshot.as_ref())
}

fn run_validate(args: &SurveyArgs, answers_path: &Path, complete: bool) -> CliResult<()> {
    let snapshot = load_snapshot(args)?;
    let answers = load_answers(answers_path)?;
    let mode = if complete {
        ValidationMode::Complete
    } else {
        ValidationMode::Partial
    };

    let report = validate(&snapshot, &answers, mode);
    print_json(&report)?;
    describe_validation(&report);

    if report.valid {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn describe_validation(report: &ValidationReport) {
    eprintln!(
        "Validation result: {}",
        if report.valid { "valid" } else { "invalid" }
    );
    for failure in &report.failures {
        eprintln!(
            "  {} [{}] {}",
            failure.question_id,
            failure.reason.as_str(),
            failure.message
        );
    }
}

fn run_inspect(args: &SurveyArgs, answers_path: &Path) -> CliResult<()> {
    let snapshot = load_snapshot(args)?;
    let answers = load_answers(answers_path)?;

    let mut pass = EvaluationPass::new(&snapshot, &answers);
    let visibility = pass.visibility_map();
    let mut allowed = BTreeMap::new();
    for question in snapshot.ordered_questions() {
        if !visibility.get(&question.id).copied().unwrap_or(true) {
            continue;
        }
        if let Some(eligibility) = pass.allowed_values(&question.id) {
            allowed.insert(question.id.clone(), eligibility.clone());
        }
    }

    print_json(&json!({
        "survey_id": snapshot.survey_id,
        "locale": snapshot.locale,
        "visibility": visibility,
        "allowed_values": allowed,
        "progress": progress(&snapshot, &answers),
        "next_question_id": next_question(&snapshot, &answers),
    }))
}

fn run_schema(input: bool) -> CliResult<()> {
    let schema = if input {
        schemars::schema_for!(Survey)
    } else {
        schemars::schema_for!(SchemaSnapshot)
    };
    print_json(&schema)
}
