//! `pushdown`: compile relational plan documents to warehouse SQL.
//!
//! ```bash
//! # Print the SQL for a plan
//! pushdown compile plan.json
//!
//! # Same, for PostgreSQL, as a JSON report
//! pushdown compile plan.toml --dialect postgresql --format json
//!
//! # Show every intermediate relation
//! pushdown lineage plan.json
//!
//! # Quote identifiers the way the compiler would
//! pushdown quote --dialect bigquery order user_id
//! ```
//!
//! Exit status is 0 when the final relation is valid, 1 when a step was
//! rejected, and 2 on any other error.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use sql_pushdown::plan::first_rejected_step;
use sql_pushdown::{Dialect, PlanSpec, PushdownConfig, PushdownError, Relation};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "pushdown",
    version,
    about = "Compile relational plans into nested BigQuery or PostgreSQL SQL"
)]
struct Cli {
    /// Log compilation steps to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a plan and print the final SQL
    Compile {
        #[command(flatten)]
        target: PlanArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value = "sql")]
        format: OutputFormat,
    },
    /// Compile a plan and list every intermediate relation
    Lineage {
        #[command(flatten)]
        target: PlanArgs,
    },
    /// Quote identifiers for a dialect
    Quote {
        #[arg(short, long, env = "PUSHDOWN_DIALECT", default_value = "bigquery")]
        dialect: Dialect,

        #[arg(required = true)]
        identifiers: Vec<String>,
    },
}

#[derive(clap::Args, Debug)]
struct PlanArgs {
    /// Plan document (`.toml` is read as TOML, anything else as JSON)
    plan: PathBuf,

    /// Configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Target dialect, overriding the config file
    #[arg(short, long, env = "PUSHDOWN_DIALECT")]
    dialect: Option<Dialect>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// The SQL text only
    Sql,
    /// A JSON report with columns and any rejection
    Json,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Pushdown(#[from] PushdownError),

    #[error("cannot write output: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot encode report: {0}")]
    Json(#[from] serde_json::Error),
}

/// Whether the compiled relation was valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Valid,
    Rejected,
}

#[derive(Serialize)]
struct CompileReport<'a> {
    valid: bool,
    dialect: &'static str,
    columns: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    sql: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rejected_step: Option<usize>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let stdout = std::io::stdout();
    match run(cli, &mut stdout.lock()) {
        Ok(Outcome::Valid) => ExitCode::SUCCESS,
        Ok(Outcome::Rejected) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("sql_pushdown=debug,pushdown=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn run<W: Write>(cli: Cli, out: &mut W) -> Result<Outcome, CliError> {
    match cli.command {
        Command::Compile { target, format } => {
            let (config, plan) = target.load()?;
            let relations = plan.compile_steps(&config)?;
            let rejected_step = first_rejected_step(&relations);
            let Some(last) = relations.last() else {
                return Err(PushdownError::InternalError("compiled plan is empty".into()).into());
            };
            write_compiled(out, &config, last, rejected_step, format)?;
            Ok(outcome(last))
        }
        Command::Lineage { target } => {
            let (config, plan) = target.load()?;
            let relations = plan.compile_steps(&config)?;
            for (index, relation) in relations.iter().enumerate() {
                write_lineage_entry(out, index, relation)?;
            }
            Ok(relations.last().map_or(Outcome::Rejected, outcome))
        }
        Command::Quote {
            dialect,
            identifiers,
        } => {
            let mut outcome = Outcome::Valid;
            for ident in &identifiers {
                if dialect.is_legal_identifier(ident) {
                    writeln!(out, "{}", dialect.quote_ident(ident))?;
                } else {
                    tracing::warn!(%dialect, identifier = %ident, "illegal identifier");
                    writeln!(out, "!{ident}")?;
                    outcome = Outcome::Rejected;
                }
            }
            Ok(outcome)
        }
    }
}

impl PlanArgs {
    fn load(&self) -> Result<(PushdownConfig, PlanSpec), PushdownError> {
        let mut config = match &self.config {
            Some(path) => PushdownConfig::load(path)?,
            None => PushdownConfig::default(),
        }
        .with_env_overrides()?;
        if let Some(dialect) = self.dialect {
            config.dialect = dialect;
        }
        let plan = PlanSpec::load(&self.plan)?;
        tracing::debug!(
            plan = %self.plan.display(),
            steps = plan.steps.len(),
            dialect = %config.dialect,
            "loaded plan"
        );
        Ok((config, plan))
    }
}

fn outcome(relation: &Relation) -> Outcome {
    if relation.is_valid() {
        Outcome::Valid
    } else {
        Outcome::Rejected
    }
}

fn write_compiled<W: Write>(
    out: &mut W,
    config: &PushdownConfig,
    relation: &Relation,
    rejected_step: Option<usize>,
    format: OutputFormat,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Sql => match (relation.transform_expression(), relation.validation_error()) {
            (Some(sql), _) => writeln!(out, "{sql}")?,
            (None, Some(err)) => {
                let step = rejected_step.map_or(String::new(), |i| format!("step {i}: "));
                writeln!(out, "-- rejected: {step}{err}")?;
            }
            (None, None) => {}
        },
        OutputFormat::Json => {
            let report = CompileReport {
                valid: relation.is_valid(),
                dialect: config.dialect.name(),
                columns: relation.columns(),
                sql: relation.transform_expression(),
                error: relation.validation_error().map(ToString::to_string),
                rejected_step,
            };
            serde_json::to_writer_pretty(&mut *out, &report)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn write_lineage_entry<W: Write>(
    out: &mut W,
    index: usize,
    relation: &Relation,
) -> std::io::Result<()> {
    match (relation.operation(), relation.validation_error()) {
        (Some(op), _) => writeln!(
            out,
            "{index}\t{op}\t[{}]\t{}",
            relation.columns().join(", "),
            relation.transform_expression().unwrap_or_default()
        ),
        (None, Some(err)) => writeln!(out, "{index}\tinvalid\t{err}"),
        (None, None) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const PLAN: &str = r#"{
        "source": {"project": "proj", "dataset": "ds", "table": "orders",
                   "name": "o", "columns": ["id", "amount"]},
        "steps": [
            {"op": "filter", "condition": {"sql": "amount > 10"}},
            {"op": "drop_column", "name": "amount"}
        ]
    }"#;

    const BAD_PLAN: &str = r#"{
        "source": {"project": "proj", "dataset": "ds", "table": "orders",
                   "name": "o", "columns": ["id", "amount"]},
        "steps": [
            {"op": "drop_column", "name": "amount"},
            {"op": "filter", "condition": {"sql": "id = 1; DROP TABLE x"}}
        ]
    }"#;

    fn write_plan(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        path
    }

    fn run_args(args: &[&str]) -> (Result<Outcome, CliError>, String) {
        let cli = Cli::try_parse_from(std::iter::once("pushdown").chain(args.iter().copied()))
            .unwrap();
        let mut out = Vec::new();
        let result = run(cli, &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_compile_prints_sql() {
        let dir = TempDir::new().unwrap();
        let plan = write_plan(&dir, "plan.json", PLAN);
        let (result, out) = run_args(&["compile", "--dialect", "bigquery", plan.to_str().unwrap()]);
        assert_eq!(result.unwrap(), Outcome::Valid);
        insta::assert_snapshot!(out.trim_end(), @"SELECT id AS id FROM (SELECT id AS id, amount AS amount FROM (SELECT id AS id, amount AS amount FROM `proj.ds.orders`) AS o WHERE amount > 10) AS o");
    }

    #[test]
    fn test_compile_postgres_from_toml_plan() {
        let dir = TempDir::new().unwrap();
        let plan = write_plan(
            &dir,
            "plan.toml",
            r#"
            [source]
            dataset = "public"
            table = "users"
            name = "u"
            columns = ["id", "order"]
            "#,
        );
        let (result, out) = run_args(&["compile", "-d", "postgresql", plan.to_str().unwrap()]);
        assert_eq!(result.unwrap(), Outcome::Valid);
        insta::assert_snapshot!(out.trim_end(), @r#"SELECT id AS id, "order" AS "order" FROM public.users"#);
    }

    #[test]
    fn test_rejected_plan_exits_with_rejection() {
        let dir = TempDir::new().unwrap();
        let plan = write_plan(&dir, "bad.json", BAD_PLAN);
        let (result, out) = run_args(&["compile", "-d", "bigquery", plan.to_str().unwrap()]);
        assert_eq!(result.unwrap(), Outcome::Rejected);
        insta::assert_snapshot!(out.trim_end(), @"-- rejected: step 1: Unsupported or invalid expression type.");
    }

    #[test]
    fn test_json_report() {
        let dir = TempDir::new().unwrap();
        let plan = write_plan(&dir, "bad.json", BAD_PLAN);
        let (result, out) = run_args(&[
            "compile",
            "-d",
            "bigquery",
            "--format",
            "json",
            plan.to_str().unwrap(),
        ]);
        assert_eq!(result.unwrap(), Outcome::Rejected);
        let report: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(report["valid"], false);
        assert_eq!(report["dialect"], "bigquery");
        assert_eq!(report["rejected_step"], 1);
        assert!(report.get("sql").is_none());
    }

    #[test]
    fn test_lineage_lists_every_step() {
        let dir = TempDir::new().unwrap();
        let plan = write_plan(&dir, "plan.json", PLAN);
        let (result, out) = run_args(&["lineage", "-d", "bigquery", plan.to_str().unwrap()]);
        assert_eq!(result.unwrap(), Outcome::Valid);
        let ops: Vec<&str> = out
            .lines()
            .map(|l| l.split('\t').nth(1).unwrap())
            .collect();
        assert_eq!(ops, vec!["base", "filter", "drop_column"]);
    }

    #[test]
    fn test_config_file_supplies_dataset() {
        let dir = TempDir::new().unwrap();
        let config = write_plan(&dir, "pushdown.toml", "dialect = \"postgresql\"\ndataset = \"sales\"\n");
        let plan = write_plan(
            &dir,
            "plan.json",
            r#"{"source": {"table": "t", "name": "t", "columns": ["a"]}}"#,
        );
        let (result, out) = run_args(&[
            "compile",
            "--config",
            config.to_str().unwrap(),
            "-d",
            "postgresql",
            plan.to_str().unwrap(),
        ]);
        assert_eq!(result.unwrap(), Outcome::Valid);
        assert_eq!(out.trim_end(), "SELECT a AS a FROM sales.t");
    }

    #[test]
    fn test_missing_plan_file_is_error() {
        let (result, _) = run_args(&["compile", "/nonexistent/plan.json"]);
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            CliError::Pushdown(PushdownError::PlanFile { .. })
        ));
        assert!(err.to_string().contains("/nonexistent/plan.json"), "{err}");
    }

    #[test]
    fn test_dialect_flags_fall_back_to_environment() {
        use clap::CommandFactory;

        let cmd = Cli::command();
        for sub in ["compile", "lineage", "quote"] {
            let dialect = cmd
                .find_subcommand(sub)
                .unwrap()
                .get_arguments()
                .find(|a| a.get_id() == "dialect")
                .unwrap();
            assert_eq!(
                dialect.get_env(),
                Some(std::ffi::OsStr::new("PUSHDOWN_DIALECT")),
                "{sub}"
            );
        }
    }

    #[test]
    fn test_quote() {
        let (result, out) = run_args(&["quote", "-d", "postgresql", "id", "Name", "select"]);
        assert_eq!(result.unwrap(), Outcome::Valid);
        insta::assert_snapshot!(out.trim_end(), @r#"
        id
        "Name"
        "select"
        "#);
    }

    #[test]
    fn test_unknown_dialect_is_rejected_by_parser() {
        assert!(Cli::try_parse_from(["pushdown", "quote", "-d", "oracle", "x"]).is_err());
    }
}
