//! wex: warehouse extraction CLI
//!
//! # Usage
//!
//! ```bash
//! # Show the SQL a config produces
//! wex plan extract.toml --schema schema.json
//!
//! # Check a config against a schema snapshot
//! wex check extract.toml --schema schema.json
//!
//! # Snapshot the warehouse schema
//! wex schema --database SALES --output schema.json
//!
//! # Extract everything into ./extract
//! wex run extract.toml --out ./extract
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use tracing_subscriber::EnvFilter;

use wex::config::{ExtractionConfig, Severity, has_errors, plan_with_alias_capacity, validate};
use wex::engine::Warehouse;
use wex::query::Query;
use wex::runner::Runner;
use wex::schema::Schema;
use wex::settings::Settings;

#[derive(Parser)]
#[command(name = "wex")]
#[command(version)]
#[command(about = "Declarative bulk extraction from a SQL warehouse", long_about = None)]
#[command(after_help = "EXAMPLES:
    wex plan extract.toml --schema schema.json
    wex schema --database SALES --output schema.json
    wex run extract.toml --schema schema.json --out ./extract")]
struct Cli {
    /// Settings file (defaults to $WEX_CONFIG, ./wex.toml, then the user config dir)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum PlanFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the SQL for every view without touching the warehouse
    Plan {
        config: PathBuf,
        /// Schema snapshot (JSON)
        #[arg(short, long)]
        schema: PathBuf,
        #[arg(short, long, value_enum, default_value = "text")]
        format: PlanFormat,
    },
    /// Validate a config against a schema snapshot
    Check {
        config: PathBuf,
        #[arg(short, long)]
        schema: PathBuf,
    },
    /// Extract every view into files
    Run {
        config: PathBuf,
        /// Schema snapshot; introspected from the warehouse when omitted
        #[arg(short, long)]
        schema: Option<PathBuf>,
        #[arg(long, env = "WEX_DATABASE_URL")]
        database_url: Option<String>,
        /// Output directory
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Statements executed at the same time
        #[arg(short, long)]
        concurrency: Option<usize>,
        /// Write a JSON run report here
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Introspect the warehouse into a schema snapshot
    Schema {
        /// Databases (schemas) to read
        #[arg(short, long, required = true)]
        database: Vec<String>,
        #[arg(long, env = "WEX_DATABASE_URL")]
        database_url: Option<String>,
        /// Write JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = dispatch(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "wex=debug" } else { "wex=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> Result<()> {
    let settings = match &cli.settings {
        Some(path) => Settings::from_file(path)?,
        None => Settings::load()?,
    };

    match cli.command {
        Commands::Plan {
            config,
            schema,
            format,
        } => plan_cmd(&settings, &config, &schema, format),
        Commands::Check { config, schema } => check_cmd(&config, &schema),
        Commands::Run {
            config,
            schema,
            database_url,
            out,
            concurrency,
            report,
        } => {
            let mut settings = settings;
            if let Some(out) = out {
                settings.output.directory = out;
            }
            if let Some(concurrency) = concurrency {
                settings.run.concurrency = concurrency;
            }
            run_cmd(&settings, &config, schema.as_deref(), database_url, report.as_deref()).await
        }
        Commands::Schema {
            database,
            database_url,
            output,
        } => schema_cmd(&settings, &database, database_url, output.as_deref()).await,
    }
}

fn plan_cmd(settings: &Settings, config: &Path, schema: &Path, format: PlanFormat) -> Result<()> {
    let config = ExtractionConfig::from_file(config)?;
    let schema = Schema::from_file(schema)?;
    let queries = plan_with_alias_capacity(&config, &schema, settings.run.max_aliases)?;

    match format {
        PlanFormat::Json => println!("{}", serde_json::to_string_pretty(&queries)?),
        PlanFormat::Text => {
            for q in &queries {
                println!("{} {}", "--".dimmed(), q.label().cyan());
                println!("{}", q.sql);
            }
            println!();
            println!("{} queries", queries.len().to_string().cyan());
        }
    }
    Ok(())
}

fn check_cmd(config: &Path, schema: &Path) -> Result<()> {
    let config = ExtractionConfig::from_file(config)?;
    let schema = Schema::from_file(schema)?;
    let issues = validate(&config, &schema);

    if issues.is_empty() {
        println!("{} {} views OK", "✓".green(), config.view_count());
        return Ok(());
    }
    for issue in &issues {
        match issue.severity {
            Severity::Error => println!("{} {}: {}", "error".red().bold(), issue.path, issue.message),
            Severity::Warning => println!("{} {}: {}", "warning".yellow(), issue.path, issue.message),
        }
    }
    if has_errors(&issues) {
        bail!("config has errors");
    }
    Ok(())
}

async fn run_cmd(
    settings: &Settings,
    config: &Path,
    schema: Option<&Path>,
    database_url: Option<String>,
    report: Option<&Path>,
) -> Result<()> {
    let config = ExtractionConfig::from_file(config)?;
    let warehouse = connect(settings, database_url).await?;

    let schema = match schema {
        Some(path) => Schema::from_file(path)?,
        None => {
            let mut databases: Vec<String> = config.sources.iter().map(|s| s.database.clone()).collect();
            databases.sort();
            databases.dedup();
            warehouse.introspect(&databases).await?
        }
    };

    let issues = validate(&config, &schema);
    for issue in &issues {
        eprintln!("{}", issue.to_string().yellow());
    }
    if has_errors(&issues) {
        bail!("config has errors; run `wex check` for details");
    }

    let queries: Vec<Query> = plan_with_alias_capacity(&config, &schema, settings.run.max_aliases)?;
    println!(
        "{} {} queries into {}",
        "Extracting".cyan().bold(),
        queries.len(),
        settings.output.directory.display()
    );

    let runner = Runner::new(warehouse, settings.output.clone(), settings.run.concurrency);
    let result = runner.run(queries).await?;

    for outcome in &result.outcomes {
        match &outcome.error {
            None => println!(
                "{} {} ({} rows, {} ms)",
                "✓".green(),
                outcome.label,
                outcome.rows,
                outcome.elapsed_ms
            ),
            Some(e) => println!("{} {}: {}", "✗".red(), outcome.label, e),
        }
    }
    if let Some(path) = report {
        result.save(path)?;
    }

    println!();
    println!(
        "{} succeeded, {} failed, {} rows",
        result.succeeded().to_string().green(),
        result.failed().to_string().red(),
        result.total_rows()
    );
    if result.failed() > 0 {
        bail!("{} statements failed", result.failed());
    }
    Ok(())
}

async fn schema_cmd(
    settings: &Settings,
    databases: &[String],
    database_url: Option<String>,
    output: Option<&Path>,
) -> Result<()> {
    let warehouse = connect(settings, database_url).await?;
    let schema = warehouse.introspect(databases).await?;

    match output {
        Some(path) => {
            schema.save(path)?;
            println!(
                "{} Wrote {} tables to {}",
                "✓".green(),
                schema.table_count(),
                path.display().to_string().cyan()
            );
        }
        None => println!("{}", schema.to_json()?),
    }
    Ok(())
}

async fn connect(settings: &Settings, database_url: Option<String>) -> Result<Warehouse> {
    let url = match database_url {
        Some(url) => url,
        None => settings
            .warehouse
            .resolved_url()?
            .context("No database URL. Use --database-url, set WEX_DATABASE_URL or [warehouse] url")?,
    };
    Ok(Warehouse::connect(&url, settings.warehouse.max_connections).await?)
}
