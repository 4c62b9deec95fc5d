use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use salary_board::config::AppConfig;
use salary_board::db::{self, PgEntryStore};
use salary_board::models::{ContractType, Formation, ParticipantType, Specialty};
use salary_board::report;
use salary_board::store::{EntryStore, MemoryEntryStore};
use salary_board::{
    available_years, compute_metrics, EntryFilters, EntryStoreAccessor, Preferences,
};

#[derive(Parser)]
#[command(name = "salary-board")]
#[command(
    about = "Anonymous salary dashboard for engineering alumni and students",
    long_about = None
)]
struct Cli {
    /// Read entries from a CSV snapshot instead of Postgres
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct FilterArgs {
    #[arg(long)]
    formation: Option<Formation>,
    #[arg(long)]
    specialty: Option<Specialty>,
    #[arg(long)]
    contract: Option<ContractType>,
    #[arg(long)]
    participant: Option<ParticipantType>,
    /// Years since graduation to keep, comma separated
    #[arg(long, value_delimiter = ',')]
    years: Vec<u32>,
}

impl From<FilterArgs> for EntryFilters {
    fn from(args: FilterArgs) -> Self {
        Self {
            formation: args.formation,
            specialty: args.specialty,
            contract_type: args.contract,
            participant_type: args.participant,
            years_since_graduation: args.years.into_iter().collect(),
        }
    }
}

#[derive(Args, Clone)]
struct ExclusionArgs {
    /// Keep flagged outliers in the calculations
    #[arg(long)]
    include_outliers: bool,
    /// Entry ids to leave out of the calculations
    #[arg(long)]
    exclude: Vec<Uuid>,
}

impl From<ExclusionArgs> for Preferences {
    fn from(args: ExclusionArgs) -> Self {
        Self {
            exclude_outliers: !args.include_outliers,
            excluded_ids: args.exclude.into_iter().collect::<HashSet<_>>(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import submissions from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Print dashboard metrics
    Metrics {
        #[command(flatten)]
        filters: FilterArgs,
        #[command(flatten)]
        exclusions: ExclusionArgs,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Print the full snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        filters: FilterArgs,
        #[command(flatten)]
        exclusions: ExclusionArgs,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// List the years-since-graduation values present in the data
    Years {
        #[command(flatten)]
        filters: FilterArgs,
    },
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("SALARY_BOARD_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_query<S: EntryStore>(
    accessor: &EntryStoreAccessor<S>,
    command: Commands,
) -> anyhow::Result<()> {
    match command {
        Commands::Metrics {
            filters,
            exclusions,
            limit,
            json,
        } => {
            let entries = accessor.fetch_entries(&filters.into()).await?;
            let snapshot = compute_metrics(&entries, &exclusions.into());

            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
                return Ok(());
            }

            if snapshot.recent_entries.is_empty() {
                println!("No submissions found for these filters.");
                return Ok(());
            }

            println!(
                "{} participants counted ({} excluded, {} flagged)",
                snapshot.total_participants, snapshot.excluded_count, snapshot.flagged_count
            );
            println!(
                "Average {} / median {}",
                snapshot.average_salary, snapshot.median_salary
            );
            for (formation, average) in &snapshot.average_by_formation {
                println!("- {formation}: {average}");
            }
            println!("Most recent submissions:");
            for entry in snapshot.recent_entries.iter().take(limit) {
                let flag = if entry.is_outlier { " (flagged)" } else { "" };
                println!(
                    "- {} {} {} {}: {}{}",
                    entry.id,
                    entry.formation,
                    entry.specialty,
                    entry.contract_type,
                    entry.salary,
                    flag
                );
            }
        }
        Commands::Report {
            filters,
            exclusions,
            limit,
            out,
        } => {
            let filters: EntryFilters = filters.into();
            let entries = accessor.fetch_entries(&filters).await?;
            let snapshot = compute_metrics(&entries, &exclusions.into());
            let report = report::build_report(&filters, &snapshot, limit);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Years { filters } => {
            let entries = accessor.fetch_entries(&filters.into()).await?;
            let years = available_years(&entries);
            if years.is_empty() {
                println!("No graduation years recorded.");
            } else {
                let labels: Vec<String> = years.iter().map(|year| year.to_string()).collect();
                println!("{}", labels.join(", "));
            }
        }
        Commands::InitDb | Commands::Seed | Commands::Import { .. } => {
            bail!("this command needs a Postgres connection")
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    if let Some(path) = cli.snapshot {
        let store = MemoryEntryStore::from_csv(&path)
            .with_context(|| format!("failed to load snapshot {}", path.display()))?;
        let accessor = EntryStoreAccessor::with_rules(store, config.rules);
        return run_query(&accessor, cli.command).await;
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(config.require_database_url()?)
        .await
        .context("failed to connect to Postgres")?;
    let accessor = EntryStoreAccessor::with_rules(PgEntryStore::new(pool), config.rules);

    match cli.command {
        Commands::InitDb => {
            accessor.store().init_db().await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let inserted = db::seed(&accessor).await?;
            println!("Inserted {inserted} seed submissions.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&accessor, &csv).await?;
            println!("Inserted {inserted} submissions from {}.", csv.display());
        }
        command => run_query(&accessor, command).await?,
    }

    Ok(())
}
