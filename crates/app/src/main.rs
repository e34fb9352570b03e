use anyhow::{bail, Context};
use chrono::{Datelike, Local};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use schedc::{AppConfig, Ledger};
use schedc_categorize::{Categorizer, OpenRouterClassifier};
use schedc_core::{
    HomeOfficeMethod, SortKey, SortOrder, ToggleFilter, TransactionId, TransactionQuery,
    TypeFilter,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schedc", version, about = "Card statement ingestion and Schedule C preparation.")]
struct Cli {
    /// Config file (default: config.toml in the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overriding the config
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import one or more card statement CSV files.
    Import {
        /// Card label stored on every imported row
        #[arg(long)]
        source: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List transactions with filters, sorting and paging.
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        source: Option<String>,
        /// all, business or personal
        #[arg(long, default_value = "all")]
        kind: TypeFilter,
        #[arg(long)]
        category: Option<String>,
        /// date, amount, vendor, category or business
        #[arg(long, default_value = "date")]
        sort_by: SortKey,
        #[arg(long)]
        asc: bool,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = 50)]
        page_size: usize,
    },
    /// Mark one transaction as business (or personal).
    Toggle {
        id: String,
        #[arg(long)]
        personal: bool,
    },
    /// Mark every matching transaction as business (or personal).
    ToggleAll {
        #[arg(long)]
        personal: bool,
        #[arg(long)]
        source: Option<String>,
        #[arg(long, default_value = "all")]
        kind: TypeFilter,
        /// Restrict to these ids
        #[arg(long = "id")]
        ids: Vec<String>,
    },
    /// Record business miles driven.
    Mileage { miles: Decimal },
    /// Record the home office deduction.
    HomeOffice {
        square_feet: Decimal,
        /// simplified or actual
        #[arg(long, default_value = "simplified")]
        method: HomeOfficeMethod,
        /// Expense total for the actual method
        #[arg(long)]
        actual_amount: Option<Decimal>,
    },
    /// Show the dashboard summary.
    Summary,
    /// Build the Schedule C line report.
    ScheduleC {
        /// Tax year (default: current year)
        #[arg(long)]
        year: Option<i32>,
        /// Print the plain-text form instead of JSON
        #[arg(long)]
        text: bool,
    },
    /// Export transactions and deductions as CSV.
    ExportCsv {
        /// Output file (default: stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Classify uncategorized business transactions.
    Categorize {
        #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },
    /// Delete all transactions.
    Clear {
        /// Also reset the saved deductions
        #[arg(long)]
        all: bool,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    let db_path = match cli.db {
        Some(path) => path,
        None => config.database_path()?,
    };
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let ledger = Ledger::open(&db_path, config.rates).await?;
    tracing::debug!(db = %db_path.display(), "Opened ledger");

    match cli.command {
        Commands::Import { source, files } => {
            let outcome = ledger.upload_files(&files, &source).await;
            print_json(&outcome)?;
            if outcome.total_uploaded == 0 {
                bail!("No files were imported");
            }
        }
        Commands::List {
            search,
            source,
            kind,
            category,
            sort_by,
            asc,
            page,
            page_size,
        } => {
            let query = TransactionQuery {
                search,
                source,
                kind,
                category,
                sort_by,
                sort_order: if asc { SortOrder::Asc } else { SortOrder::Desc },
                page,
                page_size,
            };
            print_json(&ledger.list_transactions(&query).await?)?;
        }
        Commands::Toggle { id, personal } => {
            let outcome = ledger
                .toggle_business(&TransactionId::from(id.as_str()), !personal)
                .await?;
            print_json(&outcome)?;
        }
        Commands::ToggleAll {
            personal,
            source,
            kind,
            ids,
        } => {
            let filter = ToggleFilter {
                source,
                kind,
                ids: (!ids.is_empty())
                    .then(|| ids.iter().map(|id| TransactionId::from(id.as_str())).collect()),
            };
            print_json(&ledger.toggle_all_business(!personal, &filter).await?)?;
        }
        Commands::Mileage { miles } => {
            print_json(&ledger.save_mileage(miles).await?)?;
        }
        Commands::HomeOffice {
            square_feet,
            method,
            actual_amount,
        } => {
            let saved = ledger
                .save_home_office(square_feet, method, actual_amount)
                .await?;
            print_json(&saved)?;
        }
        Commands::Summary => {
            print_json(&ledger.summary().await?)?;
        }
        Commands::ScheduleC { year, text } => {
            let today = Local::now().date_naive();
            let report = ledger.schedule_c(year.unwrap_or(today.year())).await?;
            if text {
                print!("{}", report.render_text(today));
            } else {
                print_json(&report)?;
            }
        }
        Commands::ExportCsv { output } => {
            let csv = ledger.export_csv().await?;
            match output {
                Some(path) => {
                    std::fs::write(&path, csv)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    tracing::info!(path = %path.display(), "Exported CSV");
                }
                None => print!("{csv}"),
            }
        }
        Commands::Categorize { api_key } => {
            let credential = api_key.unwrap_or_default();
            let categorizer = Categorizer::new(OpenRouterClassifier::new(config.openrouter())?);
            print_json(&ledger.categorize_uncategorized(&categorizer, &credential).await?)?;
        }
        Commands::Clear { all } => {
            if all {
                ledger.clear_all().await?;
            } else {
                ledger.clear_transactions().await?;
            }
            println!("Cleared");
        }
    }

    Ok(())
}
