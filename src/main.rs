use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use uerj_scraper::config::{Config, StoreBackend, DEFAULT_CONFIG_PATH};
use uerj_scraper::storage::{DocumentStore, InMemoryDocumentStore};
use uerj_scraper::{
    logging, metrics, CatalogService, Credentials, DisciplineSetUpdate, Student, StudentService,
    StudentUpdate,
};

#[derive(Parser)]
#[command(name = "uerj_scraper")]
#[command(about = "UERJ academic portal discipline scraper")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Expose Prometheus metrics while running
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in, crawl the curriculum catalog and reconcile it into the store
    Scrape,
    /// Print stored disciplines
    Disciplines {
        /// Print a single discipline
        #[arg(long)]
        id: Option<String>,
    },
    /// Manage a student's discipline sets
    Student {
        #[command(subcommand)]
        action: StudentAction,
    },
}

#[derive(Subcommand)]
enum StudentAction {
    Create {
        #[arg(long)]
        id: String,
        #[arg(long, value_delimiter = ',')]
        completed: Vec<String>,
        #[arg(long, value_delimiter = ',')]
        current: Vec<String>,
    },
    Get {
        #[arg(long)]
        id: String,
    },
    Update {
        #[arg(long)]
        id: String,
        #[arg(long, value_delimiter = ',')]
        add_completed: Vec<String>,
        #[arg(long, value_delimiter = ',')]
        remove_completed: Vec<String>,
        /// Replace the completed set (empty clears it)
        #[arg(long, value_delimiter = ',', num_args = 0..)]
        set_completed: Option<Vec<String>>,
        #[arg(long, value_delimiter = ',')]
        add_current: Vec<String>,
        #[arg(long, value_delimiter = ',')]
        remove_current: Vec<String>,
        /// Replace the current set (empty clears it)
        #[arg(long, value_delimiter = ',', num_args = 0..)]
        set_current: Option<Vec<String>>,
    },
    Delete {
        #[arg(long)]
        id: String,
    },
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn DocumentStore>> {
    match config.store.backend {
        StoreBackend::Memory => {
            info!("Using in-memory store");
            Ok(Arc::new(InMemoryDocumentStore::new()))
        }
        #[cfg(feature = "db")]
        StoreBackend::Libsql => {
            use uerj_scraper::storage::libsql_store::LibsqlDocumentStore;
            let store = if std::env::var("LIBSQL_URL").is_ok() {
                LibsqlDocumentStore::open_remote().await?
            } else {
                LibsqlDocumentStore::open_local(&config.store.libsql_path).await?
            };
            store.run_migrations().await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "db"))]
        StoreBackend::Libsql => {
            bail!("store.backend = \"libsql\" needs a build with the `db` feature")
        }
    }
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_student(service: StudentService, action: StudentAction) -> anyhow::Result<()> {
    match action {
        StudentAction::Create {
            id,
            completed,
            current,
        } => {
            let student = Student {
                student_id: id,
                completed_disciplines: completed.into_iter().collect(),
                current_disciplines: current.into_iter().collect(),
            };
            service.create_student(&student).await?;
            print_json(&student)
        }
        StudentAction::Get { id } => print_json(&service.get_student(&id).await?),
        StudentAction::Update {
            id,
            add_completed,
            remove_completed,
            set_completed,
            add_current,
            remove_current,
            set_current,
        } => {
            let update = StudentUpdate {
                completed_disciplines: DisciplineSetUpdate {
                    add: add_completed,
                    remove: remove_completed,
                    set: set_completed,
                },
                current_disciplines: DisciplineSetUpdate {
                    add: add_current,
                    remove: remove_current,
                    set: set_current,
                },
            };
            if update.completed_disciplines.is_empty() && update.current_disciplines.is_empty() {
                bail!("nothing to update");
            }
            print_json(&service.update_student(&id, &update).await?)
        }
        StudentAction::Delete { id } => {
            service.delete_student(&id).await?;
            println!("Deleted student {}", id);
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let _log_guard = logging::init_logging();

    let cli = Cli::parse();
    if cli.metrics {
        metrics::init_metrics();
    }

    let config = Config::load_from(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    match &cli.command {
        Commands::Scrape if !config.store.backend.is_persistent() => {
            warn!("Using the in-memory store: scraped disciplines are discarded at exit");
        }
        Commands::Disciplines { .. } => config.require_persistent_store("disciplines")?,
        Commands::Student { .. } => config.require_persistent_store("student")?,
        _ => {}
    }
    let store = open_store(&config).await?;

    match cli.command {
        Commands::Scrape => {
            let credentials =
                Credentials::from_env().context("UERJ_MATRICULA and UERJ_SENHA must be set")?;
            let service = CatalogService::new(store, config);
            match service.scrape_all_report(&credentials).await {
                Ok(report) => {
                    println!("Scraped {} disciplines", report.disciplines.len());
                    println!("   Enriched: {}", report.enriched);
                    println!("   Persisted: {}", report.persisted);
                    if !report.enrichment_failures.is_empty() {
                        println!("   Detail failures: {}", report.enrichment_failures.join(", "));
                    }
                    if !report.failed_writes.is_empty() {
                        println!("   Failed writes: {}", report.failed_writes.join(", "));
                    }
                }
                Err(e) => {
                    error!("Scrape failed: {}", e);
                    return Err(e.into());
                }
            }
        }
        Commands::Disciplines { id } => {
            let service = CatalogService::new(store, config);
            match id {
                Some(id) => print_json(&service.get_discipline_by_id(&id).await?)?,
                None => print_json(&service.get_all_disciplines().await?)?,
            }
        }
        Commands::Student { action } => {
            run_student(StudentService::new(store), action).await?;
        }
    }
    Ok(())
}
