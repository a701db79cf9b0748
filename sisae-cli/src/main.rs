/*!
SISAE CLI - command-line interface for the sanctions backup engine.

Creates, lists, inspects and restores backups of a JSON data file, and can
run the daily automatic backup loop in the foreground.
*/

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use sisae_core::{
    BackupConfig, BackupService, Collection, JsonFileRepository, LocalBackupStorage,
    NewClubSanction, NewPersonalSanction, SanctionRepository,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabled::{Table, Tabled};
use tracing::{error, info};

type Service = BackupService<LocalBackupStorage, JsonFileRepository>;

#[derive(Parser)]
#[command(name = "sisae")]
#[command(about = "Backup and restore tool for SISAE sanction records")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Directory holding backup files
    #[arg(short, long, global = true, env = "SISAE_BACKUP_DIR")]
    backup_dir: Option<PathBuf>,

    /// JSON data file with the live sanctions and users
    #[arg(
        short,
        long,
        global = true,
        env = "SISAE_DATA_FILE",
        default_value = "./data/sisae.json"
    )]
    data: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take a backup of the current data
    Create,
    /// List stored backups, newest first
    List,
    /// Show the contents of a backup
    Show {
        /// Backup file name
        file_name: String,
        /// Print every record as JSON
        #[arg(short, long)]
        records: bool,
    },
    /// Replace the live sanctions with the contents of a backup
    Restore {
        /// Backup file name
        file_name: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Run the daily automatic backup loop until interrupted
    Schedule,
    /// Summarize the live data set
    Stats,
    /// Register a new sanction from a JSON file
    Add {
        /// Which collection the sanction belongs to
        #[arg(value_enum)]
        collection: CollectionArg,
        /// File with the sanction fields in camelCase
        file: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CollectionArg {
    Club,
    Personal,
}

#[derive(Tabled)]
struct BackupRow {
    #[tabled(rename = "File")]
    file_name: String,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "Size")]
    size: String,
}

#[derive(Tabled)]
struct CountRow {
    #[tabled(rename = "Collection")]
    collection: String,
    #[tabled(rename = "Records")]
    records: usize,
    #[tabled(rename = "Next number")]
    next_number: String,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.json_logs)?;

    let service = Arc::new(build_service(&cli).await?);

    match cli.command {
        Commands::Create => create_backup(&service).await?,
        Commands::List => list_backups(&service).await?,
        Commands::Show { file_name, records } => show_backup(&service, &file_name, records).await?,
        Commands::Restore { file_name, force } => {
            restore_backup(&service, &file_name, force).await?
        }
        Commands::Schedule => run_scheduler(&service).await?,
        Commands::Stats => show_stats(&service).await?,
        Commands::Add { collection, file } => add_sanction(&service, collection, &file).await?,
    }

    Ok(())
}

fn init_logging(verbose: bool, json: bool) -> Result<(), anyhow::Error> {
    if json {
        sisae_core::init_observability(true)?;
        return Ok(());
    }

    let filter = if verbose {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug"))
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
    Ok(())
}

async fn build_service(cli: &Cli) -> Result<Service, anyhow::Error> {
    let mut config = BackupConfig::from_env()?;
    if let Some(dir) = &cli.backup_dir {
        config.backup_dir = dir.clone();
    }

    let repository = JsonFileRepository::open(&cli.data)
        .await
        .with_context(|| format!("opening data file {}", cli.data.display()))?;

    Ok(BackupService::from_config(config, Arc::new(repository))?)
}

async fn create_backup(service: &Service) -> Result<(), anyhow::Error> {
    let location = service.create_backup().await?;
    println!("✓ Backup created: {location}");
    Ok(())
}

async fn list_backups(service: &Service) -> Result<(), anyhow::Error> {
    let rows: Vec<BackupRow> = service
        .list_backups_formatted()
        .await
        .into_iter()
        .map(|listing| BackupRow {
            file_name: listing.file_name,
            created: listing.formatted_date,
            size: listing.formatted_size,
        })
        .collect();

    if rows.is_empty() {
        println!(
            "No backups found in {}",
            service.config().backup_dir.display()
        );
    } else {
        println!("{}", Table::new(rows));
    }
    Ok(())
}

async fn show_backup(service: &Service, file_name: &str, records: bool) -> Result<(), anyhow::Error> {
    let snapshot = service.store().load(file_name).await?;

    println!("Backup Details:");
    println!("  File: {file_name}");
    println!("  Timestamp: {}", snapshot.timestamp);
    println!("  Format Version: {}", snapshot.version);
    println!(
        "  Club sanctions: {}",
        snapshot.statistics.total_club_sanctions
    );
    println!(
        "  Personal sanctions: {}",
        snapshot.statistics.total_personal_sanctions
    );
    println!("  Users: {}", snapshot.statistics.total_users);

    if records {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }
    Ok(())
}

async fn restore_backup(service: &Service, file_name: &str, force: bool) -> Result<(), anyhow::Error> {
    if !force {
        print!("Replace all current sanctions with the contents of '{file_name}'? (y/N): ");
        use std::io::{self, Write};
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().to_lowercase().starts_with('y') {
            println!("Restore cancelled");
            return Ok(());
        }
    }

    let outcome = service.restore_from_backup(file_name).await;
    if !outcome.success {
        error!("✗ {}", outcome.message);
        return Err(anyhow::anyhow!(outcome.message));
    }

    println!("✓ {}", outcome.message);
    if let Some(data) = outcome.restored_data {
        println!("  Club sanctions: {}", data.club_sanctions);
        println!("  Personal sanctions: {}", data.personal_sanctions);
        println!("  Safety backup: {}", data.safety_backup);
        for skipped in &data.skipped {
            let state = if skipped.inserted { "incomplete" } else { "skipped" };
            println!("  [{state}] {}", skipped.as_error());
        }
    }
    Ok(())
}

async fn run_scheduler(service: &Arc<Service>) -> Result<(), anyhow::Error> {
    let schedule = service.config().schedule;
    info!(
        "Starting daily backups at {:02}:{:02}",
        schedule.hour, schedule.minute
    );

    let handle = service.start_scheduler()?;
    tokio::signal::ctrl_c().await?;

    info!("Interrupted, stopping scheduler");
    handle.shutdown().await;
    Ok(())
}

async fn show_stats(service: &Service) -> Result<(), anyhow::Error> {
    let repository = service.store().repository();
    let allocator = service.allocator();
    let offset = service.store().offset();

    let clubs = repository.club_sanctions().await?.len();
    let personals = repository.personal_sanctions().await?.len();
    let users = repository.users().await?.len();

    let rows = vec![
        CountRow {
            collection: Collection::Club.to_string(),
            records: clubs,
            next_number: allocator.next_number(Collection::Club).await?.to_string(),
        },
        CountRow {
            collection: Collection::Personal.to_string(),
            records: personals,
            next_number: allocator.next_number(Collection::Personal).await?.to_string(),
        },
        CountRow {
            collection: "users".to_string(),
            records: users,
            next_number: "-".to_string(),
        },
    ];
    println!("{}", Table::new(rows));

    let today = chrono::Utc::now()
        .with_timezone(&offset)
        .format("%Y-%m-%d")
        .to_string();
    let pending = repository
        .expired_unreported_personal_sanctions(&today)
        .await?;
    println!("Expired personal sanctions not yet reported: {}", pending.len());

    #[cfg(feature = "metrics")]
    println!("{}", sisae_core::SisaeMetrics::global().gather_metrics()?);

    Ok(())
}

async fn add_sanction(
    service: &Service,
    collection: CollectionArg,
    file: &Path,
) -> Result<(), anyhow::Error> {
    let contents = tokio::fs::read(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;
    let allocator = service.allocator();

    match collection {
        CollectionArg::Club => {
            let sanction: NewClubSanction = serde_json::from_slice(&contents)?;
            let created = allocator.create_club_sanction(sanction).await?;
            println!(
                "✓ Club sanction #{} created for {}",
                created.numero_carga, created.nombre_sancionado
            );
        }
        CollectionArg::Personal => {
            let sanction: NewPersonalSanction = serde_json::from_slice(&contents)?;
            let created = allocator.create_personal_sanction(sanction).await?;
            println!(
                "✓ Personal sanction #{} created for {}",
                created.numero_carga, created.nombre_persona
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use tempfile::TempDir;

    #[test]
    fn test_cli_parses_restore() {
        let cli = Cli::parse_from(["sisae", "--data", "d.json", "restore", "backup_x.json", "-f"]);
        assert_eq!(cli.data, PathBuf::from("d.json"));
        match cli.command {
            Commands::Restore { file_name, force } => {
                assert_eq!(file_name, "backup_x.json");
                assert!(force);
            }
            _ => panic!("expected restore command"),
        }
    }

    #[test]
    fn test_cli_parses_add() {
        let cli = Cli::parse_from(["sisae", "add", "personal", "entry.json"]);
        assert!(matches!(
            cli.command,
            Commands::Add {
                collection: CollectionArg::Personal,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_build_service_creates_backup_in_backup_dir() {
        let temp_dir = TempDir::new().unwrap();
        let data = temp_dir.path().join("data.json");
        let backups = temp_dir.path().join("backups");

        let args: Vec<OsString> = vec![
            "sisae".into(),
            "--data".into(),
            data.clone().into_os_string(),
            "--backup-dir".into(),
            backups.clone().into_os_string(),
            "create".into(),
        ];
        let cli = Cli::parse_from(args);
        let service = build_service(&cli).await.unwrap();
        create_backup(&service).await.unwrap();

        let listed = service.list_backups().await;
        assert_eq!(listed.len(), 1);
        assert!(backups.join(&listed[0].file_name).is_file());
        assert!(service.store().load(&listed[0].file_name).await.is_ok());
    }
}
