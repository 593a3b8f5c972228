use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use snapdetect_lib::{init_logging, Database, SettingsStore, DATABASE_FILE, SETTINGS_FILE};

#[derive(Parser, Debug)]
#[command(name = "snapdetect", about = "Inspect and manage saved detection snapshots")]
struct Args {
    /// Directory holding the snapshot database and settings file.
    #[arg(long, env = "SNAPDETECT_DATA_DIR", default_value = "snapdetect-data")]
    data_dir: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List snapshots, newest first.
    List {
        /// Defaults to the configured list limit.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print one snapshot and its detected objects as JSON.
    Show { id: String },
    /// Write the snapshot's PNG still to a file.
    Export { id: String, path: PathBuf },
    Delete { id: String },
    /// Print the effective pipeline settings, creating the file if missing.
    Settings,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    fs::create_dir_all(&args.data_dir)
        .with_context(|| format!("create data dir {}", args.data_dir.display()))?;
    let settings = SettingsStore::new(args.data_dir.join(SETTINGS_FILE))?;

    match args.command {
        Command::Settings => {
            if !settings.path().exists() {
                settings.save()?;
                info!("wrote default settings to {}", settings.path().display());
            }
            println!("{}", serde_json::to_string_pretty(&settings.pipeline())?);
        }
        Command::List { limit } => {
            let db = Database::new(args.data_dir.join(DATABASE_FILE))?;
            let limit = limit.unwrap_or(settings.pipeline().list_limit);
            let summaries = db.list_snapshot_summaries(limit).await?;
            if summaries.is_empty() {
                println!("no snapshots");
            }
            for summary in summaries {
                println!(
                    "{}  {}  {}",
                    summary.id,
                    summary.created_at.format("%Y-%m-%d %H:%M:%S"),
                    summary.caption()
                );
            }
        }
        Command::Show { id } => {
            let db = Database::new(args.data_dir.join(DATABASE_FILE))?;
            let Some(snapshot) = db.get_snapshot(&id).await? else {
                bail!("snapshot {id} not found");
            };
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Command::Export { id, path } => {
            let db = Database::new(args.data_dir.join(DATABASE_FILE))?;
            let Some(snapshot) = db.get_snapshot(&id).await? else {
                bail!("snapshot {id} not found");
            };
            fs::write(&path, &snapshot.image_data)
                .with_context(|| format!("write {}", path.display()))?;
            println!(
                "wrote {} bytes to {}",
                snapshot.image_data.len(),
                path.display()
            );
        }
        Command::Delete { id } => {
            let db = Database::new(args.data_dir.join(DATABASE_FILE))?;
            if !db.delete_snapshot(&id).await? {
                bail!("snapshot {id} not found");
            }
            println!("deleted {id}");
        }
    }

    Ok(())
}
