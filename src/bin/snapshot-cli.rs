use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use mount_server::backup::{Restorer, SnapshotCodec};
use mount_server::config::{load_config, ServerConfig};
use mount_server::observability::logging;
use mount_server::ops::MountOperations;
use mount_server::store::{EntityKind, EntitySet, MemoryStore, Repository};

#[derive(Parser)]
#[command(name = "snapshot-cli")]
#[command(about = "Offline backup and restore of a mount-server store file", long_about = None)]
struct Cli {
    /// JSON store file to read or update.
    #[arg(short, long)]
    store: PathBuf,

    /// Server configuration supplying the default backup kinds.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a snapshot of the store
    Backup {
        /// Kinds to include (users, storages, settings, metas)
        #[arg(short, long, value_delimiter = ',')]
        kinds: Vec<EntityKind>,
    },
    /// Apply a snapshot read from a file, or stdin when omitted
    Restore { file: Option<PathBuf> },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    logging::init("warn");

    let store = Arc::new(MemoryStore::open(&cli.store)?);
    let repository = Repository::new(store.clone(), EntitySet::empty());

    match cli.command {
        Commands::Backup { kinds } => {
            let kinds = if kinds.is_empty() {
                config.backup.kinds
            } else {
                kinds.into_iter().collect()
            };
            let text = SnapshotCodec::new(&repository, &kinds).backup()?;
            println!("{text}");
        }
        Commands::Restore { file } => {
            let text = match file {
                Some(path) => std::fs::read_to_string(path)?,
                None => {
                    let mut text = String::new();
                    std::io::stdin().read_to_string(&mut text)?;
                    text
                }
            };
            let repository = Arc::new(repository);
            let operations = MountOperations::new(Arc::clone(&repository));
            let report = Restorer::new(&repository, &operations, || false).restore(&text);
            if report.aborted {
                return Err("snapshot could not be parsed".into());
            }

            for kind in EntityKind::RESTORE_ORDER {
                println!("{kind}: {} applied, {} failed", report.applied(kind), report.failed(kind));
            }
            for kind in &report.skipped {
                eprintln!("{kind}: section skipped");
            }
            store.save()?;
        }
    }

    Ok(())
}
