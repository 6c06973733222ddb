use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use codatlas::pipeline::{Dispatcher, MemoryQueue, TaskQueue};
use codatlas::storage::{IndexPersistence, MemoryProfileStore, ProfileStore};
use codatlas::{IndexData, Settings, WorkspaceIndexer};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "codatlas")]
#[command(version, about = "Semantic code index with ranked drilldown navigation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration file
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Index a workspace: extract, resolve, rank, persist
    Index {
        /// Workspace root to index
        path: PathBuf,
    },

    /// Show the highest-ranked profiles of the persisted index
    Rank {
        /// Number of profiles to show
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// List profiles awaiting enrichment without claiming them
    Pending {
        /// Cap on the number of profiles listed
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load();
    codatlas::logging::init_with_config(&settings.logging);

    match cli.command {
        Commands::Init { force } => {
            let path = Settings::init_config_file(force)?;
            println!("Created configuration at {}", path.display());
        }

        Commands::Index { path } => {
            let settings = Arc::new(settings);
            let indexer = WorkspaceIndexer::new(Arc::clone(&settings));
            let outcome = indexer.index(&path)?;

            let persistence = IndexPersistence::new(index_path(&settings));
            persistence
                .save(&outcome.data)
                .context("failed to persist index")?;

            println!("{}", outcome.stats);
            for failed in &outcome.data.failed_files {
                println!("  skipped: {failed}");
            }
        }

        Commands::Rank { limit } => {
            let data = load_index(&settings)?;

            let mut ranked: Vec<_> = data
                .profiles
                .iter()
                .filter(|p| p.score.is_some())
                .collect();
            ranked.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.id.cmp(&b.id))
            });

            for profile in ranked.iter().take(limit) {
                println!(
                    "{:.6}  {:10}  {}",
                    profile.score.unwrap_or_default(),
                    format!("{:?}", profile.kind).to_lowercase(),
                    profile.qualified_name
                );
            }
        }

        Commands::Pending { limit } => {
            let data = load_index(&settings)?;
            let store = Arc::new(MemoryProfileStore::from_index(&data));
            let queue = Arc::new(MemoryQueue::new(Duration::from_millis(
                settings.enrichment.visibility_timeout_ms,
            )));
            let dispatcher = Dispatcher::new(
                Arc::clone(&store) as Arc<dyn ProfileStore>,
                queue as Arc<dyn TaskQueue>,
            );

            let pending = dispatcher.dry_run(limit);
            for id in &pending {
                if let Some(profile) = store.get(*id) {
                    println!("{}", profile.qualified_name);
                }
            }
            println!("{} profiles awaiting enrichment", pending.len());
        }
    }

    Ok(())
}

fn index_path(settings: &Settings) -> PathBuf {
    match &settings.workspace_root {
        Some(root) => root.join(&settings.index_path),
        None => settings.index_path.clone(),
    }
}

fn load_index(settings: &Settings) -> Result<IndexData> {
    IndexPersistence::new(index_path(settings))
        .load()
        .context("no persisted index; run `codatlas index <path>` first")
}
