use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::Rng;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use reelsmith::core::config::EngineConfig;
use reelsmith::core::types::{ContentItem, FeedbackEvent};
use reelsmith::dispatch::{ContentRegistry, FeedbackDispatcher};
use reelsmith::refine::SceneDescriptor;
use reelsmith::store::Store;

#[derive(Parser)]
#[command(name = "reelsmith", version, about = "Adaptive media-generation core")]
struct Cli {
    /// Path to the configuration file; created with defaults when missing
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Drive synthetic feedback through the dispatcher and report what the
    /// agent learned
    Simulate {
        /// Number of content items to register
        #[arg(long, default_value_t = 3)]
        items: usize,
        /// Number of feedback events to dispatch
        #[arg(long, default_value_t = 200)]
        events: usize,
    },
    /// Dump the persisted Q-table from a database
    ShowQ {
        /// Path to the SQLite database
        #[arg(long)]
        db: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    reelsmith::init().context("Failed to initialize reelsmith")?;

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::load_or_create(path)?,
        None => EngineConfig::default(),
    };

    info!("Starting reelsmith v{}", reelsmith::version());

    match cli.command {
        Command::Simulate { items, events } => simulate(&config, items, events).await,
        Command::ShowQ { db } => show_q(&db),
    }
}

/// Register a handful of items and replay a stream of synthetic ratings
/// through the dispatcher, then report artifact evolution and learned
/// values.
async fn simulate(config: &EngineConfig, items: usize, events: usize) -> Result<()> {
    let registry = Arc::new(ContentRegistry::new());
    let store = match &config.persistence.db_path {
        Some(path) => Some(Arc::new(Store::open(path)?)),
        None => None,
    };
    let dispatcher = FeedbackDispatcher::new(config, registry.clone(), store)?;

    let mut rng = rand::rng();
    let mut ids = Vec::with_capacity(items);
    for i in 0..items {
        let item = ContentItem::new(
            rng.random_range(0.0..=1.0),
            vec![format!("upload-{}", i)],
        )?;
        let id = item.id;
        dispatcher.register_content(
            item,
            vec![
                SceneDescriptor::new(format!("clip-{}-intro", i), 4.0),
                SceneDescriptor::new(format!("clip-{}-body", i), 12.0),
                SceneDescriptor::new(format!("clip-{}-outro", i), 3.0),
            ],
        )?;
        ids.push(id);
    }
    info!(items, "registered content");

    for _ in 0..events {
        let id = ids[rng.random_range(0..ids.len())];

        // Synthetic audience: richer tag sets draw better ratings and
        // longer watch times
        let tag_count = registry.get(id).map(|item| item.tags.len()).unwrap_or(0);
        let rating = (2 + tag_count.min(3) as u8).min(config.reward.rating_max);
        let artifact = dispatcher.get_artifact(id, None)?;
        let watched = artifact.total_duration_secs * rng.random_range(0.3..=1.0);

        dispatcher
            .handle_feedback(FeedbackEvent::new(id, rating).with_engagement(watched))
            .await?;
    }

    println!("Dispatched {} feedback events across {} items", events, items);
    println!();
    println!("Artifacts:");
    for id in &ids {
        let artifact = dispatcher.get_artifact(*id, None)?;
        let item = registry.get(*id).context("item disappeared")?;
        println!(
            "  {}  version {:>3}  total {:>7.2}s  tags {:?}",
            id, artifact.version, artifact.total_duration_secs, item.tags
        );
    }

    println!();
    println!(
        "Learned values ({} cells, epsilon now {:.3}):",
        dispatcher.agent().snapshot().len(),
        dispatcher.agent().epsilon()
    );
    let mut cells = dispatcher.agent().snapshot();
    cells.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));
    for (state, action, value) in cells {
        println!("  {}  {:<12}  {:+.4}", state, action.as_str(), value);
    }

    Ok(())
}

/// Print every persisted Q-table cell, best first.
fn show_q(db: &PathBuf) -> Result<()> {
    let store = Store::open(db)
        .with_context(|| format!("Failed to open store at {}", db.display()))?;

    let mut cells = store.load_q_values()?;
    if cells.is_empty() {
        println!("No learned values in {}", db.display());
        return Ok(());
    }

    cells.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));
    println!("{:<8} {:<12} {}", "state", "action", "value");
    for (state, action, value) in cells {
        println!("{:<8} {:<12} {:+.4}", state.to_string(), action.as_str(), value);
    }

    Ok(())
}
