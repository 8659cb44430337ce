use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use folio_editor::{CanonicalStore, SyncCoordinator};
use folio_lineage::{DocumentId, LineageStore};
use folio_linter::{QualityOrchestrator, RemoteStatus, RuleRegistry};
use folio_workspace::{init_tracing, DocumentSession, FolioConfig};

/// Folio - Markdown documents with branching history
#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Save a file's content as the next version of a document
    Snapshot {
        /// Document identity
        document: String,

        /// Markdown file to record
        file: PathBuf,

        /// Annotation for the new version
        #[arg(short, long)]
        summary: Option<String>,
    },

    /// Print a document's history graph
    History {
        /// Document identity
        document: String,

        /// Emit the layout as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the quality checks on a Markdown file
    Lint {
        /// Markdown file to check
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = FolioConfig::from_env();

    match cli.command {
        Command::Snapshot {
            document,
            file,
            summary,
        } => snapshot(&config, DocumentId::new(document), &file, summary),
        Command::History { document, json } => history(&config, DocumentId::new(document), json),
        Command::Lint { file } => lint(&config, &file).await,
    }
}

fn session(config: &FolioConfig) -> Result<DocumentSession> {
    let storage = config
        .storage()
        .with_context(|| format!("opening data directory {}", config.data_dir.display()))?;
    let store = LineageStore::new(Arc::new(storage));

    let (sync, _text, _rich) =
        SyncCoordinator::with_memory_surfaces(config.sync_config(), CanonicalStore::default());
    let quality = QualityOrchestrator::new(
        config.quality_config(),
        Arc::new(config.lint_client()?),
        RuleRegistry::new(),
    );

    Ok(DocumentSession::new(store, sync, quality))
}

fn snapshot(
    config: &FolioConfig,
    document: DocumentId,
    file: &Path,
    summary: Option<String>,
) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;

    let mut session = session(config)?;
    session.open(document.clone())?;
    session.sync_mut().load_working_content(&content);

    if session.head().is_some() && !session.has_unsaved_changes() {
        println!("{} is unchanged since the latest version", document);
        return Ok(());
    }

    let event = session.save(summary)?;
    if session.store().is_dirty() {
        anyhow::bail!("v{} recorded but could not be written to storage", event.version);
    }

    println!("Saved {} as {}", document, event.label());
    Ok(())
}

fn history(config: &FolioConfig, document: DocumentId, json: bool) -> Result<()> {
    let mut session = session(config)?;
    session.open(document.clone())?;

    let Some(layout) = session.graph_layout() else {
        anyhow::bail!("history of {} is not loaded", document);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&layout)?);
        return Ok(());
    }

    if layout.nodes.is_empty() {
        println!("{} has no history", document);
        return Ok(());
    }

    for node in &layout.nodes {
        let lanes: String = (0..=layout.max_column)
            .map(|column| if column == node.column { "● " } else { "│ " })
            .collect();
        println!(
            "{} {}  {}",
            lanes,
            node.event.label(),
            node.event.timestamp.format("%Y-%m-%d %H:%M")
        );
    }

    Ok(())
}

async fn lint(config: &FolioConfig, file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;

    let mut quality = QualityOrchestrator::new(
        config.quality_config(),
        Arc::new(config.lint_client()?),
        RuleRegistry::new(),
    );
    let report = quality.check_now(&text).await;

    for issue in &report.issues {
        println!(
            "{}:{}:{}: {:?} [{}] {}",
            file.display(),
            issue.line,
            issue.column,
            issue.severity,
            issue.rule_id,
            issue.message
        );
    }

    match &report.remote {
        RemoteStatus::Ok { processing_time_ms } => {
            println!("{} issues (lint service took {}ms)", report.len(), processing_time_ms)
        }
        RemoteStatus::Skipped(reason) | RemoteStatus::Failed(reason) => {
            println!("{} issues (local checks only: {})", report.len(), reason)
        }
        RemoteStatus::NotChecked => println!("{} issues", report.len()),
    }

    Ok(())
}
