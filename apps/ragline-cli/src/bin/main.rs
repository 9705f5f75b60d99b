use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use walkdir::WalkDir;

use ragline_core::config::Config;
use ragline_core::types::{Meta, ResponseMode, SourceKind};
use ragline_pipeline::{build_engine, IngestRequest, IngestionSummary, RagEngine};

/// Multimodal retrieval-augmented question answering over local files
#[derive(Parser)]
#[command(name = "ragline")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path (defaults to config.toml + APP_* env vars)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest files or directories
    Ingest {
        /// Files or directories to walk
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Treat every file as this kind instead of guessing from the extension
        #[arg(long)]
        kind: Option<String>,

        /// Print one JSON summary per source
        #[arg(long)]
        json: bool,
    },
    /// Ask a question against the corpus
    Query {
        text: String,

        /// retrieval-only or retrieval-and-generation
        #[arg(short, long)]
        mode: Option<ResponseMode>,

        /// Number of results
        #[arg(short)]
        k: Option<usize>,
    },
    /// Remove every stored unit
    Reset,
    /// List stored units
    List,
}

fn parse_kind(label: &str) -> anyhow::Result<SourceKind> {
    match label.trim().to_ascii_lowercase().as_str() {
        "text" => Ok(SourceKind::Text),
        "table" => Ok(SourceKind::Table),
        "image" => Ok(SourceKind::Image),
        "pdf" => Ok(SourceKind::Pdf),
        "audio" => Ok(SourceKind::Audio),
        "video" => Ok(SourceKind::Video),
        other => anyhow::bail!("unknown kind '{other}'"),
    }
}

/// Every file under `paths` with a kind, either forced or from its extension.
fn collect_sources(paths: &[PathBuf], forced: Option<SourceKind>) -> Vec<(PathBuf, SourceKind)> {
    let mut out = Vec::new();
    for root in paths {
        for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let kind = forced.or_else(|| path.extension().and_then(|e| e.to_str()).and_then(SourceKind::from_extension));
            match kind {
                Some(kind) => out.push((path.to_path_buf(), kind)),
                None => warn!(path = %path.display(), "skipping file of unknown kind"),
            }
        }
    }
    out
}

async fn ingest(engine: &RagEngine, paths: &[PathBuf], kind: Option<String>, json: bool) -> anyhow::Result<()> {
    let forced = kind.as_deref().map(parse_kind).transpose()?;
    let sources = collect_sources(paths, forced);
    if sources.is_empty() {
        println!("No ingestible files found");
        return Ok(());
    }
    let pb = ProgressBar::new(sources.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")?
            .progress_chars("#>-"),
    );
    let mut summaries: Vec<IngestionSummary> = Vec::with_capacity(sources.len());
    for (path, kind) in sources {
        pb.set_message(file_label(&path));
        let request = match tokio::fs::read(&path).await {
            Ok(bytes) => IngestRequest::bytes(bytes, kind, path.display().to_string())
                .with_metadata(Meta::from([("path".to_string(), path.display().to_string())])),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable file");
                pb.inc(1);
                continue;
            }
        };
        summaries.push(engine.ingest(request).await);
        pb.inc(1);
    }
    pb.finish_with_message("done");

    let stored: usize = summaries.iter().map(|s| s.stored_ids.len()).sum();
    for s in &summaries {
        if json {
            println!("{}", serde_json::to_string(s)?);
        } else {
            println!("{} [{}]: {}", s.source_ref, s.declared_kind, s.message);
        }
    }
    info!(files = summaries.len(), stored, "ingest complete");
    println!("Ingested {} file(s), {} unit(s) stored", summaries.len(), stored);
    Ok(())
}

fn file_label(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load().map_err(|e| {
            eprintln!("Error loading config: {}", e);
            e
        })?,
    };
    let settings = config.settings()?;
    let engine = build_engine(&settings).await?;

    match cli.command {
        Commands::Ingest { paths, kind, json } => ingest(&engine, &paths, kind, json).await?,
        Commands::Query { text, mode, k } => {
            let mode = mode.unwrap_or(settings.retrieval.mode);
            let outcome = engine.query(&text, mode, k).await?;
            for (i, item) in outcome.items.iter().enumerate() {
                eprintln!(
                    "{}. {} [{}] distance={:.4} source={}",
                    i + 1,
                    item.unit.id,
                    item.unit.kind,
                    item.distance,
                    item.unit.source_ref
                );
            }
            println!("{}", outcome.answer);
        }
        Commands::Reset => {
            engine.reset().await?;
            println!("Corpus cleared");
        }
        Commands::List => {
            let entries = engine.entries().await?;
            for e in &entries {
                println!("{}\t{}\t{}\t{}", e.doc_id, e.kind, e.source_ref, e.summary.replace('\n', " "));
            }
            println!("{} unit(s)", entries.len());
        }
    }
    Ok(())
}
