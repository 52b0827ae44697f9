use chrono::Utc;
use clap::{Parser, Subcommand};
use rag_prep_core::{
    format_citations, AssemblerOptions, ChunkIndex, ContextAssembler, DocumentPipeline,
    PipelineOptions, RawDocument, SearchBackend, SourceType, UploadItem, VectorServiceStore,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use walkdir::WalkDir;

const UPLOAD_BATCH: usize = 10;

#[derive(Parser)]
#[command(name = "rag-prep", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Vector service base URL
    #[arg(long, env = "RAG_PREP_BASE_URL", default_value = "http://localhost:9002/api")]
    base_url: String,

    /// Vector service database name
    #[arg(long, default_value = "common_dataset")]
    database: String,

    /// Vector service access token
    #[arg(long, env = "RAG_PREP_TOKEN", default_value = "")]
    token: String,
}

#[derive(Subcommand)]
enum Command {
    /// Clean, chunk, and upload a folder of text documents.
    Ingest {
        /// Folder scanned recursively for .txt, .md, and .html files.
        #[arg(long)]
        folder: String,
        /// Keep only sentences dominated by meaningful characters.
        #[arg(long, default_value_t = false)]
        aggressive: bool,
        /// Target chunk size in characters.
        #[arg(long, default_value = "1500")]
        chunk_size: usize,
        /// Overlap carried between adjacent chunks, in characters.
        #[arg(long, default_value = "150")]
        overlap: usize,
        /// Chunks shorter than this are discarded.
        #[arg(long, default_value = "100")]
        min_chunk_size: usize,
        /// Minimum overall quality score for a document or chunk to survive.
        #[arg(long, default_value = "0.5")]
        quality_threshold: f64,
        /// Process and report without uploading anything.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Search the vector service and print an assembled, cited context.
    Ask {
        /// Search query
        #[arg(long)]
        query: String,
        /// Number of candidates to request.
        #[arg(long, default_value = "5")]
        top_k: usize,
        /// Character budget for the assembled context.
        #[arg(long, default_value = "2000")]
        max_context_length: usize,
        /// Minimum similarity score for a hit to be considered.
        #[arg(long, default_value = "0.5")]
        score_threshold: f64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let store = VectorServiceStore::new(&cli.base_url, &cli.database, &cli.token)
        .map_err(|error| anyhow::anyhow!(error.to_string()))?;

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "rag-prep boot"
    );

    match cli.command {
        Command::Ingest {
            folder,
            aggressive,
            chunk_size,
            overlap,
            min_chunk_size,
            quality_threshold,
            dry_run,
        } => {
            let options = PipelineOptions {
                chunk_size_chars: chunk_size,
                chunk_overlap_chars: overlap,
                min_chunk_size,
                quality_threshold,
                aggressive_cleaning: aggressive,
                deduplicate: true,
            };
            let pipeline = DocumentPipeline::new(options)
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            let paths = discover_documents(Path::new(&folder));
            if paths.is_empty() {
                println!("no documents found under {folder}");
                return Ok(());
            }
            info!(folder = %folder, files = paths.len(), "ingesting folder");

            let mut items: Vec<UploadItem> = Vec::new();
            let mut rejected_documents = 0usize;
            let mut dropped_chunks = 0usize;

            for path in paths {
                let document = match document_from_path(&path) {
                    Ok(document) => document,
                    Err(error) => {
                        warn!(path = %path.display(), %error, "skipping unreadable file");
                        continue;
                    }
                };

                let outcome = pipeline.process(&document);
                dropped_chunks += outcome.chunks_dropped;
                if outcome.is_empty() {
                    rejected_documents += 1;
                    continue;
                }
                items.extend(outcome.into_upload_items());
            }

            println!(
                "{} chunks prepared ({} documents rejected, {} chunks dropped)",
                items.len(),
                rejected_documents,
                dropped_chunks
            );

            if dry_run {
                println!("dry run, nothing uploaded");
                return Ok(());
            }

            let mut uploaded = 0usize;
            for batch in items.chunks(UPLOAD_BATCH) {
                let file_ids = store
                    .upload_items(batch)
                    .await
                    .map_err(|error| anyhow::anyhow!(error.to_string()))?;
                uploaded += file_ids.len();
            }

            println!("{uploaded} chunks uploaded at {}", Utc::now().to_rfc3339());
        }
        Command::Ask {
            query,
            top_k,
            max_context_length,
            score_threshold,
        } => {
            let assembler = ContextAssembler::new(AssemblerOptions {
                max_context_length,
                top_k,
                score_threshold,
            })
            .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            let hits = store
                .search(&query, top_k, score_threshold)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            let bundle = assembler.assemble(&hits);
            if bundle.filtered_results.is_empty() {
                println!("no results above the score threshold");
                return Ok(());
            }

            println!("{}", bundle.context_text);
            println!();
            println!("{}", format_citations(&bundle.citations));
        }
    }

    Ok(())
}

/// Recursively collects ingestible files, sorted for a stable upload order.
fn discover_documents(root: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            matches!(
                path.extension().and_then(|ext| ext.to_str()),
                Some("txt" | "md" | "html")
            )
        })
        .collect();
    paths.sort();
    paths
}

fn document_from_path(path: &Path) -> std::io::Result<RawDocument> {
    let raw_text = std::fs::read_to_string(path)?;
    let title = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("untitled")
        .to_string();
    let source_type = match path.extension().and_then(|ext| ext.to_str()) {
        Some("html") => SourceType::Html,
        _ => SourceType::Text,
    };

    Ok(RawDocument {
        source_url: format!("file://{}", path.display()),
        title,
        raw_text,
        source_type: Some(source_type),
    })
}
