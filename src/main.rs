use anyhow::{Context, Result};
use clap::Parser;
use jar_index::cli::{Cli, Commands, OutputFormat};
use jar_index::config::{clear_db, resolve_db_path, resolve_staging_root, scan_limits};
use jar_index::indexer::Indexer;
use jar_index::logging::init_logging;
use jar_index::progress::BarProgress;
use jar_index::search::{SearchShell, view};
use jar_index::store::{ArchiveInfo, IndexStore};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging("warn");

    let db_path = resolve_db_path(&cli)?;
    match cli.command.clone() {
        Commands::Index {
            directory,
            no_recursive,
            max_depth,
            max_entry_mb,
            staging_dir,
            no_progress,
        } => {
            if !directory.is_dir() {
                anyhow::bail!("Directory not found: {}", directory.display());
            }
            let store = open_store(&db_path)?;
            let indexer = Indexer::new(&store)
                .with_limits(scan_limits(max_depth, max_entry_mb))
                .with_staging_root(resolve_staging_root(staging_dir));
            let progress = if no_progress {
                BarProgress::hidden()
            } else {
                BarProgress::new()
            };

            let start = Instant::now();
            let summary = indexer
                .scan_directory_with(&directory, !no_recursive, &progress)
                .with_context(|| format!("Failed to index {}", directory.display()))?;
            println!(
                "Indexing complete. Processed {} JAR/WAR files ({} classes, {} failed) in {} ms.",
                summary.processed,
                summary.classes,
                summary.failed,
                start.elapsed().as_millis()
            );
        }
        Commands::Search => {
            let store = open_store(&db_path)?;
            SearchShell::new(store).run()?;
        }
        Commands::Find { pattern, format } => {
            let store = open_store(&db_path)?;
            let hits = store.find_archives_for_class(&pattern)?;
            write_find_output(&pattern, &hits, format)?;
        }
        Commands::Classes { pattern, limit } => {
            let store = open_store(&db_path)?;
            let names = store.find_class_names(&pattern)?;
            for name in names.iter().take(limit.unwrap_or(usize::MAX)) {
                println!("{name}");
            }
        }
        Commands::Forget { archive } => {
            let store = open_store(&db_path)?;
            let removed = match store.archive_id_for_path(&archive)? {
                Some(id) => store.delete_archive(id)?,
                None => false,
            };
            let output = ForgetResult {
                archive: archive.to_string_lossy().to_string(),
                removed,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Stats => {
            let store = open_store(&db_path)?;
            println!("{}", serde_json::to_string_pretty(&store.stats()?)?);
        }
        Commands::Clear => {
            clear_db(&db_path)?;
        }
    }

    Ok(())
}

fn open_store(db_path: &Path) -> Result<IndexStore> {
    IndexStore::open(db_path)
        .with_context(|| format!("Failed to open index store: {}", db_path.display()))
}

#[derive(Debug, Serialize)]
struct FindResult<'a> {
    pattern: &'a str,
    matches: usize,
    archives: &'a [ArchiveInfo],
}

#[derive(Debug, Serialize)]
struct ForgetResult {
    archive: String,
    removed: bool,
}

fn write_find_output(pattern: &str, hits: &[ArchiveInfo], format: OutputFormat) -> Result<()> {
    let content = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&FindResult {
            pattern,
            matches: hits.len(),
            archives: hits,
        })?,
        OutputFormat::Text => view::render_hits(pattern, hits, false),
    };

    print!("{content}");
    if !content.ends_with('\n') {
        println!();
    }
    Ok(())
}
