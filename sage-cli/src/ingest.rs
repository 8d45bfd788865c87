use std::path::{Path, PathBuf};

use anyhow::bail;
use sage_rag::RagPipeline;
use tracing::{error, info};

/// Expand `paths` into the files to ingest.
///
/// Directories are walked recursively and hidden entries are skipped. Files
/// named explicitly are kept even when hidden. The result is sorted and free
/// of duplicates.
pub fn collect_files(paths: &[PathBuf]) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            walk(path, &mut files)?;
        } else {
            files.push(path.clone());
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let hidden = path.file_name().and_then(|n| n.to_str()).is_some_and(|n| n.starts_with('.'));
        if hidden {
            continue;
        }
        if path.is_dir() {
            walk(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}

/// Ingest every file under `paths` into `collection`.
///
/// A failing file is reported and skipped; the command fails at the end if
/// any file failed.
pub async fn run(
    pipeline: &RagPipeline,
    collection: &str,
    paths: &[PathBuf],
    recreate: bool,
) -> anyhow::Result<()> {
    let files = collect_files(paths)?;
    if files.is_empty() {
        bail!("nothing to ingest");
    }

    if recreate {
        println!("Recreating collection '{collection}'...");
        pipeline.recreate_collection(collection).await?;
    }

    let mut failed = 0usize;
    let mut total_chunks = 0usize;
    for file in &files {
        println!("Processing {}...", file.display());
        match pipeline.ingest_path(collection, file).await {
            Ok(report) => {
                info!(path = %file.display(), documents = report.documents, chunks = report.chunks, "ingested file");
                println!("  {} document(s), {} chunk(s)", report.documents, report.chunks);
                if report.skipped_pages > 0 {
                    println!("  {} page(s) skipped: no extractable text", report.skipped_pages);
                }
                total_chunks += report.chunks;
            }
            Err(e) => {
                error!(path = %file.display(), error = %e, "ingestion failed");
                println!("  failed: {e}");
                failed += 1;
            }
        }
    }

    println!(
        "Stored {total_chunks} chunk(s) from {} file(s) in '{collection}'.",
        files.len() - failed
    );
    if failed > 0 {
        bail!("{failed} of {} file(s) failed to ingest", files.len());
    }
    Ok(())
}
