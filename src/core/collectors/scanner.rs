use std::path::Path;

use tracing::{trace, warn};

use super::{error::CollectorError, types::CollectorResult};

/// Lists the names of regular files directly inside `dir`.
///
/// Symlinks are followed, so a link to a regular file counts as a file.
/// Subdirectories, sockets, dangling links and names that are not valid UTF-8
/// are left out. Names come back sorted.
///
/// # Errors
///
/// `CollectorError::DirectoryAccess` when `dir` is missing or cannot be listed.
/// Entries that vanish mid-scan are skipped rather than reported.
pub async fn list_regular_files(dir: &Path) -> CollectorResult<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|source| CollectorError::directory(dir, source))?;

    let mut names = Vec::new();
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(source) => return Err(CollectorError::directory(dir, source)),
        };

        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                trace!("Skipping non UTF-8 entry {:?} in {}", raw, dir.display());
                continue;
            }
        };

        match tokio::fs::metadata(entry.path()).await {
            Ok(meta) if meta.is_file() => names.push(name),
            Ok(_) => {}
            Err(e) => trace!("Skipping {}: {}", entry.path().display(), e),
        }
    }

    names.sort();
    Ok(names)
}

/// Like [`list_regular_files`], but a missing or unreadable directory counts
/// as empty. One absent directory must not abort the rest of a poll.
pub async fn list_regular_files_or_empty(dir: &Path) -> Vec<String> {
    list_regular_files(dir).await.unwrap_or_else(|e| {
        warn!("{}: {}, counting zero entries", e, error_source(&e));
        Vec::new()
    })
}

fn error_source(e: &CollectorError) -> String {
    std::error::Error::source(e)
        .map(|s| s.to_string())
        .unwrap_or_default()
}
