//! Marker scanning over per-account record files.
//!
//! Account files under `/var/cpanel/users` are flat `KEY=value` text. Two
//! questions are asked of them: "does this marker occur anywhere?" and "what
//! is the value of the first line starting with this key?". Both are answered
//! by streaming the file, never by loading it whole.

use std::path::Path;

use memchr::memmem;
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, AsyncReadExt, BufReader},
};
use tracing::trace;

use super::{error::CollectorError, types::CollectorResult};

/// Marker whose presence flags an account as suspended.
pub const SUSPENDED_MARKER: &str = "SUSPENDED=1";

/// Line prefix carrying the account's subscription plan.
pub const PLAN_KEY: &str = "PLAN=";

const CHUNK_SIZE: usize = 64 * 1024;

/// Reports whether `marker` occurs in the file at `path`.
///
/// With `invert` set the answer is negated, except for files that cannot be
/// opened or read and empty files: those always yield `false`.
pub async fn matches_marker(path: &Path, marker: &str, invert: bool) -> bool {
    match scan_for_marker(path, marker.as_bytes()).await {
        Ok(Some(found)) => found != invert,
        Ok(None) => {
            trace!("{} is empty, treating as no match", path.display());
            false
        }
        Err(e) => {
            trace!("{}, treating as no match", e);
            false
        }
    }
}

/// Returns the trimmed remainder of the first line of `path` that starts with
/// `key`, or `None` if no line does or the file cannot be read.
pub async fn extract_field(path: &Path, key: &str) -> Option<String> {
    match find_field(path, key.as_bytes()).await {
        Ok(value) => value,
        Err(e) => {
            trace!("{}, treating as not found", e);
            None
        }
    }
}

/// `Ok(None)` means the file was empty.
async fn scan_for_marker(path: &Path, marker: &[u8]) -> CollectorResult<Option<bool>> {
    let mut file = File::open(path)
        .await
        .map_err(|source| CollectorError::file(path, source))?;

    // Fixed-size chunks; a large record is never held whole. The last
    // `marker.len() - 1` bytes of each chunk move to the front of the buffer
    // so a marker split across two reads is still seen.
    let keep = marker.len().saturating_sub(1);
    let mut buf = vec![0u8; CHUNK_SIZE + keep];
    let mut filled = 0usize;
    let mut total = 0u64;

    loop {
        let n = file
            .read(&mut buf[filled..])
            .await
            .map_err(|source| CollectorError::file(path, source))?;
        if n == 0 {
            break;
        }
        total += n as u64;
        filled += n;

        if memmem::find(&buf[..filled], marker).is_some() {
            return Ok(Some(true));
        }
        if filled > keep {
            buf.copy_within(filled - keep..filled, 0);
            filled = keep;
        }
    }

    Ok((total > 0).then_some(false))
}

/// Account files look like:
///
/// ```text
/// DNS=alice.example
/// PLAN=silver
/// SUSPENDED=1
/// ```
///
/// Lines are read one at a time. Only a line that begins with `key` counts, so
/// `OLDPLAN=` or a commented `#PLAN=` never answers for `PLAN=`.
async fn find_field(path: &Path, key: &[u8]) -> CollectorResult<Option<String>> {
    let file = File::open(path)
        .await
        .map_err(|source| CollectorError::file(path, source))?;
    let mut reader = BufReader::new(file);
    let mut line = Vec::new();

    loop {
        line.clear();
        let n = reader
            .read_until(b'\n', &mut line)
            .await
            .map_err(|source| CollectorError::file(path, source))?;
        if n == 0 {
            return Ok(None);
        }
        // Values may carry a `\r\n` ending or stray spaces; both are trimmed,
        // and invalid UTF-8 is replaced rather than rejected.
        if let Some(rest) = line.strip_prefix(key) {
            return Ok(Some(String::from_utf8_lossy(rest).trim().to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn finds_marker_anywhere_in_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bob");
        fs::write(&path, "DNS=bob.example\nSUSPENDED=1\nPLAN=gold\n").unwrap();

        assert!(matches_marker(&path, SUSPENDED_MARKER, false).await);
        assert!(!matches_marker(&path, SUSPENDED_MARKER, true).await);
    }

    #[tokio::test]
    async fn absent_marker_respects_invert() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alice");
        fs::write(&path, "DNS=alice.example\nSUSPENDED=0\n").unwrap();

        assert!(!matches_marker(&path, SUSPENDED_MARKER, false).await);
        assert!(matches_marker(&path, SUSPENDED_MARKER, true).await);
    }

    #[tokio::test]
    async fn unreadable_file_is_false_even_when_inverted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing");

        assert!(!matches_marker(&path, SUSPENDED_MARKER, false).await);
        assert!(!matches_marker(&path, SUSPENDED_MARKER, true).await);
    }

    #[tokio::test]
    async fn empty_file_is_false_even_when_inverted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty");
        fs::write(&path, "").unwrap();

        assert!(!matches_marker(&path, SUSPENDED_MARKER, false).await);
        assert!(!matches_marker(&path, SUSPENDED_MARKER, true).await);
    }

    #[tokio::test]
    async fn marker_split_across_chunk_boundary_is_found() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("large");
        let mut content = vec![b'x'; CHUNK_SIZE - 4];
        content.extend_from_slice(b"SUSPENDED=1\n");
        content.extend(vec![b'y'; CHUNK_SIZE]);
        fs::write(&path, content).unwrap();

        assert!(matches_marker(&path, SUSPENDED_MARKER, false).await);
    }

    #[tokio::test]
    async fn marker_past_first_chunk_is_found() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("large");
        let mut content = vec![b'x'; CHUNK_SIZE * 3 + 17];
        content.extend_from_slice(b"\nSUSPENDED=1");
        fs::write(&path, content).unwrap();

        assert!(matches_marker(&path, SUSPENDED_MARKER, false).await);
        assert!(!matches_marker(&path, "SUSPENDED=2", false).await);
    }

    #[tokio::test]
    async fn overlapping_partial_markers_are_handled() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("odd");
        fs::write(&path, "SUSPENDED=SUSPENDED=0SUSPENDED=1").unwrap();

        assert!(matches_marker(&path, SUSPENDED_MARKER, false).await);
        assert!(!matches_marker(&path, "SUSPENDED=2", false).await);
    }

    #[tokio::test]
    async fn extracts_plan_from_later_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alice");
        fs::write(&path, "DNS=alice.example\nPLAN=gold\nOWNER=root\n").unwrap();

        assert_eq!(extract_field(&path, PLAN_KEY).await.as_deref(), Some("gold"));
    }

    #[tokio::test]
    async fn match_at_offset_zero_is_found() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alice");
        fs::write(&path, "PLAN=silver\nDNS=alice.example\n").unwrap();

        assert_eq!(
            extract_field(&path, PLAN_KEY).await.as_deref(),
            Some("silver")
        );
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alice");
        fs::write(&path, "DNS=alice.example\nSUSPENDED=0\n").unwrap();

        assert_eq!(extract_field(&path, PLAN_KEY).await, None);
    }

    #[tokio::test]
    async fn key_must_start_the_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alice");
        fs::write(&path, "OLDPLAN=bronze\n#PLAN=gold\n").unwrap();

        assert_eq!(extract_field(&path, PLAN_KEY).await, None);
    }

    #[tokio::test]
    async fn first_matching_line_wins_and_is_trimmed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alice");
        fs::write(&path, "PLAN= Reseller Basic \r\nPLAN=gold\n").unwrap();

        assert_eq!(
            extract_field(&path, PLAN_KEY).await.as_deref(),
            Some("Reseller Basic")
        );
    }

    #[tokio::test]
    async fn last_line_without_newline_is_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alice");
        fs::write(&path, "DNS=alice.example\nPLAN=default").unwrap();

        assert_eq!(
            extract_field(&path, PLAN_KEY).await.as_deref(),
            Some("default")
        );
    }

    #[tokio::test]
    async fn unreadable_file_is_not_found() {
        let dir = tempdir().unwrap();
        assert_eq!(extract_field(&dir.path().join("nope"), PLAN_KEY).await, None);
    }
}
