//! Line-oriented append helpers shared by the file-backed stores
//!
//! A record is durable once its terminating newline is on disk. Anything
//! after the last newline is the remainder of an interrupted write and is
//! cut off before the next append.

use crate::error::StoreError;
use std::io::SeekFrom;
use std::path::Path;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

/// Create the file and its parent directories, dropping any unterminated
/// tail
pub(super) async fn prepare(path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StoreError::io_error(parent, e))?;
    }
    let mut file = open_rw(path).await?;
    truncate_partial_tail(path, &mut file).await?;
    Ok(())
}

/// Append `bytes` at the end of the last complete line
///
/// `header` is written first when the file holds no complete line. On a
/// failed write the file is cut back to its previous length.
pub(super) async fn append(
    path: &Path,
    header: Option<&[u8]>,
    bytes: &[u8],
) -> Result<(), StoreError> {
    let mut file = open_rw(path).await?;
    let start = truncate_partial_tail(path, &mut file).await?;
    file.seek(SeekFrom::Start(start))
        .await
        .map_err(|e| StoreError::io_error(path, e))?;

    let mut payload = Vec::with_capacity(bytes.len() + header.map_or(0, <[u8]>::len));
    if start == 0 {
        if let Some(header) = header {
            payload.extend_from_slice(header);
        }
    }
    payload.extend_from_slice(bytes);

    if let Err(e) = write_synced(&mut file, &payload).await {
        if let Err(rollback) = file.set_len(start).await {
            tracing::error!(path = %path.display(), error = %rollback, "failed to roll back partial append");
        }
        return Err(StoreError::io_error(path, e));
    }
    Ok(())
}

/// Part of `text` up to and including its last newline
pub(super) fn complete_lines<'a>(path: &Path, text: &'a str) -> &'a str {
    let end = text.rfind('\n').map_or(0, |i| i + 1);
    if !text[end..].trim().is_empty() {
        tracing::warn!(path = %path.display(), bytes = text.len() - end, "ignoring unterminated record fragment");
    }
    &text[..end]
}

async fn open_rw(path: &Path) -> Result<File, StoreError> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .await
        .map_err(|e| StoreError::io_error(path, e))
}

async fn write_synced(file: &mut File, payload: &[u8]) -> std::io::Result<()> {
    file.write_all(payload).await?;
    // tokio reports a failed background write on flush, not on sync
    file.flush().await?;
    file.sync_data().await
}

/// Cut the file back to its last newline; returns the resulting length
async fn truncate_partial_tail(path: &Path, file: &mut File) -> Result<u64, StoreError> {
    let io = |e| StoreError::io_error(path, e);
    let len = file.metadata().await.map_err(io)?.len();
    if len == 0 {
        return Ok(0);
    }

    file.seek(SeekFrom::Start(len - 1)).await.map_err(io)?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).await.map_err(io)?;
    if last[0] == b'\n' {
        return Ok(len);
    }

    file.seek(SeekFrom::Start(0)).await.map_err(io)?;
    let mut contents = Vec::with_capacity(usize::try_from(len).unwrap_or_default());
    file.read_to_end(&mut contents).await.map_err(io)?;
    let keep = contents
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |i| i as u64 + 1);
    file.set_len(keep).await.map_err(io)?;
    file.sync_data().await.map_err(io)?;
    tracing::warn!(
        path = %path.display(),
        dropped = len - keep,
        "dropped unterminated record fragment"
    );
    Ok(keep)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn prepare_drops_fragment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.txt");
        std::fs::write(&path, "one\ntw").unwrap();

        prepare(&path).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "one\n");
    }

    #[tokio::test]
    async fn append_replaces_fragment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.txt");
        std::fs::write(&path, "one\n{\"half").unwrap();

        append(&path, None, b"two\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "one\ntwo\n");
    }

    #[tokio::test]
    async fn header_only_on_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.csv");

        append(&path, Some(b"h\n"), b"a\n").await.unwrap();
        append(&path, Some(b"h\n"), b"b\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "h\na\nb\n");
    }

    #[tokio::test]
    async fn lone_fragment_is_dropped_before_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.csv");
        std::fs::write(&path, "protocol_i").unwrap();

        append(&path, Some(b"h\n"), b"a\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "h\na\n");
    }

    #[test]
    fn complete_lines_stop_at_last_newline() {
        let path = Path::new("r.txt");
        assert_eq!(complete_lines(path, "a\nb\nc"), "a\nb\n");
        assert_eq!(complete_lines(path, "a\n"), "a\n");
        assert_eq!(complete_lines(path, "partial"), "");
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn failed_write_is_io_error() {
        let err = append(Path::new("/dev/full"), None, b"x\n").await.unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }
}
