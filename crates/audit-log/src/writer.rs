use std::path::Path;

use tokio::io::AsyncWriteExt;

use crate::entry::AuditEntry;

/// Errors that can occur during audit log I/O.
#[derive(Debug, thiserror::Error)]
pub enum AuditWriteError {
    #[error("failed to create parent directories: {0}")]
    CreateDir(std::io::Error),

    #[error("failed to open audit log file: {0}")]
    OpenFile(std::io::Error),

    #[error("failed to serialize audit entry: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write to audit log: {0}")]
    Write(std::io::Error),

    #[error("failed to flush audit log: {0}")]
    Flush(std::io::Error),
}

/// Serialise `entry` as exactly one newline-terminated JSON line.
///
/// Compact `serde_json` output escapes every control character inside
/// strings, so the only raw `\n` in the result is the terminator.
pub fn render_line(entry: &AuditEntry) -> Result<Vec<u8>, AuditWriteError> {
    let mut line = serde_json::to_vec(entry)?;
    debug_assert!(!line.iter().any(|b| *b == b'\n' || *b == b'\r'));
    line.push(b'\n');
    Ok(line)
}

/// Append-only file writer for [`AuditEntry`] JSON lines.
pub struct AuditWriter {
    file: tokio::fs::File,
    entries_written: u64,
}

impl AuditWriter {
    /// Open (or create) the audit log file at `path` in append mode.
    ///
    /// Parent directories are created automatically if they do not exist.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self, AuditWriteError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(AuditWriteError::CreateDir)?;
        }

        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(AuditWriteError::OpenFile)?;

        Ok(Self {
            file,
            entries_written: 0,
        })
    }

    /// Append `entry` as a single line.
    ///
    /// The whole line goes out in one `write_all` so concurrent appenders
    /// on the same file never interleave inside a record.
    pub async fn write(&mut self, entry: &AuditEntry) -> Result<(), AuditWriteError> {
        let line = render_line(entry)?;

        self.file
            .write_all(&line)
            .await
            .map_err(AuditWriteError::Write)?;

        self.entries_written += 1;
        Ok(())
    }

    /// Flush the underlying file, ensuring all buffered data reaches disk.
    pub async fn flush(&mut self) -> Result<(), AuditWriteError> {
        self.file.flush().await.map_err(AuditWriteError::Flush)
    }

    /// Number of entries successfully written since the file was opened.
    pub fn entries_written(&self) -> u64 {
        self.entries_written
    }
}
