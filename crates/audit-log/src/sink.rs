use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

use crate::entry::AuditEntry;
use crate::writer::{AuditWriteError, AuditWriter};

/// Channel buffer size used between producers and the background writer task.
const CHANNEL_BUFFER: usize = 1024;

/// Flush the writer at most every this many seconds when the channel is idle.
const FLUSH_INTERVAL_SECS: u64 = 1;

/// A cheap, cloneable handle used to submit [`AuditEntry`] values into the
/// background audit-log writer.
///
/// `AuditSink` is `Clone + Send + Sync` so it can be shared freely across
/// threads, request handlers, and components. Submitting never fails from
/// the caller's point of view: when the writer is gone or saturated the
/// entry is dropped and a single warning is emitted for the whole sink.
#[derive(Clone)]
pub struct AuditSink {
    tx: mpsc::Sender<AuditEntry>,
    degraded: Arc<AtomicBool>,
}

impl AuditSink {
    /// Spawn the background writer task and return a `(sink, join_handle)` pair.
    ///
    /// The writer opens (or creates) the file at `path` in append mode and
    /// begins draining entries from the internal channel. The background task
    /// will:
    ///
    /// * Write each entry as a JSON line via [`AuditWriter`].
    /// * Flush periodically (every ~1 second of channel inactivity).
    /// * Flush once more when the last `AuditSink` clone is dropped and the
    ///   channel closes, then exit cleanly.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn start(
        path: impl AsRef<Path>,
    ) -> Result<(Self, JoinHandle<()>), AuditWriteError> {
        let (tx, rx) = mpsc::channel::<AuditEntry>(CHANNEL_BUFFER);

        let mut writer = AuditWriter::new(path).await?;
        let sink = Self::from_sender(tx);
        let degraded = Arc::clone(&sink.degraded);

        let handle = tokio::spawn(async move {
            run_writer_loop(&mut writer, rx, degraded).await;
        });

        Ok((sink, handle))
    }

    /// Wrap an existing channel sender. Useful for hosts that drain entries
    /// themselves (and for tests).
    pub fn from_sender(tx: mpsc::Sender<AuditEntry>) -> Self {
        Self {
            tx,
            degraded: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Send an audit entry, waiting asynchronously while the channel is full.
    ///
    /// If the background task has already exited the entry is dropped.
    pub async fn log(&self, entry: AuditEntry) {
        if let Err(err) = self.tx.send(entry).await {
            self.degrade(err.0.event_type, "audit sink channel closed, entry dropped");
        }
    }

    /// Submit an entry from synchronous code without blocking.
    ///
    /// Safe to call from any thread, inside or outside a runtime.
    pub fn record(&self, entry: AuditEntry) {
        match self.tx.try_send(entry) {
            Ok(()) => {}
            Err(TrySendError::Full(entry)) => {
                self.degrade(entry.event_type, "audit sink channel full, entry dropped");
            }
            Err(TrySendError::Closed(entry)) => {
                self.degrade(entry.event_type, "audit sink channel closed, entry dropped");
            }
        }
    }

    /// `true` once at least one entry has been dropped or failed to reach
    /// the audit file.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    fn degrade(&self, event_type: crate::entry::AuditEventType, message: &str) {
        if !self.degraded.swap(true, Ordering::Relaxed) {
            tracing::warn!(?event_type, "{message}; further drops will not be reported");
        }
    }
}

/// Report a writer-side failure on the shared flag; only the first one is
/// logged.
fn degrade_on_io(degraded: &AtomicBool, err: &AuditWriteError, message: &str) {
    if !degraded.swap(true, Ordering::Relaxed) {
        tracing::warn!(%err, "{message}; further failures will not be reported");
    }
}

/// Core loop executed inside the background task.
///
/// Reads entries from the channel and writes them to the audit log. When the
/// channel has no entries ready for [`FLUSH_INTERVAL_SECS`] the writer is
/// flushed. On channel close a final flush is performed. I/O failures mark
/// the sink degraded instead of being logged one by one.
async fn run_writer_loop(
    writer: &mut AuditWriter,
    mut rx: mpsc::Receiver<AuditEntry>,
    degraded: Arc<AtomicBool>,
) {
    let flush_interval = tokio::time::Duration::from_secs(FLUSH_INTERVAL_SECS);
    let mut dirty = false;

    loop {
        let maybe_entry = tokio::time::timeout(flush_interval, rx.recv()).await;

        match maybe_entry {
            Ok(Some(entry)) => {
                if let Err(err) = writer.write(&entry).await {
                    degrade_on_io(&degraded, &err, "failed to write audit entry");
                } else {
                    dirty = true;
                }
            }
            // Channel closed: final flush and exit.
            Ok(None) => {
                if dirty {
                    if let Err(err) = writer.flush().await {
                        degrade_on_io(&degraded, &err, "failed to flush audit log on shutdown");
                    }
                }
                tracing::debug!(
                    entries = writer.entries_written(),
                    "audit writer background task shutting down"
                );
                return;
            }
            Err(_) => {
                if dirty {
                    if let Err(err) = writer.flush().await {
                        degrade_on_io(&degraded, &err, "periodic audit log flush failed");
                    } else {
                        dirty = false;
                    }
                }
            }
        }
    }
}
