//! Outbound sinks for decoded packets.
//!
//! Command sinks receive the stripped command text of valid COMMAND packets. Error
//! sinks receive ERROR packets. Both are external collaborators: the dispatcher only
//! hands them data and records whether the hand-off worked.
//!
//! Sinks are called from inside the dispatch cycle and must never block. Slow I/O
//! belongs on a task of its own, fed through a channel.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::types::DecodedPacket;
use crate::{BridgeError, Result};

/// Default command stream consumed by the printer host.
pub const DEFAULT_COMMAND_PATH: &str = "/tmp/printer";

/// Commands queued for the command stream writer before the sink reports back-pressure.
pub const DEFAULT_WRITER_CAPACITY: usize = 64;

/// Receives command strings for the machine controller.
pub trait CommandSink: Send {
    fn send(&mut self, command: &str) -> Result<()>;
}

/// Receives ERROR packets reported by the controller.
pub trait ErrorSink: Send {
    fn report(&mut self, packet: &DecodedPacket) -> Result<()>;
}

#[derive(Debug, Default)]
struct WriterStats {
    written: AtomicU64,
    failed: AtomicU64,
}

/// Appends each command as one line to a file or named pipe.
///
/// `send` only queues the command. A writer task reopens the path for every command
/// and appends `command\n`. Named pipes are opened without waiting for a reader: with
/// nobody reading, the command is dropped and counted in [`write_failures`].
///
/// [`write_failures`]: FileCommandSink::write_failures
#[derive(Debug, Clone)]
pub struct FileCommandSink {
    path: PathBuf,
    tx: mpsc::Sender<String>,
    stats: Arc<WriterStats>,
}

impl FileCommandSink {
    /// Spawn the writer task for `path`.
    ///
    /// The returned handle finishes once every clone of the sink is dropped and the
    /// queue is drained. Must be called from within a tokio runtime.
    pub fn spawn(path: impl Into<PathBuf>, capacity: usize) -> (Self, JoinHandle<()>) {
        let path = path.into();
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let stats = Arc::new(WriterStats::default());

        let writer = tokio::spawn(write_commands(path.clone(), rx, Arc::clone(&stats)));
        (Self { path, tx, stats }, writer)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Commands appended so far.
    pub fn written(&self) -> u64 {
        self.stats.written.load(Ordering::Relaxed)
    }

    /// Commands the writer had to drop.
    pub fn write_failures(&self) -> u64 {
        self.stats.failed.load(Ordering::Relaxed)
    }
}

impl CommandSink for FileCommandSink {
    fn send(&mut self, command: &str) -> Result<()> {
        self.tx.try_send(command.to_string()).map_err(|e| {
            let reason = match e {
                mpsc::error::TrySendError::Full(_) => {
                    format!("writer for {} is behind", self.path.display())
                }
                mpsc::error::TrySendError::Closed(_) => {
                    format!("writer for {} has stopped", self.path.display())
                }
            };
            BridgeError::sink_failed(reason, None)
        })
    }
}

async fn write_commands(path: PathBuf, mut rx: mpsc::Receiver<String>, stats: Arc<WriterStats>) {
    while let Some(command) = rx.recv().await {
        match append_line(&path, &command).await {
            Ok(()) => {
                stats.written.fetch_add(1, Ordering::Relaxed);
                trace!(path = %path.display(), command, "Command appended");
            }
            Err(error) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                warn!(path = %path.display(), command, %error, "Dropped command");
            }
        }
    }
    debug!(path = %path.display(), "Command writer stopped");
}

async fn append_line(path: &Path, command: &str) -> Result<()> {
    let line = format!("{}\n", command);

    #[cfg(unix)]
    if is_fifo(path).await {
        // Fails with ENXIO instead of waiting when no reader has the pipe open.
        let mut pipe = tokio::net::unix::pipe::OpenOptions::new()
            .open_sender(path)
            .map_err(|e| BridgeError::file_error(path.to_path_buf(), e))?;
        return pipe.write_all(line.as_bytes()).await.map_err(|e| write_failed(path, e));
    }

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| BridgeError::file_error(path.to_path_buf(), e))?;
    file.write_all(line.as_bytes()).await.map_err(|e| write_failed(path, e))?;
    file.flush().await.map_err(|e| write_failed(path, e))
}

#[cfg(unix)]
async fn is_fifo(path: &Path) -> bool {
    use std::os::unix::fs::FileTypeExt;

    tokio::fs::metadata(path).await.map(|meta| meta.file_type().is_fifo()).unwrap_or(false)
}

fn write_failed(path: &Path, error: std::io::Error) -> BridgeError {
    BridgeError::sink_failed(format!("Failed to append to {}", path.display()), Some(Box::new(error)))
}

/// Forwards commands into a bounded in-process channel.
///
/// Never waits: a full or closed channel is reported as a sink error.
#[derive(Debug, Clone)]
pub struct ChannelCommandSink {
    tx: mpsc::Sender<String>,
}

impl ChannelCommandSink {
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self { tx }
    }

    /// Create a sink together with the receiving end.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

impl CommandSink for ChannelCommandSink {
    fn send(&mut self, command: &str) -> Result<()> {
        self.tx.try_send(command.to_string()).map_err(|e| {
            let reason = match e {
                mpsc::error::TrySendError::Full(_) => "command channel full",
                mpsc::error::TrySendError::Closed(_) => "command channel closed",
            };
            BridgeError::sink_failed(reason, None)
        })
    }
}

/// Logs reported errors through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn report(&mut self, packet: &DecodedPacket) -> Result<()> {
        warn!(
            type_id = packet.type_id(),
            valid = packet.is_valid(),
            "Controller reported an error packet"
        );
        Ok(())
    }
}
