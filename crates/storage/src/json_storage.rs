//! JSON-lines file history.
//!
//! Stores one JSON-encoded cycle per line in `history.jsonl` under the data
//! directory. Every append is flushed and synced before it becomes visible
//! to readers; the whole log is cached in memory behind a lock so reads
//! never touch a half-written record.
//!
//! A writable history holds an exclusive advisory lock on `history.lock`
//! for its lifetime, so only one process appends at a time. Read-only
//! opens take no lock and never modify the file.

use super::trait_::{by_module, tail_of};
use super::{HistoryStore, Result, StorageError};
use async_trait::async_trait;
use fs2::FileExt;
use jarvis_core::EvolutionCycle;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// History file name inside the data directory.
pub const HISTORY_FILE: &str = "history.jsonl";

/// Lock file guarding the data directory.
pub const LOCK_FILE: &str = "history.lock";

struct Inner {
    // None when opened read-only.
    file: Option<File>,
    bytes: u64,
    cycles: Vec<EvolutionCycle>,
}

/// File-based JSON-lines history backend.
pub struct JsonlHistory {
    path: PathBuf,
    inner: RwLock<Inner>,
    // Released when the history is dropped.
    _lock: Option<std::fs::File>,
}

impl JsonlHistory {
    /// Open (or create) the history in `root`.
    ///
    /// A torn final line left by a crash mid-append is cut off with a
    /// warning. Any other unreadable line is an error: the log is an audit
    /// trail and is never silently rewritten.
    ///
    /// Fails with [`StorageError::Locked`] while another writer holds the
    /// directory.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        let lock = lock_dir(&root)?;
        let path = root.join(HISTORY_FILE);

        let content = read_log(&path).await?;
        let (cycles, valid_len) = parse_log(&content)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        if valid_len < content.len() as u64 {
            warn!(
                "Discarding {} trailing bytes of torn history record in {}",
                content.len() as u64 - valid_len,
                path.display()
            );
            file.set_len(valid_len).await?;
        }

        debug!("Loaded {} evolution cycles from {}", cycles.len(), path.display());

        Ok(Self {
            path,
            inner: RwLock::new(Inner {
                file: Some(file),
                bytes: valid_len,
                cycles,
            }),
            _lock: Some(lock),
        })
    }

    /// Open the history in `root` for reading only.
    ///
    /// Takes no lock, so it may run next to a writer. A torn final line is
    /// skipped, not truncated: it may be an append still in progress.
    /// Appends fail with [`StorageError::ReadOnly`].
    pub async fn open_read_only(root: impl AsRef<Path>) -> Result<Self> {
        let path = root.as_ref().join(HISTORY_FILE);
        let content = read_log(&path).await?;
        let (cycles, valid_len) = parse_log(&content)?;
        if valid_len < content.len() as u64 {
            debug!("Skipping incomplete trailing record in {}", path.display());
        }

        Ok(Self {
            path,
            inner: RwLock::new(Inner {
                file: None,
                bytes: valid_len,
                cycles,
            }),
            _lock: None,
        })
    }

    /// Path of the underlying history file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Take the directory's writer lock without blocking.
fn lock_dir(root: &Path) -> Result<std::fs::File> {
    let path = root.join(LOCK_FILE);
    let file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&path)?;
    match file.try_lock_exclusive() {
        Ok(()) => Ok(file),
        Err(e) if e.kind() == fs2::lock_contended_error().kind() => Err(StorageError::Locked(path)),
        Err(e) => Err(e.into()),
    }
}

async fn read_log(path: &Path) -> Result<String> {
    match fs::read_to_string(path).await {
        Ok(s) => Ok(s),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e.into()),
    }
}

/// Parse the log, returning the records and the byte length of the valid prefix.
fn parse_log(content: &str) -> Result<(Vec<EvolutionCycle>, u64)> {
    let mut cycles = Vec::new();
    let mut offset = 0usize;
    let mut lines = content.split_inclusive('\n').enumerate().peekable();

    while let Some((index, raw)) = lines.next() {
        let is_last = lines.peek().is_none();
        let line = raw.trim_end_matches(['\n', '\r']);

        if line.trim().is_empty() {
            offset += raw.len();
            continue;
        }

        match serde_json::from_str::<EvolutionCycle>(line) {
            Ok(cycle) if raw.ends_with('\n') => {
                cycles.push(cycle);
                offset += raw.len();
            }
            // A record without its newline, or garbage, on the final line is
            // the remains of an interrupted append.
            _ if is_last => break,
            Ok(_) => {
                return Err(StorageError::Corrupt {
                    line: index + 1,
                    reason: "record is not newline-terminated".to_string(),
                })
            }
            Err(e) => {
                return Err(StorageError::Corrupt {
                    line: index + 1,
                    reason: e.to_string(),
                })
            }
        }
    }

    Ok((cycles, offset as u64))
}

#[async_trait]
impl HistoryStore for JsonlHistory {
    async fn append(&self, cycle: &EvolutionCycle) -> Result<()> {
        let mut line = serde_json::to_vec(cycle)?;
        line.push(b'\n');

        let mut inner = self.inner.write().await;
        let before = inner.bytes;
        let Some(file) = inner.file.as_mut() else {
            return Err(StorageError::ReadOnly(self.path.clone()));
        };

        let written = async {
            file.write_all(&line).await?;
            file.flush().await?;
            file.sync_data().await
        }
        .await;

        if let Err(e) = written {
            // Cut any partial line so the next append starts on a boundary.
            if let Err(truncate) = file.set_len(before).await {
                warn!("Failed to truncate history after write error: {}", truncate);
            }
            return Err(e.into());
        }

        inner.bytes = before + line.len() as u64;
        inner.cycles.push(cycle.clone());
        Ok(())
    }

    async fn tail(&self, n: usize) -> Result<Vec<EvolutionCycle>> {
        Ok(tail_of(&self.inner.read().await.cycles, n))
    }

    async fn query_by_module(&self, target_module: &str, limit: usize) -> Result<Vec<EvolutionCycle>> {
        Ok(by_module(&self.inner.read().await.cycles, target_module, limit))
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.inner.read().await.cycles.len())
    }

    async fn load_all(&self) -> Result<Vec<EvolutionCycle>> {
        Ok(self.inner.read().await.cycles.clone())
    }
}
