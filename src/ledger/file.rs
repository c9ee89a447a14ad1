//! JSON file ledger.
//!
//! The whole mapping is rewritten on every append: write to a temp file,
//! sync it, then rename over the ledger. A crash leaves either the old or
//! the new file, never a partial one.

use super::{Ledger, LedgerEntry, LedgerStore};
use crate::error::PersistenceError;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

/// Ledger persisted as a single JSON object.
#[derive(Debug)]
pub struct JsonFileLedger {
    path: PathBuf,
    entries: Mutex<Ledger>,
    persist: bool,
}

impl JsonFileLedger {
    /// Opens the ledger at `path`.
    ///
    /// A missing or empty file is an empty ledger.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] if the file exists with content that is
    /// not a ledger, or cannot be read.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref().to_path_buf();
        let entries = read_ledger(&path).await?;
        info!(
            opponents = entries.len(),
            entries = entries.values().map(Vec::len).sum::<usize>(),
            "Ledger loaded"
        );
        Ok(Self {
            path,
            entries: Mutex::new(entries),
            persist: true,
        })
    }

    /// Opens the ledger, starting empty if the file is unusable.
    ///
    /// An unparsable file is moved aside to `<name>.corrupt-<unix time>` so
    /// the next write cannot destroy it. If it cannot be moved, the ledger
    /// keeps working in memory only and never writes over it.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub async fn open_or_recover(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        match Self::open(&path).await {
            Ok(ledger) => ledger,
            Err(e) => {
                error!(error = %e, "Ledger file is unusable; starting with an empty ledger");
                let quarantine = with_suffix(
                    &path,
                    &format!(".corrupt-{}", chrono::Utc::now().timestamp()),
                );
                let persist = match tokio::fs::rename(&path, &quarantine).await {
                    Ok(()) => {
                        error!(moved_to = %quarantine.display(), "Corrupt ledger moved aside");
                        true
                    }
                    Err(rename_err) => {
                        error!(error = %rename_err, "Could not move corrupt ledger; running in memory only");
                        false
                    }
                };
                Self {
                    path,
                    entries: Mutex::new(Ledger::new()),
                    persist,
                }
            }
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write(&self, entries: &Ledger) -> Result<(), PersistenceError> {
        if !self.persist {
            warn!("Ledger persistence disabled; entry kept in memory only");
            return Err(PersistenceError::new("persistence disabled for this ledger"));
        }

        let content = serde_json::to_vec_pretty(entries)?;
        let temp = with_suffix(&self.path, ".tmp");

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::File::create(&temp).await?;
        file.write_all(&content).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&temp, &self.path).await?;

        debug!(bytes = content.len(), "Ledger persisted");
        Ok(())
    }
}

#[async_trait::async_trait]
impl LedgerStore for JsonFileLedger {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load(&self) -> Result<Ledger, PersistenceError> {
        read_ledger(&self.path).await
    }

    #[instrument(skip(self, entry), fields(path = %self.path.display()))]
    async fn append(&self, opponent: &str, entry: LedgerEntry) -> Result<(), PersistenceError> {
        let mut entries = self.entries.lock().await;
        entries.entry(opponent.to_string()).or_default().push(entry);
        self.write(&entries).await
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn flush(&self) -> Result<(), PersistenceError> {
        let entries = self.entries.lock().await;
        self.write(&entries).await
    }

    async fn snapshot(&self) -> Ledger {
        self.entries.lock().await.clone()
    }
}

async fn read_ledger(path: &Path) -> Result<Ledger, PersistenceError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No ledger file yet");
            return Ok(Ledger::new());
        }
        Err(e) => return Err(e.into()),
    };

    if bytes.is_empty() {
        debug!("Ledger file is empty");
        return Ok(Ledger::new());
    }

    serde_json::from_slice(&bytes).map_err(|e| {
        PersistenceError::new(format!(
            "Ledger {} is not valid ({} bytes): {}",
            path.display(),
            bytes.len(),
            e
        ))
    })
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}
