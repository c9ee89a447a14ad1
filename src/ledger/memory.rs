//! In-memory ledger for tests and dry runs.

use super::{Ledger, LedgerEntry, LedgerStore};
use crate::error::PersistenceError;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// Ledger that never touches disk.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    entries: Mutex<Ledger>,
}

impl MemoryLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ledger pre-filled with a mapping.
    pub fn with_entries(entries: Ledger) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }
}

#[async_trait::async_trait]
impl LedgerStore for MemoryLedger {
    async fn load(&self) -> Result<Ledger, PersistenceError> {
        Ok(self.entries.lock().await.clone())
    }

    #[instrument(skip(self, entry))]
    async fn append(&self, opponent: &str, entry: LedgerEntry) -> Result<(), PersistenceError> {
        let mut entries = self.entries.lock().await;
        entries.entry(opponent.to_string()).or_default().push(entry);
        debug!(count = entries[opponent].len(), "Entry recorded in memory");
        Ok(())
    }

    async fn flush(&self) -> Result<(), PersistenceError> {
        Ok(())
    }

    async fn snapshot(&self) -> Ledger {
        self.entries.lock().await.clone()
    }
}
