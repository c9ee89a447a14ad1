//! Append-only record of submitted moves, keyed by opponent.
//!
//! Stores serialize their writers internally: callers may append from any
//! number of session tasks without coordinating.

mod file;
mod memory;

pub use file::JsonFileLedger;
pub use memory::MemoryLedger;

use crate::error::PersistenceError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One recorded decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_new::new)]
pub struct LedgerEntry {
    /// Position fingerprint (FEN) at decision time.
    pub position: String,
    /// Move token that was submitted.
    #[serde(rename = "move")]
    pub chosen_move: String,
    /// When the move was confirmed.
    pub timestamp: DateTime<Utc>,
}

/// Opponent → ordered entries.
pub type Ledger = BTreeMap<String, Vec<LedgerEntry>>;

/// Durable ledger storage.
#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    /// Reads the persisted mapping.
    async fn load(&self) -> Result<Ledger, PersistenceError>;

    /// Appends an entry and persists before returning.
    ///
    /// On a persistence failure the entry is still kept in memory.
    async fn append(&self, opponent: &str, entry: LedgerEntry) -> Result<(), PersistenceError>;

    /// Persists the in-memory mapping.
    async fn flush(&self) -> Result<(), PersistenceError>;

    /// Copy of the in-memory mapping.
    async fn snapshot(&self) -> Ledger;
}
