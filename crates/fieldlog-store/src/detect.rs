//! Duplicate detection over the ledger.
//!
//! A report is a duplicate when some existing data row has the same
//! identifier and address, compared after trimming. Detection never fails:
//! if the ledger cannot be read, the report is treated as new. That keeps
//! intake running during a backend outage at the cost of letting duplicates
//! through unflagged for the duration.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::{LedgerBackend, StoreError};

/// Normalized `(identifier, address)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LedgerKey {
    pub identifier: String,
    pub address: String,
}

impl LedgerKey {
    pub fn new(identifier: &str, address: &str) -> Self {
        Self {
            identifier: identifier.trim().to_string(),
            address: address.trim().to_string(),
        }
    }

    /// Key of one row from [`LedgerBackend::key_columns`] (columns G..I).
    ///
    /// Rows with fewer than two cells carry no usable key.
    pub fn from_key_row(cells: &[String]) -> Option<Self> {
        if cells.len() < 2 {
            return None;
        }
        let address = cells.get(2).map(String::as_str).unwrap_or_default();
        Some(Self::new(&cells[0], address))
    }

    fn matches(&self, identifier: &str, address: &str) -> bool {
        self.identifier == identifier.trim() && self.address == address.trim()
    }
}

/// Existence check for a prior `(identifier, address)` pair.
#[async_trait]
pub trait DuplicateDetector: Send + Sync {
    /// `true` if the pair is already recorded. Never errors.
    async fn is_duplicate(&self, identifier: &str, address: &str) -> bool;

    /// Note a pair that has just been appended to the ledger.
    async fn remember(&self, _identifier: &str, _address: &str) {}
}

/// Linear scan of the whole ledger on every check.
pub struct LedgerScan {
    ledger: Arc<dyn LedgerBackend>,
}

impl LedgerScan {
    pub fn new(ledger: Arc<dyn LedgerBackend>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl DuplicateDetector for LedgerScan {
    async fn is_duplicate(&self, identifier: &str, address: &str) -> bool {
        let rows = match self.ledger.key_columns().await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "duplicate check could not read the ledger; treating as new");
                return false;
            }
        };
        let found = rows
            .iter()
            .skip(1)
            .filter_map(|row| LedgerKey::from_key_row(row))
            .any(|key| key.matches(identifier, address));
        debug!(identifier, found, scanned = rows.len().saturating_sub(1), "duplicate scan");
        found
    }
}

/// In-memory set of ledger keys, seeded once from the ledger.
///
/// Only sees rows appended by this process after seeding; rows added to the
/// sheet by hand afterwards are not picked up until restart.
pub struct KeyIndex {
    keys: RwLock<HashSet<LedgerKey>>,
}

impl KeyIndex {
    pub fn new(keys: impl IntoIterator<Item = LedgerKey>) -> Self {
        Self {
            keys: RwLock::new(keys.into_iter().collect()),
        }
    }

    /// Build the index from every data row currently in the ledger.
    pub async fn load(ledger: &dyn LedgerBackend) -> Result<Self, StoreError> {
        let rows = ledger.key_columns().await?;
        let index = Self::new(
            rows.iter()
                .skip(1)
                .filter_map(|row| LedgerKey::from_key_row(row)),
        );
        info!(keys = index.len().await, "duplicate index loaded");
        Ok(index)
    }

    pub async fn len(&self) -> usize {
        self.keys.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.keys.read().await.is_empty()
    }
}

#[async_trait]
impl DuplicateDetector for KeyIndex {
    async fn is_duplicate(&self, identifier: &str, address: &str) -> bool {
        self.keys
            .read()
            .await
            .contains(&LedgerKey::new(identifier, address))
    }

    async fn remember(&self, identifier: &str, address: &str) {
        self.keys
            .write()
            .await
            .insert(LedgerKey::new(identifier, address));
    }
}
