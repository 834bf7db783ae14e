//! Verification ledger.
//!
//! Every verification attempt is appended here, including attempts against
//! signatures that do not exist. Recording never fails the operation that
//! triggered it: a storage failure is logged and counted, and the caller's
//! outcome is returned unchanged.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error};

use crate::db::VerifyLogDoc;
use crate::store::CustodyStore;

// =============================================================================
// Ledger Statistics
// =============================================================================

/// Counters for ledger writes.
#[derive(Debug, Default)]
pub struct LedgerStats {
    /// Entries written
    pub recorded: AtomicU64,

    /// Entries the store refused
    pub failed: AtomicU64,
}

impl LedgerStats {
    /// Record a successful append.
    pub fn record_success(&self) {
        self.recorded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed append.
    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of current stats.
    pub fn snapshot(&self) -> LedgerStatsSnapshot {
        LedgerStatsSnapshot {
            recorded: self.recorded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of ledger statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedgerStatsSnapshot {
    pub recorded: u64,
    pub failed: u64,
}

// =============================================================================
// Verification Ledger
// =============================================================================

/// Append-only log of verification attempts
pub struct VerificationLedger {
    store: Arc<dyn CustodyStore>,
    stats: LedgerStats,
}

impl VerificationLedger {
    pub fn new(store: Arc<dyn CustodyStore>) -> Self {
        Self {
            store,
            stats: LedgerStats::default(),
        }
    }

    /// Append an entry. Never fails.
    pub async fn record(&self, entry: VerifyLogDoc) {
        let method = entry.method;
        let valid = entry.valid;

        match self.store.append_verification(entry).await {
            Ok(()) => {
                self.stats.record_success();
                debug!(?method, valid, "Verification recorded");
            }
            Err(e) => {
                self.stats.record_failure();
                error!(?method, valid, error = %e, "Failed to record verification");
            }
        }
    }

    /// Get ledger statistics.
    pub fn stats(&self) -> LedgerStatsSnapshot {
        self.stats.snapshot()
    }
}
