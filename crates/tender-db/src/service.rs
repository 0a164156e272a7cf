//! Service layer orchestrating store mutations with audit entries.
//!
//! `TenderService` wraps `TenderDb` and the engine settings. Repo methods are
//! implemented as `impl TenderService` blocks under [`crate::repos`]; the
//! multi-step operations live in their own modules.

use libsql::Transaction;
use tender_recon::ReconSettings;
use tokio::sync::{Mutex, MutexGuard};

use crate::TenderDb;
use crate::error::DatabaseError;

/// Orchestrates store mutations.
///
/// Every multi-row mutation follows this protocol:
/// 1. Take the write gate
/// 2. Begin a transaction
/// 3. Execute SQL and append audit entries on the transaction
/// 4. Commit, or roll back and return the error
pub struct TenderService {
    db: TenderDb,
    settings: ReconSettings,
    write_gate: Mutex<()>,
}

/// An open write transaction and the gate guard serializing it.
pub(crate) struct WriteTx<'a> {
    pub(crate) tx: Transaction,
    _gate: MutexGuard<'a, ()>,
}

impl TenderService {
    /// Open a local store and wrap it.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn new_local(db_path: &str, settings: ReconSettings) -> Result<Self, DatabaseError> {
        let db = TenderDb::open_local(db_path).await?;
        Ok(Self::from_db(db, settings))
    }

    #[must_use]
    pub fn from_db(db: TenderDb, settings: ReconSettings) -> Self {
        Self {
            db,
            settings,
            write_gate: Mutex::new(()),
        }
    }

    /// Access the underlying database handle.
    #[must_use]
    pub const fn db(&self) -> &TenderDb {
        &self.db
    }

    #[must_use]
    pub const fn settings(&self) -> &ReconSettings {
        &self.settings
    }

    /// Take the write gate and open a transaction.
    pub(crate) async fn begin(&self) -> Result<WriteTx<'_>, DatabaseError> {
        let gate = self.write_gate.lock().await;
        let tx = self.db.conn().transaction().await?;
        Ok(WriteTx { tx, _gate: gate })
    }
}

impl WriteTx<'_> {
    /// Commit on `Ok`, roll back on `Err`, and hand the result back.
    pub(crate) async fn finish<T>(
        self,
        op: &str,
        result: Result<T, DatabaseError>,
    ) -> Result<T, DatabaseError> {
        match result {
            Ok(value) => {
                self.tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                tracing::debug!(op, error = %err, "rolling back");
                if let Err(rollback_err) = self.tx.rollback().await {
                    tracing::warn!(op, error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }
}
