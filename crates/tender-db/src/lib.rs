//! # tender-db
//!
//! libSQL store and service layer for the bid reconciliation engine.
//!
//! Holds all relational state (projects, estimates with their price lists,
//! lines and WBS nodes, offers with their lines and alerts, audit trail) and
//! runs the stateful operations on top of the pure crates:
//! - [`import`] stores already-parsed estimate and offer bundles
//! - [`reconcile`] persists a reconciliation pass with idempotent alert upserts
//! - [`resolution`] drives the alert lifecycle and offer-line mapping
//! - [`merge`] merges baseline estimates into a new one
//!
//! Uses the `libsql` crate (C `SQLite` fork, v0.9.29) in local mode.

pub mod error;
pub mod helpers;
pub mod import;
pub mod merge;
mod migrations;
pub mod reconcile;
pub mod repos;
pub mod resolution;
pub mod service;

#[cfg(test)]
pub(crate) mod test_support;

use error::DatabaseError;
use libsql::Builder;

/// Database handle: one libSQL database and its connection.
pub struct TenderDb {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
}

impl TenderDb {
    /// Open a local database at the given path (`:memory:` for a throwaway store).
    ///
    /// Runs migrations automatically on open.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or
    /// migrations fail.
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;

        // Per-connection in SQLite; ownership cascades depend on it.
        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("PRAGMA foreign_keys: {e}")))?;

        let tender_db = Self { db, conn };
        tender_db.run_migrations().await?;
        Ok(tender_db)
    }

    /// Access the underlying libSQL connection for direct queries.
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }

    /// Generate a prefixed ID via libSQL. Returns e.g., `"off-a3f8b2c1"`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or returns no rows.
    pub async fn generate_id(&self, prefix: &str) -> Result<String, DatabaseError> {
        helpers::generate_id(&self.conn, prefix).await
    }
}
