//! libSQL storage layer for the company enricher.
//!
//! The [`Storage`] struct wraps one database connection that holds both the
//! upstream company table (read through [`SourceReader`]) and the enriched
//! sink table (written through [`SinkWriter`]).
//!
//! A run works inside a single [`Batch`]: one transaction that is either
//! committed as a whole or rolled back as a whole.

mod schema;
mod sink;
mod source;

use enricher_shared::{DatabaseConfig, EnrichedRecord, EnricherError, Result};
use libsql::{Connection, Database, Transaction};
use tracing::info;

pub use sink::SinkWriter;
pub use source::SourceReader;

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    db: Database,
    conn: Connection,
    config: DatabaseConfig,
}

impl Storage {
    /// Open the existing database described by `config`.
    ///
    /// Fails with [`EnricherError::Connection`] when the file is missing or
    /// cannot be opened; the source table is never created here.
    pub async fn open(config: &DatabaseConfig) -> Result<Self> {
        config.validate()?;

        let path = &config.path;
        if !path.exists() {
            return Err(EnricherError::Connection(format!(
                "database not found at {}",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| EnricherError::Connection(format!("{}: {e}", path.display())))?;

        let conn = db
            .connect()
            .map_err(|e| EnricherError::Connection(format!("{}: {e}", path.display())))?;

        info!(path = %path.display(), "database connection established");

        Ok(Self {
            db,
            conn,
            config: config.clone(),
        })
    }

    /// Reader over the source table, outside any transaction.
    pub fn reader(&self) -> SourceReader<'_> {
        SourceReader::new(&self.conn, &self.config)
    }

    /// Writer over the sink table, outside any transaction.
    pub fn writer(&self) -> SinkWriter<'_> {
        SinkWriter::new(&self.conn, &self.config.sink_table)
    }

    /// Create the sink table if missing.
    pub async fn ensure_schema(&self) -> Result<()> {
        self.writer().ensure_schema().await
    }

    /// Look up a persisted enriched row by company id.
    pub async fn get_enriched(&self, company_id: i64) -> Result<Option<EnrichedRecord>> {
        self.writer().get(company_id).await
    }

    /// Start the run-wide transaction.
    pub async fn begin(&self) -> Result<Batch<'_>> {
        let tx = self
            .conn
            .transaction()
            .await
            .map_err(|e| EnricherError::Connection(format!("begin transaction: {e}")))?;
        Ok(Batch {
            tx,
            config: &self.config,
        })
    }

    /// Release the connection.
    pub fn close(self) {
        let path = self.config.path.clone();
        drop(self.conn);
        drop(self.db);
        info!(path = %path.display(), "database connection closed");
    }
}

/// One open transaction spanning a whole enrichment run.
pub struct Batch<'s> {
    tx: Transaction,
    config: &'s DatabaseConfig,
}

impl Batch<'_> {
    /// Reader bound to this transaction.
    pub fn reader(&self) -> SourceReader<'_> {
        SourceReader::new(&self.tx, self.config)
    }

    /// Writer bound to this transaction.
    pub fn writer(&self) -> SinkWriter<'_> {
        SinkWriter::new(&self.tx, &self.config.sink_table)
    }

    /// Make every insert of this batch durable.
    pub async fn commit(self) -> Result<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| EnricherError::Write(format!("commit: {e}")))?;
        info!("transaction committed");
        Ok(())
    }

    /// Discard every insert of this batch.
    pub async fn rollback(self) -> Result<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| EnricherError::Write(format!("rollback: {e}")))?;
        info!("transaction rolled back");
        Ok(())
    }
}
