//! Reader for the upstream company table.

use enricher_shared::{DatabaseConfig, EnricherError, Result, SourceRecord};
use libsql::{Connection, params};
use tracing::info;

use crate::schema;

/// Reads `(id, profile_url)` pairs from the configured source table.
pub struct SourceReader<'a> {
    conn: &'a Connection,
    config: &'a DatabaseConfig,
}

impl<'a> SourceReader<'a> {
    pub(crate) fn new(conn: &'a Connection, config: &'a DatabaseConfig) -> Self {
        Self { conn, config }
    }

    /// Fetch every candidate row in the store's natural order.
    ///
    /// The whole result set is materialized; there is no paging.
    pub async fn fetch(&self) -> Result<Vec<SourceRecord>> {
        let sql = schema::select_sources(
            &self.config.source_table,
            &self.config.id_column,
            &self.config.url_column,
        );

        let mut rows = self
            .conn
            .query(&sql, params![])
            .await
            .map_err(|e| EnricherError::Query(format!("{}: {e}", self.config.source_table)))?;

        let mut records = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| EnricherError::Query(e.to_string()))?
        {
            records.push(SourceRecord {
                id: row
                    .get::<i64>(0)
                    .map_err(|e| EnricherError::Query(format!("{}: {e}", self.config.id_column)))?,
                profile_url: row.get::<String>(1).map_err(|e| {
                    EnricherError::Query(format!("{}: {e}", self.config.url_column))
                })?,
            });
        }

        info!(
            table = %self.config.source_table,
            count = records.len(),
            "fetched source rows"
        );
        Ok(records)
    }
}
