//! Writer for the enriched-company table.

use enricher_shared::{EnrichedRecord, EnricherError, Result};
use libsql::{Connection, Value, params};
use tracing::{debug, error, info};

use crate::schema;

/// Primary result code for constraint violations (extended codes share the low byte).
const SQLITE_CONSTRAINT: i32 = 19;

/// Creates the sink table and inserts enriched rows into it.
pub struct SinkWriter<'a> {
    conn: &'a Connection,
    table: &'a str,
}

impl<'a> SinkWriter<'a> {
    pub(crate) fn new(conn: &'a Connection, table: &'a str) -> Self {
        Self { conn, table }
    }

    /// Create the sink table if it does not exist yet. Safe to call repeatedly.
    pub async fn ensure_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(&schema::create_sink_table(self.table))
            .await
            .map_err(|e| EnricherError::Write(format!("create {}: {e}", self.table)))?;
        debug!(table = self.table, "sink table ready");
        Ok(())
    }

    /// Insert one enriched row keyed by `company_id`.
    ///
    /// Insert-only: an existing id fails with [`EnricherError::Constraint`].
    pub async fn upsert(&self, company_id: i64, record: &EnrichedRecord) -> Result<()> {
        let follower_count = i64::try_from(record.follower_count).map_err(|_| {
            EnricherError::Write(format!(
                "follower_count {} out of range for company {company_id}",
                record.follower_count
            ))
        })?;

        let mut values: Vec<Value> = Vec::with_capacity(schema::SINK_COLUMNS.len() + 1);
        values.push(Value::Integer(company_id));
        values.push(Value::Integer(follower_count));
        values.extend(
            record
                .text_fields()
                .iter()
                .map(|s| Value::Text((*s).to_string())),
        );

        let result = self
            .conn
            .execute(&schema::insert_enriched(self.table), values)
            .await;

        match result {
            Ok(_) => {
                info!(company_id, "enriched data inserted");
                Ok(())
            }
            Err(e) => {
                let err = classify_write_error(company_id, e);
                error!(company_id, error = %err, "failed to insert enriched data");
                Err(err)
            }
        }
    }

    /// Read back one enriched row. NULL columns come back as empty/zero; a
    /// stored value of any other unexpected type is a query error.
    pub async fn get(&self, company_id: i64) -> Result<Option<EnrichedRecord>> {
        let mut rows = self
            .conn
            .query(&schema::select_enriched(self.table), params![company_id])
            .await
            .map_err(|e| EnricherError::Query(e.to_string()))?;

        let row = match rows.next().await {
            Ok(Some(row)) => row,
            Ok(None) => return Ok(None),
            Err(e) => return Err(EnricherError::Query(e.to_string())),
        };

        let text = |idx: i32| -> Result<String> {
            match column(&row, idx)? {
                Value::Null => Ok(String::new()),
                Value::Text(s) => Ok(s),
                other => Err(self.type_mismatch(idx, "text", &other)),
            }
        };
        let follower_count = match column(&row, 0)? {
            Value::Null => 0,
            Value::Integer(v) => u64::try_from(v)
                .map_err(|_| self.type_mismatch(0, "non-negative integer", &Value::Integer(v)))?,
            other => return Err(self.type_mismatch(0, "integer", &other)),
        };

        Ok(Some(EnrichedRecord {
            follower_count,
            tagline: text(1)?,
            industry: text(2)?,
            country: text(3)?,
            city: text(4)?,
            geographic_area: text(5)?,
            postal_code: text(6)?,
            company_name: text(7)?,
            url: text(8)?,
            website_url: text(9)?,
            logo_resolution_result: text(10)?,
            cropped_cover_image: text(11)?,
        }))
    }

    fn type_mismatch(&self, idx: i32, expected: &str, found: &Value) -> EnricherError {
        let name = schema::SINK_COLUMNS[idx as usize];
        EnricherError::Query(format!(
            "{}.{name}: expected {expected}, found {found:?}",
            self.table
        ))
    }
}

fn column(row: &libsql::Row, idx: i32) -> Result<Value> {
    row.get_value(idx)
        .map_err(|e| EnricherError::Query(e.to_string()))
}

/// Split constraint violations from every other sink failure.
fn classify_write_error(company_id: i64, e: libsql::Error) -> EnricherError {
    let is_constraint = match &e {
        libsql::Error::SqliteFailure(code, _) => code & 0xff == SQLITE_CONSTRAINT,
        other => other.to_string().contains("constraint failed"),
    };

    if is_constraint {
        EnricherError::constraint(company_id, e.to_string())
    } else {
        EnricherError::Write(format!("company {company_id}: {e}"))
    }
}
