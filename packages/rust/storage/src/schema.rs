//! SQL definitions for the enriched-company sink table.
//!
//! Table names are validated identifiers (see `DatabaseConfig::validate`),
//! so they are interpolated directly; values always go through parameters.

/// Sink columns after `company_id`, in insert order.
pub(crate) const SINK_COLUMNS: [&str; 12] = [
    "follower_count",
    "tagline",
    "industry",
    "country",
    "city",
    "geographic_area",
    "postal_code",
    "company_name",
    "url",
    "website_url",
    "logo_resolution_result",
    "cropped_cover_image",
];

/// Idempotent DDL for the sink table.
pub(crate) fn create_sink_table(table: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {table} (
    company_id             INTEGER PRIMARY KEY,
    follower_count         INTEGER NULL,
    tagline                TEXT NULL,
    industry               VARCHAR(255) NULL,
    country                VARCHAR(100) NULL,
    city                   VARCHAR(100) NULL,
    geographic_area        VARCHAR(100) NULL,
    postal_code            VARCHAR(100) NULL,
    company_name           VARCHAR(100) NULL,
    url                    VARCHAR(255) NULL,
    website_url            VARCHAR(255) NULL,
    logo_resolution_result VARCHAR(255) NULL,
    cropped_cover_image    VARCHAR(255) NULL
);
"#
    )
}

/// Plain insert; an existing `company_id` is a constraint violation.
pub(crate) fn insert_enriched(table: &str) -> String {
    let placeholders: Vec<String> = (1..=SINK_COLUMNS.len() + 1)
        .map(|i| format!("?{i}"))
        .collect();
    format!(
        "INSERT INTO {table} (company_id, {}) VALUES ({})",
        SINK_COLUMNS.join(", "),
        placeholders.join(", ")
    )
}

pub(crate) fn select_enriched(table: &str) -> String {
    format!(
        "SELECT {} FROM {table} WHERE company_id = ?1",
        SINK_COLUMNS.join(", ")
    )
}

/// Candidate rows: both columns must be present.
pub(crate) fn select_sources(table: &str, id_column: &str, url_column: &str) -> String {
    format!(
        "SELECT {id_column}, {url_column} FROM {table} \
         WHERE {id_column} IS NOT NULL AND {url_column} IS NOT NULL"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_has_one_placeholder_per_column() {
        let sql = insert_enriched("company_enriched_data");
        assert!(sql.starts_with("INSERT INTO company_enriched_data (company_id, follower_count"));
        assert!(sql.contains("?13"));
        assert!(!sql.contains("?14"));
    }

    #[test]
    fn source_query_filters_nulls() {
        let sql = select_sources("company_data", "company_id", "company_linkedin_url");
        assert!(sql.contains("FROM company_data"));
        assert!(sql.contains("company_id IS NOT NULL AND company_linkedin_url IS NOT NULL"));
    }
}
