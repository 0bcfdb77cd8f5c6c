//! End-to-end enrichment run: source rows → profile API → sink table.
//!
//! The whole run shares one connection and one transaction. Rows are handled
//! strictly one after another; a row-level lookup failure only skips that
//! row, while any error escaping the row loop rolls the run back.

use enricher_client::ProfileClient;
use enricher_shared::{
    DatabaseConfig, EnrichedRecord, EnricherError, Result, RunId, RunSummary, SkipReason,
    SourceRecord, WriteFailurePolicy,
};
use enricher_storage::{Batch, SinkWriter, Storage};
use tracing::{error, info, instrument, warn};

/// Configuration for [`run_enrichment`].
#[derive(Debug, Clone)]
pub struct EnrichRunConfig {
    /// Database holding both the source and the sink table.
    pub database: DatabaseConfig,
    /// How sink failures inside the row loop are handled.
    pub on_write_error: WriteFailurePolicy,
}

/// What happened to one source row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    /// An enriched row was inserted.
    Written,
    /// No sink row was produced.
    Skipped(SkipReason),
}

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each source row has been handled.
    fn row_done(&self, source: &SourceRecord, outcome: RowOutcome, current: usize, total: usize);
    /// Called once the run has committed.
    fn done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn row_done(&self, _source: &SourceRecord, _outcome: RowOutcome, _current: usize, _total: usize) {}
    fn done(&self, _summary: &RunSummary) {}
}

/// Run the full enrichment job.
///
/// 1. Open the database (a failure here aborts before any API call)
/// 2. Ensure the sink table exists
/// 3. In one transaction: fetch source rows, enrich and insert each one
/// 4. Commit, or roll back if an error escapes the row loop
///
/// The connection is closed on every path out of this function.
#[instrument(skip_all, fields(db = %config.database.path.display()))]
pub async fn run_enrichment(
    config: &EnrichRunConfig,
    client: &ProfileClient,
    progress: &dyn ProgressReporter,
) -> Result<RunSummary> {
    let mut summary = RunSummary::new(RunId::new());
    info!(run_id = %summary.run_id, endpoint = %client.endpoint(), "starting enrichment run");

    progress.phase("Connecting to database");
    let storage = Storage::open(&config.database).await?;

    let outcome = run_in_transaction(&storage, config, client, progress, &mut summary).await;
    storage.close();
    outcome?;

    summary.finish();
    progress.done(&summary);

    info!(
        run_id = %summary.run_id,
        fetched = summary.fetched,
        written = summary.written,
        skipped_no_data = summary.skipped_no_data,
        skipped_transport = summary.skipped_transport,
        skipped_decode = summary.skipped_decode,
        skipped_write = summary.skipped_write,
        "enrichment run complete"
    );

    Ok(summary)
}

/// Everything between opening and closing the connection.
async fn run_in_transaction(
    storage: &Storage,
    config: &EnrichRunConfig,
    client: &ProfileClient,
    progress: &dyn ProgressReporter,
    summary: &mut RunSummary,
) -> Result<()> {
    storage.ensure_schema().await?;
    let batch = storage.begin().await?;

    match process_rows(&batch, config, client, progress, summary).await {
        Ok(()) => {
            progress.phase("Committing");
            batch.commit().await
        }
        Err(e) => {
            error!(run_id = %summary.run_id, error = %e, "run failed, rolling back");
            progress.phase("Rolling back");
            if let Err(rollback_err) = batch.rollback().await {
                error!(error = %rollback_err, "rollback failed");
            }
            Err(e)
        }
    }
}

async fn process_rows(
    batch: &Batch<'_>,
    config: &EnrichRunConfig,
    client: &ProfileClient,
    progress: &dyn ProgressReporter,
    summary: &mut RunSummary,
) -> Result<()> {
    progress.phase("Fetching companies");
    let sources = batch.reader().fetch().await?;
    summary.fetched = sources.len();

    progress.phase("Enriching companies");
    let writer = batch.writer();
    let total = sources.len();

    for (i, source) in sources.iter().enumerate() {
        let outcome = process_row(&writer, client, source, config.on_write_error).await?;
        match outcome {
            RowOutcome::Written => summary.written += 1,
            RowOutcome::Skipped(reason) => summary.record_skip(reason),
        }
        progress.row_done(source, outcome, i + 1, total);
    }

    Ok(())
}

/// Enrich one source row and insert the result.
async fn process_row(
    writer: &SinkWriter<'_>,
    client: &ProfileClient,
    source: &SourceRecord,
    on_write_error: WriteFailurePolicy,
) -> Result<RowOutcome> {
    let record = match client.enrich(&source.profile_url).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            info!(
                company_id = source.id,
                profile_url = %source.profile_url,
                "no meaningful data found"
            );
            return Ok(RowOutcome::Skipped(SkipReason::NoData));
        }
        Err(e) if e.is_row_recoverable() => {
            let reason = lookup_skip_reason(&e);
            warn!(
                company_id = source.id,
                profile_url = %source.profile_url,
                %reason,
                error = %e,
                "profile lookup failed, skipping row"
            );
            return Ok(RowOutcome::Skipped(reason));
        }
        Err(e) => return Err(e),
    };

    write_row(writer, source, &record, on_write_error).await
}

/// Insert one enriched record, applying the write-failure policy.
///
/// Empty records are never written, whatever the client returned.
async fn write_row(
    writer: &SinkWriter<'_>,
    source: &SourceRecord,
    record: &EnrichedRecord,
    on_write_error: WriteFailurePolicy,
) -> Result<RowOutcome> {
    if record.is_empty() {
        return Ok(RowOutcome::Skipped(SkipReason::NoData));
    }

    match writer.upsert(source.id, record).await {
        Ok(()) => Ok(RowOutcome::Written),
        Err(e) if e.is_write_failure() && on_write_error == WriteFailurePolicy::Skip => {
            warn!(company_id = source.id, error = %e, "insert failed, continuing");
            Ok(RowOutcome::Skipped(SkipReason::WriteFailed))
        }
        Err(e) => Err(e),
    }
}

fn lookup_skip_reason(e: &EnricherError) -> SkipReason {
    match e {
        EnricherError::Decode(_) => SkipReason::Decode,
        _ => SkipReason::Transport,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enricher_shared::ApiConfig;
    use serde_json::json;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use uuid::Uuid;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ACME: &str = "https://www.linkedin.com/company/acme";
    const GLOBEX: &str = "https://www.linkedin.com/company/globex";
    const INITECH: &str = "https://www.linkedin.com/company/initech";

    /// Create a temp database whose source table holds `rows`.
    async fn seeded_db(rows: &[(i64, &str)]) -> DatabaseConfig {
        let db_path: PathBuf =
            std::env::temp_dir().join(format!("enricher_run_{}.db", Uuid::now_v7()));
        let db = libsql::Builder::new_local(&db_path).build().await.unwrap();
        let conn = db.connect().unwrap();
        conn.execute_batch(
            "CREATE TABLE company_data (company_id INTEGER, company_linkedin_url TEXT);",
        )
        .await
        .unwrap();
        for (id, url) in rows {
            conn.execute(
                "INSERT INTO company_data (company_id, company_linkedin_url) VALUES (?1, ?2)",
                libsql::params![*id, *url],
            )
            .await
            .unwrap();
        }
        DatabaseConfig {
            path: db_path,
            ..Default::default()
        }
    }

    fn run_config(database: DatabaseConfig, on_write_error: WriteFailurePolicy) -> EnrichRunConfig {
        EnrichRunConfig {
            database,
            on_write_error,
        }
    }

    fn client_for(server: &MockServer) -> ProfileClient {
        let api = ApiConfig {
            endpoint: format!("{}/company", server.uri()),
            ..Default::default()
        };
        ProfileClient::new(&api, "test-key").unwrap()
    }

    fn company(name: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "followerCount": 250,
                "companyName": format!(" {name} "),
                "industry": "Manufacturing",
                "headquarter": { "country": "US", "city": "Springfield" }
            }
        }))
    }

    async fn mock_profile(server: &MockServer, link: &str, response: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path("/company"))
            .and(body_json(json!({ "link": link })))
            .respond_with(response)
            .mount(server)
            .await;
    }

    async fn enriched(config: &DatabaseConfig, id: i64) -> Option<EnrichedRecord> {
        let storage = Storage::open(config).await.unwrap();
        storage.get_enriched(id).await.unwrap()
    }

    /// Records every callback so tests can check what the CLI would show.
    #[derive(Default)]
    struct RecordingProgress {
        rows: Mutex<Vec<(i64, RowOutcome)>>,
        phases: Mutex<Vec<String>>,
    }

    impl ProgressReporter for RecordingProgress {
        fn phase(&self, name: &str) {
            self.phases.lock().unwrap().push(name.to_string());
        }
        fn row_done(&self, source: &SourceRecord, outcome: RowOutcome, _current: usize, _total: usize) {
            self.rows.lock().unwrap().push((source.id, outcome));
        }
        fn done(&self, _summary: &RunSummary) {}
    }

    #[tokio::test]
    async fn transport_failure_skips_row_and_commits_the_rest() {
        let server = MockServer::start().await;
        mock_profile(&server, ACME, ResponseTemplate::new(503)).await;
        mock_profile(&server, GLOBEX, company("Globex")).await;

        let db = seeded_db(&[(1, ACME), (2, GLOBEX)]).await;
        let progress = RecordingProgress::default();
        let summary = run_enrichment(
            &run_config(db.clone(), WriteFailurePolicy::Abort),
            &client_for(&server),
            &progress,
        )
        .await
        .expect("run should complete");

        assert_eq!(summary.fetched, 2);
        assert_eq!(summary.written, 1);
        assert_eq!(summary.skipped_transport, 1);
        assert!(summary.finished_at.is_some());

        assert!(enriched(&db, 1).await.is_none());
        let globex = enriched(&db, 2).await.expect("row 2 committed");
        assert_eq!(globex.company_name, "Globex");
        assert_eq!(globex.follower_count, 250);

        let rows = progress.rows.lock().unwrap();
        assert_eq!(
            *rows,
            vec![
                (1, RowOutcome::Skipped(SkipReason::Transport)),
                (2, RowOutcome::Written)
            ]
        );
    }

    #[tokio::test]
    async fn empty_data_writes_nothing() {
        let server = MockServer::start().await;
        mock_profile(
            &server,
            ACME,
            ResponseTemplate::new(200).set_body_json(json!({ "data": {} })),
        )
        .await;

        let db = seeded_db(&[(1, ACME)]).await;
        let summary = run_enrichment(
            &run_config(db.clone(), WriteFailurePolicy::Abort),
            &client_for(&server),
            &SilentProgress,
        )
        .await
        .unwrap();

        assert_eq!(summary.written, 0);
        assert_eq!(summary.skipped_no_data, 1);
        assert!(enriched(&db, 1).await.is_none());
    }

    #[tokio::test]
    async fn skip_causes_are_counted_separately() {
        let server = MockServer::start().await;
        mock_profile(&server, ACME, ResponseTemplate::new(500)).await;
        mock_profile(
            &server,
            GLOBEX,
            ResponseTemplate::new(200).set_body_string("not json"),
        )
        .await;
        mock_profile(
            &server,
            INITECH,
            ResponseTemplate::new(200).set_body_json(json!({ "data": null })),
        )
        .await;

        let db = seeded_db(&[(1, ACME), (2, GLOBEX), (3, INITECH)]).await;
        let summary = run_enrichment(
            &run_config(db, WriteFailurePolicy::Abort),
            &client_for(&server),
            &SilentProgress,
        )
        .await
        .unwrap();

        assert_eq!(summary.skipped_transport, 1);
        assert_eq!(summary.skipped_decode, 1);
        assert_eq!(summary.skipped_no_data, 1);
        assert_eq!(summary.written, 0);
    }

    #[tokio::test]
    async fn out_of_range_follower_count_skips_only_that_row() {
        let server = MockServer::start().await;
        mock_profile(
            &server,
            ACME,
            ResponseTemplate::new(200).set_body_json(json!({ "data": { "companyName": "Acme" } })),
        )
        .await;
        mock_profile(
            &server,
            GLOBEX,
            ResponseTemplate::new(200).set_body_string(
                r#"{"data": {"companyName": "Big", "followerCount": 1e19}}"#,
            ),
        )
        .await;

        let db = seeded_db(&[(1, ACME), (2, GLOBEX)]).await;
        let summary = run_enrichment(
            &run_config(db.clone(), WriteFailurePolicy::Abort),
            &client_for(&server),
            &SilentProgress,
        )
        .await
        .expect("a bad response value must not abort the run");

        assert_eq!(summary.written, 1);
        assert_eq!(summary.skipped_decode, 1);
        assert_eq!(enriched(&db, 1).await.unwrap().company_name, "Acme");
        assert!(enriched(&db, 2).await.is_none());
    }

    #[tokio::test]
    async fn empty_record_is_never_inserted() {
        let db = seeded_db(&[]).await;
        let storage = Storage::open(&db).await.unwrap();
        storage.ensure_schema().await.unwrap();

        let source = SourceRecord {
            id: 7,
            profile_url: ACME.to_string(),
        };
        let outcome = write_row(
            &storage.writer(),
            &source,
            &EnrichedRecord::default(),
            WriteFailurePolicy::Abort,
        )
        .await
        .unwrap();

        assert_eq!(outcome, RowOutcome::Skipped(SkipReason::NoData));
        assert!(storage.get_enriched(7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_key_aborts_and_rolls_back_whole_batch() {
        let server = MockServer::start().await;
        mock_profile(&server, ACME, company("Acme")).await;
        mock_profile(&server, GLOBEX, company("Globex")).await;
        mock_profile(&server, INITECH, company("Initech")).await;

        // Row 2 reuses company id 1, so its insert hits the primary key.
        let db = seeded_db(&[(1, ACME), (1, GLOBEX), (3, INITECH)]).await;
        let progress = RecordingProgress::default();
        let err = run_enrichment(
            &run_config(db.clone(), WriteFailurePolicy::Abort),
            &client_for(&server),
            &progress,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, EnricherError::Constraint { company_id: 1, .. }));
        assert!(enriched(&db, 1).await.is_none(), "row 1 must be rolled back");
        assert!(enriched(&db, 3).await.is_none());
        assert!(
            progress
                .phases
                .lock()
                .unwrap()
                .iter()
                .any(|p| p == "Rolling back")
        );
    }

    #[tokio::test]
    async fn duplicate_key_with_skip_policy_continues() {
        let server = MockServer::start().await;
        mock_profile(&server, ACME, company("Acme")).await;
        mock_profile(&server, GLOBEX, company("Globex")).await;
        mock_profile(&server, INITECH, company("Initech")).await;

        let db = seeded_db(&[(1, ACME), (1, GLOBEX), (3, INITECH)]).await;
        let summary = run_enrichment(
            &run_config(db.clone(), WriteFailurePolicy::Skip),
            &client_for(&server),
            &SilentProgress,
        )
        .await
        .expect("skip policy keeps the run alive");

        assert_eq!(summary.written, 2);
        assert_eq!(summary.skipped_write, 1);
        assert_eq!(enriched(&db, 1).await.unwrap().company_name, "Acme");
        assert_eq!(enriched(&db, 3).await.unwrap().company_name, "Initech");
    }

    #[tokio::test]
    async fn missing_database_fails_before_any_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(company("Acme"))
            .expect(0)
            .mount(&server)
            .await;

        let db = DatabaseConfig {
            path: std::env::temp_dir().join(format!("enricher_absent_{}.db", Uuid::now_v7())),
            ..Default::default()
        };
        let err = run_enrichment(
            &run_config(db, WriteFailurePolicy::Abort),
            &client_for(&server),
            &SilentProgress,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, EnricherError::Connection(_)));
    }

    #[tokio::test]
    async fn missing_source_table_is_query_error() {
        let server = MockServer::start().await;
        let mut db = seeded_db(&[]).await;
        db.source_table = "companies_v2".into();

        let err = run_enrichment(
            &run_config(db, WriteFailurePolicy::Abort),
            &client_for(&server),
            &SilentProgress,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, EnricherError::Query(_)));
    }

    #[tokio::test]
    async fn empty_source_commits_empty_run() {
        let server = MockServer::start().await;
        let db = seeded_db(&[]).await;

        let summary = run_enrichment(
            &run_config(db, WriteFailurePolicy::Abort),
            &client_for(&server),
            &SilentProgress,
        )
        .await
        .unwrap();

        assert_eq!(summary.fetched, 0);
        assert_eq!(summary.skipped(), 0);
    }
}
