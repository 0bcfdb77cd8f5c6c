//! Core domain types for the enrichment run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one enrichment run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A candidate row read from the upstream company table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    /// Company identifier (primary key upstream).
    pub id: i64,
    /// Reference to the company's external profile.
    pub profile_url: String,
}

/// Flat attribute record built from one profile API response.
///
/// Every field defaults to empty/zero. A record with nothing set is
/// considered "no data" and is never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub follower_count: u64,
    pub tagline: String,
    pub industry: String,
    pub country: String,
    pub city: String,
    pub geographic_area: String,
    pub postal_code: String,
    pub company_name: String,
    pub url: String,
    pub website_url: String,
    pub logo_resolution_result: String,
    pub cropped_cover_image: String,
}

impl EnrichedRecord {
    /// True when every field is empty or zero.
    pub fn is_empty(&self) -> bool {
        self.follower_count == 0 && self.text_fields().iter().all(|s| s.is_empty())
    }

    /// The string columns in sink order (after `follower_count`).
    pub fn text_fields(&self) -> [&str; 11] {
        [
            self.tagline.as_str(),
            self.industry.as_str(),
            self.country.as_str(),
            self.city.as_str(),
            self.geographic_area.as_str(),
            self.postal_code.as_str(),
            self.company_name.as_str(),
            self.url.as_str(),
            self.website_url.as_str(),
            self.logo_resolution_result.as_str(),
            self.cropped_cover_image.as_str(),
        ]
    }
}

// ---------------------------------------------------------------------------
// Run accounting
// ---------------------------------------------------------------------------

/// Why a source row produced no sink row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The API answered but had nothing useful under `data`.
    NoData,
    /// The request failed or returned a non-2xx status.
    Transport,
    /// The response body could not be decoded.
    Decode,
    /// The insert failed and the write-failure policy is `skip`.
    WriteFailed,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NoData => "no data",
            Self::Transport => "transport failure",
            Self::Decode => "decode failure",
            Self::WriteFailed => "write failed",
        };
        f.write_str(s)
    }
}

/// Counters and timing for one committed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Source rows returned by the reader.
    pub fetched: usize,
    /// Rows inserted into the sink.
    pub written: usize,
    pub skipped_no_data: usize,
    pub skipped_transport: usize,
    pub skipped_decode: usize,
    pub skipped_write: usize,
}

impl RunSummary {
    /// Start an empty summary for a new run.
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            finished_at: None,
            fetched: 0,
            written: 0,
            skipped_no_data: 0,
            skipped_transport: 0,
            skipped_decode: 0,
            skipped_write: 0,
        }
    }

    /// Count one skipped row.
    pub fn record_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::NoData => self.skipped_no_data += 1,
            SkipReason::Transport => self.skipped_transport += 1,
            SkipReason::Decode => self.skipped_decode += 1,
            SkipReason::WriteFailed => self.skipped_write += 1,
        }
    }

    /// Total rows that produced no sink row.
    pub fn skipped(&self) -> usize {
        self.skipped_no_data + self.skipped_transport + self.skipped_decode + self.skipped_write
    }

    /// Mark the run as finished now.
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Wall-clock duration, if the run has finished.
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }
}
