//! Typed schema for the profile API response and its mapping to
//! [`EnrichedRecord`].
//!
//! Only the fields we persist are modeled. Anything missing or `null`
//! defaults to an empty string (or zero for the follower count), and every
//! string is trimmed.

use enricher_shared::{EnrichedRecord, EnricherError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body sent to the profile endpoint.
#[derive(Debug, Serialize)]
pub(crate) struct ProfileRequest<'a> {
    pub link: &'a str,
}

/// Top-level response envelope.
#[derive(Debug, Deserialize)]
struct ProfileResponse {
    #[serde(default)]
    data: Option<Value>,
}

/// The `data` object of a successful lookup.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompanyData {
    follower_count: Option<serde_json::Number>,
    tagline: Option<String>,
    industry: Option<String>,
    headquarter: Option<Headquarter>,
    company_name: Option<String>,
    url: Option<String>,
    website_url: Option<String>,
    logo_resolution_result: Option<String>,
    cropped_cover_image: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Headquarter {
    country: Option<String>,
    city: Option<String>,
    geographic_area: Option<String>,
    postal_code: Option<String>,
}

/// Decode a response body into an enriched record.
///
/// Returns `Ok(None)` when `data` is absent or empty, or when every mapped
/// field ends up empty. A body that is not JSON, or whose fields have the
/// wrong types, is an [`EnricherError::Decode`].
pub fn parse_profile(body: &str) -> Result<Option<EnrichedRecord>> {
    let response: ProfileResponse =
        serde_json::from_str(body).map_err(|e| EnricherError::Decode(e.to_string()))?;

    let data = match response.data {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Object(map)) if map.is_empty() => return Ok(None),
        Some(Value::Array(items)) if items.is_empty() => return Ok(None),
        Some(value @ Value::Object(_)) => serde_json::from_value::<CompanyData>(value)
            .map_err(|e| EnricherError::Decode(format!("data: {e}")))?,
        Some(other) => {
            return Err(EnricherError::Decode(format!(
                "data: expected an object, got {other}"
            )));
        }
    };

    let record = data.into_record()?;
    if record.is_empty() {
        return Ok(None);
    }
    Ok(Some(record))
}

impl CompanyData {
    fn into_record(self) -> Result<EnrichedRecord> {
        let follower_count = match self.follower_count.as_ref() {
            Some(n) => follower_count(n)?,
            None => 0,
        };
        let hq = self.headquarter.unwrap_or_default();
        Ok(EnrichedRecord {
            follower_count,
            tagline: clean(self.tagline),
            industry: clean(self.industry),
            country: clean(hq.country),
            city: clean(hq.city),
            geographic_area: clean(hq.geographic_area),
            postal_code: clean(hq.postal_code),
            company_name: clean(self.company_name),
            url: clean(self.url),
            website_url: clean(self.website_url),
            logo_resolution_result: clean(self.logo_resolution_result),
            cropped_cover_image: clean(self.cropped_cover_image),
        })
    }
}

fn clean(value: Option<String>) -> String {
    value.map(|s| s.trim().to_string()).unwrap_or_default()
}

/// Largest count the sink's signed INTEGER column can hold.
const MAX_FOLLOWER_COUNT: u64 = i64::MAX as u64;

/// Negative counts read as 0 and fractional values are truncated. Anything
/// above [`MAX_FOLLOWER_COUNT`] is a decode error for this response.
fn follower_count(n: &serde_json::Number) -> Result<u64> {
    let count = match (n.as_u64(), n.as_i64(), n.as_f64()) {
        (Some(v), _, _) => Some(v),
        (None, Some(_), _) => Some(0),
        (None, None, Some(f)) if f < 0.0 => Some(0),
        (None, None, Some(f)) if f < MAX_FOLLOWER_COUNT as f64 => Some(f as u64),
        _ => None,
    };
    count
        .filter(|c| *c <= MAX_FOLLOWER_COUNT)
        .ok_or_else(|| EnricherError::Decode(format!("data.followerCount: {n} out of range")))
}
