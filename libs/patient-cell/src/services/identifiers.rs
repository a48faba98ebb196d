use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rand::Rng;
use regex::Regex;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use shared_database::supabase::SupabaseClient;

use crate::models::{BarcodeInfo, PatientError};

/// Attempt ceiling for the UHID random-suffix loop. Only 10,000 suffixes
/// exist per month, so near exhaustion the loop can spin; it gives up well
/// before that with a generation error.
const MAX_UHID_ATTEMPTS: u32 = 1000;

/// Format a UHID for a given date and 4-digit suffix: `AH{YY}{MM}{suffix}`.
pub fn format_uhid(date: NaiveDate, suffix: u32) -> String {
    format!("AH{:02}{:02}{:04}", date.year() % 100, date.month(), suffix % 10000)
}

/// Wristband barcode for a registration instant:
/// `BARS{YYYY}{MM}{last4-of-epoch-millis}`. The millisecond tail makes
/// same-month collisions unlikely but not impossible.
pub fn generate_barcode_id(at: DateTime<Utc>) -> String {
    let millis = at.timestamp_millis();
    format!("BARS{}{:02}{:04}", at.year(), at.month(), millis.rem_euclid(10000))
}

/// Parse the year and month back out of a wristband barcode. Returns `None`
/// for anything that does not match the generated shape.
pub fn extract_barcode_info(barcode: &str) -> Option<BarcodeInfo> {
    let re = Regex::new(r"^BARS(\d{4})(\d{2})\d{4}$").ok()?;
    let caps = re.captures(barcode)?;

    let year: i32 = caps.get(1)?.as_str().parse().ok()?;
    let month: u32 = caps.get(2)?.as_str().parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }

    Some(BarcodeInfo { year, month })
}

/// Draw random month-scoped UHIDs until one is free. Each candidate costs a
/// point lookup; uniqueness still ultimately rests on the database's unique
/// constraint, this loop just keeps retries out of the insert path.
pub async fn generate_uhid(
    supabase: &SupabaseClient,
    auth_token: &str,
    now: DateTime<Utc>,
) -> Result<String, PatientError> {
    let today = now.date_naive();

    for attempt in 0..MAX_UHID_ATTEMPTS {
        let candidate = format_uhid(today, rand::thread_rng().gen_range(0..10000));

        let path = format!("/rest/v1/patients?uhid=eq.{}&select=id", candidate);
        let existing: Vec<Value> = supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        if existing.is_empty() {
            debug!("UHID {} free after {} attempt(s)", candidate, attempt + 1);
            return Ok(candidate);
        }
    }

    Err(PatientError::GenerationError(format!(
        "No free UHID found in {} attempts",
        MAX_UHID_ATTEMPTS
    )))
}
