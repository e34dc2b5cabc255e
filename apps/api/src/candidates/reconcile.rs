use std::fmt::{self, Write as _};
use std::future::Future;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::backend::BackendError;
use crate::candidates::extraction::{extract_contact, ContactDetails, NOT_AVAILABLE};
use crate::config::{Config, DEFAULT_DISPLAY_DATE_FORMAT};
use crate::models::candidate::CandidateAnalysis;

/// Identity of a candidate within one job's board.
///
/// Backend ids and list positions live in separate spaces so that a
/// positional fallback can never be mistaken for a backend record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CandidateId {
    Backend(i64),
    /// 1-based position in the job's file list.
    Positional(usize),
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateId::Backend(id) => write!(f, "b:{id}"),
            CandidateId::Positional(n) => write!(f, "p:{n}"),
        }
    }
}

impl FromStr for CandidateId {
    type Err = String;

    /// Parses the `b:<id>` / `p:<position>` path form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, value) = s
            .split_once(':')
            .ok_or_else(|| format!("candidate id '{s}' must look like b:<id> or p:<position>"))?;
        match kind {
            "b" => value
                .parse()
                .map(CandidateId::Backend)
                .map_err(|_| format!("invalid backend id in '{s}'")),
            "p" => match value.parse::<usize>() {
                Ok(n) if n > 0 => Ok(CandidateId::Positional(n)),
                _ => Err(format!("invalid position in '{s}'")),
            },
            _ => Err(format!("unknown candidate id kind in '{s}'")),
        }
    }
}

/// One row of the candidate board. Derived on every rebuild, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateRecord {
    pub id: CandidateId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub cv_filename: String,
    pub created_at: String,
}

impl CandidateRecord {
    /// Placeholder for a file whose analysis is missing or unusable.
    pub fn degraded(position: usize, cv_filename: &str) -> Self {
        let ContactDetails { name, email, phone } = ContactDetails::sentinel();
        Self {
            id: CandidateId::Positional(position + 1),
            name,
            email,
            phone,
            cv_filename: cv_filename.to_string(),
            created_at: NOT_AVAILABLE.to_string(),
        }
    }

    /// The combined contact column: `"{email} / {phone}"`.
    pub fn contact(&self) -> String {
        format!("{} / {}", self.email, self.phone)
    }
}

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Maximum lookups in flight at once.
    pub concurrency: usize,
    pub date_format: String,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            concurrency: 8,
            date_format: DEFAULT_DISPLAY_DATE_FORMAT.to_string(),
        }
    }
}

impl From<&Config> for ReconcileOptions {
    fn from(config: &Config) -> Self {
        Self {
            concurrency: config.lookup_concurrency.max(1),
            date_format: config.display_date_format.clone(),
        }
    }
}

/// Fans out one analysis lookup per file and joins them into records.
///
/// Output order is file-list order whatever order the lookups settle in, and
/// the list is only returned once every lookup has settled. A lookup that
/// fails, finds nothing, or returns an unusable blob degrades to a
/// placeholder record instead of failing the batch.
pub async fn reconcile_candidates<F, Fut>(
    files: &[String],
    lookup: F,
    options: &ReconcileOptions,
) -> Vec<CandidateRecord>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<Option<CandidateAnalysis>, BackendError>>,
{
    let outcomes: Vec<(usize, String, Result<Option<CandidateAnalysis>, BackendError>)> =
        stream::iter(files.to_vec().into_iter().enumerate())
            .map(|(position, file)| {
                let fetch = lookup(file.clone());
                async move { (position, file, fetch.await) }
            })
            .buffered(options.concurrency.max(1))
            .collect()
            .await;

    let records: Vec<CandidateRecord> = outcomes
        .into_iter()
        .map(|(position, file, outcome)| {
            build_record(position, &file, outcome, &options.date_format)
        })
        .collect();

    debug!("Reconciled {} candidate records", records.len());
    records
}

fn build_record(
    position: usize,
    cv_filename: &str,
    outcome: Result<Option<CandidateAnalysis>, BackendError>,
    date_format: &str,
) -> CandidateRecord {
    let analysis = match outcome {
        Ok(Some(analysis)) => analysis,
        Ok(None) => {
            debug!("No analysis stored for {}", cv_filename);
            return CandidateRecord::degraded(position, cv_filename);
        }
        Err(e) => {
            warn!("Failed to fetch analysis for {}: {}", cv_filename, e);
            return CandidateRecord::degraded(position, cv_filename);
        }
    };

    let Some(raw) = analysis.blob() else {
        return CandidateRecord::degraded(position, cv_filename);
    };

    let blob = match serde_json::from_str(raw) {
        Ok(blob) => blob,
        Err(e) => {
            warn!("Analysis for {} is not valid JSON: {}", cv_filename, e);
            return CandidateRecord::degraded(position, cv_filename);
        }
    };

    let ContactDetails { name, email, phone } = extract_contact(&blob);
    CandidateRecord {
        id: analysis
            .backend_id()
            .map(CandidateId::Backend)
            .unwrap_or(CandidateId::Positional(position + 1)),
        name,
        email,
        phone,
        cv_filename: cv_filename.to_string(),
        created_at: format_display_date(analysis.created_at.as_deref(), date_format),
    }
}

/// Renders a backend timestamp as a calendar date, `"N/A"` when unparseable.
///
/// Accepts RFC 3339, naive ISO datetimes (what the backend stores) and bare
/// dates. A format string chrono rejects falls back to ISO dates.
pub fn format_display_date(raw: Option<&str>, date_format: &str) -> String {
    let Some(date) = raw.map(str::trim).and_then(parse_date) else {
        return NOT_AVAILABLE.to_string();
    };

    let mut rendered = String::new();
    if write!(rendered, "{}", date.format(date_format)).is_err() {
        return date.format("%Y-%m-%d").to_string();
    }
    rendered
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
}
