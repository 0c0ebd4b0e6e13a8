//! Roster feed: fetching, parsing and the manual retry loop.

use std::{
    fs,
    io::{self, BufRead, Write},
    path::PathBuf,
    time::Duration,
};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use deadline_orbit_core::{RosterEntry, SlotId, Timestamp, WEEK_MS};
use deadline_orbit_rendering::FeedState;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Where the roster comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum FeedSource {
    /// JSON array stored on disk.
    File(PathBuf),
    /// JSON array served over HTTP.
    Url(String),
    /// Synthetic roster generated from a seed.
    Demo { count: usize, seed: u64 },
}

/// Errors raised while loading the roster.
#[derive(Debug, Error)]
pub(crate) enum FeedError {
    #[error("failed to read roster at {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to fetch roster")]
    Fetch(#[from] reqwest::Error),
    #[error("roster request returned status {0}")]
    Status(u16),
    #[error("roster is not valid json")]
    Parse(#[from] serde_json::Error),
    #[error("unrecognised date `{value}` for `{login}`")]
    Timestamp { login: String, value: String },
}

/// Record as delivered by the roster feed.
#[derive(Clone, Debug, Deserialize, PartialEq)]
struct RosterRecord {
    login: String,
    #[serde(default)]
    image: Option<String>,
    date: RawDate,
    #[serde(default)]
    host: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
enum RawDate {
    Millis(i64),
    Text(String),
}

/// Parses a feed timestamp: epoch milliseconds, RFC 3339, a naive ISO-8601
/// date-time (read as UTC) or a plain date.
pub(crate) fn parse_timestamp(value: &str) -> Option<Timestamp> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(Timestamp::from_millis(parsed.timestamp_millis()));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Timestamp::from_millis(parsed.and_utc().timestamp_millis()));
        }
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Some(Timestamp::from_millis(midnight.and_utc().timestamp_millis()))
}

/// Parses a roster JSON array, preserving input order.
pub(crate) fn parse_roster(json: &str) -> Result<Vec<RosterEntry>, FeedError> {
    let records: Vec<RosterRecord> = serde_json::from_str(json)?;
    records
        .into_iter()
        .map(|record| {
            let deadline = match &record.date {
                RawDate::Millis(millis) => Timestamp::from_millis(*millis),
                RawDate::Text(text) => parse_timestamp(text).ok_or_else(|| FeedError::Timestamp {
                    login: record.login.clone(),
                    value: text.clone(),
                })?,
            };
            let entry = RosterEntry::new(record.login, record.image.unwrap_or_default(), deadline);
            Ok(match record.host.filter(|host| !host.trim().is_empty()) {
                Some(host) => entry.with_slot(SlotId::new(host)),
                None => entry,
            })
        })
        .collect()
}

/// Generates a synthetic roster spread from three weeks overdue to twelve
/// weeks ahead of `now`.
pub(crate) fn demo_roster(count: usize, seed: u64, now: Timestamp) -> Vec<RosterEntry> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|index| {
            let offset = rng.gen_range(-3 * WEEK_MS..12 * WEEK_MS);
            let host = format!(
                "e{}r{}p{}",
                rng.gen_range(1..=3),
                rng.gen_range(1..=12),
                rng.gen_range(1..=8)
            );
            RosterEntry::new(format!("cadet{index:03}"), "", now.offset_by(offset))
                .with_slot(SlotId::new(host))
        })
        .collect()
}

/// Loads the roster once.
pub(crate) fn load(source: &FeedSource, now: Timestamp) -> Result<Vec<RosterEntry>, FeedError> {
    match source {
        FeedSource::File(path) => {
            let json = fs::read_to_string(path).map_err(|source| FeedError::Read {
                path: path.clone(),
                source,
            })?;
            parse_roster(&json)
        }
        FeedSource::Url(url) => {
            let client = reqwest::blocking::Client::builder()
                .timeout(FETCH_TIMEOUT)
                .build()?;
            let response = client.get(url).send()?;
            let status = response.status();
            if !status.is_success() {
                return Err(FeedError::Status(status.as_u16()));
            }
            parse_roster(&response.text()?)
        }
        FeedSource::Demo { count, seed } => Ok(demo_roster(*count, *seed, now)),
    }
}

/// Loads the roster, offering a manual retry after each failure.
///
/// The feed indicator is updated on every attempt. Pressing Enter retries;
/// end of input gives up with the last error.
pub(crate) fn load_with_retry<R, W>(
    source: &FeedSource,
    now: Timestamp,
    state: &mut FeedState,
    input: &mut R,
    prompt: &mut W,
) -> Result<Vec<RosterEntry>, FeedError>
where
    R: BufRead,
    W: Write,
{
    loop {
        *state = FeedState::Loading;
        let error = match load(source, now) {
            Ok(roster) => {
                info!(entries = roster.len(), "roster loaded");
                *state = FeedState::Ready;
                return Ok(roster);
            }
            Err(error) => error,
        };

        warn!(%error, "roster unavailable");
        *state = FeedState::Unavailable {
            reason: error.to_string(),
        };
        let _ = writeln!(prompt, "{state}. Press Enter to retry, Ctrl-D to quit.");
        let _ = prompt.flush();

        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) | Err(_) => return Err(error),
            Ok(_) => {}
        }
    }
}
