//! Heartbeat-based presence classification.
//!
//! # Design
//! - A device reports two independent liveness signals: the desktop client and
//!   the background service. Each is classified on its own.
//! - Verdicts are a pure function of `(now, last heartbeat, configured delay)`.
//!   Nothing is cached; callers recompute on every render or poll.
//! - Missing or unparsable timestamps read as offline, never as an error.
//! - The grace windows are asymmetric: 1.5x the configured delay for the client
//!   and 2.5x for the service, whose cadence is looser.

use std::fmt::{self, Display, Formatter};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Heartbeat delay applied when the backend does not supply one.
pub const DEFAULT_HEARTBEAT_DELAY_SECS: u64 = 60;

/// Client grace window in milliseconds per configured delay second (1.5x).
pub const CLIENT_GRACE_MS_PER_SEC: i64 = 1_500;

/// Service grace window in milliseconds per configured delay second (2.5x).
pub const SERVICE_GRACE_MS_PER_SEC: i64 = 2_500;

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Online/offline verdict for one process on a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    /// Heartbeat observed inside the grace window.
    Online,
    /// Heartbeat missing, unreadable, or older than the grace window.
    Offline,
}

impl Presence {
    /// Stable lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }

    /// Convenience predicate for filters and tallies.
    #[must_use]
    pub const fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

impl Display for Presence {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.pad(self.as_str())
    }
}

/// Heartbeat delay thresholds, in seconds, as configured on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceConfig {
    /// Expected interval between client heartbeats.
    pub client_heartbeat_delay_secs: u64,
    /// Expected interval between service heartbeats.
    pub service_heartbeat_delay_secs: u64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            client_heartbeat_delay_secs: DEFAULT_HEARTBEAT_DELAY_SECS,
            service_heartbeat_delay_secs: DEFAULT_HEARTBEAT_DELAY_SECS,
        }
    }
}

/// Presence verdicts for both processes of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatuses {
    /// Verdict for the desktop client process.
    pub client_status: Presence,
    /// Verdict for the background service process.
    pub service_status: Presence,
}

/// Raw last-heartbeat timestamps as received from the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeartbeatRecord<'a> {
    /// Last time the client process reported in.
    pub last_client_heartbeat: Option<&'a str>,
    /// Last time the background service reported in.
    pub last_service_heartbeat: Option<&'a str>,
}

impl HeartbeatRecord<'_> {
    /// Classify both heartbeats against `config` at instant `now`.
    #[must_use]
    pub fn statuses(&self, now: DateTime<Utc>, config: &PresenceConfig) -> DeviceStatuses {
        device_statuses(
            now,
            self.last_client_heartbeat,
            self.last_service_heartbeat,
            config,
        )
    }
}

/// Classify a device's client and service heartbeats.
#[must_use]
pub fn device_statuses(
    now: DateTime<Utc>,
    last_client_heartbeat: Option<&str>,
    last_service_heartbeat: Option<&str>,
    config: &PresenceConfig,
) -> DeviceStatuses {
    DeviceStatuses {
        client_status: classify(
            now,
            last_client_heartbeat.and_then(parse_heartbeat),
            config.client_heartbeat_delay_secs,
            CLIENT_GRACE_MS_PER_SEC,
        ),
        service_status: classify(
            now,
            last_service_heartbeat.and_then(parse_heartbeat),
            config.service_heartbeat_delay_secs,
            SERVICE_GRACE_MS_PER_SEC,
        ),
    }
}

/// Compare one heartbeat against its grace window.
///
/// The window is `delay_secs * grace_ms_per_sec` milliseconds and is inclusive.
/// Heartbeats stamped in the future count as online.
#[must_use]
pub fn classify(
    now: DateTime<Utc>,
    heartbeat: Option<DateTime<Utc>>,
    delay_secs: u64,
    grace_ms_per_sec: i64,
) -> Presence {
    let Some(heartbeat) = heartbeat else {
        return Presence::Offline;
    };
    let elapsed_ms = now.signed_duration_since(heartbeat).num_milliseconds();
    let window_ms = i64::try_from(delay_secs)
        .unwrap_or(i64::MAX)
        .saturating_mul(grace_ms_per_sec);
    if elapsed_ms <= window_ms {
        Presence::Online
    } else {
        Presence::Offline
    }
}

/// Parse an ISO-8601 heartbeat timestamp.
///
/// Offsets are honoured, with or without a colon; timestamps without one are
/// taken as UTC and a bare date as UTC midnight. Returns `None` for blank or
/// unreadable input.
#[must_use]
pub fn parse_heartbeat(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Some(parsed) = OFFSET_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(trimmed, format).ok())
    {
        return Some(parsed.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

/// Running count of online processes across a set of devices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceTally {
    /// Devices recorded.
    pub total: u64,
    /// Devices whose client is online.
    pub client_online: u64,
    /// Devices whose service is online.
    pub service_online: u64,
}

impl PresenceTally {
    /// Add one device's verdicts.
    pub const fn record(&mut self, statuses: DeviceStatuses) {
        self.total += 1;
        if statuses.client_status.is_online() {
            self.client_online += 1;
        }
        if statuses.service_status.is_online() {
            self.service_online += 1;
        }
    }

    /// Devices whose client is offline.
    #[must_use]
    pub const fn client_offline(&self) -> u64 {
        self.total - self.client_online
    }
}

impl FromIterator<DeviceStatuses> for PresenceTally {
    fn from_iter<I: IntoIterator<Item = DeviceStatuses>>(iter: I) -> Self {
        let mut tally = Self::default();
        for statuses in iter {
            tally.record(statuses);
        }
        tally
    }
}
