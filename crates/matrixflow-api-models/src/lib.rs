#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
//! Shared HTTP DTOs for the matrixFlow backend API.
//!
//! The backend speaks camelCase JSON. Heartbeat timestamps are kept as raw
//! strings so that malformed values reach the presence classifier (which reads
//! them as offline) instead of failing the whole response.
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use matrixflow_core::{ActivityRow, HeartbeatRecord, PresenceConfig};
pub use matrixflow_core::{DEFAULT_HEARTBEAT_DELAY_SECS, UsageEntry};

/// Error document returned by the backend on non-2xx responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Human-readable explanation.
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Short error label (for example `Unauthorized`).
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// HTTP status echoed by the backend.
    pub status_code: Option<u16>,
}

impl ApiErrorBody {
    /// Best available description, preferring `message` over `error`.
    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.message
            .as_deref()
            .or(self.error.as_deref())
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }
}

/// Credentials posted to the login endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginRequest {
    /// Operator account name.
    pub username: String,
    /// Operator password.
    pub password: String,
}

/// Token issued after a successful login.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Bearer token for subsequent requests.
    #[serde(alias = "accessToken")]
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Expiry as reported by the backend, if any.
    pub expires_at: Option<String>,
}

/// One page of a list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Rows on this page.
    #[serde(alias = "data")]
    pub items: Vec<T>,
    #[serde(default)]
    /// Rows across all pages.
    pub total: u64,
    #[serde(default = "first_page")]
    /// 1-based page number.
    pub page: u32,
    #[serde(default)]
    /// Requested page size.
    pub limit: u32,
}

const fn first_page() -> u32 {
    1
}

/// Operator-maintained assignment metadata for a device.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceAssignment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Person the device is assigned to.
    pub assigned_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Owning department.
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Physical location.
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Free-form notes.
    pub notes: Option<String>,
}

/// Device as listed by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Backend identifier.
    #[serde(alias = "_id")]
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Reported hostname.
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Operating system description.
    pub os: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Last known IP address.
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Installed client version.
    pub client_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// ISO-8601 time of the last client heartbeat.
    pub last_client_heartbeat: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// ISO-8601 time of the last service heartbeat.
    pub last_service_heartbeat: Option<String>,
    #[serde(default)]
    /// Assignment metadata.
    pub assignment: DeviceAssignment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Registration time.
    pub created_at: Option<DateTime<Utc>>,
}

impl Device {
    /// Raw heartbeat timestamps for presence classification.
    #[must_use]
    pub fn heartbeats(&self) -> HeartbeatRecord<'_> {
        HeartbeatRecord {
            last_client_heartbeat: self.last_client_heartbeat.as_deref(),
            last_service_heartbeat: self.last_service_heartbeat.as_deref(),
        }
    }

    /// Name for display, falling back to hostname then identifier.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if !self.name.trim().is_empty() {
            return &self.name;
        }
        self.hostname
            .as_deref()
            .filter(|host| !host.trim().is_empty())
            .unwrap_or(self.id.as_str())
    }
}

/// Partial assignment update; omitted fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// New assignee.
    pub assigned_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// New department.
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// New location.
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// New notes.
    pub notes: Option<String>,
}

impl AssignmentUpdate {
    /// `true` when no field would change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.assigned_user.is_none()
            && self.department.is_none()
            && self.location.is_none()
            && self.notes.is_none()
    }
}

/// Per-device, per-day activity aggregate computed by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    #[serde(default, alias = "_id")]
    /// Backend identifier.
    pub id: String,
    #[serde(default)]
    /// Device the row belongs to.
    pub device_id: String,
    /// Calendar day covered by the row.
    pub date: NaiveDate,
    #[serde(default)]
    /// Seconds with user input.
    pub active_seconds: u64,
    #[serde(default)]
    /// Seconds without user input.
    pub idle_seconds: u64,
    #[serde(default)]
    /// Applications ranked by foreground time.
    pub top_apps: Vec<UsageEntry>,
    #[serde(default, alias = "topWindowTitles")]
    /// Window titles ranked by foreground time.
    pub top_titles: Vec<UsageEntry>,
}

impl ActivityRow for ActivityLog {
    fn active_seconds(&self) -> u64 {
        self.active_seconds
    }

    fn idle_seconds(&self) -> u64 {
        self.idle_seconds
    }

    fn top_apps(&self) -> &[UsageEntry] {
        &self.top_apps
    }

    fn top_titles(&self) -> &[UsageEntry] {
        &self.top_titles
    }
}

/// Remote command submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandRequest {
    /// Command name understood by the device client.
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Command-specific arguments.
    pub payload: Option<Value>,
}

/// Lifecycle of a queued remote command.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    /// Queued on the backend.
    Pending,
    /// Delivered to the device.
    Sent,
    /// Executed successfully.
    Completed,
    /// Execution failed or timed out.
    Failed,
    /// Status not recognised by this client.
    #[serde(other)]
    Unknown,
}

impl CommandStatus {
    /// Stable lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }
}

/// Remote command as tracked by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCommand {
    /// Backend identifier.
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    /// Target device.
    pub device_id: String,
    /// Command name.
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Command-specific arguments.
    pub payload: Option<Value>,
    /// Current status.
    pub status: CommandStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Output or failure detail reported by the device.
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Queue time.
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Completion time.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Fleet-wide activity report for a date range.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Start of the reported range.
    pub from: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// End of the reported range.
    pub to: Option<NaiveDate>,
    #[serde(default)]
    /// Registered devices.
    pub total_devices: u64,
    #[serde(default)]
    /// Devices with any activity in range.
    pub active_devices: u64,
    #[serde(default)]
    /// Summed active seconds.
    pub total_active_seconds: u64,
    #[serde(default)]
    /// Summed idle seconds.
    pub total_idle_seconds: u64,
    #[serde(default)]
    /// Applications ranked by foreground time.
    pub top_apps: Vec<UsageEntry>,
    #[serde(default, alias = "topWindowTitles")]
    /// Window titles ranked by foreground time.
    pub top_titles: Vec<UsageEntry>,
}

/// Error reported by a device or the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLog {
    /// Backend identifier.
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Reporting device, when known.
    pub device_id: Option<String>,
    #[serde(default = "default_level")]
    /// Severity label.
    pub level: String,
    /// Error text.
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Component that raised the error.
    pub source: Option<String>,
    /// Time the error occurred.
    #[serde(alias = "createdAt")]
    pub occurred_at: DateTime<Utc>,
}

fn default_level() -> String {
    "error".to_string()
}

/// Presence thresholds stored on the backend, in seconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PresenceSettings {
    #[serde(default = "default_delay")]
    /// Expected interval between client heartbeats.
    pub client_heartbeat_delay: u64,
    #[serde(default = "default_delay")]
    /// Expected interval between service heartbeats.
    pub service_heartbeat_delay: u64,
}

const fn default_delay() -> u64 {
    DEFAULT_HEARTBEAT_DELAY_SECS
}

impl Default for PresenceSettings {
    fn default() -> Self {
        Self {
            client_heartbeat_delay: DEFAULT_HEARTBEAT_DELAY_SECS,
            service_heartbeat_delay: DEFAULT_HEARTBEAT_DELAY_SECS,
        }
    }
}

impl From<PresenceSettings> for PresenceConfig {
    fn from(value: PresenceSettings) -> Self {
        Self {
            client_heartbeat_delay_secs: value.client_heartbeat_delay,
            service_heartbeat_delay_secs: value.service_heartbeat_delay,
        }
    }
}

/// Partial presence-threshold update.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PresenceSettingsUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// New client heartbeat delay.
    pub client_heartbeat_delay: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// New service heartbeat delay.
    pub service_heartbeat_delay: Option<u64>,
}

impl PresenceSettingsUpdate {
    /// `true` when no threshold would change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.client_heartbeat_delay.is_none() && self.service_heartbeat_delay.is_none()
    }
}
