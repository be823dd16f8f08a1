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
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Domain logic shared by the matrixFlow admin tooling.
//!
//! Everything here is pure: no I/O, no clocks read behind the caller's back.
//! Layout: `presence.rs` (heartbeat-based online/offline verdicts),
//! `activity.rs` (summing a page of activity rows), `range.rs` (date filters),
//! `page.rs` (pagination requests), `error.rs` (validation errors).

pub mod activity;
pub mod error;
pub mod page;
pub mod presence;
pub mod range;

pub use activity::{ActivityRow, ActivityTotals, UsageEntry, format_duration};
pub use error::{PageError, RangeError};
pub use page::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT, PageRequest, total_pages};
pub use presence::{
    CLIENT_GRACE_MS_PER_SEC, DEFAULT_HEARTBEAT_DELAY_SECS, DeviceStatuses, HeartbeatRecord,
    Presence, PresenceConfig, PresenceTally, SERVICE_GRACE_MS_PER_SEC, classify, device_statuses,
    parse_heartbeat,
};
pub use range::DateRange;
