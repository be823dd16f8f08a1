use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use matrixflow_core::{DeviceStatuses, MAX_PAGE_LIMIT, PageRequest, Presence};
use serde::Serialize;
use tracing::{debug, warn};

use crate::cli::{OutputFormat, WatchArgs};
use crate::client::{AppContext, CliError, CliResult};
use crate::commands::config::fetch_presence_config;
use crate::commands::devices::{DeviceListView, DeviceQuery, build_list_view, fetch_device_page};
use crate::output::{render_transition, render_watch_frame};

/// Which heartbeat a transition refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Channel {
    Client,
    Service,
}

impl Channel {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Service => "service",
        }
    }
}

/// A device whose client or service changed state between two polls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Transition {
    pub(crate) device_id: String,
    pub(crate) name: String,
    pub(crate) channel: Channel,
    pub(crate) from: Presence,
    pub(crate) to: Presence,
    pub(crate) observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SnapshotEntry {
    name: String,
    statuses: DeviceStatuses,
}

/// Verdicts from one poll, keyed by device id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PresenceSnapshot {
    observed_at: DateTime<Utc>,
    devices: BTreeMap<String, SnapshotEntry>,
}

impl PresenceSnapshot {
    pub(crate) fn from_view(view: &DeviceListView<'_>) -> Self {
        let devices = view
            .items
            .iter()
            .map(|item| {
                (
                    item.device.id.clone(),
                    SnapshotEntry {
                        name: item.device.display_name().to_string(),
                        statuses: item.statuses,
                    },
                )
            })
            .collect();
        Self {
            observed_at: view.observed_at,
            devices,
        }
    }
}

/// Changes between two snapshots, ordered by device id then channel. Devices
/// missing from either snapshot are skipped.
pub(crate) fn diff_presence(
    previous: &PresenceSnapshot,
    current: &PresenceSnapshot,
) -> Vec<Transition> {
    let observed_at = current.observed_at;
    let mut transitions = Vec::new();
    for (id, now) in &current.devices {
        let Some(before) = previous.devices.get(id) else {
            continue;
        };
        let pairs = [
            (
                Channel::Client,
                before.statuses.client_status,
                now.statuses.client_status,
            ),
            (
                Channel::Service,
                before.statuses.service_status,
                now.statuses.service_status,
            ),
        ];
        for (channel, from, to) in pairs {
            if from != to {
                transitions.push(Transition {
                    device_id: id.clone(),
                    name: now.name.clone(),
                    channel,
                    from,
                    to,
                    observed_at,
                });
            }
        }
    }
    transitions
}

pub(crate) async fn handle_watch(
    ctx: &AppContext,
    args: WatchArgs,
    output: OutputFormat,
) -> CliResult<()> {
    ctx.token()?;
    let query = DeviceQuery {
        page: PageRequest::new(None, Some(MAX_PAGE_LIMIT))?,
        search: args.search.as_deref(),
    };
    let interval = Duration::from_secs(args.interval);
    let mut previous: Option<PresenceSnapshot> = None;
    let mut polls: u64 = 0;
    let mut last_failure: Option<String> = None;

    loop {
        match fetch_device_page(ctx, &query).await {
            Ok(page) => {
                let config = fetch_presence_config(ctx).await;
                let view = build_list_view(&page, &config, Utc::now(), None);
                let current = PresenceSnapshot::from_view(&view);
                match &previous {
                    None => render_watch_frame(&view, output)?,
                    Some(before) => {
                        let transitions = diff_presence(before, &current);
                        debug!(changes = transitions.len(), "presence poll complete");
                        for transition in &transitions {
                            render_transition(transition, output)?;
                        }
                    }
                }
                previous = Some(current);
            }
            Err(err) => last_failure = Some(report_poll_failure(err, args.interval)?),
        }

        polls += 1;
        if args.count.is_some_and(|limit| polls >= limit) {
            return match (&previous, last_failure) {
                (None, Some(message)) => Err(CliError::failure(anyhow!(
                    "no poll succeeded in {polls} attempts; last error: {message}"
                ))),
                _ => Ok(()),
            };
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            () = tokio::time::sleep(interval) => {}
        }
    }
}

/// Logs a failed poll and returns its message. Validation errors and a
/// rejected session end the watch instead.
fn report_poll_failure(err: CliError, retry_secs: u64) -> CliResult<String> {
    if matches!(err, CliError::Validation(_)) || err.is_session_rejected() {
        return Err(err);
    }
    let message = err.display_message();
    warn!(error = %message, "presence poll failed");
    eprintln!("poll failed: {message}. retrying in {retry_secs}s");
    Ok(message)
}
