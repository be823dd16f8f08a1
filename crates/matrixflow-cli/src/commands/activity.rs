use matrixflow_api_models::{ActivityLog, Page};
use matrixflow_core::{ActivityTotals, DateRange, PageRequest, UsageEntry};
use serde::Serialize;

use crate::cli::{ActivityArgs, OutputFormat};
use crate::client::{AppContext, CliResult, read_json, require_id, send};
use crate::output::render_activity;

/// Activity page plus the roll-up computed over its rows.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ActivityView<'a> {
    pub(crate) device_id: &'a str,
    pub(crate) range: DateRange,
    pub(crate) items: &'a [ActivityLog],
    pub(crate) total: u64,
    pub(crate) page: u32,
    pub(crate) limit: u32,
    pub(crate) totals: ActivitySummary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ActivitySummary {
    pub(crate) days: usize,
    pub(crate) active_seconds: u64,
    pub(crate) idle_seconds: u64,
    pub(crate) active_ratio: Option<f64>,
    pub(crate) top_apps: Vec<UsageEntry>,
    pub(crate) top_titles: Vec<UsageEntry>,
}

impl ActivitySummary {
    pub(crate) fn from_logs(logs: &[ActivityLog], top: usize) -> Self {
        let totals = ActivityTotals::from_rows(logs);
        Self {
            days: totals.rows,
            active_seconds: totals.active_seconds,
            idle_seconds: totals.idle_seconds,
            active_ratio: totals.active_ratio(),
            top_apps: totals.top_apps(top),
            top_titles: totals.top_titles(top),
        }
    }
}

pub(crate) async fn fetch_activity(
    ctx: &AppContext,
    device_id: &str,
    range: &DateRange,
    page: &PageRequest,
) -> CliResult<Page<ActivityLog>> {
    let mut url = ctx.endpoint(&["api", "devices", device_id, "activity"])?;
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in range.query_pairs().into_iter().chain(page.query_pairs()) {
            pairs.append_pair(key, &value);
        }
    }
    let response = send(
        ctx.authorized(ctx.client.get(url))?,
        "/api/devices/{id}/activity",
    )
    .await?;
    read_json(response, "activity logs").await
}

pub(crate) async fn handle_activity(
    ctx: &AppContext,
    args: ActivityArgs,
    output: OutputFormat,
) -> CliResult<()> {
    let device_id = require_id("device id", &args.device)?;
    let range = DateRange::parse(args.from.as_deref(), args.to.as_deref())?;
    let page = PageRequest::new(args.page, args.limit)?;

    let logs = fetch_activity(ctx, device_id, &range, &page).await?;
    let view = ActivityView {
        device_id,
        range,
        items: &logs.items,
        total: logs.total,
        page: logs.page,
        limit: logs.limit,
        totals: ActivitySummary::from_logs(&logs.items, args.top),
    };
    render_activity(&view, output)
}
