use chrono::{DateTime, Utc};
use matrixflow_api_models::{AssignmentUpdate, Device, Page};
use matrixflow_core::{DeviceStatuses, PageRequest, PresenceConfig, PresenceTally};
use serde::Serialize;

use crate::cli::{
    DeviceAssignArgs, DeviceListArgs, DeviceShowArgs, OutputFormat, PresenceFilter,
};
use crate::client::{AppContext, CliError, CliResult, read_json, require_id, send};
use crate::commands::config::fetch_presence_config;
use crate::output::{render_device_detail, render_device_list};

/// Device paired with the presence verdicts computed for it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeviceView<'a> {
    #[serde(flatten)]
    pub(crate) device: &'a Device,
    #[serde(flatten)]
    pub(crate) statuses: DeviceStatuses,
}

/// One rendered page of the device list.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeviceListView<'a> {
    pub(crate) items: Vec<DeviceView<'a>>,
    pub(crate) total: u64,
    pub(crate) page: u32,
    pub(crate) limit: u32,
    pub(crate) summary: PresenceTally,
    pub(crate) observed_at: DateTime<Utc>,
}

/// Query for one page of devices.
#[derive(Debug, Clone, Default)]
pub(crate) struct DeviceQuery<'a> {
    pub(crate) page: PageRequest,
    pub(crate) search: Option<&'a str>,
}

pub(crate) async fn fetch_device_page(
    ctx: &AppContext,
    query: &DeviceQuery<'_>,
) -> CliResult<Page<Device>> {
    let mut url = ctx.endpoint(&["api", "devices"])?;
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query.page.query_pairs() {
            pairs.append_pair(key, &value);
        }
        if let Some(search) = query.search.map(str::trim).filter(|s| !s.is_empty()) {
            pairs.append_pair("search", search);
        }
    }

    let response = send(ctx.authorized(ctx.client.get(url))?, "/api/devices").await?;
    read_json(response, "device list").await
}

/// Classify every device on `page` at a single instant.
pub(crate) fn build_list_view<'a>(
    page: &'a Page<Device>,
    config: &PresenceConfig,
    now: DateTime<Utc>,
    filter: Option<PresenceFilter>,
) -> DeviceListView<'a> {
    let classified: Vec<DeviceView<'a>> = page
        .items
        .iter()
        .map(|device| DeviceView {
            device,
            statuses: device.heartbeats().statuses(now, config),
        })
        .collect();
    let summary: PresenceTally = classified.iter().map(|view| view.statuses).collect();
    let items = classified
        .into_iter()
        .filter(|view| filter.is_none_or(|wanted| wanted.matches(view.statuses.client_status)))
        .collect();

    DeviceListView {
        items,
        total: page.total,
        page: page.page,
        limit: page.limit,
        summary,
        observed_at: now,
    }
}

pub(crate) async fn handle_device_list(
    ctx: &AppContext,
    args: DeviceListArgs,
    output: OutputFormat,
) -> CliResult<()> {
    let query = DeviceQuery {
        page: PageRequest::new(args.page, args.limit)?,
        search: args.search.as_deref(),
    };
    let page = fetch_device_page(ctx, &query).await?;
    let config = fetch_presence_config(ctx).await;
    let view = build_list_view(&page, &config, Utc::now(), args.status);
    render_device_list(&view, output)
}

pub(crate) async fn fetch_device(ctx: &AppContext, id: &str) -> CliResult<Device> {
    let url = ctx.endpoint(&["api", "devices", id])?;
    let response = send(ctx.authorized(ctx.client.get(url))?, "/api/devices/{id}").await?;
    read_json(response, "device detail").await
}

pub(crate) async fn handle_device_show(
    ctx: &AppContext,
    args: DeviceShowArgs,
    output: OutputFormat,
) -> CliResult<()> {
    let id = require_id("device id", &args.id)?;
    let device = fetch_device(ctx, id).await?;
    let config = fetch_presence_config(ctx).await;
    let now = Utc::now();
    let view = DeviceView {
        device: &device,
        statuses: device.heartbeats().statuses(now, &config),
    };
    render_device_detail(&view, now, output)
}

pub(crate) fn build_assignment_update(args: &DeviceAssignArgs) -> CliResult<AssignmentUpdate> {
    let update = AssignmentUpdate {
        assigned_user: args.assigned_user.as_deref().map(normalize_field),
        department: args.department.as_deref().map(normalize_field),
        location: args.location.as_deref().map(normalize_field),
        notes: args.notes.as_deref().map(normalize_field),
    };
    if update.is_empty() {
        return Err(CliError::validation(
            "nothing to update (pass --user, --department, --location, or --notes)",
        ));
    }
    Ok(update)
}

fn normalize_field(value: &str) -> String {
    value.trim().to_string()
}

pub(crate) async fn handle_device_assign(
    ctx: &AppContext,
    args: DeviceAssignArgs,
    output: OutputFormat,
) -> CliResult<()> {
    let id = require_id("device id", &args.id)?;
    let update = build_assignment_update(&args)?;
    let url = ctx.endpoint(&["api", "devices", id, "assignment"])?;
    let response = send(
        ctx.authorized(ctx.client.put(url))?.json(&update),
        "/api/devices/{id}/assignment",
    )
    .await?;
    let device: Device = read_json(response, "updated device").await?;

    let config = fetch_presence_config(ctx).await;
    let now = Utc::now();
    let view = DeviceView {
        device: &device,
        statuses: device.heartbeats().statuses(now, &config),
    };
    render_device_detail(&view, now, output)
}
