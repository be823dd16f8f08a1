//! Output renderers and formatting helpers for CLI commands.

use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, Utc};
use matrixflow_api_models::{DeviceCommand, ErrorLog, Page, PresenceSettings, ReportSummary};
use matrixflow_core::{
    CLIENT_GRACE_MS_PER_SEC, PresenceTally, SERVICE_GRACE_MS_PER_SEC, UsageEntry,
    format_duration, parse_heartbeat, total_pages,
};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};
use crate::commands::activity::ActivityView;
use crate::commands::devices::{DeviceListView, DeviceView};
use crate::commands::watch::Transition;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const MESSAGE_WIDTH: usize = 60;

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

fn json_line<T: Serialize>(value: &T) -> CliResult<String> {
    serde_json::to_string(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))
}

/// First `watch` frame: the full table, or one JSON line so the stream stays
/// line-delimited alongside the transitions that follow.
pub(crate) fn render_watch_frame(
    view: &DeviceListView<'_>,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => println!("{}", json_line(view)?),
        OutputFormat::Table => render_device_list(view, format)?,
    }
    Ok(())
}

pub(crate) fn render_device_list(
    view: &DeviceListView<'_>,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(view)?,
        OutputFormat::Table => {
            println!(
                "{:<24} {:<20} {:<7} {:<7} {:<14} ASSIGNED",
                "ID", "NAME", "CLIENT", "SERVICE", "LAST SEEN"
            );
            for item in &view.items {
                let device = item.device;
                println!(
                    "{:<24} {:<20} {:<7} {:<7} {:<14} {}",
                    truncate(&device.id, 24),
                    truncate(device.display_name(), 20),
                    item.statuses.client_status,
                    item.statuses.service_status,
                    format_last_seen(device.last_client_heartbeat.as_deref(), view.observed_at),
                    or_dash(device.assignment.assigned_user.as_deref())
                );
            }
            println!(
                "{}; {}",
                page_footer(view.total, view.page, view.limit),
                fleet_summary(&view.summary)
            );
        }
    }
    Ok(())
}

pub(crate) fn render_device_detail(
    view: &DeviceView<'_>,
    now: DateTime<Utc>,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(view)?,
        OutputFormat::Table => {
            let device = view.device;
            println!("id: {}", device.id);
            println!("name: {}", device.display_name());
            if let Some(hostname) = &device.hostname {
                println!("hostname: {hostname}");
            }
            if let Some(os) = &device.os {
                println!("os: {os}");
            }
            if let Some(ip) = &device.ip_address {
                println!("ip: {ip}");
            }
            if let Some(version) = &device.client_version {
                println!("client version: {version}");
            }
            println!(
                "client: {} (last heartbeat {})",
                view.statuses.client_status,
                format_last_seen(device.last_client_heartbeat.as_deref(), now)
            );
            println!(
                "service: {} (last heartbeat {})",
                view.statuses.service_status,
                format_last_seen(device.last_service_heartbeat.as_deref(), now)
            );
            let assignment = &device.assignment;
            println!("assigned to: {}", or_dash(assignment.assigned_user.as_deref()));
            println!("department: {}", or_dash(assignment.department.as_deref()));
            println!("location: {}", or_dash(assignment.location.as_deref()));
            if let Some(notes) = &assignment.notes {
                println!("notes: {notes}");
            }
            if let Some(created) = device.created_at {
                println!("registered: {}", created.format(TIMESTAMP_FORMAT));
            }
        }
    }
    Ok(())
}

pub(crate) fn render_activity(view: &ActivityView<'_>, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(view)?,
        OutputFormat::Table => {
            println!("device: {}", view.device_id);
            println!("range: {}", describe_bounds(view.range.from(), view.range.to()));
            println!("{:<10}  {:>11}  {:>11}  TOP APP", "DATE", "ACTIVE", "IDLE");
            for row in view.items {
                let top = row
                    .top_apps
                    .iter()
                    .max_by_key(|entry| entry.seconds)
                    .map_or("-", |entry| entry.name.as_str());
                println!(
                    "{:<10}  {:>11}  {:>11}  {}",
                    row.date,
                    format_duration(row.active_seconds),
                    format_duration(row.idle_seconds),
                    top
                );
            }
            println!("{}", page_footer(view.total, view.page, view.limit));
            let totals = &view.totals;
            println!(
                "active {} / idle {} over {} day(s) ({} active)",
                format_duration(totals.active_seconds),
                format_duration(totals.idle_seconds),
                totals.days,
                format_ratio(totals.active_ratio)
            );
            print_usage("top apps", &totals.top_apps);
            print_usage("top titles", &totals.top_titles);
        }
    }
    Ok(())
}

pub(crate) fn render_command(command: &DeviceCommand, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(command)?,
        OutputFormat::Table => {
            println!("id: {}", command.id);
            if !command.device_id.is_empty() {
                println!("device: {}", command.device_id);
            }
            println!("command: {}", command.command);
            if let Some(payload) = &command.payload {
                println!("payload: {payload}");
            }
            println!("status: {}", command.status.as_str());
            if let Some(result) = &command.result {
                println!("result: {result}");
            }
            if let Some(created) = command.created_at {
                println!("created: {}", created.format(TIMESTAMP_FORMAT));
            }
            if let Some(completed) = command.completed_at {
                println!("completed: {}", completed.format(TIMESTAMP_FORMAT));
            }
        }
    }
    Ok(())
}

pub(crate) fn render_command_list(
    history: &Page<DeviceCommand>,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(history)?,
        OutputFormat::Table => {
            println!(
                "{:<24} {:<16} {:<10} {:<19} RESULT",
                "ID", "COMMAND", "STATUS", "CREATED"
            );
            for command in &history.items {
                let created = command
                    .created_at
                    .map_or_else(|| "-".to_string(), |at| at.format(TIMESTAMP_FORMAT).to_string());
                println!(
                    "{:<24} {:<16} {:<10} {:<19} {}",
                    truncate(&command.id, 24),
                    truncate(&command.command, 16),
                    command.status.as_str(),
                    created,
                    truncate(or_dash(command.result.as_deref()), MESSAGE_WIDTH)
                );
            }
            println!("{}", page_footer(history.total, history.page, history.limit));
        }
    }
    Ok(())
}

pub(crate) fn render_report(report: &ReportSummary, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(report)?,
        OutputFormat::Table => {
            println!("range: {}", describe_bounds(report.from, report.to));
            println!(
                "devices: {} active of {}",
                report.active_devices, report.total_devices
            );
            println!("active time: {}", format_duration(report.total_active_seconds));
            println!("idle time: {}", format_duration(report.total_idle_seconds));
            print_usage("top apps", &report.top_apps);
            print_usage("top titles", &report.top_titles);
        }
    }
    Ok(())
}

pub(crate) fn render_error_logs(logs: &Page<ErrorLog>, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(logs)?,
        OutputFormat::Table => {
            println!(
                "{:<19} {:<8} {:<24} {:<10} MESSAGE",
                "TIME", "LEVEL", "DEVICE", "SOURCE"
            );
            for entry in &logs.items {
                println!(
                    "{:<19} {:<8} {:<24} {:<10} {}",
                    entry.occurred_at.format(TIMESTAMP_FORMAT),
                    truncate(&entry.level, 8),
                    truncate(or_dash(entry.device_id.as_deref()), 24),
                    truncate(or_dash(entry.source.as_deref()), 10),
                    truncate(&entry.message, MESSAGE_WIDTH)
                );
            }
            println!("{}", page_footer(logs.total, logs.page, logs.limit));
        }
    }
    Ok(())
}

pub(crate) fn render_presence_settings(
    settings: &PresenceSettings,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(settings)?,
        OutputFormat::Table => {
            println!(
                "client heartbeat delay: {}s (offline after {})",
                settings.client_heartbeat_delay,
                format_duration(grace_window_secs(
                    settings.client_heartbeat_delay,
                    CLIENT_GRACE_MS_PER_SEC
                ))
            );
            println!(
                "service heartbeat delay: {}s (offline after {})",
                settings.service_heartbeat_delay,
                format_duration(grace_window_secs(
                    settings.service_heartbeat_delay,
                    SERVICE_GRACE_MS_PER_SEC
                ))
            );
        }
    }
    Ok(())
}

/// JSON transitions are written one object per line.
pub(crate) fn render_transition(transition: &Transition, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => println!("{}", json_line(transition)?),
        OutputFormat::Table => println!(
            "{}  {} ({})  {} {} -> {}",
            transition.observed_at.format(TIMESTAMP_FORMAT),
            transition.name,
            transition.device_id,
            transition.channel.as_str(),
            transition.from,
            transition.to
        ),
    }
    Ok(())
}

fn print_usage(label: &str, entries: &[UsageEntry]) {
    if entries.is_empty() {
        return;
    }
    println!("{label}:");
    for entry in entries {
        println!("  {:>11}  {}", format_duration(entry.seconds), entry.name);
    }
}

/// Age of a heartbeat relative to `now`, for display only.
pub(crate) fn format_last_seen(raw: Option<&str>, now: DateTime<Utc>) -> String {
    let Some(raw) = raw else {
        return "never".to_string();
    };
    let Some(at) = parse_heartbeat(raw) else {
        return "unreadable".to_string();
    };
    u64::try_from(now.signed_duration_since(at).num_seconds()).map_or_else(
        |_| "ahead of clock".to_string(),
        |elapsed| format!("{} ago", format_duration(elapsed)),
    )
}

fn grace_window_secs(delay_secs: u64, grace_ms_per_sec: i64) -> u64 {
    u64::try_from(grace_ms_per_sec)
        .unwrap_or(0)
        .saturating_mul(delay_secs)
        / 1_000
}

fn describe_bounds(from: Option<NaiveDate>, to: Option<NaiveDate>) -> String {
    match (from, to) {
        (None, None) => "all dates".to_string(),
        (Some(from), None) => format!("from {from}"),
        (None, Some(to)) => format!("through {to}"),
        (Some(from), Some(to)) => format!("{from} .. {to}"),
    }
}

fn fleet_summary(tally: &PresenceTally) -> String {
    format!(
        "clients online {}/{} ({} offline), services online {}/{}",
        tally.client_online,
        tally.total,
        tally.client_offline(),
        tally.service_online,
        tally.total
    )
}

fn page_footer(total: u64, page: u32, limit: u32) -> String {
    format!(
        "page {page}/{} ({total} total)",
        total_pages(total, limit).max(1)
    )
}

fn format_ratio(ratio: Option<f64>) -> String {
    ratio.map_or_else(|| "-".to_string(), |ratio| format!("{:.1}%", ratio * 100.0))
}

fn or_dash(value: Option<&str>) -> &str {
    value.filter(|text| !text.is_empty()).unwrap_or("-")
}

/// Shorten `text` to `width` characters, marking the cut with `~`.
pub(crate) fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut shortened: String = text.chars().take(width.saturating_sub(1)).collect();
    shortened.push('~');
    shortened
}
