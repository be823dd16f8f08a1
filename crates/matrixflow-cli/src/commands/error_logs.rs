use matrixflow_api_models::{ErrorLog, Page};
use matrixflow_core::{DateRange, PageRequest};

use crate::cli::{ErrorLogArgs, OutputFormat};
use crate::client::{AppContext, CliResult, read_json, require_id, send};
use crate::output::render_error_logs;

pub(crate) async fn handle_error_logs(
    ctx: &AppContext,
    args: ErrorLogArgs,
    output: OutputFormat,
) -> CliResult<()> {
    let range = DateRange::parse(args.from.as_deref(), args.to.as_deref())?;
    let page = PageRequest::new(args.page, args.limit)?;
    let device = args
        .device
        .as_deref()
        .map(|id| require_id("device id", id))
        .transpose()?;
    let level = args
        .level
        .as_deref()
        .map(str::trim)
        .filter(|level| !level.is_empty());

    let mut url = ctx.endpoint(&["api", "error-logs"])?;
    {
        let mut pairs = url.query_pairs_mut();
        if let Some(device) = device {
            pairs.append_pair("deviceId", device);
        }
        if let Some(level) = level {
            pairs.append_pair("level", level);
        }
        for (key, value) in range.query_pairs().into_iter().chain(page.query_pairs()) {
            pairs.append_pair(key, &value);
        }
    }

    let response = send(ctx.authorized(ctx.client.get(url))?, "/api/error-logs").await?;
    let logs: Page<ErrorLog> = read_json(response, "error logs").await?;
    render_error_logs(&logs, output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context_with_token;
    use anyhow::{Result, anyhow};
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn error_logs_filter_by_device_and_level() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/error-logs")
                .query_param("deviceId", "dev-1")
                .query_param("level", "warning")
                .query_param("to", "2026-03-14")
                .header("authorization", "Bearer tok");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "data": [{
                        "_id": "err-1",
                        "deviceId": "dev-1",
                        "level": "warning",
                        "message": "screenshot capture failed",
                        "source": "service",
                        "createdAt": "2026-03-13T08:15:00Z"
                    }],
                    "total": 1
                }));
        });
        let ctx = context_with_token(&server)?;
        handle_error_logs(
            &ctx,
            ErrorLogArgs {
                device: Some("dev-1".into()),
                level: Some("warning".into()),
                to: Some("2026-03-14".into()),
                ..ErrorLogArgs::default()
            },
            OutputFormat::Table,
        )
        .await
        .map_err(|err| anyhow!(err.display_message()))?;
        mock.assert();
        Ok(())
    }

    #[tokio::test]
    async fn error_logs_reject_blank_device() -> Result<()> {
        let server = MockServer::start_async().await;
        let ctx = context_with_token(&server)?;
        let err = handle_error_logs(
            &ctx,
            ErrorLogArgs {
                device: Some(" ".into()),
                ..ErrorLogArgs::default()
            },
            OutputFormat::Json,
        )
        .await
        .expect_err("blank device");
        assert_eq!(err.exit_code(), 2);
        Ok(())
    }
}
