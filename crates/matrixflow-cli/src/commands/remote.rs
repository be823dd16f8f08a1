use matrixflow_api_models::{CommandRequest, DeviceCommand, Page};
use matrixflow_core::PageRequest;
use serde_json::Value;

use crate::cli::{CommandListArgs, CommandSendArgs, OutputFormat};
use crate::client::{AppContext, CliError, CliResult, read_json, require_id, send};
use crate::output::{render_command, render_command_list};

const COMMANDS_ROUTE: &str = "/api/devices/{id}/commands";

pub(crate) fn build_command_request(args: &CommandSendArgs) -> CliResult<CommandRequest> {
    let command = args.name.trim();
    if command.is_empty() {
        return Err(CliError::validation("command name must not be empty"));
    }
    let payload = args
        .payload
        .as_deref()
        .map(|raw| {
            serde_json::from_str::<Value>(raw)
                .map_err(|err| CliError::validation(format!("payload is not valid JSON: {err}")))
        })
        .transpose()?;
    Ok(CommandRequest {
        command: command.to_string(),
        payload,
    })
}

pub(crate) async fn handle_command_send(
    ctx: &AppContext,
    args: CommandSendArgs,
    output: OutputFormat,
) -> CliResult<()> {
    let device_id = require_id("device id", &args.device)?;
    let request = build_command_request(&args)?;
    let url = ctx.endpoint(&["api", "devices", device_id, "commands"])?;
    let response = send(
        ctx.authorized(ctx.client.post(url))?.json(&request),
        COMMANDS_ROUTE,
    )
    .await?;
    let queued: DeviceCommand = read_json(response, "queued command").await?;
    render_command(&queued, output)
}

pub(crate) async fn handle_command_list(
    ctx: &AppContext,
    args: CommandListArgs,
    output: OutputFormat,
) -> CliResult<()> {
    let device_id = require_id("device id", &args.device)?;
    let page = PageRequest::new(args.page, args.limit)?;
    let mut url = ctx.endpoint(&["api", "devices", device_id, "commands"])?;
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in page.query_pairs() {
            pairs.append_pair(key, &value);
        }
    }
    let response = send(ctx.authorized(ctx.client.get(url))?, COMMANDS_ROUTE).await?;
    let history: Page<DeviceCommand> = read_json(response, "command history").await?;
    render_command_list(&history, output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context_with_token;
    use anyhow::{Result, anyhow};
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn command_request_validates_name_and_payload() {
        let err = build_command_request(&CommandSendArgs {
            device: "dev-1".into(),
            name: "  ".into(),
            payload: None,
        })
        .expect_err("blank name");
        assert_eq!(err.exit_code(), 2);

        let err = build_command_request(&CommandSendArgs {
            device: "dev-1".into(),
            name: "message".into(),
            payload: Some("{oops".into()),
        })
        .expect_err("bad payload");
        assert!(err.display_message().contains("JSON"));

        let request = build_command_request(&CommandSendArgs {
            device: "dev-1".into(),
            name: " message ".into(),
            payload: Some(r#"{"text":"Reboot at 5pm"}"#.into()),
        })
        .expect("valid request");
        assert_eq!(request.command, "message");
        assert_eq!(request.payload, Some(json!({"text": "Reboot at 5pm"})));
    }

    #[tokio::test]
    async fn command_send_posts_request() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/devices/dev-1/commands")
                .header("authorization", "Bearer tok")
                .json_body(json!({"command": "lock"}));
            then.status(201)
                .header("content-type", "application/json")
                .json_body(json!({
                    "_id": "cmd-9",
                    "deviceId": "dev-1",
                    "command": "lock",
                    "status": "pending",
                    "createdAt": "2026-03-14T12:00:00Z"
                }));
        });
        let ctx = context_with_token(&server)?;
        handle_command_send(
            &ctx,
            CommandSendArgs {
                device: "dev-1".into(),
                name: "lock".into(),
                payload: None,
            },
            OutputFormat::Table,
        )
        .await
        .map_err(|err| anyhow!(err.display_message()))?;
        mock.assert();
        Ok(())
    }

    #[tokio::test]
    async fn command_list_pages_history() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/devices/dev-1/commands")
                .query_param("page", "1")
                .query_param("limit", "25");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "items": [
                        {"id": "cmd-1", "command": "lock", "status": "completed", "result": "ok"},
                        {"id": "cmd-2", "command": "shutdown", "status": "queued"}
                    ],
                    "total": 2
                }));
        });
        let ctx = context_with_token(&server)?;
        handle_command_list(
            &ctx,
            CommandListArgs {
                device: "dev-1".into(),
                ..CommandListArgs::default()
            },
            OutputFormat::Json,
        )
        .await
        .map_err(|err| anyhow!(err.display_message()))?;
        mock.assert();
        Ok(())
    }

    #[tokio::test]
    async fn command_send_requires_login() -> Result<()> {
        let server = MockServer::start_async().await;
        let mut ctx = context_with_token(&server)?;
        ctx.token = None;
        let err = handle_command_send(
            &ctx,
            CommandSendArgs {
                device: "dev-1".into(),
                name: "lock".into(),
                payload: None,
            },
            OutputFormat::Table,
        )
        .await
        .expect_err("no token");
        assert!(err.display_message().contains("not logged in"));
        Ok(())
    }
}
