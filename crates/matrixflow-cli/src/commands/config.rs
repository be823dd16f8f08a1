use matrixflow_api_models::{PresenceSettings, PresenceSettingsUpdate};
use matrixflow_core::PresenceConfig;
use tracing::warn;

use crate::cli::{ConfigSetArgs, OutputFormat};
use crate::client::{AppContext, CliError, CliResult, read_json, send};
use crate::output::render_presence_settings;

const CONFIG_ROUTE: &str = "/api/config";

pub(crate) async fn fetch_presence_settings(ctx: &AppContext) -> CliResult<PresenceSettings> {
    let url = ctx.endpoint(&["api", "config"])?;
    let response = send(ctx.authorized(ctx.client.get(url))?, CONFIG_ROUTE).await?;
    read_json(response, "presence settings").await
}

/// Thresholds used to classify devices. Falls back to the defaults when the
/// backend cannot provide them.
pub(crate) async fn fetch_presence_config(ctx: &AppContext) -> PresenceConfig {
    match fetch_presence_settings(ctx).await {
        Ok(settings) => settings.into(),
        Err(err) => {
            warn!(
                error = %err.display_message(),
                "presence settings unavailable; using default heartbeat delays"
            );
            PresenceConfig::default()
        }
    }
}

pub(crate) async fn handle_config_get(ctx: &AppContext, output: OutputFormat) -> CliResult<()> {
    let settings = fetch_presence_settings(ctx).await?;
    render_presence_settings(&settings, output)
}

pub(crate) fn build_settings_update(args: &ConfigSetArgs) -> CliResult<PresenceSettingsUpdate> {
    let update = PresenceSettingsUpdate {
        client_heartbeat_delay: args.client_delay,
        service_heartbeat_delay: args.service_delay,
    };
    if update.is_empty() {
        return Err(CliError::validation(
            "nothing to update (pass --client-delay or --service-delay)",
        ));
    }
    if [update.client_heartbeat_delay, update.service_heartbeat_delay].contains(&Some(0)) {
        return Err(CliError::validation("heartbeat delays must be at least 1 second"));
    }
    Ok(update)
}

pub(crate) async fn handle_config_set(
    ctx: &AppContext,
    args: ConfigSetArgs,
    output: OutputFormat,
) -> CliResult<()> {
    let update = build_settings_update(&args)?;
    let url = ctx.endpoint(&["api", "config"])?;
    let response = send(ctx.authorized(ctx.client.put(url))?.json(&update), CONFIG_ROUTE).await?;
    let settings: PresenceSettings = read_json(response, "presence settings").await?;
    render_presence_settings(&settings, output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context_with_token;
    use anyhow::{Result, anyhow};
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn settings_update_rejects_empty_and_zero() {
        let err = build_settings_update(&ConfigSetArgs::default()).expect_err("empty");
        assert_eq!(err.exit_code(), 2);

        let err = build_settings_update(&ConfigSetArgs {
            client_delay: Some(0),
            service_delay: None,
        })
        .expect_err("zero");
        assert!(err.display_message().contains("at least 1"));

        let update = build_settings_update(&ConfigSetArgs {
            client_delay: None,
            service_delay: Some(120),
        })
        .expect("valid update");
        assert_eq!(update.service_heartbeat_delay, Some(120));
        assert_eq!(update.client_heartbeat_delay, None);
    }

    #[tokio::test]
    async fn presence_config_comes_from_backend() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/config")
                .header("authorization", "Bearer tok");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"clientHeartbeatDelay": 30, "serviceHeartbeatDelay": 90}));
        });
        let ctx = context_with_token(&server)?;
        let config = fetch_presence_config(&ctx).await;
        mock.assert();
        assert_eq!(config.client_heartbeat_delay_secs, 30);
        assert_eq!(config.service_heartbeat_delay_secs, 90);
        Ok(())
    }

    #[tokio::test]
    async fn presence_config_falls_back_to_defaults() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/config");
            then.status(500).body("database offline");
        });
        let ctx = context_with_token(&server)?;
        assert_eq!(fetch_presence_config(&ctx).await, PresenceConfig::default());

        let mut anonymous = context_with_token(&server)?;
        anonymous.token = None;
        assert_eq!(fetch_presence_config(&anonymous).await, PresenceConfig::default());
        Ok(())
    }

    #[tokio::test]
    async fn presence_settings_fill_missing_fields() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/config");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"clientHeartbeatDelay": 45}));
        });
        let ctx = context_with_token(&server)?;
        let settings = fetch_presence_settings(&ctx)
            .await
            .map_err(|err| anyhow!(err.display_message()))?;
        assert_eq!(settings.client_heartbeat_delay, 45);
        assert_eq!(settings.service_heartbeat_delay, 60);
        Ok(())
    }

    #[tokio::test]
    async fn config_set_puts_partial_update() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(PUT)
                .path("/api/config")
                .header("authorization", "Bearer tok")
                .json_body(json!({"clientHeartbeatDelay": 30}));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"clientHeartbeatDelay": 30, "serviceHeartbeatDelay": 60}));
        });
        let ctx = context_with_token(&server)?;
        handle_config_set(
            &ctx,
            ConfigSetArgs {
                client_delay: Some(30),
                service_delay: None,
            },
            OutputFormat::Json,
        )
        .await
        .map_err(|err| anyhow!(err.display_message()))?;
        mock.assert();
        Ok(())
    }
}
