use std::io::{self, IsTerminal};

use anyhow::anyhow;
use chrono::Utc;
use matrixflow_api_models::{LoginRequest, LoginResponse};
use tracing::info;

use crate::cli::LoginArgs;
use crate::client::{AppContext, CliError, CliResult, read_json, send};
use crate::session::Session;

pub(crate) async fn handle_login(ctx: &AppContext, args: LoginArgs) -> CliResult<()> {
    let username = args.username.trim().to_string();
    if username.is_empty() {
        return Err(CliError::validation("username must not be empty"));
    }
    let password = match args.password {
        Some(password) => password,
        None => prompt_password()?,
    };
    if password.is_empty() {
        return Err(CliError::validation("password must not be empty"));
    }

    let login = request_token(ctx, &username, &password).await?;
    let session = Session {
        token: login.token,
        username,
        api_url: ctx.base_url.to_string(),
        created_at: Utc::now(),
        expires_at: login.expires_at,
    };

    match &ctx.session {
        Some(store) => {
            store.save(&session).map_err(CliError::failure)?;
            info!(path = %store.path().display(), "session saved");
            println!("logged in as {}", session.username);
        }
        None => {
            eprintln!("no config directory available; export the token instead:");
            println!("MATRIXFLOW_TOKEN={}", session.token);
        }
    }
    Ok(())
}

pub(crate) async fn request_token(
    ctx: &AppContext,
    username: &str,
    password: &str,
) -> CliResult<LoginResponse> {
    let url = ctx.endpoint(&["api", "auth", "login"])?;
    let body = LoginRequest {
        username: username.to_string(),
        password: password.to_string(),
    };
    let response = send(ctx.client.post(url).json(&body), "/api/auth/login").await?;
    let login: LoginResponse = read_json(response, "login response").await?;
    if login.token.trim().is_empty() {
        return Err(CliError::failure(anyhow!("backend returned an empty token")));
    }
    Ok(login)
}

fn prompt_password() -> CliResult<String> {
    if !io::stdin().is_terminal() {
        return Err(CliError::validation(
            "--password is required when stdin is not a terminal",
        ));
    }
    rpassword::prompt_password("Password: ")
        .map_err(|err| CliError::failure(anyhow!("failed to read password: {err}")))
}

pub(crate) fn handle_logout(ctx: &AppContext) -> CliResult<()> {
    let Some(store) = &ctx.session else {
        println!("no session to clear");
        return Ok(());
    };
    if store.clear().map_err(CliError::failure)? {
        println!("logged out");
    } else {
        println!("no session to clear");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context_with_token;
    use crate::session::SessionStore;
    use anyhow::Result;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn login_saves_session_for_api_url() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/auth/login")
                .json_body(json!({"username": "ops", "password": "hunter2"}));
            then.status(201)
                .header("content-type", "application/json")
                .json_body(json!({"accessToken": "issued", "expiresAt": "2026-12-31T00:00:00Z"}));
        });

        let dir = tempfile::tempdir()?;
        let store = SessionStore::new(dir.path().join("session.json"));
        let mut ctx = context_with_token(&server)?;
        ctx.token = None;
        ctx.session = Some(store.clone());

        handle_login(
            &ctx,
            LoginArgs {
                username: " ops ".into(),
                password: Some("hunter2".into()),
            },
        )
        .await
        .map_err(|err| anyhow!(err.display_message()))?;
        mock.assert();

        let session = store.load()?.expect("session written");
        assert_eq!(session.token, "issued");
        assert_eq!(session.username, "ops");
        assert_eq!(session.api_url, ctx.base_url.to_string());
        assert_eq!(session.expires_at.as_deref(), Some("2026-12-31T00:00:00Z"));
        Ok(())
    }

    #[tokio::test]
    async fn login_rejection_is_a_failure() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/api/auth/login");
            then.status(401)
                .header("content-type", "application/json")
                .json_body(json!({"message": "Invalid credentials", "statusCode": 401}));
        });
        let ctx = context_with_token(&server)?;
        let err = request_token(&ctx, "ops", "wrong")
            .await
            .expect_err("rejected");
        assert_eq!(err.exit_code(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn login_requires_username() -> Result<()> {
        let server = MockServer::start_async().await;
        let ctx = context_with_token(&server)?;
        let err = handle_login(
            &ctx,
            LoginArgs {
                username: "  ".into(),
                password: Some("pw".into()),
            },
        )
        .await
        .expect_err("blank username");
        assert_eq!(err.exit_code(), 2);
        Ok(())
    }

    #[test]
    fn logout_clears_existing_session() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = SessionStore::new(dir.path().join("session.json"));
        store
            .save(&Session {
                token: "t".into(),
                username: "ops".into(),
                api_url: "http://backend/".into(),
                created_at: Utc::now(),
                expires_at: None,
            })
            .map_err(anyhow::Error::from)?;

        let ctx = AppContext {
            client: reqwest::Client::new(),
            base_url: "http://backend/".parse()?,
            token: None,
            session: Some(store.clone()),
        };
        handle_logout(&ctx).map_err(|err| anyhow!(err.display_message()))?;
        assert!(store.load()?.is_none());
        handle_logout(&ctx).map_err(|err| anyhow!(err.display_message()))?;
        Ok(())
    }
}
