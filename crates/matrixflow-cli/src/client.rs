//! Shared client utilities, error types, and telemetry wiring for the CLI.

use std::fmt::{self, Display, Formatter};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::anyhow;
use matrixflow_api_models::ApiErrorBody;
use matrixflow_core::{PageError, RangeError};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::cli::Cli;
use crate::session::SessionStore;

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";
const TELEMETRY_ENDPOINT_ENV: &str = "MATRIXFLOW_TELEMETRY_ENDPOINT";
const LOGIN_HINT: &str = "run `matrixflow login` or set MATRIXFLOW_TOKEN";

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    /// True when the backend refused the bearer token.
    pub(crate) fn is_session_rejected(&self) -> bool {
        matches!(self, Self::Failure(error) if error.is::<SessionRejected>())
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

/// The backend answered 401 to an authorized request.
#[derive(Debug, Error)]
#[error("session rejected by the backend (status {status}); {hint}", hint = LOGIN_HINT)]
pub(crate) struct SessionRejected {
    pub(crate) status: StatusCode,
}

impl From<RangeError> for CliError {
    fn from(value: RangeError) -> Self {
        Self::Validation(value.to_string())
    }
}

impl From<PageError> for CliError {
    fn from(value: PageError) -> Self {
        Self::Validation(value.to_string())
    }
}

/// Dependencies constructed from environment flags and CLI options.
#[derive(Clone)]
pub(crate) struct CliDependencies {
    pub(crate) client: Client,
    pub(crate) telemetry: Option<TelemetryEmitter>,
}

impl CliDependencies {
    /// Construct a configured HTTP client and optional telemetry emitter.
    pub(crate) fn from_env(cli: &Cli, trace_id: &str) -> CliResult<Self> {
        let mut default_headers = HeaderMap::new();
        let request_id = HeaderValue::from_str(trace_id).map_err(|_| {
            CliError::failure(anyhow!("trace identifier contains invalid characters"))
        })?;
        default_headers.insert(HEADER_REQUEST_ID, request_id);

        let client = Client::builder()
            .timeout(Duration::from_secs(cli.timeout))
            .default_headers(default_headers)
            .build()
            .map_err(|err| CliError::failure(anyhow!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            telemetry: TelemetryEmitter::from_env(),
        })
    }
}

/// Application context passed to command handlers.
pub(crate) struct AppContext {
    pub(crate) client: Client,
    pub(crate) base_url: Url,
    pub(crate) token: Option<String>,
    pub(crate) session: Option<SessionStore>,
}

impl AppContext {
    /// Build an API URL below the base URL, percent-encoding each segment.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> CliResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|()| {
                CliError::failure(anyhow!("API URL '{}' cannot carry a path", self.base_url))
            })?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    /// Bearer token for authenticated routes.
    pub(crate) fn token(&self) -> CliResult<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| CliError::validation(format!("not logged in ({LOGIN_HINT})")))
    }

    /// Attach the bearer token to `builder`.
    pub(crate) fn authorized(&self, builder: RequestBuilder) -> CliResult<RequestBuilder> {
        Ok(builder.bearer_auth(self.token()?))
    }
}

/// Reject blank identifiers before they reach a URL.
pub(crate) fn require_id<'a>(label: &str, value: &'a str) -> CliResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CliError::validation(format!("{label} must not be empty")));
    }
    Ok(trimmed)
}

/// Send a request, mapping transport failures to a CLI failure.
pub(crate) async fn send(request: RequestBuilder, route: &str) -> CliResult<Response> {
    request
        .send()
        .await
        .map_err(|err| CliError::failure(anyhow!("request to {route} failed: {err}")))
}

/// Decode a successful JSON response or classify the failure.
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response, what: &str) -> CliResult<T> {
    if !response.status().is_success() {
        return Err(classify_problem(response).await);
    }
    response
        .json::<T>()
        .await
        .map_err(|err| CliError::failure(anyhow!("failed to parse {what}: {err}")))
}

/// Telemetry emitter used to forward CLI outcomes.
#[derive(Clone)]
pub(crate) struct TelemetryEmitter {
    pub(crate) client: Client,
    pub(crate) endpoint: Url,
}

impl TelemetryEmitter {
    #[must_use]
    pub(crate) fn from_env() -> Option<Self> {
        let endpoint = std::env::var(TELEMETRY_ENDPOINT_ENV).ok()?;
        let endpoint = endpoint.parse().ok()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .ok()?;
        Some(Self { client, endpoint })
    }

    pub(crate) async fn emit(
        &self,
        trace_id: &str,
        command: &str,
        outcome: &str,
        exit_code: i32,
        message: Option<&str>,
    ) {
        let event = TelemetryEvent {
            command,
            outcome,
            trace_id,
            exit_code,
            message,
            timestamp_ms: timestamp_now_ms(),
        };

        if let Err(err) = self
            .client
            .post(self.endpoint.clone())
            .json(&event)
            .send()
            .await
        {
            tracing::debug!(error = %err, "telemetry emit failed");
        }
    }
}

#[derive(Serialize)]
struct TelemetryEvent<'a> {
    command: &'a str,
    outcome: &'a str,
    trace_id: &'a str,
    exit_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    timestamp_ms: u64,
}

/// Parse the API URL provided to the CLI.
pub(crate) fn parse_url(input: &str) -> Result<Url, String> {
    let url = input
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{input}': {err}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported URL scheme '{}'", url.scheme()));
    }
    Ok(url)
}

/// Millisecond timestamp helper for telemetry.
#[must_use]
pub(crate) fn timestamp_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Classify an HTTP response into a CLI error.
pub(crate) async fn classify_problem(response: Response) -> CliError {
    let status = response.status();
    let bytes = response.bytes().await.unwrap_or_default();

    let body_text = String::from_utf8_lossy(&bytes).trim().to_string();
    let problem = serde_json::from_slice::<ApiErrorBody>(&bytes).ok();
    let message = problem
        .as_ref()
        .and_then(ApiErrorBody::summary)
        .map_or_else(|| body_text.clone(), str::to_string);

    match status {
        StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
            CliError::validation(if message.is_empty() {
                format!("request rejected with status {status}")
            } else {
                message
            })
        }
        StatusCode::UNAUTHORIZED => CliError::failure(SessionRejected { status }),
        _ if message.is_empty() => {
            CliError::failure(anyhow!("request failed with status {status}"))
        }
        _ => CliError::failure(anyhow!("{message} (status {status})")),
    }
}
