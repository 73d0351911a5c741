//! Shared client utilities, error types, and telemetry wiring for the CLI.

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::anyhow;
use deklutter_session::{
    ApiError, FileTokenStore, HttpMailboxClient, Route, TokenStore, WorkflowController,
    WorkflowDeps, WorkflowError,
};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use serde::Serialize;
use url::Url;

use crate::cli::{Cli, OutputFormat};
use crate::prompt::TerminalPrompt;

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";

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

    /// Surface a mailbox-service failure with the message the user should see.
    pub(crate) fn service(err: &ApiError) -> Self {
        Self::Failure(anyhow!(err.user_message()))
    }

    /// An action the controller refused in its current state.
    pub(crate) fn workflow(err: WorkflowError) -> Self {
        Self::Validation(err.to_string())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
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
#[derive(Clone)]
pub(crate) struct AppContext {
    pub(crate) client: Client,
    pub(crate) base_url: Url,
    pub(crate) store: Arc<dyn TokenStore>,
    pub(crate) output: OutputFormat,
}

impl AppContext {
    /// Mailbox client bound to the configured base URL.
    pub(crate) fn mailbox(&self) -> CliResult<HttpMailboxClient> {
        HttpMailboxClient::new(self.client.clone(), &self.base_url)
            .map_err(|err| CliError::failure(anyhow!("invalid base URL: {err}")))
    }

    /// Boot a workflow controller, failing when no session token is stored.
    pub(crate) fn controller(&self, prompt: TerminalPrompt) -> CliResult<WorkflowController> {
        let prompt = Arc::new(prompt);
        let deps = WorkflowDeps {
            store: Arc::clone(&self.store),
            api: Arc::new(self.mailbox()?),
            confirm: prompt.clone(),
            notify: prompt,
        };
        match WorkflowController::boot(deps) {
            (controller, Route::Dashboard) => Ok(controller),
            (_, Route::Landing) => Err(CliError::validation(
                "not signed in; run `deklutter login` first",
            )),
        }
    }
}

/// Resolve the token store location from `--state-dir` or the platform default.
pub(crate) fn resolve_store(state_dir: Option<PathBuf>) -> CliResult<FileTokenStore> {
    state_dir
        .or_else(FileTokenStore::default_dir)
        .map(FileTokenStore::in_dir)
        .ok_or_else(|| {
            CliError::validation(
                "no state directory available; pass --state-dir or set DEKLUTTER_STATE_DIR",
            )
        })
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
        let endpoint = std::env::var("DEKLUTTER_TELEMETRY_ENDPOINT").ok()?;
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
    input
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{input}': {err}"))
}

/// Millisecond timestamp helper for telemetry.
#[must_use]
pub(crate) fn timestamp_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use deklutter_session::{ApiOperation, MemoryTokenStore, SessionToken};
    use httpmock::MockServer;
    use httpmock::prelude::*;

    fn context(store: MemoryTokenStore) -> AppContext {
        AppContext {
            client: Client::new(),
            base_url: "http://127.0.0.1:9".parse().expect("valid URL"),
            store: Arc::new(store),
            output: OutputFormat::Table,
        }
    }

    #[tokio::test]
    async fn telemetry_emitter_emits_event() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST).path("/telemetry");
            then.status(200);
        });

        let emitter = TelemetryEmitter {
            client: Client::new(),
            endpoint: format!("{}/telemetry", server.base_url())
                .parse()
                .map_err(|_| anyhow::anyhow!("invalid URL"))?,
        };

        emitter
            .emit("trace", "scan", "error", 3, Some("Scan failed"))
            .await;

        mock.assert();
        Ok(())
    }

    #[test]
    fn exit_codes_separate_validation_from_failure() {
        assert_eq!(CliError::validation("bad").exit_code(), 2);
        assert_eq!(CliError::failure(anyhow!("boom")).exit_code(), 3);
    }

    #[test]
    fn service_errors_surface_user_message() {
        let err = CliError::service(&ApiError::Service {
            operation: ApiOperation::Scan,
            status: 401,
            message: Some("token expired".into()),
        });
        assert_eq!(err.display_message(), "token expired");
    }

    #[test]
    fn parse_url_rejects_garbage() {
        assert!(parse_url("https://api.deklutter.co").is_ok());
        let err = parse_url("not a url").expect_err("invalid");
        assert!(err.contains("not a url"));
    }

    #[test]
    fn controller_requires_stored_token() {
        let signed_out = context(MemoryTokenStore::default());
        let err = signed_out
            .controller(TerminalPrompt::scripted(true))
            .err()
            .expect("no token");
        assert_eq!(err.exit_code(), 2);
        assert!(err.display_message().contains("deklutter login"));

        let token = SessionToken::new("abc123").expect("token");
        let signed_in = context(MemoryTokenStore::with_token(token));
        assert!(signed_in.controller(TerminalPrompt::scripted(true)).is_ok());
    }

    #[test]
    fn explicit_state_dir_wins() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = resolve_store(Some(dir.path().to_path_buf())).expect("store");
        assert_eq!(store.path(), dir.path().join("deklutter_token"));
    }
}
