//! Typed client for the mailbox service.
//!
//! # Design
//! - One request/response exchange per call; no retries and no state kept
//!   between calls.
//! - Every failure is normalised into [`ApiError`] so callers see one shape
//!   whatever went wrong on the wire.

use async_trait::async_trait;
use deklutter_api_models::{
    ApplyOutcome, ApplyRequest, AuthorizationStart, ScanRequest, ScanResult, ServiceErrorBody,
};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{ApiError, ApiOperation, ApiResult};
use crate::token::SessionToken;

const INIT_PATH: &str = "/oauth/google/init";
const SCAN_PATH: &str = "/gmail/scan";
const APPLY_PATH: &str = "/gmail/apply";

/// Remote operations the workflow depends on.
#[async_trait]
pub trait MailboxApi: Send + Sync {
    /// Start the provider authorization flow for `source`.
    async fn init_authorization(&self, source: &str) -> ApiResult<AuthorizationStart>;

    /// Classify recent messages.
    async fn scan(&self, token: &SessionToken, request: &ScanRequest) -> ApiResult<ScanResult>;

    /// Trash the messages named by `request`.
    async fn apply(&self, token: &SessionToken, request: &ApplyRequest)
    -> ApiResult<ApplyOutcome>;
}

/// [`MailboxApi`] over HTTP JSON.
#[derive(Debug, Clone)]
pub struct HttpMailboxClient {
    client: Client,
    init_url: Url,
    scan_url: Url,
    apply_url: Url,
}

impl HttpMailboxClient {
    /// Resolve the service endpoints against `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if an endpoint path cannot be joined onto `base_url`
    /// (for example a `data:` URL that cannot be a base).
    pub fn new(client: Client, base_url: &Url) -> Result<Self, url::ParseError> {
        Ok(Self {
            client,
            init_url: base_url.join(INIT_PATH)?,
            scan_url: base_url.join(SCAN_PATH)?,
            apply_url: base_url.join(APPLY_PATH)?,
        })
    }
}

#[async_trait]
impl MailboxApi for HttpMailboxClient {
    async fn init_authorization(&self, source: &str) -> ApiResult<AuthorizationStart> {
        let operation = ApiOperation::Init;
        let mut url = self.init_url.clone();
        url.query_pairs_mut().append_pair("source", source);

        let response = self
            .client
            .post(url)
            .send()
            .await
            .map_err(|source| transport(operation, source))?;
        decode(operation, response).await
    }

    async fn scan(&self, token: &SessionToken, request: &ScanRequest) -> ApiResult<ScanResult> {
        let operation = ApiOperation::Scan;
        tracing::debug!(
            days_back = request.days_back.days(),
            limit = request.limit,
            "requesting scan"
        );
        let response = self
            .client
            .post(self.scan_url.clone())
            .bearer_auth(token.expose())
            .json(request)
            .send()
            .await
            .map_err(|source| transport(operation, source))?;
        decode(operation, response).await
    }

    async fn apply(
        &self,
        token: &SessionToken,
        request: &ApplyRequest,
    ) -> ApiResult<ApplyOutcome> {
        let operation = ApiOperation::Apply;
        tracing::debug!(messages = request.message_ids().len(), "requesting cleanup");
        let response = self
            .client
            .post(self.apply_url.clone())
            .bearer_auth(token.expose())
            .json(request)
            .send()
            .await
            .map_err(|source| transport(operation, source))?;

        if !response.status().is_success() {
            return Err(service_error(operation, response).await);
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|source| transport(operation, source))?;
        // The success body is opaque; a count is shown only when one is reported.
        Ok(serde_json::from_slice(&bytes).unwrap_or_default())
    }
}

fn transport(operation: ApiOperation, source: reqwest::Error) -> ApiError {
    tracing::warn!(operation = %operation, error = %source, "mailbox service unreachable");
    ApiError::Transport { operation, source }
}

async fn decode<T: DeserializeOwned>(operation: ApiOperation, response: Response) -> ApiResult<T> {
    if !response.status().is_success() {
        return Err(service_error(operation, response).await);
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|source| transport(operation, source))?;
    serde_json::from_slice(&bytes).map_err(|err| {
        tracing::warn!(
            operation = %operation,
            error = %err,
            "mailbox service returned an unexpected body"
        );
        ApiError::MalformedResponse {
            operation,
            detail: err.to_string(),
        }
    })
}

/// Build a [`ApiError::Service`] from a non-success response, extracting the
/// body's `message` field when the body is a JSON error document.
async fn service_error(operation: ApiOperation, response: Response) -> ApiError {
    let status = response.status().as_u16();
    let body = response
        .bytes()
        .await
        .ok()
        .and_then(|bytes| serde_json::from_slice::<ServiceErrorBody>(&bytes).ok())
        .unwrap_or_default();

    tracing::warn!(
        operation = %operation,
        status,
        code = body.error.as_deref().unwrap_or("-"),
        action = body.action.as_deref().unwrap_or("-"),
        "mailbox service rejected request"
    );

    ApiError::Service {
        operation,
        status,
        message: body.message,
    }
}
