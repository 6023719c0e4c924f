//! Backend client with authorization-context propagation
//!
//! Every outbound call to the organization API goes through this client. It
//! fails closed (401-equivalent) before any network I/O when no valid
//! credential exists, stamps the bearer credential and the active tenant id,
//! enforces the request timeout, and forces a local sign-out when the
//! backend rejects the credential.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::BackendConfig;
use crate::services::session::SessionStore;
use crate::utils::error::{CoreError, CoreResult};

/// Header carrying the active organization id so the backend can scope data
/// access
pub const TENANT_HEADER: &str = "X-Org-ID";

/// Error body shape returned by the organization API
#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    error: Option<String>,
    #[serde(default, alias = "msg")]
    message: Option<String>,
}

impl ApiError {
    fn text(&self, fallback: &str) -> String {
        self.message
            .clone()
            .or_else(|| self.error.clone())
            .unwrap_or_else(|| fallback.to_string())
    }

    fn is_invalid_claim(&self) -> bool {
        let check = |s: &Option<String>| {
            s.as_deref()
                .map(|v| v.contains("invalid claim") || v.contains("invalid_claim"))
                .unwrap_or(false)
        };
        check(&self.error) || check(&self.message)
    }
}

/// Organization API client
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    request_timeout: Duration,
    session: Arc<SessionStore>,
    active_org: watch::Receiver<Option<String>>,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// `active_org` is the read side of the organization context's active
    /// selection; the write side stays with the context.
    pub fn new(
        config: &BackendConfig,
        session: Arc<SessionStore>,
        active_org: watch::Receiver<Option<String>>,
    ) -> CoreResult<Self> {
        info!("Initializing backend client for {}", config.base_url);

        let client = Client::builder()
            // Connection-level guard; the per-request deadline in request()
            // is the one callers observe
            .timeout(config.request_timeout() + Duration::from_secs(5))
            .build()
            .map_err(|e| CoreError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            request_timeout: config.request_timeout(),
            session,
            active_org,
        })
    }

    /// Perform an authorized call and deserialize the JSON response
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        cancel: &CancellationToken,
    ) -> CoreResult<T> {
        let response = self.request(method, path, body, cancel).await?;
        Ok(response.json().await?)
    }

    /// Perform an authorized call, discarding the response body
    pub async fn call_unit(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        cancel: &CancellationToken,
    ) -> CoreResult<()> {
        self.request(method, path, body, cancel).await?;
        Ok(())
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        cancel: &CancellationToken,
    ) -> CoreResult<Response> {
        // Fail closed before any network I/O
        let token = self.session.bearer_token().await.ok_or_else(|| {
            CoreError::Credential("no valid credential for backend call".to_string())
        })?;

        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.request(method.clone(), &url).bearer_auth(token);

        let active_org = self.active_org.borrow().clone();
        if let Some(ref org_id) = active_org {
            request = request.header(TENANT_HEADER, org_id);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        debug!(%method, %url, tenant = ?active_org, "Backend request");

        let response = tokio::select! {
            _ = cancel.cancelled() => {
                return Err(CoreError::Timeout(format!("{} {} cancelled", method, path)));
            }
            result = tokio::time::timeout(self.request_timeout, request.send()) => {
                match result {
                    Ok(Ok(response)) => response,
                    Ok(Err(e)) => return Err(e.into()),
                    Err(_) => {
                        return Err(CoreError::Timeout(format!(
                            "{} {} exceeded {}s",
                            method,
                            path,
                            self.request_timeout.as_secs()
                        )));
                    }
                }
            }
        };

        self.check_status(response, path).await
    }

    async fn check_status(&self, response: Response, path: &str) -> CoreResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body: ApiError = response.json().await.unwrap_or(ApiError {
            error: None,
            message: None,
        });

        match status {
            StatusCode::UNAUTHORIZED => {
                // Invalid or expired claim: the session must not stay in an
                // Authenticated-but-rejected state
                self.session.on_credential_invalid().await;
                Err(CoreError::Credential(body.text("credential rejected")))
            }
            StatusCode::FORBIDDEN if body.is_invalid_claim() => {
                self.session.on_credential_invalid().await;
                Err(CoreError::Credential(body.text("credential rejected")))
            }
            StatusCode::FORBIDDEN => Err(CoreError::Forbidden(body.text("access denied"))),
            StatusCode::NOT_FOUND => Err(CoreError::NotFound(body.text(path))),
            StatusCode::CONFLICT => Err(CoreError::Conflict {
                message: body.text("resource already exists"),
                suggested_slug: None,
            }),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                Err(CoreError::Validation(body.text("request rejected")))
            }
            status => {
                warn!(%status, path, "Backend request failed");
                Err(CoreError::Network(format!(
                    "backend returned {} for {}",
                    status, path
                )))
            }
        }
    }
}
