//! Identity provider client
//!
//! The provider is an opaque external service; this module defines the seam
//! the session store talks through, plus the HTTP implementation used in
//! production. Tests substitute the trait with local fakes.

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::models::Identity;
use crate::utils::error::{CoreError, CoreResult};

/// An authenticated provider session: the bearer credential plus the
/// identity it represents
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub identity: Identity,
}

impl AuthSession {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Sign-in / sign-up input
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Outcome of a sign-in or sign-up attempt.
///
/// `Unconfirmed` is a distinct outcome, not a failure: the caller renders a
/// "confirm your email" instruction instead of a generic error.
#[derive(Debug, Clone, PartialEq)]
pub enum SignInOutcome {
    Authenticated(AuthSession),
    Unconfirmed,
}

/// Seam to the external identity provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Query for an existing, possibly restored, session
    async fn get_session(&self) -> CoreResult<Option<AuthSession>>;

    /// Authenticate with credentials
    async fn sign_in(&self, credentials: &Credentials) -> CoreResult<SignInOutcome>;

    /// Register a new identity; providers that require confirmation yield
    /// `Unconfirmed`
    async fn sign_up(
        &self,
        credentials: &Credentials,
        metadata: Option<serde_json::Value>,
    ) -> CoreResult<SignInOutcome>;

    /// Revoke the given credential
    async fn sign_out(&self, access_token: &str) -> CoreResult<()>;

    /// Exchange the current credential for a fresh one
    async fn refresh_session(&self, access_token: &str) -> CoreResult<Option<AuthSession>>;
}

/// Session payload as returned by the provider's HTTP API
#[derive(Debug, Deserialize)]
struct SessionPayload {
    access_token: Option<String>,
    /// Seconds until expiry, when the provider reports it
    expires_in: Option<i64>,
    /// Absolute unix expiry, when the provider reports it
    expires_at: Option<i64>,
    user: Option<Identity>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    #[serde(default, alias = "error_code", alias = "code")]
    error: Option<String>,
    #[serde(default, alias = "error_description", alias = "msg")]
    message: Option<String>,
}

/// Recover the expiry claim from a JWT access token without verifying the
/// signature. Verification is the backend's job; the core only needs to know
/// when to stop presenting the credential.
fn jwt_expiry(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload)
        .ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    let exp = claims.get("exp")?.as_i64()?;
    Utc.timestamp_opt(exp, 0).single()
}

impl SessionPayload {
    fn into_session(self) -> Option<AuthSession> {
        let access_token = self.access_token?;
        let identity = self.user?;
        let expires_at = self
            .expires_at
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
            .or_else(|| self.expires_in.map(|s| Utc::now() + ChronoDuration::seconds(s)))
            .or_else(|| jwt_expiry(&access_token))
            .unwrap_or_else(|| Utc::now() + ChronoDuration::hours(1));
        Some(AuthSession {
            access_token,
            expires_at,
            identity,
        })
    }
}

/// HTTP identity provider client
#[derive(Clone)]
pub struct HttpIdentityProvider {
    client: Client,
    base_url: String,
}

impl HttpIdentityProvider {
    /// Create a new provider client
    pub fn new(base_url: &str, timeout: Duration) -> CoreResult<Self> {
        info!("Initializing identity provider client for {}", base_url);

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.base_url, path)
    }

    async fn parse_outcome(&self, response: reqwest::Response) -> CoreResult<SignInOutcome> {
        let status = response.status();

        if status.is_success() {
            let payload: SessionPayload = response.json().await?;
            return match payload.into_session() {
                Some(session) => Ok(SignInOutcome::Authenticated(session)),
                // Identity exists but no credential was issued yet
                None => Ok(SignInOutcome::Unconfirmed),
            };
        }

        let body: ProviderError = response.json().await.unwrap_or(ProviderError {
            error: None,
            message: None,
        });

        if is_unconfirmed(&body) {
            debug!("Provider reported unconfirmed identity");
            return Ok(SignInOutcome::Unconfirmed);
        }

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::BAD_REQUEST => {
                Err(CoreError::Credential(
                    body.message
                        .unwrap_or_else(|| "authentication rejected".to_string()),
                ))
            }
            _ => Err(CoreError::Network(format!(
                "identity provider returned {}",
                status
            ))),
        }
    }
}

fn is_unconfirmed(body: &ProviderError) -> bool {
    let in_field = |field: &Option<String>| {
        field
            .as_deref()
            .map(|s| s.contains("not_confirmed") || s.contains("not confirmed"))
            .unwrap_or(false)
    };
    in_field(&body.error) || in_field(&body.message)
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn get_session(&self) -> CoreResult<Option<AuthSession>> {
        let response = self.client.get(self.url("/session")).send().await?;

        match response.status() {
            StatusCode::OK => {
                let payload: SessionPayload = response.json().await?;
                Ok(payload.into_session())
            }
            StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND => Ok(None),
            status => Err(CoreError::Network(format!(
                "identity provider returned {}",
                status
            ))),
        }
    }

    async fn sign_in(&self, credentials: &Credentials) -> CoreResult<SignInOutcome> {
        let response = self
            .client
            .post(self.url("/token?grant_type=password"))
            .json(&serde_json::json!({
                "email": credentials.email,
                "password": credentials.password,
            }))
            .send()
            .await?;

        self.parse_outcome(response).await
    }

    async fn sign_up(
        &self,
        credentials: &Credentials,
        metadata: Option<serde_json::Value>,
    ) -> CoreResult<SignInOutcome> {
        let mut body = serde_json::json!({
            "email": credentials.email,
            "password": credentials.password,
        });
        if let Some(metadata) = metadata {
            body["data"] = metadata;
        }

        let response = self.client.post(self.url("/signup")).json(&body).send().await?;

        self.parse_outcome(response).await
    }

    async fn sign_out(&self, access_token: &str) -> CoreResult<()> {
        let response = self
            .client
            .post(self.url("/logout"))
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "Provider sign-out returned an error");
        }
        Ok(())
    }

    async fn refresh_session(&self, access_token: &str) -> CoreResult<Option<AuthSession>> {
        let response = self
            .client
            .post(self.url("/token?grant_type=refresh"))
            .bearer_auth(access_token)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let payload: SessionPayload = response.json().await?;
                Ok(payload.into_session())
            }
            StatusCode::UNAUTHORIZED => Ok(None),
            status => Err(CoreError::Network(format!(
                "identity provider returned {}",
                status
            ))),
        }
    }
}
