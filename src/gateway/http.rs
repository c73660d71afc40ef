use super::wire::{AuditResponse, CodeRequest, OptimizeResponse, RegisterRequest};
use super::{AuditOutcome, OptimizeOutcome, ReviewService};
use crate::config::Settings;
use crate::error::GatewayError;
use crate::model::{AuditReport, OptimizationResult, VisitorIdentity};
use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Longest slice of an error body carried into a `GatewayError`.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// reqwest-backed client for the review service.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("review-bot/{}", env!("CARGO_PKG_VERSION")))
            .timeout(settings.request_timeout)
            .build()
            .context("build HTTP client")?;
        Ok(Self {
            client,
            base_url: settings.base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, GatewayError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(transport_reason(&e)))?;
        tracing::debug!(%url, status = %response.status(), "service responded");

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let detail = read_error_body(response).await;
        Err(classify_failure(status, detail))
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, GatewayError> {
        let response = self.post(path, body).await?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Transport(transport_reason(&e))
            } else {
                GatewayError::Server {
                    status: Some(status.as_u16()),
                    detail: format!("unreadable response body: {e}"),
                }
            }
        })?;
        serde_json::from_slice(&bytes).map_err(|e| GatewayError::malformed(e.to_string()))
    }
}

/// Map a non-2xx status to its failure class. 429 is quota; everything else
/// is a server failure.
pub(crate) fn classify_failure(status: StatusCode, detail: String) -> GatewayError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        GatewayError::QuotaExceeded
    } else {
        GatewayError::Server {
            status: Some(status.as_u16()),
            detail,
        }
    }
}

fn transport_reason(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else {
        e.to_string()
    }
}

async fn read_error_body(response: reqwest::Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let text = text.trim();
    if text.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string();
    }
    if text.chars().count() > MAX_ERROR_BODY_CHARS {
        let cut: String = text.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{cut}...(truncated)")
    } else {
        text.to_string()
    }
}

impl ReviewService for HttpGateway {
    async fn register(&self, visitor: &VisitorIdentity) -> Result<(), GatewayError> {
        let response = self.post("/register", &RegisterRequest::from(visitor)).await?;
        // Only a plain 200 opens the gate.
        if response.status() == StatusCode::OK {
            Ok(())
        } else {
            Err(GatewayError::Server {
                status: Some(response.status().as_u16()),
                detail: "unexpected registration status".to_string(),
            })
        }
    }

    async fn audit(&self, code: &str) -> AuditOutcome {
        let payload: AuditResponse = self.post_json("/audit", &CodeRequest { code }).await?;
        AuditReport::try_from(payload)
    }

    async fn optimize(&self, code: &str) -> OptimizeOutcome {
        let payload: OptimizeResponse = self.post_json("/optimize", &CodeRequest { code }).await?;
        Ok(OptimizationResult::from(payload))
    }
}
