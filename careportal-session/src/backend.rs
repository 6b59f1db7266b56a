//! Portal backend client
//!
//! The backend is an external REST collaborator. The session core only calls
//! two of its endpoints: the login exchange, which returns an identity-shaped
//! payload, and the meeting signature endpoint used by the video hand-off.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PortalError, Result};
use crate::identity::Identity;

/// Login form contents
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Request body for a meeting signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureRequest {
    pub meeting_number: String,
    /// 1 joins as host, 0 as attendee
    pub role: u8,
}

#[derive(Debug, Clone, Deserialize)]
struct SignatureResponse {
    signature: String,
}

/// Error response from the portal API
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    #[serde(alias = "error")]
    pub message: String,
}

/// Endpoints the client calls
#[async_trait]
pub trait PortalBackend: Send + Sync {
    /// Exchange credentials for an identity
    async fn login(&self, credentials: &Credentials) -> Result<Identity>;

    /// Obtain an SDK signature for joining a meeting
    async fn meeting_signature(&self, token: &str, request: &SignatureRequest) -> Result<String>;
}

/// HTTP implementation over `reqwest`
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    http: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn fail(what: &str, response: reqwest::Response) -> PortalError {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        if let Ok(err) = serde_json::from_str::<ErrorResponse>(&body) {
            return PortalError::Backend(format!("{} failed ({}): {}", what, status, err.message));
        }
        PortalError::Backend(format!("{} failed ({}): {}", what, status, body))
    }
}

#[async_trait]
impl PortalBackend for HttpBackend {
    async fn login(&self, credentials: &Credentials) -> Result<Identity> {
        let url = self.endpoint("auth/login");
        debug!(url = %url, email = %credentials.email, "Login request");

        let response = self.http.post(&url).json(credentials).send().await?;
        if !response.status().is_success() {
            return Err(Self::fail("Login", response).await);
        }

        response
            .json::<Identity>()
            .await
            .map_err(|e| PortalError::Backend(format!("Failed to parse login response: {}", e)))
    }

    async fn meeting_signature(&self, token: &str, request: &SignatureRequest) -> Result<String> {
        let url = self.endpoint("meetings/signature");
        debug!(url = %url, meeting = %request.meeting_number, "Signature request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(request)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::fail("Signature", response).await);
        }

        let body = response
            .json::<SignatureResponse>()
            .await
            .map_err(|e| PortalError::Backend(format!("Failed to parse signature response: {}", e)))?;
        Ok(body.signature)
    }
}
