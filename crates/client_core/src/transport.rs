//! reqwest-backed gateway for the donation API.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use shared::{
    domain::{Donation, LoginResult},
    error::ApiError,
    protocol::{DonationListResponse, LoginRequest, LoginResponse},
};
use tracing::debug;

use crate::{
    config::ClientSettings,
    gateway::{Credentials, DonationGateway, GatewayError, LoginGateway},
};

pub struct HttpGateway {
    http: Client,
    server_url: String,
}

impl HttpGateway {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), server_url)
    }

    pub fn with_client(http: Client, server_url: impl Into<String>) -> Self {
        let server_url: String = server_url.into();
        Self {
            http,
            server_url: server_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_settings(settings: &ClientSettings) -> anyhow::Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = settings.request_timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(Self::with_client(builder.build()?, &settings.server_url))
    }
}

#[async_trait]
impl LoginGateway for HttpGateway {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResult, GatewayError> {
        let res = self
            .http
            .post(format!("{}/login", self.server_url))
            .json(&LoginRequest {
                email: credentials.email.clone(),
                password: credentials.password.clone(),
            })
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let body: LoginResponse = ensure_success(res)
            .await?
            .json()
            .await
            .map_err(map_reqwest_error)?;
        if body.token.is_empty() {
            return Err(GatewayError::Malformed(
                "login response carried an empty token".to_string(),
            ));
        }

        Ok(LoginResult {
            token: body.token,
            user: body.user,
        })
    }
}

#[async_trait]
impl DonationGateway for HttpGateway {
    async fn list_donations(&self, token: &str) -> Result<Vec<Donation>, GatewayError> {
        let res = self
            .http
            .get(format!("{}/donations", self.server_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let body: DonationListResponse = ensure_success(res)
            .await?
            .json()
            .await
            .map_err(map_reqwest_error)?;
        Ok(body.donations)
    }
}

async fn ensure_success(res: Response) -> Result<Response, GatewayError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return Err(GatewayError::Unauthorized);
    }

    let raw = res.text().await.unwrap_or_default();
    debug!(status = status.as_u16(), "donation api returned an error status");
    let message = match serde_json::from_str::<ApiError>(&raw) {
        Ok(api_error) => api_error.message,
        Err(_) if !raw.trim().is_empty() => raw.trim().to_string(),
        Err(_) => status.canonical_reason().unwrap_or_default().to_string(),
    };
    Err(GatewayError::Rejected {
        status: status.as_u16(),
        message,
    })
}

fn map_reqwest_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout
    } else if err.is_decode() {
        GatewayError::Malformed(err.to_string())
    } else {
        GatewayError::Transport(err.to_string())
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
