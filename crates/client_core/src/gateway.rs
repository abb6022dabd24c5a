//! Remote collaborators consumed by the controllers.

use std::fmt;

use async_trait::async_trait;
use shared::{
    domain::{Donation, LoginResult},
    error::ErrorCode,
};
use thiserror::Error;

/// Credentials accepted by the validator. Only lives for a single submit.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("invalid email or password")]
    Unauthorized,
    #[error("server rejected the request with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("request timed out")]
    Timeout,
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("gateway fault: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Unauthorized => ErrorCode::Unauthorized,
            Self::Rejected { .. } => ErrorCode::Rejected,
            Self::Timeout => ErrorCode::Timeout,
            Self::Transport(_) => ErrorCode::Transport,
            Self::Malformed(_) => ErrorCode::Malformed,
            Self::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Message suitable for showing next to the form.
    pub fn display_message(&self) -> String {
        match self {
            Self::Unauthorized => "Incorrect email or password.".to_string(),
            Self::Timeout | Self::Transport(_) => {
                "Server unreachable; check your connection and retry sign-in.".to_string()
            }
            Self::Rejected { message, .. } if !message.trim().is_empty() => {
                format!("Request failed: {message}")
            }
            Self::Rejected { status, .. } => format!("Request failed (status {status})."),
            Self::Malformed(_) | Self::Internal(_) => {
                "Something went wrong on our side; please try again.".to_string()
            }
        }
    }
}

#[async_trait]
pub trait LoginGateway: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResult, GatewayError>;
}

#[async_trait]
pub trait DonationGateway: Send + Sync {
    async fn list_donations(&self, token: &str) -> Result<Vec<Donation>, GatewayError>;
}
