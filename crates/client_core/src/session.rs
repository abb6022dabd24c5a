//! Login form controller.

use std::sync::Arc;

use shared::domain::LoginResult;
use tracing::{debug, info};

use crate::{
    config::ControllerOptions,
    error::SessionError,
    gateway::{Credentials, LoginGateway},
    lifecycle::{AttemptStart, AttemptTracker, LifecycleEvent, LifecycleStream},
    validation::{validate, ValidationErrors},
};

const OPERATION: &str = "login";

/// Synchronous answer to [`SessionController::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The gateway call was started and `Loading` has been published.
    Accepted,
    /// The credentials failed validation; nothing was sent.
    Invalid(ValidationErrors),
    /// A previous attempt is still loading; this submit was ignored.
    InFlight,
}

impl SubmitOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Invalid(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Validates credentials, runs the login call and publishes its lifecycle.
///
/// `submit` must be called from within a tokio runtime. Dropping the
/// controller disposes it.
pub struct SessionController {
    gateway: Arc<dyn LoginGateway>,
    tracker: Arc<AttemptTracker<LoginResult>>,
    options: ControllerOptions,
}

impl SessionController {
    pub fn new(gateway: Arc<dyn LoginGateway>) -> Self {
        Self::with_options(gateway, ControllerOptions::default())
    }

    pub fn with_options(gateway: Arc<dyn LoginGateway>, options: ControllerOptions) -> Self {
        Self {
            gateway,
            tracker: AttemptTracker::new(OPERATION, options.event_buffer),
            options,
        }
    }

    pub fn submit(&self, email: &str, password: &str) -> Result<SubmitOutcome, SessionError> {
        self.tracker.ensure_open()?;

        let errors = validate(email, password);
        if !errors.is_empty() {
            debug!(
                invalid_fields = errors.len(),
                "login submit rejected by validation"
            );
            return Ok(SubmitOutcome::Invalid(errors));
        }

        let credentials = Credentials::new(email.trim(), password);
        let gateway = Arc::clone(&self.gateway);
        let started = self.tracker.start(
            move || async move { gateway.login(&credentials).await },
            self.options.attempt_timeout,
        )?;

        Ok(match started {
            AttemptStart::Started(_) => SubmitOutcome::Accepted,
            AttemptStart::InFlight => SubmitOutcome::InFlight,
        })
    }

    pub fn subscribe(&self) -> LifecycleStream<LoginResult> {
        self.tracker.subscribe()
    }

    pub fn current(&self) -> LifecycleEvent<LoginResult> {
        self.tracker.current()
    }

    pub fn is_disposed(&self) -> bool {
        self.tracker.is_disposed()
    }

    pub fn dispose(&self) {
        if self.tracker.dispose() {
            info!("login session controller released");
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.tracker.dispose();
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
