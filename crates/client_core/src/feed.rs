//! Donation listing controller for the home screen.

use std::sync::Arc;

use shared::domain::{Donation, LoginResult};

use crate::{
    config::ControllerOptions,
    error::SessionError,
    gateway::DonationGateway,
    lifecycle::{AttemptStart, AttemptTracker, LifecycleEvent, LifecycleStream},
};

const OPERATION: &str = "donation_feed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Started,
    InFlight,
}

/// Fetches the donation list for an authenticated session. Follows the same
/// rules as [`crate::SessionController`]: a refresh while loading is ignored and
/// nothing is published after dispose.
pub struct DonationFeedController {
    gateway: Arc<dyn DonationGateway>,
    token: Arc<str>,
    tracker: Arc<AttemptTracker<Vec<Donation>>>,
    options: ControllerOptions,
}

impl DonationFeedController {
    pub fn new(gateway: Arc<dyn DonationGateway>, session: &LoginResult) -> Self {
        Self::with_options(gateway, session, ControllerOptions::default())
    }

    pub fn with_options(
        gateway: Arc<dyn DonationGateway>,
        session: &LoginResult,
        options: ControllerOptions,
    ) -> Self {
        Self {
            gateway,
            token: Arc::from(session.token.as_str()),
            tracker: AttemptTracker::new(OPERATION, options.event_buffer),
            options,
        }
    }

    pub fn refresh(&self) -> Result<RefreshOutcome, SessionError> {
        let gateway = Arc::clone(&self.gateway);
        let token = Arc::clone(&self.token);
        let started = self.tracker.start(
            move || async move { gateway.list_donations(&token).await },
            self.options.attempt_timeout,
        )?;

        Ok(match started {
            AttemptStart::Started(_) => RefreshOutcome::Started,
            AttemptStart::InFlight => RefreshOutcome::InFlight,
        })
    }

    pub fn subscribe(&self) -> LifecycleStream<Vec<Donation>> {
        self.tracker.subscribe()
    }

    pub fn current(&self) -> LifecycleEvent<Vec<Donation>> {
        self.tracker.current()
    }

    pub fn is_disposed(&self) -> bool {
        self.tracker.is_disposed()
    }

    pub fn dispose(&self) {
        self.tracker.dispose();
    }
}

impl Drop for DonationFeedController {
    fn drop(&mut self) {
        self.tracker.dispose();
    }
}

#[cfg(test)]
#[path = "tests/feed_tests.rs"]
mod tests;
