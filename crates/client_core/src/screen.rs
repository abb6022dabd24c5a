//! Headless view state folded from controller outcomes and lifecycle events.

use shared::domain::{Donation, LoginResult};

use crate::{
    lifecycle::LifecycleEvent,
    session::SubmitOutcome,
    validation::{Field, ValidationErrors},
};

#[derive(Debug, Default)]
pub struct LoginScreen {
    field_errors: ValidationErrors,
    progress_visible: bool,
    error_message: Option<String>,
    pending_navigation: Option<LoginResult>,
    navigated_for_attempt: bool,
}

impl LoginScreen {
    pub fn apply_submit(&mut self, outcome: &SubmitOutcome) {
        match outcome {
            SubmitOutcome::Invalid(errors) => self.field_errors = errors.clone(),
            SubmitOutcome::Accepted => self.field_errors = ValidationErrors::default(),
            SubmitOutcome::InFlight => {}
        }
    }

    pub fn apply_event(&mut self, event: &LifecycleEvent<LoginResult>) {
        match event {
            LifecycleEvent::Idle => self.progress_visible = false,
            LifecycleEvent::Loading => {
                self.progress_visible = true;
                self.error_message = None;
                self.navigated_for_attempt = false;
            }
            LifecycleEvent::Done(result) => {
                self.progress_visible = false;
                // A replayed `Done` after re-subscribing must not navigate twice.
                if !self.navigated_for_attempt {
                    self.navigated_for_attempt = true;
                    self.pending_navigation = Some(result.clone());
                }
            }
            LifecycleEvent::Error(cause) => {
                self.progress_visible = false;
                self.error_message = Some(cause.display_message());
            }
        }
    }

    /// Hands out the landing-screen transition at most once per successful attempt.
    pub fn take_navigation(&mut self) -> Option<LoginResult> {
        self.pending_navigation.take()
    }

    pub fn field_message(&self, field: Field) -> Option<String> {
        self.field_errors.get(field).map(|error| error.to_string())
    }

    pub fn field_errors(&self) -> &ValidationErrors {
        &self.field_errors
    }

    pub fn is_progress_visible(&self) -> bool {
        self.progress_visible
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}

#[derive(Debug, Default)]
pub struct FeedScreen {
    donations: Vec<Donation>,
    progress_visible: bool,
    error_message: Option<String>,
}

impl FeedScreen {
    pub fn apply_event(&mut self, event: &LifecycleEvent<Vec<Donation>>) {
        match event {
            LifecycleEvent::Idle => self.progress_visible = false,
            LifecycleEvent::Loading => {
                self.progress_visible = true;
                self.error_message = None;
            }
            LifecycleEvent::Done(donations) => {
                self.progress_visible = false;
                self.donations = donations.clone();
            }
            // The previous list stays visible under the error.
            LifecycleEvent::Error(cause) => {
                self.progress_visible = false;
                self.error_message = Some(cause.display_message());
            }
        }
    }

    pub fn donations(&self) -> &[Donation] {
        &self.donations
    }

    pub fn is_progress_visible(&self) -> bool {
        self.progress_visible
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}

#[cfg(test)]
#[path = "tests/screen_tests.rs"]
mod tests;
