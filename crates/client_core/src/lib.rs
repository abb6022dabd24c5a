//! Session core for the donation client: credential validation, the login
//! and donation-feed controllers, and the lifecycle streams they publish.

pub mod config;
pub mod error;
pub mod feed;
pub mod gateway;
pub mod lifecycle;
pub mod screen;
pub mod session;
pub mod transport;
pub mod validation;

pub use config::{ClientSettings, ControllerOptions};
pub use error::SessionError;
pub use feed::{DonationFeedController, RefreshOutcome};
pub use gateway::{Credentials, DonationGateway, GatewayError, LoginGateway};
pub use lifecycle::{LifecycleEvent, LifecycleStream};
pub use screen::{FeedScreen, LoginScreen};
pub use session::{SessionController, SubmitOutcome};
pub use transport::HttpGateway;
pub use validation::{validate, Field, ValidationError, ValidationErrors};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
