use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use shared::domain::{
    Donation, DonationId, DonationStatus, LoginResult, UserId, UserProfile,
};
use tokio::sync::{Mutex, Notify};

use crate::gateway::{Credentials, DonationGateway, GatewayError, LoginGateway};

pub(crate) fn sample_login_result() -> LoginResult {
    LoginResult {
        token: "token".to_string(),
        user: UserProfile {
            id: UserId(1),
            email: "test@test.com".to_string(),
            display_name: "Test User".to_string(),
        },
    }
}

pub(crate) fn sample_donations() -> Vec<Donation> {
    vec![
        Donation {
            id: DonationId(10),
            title: "Winter coats".to_string(),
            description: "Three adult coats, lightly used".to_string(),
            donor: UserId(2),
            status: DonationStatus::Available,
            image_url: Some("https://cdn.example.org/coats.jpg".to_string()),
            created_at: Utc.with_ymd_and_hms(2024, 1, 5, 9, 30, 0).unwrap(),
        },
        Donation {
            id: DonationId(11),
            title: "Canned food".to_string(),
            description: "Box of assorted cans".to_string(),
            donor: UserId(3),
            status: DonationStatus::Reserved,
            image_url: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 6, 14, 0, 0).unwrap(),
        },
    ]
}

/// Login gateway returning scripted outcomes, falling back to
/// [`sample_login_result`] once the script runs out. When gated, every call
/// waits for a permit on `gate` before answering.
pub(crate) struct ScriptedGateway {
    outcomes: Mutex<VecDeque<Result<LoginResult, GatewayError>>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<Credentials>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedGateway {
    pub(crate) fn ok() -> Arc<Self> {
        Self::scripted(Vec::new(), None)
    }

    pub(crate) fn failing(error: GatewayError) -> Arc<Self> {
        Self::scripted(vec![Err(error)], None)
    }

    pub(crate) fn gated(outcomes: Vec<Result<LoginResult, GatewayError>>) -> (Arc<Self>, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        (Self::scripted(outcomes, Some(Arc::clone(&gate))), gate)
    }

    fn scripted(
        outcomes: Vec<Result<LoginResult, GatewayError>>,
        gate: Option<Arc<Notify>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            gate,
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) async fn seen(&self) -> Vec<Credentials> {
        self.seen.lock().await.clone()
    }
}

#[async_trait]
impl LoginGateway for ScriptedGateway {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResult, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().await.push(credentials.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.outcomes
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(sample_login_result()))
    }
}

pub(crate) struct PanickingGateway;

#[async_trait]
impl LoginGateway for PanickingGateway {
    async fn login(&self, _credentials: &Credentials) -> Result<LoginResult, GatewayError> {
        panic!("gateway exploded");
    }
}

/// Donation gateway answering from a scripted sequence, repeating the last
/// outcome once the script runs out.
pub(crate) struct StaticDonationGateway {
    outcomes: Mutex<VecDeque<Result<Vec<Donation>, GatewayError>>>,
    fallback: Result<Vec<Donation>, GatewayError>,
    calls: AtomicUsize,
    tokens: Mutex<Vec<String>>,
    gate: Option<Arc<Notify>>,
}

impl StaticDonationGateway {
    pub(crate) fn returning(outcome: Result<Vec<Donation>, GatewayError>) -> Arc<Self> {
        Self::sequence(vec![outcome])
    }

    pub(crate) fn sequence(outcomes: Vec<Result<Vec<Donation>, GatewayError>>) -> Arc<Self> {
        Arc::new(Self::build(outcomes, None))
    }

    pub(crate) fn gated(outcome: Result<Vec<Donation>, GatewayError>) -> (Arc<Self>, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let gateway = Arc::new(Self::build(vec![outcome], Some(Arc::clone(&gate))));
        (gateway, gate)
    }

    fn build(
        outcomes: Vec<Result<Vec<Donation>, GatewayError>>,
        gate: Option<Arc<Notify>>,
    ) -> Self {
        let fallback = outcomes.last().cloned().unwrap_or_else(|| Ok(Vec::new()));
        Self {
            outcomes: Mutex::new(outcomes.into()),
            fallback,
            calls: AtomicUsize::new(0),
            tokens: Mutex::new(Vec::new()),
            gate,
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) async fn tokens(&self) -> Vec<String> {
        self.tokens.lock().await.clone()
    }
}

#[async_trait]
impl DonationGateway for StaticDonationGateway {
    async fn list_donations(&self, token: &str) -> Result<Vec<Donation>, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tokens.lock().await.push(token.to_string());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.outcomes
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// Waits for the next event, failing the test instead of hanging.
pub(crate) async fn next_event<T: Clone>(
    stream: &mut crate::lifecycle::LifecycleStream<T>,
) -> Option<crate::lifecycle::LifecycleEvent<T>> {
    tokio::time::timeout(std::time::Duration::from_secs(5), stream.next_event())
        .await
        .expect("lifecycle event within 5s")
}
