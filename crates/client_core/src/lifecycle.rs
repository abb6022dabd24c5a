//! Lifecycle events for one asynchronous operation and the broadcast plumbing
//! shared by the screen controllers.

use std::{
    future::Future,
    panic::AssertUnwindSafe,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use futures::{future, stream, FutureExt, Stream, StreamExt};
use tokio::{
    runtime::Handle,
    sync::broadcast::{
        self,
        error::{RecvError, TryRecvError},
    },
    task::JoinHandle,
};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::{debug, error, info, warn};

use crate::{error::SessionError, gateway::GatewayError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent<T> {
    Idle,
    Loading,
    Done(T),
    Error(GatewayError),
}

impl<T> LifecycleEvent<T> {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_) | Self::Error(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Done(data) => Some(data),
            _ => None,
        }
    }

    pub fn cause(&self) -> Option<&GatewayError> {
        match self {
            Self::Error(cause) => Some(cause),
            _ => None,
        }
    }

    pub fn phase(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Done(_) => "done",
            Self::Error(_) => "error",
        }
    }
}

/// A subscription to a controller's lifecycle events.
///
/// The first item is the controller's state at subscription time, followed by
/// every later transition in order. The stream ends once the controller is
/// disposed and buffered events are drained.
pub struct LifecycleStream<T> {
    replay: Option<LifecycleEvent<T>>,
    receiver: Option<broadcast::Receiver<LifecycleEvent<T>>>,
}

impl<T: Clone> LifecycleStream<T> {
    fn closed() -> Self {
        Self {
            replay: None,
            receiver: None,
        }
    }

    pub async fn next_event(&mut self) -> Option<LifecycleEvent<T>> {
        if let Some(event) = self.replay.take() {
            return Some(event);
        }
        let receiver = self.receiver.as_mut()?;
        loop {
            match receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "lifecycle subscriber lagged; skipping to newer events");
                }
                Err(RecvError::Closed) => {
                    self.receiver = None;
                    return None;
                }
            }
        }
    }

    /// Returns the next already-published event without waiting.
    pub fn try_next_event(&mut self) -> Option<LifecycleEvent<T>> {
        if let Some(event) = self.replay.take() {
            return Some(event);
        }
        let receiver = self.receiver.as_mut()?;
        loop {
            match receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "lifecycle subscriber lagged; skipping to newer events");
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Closed) => {
                    self.receiver = None;
                    return None;
                }
            }
        }
    }
}

impl<T: Clone + Send + 'static> LifecycleStream<T> {
    pub fn into_stream(self) -> impl Stream<Item = LifecycleEvent<T>> + Send + 'static {
        let live = stream::iter(self.receiver.map(BroadcastStream::new))
            .flatten()
            .filter_map(|item| {
                future::ready(match item {
                    Ok(event) => Some(event),
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        warn!(skipped, "lifecycle subscriber lagged; skipping to newer events");
                        None
                    }
                })
            });
        stream::iter(self.replay).chain(live)
    }
}

pub(crate) enum AttemptStart {
    Started(u64),
    InFlight,
}

struct TrackerState<T> {
    current: LifecycleEvent<T>,
    events: Option<broadcast::Sender<LifecycleEvent<T>>>,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

/// Owns the current lifecycle state of one controller and runs its attempts.
///
/// Every publish happens under `state`, so a subscriber never observes a gap or
/// a duplicate between its replayed value and the live events. Results from an
/// attempt whose generation is no longer current, or that finish after
/// dispose, are dropped.
pub(crate) struct AttemptTracker<T> {
    operation: &'static str,
    state: Mutex<TrackerState<T>>,
}

impl<T: Clone + Send + 'static> AttemptTracker<T> {
    pub(crate) fn new(operation: &'static str, capacity: usize) -> Arc<Self> {
        let (events, _) = broadcast::channel(capacity.max(1));
        Arc::new(Self {
            operation,
            state: Mutex::new(TrackerState {
                current: LifecycleEvent::Idle,
                events: Some(events),
                generation: 0,
                task: None,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn current(&self) -> LifecycleEvent<T> {
        self.lock().current.clone()
    }

    pub(crate) fn subscribe(&self) -> LifecycleStream<T> {
        let state = self.lock();
        match &state.events {
            Some(events) => LifecycleStream {
                replay: Some(state.current.clone()),
                receiver: Some(events.subscribe()),
            },
            None => LifecycleStream::closed(),
        }
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.lock().events.is_none()
    }

    pub(crate) fn ensure_open(&self) -> Result<(), SessionError> {
        if self.is_disposed() {
            error!(operation = self.operation, "controller used after dispose");
            return Err(SessionError::Disposed {
                operation: self.operation,
            });
        }
        Ok(())
    }

    /// Publishes `Loading` and spawns `attempt` unless one is already running.
    /// The runtime is resolved first so a failed spawn never leaves the state
    /// stuck in `Loading`.
    pub(crate) fn start<F, Fut>(
        self: &Arc<Self>,
        attempt: F,
        timeout: Option<Duration>,
    ) -> Result<AttemptStart, SessionError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>> + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| {
            error!(
                operation = self.operation,
                "attempt started outside a tokio runtime"
            );
            SessionError::NoRuntime {
                operation: self.operation,
            }
        })?;
        let generation = match self.begin()? {
            AttemptStart::Started(generation) => generation,
            AttemptStart::InFlight => return Ok(AttemptStart::InFlight),
        };

        let pending = attempt();
        let tracker = Arc::clone(self);
        let handle = runtime.spawn(async move {
            let outcome = run_attempt(pending, timeout).await;
            tracker.finish(generation, outcome);
        });
        self.attach(generation, handle);
        Ok(AttemptStart::Started(generation))
    }

    fn begin(&self) -> Result<AttemptStart, SessionError> {
        let mut state = self.lock();
        let Some(events) = state.events.clone() else {
            drop(state);
            error!(operation = self.operation, "controller used after dispose");
            return Err(SessionError::Disposed {
                operation: self.operation,
            });
        };
        if state.current.is_loading() {
            debug!(
                operation = self.operation,
                generation = state.generation,
                "attempt already in flight; ignoring"
            );
            return Ok(AttemptStart::InFlight);
        }

        state.generation += 1;
        state.current = LifecycleEvent::Loading;
        // A send error only means nobody is subscribed right now.
        let _ = events.send(LifecycleEvent::Loading);
        info!(
            operation = self.operation,
            generation = state.generation,
            "attempt started"
        );
        Ok(AttemptStart::Started(state.generation))
    }

    fn attach(&self, generation: u64, handle: JoinHandle<()>) {
        let mut state = self.lock();
        if state.events.is_none() {
            handle.abort();
            return;
        }
        // Otherwise the attempt already finished and the handle is simply detached.
        if state.generation == generation && state.current.is_loading() {
            state.task = Some(handle);
        }
    }

    fn finish(&self, generation: u64, outcome: Result<T, GatewayError>) {
        let mut state = self.lock();
        if state.events.is_none() {
            debug!(
                operation = self.operation,
                generation, "dropping attempt result after dispose"
            );
            return;
        }
        if state.generation != generation {
            debug!(
                operation = self.operation,
                generation, "dropping stale attempt result"
            );
            return;
        }

        let event = match outcome {
            Ok(data) => {
                info!(operation = self.operation, generation, "attempt succeeded");
                LifecycleEvent::Done(data)
            }
            Err(cause) => {
                warn!(
                    operation = self.operation,
                    generation,
                    code = cause.code().as_str(),
                    %cause,
                    "attempt failed"
                );
                LifecycleEvent::Error(cause)
            }
        };
        if let Some(events) = &state.events {
            let _ = events.send(event.clone());
        }
        state.current = event;
        state.task = None;
    }

    /// Closes the stream and aborts the in-flight attempt. Returns `false` when
    /// already disposed.
    pub(crate) fn dispose(&self) -> bool {
        let mut state = self.lock();
        if state.events.take().is_none() {
            return false;
        }
        if let Some(task) = state.task.take() {
            task.abort();
            debug!(
                operation = self.operation,
                generation = state.generation,
                "aborted in-flight attempt"
            );
        }
        info!(operation = self.operation, "controller disposed");
        true
    }
}

async fn run_attempt<T, Fut>(attempt: Fut, timeout: Option<Duration>) -> Result<T, GatewayError>
where
    Fut: Future<Output = Result<T, GatewayError>>,
{
    let guarded = AssertUnwindSafe(attempt).catch_unwind();
    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, guarded).await {
            Ok(outcome) => outcome,
            Err(_) => return Err(GatewayError::Timeout),
        },
        None => guarded.await,
    };
    outcome.unwrap_or_else(|_| Err(GatewayError::Internal("gateway task panicked".to_string())))
}

#[cfg(test)]
#[path = "tests/lifecycle_tests.rs"]
mod tests;
