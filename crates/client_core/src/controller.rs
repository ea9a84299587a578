//! Lifecycle of a single prediction request: `Idle -> Pending -> Succeeded | Failed`.
//!
//! Every transition is applied and broadcast while the state lock is held, so
//! subscribers observe transitions in the order they happened. A resolution is
//! applied only if its request is still the active one; anything else is a
//! stale response and is dropped.

use std::{panic::AssertUnwindSafe, sync::Arc, time::Duration};

use chrono::Utc;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use shared::{
    domain::{PredictionRequest, PredictionResult, RequestId, RequestState},
    error::{ApiError, ErrorCode, ValidationError, DEFAULT_PREDICTION_FAILURE},
};
use tokio::{
    sync::{broadcast, Mutex},
    task::{AbortHandle, JoinHandle},
};
use tracing::{debug, error, info, warn};

use crate::PredictionService;

const STATE_EVENT_CAPACITY: usize = 64;

/// What `submit` does when a request is already pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Refuse with `ValidationError::AlreadyInFlight`.
    #[default]
    Reject,
    /// Abort the pending call and start the new one in its place.
    Supersede,
}

#[derive(Debug, Clone, Default)]
pub struct ControllerOptions {
    pub overlap_policy: OverlapPolicy,
    /// Upper bound on a single `predict` call. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
}

struct ControllerState {
    state: RequestState,
    last_id: u64,
    active: Option<RequestId>,
    in_flight: Option<AbortHandle>,
}

pub struct RequestController {
    service: Arc<dyn PredictionService>,
    options: ControllerOptions,
    inner: Mutex<ControllerState>,
    events: broadcast::Sender<RequestState>,
}

/// Handle to an accepted submission.
pub struct InFlight {
    id: RequestId,
    handle: JoinHandle<()>,
}

impl InFlight {
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Waits for the spawned call to finish. Returns `false` if it was
    /// aborted by `reset` or superseded.
    pub async fn settled(self) -> bool {
        self.handle.await.is_ok()
    }
}

impl RequestController {
    pub fn new(service: Arc<dyn PredictionService>) -> Arc<Self> {
        Self::with_options(service, ControllerOptions::default())
    }

    pub fn with_options(service: Arc<dyn PredictionService>, options: ControllerOptions) -> Arc<Self> {
        let (events, _) = broadcast::channel(STATE_EVENT_CAPACITY);
        Arc::new(Self {
            service,
            options,
            inner: Mutex::new(ControllerState {
                state: RequestState::Idle,
                last_id: 0,
                active: None,
                in_flight: None,
            }),
            events,
        })
    }

    pub fn options(&self) -> &ControllerOptions {
        &self.options
    }

    /// Receives every state the controller transitions into, in order.
    pub fn subscribe(&self) -> broadcast::Receiver<RequestState> {
        self.events.subscribe()
    }

    pub async fn current_state(&self) -> RequestState {
        self.inner.lock().await.state.clone()
    }

    /// Validates `raw_symbol`, moves to `Pending` and starts the call.
    ///
    /// The `Pending` transition has been applied and broadcast by the time
    /// this returns. Rejections leave the state untouched.
    pub async fn submit(self: &Arc<Self>, raw_symbol: &str) -> Result<InFlight, ValidationError> {
        let mut guard = self.inner.lock().await;

        let id = RequestId(guard.last_id + 1);
        let Some(request) = PredictionRequest::new(id, raw_symbol) else {
            debug!("rejected submission with empty symbol");
            return Err(ValidationError::EmptySymbol);
        };

        if guard.state.is_pending() {
            match self.options.overlap_policy {
                OverlapPolicy::Reject => {
                    info!(
                        symbol = request.symbol(),
                        "rejected submission while another request is in flight"
                    );
                    return Err(ValidationError::AlreadyInFlight);
                }
                OverlapPolicy::Supersede => {
                    if let Some(previous) = guard.in_flight.take() {
                        previous.abort();
                    }
                    info!(
                        superseded = ?guard.active,
                        symbol = request.symbol(),
                        "superseding in-flight request"
                    );
                }
            }
        }

        guard.last_id = id.0;
        guard.active = Some(id);
        self.transition(
            &mut guard,
            RequestState::Pending {
                request: request.clone(),
            },
        );

        let controller = Arc::clone(self);
        let handle = tokio::spawn(async move { controller.run(request).await });
        guard.in_flight = Some(handle.abort_handle());

        Ok(InFlight { id, handle })
    }

    /// Returns to `Idle`. A call still in flight is aborted and any late
    /// resolution of it is discarded.
    pub async fn reset(&self) {
        let mut guard = self.inner.lock().await;
        if let Some(in_flight) = guard.in_flight.take() {
            in_flight.abort();
        }
        guard.active = None;
        if guard.state != RequestState::Idle {
            self.transition(&mut guard, RequestState::Idle);
        }
    }

    async fn run(self: Arc<Self>, request: PredictionRequest) {
        let call = AssertUnwindSafe(self.service.predict(&request)).catch_unwind();
        let outcome = match self.options.request_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(outcome) => outcome,
                Err(_) => Ok(Err(ApiError::timeout())),
            },
            None => call.await,
        };

        let outcome = outcome.unwrap_or_else(|_| {
            error!(request_id = %request.id(), "prediction service panicked");
            Err(ApiError::new(ErrorCode::Transport, DEFAULT_PREDICTION_FAILURE))
        });

        self.resolve(request, outcome).await;
    }

    async fn resolve(&self, request: PredictionRequest, outcome: Result<PredictionResult, ApiError>) {
        let mut guard = self.inner.lock().await;
        if guard.active != Some(request.id()) {
            debug!(
                request_id = %request.id(),
                active = ?guard.active,
                "discarding stale prediction response"
            );
            return;
        }
        guard.active = None;
        guard.in_flight = None;

        let resolved_at = Utc::now();
        let next = match outcome {
            Ok(result) => {
                info!(
                    request_id = %request.id(),
                    symbol = request.symbol(),
                    predicted_return = result.predicted_return.text(),
                    "prediction succeeded"
                );
                RequestState::Succeeded {
                    request,
                    result,
                    resolved_at,
                }
            }
            Err(err) => {
                warn!(
                    request_id = %request.id(),
                    symbol = request.symbol(),
                    code = ?err.code,
                    detail = %err.message,
                    "prediction failed"
                );
                RequestState::Failed {
                    request,
                    message: err.message,
                    resolved_at,
                }
            }
        };
        self.transition(&mut guard, next);
    }

    fn transition(&self, guard: &mut ControllerState, next: RequestState) {
        debug!(from = guard.state.label(), to = next.label(), "request state transition");
        guard.state = next.clone();
        // No subscribers is fine; the snapshot is still readable.
        let _ = self.events.send(next);
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
