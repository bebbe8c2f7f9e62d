use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::domain::{DomainError, FailureReason, ResolutionHint, SessionEvent, StreamState};
use crate::ports::{CaptureHost, StreamHandle};

/// A stream opened by a request that was still the latest when it resolved.
#[derive(Clone)]
pub struct ActiveStream {
    /// Sequence number of the open request that produced this stream.
    pub request: u64,
    pub device_id: String,
    pub stream: StreamHandle,
}

struct Slot {
    state: StreamState,
    stream: Option<StreamHandle>,
}

/// Owns the single live capture stream of a session.
///
/// Every `open` takes a new sequence number. A result is only applied if its
/// number is still the latest one issued; otherwise its stream is stopped
/// and dropped. `close` also bumps the sequence, so an open in flight at
/// shutdown is discarded too.
pub struct StreamLifecycle {
    host: Arc<dyn CaptureHost>,
    hint: ResolutionHint,
    latest_request: AtomicU64,
    slot: Mutex<Slot>,
    events: broadcast::Sender<SessionEvent>,
}

impl StreamLifecycle {
    pub fn new(
        host: Arc<dyn CaptureHost>,
        hint: ResolutionHint,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            host,
            hint,
            latest_request: AtomicU64::new(0),
            slot: Mutex::new(Slot {
                state: StreamState::Idle,
                stream: None,
            }),
            events,
        }
    }

    /// Current state.
    pub fn state(&self) -> StreamState {
        self.slot.lock().state.clone()
    }

    /// Whether `request` is still the most recent open or close.
    #[must_use]
    pub fn is_current(&self, request: u64) -> bool {
        self.latest_request.load(Ordering::SeqCst) == request
    }

    /// The live stream, or [`DomainError::StreamNotActive`].
    pub fn active_stream(&self) -> Result<StreamHandle, DomainError> {
        let slot = self.slot.lock();
        match (&slot.state, &slot.stream) {
            (StreamState::Active { .. }, Some(stream)) => Ok(Arc::clone(stream)),
            _ => Err(DomainError::StreamNotActive),
        }
    }

    /// Release the current stream and open a new one bound to `device_id`.
    ///
    /// Returns [`DomainError::StaleOpen`] when a newer `open` or `close`
    /// was issued while this one was in flight.
    pub async fn open(&self, device_id: &str) -> Result<ActiveStream, DomainError> {
        let request = self.latest_request.fetch_add(1, Ordering::SeqCst) + 1;

        let previous = {
            let mut slot = self.slot.lock();
            let previous = slot.stream.take();
            self.transition(
                &mut slot,
                StreamState::Opening {
                    device_id: device_id.to_string(),
                },
            );
            previous
        };
        if let Some(previous) = previous {
            previous.stop();
            debug!(device_id = %previous.device_id(), "Released previous stream");
        }

        info!(device_id = %device_id, request, "Opening capture stream");
        let result = self.host.open_stream(device_id, self.hint).await;

        let mut slot = self.slot.lock();
        if !self.is_current(request) {
            drop(slot);
            if let Ok(stream) = &result {
                stream.stop();
            }
            warn!(device_id = %device_id, request, "Discarding superseded open");
            let _ = self.events.send(SessionEvent::StaleOpenDiscarded {
                device_id: device_id.to_string(),
            });
            return Err(DomainError::StaleOpen {
                device_id: device_id.to_string(),
            });
        }

        match result {
            Ok(stream) => {
                slot.stream = Some(Arc::clone(&stream));
                self.transition(
                    &mut slot,
                    StreamState::Active {
                        device_id: device_id.to_string(),
                    },
                );
                info!(device_id = %device_id, "Capture stream active");
                Ok(ActiveStream {
                    request,
                    device_id: device_id.to_string(),
                    stream,
                })
            }
            Err(e) => {
                self.transition(
                    &mut slot,
                    StreamState::Failed {
                        device_id: device_id.to_string(),
                        reason: FailureReason::from(&e),
                    },
                );
                warn!(device_id = %device_id, error = %e, "Failed to open capture stream");
                Err(e)
            }
        }
    }

    /// Move an open that failed after the stream came up into `Failed` and
    /// release its stream. Ignored once a newer open or close was issued.
    pub fn fail(&self, active: &ActiveStream, error: &DomainError) {
        let mut slot = self.slot.lock();
        if !self.is_current(active.request) {
            return;
        }
        if let Some(stream) = slot.stream.take() {
            stream.stop();
        }
        self.transition(
            &mut slot,
            StreamState::Failed {
                device_id: active.device_id.clone(),
                reason: FailureReason::from(error),
            },
        );
        warn!(device_id = %active.device_id, error = %error, "Capture stream failed after open");
    }

    /// Stop the held stream and return to `Idle`. Safe to call repeatedly.
    pub fn close(&self) {
        self.latest_request.fetch_add(1, Ordering::SeqCst);

        let mut slot = self.slot.lock();
        if let Some(stream) = slot.stream.take() {
            stream.stop();
            info!(device_id = %stream.device_id(), "Capture stream closed");
        }
        if !slot.state.is_idle() {
            self.transition(&mut slot, StreamState::Idle);
        }
    }

    fn transition(&self, slot: &mut Slot, to: StreamState) {
        let from = std::mem::replace(&mut slot.state, to.clone());
        let _ = self.events.send(SessionEvent::StateChanged { from, to });
    }
}

impl Drop for StreamLifecycle {
    fn drop(&mut self) {
        if let Some(stream) = self.slot.get_mut().stream.take() {
            stream.stop();
        }
    }
}
