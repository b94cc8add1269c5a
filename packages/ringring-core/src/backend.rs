//! Call backend seam and the queue-consuming integration worker.
//!
//! The SIP stack lives outside this crate, behind [`CallBackend`]. The
//! backend is expected to set `callActive`/`ringing` on call lifecycle
//! events; the worker here owns the local decisions: which dialed
//! sequences are dialable, and when the seated handset means a call must
//! be terminated.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use crate::state::StateStore;
use crate::Field;

/// Poll period of the integration worker.
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Sequence length treated as a dialable destination.
pub const DIAL_LENGTH: usize = 4;

pub trait CallBackend: Send + Sync {
    /// Place an outgoing call to a dialed number.
    fn dial(&self, number: &str) -> Result<(), String>;

    /// Terminate the active call.
    fn hangup(&self) -> Result<(), String>;
}

/// Backend that only logs. Used where no SIP stack is wired up.
pub struct LoggingBackend;

impl CallBackend for LoggingBackend {
    fn dial(&self, number: &str) -> Result<(), String> {
        info!("dial requested: {}", number);
        Ok(())
    }

    fn hangup(&self) -> Result<(), String> {
        info!("hangup requested");
        Ok(())
    }
}

/// One scheduling step of the integration worker.
pub fn service_calls<B: CallBackend + ?Sized>(store: &StateStore, backend: &B) {
    if let Some(number) = store.dequeue_command() {
        let on_the_hook = store.get(Field::OnTheHook).unwrap_or(false);
        if !on_the_hook && number.len() == DIAL_LENGTH {
            if let Err(e) = backend.dial(&number) {
                warn!("dial to {} failed: {}", number, e);
            }
        } else {
            debug!("dropping sequence {:?} (on hook or not dialable)", number);
        }
    }

    let on_the_hook = store.get(Field::OnTheHook).unwrap_or(false);
    let call_active = store.get(Field::CallActive).unwrap_or(false);
    if on_the_hook && call_active {
        match backend.hangup() {
            Ok(()) => {
                store.set(Field::CallActive, false);
                store.set(Field::Ringing, false);
            }
            Err(e) => warn!("hangup failed: {}", e),
        }
    }
}

pub async fn run_call_backend(store: Arc<StateStore>, backend: Arc<dyn CallBackend>) {
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    loop {
        ticker.tick().await;
        service_calls(store.as_ref(), backend.as_ref());
    }
}
