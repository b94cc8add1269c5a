//! Handset hook debouncing.
//!
//! The hook switch is read at a coarse interval and reconciled against the
//! store, so contact bounce faster than the poll period is never observed.
//! The store's value-equality short-circuit keeps redundant polls from
//! firing listeners.

use std::sync::Arc;
use std::time::Duration;

use log::debug;

use crate::lines::InputLine;
use crate::state::StateStore;
use crate::Field;

/// Poll period of the hook worker.
pub const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// One debounce step: reconcile `onTheHook` with the observed line level.
/// Line high means the handset is lifted.
pub fn observe(store: &StateStore, line_high: bool) {
    let on_the_hook = store.get(Field::OnTheHook).unwrap_or(false);

    if line_high && on_the_hook {
        debug!("hook is disconnected");
        store.set(Field::OnTheHook, false);
    } else if !line_high && !on_the_hook {
        debug!("hook is connected");
        store.set(Field::OnTheHook, true);
    }
}

pub async fn run_hook(store: Arc<StateStore>, line: Arc<dyn InputLine>) {
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    loop {
        ticker.tick().await;
        observe(&store, line.is_high());
    }
}
