//! Ringer drive pattern and supervisor.
//!
//! While `ringing` is set, a spawned pattern worker alternates the two
//! coil lines; when it clears, the worker is aborted (not drained) and
//! both lines are forced low. Outputs low is the fail-safe state, so the
//! reset happens unconditionally after cancellation.

use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::lines::OutputLine;
use crate::state::StateStore;
use crate::Field;

/// Poll period of the supervisor; bounds ring start/stop latency.
pub const SUPERVISOR_INTERVAL: Duration = Duration::from_millis(500);

/// Half-cycle of the alternating square wave.
const HALF_CYCLE: Duration = Duration::from_millis(50);

/// Full cycles per burst (~2 s of ringing).
const CYCLES_PER_BURST: u32 = 20;

/// Silence between bursts.
const BURST_PAUSE: Duration = Duration::from_millis(1500);

async fn drive_pattern(ring1: Arc<dyn OutputLine>, ring2: Arc<dyn OutputLine>) {
    loop {
        debug!("ringing...");
        for _ in 0..CYCLES_PER_BURST {
            ring1.set_high(true);
            ring2.set_high(false);
            sleep(HALF_CYCLE).await;

            ring1.set_high(false);
            ring2.set_high(true);
            sleep(HALF_CYCLE).await;
        }

        ring1.set_high(false);
        ring2.set_high(false);
        debug!("pause ringing...");
        sleep(BURST_PAUSE).await;
    }
}

/// Supervisor loop: Idle <-> Ringing on the `ringing` field.
pub async fn run_ringer(
    store: Arc<StateStore>,
    ring1: Arc<dyn OutputLine>,
    ring2: Arc<dyn OutputLine>,
) {
    let mut pattern: Option<JoinHandle<()>> = None;
    let mut ticker = tokio::time::interval(SUPERVISOR_INTERVAL);

    loop {
        ticker.tick().await;
        let ringing = store.get(Field::Ringing).unwrap_or(false);

        if ringing && pattern.is_none() {
            pattern = Some(tokio::spawn(drive_pattern(ring1.clone(), ring2.clone())));
        } else if !ringing {
            if let Some(handle) = pattern.take() {
                handle.abort();

                // The worker may have been cancelled anywhere in its cycle;
                // force the fail-safe level regardless.
                ring1.set_high(false);
                ring2.set_high(false);
            }
        }
    }
}
