//! Bidirectional replication between the state store and the shared
//! segment.
//!
//! Once per tick the bridge compares three byte vectors: `previous` (what
//! it last reconciled), `current_local` (the store snapshot) and
//! `current_shared` (the raw segment). A local change is pushed out; only
//! when no local change occurred is an external change pulled in, so a
//! device-owned update can never be clobbered by a stale external read
//! taken in the same tick. The snapshot comparison replaces the listener
//! suppression the segment writer would otherwise need to avoid echoing
//! its own write-back.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};

use crate::segment::SharedSegment;
use crate::state::StateStore;
use crate::{decode_fields, encode_fields, FIELD_COUNT, FIELD_ORDER, SEGMENT_NAME};

/// Replication tick period; also the eventual-consistency window for
/// concurrent external writes.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

pub struct StateBridge {
    store: Arc<StateStore>,
    path: PathBuf,
    segment: Option<SharedSegment>,
    previous: [u8; FIELD_COUNT],
}

impl StateBridge {
    pub fn new(store: Arc<StateStore>, shm_dir: &Path) -> Self {
        Self {
            store,
            path: shm_dir.join(SEGMENT_NAME),
            segment: None,
            previous: [0; FIELD_COUNT],
        }
    }

    /// Path of the segment file this bridge owns.
    pub fn segment_path(&self) -> &Path {
        &self.path
    }

    /// One replication tick. A missing segment gets one creation attempt;
    /// if that fails the tick is skipped silently and retried next time.
    pub fn tick(&mut self) -> io::Result<()> {
        let Some(segment) = self.segment.as_ref() else {
            match SharedSegment::create(&self.path, FIELD_COUNT) {
                Ok(segment) => {
                    let local = encode_fields(&self.store.snapshot());
                    segment.write_all(&local)?;
                    self.previous = local;
                    self.segment = Some(segment);
                    debug!("segment created at {}", self.path.display());
                }
                Err(e) => {
                    debug!("segment unavailable, skipping tick: {}", e);
                }
            }
            return Ok(());
        };

        let current_local = encode_fields(&self.store.snapshot());
        let current_shared = segment.read_all();

        if current_local != self.previous {
            // A device-owned field changed since the last tick. Local wins
            // over any external write observed in the same tick.
            segment.write_all(&current_local)?;
            self.previous = current_local;
        } else if current_shared.as_slice() != self.previous {
            // The segment changed without a local write: an external
            // process wrote it. Only the externally-owned subset is applied
            // to the store; a stale external rewrite of a device-owned byte
            // leaves `current_local != previous` on the next tick, which
            // republishes the authoritative vector.
            let Some(values) = decode_fields(&current_shared) else {
                warn!(
                    "segment read of unexpected length {}, ignoring",
                    current_shared.len()
                );
                return Ok(());
            };

            for (i, field) in FIELD_ORDER.iter().enumerate() {
                if field.is_externally_owned() {
                    self.store.set(*field, values[i]);
                }
            }
            self.previous.copy_from_slice(&current_shared);
        }

        Ok(())
    }

    /// Release the segment: unmap and remove the backing file. Also runs
    /// implicitly when the bridge is dropped.
    pub fn release(&mut self) {
        self.segment = None;
    }
}

/// Bridge worker. Owns the bridge, so cancelling the worker task drops it
/// and releases the segment.
pub async fn run_bridge(mut bridge: StateBridge) {
    let mut ticker = tokio::time::interval(TICK_INTERVAL);
    loop {
        ticker.tick().await;
        if let Err(e) = bridge.tick() {
            warn!("bridge tick failed: {}", e);
        }
    }
}
