//! Boolean line abstractions at the hardware boundary.
//!
//! Raw pin-level I/O stays outside this crate. Workers see inputs as
//! boolean sources and outputs as boolean sinks; a GPIO backend implements
//! these traits against real pins.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A boolean input source (dial contacts, hook switch).
pub trait InputLine: Send + Sync {
    /// Current line level; `true` is the electrically high level.
    fn is_high(&self) -> bool;
}

/// A boolean output sink (ringer coils).
pub trait OutputLine: Send + Sync {
    fn set_high(&self, high: bool);
}

/// In-memory line backed by an atomic. Implements both traits; used by
/// tests and by the daemon wiring until a pin backend is plugged in.
#[derive(Default)]
pub struct MemoryLine {
    level: AtomicBool,
}

impl MemoryLine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Drive the line level (the "hardware side" of the fake).
    pub fn set(&self, high: bool) {
        self.level.store(high, Ordering::SeqCst);
    }

    pub fn level(&self) -> bool {
        self.level.load(Ordering::SeqCst)
    }
}

impl InputLine for MemoryLine {
    fn is_high(&self) -> bool {
        self.level()
    }
}

impl OutputLine for MemoryLine {
    fn set_high(&self, high: bool) {
        self.set(high);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_line_round_trip() {
        let line = MemoryLine::new();
        assert!(!line.is_high());

        line.set(true);
        assert!(line.is_high());

        OutputLine::set_high(line.as_ref(), false);
        assert!(!line.level());
    }
}
