//! Rotary pulse-dial decoding.
//!
//! A rotary dial produces N make/break pulses for digit N, except ten
//! pulses which encode digit 0. There is no "done" signal: the inter-digit
//! timeout is what delimits a completed number, matching the pause a caller
//! leaves after the last digit.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::lines::InputLine;
use crate::state::StateStore;

/// Poll period of the dial worker.
pub const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Idle time after the last recorded digit before the sequence is flushed
/// as a completed command.
pub const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Pure decoder for the two dial lines. `click` pulses once per dial step,
/// `stop` pulses once when the dial returns to rest.
pub struct PulseDecoder {
    click_pressed: bool,
    stop_pressed: bool,
    click_counter: u32,
    sequence: String,
    last_recorded: Instant,
}

impl PulseDecoder {
    pub fn new(now: Instant) -> Self {
        Self {
            click_pressed: false,
            stop_pressed: false,
            click_counter: 0,
            sequence: String::new(),
            last_recorded: now,
        }
    }

    /// Digits accumulated since the last flush.
    pub fn pending(&self) -> &str {
        &self.sequence
    }

    /// Advance the decoder by one poll. Returns the completed dial sequence
    /// when the inactivity timeout flushes it.
    pub fn tick(&mut self, now: Instant, click_high: bool, stop_high: bool) -> Option<String> {
        let mut flushed = None;
        if !self.sequence.is_empty()
            && now.duration_since(self.last_recorded) > FLUSH_TIMEOUT
        {
            flushed = Some(std::mem::take(&mut self.sequence));
        }

        // One pulse per full down-up cycle, counted on the rising edge only.
        if click_high && !self.click_pressed {
            self.click_pressed = true;
            self.click_counter += 1;
        } else if !click_high && self.click_pressed {
            self.click_pressed = false;
        }

        if stop_high && !self.stop_pressed {
            if self.click_counter != 0 {
                let digit = if self.click_counter == 10 {
                    0
                } else {
                    self.click_counter
                };

                if digit < 10 {
                    self.sequence.push((b'0' + digit as u8) as char);
                    debug!("recorded {}", digit);
                } else {
                    // 11 or more pulses is not a valid rotary digit.
                    debug!("ignored {}", digit);
                }

                self.last_recorded = now;
            }

            self.stop_pressed = true;
            self.click_counter = 0;
        } else if !stop_high && self.stop_pressed {
            self.stop_pressed = false;
        }

        flushed
    }
}

/// Dial worker: polls the two input lines every 5 ms and enqueues each
/// flushed sequence into the store's command queue.
pub async fn run_dialer(
    store: Arc<StateStore>,
    click: Arc<dyn InputLine>,
    stop: Arc<dyn InputLine>,
) {
    let mut decoder = PulseDecoder::new(Instant::now());
    let mut ticker = tokio::time::interval(POLL_INTERVAL);

    loop {
        ticker.tick().await;
        if let Some(sequence) = decoder.tick(Instant::now(), click.is_high(), stop.is_high()) {
            info!("dialed sequence: {}", sequence);
            store.enqueue_command(sequence);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sim {
        decoder: PulseDecoder,
        now: Instant,
    }

    impl Sim {
        fn new() -> Self {
            let now = Instant::now();
            Self {
                decoder: PulseDecoder::new(now),
                now,
            }
        }

        fn step(&mut self, click: bool, stop: bool) -> Option<String> {
            self.now += POLL_INTERVAL;
            self.decoder.tick(self.now, click, stop)
        }

        /// One full down-up click cycle.
        fn pulse(&mut self) {
            self.step(true, false);
            self.step(false, false);
        }

        /// One stop-line pulse, committing the current burst as a digit.
        fn stop(&mut self) {
            self.step(false, true);
            self.step(false, false);
        }

        fn idle_past_timeout(&mut self) -> Option<String> {
            self.now += FLUSH_TIMEOUT + Duration::from_millis(100);
            self.decoder.tick(self.now, false, false)
        }
    }

    #[test]
    fn test_three_pulses_decode_to_three() {
        let mut sim = Sim::new();
        for _ in 0..3 {
            sim.pulse();
        }
        sim.stop();

        assert_eq!(sim.decoder.pending(), "3");
        assert_eq!(sim.idle_past_timeout().as_deref(), Some("3"));
        assert_eq!(sim.decoder.pending(), "");
    }

    #[test]
    fn test_ten_pulses_decode_to_zero() {
        let mut sim = Sim::new();
        for _ in 0..10 {
            sim.pulse();
        }
        sim.stop();

        assert_eq!(sim.idle_past_timeout().as_deref(), Some("0"));
    }

    #[test]
    fn test_eleven_pulses_are_noise() {
        let mut sim = Sim::new();
        for _ in 0..11 {
            sim.pulse();
        }
        sim.stop();

        assert_eq!(sim.decoder.pending(), "");
        assert_eq!(sim.idle_past_timeout(), None);
    }

    #[test]
    fn test_held_click_counts_once() {
        let mut sim = Sim::new();
        for _ in 0..5 {
            sim.step(true, false);
        }
        sim.step(false, false);
        sim.stop();

        assert_eq!(sim.idle_past_timeout().as_deref(), Some("1"));
    }

    #[test]
    fn test_multi_digit_sequence_flushes_once() {
        let mut sim = Sim::new();
        sim.pulse();
        sim.stop();

        // Second digit entered well inside the timeout window.
        sim.now += Duration::from_millis(500);
        sim.pulse();
        sim.pulse();
        sim.stop();

        assert_eq!(sim.idle_past_timeout().as_deref(), Some("12"));
        assert_eq!(sim.idle_past_timeout(), None);
    }

    #[test]
    fn test_stop_without_pulses_records_nothing() {
        let mut sim = Sim::new();
        sim.stop();
        sim.stop();

        assert_eq!(sim.decoder.pending(), "");
        assert_eq!(sim.idle_past_timeout(), None);
    }

    #[test]
    fn test_noise_burst_still_delays_flush() {
        let mut sim = Sim::new();
        sim.pulse();
        sim.stop();

        // A noise burst arrives inside the timeout window; it records
        // nothing but does reset the inactivity clock.
        sim.now += Duration::from_millis(1000);
        for _ in 0..11 {
            sim.pulse();
        }
        sim.stop();

        sim.now += Duration::from_millis(1900);
        assert_eq!(sim.decoder.tick(sim.now, false, false), None);

        assert_eq!(sim.idle_past_timeout().as_deref(), Some("1"));
    }
}
