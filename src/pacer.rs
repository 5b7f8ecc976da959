// SPDX-License-Identifier: MPL-2.0
//! Playback pacing policies.
//!
//! Two policies drive the pump cadence, selected by [`PacingMode`]:
//!
//! - **Fixed cadence** ([`TickGate`]): an external per-screen-refresh tick
//!   is gated down to a target frame rate. Ticks arriving early are
//!   dropped, never queued.
//! - **Rate matching** ([`RatePacer`]): the pump loop runs continuously
//!   and the worker sleeps after each delivery so the wall-clock spacing
//!   of frames never falls below their authored presentation-time
//!   spacing. Playback may run slower than authored speed when the system
//!   falls behind; no frame is ever dropped to catch up.
//!
//! Both are pure decision types: they compute "process or drop" and "how
//! long to sleep", while the player owns the scheduling itself.

use std::time::{Duration, Instant};

/// Default target frame rate for fixed-cadence playback.
pub const DEFAULT_FPS: u32 = 30;

/// Pacing policy for a playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingMode {
    /// External ticks gated to a target frame rate.
    FixedRate {
        /// Target frames per second; values below 1 are treated as 1.
        fps: u32,
    },

    /// Continuous pump loop on the worker.
    RateMatched {
        /// When true, the worker sleeps between frames to match the
        /// source's own presentation timestamps against the wall clock.
        /// When false, the loop runs unthrottled.
        realtime: bool,
    },
}

impl Default for PacingMode {
    fn default() -> Self {
        Self::FixedRate { fps: DEFAULT_FPS }
    }
}

/// Configuration for an alpha-mask player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayerConfig {
    /// Pacing policy for pump iterations.
    pub pacing: PacingMode,
}

impl PlayerConfig {
    /// Fixed-cadence configuration driven by external ticks.
    #[must_use]
    pub fn fixed_rate(fps: u32) -> Self {
        Self {
            pacing: PacingMode::FixedRate { fps },
        }
    }

    /// Rate-matching configuration; `realtime` selects authored-speed
    /// pacing versus an unthrottled pull loop.
    #[must_use]
    pub fn rate_matched(realtime: bool) -> Self {
        Self {
            pacing: PacingMode::RateMatched { realtime },
        }
    }
}

/// Gates an external tick stream down to a minimum frame interval.
///
/// A tick closer than `1/fps` to the last *processed* tick is dropped
/// with no side effect; it is never queued for later.
#[derive(Debug)]
pub struct TickGate {
    min_interval: Duration,
    last_processed: Option<Instant>,
}

impl TickGate {
    /// Creates a gate for the given target frame rate.
    #[must_use]
    pub fn new(fps: u32) -> Self {
        Self {
            min_interval: Duration::from_secs_f64(1.0 / f64::from(fps.max(1))),
            last_processed: None,
        }
    }

    /// Returns whether the tick at `now` should be processed, recording it
    /// as the last processed tick if so.
    pub fn should_process(&mut self, now: Instant) -> bool {
        if let Some(previous) = self.last_processed {
            if now.saturating_duration_since(previous) < self.min_interval {
                return false;
            }
        }
        self.last_processed = Some(now);
        true
    }

    /// Forgets the last processed tick; the next tick always passes.
    pub fn reset(&mut self) {
        self.last_processed = None;
    }
}

/// Computes the per-frame suspension for rate-matched playback.
///
/// After each delivered frame, compares the presentation-time step from
/// the previous frame against the wall-clock time that actually elapsed,
/// and returns the difference when the wall clock is ahead of schedule.
#[derive(Debug)]
pub struct RatePacer {
    enabled: bool,
    previous_pts_secs: Option<f64>,
    previous_instant: Option<Instant>,
}

impl RatePacer {
    /// Creates a pacer; when `enabled` is false every delay is zero.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            previous_pts_secs: None,
            previous_instant: None,
        }
    }

    /// Returns how long the worker should sleep after delivering the
    /// frame with the given presentation timestamp.
    ///
    /// The first frame of a session is never delayed. The recorded
    /// wall-clock reference accounts for the returned sleep, so delays do
    /// not compound.
    pub fn delay_after(&mut self, pts_secs: f64, now: Instant) -> Duration {
        if !self.enabled {
            return Duration::ZERO;
        }

        let delay = match (self.previous_pts_secs, self.previous_instant) {
            (Some(previous_pts), Some(previous_instant)) => {
                let frame_delta = pts_secs - previous_pts;
                let actual_delta = now.saturating_duration_since(previous_instant);
                if frame_delta > actual_delta.as_secs_f64() {
                    Duration::from_secs_f64(frame_delta - actual_delta.as_secs_f64())
                } else {
                    Duration::ZERO
                }
            }
            _ => Duration::ZERO,
        };

        self.previous_pts_secs = Some(pts_secs);
        self.previous_instant = Some(now + delay);
        delay
    }

    /// Clears the previous-frame reference, as on session start.
    pub fn reset(&mut self) {
        self.previous_pts_secs = None;
        self.previous_instant = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pacing_is_fixed_rate() {
        assert_eq!(
            PlayerConfig::default().pacing,
            PacingMode::FixedRate { fps: DEFAULT_FPS }
        );
    }

    #[test]
    fn gate_passes_first_tick() {
        let mut gate = TickGate::new(30);
        assert!(gate.should_process(Instant::now()));
    }

    #[test]
    fn gate_drops_early_ticks_and_passes_spaced_ones() {
        let mut gate = TickGate::new(25); // 40ms interval
        let t0 = Instant::now();

        assert!(gate.should_process(t0));
        assert!(!gate.should_process(t0 + Duration::from_millis(10)));
        assert!(!gate.should_process(t0 + Duration::from_millis(39)));
        assert!(gate.should_process(t0 + Duration::from_millis(40)));
    }

    #[test]
    fn gate_measures_from_last_processed_tick() {
        let mut gate = TickGate::new(25);
        let t0 = Instant::now();

        assert!(gate.should_process(t0));
        // Dropped ticks must not advance the reference point.
        assert!(!gate.should_process(t0 + Duration::from_millis(30)));
        assert!(gate.should_process(t0 + Duration::from_millis(45)));
        assert!(!gate.should_process(t0 + Duration::from_millis(60)));
    }

    #[test]
    fn gate_dispatch_count_is_bounded_by_target_rate() {
        // A 120Hz trigger against a 30fps gate over one second must
        // process ceil(1s * 30fps) +- 1 ticks, never more.
        let mut gate = TickGate::new(30);
        let t0 = Instant::now();

        let mut processed = 0;
        for i in 0..120 {
            let now = t0 + Duration::from_nanos(i * 1_000_000_000 / 120);
            if gate.should_process(now) {
                processed += 1;
            }
        }
        assert!((29..=31).contains(&processed), "processed {processed}");
    }

    #[test]
    fn gate_reset_forgets_reference() {
        let mut gate = TickGate::new(25);
        let t0 = Instant::now();
        assert!(gate.should_process(t0));
        gate.reset();
        assert!(gate.should_process(t0 + Duration::from_millis(1)));
    }

    #[test]
    fn zero_fps_is_clamped() {
        let mut gate = TickGate::new(0);
        let t0 = Instant::now();
        assert!(gate.should_process(t0));
        assert!(gate.should_process(t0 + Duration::from_secs(1)));
    }

    #[test]
    fn pacer_never_delays_first_frame() {
        let mut pacer = RatePacer::new(true);
        assert_eq!(pacer.delay_after(0.0, Instant::now()), Duration::ZERO);
    }

    #[test]
    fn pacer_sleeps_when_wall_clock_is_ahead_of_schedule() {
        let mut pacer = RatePacer::new(true);
        let t0 = Instant::now();

        assert_eq!(pacer.delay_after(0.0, t0), Duration::ZERO);
        // Second frame is authored 100ms later but arrives after 20ms.
        let delay = pacer.delay_after(0.100, t0 + Duration::from_millis(20));
        let delta_ms = delay.as_secs_f64() * 1000.0;
        assert!((79.0..=81.0).contains(&delta_ms), "delay {delta_ms}ms");
    }

    #[test]
    fn pacer_does_not_sleep_when_system_falls_behind() {
        let mut pacer = RatePacer::new(true);
        let t0 = Instant::now();

        assert_eq!(pacer.delay_after(0.0, t0), Duration::ZERO);
        // Frame authored 33ms later arrives 50ms later: already late.
        assert_eq!(
            pacer.delay_after(0.033, t0 + Duration::from_millis(50)),
            Duration::ZERO
        );
    }

    #[test]
    fn pacer_delays_do_not_compound() {
        let mut pacer = RatePacer::new(true);
        let t0 = Instant::now();

        pacer.delay_after(0.0, t0);
        // Decode is instantaneous; every frame authored 50ms apart.
        let d1 = pacer.delay_after(0.050, t0);
        let d2 = pacer.delay_after(0.100, t0 + d1);
        let ms = |d: Duration| d.as_secs_f64() * 1000.0;
        assert!((49.0..=51.0).contains(&ms(d1)), "d1 {}ms", ms(d1));
        assert!((49.0..=51.0).contains(&ms(d2)), "d2 {}ms", ms(d2));
    }

    #[test]
    fn disabled_pacer_returns_zero() {
        let mut pacer = RatePacer::new(false);
        let t0 = Instant::now();
        assert_eq!(pacer.delay_after(0.0, t0), Duration::ZERO);
        assert_eq!(pacer.delay_after(10.0, t0), Duration::ZERO);
    }

    #[test]
    fn pacer_reset_clears_reference() {
        let mut pacer = RatePacer::new(true);
        let t0 = Instant::now();
        pacer.delay_after(0.0, t0);
        pacer.reset();
        assert_eq!(pacer.delay_after(5.0, t0), Duration::ZERO);
    }
}
