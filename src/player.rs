// SPDX-License-Identifier: MPL-2.0
//! The alpha-mask player: session lifecycle, state machine, and the pump
//! worker that pulls, composites, and delivers frames.
//!
//! # Architecture
//!
//! ```text
//! control thread                 pump worker (spawn_blocking)
//! ──────────────                 ────────────────────────────
//! play() ─── opens 2 readers ──▶ pump loop:
//! tick() ─── gated Pump cmds ──▶   main.pull ─▶ alpha.pull
//! pause()/resume() ─ atomics ──▶   ─▶ blend ─▶ sink.on_frame
//! cancel() ── status cells ────▶   (rate-matched: sleep per PTS)
//! ```
//!
//! All decode/convert/blend work is serialized on one worker; at most one
//! pump iteration is in flight per session. The control thread only flips
//! atomic cells and schedules work, so `pause`, `resume`, and `cancel`
//! are safe to call while an iteration is in flight: the iteration
//! observes the flipped state on its next check and exits without
//! delivering, or delivers one last stale frame if it was already past
//! the check: cancellation is "stop as soon as convenient".

use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::compositor;
use crate::error::{DecodeError, OpenError, PlayerError, Track};
use crate::frame::WorkingImage;
use crate::pacer::{PacingMode, PlayerConfig, RatePacer, TickGate};
use crate::sink::{FrameSink, Observers, PlayerDelegate};
use crate::source::{FrameSource, ReaderStatus, SharedStatus};
use crate::track_reader::MediaTrackReader;

/// Sleep applied by the rate-matched worker while paused or draining,
/// to avoid busy-waiting.
const IDLE_POLL: Duration = Duration::from_millis(10);

/// Lifecycle state of a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum PlayerState {
    /// No session; `play()` has not been called (or the last one failed
    /// to open).
    #[default]
    Idle = 0,
    /// A session is running.
    Playing = 1,
    /// A session exists but new pump iterations are held back.
    Paused = 2,
    /// The main track played to its end.
    Finished = 3,
    /// The session was cancelled.
    Cancelled = 4,
    /// A decoder or compositing failure ended the session.
    Failed = 5,
}

impl PlayerState {
    /// Returns true while the session can still produce frames.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Playing | Self::Paused)
    }

    /// Returns true for states with no outgoing transition within the
    /// session; only a fresh `play()` leaves them.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled | Self::Failed)
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Playing,
            2 => Self::Paused,
            3 => Self::Finished,
            4 => Self::Cancelled,
            5 => Self::Failed,
            _ => Self::Idle,
        }
    }
}

/// Lock-free player state cell shared between the control thread and the
/// pump worker. All transitions are compare-and-swap so a cancellation
/// from the control thread is never overwritten by the worker.
#[derive(Debug)]
struct StateCell(AtomicU8);

impl StateCell {
    fn new(initial: PlayerState) -> Self {
        Self(AtomicU8::new(initial as u8))
    }

    fn get(&self) -> PlayerState {
        PlayerState::from_u8(self.0.load(Ordering::SeqCst))
    }

    fn transition(&self, from: PlayerState, to: PlayerState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Moves any active state to `to`; returns whether this call made the
    /// transition.
    fn terminate_if_active(&self, to: PlayerState) -> bool {
        loop {
            let current = self.get();
            if !current.is_active() {
                return false;
            }
            if self.transition(current, to) {
                return true;
            }
        }
    }
}

/// Commands sent to the pump worker.
#[derive(Debug, Clone, Copy)]
enum PumpCommand {
    /// Run one pump iteration (fixed-cadence mode).
    Pump,
    /// Exit the pump loop.
    Stop,
}

/// Result of one pump iteration.
enum PumpOutcome {
    /// A composited frame was handed to the sink.
    Delivered { pts_secs: f64 },
    /// Nothing to do this iteration (paused, or a track is mid-drain).
    Idle,
    /// The session reached a terminal state; the worker must exit.
    Terminal,
}

/// Everything the pump worker owns: the paired sources, the observers,
/// and the shared state cell.
struct PumpSession {
    main: Box<dyn FrameSource>,
    alpha: Box<dyn FrameSource>,
    observers: Observers,
    state: Arc<StateCell>,
}

impl PumpSession {
    /// One pump iteration: readiness checks, paired pull (main first,
    /// then alpha), convert, blend, deliver.
    fn pump_once(&mut self) -> PumpOutcome {
        match self.state.get() {
            PlayerState::Playing => {}
            PlayerState::Paused => return PumpOutcome::Idle,
            _ => return PumpOutcome::Terminal,
        }

        // End of the main track ends the session; checked before any
        // pull so the last real frame is never followed by a partial
        // iteration.
        if self.main.status() == ReaderStatus::Completed {
            self.finish();
            return PumpOutcome::Terminal;
        }
        if let Some(error) = self.main.last_error().cloned() {
            self.fail(Track::Main, error);
            return PumpOutcome::Terminal;
        }

        let Some(main_sample) = self.main.pull_next_sample() else {
            if let Some(error) = self.main.last_error().cloned() {
                self.fail(Track::Main, error);
                return PumpOutcome::Terminal;
            }
            return match self.main.status() {
                ReaderStatus::Cancelled => PumpOutcome::Terminal,
                // End of stream discovered by this pull; the completed
                // check above finishes the session next iteration.
                _ => PumpOutcome::Idle,
            };
        };

        if let Some(error) = self.alpha.last_error().cloned() {
            self.fail(Track::Alpha, error);
            return PumpOutcome::Terminal;
        }

        let Some(alpha_sample) = self.alpha.pull_next_sample() else {
            if let Some(error) = self.alpha.last_error().cloned() {
                self.fail(Track::Alpha, error);
                return PumpOutcome::Terminal;
            }
            return match self.alpha.status() {
                // The main track still has frames but the alpha track ran
                // out: the pair is mis-authored. Report it instead of
                // silently dropping frames until the main track ends.
                ReaderStatus::Completed => {
                    self.report(&PlayerError::TrackMismatch);
                    PumpOutcome::Terminal
                }
                ReaderStatus::Cancelled => PumpOutcome::Terminal,
                _ => PumpOutcome::Idle,
            };
        };

        let pts_secs = main_sample.pts_secs();
        let (Some(color), Some(mask)) = (
            WorkingImage::from_sample(main_sample),
            WorkingImage::from_sample(alpha_sample),
        ) else {
            // A pulled sample without pixels; nothing to composite.
            return PumpOutcome::Idle;
        };

        match compositor::blend(&color, &mask) {
            Ok(frame) => {
                self.observers.emit_frame(Some(frame));
                PumpOutcome::Delivered { pts_secs }
            }
            Err(error) => {
                self.report(&PlayerError::Blend(error));
                PumpOutcome::Terminal
            }
        }
    }

    fn finish(&self) {
        if self.state.transition(PlayerState::Playing, PlayerState::Finished) {
            tracing::debug!("playback finished");
            self.observers.emit_frame(None);
            self.observers.notify_finished();
        }
    }

    fn fail(&self, track: Track, error: DecodeError) {
        self.report(&PlayerError::Decode {
            track,
            source: error,
        });
    }

    fn report(&self, error: &PlayerError) {
        if self.state.terminate_if_active(PlayerState::Failed) {
            tracing::warn!(%error, "playback failed");
            self.observers.emit_error(error);
        }
    }
}

/// Main pump loop running on a blocking worker.
///
/// Fixed-cadence mode waits for gated `Pump` commands from `tick()`;
/// rate-matched mode pulls continuously and sleeps the pacing delta after
/// each delivery. Either way the loop exits when the session reaches a
/// terminal state or its command channel closes.
fn pump_loop_blocking(
    mut session: PumpSession,
    mode: PacingMode,
    mut command_rx: mpsc::Receiver<PumpCommand>,
) {
    tracing::debug!(?mode, "pump worker started");

    match mode {
        PacingMode::FixedRate { .. } => {
            while let Some(command) = command_rx.blocking_recv() {
                match command {
                    PumpCommand::Stop => break,
                    PumpCommand::Pump => {
                        if matches!(session.pump_once(), PumpOutcome::Terminal) {
                            break;
                        }
                    }
                }
            }
        }
        PacingMode::RateMatched { realtime } => {
            let mut pacer = RatePacer::new(realtime);
            loop {
                match command_rx.try_recv() {
                    Ok(PumpCommand::Stop) | Err(mpsc::error::TryRecvError::Disconnected) => break,
                    Ok(PumpCommand::Pump) | Err(mpsc::error::TryRecvError::Empty) => {}
                }

                match session.pump_once() {
                    PumpOutcome::Terminal => break,
                    PumpOutcome::Idle => std::thread::sleep(IDLE_POLL),
                    PumpOutcome::Delivered { pts_secs } => {
                        let delay = pacer.delay_after(pts_secs, Instant::now());
                        if !delay.is_zero() {
                            std::thread::sleep(delay);
                        }
                    }
                }
            }
        }
    }

    tracing::debug!("pump worker exited");
}

/// Control-side handle to a running session.
struct SessionHandle {
    state: Arc<StateCell>,
    main_status: SharedStatus,
    alpha_status: SharedStatus,
    command_tx: mpsc::Sender<PumpCommand>,
    /// Tick gate, fixed-cadence mode only.
    gate: Option<TickGate>,
}

/// Plays a color video and a grayscale alpha-mask video in lockstep,
/// compositing each frame pair into one transparent RGBA frame.
///
/// One session exists per `play()` call; `play()` always discards any
/// prior session and builds two fresh track readers. Register the sink
/// and delegate before calling `play()`, since observers are captured at
/// session start.
pub struct AlphaMaskPlayer {
    main_url: PathBuf,
    alpha_url: PathBuf,
    config: PlayerConfig,
    observers: Observers,
    session: Option<SessionHandle>,
}

impl AlphaMaskPlayer {
    /// Creates a player for the given main and alpha video assets.
    ///
    /// Nothing is opened until [`play`](Self::play).
    #[must_use]
    pub fn new(
        main_url: impl Into<PathBuf>,
        alpha_url: impl Into<PathBuf>,
        config: PlayerConfig,
    ) -> Self {
        Self {
            main_url: main_url.into(),
            alpha_url: alpha_url.into(),
            config,
            observers: Observers::default(),
            session: None,
        }
    }

    /// Registers the frame sink. The player holds only a weak handle and
    /// never keeps its sink alive.
    pub fn set_sink(&mut self, sink: Weak<dyn FrameSink>) {
        self.observers.set_sink(sink);
    }

    /// Registers the lifecycle delegate, held weakly like the sink.
    pub fn set_delegate(&mut self, delegate: Weak<dyn PlayerDelegate>) {
        self.observers.set_delegate(delegate);
    }

    /// Returns the current player state.
    #[must_use]
    pub fn state(&self) -> PlayerState {
        self.session
            .as_ref()
            .map_or(PlayerState::Idle, |session| session.state.get())
    }

    /// Starts playback from the beginning.
    ///
    /// Tears down any prior session, opens both tracks fresh, and spawns
    /// the pump worker. On an open failure the player is left without a
    /// live session and a later `play()` can be retried.
    ///
    /// # Errors
    ///
    /// Propagates the [`OpenError`] of whichever track failed to open.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime (the pump worker is a
    /// `spawn_blocking` task).
    pub fn play(&mut self) -> Result<(), OpenError> {
        self.teardown_session();
        let main = MediaTrackReader::open(&self.main_url)?;
        let alpha = MediaTrackReader::open(&self.alpha_url)?;
        self.start_session(Box::new(main), Box::new(alpha));
        Ok(())
    }

    /// Starts playback over caller-provided frame sources instead of
    /// opening the configured assets. This is the seam for procedural
    /// sources and for driving the player in tests.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime, like [`play`](Self::play).
    pub fn play_with_sources(
        &mut self,
        main: Box<dyn FrameSource>,
        alpha: Box<dyn FrameSource>,
    ) {
        self.teardown_session();
        self.start_session(main, alpha);
    }

    /// Holds back new pump iterations; one already in flight completes.
    pub fn pause(&self) {
        if let Some(session) = &self.session {
            session
                .state
                .transition(PlayerState::Playing, PlayerState::Paused);
        }
    }

    /// Allows pump iterations to proceed again. Reader state is untouched
    /// by a pause/resume cycle.
    pub fn resume(&self) {
        if let Some(session) = &self.session {
            session
                .state
                .transition(PlayerState::Paused, PlayerState::Playing);
        }
    }

    /// Cancels the session.
    ///
    /// Both readers are cancelled synchronously, so a pump iteration in
    /// flight observes "not reading" on its next status check. The sink
    /// always receives one clear-frame (`None`) so the display clears;
    /// the delegate is notified only if the session had not already
    /// reached a terminal state. Idempotent.
    pub fn cancel(&self) {
        let was_active = match &self.session {
            Some(session) => {
                session.main_status.cancel();
                session.alpha_status.cancel();
                let was_active = session.state.terminate_if_active(PlayerState::Cancelled);
                let _ = session.command_tx.try_send(PumpCommand::Stop);
                was_active
            }
            None => false,
        };

        self.observers.emit_frame(None);
        if was_active {
            tracing::debug!("playback cancelled");
            self.observers.notify_cancelled();
        }
    }

    /// Fixed-cadence trigger, called once per screen refresh.
    ///
    /// Gates the tick stream down to the configured frame rate and
    /// schedules at most one pump iteration onto the worker without
    /// blocking. A tick that arrives while the previous iteration is
    /// still queued is dropped, never queued behind it. No-op while
    /// paused, after a terminal state, or in rate-matched mode.
    pub fn tick(&mut self, now: Instant) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.state.get() != PlayerState::Playing {
            return;
        }
        let Some(gate) = session.gate.as_mut() else {
            return;
        };
        if gate.should_process(now) {
            let _ = session.command_tx.try_send(PumpCommand::Pump);
        }
    }

    fn start_session(&mut self, mut main: Box<dyn FrameSource>, mut alpha: Box<dyn FrameSource>) {
        main.start();
        alpha.start();

        let state = Arc::new(StateCell::new(PlayerState::Playing));
        let main_status = main.status_handle();
        let alpha_status = alpha.status_handle();

        // Capacity 1: a second Pump behind an executing iteration is the
        // most that may ever be queued; further ticks are dropped.
        let (command_tx, command_rx) = mpsc::channel(1);

        let pump = PumpSession {
            main,
            alpha,
            observers: self.observers.clone(),
            state: Arc::clone(&state),
        };
        let mode = self.config.pacing;
        // The worker is not joined: it exits on a terminal state or when
        // the command channel closes at teardown.
        let _ = tokio::task::spawn_blocking(move || pump_loop_blocking(pump, mode, command_rx));

        let gate = match self.config.pacing {
            PacingMode::FixedRate { fps } => Some(TickGate::new(fps)),
            PacingMode::RateMatched { .. } => None,
        };

        self.session = Some(SessionHandle {
            state,
            main_status,
            alpha_status,
            command_tx,
            gate,
        });
    }

    /// Silently discards the current session: readers are cancelled and
    /// the worker exits, but no clear frame or delegate notification is
    /// emitted (this is `play()`'s replace path, not `cancel()`).
    fn teardown_session(&mut self) {
        if let Some(session) = self.session.take() {
            session.main_status.cancel();
            session.alpha_status.cancel();
            session.state.terminate_if_active(PlayerState::Cancelled);
            let _ = session.command_tx.try_send(PumpCommand::Stop);
            // Dropping command_tx closes the channel, which also stops a
            // worker blocked on recv.
        }
    }
}

impl Drop for AlphaMaskPlayer {
    fn drop(&mut self) {
        self.teardown_session();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::CompositedFrame;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn state_cell_transitions_require_expected_state() {
        let cell = StateCell::new(PlayerState::Playing);
        assert!(cell.transition(PlayerState::Playing, PlayerState::Paused));
        assert!(!cell.transition(PlayerState::Playing, PlayerState::Paused));
        assert!(cell.transition(PlayerState::Paused, PlayerState::Playing));
    }

    #[test]
    fn terminate_if_active_covers_playing_and_paused() {
        let playing = StateCell::new(PlayerState::Playing);
        assert!(playing.terminate_if_active(PlayerState::Cancelled));

        let paused = StateCell::new(PlayerState::Paused);
        assert!(paused.terminate_if_active(PlayerState::Failed));

        let finished = StateCell::new(PlayerState::Finished);
        assert!(!finished.terminate_if_active(PlayerState::Cancelled));
        assert_eq!(finished.get(), PlayerState::Finished);
    }

    #[test]
    fn player_without_session_is_idle() {
        let player = AlphaMaskPlayer::new("main.mp4", "alpha.mp4", PlayerConfig::default());
        assert_eq!(player.state(), PlayerState::Idle);
    }

    #[test]
    fn state_classification() {
        assert!(PlayerState::Playing.is_active());
        assert!(PlayerState::Paused.is_active());
        assert!(!PlayerState::Idle.is_active());

        assert!(PlayerState::Finished.is_terminal());
        assert!(PlayerState::Cancelled.is_terminal());
        assert!(PlayerState::Failed.is_terminal());
        assert!(!PlayerState::Playing.is_terminal());
    }

    #[derive(Default)]
    struct ClearCounter {
        clears: AtomicUsize,
        frames: AtomicUsize,
    }

    impl FrameSink for ClearCounter {
        fn on_frame(&self, frame: Option<CompositedFrame>) {
            match frame {
                Some(_) => self.frames.fetch_add(1, Ordering::SeqCst),
                None => self.clears.fetch_add(1, Ordering::SeqCst),
            };
        }
    }

    struct CancelCounter(AtomicUsize);

    impl PlayerDelegate for CancelCounter {
        fn on_cancelled(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn cancel_without_session_clears_but_does_not_notify() {
        let sink = Arc::new(ClearCounter::default());
        let delegate = Arc::new(CancelCounter(AtomicUsize::new(0)));

        let mut player = AlphaMaskPlayer::new("main.mp4", "alpha.mp4", PlayerConfig::default());
        player.set_sink(Arc::downgrade(&sink) as Weak<dyn FrameSink>);
        player.set_delegate(Arc::downgrade(&delegate) as Weak<dyn PlayerDelegate>);

        player.cancel();

        assert_eq!(sink.clears.load(Ordering::SeqCst), 1);
        assert_eq!(sink.frames.load(Ordering::SeqCst), 0);
        assert_eq!(delegate.0.load(Ordering::SeqCst), 0);
        assert_eq!(player.state(), PlayerState::Idle);
    }

    #[test]
    fn tick_without_session_is_a_no_op() {
        let mut player = AlphaMaskPlayer::new("main.mp4", "alpha.mp4", PlayerConfig::default());
        player.tick(Instant::now());
        player.pause();
        player.resume();
        assert_eq!(player.state(), PlayerState::Idle);
    }

    // The player handle must be movable across threads.
    fn assert_send<T: Send>() {}

    #[test]
    fn player_is_send() {
        assert_send::<AlphaMaskPlayer>();
    }
}
