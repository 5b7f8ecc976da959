// SPDX-License-Identifier: MPL-2.0
//! Frame source port definition.
//!
//! This module defines the [`FrameSource`] trait for pull-based decoded
//! frame producers. The FFmpeg adapter
//! ([`MediaTrackReader`](crate::track_reader::MediaTrackReader)) implements
//! it for real media assets; tests drive the player with scripted sources.
//!
//! # Design Notes
//!
//! - A source's status lives in a shared [`StatusCell`] so that `cancel()`
//!   from a control thread is synchronously visible to a pump iteration
//!   already in flight on the worker.
//! - Terminal states (`Completed`, `Cancelled`, `Failed`) are never left
//!   except by replacing the source entirely; a fresh `play()` builds
//!   fresh sources.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::error::DecodeError;
use crate::frame::DecodedSample;

/// Lifecycle status of one track's decode session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ReaderStatus {
    /// Opened but not yet started.
    #[default]
    Idle = 0,
    /// Actively decoding; samples may be pulled.
    Reading = 1,
    /// True end of stream was reached.
    Completed = 2,
    /// Cancelled by the player or its owner.
    Cancelled = 3,
    /// The decoder reported an unrecoverable error.
    Failed = 4,
}

impl ReaderStatus {
    /// Returns true for states with no outgoing transition.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Reading,
            2 => Self::Completed,
            3 => Self::Cancelled,
            4 => Self::Failed,
            _ => Self::Idle,
        }
    }
}

/// Lock-free status cell shared between a source and the control thread.
///
/// The source (on the pump worker) is the only writer for decode-driven
/// transitions; the control thread writes only the `Cancelled` transition.
/// All transitions use compare-and-swap so a cancellation is never
/// overwritten by a concurrent decode-side transition.
#[derive(Debug)]
pub struct StatusCell(AtomicU8);

impl StatusCell {
    /// Creates a cell in the given initial status.
    #[must_use]
    pub fn new(initial: ReaderStatus) -> Self {
        Self(AtomicU8::new(initial as u8))
    }

    /// Returns the current status.
    #[must_use]
    pub fn get(&self) -> ReaderStatus {
        ReaderStatus::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Transitions from `from` to `to` if the cell still holds `from`.
    ///
    /// Returns whether the transition happened.
    pub fn transition(&self, from: ReaderStatus, to: ReaderStatus) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Transitions any non-terminal status to `Cancelled`.
    ///
    /// Idempotent; returns whether this call performed the transition.
    pub fn cancel(&self) -> bool {
        loop {
            let current = self.get();
            if current.is_terminal() {
                return false;
            }
            if self.transition(current, ReaderStatus::Cancelled) {
                return true;
            }
        }
    }
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new(ReaderStatus::Idle)
    }
}

/// Shared handle to a source's status cell.
pub type SharedStatus = Arc<StatusCell>;

/// Port for pull-based decoded frame producers.
///
/// One instance wraps one media asset's video track. Two instances exist
/// per playback session (main and alpha); both are discarded and rebuilt
/// on every `play()`.
///
/// # State machine
///
/// `Idle -> Reading -> {Completed | Cancelled | Failed}`. There is no
/// transition out of a terminal state; replace the source instead.
pub trait FrameSource: Send {
    /// Begins active decoding. Must be called once, after a successful
    /// open and before any pull. No effect unless the status is `Idle`.
    fn start(&mut self);

    /// Pulls the next decoded sample, advancing the session by exactly
    /// one frame.
    ///
    /// Non-blocking with respect to status: returns `None` without side
    /// effects when the status is not `Reading`. Returns `None` at true
    /// end of stream, transitioning the status to `Completed`. Returns
    /// `None` after recording an error and transitioning to `Failed` when
    /// the decoder fails; the caller must treat [`last_error`] as terminal
    /// before pulling again.
    ///
    /// [`last_error`]: FrameSource::last_error
    fn pull_next_sample(&mut self) -> Option<DecodedSample>;

    /// Returns the current status.
    fn status(&self) -> ReaderStatus {
        self.status_handle().get()
    }

    /// Returns the shared status cell, for cancellation from another
    /// thread.
    fn status_handle(&self) -> SharedStatus;

    /// Transitions any non-terminal status to `Cancelled`. Idempotent and
    /// safe to call from any thread via [`status_handle`].
    ///
    /// [`status_handle`]: FrameSource::status_handle
    fn cancel(&self) {
        self.status_handle().cancel();
    }

    /// Returns the error recorded by a failed pull, if any.
    fn last_error(&self) -> Option<&DecodeError>;

    /// Returns the track's frame extent in pixels.
    fn dimensions(&self) -> (u32, u32);
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trait must stay object-safe; the player boxes its sources.
    fn _assert_object_safe(_: &dyn FrameSource) {}

    #[test]
    fn status_cell_starts_idle() {
        let cell = StatusCell::default();
        assert_eq!(cell.get(), ReaderStatus::Idle);
        assert!(!cell.get().is_terminal());
    }

    #[test]
    fn transition_requires_expected_current_status() {
        let cell = StatusCell::default();
        assert!(cell.transition(ReaderStatus::Idle, ReaderStatus::Reading));
        assert!(!cell.transition(ReaderStatus::Idle, ReaderStatus::Reading));
        assert_eq!(cell.get(), ReaderStatus::Reading);
    }

    #[test]
    fn cancel_from_any_non_terminal_state() {
        let idle = StatusCell::default();
        assert!(idle.cancel());
        assert_eq!(idle.get(), ReaderStatus::Cancelled);

        let reading = StatusCell::new(ReaderStatus::Reading);
        assert!(reading.cancel());
        assert_eq!(reading.get(), ReaderStatus::Cancelled);
    }

    #[test]
    fn cancel_is_idempotent_and_respects_terminal_states() {
        let cell = StatusCell::new(ReaderStatus::Reading);
        assert!(cell.cancel());
        assert!(!cell.cancel());

        let completed = StatusCell::new(ReaderStatus::Completed);
        assert!(!completed.cancel());
        assert_eq!(completed.get(), ReaderStatus::Completed);

        let failed = StatusCell::new(ReaderStatus::Failed);
        assert!(!failed.cancel());
        assert_eq!(failed.get(), ReaderStatus::Failed);
    }

    #[test]
    fn terminal_states_are_terminal() {
        assert!(ReaderStatus::Completed.is_terminal());
        assert!(ReaderStatus::Cancelled.is_terminal());
        assert!(ReaderStatus::Failed.is_terminal());
        assert!(!ReaderStatus::Idle.is_terminal());
        assert!(!ReaderStatus::Reading.is_terminal());
    }
}
