// SPDX-License-Identifier: MPL-2.0
//! Output interfaces consumed by display components and applications.
//!
//! The player does not render. It delivers composited frames to a
//! [`FrameSink`] (typically a view or texture uploader) and terminal
//! lifecycle events to a [`PlayerDelegate`]. Both are registered as
//! [`Weak`] handles: the player never keeps its observers alive, and a
//! callback to an already-dropped observer is silently skipped. The
//! observers must likewise tolerate the player being torn down first.

use std::sync::Weak;

use crate::error::PlayerError;
use crate::frame::CompositedFrame;

/// Receiver of composited frames and mid-stream errors.
///
/// Callbacks arrive on the pump worker (frames, errors) or on the thread
/// that called `cancel()` (the final clear frame). A worker delivery
/// already past its readiness check when `cancel()` runs may land after
/// the clear frame, so implementations must tolerate one stale frame
/// following a clear.
pub trait FrameSink: Send + Sync {
    /// Delivers one composited frame; `None` means "clear the display".
    fn on_frame(&self, frame: Option<CompositedFrame>);

    /// Delivers a mid-stream error that ended the session.
    fn on_error(&self, error: &PlayerError) {
        let _ = error;
    }
}

/// Receiver of terminal playback events.
pub trait PlayerDelegate: Send + Sync {
    /// Playback reached the end of the main track.
    fn on_finished(&self) {}

    /// Playback was cancelled before reaching a terminal state.
    fn on_cancelled(&self) {}
}

/// Non-owning observer registration shared between the player handle and
/// its pump worker. Every callback upgrades the weak handle first and
/// skips observers that are already gone.
#[derive(Clone, Default)]
pub(crate) struct Observers {
    sink: Option<Weak<dyn FrameSink>>,
    delegate: Option<Weak<dyn PlayerDelegate>>,
}

impl Observers {
    pub(crate) fn set_sink(&mut self, sink: Weak<dyn FrameSink>) {
        self.sink = Some(sink);
    }

    pub(crate) fn set_delegate(&mut self, delegate: Weak<dyn PlayerDelegate>) {
        self.delegate = Some(delegate);
    }

    pub(crate) fn emit_frame(&self, frame: Option<CompositedFrame>) {
        if let Some(sink) = self.sink.as_ref().and_then(Weak::upgrade) {
            sink.on_frame(frame);
        }
    }

    pub(crate) fn emit_error(&self, error: &PlayerError) {
        if let Some(sink) = self.sink.as_ref().and_then(Weak::upgrade) {
            sink.on_error(error);
        }
    }

    pub(crate) fn notify_finished(&self) {
        if let Some(delegate) = self.delegate.as_ref().and_then(Weak::upgrade) {
            delegate.on_finished();
        }
    }

    pub(crate) fn notify_cancelled(&self) {
        if let Some(delegate) = self.delegate.as_ref().and_then(Weak::upgrade) {
            delegate.on_cancelled();
        }
    }
}
