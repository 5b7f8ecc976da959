// SPDX-License-Identifier: MPL-2.0
//! Error types for the alpha-mask player.
//!
//! The taxonomy separates failures that kill a `play()` call before it
//! starts ([`OpenError`]) from failures that surface mid-stream and end a
//! running session ([`PlayerError`]). All errors are local to one session;
//! a subsequent `play()` starts from a clean slate.

use std::fmt;

/// Identifies which of the two video tracks an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Track {
    /// The color ("main") video track.
    Main,
    /// The grayscale mask ("alpha") video track.
    Alpha,
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Track::Main => write!(f, "main"),
            Track::Alpha => write!(f, "alpha"),
        }
    }
}

/// Errors raised while opening a media asset for a playback session.
///
/// Fatal to the `play()` call that triggered them and surfaced
/// synchronously to the caller. The player is left without a live session
/// and can be asked to `play()` again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenError {
    /// The asset contains no decodable video track.
    NoVideoTrack,

    /// The decode session refused the configured BGRA output
    /// (unsupported codec, format, or track configuration).
    OutputRejected(String),

    /// The container itself could not be read (missing file, I/O error,
    /// unrecognized format).
    AssetUnreadable(String),
}

impl fmt::Display for OpenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenError::NoVideoTrack => write!(f, "asset contains no video track"),
            OpenError::OutputRejected(msg) => {
                write!(f, "decode session rejected BGRA output: {msg}")
            }
            OpenError::AssetUnreadable(msg) => write!(f, "asset unreadable: {msg}"),
        }
    }
}

impl std::error::Error for OpenError {}

/// A mid-stream decoder failure on one track.
///
/// Recorded by the track reader and observable through
/// [`FrameSource::last_error`](crate::source::FrameSource::last_error)
/// until the reader is replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    message: String,
}

impl DecodeError {
    /// Creates a decode error from a decoder message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the decoder's message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "decode failed: {}", self.message)
    }
}

impl std::error::Error for DecodeError {}

/// Errors raised by the mask compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendError {
    /// Color and mask images do not share the same extent.
    ExtentMismatch {
        /// Width and height of the color input.
        color: (u32, u32),
        /// Width and height of the mask input.
        mask: (u32, u32),
    },
}

impl fmt::Display for BlendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlendError::ExtentMismatch { color, mask } => write!(
                f,
                "color extent {}x{} does not match mask extent {}x{}",
                color.0, color.1, mask.0, mask.1
            ),
        }
    }
}

impl std::error::Error for BlendError {}

/// Errors delivered on the sink's error channel when a running session
/// fails. Each one transitions the player to the `Failed` state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerError {
    /// One track's decoder failed mid-stream.
    Decode {
        /// The track that failed.
        track: Track,
        /// The underlying decoder error.
        source: DecodeError,
    },

    /// The main track produced a frame but the alpha track was already
    /// exhausted. The two tracks must be authored with matching frame
    /// counts; this is reported distinctly instead of dropping frames
    /// silently forever.
    TrackMismatch,

    /// The compositor rejected a frame pair.
    Blend(BlendError),
}

impl fmt::Display for PlayerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerError::Decode { track, source } => {
                write!(f, "{track} track: {source}")
            }
            PlayerError::TrackMismatch => {
                write!(f, "alpha track exhausted before main track")
            }
            PlayerError::Blend(err) => write!(f, "compositing failed: {err}"),
        }
    }
}

impl std::error::Error for PlayerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlayerError::Decode { source, .. } => Some(source),
            PlayerError::Blend(err) => Some(err),
            PlayerError::TrackMismatch => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_error_messages_name_the_failure() {
        assert_eq!(
            OpenError::NoVideoTrack.to_string(),
            "asset contains no video track"
        );
        assert!(OpenError::OutputRejected("bgra unsupported".into())
            .to_string()
            .contains("bgra unsupported"));
        assert!(OpenError::AssetUnreadable("not found".into())
            .to_string()
            .contains("not found"));
    }

    #[test]
    fn player_error_names_the_failing_track() {
        let err = PlayerError::Decode {
            track: Track::Alpha,
            source: DecodeError::new("bad packet"),
        };
        let text = err.to_string();
        assert!(text.contains("alpha"));
        assert!(text.contains("bad packet"));
    }

    #[test]
    fn decode_error_is_reachable_through_source() {
        use std::error::Error as _;

        let err = PlayerError::Decode {
            track: Track::Main,
            source: DecodeError::new("truncated"),
        };
        assert!(err.source().is_some());
        assert!(PlayerError::TrackMismatch.source().is_none());
    }

    #[test]
    fn blend_error_reports_both_extents() {
        let err = BlendError::ExtentMismatch {
            color: (640, 360),
            mask: (320, 180),
        };
        let text = err.to_string();
        assert!(text.contains("640x360"));
        assert!(text.contains("320x180"));
    }
}
