// SPDX-License-Identifier: MPL-2.0
//! `alphamask_player` plays a pair of synchronized videos, a color main
//! track and a grayscale alpha track, and composites them frame by frame
//! into RGBA frames with per-pixel transparency.
//!
//! The library decodes via `FFmpeg`, paces playback either by gated
//! external ticks or by matching source presentation timestamps against
//! the wall clock, and delivers composited frames to a caller-provided
//! [`FrameSink`]. It performs no rendering of its own.
//!
//! ```no_run
//! use alphamask_player::{AlphaMaskPlayer, PlayerConfig};
//!
//! # async fn demo(sink: std::sync::Weak<dyn alphamask_player::FrameSink>) {
//! let mut player = AlphaMaskPlayer::new(
//!     "fireworks.mp4",
//!     "fireworks_alpha.mp4",
//!     PlayerConfig::rate_matched(true),
//! );
//! player.set_sink(sink);
//! player.play().unwrap();
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/alphamask-player/0.1.0")]

pub mod compositor;
pub mod error;
pub mod fit;
pub mod frame;
pub mod pacer;
pub mod player;
pub mod sink;
pub mod source;
pub mod track_reader;

pub use error::{BlendError, DecodeError, OpenError, PlayerError, Track};
pub use frame::{CompositedFrame, DecodedSample, PixelBuffer, WorkingImage};
pub use pacer::{PacingMode, PlayerConfig};
pub use player::{AlphaMaskPlayer, PlayerState};
pub use sink::{FrameSink, PlayerDelegate};
pub use source::{FrameSource, ReaderStatus};
pub use track_reader::MediaTrackReader;
