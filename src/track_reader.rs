// SPDX-License-Identifier: MPL-2.0
//! `FFmpeg` adapter implementing the [`FrameSource`] port trait.
//!
//! [`MediaTrackReader`] owns one decode session over the first video track
//! of a media container and converts each decoded frame to packed BGRA.
//!
//! # Design Notes
//!
//! - The scaler targets BGRA directly so a pulled sample maps onto the
//!   compositor's working image without an extra per-frame copy.
//! - A reader is built fresh for every playback session and never reused;
//!   terminal status is only left by replacing the reader.
//! - `FFmpeg` contexts are not `Send`; they are wrapped in [`ReaderState`]
//!   which is moved onto the pump worker after a synchronous `open`.

use std::path::Path;
use std::sync::{Arc, Once};

use crate::error::{DecodeError, OpenError};
use crate::frame::{DecodedSample, PixelBuffer};
use crate::source::{FrameSource, ReaderStatus, SharedStatus, StatusCell};

/// Static flag to ensure FFmpeg is initialized only once.
static FFMPEG_INIT: Once = Once::new();

/// Initialize FFmpeg with appropriate log level.
///
/// Safe to call multiple times - initialization only happens once thanks
/// to `std::sync::Once`. Sets the FFmpeg log level to ERROR to suppress
/// per-file warning noise.
fn init_ffmpeg() -> Result<(), OpenError> {
    let mut init_result: Result<(), OpenError> = Ok(());

    FFMPEG_INIT.call_once(|| {
        if let Err(e) = ffmpeg_next::init() {
            init_result = Err(OpenError::AssetUnreadable(format!(
                "FFmpeg initialization failed: {e}"
            )));
            return;
        }

        // SAFETY: av_log_set_level is thread-safe and only affects logging
        unsafe {
            ffmpeg_next::ffi::av_log_set_level(ffmpeg_next::ffi::AV_LOG_ERROR);
        }
    });

    init_result
}

/// Internal decoder state that holds `FFmpeg` contexts.
///
/// Kept separate to manage the non-Send `FFmpeg` types properly. Built
/// once per `open` and dropped with the reader.
struct ReaderState {
    /// Input format context.
    input: ffmpeg_next::format::context::Input,
    /// Video decoder.
    decoder: ffmpeg_next::decoder::Video,
    /// BGRA conversion scaler, shared across all frames of the session.
    scaler: ffmpeg_next::software::scaling::Context,
    /// Video stream index.
    stream_index: usize,
    /// Time base for PTS conversion.
    time_base_f64: f64,
}

// SAFETY: ReaderState contains FFmpeg types with internal raw pointers.
// These are safe to send between threads because:
// 1. FFmpeg's decoder/format contexts are thread-safe for single-threaded
//    access per instance
// 2. We maintain exclusive access through Rust's ownership model
// 3. The reader is only used from one thread at a time (move semantics)
unsafe impl Send for ReaderState {}

/// One decode session over the first video track of a media asset,
/// producing BGRA samples on demand.
pub struct MediaTrackReader {
    state: ReaderState,
    status: SharedStatus,
    last_error: Option<DecodeError>,
    width: u32,
    height: u32,
    /// Whether the decoder has been switched to drain mode at end of
    /// input.
    eof_sent: bool,
}

impl MediaTrackReader {
    /// Constructs a decode session bound to the first video track of the
    /// given media asset, configured for packed BGRA output.
    ///
    /// # Errors
    ///
    /// - [`OpenError::AssetUnreadable`] when the container cannot be read
    /// - [`OpenError::NoVideoTrack`] when the asset has no video track
    /// - [`OpenError::OutputRejected`] when the decoder or the BGRA
    ///   scaler refuse the track's configuration
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, OpenError> {
        init_ffmpeg()?;

        let input = ffmpeg_next::format::input(&path)
            .map_err(|e| OpenError::AssetUnreadable(format!("failed to open container: {e}")))?;

        let stream = input
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or(OpenError::NoVideoTrack)?;
        let stream_index = stream.index();

        let time_base = stream.time_base();
        let time_base_f64 = f64::from(time_base.numerator()) / f64::from(time_base.denominator());

        let context_decoder =
            ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
                .map_err(|e| OpenError::OutputRejected(format!("codec context: {e}")))?;
        let decoder = context_decoder
            .decoder()
            .video()
            .map_err(|e| OpenError::OutputRejected(format!("video decoder: {e}")))?;

        let width = decoder.width();
        let height = decoder.height();

        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::BGRA,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| OpenError::OutputRejected(format!("BGRA scaler: {e}")))?;

        Ok(Self {
            state: ReaderState {
                input,
                decoder,
                scaler,
                stream_index,
                time_base_f64,
            },
            status: Arc::new(StatusCell::new(ReaderStatus::Idle)),
            last_error: None,
            width,
            height,
            eof_sent: false,
        })
    }

    /// Records a decoder failure and transitions to `Failed` unless a
    /// cancellation already won.
    fn fail(&mut self, message: String) {
        tracing::warn!(error = %message, "track decode failed");
        self.last_error = Some(DecodeError::new(message));
        self.status
            .transition(ReaderStatus::Reading, ReaderStatus::Failed);
    }

    /// Converts a decoded frame into a BGRA sample.
    fn convert_frame(&mut self, decoded: &ffmpeg_next::frame::Video) -> Option<DecodedSample> {
        let mut bgra_frame = ffmpeg_next::frame::Video::empty();
        if let Err(e) = self.state.scaler.run(decoded, &mut bgra_frame) {
            self.fail(format!("scaling failed: {e}"));
            return None;
        }

        let bytes = extract_packed_data(&bgra_frame);

        let pts_secs = decoded
            .timestamp()
            .map_or(0.0, |pts| pts as f64 * self.state.time_base_f64);

        Some(DecodedSample::new(
            PixelBuffer::from_vec(self.width, self.height, bytes),
            pts_secs,
        ))
    }
}

impl FrameSource for MediaTrackReader {
    fn start(&mut self) {
        self.status
            .transition(ReaderStatus::Idle, ReaderStatus::Reading);
    }

    fn pull_next_sample(&mut self) -> Option<DecodedSample> {
        if self.status.get() != ReaderStatus::Reading {
            return None;
        }

        // Drain a buffered frame first: the decoder may hold frames from
        // a previous packet.
        let mut decoded = ffmpeg_next::frame::Video::empty();
        if self.state.decoder.receive_frame(&mut decoded).is_ok() {
            return self.convert_frame(&decoded);
        }

        // Feed packets until the decoder yields a frame.
        while !self.eof_sent {
            let state = &mut self.state;
            let stream_index = state.stream_index;
            let next_packet = state
                .input
                .packets()
                .find(|(stream, _)| stream.index() == stream_index);

            match next_packet {
                Some((_, packet)) => {
                    if let Err(e) = state.decoder.send_packet(&packet) {
                        self.fail(format!("packet send failed: {e}"));
                        return None;
                    }
                    if state.decoder.receive_frame(&mut decoded).is_ok() {
                        return self.convert_frame(&decoded);
                    }
                }
                None => {
                    // Input exhausted: switch the decoder to drain mode
                    // and pull out any remaining buffered frames.
                    if let Err(e) = state.decoder.send_eof() {
                        self.fail(format!("decoder drain failed: {e}"));
                        return None;
                    }
                    self.eof_sent = true;
                }
            }
        }

        if self.state.decoder.receive_frame(&mut decoded).is_ok() {
            return self.convert_frame(&decoded);
        }

        // True end of stream.
        self.status
            .transition(ReaderStatus::Reading, ReaderStatus::Completed);
        None
    }

    fn status_handle(&self) -> SharedStatus {
        Arc::clone(&self.status)
    }

    fn last_error(&self) -> Option<&DecodeError> {
        self.last_error.as_ref()
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Extracts packed 4-byte-per-pixel data from a frame, handling stride
/// correctly.
#[allow(clippy::cast_possible_truncation)] // stride is always < u32::MAX for video frames
fn extract_packed_data(frame: &ffmpeg_next::frame::Video) -> Vec<u8> {
    let width = frame.width();
    let height = frame.height();
    let data = frame.data(0);
    let stride = frame.stride(0);

    let mut bytes = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        let row_start = (y * stride as u32) as usize;
        let row_end = row_start + (width * 4) as usize;
        bytes.extend_from_slice(&data[row_start..row_end]);
    }

    bytes
}
