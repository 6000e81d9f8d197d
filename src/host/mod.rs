//! Contract consumed from the host audio engine.
//!
//! The crate treats the platform audio library as an external collaborator
//! behind the [`HostBackend`] trait: probe the devices it knows about, open
//! a stream against one of them with a single callback, and start/stop the
//! result. The production implementation is [`CpalBackend`]; [`MockHost`]
//! drives the same contract from a test thread so the callback protocol and
//! stream lifecycle are testable without hardware.
//!
//! [`CpalBackend`]: cpal_backend::CpalBackend
//! [`MockHost`]: mock::MockHost

pub mod cpal_backend;
pub mod mock;

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::AudioError;

/// The 13 standard sample rates probed for every device, in hertz.
pub const STANDARD_SAMPLE_RATES: [f64; 13] = [
    8000.0, 11025.0, 16000.0, 22050.0, 32000.0, 44100.0, 48000.0, 88200.0, 96000.0, 176_400.0,
    192_000.0, 352_800.0, 384_000.0,
];

/// Return value of a stream callback: keep the stream running, or tell the
/// host to tear it down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    /// Keep invoking the callback.
    Continue,
    /// The stream is finished; the host may stop invoking the callback.
    Complete,
}

/// Driver status bits of interest, passed into every callback invocation.
///
/// Other driver flags are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusFlags {
    /// The driver dropped capture data before this invocation.
    pub input_overflow: bool,
    /// The driver detected a playback overflow/underrun condition.
    pub output_overflow: bool,
}

/// Buffers handed to a stream callback for one driver period.
///
/// `input` holds `frames * input_channels` interleaved captured samples when
/// the invocation carries capture data; `output` holds
/// `frames * output_channels` interleaved slots to fill when it carries
/// playback space. A full-duplex host passes both in one invocation; hosts
/// that split duplex into two driver threads pass one side per invocation.
pub struct CallbackBuffers<'a> {
    /// Captured samples, if this invocation carries the input side.
    pub input: Option<&'a [f32]>,
    /// Playback slots to fill, if this invocation carries the output side.
    pub output: Option<&'a mut [f32]>,
    /// Frame count for this driver period.
    pub frames: usize,
    /// Driver status bits for this invocation.
    pub flags: StatusFlags,
}

/// The single callback installed on a host stream.
///
/// Invoked on the driver's realtime thread: implementations must not block,
/// allocate, or acquire a mutex.
pub type StreamCallback = Box<dyn FnMut(CallbackBuffers<'_>) -> CallbackAction + Send + 'static>;

/// Everything the probe pass learns about one device.
///
/// One entry per (system, device) pair; the catalog expands entries into
/// per-direction bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    /// Name of the host system (e.g. "ALSA", "WASAPI", "CoreAudio").
    pub system: String,
    /// Device name as reported by the host.
    pub device: String,
    /// Position of the device in the backend's stable enumeration order.
    pub index: usize,
    /// Maximum capture channel count; 0 when the device has no input side.
    pub max_input_channels: u16,
    /// Maximum playback channel count; 0 when the device has no output side.
    pub max_output_channels: u16,
    /// The device's preferred sample rate in hertz.
    pub default_sample_rate: f64,
    /// Lowest usable capture latency, in seconds.
    pub low_input_latency: f64,
    /// Highest usable capture latency, in seconds.
    pub high_input_latency: f64,
    /// Lowest usable playback latency, in seconds.
    pub low_output_latency: f64,
    /// Highest usable playback latency, in seconds.
    pub high_output_latency: f64,
    /// Subset of [`STANDARD_SAMPLE_RATES`] the input side supports.
    pub input_rates: Vec<f64>,
    /// Subset of [`STANDARD_SAMPLE_RATES`] the output side supports.
    pub output_rates: Vec<f64>,
    /// Whether this is the host's default capture device.
    pub default_input: bool,
    /// Whether this is the host's default playback device.
    pub default_output: bool,
}

/// Parameters for opening a host stream.
///
/// The sample format is always interleaved 32-bit float; the host chooses
/// the frames-per-buffer figure.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamParams {
    /// Device position in the backend's enumeration order.
    pub device_index: usize,
    /// Capture channel count; 0 disables the input side.
    pub input_channels: u16,
    /// Playback channel count; 0 disables the output side.
    pub output_channels: u16,
    /// Sample rate in hertz.
    pub sample_rate: f64,
    /// Requested latency in seconds, clamped by the backend to what the
    /// device supports.
    pub latency: f64,
}

/// Effective per-direction latency of an open stream, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StreamLatency {
    /// Capture-side latency; 0 for output-only streams.
    pub input: f64,
    /// Playback-side latency; 0 for input-only streams.
    pub output: f64,
}

/// A platform audio backend: device probing plus stream construction.
pub trait HostBackend {
    /// Backend name for logging and diagnostics.
    fn name(&self) -> &str;

    /// Walks every system and device the host knows about and reports their
    /// capabilities, probing each direction against
    /// [`STANDARD_SAMPLE_RATES`].
    ///
    /// # Errors
    ///
    /// Returns an error if the host refuses enumeration entirely; devices
    /// that fail to describe themselves are skipped, not fatal.
    fn probe(&self) -> Result<Vec<DeviceInfo>, AudioError>;

    /// Opens a stream on the device at `params.device_index` and installs
    /// `callback`. The stream is created stopped; call
    /// [`HostStream::start`] to begin callbacks.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::HostOpenFailed`] when the host rejects the
    /// parameters or the device has gone away.
    fn open(
        &self,
        params: &StreamParams,
        callback: StreamCallback,
    ) -> Result<Box<dyn HostStream>, AudioError>;
}

/// A stream opened by a [`HostBackend`]. Dropping the stream closes it.
pub trait HostStream {
    /// Starts callback delivery.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::HostStartFailed`] if the driver refuses.
    fn start(&mut self) -> Result<(), AudioError>;

    /// Stops callback delivery. The stream may be started again.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::HostStopFailed`] if the driver refuses.
    fn stop(&mut self) -> Result<(), AudioError>;

    /// Effective latency as reported by the host after opening.
    fn latency(&self) -> StreamLatency;

    /// Whether the stream is currently delivering callbacks.
    fn is_running(&self) -> bool;
}

/// Live count of host-library users in this process.
static HOST_REFCOUNT: AtomicUsize = AtomicUsize::new(0);

/// RAII guard for the process-wide host library.
///
/// The platform audio library keeps process-wide state, so its
/// initialise/terminate pair is reference-counted: each open stream holds a
/// guard, and the library is considered live while any guard exists.
#[derive(Debug)]
pub struct HostGuard {
    _private: (),
}

impl HostGuard {
    /// Registers one more user of the host library.
    #[must_use]
    pub fn acquire() -> Self {
        HOST_REFCOUNT.fetch_add(1, Ordering::SeqCst);
        Self { _private: () }
    }

    /// Number of live guards in the process.
    #[must_use]
    pub fn active() -> usize {
        HOST_REFCOUNT.load(Ordering::SeqCst)
    }
}

impl Drop for HostGuard {
    fn drop(&mut self) {
        HOST_REFCOUNT.fetch_sub(1, Ordering::SeqCst);
    }
}
