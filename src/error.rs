//! Error types and small helpers shared across the crate.
//!
//! Errors are split into two categories:
//! - **Fail-fast errors** ([`AudioError`]): returned from binding validation
//!   and probe operations.
//! - **Runtime conditions**: stream transitions publish a status string and
//!   return `bool`; ring overflow/underflow are recorded as counters on the
//!   stream, never surfaced as errors.

use thiserror::Error;

/// Errors produced by binding validation, device probing, and the host API.
///
/// Runtime issues on the realtime path (ring overflow, underflow) are not
/// errors - they are counted on the stream and surfaced via
/// [`AudioStream::status()`](crate::AudioStream::status).
#[derive(Debug, Error)]
pub enum AudioError {
    /// The requested latency lies outside the binding's envelope.
    #[error("requested latency {requested}s outside the device envelope [{min}s, {max}s]")]
    InvalidLatency {
        /// The latency that was requested, in seconds.
        requested: f64,
        /// Minimum latency the binding supports, in seconds.
        min: f64,
        /// Maximum latency the binding supports, in seconds.
        max: f64,
    },

    /// A channel count was zero or exceeded the device capability.
    #[error("invalid {direction} channel count {requested} (device supports 1..={max})")]
    InvalidChannelCount {
        /// Which direction the count applied to (`"input"` or `"output"`).
        direction: &'static str,
        /// The channel count that was requested.
        requested: u16,
        /// Maximum channel count the device supports in that direction.
        max: u16,
    },

    /// The host API failed to initialize.
    #[error("host API initialization failed: {reason}")]
    HostInitFailed {
        /// Host-reported reason, typically a name from [`host_error_name`].
        reason: String,
    },

    /// The host API failed to open a stream.
    #[error("host API failed to open stream: {reason}")]
    HostOpenFailed {
        /// Host-reported reason, typically a name from [`host_error_name`].
        reason: String,
    },

    /// The host API failed to start a stream.
    #[error("host API failed to start stream: {reason}")]
    HostStartFailed {
        /// Host-reported reason, typically a name from [`host_error_name`].
        reason: String,
    },

    /// The host API failed to stop a stream.
    #[error("host API failed to stop stream: {reason}")]
    HostStopFailed {
        /// Host-reported reason, typically a name from [`host_error_name`].
        reason: String,
    },

    /// A blocking ring wait observed the ring closing.
    #[error("ring closed")]
    RingClosed,

    /// No device with the given name exists in the probed catalog.
    #[error("device not found: {name}")]
    DeviceNotFound {
        /// Name of the device that wasn't found.
        name: String,
    },

    /// An error from the underlying audio backend.
    #[error("audio backend error: {0}")]
    BackendError(String),
}

/// Returns the descriptive name for a host-API error code.
///
/// The table mirrors the host engine's error vocabulary; unknown codes map
/// to `"Unknown Audio API error"`.
#[must_use]
pub fn host_error_name(code: i32) -> &'static str {
    match code {
        0 => "NoError",
        -10000 => "NotInitialized",
        -9999 => "UnanticipatedHostError",
        -9998 => "InvalidChannelCount",
        -9997 => "InvalidSampleRate",
        -9996 => "InvalidInputDevice",
        -9995 => "InvalidFlag",
        -9994 => "SampleFormatNotSupported",
        -9993 => "BadIOInputDeviceCombination",
        -9992 => "InsufficientMemory",
        -9991 => "BufferTooBig",
        -9990 => "BufferTooSmall",
        -9989 => "NullCallback",
        -9988 => "BadStreamPtr",
        -9987 => "TimedOut",
        -9986 => "InternalError",
        -9985 => "InputDeviceUnavailable",
        -9984 => "IncompatibleHostApiSpecificStreamInfo",
        -9983 => "StreamIsStopped",
        -9982 => "StreamIsNotStopped",
        -9981 => "InputOverflowed",
        -9980 => "OutputUnderflowed",
        -9979 => "HostApiNotFound",
        -9978 => "InvalidHostApi",
        -9977 => "CanNotReadFromACallbackStream",
        -9976 => "CanNotWriteToACallbackStream",
        -9975 => "CanNotReadFromAnOutputOnlyStream",
        -9974 => "CanNotWriteToAnInputOnlyStream",
        -9973 => "IncompatibleStreamHostApi",
        -9972 => "BadBufferPtr",
        _ => "Unknown Audio API error",
    }
}

/// Returns `true` if `haystack` contains `needle`, ignoring case.
///
/// Used by the catalog's system and device name filters.
#[must_use]
pub fn string_contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Formats a float in fixed notation with the given number of decimals.
///
/// Used for the sample-rate and latency figures in stream status strings.
#[must_use]
pub fn format_fixed(value: f64, decimals: usize) -> String {
    format!("{value:.decimals$}")
}
