//! Mock host backend for testing without audio hardware.
//!
//! [`MockHost`] serves a canned device list through the [`HostBackend`]
//! contract and hands the installed stream callback to a [`MockDriver`],
//! which the test drives with synthetic buffers. This makes the callback
//! protocol, catalog probing, and the stream state machine testable in CI.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{host_error_name, AudioError};
use crate::host::{
    CallbackAction, CallbackBuffers, DeviceInfo, HostBackend, HostStream, StatusFlags,
    StreamCallback, StreamLatency, StreamParams,
};

/// Builds a [`DeviceInfo`] with a conventional 10ms-200ms latency envelope.
///
/// The first entry of `rates` becomes the default sample rate; a direction
/// with zero channels gets an empty rate list. The device index is assigned
/// by [`MockHost::push_device`].
#[must_use]
pub fn mock_device(
    system: &str,
    device: &str,
    max_input_channels: u16,
    max_output_channels: u16,
    rates: &[f64],
) -> DeviceInfo {
    DeviceInfo {
        system: system.to_string(),
        device: device.to_string(),
        index: 0,
        max_input_channels,
        max_output_channels,
        default_sample_rate: rates.first().copied().unwrap_or(48000.0),
        low_input_latency: 0.010,
        high_input_latency: 0.200,
        low_output_latency: 0.010,
        high_output_latency: 0.200,
        input_rates: if max_input_channels > 0 {
            rates.to_vec()
        } else {
            Vec::new()
        },
        output_rates: if max_output_channels > 0 {
            rates.to_vec()
        } else {
            Vec::new()
        },
        default_input: false,
        default_output: false,
    }
}

/// Shared slot connecting an open mock stream to its driver handle.
struct DriverSlot {
    callback: Mutex<Option<StreamCallback>>,
    running: AtomicBool,
}

/// A host backend serving canned devices, with injectable failures.
///
/// # Example
///
/// ```
/// use duplex_audio::host::mock::{mock_device, MockHost};
/// use duplex_audio::Catalog;
///
/// let mut host = MockHost::new();
/// host.push_device(mock_device("MockAPI", "Loop", 2, 2, &[44100.0, 48000.0]));
///
/// let catalog = Catalog::probe_backend(&host).unwrap();
/// assert_eq!(catalog.systems(), vec!["MockAPI".to_string()]);
/// ```
#[derive(Default)]
pub struct MockHost {
    devices: Vec<DeviceInfo>,
    fail_open: Option<i32>,
    fail_start: Option<i32>,
    slot: Arc<DriverSlot>,
}

impl Default for DriverSlot {
    fn default() -> Self {
        Self {
            callback: Mutex::new(None),
            running: AtomicBool::new(false),
        }
    }
}

impl MockHost {
    /// Creates a backend with no devices.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a device, assigning it the next enumeration index.
    pub fn push_device(&mut self, mut info: DeviceInfo) {
        info.index = self.devices.len();
        self.devices.push(info);
    }

    /// Marks the device at `index` as the host default for its directions.
    pub fn set_default(&mut self, index: usize) {
        if let Some(info) = self.devices.get_mut(index) {
            info.default_input = info.max_input_channels > 0;
            info.default_output = info.max_output_channels > 0;
        }
    }

    /// Makes every subsequent [`open`](HostBackend::open) fail with the
    /// given host error code.
    pub fn fail_open_with(&mut self, code: i32) {
        self.fail_open = Some(code);
    }

    /// Makes every subsequent [`HostStream::start`] fail with the given
    /// host error code.
    pub fn fail_start_with(&mut self, code: i32) {
        self.fail_start = Some(code);
    }

    /// Returns the driver handle used to invoke the installed callback.
    #[must_use]
    pub fn driver(&self) -> MockDriver {
        MockDriver {
            slot: self.slot.clone(),
        }
    }
}

impl HostBackend for MockHost {
    fn name(&self) -> &str {
        "mock"
    }

    fn probe(&self) -> Result<Vec<DeviceInfo>, AudioError> {
        Ok(self.devices.clone())
    }

    fn open(
        &self,
        params: &StreamParams,
        callback: StreamCallback,
    ) -> Result<Box<dyn HostStream>, AudioError> {
        if let Some(code) = self.fail_open {
            return Err(AudioError::HostOpenFailed {
                reason: host_error_name(code).to_string(),
            });
        }
        if params.device_index >= self.devices.len() {
            return Err(AudioError::HostOpenFailed {
                reason: format!("device index {} is out of range", params.device_index),
            });
        }

        *self.slot.callback.lock() = Some(callback);
        self.slot.running.store(false, Ordering::SeqCst);
        Ok(Box::new(MockStream {
            slot: self.slot.clone(),
            latency: StreamLatency {
                input: if params.input_channels > 0 {
                    params.latency
                } else {
                    0.0
                },
                output: if params.output_channels > 0 {
                    params.latency
                } else {
                    0.0
                },
            },
            fail_start: self.fail_start,
        }))
    }
}

/// The stream side of the mock: flips the running flag and clears the
/// installed callback when dropped.
struct MockStream {
    slot: Arc<DriverSlot>,
    latency: StreamLatency,
    fail_start: Option<i32>,
}

impl HostStream for MockStream {
    fn start(&mut self) -> Result<(), AudioError> {
        if let Some(code) = self.fail_start {
            return Err(AudioError::HostStartFailed {
                reason: host_error_name(code).to_string(),
            });
        }
        self.slot.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.slot.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn latency(&self) -> StreamLatency {
        self.latency
    }

    fn is_running(&self) -> bool {
        self.slot.running.load(Ordering::SeqCst)
    }
}

impl Drop for MockStream {
    fn drop(&mut self) {
        *self.slot.callback.lock() = None;
        self.slot.running.store(false, Ordering::SeqCst);
    }
}

/// Test-side handle that plays the role of the audio driver.
///
/// Each `render_*` call invokes the installed stream callback once with
/// synthetic interleaved buffers, returning `None` when no stream is open.
#[derive(Clone)]
pub struct MockDriver {
    slot: Arc<DriverSlot>,
}

impl MockDriver {
    /// Whether a stream callback is currently installed.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.slot.callback.lock().is_some()
    }

    /// Whether the open stream has been started.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.slot.running.load(Ordering::SeqCst)
    }

    /// Delivers one capture period of `frames` frames.
    pub fn render_input(
        &self,
        input: &[f32],
        frames: usize,
        flags: StatusFlags,
    ) -> Option<CallbackAction> {
        let mut slot = self.slot.callback.lock();
        let callback = slot.as_mut()?;
        Some(callback(CallbackBuffers {
            input: Some(input),
            output: None,
            frames,
            flags,
        }))
    }

    /// Requests one playback period of `frames` frames into `output`.
    pub fn render_output(
        &self,
        output: &mut [f32],
        frames: usize,
        flags: StatusFlags,
    ) -> Option<CallbackAction> {
        let mut slot = self.slot.callback.lock();
        let callback = slot.as_mut()?;
        Some(callback(CallbackBuffers {
            input: None,
            output: Some(output),
            frames,
            flags,
        }))
    }

    /// Delivers capture data and requests playback in a single invocation,
    /// the way a native full-duplex host does.
    pub fn render_duplex(
        &self,
        input: &[f32],
        output: &mut [f32],
        frames: usize,
        flags: StatusFlags,
    ) -> Option<CallbackAction> {
        let mut slot = self.slot.callback.lock();
        let callback = slot.as_mut()?;
        Some(callback(CallbackBuffers {
            input: Some(input),
            output: Some(output),
            frames,
            flags,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn duplex_params() -> StreamParams {
        StreamParams {
            device_index: 0,
            input_channels: 2,
            output_channels: 2,
            sample_rate: 48000.0,
            latency: 0.05,
        }
    }

    #[test]
    fn test_probe_returns_pushed_devices() {
        let mut host = MockHost::new();
        host.push_device(mock_device("MockAPI", "Loop", 2, 2, &[48000.0]));
        host.push_device(mock_device("MockAPI", "Mic", 1, 0, &[44100.0]));

        let infos = host.probe().unwrap();
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].index, 0);
        assert_eq!(infos[1].index, 1);
        assert_eq!(infos[1].device, "Mic");
        assert!(infos[1].output_rates.is_empty());
    }

    #[test]
    fn test_open_installs_callback_and_driver_renders() {
        let mut host = MockHost::new();
        host.push_device(mock_device("MockAPI", "Loop", 2, 2, &[48000.0]));
        let driver = host.driver();

        let mut stream = host
            .open(&duplex_params(), Box::new(|_| CallbackAction::Continue))
            .unwrap();
        assert!(driver.is_installed());
        assert!(!driver.is_running());

        stream.start().unwrap();
        assert!(driver.is_running());

        let action = driver
            .render_input(&[0.0; 128], 64, StatusFlags::default())
            .unwrap();
        assert_eq!(action, CallbackAction::Continue);

        drop(stream);
        assert!(!driver.is_installed());
        assert!(driver.render_input(&[], 0, StatusFlags::default()).is_none());
    }

    #[test]
    fn test_injected_open_failure_uses_error_name() {
        let mut host = MockHost::new();
        host.push_device(mock_device("MockAPI", "Loop", 2, 2, &[48000.0]));
        host.fail_open_with(-9996);

        let err = match host.open(&duplex_params(), Box::new(|_| CallbackAction::Continue)) {
            Err(err) => err,
            Ok(_) => panic!("expected open() to fail"),
        };
        assert!(err.to_string().contains("InvalidInputDevice"));
    }

    #[test]
    fn test_injected_start_failure() {
        let mut host = MockHost::new();
        host.push_device(mock_device("MockAPI", "Loop", 2, 2, &[48000.0]));
        host.fail_start_with(-9986);

        let mut stream = host
            .open(&duplex_params(), Box::new(|_| CallbackAction::Continue))
            .unwrap();
        let err = stream.start().unwrap_err();
        assert!(err.to_string().contains("InternalError"));
        assert!(!stream.is_running());
    }

    #[test]
    fn test_open_rejects_bad_index() {
        let host = MockHost::new();
        let err = match host.open(&duplex_params(), Box::new(|_| CallbackAction::Continue)) {
            Err(err) => err,
            Ok(_) => panic!("expected open() to fail"),
        };
        assert!(matches!(err, AudioError::HostOpenFailed { .. }));
    }
}
