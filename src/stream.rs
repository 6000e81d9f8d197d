//! Stream lifecycle: binding a catalog entry to a running host stream.
//!
//! [`AudioStream`] drives the `Closed -> Bound -> Open -> Started -> Stopped`
//! state machine, owns the input and output rings, and installs the callback
//! variant matching the binding's direction. The callbacks run on the
//! driver's realtime thread and only touch the rings' wait-free operations;
//! the application thread talks to the same rings through
//! [`in_buffer`](AudioStream::in_buffer) and
//! [`out_buffer`](AudioStream::out_buffer).

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::binding::{Binding, IoType};
use crate::error::{format_fixed, AudioError};
use crate::host::cpal_backend::CpalBackend;
use crate::host::{
    CallbackAction, CallbackBuffers, HostBackend, HostGuard, HostStream, StatusFlags,
    StreamCallback, StreamParams,
};
use crate::ring::{RingBuffer, RingReader, RingWriter};

/// Default capacity of each ring, in samples.
pub const DEFAULT_RING_CAPACITY: usize = 65536;

/// Lifecycle states of an [`AudioStream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// No binding; the initial state, and the result of `close()`.
    Closed,
    /// Parameters validated and stored; the host API is untouched.
    Bound,
    /// Host stream opened, rings open, callback installed.
    Open,
    /// The driver is delivering callbacks.
    Started,
    /// Callbacks stopped; the host stream still exists.
    Stopped,
}

/// A full-duplex-capable audio stream bound to one catalog entry.
///
/// All transitions are synchronous. Construction-time validation
/// ([`bind`](AudioStream::bind)) fails fast with a precise error; the
/// runtime transitions return `bool` and publish a descriptive
/// [`status`](AudioStream::status) string instead of failing.
///
/// # Example
///
/// ```no_run
/// use duplex_audio::{AudioStream, Catalog, IoType};
///
/// let catalog = Catalog::probe()?;
/// let binding = catalog.io_type(IoType::Duplex).first().cloned().expect("no duplex device");
///
/// let mut stream = AudioStream::new();
/// stream.bind(&binding, 0.05, 2, 2)?;
/// assert!(stream.open());
/// assert!(stream.start());
///
/// // Pass captured audio straight back out.
/// let mut frame = [0.0f32; 512];
/// while stream.in_buffer().read_exact(&mut frame) {
///     if let Some(mut grant) = stream.out_buffer().wait_reserve(frame.len()) {
///         grant.copy_from_slice(&frame);
///         grant.commit(frame.len());
///     }
/// }
/// # Ok::<(), duplex_audio::AudioError>(())
/// ```
pub struct AudioStream {
    backend: Arc<dyn HostBackend>,
    ring_capacity: usize,
    state: StreamState,
    binding: Option<Binding>,
    params: Option<StreamParams>,
    host_stream: Option<Box<dyn HostStream>>,
    guard: Option<HostGuard>,
    /// Application side of the input ring; the producer half lives in the
    /// installed callback.
    input_rx: RingReader<f32>,
    /// Application side of the output ring; the consumer half lives in the
    /// installed callback.
    output_tx: RingWriter<f32>,
    input_overflows: Arc<AtomicU32>,
    output_overflows: Arc<AtomicU32>,
    sample_rate: f64,
    latency: f64,
    status: String,
}

impl AudioStream {
    /// Creates an unbound stream against the platform audio library.
    #[must_use]
    pub fn new() -> Self {
        Self::with_backend(Arc::new(CpalBackend::new()))
    }

    /// Creates an unbound stream against an explicit backend; used with the
    /// mock host in tests.
    #[must_use]
    pub fn with_backend(backend: Arc<dyn HostBackend>) -> Self {
        let (_, input_rx) = RingBuffer::new(DEFAULT_RING_CAPACITY).split();
        let (output_tx, _) = RingBuffer::new(DEFAULT_RING_CAPACITY).split();
        Self {
            backend,
            ring_capacity: DEFAULT_RING_CAPACITY,
            state: StreamState::Closed,
            binding: None,
            params: None,
            host_stream: None,
            guard: None,
            input_rx,
            output_tx,
            input_overflows: Arc::new(AtomicU32::new(0)),
            output_overflows: Arc::new(AtomicU32::new(0)),
            sample_rate: 0.0,
            latency: 0.0,
            status: "audio device closed".to_string(),
        }
    }

    /// Sets the capacity of both rings, in samples. Takes effect at the
    /// next [`open`](AudioStream::open); rings never resize while open.
    #[must_use]
    pub fn with_ring_capacity(mut self, capacity: usize) -> Self {
        self.ring_capacity = capacity;
        self
    }

    /// Validates and stores the stream parameters. Does not touch the host
    /// API.
    ///
    /// `latency` must lie in the binding's envelope; the channel count for
    /// each direction the binding uses must be between 1 and the device
    /// capability. Re-binding an open stream closes it first.
    ///
    /// # Errors
    ///
    /// [`AudioError::InvalidLatency`] or [`AudioError::InvalidChannelCount`]
    /// on the first violated constraint.
    pub fn bind(
        &mut self,
        binding: &Binding,
        latency: f64,
        input_channels: u16,
        output_channels: u16,
    ) -> Result<(), AudioError> {
        if self.host_stream.is_some() {
            self.close();
        }

        if latency < binding.min_latency() || latency > binding.max_latency() {
            return Err(AudioError::InvalidLatency {
                requested: latency,
                min: binding.min_latency(),
                max: binding.max_latency(),
            });
        }
        let needs_input = matches!(binding.io_type(), IoType::Input | IoType::Duplex);
        let needs_output = matches!(binding.io_type(), IoType::Output | IoType::Duplex);
        if needs_input && (input_channels == 0 || input_channels > binding.max_input_channels()) {
            return Err(AudioError::InvalidChannelCount {
                direction: "input",
                requested: input_channels,
                max: binding.max_input_channels(),
            });
        }
        if needs_output && (output_channels == 0 || output_channels > binding.max_output_channels())
        {
            return Err(AudioError::InvalidChannelCount {
                direction: "output",
                requested: output_channels,
                max: binding.max_output_channels(),
            });
        }

        let sample_rate = binding
            .sample_rates()
            .first()
            .copied()
            .unwrap_or_else(|| binding.default_sample_rate());
        self.params = Some(StreamParams {
            device_index: binding.device_index(),
            input_channels: if needs_input { input_channels } else { 0 },
            output_channels: if needs_output { output_channels } else { 0 },
            sample_rate,
            latency,
        });
        self.binding = Some(binding.clone());
        self.sample_rate = sample_rate;
        self.input_rx.close();
        self.output_tx.close();
        self.state = StreamState::Bound;
        Ok(())
    }

    /// Opens the host stream: acquires the process-wide host guard, creates
    /// fresh rings, installs the callback variant for the binding's
    /// direction, and resets the overflow counters.
    ///
    /// Returns `false` and publishes a status string when the stream is not
    /// in the `Bound` state or the host refuses.
    pub fn open(&mut self) -> bool {
        if self.state != StreamState::Bound {
            self.status = match self.state {
                StreamState::Closed => "cannot open: no binding".to_string(),
                _ => "cannot open: stream is already open".to_string(),
            };
            return false;
        }
        let (Some(params), Some(binding)) = (self.params.clone(), self.binding.clone()) else {
            self.status = "cannot open: no binding".to_string();
            return false;
        };

        let guard = HostGuard::acquire();
        let (input_tx, input_rx) = RingBuffer::new(self.ring_capacity).split();
        let (output_tx, output_rx) = RingBuffer::new(self.ring_capacity).split();
        let needs_input = params.input_channels > 0;
        let needs_output = params.output_channels > 0;
        if needs_input {
            input_tx.open();
        }
        if needs_output {
            output_tx.open();
        }
        self.input_overflows.store(0, Ordering::Relaxed);
        self.output_overflows.store(0, Ordering::Relaxed);

        let mut engine = EngineCallback {
            io_type: binding.io_type(),
            input: needs_input.then_some(input_tx),
            output: needs_output.then_some(output_rx),
            input_channels: usize::from(params.input_channels),
            output_channels: usize::from(params.output_channels),
            input_overflows: self.input_overflows.clone(),
            output_overflows: self.output_overflows.clone(),
        };
        let callback: StreamCallback = Box::new(move |buffers| engine.process(buffers));

        match self.backend.open(&params, callback) {
            Ok(stream) => {
                let reported = stream.latency();
                self.latency = match binding.io_type() {
                    IoType::Input => reported.input,
                    IoType::Output => reported.output,
                    IoType::Duplex => reported.input + reported.output,
                };
                self.host_stream = Some(stream);
                self.guard = Some(guard);
                self.input_rx = input_rx;
                self.output_tx = output_tx;
                self.state = StreamState::Open;
                self.update_status();
                tracing::debug!(
                    device = binding.device(),
                    direction = %binding.io_type(),
                    latency = self.latency,
                    "opened audio stream"
                );
                true
            }
            Err(err) => {
                self.status = format!(
                    "{}: {} error: {}",
                    binding.type_name(),
                    binding.device(),
                    err
                );
                false
            }
        }
    }

    /// Starts callback delivery.
    ///
    /// On failure the input ring is closed so an application thread blocked
    /// on it returns promptly, and the error is published in the status.
    pub fn start(&mut self) -> bool {
        if self.state != StreamState::Open {
            self.status = "cannot start: stream is not open".to_string();
            return false;
        }
        let Some(stream) = self.host_stream.as_mut() else {
            self.status = "cannot start: stream is not open".to_string();
            return false;
        };
        match stream.start() {
            Ok(()) => {
                self.state = StreamState::Started;
                self.update_status();
                true
            }
            Err(err) => {
                self.input_rx.close();
                self.status = format!("error when attempting to start stream: {err}");
                false
            }
        }
    }

    /// Stops callback delivery and closes the input ring, waking the
    /// application. A stop without a preceding start is a no-op.
    pub fn stop(&mut self) -> bool {
        if !self.started() {
            return true;
        }
        let Some(stream) = self.host_stream.as_mut() else {
            return true;
        };
        match stream.stop() {
            Ok(()) => {
                self.input_rx.close();
                self.state = StreamState::Stopped;
                self.update_status();
                true
            }
            Err(err) => {
                self.status = format!("error when attempting to stop stream: {err}");
                false
            }
        }
    }

    /// Closes the host stream, both rings, and the host guard. Idempotent
    /// and legal from every state.
    pub fn close(&mut self) -> bool {
        if let Some(stream) = self.host_stream.take() {
            drop(stream);
            tracing::debug!("closed audio stream");
        }
        self.input_rx.close();
        self.output_tx.close();
        self.guard = None;
        self.state = StreamState::Closed;
        self.status = "audio device closed".to_string();
        true
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Whether the host reports the stream as running.
    #[must_use]
    pub fn started(&self) -> bool {
        self.host_stream.as_ref().is_some_and(|s| s.is_running())
    }

    /// The bound sample rate in hertz; 0 before the first bind.
    #[must_use]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Effective latency in seconds, measured at open. For duplex streams
    /// this is the sum of the input and output latencies.
    #[must_use]
    pub fn latency(&self) -> f64 {
        self.latency
    }

    /// The last published status string.
    #[must_use]
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Count of input-ring overflows since the last open.
    #[must_use]
    pub fn input_overflows(&self) -> u32 {
        self.input_overflows.load(Ordering::Relaxed)
    }

    /// Count of output-ring underruns since the last open.
    #[must_use]
    pub fn output_overflows(&self) -> u32 {
        self.output_overflows.load(Ordering::Relaxed)
    }

    /// The application side of the input ring: captured samples are read
    /// here. Blocking reads return `false` once the ring closes.
    pub fn in_buffer(&mut self) -> &mut RingReader<f32> {
        &mut self.input_rx
    }

    /// The application side of the output ring: samples written here are
    /// played by the driver.
    pub fn out_buffer(&mut self) -> &mut RingWriter<f32> {
        &mut self.output_tx
    }

    fn update_status(&mut self) {
        let Some(binding) = &self.binding else {
            return;
        };
        self.status = format!(
            "{}: {} open: {}kHz, latency: {}ms, Input overflows: {}, Output overflows: {}",
            binding.type_name(),
            binding.device(),
            format_fixed(1e-3 * self.sample_rate, 3),
            format_fixed(1e3 * self.latency, 4),
            self.input_overflows.load(Ordering::Relaxed),
            self.output_overflows.load(Ordering::Relaxed),
        );
    }
}

impl Default for AudioStream {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AudioStream {
    fn drop(&mut self) {
        self.close();
    }
}

/// The stream callback: owns the driver-side ring halves and services one
/// driver period per invocation.
///
/// Runs on the driver's realtime thread; every path through `process` is
/// wait-free (ring plans, at most one semaphore post, byte copies).
struct EngineCallback {
    io_type: IoType,
    input: Option<RingWriter<f32>>,
    output: Option<RingReader<f32>>,
    input_channels: usize,
    output_channels: usize,
    input_overflows: Arc<AtomicU32>,
    output_overflows: Arc<AtomicU32>,
}

impl EngineCallback {
    fn process(&mut self, mut buffers: CallbackBuffers<'_>) -> CallbackAction {
        match self.io_type {
            IoType::Input => {
                self.enqueue_input(buffers.input, buffers.frames, buffers.flags);
                self.completion()
            }
            IoType::Output => {
                self.drain_output(buffers.output.as_deref_mut(), buffers.frames, buffers.flags);
                self.completion()
            }
            IoType::Duplex => {
                // Output first, so playback stays fed even when the input
                // ring is full. A host that splits duplex across two driver
                // threads passes one side per invocation; the union of the
                // two invocations is the same protocol.
                if buffers.output.is_some() {
                    self.drain_output(buffers.output.as_deref_mut(), buffers.frames, buffers.flags);
                }
                if buffers.input.is_some() {
                    self.enqueue_input(buffers.input, buffers.frames, buffers.flags);
                }
                self.completion()
            }
        }
    }

    /// Complete once any ring this stream uses has been closed.
    fn completion(&self) -> CallbackAction {
        let input_closed = self.input.as_ref().is_some_and(|ring| !ring.is_open());
        let output_closed = self.output.as_ref().is_some_and(|ring| !ring.is_open());
        if input_closed || output_closed {
            CallbackAction::Complete
        } else {
            CallbackAction::Continue
        }
    }

    fn enqueue_input(&mut self, data: Option<&[f32]>, frames: usize, flags: StatusFlags) {
        let Some(ring) = self.input.as_mut() else {
            return;
        };
        let Some(data) = data else {
            return;
        };
        let count = (frames * self.input_channels).min(data.len());
        match ring.reserve(count) {
            Some(mut grant) if !flags.input_overflow => {
                grant.copy_from_slice(&data[..count]);
                grant.commit(count);
            }
            // Ring full, or the driver already dropped capture data:
            // record the overflow and discard the whole batch.
            _ => {
                self.input_overflows.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn drain_output(&mut self, data: Option<&mut [f32]>, frames: usize, flags: StatusFlags) {
        let Some(ring) = self.output.as_mut() else {
            return;
        };
        let Some(out) = data else {
            return;
        };
        let want = (frames * self.output_channels).min(out.len());
        let mut filled = 0;
        // After a wrap the queued samples span at most two contiguous
        // regions, so two acquire rounds drain everything reachable; no
        // unbounded loop runs on the audio thread.
        for _ in 0..2 {
            if filled >= want || !ring.is_open() {
                break;
            }
            let Some(grant) = ring.acquire() else {
                break;
            };
            let take = grant.len().min(want - filled);
            out[filled..filled + take].copy_from_slice(&grant[..take]);
            grant.release(take);
            filled += take;
        }
        if filled < want {
            // Dry ring: hand the driver silence, never stale samples.
            out[filled..want].fill(0.0);
            self.output_overflows.fetch_add(1, Ordering::Relaxed);
        } else if flags.output_overflow {
            self.output_overflows.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::mock::{mock_device, MockDriver, MockHost};
    use crate::Catalog;

    /// Mock with one duplex device; returns the stream and driver handle.
    fn duplex_fixture(capacity: usize) -> (AudioStream, MockDriver, Binding) {
        let mut host = MockHost::new();
        host.push_device(mock_device("MockAPI", "Loop", 2, 2, &[48000.0]));
        let driver = host.driver();
        let catalog = Catalog::probe_backend(&host).unwrap();
        let binding = catalog.io_type(IoType::Duplex).first().cloned().unwrap();
        let stream = AudioStream::with_backend(Arc::new(host)).with_ring_capacity(capacity);
        (stream, driver, binding)
    }

    #[test]
    fn test_bind_rejects_latency_outside_envelope() {
        let (mut stream, _driver, binding) = duplex_fixture(512);
        let err = stream.bind(&binding, 5.0, 2, 2).unwrap_err();
        assert!(matches!(err, AudioError::InvalidLatency { .. }));

        let err = stream.bind(&binding, 0.0001, 2, 2).unwrap_err();
        assert!(matches!(err, AudioError::InvalidLatency { .. }));
    }

    #[test]
    fn test_bind_rejects_bad_channel_counts() {
        let (mut stream, _driver, binding) = duplex_fixture(512);

        let err = stream.bind(&binding, 0.05, 0, 2).unwrap_err();
        assert!(
            matches!(err, AudioError::InvalidChannelCount { direction: "input", requested: 0, .. })
        );

        let err = stream.bind(&binding, 0.05, 2, 99).unwrap_err();
        assert!(matches!(
            err,
            AudioError::InvalidChannelCount {
                direction: "output",
                requested: 99,
                ..
            }
        ));
    }

    #[test]
    fn test_lifecycle_happy_path() {
        let (mut stream, driver, binding) = duplex_fixture(512);
        assert_eq!(stream.state(), StreamState::Closed);

        stream.bind(&binding, 0.05, 2, 2).unwrap();
        assert_eq!(stream.state(), StreamState::Bound);
        assert_eq!(stream.sample_rate(), 48000.0);

        assert!(stream.open());
        assert_eq!(stream.state(), StreamState::Open);
        assert!(driver.is_installed());
        assert!(!stream.started());
        // Duplex latency is the sum of both sides.
        assert!((stream.latency() - 0.10).abs() < 1e-12);
        assert!(stream.status().contains("Duplex: Loop open: 48.000kHz"));

        assert!(stream.start());
        assert_eq!(stream.state(), StreamState::Started);
        assert!(stream.started());

        assert!(stream.stop());
        assert_eq!(stream.state(), StreamState::Stopped);
        assert!(!stream.started());

        assert!(stream.close());
        assert_eq!(stream.state(), StreamState::Closed);
        assert_eq!(stream.status(), "audio device closed");
        assert!(!driver.is_installed());
    }

    #[test]
    fn test_open_without_bind_fails() {
        let (mut stream, _driver, _binding) = duplex_fixture(512);
        assert!(!stream.open());
        assert!(stream.status().contains("no binding"));
    }

    #[test]
    fn test_open_after_open_is_rejected() {
        let (mut stream, _driver, binding) = duplex_fixture(512);
        stream.bind(&binding, 0.05, 2, 2).unwrap();
        assert!(stream.open());
        assert!(!stream.open());
        assert!(stream.status().contains("already open"));
    }

    #[test]
    fn test_stop_without_start_is_noop() {
        let (mut stream, _driver, binding) = duplex_fixture(512);
        assert!(stream.stop());

        stream.bind(&binding, 0.05, 2, 2).unwrap();
        assert!(stream.open());
        assert!(stream.stop());
        assert_eq!(stream.state(), StreamState::Open);
    }

    #[test]
    fn test_close_is_idempotent() {
        let (mut stream, _driver, binding) = duplex_fixture(512);
        stream.bind(&binding, 0.05, 2, 2).unwrap();
        assert!(stream.open());
        assert!(stream.close());
        assert!(stream.close());
        assert_eq!(stream.state(), StreamState::Closed);
    }

    #[test]
    fn test_start_failure_closes_input_ring() {
        let mut host = MockHost::new();
        host.push_device(mock_device("MockAPI", "Loop", 2, 2, &[48000.0]));
        host.fail_start_with(-9986);
        let catalog = Catalog::probe_backend(&host).unwrap();
        let binding = catalog.io_type(IoType::Duplex).first().cloned().unwrap();
        let mut stream = AudioStream::with_backend(Arc::new(host)).with_ring_capacity(512);

        stream.bind(&binding, 0.05, 2, 2).unwrap();
        assert!(stream.open());
        assert!(!stream.start());
        assert!(stream.status().contains("InternalError"));

        // A blocked application read must return promptly.
        let mut sink = [0.0f32; 64];
        assert!(!stream.in_buffer().read_exact(&mut sink));
    }

    #[test]
    fn test_duplex_callback_services_both_rings() {
        let (mut stream, driver, binding) = duplex_fixture(1024);
        stream.bind(&binding, 0.05, 2, 2).unwrap();
        assert!(stream.open());
        assert!(stream.start());

        // Queue 256 samples for playback.
        let queued: Vec<f32> = (0..256).map(|i| i as f32).collect();
        let mut grant = stream.out_buffer().reserve(256).unwrap();
        grant.copy_from_slice(&queued);
        grant.commit(256);

        // One duplex period: 128 stereo frames each way.
        let captured: Vec<f32> = (0..256).map(|i| 1000.0 + i as f32).collect();
        let mut playback = [0.0f32; 256];
        let action = driver
            .render_duplex(&captured, &mut playback, 128, StatusFlags::default())
            .unwrap();
        assert_eq!(action, CallbackAction::Continue);

        // The queued samples went out, the captured ones came in, and no
        // overflow was recorded in either direction.
        assert_eq!(&playback[..], &queued[..]);
        let mut received = [0.0f32; 256];
        assert!(stream.in_buffer().read_exact(&mut received));
        assert_eq!(&received[..], &captured[..]);
        assert_eq!(stream.input_overflows(), 0);
        assert_eq!(stream.output_overflows(), 0);
    }

    #[test]
    fn test_full_input_ring_records_overflow_without_partial_write() {
        let (mut stream, driver, binding) = duplex_fixture(512);
        stream.bind(&binding, 0.05, 2, 2).unwrap();
        assert!(stream.open());
        assert!(stream.start());

        let period: Vec<f32> = vec![0.5; 256];
        let mut playback = [0.0f32; 256];
        // First period fits (511 usable slots), the second does not.
        driver
            .render_duplex(&period, &mut playback, 128, StatusFlags::default())
            .unwrap();
        assert_eq!(stream.input_overflows(), 0);

        driver
            .render_duplex(&period, &mut playback, 128, StatusFlags::default())
            .unwrap();
        assert_eq!(stream.input_overflows(), 1);

        // Exactly the first period is readable: the refused batch was
        // discarded whole.
        let mut received = [0.0f32; 256];
        assert!(stream.in_buffer().read_exact(&mut received));
        assert!(stream.in_buffer().acquire().is_none());
    }

    #[test]
    fn test_driver_overflow_flag_discards_batch() {
        let (mut stream, driver, binding) = duplex_fixture(1024);
        stream.bind(&binding, 0.05, 2, 2).unwrap();
        assert!(stream.open());
        assert!(stream.start());

        let flags = StatusFlags {
            input_overflow: true,
            output_overflow: false,
        };
        driver.render_input(&[0.25; 256], 128, flags).unwrap();
        assert_eq!(stream.input_overflows(), 1);
        assert!(stream.in_buffer().acquire().is_none());
    }

    #[test]
    fn test_dry_output_ring_zero_fills_and_counts() {
        let (mut stream, driver, binding) = duplex_fixture(512);
        stream.bind(&binding, 0.05, 2, 2).unwrap();
        assert!(stream.open());
        assert!(stream.start());

        let mut playback = [7.7f32; 256];
        driver
            .render_output(&mut playback, 128, StatusFlags::default())
            .unwrap();
        assert!(playback.iter().all(|&s| s == 0.0));
        assert_eq!(stream.output_overflows(), 1);
    }

    #[test]
    fn test_callback_completes_once_rings_close() {
        let (mut stream, driver, binding) = duplex_fixture(512);
        stream.bind(&binding, 0.05, 2, 2).unwrap();
        assert!(stream.open());
        assert!(stream.start());

        let mut playback = [0.0f32; 256];
        let action = driver
            .render_duplex(&[0.0; 256], &mut playback, 128, StatusFlags::default())
            .unwrap();
        assert_eq!(action, CallbackAction::Continue);

        // Stop closes the input ring; the next invocation reports complete.
        assert!(stream.stop());
        let action = driver
            .render_duplex(&[0.0; 256], &mut playback, 128, StatusFlags::default())
            .unwrap();
        assert_eq!(action, CallbackAction::Complete);
    }

    #[test]
    fn test_overflow_counters_reset_at_open() {
        let (mut stream, driver, binding) = duplex_fixture(512);
        stream.bind(&binding, 0.05, 2, 2).unwrap();
        assert!(stream.open());
        assert!(stream.start());

        let mut playback = [0.0f32; 256];
        driver
            .render_output(&mut playback, 128, StatusFlags::default())
            .unwrap();
        assert_eq!(stream.output_overflows(), 1);

        assert!(stream.close());
        stream.bind(&binding, 0.05, 2, 2).unwrap();
        assert!(stream.open());
        assert_eq!(stream.output_overflows(), 0);
    }
}
