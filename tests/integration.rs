//! Integration tests for duplex-audio.
//!
//! The ring tests exercise the producer and consumer halves from real
//! threads; the catalog and stream tests run against the mock host backend.
//! Tests that require actual audio hardware are marked with `#[ignore]` and
//! should be run manually.

use std::thread;
use std::time::{Duration, Instant};

use duplex_audio::host::mock::{mock_device, MockHost};
use duplex_audio::{
    AudioStream, CallbackAction, Catalog, IoType, RingBuffer, StatusFlags, StreamState,
};

/// Deterministic LCG so randomized batch sizes are reproducible.
struct Lcg(u32);

impl Lcg {
    fn next(&mut self) -> u32 {
        self.0 = self.0.wrapping_mul(1_103_515_245).wrapping_add(12345);
        self.0 >> 16
    }
}

#[test]
fn test_ring_fifo_order_across_threads() {
    const TOTAL: usize = 100_000;
    let (mut tx, mut rx) = RingBuffer::<f32>::new(1024).split();
    tx.open();

    // The producer streams a counter until the reader closes the ring, the
    // way a capture callback keeps running until shutdown. Liveness of a
    // sleeping reader comes from the producer's continued commits.
    let producer = thread::spawn(move || {
        let mut rng = Lcg(1);
        let mut written = 0usize;
        loop {
            let batch = 1 + rng.next() as usize % 300;
            let Some(mut grant) = tx.wait_reserve(batch) else {
                return written;
            };
            for (offset, slot) in grant.iter_mut().enumerate() {
                *slot = (written + offset) as f32;
            }
            grant.commit(batch);
            written += batch;
        }
    });

    let mut rng = Lcg(2);
    let mut buf = vec![0.0f32; 512];
    let mut read = 0usize;
    while read < TOTAL {
        let chunk = (1 + rng.next() as usize % 512).min(TOTAL - read);
        assert!(rx.read_exact(&mut buf[..chunk]), "ring closed early");
        for (offset, &sample) in buf[..chunk].iter().enumerate() {
            assert_eq!(sample, (read + offset) as f32, "sample out of order");
        }
        read += chunk;
    }

    rx.close();
    let written = producer.join().unwrap();
    assert!(written >= TOTAL);
}

#[test]
fn test_ring_full_drain_needs_at_most_two_acquires() {
    let (mut tx, mut rx) = RingBuffer::<f32>::new(16).split();

    // Fill to index 15, consume 4, then wrap 3 samples to the start.
    tx.reserve(10).unwrap().commit(10);
    rx.acquire().unwrap().release(4);
    tx.reserve(5).unwrap().commit(5);
    let wrapped = tx.reserve(3).unwrap();
    wrapped.commit(3);

    // 11 pre-wrap samples, then the 3 wrapped ones, then empty.
    let first = rx.acquire().unwrap();
    assert_eq!(first.len(), 11);
    first.release(11);

    let second = rx.acquire().unwrap();
    assert_eq!(second.len(), 3);
    second.release(3);

    assert!(rx.acquire().is_none());
}

#[test]
fn test_ring_close_unblocks_reader() {
    let (tx, mut rx) = RingBuffer::<f32>::new(2048).split();
    tx.open();

    let reader = thread::spawn(move || {
        let mut sink = vec![0.0f32; 1024];
        rx.read_exact(&mut sink)
    });

    // Let the reader go to sleep on the empty ring, then cancel it.
    thread::sleep(Duration::from_millis(30));
    let closed_at = Instant::now();
    tx.close();

    let result = reader.join().unwrap();
    assert!(!result, "read must fail once the ring closes");
    // Bounded wake-up; the margin is generous for loaded CI machines.
    assert!(closed_at.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_ring_close_unblocks_writer() {
    let (mut tx, rx) = RingBuffer::<f32>::new(64).split();
    tx.open();
    tx.reserve(60).unwrap().commit(60);

    let writer = thread::spawn(move || tx.wait_reserve(32).is_some());

    thread::sleep(Duration::from_millis(30));
    let closed_at = Instant::now();
    rx.close();

    let reserved = writer.join().unwrap();
    assert!(!reserved, "reserve must fail once the ring closes");
    assert!(closed_at.elapsed() < Duration::from_secs(1));
}

fn mock_catalog() -> Catalog {
    let mut host = MockHost::new();
    host.push_device(mock_device("ASIO", "X", 2, 0, &[44100.0, 48000.0]));
    host.push_device(mock_device("MME", "X", 2, 0, &[44100.0]));
    host.push_device(mock_device("ALSA", "Loop", 2, 2, &[44100.0, 48000.0, 96000.0]));
    Catalog::probe_backend(&host).unwrap()
}

#[test]
fn test_catalog_filters_commute() {
    let catalog = mock_catalog();
    let a = catalog.system("a").sample_rate(48000.0);
    let b = catalog.sample_rate(48000.0).system("a");
    assert_eq!(a, b);

    let c = catalog.device("x").io_type(IoType::Input);
    let d = catalog.io_type(IoType::Input).device("x");
    assert_eq!(c, d);
}

#[test]
fn test_catalog_filter_chain_narrows() {
    let catalog = mock_catalog();
    let picked = catalog
        .system("alsa")
        .io_type(IoType::Duplex)
        .sample_rate(48000.0);
    assert_eq!(picked.len(), 1);
    assert_eq!(picked[0].device(), "Loop");
    assert_eq!(picked[0].sample_rates(), &[48000.0]);
}

#[test]
fn test_duplex_stream_echo_lockstep() {
    let mut host = MockHost::new();
    host.push_device(mock_device("MockAPI", "Loop", 2, 2, &[48000.0]));
    let driver = host.driver();
    let catalog = Catalog::probe_backend(&host).unwrap();
    let binding = catalog.io_type(IoType::Duplex).first().cloned().unwrap();

    let mut stream =
        AudioStream::with_backend(std::sync::Arc::new(host)).with_ring_capacity(4096);
    stream.bind(&binding, 0.05, 2, 2).unwrap();
    assert!(stream.open());
    assert!(stream.start());

    // Three periods of lockstep echo: the playback of period N is the
    // capture of period N-1.
    let mut previous: Option<Vec<f32>> = None;
    for period in 0..3 {
        let captured: Vec<f32> = (0..512).map(|i| (period * 512 + i) as f32).collect();
        let mut playback = vec![-1.0f32; 512];
        let action = driver
            .render_duplex(&captured, &mut playback, 256, StatusFlags::default())
            .unwrap();
        assert_eq!(action, CallbackAction::Continue);

        match &previous {
            Some(expected) => assert_eq!(&playback, expected),
            // Nothing queued yet: the driver got silence, and the underrun
            // was counted.
            None => {
                assert!(playback.iter().all(|&s| s == 0.0));
                assert_eq!(stream.output_overflows(), 1);
            }
        }

        // Application turn: echo the captured period back out.
        let mut block = vec![0.0f32; 512];
        assert!(stream.in_buffer().read_exact(&mut block));
        assert_eq!(block, captured);
        let mut grant = stream.out_buffer().reserve(512).unwrap();
        grant.copy_from_slice(&block);
        grant.commit(512);
        previous = Some(block);
    }

    assert!(stream.stop());
    assert_eq!(stream.state(), StreamState::Stopped);
    assert!(stream.close());
    assert_eq!(stream.input_overflows(), 0);
}

#[test]
fn test_stream_status_reports_figures() {
    let mut host = MockHost::new();
    host.push_device(mock_device("MockAPI", "Mic", 2, 0, &[44100.0]));
    let catalog = Catalog::probe_backend(&host).unwrap();
    let binding = catalog.io_type(IoType::Input).first().cloned().unwrap();

    let mut stream = AudioStream::with_backend(std::sync::Arc::new(host));
    stream.bind(&binding, 0.1, 1, 0).unwrap();
    assert!(stream.open());

    let status = stream.status().to_string();
    assert!(status.contains("Input: Mic open: 44.100kHz"), "{status}");
    assert!(status.contains("latency: 100.0000ms"), "{status}");
    assert!(status.contains("Input overflows: 0"), "{status}");
}

#[test]
#[ignore = "requires audio hardware"]
fn test_probe_real_hardware() {
    let catalog = Catalog::probe().unwrap();
    assert!(!catalog.is_empty());
    for binding in &catalog {
        println!(
            "{:8} {:32} {:6} rates {:?}",
            binding.system(),
            binding.device(),
            binding.type_name(),
            binding.sample_rates()
        );
    }
}

#[test]
#[ignore = "requires audio hardware"]
fn test_open_default_input_device() {
    let catalog = Catalog::probe().unwrap();
    let binding = catalog
        .default_input()
        .cloned()
        .or_else(|| catalog.io_type(IoType::Input).first().cloned())
        .expect("no input device");

    let mut stream = AudioStream::new();
    let latency = binding.min_latency().max(0.02).min(binding.max_latency());
    stream.bind(&binding, latency, 1, 0).unwrap();
    assert!(stream.open(), "{}", stream.status());
    assert!(stream.start(), "{}", stream.status());

    let mut block = [0.0f32; 4800];
    assert!(stream.in_buffer().read_exact(&mut block));

    assert!(stream.stop());
    assert!(stream.close());
}
