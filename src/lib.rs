//! # duplex-audio
//!
//! **Note:** This crate is under active development. The API may change before 1.0.
//!
//! Realtime-safe duplex audio I/O over the platform audio library.
//!
//! `duplex-audio` presents three capabilities to application code:
//! enumerating and filtering the available audio systems, devices, and
//! sample rates ([`Catalog`]); binding to a specific endpoint with a chosen
//! latency, direction, and channel count ([`Binding`], [`AudioStream`]); and
//! a realtime-safe data path between the driver's callback thread and the
//! application thread (the ring in [`ring`]).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use duplex_audio::{AudioStream, Catalog, IoType};
//!
//! let catalog = Catalog::probe()?;
//! let binding = catalog
//!     .system("wasapi")
//!     .io_type(IoType::Duplex)
//!     .sample_rate(48000.0)
//!     .first()
//!     .cloned()
//!     .expect("no matching device");
//!
//! let mut stream = AudioStream::new();
//! stream.bind(&binding, 0.05, 2, 2)?;
//! stream.open();
//! stream.start();
//!
//! // Application thread: read captured frames, write processed frames.
//! let mut block = [0.0f32; 1024];
//! while stream.in_buffer().read_exact(&mut block) {
//!     if let Some(mut grant) = stream.out_buffer().wait_reserve(block.len()) {
//!         grant.copy_from_slice(&block);
//!         grant.commit(block.len());
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! The crate maintains a strict thread boundary:
//!
//! - **Driver thread**: the host's realtime callback never blocks,
//!   allocates, or locks - it moves samples through the rings' wait-free
//!   operations only.
//! - **Bipartite ring**: a lock-free SPSC queue per direction hands out
//!   contiguous zero-copy regions despite wrap-around, and reports
//!   overflow without losing liveness.
//! - **Application thread**: may block in the rings' wait operations;
//!   closing a ring from any thread wakes it promptly.

#![warn(missing_docs)]
// Audio code requires intentional numeric casts between sample formats and
// index arithmetic.
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_lossless
)]
// unwrap/expect allowed in tests only.
#![allow(clippy::unwrap_used)]
// These doc lints are too strict for internal implementation details.
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]

mod binding;
mod catalog;
mod error;
pub mod host;
pub mod ring;
mod semaphore;
mod stream;

pub use binding::{Binding, DeviceCaps, IoType};
pub use catalog::Catalog;
pub use error::{format_fixed, host_error_name, string_contains, AudioError};
pub use host::{
    CallbackAction, CallbackBuffers, DeviceInfo, HostBackend, HostGuard, HostStream, StatusFlags,
    StreamCallback, StreamLatency, StreamParams, STANDARD_SAMPLE_RATES,
};
pub use ring::{ReadGrant, RingBuffer, RingReader, RingWriter, WriteGrant};
pub use semaphore::Semaphore;
pub use stream::{AudioStream, StreamState, DEFAULT_RING_CAPACITY};
