//! Lock-free single-producer/single-consumer ring buffer with contiguous
//! zero-copy access.
//!
//! A plain circular buffer splits large transactions across the wrap point.
//! This ring refuses to split: when a reservation does not fit between the
//! write position and the end of storage, it is placed at the start instead,
//! and the index just past the last pre-wrap sample is recorded so the
//! consumer knows where valid data ends. Every region handed out is therefore
//! one contiguous slice, at the cost of occasionally wasted tail space -
//! a good trade for audio workloads that move large, uniform blocks.
//!
//! The producer-side [`RingWriter`] and consumer-side [`RingReader`] are
//! obtained from [`RingBuffer::split`] and may live on different threads.
//! All non-blocking operations (`reserve`/`commit`, `acquire`/`release`,
//! `is_open`) are wait-free and safe to call from a realtime audio callback;
//! the blocking companions (`wait_reserve`, `read_exact`, `wait_acquire`)
//! are for application threads only and return promptly once the ring is
//! closed from any thread.

use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use bytemuck::Pod;
use crossbeam_utils::CachePadded;

use crate::semaphore::Semaphore;

/// Backing-store alignment, sufficient for vectorised loads and stores at
/// the common SIMD widths.
const STORE_ALIGNMENT: usize = 16;

/// Fields owned by the consumer side. The `not_full` semaphore lives here
/// because the consumer is the party that posts it.
struct ConsumerSide {
    read_idx: AtomicUsize,
    signal_writer: AtomicBool,
    not_full: Semaphore,
}

/// Fields owned by the producer side; `not_empty` is posted by the producer.
struct ProducerSide {
    write_idx: AtomicUsize,
    signal_reader: AtomicBool,
    not_empty: Semaphore,
}

/// State shared by both halves of a split ring.
struct RingShared<T> {
    /// Capacity in samples, fixed at construction. One slot is always kept
    /// vacant so that empty and full are distinguishable.
    size: usize,
    store: *mut T,
    layout: Layout,
    open: AtomicBool,
    consumer: CachePadded<ConsumerSide>,
    producer: CachePadded<ProducerSide>,
    /// Index just past the last valid sample when the producer has wrapped
    /// and the consumer has not caught up. Maintained by commits, consulted
    /// by the consumer only after it observes `read_idx > write_idx`.
    end_idx: CachePadded<AtomicUsize>,
}

// SAFETY: the raw store is only touched through the SPSC protocol. The
// writer publishes a region with a release store on `write_idx` before the
// reader's acquire load can observe it, the reader retires a region with a
// release store on `read_idx` before the writer can reuse it, and the
// regions lent to the two parties never overlap while a grant is live.
unsafe impl<T: Pod + Send> Send for RingShared<T> {}
unsafe impl<T: Pod + Send> Sync for RingShared<T> {}

impl<T: Pod> RingShared<T> {
    fn with_capacity(capacity: usize) -> Self {
        assert!(capacity >= 2, "ring capacity must be at least 2 samples");
        let bytes = capacity
            .checked_mul(std::mem::size_of::<T>())
            .expect("ring byte size overflows usize");
        let padded = bytes.div_ceil(STORE_ALIGNMENT) * STORE_ALIGNMENT;
        let align = STORE_ALIGNMENT.max(std::mem::align_of::<T>());
        let layout =
            Layout::from_size_align(padded, align).expect("ring capacity overflows the allocator");

        // Zeroed storage: every bit pattern of a Pod type is valid, so grants
        // over not-yet-written samples are sound.
        let store = unsafe { alloc_zeroed(layout) }.cast::<T>();
        if store.is_null() {
            handle_alloc_error(layout);
        }

        Self {
            size: capacity,
            store,
            layout,
            open: AtomicBool::new(false),
            consumer: CachePadded::new(ConsumerSide {
                read_idx: AtomicUsize::new(0),
                signal_writer: AtomicBool::new(false),
                not_full: Semaphore::new(),
            }),
            producer: CachePadded::new(ProducerSide {
                write_idx: AtomicUsize::new(0),
                signal_reader: AtomicBool::new(false),
                not_empty: Semaphore::new(),
            }),
            end_idx: CachePadded::new(AtomicUsize::new(0)),
        }
    }

    fn free_space(&self, write: usize, read: usize) -> usize {
        if read > write {
            read - write - 1
        } else {
            self.size - (write - read) - 1
        }
    }

    /// Finds a contiguous region for `count` samples. Returns the start
    /// index and whether the reservation wraps to the buffer start.
    fn plan_reserve(&self, count: usize) -> Option<(usize, bool)> {
        let write = self.producer.write_idx.load(Ordering::Relaxed);
        let read = self.consumer.read_idx.load(Ordering::Acquire);
        let free = self.free_space(write, read);
        let contiguous = self.size - write;
        let contiguous_free = free.min(contiguous);

        if count <= contiguous_free {
            return Some((write, false));
        }
        // Wrap early: place the region at the buffer start if it fits in the
        // remaining free space there.
        if count <= free - contiguous_free {
            return Some((0, true));
        }
        None
    }

    /// Publishes `written` samples of a reservation planned with `wrapped`.
    fn commit(&self, written: usize, wrapped: bool) {
        let mut write = self.producer.write_idx.load(Ordering::Relaxed);
        let mut end;
        if wrapped {
            end = write;
            write = 0;
        } else {
            end = self.end_idx.load(Ordering::Relaxed);
        }
        write += written;
        // Writing past the old end moves the end of the valid region.
        if write > end {
            end = write;
        }
        if write == self.size {
            write = 0;
        }
        self.end_idx.store(end, Ordering::Relaxed);
        self.producer.write_idx.store(write, Ordering::Release);
        if self.producer.signal_reader.swap(false, Ordering::SeqCst) {
            self.producer.not_empty.post();
        }
    }

    /// Finds the contiguous readable region. Returns the start index, its
    /// length, and whether the read position wraps to the buffer start.
    fn plan_acquire(&self) -> Option<(usize, usize, bool)> {
        let read = self.consumer.read_idx.load(Ordering::Relaxed);
        let write = self.producer.write_idx.load(Ordering::Acquire);

        if read == write {
            return None;
        }
        if read < write {
            return Some((read, write - read, false));
        }
        // The producer has wrapped. Data runs up to the recorded end; once
        // the read position reaches it, the readable region restarts at 0.
        let end = self.end_idx.load(Ordering::Relaxed);
        if read == end {
            return Some((0, write, true));
        }
        Some((read, end - read, false))
    }

    /// Retires `released` samples of a region planned with `wrapped`.
    fn release(&self, released: usize, wrapped: bool) {
        let mut read = if wrapped {
            0
        } else {
            self.consumer.read_idx.load(Ordering::Relaxed)
        };
        read += released;
        if read == self.size {
            read = 0;
        }
        self.consumer.read_idx.store(read, Ordering::Release);
        if self.consumer.signal_writer.swap(false, Ordering::SeqCst) {
            self.consumer.not_full.post();
        }
    }

    fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::Release);
        self.consumer.read_idx.store(0, Ordering::Release);
        self.producer.write_idx.store(0, Ordering::Release);
        self.end_idx.store(0, Ordering::Relaxed);
        // Wake both sides so closed waiters observe the flag and return.
        self.consumer.not_full.post();
        self.producer.not_empty.post();
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Relaxed)
    }

    /// # Safety
    ///
    /// `[start, start + len)` must lie within the store and must be a region
    /// the caller currently has exclusive read access to.
    unsafe fn slice(&self, start: usize, len: usize) -> &[T] {
        std::slice::from_raw_parts(self.store.add(start), len)
    }

    /// # Safety
    ///
    /// `[start, start + len)` must lie within the store and must be a region
    /// the caller currently has exclusive write access to.
    #[allow(clippy::mut_from_ref)]
    unsafe fn slice_mut(&self, start: usize, len: usize) -> &mut [T] {
        std::slice::from_raw_parts_mut(self.store.add(start), len)
    }
}

impl<T> Drop for RingShared<T> {
    fn drop(&mut self) {
        // SAFETY: allocated in `with_capacity` with this exact layout.
        unsafe { dealloc(self.store.cast(), self.layout) };
    }
}

/// A fixed-capacity SPSC ring over trivially copyable samples.
///
/// Construct with [`new`](RingBuffer::new), then [`split`](RingBuffer::split)
/// into the producer and consumer halves. The ring starts closed; call
/// [`RingWriter::open`] or [`RingReader::open`] before using the blocking
/// operations. Capacity is fixed for the lifetime of the ring.
pub struct RingBuffer<T> {
    shared: Arc<RingShared<T>>,
}

impl<T: Pod + Send> RingBuffer<T> {
    /// Allocates a closed ring holding up to `capacity - 1` samples
    /// (one slot stays vacant to distinguish empty from full).
    ///
    /// The store is zero-initialised and aligned for vectorised access.
    ///
    /// # Panics
    ///
    /// Panics if `capacity < 2` or the byte size overflows the allocator.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            shared: Arc::new(RingShared::with_capacity(capacity)),
        }
    }

    /// Capacity in samples.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.size
    }

    /// Splits the ring into its single-producer and single-consumer halves.
    #[must_use]
    pub fn split(self) -> (RingWriter<T>, RingReader<T>) {
        (
            RingWriter {
                shared: self.shared.clone(),
                _not_sync: PhantomData,
            },
            RingReader {
                shared: self.shared,
                _not_sync: PhantomData,
            },
        )
    }
}

/// The producer half of a [`RingBuffer`].
///
/// Exactly one thread may use the writer at a time; the handle is not
/// clonable, so the type system enforces the single-producer rule.
pub struct RingWriter<T> {
    shared: Arc<RingShared<T>>,
    _not_sync: PhantomData<std::cell::Cell<()>>,
}

impl<T: Pod + Send> RingWriter<T> {
    /// Reserves `count` contiguous writable samples.
    ///
    /// Returns `None` when no contiguous region of that size is free, in
    /// which case the ring state is unchanged. Wait-free; safe to call from
    /// an audio callback.
    pub fn reserve(&mut self, count: usize) -> Option<WriteGrant<'_, T>> {
        let (start, wrapped) = self.shared.plan_reserve(count)?;
        Some(WriteGrant {
            shared: &*self.shared,
            start,
            len: count,
            wrapped,
        })
    }

    /// Reserves `count` contiguous samples, blocking until space is
    /// available or the ring is closed.
    ///
    /// Returns `None` only if the ring was closed. Application threads only.
    pub fn wait_reserve(&mut self, count: usize) -> Option<WriteGrant<'_, T>> {
        while self.shared.plan_reserve(count).is_none() {
            self.shared
                .consumer
                .signal_writer
                .store(true, Ordering::SeqCst);
            self.shared.consumer.not_full.wait();
            if !self.shared.open.load(Ordering::Acquire) {
                return None;
            }
        }
        // Replan after the loop: only this writer moves `write_idx`, and the
        // reader can only have freed more space meanwhile.
        let (start, wrapped) = self.shared.plan_reserve(count)?;
        Some(WriteGrant {
            shared: &*self.shared,
            start,
            len: count,
            wrapped,
        })
    }

    /// Capacity in samples.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.size
    }

    /// Opens the ring, resetting the indices and waking any sleepers.
    pub fn open(&self) {
        self.shared.set_open(true);
    }

    /// Closes the ring and cancels all waiting reads and writes. Callable
    /// from any thread.
    pub fn close(&self) {
        self.shared.set_open(false);
    }

    /// Relaxed-load snapshot of the open flag; safe in an audio callback.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.shared.is_open()
    }
}

/// The consumer half of a [`RingBuffer`].
pub struct RingReader<T> {
    shared: Arc<RingShared<T>>,
    _not_sync: PhantomData<std::cell::Cell<()>>,
}

impl<T: Pod + Send> RingReader<T> {
    /// Acquires the contiguous readable region, or `None` if the ring is
    /// empty. Wait-free; safe to call from an audio callback.
    ///
    /// After a producer wrap the readable data forms at most two contiguous
    /// regions, so a full drain needs at most two acquire/release rounds.
    pub fn acquire(&mut self) -> Option<ReadGrant<'_, T>> {
        let (start, len, wrapped) = self.shared.plan_acquire()?;
        Some(ReadGrant {
            shared: &*self.shared,
            start,
            len,
            wrapped,
        })
    }

    /// Acquires a readable region, blocking until samples are available or
    /// the ring is closed. Returns `None` only on closure.
    ///
    /// Application threads only.
    pub fn wait_acquire(&mut self) -> Option<ReadGrant<'_, T>> {
        while self.shared.plan_acquire().is_none() {
            self.shared
                .producer
                .signal_reader
                .store(true, Ordering::SeqCst);
            self.shared.producer.not_empty.wait();
            if !self.shared.open.load(Ordering::Acquire) {
                return None;
            }
        }
        let (start, len, wrapped) = self.shared.plan_acquire()?;
        Some(ReadGrant {
            shared: &*self.shared,
            start,
            len,
            wrapped,
        })
    }

    /// Fills `dst` completely, blocking until enough samples arrive.
    ///
    /// Returns `false` if the ring was closed before `dst` could be filled.
    /// Application threads only.
    pub fn read_exact(&mut self, dst: &mut [T]) -> bool {
        let mut filled = 0;
        while filled < dst.len() {
            match self.shared.plan_acquire() {
                Some((start, avail, wrapped)) => {
                    let take = avail.min(dst.len() - filled);
                    // SAFETY: `[start, start + take)` is committed data that
                    // only this reader may consume until it is released.
                    let src = unsafe { self.shared.slice(start, take) };
                    dst[filled..filled + take].copy_from_slice(src);
                    self.shared.release(take, wrapped);
                    filled += take;
                }
                None => {
                    self.shared
                        .producer
                        .signal_reader
                        .store(true, Ordering::SeqCst);
                    self.shared.producer.not_empty.wait();
                    if !self.shared.open.load(Ordering::Acquire) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Capacity in samples.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.size
    }

    /// Opens the ring, resetting the indices and waking any sleepers.
    pub fn open(&self) {
        self.shared.set_open(true);
    }

    /// Closes the ring and cancels all waiting reads and writes. Callable
    /// from any thread.
    pub fn close(&self) {
        self.shared.set_open(false);
    }

    /// Relaxed-load snapshot of the open flag; safe in an audio callback.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.shared.is_open()
    }
}

/// A reserved contiguous write region.
///
/// Derefs to a `&mut [T]` of exactly the reserved length. Call
/// [`commit`](WriteGrant::commit) to publish; dropping the grant without
/// committing leaves the ring unchanged.
pub struct WriteGrant<'a, T> {
    shared: &'a RingShared<T>,
    start: usize,
    len: usize,
    wrapped: bool,
}

impl<T: Pod + Send> WriteGrant<'_, T> {
    /// Publishes the first `written` samples of the reservation and wakes
    /// the reader if it asked to be signalled.
    ///
    /// `written` may be less than the reserved length.
    ///
    /// # Panics
    ///
    /// Panics if `written` exceeds the reserved length.
    pub fn commit(self, written: usize) {
        assert!(written <= self.len, "commit exceeds reservation");
        self.shared.commit(written, self.wrapped);
    }
}

impl<T: Pod + Send> Deref for WriteGrant<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        // SAFETY: the planned region is free space only this grant can touch.
        unsafe { self.shared.slice(self.start, self.len) }
    }
}

impl<T: Pod + Send> DerefMut for WriteGrant<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        // SAFETY: as for `deref`; the grant is unique and borrows the writer.
        unsafe { self.shared.slice_mut(self.start, self.len) }
    }
}

/// An acquired contiguous read region.
///
/// Derefs to a `&[T]` of the available samples. Call
/// [`release`](ReadGrant::release) to retire samples; dropping the grant
/// without releasing leaves the ring unchanged.
pub struct ReadGrant<'a, T> {
    shared: &'a RingShared<T>,
    start: usize,
    len: usize,
    wrapped: bool,
}

impl<T: Pod + Send> ReadGrant<'_, T> {
    /// Retires the first `released` samples and wakes the writer if it
    /// asked to be signalled.
    ///
    /// `released` may be less than the acquired length.
    ///
    /// # Panics
    ///
    /// Panics if `released` exceeds the acquired length.
    pub fn release(self, released: usize) {
        assert!(released <= self.len, "release exceeds acquisition");
        self.shared.release(released, self.wrapped);
    }
}

impl<T: Pod + Send> Deref for ReadGrant<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        // SAFETY: the planned region is committed data owned by this reader.
        unsafe { self.shared.slice(self.start, self.len) }
    }
}
