//! Fixed-capacity circular FIFO bound to one edge.
//!
//! A [`Fifo`] never grows: its capacity comes from the compiled schedule.
//! Reservations hand out the reserved elements as at most two contiguous
//! slices, split where the ring wraps, so nodes can process in place without
//! copying.
//!
//! ```rust
//! use cadence_core::Fifo;
//!
//! let mut fifo: Fifo<i16> = Fifo::new(4, 1).unwrap();
//! assert_eq!(fifo.available_to_read(), 1); // the delay element
//!
//! fifo.push_slice(&[7, 8, 9]).unwrap();
//! assert!(fifo.will_overflow(1));
//!
//! let mut out = [0i16; 4];
//! fifo.pop_slice(&mut out).unwrap();
//! assert_eq!(out, [0, 7, 8, 9]);
//! ```

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};
use core::any::Any;

/// Errors raised by FIFO construction and reservations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FifoError {
    /// Fewer elements are readable than requested.
    Underflow {
        /// Elements requested.
        requested: usize,
        /// Elements readable.
        available: usize,
    },
    /// Fewer slots are free than requested.
    Overflow {
        /// Slots requested.
        requested: usize,
        /// Slots free.
        free: usize,
    },
    /// Host storage is shorter than the required capacity.
    StorageTooSmall {
        /// Capacity required.
        required: usize,
        /// Elements provided.
        provided: usize,
    },
    /// The initial delay does not fit in the buffer.
    DelayExceedsCapacity {
        /// Requested delay.
        delay: usize,
        /// Buffer capacity.
        capacity: usize,
    },
    /// A FIFO must hold at least one element.
    ZeroCapacity,
}

impl core::fmt::Display for FifoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Underflow {
                requested,
                available,
            } => write!(f, "underflow: requested {requested}, {available} available"),
            Self::Overflow { requested, free } => {
                write!(f, "overflow: requested {requested}, {free} free")
            }
            Self::StorageTooSmall { required, provided } => write!(
                f,
                "storage holds {provided} elements, capacity needs {required}"
            ),
            Self::DelayExceedsCapacity { delay, capacity } => {
                write!(f, "delay {delay} exceeds capacity {capacity}")
            }
            Self::ZeroCapacity => write!(f, "capacity must be at least 1"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FifoError {}

/// Elements lent by [`Fifo::reserve_read`], split at the wrap boundary.
#[derive(Debug)]
pub struct ReadRegion<'a, T> {
    first: &'a [T],
    second: &'a [T],
}

impl<'a, T> ReadRegion<'a, T> {
    /// Leading part, up to the end of the storage.
    pub fn first(&self) -> &'a [T] {
        self.first
    }

    /// Wrapped part from the start of the storage (may be empty).
    pub fn second(&self) -> &'a [T] {
        self.second
    }

    /// Total elements in the region.
    pub fn len(&self) -> usize {
        self.first.len() + self.second.len()
    }

    /// Returns true if the region holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over the elements in FIFO order.
    pub fn iter(&self) -> core::iter::Chain<core::slice::Iter<'a, T>, core::slice::Iter<'a, T>> {
        self.first.iter().chain(self.second.iter())
    }

    /// Returns the element at position `i` in FIFO order.
    pub fn get(&self, i: usize) -> Option<&'a T> {
        if i < self.first.len() {
            self.first.get(i)
        } else {
            self.second.get(i - self.first.len())
        }
    }

    /// Clones the region into `dst`, which must have exactly [`len()`](Self::len) elements.
    ///
    /// # Panics
    ///
    /// Panics if `dst.len() != self.len()`.
    pub fn copy_to(&self, dst: &mut [T])
    where
        T: Clone,
    {
        let (head, tail) = dst.split_at_mut(self.first.len());
        head.clone_from_slice(self.first);
        tail.clone_from_slice(self.second);
    }
}

/// Slots lent by [`Fifo::reserve_write`], split at the wrap boundary.
#[derive(Debug)]
pub struct WriteRegion<'a, T> {
    first: &'a mut [T],
    second: &'a mut [T],
}

impl<T> WriteRegion<'_, T> {
    /// Leading part, up to the end of the storage.
    pub fn first(&mut self) -> &mut [T] {
        self.first
    }

    /// Wrapped part from the start of the storage (may be empty).
    pub fn second(&mut self) -> &mut [T] {
        self.second
    }

    /// Total slots in the region.
    pub fn len(&self) -> usize {
        self.first.len() + self.second.len()
    }

    /// Returns true if the region holds no slots.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates mutably over the slots in FIFO order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.first.iter_mut().chain(self.second.iter_mut())
    }

    /// Clones `src` into the region; `src` must have exactly [`len()`](Self::len) elements.
    ///
    /// # Panics
    ///
    /// Panics if `src.len() != self.len()`.
    pub fn copy_from(&mut self, src: &[T])
    where
        T: Clone,
    {
        let (head, tail) = src.split_at(self.first.len());
        self.first.clone_from_slice(head);
        self.second.clone_from_slice(tail);
    }
}

/// Fixed-capacity circular queue.
///
/// Starts with `delay` readable elements (the edge's initial tokens) and
/// returns to that state on [`reset()`](Self::reset).
#[derive(Debug, Clone)]
pub struct Fifo<T> {
    storage: Vec<T>,
    /// Initial tokens, replayed by `reset()`.
    initial: Vec<T>,
    read: usize,
    len: usize,
}

impl<T: Clone> Fifo<T> {
    /// Allocates a FIFO whose delay elements are `T::default()`.
    pub fn new(capacity: usize, delay: usize) -> Result<Self, FifoError>
    where
        T: Default,
    {
        Self::from_storage(vec![T::default(); capacity], capacity, delay)
    }

    /// Binds host-provided storage.
    ///
    /// The first `delay` elements of `storage` are the initial tokens.
    /// Storage beyond `capacity` is dropped.
    pub fn from_storage(
        mut storage: Vec<T>,
        capacity: usize,
        delay: usize,
    ) -> Result<Self, FifoError> {
        if capacity == 0 {
            return Err(FifoError::ZeroCapacity);
        }
        if storage.len() < capacity {
            return Err(FifoError::StorageTooSmall {
                required: capacity,
                provided: storage.len(),
            });
        }
        if delay > capacity {
            return Err(FifoError::DelayExceedsCapacity { delay, capacity });
        }
        storage.truncate(capacity);
        let initial = storage[..delay].to_vec();
        Ok(Self {
            storage,
            initial,
            read: 0,
            len: delay,
        })
    }

    /// Restores the initial delay state.
    pub fn reset(&mut self) {
        let delay = self.initial.len();
        self.storage[..delay].clone_from_slice(&self.initial);
        self.read = 0;
        self.len = delay;
    }

    /// Reads exactly `dst.len()` elements.
    pub fn pop_slice(&mut self, dst: &mut [T]) -> Result<(), FifoError> {
        self.reserve_read(dst.len())?.copy_to(dst);
        Ok(())
    }

    /// Writes all of `src`.
    pub fn push_slice(&mut self, src: &[T]) -> Result<(), FifoError> {
        self.reserve_write(src.len())?.copy_from(src);
        Ok(())
    }
}

impl<T> Fifo<T> {
    /// Fixed capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Initial token count.
    #[inline]
    pub fn delay(&self) -> usize {
        self.initial.len()
    }

    /// Elements ready to be read.
    #[inline]
    pub fn available_to_read(&self) -> usize {
        self.len
    }

    /// Free slots.
    #[inline]
    pub fn available_to_write(&self) -> usize {
        self.capacity() - self.len
    }

    /// True if reading `n` elements would underflow.
    #[inline]
    pub fn will_underflow(&self, n: usize) -> bool {
        self.available_to_read() < n
    }

    /// True if writing `n` elements would overflow.
    #[inline]
    pub fn will_overflow(&self, n: usize) -> bool {
        self.available_to_write() < n
    }

    /// Consumes `n` elements and lends them out.
    pub fn reserve_read(&mut self, n: usize) -> Result<ReadRegion<'_, T>, FifoError> {
        if self.will_underflow(n) {
            return Err(FifoError::Underflow {
                requested: n,
                available: self.len,
            });
        }
        let start = self.read;
        self.read = (self.read + n) % self.capacity();
        self.len -= n;

        let head = n.min(self.capacity() - start);
        Ok(ReadRegion {
            first: &self.storage[start..start + head],
            second: &self.storage[..n - head],
        })
    }

    /// Commits `n` slots and lends them out for writing.
    pub fn reserve_write(&mut self, n: usize) -> Result<WriteRegion<'_, T>, FifoError> {
        if self.will_overflow(n) {
            return Err(FifoError::Overflow {
                requested: n,
                free: self.available_to_write(),
            });
        }
        let start = (self.read + self.len) % self.capacity();
        self.len += n;

        let head = n.min(self.capacity() - start);
        let (wrapped, tail) = self.storage.split_at_mut(start);
        Ok(WriteRegion {
            first: &mut tail[..head],
            second: &mut wrapped[..n - head],
        })
    }
}

/// Type-erased FIFO, so one engine can hold edges of different element types.
///
/// Recover the typed queue with `as_any_mut().downcast_mut::<Fifo<T>>()`.
pub trait ErasedFifo: Any + Send {
    /// See [`Fifo::available_to_read`].
    fn available_to_read(&self) -> usize;
    /// See [`Fifo::available_to_write`].
    fn available_to_write(&self) -> usize;
    /// See [`Fifo::capacity`].
    fn capacity(&self) -> usize;
    /// See [`Fifo::reset`].
    fn reset(&mut self);
    /// Size of one element in bytes.
    fn element_size(&self) -> usize;
    /// Upcast for typed access.
    fn as_any(&self) -> &dyn Any;
    /// Upcast for typed mutable access.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Clone + Send + 'static> ErasedFifo for Fifo<T> {
    fn available_to_read(&self) -> usize {
        Fifo::available_to_read(self)
    }

    fn available_to_write(&self) -> usize {
        Fifo::available_to_write(self)
    }

    fn capacity(&self) -> usize {
        Fifo::capacity(self)
    }

    fn reset(&mut self) {
        Fifo::reset(self);
    }

    fn element_size(&self) -> usize {
        core::mem::size_of::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraparound_round_trip() {
        let mut fifo: Fifo<u8> = Fifo::new(8, 0).unwrap();
        fifo.push_slice(&[1, 2, 3, 4, 5]).unwrap();

        let mut two = [0u8; 2];
        fifo.pop_slice(&mut two).unwrap();
        assert_eq!(two, [1, 2]);

        // Write 5 more: 3 fit before the end, 2 wrap to the front.
        {
            let mut region = fifo.reserve_write(5).unwrap();
            assert_eq!(region.first().len(), 3);
            assert_eq!(region.second().len(), 2);
            region.copy_from(&[6, 7, 8, 9, 10]);
        }
        assert_eq!(fifo.available_to_read(), 8);
        assert!(fifo.will_overflow(1));

        let region = fifo.reserve_read(8).unwrap();
        assert_eq!(region.first(), &[3, 4, 5, 6, 7, 8]);
        assert_eq!(region.second(), &[9, 10]);
        let all: Vec<u8> = region.iter().copied().collect();
        assert_eq!(all, vec![3, 4, 5, 6, 7, 8, 9, 10]);
        assert_eq!(fifo.available_to_read(), 0);
    }

    #[test]
    fn predicates() {
        let mut fifo: Fifo<f32> = Fifo::new(4, 0).unwrap();
        assert!(fifo.will_underflow(1));
        assert!(!fifo.will_overflow(4));
        assert!(fifo.will_overflow(5));
        fifo.push_slice(&[0.5; 3]).unwrap();
        assert!(!fifo.will_underflow(3));
        assert!(fifo.will_underflow(4));
        assert!(fifo.will_overflow(2));
    }

    #[test]
    fn reservations_fail_without_moving_cursors() {
        let mut fifo: Fifo<u16> = Fifo::new(2, 0).unwrap();
        assert_eq!(
            fifo.reserve_read(1).unwrap_err(),
            FifoError::Underflow {
                requested: 1,
                available: 0
            }
        );
        fifo.push_slice(&[1, 2]).unwrap();
        assert_eq!(
            fifo.reserve_write(1).unwrap_err(),
            FifoError::Overflow {
                requested: 1,
                free: 0
            }
        );
        assert_eq!(fifo.available_to_read(), 2);
    }

    #[test]
    fn delay_and_reset() {
        let mut fifo = Fifo::from_storage(vec![9u32, 8, 0, 0], 4, 2).unwrap();
        assert_eq!(fifo.delay(), 2);
        assert_eq!(fifo.available_to_read(), 2);

        fifo.push_slice(&[1, 2]).unwrap();
        let mut out = [0u32; 3];
        fifo.pop_slice(&mut out).unwrap();
        assert_eq!(out, [9, 8, 1]);

        fifo.reset();
        let mut out = [0u32; 2];
        fifo.pop_slice(&mut out).unwrap();
        assert_eq!(out, [9, 8]);
    }

    #[test]
    fn construction_errors() {
        assert_eq!(
            Fifo::<u8>::new(0, 0).unwrap_err(),
            FifoError::ZeroCapacity
        );
        assert_eq!(
            Fifo::<u8>::new(2, 3).unwrap_err(),
            FifoError::DelayExceedsCapacity {
                delay: 3,
                capacity: 2
            }
        );
        assert_eq!(
            Fifo::from_storage(vec![0u8; 3], 4, 0).unwrap_err(),
            FifoError::StorageTooSmall {
                required: 4,
                provided: 3
            }
        );
        // Oversized storage is trimmed to the capacity.
        assert_eq!(Fifo::from_storage(vec![0u8; 16], 4, 0).unwrap().capacity(), 4);
    }

    #[test]
    fn erased_downcast() {
        let mut erased: Vec<Box<dyn ErasedFifo>> = vec![
            Box::new(Fifo::<i16>::new(4, 1).unwrap()),
            Box::new(Fifo::<f64>::new(2, 0).unwrap()),
        ];
        assert_eq!(erased[0].element_size(), 2);
        assert_eq!(erased[1].element_size(), 8);
        assert_eq!(erased[0].available_to_read(), 1);

        let typed = erased[1]
            .as_any_mut()
            .downcast_mut::<Fifo<f64>>()
            .unwrap();
        typed.push_slice(&[1.0]).unwrap();
        assert_eq!(erased[1].available_to_write(), 1);
        assert!(erased[1].as_any().downcast_ref::<Fifo<i16>>().is_none());

        erased[1].reset();
        assert_eq!(erased[1].available_to_read(), 0);
    }
}
