//! Serializable node state for fully-asynchronous execution.
//!
//! Between two activations of a fully-asynchronous graph the host regains
//! control, so a node's working state is parked in the
//! [`ExecutionContext`](super::ExecutionContext) as an opaque [`NodeState`]
//! blob. [`StateWriter`] and [`StateReader`] encode fixed-width
//! little-endian fields so blobs round-trip exactly on every target.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// Opaque state blob produced by [`Node::save_state`](super::Node::save_state).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct NodeState(Vec<u8>);

impl NodeState {
    /// Wraps raw bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Returns the encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Unwraps the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Encoded length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for an empty blob.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Starts decoding from the first byte.
    pub fn reader(&self) -> StateReader<'_> {
        StateReader::new(&self.0)
    }
}

/// Little-endian encoder for [`NodeState`].
///
/// ```rust
/// use cadence_core::StateWriter;
///
/// let state = StateWriter::new().u32(7).f32(0.5).finish();
/// let mut r = state.reader();
/// assert_eq!(r.u32(), Some(7));
/// assert_eq!(r.f32(), Some(0.5));
/// assert_eq!(r.u8(), None);
/// ```
#[derive(Clone, Debug, Default)]
pub struct StateWriter {
    buf: Vec<u8>,
}

impl StateWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one byte.
    pub fn u8(mut self, v: u8) -> Self {
        self.buf.push(v);
        self
    }

    /// Appends a `u16`.
    pub fn u16(mut self, v: u16) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    /// Appends a `u32`.
    pub fn u32(mut self, v: u32) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    /// Appends a `u64`.
    pub fn u64(mut self, v: u64) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    /// Appends an `i32`.
    pub fn i32(mut self, v: i32) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    /// Appends an `i64`.
    pub fn i64(mut self, v: i64) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    /// Appends an `f32` bit pattern.
    pub fn f32(self, v: f32) -> Self {
        self.u32(v.to_bits())
    }

    /// Appends an `f64` bit pattern.
    pub fn f64(self, v: f64) -> Self {
        self.u64(v.to_bits())
    }

    /// Appends raw bytes, prefixed with their `u32` length.
    pub fn bytes(self, v: &[u8]) -> Self {
        let mut this = self.u32(v.len() as u32);
        this.buf.extend_from_slice(v);
        this
    }

    /// Finishes the blob.
    pub fn finish(self) -> NodeState {
        NodeState(self.buf)
    }
}

/// Little-endian decoder for [`NodeState`]. Every getter returns `None`
/// once the blob is exhausted.
#[derive(Clone, Debug)]
pub struct StateReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> StateReader<'a> {
    /// Starts reading `bytes` from the beginning.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let end = self.pos.checked_add(N)?;
        let chunk = self.bytes.get(self.pos..end)?;
        self.pos = end;
        chunk.try_into().ok()
    }

    /// Reads one byte.
    pub fn u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[b]| b)
    }

    /// Reads a `u16`.
    pub fn u16(&mut self) -> Option<u16> {
        self.take().map(u16::from_le_bytes)
    }

    /// Reads a `u32`.
    pub fn u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    /// Reads a `u64`.
    pub fn u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    /// Reads an `i32`.
    pub fn i32(&mut self) -> Option<i32> {
        self.take().map(i32::from_le_bytes)
    }

    /// Reads an `i64`.
    pub fn i64(&mut self) -> Option<i64> {
        self.take().map(i64::from_le_bytes)
    }

    /// Reads an `f32` bit pattern.
    pub fn f32(&mut self) -> Option<f32> {
        self.u32().map(f32::from_bits)
    }

    /// Reads an `f64` bit pattern.
    pub fn f64(&mut self) -> Option<f64> {
        self.u64().map(f64::from_bits)
    }

    /// Reads a length-prefixed byte string written by [`StateWriter::bytes`].
    pub fn bytes(&mut self) -> Option<&'a [u8]> {
        let len = self.u32()? as usize;
        let end = self.pos.checked_add(len)?;
        let chunk = self.bytes.get(self.pos..end)?;
        self.pos = end;
        Some(chunk)
    }
}
