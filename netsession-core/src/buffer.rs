//! Borrowed byte view for payloads crossing the session boundary.
//!
//! A [`Buffer`] describes exactly one outbound or inbound payload. It never
//! owns its bytes and never outlives the call that produced it: inbound
//! buffers handed to data callbacks are only valid for the duration of the
//! callback.

use std::ops::Deref;

/// Non-owning view over a single payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Buffer<'a> {
    data: &'a [u8],
}

impl<'a> Buffer<'a> {
    /// Wraps a byte slice.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Returns the viewed bytes.
    #[must_use]
    pub const fn as_slice(&self) -> &'a [u8] {
        self.data
    }

    /// Returns the payload length in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the payload is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Copies the payload into an owned vector.
    ///
    /// Callbacks that need the bytes after they return must copy them.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        self.data.to_vec()
    }
}

impl Deref for Buffer<'_> {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        self.data
    }
}

impl AsRef<[u8]> for Buffer<'_> {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self.data
    }
}

impl<'a> From<&'a [u8]> for Buffer<'a> {
    fn from(data: &'a [u8]) -> Self {
        Self::new(data)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for Buffer<'a> {
    fn from(data: &'a [u8; N]) -> Self {
        Self::new(data.as_slice())
    }
}

impl<'a> From<&'a Vec<u8>> for Buffer<'a> {
    fn from(data: &'a Vec<u8>) -> Self {
        Self::new(data.as_slice())
    }
}

impl<'a> From<&'a str> for Buffer<'a> {
    fn from(data: &'a str) -> Self {
        Self::new(data.as_bytes())
    }
}
