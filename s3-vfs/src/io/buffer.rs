/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::cmp;
use std::ops::Deref;

use bytes::{Bytes, BytesMut};

/// Accumulates appended bytes until a full part is available.
///
/// The buffer never holds more than `part_size` bytes. Callers feed data with [`fill`],
/// and once [`is_full`] reports true, detach the part with [`take`].
///
/// [`fill`]: PartBuffer::fill
/// [`is_full`]: PartBuffer::is_full
/// [`take`]: PartBuffer::take
#[derive(Debug)]
pub(crate) struct PartBuffer {
    inner: BytesMut,
    part_size: usize,
}

impl PartBuffer {
    pub(crate) fn new(part_size: usize) -> Self {
        Self {
            inner: BytesMut::new(),
            part_size,
        }
    }

    pub(crate) fn is_full(&self) -> bool {
        self.inner.len() >= self.part_size
    }

    /// Copy as much of `data` as fits in the current part and return the unconsumed tail.
    pub(crate) fn fill<'a>(&mut self, data: &'a [u8]) -> &'a [u8] {
        let room = self.part_size.saturating_sub(self.inner.len());
        let (head, tail) = data.split_at(cmp::min(room, data.len()));
        if !head.is_empty() {
            // reserve the whole part up front so a part is allocated once
            self.inner.reserve(room);
            self.inner.extend_from_slice(head);
        }
        tail
    }

    /// Detach everything buffered so far, leaving the buffer empty.
    pub(crate) fn take(&mut self) -> Bytes {
        self.inner.split().freeze()
    }

    /// Shorten the buffer to `len` bytes, dropping anything appended after it.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.inner.truncate(len);
    }

    /// Replace the buffer contents with `data`.
    pub(crate) fn reset(&mut self, data: &[u8]) {
        self.inner.clear();
        self.inner.extend_from_slice(data);
    }
}

impl Deref for PartBuffer {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        self.inner.deref()
    }
}

#[cfg(test)]
mod test {
    use super::PartBuffer;

    #[test]
    fn test_fill_stops_at_part_size() {
        let mut buf = PartBuffer::new(4);
        let rest = buf.fill(b"ab");
        assert!(rest.is_empty());
        assert!(!buf.is_full());

        let rest = buf.fill(b"cdefg");
        assert_eq!(b"efg", rest);
        assert!(buf.is_full());
        assert_eq!(b"abcd", &buf[..]);

        // a full buffer accepts nothing more
        let rest = buf.fill(rest);
        assert_eq!(b"efg", rest);
    }

    #[test]
    fn test_take_empties_buffer() {
        let mut buf = PartBuffer::new(4);
        let rest = buf.fill(b"abcdef");
        let part = buf.take();
        assert_eq!(&b"abcd"[..], &part[..]);
        assert!(buf.is_empty());

        let rest = buf.fill(rest);
        assert!(rest.is_empty());
        assert_eq!(b"ef", &buf[..]);
    }

    #[test]
    fn test_truncate_and_reset() {
        let mut buf = PartBuffer::new(8);
        buf.fill(b"abcdef");
        buf.truncate(2);
        assert_eq!(b"ab", &buf[..]);

        buf.reset(b"xyz");
        assert_eq!(b"xyz", &buf[..]);
        assert_eq!(3, buf.len());
    }
}
