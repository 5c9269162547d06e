// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! The owned byte buffer backing a packet.
//!
//! A [`ByteStore`] is a single contiguous allocation divided into three
//! regions:
//!
//! ```text
//! |<-- head-room -->|<------ frame ------>|<-- tail-room -->|
//! 0               head              head + len          capacity
//! ```
//!
//! Encapsulation headers are pushed by growing the frame into the
//! head-room and popped by handing the bytes back, so that the common
//! push/pop path never has to reallocate.

use core::cmp::Ordering;
use thiserror::Error;

/// The largest frame a store will hold.
pub const MAX_FRAME_LEN: usize = u16::MAX as usize;

#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum StoreError {
    #[error("requested {requested} bytes, only {available} available")]
    OutOfRange { requested: usize, available: usize },

    #[error("frame length {len} exceeds maximum of {max}")]
    TooLarge { len: usize, max: usize },

    #[error("margins of {head_room} and {tail_room} bytes overflow")]
    Overflow { head_room: usize, tail_room: usize },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ByteStore {
    buf: Vec<u8>,
    head: usize,
    len: usize,
}

impl ByteStore {
    /// Allocate a zero-filled store of `capacity` bytes, with the frame
    /// occupying whatever remains between the two margins.
    pub fn new(
        capacity: usize,
        head_room: usize,
        tail_room: usize,
    ) -> Result<Self, StoreError> {
        let margins = head_room.saturating_add(tail_room);
        if margins > capacity {
            return Err(StoreError::OutOfRange {
                requested: margins,
                available: capacity,
            });
        }

        let len = capacity - margins;
        if len > MAX_FRAME_LEN {
            return Err(StoreError::TooLarge { len, max: MAX_FRAME_LEN });
        }

        Ok(Self { buf: vec![0; capacity], head: head_room, len })
    }

    /// Copy `bytes` into a new store, surrounded by the given margins.
    pub fn from_bytes(
        bytes: &[u8],
        head_room: usize,
        tail_room: usize,
    ) -> Result<Self, StoreError> {
        let capacity = head_room
            .checked_add(bytes.len())
            .and_then(|n| n.checked_add(tail_room))
            .ok_or(StoreError::Overflow { head_room, tail_room })?;
        let mut store = Self::new(capacity, head_room, tail_room)?;
        store.frame_bytes_mut().copy_from_slice(bytes);
        Ok(store)
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn head_room(&self) -> usize {
        self.head
    }

    #[inline]
    pub fn tail_room(&self) -> usize {
        self.buf.len() - self.head - self.len
    }

    /// Return the length of the frame region.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn frame_bytes(&self) -> &[u8] {
        &self.buf[self.head..self.head + self.len]
    }

    pub fn frame_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.buf[self.head..self.head + self.len]
    }

    /// Return a copy of the frame.
    pub fn copy_all(&self) -> Vec<u8> {
        self.frame_bytes().to_vec()
    }

    /// Grow or shrink the frame at its tail. Head-room is untouched.
    /// Growth past the tail-room reallocates; new bytes are zeroed.
    pub fn resize_frame(&mut self, new_len: usize) -> Result<(), StoreError> {
        if new_len > MAX_FRAME_LEN {
            return Err(StoreError::TooLarge {
                len: new_len,
                max: MAX_FRAME_LEN,
            });
        }

        match new_len.cmp(&self.len) {
            Ordering::Less => {
                self.len = new_len;
            }

            Ordering::Greater => {
                let end = self.head + new_len;
                if end > self.buf.len() {
                    self.buf.resize(end, 0);
                }
                self.buf[self.head + self.len..end].fill(0);
                self.len = new_len;
            }

            Ordering::Equal => (),
        }

        Ok(())
    }

    /// Check that `len` bytes of head-room are available.
    pub fn reserve_head(&self, len: usize) -> Result<(), StoreError> {
        if self.head < len {
            return Err(StoreError::OutOfRange {
                requested: len,
                available: self.head,
            });
        }

        if self.len + len > MAX_FRAME_LEN {
            return Err(StoreError::TooLarge {
                len: self.len + len,
                max: MAX_FRAME_LEN,
            });
        }

        Ok(())
    }

    /// Move the frame start back by `len` bytes, turning that much
    /// head-room into (zeroed) frame bytes.
    pub fn release_head(&mut self, len: usize) -> Result<(), StoreError> {
        self.reserve_head(len)?;
        self.head -= len;
        self.len += len;
        self.buf[self.head..self.head + len].fill(0);
        Ok(())
    }

    /// Move the frame start forward by `len` bytes, returning them to
    /// the head-room.
    pub fn consume_head(&mut self, len: usize) -> Result<(), StoreError> {
        if self.len < len {
            return Err(StoreError::OutOfRange {
                requested: len,
                available: self.len,
            });
        }

        self.head += len;
        self.len -= len;
        Ok(())
    }

    /// Open a zeroed gap of `len` bytes at frame offset `offset`.
    ///
    /// The bytes before `offset` are moved into the head-room; the
    /// bytes after it stay where they are in the buffer.
    pub fn insert_gap(
        &mut self,
        offset: usize,
        len: usize,
    ) -> Result<(), StoreError> {
        if offset > self.len {
            return Err(StoreError::OutOfRange {
                requested: offset,
                available: self.len,
            });
        }

        self.release_head(len)?;
        let frame = self.frame_bytes_mut();
        frame.copy_within(len..len + offset, 0);
        frame[offset..offset + len].fill(0);
        Ok(())
    }

    /// Remove the `len` bytes at frame offset `offset`, returning them
    /// to the head-room.
    pub fn remove_gap(
        &mut self,
        offset: usize,
        len: usize,
    ) -> Result<(), StoreError> {
        let end = offset.saturating_add(len);
        if end > self.len {
            return Err(StoreError::OutOfRange {
                requested: end,
                available: self.len,
            });
        }

        self.frame_bytes_mut().copy_within(0..offset, len);
        self.consume_head(len)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn assert_margins(store: &ByteStore) {
        assert_eq!(
            store.head_room() + store.len() + store.tail_room(),
            store.capacity()
        );
    }

    #[test]
    fn create() {
        let store = ByteStore::new(100, 20, 10).unwrap();
        assert_eq!(store.len(), 70);
        assert_eq!(store.head_room(), 20);
        assert_eq!(store.tail_room(), 10);
        assert!(store.frame_bytes().iter().all(|b| *b == 0));
        assert_margins(&store);

        assert_eq!(
            ByteStore::new(10, 8, 4),
            Err(StoreError::OutOfRange { requested: 12, available: 10 })
        );
    }

    #[test]
    fn huge_margins() {
        let big = usize::MAX - 1;
        assert_eq!(
            ByteStore::from_bytes(&[1, 2], big, 0),
            Err(StoreError::Overflow { head_room: big, tail_room: 0 })
        );
        assert_eq!(
            ByteStore::from_bytes(&[1, 2], 4, big),
            Err(StoreError::Overflow { head_room: 4, tail_room: big })
        );
    }

    #[test]
    fn head_room_accounting() {
        let mut store = ByteStore::from_bytes(&[1, 2, 3, 4], 4, 2).unwrap();
        assert!(store.reserve_head(4).is_ok());
        assert_eq!(
            store.reserve_head(5),
            Err(StoreError::OutOfRange { requested: 5, available: 4 })
        );

        store.release_head(2).unwrap();
        assert_eq!(store.frame_bytes(), &[0, 0, 1, 2, 3, 4]);
        assert_eq!(store.head_room(), 2);
        assert_margins(&store);

        store.consume_head(3).unwrap();
        assert_eq!(store.frame_bytes(), &[2, 3, 4]);
        assert_eq!(store.head_room(), 5);
        assert_margins(&store);

        assert!(store.consume_head(4).is_err());
        assert_eq!(store.frame_bytes(), &[2, 3, 4]);
    }

    #[test]
    fn resize() {
        let mut store = ByteStore::from_bytes(&[9; 4], 2, 2).unwrap();
        store.resize_frame(2).unwrap();
        assert_eq!(store.frame_bytes(), &[9, 9]);
        assert_eq!(store.tail_room(), 4);

        // Growth within tail-room must not leak stale bytes.
        store.resize_frame(5).unwrap();
        assert_eq!(store.frame_bytes(), &[9, 9, 0, 0, 0]);
        assert_eq!(store.tail_room(), 1);

        // Growth past tail-room reallocates.
        store.resize_frame(10).unwrap();
        assert_eq!(store.len(), 10);
        assert_eq!(store.head_room(), 2);
        assert_eq!(store.tail_room(), 0);
        assert_margins(&store);

        assert!(store.resize_frame(MAX_FRAME_LEN + 1).is_err());
    }

    #[test]
    fn gaps() {
        let mut store =
            ByteStore::from_bytes(&[1, 2, 3, 4, 5, 6], 8, 0).unwrap();
        store.insert_gap(2, 3).unwrap();
        assert_eq!(store.frame_bytes(), &[1, 2, 0, 0, 0, 3, 4, 5, 6]);
        assert_eq!(store.head_room(), 5);

        store.remove_gap(2, 3).unwrap();
        assert_eq!(store.frame_bytes(), &[1, 2, 3, 4, 5, 6]);
        assert_eq!(store.head_room(), 8);

        assert!(store.insert_gap(7, 1).is_err());
        assert!(store.insert_gap(0, 9).is_err());
        assert!(store.remove_gap(4, 3).is_err());
        assert_eq!(store.frame_bytes(), &[1, 2, 3, 4, 5, 6]);
    }
}
