// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Header types common to all protocols.

use thiserror::Error;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::Unaligned;

/// Why a header could not be read from a byte slice.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum HdrError {
    #[error("truncated header: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("bad version: {version}")]
    BadVersion { version: u8 },

    #[error("bad header length: {len}")]
    BadHeaderLength { len: usize },

    #[error("unsupported hardware/protocol address format")]
    BadAddressFormat,
}

/// A fixed-size, unaligned, wire-format header.
///
/// Every implementor is a `#[repr(C)]` struct made up solely of bytes
/// and byte arrays, so it can be viewed in place at any offset of a
/// frame.
pub trait RawHeader:
    FromBytes + IntoBytes + KnownLayout + Immutable + Unaligned + Sized
{
    const SIZE: usize = core::mem::size_of::<Self>();

    /// View the front of `src` as this header.
    fn new(src: &[u8]) -> Result<&Self, HdrError> {
        let available = src.len();
        Self::ref_from_prefix(src)
            .map(|(hdr, _)| hdr)
            .map_err(|_| HdrError::Truncated { needed: Self::SIZE, available })
    }

    /// View the front of `src` as this header, mutably.
    fn new_mut(src: &mut [u8]) -> Result<&mut Self, HdrError> {
        let available = src.len();
        Self::mut_from_prefix(src)
            .map(|(hdr, _)| hdr)
            .map_err(|_| HdrError::Truncated { needed: Self::SIZE, available })
    }

    /// Write this header to the front of `dst`.
    ///
    /// The caller must provide at least [`Self::SIZE`] bytes.
    fn emit(&self, dst: &mut [u8]) {
        debug_assert!(dst.len() >= Self::SIZE);
        dst[..Self::SIZE].copy_from_slice(self.as_bytes());
    }
}
