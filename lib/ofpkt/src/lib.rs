// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Packet classification and mutable-field engine.
//!
//! A raw frame is copied into a [`store::ByteStore`], classified into
//! a chain of typed protocol layers alongside a summary of OXM-style
//! field values, and may then be edited field by field or by pushing
//! and popping encapsulation headers. Checksums are recomputed
//! explicitly, once per packet, from the set of checksums made stale
//! by those edits.

#![deny(unreachable_patterns)]
#![deny(unused_must_use)]
#![allow(clippy::len_without_is_empty)]

pub use ofpkt_api as api;

pub mod config;
pub mod engine;
#[cfg(any(feature = "std", test))]
pub mod print;
pub mod store;

/// Return value with `bit` set.
pub const fn bit_on(bit: u8) -> u8 {
    0x1 << bit
}
