// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

#![no_std]
#![deny(unreachable_patterns)]
#![deny(unused_must_use)]

#[cfg(any(feature = "std", test))]
#[macro_use]
extern crate std;

#[macro_use]
extern crate alloc;

pub mod action;
pub mod ip;
pub mod mac;
pub mod matching;
pub mod oxm;
pub mod value;

pub use action::*;
pub use ip::*;
pub use mac::*;
pub use matching::*;
pub use oxm::*;
pub use value::*;

/// The overall version of the API. Anytime an API type is added,
/// removed, or modified, this number should increment.
pub const API_VERSION: u64 = 1;

/// Major version of the ofpkt package.
pub const MAJOR_VERSION: u64 = 0;
