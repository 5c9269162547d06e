// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

use alloc::str::FromStr;
use alloc::string::String;
use core::fmt;
use core::fmt::Debug;
use core::fmt::Display;
use serde::Deserialize;
use serde::Serialize;

/// A MAC address, as carried in the Ethernet, ARP and ND link-layer
/// address fields.
#[derive(
    Clone,
    Copy,
    Default,
    Deserialize,
    Eq,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
    Hash,
)]
pub struct MacAddr {
    inner: [u8; 6],
}

impl MacAddr {
    pub const ZERO: Self = Self { inner: [0x00; 6] };

    /// Return the bytes of the MAC address.
    #[inline]
    pub fn bytes(&self) -> [u8; 6] {
        self.inner
    }

    pub const fn from_const(bytes: [u8; 6]) -> Self {
        Self { inner: bytes }
    }
}

impl From<[u8; 6]> for MacAddr {
    fn from(bytes: [u8; 6]) -> Self {
        Self { inner: bytes }
    }
}

impl FromStr for MacAddr {
    type Err = String;

    /// Parse six colon-separated hex octets.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut inner = [0u8; 6];
        let mut parts = s.split(':');
        for octet in inner.iter_mut() {
            let part = parts.next().ok_or_else(|| format!("too short: {s}"))?;
            *octet = u8::from_str_radix(part, 16)
                .map_err(|_| format!("bad octet: {part}"))?;
        }

        if parts.next().is_some() {
            return Err(format!("too long: {s}"));
        }

        Ok(Self { inner })
    }
}

impl Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let [a, b, c, d, e, g] = self.inner;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "MacAddr({self})")
    }
}
