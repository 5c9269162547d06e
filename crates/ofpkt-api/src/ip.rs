// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::fmt::Debug;
use core::fmt::Display;
use core::result;
use core::str::FromStr;
use serde::Deserialize;
use serde::Serialize;

/// The IP protocol numbers the classifier knows how to descend into.
pub const PROTO_ICMP: u8 = 0x1;
pub const PROTO_IPV4: u8 = 0x4;
pub const PROTO_TCP: u8 = 0x6;
pub const PROTO_UDP: u8 = 0x11;
pub const PROTO_IPV6: u8 = 0x29;
pub const PROTO_ICMPV6: u8 = 0x3A;
pub const PROTO_SCTP: u8 = 0x84;

/// An IPv4 address.
#[derive(
    Clone,
    Copy,
    Default,
    Deserialize,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[repr(C)]
pub struct Ipv4Addr {
    inner: [u8; 4],
}

impl Ipv4Addr {
    /// Return the bytes of the address.
    #[inline]
    pub fn bytes(&self) -> [u8; 4] {
        self.inner
    }
}

impl From<Ipv4Addr> for smoltcp::wire::Ipv4Address {
    fn from(ip: Ipv4Addr) -> Self {
        Self(ip.inner)
    }
}

impl From<[u8; 4]> for Ipv4Addr {
    fn from(bytes: [u8; 4]) -> Self {
        Self { inner: bytes }
    }
}

impl FromStr for Ipv4Addr {
    type Err = String;

    fn from_str(val: &str) -> result::Result<Self, Self::Err> {
        let octets: Vec<u8> = val
            .split('.')
            .map(|s| s.parse().map_err(|e| format!("{e}")))
            .collect::<result::Result<Vec<u8>, _>>()?;

        if octets.len() != 4 {
            return Err(format!("malformed ip: {val}"));
        }

        Ok(Self { inner: [octets[0], octets[1], octets[2], octets[3]] })
    }
}

impl Display for Ipv4Addr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.inner[0], self.inner[1], self.inner[2], self.inner[3],
        )
    }
}

// There's no reason to view an Ipv4Addr as its raw array, so just
// present it in a human-friendly manner.
impl Debug for Ipv4Addr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Ipv4Addr {{ inner: {self} }}")
    }
}

/// An IPv6 address.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
    Deserialize,
)]
#[repr(C)]
pub struct Ipv6Addr {
    inner: [u8; 16],
}

impl Ipv6Addr {
    /// Return the bytes of the address.
    #[inline]
    pub fn bytes(&self) -> [u8; 16] {
        self.inner
    }
}

impl fmt::Display for Ipv6Addr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", core::net::Ipv6Addr::from(self.inner))
    }
}

impl From<core::net::Ipv6Addr> for Ipv6Addr {
    fn from(ip6: core::net::Ipv6Addr) -> Self {
        Self { inner: ip6.octets() }
    }
}

impl From<Ipv6Addr> for smoltcp::wire::Ipv6Address {
    fn from(ip: Ipv6Addr) -> Self {
        Self(ip.inner)
    }
}

impl From<[u8; 16]> for Ipv6Addr {
    fn from(bytes: [u8; 16]) -> Ipv6Addr {
        Ipv6Addr { inner: bytes }
    }
}

impl FromStr for Ipv6Addr {
    type Err = String;

    fn from_str(val: &str) -> result::Result<Self, Self::Err> {
        let ip = val
            .parse::<core::net::Ipv6Addr>()
            .map_err(|_| String::from("Invalid IPv6 address"))?;
        Ok(ip.into())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn ipv4_parse() {
        let ip: Ipv4Addr = "10.0.0.1".parse().unwrap();
        assert_eq!(ip.bytes(), [10, 0, 0, 1]);
        assert_eq!(ip.to_string(), "10.0.0.1");
        assert!("10.0.0".parse::<Ipv4Addr>().is_err());
        assert!("10.0.0.256".parse::<Ipv4Addr>().is_err());
    }

    #[test]
    fn ipv6_parse() {
        let ip: Ipv6Addr = "fd00::1".parse().unwrap();
        let mut bytes = [0u8; 16];
        bytes[0] = 0xFD;
        bytes[15] = 1;
        assert_eq!(ip, Ipv6Addr::from(bytes));
        assert_eq!(ip.to_string(), "fd00::1");
        assert!("fd00::g".parse::<Ipv6Addr>().is_err());
    }
}
