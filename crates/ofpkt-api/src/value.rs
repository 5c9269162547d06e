// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

use crate::FieldId;
use crate::Ipv4Addr;
use crate::Ipv6Addr;
use crate::MacAddr;
use crate::ValueKind;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::fmt::Display;
use serde::Deserialize;
use serde::Serialize;

/// The value of a single field.
#[derive(
    Clone,
    Debug,
    Deserialize,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
pub enum FieldValue {
    Int(u64),
    Mac(MacAddr),
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    Bytes(Vec<u8>),
}

impl FieldValue {
    pub fn as_int(&self) -> Option<u64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_mac(&self) -> Option<MacAddr> {
        match self {
            Self::Mac(mac) => Some(*mac),
            _ => None,
        }
    }

    pub fn as_ipv4(&self) -> Option<Ipv4Addr> {
        match self {
            Self::Ipv4(ip) => Some(*ip),
            _ => None,
        }
    }

    pub fn as_ipv6(&self) -> Option<Ipv6Addr> {
        match self {
            Self::Ipv6(ip) => Some(*ip),
            _ => None,
        }
    }

    /// Does this value have the shape, and fit within the width, of
    /// `kind`?
    pub fn conforms_to(&self, kind: ValueKind) -> bool {
        match (self, kind) {
            (Self::Int(v), k @ ValueKind::Int { .. }) => {
                k.max_int().is_some_and(|max| *v <= max)
            }
            (Self::Mac(_), ValueKind::Mac) => true,
            (Self::Ipv4(_), ValueKind::Ipv4) => true,
            (Self::Ipv6(_), ValueKind::Ipv6) => true,
            (Self::Bytes(_), ValueKind::Bytes) => true,
            _ => false,
        }
    }

    /// The value in network byte order.
    ///
    /// Integers are rendered as 8 big-endian bytes so that masks of
    /// the same variant line up.
    pub fn octets(&self) -> Vec<u8> {
        match self {
            Self::Int(v) => v.to_be_bytes().to_vec(),
            Self::Mac(mac) => mac.bytes().to_vec(),
            Self::Ipv4(ip) => ip.bytes().to_vec(),
            Self::Ipv6(ip) => ip.bytes().to_vec(),
            Self::Bytes(b) => b.clone(),
        }
    }

    /// Compare `self` and `other` under `mask`.
    ///
    /// Values of differing shape, or a mask of a different length,
    /// never match.
    pub fn masked_eq(&self, other: &Self, mask: &Self) -> bool {
        let (a, b, m) = (self.octets(), other.octets(), mask.octets());
        if core::mem::discriminant(self) != core::mem::discriminant(other)
            || a.len() != b.len()
            || a.len() != m.len()
        {
            return false;
        }

        a.iter().zip(b.iter()).zip(m.iter()).all(|((a, b), m)| a & m == b & m)
    }

    /// Parse a textual value according to the kind of `field`.
    ///
    /// Integers may be written in decimal or with a `0x` prefix.
    pub fn parse_for(field: FieldId, s: &str) -> Result<Self, String> {
        let s = s.trim();
        let val = match field.value_kind() {
            ValueKind::Int { .. } => {
                let n = match s.strip_prefix("0x") {
                    Some(hex) => u64::from_str_radix(hex, 16),
                    None => s.parse::<u64>(),
                };
                Self::Int(n.map_err(|e| format!("bad integer {s}: {e}"))?)
            }
            ValueKind::Mac => Self::Mac(s.parse()?),
            ValueKind::Ipv4 => Self::Ipv4(s.parse()?),
            ValueKind::Ipv6 => Self::Ipv6(s.parse()?),
            ValueKind::Bytes => {
                if s.len() % 2 != 0 {
                    return Err(format!("odd length hex string: {s}"));
                }
                let bytes = (0..s.len())
                    .step_by(2)
                    .map(|i| {
                        u8::from_str_radix(&s[i..i + 2], 16)
                            .map_err(|_| format!("bad hex: {s}"))
                    })
                    .collect::<Result<Vec<u8>, _>>()?;
                Self::Bytes(bytes)
            }
        };

        if !val.conforms_to(field.value_kind()) {
            return Err(format!(
                "value {val} does not fit {field} ({})",
                field.value_kind()
            ));
        }

        Ok(val)
    }
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Mac(mac) => write!(f, "{mac}"),
            Self::Ipv4(ip) => write!(f, "{ip}"),
            Self::Ipv6(ip) => write!(f, "{ip}"),
            Self::Bytes(b) => {
                for byte in b {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<u8> for FieldValue {
    fn from(v: u8) -> Self {
        Self::Int(u64::from(v))
    }
}

impl From<u16> for FieldValue {
    fn from(v: u16) -> Self {
        Self::Int(u64::from(v))
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        Self::Int(u64::from(v))
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        Self::Int(v)
    }
}

impl From<MacAddr> for FieldValue {
    fn from(mac: MacAddr) -> Self {
        Self::Mac(mac)
    }
}

impl From<Ipv4Addr> for FieldValue {
    fn from(ip: Ipv4Addr) -> Self {
        Self::Ipv4(ip)
    }
}

impl From<Ipv6Addr> for FieldValue {
    fn from(ip: Ipv6Addr) -> Self {
        Self::Ipv6(ip)
    }
}
