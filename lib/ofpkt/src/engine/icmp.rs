// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! ICMPv4 and ICMPv6 headers, including the parts of IPv6 neighbor
//! discovery that are exposed as fields.

use super::headers::RawHeader;
use crate::api::Ipv6Addr;
use crate::api::MacAddr;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::Unaligned;

pub const ICMP_HDR_SZ: usize = 8;

pub const ICMPV4_ECHO_REPLY: u8 = 0;
pub const ICMPV4_ECHO_REQUEST: u8 = 8;

pub const ICMPV6_ECHO_REQUEST: u8 = 128;
pub const ICMPV6_ECHO_REPLY: u8 = 129;
pub const ICMPV6_NEIGHBOR_SOLICIT: u8 = 135;
pub const ICMPV6_NEIGHBOR_ADVERT: u8 = 136;

pub const ND_OPT_SOURCE_LLADDR: u8 = 1;
pub const ND_OPT_TARGET_LLADDR: u8 = 2;

/// Offset of the target address within an NS/NA message.
pub const ND_TARGET_OFFSET: usize = ICMP_HDR_SZ;
pub const ND_OPTS_OFFSET: usize = ND_TARGET_OFFSET + 16;

/// The 8-byte header shared by ICMPv4 and ICMPv6. The last four bytes
/// are message specific (echo identifier and sequence, ND flags, ...).
#[repr(C)]
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    FromBytes,
    Immutable,
    IntoBytes,
    KnownLayout,
    Unaligned,
)]
pub struct IcmpHdrRaw {
    pub msg_type: u8,
    pub code: u8,
    pub csum: [u8; 2],
    pub rest: [u8; 4],
}

impl RawHeader for IcmpHdrRaw {}

impl IcmpHdrRaw {
    pub fn new_hdr(msg_type: u8, code: u8, rest: [u8; 4]) -> Self {
        Self { msg_type, code, csum: [0; 2], rest }
    }

    pub fn csum(&self) -> u16 {
        u16::from_be_bytes(self.csum)
    }
}

/// A link-layer address option found in an ND message.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NdLinkAddr {
    /// Offset of the address within the ICMPv6 message.
    pub offset: usize,
    pub addr: MacAddr,
}

/// The neighbor discovery contents of an NS or NA message.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NdInfo {
    pub target: Ipv6Addr,
    pub sll: Option<NdLinkAddr>,
    pub tll: Option<NdLinkAddr>,
    /// Bytes of `msg` covered by the header, target and every
    /// well-formed option.
    pub len: usize,
}

pub fn is_nd(msg_type: u8) -> bool {
    matches!(msg_type, ICMPV6_NEIGHBOR_SOLICIT | ICMPV6_NEIGHBOR_ADVERT)
}

/// Walk a neighbor solicitation or advertisement held in `msg`.
///
/// Returns `None` for other message types or when the target address
/// is cut short. Options are read until the first malformed or
/// truncated one; a source link-layer address is only reported for a
/// solicitation and a target one only for an advertisement.
pub fn parse_nd(msg: &[u8]) -> Option<NdInfo> {
    let msg_type = *msg.first()?;
    if !is_nd(msg_type) || msg.len() < ND_OPTS_OFFSET {
        return None;
    }

    let mut target = [0u8; 16];
    target.copy_from_slice(&msg[ND_TARGET_OFFSET..ND_OPTS_OFFSET]);

    let mut info = NdInfo {
        target: Ipv6Addr::from(target),
        sll: None,
        tll: None,
        len: ND_OPTS_OFFSET,
    };

    let mut off = ND_OPTS_OFFSET;
    while msg.len() - off >= 2 {
        let opt_type = msg[off];
        let opt_len = usize::from(msg[off + 1]) * 8;
        if opt_len == 0 || off + opt_len > msg.len() {
            break;
        }

        if opt_len == 8 {
            let mut mac = [0u8; 6];
            mac.copy_from_slice(&msg[off + 2..off + 8]);
            let lla = Some(NdLinkAddr { offset: off + 2, addr: mac.into() });

            match (opt_type, msg_type) {
                (ND_OPT_SOURCE_LLADDR, ICMPV6_NEIGHBOR_SOLICIT) => {
                    info.sll = info.sll.or(lla);
                }
                (ND_OPT_TARGET_LLADDR, ICMPV6_NEIGHBOR_ADVERT) => {
                    info.tll = info.tll.or(lla);
                }
                _ => (),
            }
        }

        off += opt_len;
        info.len = off;
    }

    Some(info)
}

#[cfg(test)]
mod test {
    use super::*;

    #[rustfmt::skip]
    fn ns() -> Vec<u8> {
        vec![
            // type, code, checksum
            135, 0, 0x00, 0x00,
            // reserved
            0x00, 0x00, 0x00, 0x00,
            // target fe80::1
            0xFE, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01,
            // option: source link-layer address
            0x01, 0x01, 0xA8, 0x40, 0x25, 0x00, 0x00, 0x01,
        ]
    }

    #[test]
    fn neighbor_solicit() {
        let msg = ns();
        let info = parse_nd(&msg).unwrap();
        assert_eq!(info.target, "fe80::1".parse().unwrap());
        assert_eq!(
            info.sll,
            Some(NdLinkAddr {
                offset: 26,
                addr: MacAddr::from([0xA8, 0x40, 0x25, 0x00, 0x00, 0x01]),
            })
        );
        assert_eq!(info.tll, None);
        assert_eq!(info.len, 32);
    }

    #[test]
    fn bad_options_stop_the_walk() {
        let mut msg = ns();
        // Zero-length option.
        msg[25] = 0;
        msg.extend_from_slice(&[0xAA; 4]);
        let info = parse_nd(&msg).unwrap();
        assert_eq!(info.sll, None);
        assert_eq!(info.len, ND_OPTS_OFFSET);

        assert_eq!(parse_nd(&msg[..20]), None);
        assert_eq!(parse_nd(&[ICMPV6_ECHO_REQUEST, 0, 0, 0]), None);
    }
}
