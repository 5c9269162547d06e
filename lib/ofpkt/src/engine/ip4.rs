// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! IPv4 headers.

use super::checksum::Checksum;
use super::checksum::HeaderChecksum;
use super::headers::HdrError;
use super::headers::RawHeader;
use crate::api::Ipv4Addr;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::Unaligned;

pub const IPV4_VERSION: u8 = 4;
pub const IPV4_HDR_LEN_MIN: usize = 20;
pub const IPV4_HDR_LEN_MAX: usize = 60;

pub const IPV4_FLAG_MF: u16 = 0x2000;
pub const IPV4_FRAG_OFFSET_MASK: u16 = 0x1FFF;

/// Note: For now we keep this unaligned to be safe.
#[repr(C)]
#[derive(
    Clone, Copy, Debug, FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
)]
pub struct Ipv4HdrRaw {
    pub ver_hdr_len: u8,
    pub dscp_ecn: u8,
    pub total_len: [u8; 2],
    pub ident: [u8; 2],
    pub frag_and_flags: [u8; 2],
    pub ttl: u8,
    pub proto: u8,
    pub csum: [u8; 2],
    pub src: [u8; 4],
    pub dst: [u8; 4],
}

impl RawHeader for Ipv4HdrRaw {}

impl Default for Ipv4HdrRaw {
    fn default() -> Self {
        Ipv4HdrRaw {
            ver_hdr_len: 0x45,
            dscp_ecn: 0x0,
            total_len: [0x0; 2],
            ident: [0x0; 2],
            frag_and_flags: [0x40, 0x0],
            ttl: 64,
            proto: 0xFF,
            csum: [0x0; 2],
            src: [0x0; 4],
            dst: [0x0; 4],
        }
    }
}

impl Ipv4HdrRaw {
    /// View an IPv4 header, validating the version and that the
    /// options announced by IHL are present in `src`.
    pub fn parse(src: &[u8]) -> Result<&Self, HdrError> {
        let hdr = Self::new(src)?;
        if hdr.version() != IPV4_VERSION {
            return Err(HdrError::BadVersion { version: hdr.version() });
        }

        let hdr_len = hdr.hdr_len();
        if hdr_len < IPV4_HDR_LEN_MIN {
            return Err(HdrError::BadHeaderLength { len: hdr_len });
        }

        if src.len() < hdr_len {
            return Err(HdrError::Truncated {
                needed: hdr_len,
                available: src.len(),
            });
        }

        Ok(hdr)
    }

    pub fn version(&self) -> u8 {
        self.ver_hdr_len >> 4
    }

    /// Header length in bytes, including options.
    pub fn hdr_len(&self) -> usize {
        usize::from(self.ver_hdr_len & 0x0F) * 4
    }

    pub fn dscp(&self) -> u8 {
        self.dscp_ecn >> 2
    }

    pub fn ecn(&self) -> u8 {
        self.dscp_ecn & 0x3
    }

    pub fn total_len(&self) -> u16 {
        u16::from_be_bytes(self.total_len)
    }

    fn frag_and_flags(&self) -> u16 {
        u16::from_be_bytes(self.frag_and_flags)
    }

    pub fn more_frags(&self) -> bool {
        self.frag_and_flags() & IPV4_FLAG_MF != 0
    }

    pub fn frag_offset(&self) -> u16 {
        self.frag_and_flags() & IPV4_FRAG_OFFSET_MASK
    }

    /// Is this any fragment other than a whole datagram?
    pub fn is_fragment(&self) -> bool {
        self.more_frags() || self.frag_offset() != 0
    }

    pub fn src(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.src)
    }

    pub fn dst(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.dst)
    }

    pub fn set_dscp(&mut self, dscp: u8) {
        self.dscp_ecn = (dscp << 2) | self.ecn();
    }

    pub fn set_ecn(&mut self, ecn: u8) {
        self.dscp_ecn = (self.dscp_ecn & 0xFC) | (ecn & 0x3);
    }

    pub fn set_total_len(&mut self, len: u16) {
        self.total_len = len.to_be_bytes();
    }
}

/// Compute the checksum of an IPv4 header (including options) held in
/// `hdr_bytes`, treating the checksum field as zero.
pub fn compute_hdr_csum(hdr_bytes: &[u8]) -> [u8; 2] {
    let mut csum = Checksum::compute(&hdr_bytes[..10]);
    csum.add_bytes(&hdr_bytes[12..]);
    HeaderChecksum::from(csum).bytes()
}

/// Build the IPv4 pseudo-header sum for an upper-layer protocol.
pub fn pseudo_csum(
    src: Ipv4Addr,
    dst: Ipv4Addr,
    proto: u8,
    len: u16,
) -> Checksum {
    let mut csum = Checksum::new();
    csum.add_bytes(&src.bytes());
    csum.add_bytes(&dst.bytes());
    csum.add_bytes(&[0, proto]);
    csum.add_bytes(&len.to_be_bytes());
    csum
}

#[cfg(test)]
mod test {
    use super::*;

    #[rustfmt::skip]
    const HDR: [u8; 20] = [
        // version + IHL, DSCP + ECN
        0x45, 0x00,
        // total length
        0x00, 0x73,
        // ident
        0x00, 0x00,
        // flags + frag offset
        0x40, 0x00,
        // TTL, protocol
        0x40, 0x11,
        // checksum
        0xB8, 0x61,
        // source
        0xC0, 0xA8, 0x00, 0x01,
        // dest
        0xC0, 0xA8, 0x00, 0xC7,
    ];

    #[test]
    fn hdr_csum() {
        assert_eq!(compute_hdr_csum(&HDR), [0xB8, 0x61]);
    }

    #[test]
    fn parse_checks() {
        let hdr = Ipv4HdrRaw::parse(&HDR).unwrap();
        assert_eq!(hdr.hdr_len(), 20);
        assert!(!hdr.is_fragment());

        let mut bad = HDR;
        bad[0] = 0x65;
        assert_eq!(
            Ipv4HdrRaw::parse(&bad).unwrap_err(),
            HdrError::BadVersion { version: 6 }
        );

        bad[0] = 0x44;
        assert_eq!(
            Ipv4HdrRaw::parse(&bad).unwrap_err(),
            HdrError::BadHeaderLength { len: 16 }
        );

        // IHL announces options that aren't there.
        bad[0] = 0x46;
        assert_eq!(
            Ipv4HdrRaw::parse(&bad).unwrap_err(),
            HdrError::Truncated { needed: 24, available: 20 }
        );
    }

    #[test]
    fn fragments() {
        let mut bytes = HDR;
        bytes[6] = 0x20;
        assert!(Ipv4HdrRaw::parse(&bytes).unwrap().more_frags());
        bytes[6] = 0x00;
        bytes[7] = 0x10;
        let hdr = Ipv4HdrRaw::parse(&bytes).unwrap();
        assert_eq!(hdr.frag_offset(), 0x10);
        assert!(hdr.is_fragment());
    }

    #[test]
    fn dscp_ecn() {
        let mut hdr = Ipv4HdrRaw::default();
        hdr.set_dscp(46);
        hdr.set_ecn(3);
        assert_eq!(hdr.dscp_ecn, 0xBB);
        hdr.set_ecn(0);
        assert_eq!(hdr.dscp(), 46);
    }
}
