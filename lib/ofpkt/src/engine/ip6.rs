// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! IPv6 fixed headers.
//!
//! Extension headers are not walked: the next-header value of the
//! fixed header selects the following layer directly.

use super::checksum::Checksum;
use super::headers::HdrError;
use super::headers::RawHeader;
use crate::api::Ipv6Addr;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::Unaligned;

pub const IPV6_VERSION: u8 = 6;
pub const IPV6_FLOW_LABEL_MAX: u32 = 0xF_FFFF;

#[repr(C)]
#[derive(
    Clone, Copy, Debug, FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
)]
pub struct Ipv6HdrRaw {
    pub vsn_class_flow: [u8; 4],
    pub payload_len: [u8; 2],
    pub next_hdr: u8,
    pub hop_limit: u8,
    pub src: [u8; 16],
    pub dst: [u8; 16],
}

impl RawHeader for Ipv6HdrRaw {}

impl Default for Ipv6HdrRaw {
    fn default() -> Self {
        Self {
            vsn_class_flow: [0x60, 0x00, 0x00, 0x00],
            payload_len: [0; 2],
            next_hdr: 0x3B,
            hop_limit: 64,
            src: [0; 16],
            dst: [0; 16],
        }
    }
}

impl Ipv6HdrRaw {
    pub fn parse(src: &[u8]) -> Result<&Self, HdrError> {
        let hdr = Self::new(src)?;
        if hdr.version() != IPV6_VERSION {
            return Err(HdrError::BadVersion { version: hdr.version() });
        }
        Ok(hdr)
    }

    fn vcf(&self) -> u32 {
        u32::from_be_bytes(self.vsn_class_flow)
    }

    fn set_vcf(&mut self, vcf: u32) {
        self.vsn_class_flow = vcf.to_be_bytes();
    }

    pub fn version(&self) -> u8 {
        (self.vcf() >> 28) as u8
    }

    pub fn traffic_class(&self) -> u8 {
        (self.vcf() >> 20) as u8
    }

    pub fn dscp(&self) -> u8 {
        self.traffic_class() >> 2
    }

    pub fn ecn(&self) -> u8 {
        self.traffic_class() & 0x3
    }

    pub fn flow_label(&self) -> u32 {
        self.vcf() & IPV6_FLOW_LABEL_MAX
    }

    pub fn payload_len(&self) -> u16 {
        u16::from_be_bytes(self.payload_len)
    }

    pub fn src(&self) -> Ipv6Addr {
        Ipv6Addr::from(self.src)
    }

    pub fn dst(&self) -> Ipv6Addr {
        Ipv6Addr::from(self.dst)
    }

    pub fn set_traffic_class(&mut self, tc: u8) {
        let vcf = (self.vcf() & !(0xFF << 20)) | (u32::from(tc) << 20);
        self.set_vcf(vcf);
    }

    pub fn set_dscp(&mut self, dscp: u8) {
        self.set_traffic_class((dscp << 2) | self.ecn());
    }

    pub fn set_ecn(&mut self, ecn: u8) {
        self.set_traffic_class((self.traffic_class() & 0xFC) | (ecn & 0x3));
    }

    pub fn set_flow_label(&mut self, flow: u32) {
        let vcf = (self.vcf() & !IPV6_FLOW_LABEL_MAX)
            | (flow & IPV6_FLOW_LABEL_MAX);
        self.set_vcf(vcf);
    }

    pub fn set_payload_len(&mut self, len: u16) {
        self.payload_len = len.to_be_bytes();
    }
}

/// Build the IPv6 pseudo-header sum (RFC 8200 §8.1) for an
/// upper-layer protocol.
pub fn pseudo_csum(
    src: Ipv6Addr,
    dst: Ipv6Addr,
    next_hdr: u8,
    len: u32,
) -> Checksum {
    let mut csum = Checksum::new();
    csum.add_bytes(&src.bytes());
    csum.add_bytes(&dst.bytes());
    csum.add_bytes(&len.to_be_bytes());
    csum.add_bytes(&[0, 0, 0, next_hdr]);
    csum
}
