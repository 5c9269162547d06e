// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! ARP for IPv4 over Ethernet.

use super::ether::ETHER_TYPE_IPV4;
use super::headers::HdrError;
use super::headers::RawHeader;
use crate::api::Ipv4Addr;
use crate::api::MacAddr;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::Unaligned;

pub const ARP_HTYPE_ETHERNET: u16 = 1;
pub const ARP_OP_REQUEST: u16 = 1;
pub const ARP_OP_REPLY: u16 = 2;

#[repr(C)]
#[derive(
    Clone, Copy, Debug, FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
)]
pub struct ArpEthIpv4Raw {
    pub htype: [u8; 2],
    pub ptype: [u8; 2],
    pub hlen: u8,
    pub plen: u8,
    pub op: [u8; 2],
    pub sha: [u8; 6],
    pub spa: [u8; 4],
    pub tha: [u8; 6],
    pub tpa: [u8; 4],
}

impl RawHeader for ArpEthIpv4Raw {}

impl ArpEthIpv4Raw {
    pub fn new_hdr(
        op: u16,
        sha: MacAddr,
        spa: Ipv4Addr,
        tha: MacAddr,
        tpa: Ipv4Addr,
    ) -> Self {
        Self {
            htype: ARP_HTYPE_ETHERNET.to_be_bytes(),
            ptype: ETHER_TYPE_IPV4.to_be_bytes(),
            hlen: 6,
            plen: 4,
            op: op.to_be_bytes(),
            sha: sha.bytes(),
            spa: spa.bytes(),
            tha: tha.bytes(),
            tpa: tpa.bytes(),
        }
    }

    /// View an ARP packet, accepting only the Ethernet/IPv4 form.
    pub fn parse(src: &[u8]) -> Result<&Self, HdrError> {
        let arp = Self::new(src)?;
        if u16::from_be_bytes(arp.htype) != ARP_HTYPE_ETHERNET
            || u16::from_be_bytes(arp.ptype) != ETHER_TYPE_IPV4
            || arp.hlen != 6
            || arp.plen != 4
        {
            return Err(HdrError::BadAddressFormat);
        }
        Ok(arp)
    }

    pub fn op(&self) -> u16 {
        u16::from_be_bytes(self.op)
    }

    pub fn sha(&self) -> MacAddr {
        MacAddr::from(self.sha)
    }

    pub fn spa(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.spa)
    }

    pub fn tha(&self) -> MacAddr {
        MacAddr::from(self.tha)
    }

    pub fn tpa(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.tpa)
    }
}
