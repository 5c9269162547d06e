// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! 802.1Q / 802.1ad VLAN tags.

use super::headers::RawHeader;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::Unaligned;

pub const VLAN_VID_MASK: u16 = 0x0FFF;
pub const VLAN_PCP_SHIFT: u16 = 13;
pub const VLAN_DEI_BIT: u16 = 1 << 12;

/// A VLAN tag as it follows the ethertype that announced it: the tag
/// control information and the type of the payload it wraps.
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
pub struct VlanHdrRaw {
    pub tci: [u8; 2],
    pub ether_type: [u8; 2],
}

impl RawHeader for VlanHdrRaw {}

impl VlanHdrRaw {
    pub fn new_hdr(pcp: u8, vid: u16, ether_type: u16) -> Self {
        let mut hdr = Self::default();
        hdr.set_pcp(pcp);
        hdr.set_vid(vid);
        hdr.set_ether_type(ether_type);
        hdr
    }

    fn tci(&self) -> u16 {
        u16::from_be_bytes(self.tci)
    }

    pub fn pcp(&self) -> u8 {
        (self.tci() >> VLAN_PCP_SHIFT) as u8
    }

    pub fn dei(&self) -> bool {
        self.tci() & VLAN_DEI_BIT != 0
    }

    pub fn vid(&self) -> u16 {
        self.tci() & VLAN_VID_MASK
    }

    pub fn ether_type(&self) -> u16 {
        u16::from_be_bytes(self.ether_type)
    }

    pub fn set_pcp(&mut self, pcp: u8) {
        let tci = (self.tci() & !(0x7 << VLAN_PCP_SHIFT))
            | ((u16::from(pcp) & 0x7) << VLAN_PCP_SHIFT);
        self.tci = tci.to_be_bytes();
    }

    pub fn set_vid(&mut self, vid: u16) {
        let tci = (self.tci() & !VLAN_VID_MASK) | (vid & VLAN_VID_MASK);
        self.tci = tci.to_be_bytes();
    }

    pub fn set_ether_type(&mut self, ether_type: u16) {
        self.ether_type = ether_type.to_be_bytes();
    }
}
