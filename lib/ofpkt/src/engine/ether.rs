// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Ethernet frames.

use super::headers::RawHeader;
use crate::api::MacAddr;
use core::fmt;
use core::fmt::Debug;
use core::fmt::Display;
use serde::Deserialize;
use serde::Serialize;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::Unaligned;

pub const ETHER_TYPE_IPV4: u16 = 0x0800;
pub const ETHER_TYPE_ARP: u16 = 0x0806;
pub const ETHER_TYPE_VLAN: u16 = 0x8100;
pub const ETHER_TYPE_IPV6: u16 = 0x86DD;
pub const ETHER_TYPE_MPLS: u16 = 0x8847;
pub const ETHER_TYPE_MPLS_MCAST: u16 = 0x8848;
pub const ETHER_TYPE_PPPOE_DISC: u16 = 0x8863;
pub const ETHER_TYPE_PPPOE_SESS: u16 = 0x8864;
pub const ETHER_TYPE_QINQ: u16 = 0x88A8;
pub const ETHER_TYPE_ITAG: u16 = 0x88E7;

pub const ETHER_ADDR_LEN: usize = 6;

#[derive(
    Clone, Copy, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub enum EtherType {
    Ipv4,
    Arp,
    Vlan,
    Ipv6,
    Mpls,
    MplsMcast,
    PppoeDisc,
    PppoeSess,
    QinQ,
    ITag,
    Unknown(u16),
}

impl EtherType {
    /// Is this one of the VLAN tag types (C-tag, S-tag or I-tag)?
    pub fn is_vlan(self) -> bool {
        matches!(self, Self::Vlan | Self::QinQ | Self::ITag)
    }

    pub fn is_mpls(self) -> bool {
        matches!(self, Self::Mpls | Self::MplsMcast)
    }

    pub fn is_pppoe(self) -> bool {
        matches!(self, Self::PppoeDisc | Self::PppoeSess)
    }
}

impl From<u16> for EtherType {
    fn from(raw: u16) -> Self {
        match raw {
            ETHER_TYPE_IPV4 => Self::Ipv4,
            ETHER_TYPE_ARP => Self::Arp,
            ETHER_TYPE_VLAN => Self::Vlan,
            ETHER_TYPE_IPV6 => Self::Ipv6,
            ETHER_TYPE_MPLS => Self::Mpls,
            ETHER_TYPE_MPLS_MCAST => Self::MplsMcast,
            ETHER_TYPE_PPPOE_DISC => Self::PppoeDisc,
            ETHER_TYPE_PPPOE_SESS => Self::PppoeSess,
            ETHER_TYPE_QINQ => Self::QinQ,
            ETHER_TYPE_ITAG => Self::ITag,
            _ => Self::Unknown(raw),
        }
    }
}

impl From<EtherType> for u16 {
    fn from(et: EtherType) -> Self {
        use EtherType::*;

        match et {
            Ipv4 => ETHER_TYPE_IPV4,
            Arp => ETHER_TYPE_ARP,
            Vlan => ETHER_TYPE_VLAN,
            Ipv6 => ETHER_TYPE_IPV6,
            Mpls => ETHER_TYPE_MPLS,
            MplsMcast => ETHER_TYPE_MPLS_MCAST,
            PppoeDisc => ETHER_TYPE_PPPOE_DISC,
            PppoeSess => ETHER_TYPE_PPPOE_SESS,
            QinQ => ETHER_TYPE_QINQ,
            ITag => ETHER_TYPE_ITAG,
            Unknown(val) => val,
        }
    }
}

impl Display for EtherType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:04X}", u16::from(*self))
    }
}

/// We are never really interested in internal representation of
/// [`EtherType`].
impl Debug for EtherType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self}")
    }
}

/// Note: For now we keep this unaligned to be safe.
#[repr(C)]
#[derive(
    Clone, Copy, Debug, FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
)]
pub struct EtherHdrRaw {
    pub dst: [u8; ETHER_ADDR_LEN],
    pub src: [u8; ETHER_ADDR_LEN],
    pub ether_type: [u8; 2],
}

impl RawHeader for EtherHdrRaw {}

impl EtherHdrRaw {
    pub fn new_hdr(dst: MacAddr, src: MacAddr, ether_type: u16) -> Self {
        Self {
            dst: dst.bytes(),
            src: src.bytes(),
            ether_type: ether_type.to_be_bytes(),
        }
    }

    pub fn dst(&self) -> MacAddr {
        MacAddr::from(self.dst)
    }

    pub fn src(&self) -> MacAddr {
        MacAddr::from(self.src)
    }

    pub fn ether_type(&self) -> u16 {
        u16::from_be_bytes(self.ether_type)
    }

    pub fn set_dst(&mut self, mac: MacAddr) {
        self.dst = mac.bytes();
    }

    pub fn set_src(&mut self, mac: MacAddr) {
        self.src = mac.bytes();
    }

    pub fn set_ether_type(&mut self, ether_type: u16) {
        self.ether_type = ether_type.to_be_bytes();
    }
}
