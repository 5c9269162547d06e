// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! PPP protocol field as carried in a PPPoE session.

use super::ether::ETHER_TYPE_IPV4;
use super::ether::ETHER_TYPE_IPV6;
use super::headers::RawHeader;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::Unaligned;

pub const PPP_PROT_IPV4: u16 = 0x0021;
pub const PPP_PROT_IPV6: u16 = 0x0057;

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
pub struct PppHdrRaw {
    pub protocol: [u8; 2],
}

impl RawHeader for PppHdrRaw {}

impl PppHdrRaw {
    pub fn new_hdr(protocol: u16) -> Self {
        Self { protocol: protocol.to_be_bytes() }
    }

    pub fn protocol(&self) -> u16 {
        u16::from_be_bytes(self.protocol)
    }

    pub fn set_protocol(&mut self, protocol: u16) {
        self.protocol = protocol.to_be_bytes();
    }
}

/// Map an ethertype to the PPP protocol that carries it.
pub fn ppp_protocol_for(ether_type: u16) -> Option<u16> {
    match ether_type {
        ETHER_TYPE_IPV4 => Some(PPP_PROT_IPV4),
        ETHER_TYPE_IPV6 => Some(PPP_PROT_IPV6),
        _ => None,
    }
}

/// Map a PPP protocol to the equivalent ethertype.
pub fn ether_type_for(protocol: u16) -> Option<u16> {
    match protocol {
        PPP_PROT_IPV4 => Some(ETHER_TYPE_IPV4),
        PPP_PROT_IPV6 => Some(ETHER_TYPE_IPV6),
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn protocol_mapping() {
        assert_eq!(ppp_protocol_for(ETHER_TYPE_IPV6), Some(PPP_PROT_IPV6));
        assert_eq!(ether_type_for(PPP_PROT_IPV4), Some(ETHER_TYPE_IPV4));
        assert_eq!(ppp_protocol_for(0x0806), None);
        assert_eq!(PppHdrRaw::new_hdr(0xC021).as_bytes(), &[0xC0, 0x21]);
    }
}
