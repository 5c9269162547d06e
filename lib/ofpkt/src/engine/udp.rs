// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! UDP headers.

use super::headers::RawHeader;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::Unaligned;

pub const UDP_CSUM_OFFSET: usize = 6;

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
pub struct UdpHdrRaw {
    pub src_port: [u8; 2],
    pub dst_port: [u8; 2],
    pub length: [u8; 2],
    pub csum: [u8; 2],
}

impl RawHeader for UdpHdrRaw {}

impl UdpHdrRaw {
    pub fn new_hdr(src_port: u16, dst_port: u16, length: u16) -> Self {
        Self {
            src_port: src_port.to_be_bytes(),
            dst_port: dst_port.to_be_bytes(),
            length: length.to_be_bytes(),
            csum: [0; 2],
        }
    }

    pub fn src_port(&self) -> u16 {
        u16::from_be_bytes(self.src_port)
    }

    pub fn dst_port(&self) -> u16 {
        u16::from_be_bytes(self.dst_port)
    }

    pub fn length(&self) -> u16 {
        u16::from_be_bytes(self.length)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn emit() {
        let udp = UdpHdrRaw::new_hdr(5353, 5353, 8);
        let mut bytes = [0u8; 8];
        udp.emit(&mut bytes);
        assert_eq!(bytes, [0x14, 0xE9, 0x14, 0xE9, 0x00, 0x08, 0x00, 0x00]);
        assert_eq!(UdpHdrRaw::new(&bytes).unwrap().src_port(), 5353);
    }
}
