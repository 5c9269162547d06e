// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! TCP headers. Options are covered by the data offset but not
//! interpreted.

use super::headers::HdrError;
use super::headers::RawHeader;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::Unaligned;

pub const TCP_HDR_LEN_MIN: usize = 20;
pub const TCP_CSUM_OFFSET: usize = 16;

#[allow(non_snake_case)]
pub mod TcpFlags {
    pub const FIN: u8 = crate::bit_on(0);
    pub const SYN: u8 = crate::bit_on(1);
    pub const RST: u8 = crate::bit_on(2);
    pub const PSH: u8 = crate::bit_on(3);
    pub const ACK: u8 = crate::bit_on(4);
    pub const URG: u8 = crate::bit_on(5);
    pub const ECE: u8 = crate::bit_on(6);
    pub const CWR: u8 = crate::bit_on(7);
}

/// Note: For now we keep this unaligned to be safe.
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
pub struct TcpHdrRaw {
    pub src_port: [u8; 2],
    pub dst_port: [u8; 2],
    pub seq: [u8; 4],
    pub ack: [u8; 4],
    pub offset: u8,
    pub flags: u8,
    pub win: [u8; 2],
    pub csum: [u8; 2],
    pub urg: [u8; 2],
}

impl RawHeader for TcpHdrRaw {}

impl TcpHdrRaw {
    pub fn new_hdr(src_port: u16, dst_port: u16, seq: u32, flags: u8) -> Self {
        Self {
            src_port: src_port.to_be_bytes(),
            dst_port: dst_port.to_be_bytes(),
            seq: seq.to_be_bytes(),
            offset: 0x50,
            flags,
            win: 64240u16.to_be_bytes(),
            ..Default::default()
        }
    }

    /// View a TCP header, checking that the data offset is sane. The
    /// options need not all be present in `src`.
    pub fn parse(src: &[u8]) -> Result<&Self, HdrError> {
        let hdr = Self::new(src)?;
        let hdr_len = hdr.hdr_len();
        if hdr_len < TCP_HDR_LEN_MIN {
            return Err(HdrError::BadHeaderLength { len: hdr_len });
        }
        Ok(hdr)
    }

    pub fn src_port(&self) -> u16 {
        u16::from_be_bytes(self.src_port)
    }

    pub fn dst_port(&self) -> u16 {
        u16::from_be_bytes(self.dst_port)
    }

    pub fn seq(&self) -> u32 {
        u32::from_be_bytes(self.seq)
    }

    /// Header length in bytes, including options.
    pub fn hdr_len(&self) -> usize {
        usize::from(self.offset >> 4) * 4
    }
}
