// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! SCTP common headers.

use super::headers::RawHeader;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::Unaligned;

pub const SCTP_CSUM_OFFSET: usize = 8;

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
pub struct SctpHdrRaw {
    pub src_port: [u8; 2],
    pub dst_port: [u8; 2],
    pub vtag: [u8; 4],
    pub csum: [u8; 4],
}

impl RawHeader for SctpHdrRaw {}

impl SctpHdrRaw {
    pub fn new_hdr(src_port: u16, dst_port: u16, vtag: u32) -> Self {
        Self {
            src_port: src_port.to_be_bytes(),
            dst_port: dst_port.to_be_bytes(),
            vtag: vtag.to_be_bytes(),
            csum: [0; 4],
        }
    }

    pub fn src_port(&self) -> u16 {
        u16::from_be_bytes(self.src_port)
    }

    pub fn dst_port(&self) -> u16 {
        u16::from_be_bytes(self.dst_port)
    }

    pub fn vtag(&self) -> u32 {
        u32::from_be_bytes(self.vtag)
    }
}
