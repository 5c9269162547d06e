// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! MPLS label stack entries.

use super::headers::RawHeader;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::Unaligned;

pub const MPLS_LABEL_MAX: u32 = 0xF_FFFF;

const LABEL_SHIFT: u32 = 12;
const TC_SHIFT: u32 = 9;
const BOS_BIT: u32 = 1 << 8;

/// A single 32-bit shim: label (20), traffic class (3), bottom of
/// stack (1), TTL (8).
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
pub struct MplsHdrRaw {
    pub shim: [u8; 4],
}

impl RawHeader for MplsHdrRaw {}

impl MplsHdrRaw {
    pub fn new_hdr(label: u32, tc: u8, bos: bool, ttl: u8) -> Self {
        let mut hdr = Self::default();
        hdr.set_label(label);
        hdr.set_tc(tc);
        hdr.set_bos(bos);
        hdr.set_ttl(ttl);
        hdr
    }

    fn shim(&self) -> u32 {
        u32::from_be_bytes(self.shim)
    }

    fn set_shim(&mut self, shim: u32) {
        self.shim = shim.to_be_bytes();
    }

    pub fn label(&self) -> u32 {
        self.shim() >> LABEL_SHIFT
    }

    pub fn tc(&self) -> u8 {
        ((self.shim() >> TC_SHIFT) & 0x7) as u8
    }

    pub fn bos(&self) -> bool {
        self.shim() & BOS_BIT != 0
    }

    pub fn ttl(&self) -> u8 {
        self.shim[3]
    }

    pub fn set_label(&mut self, label: u32) {
        let shim = (self.shim() & !(MPLS_LABEL_MAX << LABEL_SHIFT))
            | ((label & MPLS_LABEL_MAX) << LABEL_SHIFT);
        self.set_shim(shim);
    }

    pub fn set_tc(&mut self, tc: u8) {
        let shim = (self.shim() & !(0x7 << TC_SHIFT))
            | ((u32::from(tc) & 0x7) << TC_SHIFT);
        self.set_shim(shim);
    }

    pub fn set_bos(&mut self, bos: bool) {
        let shim = if bos {
            self.shim() | BOS_BIT
        } else {
            self.shim() & !BOS_BIT
        };
        self.set_shim(shim);
    }

    pub fn set_ttl(&mut self, ttl: u8) {
        self.shim[3] = ttl;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn shim_fields() {
        let hdr = MplsHdrRaw::new_hdr(100, 5, false, 64);
        #[rustfmt::skip]
        let expected = [
            // label 100 = 0x00064, tc 5, bos 0
            0x00, 0x06, 0x4A,
            // ttl
            0x40,
        ];
        assert_eq!(hdr.as_bytes(), &expected);
        assert_eq!(hdr.label(), 100);
        assert_eq!(hdr.tc(), 5);
        assert!(!hdr.bos());
        assert_eq!(hdr.ttl(), 64);

        let mut hdr = MplsHdrRaw::new_hdr(MPLS_LABEL_MAX, 7, true, 255);
        assert_eq!(hdr.shim, [0xFF; 4]);
        hdr.set_label(200);
        assert_eq!(hdr.label(), 200);
        assert_eq!(hdr.tc(), 7);
        assert!(hdr.bos());
    }
}
