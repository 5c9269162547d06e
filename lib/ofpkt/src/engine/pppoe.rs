// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! PPP over Ethernet (RFC 2516).

use super::headers::HdrError;
use super::headers::RawHeader;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::Unaligned;

pub const PPPOE_VERSION: u8 = 1;
pub const PPPOE_TYPE: u8 = 1;

pub const PPPOE_CODE_SESSION: u8 = 0x00;
pub const PPPOE_CODE_PADO: u8 = 0x07;
pub const PPPOE_CODE_PADI: u8 = 0x09;
pub const PPPOE_CODE_PADR: u8 = 0x19;
pub const PPPOE_CODE_PADS: u8 = 0x65;
pub const PPPOE_CODE_PADT: u8 = 0xA7;

#[repr(C)]
#[derive(
    Clone, Copy, Debug, FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
)]
pub struct PppoeHdrRaw {
    pub ver_type: u8,
    pub code: u8,
    pub sid: [u8; 2],
    pub length: [u8; 2],
}

impl RawHeader for PppoeHdrRaw {}

impl Default for PppoeHdrRaw {
    fn default() -> Self {
        Self {
            ver_type: (PPPOE_VERSION << 4) | PPPOE_TYPE,
            code: PPPOE_CODE_SESSION,
            sid: [0; 2],
            length: [0; 2],
        }
    }
}

impl PppoeHdrRaw {
    pub fn new_hdr(code: u8, sid: u16, length: u16) -> Self {
        Self {
            code,
            sid: sid.to_be_bytes(),
            length: length.to_be_bytes(),
            ..Default::default()
        }
    }

    /// View a PPPoE header, rejecting any version we don't speak.
    pub fn parse(src: &[u8]) -> Result<&Self, HdrError> {
        let hdr = Self::new(src)?;
        if hdr.version() != PPPOE_VERSION {
            return Err(HdrError::BadVersion { version: hdr.version() });
        }
        Ok(hdr)
    }

    pub fn version(&self) -> u8 {
        self.ver_type >> 4
    }

    pub fn ptype(&self) -> u8 {
        self.ver_type & 0x0F
    }

    pub fn sid(&self) -> u16 {
        u16::from_be_bytes(self.sid)
    }

    /// Length of the PPPoE payload, excluding this header.
    pub fn length(&self) -> u16 {
        u16::from_be_bytes(self.length)
    }

    pub fn set_ptype(&mut self, ptype: u8) {
        self.ver_type = (self.ver_type & 0xF0) | (ptype & 0x0F);
    }

    pub fn set_sid(&mut self, sid: u16) {
        self.sid = sid.to_be_bytes();
    }

    pub fn set_length(&mut self, len: u16) {
        self.length = len.to_be_bytes();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_version() {
        #[rustfmt::skip]
        let mut bytes = [
            // ver/type, code
            0x11, 0x09,
            // session id
            0x00, 0x00,
            // length
            0x00, 0x04,
        ];
        let hdr = PppoeHdrRaw::parse(&bytes).unwrap();
        assert_eq!(hdr.code, PPPOE_CODE_PADI);
        assert_eq!(hdr.length(), 4);
        assert_eq!(hdr.ptype(), PPPOE_TYPE);

        bytes[0] = 0x21;
        assert_eq!(
            PppoeHdrRaw::parse(&bytes).unwrap_err(),
            HdrError::BadVersion { version: 2 }
        );
    }
}
