// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Checksum calculation.
//!
//! The Internet checksum is the one's complement of the one's
//! complement sum of the 16-bit words of the data. That sum has the
//! property of being byte order independent: summing the words in
//! native order and storing the result in native order yields the same
//! bytes as doing both in network order. We lean on that here, reading
//! words with `from_ne_bytes` and writing the result with
//! `to_ne_bytes`, which saves a swap per word on little-endian hosts.
//!
//! Checksums are never recomputed as a side effect of a field write.
//! Writers record what they invalidated in a [`DirtyChecksums`] set and
//! [`ChecksumEngine::recompute`] settles all of it in one pass.

use super::frame::FrameChain;
use super::frame::FrameKind;
use super::frame::Span;
use super::ip4;
use super::ip6;
use super::pppoe::PPPOE_CODE_SESSION;
use super::sctp::SCTP_CSUM_OFFSET;
use super::tcp::TCP_CSUM_OFFSET;
use super::udp::UDP_CSUM_OFFSET;
use crate::api::Ipv4Addr;
use crate::api::Ipv6Addr;
use bitflags::bitflags;
use crc::CRC_32_ISCSI;
use crc::Crc;

/// The checksum values, as it is contained in a network header.
///
/// This holds the bytes as they are stored in the header itself, that
/// is, with one's complement applied.
pub struct HeaderChecksum {
    inner: [u8; 2],
}

impl HeaderChecksum {
    /// Return the bytes of this header checksum.
    pub fn bytes(&self) -> [u8; 2] {
        self.inner
    }
}

impl From<Checksum> for HeaderChecksum {
    fn from(mut csum: Checksum) -> HeaderChecksum {
        Self { inner: (!csum.finalize()).to_ne_bytes() }
    }
}

/// A rolling one's complement sum.
///
/// Carries are accumulated in the upper half and only folded back in
/// when the sum is finalized.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Checksum {
    inner: u32,
}

impl Checksum {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the contents of `bytes` to the sum.
    ///
    /// A trailing odd byte is treated as if padded with a zero, so
    /// only the final call for a given range may pass an odd length.
    pub fn add_bytes(&mut self, bytes: &[u8]) {
        self.inner = csum_add(self.inner, bytes);
    }

    /// Create a new rolling checksum, starting with `bytes`.
    pub fn compute(bytes: &[u8]) -> Self {
        Self { inner: csum_add(0, bytes) }
    }

    /// Fold the carries back in and return the 16-bit sum.
    pub fn finalize(&mut self) -> u16 {
        while (self.inner >> 16) != 0 {
            self.inner = (self.inner >> 16) + (self.inner & 0xFFFF);
        }

        (self.inner & 0xFFFF) as u16
    }
}

fn fold(csum: u32) -> u32 {
    (csum >> 16) + (csum & 0xFFFF)
}

fn csum_add(mut csum: u32, bytes: &[u8]) -> u32 {
    let mut words = bytes.chunks_exact(2);
    for w in &mut words {
        csum = fold(csum) + u32::from(u16::from_ne_bytes([w[0], w[1]]));
    }

    if let [b] = words.remainder() {
        csum = fold(csum) + u32::from(u16::from_ne_bytes([*b, 0]));
    }

    csum
}

const CASTAGNOLI: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);

/// CRC32c (Castagnoli), as used by SCTP.
pub fn crc32c(bytes: &[u8]) -> u32 {
    CASTAGNOLI.checksum(bytes)
}

bitflags! {
    /// The checksums (and length fields) invalidated by edits made
    /// since the last recompute.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct DirtyChecksums: u8 {
        const IPV4 = 1 << 0;
        const ICMPV4 = 1 << 1;
        const ICMPV6 = 1 << 2;
        const UDP = 1 << 3;
        const TCP = 1 << 4;
        const SCTP = 1 << 5;
        const PPPOE_LEN = 1 << 6;
    }
}

/// The network header an upper-layer checksum is computed against.
///
/// `proto` is the protocol byte as it currently stands in the IP
/// header, which need not match the transport that follows it.
#[derive(Clone, Copy, Debug)]
enum Pseudo {
    V4 { src: Ipv4Addr, dst: Ipv4Addr, proto: u8 },
    V6 { src: Ipv6Addr, dst: Ipv6Addr, proto: u8 },
}

impl Pseudo {
    fn csum(&self, len: usize) -> Checksum {
        match *self {
            Self::V4 { src, dst, proto } => {
                ip4::pseudo_csum(src, dst, proto, len as u16)
            }
            Self::V6 { src, dst, proto } => {
                ip6::pseudo_csum(src, dst, proto, len as u32)
            }
        }
    }
}

pub struct ChecksumEngine;

impl ChecksumEngine {
    /// Recompute everything named in `dirty`, in the order IPv4
    /// header, ICMPv4, ICMPv6, UDP, TCP, SCTP, then PPPoE session
    /// length.
    ///
    /// Every node of a dirty kind is rewritten. A transport node that
    /// has no enclosing IP header is left alone.
    pub fn recompute(
        frame: &mut [u8],
        chain: &FrameChain,
        dirty: DirtyChecksums,
    ) {
        if dirty.contains(DirtyChecksums::IPV4) {
            for span in spans_of(chain, FrameKind::Ipv4) {
                let hdr = &mut frame[span.offset..span.end()];
                hdr[10..12].fill(0);
                let csum = ip4::compute_hdr_csum(hdr);
                hdr[10..12].copy_from_slice(&csum);
            }
        }

        if dirty.contains(DirtyChecksums::ICMPV4) {
            for idx in indices_of(chain, FrameKind::Icmpv4) {
                if let Some((_, end)) = enclosing_ip(frame, chain, idx) {
                    let start = chain.nodes()[idx].span().offset;
                    let msg = &mut frame[start..end];
                    msg[2..4].fill(0);
                    let csum = HeaderChecksum::from(Checksum::compute(msg));
                    msg[2..4].copy_from_slice(&csum.bytes());
                }
            }
        }

        if dirty.contains(DirtyChecksums::ICMPV6) {
            Self::ulp_csum(frame, chain, FrameKind::Icmpv6, 2);
        }

        if dirty.contains(DirtyChecksums::UDP) {
            Self::ulp_csum(frame, chain, FrameKind::Udp, UDP_CSUM_OFFSET);
        }

        if dirty.contains(DirtyChecksums::TCP) {
            Self::ulp_csum(frame, chain, FrameKind::Tcp, TCP_CSUM_OFFSET);
        }

        if dirty.contains(DirtyChecksums::SCTP) {
            for idx in indices_of(chain, FrameKind::Sctp) {
                if let Some((_, end)) = enclosing_ip(frame, chain, idx) {
                    let start = chain.nodes()[idx].span().offset;
                    let pkt = &mut frame[start..end];
                    let csum = SCTP_CSUM_OFFSET..SCTP_CSUM_OFFSET + 4;
                    pkt[csum.clone()].fill(0);
                    let crc = crc32c(pkt);
                    pkt[csum].copy_from_slice(&crc.to_le_bytes());
                }
            }
        }

        if dirty.contains(DirtyChecksums::PPPOE_LEN) {
            let frame_len = frame.len();
            for span in spans_of(chain, FrameKind::Pppoe) {
                let hdr = &mut frame[span.offset..span.end()];
                if hdr[1] != PPPOE_CODE_SESSION {
                    continue;
                }
                let len = frame_len.saturating_sub(span.offset + 6);
                let len = u16::try_from(len).unwrap_or(u16::MAX);
                hdr[4..6].copy_from_slice(&len.to_be_bytes());
            }
        }
    }

    /// Recompute a pseudo-header checksum for every node of `kind`.
    fn ulp_csum(
        frame: &mut [u8],
        chain: &FrameChain,
        kind: FrameKind,
        csum_off: usize,
    ) {
        for idx in indices_of(chain, kind) {
            let Some((pseudo, end)) = enclosing_ip(frame, chain, idx) else {
                continue;
            };

            let start = chain.nodes()[idx].span().offset;
            let ulp = &mut frame[start..end];
            if ulp.len() < csum_off + 2 {
                continue;
            }

            ulp[csum_off..csum_off + 2].fill(0);
            let mut csum = pseudo.csum(ulp.len());
            csum.add_bytes(ulp);
            let mut hc = HeaderChecksum::from(csum).bytes();

            // A computed zero is sent as all ones; zero on the wire
            // means "no checksum" for UDP.
            if kind == FrameKind::Udp && hc == [0, 0] {
                hc = [0xFF, 0xFF];
            }
            ulp[csum_off..csum_off + 2].copy_from_slice(&hc);
        }
    }
}

fn indices_of(
    chain: &FrameChain,
    kind: FrameKind,
) -> impl Iterator<Item = usize> + '_ {
    chain
        .nodes()
        .iter()
        .enumerate()
        .filter(move |(_, n)| n.kind() == kind)
        .map(|(i, _)| i)
}

fn spans_of(
    chain: &FrameChain,
    kind: FrameKind,
) -> impl Iterator<Item = Span> + '_ {
    chain.nodes().iter().filter(move |n| n.kind() == kind).map(|n| n.span())
}

/// Find the IP header enclosing node `idx` and return its pseudo-header
/// (addresses and protocol byte) along with the frame offset at which
/// its payload ends.
///
/// The payload end is taken from the IP length field, clamped to the
/// bytes actually present.
fn enclosing_ip(
    frame: &[u8],
    chain: &FrameChain,
    idx: usize,
) -> Option<(Pseudo, usize)> {
    // Only the IP header directly in front of the transport counts.
    let ip = chain.nodes().get(idx.checked_sub(1)?)?;
    if !matches!(ip.kind(), FrameKind::Ipv4 | FrameKind::Ipv6) {
        return None;
    }

    let span = ip.span();
    let hdr = &frame[span.offset..span.end()];
    let (pseudo, end) = match ip.kind() {
        FrameKind::Ipv4 => {
            let src = Ipv4Addr::from([hdr[12], hdr[13], hdr[14], hdr[15]]);
            let dst = Ipv4Addr::from([hdr[16], hdr[17], hdr[18], hdr[19]]);
            let proto = hdr[9];
            let total = usize::from(u16::from_be_bytes([hdr[2], hdr[3]]));
            (Pseudo::V4 { src, dst, proto }, span.offset + total.max(span.len))
        }

        _ => {
            let mut src = [0u8; 16];
            let mut dst = [0u8; 16];
            src.copy_from_slice(&hdr[8..24]);
            dst.copy_from_slice(&hdr[24..40]);
            let proto = hdr[6];
            let payload = usize::from(u16::from_be_bytes([hdr[4], hdr[5]]));
            (
                Pseudo::V6 { src: src.into(), dst: dst.into(), proto },
                span.end() + payload,
            )
        }
    };

    // Never cut into the node itself.
    let end = end.min(frame.len()).max(chain.nodes()[idx].span().end());
    Some((pseudo, end))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn odd_length_pads_with_zero() {
        let mut even = Checksum::compute(&[0x12, 0x34, 0x56, 0x00]);
        let mut odd = Checksum::compute(&[0x12, 0x34, 0x56]);
        assert_eq!(even.finalize(), odd.finalize());
        assert_eq!(
            HeaderChecksum::from(Checksum::compute(&[0x12, 0x34, 0x56]))
                .bytes(),
            // !(0x1234 + 0x5600) = !0x6834
            [0x97, 0xCB]
        );
    }

    #[test]
    fn crc32c_check_value() {
        assert_eq!(crc32c(b"123456789"), 0xE306_9283);
        assert_eq!(crc32c(&[]), 0);
    }
}
