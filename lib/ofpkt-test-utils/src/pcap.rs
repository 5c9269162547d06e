// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Routines for building and reading packet capture files.

use ofpkt::engine::Packet;
use pcap_parser::Linktype;
use pcap_parser::ToVec;
use pcap_parser::pcap;
use pcap_parser::pcap::LegacyPcapBlock;
use pcap_parser::pcap::PcapHeader;
use std::fs::File;
use std::io::Write;

fn get_header(offset: &[u8]) -> (&[u8], PcapHeader) {
    match pcap::parse_pcap_header(offset) {
        Ok((new_offset, header)) => (new_offset, header),
        Err(e) => panic!("failed to get header: {e:?}"),
    }
}

fn next_block(offset: &[u8]) -> (&[u8], LegacyPcapBlock<'_>) {
    match pcap::parse_pcap_frame(offset) {
        Ok((new_offset, block)) => {
            // We always want access to the entire packet.
            assert_eq!(block.origlen, block.caplen);
            (new_offset, block)
        }

        Err(e) => panic!("failed to get next block: {e:?}"),
    }
}

/// Read every frame out of a capture held in memory.
pub fn frames(capture: &[u8]) -> Vec<Vec<u8>> {
    let (mut rest, _hdr) = get_header(capture);
    let mut frames = vec![];
    while !rest.is_empty() {
        let (next, block) = next_block(rest);
        frames.push(block.data.to_vec());
        rest = next;
    }
    frames
}

/// Build a packet capture file from a series of packets.
pub struct PcapBuilder {
    file: File,
}

impl PcapBuilder {
    /// Create a new pcap builder, writing all captures to `path`.
    pub fn new(path: &str) -> Self {
        let mut file = File::create(path).unwrap();
        file.write_all(&header_bytes()).unwrap();
        Self { file }
    }

    /// Add a packet to the capture.
    pub fn add_pkt(&mut self, pkt: &Packet) {
        self.add_frame(pkt.bytes());
    }

    /// Add raw frame bytes to the capture.
    pub fn add_frame(&mut self, bytes: &[u8]) {
        self.file.write_all(&block_bytes(bytes)).unwrap();
    }
}

fn header_bytes() -> Vec<u8> {
    let mut hdr = PcapHeader {
        magic_number: 0xa1b2c3d4,
        version_major: 2,
        version_minor: 4,
        thiszone: 0,
        sigfigs: 0,
        snaplen: 1500,
        network: Linktype::ETHERNET,
    };

    hdr.to_vec().unwrap()
}

fn block_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut block = LegacyPcapBlock {
        ts_sec: 7777,
        ts_usec: 7777,
        caplen: bytes.len() as u32,
        origlen: bytes.len() as u32,
        data: bytes,
    };

    block.to_vec().unwrap()
}

/// Serialize `frames` as an in-memory capture.
pub fn capture(frames: &[&[u8]]) -> Vec<u8> {
    let mut out = header_bytes();
    for frame in frames {
        out.extend_from_slice(&block_bytes(frame));
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn capture_then_read() {
        let a = crate::tcp4_frame();
        let b = crate::mpls_frame();
        let cap = capture(&[&a, &b]);
        assert_eq!(frames(&cap), vec![a, b]);
    }
}
