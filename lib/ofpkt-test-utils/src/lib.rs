// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Common routines for integration tests.

// This type of pedantry is more trouble than it's worth here.
#![allow(dead_code)]

pub mod pcap;

// Let's make our lives easier and pub use a bunch of stuff.
pub use ofpkt::api::Action;
pub use ofpkt::api::EncapKind;
pub use ofpkt::api::FieldId;
pub use ofpkt::api::FieldMatch;
pub use ofpkt::api::FieldValue;
pub use ofpkt::api::Hits;
pub use ofpkt::api::Ipv4Addr;
pub use ofpkt::api::Ipv6Addr;
pub use ofpkt::api::MacAddr;
pub use ofpkt::api::MatchSpec;
pub use ofpkt::api::PROTO_ICMP;
pub use ofpkt::api::PROTO_ICMPV6;
pub use ofpkt::api::PROTO_SCTP;
pub use ofpkt::api::PROTO_TCP;
pub use ofpkt::api::PROTO_UDP;
pub use ofpkt::config::PacketConfig;
pub use ofpkt::engine::FrameKind;
pub use ofpkt::engine::InvalidOp;
pub use ofpkt::engine::Missing;
pub use ofpkt::engine::Packet;
pub use ofpkt::engine::PacketError;
pub use ofpkt::engine::ether::*;
pub use ofpkt::engine::ppp::*;
pub use ofpkt::engine::pppoe::*;
pub use ofpkt::engine::tcp::TcpFlags;

use ofpkt::engine::arp::ArpEthIpv4Raw;
use ofpkt::engine::checksum::crc32c;
use ofpkt::engine::headers::RawHeader;
use ofpkt::engine::icmp::ICMPV6_NEIGHBOR_ADVERT;
use ofpkt::engine::icmp::ICMPV6_NEIGHBOR_SOLICIT;
use ofpkt::engine::icmp::IcmpHdrRaw;
use ofpkt::engine::icmp::ND_OPT_SOURCE_LLADDR;
use ofpkt::engine::icmp::ND_OPT_TARGET_LLADDR;
use ofpkt::engine::ip4::Ipv4HdrRaw;
use ofpkt::engine::ip6::Ipv6HdrRaw;
use ofpkt::engine::mpls::MplsHdrRaw;
use ofpkt::engine::sctp::SCTP_CSUM_OFFSET;
use ofpkt::engine::sctp::SctpHdrRaw;
use ofpkt::engine::tcp::TcpHdrRaw;
use ofpkt::engine::udp::UdpHdrRaw;
use ofpkt::engine::vlan::VlanHdrRaw;
use smoltcp::wire::Icmpv4Packet;
use smoltcp::wire::Icmpv6Packet;
use smoltcp::wire::IpAddress;
use smoltcp::wire::Ipv4Packet;
use smoltcp::wire::TcpPacket;
use smoltcp::wire::UdpPacket;

pub const SRC_MAC: MacAddr = MacAddr::from_const([0xA8, 0x40, 0x25, 0, 0, 1]);
pub const DST_MAC: MacAddr = MacAddr::from_const([0xA8, 0x40, 0x25, 0, 0, 2]);

pub fn ip4(s: &str) -> Ipv4Addr {
    s.parse().unwrap()
}

pub fn ip6(s: &str) -> Ipv6Addr {
    s.parse().unwrap()
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Hdr {
    Ether,
    Vlan,
    Mpls,
    Pppoe,
    Ppp,
    Arp,
    Ipv4,
    Ipv6,
    Icmpv4,
    Icmpv6,
    Udp,
    Tcp,
    Sctp,
    Payload,
}

/// Build a frame one header at a time, outermost first.
///
/// [`FrameBuilder::build`] fills in every length field and every
/// checksum, using smoltcp for the IP family so the engine is checked
/// against an independent implementation.
#[derive(Clone, Debug, Default)]
pub struct FrameBuilder {
    bytes: Vec<u8>,
    hdrs: Vec<(Hdr, usize)>,
}

impl FrameBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn put<H: RawHeader>(&mut self, kind: Hdr, hdr: &H) {
        let off = self.bytes.len();
        self.bytes.resize(off + H::SIZE, 0);
        hdr.emit(&mut self.bytes[off..]);
        self.hdrs.push((kind, off));
    }

    pub fn ether(mut self, ether_type: u16) -> Self {
        let eth = EtherHdrRaw::new_hdr(DST_MAC, SRC_MAC, ether_type);
        self.put(Hdr::Ether, &eth);
        self
    }

    pub fn vlan(mut self, pcp: u8, vid: u16, ether_type: u16) -> Self {
        self.put(Hdr::Vlan, &VlanHdrRaw::new_hdr(pcp, vid, ether_type));
        self
    }

    pub fn mpls(mut self, label: u32, bos: bool, ttl: u8) -> Self {
        self.put(Hdr::Mpls, &MplsHdrRaw::new_hdr(label, 0, bos, ttl));
        self
    }

    /// A PPPoE header; the length is filled in by `build()`.
    pub fn pppoe(mut self, code: u8, sid: u16) -> Self {
        self.put(Hdr::Pppoe, &PppoeHdrRaw::new_hdr(code, sid, 0));
        self
    }

    pub fn ppp(mut self, protocol: u16) -> Self {
        self.put(Hdr::Ppp, &PppHdrRaw::new_hdr(protocol));
        self
    }

    pub fn arp(mut self, op: u16, spa: Ipv4Addr, tpa: Ipv4Addr) -> Self {
        let tha = MacAddr::from([0; 6]);
        let arp = ArpEthIpv4Raw::new_hdr(op, SRC_MAC, spa, tha, tpa);
        self.put(Hdr::Arp, &arp);
        self
    }

    pub fn ipv4(mut self, src: Ipv4Addr, dst: Ipv4Addr, proto: u8) -> Self {
        let ip = Ipv4HdrRaw {
            proto,
            src: src.bytes(),
            dst: dst.bytes(),
            ..Default::default()
        };
        self.put(Hdr::Ipv4, &ip);
        self
    }

    pub fn ipv6(mut self, src: Ipv6Addr, dst: Ipv6Addr, next_hdr: u8) -> Self {
        let ip = Ipv6HdrRaw {
            next_hdr,
            src: src.bytes(),
            dst: dst.bytes(),
            ..Default::default()
        };
        self.put(Hdr::Ipv6, &ip);
        self
    }

    pub fn icmpv4(mut self, msg_type: u8, code: u8) -> Self {
        let icmp = IcmpHdrRaw::new_hdr(msg_type, code, [0, 1, 0, 1]);
        self.put(Hdr::Icmpv4, &icmp);
        self
    }

    pub fn icmpv6(mut self, msg_type: u8, code: u8) -> Self {
        let icmp = IcmpHdrRaw::new_hdr(msg_type, code, [0, 1, 0, 1]);
        self.put(Hdr::Icmpv6, &icmp);
        self
    }

    /// A neighbor solicitation or advertisement for `target`, with a
    /// link-layer address option when `lladdr` is given. The option is
    /// a source option for a solicitation and a target option for an
    /// advertisement.
    pub fn nd(
        mut self,
        msg_type: u8,
        target: Ipv6Addr,
        lladdr: Option<MacAddr>,
    ) -> Self {
        let advert = msg_type == ICMPV6_NEIGHBOR_ADVERT;
        // Solicited and override for an advertisement.
        let flags = if advert { [0x60, 0, 0, 0] } else { [0; 4] };
        self.put(Hdr::Icmpv6, &IcmpHdrRaw::new_hdr(msg_type, 0, flags));
        self.bytes.extend_from_slice(&target.bytes());
        if let Some(mac) = lladdr {
            let opt = if advert {
                ND_OPT_TARGET_LLADDR
            } else {
                ND_OPT_SOURCE_LLADDR
            };
            self.bytes.extend_from_slice(&[opt, 1]);
            self.bytes.extend_from_slice(&mac.bytes());
        }
        self
    }

    pub fn udp(mut self, src_port: u16, dst_port: u16) -> Self {
        self.put(Hdr::Udp, &UdpHdrRaw::new_hdr(src_port, dst_port, 0));
        self
    }

    pub fn tcp(mut self, src_port: u16, dst_port: u16) -> Self {
        let tcp = TcpHdrRaw::new_hdr(src_port, dst_port, 1, TcpFlags::SYN);
        self.put(Hdr::Tcp, &tcp);
        self
    }

    pub fn sctp(mut self, src_port: u16, dst_port: u16) -> Self {
        let sctp = SctpHdrRaw::new_hdr(src_port, dst_port, 0xC0FFEE);
        self.put(Hdr::Sctp, &sctp);
        self
    }

    pub fn payload(mut self, data: &[u8]) -> Self {
        self.hdrs.push((Hdr::Payload, self.bytes.len()));
        self.bytes.extend_from_slice(data);
        self
    }

    /// The nearest IP header before the `i`th header, as smoltcp
    /// addresses.
    fn ip_addrs(&self, i: usize) -> (IpAddress, IpAddress) {
        let (kind, off) = self.hdrs[..i]
            .iter()
            .rev()
            .find(|(k, _)| matches!(k, Hdr::Ipv4 | Hdr::Ipv6))
            .copied()
            .expect("transport header without an IP header");

        if kind == Hdr::Ipv4 {
            let ip = Ipv4HdrRaw::new(&self.bytes[off..]).unwrap();
            (IpAddress::Ipv4(ip.src().into()), IpAddress::Ipv4(ip.dst().into()))
        } else {
            let ip = Ipv6HdrRaw::new(&self.bytes[off..]).unwrap();
            (IpAddress::Ipv6(ip.src().into()), IpAddress::Ipv6(ip.dst().into()))
        }
    }

    /// Fill in lengths and checksums and return the frame.
    pub fn build(mut self) -> Vec<u8> {
        let len = self.bytes.len();

        for &(kind, off) in &self.hdrs {
            let rest = &mut self.bytes[off..];
            match kind {
                Hdr::Pppoe => {
                    let sz = (len - off - PppoeHdrRaw::SIZE) as u16;
                    PppoeHdrRaw::new_mut(rest).unwrap().set_length(sz);
                }

                Hdr::Ipv4 => {
                    let ip = Ipv4HdrRaw::new_mut(rest).unwrap();
                    ip.set_total_len((len - off) as u16);
                }

                Hdr::Ipv6 => {
                    let sz = (len - off - Ipv6HdrRaw::SIZE) as u16;
                    Ipv6HdrRaw::new_mut(rest).unwrap().set_payload_len(sz);
                }

                Hdr::Udp => {
                    UdpHdrRaw::new_mut(rest).unwrap().length =
                        ((len - off) as u16).to_be_bytes();
                }

                _ => (),
            }
        }

        for i in 0..self.hdrs.len() {
            let (kind, off) = self.hdrs[i];
            match kind {
                Hdr::Ipv4 => {
                    Ipv4Packet::new_unchecked(&mut self.bytes[off..])
                        .fill_checksum();
                }

                Hdr::Icmpv4 => {
                    Icmpv4Packet::new_unchecked(&mut self.bytes[off..])
                        .fill_checksum();
                }

                Hdr::Icmpv6 => {
                    let (src, dst) = self.ip_addrs(i);
                    Icmpv6Packet::new_unchecked(&mut self.bytes[off..])
                        .fill_checksum(&src, &dst);
                }

                Hdr::Udp => {
                    let (src, dst) = self.ip_addrs(i);
                    UdpPacket::new_unchecked(&mut self.bytes[off..])
                        .fill_checksum(&src, &dst);
                }

                Hdr::Tcp => {
                    let (src, dst) = self.ip_addrs(i);
                    TcpPacket::new_unchecked(&mut self.bytes[off..])
                        .fill_checksum(&src, &dst);
                }

                Hdr::Sctp => {
                    let csum = off + SCTP_CSUM_OFFSET;
                    self.bytes[csum..csum + 4].fill(0);
                    let crc = crc32c(&self.bytes[off..]);
                    self.bytes[csum..csum + 4]
                        .copy_from_slice(&crc.to_le_bytes());
                }

                _ => (),
            }
        }

        self.bytes
    }
}

/// Ethernet + IPv4 + TCP from 10.0.0.1:1234 to 10.0.0.2:80.
pub fn tcp4_frame() -> Vec<u8> {
    FrameBuilder::new()
        .ether(ETHER_TYPE_IPV4)
        .ipv4(ip4("10.0.0.1"), ip4("10.0.0.2"), PROTO_TCP)
        .tcp(1234, 80)
        .build()
}

/// Ethernet + IPv6 + UDP with a small payload.
pub fn udp6_frame() -> Vec<u8> {
    FrameBuilder::new()
        .ether(ETHER_TYPE_IPV6)
        .ipv6(ip6("fd00::1"), ip6("fd00::2"), PROTO_UDP)
        .udp(5353, 5353)
        .payload(b"ofpkt")
        .build()
}

/// Ethernet + two MPLS labels (100 then 200) + an uninterpreted
/// payload.
pub fn mpls_frame() -> Vec<u8> {
    FrameBuilder::new()
        .ether(ETHER_TYPE_MPLS)
        .mpls(100, false, 64)
        .mpls(200, true, 63)
        .payload(&[0xDE, 0xAD, 0xBE, 0xEF])
        .build()
}

/// An IPv4 UDP datagram carried over a PPPoE session.
pub fn pppoe_frame() -> Vec<u8> {
    FrameBuilder::new()
        .ether(ETHER_TYPE_PPPOE_SESS)
        .pppoe(PPPOE_CODE_SESSION, 0x1234)
        .ppp(PPP_PROT_IPV4)
        .ipv4(ip4("192.168.1.1"), ip4("192.168.1.2"), PROTO_UDP)
        .udp(68, 67)
        .payload(&[1, 2, 3])
        .build()
}

/// A neighbor solicitation for fd00::2 with a source link-layer
/// address option.
pub fn ns_frame() -> Vec<u8> {
    FrameBuilder::new()
        .ether(ETHER_TYPE_IPV6)
        .ipv6(ip6("fd00::1"), ip6("ff02::1:ff00:2"), PROTO_ICMPV6)
        .nd(ICMPV6_NEIGHBOR_SOLICIT, ip6("fd00::2"), Some(SRC_MAC))
        .build()
}

pub fn arp_frame() -> Vec<u8> {
    FrameBuilder::new()
        .ether(ETHER_TYPE_ARP)
        .arp(1, ip4("10.0.0.1"), ip4("10.0.0.2"))
        .build()
}

pub fn sctp4_frame() -> Vec<u8> {
    FrameBuilder::new()
        .ether(ETHER_TYPE_IPV4)
        .ipv4(ip4("10.0.0.1"), ip4("10.0.0.2"), PROTO_SCTP)
        .sctp(5000, 5001)
        .payload(&[0; 16])
        .build()
}
