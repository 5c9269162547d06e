// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Classification: turning raw frame bytes into a [`FrameChain`] and a
//! [`FieldSummary`].
//!
//! Parsing is a single forward pass. Each step views a fixed header at
//! the cursor, appends a node, and reads the discriminant that selects
//! the next step. Classification never fails: a header that is cut
//! short or malformed simply ends the chain, and a discriminant we
//! don't recognize hands the rest of the frame to an opaque node.

use super::arp::ArpEthIpv4Raw;
use super::ether::*;
use super::frame::FrameChain;
use super::frame::FrameKind;
use super::frame::FrameNode;
use super::frame::Span;
use super::headers::HdrError;
use super::headers::RawHeader;
use super::icmp::ICMP_HDR_SZ;
use super::icmp::IcmpHdrRaw;
use super::icmp::parse_nd;
use super::ip4::Ipv4HdrRaw;
use super::ip6::Ipv6HdrRaw;
use super::mpls::MplsHdrRaw;
use super::ppp::PPP_PROT_IPV4;
use super::ppp::PPP_PROT_IPV6;
use super::ppp::PppHdrRaw;
use super::pppoe::PppoeHdrRaw;
use super::sctp::SctpHdrRaw;
use super::summary::FieldSummary;
use super::tcp::TcpHdrRaw;
use super::udp::UdpHdrRaw;
use super::vlan::VlanHdrRaw;
use crate::api::FieldId;
use crate::api::PROTO_ICMP;
use crate::api::PROTO_ICMPV6;
use crate::api::PROTO_IPV4;
use crate::api::PROTO_IPV6;
use crate::api::PROTO_SCTP;
use crate::api::PROTO_TCP;
use crate::api::PROTO_UDP;
use slog::Logger;

/// A header the classifier knows how to parse.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Layer {
    Ether,
    Vlan,
    Mpls,
    PppoeDisc,
    PppoeSess,
    Ppp,
    Arp,
    Ipv4,
    Ipv6,
    Icmpv4,
    Icmpv6,
    Udp,
    Tcp,
    Sctp,
}

impl Layer {
    fn kind(self) -> FrameKind {
        match self {
            Self::Ether => FrameKind::Ethernet,
            Self::Vlan => FrameKind::Vlan,
            Self::Mpls => FrameKind::Mpls,
            Self::PppoeDisc | Self::PppoeSess => FrameKind::Pppoe,
            Self::Ppp => FrameKind::Ppp,
            Self::Arp => FrameKind::Arpv4,
            Self::Ipv4 => FrameKind::Ipv4,
            Self::Ipv6 => FrameKind::Ipv6,
            Self::Icmpv4 => FrameKind::Icmpv4,
            Self::Icmpv6 => FrameKind::Icmpv6,
            Self::Udp => FrameKind::Udp,
            Self::Tcp => FrameKind::Tcp,
            Self::Sctp => FrameKind::Sctp,
        }
    }
}

/// What follows a successfully parsed header.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Next {
    Layer(Layer),
    /// The remaining bytes are not interpreted.
    Opaque(&'static str),
    /// This header is the last node; nothing follows it in the chain.
    Stop(&'static str),
}

fn by_ether_type(ether_type: u16) -> Next {
    match ether_type {
        ETHER_TYPE_VLAN | ETHER_TYPE_QINQ | ETHER_TYPE_ITAG => {
            Next::Layer(Layer::Vlan)
        }
        ETHER_TYPE_MPLS | ETHER_TYPE_MPLS_MCAST => Next::Layer(Layer::Mpls),
        ETHER_TYPE_PPPOE_DISC => Next::Layer(Layer::PppoeDisc),
        ETHER_TYPE_PPPOE_SESS => Next::Layer(Layer::PppoeSess),
        ETHER_TYPE_ARP => Next::Layer(Layer::Arp),
        ETHER_TYPE_IPV4 => Next::Layer(Layer::Ipv4),
        ETHER_TYPE_IPV6 => Next::Layer(Layer::Ipv6),
        _ => Next::Opaque("unknown ether type"),
    }
}

fn by_ip_proto(proto: u8) -> Next {
    match proto {
        PROTO_IPV4 => Next::Layer(Layer::Ipv4),
        PROTO_ICMP => Next::Layer(Layer::Icmpv4),
        PROTO_IPV6 => Next::Layer(Layer::Ipv6),
        PROTO_ICMPV6 => Next::Layer(Layer::Icmpv6),
        PROTO_UDP => Next::Layer(Layer::Udp),
        PROTO_TCP => Next::Layer(Layer::Tcp),
        PROTO_SCTP => Next::Layer(Layer::Sctp),
        _ => Next::Opaque("unknown IP protocol"),
    }
}

/// Parse `layer` at the front of `bytes`, returning its length and what
/// comes after it.
fn parse_layer(
    layer: Layer,
    bytes: &[u8],
) -> Result<(usize, Next), HdrError> {
    let parsed = match layer {
        Layer::Ether => {
            let eth = EtherHdrRaw::new(bytes)?;
            (EtherHdrRaw::SIZE, by_ether_type(eth.ether_type()))
        }

        Layer::Vlan => {
            let vlan = VlanHdrRaw::new(bytes)?;
            (VlanHdrRaw::SIZE, by_ether_type(vlan.ether_type()))
        }

        Layer::Mpls => {
            let mpls = MplsHdrRaw::new(bytes)?;
            let next = match mpls.bos() {
                true => Next::Opaque("bottom of MPLS stack"),
                false => Next::Layer(Layer::Mpls),
            };
            (MplsHdrRaw::SIZE, next)
        }

        Layer::PppoeDisc => {
            // The node covers the service tags, as far as they are
            // present.
            let pppoe = PppoeHdrRaw::parse(bytes)?;
            let avail = bytes.len() - PppoeHdrRaw::SIZE;
            let tags = usize::from(pppoe.length()).min(avail);
            (PppoeHdrRaw::SIZE + tags, Next::Opaque("PPPoE discovery"))
        }

        Layer::PppoeSess => {
            PppoeHdrRaw::parse(bytes)?;
            (PppoeHdrRaw::SIZE, Next::Layer(Layer::Ppp))
        }

        Layer::Ppp => {
            let ppp = PppHdrRaw::new(bytes)?;
            let next = match ppp.protocol() {
                PPP_PROT_IPV4 => Next::Layer(Layer::Ipv4),
                PPP_PROT_IPV6 => Next::Layer(Layer::Ipv6),
                _ => Next::Opaque("unknown PPP protocol"),
            };
            (PppHdrRaw::SIZE, next)
        }

        Layer::Arp => {
            ArpEthIpv4Raw::parse(bytes)?;
            (ArpEthIpv4Raw::SIZE, Next::Opaque("ARP"))
        }

        Layer::Ipv4 => {
            let ip = Ipv4HdrRaw::parse(bytes)?;
            let next = match ip.is_fragment() {
                true => Next::Stop("IPv4 fragment"),
                false => by_ip_proto(ip.proto),
            };
            (ip.hdr_len(), next)
        }

        Layer::Ipv6 => {
            let ip = Ipv6HdrRaw::parse(bytes)?;
            (Ipv6HdrRaw::SIZE, by_ip_proto(ip.next_hdr))
        }

        Layer::Icmpv4 => {
            IcmpHdrRaw::new(bytes)?;
            (ICMP_HDR_SZ, Next::Opaque("ICMPv4"))
        }

        Layer::Icmpv6 => {
            IcmpHdrRaw::new(bytes)?;
            let len = parse_nd(bytes).map(|nd| nd.len).unwrap_or(ICMP_HDR_SZ);
            (len, Next::Opaque("ICMPv6"))
        }

        Layer::Udp => {
            UdpHdrRaw::new(bytes)?;
            (UdpHdrRaw::SIZE, Next::Opaque("UDP"))
        }

        Layer::Tcp => {
            let tcp = TcpHdrRaw::parse(bytes)?;
            let hdr_len = tcp.hdr_len();
            if bytes.len() < hdr_len {
                return Err(HdrError::Truncated {
                    needed: hdr_len,
                    available: bytes.len(),
                });
            }
            (hdr_len, Next::Opaque("TCP"))
        }

        Layer::Sctp => {
            SctpHdrRaw::new(bytes)?;
            (SctpHdrRaw::SIZE, Next::Opaque("SCTP"))
        }
    };

    Ok(parsed)
}

/// Builds frame chains and field summaries from raw frames.
#[derive(Clone, Debug)]
pub struct Classifier {
    log: Logger,
}

impl Classifier {
    pub fn new(log: Logger) -> Self {
        Self { log }
    }

    /// Classify `frame`, received on `in_port`.
    ///
    /// The summary always carries `in_port` and `in_phy_port`, even
    /// when not a single header could be parsed.
    pub fn classify(
        &self,
        frame: &[u8],
        in_port: u32,
    ) -> (FrameChain, FieldSummary) {
        let mut chain = FrameChain::new();
        let mut summary = FieldSummary::new();
        summary.insert(FieldId::IN_PORT, in_port);
        summary.insert(FieldId::IN_PHY_PORT, in_port);

        let mut off = 0;
        let mut layer = Layer::Ether;

        let opaque_reason = loop {
            let rest = &frame[off..];
            let (len, next) = match parse_layer(layer, rest) {
                Ok(parsed) => parsed,
                Err(e) => {
                    slog::debug!(
                        self.log,
                        "classification stopped";
                        "layer" => %layer.kind(),
                        "offset" => off,
                        "err" => %e,
                    );
                    break None;
                }
            };

            let node = FrameNode::new(layer.kind(), Span::new(off, len));
            summarize(&frame[off..off + len], layer.kind(), &mut summary);

            // Contiguity holds by construction: `off` is always the
            // end of the chain.
            if chain.push(node).is_err() {
                break None;
            }

            slog::trace!(
                self.log,
                "parsed layer";
                "layer" => %layer.kind(),
                "offset" => off,
                "len" => len,
            );

            off += len;
            match next {
                Next::Layer(l) => layer = l,
                Next::Opaque(why) => break Some(why),
                Next::Stop(why) => {
                    slog::debug!(
                        self.log,
                        "classification stopped";
                        "after" => why,
                        "offset" => off,
                    );
                    break None;
                }
            }
        };

        if let Some(why) = opaque_reason.filter(|_| off < frame.len()) {
            slog::debug!(
                self.log,
                "opaque payload";
                "after" => why,
                "offset" => off,
                "len" => frame.len() - off,
            );
            let span = Span::new(off, frame.len() - off);
            let pushed = chain.push(FrameNode::Opaque(span));
            debug_assert!(pushed.is_ok(), "opaque tail at {off}");
        }

        refresh_eth_type(frame, &chain, &mut summary);
        (chain, summary)
    }
}

/// Record the fields of the header in `hdr` into `summary`, leaving any
/// field already set by an outer instance alone.
///
/// `eth_type` is not touched; see [`refresh_eth_type`].
pub fn summarize(hdr: &[u8], kind: FrameKind, summary: &mut FieldSummary) {
    match kind {
        FrameKind::Ethernet => {
            if let Ok(eth) = EtherHdrRaw::new(hdr) {
                summary.insert_first(FieldId::ETH_DST, eth.dst());
                summary.insert_first(FieldId::ETH_SRC, eth.src());
            }
        }

        FrameKind::Vlan => {
            if let Ok(vlan) = VlanHdrRaw::new(hdr) {
                summary.insert_first(FieldId::VLAN_VID, vlan.vid());
                summary.insert_first(FieldId::VLAN_PCP, vlan.pcp());
            }
        }

        FrameKind::Mpls => {
            if let Ok(mpls) = MplsHdrRaw::new(hdr) {
                summary.insert_first(FieldId::MPLS_LABEL, mpls.label());
                summary.insert_first(FieldId::MPLS_TC, mpls.tc());
            }
        }

        FrameKind::Pppoe => {
            if let Ok(pppoe) = PppoeHdrRaw::new(hdr) {
                summary.insert_first(FieldId::PPPOE_CODE, pppoe.code);
                summary.insert_first(FieldId::PPPOE_TYPE, pppoe.ptype());
                summary.insert_first(FieldId::PPPOE_SID, pppoe.sid());
            }
        }

        FrameKind::Ppp => {
            if let Ok(ppp) = PppHdrRaw::new(hdr) {
                summary.insert_first(FieldId::PPP_PROT, ppp.protocol());
            }
        }

        FrameKind::Arpv4 => {
            if let Ok(arp) = ArpEthIpv4Raw::new(hdr) {
                summary.insert_first(FieldId::ARP_OP, arp.op());
                summary.insert_first(FieldId::ARP_SPA, arp.spa());
                summary.insert_first(FieldId::ARP_TPA, arp.tpa());
                summary.insert_first(FieldId::ARP_SHA, arp.sha());
                summary.insert_first(FieldId::ARP_THA, arp.tha());
            }
        }

        FrameKind::Ipv4 => {
            if let Ok(ip) = Ipv4HdrRaw::new(hdr) {
                summary.insert_first(FieldId::IP_DSCP, ip.dscp());
                summary.insert_first(FieldId::IP_ECN, ip.ecn());
                summary.insert_first(FieldId::IP_PROTO, ip.proto);
                summary.insert_first(FieldId::IPV4_SRC, ip.src());
                summary.insert_first(FieldId::IPV4_DST, ip.dst());
            }
        }

        FrameKind::Ipv6 => {
            if let Ok(ip) = Ipv6HdrRaw::new(hdr) {
                summary.insert_first(FieldId::IP_DSCP, ip.dscp());
                summary.insert_first(FieldId::IP_ECN, ip.ecn());
                summary.insert_first(FieldId::IP_PROTO, ip.next_hdr);
                summary.insert_first(FieldId::IPV6_SRC, ip.src());
                summary.insert_first(FieldId::IPV6_DST, ip.dst());
                summary.insert_first(FieldId::IPV6_FLABEL, ip.flow_label());
            }
        }

        FrameKind::Icmpv4 => {
            if let Ok(icmp) = IcmpHdrRaw::new(hdr) {
                summary.insert_first(FieldId::ICMPV4_TYPE, icmp.msg_type);
                summary.insert_first(FieldId::ICMPV4_CODE, icmp.code);
            }
        }

        FrameKind::Icmpv6 => {
            let Ok(icmp) = IcmpHdrRaw::new(hdr) else {
                return;
            };

            // ND fields belong to the first ICMPv6 message only.
            if summary.contains(FieldId::ICMPV6_TYPE) {
                return;
            }

            summary.insert(FieldId::ICMPV6_TYPE, icmp.msg_type);
            summary.insert(FieldId::ICMPV6_CODE, icmp.code);

            if let Some(nd) = parse_nd(hdr) {
                summary.insert(FieldId::IPV6_ND_TARGET, nd.target);
                if let Some(sll) = nd.sll {
                    summary.insert(FieldId::IPV6_ND_SLL, sll.addr);
                }
                if let Some(tll) = nd.tll {
                    summary.insert(FieldId::IPV6_ND_TLL, tll.addr);
                }
            }
        }

        FrameKind::Udp => {
            if let Ok(udp) = UdpHdrRaw::new(hdr) {
                summary.insert_first(FieldId::UDP_SRC, udp.src_port());
                summary.insert_first(FieldId::UDP_DST, udp.dst_port());
            }
        }

        FrameKind::Tcp => {
            if let Ok(tcp) = TcpHdrRaw::new(hdr) {
                summary.insert_first(FieldId::TCP_SRC, tcp.src_port());
                summary.insert_first(FieldId::TCP_DST, tcp.dst_port());
            }
        }

        FrameKind::Sctp => {
            if let Ok(sctp) = SctpHdrRaw::new(hdr) {
                summary.insert_first(FieldId::SCTP_SRC, sctp.src_port());
                summary.insert_first(FieldId::SCTP_DST, sctp.dst_port());
            }
        }

        FrameKind::Opaque => (),
    }
}

/// Re-summarize the outermost node of `kind`, dropping whatever the
/// summary held for that kind before.
pub fn resummarize(
    frame: &[u8],
    chain: &FrameChain,
    kind: FrameKind,
    summary: &mut FieldSummary,
) {
    summary.remove_kind(kind);
    if let Some(idx) = chain.position(kind) {
        let span = chain.nodes()[idx].span();
        summarize(&frame[span.offset..span.end()], kind, summary);
    }
}

/// Set `eth_type` to the type carried by the innermost L2 header: the
/// last VLAN tag if there is one, otherwise Ethernet.
pub fn refresh_eth_type(
    frame: &[u8],
    chain: &FrameChain,
    summary: &mut FieldSummary,
) {
    let l2 = chain
        .rposition(FrameKind::Vlan)
        .or_else(|| chain.position(FrameKind::Ethernet))
        .map(|idx| chain.nodes()[idx].span());

    match l2 {
        // The type is always the last two bytes of both headers.
        Some(span) => {
            let end = span.end();
            let et = u16::from_be_bytes([frame[end - 2], frame[end - 1]]);
            summary.insert(FieldId::ETH_TYPE, et);
        }

        None => {
            summary.remove(FieldId::ETH_TYPE);
        }
    }
}
