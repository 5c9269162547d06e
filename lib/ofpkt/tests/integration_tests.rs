// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Integration tests.
//!
//! These tests drive whole frames through classification and editing.
//! Frames come from the builders in `ofpkt-test-utils`, which lay down
//! their checksums with smoltcp; wherever the engine computes a
//! checksum, the result is compared against those bytes or verified by
//! smoltcp directly.

use itertools::Itertools;
use ofpkt::api::ActionList;
use ofpkt::engine::DirtyChecksums;
use ofpkt::engine::FrameChain;
use ofpkt::engine::headers::RawHeader;
use ofpkt::engine::icmp::ICMPV4_ECHO_REQUEST;
use ofpkt::engine::icmp::ICMPV6_NEIGHBOR_ADVERT;
use ofpkt::engine::icmp::ICMPV6_NEIGHBOR_SOLICIT;
use ofpkt_test_utils::*;
use slog::Logger;
use smoltcp::wire::Icmpv4Packet;
use smoltcp::wire::Icmpv6Packet;
use smoltcp::wire::IpAddress;
use smoltcp::wire::Ipv4Packet;
use smoltcp::wire::TcpPacket;
use smoltcp::wire::UdpPacket;

fn kinds(pkt: &Packet) -> Vec<FrameKind> {
    pkt.chain().iter().map(|n| n.kind()).collect()
}

fn int(pkt: &Packet, field: FieldId) -> u64 {
    pkt.summary()
        .get_int(field)
        .unwrap_or_else(|| panic!("{field} missing from {}", pkt.summary()))
}

fn v4(s: &str) -> IpAddress {
    IpAddress::Ipv4(ip4(s).into())
}

fn v6(s: &str) -> IpAddress {
    IpAddress::Ipv6(ip6(s).into())
}

fn icmp4_frame() -> Vec<u8> {
    FrameBuilder::new()
        .ether(ETHER_TYPE_IPV4)
        .ipv4(ip4("10.0.0.1"), ip4("10.0.0.2"), PROTO_ICMP)
        .icmpv4(ICMPV4_ECHO_REQUEST, 0)
        .payload(b"ping")
        .build()
}

fn vlan_frame() -> Vec<u8> {
    FrameBuilder::new()
        .ether(ETHER_TYPE_VLAN)
        .vlan(3, 10, ETHER_TYPE_IPV4)
        .ipv4(ip4("10.0.0.1"), ip4("10.0.0.2"), PROTO_UDP)
        .udp(1000, 2000)
        .build()
}

fn na_frame() -> Vec<u8> {
    FrameBuilder::new()
        .ether(ETHER_TYPE_IPV6)
        .ipv6(ip6("fd00::2"), ip6("fd00::1"), PROTO_ICMPV6)
        .nd(ICMPV6_NEIGHBOR_ADVERT, ip6("fd00::2"), Some(DST_MAC))
        .build()
}

fn all_frames() -> Vec<(&'static str, Vec<u8>)> {
    vec![
        ("tcp4", tcp4_frame()),
        ("udp6", udp6_frame()),
        ("mpls", mpls_frame()),
        ("pppoe", pppoe_frame()),
        ("ns", ns_frame()),
        ("na", na_frame()),
        ("arp", arp_frame()),
        ("sctp4", sctp4_frame()),
        ("icmp4", icmp4_frame()),
        ("vlan", vlan_frame()),
    ]
}

/// Frames without any VLAN tag or MPLS label.
fn untagged_frames() -> Vec<(&'static str, Vec<u8>)> {
    all_frames()
        .into_iter()
        .filter(|(name, _)| !matches!(*name, "mpls" | "vlan"))
        .collect()
}

fn assert_contained(chain: &FrameChain, len: usize) {
    if let Some(first) = chain.first() {
        assert_eq!(first.span().offset, 0);
    }
    for (a, b) in chain.iter().tuple_windows() {
        assert_eq!(a.span().end(), b.span().offset, "{a} then {b}");
    }
    assert!(chain.end() <= len);
    chain.validate(len).unwrap();
}

fn assert_same(a: &Packet, b: &Packet) {
    assert_eq!(a.bytes(), b.bytes());
    assert_eq!(a.chain(), b.chain());
    assert_eq!(a.summary(), b.summary());
}

#[rustfmt::skip]
const SCENARIO_FRAME: [u8; 54] = [
    // Ethernet
    0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA,
    0xBB, 0xBB, 0xBB, 0xBB, 0xBB, 0xBB,
    0x08, 0x00,
    // IPv4: total length 40, DF, TTL 64, TCP
    0x45, 0x00, 0x00, 0x28,
    0x00, 0x00, 0x40, 0x00,
    0x40, 0x06, 0x00, 0x00,
    0x0A, 0x00, 0x00, 0x01,
    0x0A, 0x00, 0x00, 0x02,
    // TCP: 1234 -> 80, SYN
    0x04, 0xD2, 0x00, 0x50,
    0x00, 0x00, 0x00, 0x01,
    0x00, 0x00, 0x00, 0x00,
    0x50, 0x02, 0xFA, 0xF0,
    0x00, 0x00, 0x00, 0x00,
];

#[test]
fn classify_eth_ipv4_tcp() {
    let pkt = Packet::copy_from(&SCENARIO_FRAME, 3).unwrap();
    assert_eq!(
        kinds(&pkt),
        vec![FrameKind::Ethernet, FrameKind::Ipv4, FrameKind::Tcp]
    );
    assert_eq!(int(&pkt, FieldId::ETH_TYPE), 0x0800);
    assert_eq!(int(&pkt, FieldId::IP_PROTO), 6);
    assert_eq!(int(&pkt, FieldId::TCP_SRC), 1234);
    assert_eq!(int(&pkt, FieldId::TCP_DST), 80);
    assert_eq!(int(&pkt, FieldId::IN_PORT), 3);
    assert_eq!(int(&pkt, FieldId::IN_PHY_PORT), 3);
    assert_eq!(
        pkt.get(FieldId::ETH_SRC),
        Some(&FieldValue::Mac(MacAddr::from([0xBB; 6])))
    );
    assert_eq!(
        pkt.get(FieldId::IPV4_DST),
        Some(&FieldValue::Ipv4(ip4("10.0.0.2")))
    );
    assert!(pkt.payload().is_err());
    pkt.validate().unwrap();
}

#[test]
fn push_vlan_onto_untagged() {
    let mut pkt = Packet::copy_from(&SCENARIO_FRAME, 3).unwrap();
    pkt.push(EncapKind::Vlan, ETHER_TYPE_VLAN).unwrap();

    assert_eq!(
        kinds(&pkt),
        vec![
            FrameKind::Ethernet,
            FrameKind::Vlan,
            FrameKind::Ipv4,
            FrameKind::Tcp
        ]
    );
    assert_eq!(pkt.len(), SCENARIO_FRAME.len() + 4);
    assert_eq!(pkt.ether(0).unwrap().ether_type(), ETHER_TYPE_VLAN);
    assert_eq!(pkt.vlan(0).unwrap().ether_type(), ETHER_TYPE_IPV4);
    assert_eq!(int(&pkt, FieldId::VLAN_VID), 0);
    assert_eq!(int(&pkt, FieldId::VLAN_PCP), 0);
    assert_eq!(int(&pkt, FieldId::ETH_TYPE), 0x0800);

    // The inner headers moved with the frame.
    assert_eq!(pkt.ipv4(0).unwrap().src(), ip4("10.0.0.1"));
    assert_eq!(pkt.tcp(0).unwrap().dst_port(), 80);
    assert_eq!(&pkt.bytes()[..12], &SCENARIO_FRAME[..12]);
    pkt.validate().unwrap();

    // A reparse agrees with the edited chain.
    let reparsed = Packet::copy_from(pkt.bytes(), 3).unwrap();
    assert_eq!(reparsed.chain(), pkt.chain());
    assert_eq!(reparsed.summary(), pkt.summary());
}

#[test]
fn push_vlan_inherits_outer_tag() {
    let mut pkt = Packet::copy_from(&vlan_frame(), 1).unwrap();
    pkt.push(EncapKind::Vlan, ETHER_TYPE_QINQ).unwrap();

    assert_eq!(pkt.chain().count(FrameKind::Vlan), 2);
    assert_eq!(pkt.ether(0).unwrap().ether_type(), ETHER_TYPE_QINQ);
    let outer = pkt.vlan(0).unwrap();
    assert_eq!((outer.pcp(), outer.vid()), (3, 10));
    assert_eq!(outer.ether_type(), ETHER_TYPE_VLAN);
    assert_eq!(pkt.vlan(-1).unwrap().ether_type(), ETHER_TYPE_IPV4);
    assert_eq!(int(&pkt, FieldId::ETH_TYPE), 0x0800);
}

#[test]
fn stacked_mpls_labels() {
    let pkt = Packet::copy_from(&mpls_frame(), 1).unwrap();
    assert_eq!(
        kinds(&pkt),
        vec![
            FrameKind::Ethernet,
            FrameKind::Mpls,
            FrameKind::Mpls,
            FrameKind::Opaque
        ]
    );

    let outer = pkt.mpls(0).unwrap();
    assert_eq!(outer.label(), 100);
    assert!(!outer.bos());
    let inner = pkt.mpls(1).unwrap();
    assert_eq!(inner.label(), 200);
    assert!(inner.bos());
    assert_eq!(pkt.mpls(-1).unwrap().label(), 200);
    assert_eq!(pkt.mpls(-2).unwrap().label(), 100);
    assert_eq!(pkt.payload().unwrap(), &[0xDE, 0xAD, 0xBE, 0xEF]);

    assert_eq!(int(&pkt, FieldId::MPLS_LABEL), 100);
    assert_eq!(int(&pkt, FieldId::ETH_TYPE), u64::from(ETHER_TYPE_MPLS));

    assert_eq!(
        pkt.mpls(2).unwrap_err(),
        PacketError::OutOfRange { requested: 2, available: 2 }
    );
    assert_eq!(
        pkt.mpls(-3).unwrap_err(),
        PacketError::OutOfRange { requested: 3, available: 2 }
    );
    assert_eq!(
        pkt.vlan(0).unwrap_err(),
        PacketError::NotFound(Missing::Layer(FrameKind::Vlan))
    );
}

#[test]
fn classify_other_stacks() {
    let pkt = Packet::copy_from(&pppoe_frame(), 1).unwrap();
    assert_eq!(
        kinds(&pkt),
        vec![
            FrameKind::Ethernet,
            FrameKind::Pppoe,
            FrameKind::Ppp,
            FrameKind::Ipv4,
            FrameKind::Udp,
            FrameKind::Opaque
        ]
    );
    assert_eq!(int(&pkt, FieldId::PPPOE_SID), 0x1234);
    assert_eq!(int(&pkt, FieldId::PPPOE_CODE), 0);
    assert_eq!(int(&pkt, FieldId::PPP_PROT), u64::from(PPP_PROT_IPV4));
    assert_eq!(int(&pkt, FieldId::UDP_DST), 67);

    let pkt = Packet::copy_from(&arp_frame(), 1).unwrap();
    assert_eq!(kinds(&pkt), vec![FrameKind::Ethernet, FrameKind::Arpv4]);
    assert_eq!(int(&pkt, FieldId::ARP_OP), 1);
    assert_eq!(
        pkt.get(FieldId::ARP_SHA),
        Some(&FieldValue::Mac(SRC_MAC))
    );

    let pkt = Packet::copy_from(&sctp4_frame(), 1).unwrap();
    assert_eq!(int(&pkt, FieldId::SCTP_SRC), 5000);
    assert_eq!(pkt.sctp(0).unwrap().vtag(), 0xC0FFEE);

    let pkt = Packet::copy_from(&udp6_frame(), 1).unwrap();
    assert_eq!(int(&pkt, FieldId::IP_PROTO), u64::from(PROTO_UDP));
    assert_eq!(pkt.payload().unwrap(), b"ofpkt");
}

#[test]
fn neighbor_discovery_fields() {
    let mut pkt = Packet::copy_from(&ns_frame(), 1).unwrap();
    assert_eq!(
        kinds(&pkt),
        vec![FrameKind::Ethernet, FrameKind::Ipv6, FrameKind::Icmpv6]
    );
    // Header, target and one option.
    assert_eq!(pkt.chain().nodes()[2].span().len, 32);
    assert_eq!(
        int(&pkt, FieldId::ICMPV6_TYPE),
        u64::from(ICMPV6_NEIGHBOR_SOLICIT)
    );
    assert_eq!(
        pkt.get(FieldId::IPV6_ND_TARGET),
        Some(&FieldValue::Ipv6(ip6("fd00::2")))
    );
    assert_eq!(
        pkt.get(FieldId::IPV6_ND_SLL),
        Some(&FieldValue::Mac(SRC_MAC))
    );
    assert!(pkt.get(FieldId::IPV6_ND_TLL).is_none());

    let before = pkt.clone();
    assert_eq!(
        pkt.set_field(FieldId::IPV6_ND_TLL, DST_MAC).unwrap_err(),
        PacketError::NotFound(Missing::Field(FieldId::IPV6_ND_TLL))
    );
    assert_same(&before, &pkt);

    pkt.set_field(FieldId::IPV6_ND_TARGET, ip6("fd00::99")).unwrap();
    pkt.set_field(FieldId::IPV6_ND_SLL, DST_MAC).unwrap();
    assert!(pkt.dirty().contains(DirtyChecksums::ICMPV6));
    pkt.calc_checksums();

    let bytes = pkt.to_vec();
    let icmp = Icmpv6Packet::new_checked(&bytes[54..]).unwrap();
    assert!(icmp.verify_checksum(&v6("fd00::1"), &v6("ff02::1:ff00:2")));

    let pkt = Packet::copy_from(&bytes, 1).unwrap();
    assert_eq!(
        pkt.get(FieldId::IPV6_ND_TARGET),
        Some(&FieldValue::Ipv6(ip6("fd00::99")))
    );
    assert_eq!(pkt.get(FieldId::IPV6_ND_SLL), Some(&FieldValue::Mac(DST_MAC)));

    let pkt = Packet::copy_from(&na_frame(), 1).unwrap();
    assert_eq!(pkt.get(FieldId::IPV6_ND_TLL), Some(&FieldValue::Mac(DST_MAC)));
    assert!(pkt.get(FieldId::IPV6_ND_SLL).is_none());
}

#[test]
fn classification_is_deterministic() {
    for (name, frame) in all_frames() {
        let a = Packet::copy_from(&frame, 9).unwrap();
        let b = Packet::copy_from(&frame, 9).unwrap();
        assert_eq!(a.chain(), b.chain(), "{name}");
        assert_eq!(a.summary(), b.summary(), "{name}");
    }
}

#[test]
fn nodes_cover_frame_prefix() {
    for (name, frame) in all_frames() {
        let pkt = Packet::copy_from(&frame, 1).unwrap();
        assert_contained(pkt.chain(), frame.len());
        assert_eq!(pkt.chain().end(), frame.len(), "{name}");
    }
}

#[test]
fn every_truncation_classifies() {
    for (name, frame) in all_frames() {
        for n in 0..frame.len() {
            let pkt = Packet::copy_from(&frame[..n], 4).unwrap();
            assert_contained(pkt.chain(), n);
            assert_eq!(int(&pkt, FieldId::IN_PORT), 4);

            if n < EtherHdrRaw::SIZE {
                assert!(pkt.chain().is_empty(), "{name}[..{n}]");
                assert_eq!(pkt.summary().len(), 2, "{name}[..{n}]");
                assert!(pkt.summary().contains(FieldId::IN_PHY_PORT));
            }
        }
    }
}

#[test]
fn vlan_push_pop_round_trip() {
    for (name, frame) in untagged_frames() {
        for tag in [ETHER_TYPE_VLAN, ETHER_TYPE_QINQ] {
            let orig = Packet::copy_from(&frame, 1).unwrap();
            let mut pkt = orig.clone();
            pkt.push(EncapKind::Vlan, tag).unwrap();
            assert_eq!(pkt.len(), frame.len() + 4, "{name}");
            pkt.pop(EncapKind::Vlan, 0).unwrap();
            assert_same(&orig, &pkt);
        }
    }
}

#[test]
fn mpls_push_pop_round_trip() {
    for (name, frame) in untagged_frames() {
        let orig = Packet::copy_from(&frame, 1).unwrap();
        let et = int(&orig, FieldId::ETH_TYPE) as u16;
        let mut pkt = orig.clone();

        pkt.push(EncapKind::Mpls, ETHER_TYPE_MPLS).unwrap();
        assert_eq!(pkt.chain().nodes()[1].kind(), FrameKind::Mpls, "{name}");
        assert!(pkt.mpls(0).unwrap().bos());
        assert_eq!(int(&pkt, FieldId::ETH_TYPE), u64::from(ETHER_TYPE_MPLS));

        pkt.pop(EncapKind::Mpls, et).unwrap();
        assert_same(&orig, &pkt);
    }
}

#[test]
fn mpls_push_over_label() {
    let mut pkt = Packet::copy_from(&mpls_frame(), 1).unwrap();
    pkt.push(EncapKind::Mpls, ETHER_TYPE_MPLS).unwrap();

    assert_eq!(pkt.chain().count(FrameKind::Mpls), 3);
    let outer = pkt.mpls(0).unwrap();
    assert_eq!((outer.label(), outer.ttl()), (100, 64));
    assert!(!outer.bos());
    assert_eq!(pkt.mpls(-1).unwrap().label(), 200);
    assert_eq!(pkt.payload().unwrap(), &[0xDE, 0xAD, 0xBE, 0xEF]);

    pkt.pop(EncapKind::Mpls, ETHER_TYPE_MPLS).unwrap();
    assert_eq!(pkt.bytes(), &mpls_frame()[..]);
}

#[test]
fn pppoe_session_push_pop() {
    let frame = tcp4_frame();
    let mut pkt = Packet::copy_from(&frame, 1).unwrap();
    pkt.push(EncapKind::Pppoe, ETHER_TYPE_PPPOE_SESS).unwrap();

    assert_eq!(
        kinds(&pkt),
        vec![
            FrameKind::Ethernet,
            FrameKind::Pppoe,
            FrameKind::Ppp,
            FrameKind::Ipv4,
            FrameKind::Tcp
        ]
    );
    let pppoe = pkt.pppoe(0).unwrap();
    assert_eq!(usize::from(pppoe.length()), frame.len() - 14 + 2);
    assert_eq!(pppoe.sid(), 0);
    assert_eq!(pkt.ppp(0).unwrap().protocol(), PPP_PROT_IPV4);
    assert_eq!(int(&pkt, FieldId::PPP_PROT), u64::from(PPP_PROT_IPV4));
    assert_eq!(
        int(&pkt, FieldId::ETH_TYPE),
        u64::from(ETHER_TYPE_PPPOE_SESS)
    );

    let reparsed = Packet::copy_from(pkt.bytes(), 1).unwrap();
    assert_eq!(reparsed.chain(), pkt.chain());
    assert_eq!(reparsed.summary(), pkt.summary());

    pkt.pop(EncapKind::Pppoe, ETHER_TYPE_IPV4).unwrap();
    assert_same(&Packet::copy_from(&frame, 1).unwrap(), &pkt);
}

#[test]
fn ppp_push_pop() {
    let frame = pppoe_frame();
    let mut pkt = Packet::copy_from(&frame, 1).unwrap();
    let len = pkt.pppoe(0).unwrap().length();

    pkt.pop(EncapKind::Ppp, 0).unwrap();
    assert_eq!(pkt.chain().count(FrameKind::Ppp), 0);
    assert_eq!(pkt.pppoe(0).unwrap().length(), len - 2);
    assert!(pkt.get(FieldId::PPP_PROT).is_none());

    // Only one PPP header per session.
    pkt.push(EncapKind::Ppp, PPP_PROT_IPV4).unwrap();
    assert_eq!(
        pkt.push(EncapKind::Ppp, PPP_PROT_IPV4).unwrap_err(),
        PacketError::Invalid(InvalidOp::UnsupportedKind(FrameKind::Ppp))
    );
    assert_same(&Packet::copy_from(&frame, 1).unwrap(), &pkt);
}

#[test]
fn pppoe_session_needs_ppp_protocol() {
    let mut pkt = Packet::copy_from(&arp_frame(), 1).unwrap();
    let before = pkt.clone();
    assert_eq!(
        pkt.push(EncapKind::Pppoe, ETHER_TYPE_PPPOE_SESS).unwrap_err(),
        PacketError::Invalid(InvalidOp::BadEtherType {
            kind: FrameKind::Ppp,
            ether_type: ETHER_TYPE_ARP,
        })
    );
    assert_same(&before, &pkt);

    // Discovery carries no PPP header.
    pkt.push(EncapKind::Pppoe, ETHER_TYPE_PPPOE_DISC).unwrap();
    assert_eq!(pkt.chain().count(FrameKind::Ppp), 0);
    assert_eq!(pkt.chain().nodes()[1].kind(), FrameKind::Pppoe);
}

fn settable() -> Vec<(Vec<u8>, Vec<(FieldId, FieldValue)>)> {
    let mac = MacAddr::from([2, 4, 6, 8, 10, 12]);
    vec![
        (
            tcp4_frame(),
            vec![
                (FieldId::METADATA, FieldValue::Int(u64::MAX)),
                (FieldId::ETH_DST, FieldValue::Mac(mac)),
                (FieldId::ETH_SRC, FieldValue::Mac(mac)),
                (FieldId::IP_DSCP, FieldValue::Int(46)),
                (FieldId::IP_ECN, FieldValue::Int(3)),
                (FieldId::IPV4_SRC, FieldValue::Ipv4(ip4("172.16.0.1"))),
                (FieldId::IPV4_DST, FieldValue::Ipv4(ip4("172.16.0.2"))),
                (FieldId::TCP_SRC, FieldValue::Int(4321)),
                (FieldId::TCP_DST, FieldValue::Int(443)),
                (FieldId::IP_PROTO, FieldValue::Int(17)),
            ],
        ),
        (
            udp6_frame(),
            vec![
                (FieldId::IP_DSCP, FieldValue::Int(10)),
                (FieldId::IP_ECN, FieldValue::Int(2)),
                (FieldId::IP_PROTO, FieldValue::Int(0xFD)),
                (FieldId::IPV6_SRC, FieldValue::Ipv6(ip6("2001:db8::1"))),
                (FieldId::IPV6_DST, FieldValue::Ipv6(ip6("2001:db8::2"))),
                (FieldId::IPV6_FLABEL, FieldValue::Int(0xBEEF)),
                (FieldId::UDP_SRC, FieldValue::Int(53)),
                (FieldId::UDP_DST, FieldValue::Int(5353)),
            ],
        ),
        (
            vlan_frame(),
            vec![
                (FieldId::VLAN_VID, FieldValue::Int(42)),
                (FieldId::VLAN_PCP, FieldValue::Int(5)),
            ],
        ),
        (
            mpls_frame(),
            vec![
                (FieldId::MPLS_LABEL, FieldValue::Int(0xABCDE)),
                (FieldId::MPLS_TC, FieldValue::Int(5)),
            ],
        ),
        (
            pppoe_frame(),
            vec![
                (FieldId::PPPOE_CODE, FieldValue::Int(0)),
                (FieldId::PPPOE_TYPE, FieldValue::Int(1)),
                (FieldId::PPPOE_SID, FieldValue::Int(0x4321)),
                (FieldId::PPP_PROT, FieldValue::Int(0x21)),
            ],
        ),
        (
            arp_frame(),
            vec![
                (FieldId::ARP_OP, FieldValue::Int(2)),
                (FieldId::ARP_SPA, FieldValue::Ipv4(ip4("10.1.1.1"))),
                (FieldId::ARP_TPA, FieldValue::Ipv4(ip4("10.1.1.2"))),
                (FieldId::ARP_SHA, FieldValue::Mac(mac)),
                (FieldId::ARP_THA, FieldValue::Mac(mac)),
            ],
        ),
        (
            sctp4_frame(),
            vec![
                (FieldId::SCTP_SRC, FieldValue::Int(7)),
                (FieldId::SCTP_DST, FieldValue::Int(8)),
            ],
        ),
        (
            icmp4_frame(),
            vec![
                (FieldId::ICMPV4_TYPE, FieldValue::Int(0)),
                (FieldId::ICMPV4_CODE, FieldValue::Int(1)),
            ],
        ),
        (
            ns_frame(),
            vec![
                (FieldId::ICMPV6_CODE, FieldValue::Int(1)),
                (FieldId::ICMPV6_TYPE, FieldValue::Int(129)),
                (FieldId::IPV6_ND_TARGET, FieldValue::Ipv6(ip6("fd00::7"))),
                (FieldId::IPV6_ND_SLL, FieldValue::Mac(mac)),
            ],
        ),
        (
            na_frame(),
            vec![
                (FieldId::IPV6_ND_TARGET, FieldValue::Ipv6(ip6("fd00::8"))),
                (FieldId::IPV6_ND_TLL, FieldValue::Mac(mac)),
            ],
        ),
    ]
}

#[test]
fn field_round_trip() {
    for (frame, fields) in settable() {
        for (field, value) in fields {
            let mut pkt = Packet::copy_from(&frame, 1).unwrap();
            pkt.set_field(field, value.clone()).unwrap();
            assert_eq!(pkt.get(field), Some(&value), "{field}");

            // The write landed in the header the summary reads from.
            pkt.calc_checksums();
            pkt.reclassify();
            assert_eq!(pkt.get(field), Some(&value), "{field} reparsed");
        }
    }
}

#[test]
fn eth_type_writes_innermost() {
    let mut pkt = Packet::copy_from(&vlan_frame(), 1).unwrap();
    pkt.set_field(FieldId::ETH_TYPE, 0x86DDu16).unwrap();
    assert_eq!(pkt.ether(0).unwrap().ether_type(), ETHER_TYPE_VLAN);
    assert_eq!(pkt.vlan(0).unwrap().ether_type(), ETHER_TYPE_IPV6);
    assert_eq!(int(&pkt, FieldId::ETH_TYPE), 0x86DD);
}

#[test]
fn failed_edits_change_nothing() {
    let frame = tcp4_frame();
    let mut pkt = Packet::copy_from(&frame, 1).unwrap();
    let before = pkt.clone();

    let cases: Vec<(Result<(), PacketError>, PacketError)> = vec![
        (
            pkt.set_field(FieldId::TCP_SRC, 70_000u32),
            PacketError::Invalid(InvalidOp::ValueTooWide {
                field: FieldId::TCP_SRC,
                max: 0xFFFF,
            }),
        ),
        (
            pkt.set_field(FieldId::IPV4_SRC, DST_MAC),
            PacketError::Invalid(InvalidOp::ValueKind {
                field: FieldId::IPV4_SRC,
                expected: FieldId::IPV4_SRC.value_kind(),
            }),
        ),
        (
            pkt.set_field(FieldId::IN_PORT, 9u32),
            PacketError::Invalid(InvalidOp::ReadOnly(FieldId::IN_PORT)),
        ),
        (
            pkt.set_field(FieldId::UDP_SRC, 9u16),
            PacketError::NotFound(Missing::Layer(FrameKind::Udp)),
        ),
        (
            pkt.pop(EncapKind::Vlan, 0),
            PacketError::NotFound(Missing::Layer(FrameKind::Vlan)),
        ),
        (
            pkt.push(EncapKind::Vlan, ETHER_TYPE_IPV4),
            PacketError::Invalid(InvalidOp::BadEtherType {
                kind: FrameKind::Vlan,
                ether_type: ETHER_TYPE_IPV4,
            }),
        ),
        (
            pkt.push(EncapKind::Ppp, PPP_PROT_IPV4),
            PacketError::NotFound(Missing::Layer(FrameKind::Pppoe)),
        ),
        (
            pkt.copy_ttl_out(),
            PacketError::NotFound(Missing::Layer(FrameKind::Mpls)),
        ),
        (
            pkt.dec_mpls_ttl(),
            PacketError::NotFound(Missing::Layer(FrameKind::Mpls)),
        ),
    ];

    for (res, err) in cases {
        assert_eq!(res, Err(err));
    }
    assert_same(&before, &pkt);
    assert!(pkt.dirty().is_empty());
}

#[test]
fn push_without_head_room() {
    let cfg = PacketConfig { head_room: 0, ..Default::default() };
    let log = Logger::root(slog::Discard, slog::o!());
    let mut pkt = Packet::new(&tcp4_frame(), 1, &cfg, log).unwrap();
    let before = pkt.clone();

    assert!(matches!(
        pkt.push(EncapKind::Vlan, ETHER_TYPE_VLAN),
        Err(PacketError::OutOfRange { .. })
    ));
    assert_same(&before, &pkt);

    let cfg = PacketConfig { max_frame_len: 16, ..Default::default() };
    let log = Logger::root(slog::Discard, slog::o!());
    assert_eq!(
        Packet::new(&tcp4_frame(), 1, &cfg, log).unwrap_err(),
        PacketError::OutOfRange { requested: 54, available: 16 }
    );
}

#[test]
fn pop_must_be_outermost() {
    let mut pkt = Packet::copy_from(&pppoe_frame(), 1).unwrap();
    pkt.push(EncapKind::Mpls, ETHER_TYPE_MPLS).unwrap();
    let before = pkt.clone();

    assert_eq!(
        pkt.pop(EncapKind::Pppoe, ETHER_TYPE_IPV4).unwrap_err(),
        PacketError::Invalid(InvalidOp::NotOutermost(FrameKind::Pppoe))
    );
    assert_same(&before, &pkt);

    pkt.pop(EncapKind::Mpls, ETHER_TYPE_PPPOE_SESS).unwrap();
    pkt.pop(EncapKind::Pppoe, ETHER_TYPE_IPV4).unwrap();
    assert_eq!(
        kinds(&pkt),
        vec![
            FrameKind::Ethernet,
            FrameKind::Ipv4,
            FrameKind::Udp,
            FrameKind::Opaque
        ]
    );
}

/// Zero the bytes at each of `offsets`, two at a time, and check that
/// recomputing every checksum restores the frame.
fn check_recompute(frame: &[u8], offsets: &[usize]) {
    let mut broken = frame.to_vec();
    for off in offsets {
        broken[*off..*off + 2].fill(0);
    }
    assert_ne!(broken, frame);

    let mut pkt = Packet::copy_from(&broken, 1).unwrap();
    pkt.calc_all_checksums();
    assert_eq!(pkt.bytes(), frame);
    assert!(pkt.dirty().is_empty());
}

#[test]
fn recompute_matches_smoltcp() {
    // IPv4 header, TCP.
    check_recompute(&tcp4_frame(), &[24, 50]);
    // UDP over IPv6.
    check_recompute(&udp6_frame(), &[60]);
    // IPv4 header, ICMPv4.
    check_recompute(&icmp4_frame(), &[24, 36]);
    // ICMPv6.
    check_recompute(&ns_frame(), &[56]);
    // IPv4 header, SCTP CRC, both halves.
    check_recompute(&sctp4_frame(), &[24, 42, 44]);
    // PPPoE length, IPv4 header, UDP.
    check_recompute(&pppoe_frame(), &[18, 32, 48]);
}

#[test]
fn edits_mark_and_fix_checksums() {
    let mut pkt = Packet::copy_from(&tcp4_frame(), 1).unwrap();
    pkt.set_field(FieldId::IPV4_SRC, ip4("192.168.0.10")).unwrap();
    pkt.set_field(FieldId::TCP_DST, 8080u16).unwrap();
    assert!(pkt.dirty().contains(DirtyChecksums::IPV4 | DirtyChecksums::TCP));
    pkt.calc_checksums();
    assert!(pkt.dirty().is_empty());

    let bytes = pkt.to_vec();
    assert!(Ipv4Packet::new_checked(&bytes[14..]).unwrap().verify_checksum());
    let tcp = TcpPacket::new_checked(&bytes[34..]).unwrap();
    assert!(tcp.verify_checksum(&v4("192.168.0.10"), &v4("10.0.0.2")));
    assert_eq!(tcp.dst_port(), 8080);

    let mut pkt = Packet::copy_from(&udp6_frame(), 1).unwrap();
    pkt.set_field(FieldId::IPV6_DST, ip6("fd00::99")).unwrap();
    pkt.set_field(FieldId::UDP_SRC, 1u16).unwrap();
    pkt.calc_checksums();
    let bytes = pkt.to_vec();
    let udp = UdpPacket::new_checked(&bytes[54..]).unwrap();
    assert!(udp.verify_checksum(&v6("fd00::1"), &v6("fd00::99")));

    let mut pkt = Packet::copy_from(&icmp4_frame(), 1).unwrap();
    pkt.set_field(FieldId::ICMPV4_TYPE, 0u8).unwrap();
    pkt.dec_nw_ttl().unwrap();
    pkt.calc_checksums();
    let bytes = pkt.to_vec();
    assert!(Ipv4Packet::new_checked(&bytes[14..]).unwrap().verify_checksum());
    assert!(Icmpv4Packet::new_checked(&bytes[34..]).unwrap().verify_checksum());
    assert_eq!(pkt.ipv4(0).unwrap().ttl, 63);
}

/// One's complement addition of two 16-bit words.
fn ones_add(a: u16, b: u16) -> u16 {
    let sum = u32::from(a) + u32::from(b);
    ((sum & 0xFFFF) + (sum >> 16)) as u16
}

#[test]
fn pseudo_header_uses_ip_proto_byte() {
    let frame = tcp4_frame();
    let orig = TcpPacket::new_checked(&frame[34..]).unwrap();
    assert!(orig.verify_checksum(&v4("10.0.0.1"), &v4("10.0.0.2")));
    let csum_tcp = orig.checksum();

    let mut pkt = Packet::copy_from(&frame, 1).unwrap();
    pkt.set_field(FieldId::IP_PROTO, PROTO_UDP).unwrap();
    assert!(pkt.dirty().contains(DirtyChecksums::IPV4 | DirtyChecksums::TCP));
    pkt.calc_checksums();

    // The chain is not re-dispatched, so the segment is still summed
    // as TCP but against a pseudo-header carrying protocol 17. That
    // sum differs from smoltcp's protocol 6 sum by exactly 11.
    let bytes = pkt.to_vec();
    assert!(Ipv4Packet::new_checked(&bytes[14..]).unwrap().verify_checksum());
    let tcp = TcpPacket::new_checked(&bytes[34..]).unwrap();
    let expected = !ones_add(!csum_tcp, u16::from(PROTO_UDP - PROTO_TCP));
    assert_eq!(tcp.checksum(), expected);
    assert_ne!(tcp.checksum(), csum_tcp);
    assert!(!tcp.verify_checksum(&v4("10.0.0.1"), &v4("10.0.0.2")));

    // Writing the protocol back restores the original checksum.
    pkt.set_field(FieldId::IP_PROTO, PROTO_TCP).unwrap();
    pkt.calc_checksums();
    assert_eq!(pkt.bytes(), frame.as_slice());
}

#[test]
fn recompute_is_idempotent() {
    for (name, frame) in all_frames() {
        let mut pkt = Packet::copy_from(&frame, 1).unwrap();
        pkt.calc_all_checksums();
        let once = pkt.to_vec();
        pkt.calc_all_checksums();
        assert_eq!(pkt.bytes(), once.as_slice(), "{name}");
    }

    let mut pkt = Packet::copy_from(&pppoe_frame(), 1).unwrap();
    pkt.push(EncapKind::Vlan, ETHER_TYPE_VLAN).unwrap();
    pkt.set_field(FieldId::IPV4_DST, ip4("10.9.9.9")).unwrap();
    pkt.calc_checksums();
    let once = pkt.to_vec();
    pkt.calc_all_checksums();
    assert_eq!(pkt.bytes(), once.as_slice());
}

#[test]
fn ttl_operations() {
    let mut pkt = Packet::copy_from(&tcp4_frame(), 1).unwrap();
    pkt.set_nw_ttl(5).unwrap();
    assert_eq!(pkt.ipv4(0).unwrap().ttl, 5);
    assert!(pkt.dirty().contains(DirtyChecksums::IPV4));
    pkt.dec_nw_ttl().unwrap();
    assert_eq!(pkt.ipv4(0).unwrap().ttl, 4);

    pkt.set_nw_ttl(0).unwrap();
    let before = pkt.clone();
    assert_eq!(
        pkt.dec_nw_ttl().unwrap_err(),
        PacketError::Invalid(InvalidOp::TtlExpired(FrameKind::Ipv4))
    );
    assert_same(&before, &pkt);

    // IP TTL copied out into a fresh label and back.
    let mut pkt = Packet::copy_from(&tcp4_frame(), 1).unwrap();
    pkt.push(EncapKind::Mpls, ETHER_TYPE_MPLS).unwrap();
    assert_eq!(pkt.mpls(0).unwrap().ttl(), 0);
    pkt.copy_ttl_out().unwrap();
    assert_eq!(pkt.mpls(0).unwrap().ttl(), 64);
    pkt.dec_mpls_ttl().unwrap();
    pkt.copy_ttl_in().unwrap();
    assert_eq!(pkt.ipv4(0).unwrap().ttl, 63);

    let mut pkt = Packet::copy_from(&mpls_frame(), 1).unwrap();
    pkt.copy_ttl_out().unwrap();
    assert_eq!(pkt.mpls(0).unwrap().ttl(), 63);
    pkt.set_mpls_ttl(200).unwrap();
    pkt.copy_ttl_in().unwrap();
    assert_eq!(pkt.mpls(1).unwrap().ttl(), 200);
    assert!(pkt.dirty().is_empty());

    let mut pkt = Packet::copy_from(&udp6_frame(), 1).unwrap();
    pkt.dec_nw_ttl().unwrap();
    assert_eq!(pkt.ipv6(0).unwrap().hop_limit, 63);

    let mut pkt = Packet::copy_from(&arp_frame(), 1).unwrap();
    assert_eq!(
        pkt.copy_ttl_in().unwrap_err(),
        PacketError::NotFound(Missing::Layer(FrameKind::Mpls))
    );
}

#[test]
fn apply_action_lists() {
    let mut pkt = Packet::copy_from(&tcp4_frame(), 1).unwrap();
    let actions = [
        Action::Push { kind: EncapKind::Vlan, ethertype: ETHER_TYPE_VLAN },
        Action::SetField { field: FieldId::VLAN_VID, value: 7u16.into() },
        Action::SetField { field: FieldId::TCP_DST, value: 8080u16.into() },
        Action::DecNwTtl,
    ];
    pkt.apply_all(&actions).unwrap();
    pkt.calc_checksums();
    assert_eq!(int(&pkt, FieldId::VLAN_VID), 7);
    assert_eq!(pkt.vlan(0).unwrap().vid(), 7);
    assert_eq!(pkt.tcp(0).unwrap().dst_port(), 8080);
    assert_eq!(pkt.ipv4(0).unwrap().ttl, 63);

    // Everything before the failing action stays applied.
    let actions = [
        Action::SetField { field: FieldId::TCP_SRC, value: 1u16.into() },
        Action::Pop { kind: EncapKind::Mpls, ethertype: ETHER_TYPE_IPV4 },
        Action::SetField { field: FieldId::TCP_SRC, value: 2u16.into() },
    ];
    assert_eq!(
        pkt.apply_all(&actions).unwrap_err(),
        PacketError::NotFound(Missing::Layer(FrameKind::Mpls))
    );
    assert_eq!(int(&pkt, FieldId::TCP_SRC), 1);
}

#[test]
fn action_list_from_toml() {
    let text = r#"
        actions = [
            { Push = { kind = "Mpls", ethertype = 0x8847 } },
            { SetField = { field = "mpls_label", value = { Int = 1000 } } },
            { SetMplsTtl = 9 },
            "CopyTtlIn",
        ]
    "#;
    let list: ActionList = toml::from_str(text).unwrap();
    assert_eq!(list.actions.len(), 4);

    let mut pkt = Packet::copy_from(&tcp4_frame(), 1).unwrap();
    pkt.apply_all(&list.actions).unwrap();
    assert_eq!(pkt.mpls(0).unwrap().label(), 1000);
    assert_eq!(pkt.ipv4(0).unwrap().ttl, 9);
}

#[test]
fn hits_against_summary() {
    let pkt = Packet::copy_from(&tcp4_frame(), 1).unwrap();
    let spec = MatchSpec::new()
        .with(FieldId::TCP_DST, FieldMatch::exact(80u16))
        .with(
            FieldId::IPV4_DST,
            FieldMatch::masked(ip4("10.0.0.0"), ip4("255.255.255.0")),
        );
    let hits = pkt.calc_hits(&spec);
    assert_eq!(hits, Hits { exact: 1, wildcard: 1, miss: 0 });
    assert!(hits.is_match());

    let spec = spec
        .with(FieldId::UDP_SRC, FieldMatch::exact(53u16))
        .with(FieldId::TCP_SRC, FieldMatch::exact(9u16));
    let hits = pkt.calc_hits(&spec);
    assert_eq!(hits, Hits { exact: 1, wildcard: 1, miss: 2 });
    assert!(!hits.is_match());
}

#[test]
fn packet_level_helpers() {
    let frame = tcp4_frame();
    let mut pkt = Packet::copy_from(&frame, 12).unwrap();
    assert_eq!(pkt.in_port(), 12);
    assert!(!pkt.no_packet_in());
    pkt.set_no_packet_in(true);
    assert!(pkt.no_packet_in());

    let mut small = [0u8; 20];
    assert_eq!(pkt.pack(&mut small), 20);
    assert_eq!(&small, &frame[..20]);
    let mut big = vec![0u8; 100];
    assert_eq!(pkt.pack(&mut big), frame.len());
    assert_eq!(&big[..frame.len()], &frame[..]);

    pkt.set_field(FieldId::METADATA, 0xFEEDu64).unwrap();
    pkt.reclassify();
    assert_eq!(int(&pkt, FieldId::METADATA), 0xFEED);

    assert_eq!(
        pkt.to_string(),
        format!("in_port=12 len={} layers=Ethernet/IPv4/TCP", frame.len())
    );
}

#[test]
fn oversized_margins_refused() {
    let log = Logger::root(slog::Discard, slog::o!());
    let cfg = PacketConfig {
        head_room: usize::MAX,
        tail_room: 1,
        ..Default::default()
    };
    assert_eq!(
        Packet::new(&tcp4_frame(), 1, &cfg, log).unwrap_err(),
        PacketError::OutOfRange {
            requested: usize::MAX,
            available: usize::MAX,
        }
    );
}
