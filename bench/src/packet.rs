// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! The frames each benchmark is run over.

use ofpkt_test_utils::*;

/// A frame shape to benchmark.
#[derive(Clone, Copy, Debug)]
pub enum BenchFrame {
    Tcp4,
    Udp6,
    Mpls,
    PppoeSession,
    NeighborSolicit,
    Sctp4,
}

impl BenchFrame {
    pub const ALL: [Self; 6] = [
        Self::Tcp4,
        Self::Udp6,
        Self::Mpls,
        Self::PppoeSession,
        Self::NeighborSolicit,
        Self::Sctp4,
    ];

    /// Label for the benchmark instance.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Tcp4 => "Eth/IPv4/TCP",
            Self::Udp6 => "Eth/IPv6/UDP",
            Self::Mpls => "Eth/MPLS/MPLS",
            Self::PppoeSession => "Eth/PPPoE/PPP/IPv4/UDP",
            Self::NeighborSolicit => "Eth/IPv6/ICMPv6-NS",
            Self::Sctp4 => "Eth/IPv4/SCTP",
        }
    }

    pub fn bytes(&self) -> Vec<u8> {
        match self {
            Self::Tcp4 => tcp4_frame(),
            Self::Udp6 => udp6_frame(),
            Self::Mpls => mpls_frame(),
            Self::PppoeSession => pppoe_frame(),
            Self::NeighborSolicit => ns_frame(),
            Self::Sctp4 => sctp4_frame(),
        }
    }

    pub fn packet(&self) -> Packet {
        Packet::copy_from(&self.bytes(), 1).unwrap()
    }

    /// A write which changes the checksums the frame carries.
    pub fn rewrite(&self) -> (FieldId, FieldValue) {
        match self {
            Self::Tcp4 => (FieldId::TCP_DST, 8080u16.into()),
            Self::Udp6 | Self::NeighborSolicit => {
                (FieldId::IPV6_DST, ip6("fd00::99").into())
            }
            Self::Mpls => (FieldId::MPLS_LABEL, 1000u32.into()),
            Self::PppoeSession => {
                (FieldId::IPV4_DST, ip4("192.168.1.9").into())
            }
            Self::Sctp4 => (FieldId::SCTP_DST, 6000u16.into()),
        }
    }
}
