// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! The OXM-style field identifier space.
//!
//! A field is named by an `(OxmClass, field)` pair. The base class
//! carries the well-known OpenFlow fields with their standard numbers;
//! the PPP/PPPoE fields live in the experimenter class.

use alloc::string::String;
use core::fmt;
use core::fmt::Display;
use core::str::FromStr;
use serde::Deserialize;
use serde::Serialize;

pub const OXM_CLASS_OPENFLOW_BASIC: u16 = 0x8000;
pub const OXM_CLASS_EXPERIMENTER: u16 = 0xFFFF;

#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
pub enum OxmClass {
    OpenflowBasic,
    Experimenter,
}

impl OxmClass {
    pub const fn raw(self) -> u16 {
        match self {
            Self::OpenflowBasic => OXM_CLASS_OPENFLOW_BASIC,
            Self::Experimenter => OXM_CLASS_EXPERIMENTER,
        }
    }

    pub const fn from_raw(class: u16) -> Option<Self> {
        match class {
            OXM_CLASS_OPENFLOW_BASIC => Some(Self::OpenflowBasic),
            OXM_CLASS_EXPERIMENTER => Some(Self::Experimenter),
            _ => None,
        }
    }
}

/// The shape of the value a field holds.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValueKind {
    /// An unsigned integer no wider than `bits`.
    Int { bits: u8 },
    Mac,
    Ipv4,
    Ipv6,
    Bytes,
}

impl ValueKind {
    /// The largest integer a field of this kind may hold.
    pub const fn max_int(self) -> Option<u64> {
        match self {
            Self::Int { bits: 64 } => Some(u64::MAX),
            Self::Int { bits } => Some((1u64 << bits) - 1),
            _ => None,
        }
    }
}

impl Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Int { bits } => write!(f, "uint{bits}"),
            Self::Mac => write!(f, "MAC"),
            Self::Ipv4 => write!(f, "IPv4"),
            Self::Ipv6 => write!(f, "IPv6"),
            Self::Bytes => write!(f, "bytes"),
        }
    }
}

/// Fields of the OpenFlow basic class.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[repr(u8)]
pub enum BasicField {
    InPort = 0,
    InPhyPort = 1,
    Metadata = 2,
    EthDst = 3,
    EthSrc = 4,
    EthType = 5,
    VlanVid = 6,
    VlanPcp = 7,
    IpDscp = 8,
    IpEcn = 9,
    IpProto = 10,
    Ipv4Src = 11,
    Ipv4Dst = 12,
    TcpSrc = 13,
    TcpDst = 14,
    UdpSrc = 15,
    UdpDst = 16,
    SctpSrc = 17,
    SctpDst = 18,
    Icmpv4Type = 19,
    Icmpv4Code = 20,
    ArpOp = 21,
    ArpSpa = 22,
    ArpTpa = 23,
    ArpSha = 24,
    ArpTha = 25,
    Ipv6Src = 26,
    Ipv6Dst = 27,
    Ipv6Flabel = 28,
    Icmpv6Type = 29,
    Icmpv6Code = 30,
    Ipv6NdTarget = 31,
    Ipv6NdSll = 32,
    Ipv6NdTll = 33,
    MplsLabel = 34,
    MplsTc = 35,
}

impl BasicField {
    pub const ALL: [Self; 36] = [
        Self::InPort,
        Self::InPhyPort,
        Self::Metadata,
        Self::EthDst,
        Self::EthSrc,
        Self::EthType,
        Self::VlanVid,
        Self::VlanPcp,
        Self::IpDscp,
        Self::IpEcn,
        Self::IpProto,
        Self::Ipv4Src,
        Self::Ipv4Dst,
        Self::TcpSrc,
        Self::TcpDst,
        Self::UdpSrc,
        Self::UdpDst,
        Self::SctpSrc,
        Self::SctpDst,
        Self::Icmpv4Type,
        Self::Icmpv4Code,
        Self::ArpOp,
        Self::ArpSpa,
        Self::ArpTpa,
        Self::ArpSha,
        Self::ArpTha,
        Self::Ipv6Src,
        Self::Ipv6Dst,
        Self::Ipv6Flabel,
        Self::Icmpv6Type,
        Self::Icmpv6Code,
        Self::Ipv6NdTarget,
        Self::Ipv6NdSll,
        Self::Ipv6NdTll,
        Self::MplsLabel,
        Self::MplsTc,
    ];

    pub fn from_raw(field: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| *f as u8 == field)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::InPort => "in_port",
            Self::InPhyPort => "in_phy_port",
            Self::Metadata => "metadata",
            Self::EthDst => "eth_dst",
            Self::EthSrc => "eth_src",
            Self::EthType => "eth_type",
            Self::VlanVid => "vlan_vid",
            Self::VlanPcp => "vlan_pcp",
            Self::IpDscp => "ip_dscp",
            Self::IpEcn => "ip_ecn",
            Self::IpProto => "ip_proto",
            Self::Ipv4Src => "ipv4_src",
            Self::Ipv4Dst => "ipv4_dst",
            Self::TcpSrc => "tcp_src",
            Self::TcpDst => "tcp_dst",
            Self::UdpSrc => "udp_src",
            Self::UdpDst => "udp_dst",
            Self::SctpSrc => "sctp_src",
            Self::SctpDst => "sctp_dst",
            Self::Icmpv4Type => "icmpv4_type",
            Self::Icmpv4Code => "icmpv4_code",
            Self::ArpOp => "arp_op",
            Self::ArpSpa => "arp_spa",
            Self::ArpTpa => "arp_tpa",
            Self::ArpSha => "arp_sha",
            Self::ArpTha => "arp_tha",
            Self::Ipv6Src => "ipv6_src",
            Self::Ipv6Dst => "ipv6_dst",
            Self::Ipv6Flabel => "ipv6_flabel",
            Self::Icmpv6Type => "icmpv6_type",
            Self::Icmpv6Code => "icmpv6_code",
            Self::Ipv6NdTarget => "ipv6_nd_target",
            Self::Ipv6NdSll => "ipv6_nd_sll",
            Self::Ipv6NdTll => "ipv6_nd_tll",
            Self::MplsLabel => "mpls_label",
            Self::MplsTc => "mpls_tc",
        }
    }

    pub const fn value_kind(self) -> ValueKind {
        use ValueKind::*;

        match self {
            Self::InPort | Self::InPhyPort => Int { bits: 32 },
            Self::Metadata => Int { bits: 64 },
            Self::EthDst | Self::EthSrc => Mac,
            Self::EthType => Int { bits: 16 },
            Self::VlanVid => Int { bits: 12 },
            Self::VlanPcp => Int { bits: 3 },
            Self::IpDscp => Int { bits: 6 },
            Self::IpEcn => Int { bits: 2 },
            Self::IpProto => Int { bits: 8 },
            Self::Ipv4Src | Self::Ipv4Dst => Ipv4,
            Self::TcpSrc
            | Self::TcpDst
            | Self::UdpSrc
            | Self::UdpDst
            | Self::SctpSrc
            | Self::SctpDst => Int { bits: 16 },
            Self::Icmpv4Type | Self::Icmpv4Code => Int { bits: 8 },
            Self::ArpOp => Int { bits: 16 },
            Self::ArpSpa | Self::ArpTpa => Ipv4,
            Self::ArpSha | Self::ArpTha => Mac,
            Self::Ipv6Src | Self::Ipv6Dst => Ipv6,
            Self::Ipv6Flabel => Int { bits: 20 },
            Self::Icmpv6Type | Self::Icmpv6Code => Int { bits: 8 },
            Self::Ipv6NdTarget => Ipv6,
            Self::Ipv6NdSll | Self::Ipv6NdTll => Mac,
            Self::MplsLabel => Int { bits: 20 },
            Self::MplsTc => Int { bits: 3 },
        }
    }
}

/// PPP/PPPoE fields, carried in the experimenter class.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[repr(u8)]
pub enum ExtField {
    PppoeCode = 40,
    PppoeType = 41,
    PppoeSid = 42,
    PppProt = 43,
}

impl ExtField {
    pub const ALL: [Self; 4] =
        [Self::PppoeCode, Self::PppoeType, Self::PppoeSid, Self::PppProt];

    pub fn from_raw(field: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| *f as u8 == field)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::PppoeCode => "pppoe_code",
            Self::PppoeType => "pppoe_type",
            Self::PppoeSid => "pppoe_sid",
            Self::PppProt => "ppp_prot",
        }
    }

    pub const fn value_kind(self) -> ValueKind {
        match self {
            Self::PppoeCode => ValueKind::Int { bits: 8 },
            Self::PppoeType => ValueKind::Int { bits: 4 },
            Self::PppoeSid | Self::PppProt => ValueKind::Int { bits: 16 },
        }
    }
}

/// A canonical field identifier.
///
/// The derived ordering sorts every basic field before every
/// extension field, and by field number within a class.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[serde(try_from = "String", into = "String")]
pub enum FieldId {
    Basic(BasicField),
    Ext(ExtField),
}

impl FieldId {
    pub const IN_PORT: Self = Self::Basic(BasicField::InPort);
    pub const IN_PHY_PORT: Self = Self::Basic(BasicField::InPhyPort);
    pub const METADATA: Self = Self::Basic(BasicField::Metadata);
    pub const ETH_DST: Self = Self::Basic(BasicField::EthDst);
    pub const ETH_SRC: Self = Self::Basic(BasicField::EthSrc);
    pub const ETH_TYPE: Self = Self::Basic(BasicField::EthType);
    pub const VLAN_VID: Self = Self::Basic(BasicField::VlanVid);
    pub const VLAN_PCP: Self = Self::Basic(BasicField::VlanPcp);
    pub const IP_DSCP: Self = Self::Basic(BasicField::IpDscp);
    pub const IP_ECN: Self = Self::Basic(BasicField::IpEcn);
    pub const IP_PROTO: Self = Self::Basic(BasicField::IpProto);
    pub const IPV4_SRC: Self = Self::Basic(BasicField::Ipv4Src);
    pub const IPV4_DST: Self = Self::Basic(BasicField::Ipv4Dst);
    pub const TCP_SRC: Self = Self::Basic(BasicField::TcpSrc);
    pub const TCP_DST: Self = Self::Basic(BasicField::TcpDst);
    pub const UDP_SRC: Self = Self::Basic(BasicField::UdpSrc);
    pub const UDP_DST: Self = Self::Basic(BasicField::UdpDst);
    pub const SCTP_SRC: Self = Self::Basic(BasicField::SctpSrc);
    pub const SCTP_DST: Self = Self::Basic(BasicField::SctpDst);
    pub const ICMPV4_TYPE: Self = Self::Basic(BasicField::Icmpv4Type);
    pub const ICMPV4_CODE: Self = Self::Basic(BasicField::Icmpv4Code);
    pub const ARP_OP: Self = Self::Basic(BasicField::ArpOp);
    pub const ARP_SPA: Self = Self::Basic(BasicField::ArpSpa);
    pub const ARP_TPA: Self = Self::Basic(BasicField::ArpTpa);
    pub const ARP_SHA: Self = Self::Basic(BasicField::ArpSha);
    pub const ARP_THA: Self = Self::Basic(BasicField::ArpTha);
    pub const IPV6_SRC: Self = Self::Basic(BasicField::Ipv6Src);
    pub const IPV6_DST: Self = Self::Basic(BasicField::Ipv6Dst);
    pub const IPV6_FLABEL: Self = Self::Basic(BasicField::Ipv6Flabel);
    pub const ICMPV6_TYPE: Self = Self::Basic(BasicField::Icmpv6Type);
    pub const ICMPV6_CODE: Self = Self::Basic(BasicField::Icmpv6Code);
    pub const IPV6_ND_TARGET: Self = Self::Basic(BasicField::Ipv6NdTarget);
    pub const IPV6_ND_SLL: Self = Self::Basic(BasicField::Ipv6NdSll);
    pub const IPV6_ND_TLL: Self = Self::Basic(BasicField::Ipv6NdTll);
    pub const MPLS_LABEL: Self = Self::Basic(BasicField::MplsLabel);
    pub const MPLS_TC: Self = Self::Basic(BasicField::MplsTc);
    pub const PPPOE_CODE: Self = Self::Ext(ExtField::PppoeCode);
    pub const PPPOE_TYPE: Self = Self::Ext(ExtField::PppoeType);
    pub const PPPOE_SID: Self = Self::Ext(ExtField::PppoeSid);
    pub const PPP_PROT: Self = Self::Ext(ExtField::PppProt);

    pub const fn class(self) -> OxmClass {
        match self {
            Self::Basic(_) => OxmClass::OpenflowBasic,
            Self::Ext(_) => OxmClass::Experimenter,
        }
    }

    /// The field number within the class.
    pub const fn field(self) -> u8 {
        match self {
            Self::Basic(f) => f as u8,
            Self::Ext(f) => f as u8,
        }
    }

    pub fn from_raw(class: u16, field: u8) -> Option<Self> {
        match OxmClass::from_raw(class)? {
            OxmClass::OpenflowBasic => {
                BasicField::from_raw(field).map(Self::Basic)
            }
            OxmClass::Experimenter => ExtField::from_raw(field).map(Self::Ext),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Basic(f) => f.name(),
            Self::Ext(f) => f.name(),
        }
    }

    pub const fn value_kind(self) -> ValueKind {
        match self {
            Self::Basic(f) => f.value_kind(),
            Self::Ext(f) => f.value_kind(),
        }
    }

    /// Iterate every known field, basic class first.
    pub fn iter() -> impl Iterator<Item = FieldId> {
        BasicField::ALL
            .into_iter()
            .map(Self::Basic)
            .chain(ExtField::ALL.into_iter().map(Self::Ext))
    }
}

impl From<BasicField> for FieldId {
    fn from(field: BasicField) -> Self {
        Self::Basic(field)
    }
}

impl From<ExtField> for FieldId {
    fn from(field: ExtField) -> Self {
        Self::Ext(field)
    }
}

impl Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for FieldId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.to_ascii_lowercase().replace('-', "_");
        Self::iter()
            .find(|f| f.name() == name)
            .ok_or_else(|| format!("unknown field: {s}"))
    }
}

impl TryFrom<String> for FieldId {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<FieldId> for String {
    fn from(field: FieldId) -> String {
        String::from(field.name())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn raw_round_trip() {
        for f in FieldId::iter() {
            assert_eq!(FieldId::from_raw(f.class().raw(), f.field()), Some(f));
        }
        assert_eq!(FieldId::from_raw(OXM_CLASS_OPENFLOW_BASIC, 40), None);
        assert_eq!(FieldId::from_raw(0x0001, 0), None);
    }

    #[test]
    fn ordering() {
        assert!(FieldId::IN_PORT < FieldId::ETH_DST);
        assert!(FieldId::MPLS_TC < FieldId::PPPOE_CODE);
        assert!(FieldId::PPPOE_SID < FieldId::PPP_PROT);
    }

    #[test]
    fn names() {
        assert_eq!("tcp-src".parse::<FieldId>().unwrap(), FieldId::TCP_SRC);
        assert_eq!("PPP_PROT".parse::<FieldId>().unwrap(), FieldId::PPP_PROT);
        assert!("tcp_flags".parse::<FieldId>().is_err());
        assert_eq!(FieldId::IPV6_ND_SLL.to_string(), "ipv6_nd_sll");
    }

    #[test]
    fn widths() {
        assert_eq!(FieldId::VLAN_VID.value_kind().max_int(), Some(0xFFF));
        assert_eq!(FieldId::METADATA.value_kind().max_int(), Some(u64::MAX));
        assert_eq!(FieldId::ETH_SRC.value_kind().max_int(), None);
    }
}
