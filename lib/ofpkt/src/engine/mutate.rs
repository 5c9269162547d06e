// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Setting individual fields.
//!
//! Every field is owned by a layer kind, and a write always lands in the
//! outermost node of that kind, which is also the node the summary was
//! filled from. The write is mirrored into the summary and the
//! checksums it invalidates are recorded in the dirty set; nothing is
//! recomputed here.

use super::arp::ArpEthIpv4Raw;
use super::checksum::DirtyChecksums;
use super::ether::EtherHdrRaw;
use super::frame::FrameChain;
use super::frame::FrameKind;
use super::frame::Span;
use super::headers::RawHeader;
use super::icmp::IcmpHdrRaw;
use super::icmp::ND_TARGET_OFFSET;
use super::icmp::parse_nd;
use super::ip4::Ipv4HdrRaw;
use super::ip6::Ipv6HdrRaw;
use super::mpls::MplsHdrRaw;
use super::packet::InvalidOp;
use super::packet::Missing;
use super::packet::PacketError;
use super::ppp::PppHdrRaw;
use super::pppoe::PppoeHdrRaw;
use super::sctp::SctpHdrRaw;
use super::summary::FieldSummary;
use super::tcp::TcpHdrRaw;
use super::udp::UdpHdrRaw;
use super::vlan::VlanHdrRaw;
use crate::api::BasicField;
use crate::api::ExtField;
use crate::api::FieldId;
use crate::api::FieldValue;
use slog::Logger;

/// The layer kinds that can own `field`, in order of preference.
///
/// The IP-version independent fields are owned by whichever IP header
/// comes first. Metadata fields have no owning layer.
pub fn owners_of(field: FieldId) -> &'static [FrameKind] {
    use BasicField::*;

    match field {
        FieldId::Basic(f) => match f {
            InPort | InPhyPort | Metadata => &[],
            EthDst | EthSrc => &[FrameKind::Ethernet],
            EthType => &[FrameKind::Vlan, FrameKind::Ethernet],
            VlanVid | VlanPcp => &[FrameKind::Vlan],
            IpDscp | IpEcn | IpProto => &[FrameKind::Ipv4, FrameKind::Ipv6],
            Ipv4Src | Ipv4Dst => &[FrameKind::Ipv4],
            TcpSrc | TcpDst => &[FrameKind::Tcp],
            UdpSrc | UdpDst => &[FrameKind::Udp],
            SctpSrc | SctpDst => &[FrameKind::Sctp],
            Icmpv4Type | Icmpv4Code => &[FrameKind::Icmpv4],
            ArpOp | ArpSpa | ArpTpa | ArpSha | ArpTha => &[FrameKind::Arpv4],
            Ipv6Src | Ipv6Dst | Ipv6Flabel => &[FrameKind::Ipv6],
            Icmpv6Type | Icmpv6Code | Ipv6NdTarget | Ipv6NdSll
            | Ipv6NdTll => &[FrameKind::Icmpv6],
            MplsLabel | MplsTc => &[FrameKind::Mpls],
        },

        FieldId::Ext(f) => match f {
            ExtField::PppoeCode | ExtField::PppoeType | ExtField::PppoeSid => {
                &[FrameKind::Pppoe]
            }
            ExtField::PppProt => &[FrameKind::Ppp],
        },
    }
}

/// Check that `value` is acceptable for `field`.
pub fn check_value(
    field: FieldId,
    value: &FieldValue,
) -> Result<(), PacketError> {
    let kind = field.value_kind();
    if value.conforms_to(kind) {
        return Ok(());
    }

    let err = match (value, kind.max_int()) {
        (FieldValue::Int(_), Some(max)) => {
            InvalidOp::ValueTooWide { field, max }
        }
        _ => InvalidOp::ValueKind { field, expected: kind },
    };
    Err(PacketError::Invalid(err))
}

/// Applies field writes to a frame, its chain and its summary.
pub struct FieldMutator<'a> {
    pub(super) frame: &'a mut [u8],
    pub(super) chain: &'a FrameChain,
    pub(super) summary: &'a mut FieldSummary,
    pub(super) dirty: &'a mut DirtyChecksums,
    pub(super) log: &'a Logger,
}

impl<'a> FieldMutator<'a> {
    pub fn new(
        frame: &'a mut [u8],
        chain: &'a FrameChain,
        summary: &'a mut FieldSummary,
        dirty: &'a mut DirtyChecksums,
        log: &'a Logger,
    ) -> Self {
        Self { frame, chain, summary, dirty, log }
    }

    /// Locate the node that owns `field`.
    fn owner(
        &self,
        field: FieldId,
    ) -> Result<(FrameKind, Span), PacketError> {
        let owners = owners_of(field);

        // eth_type lives in the innermost L2 header.
        let idx = if field == FieldId::ETH_TYPE {
            self.chain
                .rposition(FrameKind::Vlan)
                .or_else(|| self.chain.position(FrameKind::Ethernet))
        } else {
            self.chain.position_any(owners)
        };

        let missing = owners.first().copied().unwrap_or(FrameKind::Opaque);
        let node = idx
            .and_then(|idx| self.chain.get(idx))
            .ok_or(PacketError::layer_not_found(missing))?;
        Ok((node.kind(), node.span()))
    }

    /// Write `value` into `field`.
    ///
    /// Fails with `Invalid` for read-only fields and for values of the
    /// wrong shape or width, and with `NotFound` when the owning layer
    /// (or, for ND link-layer addresses, the option) is absent. On
    /// failure the packet is left untouched.
    pub fn set_field(
        &mut self,
        field: FieldId,
        value: FieldValue,
    ) -> Result<(), PacketError> {
        if matches!(field, FieldId::IN_PORT | FieldId::IN_PHY_PORT) {
            return Err(PacketError::Invalid(InvalidOp::ReadOnly(field)));
        }

        check_value(field, &value)?;

        if field == FieldId::METADATA {
            self.summary.insert(field, value);
            return Ok(());
        }

        let (kind, span) = self.owner(field)?;
        let int = value.as_int().unwrap_or(0);
        let hdr = &mut self.frame[span.offset..span.end()];
        let internal = |_| PacketError::InternalError("bad owning header");

        match kind {
            FrameKind::Ethernet => {
                let eth = EtherHdrRaw::new_mut(hdr).map_err(internal)?;
                match (field, &value) {
                    (FieldId::ETH_DST, FieldValue::Mac(m)) => eth.set_dst(*m),
                    (FieldId::ETH_SRC, FieldValue::Mac(m)) => eth.set_src(*m),
                    _ => eth.set_ether_type(int as u16),
                }
            }

            FrameKind::Vlan => {
                let vlan = VlanHdrRaw::new_mut(hdr).map_err(internal)?;
                match field {
                    FieldId::VLAN_VID => vlan.set_vid(int as u16),
                    FieldId::VLAN_PCP => vlan.set_pcp(int as u8),
                    _ => vlan.set_ether_type(int as u16),
                }
            }

            FrameKind::Mpls => {
                let mpls = MplsHdrRaw::new_mut(hdr).map_err(internal)?;
                match field {
                    FieldId::MPLS_LABEL => mpls.set_label(int as u32),
                    _ => mpls.set_tc(int as u8),
                }
            }

            FrameKind::Pppoe => {
                let pppoe = PppoeHdrRaw::new_mut(hdr).map_err(internal)?;
                match field {
                    FieldId::PPPOE_CODE => pppoe.code = int as u8,
                    FieldId::PPPOE_TYPE => pppoe.set_ptype(int as u8),
                    _ => pppoe.set_sid(int as u16),
                }
            }

            FrameKind::Ppp => {
                let ppp = PppHdrRaw::new_mut(hdr).map_err(internal)?;
                ppp.set_protocol(int as u16);
            }

            FrameKind::Arpv4 => {
                let arp = ArpEthIpv4Raw::new_mut(hdr).map_err(internal)?;
                match (field, &value) {
                    (FieldId::ARP_SPA, FieldValue::Ipv4(ip)) => {
                        arp.spa = ip.bytes()
                    }
                    (FieldId::ARP_TPA, FieldValue::Ipv4(ip)) => {
                        arp.tpa = ip.bytes()
                    }
                    (FieldId::ARP_SHA, FieldValue::Mac(mac)) => {
                        arp.sha = mac.bytes()
                    }
                    (FieldId::ARP_THA, FieldValue::Mac(mac)) => {
                        arp.tha = mac.bytes()
                    }
                    _ => arp.op = (int as u16).to_be_bytes(),
                }
            }

            FrameKind::Ipv4 => {
                let ip = Ipv4HdrRaw::new_mut(hdr).map_err(internal)?;
                match (field, &value) {
                    (FieldId::IP_DSCP, _) => ip.set_dscp(int as u8),
                    (FieldId::IP_ECN, _) => ip.set_ecn(int as u8),
                    (FieldId::IPV4_SRC, FieldValue::Ipv4(src)) => {
                        ip.src = src.bytes()
                    }
                    (FieldId::IPV4_DST, FieldValue::Ipv4(dst)) => {
                        ip.dst = dst.bytes()
                    }
                    _ => ip.proto = int as u8,
                }

                *self.dirty |= DirtyChecksums::IPV4;
                if !matches!(field, FieldId::IP_DSCP | FieldId::IP_ECN) {
                    *self.dirty |= DirtyChecksums::UDP | DirtyChecksums::TCP;
                }
            }

            FrameKind::Ipv6 => {
                let ip = Ipv6HdrRaw::new_mut(hdr).map_err(internal)?;
                match (field, &value) {
                    (FieldId::IP_DSCP, _) => ip.set_dscp(int as u8),
                    (FieldId::IP_ECN, _) => ip.set_ecn(int as u8),
                    (FieldId::IPV6_FLABEL, _) => {
                        ip.set_flow_label(int as u32)
                    }
                    (FieldId::IPV6_SRC, FieldValue::Ipv6(src)) => {
                        ip.src = src.bytes()
                    }
                    (FieldId::IPV6_DST, FieldValue::Ipv6(dst)) => {
                        ip.dst = dst.bytes()
                    }
                    _ => ip.next_hdr = int as u8,
                }

                if matches!(
                    field,
                    FieldId::IPV6_SRC | FieldId::IPV6_DST | FieldId::IP_PROTO
                ) {
                    *self.dirty |= DirtyChecksums::UDP
                        | DirtyChecksums::TCP
                        | DirtyChecksums::ICMPV6;
                }
            }

            FrameKind::Icmpv4 => {
                let icmp = IcmpHdrRaw::new_mut(hdr).map_err(internal)?;
                match field {
                    FieldId::ICMPV4_TYPE => icmp.msg_type = int as u8,
                    _ => icmp.code = int as u8,
                }
                *self.dirty |= DirtyChecksums::ICMPV4;
            }

            FrameKind::Icmpv6 => {
                self.set_icmpv6(span, field, &value)?;
                *self.dirty |= DirtyChecksums::ICMPV6;
            }

            FrameKind::Udp => {
                let udp = UdpHdrRaw::new_mut(hdr).map_err(internal)?;
                let port = (int as u16).to_be_bytes();
                match field {
                    FieldId::UDP_SRC => udp.src_port = port,
                    _ => udp.dst_port = port,
                }
                *self.dirty |= DirtyChecksums::UDP;
            }

            FrameKind::Tcp => {
                let tcp = TcpHdrRaw::new_mut(hdr).map_err(internal)?;
                let port = (int as u16).to_be_bytes();
                match field {
                    FieldId::TCP_SRC => tcp.src_port = port,
                    _ => tcp.dst_port = port,
                }
                *self.dirty |= DirtyChecksums::TCP;
            }

            FrameKind::Sctp => {
                let sctp = SctpHdrRaw::new_mut(hdr).map_err(internal)?;
                let port = (int as u16).to_be_bytes();
                match field {
                    FieldId::SCTP_SRC => sctp.src_port = port,
                    _ => sctp.dst_port = port,
                }
                *self.dirty |= DirtyChecksums::SCTP;
            }

            FrameKind::Opaque => {
                return Err(PacketError::Invalid(
                    InvalidOp::UnsupportedField(field),
                ));
            }
        }

        slog::debug!(
            self.log,
            "set field";
            "field" => %field,
            "value" => %value,
            "layer" => %kind,
            "offset" => span.offset,
        );

        self.summary.insert(field, value);
        Ok(())
    }

    fn set_icmpv6(
        &mut self,
        span: Span,
        field: FieldId,
        value: &FieldValue,
    ) -> Result<(), PacketError> {
        let msg = &mut self.frame[span.offset..span.end()];

        match (field, value) {
            (FieldId::ICMPV6_TYPE, FieldValue::Int(ty)) => msg[0] = *ty as u8,
            (FieldId::ICMPV6_CODE, FieldValue::Int(code)) => {
                msg[1] = *code as u8
            }

            (FieldId::IPV6_ND_TARGET, FieldValue::Ipv6(target)) => {
                parse_nd(msg)
                    .ok_or(PacketError::NotFound(Missing::Field(field)))?;
                let off = ND_TARGET_OFFSET;
                msg[off..off + 16].copy_from_slice(&target.bytes());
            }

            (
                FieldId::IPV6_ND_SLL | FieldId::IPV6_ND_TLL,
                FieldValue::Mac(mac),
            ) => {
                let nd = parse_nd(msg)
                    .ok_or(PacketError::NotFound(Missing::Field(field)))?;
                let opt = match field {
                    FieldId::IPV6_ND_SLL => nd.sll,
                    _ => nd.tll,
                };
                let opt =
                    opt.ok_or(PacketError::NotFound(Missing::Field(field)))?;
                msg[opt.offset..opt.offset + 6].copy_from_slice(&mac.bytes());
            }

            _ => {
                return Err(PacketError::Invalid(InvalidOp::ValueKind {
                    field,
                    expected: field.value_kind(),
                }));
            }
        }

        Ok(())
    }
}
