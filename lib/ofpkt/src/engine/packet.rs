// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! The packet: a frame along with its classification.

use super::arp::ArpEthIpv4Raw;
use super::checksum::ChecksumEngine;
use super::checksum::DirtyChecksums;
use super::classify::Classifier;
use super::encap::EncapsulationEditor;
use super::ether::EtherHdrRaw;
use super::frame::FrameChain;
use super::frame::FrameKind;
use super::headers::RawHeader;
use super::icmp::IcmpHdrRaw;
use super::ip4::Ipv4HdrRaw;
use super::ip6::Ipv6HdrRaw;
use super::mpls::MplsHdrRaw;
use super::mutate::FieldMutator;
use super::ppp::PppHdrRaw;
use super::pppoe::PppoeHdrRaw;
use super::sctp::SctpHdrRaw;
use super::summary::FieldSummary;
use super::tcp::TcpHdrRaw;
use super::udp::UdpHdrRaw;
use super::vlan::VlanHdrRaw;
use crate::api::Action;
use crate::api::EncapKind;
use crate::api::FieldId;
use crate::api::FieldValue;
use crate::api::Hits;
use crate::api::MatchSpec;
use crate::api::ValueKind;
use crate::config::PacketConfig;
use crate::store::ByteStore;
use crate::store::StoreError;
use core::fmt;
use core::fmt::Display;
use itertools::Itertools;
use slog::Logger;
use thiserror::Error;

/// What a failed lookup was looking for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Missing {
    Layer(FrameKind),
    Field(FieldId),
    /// A TTL copy needs two TTL-bearing headers.
    TtlSource,
}

impl Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Layer(kind) => write!(f, "{kind} layer"),
            Self::Field(field) => write!(f, "field {field}"),
            Self::TtlSource => write!(f, "inner TTL"),
        }
    }
}

/// Why an operation was rejected.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum InvalidOp {
    #[error("{field} takes a {expected} value")]
    ValueKind { field: FieldId, expected: ValueKind },

    #[error("{field} is at most {max}")]
    ValueTooWide { field: FieldId, max: u64 },

    #[error("{0} is read-only")]
    ReadOnly(FieldId),

    #[error("{0} is not the outermost encapsulation")]
    NotOutermost(FrameKind),

    #[error("{0} is already present")]
    AlreadyPresent(FrameKind),

    #[error("{0} cannot be edited here")]
    UnsupportedKind(FrameKind),

    #[error("0x{ether_type:04X} is not valid for {kind}")]
    BadEtherType { kind: FrameKind, ether_type: u16 },

    #[error("{0} TTL is already zero")]
    TtlExpired(FrameKind),

    #[error("{0} cannot be set")]
    UnsupportedField(FieldId),
}

#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum PacketError {
    #[error("not found: {0}")]
    NotFound(Missing),

    #[error("out of range: requested {requested}, available {available}")]
    OutOfRange { requested: usize, available: usize },

    #[error("invalid: {0}")]
    Invalid(InvalidOp),

    #[error("internal error: {0}")]
    InternalError(&'static str),
}

impl PacketError {
    pub fn layer_not_found(kind: FrameKind) -> Self {
        Self::NotFound(Missing::Layer(kind))
    }
}

impl From<StoreError> for PacketError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::OutOfRange { requested, available } => {
                Self::OutOfRange { requested, available }
            }

            StoreError::TooLarge { len, max } => {
                Self::OutOfRange { requested: len, available: max }
            }

            StoreError::Overflow { head_room, tail_room } => Self::OutOfRange {
                requested: head_room.saturating_add(tail_room),
                available: usize::MAX,
            },
        }
    }
}

/// A frame, its layer chain and its field summary, kept in agreement
/// with each other by every operation.
///
/// A packet is owned by whoever is processing it; nothing here is
/// synchronized.
#[derive(Clone, Debug)]
pub struct Packet {
    store: ByteStore,
    chain: FrameChain,
    summary: FieldSummary,
    dirty: DirtyChecksums,
    in_port: u32,
    no_packet_in: bool,
    log: Logger,
}

impl Packet {
    /// Copy `bytes` into a new packet received on `in_port` and
    /// classify it.
    pub fn new(
        bytes: &[u8],
        in_port: u32,
        cfg: &PacketConfig,
        log: Logger,
    ) -> Result<Self, PacketError> {
        if bytes.len() > cfg.max_frame_len {
            return Err(PacketError::OutOfRange {
                requested: bytes.len(),
                available: cfg.max_frame_len,
            });
        }

        let store = ByteStore::from_bytes(bytes, cfg.head_room, cfg.tail_room)?;
        let (chain, summary) =
            Classifier::new(log.clone()).classify(store.frame_bytes(), in_port);

        Ok(Self {
            store,
            chain,
            summary,
            dirty: DirtyChecksums::empty(),
            in_port,
            no_packet_in: false,
            log,
        })
    }

    /// Copy `bytes` into a new packet using the default configuration
    /// and no logging.
    pub fn copy_from(bytes: &[u8], in_port: u32) -> Result<Self, PacketError> {
        Self::new(
            bytes,
            in_port,
            &PacketConfig::default(),
            Logger::root(slog::Discard, slog::o!()),
        )
    }

    /// Rebuild the chain and summary from the current frame bytes.
    ///
    /// Any `metadata` set on the packet survives.
    pub fn reclassify(&mut self) {
        let metadata = self.summary.remove(FieldId::METADATA);
        let (chain, mut summary) = Classifier::new(self.log.clone())
            .classify(self.store.frame_bytes(), self.in_port);
        if let Some(md) = metadata {
            summary.insert(FieldId::METADATA, md);
        }
        self.chain = chain;
        self.summary = summary;
    }

    pub fn chain(&self) -> &FrameChain {
        &self.chain
    }

    pub fn summary(&self) -> &FieldSummary {
        &self.summary
    }

    pub fn store(&self) -> &ByteStore {
        &self.store
    }

    /// The checksums invalidated since the last recompute.
    pub fn dirty(&self) -> DirtyChecksums {
        self.dirty
    }

    pub fn in_port(&self) -> u32 {
        self.in_port
    }

    pub fn no_packet_in(&self) -> bool {
        self.no_packet_in
    }

    /// Mark this packet as one that must not be sent to a controller.
    pub fn set_no_packet_in(&mut self, no_packet_in: bool) {
        self.no_packet_in = no_packet_in;
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        self.store.frame_bytes()
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.store.copy_all()
    }

    /// Copy the frame into `dest`, truncating to its length. Returns
    /// the number of bytes copied.
    pub fn pack(&self, dest: &mut [u8]) -> usize {
        let n = dest.len().min(self.len());
        dest[..n].copy_from_slice(&self.bytes()[..n]);
        n
    }

    /// Look up a field in the summary.
    pub fn get(&self, field: FieldId) -> Option<&FieldValue> {
        self.summary.get(field)
    }

    /// View the `i`th header of `kind`; see [`FrameChain::nth_of`].
    fn layer<H: RawHeader>(
        &self,
        kind: FrameKind,
        i: isize,
    ) -> Result<&H, PacketError> {
        let idx = self.chain.nth_of(kind, i)?;
        let span = self.chain.nodes()[idx].span();
        H::new(&self.bytes()[span.offset..span.end()])
            .map_err(|_| PacketError::InternalError("node shorter than header"))
    }

    pub fn ether(&self, i: isize) -> Result<&EtherHdrRaw, PacketError> {
        self.layer(FrameKind::Ethernet, i)
    }

    pub fn vlan(&self, i: isize) -> Result<&VlanHdrRaw, PacketError> {
        self.layer(FrameKind::Vlan, i)
    }

    pub fn mpls(&self, i: isize) -> Result<&MplsHdrRaw, PacketError> {
        self.layer(FrameKind::Mpls, i)
    }

    pub fn pppoe(&self, i: isize) -> Result<&PppoeHdrRaw, PacketError> {
        self.layer(FrameKind::Pppoe, i)
    }

    pub fn ppp(&self, i: isize) -> Result<&PppHdrRaw, PacketError> {
        self.layer(FrameKind::Ppp, i)
    }

    pub fn arpv4(&self, i: isize) -> Result<&ArpEthIpv4Raw, PacketError> {
        self.layer(FrameKind::Arpv4, i)
    }

    pub fn ipv4(&self, i: isize) -> Result<&Ipv4HdrRaw, PacketError> {
        self.layer(FrameKind::Ipv4, i)
    }

    pub fn ipv6(&self, i: isize) -> Result<&Ipv6HdrRaw, PacketError> {
        self.layer(FrameKind::Ipv6, i)
    }

    pub fn icmpv4(&self, i: isize) -> Result<&IcmpHdrRaw, PacketError> {
        self.layer(FrameKind::Icmpv4, i)
    }

    pub fn icmpv6(&self, i: isize) -> Result<&IcmpHdrRaw, PacketError> {
        self.layer(FrameKind::Icmpv6, i)
    }

    pub fn udp(&self, i: isize) -> Result<&UdpHdrRaw, PacketError> {
        self.layer(FrameKind::Udp, i)
    }

    pub fn tcp(&self, i: isize) -> Result<&TcpHdrRaw, PacketError> {
        self.layer(FrameKind::Tcp, i)
    }

    pub fn sctp(&self, i: isize) -> Result<&SctpHdrRaw, PacketError> {
        self.layer(FrameKind::Sctp, i)
    }

    /// The uninterpreted bytes at the end of the frame.
    pub fn payload(&self) -> Result<&[u8], PacketError> {
        let idx = self.chain.nth_of(FrameKind::Opaque, 0)?;
        let span = self.chain.nodes()[idx].span();
        Ok(&self.bytes()[span.offset..span.end()])
    }

    fn mutator(&mut self) -> FieldMutator<'_> {
        FieldMutator::new(
            self.store.frame_bytes_mut(),
            &self.chain,
            &mut self.summary,
            &mut self.dirty,
            &self.log,
        )
    }

    fn editor(&mut self) -> EncapsulationEditor<'_> {
        EncapsulationEditor::new(
            &mut self.store,
            &mut self.chain,
            &mut self.summary,
            &self.log,
        )
    }

    pub fn set_field(
        &mut self,
        field: FieldId,
        value: impl Into<FieldValue>,
    ) -> Result<(), PacketError> {
        self.mutator().set_field(field, value.into())
    }

    pub fn push(
        &mut self,
        kind: EncapKind,
        ether_type: u16,
    ) -> Result<(), PacketError> {
        self.editor().push(kind, ether_type)
    }

    pub fn pop(
        &mut self,
        kind: EncapKind,
        ether_type: u16,
    ) -> Result<(), PacketError> {
        self.editor().pop(kind, ether_type)
    }

    pub fn set_nw_ttl(&mut self, ttl: u8) -> Result<(), PacketError> {
        self.mutator().set_nw_ttl(ttl)
    }

    pub fn dec_nw_ttl(&mut self) -> Result<(), PacketError> {
        self.mutator().dec_nw_ttl()
    }

    pub fn set_mpls_ttl(&mut self, ttl: u8) -> Result<(), PacketError> {
        self.mutator().set_mpls_ttl(ttl)
    }

    pub fn dec_mpls_ttl(&mut self) -> Result<(), PacketError> {
        self.mutator().dec_mpls_ttl()
    }

    pub fn copy_ttl_out(&mut self) -> Result<(), PacketError> {
        self.mutator().copy_ttl_out()
    }

    pub fn copy_ttl_in(&mut self) -> Result<(), PacketError> {
        self.mutator().copy_ttl_in()
    }

    /// Recompute every checksum invalidated since the last call.
    pub fn calc_checksums(&mut self) {
        let dirty = core::mem::take(&mut self.dirty);
        ChecksumEngine::recompute(
            self.store.frame_bytes_mut(),
            &self.chain,
            dirty,
        );
    }

    /// Recompute every checksum in the frame, stale or not.
    pub fn calc_all_checksums(&mut self) {
        self.dirty = DirtyChecksums::all();
        self.calc_checksums();
    }

    /// Apply a single action.
    pub fn apply(&mut self, action: &Action) -> Result<(), PacketError> {
        slog::trace!(self.log, "apply"; "action" => %action);

        match action {
            Action::SetField { field, value } => {
                self.set_field(*field, value.clone())
            }
            Action::Push { kind, ethertype } => self.push(*kind, *ethertype),
            Action::Pop { kind, ethertype } => self.pop(*kind, *ethertype),
            Action::SetNwTtl(ttl) => self.set_nw_ttl(*ttl),
            Action::DecNwTtl => self.dec_nw_ttl(),
            Action::SetMplsTtl(ttl) => self.set_mpls_ttl(*ttl),
            Action::DecMplsTtl => self.dec_mpls_ttl(),
            Action::CopyTtlOut => self.copy_ttl_out(),
            Action::CopyTtlIn => self.copy_ttl_in(),
        }
    }

    /// Apply `actions` in order, stopping at the first failure.
    ///
    /// Actions before the failing one stay applied. Checksums are left
    /// for the caller to recompute.
    pub fn apply_all(&mut self, actions: &[Action]) -> Result<(), PacketError> {
        for action in actions {
            self.apply(action)?;
        }
        Ok(())
    }

    pub fn calc_hits(&self, spec: &MatchSpec) -> Hits {
        self.summary.calc_hits(spec)
    }

    /// Check the chain against the frame it describes.
    pub fn validate(&self) -> Result<(), PacketError> {
        self.chain.validate(self.len())
    }
}

impl Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "in_port={} len={} layers={}",
            self.in_port,
            self.len(),
            self.chain.iter().map(|n| n.kind()).join("/"),
        )
    }
}
