// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Pushing and popping encapsulation headers.
//!
//! New headers are made room for by growing the frame into the
//! head-room: the bytes in front of the insertion point slide toward
//! the start of the buffer and everything after it stays put. Popping
//! does the reverse. Either way, the frame is only touched once every
//! precondition has been checked, so a failed edit changes nothing.

use super::classify::refresh_eth_type;
use super::classify::resummarize;
use super::ether::*;
use super::frame::FrameChain;
use super::frame::FrameKind;
use super::frame::FrameNode;
use super::frame::Span;
use super::headers::RawHeader;
use super::mpls::MplsHdrRaw;
use super::packet::InvalidOp;
use super::packet::PacketError;
use super::ppp::PppHdrRaw;
use super::ppp::ppp_protocol_for;
use super::pppoe::PppoeHdrRaw;
use super::pppoe::PPPOE_CODE_PADI;
use super::pppoe::PPPOE_CODE_SESSION;
use super::summary::FieldSummary;
use super::vlan::VlanHdrRaw;
use crate::api::EncapKind;
use crate::store::ByteStore;
use slog::Logger;
use zerocopy::IntoBytes;

impl From<EncapKind> for FrameKind {
    fn from(kind: EncapKind) -> Self {
        match kind {
            EncapKind::Vlan => Self::Vlan,
            EncapKind::Mpls => Self::Mpls,
            EncapKind::Pppoe => Self::Pppoe,
            EncapKind::Ppp => Self::Ppp,
        }
    }
}

fn internal(msg: &'static str) -> PacketError {
    PacketError::InternalError(msg)
}

/// Is `ether_type` a valid type for a pushed header of `kind`?
fn valid_push_type(kind: EncapKind, ether_type: u16) -> bool {
    let et = EtherType::from(ether_type);
    match kind {
        EncapKind::Vlan => et.is_vlan(),
        EncapKind::Mpls => et.is_mpls(),
        EncapKind::Pppoe => et.is_pppoe(),
        // The PPP protocol is not an ethertype.
        EncapKind::Ppp => true,
    }
}

/// Performs structural edits on a frame, its chain and its summary.
pub struct EncapsulationEditor<'a> {
    store: &'a mut ByteStore,
    chain: &'a mut FrameChain,
    summary: &'a mut FieldSummary,
    log: &'a Logger,
}

impl<'a> EncapsulationEditor<'a> {
    pub fn new(
        store: &'a mut ByteStore,
        chain: &'a mut FrameChain,
        summary: &'a mut FieldSummary,
        log: &'a Logger,
    ) -> Self {
        Self { store, chain, summary, log }
    }

    /// Index just past the L2 headers: Ethernet and any VLAN tags.
    ///
    /// MPLS and PPPoE headers are pushed here, and must sit here to be
    /// popped.
    fn l2_end(&self) -> Result<usize, PacketError> {
        match self.chain.first() {
            Some(FrameNode::Ethernet(_)) => (),
            _ => return Err(PacketError::layer_not_found(FrameKind::Ethernet)),
        }

        Ok(self.chain.rposition(FrameKind::Vlan).map(|i| i + 1).unwrap_or(1))
    }

    fn span(&self, idx: usize) -> Result<Span, PacketError> {
        self.chain
            .get(idx)
            .map(|n| n.span())
            .ok_or(internal("missing node"))
    }

    /// Read the type field of the L2 header (Ethernet or VLAN) at
    /// chain index `idx`. It is always the last two bytes.
    fn l2_type(&self, idx: usize) -> Result<u16, PacketError> {
        let end = self.span(idx)?.end();
        let frame = self.store.frame_bytes();
        Ok(u16::from_be_bytes([frame[end - 2], frame[end - 1]]))
    }

    fn set_l2_type(
        &mut self,
        idx: usize,
        ether_type: u16,
    ) -> Result<(), PacketError> {
        let end = self.span(idx)?.end();
        let frame = self.store.frame_bytes_mut();
        frame[end - 2..end].copy_from_slice(&ether_type.to_be_bytes());
        Ok(())
    }

    /// Rewrite the length of the PPPoE header at `idx` to cover the
    /// rest of the frame.
    fn fix_pppoe_len(&mut self, idx: usize) -> Result<(), PacketError> {
        let span = self.span(idx)?;
        let payload = self.store.len() - (span.offset + PppoeHdrRaw::SIZE);
        let len = u16::try_from(payload).unwrap_or(u16::MAX);
        let frame = self.store.frame_bytes_mut();
        let pppoe = PppoeHdrRaw::new_mut(&mut frame[span.offset..span.end()])
            .map_err(|_| internal("bad PPPoE header"))?;
        pppoe.set_length(len);
        Ok(())
    }

    /// Insert the headers in `layers`, in order, starting at chain
    /// index `idx`.
    fn insert_layers(
        &mut self,
        idx: usize,
        layers: &[(FrameKind, &[u8])],
    ) -> Result<(), PacketError> {
        let offset = match idx {
            0 => 0,
            _ => self.span(idx - 1)?.end(),
        };
        let total = layers.iter().map(|(_, b)| b.len()).sum();
        self.store.insert_gap(offset, total)?;

        let mut off = offset;
        for (i, (kind, bytes)) in layers.iter().enumerate() {
            let frame = self.store.frame_bytes_mut();
            frame[off..off + bytes.len()].copy_from_slice(bytes);
            let node = FrameNode::new(*kind, Span::new(off, bytes.len()));
            self.chain.insert(idx + i, node)?;
            off += bytes.len();
        }

        Ok(())
    }

    /// Remove `count` nodes starting at chain index `idx`, along with
    /// their bytes.
    fn remove_layers(
        &mut self,
        idx: usize,
        count: usize,
    ) -> Result<(), PacketError> {
        let offset = self.span(idx)?.offset;
        let mut total = 0;
        for i in idx..idx + count {
            total += self.span(i)?.len;
        }

        self.store.remove_gap(offset, total)?;
        for _ in 0..count {
            self.chain.remove(idx)?;
        }
        Ok(())
    }

    fn refresh(&mut self, kinds: &[FrameKind]) {
        let frame = self.store.frame_bytes();
        for kind in kinds {
            resummarize(frame, self.chain, *kind, self.summary);
        }
        refresh_eth_type(frame, self.chain, self.summary);
    }

    /// Push a new outermost header of `kind`.
    ///
    /// A VLAN tag goes directly after Ethernet; an MPLS label or PPPoE
    /// header goes after the last VLAN tag. The new header takes over
    /// the type carried by the L2 header in front of it, which is then
    /// rewritten to `ether_type`. A pushed VLAN tag or MPLS label
    /// inherits the values of the current outermost one, if any.
    ///
    /// A frame carries at most one PPPoE header. A session push brings
    /// a PPP header for the displaced type and a length covering the
    /// rest of the frame. A discovery push writes a bare PADI header
    /// with no tags.
    ///
    /// For [`EncapKind::Ppp`] `ether_type` is the PPP protocol, and
    /// the packet must be a PPPoE session without a PPP header.
    pub fn push(
        &mut self,
        kind: EncapKind,
        ether_type: u16,
    ) -> Result<(), PacketError> {
        if !valid_push_type(kind, ether_type) {
            return Err(PacketError::Invalid(InvalidOp::BadEtherType {
                kind: kind.into(),
                ether_type,
            }));
        }

        let l2_end = self.l2_end()?;

        match kind {
            EncapKind::Vlan => {
                let inner = self.l2_type(0)?;
                let (pcp, vid) = match self.chain.position(FrameKind::Vlan) {
                    Some(idx) => {
                        let span = self.span(idx)?;
                        let frame = self.store.frame_bytes();
                        let tag = VlanHdrRaw::new(&frame[span.offset..])
                            .map_err(|_| internal("bad VLAN"))?;
                        (tag.pcp(), tag.vid())
                    }
                    None => (0, 0),
                };

                let tag = VlanHdrRaw::new_hdr(pcp, vid, inner);
                self.insert_layers(1, &[(FrameKind::Vlan, tag.as_bytes())])?;
                self.set_l2_type(0, ether_type)?;
                self.refresh(&[FrameKind::Vlan]);
            }

            EncapKind::Mpls => {
                let label = match self.chain.get(l2_end) {
                    Some(FrameNode::Mpls(span)) => {
                        let frame = self.store.frame_bytes();
                        let outer = MplsHdrRaw::new(&frame[span.offset..])
                            .map_err(|_| internal("bad MPLS"))?;
                        MplsHdrRaw::new_hdr(
                            outer.label(),
                            outer.tc(),
                            false,
                            outer.ttl(),
                        )
                    }
                    _ => MplsHdrRaw::new_hdr(0, 0, true, 0),
                };

                self.insert_layers(
                    l2_end,
                    &[(FrameKind::Mpls, label.as_bytes())],
                )?;
                self.set_l2_type(l2_end - 1, ether_type)?;
                self.refresh(&[FrameKind::Mpls]);
            }

            EncapKind::Pppoe => {
                if self.chain.position(FrameKind::Pppoe).is_some() {
                    return Err(PacketError::Invalid(
                        InvalidOp::AlreadyPresent(FrameKind::Pppoe),
                    ));
                }

                let inner = self.l2_type(l2_end - 1)?;
                let session = ether_type == ETHER_TYPE_PPPOE_SESS;

                if session {
                    let pppoe =
                        PppoeHdrRaw::new_hdr(PPPOE_CODE_SESSION, 0, 0);
                    let proto = ppp_protocol_for(inner).ok_or(
                        PacketError::Invalid(InvalidOp::BadEtherType {
                            kind: FrameKind::Ppp,
                            ether_type: inner,
                        }),
                    )?;
                    let ppp = PppHdrRaw::new_hdr(proto);
                    self.insert_layers(
                        l2_end,
                        &[
                            (FrameKind::Pppoe, pppoe.as_bytes()),
                            (FrameKind::Ppp, ppp.as_bytes()),
                        ],
                    )?;
                    self.fix_pppoe_len(l2_end)?;
                } else {
                    let pppoe = PppoeHdrRaw::new_hdr(PPPOE_CODE_PADI, 0, 0);
                    self.insert_layers(
                        l2_end,
                        &[(FrameKind::Pppoe, pppoe.as_bytes())],
                    )?;
                }

                self.set_l2_type(l2_end - 1, ether_type)?;
                self.refresh(&[FrameKind::Pppoe, FrameKind::Ppp]);
            }

            EncapKind::Ppp => {
                let idx = self.session_pppoe(l2_end)?;
                let has_ppp = self
                    .chain
                    .next(idx)
                    .is_some_and(|n| n.kind() == FrameKind::Ppp);
                if has_ppp {
                    return Err(PacketError::Invalid(
                        InvalidOp::UnsupportedKind(FrameKind::Ppp),
                    ));
                }

                let ppp = PppHdrRaw::new_hdr(ether_type);
                self.insert_layers(
                    idx + 1,
                    &[(FrameKind::Ppp, ppp.as_bytes())],
                )?;
                self.fix_pppoe_len(idx)?;
                self.refresh(&[FrameKind::Pppoe, FrameKind::Ppp]);
            }
        }

        slog::debug!(
            self.log,
            "push";
            "kind" => %kind,
            "ether_type" => %EtherType::from(ether_type),
            "head_room" => self.store.head_room(),
        );
        Ok(())
    }

    /// The chain index of the outermost PPPoE header, which must be a
    /// session header sitting right after the L2 headers.
    fn session_pppoe(&self, l2_end: usize) -> Result<usize, PacketError> {
        let idx = self
            .chain
            .position(FrameKind::Pppoe)
            .ok_or(PacketError::layer_not_found(FrameKind::Pppoe))?;

        if idx != l2_end || self.l2_type(l2_end - 1)? != ETHER_TYPE_PPPOE_SESS {
            return Err(PacketError::Invalid(InvalidOp::UnsupportedKind(
                FrameKind::Ppp,
            )));
        }

        Ok(idx)
    }

    /// Pop the outermost header of `kind`.
    ///
    /// The header must be the outermost encapsulation of its kind: the
    /// first VLAN tag directly after Ethernet, or the first MPLS label
    /// or PPPoE header directly after the L2 headers. The L2 header in
    /// front of it takes `ether_type` as its new type, except when
    /// popping a VLAN tag, whose own inner type is restored. Popping a
    /// PPPoE session also pops its PPP header, and popping PPP leaves
    /// the PPPoE header in place.
    pub fn pop(
        &mut self,
        kind: EncapKind,
        ether_type: u16,
    ) -> Result<(), PacketError> {
        let fkind = FrameKind::from(kind);
        let first = self
            .chain
            .position(fkind)
            .ok_or(PacketError::layer_not_found(fkind))?;
        let l2_end = self.l2_end()?;
        let not_outer = PacketError::Invalid(InvalidOp::NotOutermost(fkind));

        match kind {
            EncapKind::Vlan => {
                if first != 1 {
                    return Err(not_outer);
                }

                let inner = self.l2_type(first)?;
                self.remove_layers(first, 1)?;
                self.set_l2_type(0, inner)?;
                self.refresh(&[FrameKind::Vlan]);
            }

            EncapKind::Mpls => {
                if first != l2_end {
                    return Err(not_outer);
                }

                self.remove_layers(first, 1)?;
                self.set_l2_type(l2_end - 1, ether_type)?;
                self.refresh(&[FrameKind::Mpls]);
            }

            EncapKind::Pppoe => {
                if first != l2_end {
                    return Err(not_outer);
                }

                let with_ppp = self
                    .chain
                    .next(first)
                    .is_some_and(|n| n.kind() == FrameKind::Ppp);
                self.remove_layers(first, if with_ppp { 2 } else { 1 })?;
                self.set_l2_type(l2_end - 1, ether_type)?;
                self.refresh(&[FrameKind::Pppoe, FrameKind::Ppp]);
            }

            EncapKind::Ppp => {
                let pppoe = self.session_pppoe(l2_end)?;
                if first != pppoe + 1 {
                    return Err(not_outer);
                }

                self.remove_layers(first, 1)?;
                self.fix_pppoe_len(pppoe)?;
                self.refresh(&[FrameKind::Pppoe, FrameKind::Ppp]);
            }
        }

        slog::debug!(
            self.log,
            "pop";
            "kind" => %kind,
            "ether_type" => %EtherType::from(ether_type),
            "head_room" => self.store.head_room(),
        );
        Ok(())
    }
}
