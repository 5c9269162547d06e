// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! TTL manipulation for MPLS labels and IP headers.

use super::checksum::DirtyChecksums;
use super::frame::FrameKind;
use super::frame::Span;
use super::mutate::FieldMutator;
use super::packet::InvalidOp;
use super::packet::Missing;
use super::packet::PacketError;

const TTL_KINDS: [FrameKind; 3] =
    [FrameKind::Mpls, FrameKind::Ipv4, FrameKind::Ipv6];

/// Offset of the TTL (or hop limit) byte within a header of `kind`.
fn ttl_offset(kind: FrameKind) -> Option<usize> {
    match kind {
        FrameKind::Mpls => Some(3),
        FrameKind::Ipv4 => Some(8),
        FrameKind::Ipv6 => Some(7),
        _ => None,
    }
}

impl FieldMutator<'_> {
    fn ttl_at(&self, span: Span, kind: FrameKind) -> Result<u8, PacketError> {
        let off = ttl_offset(kind)
            .ok_or(PacketError::InternalError("no TTL in layer"))?;
        Ok(self.frame[span.offset + off])
    }

    fn write_ttl(
        &mut self,
        span: Span,
        kind: FrameKind,
        ttl: u8,
    ) -> Result<(), PacketError> {
        let off = ttl_offset(kind)
            .ok_or(PacketError::InternalError("no TTL in layer"))?;
        self.frame[span.offset + off] = ttl;
        if kind == FrameKind::Ipv4 {
            *self.dirty |= DirtyChecksums::IPV4;
        }

        slog::debug!(
            self.log,
            "set ttl";
            "layer" => %kind,
            "offset" => span.offset,
            "ttl" => ttl,
        );
        Ok(())
    }

    /// The outermost node of one of `kinds`.
    fn first_of(
        &self,
        kinds: &[FrameKind],
    ) -> Result<(FrameKind, Span), PacketError> {
        let node = self
            .chain
            .position_any(kinds)
            .and_then(|idx| self.chain.get(idx))
            .ok_or(PacketError::layer_not_found(kinds[0]))?;
        Ok((node.kind(), node.span()))
    }

    /// The outermost and next-to-outermost TTL-bearing nodes. The
    /// outermost must be an MPLS label.
    fn ttl_pair(
        &self,
    ) -> Result<((FrameKind, Span), (FrameKind, Span)), PacketError> {
        let mut ttls = self
            .chain
            .iter()
            .filter(|n| TTL_KINDS.contains(&n.kind()))
            .map(|n| (n.kind(), n.span()));

        let outer = ttls
            .next()
            .filter(|(kind, _)| *kind == FrameKind::Mpls)
            .ok_or_else(|| match self.chain.count(FrameKind::Mpls) {
                0 => PacketError::layer_not_found(FrameKind::Mpls),
                _ => PacketError::Invalid(InvalidOp::NotOutermost(
                    FrameKind::Mpls,
                )),
            })?;
        let inner =
            ttls.next().ok_or(PacketError::NotFound(Missing::TtlSource))?;
        Ok((outer, inner))
    }

    fn dec(&mut self, kinds: &[FrameKind]) -> Result<(), PacketError> {
        let (kind, span) = self.first_of(kinds)?;
        let ttl = self.ttl_at(span, kind)?;
        let ttl = ttl
            .checked_sub(1)
            .ok_or(PacketError::Invalid(InvalidOp::TtlExpired(kind)))?;
        self.write_ttl(span, kind, ttl)
    }

    /// Set the TTL of the outermost IPv4 header, or hop limit of the
    /// outermost IPv6 header.
    pub fn set_nw_ttl(&mut self, ttl: u8) -> Result<(), PacketError> {
        let (kind, span) =
            self.first_of(&[FrameKind::Ipv4, FrameKind::Ipv6])?;
        self.write_ttl(span, kind, ttl)
    }

    pub fn dec_nw_ttl(&mut self) -> Result<(), PacketError> {
        self.dec(&[FrameKind::Ipv4, FrameKind::Ipv6])
    }

    /// Set the TTL of the outermost MPLS label.
    pub fn set_mpls_ttl(&mut self, ttl: u8) -> Result<(), PacketError> {
        let (kind, span) = self.first_of(&[FrameKind::Mpls])?;
        self.write_ttl(span, kind, ttl)
    }

    pub fn dec_mpls_ttl(&mut self) -> Result<(), PacketError> {
        self.dec(&[FrameKind::Mpls])
    }

    /// Copy the TTL of the next-to-outermost TTL-bearing header
    /// (MPLS label or IP header) outward into the outermost MPLS label.
    pub fn copy_ttl_out(&mut self) -> Result<(), PacketError> {
        let ((okind, ospan), (ikind, ispan)) = self.ttl_pair()?;
        let ttl = self.ttl_at(ispan, ikind)?;
        self.write_ttl(ospan, okind, ttl)
    }

    /// Copy the TTL of the outermost MPLS label inward to the next
    /// label or IP header.
    pub fn copy_ttl_in(&mut self) -> Result<(), PacketError> {
        let ((okind, ospan), (ikind, ispan)) = self.ttl_pair()?;
        let ttl = self.ttl_at(ospan, okind)?;
        self.write_ttl(ispan, ikind, ttl)
    }
}
