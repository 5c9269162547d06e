// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! The typed layer chain produced by classification.
//!
//! A [`FrameChain`] is an ordered sequence of [`FrameNode`]s, outermost
//! first, each covering a contiguous range of the frame. Nodes are
//! addressed by index, so "next" and "previous" are just `idx + 1` and
//! `idx - 1`. The chain never holds the bytes themselves; it only
//! describes where each layer lives.

use super::packet::PacketError;
use core::fmt;
use core::fmt::Display;
use serde::Deserialize;
use serde::Serialize;

/// A byte range within the frame, relative to its first byte.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize,
)]
pub struct Span {
    pub offset: usize,
    pub len: usize,
}

impl Span {
    pub fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    /// One past the last byte of this span.
    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}

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
pub enum FrameKind {
    Ethernet,
    Vlan,
    Mpls,
    Pppoe,
    Ppp,
    Arpv4,
    Ipv4,
    Ipv6,
    Icmpv4,
    Icmpv6,
    Udp,
    Tcp,
    Sctp,
    Opaque,
}

impl Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::Ethernet => "Ethernet",
            Self::Vlan => "VLAN",
            Self::Mpls => "MPLS",
            Self::Pppoe => "PPPoE",
            Self::Ppp => "PPP",
            Self::Arpv4 => "ARPv4",
            Self::Ipv4 => "IPv4",
            Self::Ipv6 => "IPv6",
            Self::Icmpv4 => "ICMPv4",
            Self::Icmpv6 => "ICMPv6",
            Self::Udp => "UDP",
            Self::Tcp => "TCP",
            Self::Sctp => "SCTP",
            Self::Opaque => "Opaque",
        };
        write!(f, "{s}")
    }
}

/// One recognized protocol layer.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum FrameNode {
    Ethernet(Span),
    Vlan(Span),
    Mpls(Span),
    Pppoe(Span),
    Ppp(Span),
    Arpv4(Span),
    Ipv4(Span),
    Ipv6(Span),
    Icmpv4(Span),
    Icmpv6(Span),
    Udp(Span),
    Tcp(Span),
    Sctp(Span),
    Opaque(Span),
}

impl FrameNode {
    pub fn new(kind: FrameKind, span: Span) -> Self {
        match kind {
            FrameKind::Ethernet => Self::Ethernet(span),
            FrameKind::Vlan => Self::Vlan(span),
            FrameKind::Mpls => Self::Mpls(span),
            FrameKind::Pppoe => Self::Pppoe(span),
            FrameKind::Ppp => Self::Ppp(span),
            FrameKind::Arpv4 => Self::Arpv4(span),
            FrameKind::Ipv4 => Self::Ipv4(span),
            FrameKind::Ipv6 => Self::Ipv6(span),
            FrameKind::Icmpv4 => Self::Icmpv4(span),
            FrameKind::Icmpv6 => Self::Icmpv6(span),
            FrameKind::Udp => Self::Udp(span),
            FrameKind::Tcp => Self::Tcp(span),
            FrameKind::Sctp => Self::Sctp(span),
            FrameKind::Opaque => Self::Opaque(span),
        }
    }

    pub fn kind(&self) -> FrameKind {
        match self {
            Self::Ethernet(_) => FrameKind::Ethernet,
            Self::Vlan(_) => FrameKind::Vlan,
            Self::Mpls(_) => FrameKind::Mpls,
            Self::Pppoe(_) => FrameKind::Pppoe,
            Self::Ppp(_) => FrameKind::Ppp,
            Self::Arpv4(_) => FrameKind::Arpv4,
            Self::Ipv4(_) => FrameKind::Ipv4,
            Self::Ipv6(_) => FrameKind::Ipv6,
            Self::Icmpv4(_) => FrameKind::Icmpv4,
            Self::Icmpv6(_) => FrameKind::Icmpv6,
            Self::Udp(_) => FrameKind::Udp,
            Self::Tcp(_) => FrameKind::Tcp,
            Self::Sctp(_) => FrameKind::Sctp,
            Self::Opaque(_) => FrameKind::Opaque,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::Ethernet(s)
            | Self::Vlan(s)
            | Self::Mpls(s)
            | Self::Pppoe(s)
            | Self::Ppp(s)
            | Self::Arpv4(s)
            | Self::Ipv4(s)
            | Self::Ipv6(s)
            | Self::Icmpv4(s)
            | Self::Icmpv6(s)
            | Self::Udp(s)
            | Self::Tcp(s)
            | Self::Sctp(s)
            | Self::Opaque(s) => *s,
        }
    }

    fn span_mut(&mut self) -> &mut Span {
        match self {
            Self::Ethernet(s)
            | Self::Vlan(s)
            | Self::Mpls(s)
            | Self::Pppoe(s)
            | Self::Ppp(s)
            | Self::Arpv4(s)
            | Self::Ipv4(s)
            | Self::Ipv6(s)
            | Self::Icmpv4(s)
            | Self::Icmpv6(s)
            | Self::Udp(s)
            | Self::Tcp(s)
            | Self::Sctp(s)
            | Self::Opaque(s) => s,
        }
    }
}

impl Display for FrameNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let span = self.span();
        write!(f, "{}[{}..{}]", self.kind(), span.offset, span.end())
    }
}

/// The ordered layers of a frame, outermost first.
///
/// Invariants, checked on every structural edit:
///
/// * The first node starts at offset 0.
/// * Each node starts where the previous one ends.
/// * There is at most one [`FrameKind::Opaque`] node, and it is last.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct FrameChain {
    nodes: Vec<FrameNode>,
}

impl FrameChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[FrameNode] {
        &self.nodes
    }

    pub fn iter(&self) -> impl Iterator<Item = &FrameNode> {
        self.nodes.iter()
    }

    pub fn get(&self, idx: usize) -> Option<&FrameNode> {
        self.nodes.get(idx)
    }

    pub fn first(&self) -> Option<&FrameNode> {
        self.nodes.first()
    }

    pub fn last(&self) -> Option<&FrameNode> {
        self.nodes.last()
    }

    /// The node following `idx`, if any.
    pub fn next(&self, idx: usize) -> Option<&FrameNode> {
        self.nodes.get(idx.checked_add(1)?)
    }

    /// The node preceding `idx`, if any.
    pub fn prev(&self, idx: usize) -> Option<&FrameNode> {
        self.nodes.get(idx.checked_sub(1)?)
    }

    /// The number of bytes covered by the chain.
    pub fn end(&self) -> usize {
        self.nodes.last().map(|n| n.span().end()).unwrap_or(0)
    }

    pub fn count(&self, kind: FrameKind) -> usize {
        self.nodes.iter().filter(|n| n.kind() == kind).count()
    }

    /// Index of the first node of `kind`.
    pub fn position(&self, kind: FrameKind) -> Option<usize> {
        self.nodes.iter().position(|n| n.kind() == kind)
    }

    /// Index of the last node of `kind`.
    pub fn rposition(&self, kind: FrameKind) -> Option<usize> {
        self.nodes.iter().rposition(|n| n.kind() == kind)
    }

    /// Index of the first node whose kind is one of `kinds`.
    pub fn position_any(&self, kinds: &[FrameKind]) -> Option<usize> {
        self.nodes.iter().position(|n| kinds.contains(&n.kind()))
    }

    /// Chain index of the `i`th node of `kind`.
    ///
    /// Non-negative `i` counts from the outermost instance; negative
    /// `i` counts from the innermost, `-1` being the innermost itself.
    pub fn nth_of(
        &self,
        kind: FrameKind,
        i: isize,
    ) -> Result<usize, PacketError> {
        let count = self.count(kind);
        if count == 0 {
            return Err(PacketError::layer_not_found(kind));
        }

        let n = match i {
            0.. => Some(i.unsigned_abs()),
            _ => count.checked_sub(i.unsigned_abs()),
        };
        let n = n.filter(|n| *n < count).ok_or(PacketError::OutOfRange {
            requested: i.unsigned_abs(),
            available: count,
        })?;

        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.kind() == kind)
            .nth(n)
            .map(|(idx, _)| idx)
            .ok_or(PacketError::InternalError("layer count mismatch"))
    }

    /// Append a node to the end of the chain.
    pub fn push(&mut self, node: FrameNode) -> Result<(), PacketError> {
        if node.span().offset != self.end() {
            return Err(PacketError::InternalError("node is not contiguous"));
        }

        if self.last().is_some_and(|n| n.kind() == FrameKind::Opaque) {
            return Err(PacketError::InternalError("node after opaque"));
        }

        self.nodes.push(node);
        Ok(())
    }

    /// Insert a node at index `idx`, shifting every following node
    /// back by the new node's length.
    pub fn insert(
        &mut self,
        idx: usize,
        node: FrameNode,
    ) -> Result<(), PacketError> {
        if idx > self.nodes.len() {
            return Err(PacketError::OutOfRange {
                requested: idx,
                available: self.nodes.len(),
            });
        }

        let start = match idx {
            0 => 0,
            _ => self.nodes[idx - 1].span().end(),
        };

        if node.span().offset != start {
            return Err(PacketError::InternalError("node is not contiguous"));
        }

        if node.kind() == FrameKind::Opaque && idx != self.nodes.len() {
            return Err(PacketError::InternalError("opaque must be last"));
        }

        let len = node.span().len;
        for later in &mut self.nodes[idx..] {
            later.span_mut().offset += len;
        }
        self.nodes.insert(idx, node);
        Ok(())
    }

    /// Remove the node at `idx`, pulling every following node forward
    /// by its length.
    pub fn remove(&mut self, idx: usize) -> Result<FrameNode, PacketError> {
        if idx >= self.nodes.len() {
            return Err(PacketError::OutOfRange {
                requested: idx,
                available: self.nodes.len(),
            });
        }

        let node = self.nodes.remove(idx);
        let len = node.span().len;
        for later in &mut self.nodes[idx..] {
            later.span_mut().offset -= len;
        }
        Ok(node)
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Check the chain invariants against a frame of `frame_len` bytes.
    pub fn validate(&self, frame_len: usize) -> Result<(), PacketError> {
        let mut expected = 0;
        for (i, node) in self.nodes.iter().enumerate() {
            let span = node.span();
            if span.offset != expected {
                return Err(PacketError::InternalError("chain has a gap"));
            }

            if node.kind() == FrameKind::Opaque && i + 1 != self.nodes.len() {
                return Err(PacketError::InternalError("opaque must be last"));
            }

            expected = span.end();
        }

        if expected > frame_len {
            return Err(PacketError::InternalError("chain overruns frame"));
        }

        Ok(())
    }
}

impl<'a> IntoIterator for &'a FrameChain {
    type Item = &'a FrameNode;
    type IntoIter = core::slice::Iter<'a, FrameNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}
