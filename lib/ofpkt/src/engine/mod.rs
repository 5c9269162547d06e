// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! The classification and editing engine.

pub mod arp;
pub mod checksum;
pub mod classify;
pub mod encap;
pub mod ether;
pub mod frame;
pub mod headers;
pub mod icmp;
pub mod ip4;
pub mod ip6;
pub mod mpls;
pub mod mutate;
pub mod packet;
pub mod ppp;
pub mod pppoe;
pub mod sctp;
pub mod summary;
pub mod tcp;
mod ttl;
pub mod udp;
pub mod vlan;

pub use checksum::DirtyChecksums;
pub use classify::Classifier;
pub use frame::FrameChain;
pub use frame::FrameKind;
pub use frame::FrameNode;
pub use frame::Span;
pub use packet::InvalidOp;
pub use packet::Missing;
pub use packet::Packet;
pub use packet::PacketError;
pub use summary::FieldSummary;
