// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

use crate::FieldId;
use crate::FieldValue;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::fmt::Display;
use core::str::FromStr;
use serde::Deserialize;
use serde::Serialize;

/// The encapsulation headers which may be pushed or popped.
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
pub enum EncapKind {
    Vlan,
    Mpls,
    Pppoe,
    Ppp,
}

impl Display for EncapKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::Vlan => "VLAN",
            Self::Mpls => "MPLS",
            Self::Pppoe => "PPPoE",
            Self::Ppp => "PPP",
        };
        write!(f, "{s}")
    }
}

impl FromStr for EncapKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vlan" => Ok(Self::Vlan),
            "mpls" => Ok(Self::Mpls),
            "pppoe" => Ok(Self::Pppoe),
            "ppp" => Ok(Self::Ppp),
            _ => Err(format!("invalid encapsulation: {s}")),
        }
    }
}

/// A single edit applied to a classified packet.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Action {
    SetField { field: FieldId, value: FieldValue },
    /// Push a header of `kind`. For VLAN, MPLS and PPPoE the ethertype
    /// names the new tag; for PPP it is the PPP protocol number.
    Push { kind: EncapKind, ethertype: u16 },
    /// Pop the outermost header of `kind`. The ethertype becomes the
    /// type of the uncovered payload (ignored for VLAN and PPP).
    Pop { kind: EncapKind, ethertype: u16 },
    SetNwTtl(u8),
    DecNwTtl,
    SetMplsTtl(u8),
    DecMplsTtl,
    CopyTtlOut,
    CopyTtlIn,
}

impl Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::SetField { field, value } => {
                write!(f, "set_field({field}={value})")
            }
            Self::Push { kind, ethertype } => {
                write!(f, "push_{kind}(0x{ethertype:04X})")
            }
            Self::Pop { kind, ethertype } => {
                write!(f, "pop_{kind}(0x{ethertype:04X})")
            }
            Self::SetNwTtl(ttl) => write!(f, "set_nw_ttl({ttl})"),
            Self::DecNwTtl => write!(f, "dec_nw_ttl"),
            Self::SetMplsTtl(ttl) => write!(f, "set_mpls_ttl({ttl})"),
            Self::DecMplsTtl => write!(f, "dec_mpls_ttl"),
            Self::CopyTtlOut => write!(f, "copy_ttl_out"),
            Self::CopyTtlIn => write!(f, "copy_ttl_in"),
        }
    }
}

/// An ordered list of actions, as stored in an action file.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ActionList {
    #[serde(default)]
    pub actions: Vec<Action>,
}
