// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! The field summary: extracted header values keyed by OXM field.

use super::frame::FrameKind;
use crate::api::FieldId;
use crate::api::FieldValue;
use crate::api::Hits;
use crate::api::MatchSpec;
use core::fmt;
use core::fmt::Display;
use itertools::Itertools;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;

/// A sparse map from field to value.
///
/// For each layer kind only the outermost instance contributes its
/// fields, with the exception of `eth_type`, which always holds the
/// type carried by the innermost L2 header.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct FieldSummary {
    fields: BTreeMap<FieldId, FieldValue>,
}

impl FieldSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `field`, replacing any existing value.
    pub fn insert(&mut self, field: FieldId, value: impl Into<FieldValue>) {
        self.fields.insert(field, value.into());
    }

    /// Set `field` only if it has no value yet.
    pub fn insert_first(
        &mut self,
        field: FieldId,
        value: impl Into<FieldValue>,
    ) {
        self.fields.entry(field).or_insert_with(|| value.into());
    }

    pub fn get(&self, field: FieldId) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    /// Get the value of an integer field.
    pub fn get_int(&self, field: FieldId) -> Option<u64> {
        self.get(field).and_then(FieldValue::as_int)
    }

    pub fn contains(&self, field: FieldId) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn remove(&mut self, field: FieldId) -> Option<FieldValue> {
        self.fields.remove(&field)
    }

    /// Remove every field populated by a layer of `kind`.
    pub fn remove_kind(&mut self, kind: FrameKind) {
        for field in fields_of(kind) {
            self.fields.remove(field);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldId, &FieldValue)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    /// Count how each entry of `spec` fares against this summary.
    ///
    /// * A field absent from the summary is a miss.
    /// * A masked entry that agrees under its mask is a wildcard hit.
    /// * An unmasked entry that agrees exactly is an exact hit.
    /// * Anything else is a miss.
    pub fn calc_hits(&self, spec: &MatchSpec) -> Hits {
        let mut hits = Hits::default();

        for (field, m) in spec.iter() {
            let hit = self.get(*field).map(|val| match &m.mask {
                Some(mask) => (m.value.masked_eq(val, mask), false),
                None => (m.value == *val, true),
            });

            match hit {
                Some((true, true)) => hits.exact += 1,
                Some((true, false)) => hits.wildcard += 1,
                _ => hits.miss += 1,
            }
        }

        hits
    }
}

impl Display for FieldSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            self.fields.iter().map(|(k, v)| format!("{k}={v}")).join(",")
        )
    }
}

/// The fields a layer of `kind` contributes to the summary.
///
/// The IP-version independent fields (`ip_dscp`, `ip_ecn`, `ip_proto`)
/// are listed for both IPv4 and IPv6.
pub fn fields_of(kind: FrameKind) -> &'static [FieldId] {
    use FrameKind::*;

    match kind {
        Ethernet => &[FieldId::ETH_DST, FieldId::ETH_SRC, FieldId::ETH_TYPE],
        Vlan => &[FieldId::VLAN_VID, FieldId::VLAN_PCP],
        Mpls => &[FieldId::MPLS_LABEL, FieldId::MPLS_TC],
        Pppoe => {
            &[FieldId::PPPOE_CODE, FieldId::PPPOE_TYPE, FieldId::PPPOE_SID]
        }
        Ppp => &[FieldId::PPP_PROT],
        Arpv4 => &[
            FieldId::ARP_OP,
            FieldId::ARP_SPA,
            FieldId::ARP_TPA,
            FieldId::ARP_SHA,
            FieldId::ARP_THA,
        ],
        Ipv4 => &[
            FieldId::IP_DSCP,
            FieldId::IP_ECN,
            FieldId::IP_PROTO,
            FieldId::IPV4_SRC,
            FieldId::IPV4_DST,
        ],
        Ipv6 => &[
            FieldId::IP_DSCP,
            FieldId::IP_ECN,
            FieldId::IP_PROTO,
            FieldId::IPV6_SRC,
            FieldId::IPV6_DST,
            FieldId::IPV6_FLABEL,
        ],
        Icmpv4 => &[FieldId::ICMPV4_TYPE, FieldId::ICMPV4_CODE],
        Icmpv6 => &[
            FieldId::ICMPV6_TYPE,
            FieldId::ICMPV6_CODE,
            FieldId::IPV6_ND_TARGET,
            FieldId::IPV6_ND_SLL,
            FieldId::IPV6_ND_TLL,
        ],
        Udp => &[FieldId::UDP_SRC, FieldId::UDP_DST],
        Tcp => &[FieldId::TCP_SRC, FieldId::TCP_DST],
        Sctp => &[FieldId::SCTP_SRC, FieldId::SCTP_DST],
        Opaque => &[],
    }
}
