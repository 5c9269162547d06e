// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Candidate match specifications, as handed to the engine by an
//! external flow table.

use crate::FieldId;
use crate::FieldValue;
use alloc::collections::BTreeMap;
use core::fmt;
use core::fmt::Display;
use serde::Deserialize;
use serde::Serialize;

/// A single field of a match, optionally masked.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct FieldMatch {
    pub value: FieldValue,
    pub mask: Option<FieldValue>,
}

impl FieldMatch {
    pub fn exact(value: impl Into<FieldValue>) -> Self {
        Self { value: value.into(), mask: None }
    }

    pub fn masked(
        value: impl Into<FieldValue>,
        mask: impl Into<FieldValue>,
    ) -> Self {
        Self { value: value.into(), mask: Some(mask.into()) }
    }
}

/// A set of field matches keyed by field.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct MatchSpec {
    entries: BTreeMap<FieldId, FieldMatch>,
}

impl MatchSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the match for `field`.
    pub fn with(mut self, field: FieldId, m: FieldMatch) -> Self {
        self.entries.insert(field, m);
        self
    }

    pub fn insert(&mut self, field: FieldId, m: FieldMatch) {
        self.entries.insert(field, m);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldId, &FieldMatch)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The outcome of comparing a packet's fields to a [`MatchSpec`].
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize,
)]
pub struct Hits {
    pub exact: u16,
    pub wildcard: u16,
    pub miss: u16,
}

impl Hits {
    /// Did every field of the match agree with the packet?
    pub fn is_match(&self) -> bool {
        self.miss == 0
    }
}

impl Display for Hits {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "exact={} wildcard={} miss={}",
            self.exact, self.wildcard, self.miss
        )
    }
}
