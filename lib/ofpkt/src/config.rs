// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Packet allocation settings.

use crate::store::MAX_FRAME_LEN;
use serde::Deserialize;
use serde::Serialize;

pub const DEFAULT_HEAD_ROOM: usize = 64;
pub const DEFAULT_TAIL_ROOM: usize = 64;

/// How much room a [`crate::engine::packet::Packet`] reserves around
/// a copied-in frame, and the largest frame it accepts.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct PacketConfig {
    /// Bytes available for pushing headers without reallocating.
    pub head_room: usize,
    pub tail_room: usize,
    pub max_frame_len: usize,
}

impl Default for PacketConfig {
    fn default() -> Self {
        Self {
            head_room: DEFAULT_HEAD_ROOM,
            tail_room: DEFAULT_TAIL_ROOM,
            max_frame_len: MAX_FRAME_LEN,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn partial_config_uses_defaults() {
        let cfg: PacketConfig = toml::from_str("head_room = 8").unwrap();
        assert_eq!(cfg.head_room, 8);
        assert_eq!(cfg.tail_room, DEFAULT_TAIL_ROOM);
        assert_eq!(cfg.max_frame_len, 65535);
    }
}
