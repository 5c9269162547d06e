// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Fuzz regression tests.
//!
//! These tests capture malformed frames which have tripped up
//! classification or editing, and ensure that the engine neither
//! panics on them nor leaves a chain which overruns the frame.

use ofpkt::api::EncapKind;
use ofpkt::api::FieldId;
use ofpkt::api::MacAddr;
use ofpkt::engine::Packet;
use ofpkt::engine::classify::Classifier;
use ofpkt::engine::ether::ETHER_TYPE_IPV4;
use ofpkt::engine::ether::ETHER_TYPE_MPLS;
use ofpkt::engine::ether::ETHER_TYPE_PPPOE_SESS;
use ofpkt::engine::ether::ETHER_TYPE_VLAN;
use serde::Deserialize;
use serde::Serialize;
use slog::Logger;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
struct Case {
    description: String,
    packet: String,
}

#[derive(Debug, Clone, Hash, Eq, PartialEq)]
struct Label {
    family: String,
    name: String,
}

fn run_tests(
    root_dir: &str,
    test_fn: impl Fn(&[u8]) + std::panic::RefUnwindSafe,
) {
    let base_resource_path =
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/resources");

    // Find all test descriptions in tests/resources/$root_dir.
    let mut tests: HashMap<Label, Case> = HashMap::new();
    let my_test_dir = base_resource_path.join(root_dir);
    for entry in std::fs::read_dir(my_test_dir)
        .unwrap_or_else(|e| panic!("failed to find directory {root_dir}: {e}"))
    {
        let entry = entry.unwrap_or_else(|e| {
            panic!("failed to enumerate child of {root_dir}: {e}")
        });

        let path_owned = entry.path();
        let path = path_owned.as_path();
        if path.extension() != Some("ron".as_ref()) {
            continue;
        }

        let contents = std::fs::read_to_string(path).unwrap_or_else(|e| {
            panic!("failed to read contents of {}: {e}", path.display())
        });

        let cases: HashMap<String, Case> = ron::from_str(&contents)
            .unwrap_or_else(|e| {
                panic!("failed to parse {}: {e}", path.display())
            });

        let family =
            path.file_stem().and_then(OsStr::to_str).unwrap_or("<unlabelled>");

        tests.extend(
            cases
                .into_iter()
                .map(|(name, v)| (Label { family: family.into(), name }, v)),
        )
    }

    assert!(!tests.is_empty(), "no cases found under {root_dir}");

    // Run all captured tests.
    let mut pkt_path = base_resource_path.join("data");
    for (label, case) in tests {
        let Label { family, name } = label;
        pkt_path.push(&case.packet);
        let data = std::fs::read(&pkt_path).unwrap_or_else(|e| {
            panic!(
                "{root_dir}, {family}/{name}: could not read data from {}: {e}",
                pkt_path.as_path().display(),
            )
        });
        pkt_path.pop();

        if let Err(e) = std::panic::catch_unwind(|| test_fn(&data[..])) {
            let case_str;
            let case_fmt = if case.description.is_empty() {
                ""
            } else {
                case_str = format!("\n -- {}", case.description);
                case_str.as_str()
            };
            eprintln!(
                "\nFuzz regression failure in: \
                {family}/{name}{case_fmt}\n\n\
                Packet {}:\n\
                {:x?}",
                case.packet,
                &data[..]
            );

            std::panic::resume_unwind(e)
        }
    }
}

#[test]
fn classify_regression() {
    run_tests("malformed", |data| {
        let log = Logger::root(slog::Discard, slog::o!());
        let (chain, _summary) = Classifier::new(log).classify(data, 0);
        chain.validate(data.len()).unwrap();

        // Every prefix must classify just as safely.
        for len in 0..data.len() {
            let log = Logger::root(slog::Discard, slog::o!());
            let (chain, _) = Classifier::new(log).classify(&data[..len], 0);
            chain.validate(len).unwrap();
        }
    });
}

#[test]
fn edit_regression() {
    run_tests("malformed", |data| {
        let mut pkt = Packet::copy_from(data, 1).unwrap();

        // Any of these may be refused; none may corrupt the chain.
        let _ = pkt.push(EncapKind::Vlan, ETHER_TYPE_VLAN);
        pkt.validate().unwrap();
        let _ = pkt.push(EncapKind::Mpls, ETHER_TYPE_MPLS);
        pkt.validate().unwrap();
        let _ = pkt.set_field(FieldId::MPLS_LABEL, 0xFFFFFu32);
        let _ = pkt.set_field(FieldId::IP_DSCP, 0x2Eu8);
        let _ = pkt.set_field(FieldId::TCP_DST, 443u16);
        let _ = pkt.set_field(FieldId::UDP_SRC, 53u16);
        let _ = pkt.set_field(
            FieldId::IPV6_ND_SLL,
            MacAddr::from([2, 0, 0, 0, 0, 1]),
        );
        let _ = pkt.dec_nw_ttl();
        let _ = pkt.copy_ttl_out();
        pkt.calc_all_checksums();
        pkt.validate().unwrap();

        let _ = pkt.pop(EncapKind::Mpls, ETHER_TYPE_IPV4);
        pkt.validate().unwrap();
        let _ = pkt.pop(EncapKind::Vlan, ETHER_TYPE_IPV4);
        pkt.validate().unwrap();
        let _ = pkt.pop(EncapKind::Ppp, ETHER_TYPE_IPV4);
        let _ = pkt.pop(EncapKind::Pppoe, ETHER_TYPE_IPV4);
        pkt.validate().unwrap();
        let _ = pkt.push(EncapKind::Pppoe, ETHER_TYPE_PPPOE_SESS);
        pkt.calc_all_checksums();
        pkt.validate().unwrap();
    });
}
