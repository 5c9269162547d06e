// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

use criterion::BatchSize;
use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::criterion_group;
use criterion::criterion_main;
use ofpkt::api::EncapKind;
use ofpkt::engine::Packet;
use ofpkt::engine::ether::ETHER_TYPE_IPV4;
use ofpkt::engine::ether::ETHER_TYPE_IPV6;
use ofpkt::engine::ether::ETHER_TYPE_MPLS;
use ofpkt::engine::ether::ETHER_TYPE_PPPOE_SESS;
use ofpkt::engine::ether::ETHER_TYPE_VLAN;
use ofpkt_bench::MeasurementInfo;
use ofpkt_bench::alloc::*;
use ofpkt_bench::packet::BenchFrame;
use std::hint::black_box;

pub fn classify<M: MeasurementInfo + 'static>(c: &mut Criterion<M>) {
    let mut c = c.benchmark_group(format!("classify/{}", M::label()));

    for frame in BenchFrame::ALL {
        let bytes = frame.bytes();
        c.bench_with_input(
            BenchmarkId::from_parameter(frame.label()),
            &bytes,
            |b, bytes| {
                b.iter_with_large_drop(|| {
                    Packet::copy_from(black_box(bytes), 1).unwrap()
                })
            },
        );
    }
}

pub fn set_field<M: MeasurementInfo + 'static>(c: &mut Criterion<M>) {
    let mut c = c.benchmark_group(format!("set_field/{}", M::label()));

    for frame in BenchFrame::ALL {
        let pkt = frame.packet();
        let (field, value) = frame.rewrite();
        c.bench_function(BenchmarkId::from_parameter(frame.label()), |b| {
            b.iter_batched_ref(
                || pkt.clone(),
                |pkt| pkt.set_field(field, black_box(value.clone())).unwrap(),
                BatchSize::SmallInput,
            )
        });
    }
}

pub fn push_pop<M: MeasurementInfo + 'static>(c: &mut Criterion<M>) {
    let mut c = c.benchmark_group(format!("push_pop/{}", M::label()));

    // Each iteration leaves the packet as it found it.
    let mut pkt = BenchFrame::Tcp4.packet();
    c.bench_function("VLAN", |b| {
        b.iter(|| {
            pkt.push(EncapKind::Vlan, ETHER_TYPE_VLAN).unwrap();
            pkt.pop(EncapKind::Vlan, ETHER_TYPE_IPV4).unwrap();
        })
    });

    c.bench_function("MPLS", |b| {
        b.iter(|| {
            pkt.push(EncapKind::Mpls, ETHER_TYPE_MPLS).unwrap();
            pkt.pop(EncapKind::Mpls, ETHER_TYPE_IPV4).unwrap();
        })
    });

    let mut pkt = BenchFrame::Udp6.packet();
    c.bench_function("PPPoE session", |b| {
        b.iter(|| {
            pkt.push(EncapKind::Pppoe, ETHER_TYPE_PPPOE_SESS).unwrap();
            pkt.pop(EncapKind::Pppoe, ETHER_TYPE_IPV6).unwrap();
        })
    });
}

pub fn checksums<M: MeasurementInfo + 'static>(c: &mut Criterion<M>) {
    let mut c = c.benchmark_group(format!("checksums/{}", M::label()));

    for frame in BenchFrame::ALL {
        let mut pkt = frame.packet();
        let (field, value) = frame.rewrite();
        pkt.set_field(field, value).unwrap();
        c.bench_function(BenchmarkId::from_parameter(frame.label()), |b| {
            b.iter_batched_ref(
                || pkt.clone(),
                |pkt: &mut Packet| pkt.calc_checksums(),
                BatchSize::SmallInput,
            )
        });
    }
}

criterion_group!(wall, classify, set_field, push_pop, checksums);
criterion_group!(
    name = alloc_count;
    config = new_crit(Allocs);
    targets = classify, set_field, push_pop
);
criterion_group!(
    name = alloc_bytes;
    config = new_crit(AllocBytes);
    targets = classify, set_field, push_pop
);
criterion_main!(wall, alloc_count, alloc_bytes);
