// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Allocation counting for benchmark cases.
//!
//! Classification allocates the chain and the summary, and structural
//! edits should allocate nothing at all while head-room lasts. These
//! measurements let criterion report both.

use super::MeasurementInfo;
use criterion::Criterion;
use criterion::Throughput;
use criterion::measurement::Measurement;
use criterion::measurement::ValueFormatter;
use std::alloc::GlobalAlloc;
use std::alloc::Layout;
use std::alloc::System;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

#[global_allocator]
static COUNTING_ALLOC: CountingAlloc = CountingAlloc {
    allocs: AtomicU64::new(0),
    bytes: AtomicU64::new(0),
};

// Criterion runs one benchmark at a time, so global counters suffice.
struct CountingAlloc {
    allocs: AtomicU64,
    bytes: AtomicU64,
}

unsafe impl GlobalAlloc for CountingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        self.allocs.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(layout.size() as u64, Ordering::Relaxed);
        unsafe { System.alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) }
    }
}

/// Number of allocations made.
pub struct Allocs;

/// Total bytes requested from the allocator.
pub struct AllocBytes;

/// A counter read around each benchmark iteration.
pub trait AllocCounter {
    const LABEL: &'static str;
    const UNIT: &'static str;

    fn read() -> u64;
}

impl AllocCounter for Allocs {
    const LABEL: &'static str = "alloc_ct";
    const UNIT: &'static str = "";

    fn read() -> u64 {
        COUNTING_ALLOC.allocs.load(Ordering::Relaxed)
    }
}

impl AllocCounter for AllocBytes {
    const LABEL: &'static str = "alloc_sz";
    const UNIT: &'static str = "B";

    fn read() -> u64 {
        COUNTING_ALLOC.bytes.load(Ordering::Relaxed)
    }
}

/// Per-packet counts are small, so no scaling is applied.
struct Unscaled(&'static str);

impl ValueFormatter for Unscaled {
    fn scale_values(&self, _typical: f64, _values: &mut [f64]) -> &'static str {
        self.0
    }

    fn scale_throughputs(
        &self,
        _typical: f64,
        _throughput: &Throughput,
        _values: &mut [f64],
    ) -> &'static str {
        self.0
    }

    fn scale_for_machines(&self, _values: &mut [f64]) -> &'static str {
        self.0
    }
}

/// Adapts an [`AllocCounter`] into a criterion [`Measurement`].
pub struct Counted<C> {
    _counter: C,
    formatter: Unscaled,
}

impl<C: AllocCounter> Measurement for Counted<C> {
    type Intermediate = u64;
    type Value = u64;

    fn start(&self) -> Self::Intermediate {
        C::read()
    }

    fn end(&self, i: Self::Intermediate) -> Self::Value {
        C::read() - i
    }

    fn add(&self, v1: &Self::Value, v2: &Self::Value) -> Self::Value {
        v1 + v2
    }

    fn zero(&self) -> Self::Value {
        0
    }

    fn to_f64(&self, value: &Self::Value) -> f64 {
        *value as f64
    }

    fn formatter(&self) -> &dyn ValueFormatter {
        &self.formatter
    }
}

impl<C: AllocCounter> MeasurementInfo for Counted<C> {
    fn label() -> &'static str {
        C::LABEL
    }
}

/// Create a new [`Criterion`] instance which measures `counter`
/// instead of time.
pub fn new_crit<C: AllocCounter>(counter: C) -> Criterion<Counted<C>> {
    Criterion::default()
        .with_measurement(Counted {
            _counter: counter,
            formatter: Unscaled(C::UNIT),
        })
        .sample_size(10)
        .warm_up_time(Duration::from_nanos(1))
        .measurement_time(Duration::from_micros(10))
        .nresamples(1)
        // Identical samples trip up the analysis plots.
        .without_plots()
}
