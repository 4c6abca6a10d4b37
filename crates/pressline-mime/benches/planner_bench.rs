// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the chain planner and sink-pattern signature in
// the pressline-mime crate.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use pressline_core::ContentType;
use pressline_mime::sink_cache::compute_signature;
use pressline_mime::ChainPlanner;

fn chain_of(len: usize) -> Vec<pressline_core::FilterEdge> {
    let mut edges = Vec::with_capacity(len);
    for i in 0..len {
        let src = if i == 0 {
            ContentType::parse("application/pdf").unwrap()
        } else {
            ContentType::new("stage", i.to_string())
        };
        let dst = if i + 1 == len {
            ContentType::sink_for("bench")
        } else {
            ContentType::new("stage", (i + 1).to_string())
        };
        edges.push(pressline_core::FilterEdge {
            src,
            dst,
            cost: 1,
            max_input_size: 0,
            program: format!("stage{i}"),
        });
    }
    edges
}

/// Benchmark planning a chain through a linear pipeline of increasing
/// length, the planner's hot path in the scheduler.
fn bench_plan_linear_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_linear_chain");
    for &len in &[4usize, 16, 64] {
        let edges = chain_of(len);
        let planner = ChainPlanner::new();
        let src = ContentType::parse("application/pdf").unwrap();
        let dst = ContentType::sink_for("bench");
        group.bench_function(format!("{len} edges"), |b| {
            b.iter(|| {
                let chain = planner.plan(black_box(&edges), &src, &dst, 0);
                black_box(chain);
            });
        });
    }
    group.finish();
}

/// Benchmark the sink-pattern signature computation over a printer with a
/// realistic number of incoming filter edges.
fn bench_compute_signature(c: &mut Criterion) {
    let sink = ContentType::sink_for("bench");
    let edges: Vec<_> = (0..32)
        .map(|i| pressline_core::FilterEdge {
            src: ContentType::new("type", i.to_string()),
            dst: sink.clone(),
            cost: i as u32,
            max_input_size: 0,
            program: format!("prog{i}"),
        })
        .collect();

    c.bench_function("compute_signature (32 edges)", |b| {
        b.iter(|| {
            let sig = compute_signature(black_box(&edges), &sink);
            black_box(sig);
        });
    });
}

criterion_group!(benches, bench_plan_linear_chain, bench_compute_signature);
criterion_main!(benches);
