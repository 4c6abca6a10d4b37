// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for certificate generation, integrity hashing, and
// audit logging in the pressline-security crate.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use pressline_security::{AuditLog, SelfSignedCert, hash_bytes};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Benchmark ECDSA P-256 key pair generation for the scheduler's IPPS
/// listener.
fn bench_cert_generate(c: &mut Criterion) {
    c.bench_function("cert_generate (ECDSA P-256)", |b| {
        b.iter(|| {
            let cert = SelfSignedCert::generate().expect("key generation failed");
            black_box(cert);
        });
    });
}

/// Benchmark SHA-256 integrity hashing at various document sizes.
///
/// Sizes: 1 KiB, 10 KiB, 100 KiB, 1 MiB -- covering the range from small
/// text jobs to full-page raster spool files.
fn bench_integrity_hash(c: &mut Criterion) {
    let sizes: &[(&str, usize)] = &[
        ("1 KiB", 1024),
        ("10 KiB", 10 * 1024),
        ("100 KiB", 100 * 1024),
        ("1 MiB", 1024 * 1024),
    ];

    let mut group = c.benchmark_group("integrity_hash_sha256");
    for &(label, size) in sizes {
        let data = vec![0xABu8; size];
        group.bench_function(label, |b| {
            b.iter(|| {
                let hex = hash_bytes(black_box(&data));
                black_box(hex);
            });
        });
    }
    group.finish();
}

/// Benchmark recording an audit entry to an in-memory SQLite database.
///
/// Each iteration measures steady-state insertion, not schema creation: the
/// database is opened once outside the hot loop.
fn bench_audit_record(c: &mut Criterion) {
    c.bench_function("audit_record (in-memory SQLite)", |b| {
        let log = AuditLog::open_in_memory().expect("open in-memory audit log");

        b.iter(|| {
            log.record(
                black_box("job-created"),
                black_box("42"),
                black_box(true),
                black_box(Some("benchmark test entry")),
            )
            .expect("record failed");
        });
    });
}

criterion_group!(
    benches,
    bench_cert_generate,
    bench_integrity_hash,
    bench_audit_record,
);
criterion_main!(benches);
