// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The sink-pattern reuse cache (§4.3, component C): signs the incoming-edge
// topology of a printer's sink type and reuses a previously computed
// supported-source-type set for any printer with an identical signature.

use std::collections::HashMap;
use std::sync::RwLock;

use pressline_core::{ContentType, FilterEdge};

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// `(edge_count, signature)` — the cache key (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SinkSignature {
    pub edge_count: usize,
    pub signature: u64,
}

fn fnv1a_mix(hash: &mut u64, bytes: &[u8]) {
    for &b in bytes {
        *hash ^= u64::from(b);
        *hash = hash.wrapping_mul(FNV_PRIME);
    }
}

/// Compute the signature of every edge terminating at `sink`, normalizing
/// `printer/*` sources to the canonical `("printer","sink")` pair (§4.3
/// steps 1-2) and folding the sorted list (step 3-4) into a 64-bit FNV-1a
/// hash.
pub fn compute_signature(edges: &[FilterEdge], sink: &ContentType) -> SinkSignature {
    let mut normalized: Vec<FilterEdge> = edges
        .iter()
        .filter(|e| &e.dst == sink)
        .map(|e| {
            let mut e = e.clone();
            if e.src.is_sink_family() {
                e.src = ContentType::new("printer", "sink");
            }
            e
        })
        .collect();

    normalized.sort_by(|a, b| {
        a.src
            .super_type
            .cmp(&b.src.super_type)
            .then(a.src.sub_type.cmp(&b.src.sub_type))
            .then(a.cost.cmp(&b.cost))
            .then(a.max_input_size.cmp(&b.max_input_size))
            .then(a.program.cmp(&b.program))
    });

    let mut hash = FNV_OFFSET_BASIS;
    for e in &normalized {
        fnv1a_mix(&mut hash, e.src.super_type.as_bytes());
        fnv1a_mix(&mut hash, &[0xFF]);
        fnv1a_mix(&mut hash, e.src.sub_type.as_bytes());
        fnv1a_mix(&mut hash, &[0xFE]);
        fnv1a_mix(&mut hash, &e.cost.to_be_bytes());
        fnv1a_mix(&mut hash, &(e.max_input_size as u32).to_le_bytes());
        fnv1a_mix(&mut hash, e.program.as_bytes());
        fnv1a_mix(&mut hash, &[0xFD]);
    }

    SinkSignature {
        edge_count: normalized.len(),
        signature: hash,
    }
}

/// Process-wide cache of `(edge_count, signature) -> supported_source_types`,
/// gated by `CUPS_MIME_SINK_REUSE` (§6). When disabled, `reuse`/`try_store`
/// are no-ops and planning always runs.
pub struct SinkPatternCache {
    enabled: bool,
    entries: RwLock<HashMap<(usize, u64), Vec<ContentType>>>,
}

impl SinkPatternCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn reuse(&self, sig: SinkSignature) -> Option<Vec<ContentType>> {
        if !self.enabled {
            return None;
        }
        self.entries
            .read()
            .expect("sink-pattern cache lock poisoned")
            .get(&(sig.edge_count, sig.signature))
            .cloned()
    }

    pub fn try_store(&self, sig: SinkSignature, supported_source_types: Vec<ContentType>) {
        if !self.enabled {
            return;
        }
        let mut w = self.entries.write().expect("sink-pattern cache lock poisoned");
        w.entry((sig.edge_count, sig.signature))
            .or_insert(supported_source_types);
    }

    /// Clear the whole cache, as on a database reload (§4.3 lifecycle).
    pub fn clear(&self) {
        self.entries
            .write()
            .expect("sink-pattern cache lock poisoned")
            .clear();
    }
}
