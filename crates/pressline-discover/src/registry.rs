// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The mutex-guarded device table (§4.5): one sorted array of
// `DiscoveredDevice` records, a bounded pool of concurrent TXT queries, and
// the "announce each device exactly once" selection rule.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use pressline_core::{DiscoveredDevice, TransportKind};

/// At most this many TXT queries may be outstanding at any time (§4.5).
pub const MAX_CONCURRENT_TXT_QUERIES: usize = 50;

/// Thread-safe table of in-progress and resolved device records. A single
/// mutex guards all writes, since the DNS-SD library dispatches callbacks
/// from its own worker thread rather than this module's.
pub struct DeviceRegistry {
    devices: Mutex<Vec<DiscoveredDevice>>,
    inflight_queries: AtomicUsize,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self {
            devices: Mutex::new(Vec::new()),
            inflight_queries: AtomicUsize::new(0),
        }
    }

    /// Reserve one of the 50 concurrent TXT-query slots. Returns `false` if
    /// the pool is full; the caller should defer the query.
    pub fn try_acquire_query_slot(&self) -> bool {
        loop {
            let current = self.inflight_queries.load(Ordering::Acquire);
            if current >= MAX_CONCURRENT_TXT_QUERIES {
                return false;
            }
            if self
                .inflight_queries
                .compare_exchange(current, current + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return true;
            }
        }
    }

    pub fn release_query_slot(&self) {
        self.inflight_queries.fetch_sub(1, Ordering::AcqRel);
    }

    /// Record an "add" event: create a new record for `full_name`, or, if one
    /// already exists and is still on the `local.` domain, update its domain
    /// to the one it was just seen on.
    pub fn note_found(&self, transport_kind: TransportKind, domain: &str, full_name: &str, service_name: &str) {
        let mut devices = self.devices.lock().expect("device registry lock poisoned");
        if let Some(existing) = devices.iter_mut().find(|d| d.full_name == full_name) {
            if existing.domain == "local." {
                existing.domain = domain.to_string();
            }
            return;
        }
        devices.push(DiscoveredDevice {
            service_name: service_name.to_string(),
            domain: domain.to_string(),
            full_name: full_name.to_string(),
            make_and_model: None,
            device_id: None,
            location: None,
            uuid: None,
            transport_kind,
            priority: u32::MAX,
            cups_shared: false,
            query_in_flight: true,
            emitted: false,
            uri: String::new(),
        });
        devices.sort_by(|a, b| a.service_name.cmp(&b.service_name));
    }

    /// Apply the resolved TXT fields and URI to the record for `full_name`.
    pub fn complete_txt(
        &self,
        full_name: &str,
        uri: String,
        make_and_model: Option<String>,
        device_id: Option<String>,
        location: Option<String>,
        uuid: Option<uuid::Uuid>,
        priority: u32,
        cups_shared: bool,
    ) {
        let mut devices = self.devices.lock().expect("device registry lock poisoned");
        if let Some(record) = devices.iter_mut().find(|d| d.full_name == full_name) {
            record.uri = uri;
            record.make_and_model = make_and_model;
            record.device_id = device_id;
            record.location = location;
            record.uuid = uuid;
            record.priority = priority;
            record.cups_shared = cups_shared;
            record.query_in_flight = false;
        }
    }

    pub fn remove(&self, full_name: &str) {
        let mut devices = self.devices.lock().expect("device registry lock poisoned");
        devices.retain(|d| d.full_name != full_name);
    }

    /// If every record sharing `service_name` has finished its TXT query and
    /// none has been announced yet, pick the minimal one under
    /// `(priority, transport_kind.announcement_rank())` and mark it emitted.
    /// Returns `None` if selection isn't ready yet or has already happened.
    pub fn try_select_for_announcement(&self, service_name: &str) -> Option<DiscoveredDevice> {
        let mut devices = self.devices.lock().expect("device registry lock poisoned");
        let siblings: Vec<usize> = devices
            .iter()
            .enumerate()
            .filter(|(_, d)| d.service_name == service_name)
            .map(|(i, _)| i)
            .collect();
        if siblings.is_empty() {
            return None;
        }
        if siblings.iter().any(|&i| devices[i].query_in_flight) {
            return None;
        }
        if siblings.iter().any(|&i| devices[i].emitted) {
            return None;
        }
        let winner = siblings
            .into_iter()
            .min_by_key(|&i| (devices[i].priority, devices[i].transport_kind.announcement_rank()))?;
        devices[winner].emitted = true;
        Some(devices[winner].clone())
    }

    /// Snapshot of every record currently held, for inspection/testing.
    pub fn snapshot(&self) -> Vec<DiscoveredDevice> {
        self.devices.lock().expect("device registry lock poisoned").clone()
    }

    pub fn all_emitted(&self) -> bool {
        self.devices
            .lock()
            .expect("device registry lock poisoned")
            .iter()
            .all(|d| d.emitted)
    }
}
