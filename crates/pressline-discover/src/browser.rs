// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The DNS-SD browse/resolve backend (§4.5): one background thread per
// service type draining an `mdns-sd` event channel into the shared
// `DeviceRegistry`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mdns_sd::{ServiceDaemon, ServiceEvent};
use pressline_core::{PresslineError, Result, TransportKind};
use tracing::{debug, info, warn};

use crate::registry::DeviceRegistry;
use crate::txt;

/// Every `(transport, service_type)` pair this backend browses, in the fixed
/// priority table order (§4.5). `_ipps._tcp` carries two alternate service
/// types for the same transport.
const SERVICE_TYPES: &[(TransportKind, &str)] = &[
    (TransportKind::Lpd, "_printer._tcp.local."),
    (TransportKind::Ipps, "_ipps._tcp.local."),
    (TransportKind::Ipps, "_ipp-tls._tcp.local."),
    (TransportKind::Ipp, "_ipp._tcp.local."),
    (TransportKind::FaxIpp, "_fax-ipp._tcp.local."),
    (TransportKind::Pdl, "_pdl-datastream._tcp.local."),
    (TransportKind::RiOusbPrint, "_riousbprint._tcp.local."),
];

/// Derive the mDNS instance ("service") name from a resolved full name, e.g.
/// `"Laser._ipp._tcp.local."` → `"Laser"`.
fn service_name_of(full_name: &str, service_type: &str) -> String {
    full_name.strip_suffix(service_type).map(|s| s.trim_end_matches('.')).unwrap_or(full_name).to_string()
}

/// Where an announced device line should go: the plain-text form on stdout,
/// or framed IPP printer-attribute groups under the mini-daemon ABI (§4.7).
pub trait DeviceSink: Send + Sync {
    fn announce(&self, device: &pressline_core::DiscoveredDevice);
}

pub struct DiscoveryBackend {
    daemon: ServiceDaemon,
    registry: Arc<DeviceRegistry>,
    canceled: Arc<AtomicBool>,
}

impl DiscoveryBackend {
    pub fn new() -> Result<Self> {
        let daemon =
            ServiceDaemon::new().map_err(|e| PresslineError::Discovery(format!("failed to start mDNS daemon: {e}")))?;
        Ok(Self {
            daemon,
            registry: Arc::new(DeviceRegistry::new()),
            canceled: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn registry(&self) -> Arc<DeviceRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn canceled_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.canceled)
    }

    /// Start browsing every service type in the priority table. Returns
    /// immediately; listener threads run until `stop` or cancellation.
    pub fn start(&self, sink: Arc<dyn DeviceSink>) -> Result<()> {
        for &(transport, service_type) in SERVICE_TYPES {
            let receiver = self
                .daemon
                .browse(service_type)
                .map_err(|e| PresslineError::Discovery(format!("browse {service_type}: {e}")))?;
            Self::spawn_listener(
                transport,
                service_type,
                receiver,
                Arc::clone(&self.registry),
                Arc::clone(&self.canceled),
                Arc::clone(&sink),
            );
        }
        info!("DNS-SD printer discovery started");
        Ok(())
    }

    pub fn stop(&self) -> Result<()> {
        for &(_, service_type) in SERVICE_TYPES {
            let _ = self.daemon.stop_browse(service_type);
        }
        self.canceled.store(true, Ordering::Release);
        Ok(())
    }

    pub fn shutdown(self) -> Result<()> {
        self.daemon
            .shutdown()
            .map_err(|e| PresslineError::Discovery(format!("daemon shutdown: {e}")))?;
        Ok(())
    }

    fn spawn_listener(
        transport: TransportKind,
        service_type: &'static str,
        receiver: mdns_sd::Receiver<ServiceEvent>,
        registry: Arc<DeviceRegistry>,
        canceled: Arc<AtomicBool>,
        sink: Arc<dyn DeviceSink>,
    ) {
        std::thread::Builder::new()
            .name(format!("dnssd-{}", transport.label()))
            .spawn(move || {
                while let Ok(event) = receiver.recv() {
                    if canceled.load(Ordering::Acquire) {
                        break;
                    }
                    match event {
                        ServiceEvent::SearchStarted(stype) => {
                            debug!(service_type = %stype, "DNS-SD search started");
                        }
                        ServiceEvent::ServiceFound(stype, fullname) => {
                            let name = service_name_of(&fullname, service_type);
                            debug!(service_type = %stype, name = %name, "service found");
                            registry.note_found(transport, "local.", &fullname, &name);
                        }
                        ServiceEvent::ServiceResolved(info) => {
                            let full_name = info.get_fullname().to_owned();
                            let name = service_name_of(&full_name, service_type);
                            if !registry.try_acquire_query_slot() {
                                warn!(name = %name, "TXT query pool exhausted, deferring");
                                continue;
                            }
                            const KNOWN_KEYS: &[&str] = &[
                                "usb_MFG", "usb_MANU", "usb_MANUFACTURER", "usb_MDL", "usb_MODEL",
                                "product", "ty", "pdl", "priority", "printer-type", "note", "UUID",
                            ];
                            let pairs: Vec<(&str, &str)> = KNOWN_KEYS
                                .iter()
                                .filter_map(|&key| info.get_property_val_str(key).map(|v| (key, v)))
                                .collect();
                            let fields = txt::parse(pairs);
                            let port = info.get_port();
                            let host = info.get_hostname().trim_end_matches('.');
                            let uri = format!("dnssd://{name}._tcp.local./?transport={}&host={host}&port={port}", transport.label());
                            registry.complete_txt(
                                &full_name,
                                uri,
                                Some(txt::make_and_model(&fields)),
                                txt::device_id(&fields),
                                fields.location.clone(),
                                fields.uuid,
                                fields.priority.unwrap_or(u32::MAX),
                                fields.cups_shared,
                            );
                            registry.release_query_slot();
                            if let Some(winner) = registry.try_select_for_announcement(&name) {
                                info!(name = %winner.service_name, transport = %winner.transport_kind.label(), "device announced");
                                sink.announce(&winner);
                            }
                        }
                        ServiceEvent::ServiceRemoved(stype, fullname) => {
                            info!(service_type = %stype, name = %fullname, "service removed");
                            registry.remove(&fullname);
                        }
                        ServiceEvent::SearchStopped(stype) => {
                            debug!(service_type = %stype, "DNS-SD search stopped");
                            break;
                        }
                    }
                }
            })
            .expect("failed to spawn DNS-SD listener thread");
    }
}
