// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer configuration, read once at startup from `PRESSLINE_PRINTERS`.
//
// Format: comma-separated entries of `name[:shared]`, e.g.
// `PRESSLINE_PRINTERS="lp:shared,colorjet"`. A printer named `lp` is
// registered if the variable is unset, so a freshly started instance always
// has somewhere to route a job.

use std::collections::BTreeMap;

/// A printer definition parsed from the environment, before it is turned
/// into a `PrinterDescriptor` (which additionally needs the planner's
/// computed `supported_source_types`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrinterConfig {
    pub name: String,
    pub is_shared: bool,
}

fn parse_entry(raw: &str) -> Option<PrinterConfig> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.split_once(':') {
        Some((name, flag)) => Some(PrinterConfig {
            name: name.trim().to_owned(),
            is_shared: flag.trim().eq_ignore_ascii_case("shared"),
        }),
        None => Some(PrinterConfig {
            name: raw.to_owned(),
            is_shared: false,
        }),
    }
}

/// Parse `PRESSLINE_PRINTERS`, falling back to a single unshared `lp` queue.
pub fn load_from_env() -> Vec<PrinterConfig> {
    match std::env::var("PRESSLINE_PRINTERS") {
        Ok(raw) => {
            let parsed: Vec<PrinterConfig> = raw.split(',').filter_map(parse_entry).collect();
            if parsed.is_empty() {
                default_printers()
            } else {
                parsed
            }
        }
        Err(_) => default_printers(),
    }
}

fn default_printers() -> Vec<PrinterConfig> {
    vec![PrinterConfig {
        name: "lp".to_owned(),
        is_shared: false,
    }]
}

/// No per-printer attributes are sourced from the environment today; this
/// stays a separate function so a future PPD-derived attribute source has
/// somewhere to plug in without reshaping `PrinterConfig`.
pub fn default_attributes() -> BTreeMap<String, String> {
    BTreeMap::new()
}
