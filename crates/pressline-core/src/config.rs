// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Startup context (§9): an explicit, immutable configuration snapshot read
// once from the environment, replacing the per-thread "globals" handle
// (`cupsServer`, `cupsUser`, `cupsEncryption`, …) that the original design
// relied on. Every component constructor takes a `&PresslineContext` rather
// than reaching for ambient state.

use std::path::PathBuf;

/// Immutable snapshot of process configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct PresslineContext {
    /// `CUPS_SERVERBIN` — directory holding filter and backend programs.
    pub server_bin_dir: PathBuf,
    /// `CUPS_SERVER` — scheduler address clients should connect to.
    pub server_address: String,
    /// `CUPS_ENCRYPTION` — one of `IfRequested`, `Never`, `Required`, `Always`.
    pub encryption: EncryptionPolicy,
    /// `CUPS_USER` — default requesting-user-name when none is supplied.
    pub default_user: String,
    /// `CUPS_MIME_SINK_REUSE` — gates the sink-pattern cache (§4.3).
    pub sink_reuse_enabled: bool,
    /// `IPP_PORT`, default 631.
    pub ipp_port: u16,
    /// `TMPDIR`, default platform temp dir.
    pub tmp_dir: PathBuf,
    /// `PRESSLINE_STATE_DIR` — base directory for the job queue database,
    /// audit log, and certificate files.
    pub state_dir: PathBuf,
    /// `PRESSLINE_CERT_GROUP` — administrative group for certificate file
    /// permissions (§5); `None` falls back to mode `0440`.
    pub cert_group: Option<String>,
}

/// `CUPS_ENCRYPTION` values (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionPolicy {
    IfRequested,
    Never,
    Required,
    Always,
}

impl EncryptionPolicy {
    fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "never" => Self::Never,
            "required" => Self::Required,
            "always" => Self::Always,
            _ => Self::IfRequested,
        }
    }
}

/// Parse a truthy environment value per §6: `1|yes|true|on`.
fn parse_bool_flag(raw: &str) -> bool {
    matches!(raw.to_ascii_lowercase().as_str(), "1" | "yes" | "true" | "on")
}

impl PresslineContext {
    /// Build the context from the process environment. Values absent from
    /// the environment fall back to the documented defaults (§6).
    pub fn from_env() -> Self {
        let tmp_dir = std::env::var("TMPDIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir());

        let state_dir = std::env::var("PRESSLINE_STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| tmp_dir.join("pressline"));

        Self {
            server_bin_dir: std::env::var("CUPS_SERVERBIN")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/usr/lib/pressline/filter")),
            server_address: std::env::var("CUPS_SERVER").unwrap_or_else(|_| "localhost".into()),
            encryption: std::env::var("CUPS_ENCRYPTION")
                .map(|v| EncryptionPolicy::parse(&v))
                .unwrap_or(EncryptionPolicy::IfRequested),
            default_user: std::env::var("CUPS_USER").unwrap_or_else(|_| "anonymous".into()),
            sink_reuse_enabled: std::env::var("CUPS_MIME_SINK_REUSE")
                .map(|v| parse_bool_flag(&v))
                .unwrap_or(false),
            ipp_port: std::env::var("IPP_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(631),
            tmp_dir,
            state_dir,
            cert_group: std::env::var("PRESSLINE_CERT_GROUP").ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_reuse_flag_accepts_documented_truthy_values() {
        for v in ["1", "yes", "true", "on", "YES", "On"] {
            assert!(parse_bool_flag(v), "expected {v} to be truthy");
        }
        for v in ["0", "no", "false", "off", ""] {
            assert!(!parse_bool_flag(v), "expected {v} to be falsy");
        }
    }

    #[test]
    fn encryption_policy_defaults_to_if_requested() {
        assert_eq!(EncryptionPolicy::parse("garbage"), EncryptionPolicy::IfRequested);
        assert_eq!(EncryptionPolicy::parse("Never"), EncryptionPolicy::Never);
    }
}
