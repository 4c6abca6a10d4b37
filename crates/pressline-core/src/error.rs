// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error taxonomy for Pressline (§7).
//
// Every variant below belongs to exactly one of the five buckets in §7:
// validation, not-found, protocol, filter/backend, resource. Conversion to an
// IPP status code or an LPD reply byte happens once, at the boundary where a
// component's `Result` crosses into the IPP response builder or the LPD
// connection handler — see `ipp_status`/`lpd_reply_byte` below.

use thiserror::Error;

/// Top-level error type for all Pressline operations.
#[derive(Debug, Error)]
pub enum PresslineError {
    // -- Validation errors --
    #[error("malformed request: {0}")]
    Validation(String),

    #[error("document format not supported: {0}")]
    UnsupportedDocumentFormat(String),

    #[error("malformed typer rule rejected: {0}")]
    MalformedTyper(String),

    #[error("invalid filter edge: {0}")]
    InvalidFilterEdge(String),

    // -- Not-found errors --
    #[error("printer not found: {0}")]
    PrinterNotFound(String),

    #[error("job not found: {0}")]
    JobNotFound(i32),

    // -- Protocol errors --
    #[error("protocol error: {0}")]
    Protocol(String),

    // -- Filter/backend errors --
    #[error("filter '{program}' exited with status {exit_code}")]
    FilterFailed { program: String, exit_code: i32 },

    #[error("no filter chain from {src} to {dst}")]
    NoChain { src: String, dst: String },

    #[error("backend error: {0}")]
    BackendError(String),

    // -- Resource errors --
    #[error("resource exhausted: {0}")]
    Resource(String),

    #[error("too many data files in one connection (limit {limit})")]
    TooManyDataFiles { limit: u32 },

    // -- Ambient / infrastructure --
    #[error("integrity mismatch: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },

    #[error("device discovery error: {0}")]
    Discovery(String),

    #[error("certificate error: {0}")]
    Certificate(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PresslineError>;

impl PresslineError {
    /// Map to the IPP status code a caller should see (§7 propagation,
    /// RFC 8011 status code ranges). Ambient/infrastructure errors that have
    /// no natural IPP status map to `server-error-internal-error`.
    pub fn ipp_status(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::InvalidFilterEdge(_) | Self::MalformedTyper(_) => 0x0400, // client-error-bad-request
            Self::UnsupportedDocumentFormat(_) | Self::NoChain { .. } => 0x040a, // client-error-document-format-not-supported
            Self::PrinterNotFound(_) | Self::JobNotFound(_) => 0x0406, // client-error-not-found
            Self::Protocol(_) => 0x0400,
            Self::FilterFailed { .. } | Self::BackendError(_) => 0x0500, // server-error-internal-error
            Self::Resource(_) | Self::TooManyDataFiles { .. } => 0x0503, // server-error-busy
            Self::IntegrityMismatch { .. }
            | Self::Discovery(_)
            | Self::Certificate(_)
            | Self::Database(_)
            | Self::Io(_)
            | Self::Serialization(_) => 0x0500,
        }
    }

    /// Map to the single-byte LPD acknowledgement/reply code (§4.6): `0` for
    /// success, `1` for any failure. Every error variant aborts the LPD
    /// connection with `1`; the distinction between taxonomy buckets is
    /// preserved in the log line and audit entry, not in the wire byte.
    pub fn lpd_reply_byte(&self) -> u8 {
        1
    }
}
