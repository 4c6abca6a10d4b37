// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// TLS certificate generation, local-authentication credentials, content
// hashing, and the audit trail for the print scheduler.

pub mod audit;
pub mod certificates;
pub mod integrity;

pub use audit::AuditLog;
pub use certificates::SelfSignedCert;
pub use integrity::{hash_bytes, verify_hash};
