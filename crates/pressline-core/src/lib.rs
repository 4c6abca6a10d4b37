// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pressline — core types, error taxonomy, and startup context shared across
// all crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::PresslineContext;
pub use error::PresslineError;
pub use error::Result;
pub use types::*;
