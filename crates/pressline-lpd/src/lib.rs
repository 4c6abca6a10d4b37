// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

pub mod control;
pub mod inject;
pub mod session;
pub mod staging;

pub use inject::{InjectedDocument, JobInjector};
pub use session::handle_connection;
