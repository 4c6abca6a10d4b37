// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

pub mod dispatch;
pub mod queue;
pub mod scheduler;
pub mod server;

pub use queue::JobQueue;
pub use scheduler::{PrinterDescriptor, Scheduler};
pub use server::IppServer;
