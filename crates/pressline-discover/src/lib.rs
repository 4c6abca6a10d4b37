// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

pub mod browser;
pub mod output;
pub mod registry;
pub mod txt;

pub use browser::{DeviceSink, DiscoveryBackend};
pub use registry::DeviceRegistry;
