// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

pub mod frame;
pub mod ipp_wire;
pub mod stderr_log;

pub use frame::{write_frame, FrameDecoder};
pub use ipp_wire::{IppAttribute, IppGroup, IppMessage, IppResponseBuilder, ParseOutcome};
pub use stderr_log::log_daemon_line;
