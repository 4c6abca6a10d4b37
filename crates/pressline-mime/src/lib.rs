// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pressline — MIME type database, typer rule engine, shortest-cost chain
// planner, and sink-pattern reuse cache.

pub mod database;
pub mod planner;
pub mod sink_cache;
pub mod typer;

pub use database::MimeDatabase;
pub use planner::ChainPlanner;
pub use sink_cache::{SinkPatternCache, SinkSignature};
