// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types shared by the MIME database, chain planner, scheduler,
// device-discovery backend, and LPD ingress.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A MIME content type, `super/type`, matched case-insensitively but
/// displayed with the case it was registered under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentType {
    pub super_type: String,
    pub sub_type: String,
}

impl ContentType {
    pub fn new(super_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            super_type: super_type.into(),
            sub_type: sub_type.into(),
        }
    }

    /// Parse a `super/type` string, splitting on the first `/`.
    pub fn parse(spec: &str) -> Option<Self> {
        let (super_type, sub_type) = spec.split_once('/')?;
        Some(Self::new(super_type, sub_type))
    }

    /// The synthetic sink type owned by a printer queue, `printer/<queue>`.
    pub fn sink_for(queue: &str) -> Self {
        Self::new("printer", queue)
    }

    /// True for any `printer/*` type, regardless of queue name.
    pub fn is_sink_family(&self) -> bool {
        self.super_type.eq_ignore_ascii_case("printer")
    }

    fn key(&self) -> (String, String) {
        (
            self.super_type.to_ascii_lowercase(),
            self.sub_type.to_ascii_lowercase(),
        )
    }
}

impl PartialEq for ContentType {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ContentType {}

impl std::hash::Hash for ContentType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.super_type, self.sub_type)
    }
}

/// Index of a registered content type inside a MIME database arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeRef(pub usize);

/// A leaf predicate or boolean connective in a typer rule tree (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TyperRule {
    And(Vec<TyperRule>),
    Or(Vec<TyperRule>),
    Not(Box<TyperRule>),
    /// Shell-glob match against the file's basename.
    Filename(String),
    /// Matches when the type's declared priority is `n`; ties among matches
    /// break by first-declared order, not by this predicate itself.
    Priority(u8),
    /// Byte-exact match of a quoted string at `offset`.
    StringAt { offset: usize, expected: Vec<u8> },
    /// Case-insensitive match of a quoted string at `offset`.
    IStringAt { offset: usize, expected: Vec<u8> },
    /// Big-endian 1-byte integer equality at `offset`.
    CharAt { offset: usize, expected: u8 },
    /// Big-endian 2-byte integer equality at `offset`.
    ShortAt { offset: usize, expected: u16 },
    /// Big-endian 4-byte integer equality at `offset`.
    IntAt { offset: usize, expected: u32 },
    /// Matches if the process locale has this prefix.
    Locale(String),
    /// Substring search within `[offset, offset + range)`.
    Contains {
        offset: usize,
        range: usize,
        needle: Vec<u8>,
    },
}

/// An ordered rule tree plus the declared-priority tier it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Typer {
    pub priority: u8,
    pub rule: TyperRule,
}

/// A directed converter edge in the filter graph (§3).
///
/// Edges are unique by `(src, dst, program)`; re-adding the same triple
/// updates `cost`/`max_input_size` in place rather than duplicating the edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterEdge {
    pub src: ContentType,
    pub dst: ContentType,
    pub cost: u32,
    /// `0` means no cap.
    pub max_input_size: u64,
    pub program: String,
}

/// An ordered sequence of edges produced by the chain planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chain {
    pub edges: Vec<FilterEdge>,
}

impl Chain {
    pub fn cost(&self) -> u64 {
        self.edges.iter().map(|e| u64::from(e.cost)).sum()
    }

    pub fn programs(&self) -> Vec<&str> {
        self.edges.iter().map(|e| e.program.as_str()).collect()
    }
}

/// Operational state of a printer queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrinterState {
    Idle,
    Processing,
    Stopped,
}

/// Identifies a registered printer queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrinterRef(pub usize);

/// A registered printer queue (§3, component D).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Printer {
    pub name: String,
    pub sink_type: ContentType,
    pub supported_source_types: Vec<ContentType>,
    pub state: PrinterState,
    pub is_accepting: bool,
    pub is_shared: bool,
    pub attributes: std::collections::BTreeMap<String, String>,
}

/// Monotonically assigned job identifier (the IPP `job-id` integer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub i32);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle states of a print job (§4.4 state machine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Pending,
    Held,
    Processing,
    Completed,
    Canceled,
    Aborted,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Canceled | Self::Aborted)
    }
}

/// A single submitted document within a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDocument {
    pub format: ContentType,
    pub bytes: Vec<u8>,
    pub is_last: bool,
}

/// A print job, owned by the scheduler (§3, component D).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub printer_ref: PrinterRef,
    pub printer_name: String,
    pub originating_user: String,
    pub title: String,
    pub document_format: Option<ContentType>,
    pub documents: Vec<JobDocument>,
    pub state: JobState,
    /// Free-form job options (media, sides, copies, …), stored verbatim as
    /// JSON so additive option changes don't require a schema migration.
    pub options: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Reason keyword recorded when the job aborts (§7 filter/backend errors).
    pub abort_reason: Option<String>,
}

impl Job {
    pub fn new(
        id: JobId,
        printer_ref: PrinterRef,
        printer_name: String,
        originating_user: String,
        title: String,
        options: serde_json::Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            printer_ref,
            printer_name,
            originating_user,
            title,
            document_format: None,
            documents: Vec::new(),
            state: JobState::Pending,
            options,
            created_at: now,
            updated_at: now,
            abort_reason: None,
        }
    }

    /// Validate and apply a state transition, per the §4.4 state machine.
    pub fn transition(&mut self, next: JobState) -> bool {
        let allowed = matches!(
            (self.state, next),
            (JobState::Pending, JobState::Processing)
                | (JobState::Pending, JobState::Held)
                | (JobState::Held, JobState::Pending)
                | (JobState::Processing, JobState::Completed)
                | (JobState::Pending, JobState::Canceled)
                | (JobState::Held, JobState::Canceled)
                | (JobState::Processing, JobState::Canceled)
                | (JobState::Processing, JobState::Aborted)
        );
        if allowed {
            self.state = next;
            self.updated_at = Utc::now();
        }
        allowed
    }
}

/// A DNS-SD transport advertising a printer, in the fixed priority order
/// used for tie-breaking (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TransportKind {
    Lpd = 0,
    Ipps = 1,
    Ipp = 2,
    FaxIpp = 3,
    Pdl = 4,
    RiOusbPrint = 5,
}

impl TransportKind {
    pub fn service_types(self) -> &'static [&'static str] {
        match self {
            Self::Lpd => &["_printer._tcp"],
            Self::Ipps => &["_ipps._tcp", "_ipp-tls._tcp"],
            Self::Ipp => &["_ipp._tcp"],
            Self::FaxIpp => &["_fax-ipp._tcp"],
            Self::Pdl => &["_pdl-datastream._tcp"],
            Self::RiOusbPrint => &["_riousbprint._tcp"],
        }
    }

    /// Tie-break rank used for announcement selection (§4.5): lowest wins.
    /// `Lpd` (`_printer._tcp`) advertises the least capable transport of the
    /// set, so it ranks last even though it is ordinal 0 in the service-type
    /// table above; `Ipps` ranks first.
    pub fn announcement_rank(self) -> u8 {
        match self {
            Self::Ipps => 0,
            Self::Ipp => 1,
            Self::FaxIpp => 2,
            Self::Pdl => 3,
            Self::RiOusbPrint => 4,
            Self::Lpd => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Lpd => "lpd",
            Self::Ipps => "ipps",
            Self::Ipp => "ipp",
            Self::FaxIpp => "fax-ipp",
            Self::Pdl => "pdl",
            Self::RiOusbPrint => "riousbprint",
        }
    }
}

/// A discovered network device, assembled from DNS-SD browse + TXT data
/// (§3, component E).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredDevice {
    pub service_name: String,
    pub domain: String,
    pub full_name: String,
    pub make_and_model: Option<String>,
    pub device_id: Option<String>,
    pub location: Option<String>,
    pub uuid: Option<uuid::Uuid>,
    pub transport_kind: TransportKind,
    pub priority: u32,
    pub cups_shared: bool,
    pub query_in_flight: bool,
    pub emitted: bool,
    pub uri: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_matches_case_insensitively_but_preserves_case() {
        let a = ContentType::new("Application", "PDF");
        let b = ContentType::new("application", "pdf");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "Application/PDF");
    }

    #[test]
    fn sink_family_detection() {
        assert!(ContentType::sink_for("lp").is_sink_family());
        assert!(!ContentType::new("application", "pdf").is_sink_family());
    }

    #[test]
    fn job_state_machine_allows_documented_transitions() {
        let mut job = Job::new(
            JobId(1),
            PrinterRef(0),
            "lp".into(),
            "joe".into(),
            "Book".into(),
            serde_json::json!({}),
        );
        assert!(job.transition(JobState::Held));
        assert!(job.transition(JobState::Pending));
        assert!(job.transition(JobState::Processing));
        assert!(job.transition(JobState::Completed));
        assert!(job.state.is_terminal());
    }

    #[test]
    fn job_state_machine_rejects_transitions_out_of_terminal_states() {
        let mut job = Job::new(
            JobId(2),
            PrinterRef(0),
            "lp".into(),
            "joe".into(),
            "Book".into(),
            serde_json::json!({}),
        );
        job.transition(JobState::Processing);
        job.transition(JobState::Aborted);
        assert!(!job.transition(JobState::Pending));
        assert_eq!(job.state, JobState::Aborted);
    }

    #[test]
    fn transport_kind_ordinal_matches_priority_table() {
        assert!(TransportKind::Lpd < TransportKind::Ipps);
        assert!(TransportKind::Ipps < TransportKind::Ipp);
        assert!(TransportKind::RiOusbPrint > TransportKind::Pdl);
    }
}
