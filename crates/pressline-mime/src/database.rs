// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The MIME type database (§4.1, component A): an arena of registered content
// types with their typers, plus the directed filter-edge graph.

use std::collections::HashMap;

use pressline_core::{ContentType, FilterEdge, PresslineError, Result, TypeRef, Typer, TyperRule};
use tracing::{debug, warn};

use crate::typer::evaluate;

struct TypeEntry {
    content_type: ContentType,
    typers: Vec<Typer>,
}

/// The `(types, typers, filters)` graph (§4.1/GLOSSARY).
#[derive(Default)]
pub struct MimeDatabase {
    types: Vec<TypeEntry>,
    by_key: HashMap<(String, String), TypeRef>,
    filters: Vec<FilterEdge>,
}

impl MimeDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(super_type: &str, sub_type: &str) -> (String, String) {
        (
            super_type.to_ascii_lowercase(),
            sub_type.to_ascii_lowercase(),
        )
    }

    /// Insert a content type, or return the existing reference on duplicate
    /// (idempotent, §4.1).
    pub fn add_type(&mut self, super_type: &str, sub_type: &str) -> TypeRef {
        let k = Self::key(super_type, sub_type);
        if let Some(existing) = self.by_key.get(&k) {
            return *existing;
        }
        let content_type = ContentType::new(super_type, sub_type);
        let type_ref = TypeRef(self.types.len());
        debug!(type = %content_type, "registered content type");
        self.types.push(TypeEntry {
            content_type,
            typers: Vec::new(),
        });
        self.by_key.insert(k, type_ref);
        type_ref
    }

    /// Append a typer to a type's rule list. Order matters (§4.1): the first
    /// typer to match, within the highest matching priority tier, wins.
    pub fn add_typer(&mut self, type_ref: TypeRef, priority: u8, rule: TyperRule) -> Result<()> {
        if !validate_rule(&rule) {
            let detail = format!("{rule:?}");
            warn!(rule = %detail, "rejected malformed typer");
            return Err(PresslineError::MalformedTyper(detail));
        }
        let entry = self
            .types
            .get_mut(type_ref.0)
            .ok_or_else(|| PresslineError::Validation("unknown type reference".into()))?;
        entry.typers.push(Typer { priority, rule });
        Ok(())
    }

    /// Insert-or-update a filter edge by `(src, dst, program)` (§3).
    pub fn add_filter(
        &mut self,
        src: ContentType,
        dst: ContentType,
        cost: u32,
        max_input_size: u64,
        program: impl Into<String>,
    ) -> Result<()> {
        let program = program.into();
        if let Some(existing) = self
            .filters
            .iter_mut()
            .find(|e| e.src == src && e.dst == dst && e.program == program)
        {
            existing.cost = cost;
            existing.max_input_size = max_input_size;
            return Ok(());
        }
        debug!(%src, %dst, cost, program = %program, "registered filter edge");
        self.filters.push(FilterEdge {
            src,
            dst,
            cost,
            max_input_size,
            program,
        });
        Ok(())
    }

    /// Remove every edge whose `src` or `dst` equals `sink` (used when a
    /// printer is deregistered, §4.4).
    pub fn remove_filters_touching(&mut self, sink: &ContentType) {
        self.filters.retain(|e| &e.src != sink && &e.dst != sink);
    }

    /// Evaluate typers against a filename and content prefix, returning the
    /// best-matching type (§4.1: highest priority, ties by declaration
    /// order).
    pub fn type_of(&self, filename: &str, first_bytes: &[u8]) -> Option<TypeRef> {
        self.type_of_locale(filename, first_bytes, "C")
    }

    pub fn type_of_locale(&self, filename: &str, first_bytes: &[u8], locale: &str) -> Option<TypeRef> {
        let mut best: Option<(TypeRef, u8)> = None;
        for (idx, entry) in self.types.iter().enumerate() {
            let Some(matched_priority) = entry
                .typers
                .iter()
                .find(|t| evaluate(&t.rule, filename, first_bytes, locale))
                .map(|t| t.priority)
            else {
                continue;
            };
            let candidate = (TypeRef(idx), matched_priority);
            best = match best {
                None => Some(candidate),
                Some((_, best_priority)) if matched_priority > best_priority => Some(candidate),
                Some(existing) => Some(existing), // earlier declaration wins ties
            };
        }
        best.map(|(type_ref, _)| type_ref)
    }

    pub fn enumerate_types(&self) -> Vec<(TypeRef, ContentType)> {
        self.types
            .iter()
            .enumerate()
            .map(|(idx, e)| (TypeRef(idx), e.content_type.clone()))
            .collect()
    }

    pub fn type_name(&self, type_ref: TypeRef) -> Option<&ContentType> {
        self.types.get(type_ref.0).map(|e| &e.content_type)
    }

    pub fn enumerate_filters(&self) -> &[FilterEdge] {
        &self.filters
    }

    /// Best (lowest-cost) filter directly connecting `src` to `dst`, if any.
    pub fn find_filter(&self, src: &ContentType, dst: &ContentType) -> Option<&FilterEdge> {
        self.filters
            .iter()
            .filter(|e| &e.src == src && &e.dst == dst)
            .min_by(|a, b| a.cost.cmp(&b.cost).then(a.program.cmp(&b.program)))
    }
}

/// Reject malformed typer rules at load time (§4.1 failure semantics): empty
/// glob patterns, zero-length match windows, and empty connective lists.
fn validate_rule(rule: &TyperRule) -> bool {
    match rule {
        TyperRule::And(rules) | TyperRule::Or(rules) => !rules.is_empty() && rules.iter().all(validate_rule),
        TyperRule::Not(inner) => validate_rule(inner),
        TyperRule::Filename(pattern) => !pattern.is_empty(),
        TyperRule::Priority(n) => *n <= 100,
        TyperRule::StringAt { expected, .. } | TyperRule::IStringAt { expected, .. } => {
            !expected.is_empty()
        }
        TyperRule::Contains { needle, range, .. } => !needle.is_empty() && *range > 0,
        TyperRule::Locale(lang) => !lang.is_empty(),
        TyperRule::CharAt { .. } | TyperRule::ShortAt { .. } | TyperRule::IntAt { .. } => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_type_is_idempotent() {
        let mut db = MimeDatabase::new();
        let a = db.add_type("application", "pdf");
        let b = db.add_type("Application", "PDF");
        assert_eq!(a, b);
        assert_eq!(db.enumerate_types().len(), 1);
    }

    #[test]
    fn type_of_picks_highest_priority_match() {
        let mut db = MimeDatabase::new();
        let generic = db.add_type("application", "octet-stream");
        let pdf = db.add_type("application", "pdf");
        db.add_typer(generic, 0, TyperRule::Filename("*".into())).unwrap();
        db.add_typer(
            pdf,
            90,
            TyperRule::StringAt {
                offset: 0,
                expected: b"%PDF".to_vec(),
            },
        )
        .unwrap();

        let found = db.type_of("report.bin", b"%PDF-1.7").unwrap();
        assert_eq!(found, pdf);
    }

    #[test]
    fn type_of_breaks_ties_by_declaration_order() {
        let mut db = MimeDatabase::new();
        let first = db.add_type("text", "a");
        let second = db.add_type("text", "b");
        db.add_typer(first, 50, TyperRule::Filename("*.txt".into())).unwrap();
        db.add_typer(second, 50, TyperRule::Filename("*.txt".into())).unwrap();

        assert_eq!(db.type_of("file.txt", b"").unwrap(), first);
    }

    #[test]
    fn add_filter_updates_existing_triple() {
        let mut db = MimeDatabase::new();
        let pdf = ContentType::new("application", "pdf");
        let sink = ContentType::sink_for("alpha");
        db.add_filter(pdf.clone(), sink.clone(), 50, 0, "pdftoraster")
            .unwrap();
        db.add_filter(pdf.clone(), sink.clone(), 10, 0, "pdftoraster")
            .unwrap();
        assert_eq!(db.enumerate_filters().len(), 1);
        assert_eq!(db.enumerate_filters()[0].cost, 10);
    }

    #[test]
    fn malformed_typer_is_rejected() {
        let mut db = MimeDatabase::new();
        let t = db.add_type("text", "plain");
        let result = db.add_typer(t, 0, TyperRule::Filename(String::new()));
        assert!(result.is_err());
    }
}
