// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Evaluation of typer rule trees (§3) against a candidate file: a basename, a
// prefix of the file's content, and the process locale.

use pressline_core::TyperRule;

/// Evaluate `rule` against `filename` (basename only) and `content` (the
/// first N bytes of the file, per the configured content-sniff window).
pub fn evaluate(rule: &TyperRule, filename: &str, content: &[u8], locale: &str) -> bool {
    match rule {
        TyperRule::And(rules) => rules.iter().all(|r| evaluate(r, filename, content, locale)),
        TyperRule::Or(rules) => rules.iter().any(|r| evaluate(r, filename, content, locale)),
        TyperRule::Not(inner) => !evaluate(inner, filename, content, locale),
        TyperRule::Filename(pattern) => glob_match(pattern, basename(filename)),
        // priority() is a declared weight, not a content test: it always
        // participates truthfully in an `and` chain.
        TyperRule::Priority(_) => true,
        TyperRule::StringAt { offset, expected } => match_at(content, *offset, expected, false),
        TyperRule::IStringAt { offset, expected } => match_at(content, *offset, expected, true),
        TyperRule::CharAt { offset, expected } => {
            content.get(*offset).is_some_and(|b| b == expected)
        }
        TyperRule::ShortAt { offset, expected } => {
            read_be::<2>(content, *offset).is_some_and(|v| v as u16 == *expected)
        }
        TyperRule::IntAt { offset, expected } => {
            read_be::<4>(content, *offset).is_some_and(|v| v as u32 == *expected)
        }
        TyperRule::Locale(prefix) => locale.starts_with(prefix.as_str()),
        TyperRule::Contains {
            offset,
            range,
            needle,
        } => {
            let end = (*offset + *range).min(content.len());
            *offset < content.len()
                && content[*offset..end]
                    .windows(needle.len().max(1))
                    .any(|w| w == needle.as_slice())
        }
    }
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn match_at(content: &[u8], offset: usize, expected: &[u8], case_insensitive: bool) -> bool {
    let end = offset + expected.len();
    if end > content.len() {
        return false;
    }
    let window = &content[offset..end];
    if case_insensitive {
        window.eq_ignore_ascii_case(expected)
    } else {
        window == expected
    }
}

fn read_be<const N: usize>(content: &[u8], offset: usize) -> Option<u64> {
    let end = offset + N;
    if end > content.len() {
        return None;
    }
    let mut acc: u64 = 0;
    for &b in &content[offset..end] {
        acc = (acc << 8) | u64::from(b);
    }
    Some(acc)
}

/// Shell-glob match (`*`, `?`) against a single path component.
fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    glob_match_impl(&p, &t)
}

fn glob_match_impl(p: &[char], t: &[char]) -> bool {
    match p.first() {
        None => t.is_empty(),
        Some('*') => {
            glob_match_impl(&p[1..], t) || (!t.is_empty() && glob_match_impl(p, &t[1..]))
        }
        Some('?') => !t.is_empty() && glob_match_impl(&p[1..], &t[1..]),
        Some(c) => t.first() == Some(c) && glob_match_impl(&p[1..], &t[1..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_glob_matches_extension() {
        assert!(evaluate(
            &TyperRule::Filename("*.pdf".into()),
            "report.pdf",
            b"",
            "en"
        ));
        assert!(!evaluate(
            &TyperRule::Filename("*.pdf".into()),
            "report.txt",
            b"",
            "en"
        ));
    }

    #[test]
    fn filename_glob_ignores_directory_components() {
        assert!(evaluate(
            &TyperRule::Filename("*.pdf".into()),
            "/tmp/staged/report.pdf",
            b"",
            "en"
        ));
    }

    #[test]
    fn string_at_matches_magic_header() {
        let rule = TyperRule::StringAt {
            offset: 0,
            expected: b"%PDF".to_vec(),
        };
        assert!(evaluate(&rule, "x", b"%PDF-1.7\n...", "en"));
        assert!(!evaluate(&rule, "x", b"not a pdf", "en"));
    }

    #[test]
    fn istring_at_is_case_insensitive() {
        let rule = TyperRule::IStringAt {
            offset: 0,
            expected: b"MAGIC".to_vec(),
        };
        assert!(evaluate(&rule, "x", b"magic-value", "en"));
    }

    #[test]
    fn int_at_reads_big_endian() {
        let rule = TyperRule::IntAt {
            offset: 0,
            expected: 0x89504e47,
        };
        assert!(evaluate(&rule, "x", &[0x89, 0x50, 0x4e, 0x47, 0x0d], "en"));
    }

    #[test]
    fn locale_matches_prefix() {
        assert!(evaluate(&TyperRule::Locale("en".into()), "x", b"", "en_GB"));
        assert!(!evaluate(&TyperRule::Locale("fr".into()), "x", b"", "en_GB"));
    }

    #[test]
    fn contains_searches_within_range() {
        let rule = TyperRule::Contains {
            offset: 0,
            range: 20,
            needle: b"PostScript".to_vec(),
        };
        assert!(evaluate(&rule, "x", b"%!PostScript-Adobe-3.0", "en"));
    }

    #[test]
    fn and_or_not_combine() {
        let rule = TyperRule::And(vec![
            TyperRule::Filename("*.ps".into()),
            TyperRule::Not(Box::new(TyperRule::StringAt {
                offset: 0,
                expected: b"%PDF".to_vec(),
            })),
        ]);
        assert!(evaluate(&rule, "doc.ps", b"%!PS-Adobe", "en"));
        assert!(!evaluate(&rule, "doc.ps", b"%PDF-1.4", "en"));
    }
}
