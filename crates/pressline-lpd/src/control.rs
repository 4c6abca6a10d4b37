// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// RFC 1179 control-file field parsing (§4.6). A control file is a sequence
// of lines, each starting with a single field code; the remainder of the
// line is that field's value.

use pressline_core::{PresslineError, Result};

/// One `c/d/f/g/l/n/o/p/r/t/v` print-format directive, pairing a format code
/// with the data-file name it refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDirective {
    pub kind: char,
    pub data_file_name: String,
}

/// A parsed control file (§4.6). Job/source/user/banner are the
/// client-supplied metadata fields; `directives` is the ordered list of
/// "print this data file this way" entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlFile {
    pub job_name: Option<String>,
    pub source_file_name: Option<String>,
    pub requesting_user: Option<String>,
    pub print_banner: bool,
    pub directives: Vec<FileDirective>,
}

const FILE_DIRECTIVE_CODES: &[char] = &['c', 'd', 'f', 'g', 'l', 'n', 'o', 'p', 'r', 't', 'v'];

/// Decode control-file bytes as UTF-8, falling back to ISO-8859-1 (every
/// byte maps 1:1 onto the first 256 Unicode code points) when the bytes
/// aren't valid UTF-8 (§4.6, §6 control-file character set).
pub fn decode_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Parse a decoded control file into its fields (§4.6). Unknown field codes
/// are ignored rather than rejected, matching RFC 1179's silence on
/// forward-compatibility.
pub fn parse(text: &str) -> Result<ControlFile> {
    let mut file = ControlFile::default();
    for line in text.lines() {
        if line.is_empty() {
            continue;
        }
        let mut chars = line.chars();
        let code = chars.next().ok_or_else(|| PresslineError::Protocol("empty control-file line".into()))?;
        let value = chars.as_str();
        match code {
            'J' => file.job_name = Some(value.to_string()),
            'N' => file.source_file_name = Some(value.to_string()),
            'P' => file.requesting_user = Some(value.to_string()),
            'L' => file.print_banner = true,
            c if FILE_DIRECTIVE_CODES.contains(&c) => {
                file.directives.push(FileDirective {
                    kind: c,
                    data_file_name: value.trim_start().to_string(),
                });
            }
            _ => {}
        }
    }
    Ok(file)
}

/// Map a print-format directive to `(document-format, raw)` (§4.6, §7
/// error-taxonomy note: unmapped codes fall back to raw octet-stream rather
/// than rejecting the job).
pub fn format_for(kind: char) -> (&'static str, bool) {
    match kind {
        'l' => ("application/octet-stream", true),
        'f' => ("text/plain", false),
        'o' => ("application/postscript", false),
        _ => ("application/octet-stream", false),
    }
}
