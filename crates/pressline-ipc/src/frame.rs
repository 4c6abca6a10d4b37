// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Mini-daemon stdout framing (§4.7, component G): an optional CGI header
// followed by an IPP response header, attribute groups, and an
// end-of-attributes terminator. The parent multiplexes several of these
// streams with non-blocking reads, so the decoder side has to cope with a
// frame arriving in arbitrarily small pieces.

use std::io::{self, Write};

use crate::ipp_wire::{self, IppMessage, ParseOutcome};

/// Write one framed IPP message to a mini-daemon's stdout. `cgi_mode` governs
/// whether the `Content-Type: application/ipp` header CUPS's CGI path expects
/// precedes the binary body (§4.7).
pub fn write_frame<W: Write>(out: &mut W, message: &[u8], cgi_mode: bool) -> io::Result<()> {
    if cgi_mode {
        out.write_all(b"Content-Type: application/ipp\n\n")?;
    }
    out.write_all(message)
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Incrementally decodes a stream of mini-daemon frames out of chunks handed
/// in as they're read off a child's stdout pipe.
#[derive(Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn strip_cgi_header(&mut self) {
        if self.buf.starts_with(b"Content-Type:") {
            if let Some(pos) = find_subsequence(&self.buf, b"\n\n") {
                self.buf.drain(..pos + 2);
            }
        }
    }

    /// Append `chunk` to the internal buffer and return every frame that
    /// became complete as a result. Bytes belonging to a still-incomplete
    /// frame are retained for the next call.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<IppMessage> {
        self.buf.extend_from_slice(chunk);
        self.strip_cgi_header();

        let mut out = Vec::new();
        loop {
            match ipp_wire::try_parse(&self.buf) {
                ParseOutcome::Complete { message, consumed } => {
                    out.push(message);
                    self.buf.drain(..consumed);
                    self.strip_cgi_header();
                }
                ParseOutcome::Incomplete => break,
            }
        }
        out
    }

    /// Bytes buffered but not yet part of a complete frame.
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipp_wire::{tag, IppResponseBuilder};

    fn sample_message() -> Vec<u8> {
        IppResponseBuilder::new(0, 1)
            .group(tag::OPERATION_ATTRIBUTES)
            .charset("attributes-charset", "utf-8")
            .group(tag::PRINTER_ATTRIBUTES)
            .uri("device-uri", "dnssd://alpha._ipp._tcp.local/")
            .build()
    }

    #[test]
    fn decodes_a_frame_delivered_in_one_piece() {
        let mut out = Vec::new();
        write_frame(&mut out, &sample_message(), false).unwrap();

        let mut decoder = FrameDecoder::new();
        let messages = decoder.feed(&out);
        assert_eq!(messages.len(), 1);
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn decodes_a_frame_delivered_byte_by_byte() {
        let mut out = Vec::new();
        write_frame(&mut out, &sample_message(), true).unwrap();

        let mut decoder = FrameDecoder::new();
        let mut seen = Vec::new();
        for b in &out {
            seen.extend(decoder.feed(std::slice::from_ref(b)));
        }
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].groups.len(), 2);
    }

    #[test]
    fn decodes_back_to_back_frames_sharing_one_buffer() {
        let mut out = Vec::new();
        write_frame(&mut out, &sample_message(), false).unwrap();
        write_frame(&mut out, &sample_message(), false).unwrap();

        let mut decoder = FrameDecoder::new();
        let messages = decoder.feed(&out);
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn strips_the_cgi_content_type_header_before_parsing() {
        let mut out = Vec::new();
        write_frame(&mut out, &sample_message(), true).unwrap();

        let mut decoder = FrameDecoder::new();
        let messages = decoder.feed(&out);
        assert_eq!(messages.len(), 1);
    }
}
