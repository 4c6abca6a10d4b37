// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Hand-rolled IPP/1.1 attribute-group encoding (RFC 8010 §3, RFC 8011), byte-
// exact with the wire format. Shared by the scheduler's response builder and
// the mini-daemon frame writer — neither parses nor builds IPP through a
// generic encoding crate.

pub const IPP_VERSION_MAJOR: u8 = 1;
pub const IPP_VERSION_MINOR: u8 = 1;

/// Delimiter and value tags used on the wire (RFC 8010 §3.5).
pub mod tag {
    pub const OPERATION_ATTRIBUTES: u8 = 0x01;
    pub const JOB_ATTRIBUTES: u8 = 0x02;
    pub const END_OF_ATTRIBUTES: u8 = 0x03;
    pub const PRINTER_ATTRIBUTES: u8 = 0x04;

    pub const INTEGER: u8 = 0x21;
    pub const BOOLEAN: u8 = 0x22;
    pub const ENUM: u8 = 0x23;
    pub const TEXT_WITHOUT_LANGUAGE: u8 = 0x41;
    pub const NAME_WITHOUT_LANGUAGE: u8 = 0x42;
    pub const KEYWORD: u8 = 0x44;
    pub const URI: u8 = 0x45;
    pub const CHARSET: u8 = 0x47;
    pub const NATURAL_LANGUAGE: u8 = 0x48;
    pub const MIME_MEDIA_TYPE: u8 = 0x49;
}

/// Builds an IPP response (or mini-daemon attribute stream) one attribute at
/// a time, matching the group-then-attributes discipline of RFC 8010 §3.1.1.
pub struct IppResponseBuilder {
    buf: Vec<u8>,
    current_group: Option<u8>,
}

impl IppResponseBuilder {
    /// `status_or_operation` carries the 2-byte status-code field for a
    /// response, or an operation-id for a request; `request_id` is echoed
    /// from the triggering request (or, for a mini-daemon, from its
    /// command-line argument).
    pub fn new(status_or_operation: u16, request_id: i32) -> Self {
        let mut buf = Vec::with_capacity(64);
        buf.push(IPP_VERSION_MAJOR);
        buf.push(IPP_VERSION_MINOR);
        buf.extend_from_slice(&status_or_operation.to_be_bytes());
        buf.extend_from_slice(&request_id.to_be_bytes());
        Self {
            buf,
            current_group: None,
        }
    }

    /// Open (or re-enter) an attribute group. Writing the same group tag
    /// twice in a row is a no-op; a printer-attributes group per device is
    /// expected to call this once per device (§4.7).
    pub fn group(mut self, group_tag: u8) -> Self {
        if self.current_group != Some(group_tag) {
            self.buf.push(group_tag);
            self.current_group = Some(group_tag);
        }
        self
    }

    fn write_value(&mut self, value_tag: u8, name: &str, value: &[u8]) {
        self.buf.push(value_tag);
        self.buf
            .extend_from_slice(&(name.len() as u16).to_be_bytes());
        self.buf.extend_from_slice(name.as_bytes());
        self.buf
            .extend_from_slice(&(value.len() as u16).to_be_bytes());
        self.buf.extend_from_slice(value);
    }

    pub fn charset(mut self, name: &str, value: &str) -> Self {
        self.write_value(tag::CHARSET, name, value.as_bytes());
        self
    }

    pub fn natural_language(mut self, name: &str, value: &str) -> Self {
        self.write_value(tag::NATURAL_LANGUAGE, name, value.as_bytes());
        self
    }

    pub fn keyword(mut self, name: &str, value: &str) -> Self {
        self.write_value(tag::KEYWORD, name, value.as_bytes());
        self
    }

    /// An additional value of a 1setOf keyword; the name field is empty
    /// (RFC 8010 §3.5.2).
    pub fn keyword_additional(mut self, value: &str) -> Self {
        self.write_value(tag::KEYWORD, "", value.as_bytes());
        self
    }

    pub fn uri(mut self, name: &str, value: &str) -> Self {
        self.write_value(tag::URI, name, value.as_bytes());
        self
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.write_value(tag::TEXT_WITHOUT_LANGUAGE, name, value.as_bytes());
        self
    }

    pub fn name_attr(mut self, name: &str, value: &str) -> Self {
        self.write_value(tag::NAME_WITHOUT_LANGUAGE, name, value.as_bytes());
        self
    }

    pub fn mime_media_type(mut self, name: &str, value: &str) -> Self {
        self.write_value(tag::MIME_MEDIA_TYPE, name, value.as_bytes());
        self
    }

    pub fn integer(mut self, name: &str, value: i32) -> Self {
        self.write_value(tag::INTEGER, name, &value.to_be_bytes());
        self
    }

    pub fn enum_attr(mut self, name: &str, value: i32) -> Self {
        self.write_value(tag::ENUM, name, &value.to_be_bytes());
        self
    }

    pub fn boolean(mut self, name: &str, value: bool) -> Self {
        self.write_value(tag::BOOLEAN, name, &[u8::from(value)]);
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        self.buf.push(tag::END_OF_ATTRIBUTES);
        self.buf
    }
}

/// A parsed IPP message: header fields plus the attribute groups that
/// followed, used to decode a mini-daemon's framed stdout (§4.7).
#[derive(Debug, Clone)]
pub struct IppMessage {
    pub status_or_operation: u16,
    pub request_id: i32,
    pub groups: Vec<IppGroup>,
}

#[derive(Debug, Clone)]
pub struct IppGroup {
    pub tag: u8,
    pub attributes: Vec<IppAttribute>,
}

#[derive(Debug, Clone)]
pub struct IppAttribute {
    pub value_tag: u8,
    pub name: String,
    pub value: Vec<u8>,
}

impl IppAttribute {
    pub fn as_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.value)
    }

    pub fn as_i32(&self) -> Option<i32> {
        (self.value.len() == 4).then(|| i32::from_be_bytes(self.value[..4].try_into().unwrap()))
    }
}

/// Outcome of attempting to parse a (possibly partial) byte buffer.
pub enum ParseOutcome {
    Incomplete,
    Complete { message: IppMessage, consumed: usize },
}

/// Parse one IPP message out of the front of `buf`. On success, `consumed`
/// is the number of bytes the message occupied, including the trailing
/// end-of-attributes tag, so the caller can drain exactly that much from a
/// streaming buffer.
pub fn try_parse(buf: &[u8]) -> ParseOutcome {
    if buf.len() < 8 {
        return ParseOutcome::Incomplete;
    }
    let status_or_operation = u16::from_be_bytes([buf[2], buf[3]]);
    let request_id = i32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
    let mut pos = 8;
    let mut groups: Vec<IppGroup> = Vec::new();

    loop {
        if pos >= buf.len() {
            return ParseOutcome::Incomplete;
        }
        let t = buf[pos];
        pos += 1;

        if t == tag::END_OF_ATTRIBUTES {
            return ParseOutcome::Complete {
                message: IppMessage {
                    status_or_operation,
                    request_id,
                    groups,
                },
                consumed: pos,
            };
        }

        if t < 0x10 {
            groups.push(IppGroup {
                tag: t,
                attributes: Vec::new(),
            });
            continue;
        }

        if pos + 2 > buf.len() {
            return ParseOutcome::Incomplete;
        }
        let name_len = u16::from_be_bytes([buf[pos], buf[pos + 1]]) as usize;
        pos += 2;
        if pos + name_len > buf.len() {
            return ParseOutcome::Incomplete;
        }
        let name = String::from_utf8_lossy(&buf[pos..pos + name_len]).into_owned();
        pos += name_len;

        if pos + 2 > buf.len() {
            return ParseOutcome::Incomplete;
        }
        let value_len = u16::from_be_bytes([buf[pos], buf[pos + 1]]) as usize;
        pos += 2;
        if pos + value_len > buf.len() {
            return ParseOutcome::Incomplete;
        }
        let value = buf[pos..pos + value_len].to_vec();
        pos += value_len;

        let attribute = IppAttribute {
            value_tag: t,
            name,
            value,
        };
        match groups.last_mut() {
            Some(g) => g.attributes.push(attribute),
            None => groups.push(IppGroup {
                tag: 0,
                attributes: vec![attribute],
            }),
        }
    }
}
