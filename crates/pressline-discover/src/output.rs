// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Plain-text announcement line formatting (§4.5): `"..."` quoting with
// `\NNN` octal escapes for bytes >= 128, `"`, or `\`.

use pressline_core::DiscoveredDevice;

/// Escape-quote `s` the way `cups-deviced` quotes its free-text fields.
pub fn escape_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for byte in s.bytes() {
        match byte {
            b'"' | b'\\' => {
                out.push('\\');
                out.push(byte as char);
            }
            0x80..=0xFF => out.push_str(&format!("\\{byte:03o}")),
            _ => out.push(byte as char),
        }
    }
    out.push('"');
    out
}

/// Format one device record as the `network  <uri>  "<make-and-model>"
/// "<name>"  "<device-id>"  "<location>"` line (§4.5).
pub fn format_line(device: &DiscoveredDevice) -> String {
    format!(
        "network  {}  {}  {}  {}  {}",
        device.uri,
        escape_quote(device.make_and_model.as_deref().unwrap_or("Unknown")),
        escape_quote(&device.service_name),
        escape_quote(device.device_id.as_deref().unwrap_or("")),
        escape_quote(device.location.as_deref().unwrap_or("")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pressline_core::TransportKind;

    fn sample() -> DiscoveredDevice {
        DiscoveredDevice {
            service_name: "Laser".into(),
            domain: "local.".into(),
            full_name: "Laser._ipps._tcp.local.".into(),
            make_and_model: Some("Example Laser \"Pro\"".into()),
            device_id: Some("MFG:Example;MDL:Laser;".into()),
            location: Some("Room 1".into()),
            uuid: None,
            transport_kind: TransportKind::Ipps,
            priority: 50,
            cups_shared: false,
            query_in_flight: false,
            emitted: true,
            uri: "dnssd://Laser._ipps._tcp.local./".into(),
        }
    }

    #[test]
    fn quotes_and_escapes_embedded_special_bytes() {
        assert_eq!(escape_quote("abc"), "\"abc\"");
        assert_eq!(escape_quote("a\"b"), "\"a\\\"b\"");
        assert_eq!(escape_quote("a\\b"), "\"a\\\\b\"");
        assert_eq!(escape_quote("caf\u{e9}"), "\"caf\\303\\251\"");
    }

    #[test]
    fn formats_the_full_announcement_line() {
        let line = format_line(&sample());
        assert!(line.starts_with("network  dnssd://Laser._ipps._tcp.local./  "));
        assert!(line.contains("\"Example Laser \\\"Pro\\\"\""));
        assert!(line.contains("\"Laser\""));
        assert!(line.contains("\"MFG:Example;MDL:Laser;\""));
        assert!(line.contains("\"Room 1\""));
    }
}
