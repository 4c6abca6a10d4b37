// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// TXT-record field extraction and device-ID/make-and-model synthesis (§4.5).
// Parsing is split out from the mdns-sd callback so it can be unit tested
// against plain key/value pairs instead of a live `ServiceInfo`.

use uuid::Uuid;

/// Fields recognized out of a resolved service's TXT record.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TxtFields {
    pub usb_mfg: Option<String>,
    pub usb_mdl: Option<String>,
    pub product: Option<String>,
    pub ty: Option<String>,
    pub pdl: Option<String>,
    pub priority: Option<u32>,
    pub cups_shared: bool,
    pub location: Option<String>,
    pub uuid: Option<Uuid>,
}

fn truncate_at_comma(s: &str) -> &str {
    match s.find(',') {
        Some(idx) => &s[..idx],
        None => s,
    }
}

fn strip_parens(s: &str) -> &str {
    s.trim().trim_start_matches('(').trim_end_matches(')').trim()
}

/// Parse TXT key/value pairs (case-insensitive keys) into [`TxtFields`].
/// `pairs` yields exactly what `ServiceInfo::get_properties` would: raw
/// key/value strings, one per TXT entry.
pub fn parse<'a, I>(pairs: I) -> TxtFields
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut fields = TxtFields::default();
    for (key, value) in pairs {
        match key.to_ascii_lowercase().as_str() {
            "usb_mfg" | "usb_manu" | "usb_manufacturer" => {
                fields.usb_mfg = Some(value.to_string());
            }
            "usb_mdl" | "usb_model" => {
                fields.usb_mdl = Some(value.to_string());
            }
            "product" => {
                fields.product = Some(strip_parens(value).to_string());
            }
            "ty" => {
                fields.ty = Some(truncate_at_comma(value).to_string());
            }
            "pdl" => fields.pdl = Some(value.to_string()),
            "priority" => fields.priority = value.parse().ok(),
            "printer-type" => fields.cups_shared = true,
            "note" => fields.location = Some(value.to_string()),
            "uuid" => fields.uuid = Uuid::parse_str(value.trim_start_matches("urn:uuid:")).ok(),
            _ => {}
        }
    }
    fields
}

/// Best-effort make from a free-text model string, used only to fabricate a
/// device ID when no `usb_*` keys are present (§4.5).
fn guess_make_from_model(model: &str) -> Option<&'static str> {
    let lower = model.to_ascii_lowercase();
    if lower.contains("designjet") || lower.contains("laserjet") || lower.contains("deskjet") {
        Some("HP")
    } else if lower.contains("stylus") || lower.contains("workforce") {
        Some("EPSON")
    } else if lower.contains("optra") {
        Some("Lexmark")
    } else {
        None
    }
}

/// Synthesize an IEEE-1284 device ID from the recognized TXT fields. Prefers
/// the explicit `usb_MFG`/`usb_MDL` pair; falls back to a heuristic guess
/// from the model text when neither is present.
pub fn device_id(fields: &TxtFields) -> Option<String> {
    if let (Some(mfg), Some(mdl)) = (&fields.usb_mfg, &fields.usb_mdl) {
        return Some(format!("MFG:{mfg};MDL:{mdl};"));
    }
    let model = fields.ty.as_deref().or(fields.product.as_deref())?;
    let mfg = guess_make_from_model(model)?;
    Some(format!("MFG:{mfg};MDL:{model};"))
}

/// Strip a manufacturer prefix that is duplicated at the start of a
/// make-and-model string (`"EPSON EPSON Stylus"` → `"EPSON Stylus"`).
pub fn normalize_make_and_model(raw: &str) -> String {
    const DUPLICATED_PREFIXES: &[(&str, &str)] = &[
        ("EPSON EPSON ", "EPSON "),
        ("HP HP ", "HP "),
        ("Lexmark International Lexmark ", "Lexmark "),
    ];
    for (duplicated, single) in DUPLICATED_PREFIXES {
        if let Some(stripped) = raw.strip_prefix(duplicated) {
            return format!("{single}{stripped}");
        }
    }
    raw.to_string()
}

/// Derive the make-and-model text shown in the announcement line: prefer
/// `ty`, then `product`, else "Unknown".
pub fn make_and_model(fields: &TxtFields) -> String {
    let raw = fields
        .ty
        .clone()
        .or_else(|| fields.product.clone())
        .unwrap_or_else(|| "Unknown".to_string());
    normalize_make_and_model(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_all_documented_keys() {
        let fields = parse([
            ("usb_MFG", "Hewlett-Packard"),
            ("usb_MDL", "DeskJet 970C"),
            ("ty", "HP DeskJet 970C,Color"),
            ("pdl", "application/pdf"),
            ("priority", "25"),
            ("printer-type", "0x8000"),
            ("note", "Room 204"),
            ("UUID", "urn:uuid:4509a320-00a0-008f-00b6-002507510eca"),
        ]);
        assert_eq!(fields.usb_mfg.as_deref(), Some("Hewlett-Packard"));
        assert_eq!(fields.usb_mdl.as_deref(), Some("DeskJet 970C"));
        assert_eq!(fields.ty.as_deref(), Some("HP DeskJet 970C"));
        assert_eq!(fields.priority, Some(25));
        assert!(fields.cups_shared);
        assert_eq!(fields.location.as_deref(), Some("Room 204"));
        assert!(fields.uuid.is_some());
    }

    #[test]
    fn product_key_is_stripped_of_parens() {
        let fields = parse([("product", "(Brother HL-2270DW series)")]);
        assert_eq!(fields.product.as_deref(), Some("Brother HL-2270DW series"));
    }

    #[test]
    fn device_id_prefers_usb_fields_over_heuristics() {
        let fields = parse([("usb_MFG", "EPSON"), ("usb_MDL", "Stylus Photo"), ("ty", "designjet 500")]);
        assert_eq!(device_id(&fields).as_deref(), Some("MFG:EPSON;MDL:Stylus Photo;"));
    }

    #[test]
    fn device_id_falls_back_to_model_heuristics() {
        let fields = parse([("ty", "HP Designjet 500")]);
        assert_eq!(device_id(&fields).as_deref(), Some("MFG:HP;MDL:HP Designjet 500;"));
        let fields = parse([("ty", "EPSON Stylus Photo R2400")]);
        assert_eq!(
            device_id(&fields).as_deref(),
            Some("MFG:EPSON;MDL:EPSON Stylus Photo R2400;")
        );
    }

    #[test]
    fn device_id_is_none_without_usable_fields() {
        let fields = parse([("note", "Room 1")]);
        assert_eq!(device_id(&fields), None);
    }

    #[test]
    fn normalizes_duplicated_manufacturer_prefixes() {
        assert_eq!(
            normalize_make_and_model("EPSON EPSON Stylus Photo R2400"),
            "EPSON Stylus Photo R2400"
        );
        assert_eq!(normalize_make_and_model("HP HP LaserJet 4000"), "HP LaserJet 4000");
        assert_eq!(
            normalize_make_and_model("Lexmark International Lexmark Optra N"),
            "Lexmark Optra N"
        );
        assert_eq!(normalize_make_and_model("Canon PIXMA MG3620"), "Canon PIXMA MG3620");
    }
}
