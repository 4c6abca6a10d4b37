// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Baseline MIME types and filter edges registered at startup, mirroring the
// small built-in `mime.types`/`mime.convs` every CUPS-family scheduler ships
// before any printer-specific PPD filters are added.

use pressline_core::{ContentType, Result};
use pressline_mime::MimeDatabase;

/// The generic raster type every backend-specific filter ultimately produces
/// from. Printer registration appends one more edge from here to the
/// printer's own `printer/<queue>` sink.
pub const RASTER_TYPE: (&str, &str) = ("application", "vnd.cups-raster");

/// Register the small set of document formats and converters every instance
/// understands without any printer-specific configuration.
pub fn register_core_filters(db: &mut MimeDatabase) -> Result<()> {
    db.add_type("text", "plain");
    db.add_type("application", "postscript");
    db.add_type("application", "pdf");
    db.add_type("application", "octet-stream");
    db.add_type(RASTER_TYPE.0, RASTER_TYPE.1);

    db.add_filter(
        ContentType::new("text", "plain"),
        ContentType::new(RASTER_TYPE.0, RASTER_TYPE.1),
        50,
        0,
        "texttoraster",
    )?;
    db.add_filter(
        ContentType::new("application", "pdf"),
        ContentType::new("application", "postscript"),
        30,
        0,
        "pdftops",
    )?;
    db.add_filter(
        ContentType::new("application", "postscript"),
        ContentType::new(RASTER_TYPE.0, RASTER_TYPE.1),
        40,
        0,
        "pstoraster",
    )?;

    Ok(())
}

/// Register the backend-specific final filters for a newly added printer:
/// raster in, the printer's own sink type out, plus a zero-cost raw
/// passthrough for clients that already hand over backend-ready bytes
/// (the LPD `l` control-file directive, §4.6 scenario S6, always submits
/// `application/octet-stream`). Every registered printer needs at least
/// one of these edges or no chain can ever reach it (§4.2: "no path" is a
/// normal planner outcome, but an administrator adding a printer with no
/// final filter is a misconfiguration worth a log line, not a silent gap).
pub fn register_printer_backend_filter(db: &mut MimeDatabase, printer_name: &str) -> Result<()> {
    let sink = ContentType::sink_for(printer_name);
    db.add_filter(ContentType::new(RASTER_TYPE.0, RASTER_TYPE.1), sink.clone(), 10, 0, "rastertoprinter")?;
    db.add_filter(ContentType::new("application", "octet-stream"), sink, 0, 0, "-")
}
