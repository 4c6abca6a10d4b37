// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The IPP/1.1 request surface (§4.4): a thin request view over
// `pressline_ipc::ipp_wire`'s streaming parser, plus per-operation dispatch
// onto the `Scheduler`. The attribute encoder is never re-implemented here —
// every response is built with `pressline_ipc::IppResponseBuilder`.

use pressline_core::{ContentType, JobId, PresslineError, PrinterRef};
use pressline_ipc::ipp_wire::{tag, IppAttribute, IppGroup, IppResponseBuilder, ParseOutcome};
use tracing::{debug, warn};

use crate::scheduler::Scheduler;

pub mod op {
    pub const PRINT_JOB: u16 = 0x0002;
    pub const VALIDATE_JOB: u16 = 0x0004;
    pub const CREATE_JOB: u16 = 0x0005;
    pub const SEND_DOCUMENT: u16 = 0x0006;
    pub const CANCEL_JOB: u16 = 0x0008;
    pub const GET_JOB_ATTRIBUTES: u16 = 0x0009;
    pub const GET_JOBS: u16 = 0x000A;
    pub const GET_PRINTER_ATTRIBUTES: u16 = 0x000B;
    /// Vendor extension mirroring CUPS's own `CUPS-Get-Printers` (§6).
    pub const PRESSLINE_GET_PRINTERS: u16 = 0x4001;
}

pub mod status {
    pub const OK: u16 = 0x0000;
    pub const CLIENT_ERROR_BAD_REQUEST: u16 = 0x0400;
}

/// A parsed IPP request: the header plus every attribute group, with any
/// bytes after the end-of-attributes tag retained as document data.
pub struct IppRequest {
    pub operation_id: u16,
    pub request_id: i32,
    pub groups: Vec<IppGroup>,
    pub document_data: Vec<u8>,
}

impl IppRequest {
    pub fn parse(body: &[u8]) -> std::result::Result<Self, String> {
        match pressline_ipc::ipp_wire::try_parse(body) {
            ParseOutcome::Complete { message, consumed } => Ok(Self {
                operation_id: message.status_or_operation,
                request_id: message.request_id,
                groups: message.groups,
                document_data: body[consumed..].to_vec(),
            }),
            ParseOutcome::Incomplete => Err("truncated IPP request".into()),
        }
    }

    fn operation_attr(&self, name: &str) -> Option<&IppAttribute> {
        self.groups
            .iter()
            .find(|g| g.tag == tag::OPERATION_ATTRIBUTES)
            .and_then(|g| g.attributes.iter().find(|a| a.name == name))
    }

    pub fn operation_str(&self, name: &str) -> Option<String> {
        self.operation_attr(name).map(|a| a.as_str().into_owned())
    }

    pub fn operation_i32(&self, name: &str) -> Option<i32> {
        self.operation_attr(name).and_then(IppAttribute::as_i32)
    }
}

/// Pull the printer name out of a `printer-uri` attribute's final path
/// segment (`ipp://host/printers/alpha` -> `alpha`).
fn printer_name_from_uri(uri: &str) -> Option<&str> {
    uri.rsplit('/').next().filter(|s| !s.is_empty())
}

fn error_response(status: u16, request_id: i32, message: &str) -> Vec<u8> {
    IppResponseBuilder::new(status, request_id)
        .group(tag::OPERATION_ATTRIBUTES)
        .charset("attributes-charset", "utf-8")
        .natural_language("attributes-natural-language", "en")
        .text("status-message", message)
        .build()
}

fn ok_header(request_id: i32) -> IppResponseBuilder {
    IppResponseBuilder::new(status::OK, request_id)
        .group(tag::OPERATION_ATTRIBUTES)
        .charset("attributes-charset", "utf-8")
        .natural_language("attributes-natural-language", "en")
        .text("status-message", "successful-ok")
}

fn resolve_printer(scheduler: &Scheduler, request: &IppRequest) -> Result<PrinterRef, Vec<u8>> {
    let uri = request.operation_str("printer-uri");
    let name = uri.as_deref().and_then(printer_name_from_uri);
    match name.and_then(|n| scheduler.find_printer_by_name(n)) {
        Some(r) => Ok(r),
        None => Err(error_response(
            PresslineError::PrinterNotFound(uri.unwrap_or_default()).ipp_status(),
            request.request_id,
            "printer-uri does not name a known printer",
        )),
    }
}

/// Route a parsed request to its operation handler.
pub fn dispatch(scheduler: &Scheduler, request: &IppRequest) -> Vec<u8> {
    match request.operation_id {
        op::PRINT_JOB => handle_print_job(scheduler, request),
        op::VALIDATE_JOB => handle_validate_job(request),
        op::CREATE_JOB => handle_create_job(scheduler, request),
        op::SEND_DOCUMENT => handle_send_document(scheduler, request),
        op::CANCEL_JOB => handle_cancel_job(scheduler, request),
        op::GET_JOB_ATTRIBUTES => handle_get_job_attributes(scheduler, request),
        op::GET_JOBS => handle_get_jobs(scheduler, request),
        op::GET_PRINTER_ATTRIBUTES => handle_get_printer_attributes(scheduler, request),
        op::PRESSLINE_GET_PRINTERS => handle_get_printers(scheduler, request),
        other => {
            warn!(operation = format!("0x{other:04X}"), "unsupported IPP operation");
            error_response(
                0x0501,
                request.request_id,
                &format!("operation 0x{other:04X} is not supported"),
            )
        }
    }
}

fn document_format(request: &IppRequest) -> ContentType {
    request
        .operation_str("document-format")
        .and_then(|s| ContentType::parse(&s))
        .unwrap_or_else(|| ContentType::new("application", "octet-stream"))
}

fn handle_print_job(scheduler: &Scheduler, request: &IppRequest) -> Vec<u8> {
    let printer_ref = match resolve_printer(scheduler, request) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let user = request.operation_str("requesting-user-name").unwrap_or_else(|| "anonymous".into());
    let title = request
        .operation_str("job-name")
        .or_else(|| request.operation_str("document-name"))
        .unwrap_or_else(|| "Untitled".into());

    let job_id = match scheduler.create_job(printer_ref, &user, &title, serde_json::json!({})) {
        Ok(id) => id,
        Err(e) => return error_response(e.ipp_status(), request.request_id, &e.to_string()),
    };

    let format = document_format(request);
    if let Err(e) = scheduler.submit_document(job_id, format, true, request.document_data.clone()) {
        return error_response(e.ipp_status(), request.request_id, &e.to_string());
    }

    debug!(job_id = job_id.0, "Print-Job accepted");
    ok_header(request.request_id)
        .group(tag::JOB_ATTRIBUTES)
        .integer("job-id", job_id.0)
        .enum_attr("job-state", 9) // completed: no asynchronous processing stage in this surface
        .keyword("job-state-reasons", "job-completed-successfully")
        .build()
}

fn handle_validate_job(request: &IppRequest) -> Vec<u8> {
    ok_header(request.request_id).build()
}

fn handle_create_job(scheduler: &Scheduler, request: &IppRequest) -> Vec<u8> {
    let printer_ref = match resolve_printer(scheduler, request) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let user = request.operation_str("requesting-user-name").unwrap_or_else(|| "anonymous".into());
    let title = request.operation_str("job-name").unwrap_or_else(|| "Untitled".into());

    match scheduler.create_job(printer_ref, &user, &title, serde_json::json!({})) {
        Ok(job_id) => ok_header(request.request_id)
            .group(tag::JOB_ATTRIBUTES)
            .integer("job-id", job_id.0)
            .enum_attr("job-state", 3) // pending
            .keyword("job-state-reasons", "none")
            .build(),
        Err(e) => error_response(e.ipp_status(), request.request_id, &e.to_string()),
    }
}

fn handle_send_document(scheduler: &Scheduler, request: &IppRequest) -> Vec<u8> {
    let Some(job_id) = request.operation_i32("job-id") else {
        return error_response(
            status::CLIENT_ERROR_BAD_REQUEST,
            request.request_id,
            "missing required job-id attribute",
        );
    };
    let is_last = request
        .operation_attr_bool("last-document")
        .unwrap_or(true);
    let format = document_format(request);

    match scheduler.submit_document(JobId(job_id), format, is_last, request.document_data.clone()) {
        Ok(()) => ok_header(request.request_id).build(),
        Err(e) => error_response(e.ipp_status(), request.request_id, &e.to_string()),
    }
}

fn handle_cancel_job(scheduler: &Scheduler, request: &IppRequest) -> Vec<u8> {
    let Some(job_id) = request.operation_i32("job-id") else {
        return error_response(
            status::CLIENT_ERROR_BAD_REQUEST,
            request.request_id,
            "missing required job-id attribute",
        );
    };
    let user = request.operation_str("requesting-user-name").unwrap_or_else(|| "anonymous".into());

    match scheduler.cancel_job(JobId(job_id), &user) {
        Ok(()) => ok_header(request.request_id).build(),
        Err(e) => error_response(e.ipp_status(), request.request_id, &e.to_string()),
    }
}

fn handle_get_job_attributes(scheduler: &Scheduler, request: &IppRequest) -> Vec<u8> {
    let Some(job_id) = request.operation_i32("job-id") else {
        return error_response(
            status::CLIENT_ERROR_BAD_REQUEST,
            request.request_id,
            "missing required job-id attribute",
        );
    };
    match scheduler.get_job(JobId(job_id)) {
        Ok(Some(job)) => ok_header(request.request_id)
            .group(tag::JOB_ATTRIBUTES)
            .integer("job-id", job.id.0)
            .name_attr("job-name", &job.title)
            .enum_attr("job-state", job_state_to_ipp(job.state))
            .keyword("job-state-reasons", job_state_reason(job.state))
            .build(),
        Ok(None) => error_response(
            PresslineError::JobNotFound(job_id).ipp_status(),
            request.request_id,
            &format!("job {job_id} not found"),
        ),
        Err(e) => error_response(e.ipp_status(), request.request_id, &e.to_string()),
    }
}

fn handle_get_jobs(scheduler: &Scheduler, request: &IppRequest) -> Vec<u8> {
    let printer_ref = match resolve_printer(scheduler, request) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let printer_name = match scheduler.printer_state(printer_ref) {
        Ok(p) => p.name,
        Err(e) => return error_response(e.ipp_status(), request.request_id, &e.to_string()),
    };
    let jobs = match scheduler.jobs_for_printer(&printer_name) {
        Ok(jobs) => jobs,
        Err(e) => return error_response(e.ipp_status(), request.request_id, &e.to_string()),
    };

    let mut resp = ok_header(request.request_id);
    for job in &jobs {
        resp = resp
            .group(tag::JOB_ATTRIBUTES)
            .integer("job-id", job.id.0)
            .name_attr("job-name", &job.title)
            .enum_attr("job-state", job_state_to_ipp(job.state))
            .keyword("job-state-reasons", job_state_reason(job.state));
    }
    resp.build()
}

fn handle_get_printer_attributes(scheduler: &Scheduler, request: &IppRequest) -> Vec<u8> {
    let printer_ref = match resolve_printer(scheduler, request) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let printer = match scheduler.printer_state(printer_ref) {
        Ok(p) => p,
        Err(e) => return error_response(e.ipp_status(), request.request_id, &e.to_string()),
    };

    let mut resp = ok_header(request.request_id)
        .group(tag::PRINTER_ATTRIBUTES)
        .name_attr("printer-name", &printer.name)
        .boolean("printer-is-accepting-jobs", printer.is_accepting)
        .boolean("printer-is-shared", printer.is_shared)
        .enum_attr("printer-state", printer_state_to_ipp(printer.state))
        .keyword("printer-state-reasons", "none")
        .uri("device-uri", &format!("printer://{}", printer.name));

    if let Some((name, value)) = first_attribute(&printer.attributes) {
        resp = resp.text(name, value);
    }
    for format in &printer.supported_source_types {
        resp = resp.keyword_additional(&format.to_string());
    }

    resp.build()
}

fn first_attribute(attrs: &std::collections::BTreeMap<String, String>) -> Option<(&str, &str)> {
    attrs.iter().next().map(|(k, v)| (k.as_str(), v.as_str()))
}

fn handle_get_printers(scheduler: &Scheduler, request: &IppRequest) -> Vec<u8> {
    let mut resp = ok_header(request.request_id);
    for printer in scheduler.list_printers() {
        resp = resp
            .group(tag::PRINTER_ATTRIBUTES)
            .name_attr("printer-name", &printer.name)
            .boolean("printer-is-accepting-jobs", printer.is_accepting)
            .enum_attr("printer-state", printer_state_to_ipp(printer.state));
    }
    resp.build()
}

fn job_state_to_ipp(state: pressline_core::JobState) -> i32 {
    use pressline_core::JobState::*;
    match state {
        Pending => 3,
        Held => 4,
        Processing => 5,
        Canceled => 7,
        Aborted => 8,
        Completed => 9,
    }
}

fn job_state_reason(state: pressline_core::JobState) -> &'static str {
    use pressline_core::JobState::*;
    match state {
        Pending => "none",
        Held => "job-hold-until-specified",
        Processing => "job-printing",
        Completed => "job-completed-successfully",
        Canceled => "job-canceled-by-user",
        Aborted => "aborted-by-system",
    }
}

fn printer_state_to_ipp(state: pressline_core::PrinterState) -> i32 {
    use pressline_core::PrinterState::*;
    match state {
        Idle => 3,
        Processing => 4,
        Stopped => 5,
    }
}

trait BooleanAttr {
    fn operation_attr_bool(&self, name: &str) -> Option<bool>;
}

impl BooleanAttr for IppRequest {
    fn operation_attr_bool(&self, name: &str) -> Option<bool> {
        self.operation_attr(name).and_then(|a| a.value.first().map(|&b| b != 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::PrinterDescriptor;
    use pressline_ipc::ipp_wire::IppResponseBuilder as ReqBuilder;
    use pressline_mime::MimeDatabase;

    fn scheduler_with_alpha() -> Scheduler {
        let mut mime = MimeDatabase::new();
        mime.add_filter(
            ContentType::parse("application/pdf").unwrap(),
            ContentType::sink_for("alpha"),
            50,
            0,
            "pdftoraster",
        )
        .unwrap();
        let scheduler = Scheduler::new(mime, crate::queue::JobQueue::open_in_memory().unwrap(), false);
        scheduler.register_printer(PrinterDescriptor {
            name: "alpha".into(),
            sink_type: ContentType::sink_for("alpha"),
            is_shared: true,
            attributes: Default::default(),
        });
        scheduler
    }

    fn print_job_request(document: &[u8]) -> Vec<u8> {
        ReqBuilder::new(op::PRINT_JOB, 1)
            .group(tag::OPERATION_ATTRIBUTES)
            .charset("attributes-charset", "utf-8")
            .natural_language("attributes-natural-language", "en")
            .uri("printer-uri", "ipp://localhost/printers/alpha")
            .keyword("document-format", "application/pdf")
            .name_attr("job-name", "report.pdf")
            .build()
            .into_iter()
            .chain(document.iter().copied())
            .collect()
    }

    #[test]
    fn print_job_creates_and_completes_a_job() {
        let scheduler = scheduler_with_alpha();
        let bytes = print_job_request(b"%PDF-1.4");
        let request = IppRequest::parse(&bytes).unwrap();
        assert_eq!(request.document_data, b"%PDF-1.4");

        let response = dispatch(&scheduler, &request);
        let ParseOutcome::Complete { message, .. } = pressline_ipc::ipp_wire::try_parse(&response) else {
            panic!("expected a complete response");
        };
        assert_eq!(message.status_or_operation, status::OK);
    }

    #[test]
    fn get_printer_attributes_reports_the_registered_printer() {
        let scheduler = scheduler_with_alpha();
        let bytes = ReqBuilder::new(op::GET_PRINTER_ATTRIBUTES, 2)
            .group(tag::OPERATION_ATTRIBUTES)
            .charset("attributes-charset", "utf-8")
            .natural_language("attributes-natural-language", "en")
            .uri("printer-uri", "ipp://localhost/printers/alpha")
            .build();
        let request = IppRequest::parse(&bytes).unwrap();
        let response = dispatch(&scheduler, &request);
        let ParseOutcome::Complete { message, .. } = pressline_ipc::ipp_wire::try_parse(&response) else {
            panic!("expected a complete response");
        };
        let printer_group = message
            .groups
            .iter()
            .find(|g| g.tag == tag::PRINTER_ATTRIBUTES)
            .unwrap();
        assert!(printer_group.attributes.iter().any(|a| a.name == "printer-name"));
    }

    #[test]
    fn unknown_printer_uri_is_not_found() {
        let scheduler = scheduler_with_alpha();
        let bytes = ReqBuilder::new(op::GET_PRINTER_ATTRIBUTES, 3)
            .group(tag::OPERATION_ATTRIBUTES)
            .charset("attributes-charset", "utf-8")
            .natural_language("attributes-natural-language", "en")
            .uri("printer-uri", "ipp://localhost/printers/does-not-exist")
            .build();
        let request = IppRequest::parse(&bytes).unwrap();
        let response = dispatch(&scheduler, &request);
        let ParseOutcome::Complete { message, .. } = pressline_ipc::ipp_wire::try_parse(&response) else {
            panic!("expected a complete response");
        };
        assert_eq!(message.status_or_operation, 0x0406);
    }

    #[test]
    fn send_document_with_no_chain_aborts_the_job_and_reports_document_format_error() {
        let scheduler = scheduler_with_alpha();
        let create_request = IppRequest::parse(
            &ReqBuilder::new(op::CREATE_JOB, 4)
                .group(tag::OPERATION_ATTRIBUTES)
                .charset("attributes-charset", "utf-8")
                .natural_language("attributes-natural-language", "en")
                .uri("printer-uri", "ipp://localhost/printers/alpha")
                .build(),
        )
        .unwrap();
        let create_response = dispatch(&scheduler, &create_request);
        let ParseOutcome::Complete { message, .. } = pressline_ipc::ipp_wire::try_parse(&create_response) else {
            panic!("expected a complete Create-Job response");
        };
        let job_group = message.groups.iter().find(|g| g.tag == tag::JOB_ATTRIBUTES).unwrap();
        let job_id = job_group
            .attributes
            .iter()
            .find(|a| a.name == "job-id")
            .and_then(|a| a.as_i32())
            .unwrap();

        let send_bytes = ReqBuilder::new(op::SEND_DOCUMENT, 5)
            .group(tag::OPERATION_ATTRIBUTES)
            .charset("attributes-charset", "utf-8")
            .natural_language("attributes-natural-language", "en")
            .uri("printer-uri", "ipp://localhost/printers/alpha")
            .integer("job-id", job_id)
            .keyword("document-format", "image/jpeg")
            .boolean("last-document", true)
            .build();
        let send_request = IppRequest::parse(&send_bytes).unwrap();
        let send_response = dispatch(&scheduler, &send_request);
        let ParseOutcome::Complete { message, .. } = pressline_ipc::ipp_wire::try_parse(&send_response) else {
            panic!("expected a complete Send-Document response");
        };
        assert_eq!(message.status_or_operation, 0x040a);

        let job = scheduler.get_job(JobId(job_id)).unwrap().unwrap();
        assert_eq!(job.state, pressline_core::JobState::Aborted);
        assert_eq!(job.abort_reason.as_deref(), Some("no-chain"));
    }
}
