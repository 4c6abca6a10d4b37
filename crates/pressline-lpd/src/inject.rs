// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Injects an accepted LPD job into the scheduler as a short-lived IPP
// client session: one Create-Job followed by one Send-Document per staged
// data file, the last one marked `last-document` (§4.6).

use std::io::Cursor;

use ipp::prelude::*;
use pressline_core::{PresslineError, Result};
use tracing::{debug, info};

/// One document to submit, already resolved to a MIME type and raw flag.
pub struct InjectedDocument {
    pub document_format: String,
    pub bytes: Vec<u8>,
}

/// Talks IPP/1.1 to the scheduler on behalf of an LPD connection.
pub struct JobInjector {
    printer_uri: Uri,
}

impl JobInjector {
    /// `printer_uri` names the target queue, e.g.
    /// `ipp://127.0.0.1:631/printers/lp`.
    pub fn new(printer_uri: &str) -> Result<Self> {
        let uri = printer_uri
            .parse()
            .map_err(|e| PresslineError::Protocol(format!("invalid printer URI '{printer_uri}': {e}")))?;
        Ok(Self { printer_uri: uri })
    }

    /// Create the job, then submit every document in order, and return the
    /// scheduler-assigned job id.
    pub async fn inject(&self, job_name: &str, requesting_user: &str, documents: Vec<InjectedDocument>) -> Result<i32> {
        let client = AsyncIppClient::new(self.printer_uri.clone());

        let create = IppOperationBuilder::create_job(self.printer_uri.clone())
            .job_title(job_name)
            .user_name(requesting_user)
            .build();
        debug!(job_name, "sending Create-Job");
        let response = client
            .send(create)
            .await
            .map_err(|e| PresslineError::Protocol(format!("Create-Job: {e}")))?;
        if !response.header().status_code().is_success() {
            return Err(PresslineError::Protocol(format!(
                "Create-Job returned status {:?}",
                response.header().status_code()
            )));
        }
        let job_id = extract_job_id(response.attributes())
            .ok_or_else(|| PresslineError::Protocol("Create-Job response missing job-id".into()))?;

        let last_index = documents.len().saturating_sub(1);
        for (index, document) in documents.into_iter().enumerate() {
            let is_last = index == last_index;
            let payload = IppPayload::new(Cursor::new(document.bytes));
            let send = IppOperationBuilder::send_document(self.printer_uri.clone(), job_id, payload)
                .document_format(&document.document_format)
                .last_document(is_last)
                .build();
            let response = client
                .send(send)
                .await
                .map_err(|e| PresslineError::Protocol(format!("Send-Document({job_id}): {e}")))?;
            if !response.header().status_code().is_success() {
                return Err(PresslineError::Protocol(format!(
                    "Send-Document({job_id}) returned status {:?}",
                    response.header().status_code()
                )));
            }
        }

        info!(job_id, job_name, "LPD job injected into scheduler");
        Ok(job_id)
    }
}

fn extract_job_id(attrs: &IppAttributes) -> Option<i32> {
    for group in attrs.groups_of(DelimiterTag::JobAttributes) {
        if let Some(attr) = group.attributes().get("job-id")
            && let IppValue::Integer(id) = attr.value()
        {
            return Some(*id);
        }
    }
    None
}
