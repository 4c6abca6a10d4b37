// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The printer/job model (§4.4, component D): a printer registry layered over
// the MIME database's filter graph, a durable job queue, and the six
// scheduler-internal operations the IPP surface dispatches onto.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::RwLock;

use pressline_core::{
    ContentType, Job, JobDocument, JobId, JobState, PresslineError, Printer, PrinterRef,
    PrinterState, Result,
};
use pressline_mime::sink_cache::compute_signature;
use pressline_mime::{ChainPlanner, MimeDatabase, SinkPatternCache};
use tracing::{info, instrument, warn};

use crate::queue::JobQueue;

/// The caller-supplied shape of a printer to register; `Printer`'s derived
/// fields (`supported_source_types`, `state`) are computed by the scheduler.
#[derive(Debug, Clone)]
pub struct PrinterDescriptor {
    pub name: String,
    pub sink_type: ContentType,
    pub is_shared: bool,
    pub attributes: BTreeMap<String, String>,
}

pub struct Scheduler {
    mime: RwLock<MimeDatabase>,
    planner: ChainPlanner,
    sink_cache: SinkPatternCache,
    printers: RwLock<Vec<Printer>>,
    name_index: RwLock<HashMap<String, PrinterRef>>,
    queue: JobQueue,
    next_job_id: AtomicI32,
}

impl Scheduler {
    pub fn new(mime: MimeDatabase, queue: JobQueue, sink_reuse_enabled: bool) -> Self {
        let next_job_id = queue
            .get_active_jobs()
            .ok()
            .and_then(|jobs| jobs.iter().map(|j| j.id.0).max())
            .unwrap_or(0)
            + 1;
        Self {
            mime: RwLock::new(mime),
            planner: ChainPlanner::new(),
            sink_cache: SinkPatternCache::new(sink_reuse_enabled),
            printers: RwLock::new(Vec::new()),
            name_index: RwLock::new(HashMap::new()),
            queue,
            next_job_id: AtomicI32::new(next_job_id),
        }
    }

    /// Register a printer, or idempotently re-register one with the same
    /// name in place (startup re-applies the same configuration on every
    /// launch, per §4.4's persistence note).
    #[instrument(skip(self, descriptor), fields(printer = %descriptor.name))]
    pub fn register_printer(&self, descriptor: PrinterDescriptor) -> PrinterRef {
        let edges = {
            let mime = self.mime.read().expect("mime database lock poisoned");
            mime.enumerate_filters().to_vec()
        };
        let signature = compute_signature(&edges, &descriptor.sink_type);
        let supported_source_types = match self.sink_cache.reuse(signature) {
            Some(types) => types,
            None => {
                let types = self.planner.supported_source_types(&edges, &descriptor.sink_type);
                self.sink_cache.try_store(signature, types.clone());
                types
            }
        };

        let mut printers = self.printers.write().expect("printer table lock poisoned");
        let mut names = self.name_index.write().expect("printer name index lock poisoned");

        if let Some(&existing) = names.get(&descriptor.name) {
            printers[existing.0] = Printer {
                name: descriptor.name,
                sink_type: descriptor.sink_type,
                supported_source_types,
                state: printers[existing.0].state,
                is_accepting: printers[existing.0].is_accepting,
                is_shared: descriptor.is_shared,
                attributes: descriptor.attributes,
            };
            info!(printer_ref = existing.0, "printer re-registered");
            return existing;
        }

        let printer_ref = PrinterRef(printers.len());
        printers.push(Printer {
            name: descriptor.name.clone(),
            sink_type: descriptor.sink_type,
            supported_source_types,
            state: PrinterState::Idle,
            is_accepting: true,
            is_shared: descriptor.is_shared,
            attributes: descriptor.attributes,
        });
        names.insert(descriptor.name, printer_ref);
        info!(printer_ref = printer_ref.0, "printer registered");
        printer_ref
    }

    #[instrument(skip(self))]
    pub fn deregister_printer(&self, printer_ref: PrinterRef) -> Result<()> {
        let printer = {
            let printers = self.printers.read().expect("printer table lock poisoned");
            printers
                .get(printer_ref.0)
                .cloned()
                .ok_or_else(|| PresslineError::PrinterNotFound(format!("#{}", printer_ref.0)))?
        };

        {
            let mut mime = self.mime.write().expect("mime database lock poisoned");
            mime.remove_filters_touching(&printer.sink_type);
        }
        // The printer's removal can only invalidate cache entries keyed on
        // its own former topology; clearing the whole cache is a coarser
        // but always-correct superset of "evict the stale entries".
        self.sink_cache.clear();

        {
            let mut printers = self.printers.write().expect("printer table lock poisoned");
            printers[printer_ref.0].state = PrinterState::Stopped;
            printers[printer_ref.0].is_accepting = false;
        }
        self.name_index
            .write()
            .expect("printer name index lock poisoned")
            .remove(&printer.name);

        for mut job in self.queue.get_jobs_for_printer(&printer.name)? {
            if job.state.is_terminal() {
                continue;
            }
            let next = if job.state == JobState::Processing {
                JobState::Aborted
            } else {
                JobState::Canceled
            };
            if job.transition(next) {
                job.abort_reason = Some("printer-removed".into());
                self.queue.update_job(&job)?;
                warn!(job_id = job.id.0, "job invalidated by printer removal");
            }
        }
        Ok(())
    }

    #[instrument(skip(self, options))]
    pub fn create_job(
        &self,
        printer_ref: PrinterRef,
        user: &str,
        title: &str,
        options: serde_json::Value,
    ) -> Result<JobId> {
        let printer_name = {
            let printers = self.printers.read().expect("printer table lock poisoned");
            let printer = printers
                .get(printer_ref.0)
                .ok_or_else(|| PresslineError::PrinterNotFound(format!("#{}", printer_ref.0)))?;
            if !printer.is_accepting {
                return Err(PresslineError::Validation(format!(
                    "printer {} is not accepting jobs",
                    printer.name
                )));
            }
            printer.name.clone()
        };

        let id = JobId(self.next_job_id.fetch_add(1, Ordering::Relaxed));
        let job = Job::new(id, printer_ref, printer_name, user.into(), title.into(), options);
        self.queue.insert_job(&job)?;
        info!(job_id = id.0, "job created");
        Ok(id)
    }

    #[instrument(skip(self, bytes), fields(bytes = bytes.len()))]
    pub fn submit_document(
        &self,
        job_id: JobId,
        format: ContentType,
        is_last: bool,
        bytes: Vec<u8>,
    ) -> Result<()> {
        let mut job = self
            .queue
            .get_job(job_id)?
            .ok_or(PresslineError::JobNotFound(job_id.0))?;
        if job.state.is_terminal() {
            return Err(PresslineError::Validation(format!(
                "job {} is already in a terminal state",
                job_id.0
            )));
        }

        let sink_type = {
            let printers = self.printers.read().expect("printer table lock poisoned");
            printers
                .get(job.printer_ref.0)
                .ok_or_else(|| PresslineError::PrinterNotFound(job.printer_name.clone()))?
                .sink_type
                .clone()
        };

        let edges = {
            let mime = self.mime.read().expect("mime database lock poisoned");
            mime.enumerate_filters().to_vec()
        };
        let chain = self.planner.plan(&edges, &format, &sink_type, bytes.len() as u64);

        if chain.is_none() {
            job.transition(JobState::Processing);
            job.transition(JobState::Aborted);
            job.abort_reason = Some("no-chain".into());
            self.queue.update_job(&job)?;
            return Err(PresslineError::NoChain {
                src: format.to_string(),
                dst: sink_type.to_string(),
            });
        }

        job.document_format = Some(format.clone());
        job.documents.push(JobDocument {
            format,
            bytes,
            is_last,
        });
        if job.state == JobState::Pending {
            job.transition(JobState::Processing);
        }
        if is_last {
            job.transition(JobState::Completed);
        }
        self.queue.update_job(&job)?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn cancel_job(&self, job_id: JobId, _user: &str) -> Result<()> {
        let mut job = self
            .queue
            .get_job(job_id)?
            .ok_or(PresslineError::JobNotFound(job_id.0))?;
        if !job.transition(JobState::Canceled) {
            return Err(PresslineError::Validation(format!(
                "job {} cannot be canceled from its current state",
                job_id.0
            )));
        }
        self.queue.update_job(&job)
    }

    pub fn printer_state(&self, printer_ref: PrinterRef) -> Result<Printer> {
        self.printers
            .read()
            .expect("printer table lock poisoned")
            .get(printer_ref.0)
            .cloned()
            .ok_or_else(|| PresslineError::PrinterNotFound(format!("#{}", printer_ref.0)))
    }

    pub fn find_printer_by_name(&self, name: &str) -> Option<PrinterRef> {
        self.name_index
            .read()
            .expect("printer name index lock poisoned")
            .get(name)
            .copied()
    }

    pub fn list_printers(&self) -> Vec<Printer> {
        self.printers.read().expect("printer table lock poisoned").clone()
    }

    pub fn get_job(&self, job_id: JobId) -> Result<Option<Job>> {
        self.queue.get_job(job_id)
    }

    pub fn jobs_for_printer(&self, name: &str) -> Result<Vec<Job>> {
        self.queue.get_jobs_for_printer(name)
    }

    /// Register the stock filter-edges/typers needed by tests and the
    /// startup configuration loader; callers add to this database before
    /// registering printers against it.
    pub fn mime_mut(&self) -> std::sync::RwLockWriteGuard<'_, MimeDatabase> {
        self.mime.write().expect("mime database lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler_with_pdf_to_alpha() -> Scheduler {
        let mut mime = MimeDatabase::new();
        mime.add_filter(
            ContentType::parse("application/pdf").unwrap(),
            ContentType::sink_for("alpha"),
            50,
            0,
            "pdftoraster",
        )
        .unwrap();
        Scheduler::new(mime, JobQueue::open_in_memory().unwrap(), false)
    }

    fn register_alpha(scheduler: &Scheduler) -> PrinterRef {
        scheduler.register_printer(PrinterDescriptor {
            name: "alpha".into(),
            sink_type: ContentType::sink_for("alpha"),
            is_shared: false,
            attributes: BTreeMap::new(),
        })
    }

    // testable property 2 — printer re-registration under the same name is
    // idempotent: it returns the same ref and keeps the printer's operating
    // state (accepting/stopped) rather than resetting it.
    #[test]
    fn reregistering_a_printer_by_name_is_idempotent() {
        let scheduler = scheduler_with_pdf_to_alpha();
        let first = register_alpha(&scheduler);
        let second = register_alpha(&scheduler);
        assert_eq!(first, second);
        assert_eq!(scheduler.list_printers().len(), 1);
    }

    #[test]
    fn job_completes_when_a_chain_exists() {
        let scheduler = scheduler_with_pdf_to_alpha();
        let printer_ref = register_alpha(&scheduler);
        let job_id = scheduler
            .create_job(printer_ref, "alice", "report.pdf", serde_json::json!({}))
            .unwrap();
        scheduler
            .submit_document(
                job_id,
                ContentType::parse("application/pdf").unwrap(),
                true,
                b"%PDF-1.4".to_vec(),
            )
            .unwrap();
        let job = scheduler.get_job(job_id).unwrap().unwrap();
        assert_eq!(job.state, JobState::Completed);
    }

    #[test]
    fn job_aborts_when_no_chain_exists() {
        let scheduler = scheduler_with_pdf_to_alpha();
        let printer_ref = register_alpha(&scheduler);
        let job_id = scheduler
            .create_job(printer_ref, "alice", "photo.tiff", serde_json::json!({}))
            .unwrap();
        let err = scheduler
            .submit_document(
                job_id,
                ContentType::parse("image/tiff").unwrap(),
                true,
                vec![0u8; 4],
            )
            .unwrap_err();
        assert!(matches!(err, PresslineError::NoChain { .. }));
        let job = scheduler.get_job(job_id).unwrap().unwrap();
        assert_eq!(job.state, JobState::Aborted);
    }

    #[test]
    fn deregistering_a_printer_cancels_its_pending_jobs() {
        let scheduler = scheduler_with_pdf_to_alpha();
        let printer_ref = register_alpha(&scheduler);
        let job_id = scheduler
            .create_job(printer_ref, "alice", "report.pdf", serde_json::json!({}))
            .unwrap();
        scheduler.deregister_printer(printer_ref).unwrap();
        let job = scheduler.get_job(job_id).unwrap().unwrap();
        assert_eq!(job.state, JobState::Canceled);
        assert_eq!(job.abort_reason.as_deref(), Some("printer-removed"));
    }

    #[test]
    fn canceling_a_completed_job_is_rejected() {
        let scheduler = scheduler_with_pdf_to_alpha();
        let printer_ref = register_alpha(&scheduler);
        let job_id = scheduler
            .create_job(printer_ref, "alice", "report.pdf", serde_json::json!({}))
            .unwrap();
        scheduler
            .submit_document(
                job_id,
                ContentType::parse("application/pdf").unwrap(),
                true,
                b"%PDF-1.4".to_vec(),
            )
            .unwrap();
        assert!(scheduler.cancel_job(job_id, "alice").is_err());
    }
}
