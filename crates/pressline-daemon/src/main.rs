// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pressline — print scheduler core
//
// Entry point. Reads the startup context from the environment, opens the
// durable job queue and audit log, registers the configured printers,
// issues this process's own local-authentication certificate, and starts
// the embedded IPP server. Runs until `SIGTERM`.

mod defaults;
mod printers;
mod supervisor;

use std::sync::Arc;

use pressline_core::PresslineContext;
use pressline_mime::MimeDatabase;
use pressline_sched::{IppServer, PrinterDescriptor, Scheduler};
use pressline_security::AuditLog;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("pressline starting");

    let ctx = PresslineContext::from_env();

    if let Err(e) = std::fs::create_dir_all(&ctx.state_dir) {
        error!(error = %e, path = %ctx.state_dir.display(), "failed to create state directory");
        std::process::exit(1);
    }

    let pid = std::process::id();
    match pressline_security::certificates::issue_local_auth_cert(
        &ctx.state_dir,
        pid,
        ctx.cert_group.as_deref(),
    ) {
        Ok(_) => info!(pid, "local authentication certificate issued"),
        Err(e) => warn!(error = %e, "failed to issue local authentication certificate"),
    }

    let audit_log = match AuditLog::open(ctx.state_dir.join("audit.db")) {
        Ok(log) => Arc::new(log),
        Err(e) => {
            error!(error = %e, "failed to open audit log");
            std::process::exit(1);
        }
    };

    let queue = match pressline_sched::JobQueue::open(ctx.state_dir.join("jobs.db")) {
        Ok(q) => q,
        Err(e) => {
            error!(error = %e, "failed to open job queue");
            std::process::exit(1);
        }
    };

    let printer_configs = printers::load_from_env();

    let mut mime = MimeDatabase::new();
    if let Err(e) = defaults::register_core_filters(&mut mime) {
        error!(error = %e, "failed to register baseline filters");
        std::process::exit(1);
    }
    for printer in &printer_configs {
        if let Err(e) = defaults::register_printer_backend_filter(&mut mime, &printer.name) {
            warn!(printer = %printer.name, error = %e, "failed to register backend filter");
        }
    }

    let scheduler = Arc::new(Scheduler::new(mime, queue, ctx.sink_reuse_enabled));

    for printer in printer_configs {
        let name = printer.name.clone();
        scheduler.register_printer(PrinterDescriptor {
            name: printer.name,
            sink_type: pressline_core::ContentType::sink_for(&name),
            is_shared: printer.is_shared,
            attributes: printers::default_attributes(),
        });
        let _ = audit_log.record("printer-registered", &name, true, None);
        info!(printer = %name, "printer registered");
    }

    let mut server = IppServer::new(ctx.ipp_port);
    if let Err(e) = server.start(Arc::clone(&scheduler)).await {
        error!(error = %e, "failed to start IPP server");
        std::process::exit(1);
    }
    info!(port = ctx.ipp_port, "IPP server started");

    let discovery = match supervisor::spawn_discovery(&ctx) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!(error = %e, "failed to spawn discovery mini-daemon");
            None
        }
    };
    let lpd = match supervisor::spawn_lpd(&ctx) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!(error = %e, "failed to spawn LPD mini-daemon");
            None
        }
    };

    #[cfg(unix)]
    {
        let mut term = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::process::exit(1);
            }
        };
        term.recv().await;
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("pressline shutting down");
    if let Some(s) = discovery {
        s.shutdown().await;
    }
    if let Some(s) = lpd {
        s.shutdown().await;
    }
    if let Err(e) = server.stop().await {
        warn!(error = %e, "error while stopping IPP server");
    }
}
