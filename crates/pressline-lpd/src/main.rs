// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The LPD ingress process: one task per connection, no shared mutable state
// across connections (§4.6). Listens on `LPD_PORT` (default 515) and
// injects every accepted job into the scheduler named by `PRESSLINE_SERVER`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use pressline_lpd::JobInjector;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

const DEFAULT_LPD_PORT: u16 = 515;

#[tokio::main]
async fn main() {
    let port: u16 = std::env::var("LPD_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(DEFAULT_LPD_PORT);
    let printer_uri = std::env::var("PRESSLINE_SCHEDULER_URI").unwrap_or_else(|_| "ipp://127.0.0.1:631/printers/lp".into());
    let tmp_dir = std::env::var("TMPDIR").map(std::path::PathBuf::from).unwrap_or_else(|_| std::env::temp_dir());

    let bind_addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let listener = match TcpListener::bind(bind_addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("ERROR: failed to bind LPD port {port}: {e}");
            std::process::exit(1);
        }
    };
    info!(port, "LPD ingress listening");

    let canceled = Arc::new(AtomicBool::new(false));
    {
        let canceled = Arc::clone(&canceled);
        tokio::spawn(async move {
            #[cfg(unix)]
            if let Ok(mut term) = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                term.recv().await;
                canceled.store(true, Ordering::Release);
            }
        });
    }

    loop {
        if canceled.load(Ordering::Acquire) {
            break;
        }
        let (mut stream, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                error!(error = %e, "failed to accept LPD connection");
                continue;
            }
        };
        let printer_uri = printer_uri.clone();
        let tmp_dir = tmp_dir.clone();
        tokio::spawn(async move {
            let injector = match JobInjector::new(&printer_uri) {
                Ok(i) => i,
                Err(e) => {
                    error!(error = %e, "invalid scheduler URI");
                    return;
                }
            };
            if let Err(e) = pressline_lpd::handle_connection(&mut stream, &tmp_dir, &injector).await {
                warn!(peer = %peer, error = %e, "LPD connection ended with an error");
            }
        });
    }
    info!("LPD ingress shutting down");
}
