// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The `pressline-deviced` mini-daemon: `cups-deviced request-id limit
// timeout user-id options` (§6). Exit status 0 on success, 1 on bad
// arguments or a fatal error. Emits one announcement per discovered device,
// either as a plain-text line or, under the framed ABI, as an IPP
// printer-attribute group on stdout (§4.7); stderr carries `DEBUG:`/`INFO:`/
// `ERROR:` lines for the parent to relay into its own logging.

use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use pressline_core::DiscoveredDevice;
use pressline_discover::{output, DeviceSink, DiscoveryBackend};

/// Minimum wall-clock time the backend stays up before it may exit once
/// every known record has been announced (§4.5).
const MIN_ACTIVITY: Duration = Duration::from_secs(5);

struct TextSink;

impl DeviceSink for TextSink {
    fn announce(&self, device: &DiscoveredDevice) {
        println!("{}", output::format_line(device));
    }
}

struct FramedSink;

impl DeviceSink for FramedSink {
    fn announce(&self, device: &DiscoveredDevice) {
        let message = pressline_ipc::IppResponseBuilder::new(0, 0)
            .group(pressline_ipc::ipp_wire::tag::PRINTER_ATTRIBUTES)
            .uri("printer-uri-supported", &device.uri)
            .text("printer-make-and-model", device.make_and_model.as_deref().unwrap_or("Unknown"))
            .text("printer-info", &device.service_name)
            .text("printer-device-id", device.device_id.as_deref().unwrap_or(""))
            .text("printer-location", device.location.as_deref().unwrap_or(""))
            .boolean("printer-is-shared", device.cups_shared)
            .build();
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        let _ = pressline_ipc::write_frame(&mut handle, &message, true);
    }
}

struct Args {
    #[allow(dead_code)]
    request_id: i32,
    #[allow(dead_code)]
    limit: i32,
    timeout: Duration,
    #[allow(dead_code)]
    user_id: String,
    #[allow(dead_code)]
    options: String,
}

fn parse_args() -> Option<Args> {
    let argv: Vec<String> = std::env::args().collect();
    if argv.len() < 6 {
        return None;
    }
    Some(Args {
        request_id: argv[1].parse().ok()?,
        limit: argv[2].parse().ok()?,
        timeout: Duration::from_secs(argv[3].parse().ok()?),
        user_id: argv[4].clone(),
        options: argv[5].clone(),
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let Some(args) = parse_args() else {
        eprintln!("ERROR: usage: cups-deviced request-id limit timeout user-id options");
        return ExitCode::from(1);
    };
    eprintln!("INFO: starting device discovery, timeout={}s", args.timeout.as_secs());

    let backend = match DiscoveryBackend::new() {
        Ok(b) => b,
        Err(e) => {
            eprintln!("ERROR: {e}");
            return ExitCode::from(1);
        }
    };

    let sink: Arc<dyn DeviceSink> = if std::env::var("PRESSLINE_DEVICED_FRAMED").is_ok() {
        Arc::new(FramedSink)
    } else {
        Arc::new(TextSink)
    };

    if let Err(e) = backend.start(Arc::clone(&sink)) {
        eprintln!("ERROR: {e}");
        return ExitCode::from(1);
    }

    let registry = backend.registry();
    let canceled = backend.canceled_flag();

    #[cfg(unix)]
    {
        let canceled = Arc::clone(&canceled);
        tokio::spawn(async move {
            if let Ok(mut term) = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                term.recv().await;
                eprintln!("DEBUG: termination signal received");
                canceled.store(true, Ordering::Release);
            }
        });
    }

    let started = Instant::now();
    loop {
        let elapsed = started.elapsed();
        if elapsed >= args.timeout {
            eprintln!("INFO: discovery timeout elapsed");
            break;
        }
        if elapsed >= MIN_ACTIVITY {
            if canceled.load(Ordering::Acquire) {
                break;
            }
            if registry.all_emitted() && !registry.snapshot().is_empty() {
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    if let Err(e) = backend.stop() {
        eprintln!("ERROR: {e}");
        return ExitCode::from(1);
    }
    eprintln!(
        "INFO: device discovery finished, {} records announced",
        registry.snapshot().iter().filter(|d| d.emitted).count()
    );
    ExitCode::from(0)
}
