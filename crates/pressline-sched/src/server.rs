// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The TCP/HTTP front door for the IPP surface (§4.4): a minimal HTTP/1.1
// envelope around the binary IPP body, one task per connection.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use pressline_core::Result;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::dispatch::{self, IppRequest};
use crate::scheduler::Scheduler;

const MAX_REQUEST_BYTES: usize = 64 * 1024 * 1024;

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn strip_http_envelope(data: &[u8]) -> &[u8] {
    match find_subsequence(data, b"\r\n\r\n") {
        Some(header_end) => &data[header_end + 4..],
        None => data,
    }
}

async fn send_response(stream: &mut TcpStream, body: &[u8]) -> Result<()> {
    let headers = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/ipp\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    stream.write_all(headers.as_bytes()).await?;
    stream.write_all(body).await?;
    stream.flush().await?;
    Ok(())
}

async fn handle_connection(mut stream: TcpStream, peer: SocketAddr, scheduler: Arc<Scheduler>) -> Result<()> {
    let mut buf = Vec::with_capacity(8192);
    let mut limited = (&mut stream).take(MAX_REQUEST_BYTES as u64);
    let bytes_read = limited.read_to_end(&mut buf).await?;
    if bytes_read == 0 {
        return Ok(());
    }
    debug!(peer = %peer, bytes = bytes_read, "received IPP request");

    let body = strip_http_envelope(&buf);
    let request = match IppRequest::parse(body) {
        Ok(r) => r,
        Err(reason) => {
            warn!(peer = %peer, %reason, "malformed IPP request");
            let response = pressline_ipc::IppResponseBuilder::new(0x0400, 0)
                .group(pressline_ipc::ipp_wire::tag::OPERATION_ATTRIBUTES)
                .text("status-message", &reason)
                .build();
            send_response(&mut stream, &response).await?;
            return Ok(());
        }
    };

    let response = dispatch::dispatch(&scheduler, &request);
    send_response(&mut stream, &response).await?;
    info!(peer = %peer, operation = format!("0x{:04X}", request.operation_id), "IPP response sent");
    Ok(())
}

/// The embedded IPP/1.1 server (§4.4): binds a TCP listener and dispatches
/// every connection's request onto the shared `Scheduler`.
pub struct IppServer {
    port: u16,
    shutdown: Arc<Notify>,
    task_handle: Option<JoinHandle<()>>,
    active_connections: Arc<AtomicU32>,
}

impl IppServer {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            shutdown: Arc::new(Notify::new()),
            task_handle: None,
            active_connections: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn active_connections(&self) -> u32 {
        self.active_connections.load(Ordering::Relaxed)
    }

    pub async fn start(&mut self, scheduler: Arc<Scheduler>) -> Result<()> {
        let bind_addr: SocketAddr = ([0, 0, 0, 0], self.port).into();
        let listener = TcpListener::bind(bind_addr).await?;
        info!(port = self.port, "IPP server listening");

        let shutdown = Arc::clone(&self.shutdown);
        let connections = Arc::clone(&self.active_connections);
        let handle = tokio::spawn(async move {
            Self::accept_loop(listener, shutdown, connections, scheduler).await;
        });
        self.task_handle = Some(handle);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        self.shutdown.notify_one();
        if let Some(handle) = self.task_handle.take() {
            let _ = handle.await;
        }
        Ok(())
    }

    async fn accept_loop(
        listener: TcpListener,
        shutdown: Arc<Notify>,
        connections: Arc<AtomicU32>,
        scheduler: Arc<Scheduler>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    debug!("IPP accept loop received shutdown signal");
                    break;
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let scheduler = Arc::clone(&scheduler);
                            let connections = Arc::clone(&connections);
                            tokio::spawn(async move {
                                connections.fetch_add(1, Ordering::Relaxed);
                                if let Err(e) = handle_connection(stream, peer, scheduler).await {
                                    warn!(peer = %peer, error = %e, "connection handler error");
                                }
                                connections.fetch_sub(1, Ordering::Relaxed);
                            });
                        }
                        Err(e) => error!(error = %e, "failed to accept connection"),
                    }
                }
            }
        }
    }
}
