// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// An LPD connection against a real running scheduler produces exactly one
// IPP job whose name, requesting user, and document format match the
// control file, and every temp file staged along the way is gone once the
// connection closes.

use std::collections::BTreeMap;
use std::sync::Arc;

use pressline_core::ContentType;
use pressline_lpd::inject::JobInjector;
use pressline_lpd::session::handle_connection;
use pressline_mime::MimeDatabase;
use pressline_sched::{IppServer, PrinterDescriptor, Scheduler};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

const TEST_PORT: u16 = 62511;

async fn start_scheduler() -> (Arc<Scheduler>, IppServer) {
    let mut mime = MimeDatabase::new();
    mime.add_type("text", "plain");
    mime.add_type("application", "octet-stream");
    let sink = ContentType::sink_for("lp");
    mime.add_filter(ContentType::new("application", "octet-stream"), sink, 0, 0, "-")
        .unwrap();

    let queue = pressline_sched::JobQueue::open_in_memory().unwrap();
    let scheduler = Arc::new(Scheduler::new(mime, queue, false));
    scheduler.register_printer(PrinterDescriptor {
        name: "lp".into(),
        sink_type: ContentType::sink_for("lp"),
        is_shared: false,
        attributes: BTreeMap::new(),
    });

    let mut server = IppServer::new(TEST_PORT);
    server.start(Arc::clone(&scheduler)).await.unwrap();
    (scheduler, server)
}

#[tokio::test]
async fn lpd_connection_creates_exactly_one_job_matching_the_control_file() {
    let (scheduler, mut server) = start_scheduler().await;

    let tmp = tempfile::tempdir().unwrap();
    let injector = JobInjector::new(&format!("ipp://127.0.0.1:{TEST_PORT}/printers/lp")).unwrap();

    let (mut client, mut conn) = tokio::io::duplex(1 << 16);
    let tmp_path = tmp.path().to_path_buf();
    let handle = tokio::spawn(async move { handle_connection(&mut conn, &tmp_path, &injector).await });

    let mut ack = [0u8; 1];

    client.write_all(b"\x02lp\n").await.unwrap();
    client.read_exact(&mut ack).await.unwrap();
    assert_eq!(ack[0], 0);

    let control = b"JBook\nPjoe\nl dfA001host\n";
    client.write_all(format!("\x02{} cfA001host\n", control.len()).as_bytes()).await.unwrap();
    client.read_exact(&mut ack).await.unwrap();
    assert_eq!(ack[0], 0);
    client.write_all(control).await.unwrap();
    client.write_all(&[0]).await.unwrap();
    client.read_exact(&mut ack).await.unwrap();
    assert_eq!(ack[0], 0);

    let data = b"hello world";
    client.write_all(format!("\x03{} dfA001host\n", data.len()).as_bytes()).await.unwrap();
    client.read_exact(&mut ack).await.unwrap();
    assert_eq!(ack[0], 0);
    client.write_all(data).await.unwrap();
    client.write_all(&[0]).await.unwrap();
    client.read_exact(&mut ack).await.unwrap();
    assert_eq!(ack[0], 0);

    drop(client);
    handle.await.unwrap().unwrap();

    let jobs = scheduler.jobs_for_printer("lp").unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].title, "Book");
    assert_eq!(jobs[0].originating_user, "joe");
    assert_eq!(
        jobs[0].document_format,
        Some(ContentType::new("application", "octet-stream"))
    );

    assert!(tmp.path().read_dir().unwrap().next().is_none(), "staged temp files must be removed");

    server.stop().await.unwrap();
}
