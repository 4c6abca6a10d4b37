// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The RFC 1179 server state machine (§4.6): one task per connection, a
// command-byte dispatch, and — for "receive a printer job" — a sub-command
// loop staging control and data files until the client closes the
// connection, at which point the accumulated job is injected into the
// scheduler.

use std::path::Path;

use pressline_core::{PresslineError, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::control;
use crate::inject::{InjectedDocument, JobInjector};
use crate::staging::StagingArea;

const CMD_PRINT_WAITING_JOBS: u8 = 0x01;
const CMD_RECEIVE_JOB: u8 = 0x02;
const CMD_SEND_SHORT_QUEUE_STATE: u8 = 0x03;
const CMD_SEND_LONG_QUEUE_STATE: u8 = 0x04;
const CMD_REMOVE_JOBS: u8 = 0x05;

const SUB_ABORT: u8 = 0x01;
const SUB_CONTROL_FILE: u8 = 0x02;
const SUB_DATA_FILE: u8 = 0x03;

const MAX_LINE_LEN: usize = 8192;
const ACK_OK: u8 = 0;
const ACK_FAIL: u8 = 1;

async fn read_until_lf<R: AsyncRead + Unpin>(stream: &mut R) -> Result<Vec<u8>> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        let n = stream.read(&mut byte).await.map_err(PresslineError::Io)?;
        if n == 0 {
            if line.is_empty() {
                return Err(PresslineError::Protocol("connection closed before a line was read".into()));
            }
            return Ok(line);
        }
        if byte[0] == b'\n' {
            return Ok(line);
        }
        line.push(byte[0]);
        if line.len() > MAX_LINE_LEN {
            return Err(PresslineError::Protocol("LPD control line too long".into()));
        }
    }
}

/// Split a `"<size> <name>"` sub-command line.
fn parse_size_name(line: &[u8]) -> Result<(usize, String)> {
    let text = control::decode_bytes(line);
    let mut parts = text.splitn(2, ' ');
    let size: usize = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| PresslineError::Protocol("malformed size field".into()))?;
    let name = parts
        .next()
        .ok_or_else(|| PresslineError::Protocol("malformed file-name field".into()))?
        .to_string();
    Ok((size, name))
}

async fn ack<W: AsyncWrite + Unpin>(stream: &mut W, ok: bool) -> Result<()> {
    stream.write_all(&[if ok { ACK_OK } else { ACK_FAIL }]).await.map_err(PresslineError::Io)
}

/// Assemble and inject the job described by `control_bytes` and `staging`
/// once the client has closed the connection (§4.6, scenario S6).
async fn finish_job(control_bytes: &[u8], staging: &StagingArea, injector: &JobInjector) -> Result<i32> {
    let text = control::decode_bytes(control_bytes);
    let parsed = control::parse(&text)?;

    let mut documents = Vec::new();
    for directive in &parsed.directives {
        let staged = staging
            .find(&directive.data_file_name)
            .ok_or_else(|| PresslineError::Protocol(format!("control file references unknown data file {}", directive.data_file_name)))?;
        let (format, _raw) = control::format_for(directive.kind);
        documents.push(InjectedDocument {
            document_format: format.to_string(),
            bytes: staged.read()?,
        });
    }

    let job_name = parsed.job_name.unwrap_or_default();
    let requesting_user = parsed.requesting_user.unwrap_or_default();
    injector.inject(&job_name, &requesting_user, documents).await
}

/// Drive one accepted connection to completion. `tmp_dir` is where staged
/// data files live; `injector` submits the finished job to the scheduler.
pub async fn handle_connection<S>(stream: &mut S, tmp_dir: &Path, injector: &JobInjector) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let command_line = read_until_lf(stream).await?;
    let Some(&command) = command_line.first() else {
        ack(stream, false).await?;
        return Err(PresslineError::Protocol("empty command line".into()));
    };

    match command {
        CMD_PRINT_WAITING_JOBS => {
            // Deviation from a strict reading of RFC 1179 (§6): "print any
            // waiting jobs" is a no-op here since submission always starts
            // processing immediately.
            Ok(())
        }
        CMD_SEND_SHORT_QUEUE_STATE | CMD_SEND_LONG_QUEUE_STATE => {
            stream.write_all(b"no entries\n").await.map_err(PresslineError::Io)?;
            Ok(())
        }
        CMD_REMOVE_JOBS => {
            ack(stream, true).await?;
            Ok(())
        }
        CMD_RECEIVE_JOB => {
            ack(stream, true).await?;
            receive_job(stream, tmp_dir, injector).await
        }
        _ => {
            ack(stream, false).await?;
            Err(PresslineError::Protocol(format!("unknown LPD command byte 0x{command:02x}")))
        }
    }
}

async fn receive_job<S>(stream: &mut S, tmp_dir: &Path, injector: &JobInjector) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut control_bytes: Vec<u8> = Vec::new();
    let mut staging = StagingArea::new();

    loop {
        let sub_line = match read_until_lf(stream).await {
            Ok(line) => line,
            Err(_) => break, // client closed the connection: job is complete
        };
        let Some(&sub_command) = sub_line.first() else {
            break;
        };
        let rest = &sub_line[1..];

        match sub_command {
            SUB_ABORT => {
                ack(stream, true).await?;
                debug!("LPD job aborted by client");
                return Ok(());
            }
            SUB_CONTROL_FILE => {
                let (size, _name) = parse_size_name(rest)?;
                ack(stream, true).await?;
                let mut body = vec![0u8; size];
                stream.read_exact(&mut body).await.map_err(PresslineError::Io)?;
                let mut terminator = [0u8; 1];
                stream.read_exact(&mut terminator).await.map_err(PresslineError::Io)?;
                // RFC 1179 is silent on repeated control-file sub-commands
                // within one connection; this implementation appends rather
                // than truncating.
                control_bytes.extend_from_slice(&body);
                ack(stream, true).await?;
            }
            SUB_DATA_FILE => {
                let (size, name) = parse_size_name(rest)?;
                ack(stream, true).await?;
                let mut body = vec![0u8; size];
                stream.read_exact(&mut body).await.map_err(PresslineError::Io)?;
                let mut terminator = [0u8; 1];
                stream.read_exact(&mut terminator).await.map_err(PresslineError::Io)?;
                if let Err(e) = staging.stage(tmp_dir, &name, &body) {
                    ack(stream, false).await?;
                    warn!(error = %e, "LPD data-file cap exceeded");
                    return Err(e);
                }
                ack(stream, true).await?;
            }
            _ => {
                ack(stream, false).await?;
                return Err(PresslineError::Protocol(format!("unknown LPD sub-command byte 0x{sub_command:02x}")));
            }
        }
    }

    if control_bytes.is_empty() && staging.is_empty() {
        return Ok(());
    }

    match finish_job(&control_bytes, &staging, injector).await {
        Ok(job_id) => {
            info!(job_id, files = staging.len(), "LPD job accepted");
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "LPD job injection failed");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn print_waiting_jobs_is_a_no_op() {
        let (mut client, mut server) = duplex(4096);
        let tmp = tempfile::tempdir().unwrap();
        let injector = JobInjector::new("ipp://127.0.0.1:6310/printers/lp").unwrap();
        client.write_all(b"\x01\n").await.unwrap();
        drop(client);
        let result = handle_connection(&mut server, tmp.path(), &injector).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn unknown_command_byte_is_rejected_with_ack_1() {
        let (mut client, mut server) = duplex(4096);
        let tmp = tempfile::tempdir().unwrap();
        let injector = JobInjector::new("ipp://127.0.0.1:6310/printers/lp").unwrap();
        client.write_all(b"\xff\n").await.unwrap();
        let handle = tokio::spawn(async move { handle_connection(&mut server, tmp.path(), &injector).await });
        let mut ack_byte = [0u8; 1];
        client.read_exact(&mut ack_byte).await.unwrap();
        assert_eq!(ack_byte[0], ACK_FAIL);
        drop(client);
        assert!(handle.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn data_file_cap_aborts_the_connection() {
        use crate::staging::MAX_DATA_FILES;

        let (mut client, mut server) = duplex(1 << 20);
        let tmp = tempfile::tempdir().unwrap();
        let injector = JobInjector::new("ipp://127.0.0.1:6310/printers/lp").unwrap();
        let handle = tokio::spawn(async move { handle_connection(&mut server, tmp.path(), &injector).await });

        client.write_all(b"\x02lp\n").await.unwrap();
        let mut ack_byte = [0u8; 1];
        client.read_exact(&mut ack_byte).await.unwrap();
        assert_eq!(ack_byte[0], ACK_OK);

        for i in 0..=MAX_DATA_FILES {
            let name = format!("dfA{i:03}host");
            client.write_all(format!("\x031 {name}\n").as_bytes()).await.unwrap();
            client.read_exact(&mut ack_byte).await.unwrap();
            assert_eq!(ack_byte[0], ACK_OK, "size/name line for file {i} is always acked");
            client.write_all(b"x").await.unwrap();
            client.write_all(&[0]).await.unwrap();
            client.read_exact(&mut ack_byte).await.unwrap();
            if i == MAX_DATA_FILES {
                assert_eq!(ack_byte[0], ACK_FAIL);
                break;
            }
            assert_eq!(ack_byte[0], ACK_OK, "file {i} should be accepted");
        }
        drop(client);
        assert!(handle.await.unwrap().is_err());
    }
}
