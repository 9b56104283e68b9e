//! Draining a launched child's stdio back to the caller, and writing any
//! stdin payload to it, until the child exits and every byte it produced
//! has been delivered or discarded.
//!
//! Protocol 1 speaks through a single combined socket carrying stdin,
//! stdout, and stderr together, and delivers exactly one terminal frame
//! once the child exits: the accumulated output (capped) plus the exit
//! code. Protocol 2 and above stream output as it arrives, tagged by which
//! stream it came from, and emit a single terminal status frame at the
//! end. Both variants read to EOF regardless of whether the output cap has
//! been hit or the transport has gone away, so the child is never left
//! blocked writing into a socket nobody is draining.

use std::io;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use remctld_protocol::Session;
use remctld_protocol::StreamId;
use remctld_protocol::Transport;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;

use crate::child::OutputBuffer;
use crate::error::DispatchError;
use crate::error::Result;
use crate::flags::REMCTLD_TOKEN_MAX_OUTPUT;
use crate::flags::REMCTLD_TOKEN_MAX_OUTPUT_V1;
use crate::launch::translate_exit_status;
use crate::launch::Launched;

const READ_CHUNK: usize = 8 * 1024;

/// The result of running one child to completion: its exit code, and (for
/// protocol 1 only) the output accumulated while running it. The terminal
/// frame is not sent here — the caller decides when, since a summary sweep
/// runs several children and only emits one terminal frame for all of them
/// combined.
pub struct MultiplexOutcome {
    pub exit_code: i32,
    pub v1_output: Option<Vec<u8>>,
    /// Set if an I/O error other than EOF/`ECONNRESET`/`EPIPE` broke the
    /// read loop on either stream. The caller should report `ERROR_INTERNAL`
    /// instead of the usual terminal frame when this is set.
    pub io_error: bool,
}

/// `ECONNRESET`/`EPIPE` mean the other end went away; the spec treats that
/// as an ordinary EOF rather than a reportable failure.
fn is_peer_gone(err: &io::Error) -> bool {
    matches!(err.kind(), io::ErrorKind::ConnectionReset | io::ErrorKind::BrokenPipe)
}

/// Write `payload` to the child's stdin and half-shutdown the write side so
/// the child observes EOF. Returns `true` if a genuine I/O error (not EOF,
/// not a gone peer) broke the write early; a gone peer (`ECONNRESET`/`EPIPE`,
/// e.g. the child already closed its end) is treated as if the write had
/// completed normally.
async fn write_stdin(mut write_half: impl AsyncWrite + Unpin, payload: &[u8]) -> bool {
    if let Err(e) = write_half.write_all(payload).await {
        if is_peer_gone(&e) {
            return false;
        }
        tracing::warn!(error = %e, "I/O error writing child stdin, ending invocation early");
        return true;
    }
    if let Err(e) = write_half.shutdown().await {
        if is_peer_gone(&e) {
            return false;
        }
        tracing::warn!(error = %e, "I/O error shutting down child stdin, ending invocation early");
        return true;
    }
    false
}

/// Read `reader` to EOF, accumulating into a capped buffer and continuing
/// to read (and discard) past the cap so the writer on the other end never
/// blocks on a full socket buffer. Returns `true` if a genuine I/O error (not
/// EOF, not a gone peer) broke the loop early.
async fn drain_into_buffer(mut reader: impl AsyncRead + Unpin, cap: usize) -> (OutputBuffer, bool) {
    let mut buffer = OutputBuffer::new(cap);
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        let n = match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if is_peer_gone(&e) => break,
            Err(e) => {
                tracing::warn!(error = %e, "I/O error reading child output, ending invocation early");
                return (buffer, true);
            }
        };
        buffer.push(&chunk[..n]);
    }
    (buffer, false)
}

/// Read `reader` to EOF, forwarding each chunk to the transport as a
/// `stream`-tagged frame. Keeps draining (but stops forwarding) once the
/// transport reports the peer is gone. Returns `true` if a genuine I/O error
/// broke the loop early.
async fn stream_to_transport(
    mut reader: impl AsyncRead + Unpin,
    session: &Session,
    transport: &dyn Transport,
    stream: StreamId,
    aborted: &AtomicBool,
) -> bool {
    let mut chunk = vec![0u8; *REMCTLD_TOKEN_MAX_OUTPUT];
    loop {
        let n = match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if is_peer_gone(&e) => break,
            Err(e) => {
                tracing::warn!(error = %e, stream = ?stream, "I/O error reading child output, ending invocation early");
                return true;
            }
        };
        if aborted.load(Ordering::Relaxed) {
            continue;
        }
        if !transport.v2_send_output(session, stream, &chunk[..n]) {
            aborted.store(true, Ordering::Relaxed);
        }
    }
    false
}

/// Run a launched child to completion: deliver any stdin payload, forward
/// or buffer its output per `protocol`, wait for it to exit, and emit the
/// terminal frame.
pub async fn run(
    launched: Launched,
    session: &Session,
    transport: &dyn Transport,
    protocol: u32,
    stdin_payload: Option<Vec<u8>>,
) -> Result<MultiplexOutcome> {
    let Launched {
        mut child,
        stdio,
        stderr,
    } = launched;

    let (stdio_read, mut stdio_write) = stdio.into_split();
    let aborted = AtomicBool::new(false);

    let stdin_future = async {
        if let Some(payload) = &stdin_payload {
            write_stdin(&mut stdio_write, payload).await
        } else {
            false
        }
    };

    let stdout_future = async {
        if protocol >= 2 {
            let broke = stream_to_transport(stdio_read, session, transport, StreamId::Stdout, &aborted).await;
            (None, broke)
        } else {
            let (buffer, broke) = drain_into_buffer(stdio_read, *REMCTLD_TOKEN_MAX_OUTPUT_V1).await;
            (Some(buffer), broke)
        }
    };

    let stderr_future = async {
        if let Some(stderr) = stderr {
            stream_to_transport(stderr, session, transport, StreamId::Stderr, &aborted).await
        } else {
            false
        }
    };

    let (stdin_broke, (v1_buffer, stdout_broke), stderr_broke, wait_result) =
        tokio::join!(stdin_future, stdout_future, stderr_future, child.wait());

    let exit_status = wait_result.map_err(DispatchError::Io)?;
    let exit_code = translate_exit_status(exit_status);

    Ok(MultiplexOutcome {
        exit_code,
        v1_output: v1_buffer.map(OutputBuffer::into_vec),
        io_error: stdin_broke || stdout_broke || stderr_broke,
    })
}
