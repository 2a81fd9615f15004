//! Async line readers for child output (non-UTF8-safe).
//!
//! llama.cpp tooling can emit non-UTF8 bytes on stdout/stderr.
//! `BufReader::lines()` would terminate the reader task on invalid UTF-8, so
//! lines are read as bytes and decoded lossily.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;
use wrangler_core::OutputStream;

use super::OutputLine;

/// Forward every line of `stream` to `tx` until EOF.
///
/// The pipe keeps being drained after the receiver is gone so the child never
/// blocks on a full pipe.
pub fn spawn_line_reader(
    stream: impl AsyncRead + Unpin + Send + 'static,
    pid: u32,
    origin: OutputStream,
    tx: UnboundedSender<OutputLine>,
) {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf: Vec<u8> = Vec::with_capacity(1024);

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break, // EOF
                Ok(_) => {
                    if buf.last() == Some(&b'\n') {
                        buf.pop();
                        if buf.last() == Some(&b'\r') {
                            buf.pop();
                        }
                    }

                    let line = String::from_utf8_lossy(&buf).into_owned();
                    debug!(pid = %pid, stream = %origin, "{line}");
                    // Receiver gone: keep draining.
                    let _ = tx.send(OutputLine { stream: origin, line });
                }
                Err(e) => {
                    debug!(pid = %pid, stream = %origin, error = %e, "output reader exiting due to read error");
                    break;
                }
            }
        }

        debug!(pid = %pid, stream = %origin, "output reader task exiting");
    });
}
