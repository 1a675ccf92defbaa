//! Output stream readers (non-UTF8-safe).
//!
//! SteamCMD emits carriage-return progress updates and occasionally invalid
//! UTF-8. Lines are read as bytes, split on `\n` and `\r`, and decoded lossily
//! so a bad byte never ends the reader.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

/// Forward every line of `stream` to `tx` until EOF or the receiver is gone.
pub fn spawn_line_reader(
    stream: impl AsyncRead + Unpin + Send + 'static,
    stream_type: &'static str,
    tx: mpsc::Sender<String>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf: Vec<u8> = Vec::with_capacity(1024);

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break, // EOF
                Ok(_) => {
                    let text = String::from_utf8_lossy(&buf);
                    for line in text.split(['\n', '\r']).filter(|l| !l.trim().is_empty()) {
                        trace!(target: "workdl.download", %stream_type, "{line}");
                        if tx.send(line.to_string()).await.is_err() {
                            return;
                        }
                    }
                }
                Err(e) => {
                    trace!(target: "workdl.download", %stream_type, error = %e, "stream reader exiting due to read error");
                    break;
                }
            }
        }
    })
}
