//! Driver: runs the log tool and turns its output into transactions.
//!
//! One producer task owns the child process: it reads stdout line by line,
//! frames blocks, parses them and hands each [`Tx`] to the consumer through a
//! bounded channel. A second task drains stderr so the child never blocks on
//! a full pipe. Cancellation is checked before every line and every send.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, ChildStdout};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::CaptureError;
use super::framer::BlockFramer;
use super::script::{normalize_script, shell_command};
use crate::conf::CaptureConfig;
use crate::parser::parse_block;
use crate::tx::Tx;

/// How a capture ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// The process closed its output and exited (or outlived the grace delay).
    Completed,
    /// Stopped by the cancellation token or because the receiver went away.
    Cancelled,
}

/// Item of [`CaptureHandle::into_events`]. `Finished` is always last.
#[derive(Debug)]
pub enum CaptureEvent {
    Tx(Box<Tx>),
    Finished(Result<CaptureOutcome, CaptureError>),
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CaptureStats {
    pub lines_read: u64,
    pub lines_skipped: u64,
    pub blocks_framed: u64,
    pub blocks_dropped: u64,
    pub txs_delivered: u64,
}

/// Consumer side of a running capture.
pub struct CaptureHandle {
    rx: mpsc::Receiver<Tx>,
    task: JoinHandle<Result<CaptureOutcome, CaptureError>>,
    cancel: CancellationToken,
}

impl CaptureHandle {
    /// Next completed transaction, in stream order. `None` once the producer stopped.
    pub async fn next_tx(&mut self) -> Option<Tx> {
        self.rx.recv().await
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the terminal outcome.
    ///
    /// Transactions not yet received are discarded; if the producer was still
    /// running it sees the closed channel and stops as cancelled.
    pub async fn finish(self) -> Result<CaptureOutcome, CaptureError> {
        drop(self.rx);
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => Err(CaptureError::TaskFailed(e.to_string())),
        }
    }

    /// Every transaction as a stream item, followed by one `Finished`.
    pub fn into_events(mut self) -> impl Stream<Item = CaptureEvent> {
        async_stream::stream! {
            while let Some(tx) = self.rx.recv().await {
                yield CaptureEvent::Tx(Box::new(tx));
            }
            yield CaptureEvent::Finished(self.finish().await);
        }
    }
}

/// Start `script` under the configured shell and begin producing transactions.
///
/// Must be called from within a Tokio runtime.
pub fn spawn_capture(
    script: &str,
    config: &CaptureConfig,
    cancel: CancellationToken,
) -> Result<CaptureHandle, CaptureError> {
    let script = normalize_script(script);
    if script.is_empty() {
        return Err(CaptureError::EmptyScript);
    }

    debug!(shell = %config.shell, script = %script, "starting capture");

    let mut child = shell_command(&config.shell, &script)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(CaptureError::Spawn)?;

    let stdout = child.stdout.take().ok_or(CaptureError::PipeUnavailable("stdout"))?;
    let stderr = child.stderr.take().ok_or(CaptureError::PipeUnavailable("stderr"))?;

    let stderr_task = tokio::spawn(drain_stderr(stderr, config.max_stderr_bytes));
    let (sender, rx) = mpsc::channel(config.channel_capacity.max(1));

    let task = tokio::spawn(run_capture(
        child,
        stdout,
        stderr_task,
        sender,
        cancel.clone(),
        config.exit_grace(),
    ));

    Ok(CaptureHandle { rx, task, cancel })
}

async fn run_capture(
    mut child: Child,
    stdout: ChildStdout,
    stderr_task: JoinHandle<String>,
    sender: mpsc::Sender<Tx>,
    cancel: CancellationToken,
    exit_grace: Duration,
) -> Result<CaptureOutcome, CaptureError> {
    let mut stdout = BufReader::new(stdout);
    let mut buf = Vec::new();
    let mut framer = BlockFramer::new();
    let mut stats = CaptureStats::default();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Ok(stop(&mut child, stderr_task, &stats, "cancelled").await);
            }
            line = read_line_lossy(&mut stdout, &mut buf) => line.map_err(CaptureError::Read)?,
        };

        let Some(line) = next else { break };
        stats.lines_read += 1;

        let Some(block) = framer.push(&line) else { continue };
        stats.blocks_framed += 1;

        let tx = match parse_block(block) {
            Ok(tx) => tx,
            Err(e) => {
                debug!(error = %e, "dropping block");
                stats.blocks_dropped += 1;
                continue;
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Ok(stop(&mut child, stderr_task, &stats, "cancelled").await);
            }
            sent = sender.send(tx) => {
                if sent.is_err() {
                    return Ok(stop(&mut child, stderr_task, &stats, "receiver dropped").await);
                }
                stats.txs_delivered += 1;
            }
        }
    }

    stats.lines_skipped = framer.skipped();

    if framer.has_pending() {
        let lines = framer.pending_len();
        warn!(lines, "output closed inside a block");
        let _ = child.start_kill();
        stderr_task.abort();
        return Err(CaptureError::IncompleteTx { lines });
    }

    match tokio::time::timeout(exit_grace, child.wait()).await {
        Ok(Ok(status)) if status.success() => {
            log_stats(&stats, "completed");
            Ok(CaptureOutcome::Completed)
        }
        Ok(Ok(status)) => {
            let stderr = match tokio::time::timeout(exit_grace, stderr_task).await {
                Ok(Ok(text)) => text,
                _ => String::new(),
            };
            warn!(%status, "capture process failed");
            Err(CaptureError::ProcessFailed { status, stderr })
        }
        Ok(Err(e)) => Err(CaptureError::Wait(e)),
        Err(_) => {
            warn!(
                grace_ms = exit_grace.as_millis() as u64,
                "process still running after output closed, killing it"
            );
            let _ = child.start_kill();
            stderr_task.abort();
            log_stats(&stats, "completed");
            Ok(CaptureOutcome::Completed)
        }
    }
}

async fn stop(
    child: &mut Child,
    stderr_task: JoinHandle<String>,
    stats: &CaptureStats,
    reason: &'static str,
) -> CaptureOutcome {
    if let Err(e) = child.kill().await {
        debug!(error = %e, "could not kill capture process");
    }
    stderr_task.abort();
    log_stats(stats, reason);
    CaptureOutcome::Cancelled
}

fn log_stats(stats: &CaptureStats, reason: &'static str) {
    info!(
        reason,
        lines_read = stats.lines_read,
        lines_skipped = stats.lines_skipped,
        blocks = stats.blocks_framed,
        dropped = stats.blocks_dropped,
        delivered = stats.txs_delivered,
        "capture finished"
    );
}

/// Next line without its `\n` or `\r\n`, with invalid UTF-8 replaced.
/// `None` at end of input.
async fn read_line_lossy<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    buf: &mut Vec<u8>,
) -> std::io::Result<Option<String>> {
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    Ok(Some(String::from_utf8_lossy(buf).into_owned()))
}

/// Collect stderr up to `limit` bytes, logging every line.
///
/// Keeps reading until end of input so the child never writes into a closed pipe.
async fn drain_stderr<R: AsyncRead + Unpin>(stderr: R, limit: usize) -> String {
    let mut reader = BufReader::new(stderr);
    let mut buf = Vec::new();
    let mut captured = String::new();

    loop {
        match read_line_lossy(&mut reader, &mut buf).await {
            Ok(Some(line)) => {
                debug!(line = %line, "stderr");
                if captured.len() + line.len() < limit {
                    captured.push_str(&line);
                    captured.push('\n');
                }
            }
            Ok(None) => break,
            Err(e) => {
                debug!(error = %e, "error reading from stderr");
                break;
            }
        }
    }

    captured
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;
    use tokio_test::{assert_err, assert_ok};

    fn config() -> CaptureConfig {
        CaptureConfig {
            exit_grace_ms: 2000,
            ..Default::default()
        }
    }

    const TWO_BLOCKS: &str = r"printf '%s\n' \
        'noise before' \
        '*   << Request  >> 5' \
        '-   Begin          req 4 rxreq' \
        '-   ReqURL         /a' \
        '-   End' \
        '*   << BeReq    >> 6' \
        '-   Begin          bereq 5 fetch' \
        '-   End'";

    #[tokio::test]
    async fn test_capture_delivers_transactions_in_order() {
        let mut handle = spawn_capture(TWO_BLOCKS, &config(), CancellationToken::new()).unwrap();

        let first = handle.next_tx().await.expect("first tx");
        assert_eq!(first.txid, "5");
        assert_eq!(first.url, "/a");

        let second = handle.next_tx().await.expect("second tx");
        assert_eq!(second.txid, "6");
        assert_eq!(second.reason, "fetch");

        assert!(handle.next_tx().await.is_none());
        assert_eq!(assert_ok!(handle.finish().await), CaptureOutcome::Completed);
    }

    #[tokio::test]
    async fn test_bad_vxid_block_is_dropped() {
        let script = r"printf '%s\n' \
            '*   << Request  >> nope' \
            '-   End' \
            '*   << Request  >> 7' \
            '-   End'";
        let mut handle = spawn_capture(script, &config(), CancellationToken::new()).unwrap();

        let tx = handle.next_tx().await.expect("valid tx");
        assert_eq!(tx.txid, "7");
        assert!(handle.next_tx().await.is_none());
        assert_ok!(handle.finish().await);
    }

    #[tokio::test]
    async fn test_incomplete_block_is_an_error() {
        let script = r"printf '%s\n' '*   << Request  >> 5' '-   Begin req 4 rxreq'";
        let mut handle = spawn_capture(script, &config(), CancellationToken::new()).unwrap();

        assert!(handle.next_tx().await.is_none());
        let err = assert_err!(handle.finish().await);
        assert!(matches!(err, CaptureError::IncompleteTx { lines: 2 }));
    }

    #[tokio::test]
    async fn test_process_failure_carries_stderr() {
        let handle = spawn_capture("sh -c 'echo boom >&2; exit 3'", &config(), CancellationToken::new()).unwrap();

        let err = assert_err!(handle.finish().await);
        match err {
            CaptureError::ProcessFailed { status, stderr } => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(stderr, "boom\n");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_cancel_kills_the_process() {
        let cancel = CancellationToken::new();
        let mut handle = spawn_capture("sleep 30", &config(), cancel.clone()).unwrap();

        cancel.cancel();
        assert!(handle.next_tx().await.is_none());

        let outcome = tokio::time::timeout(Duration::from_secs(5), handle.finish())
            .await
            .expect("cancellation is prompt");
        assert_eq!(assert_ok!(outcome), CaptureOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_dropped_receiver_counts_as_cancelled() {
        // Three blocks against a capacity of one: the last send always sees the closed channel.
        let script = r#"sh -c "printf '%s\n' \
            '*   << Request  >> 5' '-   End' \
            '*   << Request  >> 6' '-   End' \
            '*   << Request  >> 7' '-   End'; exec sleep 30""#;
        let mut handle = spawn_capture(script, &config(), CancellationToken::new()).unwrap();

        assert!(handle.next_tx().await.is_some());
        let outcome = tokio::time::timeout(Duration::from_secs(5), handle.finish())
            .await
            .expect("stops promptly");
        assert_eq!(assert_ok!(outcome), CaptureOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_empty_script() {
        let result = spawn_capture("# only a comment\n\n", &config(), CancellationToken::new());
        assert!(matches!(result, Err(CaptureError::EmptyScript)));
    }

    #[tokio::test]
    async fn test_missing_shell_fails_to_spawn() {
        let cfg = CaptureConfig {
            shell: "/nonexistent/shell".to_string(),
            ..config()
        };
        let result = spawn_capture("true", &cfg, CancellationToken::new());
        assert!(matches!(result, Err(CaptureError::Spawn(_))));
    }

    #[tokio::test]
    async fn test_event_stream_ends_with_outcome() {
        let events: Vec<_> = spawn_capture(TWO_BLOCKS, &config(), CancellationToken::new())
            .unwrap()
            .into_events()
            .collect()
            .await;

        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], CaptureEvent::Tx(tx) if tx.txid == "5"));
        assert!(matches!(&events[1], CaptureEvent::Tx(tx) if tx.txid == "6"));
        assert!(matches!(&events[2], CaptureEvent::Finished(Ok(CaptureOutcome::Completed))));
    }

    #[tokio::test]
    async fn test_non_utf8_bytes_do_not_stop_the_capture() {
        let script = r"printf '*   << Request  >> 5\n-   ReqHeader      User-Agent: caf\351\n-   ReqURL         /caf\351\n-   End\n*   << Request  >> 6\n-   End\n'";
        let mut handle = spawn_capture(script, &config(), CancellationToken::new()).unwrap();

        let first = handle.next_tx().await.expect("block with latin-1 bytes");
        assert_eq!(first.txid, "5");
        assert_eq!(first.url, "/caf\u{fffd}");

        let second = handle.next_tx().await.expect("following block");
        assert_eq!(second.txid, "6");
        assert_eq!(assert_ok!(handle.finish().await), CaptureOutcome::Completed);
    }

    #[tokio::test]
    async fn test_crlf_line_endings_are_stripped() {
        let script = r"printf '*   << Request  >> 8\r\n-   ReqURL         /x\r\n-   End\r\n'";
        let mut handle = spawn_capture(script, &config(), CancellationToken::new()).unwrap();

        let tx = handle.next_tx().await.expect("tx");
        assert_eq!(tx.txid, "8");
        assert_eq!(tx.url, "/x");
        assert_ok!(handle.finish().await);
    }

    #[tokio::test]
    async fn test_non_utf8_stderr_keeps_draining() {
        let script = r#"sh -c "printf '\377\n' >&2; sleep 0.3; echo warning >&2; printf '*   << Request  >> 7\n-   End\n'""#;
        let mut handle = spawn_capture(script, &config(), CancellationToken::new()).unwrap();

        let tx = handle.next_tx().await.expect("block after stderr noise");
        assert_eq!(tx.txid, "7");
        assert!(handle.next_tx().await.is_none());
        assert_eq!(assert_ok!(handle.finish().await), CaptureOutcome::Completed);
    }

    #[tokio::test]
    async fn test_drain_stderr_decodes_lossily() {
        let input: &[u8] = b"\xff\nwarning\r\n";
        assert_eq!(drain_stderr(input, 1024).await, "\u{fffd}\nwarning\n");
    }

    #[tokio::test]
    async fn test_open_process_after_stdout_closes_is_killed_after_grace() {
        let cfg = CaptureConfig {
            exit_grace_ms: 200,
            ..config()
        };
        let script = r#"sh -c "printf '*   << Request  >> 9\n-   End\n'; exec >&-; sleep 30""#;
        let mut handle = spawn_capture(script, &cfg, CancellationToken::new()).unwrap();

        assert_eq!(handle.next_tx().await.expect("tx").txid, "9");
        let outcome = tokio::time::timeout(Duration::from_secs(5), handle.finish())
            .await
            .expect("grace delay bounds the wait");
        assert_eq!(assert_ok!(outcome), CaptureOutcome::Completed);
    }
}
