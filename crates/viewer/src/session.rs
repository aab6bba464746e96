//! Session: consume one capture and print transactions as they arrive.

use std::future::Future;
use std::io::Write;

use engine::capture::{spawn_capture, CaptureEvent, CaptureOutcome};
use engine::format::{item, summary};
use engine::tx::Tx;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::{OutputFormat, ViewerConfig};
use crate::error::ViewerResult;
use crate::state::ViewerState;

pub fn render(format: OutputFormat, tx: &Tx) -> ViewerResult<String> {
    Ok(match format {
        OutputFormat::Summary => format!("{}\n", summary(tx)),
        OutputFormat::Item => format!("{}\n", item(tx)),
        OutputFormat::Json => serde_json::to_string(tx)?,
    })
}

/// Run the configured script until it ends, fails or `shutdown` resolves.
///
/// Shutdown cancels the capture and keeps draining until the producer reports
/// its outcome, so nothing already parsed is lost from `state`.
pub async fn run_session<W, F>(
    config: &ViewerConfig,
    state: &mut ViewerState,
    out: &mut W,
    shutdown: F,
) -> ViewerResult<CaptureOutcome>
where
    W: Write,
    F: Future<Output = ()>,
{
    let cancel = CancellationToken::new();
    let handle = spawn_capture(&config.script, &config.capture, cancel.clone())?;
    info!(script = %config.script, "capture started");

    let events = handle.into_events();
    tokio::pin!(events);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown, if !cancel.is_cancelled() => {
                info!("shutdown requested, stopping capture");
                cancel.cancel();
            }
            event = events.next() => match event {
                Some(CaptureEvent::Tx(tx)) => {
                    if let Some(shown) = state.record(*tx) {
                        writeln!(out, "{}", render(config.output.format, shown)?)?;
                    }
                }
                Some(CaptureEvent::Finished(outcome)) => {
                    let outcome = outcome?;
                    debug!(?outcome, stored = state.store.len(), "capture finished");
                    return Ok(outcome);
                }
                // Finished is always the last item.
                None => return Ok(CaptureOutcome::Completed),
            }
        }
    }
}
