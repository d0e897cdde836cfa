//! Live-push dashboard updates over a second decoded event stream.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use tether_api::{CancellationSignal, RelayApiError, RelayClient, SseFrameDecoder, StreamEvent};

use crate::session::SessionTrigger;

/// Handle to the background push task. Stopping is idempotent and guarantees
/// no trigger is delivered afterwards.
pub struct PushListener {
    cancel: CancellationSignal,
    handle: JoinHandle<()>,
}

impl PushListener {
    pub fn stop(&self) {
        self.cancel.store(true, Ordering::Release);
        self.handle.abort();
    }
}

impl Drop for PushListener {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Open the long-lived push stream in parallel with the interactive loop.
///
/// Each decoded `tui_frame` event is forwarded as a [`SessionTrigger::Push`],
/// except the first one received after connecting, which duplicates the
/// initial synchronous render. Any connection error stops the listener
/// quietly; the interactive loop continues on fetches and the timer alone.
pub fn spawn_push_listener(
    client: Arc<RelayClient>,
    instance_id: String,
    tx: mpsc::Sender<SessionTrigger>,
) -> PushListener {
    let cancel: CancellationSignal = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);

    let handle = tokio::spawn(async move {
        if let Err(error) = listen(client, &instance_id, tx, flag).await {
            tracing::debug!(%error, "push listener stopped");
        }
    });

    PushListener { cancel, handle }
}

async fn listen(
    client: Arc<RelayClient>,
    instance_id: &str,
    tx: mpsc::Sender<SessionTrigger>,
    cancel: CancellationSignal,
) -> Result<(), RelayApiError> {
    let response = client.open_push_stream(instance_id).await?;
    let mut bytes = response.bytes_stream();
    let mut decoder = SseFrameDecoder::default();
    let mut first_skipped = false;

    while let Some(chunk) = bytes.next().await {
        if cancel.load(Ordering::Acquire) {
            return Ok(());
        }
        let chunk = chunk?;
        for frame in decoder.feed(&chunk) {
            let Some(StreamEvent::TuiFrame(payload)) = StreamEvent::from_frame(&frame) else {
                continue;
            };
            if !first_skipped {
                first_skipped = true;
                continue;
            }
            if tx.send(SessionTrigger::Push(payload)).await.is_err() {
                return Ok(());
            }
        }
    }

    tracing::debug!("push stream closed by remote");
    Ok(())
}
