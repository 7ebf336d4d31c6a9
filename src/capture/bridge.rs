//! Capture bridge between the controller and a recognizer IPC client
//!
//! `CaptureBridge` is the controller-side half: it implements `VoiceCapture`
//! by prompting the recognizer client over a broadcast channel.
//! `CaptureSubmitter` is the server-side half: the IPC server uses it to mark
//! the capability available and to forward transcript results into the
//! controller's capture channel. Results submitted after a cancel (or with no
//! capture active) are dropped here, before the controller ever sees them.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use super::{CaptureError, CaptureEvent, CaptureOutcome, CapturePrompt, VoiceCapture};

/// State shared between the two halves of the bridge
#[derive(Debug, Default)]
struct Shared {
    /// A recognizer client has announced itself
    available: AtomicBool,
    /// A capture is in flight
    active: AtomicBool,
    /// Generation of the in-flight (or most recent) capture
    generation: AtomicU64,
}

/// Create a connected bridge pair. Prompts for the recognizer client go out
/// on the returned broadcast sender; results come back on `event_tx`.
pub fn bridge_pair(
    event_tx: mpsc::Sender<CaptureEvent>,
    prompt_tx: broadcast::Sender<CapturePrompt>,
) -> (CaptureBridge, CaptureSubmitter) {
    let shared = Arc::new(Shared::default());
    (
        CaptureBridge {
            shared: Arc::clone(&shared),
            prompt_tx,
        },
        CaptureSubmitter { shared, event_tx },
    )
}

/// Controller-side capture capability backed by a remote recognizer
pub struct CaptureBridge {
    shared: Arc<Shared>,
    prompt_tx: broadcast::Sender<CapturePrompt>,
}

impl VoiceCapture for CaptureBridge {
    fn start(&mut self) -> Result<u64, CaptureError> {
        if !self.shared.available.load(Ordering::SeqCst) {
            return Err(CaptureError::Unavailable);
        }
        if self.shared.active.swap(true, Ordering::SeqCst) {
            return Err(CaptureError::Busy);
        }

        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self.prompt_tx.send(CapturePrompt::StartListening { generation });
        debug!(generation, "capture started");
        Ok(generation)
    }

    fn stop(&mut self) {
        if self.shared.active.load(Ordering::SeqCst) {
            let _ = self.prompt_tx.send(CapturePrompt::StopListening);
        }
    }

    fn cancel(&mut self) {
        if self.shared.active.swap(false, Ordering::SeqCst) {
            debug!("capture cancelled");
            let _ = self.prompt_tx.send(CapturePrompt::CancelListening);
        }
    }
}

/// Server-side handle for announcing the recognizer and submitting results
#[derive(Clone)]
pub struct CaptureSubmitter {
    shared: Arc<Shared>,
    event_tx: mpsc::Sender<CaptureEvent>,
}

impl CaptureSubmitter {
    /// Mark the speech capability present (a recognizer client connected)
    pub fn set_available(&self, available: bool) {
        self.shared.available.store(available, Ordering::SeqCst);
    }

    /// Submit a finalized transcript for the capture started with
    /// `generation` (the recognizer echoes it from `StartListening`)
    pub async fn submit_transcript(&self, generation: u64, text: String) {
        self.submit(generation, CaptureOutcome::Transcript(text)).await;
    }

    /// Report a mid-capture failure for the capture started with `generation`
    pub async fn submit_error(&self, generation: u64, reason: String) {
        self.submit(generation, CaptureOutcome::Error(reason)).await;
    }

    async fn submit(&self, generation: u64, outcome: CaptureOutcome) {
        // A result for any generation but the current one belongs to a
        // cancelled capture. It must not consume the active flag, or a
        // late result would eat the result of the capture that replaced it.
        if generation != self.shared.generation.load(Ordering::SeqCst) {
            debug!(generation, "discarding capture result from a cancelled capture");
            return;
        }
        // A result after cancel (or with nothing in flight) is dropped
        if !self.shared.active.swap(false, Ordering::SeqCst) {
            debug!(generation, "discarding capture result with no capture in flight");
            return;
        }

        let event = CaptureEvent { generation, outcome };
        if self.event_tx.send(event).await.is_err() {
            warn!("capture event channel closed, result lost");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    fn pair() -> (
        CaptureBridge,
        CaptureSubmitter,
        mpsc::Receiver<CaptureEvent>,
        broadcast::Receiver<CapturePrompt>,
    ) {
        let (event_tx, event_rx) = mpsc::channel(4);
        let (prompt_tx, prompt_rx) = broadcast::channel(4);
        let (bridge, submitter) = bridge_pair(event_tx, prompt_tx);
        (bridge, submitter, event_rx, prompt_rx)
    }

    #[tokio::test]
    async fn test_start_requires_announced_recognizer() {
        let (mut bridge, submitter, _events, _prompts) = pair();
        assert_eq!(bridge.start(), Err(CaptureError::Unavailable));

        submitter.set_available(true);
        assert_ok!(bridge.start());
    }

    #[tokio::test]
    async fn test_reentrant_start_is_busy() {
        let (mut bridge, submitter, _events, _prompts) = pair();
        submitter.set_available(true);

        assert_ok!(bridge.start());
        assert_eq!(bridge.start(), Err(CaptureError::Busy));
    }

    #[tokio::test]
    async fn test_result_carries_start_generation() {
        let (mut bridge, submitter, mut events, mut prompts) = pair();
        submitter.set_available(true);

        let generation = bridge.start().unwrap();
        assert!(matches!(
            prompts.recv().await.unwrap(),
            CapturePrompt::StartListening { generation: g } if g == generation
        ));

        submitter
            .submit_transcript(generation, "shipped the release notes".into())
            .await;
        let event = events.recv().await.unwrap();
        assert_eq!(event.generation, generation);
        assert_eq!(
            event.outcome,
            CaptureOutcome::Transcript("shipped the release notes".into())
        );
    }

    #[tokio::test]
    async fn test_result_after_cancel_is_dropped() {
        let (mut bridge, submitter, mut events, _prompts) = pair();
        submitter.set_available(true);

        let generation = bridge.start().unwrap();
        bridge.cancel();

        submitter.submit_transcript(generation, "too late".into()).await;
        assert!(events.try_recv().is_err());

        // A fresh capture still works after the cancel
        assert_ok!(bridge.start());
    }

    #[tokio::test]
    async fn test_cancelled_result_not_credited_to_next_capture() {
        let (mut bridge, submitter, mut events, _prompts) = pair();
        submitter.set_available(true);

        let first = bridge.start().unwrap();
        bridge.cancel();
        let second = bridge.start().unwrap();

        // The late result of the cancelled capture must vanish without
        // touching the capture that replaced it
        submitter.submit_transcript(first, "stale words".into()).await;
        assert!(events.try_recv().is_err());

        submitter.submit_transcript(second, "the real check-in".into()).await;
        let event = events.recv().await.unwrap();
        assert_eq!(event.generation, second);
        assert_eq!(
            event.outcome,
            CaptureOutcome::Transcript("the real check-in".into())
        );
    }

    #[tokio::test]
    async fn test_exactly_one_result_per_start() {
        let (mut bridge, submitter, mut events, _prompts) = pair();
        submitter.set_available(true);

        let generation = bridge.start().unwrap();
        submitter.submit_transcript(generation, "first".into()).await;
        submitter.submit_error(generation, "duplicate".into()).await;

        assert!(events.recv().await.is_some());
        assert!(events.try_recv().is_err());
    }
}
