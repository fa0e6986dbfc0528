//! Stream controller: owns the lifecycle of one generation session at a time.
//!
//! `begin` validates the prompt, claims the single active-session slot and
//! spawns the consumption task; the task decodes chunks, publishes the full
//! accumulated buffer after each one and emits exactly one terminal event.
//! The slot is released at a single point before the terminal event goes
//! out, so a new session can always start once the old one has reported.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use rill_core::{Error, MAX_PROMPT_CHARS, Result};

use crate::decode::StreamDecoder;
use crate::source::TextSource;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier for one generation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    fn next() -> Self {
        SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::SeqCst))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Returned by `begin`; the caller keeps it to cancel the session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    cancel: CancellationToken,
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// The response body ended normally.
    Completed,
    /// The user stopped the session. Not an error.
    Cancelled,
    /// The request or the stream failed; any text received so far stands.
    Failed(String),
}

/// Events published to the consumer over the controller's channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The session started and the slot is claimed.
    Opened { id: SessionId },
    /// One chunk arrived; `text` is the full accumulated buffer so far.
    Buffer { id: SessionId, text: String },
    /// The session ended. Emitted exactly once per session, after the slot
    /// has been released.
    Closed { id: SessionId, status: SessionStatus },
}

struct ActiveSession {
    id: SessionId,
    cancel: CancellationToken,
}

/// Drives generation sessions against a `TextSource`.
pub struct StreamController {
    source: Arc<dyn TextSource>,
    events: mpsc::UnboundedSender<SessionEvent>,
    active: Arc<Mutex<Option<ActiveSession>>>,
}

impl StreamController {
    /// Create a controller and the receiving end of its event channel.
    pub fn new(source: Arc<dyn TextSource>) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let controller = Self { source, events: tx, active: Arc::new(Mutex::new(None)) };
        (controller, rx)
    }

    /// Start a session for `prompt`.
    ///
    /// The prompt must be non-empty after trimming and at most
    /// `MAX_PROMPT_CHARS` characters, and no other session may be active.
    /// The untrimmed prompt is sent as-is; trimming applies to validation
    /// only.
    pub fn begin(&self, prompt: &str) -> Result<SessionHandle> {
        if prompt.trim().is_empty() {
            return Err(Error::Validation("prompt is empty".into()));
        }
        if prompt.chars().count() > MAX_PROMPT_CHARS {
            return Err(Error::Validation(format!(
                "prompt exceeds {} characters",
                MAX_PROMPT_CHARS
            )));
        }

        let id = SessionId::next();
        let cancel = CancellationToken::new();

        {
            let mut slot = self.active.lock().expect("active slot poisoned");
            if slot.is_some() {
                return Err(Error::Busy);
            }
            *slot = Some(ActiveSession { id, cancel: cancel.clone() });
        }

        let _ = self.events.send(SessionEvent::Opened { id });
        tracing::debug!(session = id.value(), "session opened");

        let source = Arc::clone(&self.source);
        let events = self.events.clone();
        let active = Arc::clone(&self.active);
        let prompt = prompt.to_string();
        let token = cancel.clone();

        tokio::spawn(async move {
            let status = run_session(source, &prompt, id, &token, &events).await;

            // Single cleanup point: release the slot, then report.
            {
                let mut slot = active.lock().expect("active slot poisoned");
                if slot.as_ref().map(|s| s.id) == Some(id) {
                    *slot = None;
                }
            }
            tracing::debug!(session = id.value(), ?status, "session closed");
            let _ = events.send(SessionEvent::Closed { id, status });
        });

        Ok(SessionHandle { id, cancel })
    }

    /// Request cancellation of the session behind `handle`.
    ///
    /// A handle for a session that already ended is ignored, so a late
    /// cancel can never touch a newer session.
    pub fn cancel(&self, handle: &SessionHandle) {
        let slot = self.active.lock().expect("active slot poisoned");
        if slot.as_ref().map(|s| s.id) == Some(handle.id) {
            tracing::debug!(session = handle.id.value(), "cancel requested");
            handle.cancel.cancel();
        }
    }

    /// Whether a session is currently running.
    pub fn is_busy(&self) -> bool {
        self.active.lock().expect("active slot poisoned").is_some()
    }
}

/// Consume one session to its terminal status.
///
/// Cancellation is checked against every await, so a stalled stream cannot
/// keep the session alive past a cancel. Dropping the stream on exit aborts
/// the underlying transfer.
async fn run_session(
    source: Arc<dyn TextSource>,
    prompt: &str,
    id: SessionId,
    cancel: &CancellationToken,
    events: &mpsc::UnboundedSender<SessionEvent>,
) -> SessionStatus {
    let mut stream = tokio::select! {
        _ = cancel.cancelled() => return SessionStatus::Cancelled,
        opened = source.open(prompt) => match opened {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(session = id.value(), error = %e, "request failed");
                return SessionStatus::Failed(e.to_string());
            }
        },
    };

    let mut decoder = StreamDecoder::new();
    let mut buffer = String::new();

    loop {
        let item = tokio::select! {
            _ = cancel.cancelled() => return SessionStatus::Cancelled,
            item = stream.next() => item,
        };

        match item {
            Some(Ok(chunk)) => {
                tracing::trace!(session = id.value(), bytes = chunk.len(), "chunk received");
                buffer.push_str(&decoder.decode(&chunk));
                let _ = events.send(SessionEvent::Buffer { id, text: buffer.clone() });
            }
            Some(Err(e)) => {
                tracing::warn!(session = id.value(), error = %e, "stream failed");
                return SessionStatus::Failed(e.to_string());
            }
            None => {
                let tail = decoder.finish();
                if !tail.is_empty() {
                    buffer.push_str(&tail);
                    let _ = events.send(SessionEvent::Buffer { id, text: buffer.clone() });
                }
                return SessionStatus::Completed;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{ScriptedOutcome, ScriptedSource};
    use bytes::Bytes;

    fn controller(
        outcomes: Vec<ScriptedOutcome>,
    ) -> (StreamController, mpsc::UnboundedReceiver<SessionEvent>) {
        StreamController::new(Arc::new(ScriptedSource::new(outcomes)))
    }

    /// Drain events for one session up to and including its Closed event.
    async fn collect_session(
        rx: &mut mpsc::UnboundedReceiver<SessionEvent>,
    ) -> (Vec<String>, SessionStatus) {
        let mut buffers = Vec::new();
        loop {
            match rx.recv().await.expect("event channel closed early") {
                SessionEvent::Opened { .. } => {}
                SessionEvent::Buffer { text, .. } => buffers.push(text),
                SessionEvent::Closed { status, .. } => return (buffers, status),
            }
        }
    }

    #[tokio::test]
    async fn test_chunks_accumulate_to_completion() {
        let (controller, mut rx) = controller(vec![ScriptedOutcome::text(&["He", "llo!"])]);
        controller.begin("greet me").unwrap();

        let (buffers, status) = collect_session(&mut rx).await;
        assert_eq!(buffers, vec!["He".to_string(), "Hello!".to_string()]);
        assert_eq!(status, SessionStatus::Completed);
        assert!(!controller.is_busy());
    }

    #[tokio::test]
    async fn test_empty_prompt_rejected() {
        let (controller, _rx) = controller(vec![ScriptedOutcome::text(&["x"])]);
        assert!(matches!(controller.begin(""), Err(Error::Validation(_))));
        assert!(matches!(controller.begin("   \n\t"), Err(Error::Validation(_))));
        assert!(!controller.is_busy());
    }

    #[tokio::test]
    async fn test_overlong_prompt_rejected() {
        let (controller, _rx) = controller(vec![ScriptedOutcome::text(&["x"])]);
        let prompt = "a".repeat(MAX_PROMPT_CHARS + 1);
        assert!(matches!(controller.begin(&prompt), Err(Error::Validation(_))));

        let at_limit = "a".repeat(MAX_PROMPT_CHARS);
        assert!(controller.begin(&at_limit).is_ok());
    }

    #[tokio::test]
    async fn test_second_begin_while_active_is_busy() {
        let (controller, mut rx) =
            controller(vec![ScriptedOutcome::ChunksThenStall(vec![]), ScriptedOutcome::text(&["ok"])]);

        let handle = controller.begin("first").unwrap();
        assert!(matches!(controller.begin("second"), Err(Error::Busy)));

        controller.cancel(&handle);
        let (_, status) = collect_session(&mut rx).await;
        assert_eq!(status, SessionStatus::Cancelled);

        // Slot released, a new session can start.
        controller.begin("third").unwrap();
        let (_, status) = collect_session(&mut rx).await;
        assert_eq!(status, SessionStatus::Completed);
    }

    #[tokio::test]
    async fn test_cancel_before_any_chunk() {
        let (controller, mut rx) = controller(vec![ScriptedOutcome::ChunksThenStall(vec![])]);
        let handle = controller.begin("hi").unwrap();
        controller.cancel(&handle);

        let (buffers, status) = collect_session(&mut rx).await;
        assert!(buffers.is_empty());
        assert_eq!(status, SessionStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_preserves_received_text() {
        let (controller, mut rx) = controller(vec![ScriptedOutcome::ChunksThenStall(vec![
            Bytes::from_static(b"Wait"),
        ])]);
        let handle = controller.begin("hi").unwrap();

        // Wait for the chunk to land before cancelling.
        let mut buffers = Vec::new();
        loop {
            match rx.recv().await.unwrap() {
                SessionEvent::Buffer { text, .. } => {
                    buffers.push(text);
                    break;
                }
                SessionEvent::Opened { .. } => {}
                SessionEvent::Closed { .. } => panic!("closed before first chunk"),
            }
        }
        controller.cancel(&handle);

        let (more, status) = collect_session(&mut rx).await;
        buffers.extend(more);
        assert_eq!(buffers, vec!["Wait".to_string()]);
        assert_eq!(status, SessionStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_error_status_fails_session() {
        let (controller, mut rx) = controller(vec![ScriptedOutcome::Status(500)]);
        controller.begin("hi").unwrap();

        let (buffers, status) = collect_session(&mut rx).await;
        assert!(buffers.is_empty());
        match status {
            SessionStatus::Failed(message) => assert!(message.contains("500")),
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(!controller.is_busy());
    }

    #[tokio::test]
    async fn test_mid_stream_error_keeps_partial_text() {
        let (controller, mut rx) = controller(vec![ScriptedOutcome::ChunksThenError(
            vec![Bytes::from_static(b"partial")],
            "connection reset".into(),
        )]);
        controller.begin("hi").unwrap();

        let (buffers, status) = collect_session(&mut rx).await;
        assert_eq!(buffers, vec!["partial".to_string()]);
        assert!(matches!(status, SessionStatus::Failed(_)));
    }

    #[tokio::test]
    async fn test_multibyte_char_split_across_chunks() {
        // "🦀" split into two 2-byte chunks.
        let (controller, mut rx) = controller(vec![ScriptedOutcome::Chunks(vec![
            Bytes::from_static(&[0xF0, 0x9F]),
            Bytes::from_static(&[0xA6, 0x80]),
        ])]);
        controller.begin("hi").unwrap();

        let (buffers, status) = collect_session(&mut rx).await;
        assert_eq!(status, SessionStatus::Completed);
        assert_eq!(buffers.last().map(String::as_str), Some("🦀"));
    }

    #[tokio::test]
    async fn test_stale_handle_cancel_is_noop() {
        let (controller, mut rx) = controller(vec![
            ScriptedOutcome::text(&["done"]),
            ScriptedOutcome::ChunksThenStall(vec![]),
        ]);

        let stale = controller.begin("first").unwrap();
        let (_, status) = collect_session(&mut rx).await;
        assert_eq!(status, SessionStatus::Completed);

        let live = controller.begin("second").unwrap();
        // Cancelling the finished session must not touch the live one.
        controller.cancel(&stale);
        assert!(controller.is_busy());

        controller.cancel(&live);
        let (_, status) = collect_session(&mut rx).await;
        assert_eq!(status, SessionStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_session_ids_are_distinct() {
        let (controller, mut rx) = controller(vec![ScriptedOutcome::text(&["a"])]);
        let first = controller.begin("one").unwrap();
        collect_session(&mut rx).await;
        let second = controller.begin("two").unwrap();
        collect_session(&mut rx).await;
        assert_ne!(first.id(), second.id());
    }
}
