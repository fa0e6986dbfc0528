//! Scripted text source for deterministic tests.
//!
//! Plays back a fixed sequence of outcomes instead of talking to the
//! endpoint: each `open` call consumes the next scripted outcome, cycling
//! when the script runs out.

use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};

use rill_core::{Error, Result};

use crate::source::{ByteStream, TextSource};

/// What a scripted `open` call should produce.
#[derive(Debug, Clone)]
pub enum ScriptedOutcome {
    /// Stream these chunks, then end the body normally.
    Chunks(Vec<Bytes>),
    /// Reject the request with this status before any bytes flow.
    Status(u16),
    /// Fail the connection before any bytes flow.
    ConnectError(String),
    /// Stream these chunks, then fail mid-body.
    ChunksThenError(Vec<Bytes>, String),
    /// Stream these chunks, then hang forever. Only cancellation ends the
    /// session.
    ChunksThenStall(Vec<Bytes>),
}

impl ScriptedOutcome {
    /// Convenience constructor from string chunks.
    pub fn text(chunks: &[&str]) -> Self {
        ScriptedOutcome::Chunks(chunks.iter().map(|c| Bytes::copy_from_slice(c.as_bytes())).collect())
    }
}

/// Replays scripted outcomes in order, cycling when exhausted.
pub struct ScriptedSource {
    outcomes: Vec<ScriptedOutcome>,
    cursor: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(outcomes: Vec<ScriptedOutcome>) -> Self {
        Self { outcomes, cursor: AtomicUsize::new(0) }
    }

    /// A source whose every call streams the given chunks and completes.
    pub fn streaming(chunks: &[&str]) -> Self {
        Self::new(vec![ScriptedOutcome::text(chunks)])
    }

    /// How many `open` calls have been made.
    pub fn calls(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }

    fn next_outcome(&self) -> ScriptedOutcome {
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        self.outcomes[index % self.outcomes.len()].clone()
    }
}

#[async_trait::async_trait]
impl TextSource for ScriptedSource {
    async fn open(&self, _prompt: &str) -> Result<ByteStream> {
        match self.next_outcome() {
            ScriptedOutcome::Chunks(chunks) => {
                let stream = async_stream::stream! {
                    for chunk in chunks {
                        yield Ok(chunk);
                    }
                };
                Ok(Box::pin(stream))
            }
            ScriptedOutcome::Status(code) => Err(Error::Status(code)),
            ScriptedOutcome::ConnectError(message) => Err(Error::Transport(message)),
            ScriptedOutcome::ChunksThenError(chunks, message) => {
                let stream = async_stream::stream! {
                    for chunk in chunks {
                        yield Ok(chunk);
                    }
                    yield Err(Error::Transport(message));
                };
                Ok(Box::pin(stream))
            }
            ScriptedOutcome::ChunksThenStall(chunks) => {
                let stream = async_stream::stream! {
                    for chunk in chunks {
                        yield Ok(chunk);
                    }
                    futures::future::pending::<()>().await;
                };
                Ok(Box::pin(stream))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_scripted_source_streams_chunks() {
        let source = ScriptedSource::streaming(&["He", "llo!"]);
        let mut stream = source.open("hi").await.unwrap();

        let mut collected = String::new();
        while let Some(item) = stream.next().await {
            collected.push_str(std::str::from_utf8(&item.unwrap()).unwrap());
        }
        assert_eq!(collected, "Hello!");
    }

    #[tokio::test]
    async fn test_scripted_source_cycles_outcomes() {
        let source = ScriptedSource::new(vec![
            ScriptedOutcome::text(&["first"]),
            ScriptedOutcome::Status(500),
        ]);

        assert_ok!(source.open("a").await);
        assert!(matches!(source.open("b").await, Err(Error::Status(500))));
        // Wraps back to the first outcome.
        assert_ok!(source.open("c").await);
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn test_mid_stream_error_surfaces_after_chunks() {
        let source = ScriptedSource::new(vec![ScriptedOutcome::ChunksThenError(
            vec![Bytes::from_static(b"partial")],
            "connection reset".into(),
        )]);

        let mut stream = source.open("hi").await.unwrap();
        assert!(stream.next().await.unwrap().is_ok());
        assert!(matches!(stream.next().await, Some(Err(Error::Transport(_)))));
    }
}
