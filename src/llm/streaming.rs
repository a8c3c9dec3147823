//! Streaming response handling
//!
//! A producer task drives [`GenerationClient::generate_stream`] and feeds a
//! bounded channel; the single consumer reads [`TokenEvent`]s until `End` or
//! `Failed`.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use super::GenerationClient;
use super::GenerationRequest;
use crate::errors::NexqaError;
use crate::errors::Result;

/// Message on the token channel
#[derive(Debug)]
pub enum TokenEvent {
    /// One generated text fragment
    Token(String),
    /// Generation completed normally
    End,
    /// Generation failed; no further events follow
    Failed(NexqaError),
}

/// Consumer side of a streamed generation
pub struct TokenReceiver {
    rx: mpsc::Receiver<TokenEvent>,
    finished: bool,
}

impl TokenReceiver {
    pub fn new(rx: mpsc::Receiver<TokenEvent>) -> Self {
        Self {
            rx,
            finished: false,
        }
    }

    /// Next event; `None` once a terminal event has been returned.
    ///
    /// A producer that disappears without a terminal event is reported as `Failed`.
    pub async fn next(&mut self) -> Option<TokenEvent> {
        if self.finished {
            return None;
        }
        let event = self.rx.recv().await.unwrap_or_else(|| {
            TokenEvent::Failed(NexqaError::generation(
                "token producer stopped without signalling completion",
            ))
        });
        if matches!(event, TokenEvent::End | TokenEvent::Failed(_)) {
            self.finished = true;
        }
        Some(event)
    }

    /// Collect all fragments into a single string
    pub async fn collect_all(mut self) -> Result<String> {
        let mut result = String::new();
        while let Some(event) = self.next().await {
            match event {
                TokenEvent::Token(token) => result.push_str(&token),
                TokenEvent::End => break,
                TokenEvent::Failed(err) => return Err(err),
            }
        }
        Ok(result)
    }
}

/// Start streamed generation on a background task.
///
/// Dropping the returned receiver closes the channel, which stops the backend
/// at its next send.
pub fn spawn_token_producer(
    client: Arc<dyn GenerationClient>,
    request: GenerationRequest,
    capacity: usize,
) -> TokenReceiver {
    let capacity = capacity.max(1);
    let (tx, rx) = mpsc::channel(capacity);

    tokio::spawn(async move {
        let (token_tx, mut token_rx) = mpsc::channel::<String>(capacity);
        let forward_tx = tx.clone();
        let forward = async move {
            while let Some(token) = token_rx.recv().await {
                if forward_tx.send(TokenEvent::Token(token)).await.is_err() {
                    debug!("Token consumer went away, stopping forwarder");
                    break;
                }
            }
        };

        let (result, ()) = tokio::join!(client.generate_stream(&request, token_tx), forward);
        let terminal = match result {
            Ok(()) => TokenEvent::End,
            Err(err) => TokenEvent::Failed(err),
        };
        // Receiver may already be gone
        let _ = tx.send(terminal).await;
    });

    TokenReceiver::new(rx)
}
