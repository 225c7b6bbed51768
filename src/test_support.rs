//! Recording transport used by the router and supervisor tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use crate::error::PollingError;
use crate::platform::{IncomingMessage, SendOptions, Transport, TransportEvent};

/// One recorded call to `send_message`.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub chat_id: i64,
    pub text: String,
    pub options: SendOptions,
}

/// Mock transport that records sends and replays scripted `start_polling` results.
/// A scripted failure is also reported on the event stream, as the real transport does.
pub struct MockTransport {
    events: mpsc::UnboundedSender<TransportEvent>,
    sent: Mutex<Vec<SentMessage>>,
    start_results: Mutex<VecDeque<Result<(), PollingError>>>,
    failing_sends: AtomicUsize,
    starts: AtomicUsize,
    stops: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let transport = Self {
            events,
            sent: Mutex::new(Vec::new()),
            start_results: Mutex::new(VecDeque::new()),
            failing_sends: AtomicUsize::new(0),
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
        };
        (transport, rx)
    }

    /// Queue the result of the next `start_polling` call. Unscripted calls succeed.
    pub async fn script_start(&self, result: Result<(), PollingError>) {
        self.start_results.lock().await.push_back(result);
    }

    /// Make the next `count` sends fail.
    pub fn fail_next_sends(&self, count: usize) {
        self.failing_sends.store(count, Ordering::SeqCst);
    }

    pub fn deliver(&self, chat_id: i64, text: &str) {
        let _ = self.events.send(TransportEvent::Message(IncomingMessage {
            chat_id,
            text: text.to_string(),
        }));
    }

    pub fn polling_error(&self, err: PollingError) {
        let _ = self.events.send(TransportEvent::PollingError(err));
    }

    pub async fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn start_polling(&self) -> Result<(), PollingError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        let result = self.start_results.lock().await.pop_front().unwrap_or(Ok(()));
        if let Err(err) = &result {
            self.polling_error(err.clone());
        }
        result
    }

    async fn stop_polling(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }

    async fn send_message(&self, chat_id: i64, text: &str, options: SendOptions) -> Result<()> {
        let failing = self
            .failing_sends
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            bail!("send to chat {} failed", chat_id);
        }
        self.sent.lock().await.push(SentMessage {
            chat_id,
            text: text.to_string(),
            options,
        });
        Ok(())
    }
}
