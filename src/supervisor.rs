use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::bot;
use crate::error::{FatalError, PollingError};
use crate::platform::{IncomingMessage, Transport, TransportEvent};

/// Backoff parameters for reconnecting the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    /// Ceiling for the doubled delay
    pub max_delay: Duration,
    /// Consecutive failed reconnects tolerated before giving up
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(60_000),
            max_retries: 5,
        }
    }
}

/// Position within the current failure streak
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    attempt: u32,
    delay: Duration,
}

impl RetryState {
    pub fn new(policy: &RetryPolicy) -> Self {
        Self {
            attempt: 0,
            delay: policy.initial_delay,
        }
    }

    /// Retries made since the last successful reconnect
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Wait before the next retry
    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn exhausted(&self, policy: &RetryPolicy) -> bool {
        self.attempt >= policy.max_retries
    }

    /// Record a retry: returns the delay to wait, then doubles it up to the ceiling.
    pub fn advance(&mut self, policy: &RetryPolicy) -> Duration {
        let wait = self.delay;
        self.delay = self.delay.saturating_mul(2).min(policy.max_delay);
        self.attempt += 1;
        wait
    }

    pub fn reset(&mut self, policy: &RetryPolicy) {
        *self = Self::new(policy);
    }
}

/// Outcome of one transient polling error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recovery {
    /// Attempt number of this retry, starting at 1
    pub attempt: u32,
    /// How long the supervisor waited before restarting
    pub delay: Duration,
    /// Whether polling came back
    pub resumed: bool,
}

/// Keeps the transport polling and routes what it delivers.
///
/// Events are handled one at a time. Transient polling errors trigger a
/// stop, wait, restart cycle with exponential backoff. Invalid credentials or
/// an exhausted retry budget end [`Supervisor::run`] with a [`FatalError`].
pub struct Supervisor<T: Transport> {
    transport: Arc<T>,
    events: mpsc::UnboundedReceiver<TransportEvent>,
    policy: RetryPolicy,
    retry: RetryState,
}

impl<T: Transport> Supervisor<T> {
    pub fn new(
        transport: Arc<T>,
        events: mpsc::UnboundedReceiver<TransportEvent>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            events,
            retry: RetryState::new(&policy),
            policy,
        }
    }

    #[allow(dead_code)]
    pub fn retry_state(&self) -> &RetryState {
        &self.retry
    }

    /// Start polling and process events until `shutdown` resolves (`Ok`) or a
    /// fatal condition is reached (`Err`).
    pub async fn run<F>(mut self, shutdown: F) -> Result<(), FatalError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        info!("Bot is starting...");
        match self.transport.start_polling().await {
            Ok(()) => info!("Bot is running and waiting for messages..."),
            Err(e) => warn!("Initial polling start failed: {}", e),
        }

        loop {
            let event = tokio::select! {
                _ = &mut shutdown => break,
                event = self.events.recv() => event,
            };
            let Some(event) = event else {
                error!("Transport event stream closed");
                return Err(FatalError::EventStreamClosed);
            };

            tokio::select! {
                _ = &mut shutdown => break,
                result = self.handle_event(event) => result?,
            }
        }

        info!("Stopping bot...");
        self.transport.stop_polling().await;
        Ok(())
    }

    async fn handle_event(&mut self, event: TransportEvent) -> Result<(), FatalError> {
        match event {
            TransportEvent::Message(msg) => {
                self.on_message(msg).await;
                Ok(())
            }
            TransportEvent::PollingError(err) => self.on_polling_error(err).await.map(|_| ()),
        }
    }

    /// Route one message. Failures (errors or panics) are logged and answered
    /// with the generic notice; they never reach the event loop.
    pub async fn on_message(&self, msg: IncomingMessage) {
        let handled = AssertUnwindSafe(bot::handle_message(self.transport.as_ref(), &msg))
            .catch_unwind()
            .await;

        let err = match handled {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e,
            Err(_) => anyhow::anyhow!("message handler panicked"),
        };
        error!("Error handling message in chat {}: {:#}", msg.chat_id, err);

        let reply = bot::failure_reply();
        if let Err(e) = self
            .transport
            .send_message(msg.chat_id, &reply.text, reply.options)
            .await
        {
            error!("Failed to send failure notice to chat {}: {:#}", msg.chat_id, e);
        }
    }

    /// React to a polling error: give up on fatal errors or an exhausted
    /// budget, otherwise stop, back off and restart the transport.
    ///
    /// A failed restart leaves the supervisor waiting for the transport's next
    /// polling error.
    pub async fn on_polling_error(&mut self, err: PollingError) -> Result<Recovery, FatalError> {
        error!("Polling error: {}", err);

        if err.is_fatal() {
            error!("Invalid bot token detected. Please check BOT_TOKEN");
            return Err(FatalError::InvalidToken(err));
        }

        if self.retry.exhausted(&self.policy) {
            error!(
                "Maximum retry attempts ({}) reached. Please check your internet connection and bot token",
                self.policy.max_retries
            );
            return Err(FatalError::RetriesExhausted {
                attempts: self.retry.attempt(),
                last: err,
            });
        }

        warn!(
            attempt = self.retry.attempt() + 1,
            max_retries = self.policy.max_retries,
            delay_ms = self.retry.delay().as_millis() as u64,
            "Retrying connection"
        );

        self.transport.stop_polling().await;
        tokio::time::sleep(self.retry.delay()).await;
        let delay = self.retry.advance(&self.policy);
        let attempt = self.retry.attempt();

        match self.transport.start_polling().await {
            Ok(()) => {
                info!("Polling resumed successfully");
                self.retry.reset(&self.policy);
                Ok(Recovery {
                    attempt,
                    delay,
                    resumed: true,
                })
            }
            Err(e) => {
                error!("Failed to restart polling: {}", e);
                Ok(Recovery {
                    attempt,
                    delay,
                    resumed: false,
                })
            }
        }
    }
}
