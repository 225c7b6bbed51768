pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;

use crate::error::PollingError;

/// A message received from the chat platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    /// Chat the reply goes back to
    pub chat_id: i64,
    /// The message text, empty for non-text messages
    pub text: String,
}

/// Everything a transport reports back to the supervisor
#[derive(Debug, Clone)]
pub enum TransportEvent {
    Message(IncomingMessage),
    PollingError(PollingError),
}

/// Rendering options for an outgoing message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Render with Telegram's legacy Markdown parse mode
    pub markdown: bool,
    pub disable_link_preview: bool,
}

/// A long-polling message source that can also send replies.
///
/// Delivered messages and polling failures arrive on the event channel that is
/// handed out together with the transport. Every polling failure, including a
/// failed `start_polling`, is reported there.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Begin (or resume) polling for updates.
    async fn start_polling(&self) -> Result<(), PollingError>;

    /// Stop polling. Calling this while already stopped is a no-op.
    async fn stop_polling(&self);

    async fn send_message(&self, chat_id: i64, text: &str, options: SendOptions) -> Result<()>;
}
