use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::payloads::{GetUpdatesSetters, SendMessageSetters};
use teloxide::prelude::*;
use teloxide::types::{AllowedUpdate, LinkPreviewOptions, ParseMode, Update, UpdateKind};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::PollingConfig;
use crate::error::PollingError;
use crate::platform::{IncomingMessage, SendOptions, Transport, TransportEvent};

/// Long-polling Telegram transport built on the teloxide Bot client
pub struct TelegramTransport {
    bot: Bot,
    poll_timeout_secs: u32,
    /// Next `getUpdates` offset, kept across restarts so nothing is redelivered
    offset: Arc<AtomicI32>,
    events: mpsc::UnboundedSender<TransportEvent>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl TelegramTransport {
    /// Create the transport and the event stream it reports on.
    pub fn new(
        token: &str,
        config: &PollingConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<TransportEvent>)> {
        let client = teloxide::net::default_reqwest_settings()
            .timeout(config.request_timeout())
            .build()
            .context("Failed to build Telegram HTTP client")?;
        let bot = Bot::with_client(token, client);

        let (events, rx) = mpsc::unbounded_channel();
        let transport = Self {
            bot,
            poll_timeout_secs: config.poll_timeout_secs,
            offset: Arc::new(AtomicI32::new(0)),
            events,
            poller: Mutex::new(None),
        };
        Ok((transport, rx))
    }
}

/// Forward a polling error to the supervisor. Returns false once the stream is closed.
fn report(events: &mpsc::UnboundedSender<TransportEvent>, err: PollingError) -> bool {
    if events.send(TransportEvent::PollingError(err)).is_err() {
        debug!("Polling error dropped, event stream closed");
        return false;
    }
    true
}

/// Telegram's legacy Markdown, matching the message templates (no V2 escaping).
#[allow(deprecated)]
fn legacy_markdown() -> ParseMode {
    ParseMode::Markdown
}

/// Next `getUpdates` offset after `update`, and the message it carries if any.
/// Messages without text are delivered with empty text.
fn incoming(update: Update) -> (i32, Option<IncomingMessage>) {
    let next_offset = i32::try_from(update.id.0).map_or(i32::MAX, |id| id.saturating_add(1));
    let msg = match update.kind {
        UpdateKind::Message(msg) => Some(IncomingMessage {
            chat_id: msg.chat.id.0,
            text: msg.text().unwrap_or_default().to_string(),
        }),
        _ => None,
    };
    (next_offset, msg)
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn start_polling(&self) -> Result<(), PollingError> {
        let mut poller = self.poller.lock().await;
        if poller.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Ok(());
        }

        // Probe first so a bad token or a dead network surfaces here
        let me = match self.bot.get_me().await {
            Ok(me) => me,
            Err(e) => {
                let err = PollingError::from(e);
                report(&self.events, err.clone());
                return Err(err);
            }
        };
        info!("Polling Telegram as @{}", me.username());

        *poller = Some(tokio::spawn(poll_updates(
            self.bot.clone(),
            self.poll_timeout_secs,
            Arc::clone(&self.offset),
            self.events.clone(),
        )));
        Ok(())
    }

    async fn stop_polling(&self) {
        if let Some(handle) = self.poller.lock().await.take() {
            handle.abort();
            let _ = handle.await;
            debug!("Polling stopped");
        }
    }

    async fn send_message(&self, chat_id: i64, text: &str, options: SendOptions) -> Result<()> {
        let mut request = self.bot.send_message(ChatId(chat_id), text);
        if options.markdown {
            request = request.parse_mode(legacy_markdown());
        }
        if options.disable_link_preview {
            request = request.link_preview_options(LinkPreviewOptions {
                is_disabled: true,
                url: None,
                prefer_small_media: false,
                prefer_large_media: false,
                show_above_text: false,
            });
        }
        request
            .await
            .with_context(|| format!("Failed to send message to chat {}", chat_id))?;
        Ok(())
    }
}

/// Long-poll `getUpdates` until the first error, which is reported and ends the loop.
/// Restarting is left to whoever owns the transport.
async fn poll_updates(
    bot: Bot,
    timeout_secs: u32,
    offset: Arc<AtomicI32>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    loop {
        let request = bot
            .get_updates()
            .offset(offset.load(Ordering::SeqCst))
            .timeout(timeout_secs)
            .allowed_updates(vec![AllowedUpdate::Message]);

        let updates = match request.await {
            Ok(updates) => updates,
            Err(e) => {
                let err = PollingError::from(e);
                warn!("Polling error: {}", err);
                report(&events, err);
                return;
            }
        };

        for update in updates {
            let (next_offset, msg) = incoming(update);
            offset.store(next_offset, Ordering::SeqCst);

            if let Some(msg) = msg {
                if events.send(TransportEvent::Message(msg)).is_err() {
                    debug!("Message dropped, event stream closed");
                    return;
                }
            }
        }
    }
}
