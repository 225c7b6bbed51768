use anyhow::Result;
use tracing::{debug, info};

use crate::phone::{format_phone_number, generate_links, is_valid_phone_number, LinkSet};
use crate::platform::{IncomingMessage, SendOptions, Transport};

const WELCOME_TEXT: &str = "👋 *Welcome to Phone Links Bot!*\n\n\
     Send me a phone number (with or without country code), and I'll provide you with useful links.\n\n\
     For example, you can send:\n\
     - `1234567890` (I'll assume it's an Indian number)\n\
     - `919876543210` (with country code)\n\n\
     I'll give you links for WhatsApp, Truecaller, SMS, and direct calling.";

const INVALID_NUMBER_TEXT: &str =
    "⚠️ That doesn't look like a valid phone number. Please send a number with 9-15 digits.";

const FAILURE_TEXT: &str =
    "❌ Sorry, an error occurred while processing your request. Please try again later.";

/// What to do with one incoming message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `/start`
    Welcome,
    /// Any other command
    Ignore,
    /// Text that is not a usable phone number
    Invalid,
    Links { number: String, links: LinkSet },
}

/// An outgoing message and how to render it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub options: SendOptions,
}

impl Reply {
    fn markdown(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            options: SendOptions {
                markdown: true,
                disable_link_preview: false,
            },
        }
    }
}

/// Decide how to answer `text`. The formatter only runs for plausible numbers.
pub fn classify(text: &str) -> Route {
    if text.starts_with("/start") {
        return Route::Welcome;
    }
    if text.starts_with('/') {
        return Route::Ignore;
    }
    if !is_valid_phone_number(text) {
        return Route::Invalid;
    }

    let number = format_phone_number(text);
    let links = generate_links(&number);
    Route::Links { number, links }
}

impl Route {
    pub fn reply(&self) -> Option<Reply> {
        match self {
            Route::Welcome => Some(Reply::markdown(WELCOME_TEXT)),
            Route::Ignore => None,
            Route::Invalid => Some(Reply::markdown(INVALID_NUMBER_TEXT)),
            Route::Links { number, links } => {
                let text = format!(
                    "✅ *Phone Links for {}*\n\n\
                     🟢 [WhatsApp Chat]({})\n\
                     🔍 [Truecaller Lookup]({})\n\
                     💬 [Send SMS]({})\n\
                     📞 [Make Call]({})",
                    number, links.chat, links.lookup, links.sms, links.call
                );
                let mut reply = Reply::markdown(text);
                reply.options.disable_link_preview = true;
                Some(reply)
            }
        }
    }
}

/// Generic notice sent when handling a message failed.
pub fn failure_reply() -> Reply {
    Reply::markdown(FAILURE_TEXT)
}

/// Route one message and send at most one reply to its chat.
pub async fn handle_message<T: Transport + ?Sized>(
    transport: &T,
    msg: &IncomingMessage,
) -> Result<()> {
    let route = classify(&msg.text);
    match &route {
        Route::Links { number, .. } => info!("Chat {}: links for {}", msg.chat_id, number),
        Route::Invalid => debug!("Chat {}: rejected input {:?}", msg.chat_id, msg.text),
        Route::Welcome => info!("Chat {}: /start", msg.chat_id),
        Route::Ignore => debug!("Chat {}: ignoring command {:?}", msg.chat_id, msg.text),
    }

    if let Some(reply) = route.reply() {
        transport
            .send_message(msg.chat_id, &reply.text, reply.options)
            .await?;
    }
    Ok(())
}
