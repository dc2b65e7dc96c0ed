//! The inbound event envelope and its domain accessors.
//!
//! An [`Update`] owns one parsed event payload and answers everything about
//! it lazily: which message it carries, who sent it, what kind of event it
//! is, and whether it starts with a bot command. Accessors never fail -
//! missing structure degrades to absent views or `None`.

pub mod command;
pub mod kind;
pub mod reply;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::Error;
use crate::json::JsonView;

pub use command::Command;
pub use kind::EventKind;
pub use reply::ResponseBody;

/// Envelope keys that hold a message object directly, in resolution order.
const MESSAGE_NODES: [&str; 4] = [
    "message",
    "edited_message",
    "channel_post",
    "edited_channel_post",
];

/// Envelope keys that hold a query sub-shape, in scan order.
const QUERY_NODES: [&str; 5] = [
    "callback_query",
    "inline_query",
    "shipping_query",
    "pre_checkout_query",
    "chosen_inline_result",
];

/// One inbound event envelope from the messaging platform.
///
/// Constructed once per payload, consumed synchronously by the dispatcher
/// and handler, then discarded. Exactly zero or one of the envelope
/// sub-shapes (`message`, `edited_message`, ..., `callback_query`, ...) is
/// present per update.
#[derive(Debug, Clone)]
pub struct Update {
    raw: Value,
}

impl Update {
    /// Parse an update from raw JSON text.
    pub fn parse(data: &str) -> Result<Self, Error> {
        Ok(Self {
            raw: serde_json::from_str(data)?,
        })
    }

    /// Lazy view over the whole envelope.
    pub fn view(&self) -> JsonView<'_> {
        JsonView::new(&self.raw)
    }

    /// Resolve a dotted/bracketed path against the envelope.
    pub fn get(&self, path: &str) -> JsonView<'_> {
        self.view().get(path)
    }

    /// The monotonically increasing update id, or `0` when absent.
    pub fn update_id(&self) -> i64 {
        self.get("update_id").as_i64()
    }

    /// Locate the embedded message object.
    ///
    /// Checks `message`, `edited_message`, `channel_post`,
    /// `edited_channel_post`, then the nested `message` of a
    /// `callback_query`. First match wins. Every downstream accessor
    /// (chat, sender, entities, command) goes through this resolution.
    pub fn message(&self) -> Option<JsonView<'_>> {
        let view = self.view();
        for node in MESSAGE_NODES {
            let message = view.get(node);
            if message.exists() {
                return Some(message);
            }
        }
        let nested = view.get("callback_query.message");
        nested.exists().then_some(nested)
    }

    /// The chat the update originated in.
    pub fn chat(&self) -> Option<JsonView<'_>> {
        let chat = self.message()?.get("chat");
        chat.exists().then_some(chat)
    }

    /// The user the update originated from.
    ///
    /// Query sub-shapes carry their own `from` and take precedence over the
    /// resolved message's sender.
    pub fn sender(&self) -> Option<JsonView<'_>> {
        let view = self.view();
        for node in QUERY_NODES {
            if view.get(node).exists() {
                let from = view.get(node).get("from");
                return from.exists().then_some(from);
            }
        }
        let from = self.message()?.get("from");
        from.exists().then_some(from)
    }

    /// Text of the resolved message, or `""`.
    pub fn text(&self) -> &str {
        match self.message() {
            Some(message) => message.get("text").as_str(),
            None => "",
        }
    }

    /// Entity records of the resolved message: `entities`, else
    /// `caption_entities`, else empty.
    pub fn entities(&self) -> Vec<JsonView<'_>> {
        let Some(message) = self.message() else {
            return Vec::new();
        };
        let entities = message.get("entities");
        if entities.exists() {
            return entities.array();
        }
        let caption_entities = message.get("caption_entities");
        if caption_entities.exists() {
            return caption_entities.array();
        }
        Vec::new()
    }

    /// Send time of the resolved message.
    pub fn date(&self) -> Option<DateTime<Utc>> {
        let date = self.message()?.get("date");
        if !date.exists() {
            return None;
        }
        DateTime::from_timestamp(date.as_i64(), 0)
    }

    /// Classify the update into its event kind.
    pub fn kind(&self) -> EventKind {
        EventKind::classify(self.message())
    }

    /// The bot command opening the message, if any.
    ///
    /// Only a `bot_command` entity at offset 0 counts; extraction is
    /// best-effort and yields `None` on any irregularity.
    pub fn command(&self) -> Option<Command> {
        command::extract(self)
    }

    /// Consume the update, returning the owned payload.
    pub fn into_value(self) -> Value {
        self.raw
    }
}

impl From<Value> for Update {
    fn from(raw: Value) -> Self {
        Self { raw }
    }
}
