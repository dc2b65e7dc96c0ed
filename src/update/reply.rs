//! Response bodies and the reply builders derived from an update.
//!
//! A handler answers with a [`ResponseBody`]: the remote method name plus
//! its parameters, serialized in insertion order. Builders on [`Update`]
//! pre-populate the chat/message identifiers of the current update and then
//! merge caller-supplied overrides - the override always wins on collision.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::update::Update;

/// Marker key understood by [`Update::send_message`] and
/// [`Update::send_media_group`]: when present in the overrides, the body
/// gains `reply_to_message_id`. The marker itself is consumed, not sent.
const REPLY_MARKER: &str = "reply";

/// An ordered method-call body for the platform API.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResponseBody {
    fields: Map<String, Value>,
}

impl ResponseBody {
    /// An empty body.
    pub fn new() -> Self {
        Self::default()
    }

    /// A body opening with the given remote method name.
    pub fn method(name: &str) -> Self {
        Self::new().with("method", name)
    }

    /// Insert a field, consuming and returning the body.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a field; an existing field under the same key is replaced.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Merge `overrides` into the body; overrides win on key collision.
    pub fn merge(&mut self, overrides: ResponseBody) {
        for (key, value) in overrides.fields {
            self.fields.insert(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    /// The remote method this body names, if any.
    pub fn method_name(&self) -> Option<&str> {
        self.fields.get("method").and_then(Value::as_str)
    }

    /// Remove and return the method name, leaving only the parameters.
    pub fn take_method(&mut self) -> Option<String> {
        match self.fields.remove("method") {
            Some(Value::String(name)) => Some(name),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

impl From<Map<String, Value>> for ResponseBody {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

impl From<ResponseBody> for Value {
    fn from(body: ResponseBody) -> Self {
        body.into_value()
    }
}

impl Update {
    /// Answer the update in place.
    ///
    /// A callback-query origin edits the existing message
    /// (`editMessageText`); anything else sends a new message replying to
    /// the originating one.
    pub fn reply(&self, text: &str, overrides: ResponseBody) -> ResponseBody {
        let mut body = if self.get("callback_query").exists() {
            ResponseBody::method("editMessageText").with("message_id", self.message_id())
        } else {
            ResponseBody::method("sendMessage").with("reply_to_message_id", self.message_id())
        };
        body.insert("chat_id", self.chat_id());
        body.insert("text", text);
        body.merge(overrides);
        body
    }

    /// A `sendMessage` body addressed to the originating chat.
    ///
    /// A `reply` marker in the overrides requests `reply_to_message_id`.
    pub fn send_message(&self, text: &str, mut overrides: ResponseBody) -> ResponseBody {
        let mut body = ResponseBody::method("sendMessage")
            .with("chat_id", self.chat_id())
            .with("text", text);
        if overrides.remove(REPLY_MARKER).is_some() {
            body.insert("reply_to_message_id", self.message_id());
        }
        body.merge(overrides);
        body
    }

    /// An `editMessageText` body against the originating message.
    pub fn edit_message_text(&self, text: &str, overrides: ResponseBody) -> ResponseBody {
        let mut body = ResponseBody::method("editMessageText")
            .with("chat_id", self.chat_id())
            .with("message_id", self.message_id())
            .with("text", text);
        body.merge(overrides);
        body
    }

    /// An `editMessageReplyMarkup` body against the originating message.
    pub fn edit_message_reply_markup(&self, overrides: ResponseBody) -> ResponseBody {
        let mut body = ResponseBody::method("editMessageReplyMarkup")
            .with("chat_id", self.chat_id())
            .with("message_id", self.message_id());
        body.merge(overrides);
        body
    }

    /// An `answerCallbackQuery` body for the update's callback query.
    ///
    /// Defaults to an alert; override `show_alert` to tone it down.
    pub fn answer_callback_query(&self, text: &str, overrides: ResponseBody) -> ResponseBody {
        let mut body = ResponseBody::method("answerCallbackQuery")
            .with("callback_query_id", self.get("callback_query.id").as_str())
            .with("show_alert", true)
            .with("text", text);
        body.merge(overrides);
        body
    }

    /// A `deleteMessage` body for the originating message.
    pub fn delete_message(&self) -> ResponseBody {
        ResponseBody::method("deleteMessage")
            .with("chat_id", self.chat_id())
            .with("message_id", self.message_id())
    }

    /// A `sendMediaGroup` body addressed to the originating chat.
    ///
    /// Accepts the same `reply` marker as [`send_message`](Update::send_message).
    pub fn send_media_group(&self, media: Vec<Value>, mut overrides: ResponseBody) -> ResponseBody {
        let mut body = ResponseBody::method("sendMediaGroup")
            .with("chat_id", self.chat_id())
            .with("media", media);
        if overrides.remove(REPLY_MARKER).is_some() {
            body.insert("reply_to_message_id", self.message_id());
        }
        body.merge(overrides);
        body
    }

    fn chat_id(&self) -> i64 {
        self.chat().map(|chat| chat.get("id").as_i64()).unwrap_or_default()
    }

    fn message_id(&self) -> i64 {
        self.message()
            .map(|message| message.get("message_id").as_i64())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text_update() -> Update {
        Update::from(json!({
            "update_id": 1,
            "message": {"message_id": 42, "chat": {"id": 7}, "text": "hi"}
        }))
    }

    fn callback_update() -> Update {
        Update::from(json!({
            "update_id": 2,
            "callback_query": {
                "id": "cb9",
                "data": "menu:open",
                "message": {"message_id": 43, "chat": {"id": 7}}
            }
        }))
    }

    #[test]
    fn test_reply_to_message_sends_new_message() {
        let body = text_update().reply("pong", ResponseBody::new());

        assert_eq!(body.method_name(), Some("sendMessage"));
        assert_eq!(body.get("chat_id"), Some(&json!(7)));
        assert_eq!(body.get("reply_to_message_id"), Some(&json!(42)));
        assert_eq!(body.get("text"), Some(&json!("pong")));
    }

    #[test]
    fn test_reply_to_callback_edits_in_place() {
        let body = callback_update().reply("updated", ResponseBody::new());

        assert_eq!(body.method_name(), Some("editMessageText"));
        assert_eq!(body.get("message_id"), Some(&json!(43)));
        assert!(body.get("reply_to_message_id").is_none());
    }

    #[test]
    fn test_overrides_win_on_collision() {
        let body = text_update().reply(
            "original",
            ResponseBody::new()
                .with("text", "override")
                .with("parse_mode", "HTML"),
        );

        assert_eq!(body.get("text"), Some(&json!("override")));
        assert_eq!(body.get("parse_mode"), Some(&json!("HTML")));
    }

    #[test]
    fn test_send_message_reply_marker() {
        let update = text_update();

        let plain = update.send_message("hi", ResponseBody::new());
        assert!(plain.get("reply_to_message_id").is_none());

        let replied = update.send_message("hi", ResponseBody::new().with(REPLY_MARKER, true));
        assert_eq!(replied.get("reply_to_message_id"), Some(&json!(42)));
        // The marker is consumed, never serialized.
        assert!(replied.get(REPLY_MARKER).is_none());
    }

    #[test]
    fn test_answer_callback_query_defaults() {
        let body = callback_update().answer_callback_query("done", ResponseBody::new());

        assert_eq!(body.method_name(), Some("answerCallbackQuery"));
        assert_eq!(body.get("callback_query_id"), Some(&json!("cb9")));
        assert_eq!(body.get("show_alert"), Some(&json!(true)));

        let quiet = callback_update()
            .answer_callback_query("done", ResponseBody::new().with("show_alert", false));
        assert_eq!(quiet.get("show_alert"), Some(&json!(false)));
    }

    #[test]
    fn test_delete_message_body() {
        let body = text_update().delete_message();

        assert_eq!(body.method_name(), Some("deleteMessage"));
        assert_eq!(body.get("chat_id"), Some(&json!(7)));
        assert_eq!(body.get("message_id"), Some(&json!(42)));
    }

    #[test]
    fn test_serialization_preserves_insertion_order() {
        let body = text_update().delete_message();
        let serialized = serde_json::to_string(&body).unwrap();

        assert_eq!(
            serialized,
            "{\"method\":\"deleteMessage\",\"chat_id\":7,\"message_id\":42}"
        );
    }

    #[test]
    fn test_take_method_leaves_parameters() {
        let mut body = text_update().delete_message();

        assert_eq!(body.take_method().as_deref(), Some("deleteMessage"));
        assert!(body.method_name().is_none());
        assert_eq!(body.get("chat_id"), Some(&json!(7)));
    }
}
