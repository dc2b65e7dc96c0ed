//! Thin pass-through client for the platform HTTP API.
//!
//! Every remote method is a POST of a JSON body to
//! `<endpoint>/bot<token>/<method>`; the platform answers with an envelope
//! (`ok`/`result` or `error_code`/`description`). Nothing here branches on
//! update content - the interesting logic lives in [`crate::dispatch`].

use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Map, Value};

use crate::error::ApiError;
use crate::update::{ResponseBody, Update};

/// User agent sent with every API request.
const USER_AGENT: &str = "Lazygram/0.1";

/// Default API root.
pub const DEFAULT_ENDPOINT: &str = "https://api.telegram.org";

/// Default per-request timeout; long polls get their own margin on top of
/// the poll timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A chat target: numeric id or public `@username`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatRef {
    Id(i64),
    Username(String),
}

impl From<i64> for ChatRef {
    fn from(id: i64) -> Self {
        ChatRef::Id(id)
    }
}

impl From<&str> for ChatRef {
    fn from(username: &str) -> Self {
        ChatRef::Username(username.to_string())
    }
}

impl From<String> for ChatRef {
    fn from(username: String) -> Self {
        ChatRef::Username(username)
    }
}

impl From<ChatRef> for Value {
    fn from(chat: ChatRef) -> Self {
        match chat {
            ChatRef::Id(id) => json!(id),
            ChatRef::Username(username) => json!(username),
        }
    }
}

/// Client for one bot token.
#[derive(Debug, Clone)]
pub struct Api {
    client: Client,
    endpoint: String,
    token: String,
    timeout: Duration,
}

impl Api {
    pub fn new(token: impl Into<String>, endpoint: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            token: token.into(),
            timeout: REQUEST_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.endpoint, self.token, method)
    }

    /// Call a remote method with the given parameters.
    pub async fn request(&self, method: &str, params: Value) -> Result<Update, ApiError> {
        let response = self
            .client
            .post(self.method_url(method))
            .timeout(self.timeout)
            .json(&params)
            .send()
            .await?;
        let envelope: Value = response.json().await?;
        parse_envelope(envelope)
    }

    /// Execute a handler's response body: the `method` key names the remote
    /// call, the remaining fields are its parameters.
    pub async fn execute(&self, mut body: ResponseBody) -> Result<Update, ApiError> {
        let method = body.take_method().ok_or(ApiError::MissingMethod)?;
        self.request(&method, body.into_value()).await
    }

    /// Long-poll for updates at or after `offset`.
    ///
    /// The HTTP timeout is the server-side poll timeout plus a margin, so a
    /// full poll never races the transport.
    pub async fn get_updates(
        &self,
        offset: i64,
        limit: i64,
        poll_timeout: u64,
    ) -> Result<Vec<Update>, ApiError> {
        let response = self
            .client
            .post(self.method_url("getUpdates"))
            .timeout(Duration::from_secs(poll_timeout + 10))
            .json(&json!({"offset": offset, "limit": limit, "timeout": poll_timeout}))
            .send()
            .await?;
        let envelope: Value = response.json().await?;
        let result = parse_envelope(envelope)?;
        match result.into_value() {
            Value::Array(items) => Ok(items.into_iter().map(Update::from).collect()),
            _ => Ok(Vec::new()),
        }
    }

    pub async fn get_me(&self) -> Result<Update, ApiError> {
        self.request("getMe", json!({})).await
    }

    pub async fn send_message(
        &self,
        chat: impl Into<ChatRef>,
        text: &str,
        extra: ResponseBody,
    ) -> Result<Update, ApiError> {
        let base = json!({"chat_id": Value::from(chat.into()), "text": text});
        self.request("sendMessage", merged(base, extra)).await
    }

    pub async fn edit_message_text(
        &self,
        chat: impl Into<ChatRef>,
        message_id: i64,
        text: &str,
        extra: ResponseBody,
    ) -> Result<Update, ApiError> {
        let base = json!({
            "chat_id": Value::from(chat.into()),
            "message_id": message_id,
            "text": text,
        });
        self.request("editMessageText", merged(base, extra)).await
    }

    pub async fn forward_message(
        &self,
        chat: impl Into<ChatRef>,
        from_chat: impl Into<ChatRef>,
        message_id: i64,
    ) -> Result<Update, ApiError> {
        let params = json!({
            "chat_id": Value::from(chat.into()),
            "from_chat_id": Value::from(from_chat.into()),
            "message_id": message_id,
        });
        self.request("forwardMessage", params).await
    }

    pub async fn send_photo(
        &self,
        chat: impl Into<ChatRef>,
        file_id: &str,
        extra: ResponseBody,
    ) -> Result<Update, ApiError> {
        let base = json!({"chat_id": Value::from(chat.into()), "photo": file_id});
        self.request("sendPhoto", merged(base, extra)).await
    }

    pub async fn send_video(
        &self,
        chat: impl Into<ChatRef>,
        file_id: &str,
        extra: ResponseBody,
    ) -> Result<Update, ApiError> {
        let base = json!({"chat_id": Value::from(chat.into()), "video": file_id});
        self.request("sendVideo", merged(base, extra)).await
    }

    pub async fn send_media_group(
        &self,
        chat: impl Into<ChatRef>,
        media: Vec<Value>,
        extra: ResponseBody,
    ) -> Result<Update, ApiError> {
        let base = json!({"chat_id": Value::from(chat.into()), "media": media});
        self.request("sendMediaGroup", merged(base, extra)).await
    }

    pub async fn answer_callback_query(
        &self,
        query_id: &str,
        text: &str,
        extra: ResponseBody,
    ) -> Result<Update, ApiError> {
        let base = json!({
            "callback_query_id": query_id,
            "text": text,
            "show_alert": true,
        });
        self.request("answerCallbackQuery", merged(base, extra)).await
    }

    pub async fn delete_message(
        &self,
        chat: impl Into<ChatRef>,
        message_id: i64,
    ) -> Result<Update, ApiError> {
        let params = json!({"chat_id": Value::from(chat.into()), "message_id": message_id});
        self.request("deleteMessage", params).await
    }

    pub async fn pin_chat_message(
        &self,
        chat: impl Into<ChatRef>,
        message_id: i64,
        extra: ResponseBody,
    ) -> Result<Update, ApiError> {
        let base = json!({"chat_id": Value::from(chat.into()), "message_id": message_id});
        self.request("pinChatMessage", merged(base, extra)).await
    }

    pub async fn unpin_all_chat_messages(
        &self,
        chat: impl Into<ChatRef>,
    ) -> Result<Update, ApiError> {
        self.request("unpinAllChatMessages", json!({"chat_id": Value::from(chat.into())}))
            .await
    }

    /// Resolve a file id into its download URL.
    pub async fn get_file(&self, file_id: &str) -> Result<String, ApiError> {
        let result = self.request("getFile", json!({"file_id": file_id})).await?;
        Ok(format!(
            "{}/file/bot{}/{}",
            self.endpoint,
            self.token,
            result.get("file_path").as_str()
        ))
    }

    pub async fn get_chat(&self, chat: impl Into<ChatRef>) -> Result<Update, ApiError> {
        self.request("getChat", json!({"chat_id": Value::from(chat.into())}))
            .await
    }

    pub async fn get_chat_member(
        &self,
        chat: impl Into<ChatRef>,
        user_id: i64,
    ) -> Result<Update, ApiError> {
        let params = json!({"chat_id": Value::from(chat.into()), "user_id": user_id});
        self.request("getChatMember", params).await
    }

    pub async fn get_chat_administrators(
        &self,
        chat: impl Into<ChatRef>,
    ) -> Result<Update, ApiError> {
        self.request("getChatAdministrators", json!({"chat_id": Value::from(chat.into())}))
            .await
    }

    pub async fn get_chat_member_count(
        &self,
        chat: impl Into<ChatRef>,
    ) -> Result<Update, ApiError> {
        self.request("getChatMemberCount", json!({"chat_id": Value::from(chat.into())}))
            .await
    }

    pub async fn ban_chat_member(
        &self,
        chat: impl Into<ChatRef>,
        user_id: i64,
        until_date: i64,
    ) -> Result<Update, ApiError> {
        let params = json!({
            "chat_id": Value::from(chat.into()),
            "user_id": user_id,
            "until_date": until_date,
        });
        self.request("banChatMember", params).await
    }

    pub async fn unban_chat_member(
        &self,
        chat: impl Into<ChatRef>,
        user_id: i64,
    ) -> Result<Update, ApiError> {
        let params = json!({"chat_id": Value::from(chat.into()), "user_id": user_id});
        self.request("unbanChatMember", params).await
    }

    pub async fn restrict_chat_member(
        &self,
        chat: impl Into<ChatRef>,
        user_id: i64,
        permissions: Value,
        until_date: i64,
    ) -> Result<Update, ApiError> {
        let params = json!({
            "chat_id": Value::from(chat.into()),
            "user_id": user_id,
            "permissions": permissions,
            "until_date": until_date,
        });
        self.request("restrictChatMember", params).await
    }

    pub async fn export_chat_invite_link(
        &self,
        chat: impl Into<ChatRef>,
    ) -> Result<Update, ApiError> {
        self.request("exportChatInviteLink", json!({"chat_id": Value::from(chat.into())}))
            .await
    }

    /// Register a webhook URL, skipping the call when the platform already
    /// has this exact URL on file.
    pub async fn set_webhook(&self, params: ResponseBody) -> Result<Update, ApiError> {
        let info = self.get_webhook_info().await?;
        if let Some(url) = params.get("url").and_then(Value::as_str) {
            if info.get("url").as_str() == url {
                return Ok(info);
            }
        }
        self.request("setWebhook", params.into_value()).await
    }

    pub async fn delete_webhook(&self) -> Result<Update, ApiError> {
        self.request("deleteWebhook", json!({})).await
    }

    pub async fn get_webhook_info(&self) -> Result<Update, ApiError> {
        self.request("getWebhookInfo", json!({})).await
    }
}

/// Merge caller extras into a base parameter object; extras win.
fn merged(base: Value, extra: ResponseBody) -> Value {
    let mut fields = match base {
        Value::Object(fields) => fields,
        _ => Map::new(),
    };
    if let Value::Object(extras) = extra.into_value() {
        for (key, value) in extras {
            fields.insert(key, value);
        }
    }
    Value::Object(fields)
}

/// Split the platform envelope into its result or its reported error.
fn parse_envelope(envelope: Value) -> Result<Update, ApiError> {
    let ok = envelope.get("ok").and_then(Value::as_bool).unwrap_or(false);
    if ok {
        let result = envelope.get("result").cloned().unwrap_or(Value::Null);
        return Ok(Update::from(result));
    }
    Err(ApiError::Telegram {
        code: envelope.get("error_code").and_then(Value::as_i64).unwrap_or(0),
        description: envelope
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        parameters: envelope.get("parameters").cloned().unwrap_or(Value::Null),
    })
}
