//! Webhook update acquisition.
//!
//! Push-based mode: the platform POSTs each update to us. The receiver
//! dispatches synchronously and answers with the handler's response body,
//! which the platform executes as the corresponding remote call (the
//! reply-to-webhook mechanism) - no outbound request, no internal queue.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::api::Api;
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::Error;
use crate::update::{ResponseBody, Update};

/// Header the platform echoes when a secret token is configured.
const SECRET_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

struct WebhookState<C> {
    dispatcher: Dispatcher<C>,
    ctx: C,
    secret: Option<String>,
}

/// Register the webhook, serve updates until ctrl-c, then deregister.
pub async fn serve<C: Send + Sync + 'static>(
    api: Arc<Api>,
    dispatcher: Dispatcher<C>,
    ctx: C,
    config: &Config,
) -> Result<(), Error> {
    let webhook_url = config
        .webhook_url
        .as_deref()
        .ok_or_else(|| Error::Config("webhook mode requires a webhook URL".to_string()))?;
    let url = Url::parse(webhook_url)
        .map_err(|err| Error::Config(format!("invalid webhook URL {webhook_url:?}: {err}")))?;

    let mut params = ResponseBody::new().with("url", url.as_str());
    if let Some(secret) = &config.webhook_secret {
        params.insert("secret_token", secret.as_str());
    }
    api.set_webhook(params).await.map_err(Error::Api)?;

    let state = Arc::new(WebhookState {
        dispatcher,
        ctx,
        secret: config.webhook_secret.clone(),
    });
    let app = Router::new()
        .route(url.path(), post(receive::<C>))
        .with_state(state);

    let address = SocketAddr::from(([0, 0, 0, 0], config.webhook_port));
    info!("webhook registered at {url}, listening on {address}");

    let listener = tokio::net::TcpListener::bind(address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    // Leave no stale registration behind.
    api.delete_webhook().await.map_err(Error::Api)?;
    info!("webhook deregistered");
    Ok(())
}

async fn receive<C: Send + Sync + 'static>(
    State(state): State<Arc<WebhookState<C>>>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers, state.secret.as_deref()) {
        warn!("webhook request rejected: bad secret token");
        return (StatusCode::UNAUTHORIZED, Json(Value::Null));
    }

    let update = Update::from(payload);
    match state.dispatcher.dispatch(&state.ctx, &update) {
        Ok(body) if !body.is_empty() => (StatusCode::OK, Json(body.into_value())),
        Ok(_) => (StatusCode::OK, Json(Value::Null)),
        Err(err) => {
            debug!("update {} not dispatched: {err}", update.update_id());
            (StatusCode::OK, Json(Value::Null))
        }
    }
}

/// Check the secret-token header against the configured secret, if any.
fn authorized(headers: &HeaderMap, secret: Option<&str>) -> bool {
    match secret {
        None => true,
        Some(secret) => headers
            .get(SECRET_HEADER)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|presented| presented == secret),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::update::EventKind;
    use serde_json::json;

    fn state(secret: Option<&str>) -> Arc<WebhookState<()>> {
        let mut dispatcher: Dispatcher<()> = Dispatcher::new();
        dispatcher.register_kind(EventKind::Text, |_, update: &Update| {
            update.reply("ack", ResponseBody::new())
        });
        Arc::new(WebhookState {
            dispatcher,
            ctx: (),
            secret: secret.map(String::from),
        })
    }

    fn payload() -> Value {
        json!({
            "update_id": 5,
            "message": {"message_id": 1, "chat": {"id": 2}, "text": "hello"}
        })
    }

    #[tokio::test]
    async fn test_receive_answers_with_response_body() {
        let (status, Json(body)) =
            receive(State(state(None)), HeaderMap::new(), Json(payload())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["method"], json!("sendMessage"));
        assert_eq!(body["chat_id"], json!(2));
    }

    #[tokio::test]
    async fn test_receive_rejects_bad_secret() {
        let mut headers = HeaderMap::new();
        headers.insert(SECRET_HEADER, "wrong".parse().unwrap());

        let (status, _) = receive(State(state(Some("right"))), headers, Json(payload())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_receive_accepts_matching_secret() {
        let mut headers = HeaderMap::new();
        headers.insert(SECRET_HEADER, "right".parse().unwrap());

        let (status, _) = receive(State(state(Some("right"))), headers, Json(payload())).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unroutable_update_is_acknowledged_empty() {
        let (status, Json(body)) = receive(
            State(state(None)),
            HeaderMap::new(),
            Json(json!({"update_id": 6, "poll": {}})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::Null);
    }
}
