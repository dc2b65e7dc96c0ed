//! Bot assembly: API client + dispatcher + update acquisition runtime.
//!
//! [`Bot`] ties the pieces together for the common case: build from a
//! [`Config`], register handlers, call [`run`](Bot::run). The two
//! acquisition modes are mutually exclusive per instance - a long-poll
//! driver feeding a bounded queue, or a webhook receiver dispatching
//! synchronously.

pub mod polling;
pub mod webhook;

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::Api;
use crate::config::{BotMode, Config};
use crate::dispatch::{Dispatcher, Handler};
use crate::error::Error;
use crate::update::{EventKind, ResponseBody, Update};

/// A configured bot: API client, handler registry, and runtime.
pub struct Bot<C> {
    api: Arc<Api>,
    dispatcher: Dispatcher<C>,
    config: Config,
}

impl<C: Send + Sync + 'static> Bot<C> {
    pub fn new(config: Config) -> Result<Self, Error> {
        if config.bot_token.is_empty() {
            return Err(Error::Config("bot token is empty".to_string()));
        }
        let api = Arc::new(Api::new(&config.bot_token, &config.api_endpoint)?);
        let mut dispatcher = Dispatcher::new();
        if let Some(username) = &config.bot_username {
            dispatcher.set_bot_username(username);
        }
        Ok(Self {
            api,
            dispatcher,
            config,
        })
    }

    pub fn api(&self) -> &Arc<Api> {
        &self.api
    }

    pub fn dispatcher(&self) -> &Dispatcher<C> {
        &self.dispatcher
    }

    /// Fetch the bot's identity via `getMe` and adopt its username for
    /// `/cmd@botname` disambiguation. Optional - a username from config
    /// works just as well.
    pub async fn adopt_identity(&mut self) -> Result<(), Error> {
        let me = self.api.get_me().await.map_err(Error::Api)?;
        let username = me.get("username").as_str();
        if !username.is_empty() {
            self.dispatcher.set_bot_username(username);
            info!("running as @{username}");
        }
        Ok(())
    }

    /// Register a handler for an exact command string, e.g. `"/start"`.
    pub fn register_command(
        &mut self,
        command: impl Into<String>,
        handler: impl Fn(&C, &Update) -> ResponseBody + Send + Sync + 'static,
    ) {
        self.dispatcher.register_command(command, handler);
    }

    /// Register a handler for a classified event kind.
    pub fn register_kind(
        &mut self,
        kind: EventKind,
        handler: impl Fn(&C, &Update) -> ResponseBody + Send + Sync + 'static,
    ) {
        self.dispatcher.register_kind(kind, handler);
    }

    /// Register a handler for callback data matching a regex pattern.
    pub fn register_callback(
        &mut self,
        pattern: &str,
        handler: impl Fn(&C, &Update) -> ResponseBody + Send + Sync + 'static,
    ) -> Result<(), Error> {
        self.dispatcher.register_callback(pattern, handler)
    }

    /// Append a middleware to the dispatch chain.
    pub fn use_middleware(
        &mut self,
        middleware: impl Fn(Handler<C>) -> Handler<C> + Send + Sync + 'static,
    ) {
        self.dispatcher.use_middleware(middleware);
    }

    /// Run until ctrl-c, acquiring updates per the configured mode.
    ///
    /// Registration must be complete by now: the dispatcher is consumed and
    /// read-only from here on.
    pub async fn run(self, ctx: C) -> Result<(), Error> {
        match self.config.bot_mode {
            BotMode::Polling => {
                info!("starting in polling mode");
                self.run_polling(ctx).await
            }
            BotMode::Webhook => {
                info!("starting in webhook mode");
                webhook::serve(self.api, self.dispatcher, ctx, &self.config).await
            }
        }
    }

    async fn run_polling(self, ctx: C) -> Result<(), Error> {
        // The two acquisition modes are mutually exclusive; drop any stale
        // webhook registration or getUpdates would be rejected.
        if let Err(err) = self.api.delete_webhook().await {
            warn!("deleteWebhook failed: {err}");
        }

        let (shutdown, poller_shutdown) = watch::channel(false);
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
            let _ = shutdown.send(true);
        });

        let source = polling::ApiSource::new(self.api.clone(), self.config.poll_timeout);
        let mut updates = polling::Poller::new(source)
            .with_capacity(self.config.queue_capacity)
            .spawn(poller_shutdown);

        info!("polling for updates");
        while let Some(update) = updates.recv().await {
            match self.dispatcher.dispatch(&ctx, &update) {
                Ok(body) => {
                    if body.is_empty() {
                        continue;
                    }
                    if let Err(err) = self.api.execute(body).await {
                        warn!("api call for update {} failed: {err}", update.update_id());
                    }
                }
                Err(err) => debug!("update {} not dispatched: {err}", update.update_id()),
            }
        }
        Ok(())
    }
}
