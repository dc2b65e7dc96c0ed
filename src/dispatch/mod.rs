//! Handler registry, middleware chain, and update dispatch.
//!
//! The embedding application registers handlers once at startup, then the
//! dispatcher routes every update to exactly one of them. Resolution is a
//! three-tier precedence rule, first match wins:
//!
//! 1. callback-data pattern (regex over `callback_query.data`, in
//!    registration order - first registered wins),
//! 2. exact command string (after `@botname` resolution),
//! 3. classified event kind.
//!
//! An update no tier can place fails with [`Error::NoHandlerFound`].
//! Registration must complete before updates start flowing; dispatch itself
//! is `&self` and safe to call concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;

use crate::error::Error;
use crate::update::{EventKind, ResponseBody, Update};

/// A registered update handler over an application context `C`.
pub struct Handler<C>(Arc<dyn Fn(&C, &Update) -> ResponseBody + Send + Sync>);

impl<C> Handler<C> {
    pub fn new(f: impl Fn(&C, &Update) -> ResponseBody + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn call(&self, ctx: &C, update: &Update) -> ResponseBody {
        (self.0.as_ref())(ctx, update)
    }
}

impl<C> Clone for Handler<C> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

/// A function transforming a handler into another handler of the same
/// signature. The first-registered middleware becomes the outermost wrapper.
pub type Middleware<C> = Box<dyn Fn(Handler<C>) -> Handler<C> + Send + Sync>;

/// One compiled callback-data route.
struct CallbackRoute<C> {
    source: String,
    pattern: Regex,
    handler: Handler<C>,
}

/// Routes updates to registered handlers through the middleware chain.
///
/// Read-only during dispatch; the context type `C` is whatever shared state
/// the embedding application wants its handlers to see.
pub struct Dispatcher<C> {
    commands: HashMap<String, Handler<C>>,
    kinds: HashMap<EventKind, Handler<C>>,
    callbacks: Vec<CallbackRoute<C>>,
    middleware: Vec<Middleware<C>>,
    bot_username: Option<String>,
}

impl<C> Default for Dispatcher<C> {
    fn default() -> Self {
        Self {
            commands: HashMap::new(),
            kinds: HashMap::new(),
            callbacks: Vec::new(),
            middleware: Vec::new(),
            bot_username: None,
        }
    }
}

impl<C> Dispatcher<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bot's own username (without `@`) for command disambiguation.
    pub fn set_bot_username(&mut self, username: impl Into<String>) {
        let username = username.into();
        self.bot_username = (!username.is_empty()).then_some(username);
    }

    /// Register a handler for an exact command string, e.g. `"/start"`.
    ///
    /// Re-registering the same command replaces the earlier handler.
    pub fn register_command(
        &mut self,
        command: impl Into<String>,
        handler: impl Fn(&C, &Update) -> ResponseBody + Send + Sync + 'static,
    ) {
        self.commands.insert(command.into(), Handler::new(handler));
    }

    /// Register a handler for a classified event kind.
    pub fn register_kind(
        &mut self,
        kind: EventKind,
        handler: impl Fn(&C, &Update) -> ResponseBody + Send + Sync + 'static,
    ) {
        self.kinds.insert(kind, Handler::new(handler));
    }

    /// Register a handler for callback data matching `pattern`.
    ///
    /// The pattern is an unanchored regular expression tested against the
    /// full `callback_query.data` string. Routes are tried in registration
    /// order and the first match wins; re-registering an identical pattern
    /// replaces the handler in place, keeping its position.
    pub fn register_callback(
        &mut self,
        pattern: &str,
        handler: impl Fn(&C, &Update) -> ResponseBody + Send + Sync + 'static,
    ) -> Result<(), Error> {
        let compiled = Regex::new(pattern).map_err(|source| Error::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        let handler = Handler::new(handler);
        if let Some(route) = self.callbacks.iter_mut().find(|r| r.source == pattern) {
            route.pattern = compiled;
            route.handler = handler;
        } else {
            self.callbacks.push(CallbackRoute {
                source: pattern.to_string(),
                pattern: compiled,
                handler,
            });
        }
        Ok(())
    }

    /// Append a middleware to the chain.
    pub fn use_middleware(
        &mut self,
        middleware: impl Fn(Handler<C>) -> Handler<C> + Send + Sync + 'static,
    ) {
        self.middleware.push(Box::new(middleware));
    }

    /// Resolve the update to exactly one handler, wrap it in the middleware
    /// chain, and invoke it.
    pub fn dispatch(&self, ctx: &C, update: &Update) -> Result<ResponseBody, Error> {
        let handler = self.resolve(update).ok_or(Error::NoHandlerFound)?;
        let handler = self
            .middleware
            .iter()
            .rev()
            .fold(handler, |inner, middleware| middleware(inner));
        Ok(handler.call(ctx, update))
    }

    /// Precedence resolution: callback pattern > exact command > event kind.
    fn resolve(&self, update: &Update) -> Option<Handler<C>> {
        let data = update.get("callback_query.data");
        if data.exists() {
            let data = data.as_str();
            for route in &self.callbacks {
                if route.pattern.is_match(data) {
                    return Some(route.handler.clone());
                }
            }
        }

        if let Some(command) = update.command() {
            let lookup = command.strip_mention(self.bot_username.as_deref());
            if let Some(handler) = self.commands.get(lookup) {
                return Some(handler.clone());
            }
        }

        self.kinds.get(&update.kind()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    /// Test context: a shared call log.
    type Log = Mutex<Vec<String>>;

    fn logging(tag: &'static str) -> impl Fn(&Log, &Update) -> ResponseBody {
        move |log: &Log, _: &Update| {
            log.lock().unwrap().push(tag.to_string());
            ResponseBody::method(tag)
        }
    }

    fn command_update(text: &str, length: i64) -> Update {
        Update::from(json!({
            "message": {
                "text": text,
                "entities": [{"type": "bot_command", "offset": 0, "length": length}]
            }
        }))
    }

    fn callback_update(data: &str) -> Update {
        Update::from(json!({
            "callback_query": {
                "id": "1",
                "data": data,
                "message": {
                    "text": "/start",
                    "entities": [{"type": "bot_command", "offset": 0, "length": 6}]
                }
            }
        }))
    }

    #[test]
    fn test_empty_registry_yields_no_handler_found() {
        let dispatcher: Dispatcher<Log> = Dispatcher::new();
        let result = dispatcher.dispatch(&Log::default(), &command_update("/start", 6));

        assert!(matches!(result, Err(Error::NoHandlerFound)));
    }

    #[test]
    fn test_exact_command_match() {
        let mut dispatcher: Dispatcher<Log> = Dispatcher::new();
        dispatcher.register_command("/start", logging("start"));

        let body = dispatcher
            .dispatch(&Log::default(), &command_update("/start", 6))
            .unwrap();
        assert_eq!(body.method_name(), Some("start"));
    }

    #[test]
    fn test_command_with_mention_resolves_via_username() {
        let mut dispatcher: Dispatcher<Log> = Dispatcher::new();
        dispatcher.set_bot_username("mybot");
        dispatcher.register_command("/start", logging("start"));

        let update = command_update("/start@mybot go", 6);
        assert!(dispatcher.dispatch(&Log::default(), &update).is_ok());

        // Another bot's mention never matches our registration.
        let update = command_update("/start@otherbot go", 6);
        assert!(matches!(
            dispatcher.dispatch(&Log::default(), &update),
            Err(Error::NoHandlerFound)
        ));
    }

    #[test]
    fn test_callback_pattern_beats_command() {
        let mut dispatcher: Dispatcher<Log> = Dispatcher::new();
        dispatcher.register_command("/start", logging("command"));
        dispatcher.register_kind(EventKind::Text, logging("kind"));
        dispatcher.register_callback(r"menu:\d+", logging("callback")).unwrap();

        // The embedded message carries /start, but the callback data wins.
        let body = dispatcher
            .dispatch(&Log::default(), &callback_update("menu:42"))
            .unwrap();
        assert_eq!(body.method_name(), Some("callback"));
    }

    #[test]
    fn test_unmatched_callback_falls_through_to_command() {
        let mut dispatcher: Dispatcher<Log> = Dispatcher::new();
        dispatcher.register_command("/start", logging("command"));
        dispatcher.register_callback(r"settings:", logging("callback")).unwrap();

        let body = dispatcher
            .dispatch(&Log::default(), &callback_update("menu:42"))
            .unwrap();
        assert_eq!(body.method_name(), Some("command"));
    }

    #[test]
    fn test_event_kind_fallback() {
        let mut dispatcher: Dispatcher<Log> = Dispatcher::new();
        dispatcher.register_kind(EventKind::Text, logging("text"));

        let update = Update::from(json!({"message": {"text": "no command here"}}));
        let body = dispatcher.dispatch(&Log::default(), &update).unwrap();
        assert_eq!(body.method_name(), Some("text"));
    }

    #[test]
    fn test_reregistration_replaces_handler() {
        let mut dispatcher: Dispatcher<Log> = Dispatcher::new();
        dispatcher.register_command("/start", logging("first"));
        dispatcher.register_command("/start", logging("second"));

        let body = dispatcher
            .dispatch(&Log::default(), &command_update("/start", 6))
            .unwrap();
        assert_eq!(body.method_name(), Some("second"));
    }

    #[test]
    fn test_first_registered_callback_route_wins() {
        let mut dispatcher: Dispatcher<Log> = Dispatcher::new();
        dispatcher.register_callback("menu", logging("broad")).unwrap();
        dispatcher.register_callback(r"menu:\d+", logging("narrow")).unwrap();

        let body = dispatcher
            .dispatch(&Log::default(), &callback_update("menu:42"))
            .unwrap();
        assert_eq!(body.method_name(), Some("broad"));
    }

    #[test]
    fn test_callback_reregistration_keeps_position() {
        let mut dispatcher: Dispatcher<Log> = Dispatcher::new();
        dispatcher.register_callback("menu", logging("original")).unwrap();
        dispatcher.register_callback("other", logging("other")).unwrap();
        dispatcher.register_callback("menu", logging("replacement")).unwrap();

        // Still first in line, now with the replacement handler.
        let body = dispatcher
            .dispatch(&Log::default(), &callback_update("menu:42"))
            .unwrap();
        assert_eq!(body.method_name(), Some("replacement"));
    }

    #[test]
    fn test_invalid_callback_pattern_is_registration_error() {
        let mut dispatcher: Dispatcher<Log> = Dispatcher::new();
        let result = dispatcher.register_callback("(unclosed", logging("x"));

        assert!(matches!(result, Err(Error::InvalidPattern { .. })));
    }

    #[test]
    fn test_middleware_onion_order() {
        let mut dispatcher: Dispatcher<Log> = Dispatcher::new();
        dispatcher.register_command("/go", logging("handler"));
        dispatcher.use_middleware(|next| {
            Handler::new(move |log: &Log, update: &Update| {
                log.lock().unwrap().push("outer:in".into());
                let body = next.call(log, update);
                log.lock().unwrap().push("outer:out".into());
                body
            })
        });
        dispatcher.use_middleware(|next| {
            Handler::new(move |log: &Log, update: &Update| {
                log.lock().unwrap().push("inner:in".into());
                let body = next.call(log, update);
                log.lock().unwrap().push("inner:out".into());
                body
            })
        });

        let log = Log::default();
        dispatcher.dispatch(&log, &command_update("/go", 3)).unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["outer:in", "inner:in", "handler", "inner:out", "outer:out"]
        );
    }

    #[test]
    fn test_middleware_wraps_freshly_per_dispatch() {
        let mut dispatcher: Dispatcher<Log> = Dispatcher::new();
        dispatcher.register_command("/go", logging("handler"));
        dispatcher.use_middleware(|next| {
            Handler::new(move |log: &Log, update: &Update| {
                log.lock().unwrap().push("mw".into());
                next.call(log, update)
            })
        });

        let log = Log::default();
        let update = command_update("/go", 3);
        dispatcher.dispatch(&log, &update).unwrap();
        dispatcher.dispatch(&log, &update).unwrap();

        // One wrap per call, not an accumulating chain.
        assert_eq!(*log.lock().unwrap(), vec!["mw", "handler", "mw", "handler"]);
    }
}
