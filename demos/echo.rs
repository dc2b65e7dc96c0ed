//! Echo demo: register a few handlers and run the bot.
//!
//! ```sh
//! BOT_TOKEN=123:abc cargo run --example echo
//! ```

use lazygram::{Bot, Config, EventKind, Handler, ResponseBody, Update};
use tracing::info;

/// Application context shared with every handler.
#[derive(Clone)]
struct AppState {
    greeting: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    lazygram::logging::init();

    let config = Config::from_env();
    let mut bot: Bot<AppState> = Bot::new(config)?;

    // Adopt the username so /cmd@botname works in group chats.
    bot.adopt_identity().await?;

    bot.register_command("/start", |state: &AppState, update: &Update| {
        update.reply(&state.greeting, ResponseBody::new())
    });

    bot.register_command("/ping", |_: &AppState, update: &Update| {
        update.reply("pong", ResponseBody::new())
    });

    // Echo anything else that looks like text.
    bot.register_kind(EventKind::Text, |_: &AppState, update: &Update| {
        update.reply(update.text(), ResponseBody::new())
    });

    // Inline keyboard callbacks like "menu:3".
    bot.register_callback(r"^menu:\d+", |_: &AppState, update: &Update| {
        let choice = update.get("callback_query.data").as_str().to_string();
        update.answer_callback_query(&format!("you picked {choice}"), ResponseBody::new())
    })?;

    // Log every dispatched update on the way in.
    bot.use_middleware(|next| {
        Handler::new(move |state: &AppState, update: &Update| {
            info!(
                update_id = update.update_id(),
                kind = %update.kind(),
                "dispatching"
            );
            next.call(state, update)
        })
    });

    bot.run(AppState {
        greeting: "hello from lazygram!".to_string(),
    })
    .await?;

    Ok(())
}
