use std::{sync::Arc, time::Duration};

use anyhow::Context;
use teloxide::Bot;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use trip_planner_bot::{
    config::{BotMode, Config},
    routes,
    services::{
        analytics::AnalyticsTracker,
        chatbot::ConversationController,
        llm::OpenAiClient,
        session_manager::SessionManager,
        telegram::{TelegramTransport, register_commands, register_webhook, run_polling},
    },
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env().context("invalid configuration")?;
    info!(?config, "configuration loaded");

    let sessions = SessionManager::new(config.session_ttl);
    let _purge = sessions.spawn_purge_task(Duration::from_secs(60));

    let api_url: reqwest::Url = config
        .telegram_api_base
        .parse()
        .with_context(|| format!("invalid TELEGRAM_API_BASE {}", config.telegram_api_base))?;
    let bot = Bot::new(config.telegram_token.clone()).set_api_url(api_url);
    if let Err(err) = register_commands(&bot).await {
        warn!(error = %err, "could not register bot commands");
    }

    let model = Arc::new(OpenAiClient::from_config(&config));
    let controller = Arc::new(ConversationController::new(
        sessions,
        Arc::new(TelegramTransport::new(bot.clone())),
        model,
        AnalyticsTracker::new(),
        config.affiliate_id.clone(),
    ));

    match config.mode {
        BotMode::Polling => {
            tokio::spawn(run_polling(bot.clone(), controller.clone()));
        }
        BotMode::Webhook => match &config.webhook_url {
            Some(url) => {
                register_webhook(&bot, url, config.webhook_secret.as_deref())
                    .await
                    .context("failed to register webhook")?;
                info!(%url, "webhook registered");
            }
            None => warn!("BOT_MODE=webhook but WEBHOOK_URL is unset; expecting an externally registered webhook"),
        },
    }

    let state = Arc::new(AppState::new(
        controller,
        config.webhook_secret.clone(),
        config.admin_key.clone(),
    ));
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, mode = ?config.mode, "🚀 trip planner bot running");
    axum::serve(listener, app).await?;
    Ok(())
}
