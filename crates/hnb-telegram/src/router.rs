use std::{collections::HashMap, sync::Arc, time::Instant};

use anyhow::Context;
use async_trait::async_trait;
use teloxide::{
    dispatching::Dispatcher,
    dptree,
    prelude::*,
    types::{ChatMemberUpdated, Me},
};

use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;

use hnb_core::messaging::throttled::{ThrottleConfig, ThrottledMessenger};
use hnb_core::{
    config::Config,
    domain::UserId,
    game::GameStore,
    messaging::port::MessagingPort,
    ports::Persistence,
    security::RateLimiter,
    session::SessionStore,
    settings::SettingsStore,
    sweeper::{spawn_sweeper, Sweep},
    utils::AuditLogger,
};
use hnb_upstream::Upstream;

use crate::{convert, handlers, TelegramMessenger};

/// Who the bot is on Telegram. Used to address commands and spot replies to it.
#[derive(Clone, Debug, Default)]
pub struct BotIdentity {
    pub id: Option<UserId>,
    pub username: Option<String>,
}

impl BotIdentity {
    fn from_me(me: &Me) -> Self {
        Self {
            id: Some(UserId(me.id.0 as i64)),
            username: Some(me.username().to_string()),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub messenger: Arc<dyn MessagingPort>,
    pub persistence: Arc<dyn Persistence>,
    pub upstream: Arc<Upstream>,
    pub sessions: Arc<SessionStore>,
    pub games: Arc<GameStore>,
    pub settings: Arc<SettingsStore>,
    pub rate_limiter: Arc<Mutex<RateLimiter>>,
    pub chat_locks: Arc<ChatLocks>,
    pub audit: Arc<AuditLogger>,
    pub me: BotIdentity,
    pub started_at: Instant,
}

impl AppState {
    /// Build the in-process stores from `cfg` around the given adapters.
    pub fn new(
        cfg: Arc<Config>,
        messenger: Arc<dyn MessagingPort>,
        persistence: Arc<dyn Persistence>,
        upstream: Arc<Upstream>,
        me: BotIdentity,
    ) -> Self {
        Self {
            sessions: Arc::new(SessionStore::new(cfg.session_idle_ttl)),
            games: Arc::new(GameStore::new(cfg.game_idle_ttl)),
            settings: Arc::new(SettingsStore::load(cfg.settings_path.clone())),
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(
                cfg.rate_limit_enabled,
                cfg.rate_limit_requests,
                cfg.rate_limit_window,
            ))),
            chat_locks: Arc::new(ChatLocks::default()),
            audit: Arc::new(AuditLogger::new(
                cfg.audit_log_path.clone(),
                cfg.audit_log_json,
            )),
            started_at: Instant::now(),
            cfg,
            messenger,
            persistence,
            upstream,
            me,
        }
    }

    /// Stores the background sweeper evicts from.
    pub fn sweepable(&self) -> Vec<Arc<dyn Sweep>> {
        let sessions: Arc<dyn Sweep> = self.sessions.clone();
        let games: Arc<dyn Sweep> = self.games.clone();
        let rate_limiter: Arc<dyn Sweep> = self.rate_limiter.clone();
        let chat_locks: Arc<dyn Sweep> = self.chat_locks.clone();
        vec![sessions, games, rate_limiter, chat_locks]
    }
}

#[derive(Default)]
pub struct ChatLocks {
    inner: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl ChatLocks {
    pub async fn lock_chat(&self, chat_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(chat_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

#[async_trait]
impl Sweep for ChatLocks {
    fn name(&self) -> &'static str {
        "chat_locks"
    }

    /// Drop locks nobody holds or waits on. The map owns one reference.
    async fn sweep_expired(&self) -> usize {
        let mut map = self.inner.lock().await;
        let before = map.len();
        map.retain(|_, lock| Arc::strong_count(lock) > 1);
        before - map.len()
    }
}

pub async fn run_polling(
    cfg: Arc<Config>,
    persistence: Arc<dyn Persistence>,
    upstream: Arc<Upstream>,
) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    let me = bot.get_me().await.context("telegram getMe failed")?;
    tracing::info!(username = %me.username(), "bot started");
    match cfg.owner_id {
        Some(owner) => tracing::info!(owner = owner.0, "owner configured"),
        None => tracing::warn!("OWNER_ID not set; owner commands are disabled"),
    }

    // Throttle outbound calls to stay under flood limits; the adapter still retries one RetryAfter.
    let raw_messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let throttled = Arc::new(ThrottledMessenger::new(
        raw_messenger,
        ThrottleConfig::default(),
    ));

    let state = Arc::new(AppState::new(
        cfg.clone(),
        throttled.clone(),
        persistence,
        upstream,
        BotIdentity::from_me(&me),
    ));

    if let Err(e) = state.messenger.set_commands(handlers::COMMAND_MENU).await {
        tracing::warn!("failed to register command menu: {e}");
    }

    let cancel = CancellationToken::new();
    let mut sweepable = state.sweepable();
    sweepable.push(throttled);
    let sweeper = spawn_sweeper(sweepable, cfg.sweep_interval, cancel.clone());

    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(on_callback))
        .branch(Update::filter_my_chat_member().endpoint(on_my_chat_member))
        .branch(Update::filter_message().endpoint(on_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    cancel.cancel();
    if let Err(e) = sweeper.await {
        tracing::warn!("sweeper task ended abnormally: {e}");
    }
    tracing::info!("dispatcher stopped");
    Ok(())
}

async fn on_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    if let Some(update) = convert::message_update(&msg, &state.me) {
        handlers::handle_update(&state, update).await;
    }
    Ok(())
}

async fn on_callback(
    q: teloxide::types::CallbackQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    handlers::handle_update(&state, convert::callback_update(&q)).await;
    Ok(())
}

async fn on_my_chat_member(
    bot: Bot,
    upd: ChatMemberUpdated,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let joined = upd.new_chat_member.kind.is_present();
    let member_count = if joined && !upd.chat.is_private() {
        match bot.get_chat_member_count(upd.chat.id).await {
            Ok(n) => Some(n),
            Err(e) => {
                tracing::debug!(chat_id = upd.chat.id.0, "member count unavailable: {e}");
                None
            }
        }
    } else {
        None
    };
    if let Some(update) = convert::membership_update(&upd, member_count) {
        handlers::handle_update(&state, update).await;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_chat_turns_are_serialized() {
        let locks = Arc::new(ChatLocks::default());
        let guard = locks.lock_chat(7).await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _g = locks.lock_chat(7).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        // Another chat is not blocked.
        let _other = tokio::time::timeout(Duration::from_millis(50), locks.lock_chat(8))
            .await
            .expect("unrelated chat must not wait");

        drop(guard);
        tokio::time::timeout(Duration::from_millis(200), waiter)
            .await
            .expect("waiter runs once the lock is released")
            .expect("task");
    }

    #[tokio::test]
    async fn released_chat_locks_are_swept() {
        let locks = Arc::new(ChatLocks::default());
        for chat in 0..5000 {
            drop(locks.lock_chat(chat).await);
        }
        let held = locks.lock_chat(-1).await;
        assert_eq!(locks.len().await, 5001);

        let stores: Vec<Arc<dyn Sweep>> = vec![locks.clone()];
        assert_eq!(hnb_core::sweeper::sweep_all(&stores).await, 5000);
        assert_eq!(locks.len().await, 1);

        drop(held);
        assert_eq!(locks.sweep_expired().await, 1);
        assert_eq!(locks.len().await, 0);
    }
}
