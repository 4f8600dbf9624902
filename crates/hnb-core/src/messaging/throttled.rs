use std::{collections::HashMap, path::Path, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{
    domain::{ChatId, MessageRef, UserId},
    messaging::{
        port::MessagingPort,
        types::{
            ChatAction, InlineKeyboard, MessagingCapabilities, Moderation, UserLookup,
            UserProfile,
        },
    },
    sweeper::Sweep,
    Result,
};

/// Minimum spacing between outbound calls.
#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    /// Across the whole bot.
    pub global_min_interval: Duration,
    /// Within one chat.
    pub per_chat_min_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            // Roughly 28 calls per second.
            global_min_interval: Duration::from_millis(35),
            per_chat_min_interval: Duration::from_millis(350),
        }
    }
}

/// Next free slot of a spaced-out queue.
#[derive(Clone, Copy, Debug)]
struct Slot {
    next: Instant,
}

impl Slot {
    /// Claim the next slot after `now`; returns the delay until it opens.
    fn claim(&mut self, now: Instant, spacing: Duration) -> Duration {
        let start = self.next.max(now);
        self.next = start + spacing;
        start - now
    }
}

#[derive(Debug)]
struct Slots {
    global: Slot,
    chats: HashMap<ChatId, Slot>,
}

/// `MessagingPort` decorator spacing out outbound calls, globally and per chat.
///
/// Broadcasts and game boards fire bursts; the adapter below still retries once
/// on `RetryAfter`.
pub struct ThrottledMessenger {
    inner: Arc<dyn MessagingPort>,
    cfg: ThrottleConfig,
    slots: Mutex<Slots>,
}

impl ThrottledMessenger {
    pub fn new(inner: Arc<dyn MessagingPort>, cfg: ThrottleConfig) -> Self {
        let now = Instant::now();
        Self {
            inner,
            cfg,
            slots: Mutex::new(Slots {
                global: Slot { next: now },
                chats: HashMap::new(),
            }),
        }
    }

    async fn wait(&self, chat: Option<ChatId>) {
        let delay = {
            let mut slots = self.slots.lock().await;
            let now = Instant::now();
            let global = slots.global.claim(now, self.cfg.global_min_interval);
            let per_chat = match chat {
                Some(chat) => slots
                    .chats
                    .entry(chat)
                    .or_insert(Slot { next: now })
                    .claim(now, self.cfg.per_chat_min_interval),
                None => Duration::ZERO,
            };
            global.max(per_chat)
        };
        if !delay.is_zero() {
            sleep(delay).await;
        }
    }

    async fn throttle_chat(&self, chat_id: ChatId) {
        self.wait(Some(chat_id)).await;
    }

    async fn throttle_global(&self) {
        self.wait(None).await;
    }
}

#[async_trait::async_trait]
impl Sweep for ThrottledMessenger {
    fn name(&self) -> &'static str {
        "throttle_slots"
    }

    /// Forget chats whose next slot is already open; a fresh slot behaves the same.
    async fn sweep_expired(&self) -> usize {
        let mut slots = self.slots.lock().await;
        let now = Instant::now();
        let before = slots.chats.len();
        slots.chats.retain(|_, slot| slot.next > now);
        before - slots.chats.len()
    }
}

#[async_trait::async_trait]
impl MessagingPort for ThrottledMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        self.inner.capabilities()
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        self.throttle_chat(chat_id).await;
        self.inner.send_html(chat_id, html).await
    }

    async fn send_keyboard(
        &self,
        chat_id: ChatId,
        html: &str,
        keyboard: InlineKeyboard,
    ) -> Result<MessageRef> {
        self.throttle_chat(chat_id).await;
        self.inner.send_keyboard(chat_id, html, keyboard).await
    }

    async fn edit_html(
        &self,
        msg: MessageRef,
        html: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<()> {
        self.throttle_chat(msg.chat_id).await;
        self.inner.edit_html(msg, html, keyboard).await
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        self.throttle_chat(msg.chat_id).await;
        self.inner.delete_message(msg).await
    }

    async fn send_chat_action(&self, chat_id: ChatId, action: ChatAction) -> Result<()> {
        self.throttle_chat(chat_id).await;
        self.inner.send_chat_action(chat_id, action).await
    }

    async fn send_photo(
        &self,
        chat_id: ChatId,
        url: &str,
        caption_html: &str,
    ) -> Result<MessageRef> {
        self.throttle_chat(chat_id).await;
        self.inner.send_photo(chat_id, url, caption_html).await
    }

    async fn send_photo_group(&self, chat_id: ChatId, urls: &[String]) -> Result<()> {
        self.throttle_chat(chat_id).await;
        self.inner.send_photo_group(chat_id, urls).await
    }

    async fn answer_callback_query(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<()> {
        // No chat id here; global spacing only.
        self.throttle_global().await;
        self.inner
            .answer_callback_query(callback_id, text, show_alert)
            .await
    }

    async fn send_document(
        &self,
        chat_id: ChatId,
        path: &Path,
        filename: &str,
        caption_html: &str,
    ) -> Result<MessageRef> {
        self.throttle_chat(chat_id).await;
        self.inner
            .send_document(chat_id, path, filename, caption_html)
            .await
    }

    async fn send_dice(&self, chat_id: ChatId) -> Result<MessageRef> {
        self.throttle_chat(chat_id).await;
        self.inner.send_dice(chat_id).await
    }

    async fn copy_message(
        &self,
        to: ChatId,
        from: MessageRef,
        caption_html: Option<&str>,
    ) -> Result<MessageRef> {
        self.throttle_chat(to).await;
        self.inner.copy_message(to, from, caption_html).await
    }

    async fn moderate(&self, chat_id: ChatId, user_id: UserId, action: Moderation) -> Result<()> {
        self.throttle_chat(chat_id).await;
        self.inner.moderate(chat_id, user_id, action).await
    }

    async fn lookup_user(&self, who: &UserLookup) -> Result<UserProfile> {
        self.throttle_global().await;
        self.inner.lookup_user(who).await
    }

    async fn set_commands(&self, commands: &[(&'static str, &'static str)]) -> Result<()> {
        self.throttle_global().await;
        self.inner.set_commands(commands).await
    }
}
