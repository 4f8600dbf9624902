//! Update handlers.
//!
//! Handlers only talk to the `MessagingPort`, the persistence port and the
//! upstream client held in `AppState`, so they run unchanged against the
//! recording messenger in tests. Every update goes through the same gates:
//! audit line, user/group upsert, permission check, then dispatch.

use hnb_core::{
    domain::{ChatId, ChatInfo, MessageRef, Sender, SessionKey, UserId},
    formatting::{escape_html, split_message},
    game::Player,
    messaging::types::{IncomingUpdate, InlineKeyboard},
    ports::{GroupProfile, UserProfile},
    security::{check_access, Access, BANNED_HTML, MAINTENANCE_HTML},
    utils::AuditEvent,
    Error, Result,
};

use crate::router::AppState;

mod callback;
mod commands;
mod features;
mod games;
mod membership;
mod menus;
mod owner;
mod render;
mod text;

#[cfg(test)]
mod test_support;

pub use commands::COMMAND_MENU;

/// Who is talking, and where.
#[derive(Clone, Debug)]
pub(crate) struct Ctx {
    pub chat: ChatInfo,
    pub sender: Sender,
}

impl Ctx {
    pub fn new(chat: ChatInfo, sender: Sender) -> Self {
        Self { chat, sender }
    }

    pub fn key(&self) -> SessionKey {
        SessionKey::new(self.chat.id, self.sender.id)
    }

    pub fn chat_id(&self) -> ChatId {
        self.chat.id
    }

    pub fn player(&self) -> Player {
        Player {
            id: self.sender.id,
            name: self.sender.full_name.clone(),
        }
    }

    pub fn is_owner(&self, state: &AppState) -> bool {
        state.cfg.is_owner(self.sender.id)
    }

    fn audit_name(&self) -> String {
        self.sender
            .username
            .clone()
            .unwrap_or_else(|| self.sender.first_name.clone())
    }
}

/// Entry point for every converted update. Commands and texts of one chat are
/// handled one at a time; button presses and membership changes are not queued.
pub async fn handle_update(state: &AppState, update: IncomingUpdate) {
    let (who, result) = match update {
        IncomingUpdate::Command(cmd) => {
            let _guard = state.chat_locks.lock_chat(cmd.chat.id.0).await;
            let who = Some((cmd.sender.clone(), cmd.name.clone()));
            (who, commands::handle_command(state, cmd).await)
        }
        IncomingUpdate::Text(msg) => {
            let _guard = state.chat_locks.lock_chat(msg.chat.id.0).await;
            let who = Some((msg.sender.clone(), "text".to_string()));
            (who, text::handle_text(state, msg).await)
        }
        IncomingUpdate::Callback(q) => {
            let who = Some((q.sender.clone(), q.data.clone()));
            (who, callback::handle_callback(state, q).await)
        }
        IncomingUpdate::Membership(change) => {
            (None, membership::handle_membership(state, change).await)
        }
    };

    if let Err(e) = result {
        report_error(state, who, &e).await;
    }
}

async fn report_error(state: &AppState, who: Option<(Sender, String)>, err: &Error) {
    let Some((sender, context)) = who else {
        tracing::error!("update handler failed: {err}");
        return;
    };
    tracing::error!(user_id = sender.id.0, context = %context, "handler failed: {err}");

    let name = sender.username.clone().unwrap_or_else(|| sender.first_name.clone());
    state.audit.record(AuditEvent::error(
        sender.id.0,
        &name,
        &err.to_string(),
        Some(&context),
    ));

    let Some(owner) = state.cfg.owner_id else {
        return;
    };
    let html = format!(
        "⚠️ <b>Handler error</b>\n\n👤 <code>{}</code> ({})\n📍 <code>{}</code>\n\n<code>{}</code>",
        sender.id.0,
        escape_html(&name),
        escape_html(&context),
        escape_html(&err.to_string())
    );
    if let Err(e) = state.messenger.send_html(ChatId(owner.0), &html).await {
        tracing::debug!("owner notification failed: {e}");
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Surface {
    Command,
    Text,
    Callback,
}

/// Permission gate. Banned users hear about it on commands only; maintenance
/// mode answers in private chats only; button presses are always silent.
pub(crate) async fn admit(state: &AppState, ctx: &Ctx, surface: Surface) -> Result<bool> {
    let settings = state.settings.snapshot().await;
    let access = check_access(ctx.sender.id, state.cfg.owner_id, &settings);
    let notice = match access {
        Access::Allowed => return Ok(true),
        Access::Banned => (surface == Surface::Command).then_some(BANNED_HTML),
        Access::Maintenance => {
            (surface != Surface::Callback && ctx.chat.kind.is_private()).then_some(MAINTENANCE_HTML)
        }
    };

    let reason = match access {
        Access::Banned => "banned",
        _ => "maintenance",
    };
    state.audit.record(AuditEvent::access(
        ctx.sender.id.0,
        &ctx.audit_name(),
        false,
        Some(reason),
    ));
    if let Some(html) = notice {
        state.messenger.send_html(ctx.chat_id(), html).await?;
    }
    Ok(false)
}

/// Token bucket per user. The owner is never limited.
pub(crate) async fn within_rate_limit(state: &AppState, ctx: &Ctx) -> Result<bool> {
    if ctx.is_owner(state) {
        return Ok(true);
    }
    let verdict = state.rate_limiter.lock().await.check(ctx.sender.id);
    let Err(wait) = verdict else {
        return Ok(true);
    };

    let secs = wait.as_secs_f64();
    state
        .audit
        .record(AuditEvent::rate_limit(ctx.sender.id.0, &ctx.audit_name(), secs));
    tracing::info!(user_id = ctx.sender.id.0, wait_secs = secs, "rate limited");
    state
        .messenger
        .send_html(
            ctx.chat_id(),
            &format!("⏳ <b>Slow down!</b> Try again in {secs:.1} seconds."),
        )
        .await?;
    Ok(false)
}

pub(crate) fn audit_inbound(state: &AppState, ctx: &Ctx, kind: &str, content: &str) {
    state.audit.record(AuditEvent::message(
        ctx.sender.id.0,
        &ctx.audit_name(),
        ctx.chat.id.0,
        kind,
        content,
    ));
}

/// Remember the sender (and the group it wrote in). Storage trouble is logged
/// and never blocks the reply.
pub(crate) async fn track(state: &AppState, ctx: &Ctx) {
    let user = UserProfile {
        id: ctx.sender.id,
        full_name: ctx.sender.full_name.clone(),
        username: ctx.sender.username.clone(),
        is_premium: ctx.sender.is_premium,
        language_code: ctx.sender.language_code.clone(),
    };
    if let Err(e) = state.persistence.upsert_user(&user).await {
        tracing::warn!(user_id = user.id.0, "user upsert failed: {e}");
    }

    if ctx.chat.kind.is_group() {
        let group = GroupProfile {
            id: ctx.chat.id,
            title: ctx.chat.title.clone().unwrap_or_default(),
            kind: ctx.chat.kind.as_str().to_string(),
            member_count: None,
        };
        if let Err(e) = state.persistence.upsert_group(&group).await {
            tracing::warn!(chat_id = group.id.0, "group upsert failed: {e}");
        }
    }
}

/// Replace a placeholder with the final reply. Long replies spill into
/// follow-up messages; the keyboard rides on the last one.
pub(crate) async fn deliver(
    state: &AppState,
    placeholder: MessageRef,
    html: &str,
    keyboard: Option<InlineKeyboard>,
) -> Result<()> {
    let mut chunks = split_message(html, state.cfg.telegram_safe_limit).into_iter();
    let first = chunks.next().unwrap_or_default();
    let rest: Vec<String> = chunks.collect();

    if rest.is_empty() {
        return state.messenger.edit_html(placeholder, &first, keyboard).await;
    }
    state.messenger.edit_html(placeholder, &first, None).await?;
    send_chunks(state, placeholder.chat_id, rest, keyboard).await
}

/// Send a possibly long reply as consecutive messages.
pub(crate) async fn send_long(
    state: &AppState,
    chat_id: ChatId,
    html: &str,
    keyboard: Option<InlineKeyboard>,
) -> Result<()> {
    let chunks = split_message(html, state.cfg.telegram_safe_limit);
    send_chunks(state, chat_id, chunks, keyboard).await
}

async fn send_chunks(
    state: &AppState,
    chat_id: ChatId,
    chunks: Vec<String>,
    keyboard: Option<InlineKeyboard>,
) -> Result<()> {
    let last = chunks.len().saturating_sub(1);
    let mut keyboard = keyboard;
    for (i, chunk) in chunks.iter().enumerate() {
        let kb = if i == last { keyboard.take() } else { None };
        match kb {
            Some(kb) => state.messenger.send_keyboard(chat_id, chunk, kb).await?,
            None => state.messenger.send_html(chat_id, chunk).await?,
        };
    }
    Ok(())
}

/// Best-effort callback answer. Telegram shows a spinner until one arrives.
pub(crate) async fn ack(state: &AppState, callback_id: &str, alert: Option<&str>) {
    let res = state
        .messenger
        .answer_callback_query(callback_id, alert, alert.is_some())
        .await;
    if let Err(e) = res {
        tracing::debug!("callback answer failed: {e}");
    }
}

/// Parse a numeric Telegram id typed by the owner.
pub(crate) fn parse_id(s: &str) -> Option<i64> {
    s.trim().parse::<i64>().ok()
}

pub(crate) fn user_chat(user: UserId) -> ChatId {
    ChatId(user.0)
}
