//! Owner-only commands: metrics, global bans, access toggle, broadcasts, group
//! moderation and database backups. The caller has already checked the sender
//! is the owner.

use hnb_core::{
    domain::{ChatId, MessageId, MessageRef, UserId},
    formatting::{escape_html, thousands},
    messaging::types::{Moderation, ReplyRef},
    ports::BroadcastRecord,
    Result,
};

use crate::router::AppState;

use super::{parse_id, user_chat, Ctx};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum OwnerCommand {
    Stats,
    GlobalBan,
    GlobalUnban,
    ToggleAccess,
    BroadcastAll,
    BroadcastUser,
    BroadcastChat,
    BroadcastMedia,
    DeleteBroadcasts,
    Moderate(Moderation),
    DownloadDb,
}

impl OwnerCommand {
    /// Every name also answers to an `s_` prefix (`/s_gban`).
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.strip_prefix("s_").unwrap_or(name);
        Some(match name {
            "stats" => OwnerCommand::Stats,
            "gban" => OwnerCommand::GlobalBan,
            "ungban" => OwnerCommand::GlobalUnban,
            "toggle_access" => OwnerCommand::ToggleAccess,
            "broadcastall" => OwnerCommand::BroadcastAll,
            "broadcastuser" => OwnerCommand::BroadcastUser,
            "broadcast" => OwnerCommand::BroadcastChat,
            "broadcast_media" => OwnerCommand::BroadcastMedia,
            "delbroadcast" => OwnerCommand::DeleteBroadcasts,
            "ban" => OwnerCommand::Moderate(Moderation::Ban),
            "unban" => OwnerCommand::Moderate(Moderation::Unban),
            "mute" => OwnerCommand::Moderate(Moderation::Mute),
            "unmute" => OwnerCommand::Moderate(Moderation::Unmute),
            "kick" => OwnerCommand::Moderate(Moderation::Kick),
            "addadmin" => OwnerCommand::Moderate(Moderation::Promote),
            "download_db" | "getdb" => OwnerCommand::DownloadDb,
            _ => return None,
        })
    }
}

pub(super) async fn handle(
    state: &AppState,
    ctx: &Ctx,
    cmd: OwnerCommand,
    args: &str,
    reply_to: Option<&ReplyRef>,
) -> Result<()> {
    tracing::info!(command = ?cmd, "owner command");
    let args = args.trim();
    match cmd {
        OwnerCommand::Stats => stats(state, ctx).await,
        OwnerCommand::GlobalBan => global_ban(state, ctx, args).await,
        OwnerCommand::GlobalUnban => global_unban(state, ctx, args).await,
        OwnerCommand::ToggleAccess => {
            let public = state.settings.toggle_access().await?;
            let status = if public { "ON (Public)" } else { "OFF (Private)" };
            reply(state, ctx, &format!("🔐 <b>Global Access:</b> <code>{status}</code>")).await
        }
        OwnerCommand::BroadcastAll => broadcast_all(state, ctx, args).await,
        OwnerCommand::BroadcastUser => broadcast_one(state, ctx, args, Target::User).await,
        OwnerCommand::BroadcastChat => broadcast_one(state, ctx, args, Target::Chat).await,
        OwnerCommand::BroadcastMedia => broadcast_media(state, ctx, args, reply_to).await,
        OwnerCommand::DeleteBroadcasts => delete_broadcasts(state, ctx).await,
        OwnerCommand::Moderate(action) => moderate(state, ctx, action, args).await,
        OwnerCommand::DownloadDb => download_db(state, ctx).await,
    }
}

async fn reply(state: &AppState, ctx: &Ctx, html: &str) -> Result<()> {
    state.messenger.send_html(ctx.chat_id(), html).await?;
    Ok(())
}

async fn stats(state: &AppState, ctx: &Ctx) -> Result<()> {
    let users = state.persistence.list_users().await?;
    let groups = state.persistence.list_groups().await?;
    let totals = state.persistence.broadcast_totals().await?;
    let settings = state.settings.snapshot().await;

    let html = format!(
        "📊 <b>Bot Metrics Viewer</b>\n\n\
👤 <b>Users:</b> <code>{}</code>\n\
📡 <b>Groups:</b> <code>{}</code>\n\
⛔ <b>Banned:</b> <code>{}</code>\n\
🔐 <b>Access:</b> {}\n\n\
📢 <b>Broadcast Record:</b>\n\
🗂 Runs: {}\n\
✅ Delivered: {}\n\
❌ Failed: {}",
        thousands(users.len() as u64),
        thousands(groups.len() as u64),
        settings.banned_users.len(),
        if settings.global_access { "Public" } else { "Private" },
        thousands(totals.broadcasts),
        thousands(totals.sent),
        thousands(totals.failed),
    );
    reply(state, ctx, &html).await
}

async fn global_ban(state: &AppState, ctx: &Ctx, args: &str) -> Result<()> {
    if args.is_empty() {
        return reply(state, ctx, "💡 Usage: <code>/gban &lt;user_id&gt;</code>").await;
    }
    let Some(id) = parse_id(args) else {
        return reply(state, ctx, "❌ Invalid User ID.").await;
    };
    let target = UserId(id);
    if state.cfg.is_owner(target) {
        return reply(state, ctx, "🚫 You cannot ban the owner.").await;
    }
    if state.settings.ban(target).await? {
        tracing::info!(user_id = id, "user globally banned");
        reply(state, ctx, &format!("✅ 👤 User <code>{id}</code> has been globally banned.")).await
    } else {
        reply(state, ctx, "ℹ️ User is already banned.").await
    }
}

async fn global_unban(state: &AppState, ctx: &Ctx, args: &str) -> Result<()> {
    if args.is_empty() {
        return reply(state, ctx, "💡 Usage: <code>/ungban &lt;user_id&gt;</code>").await;
    }
    let Some(id) = parse_id(args) else {
        return reply(state, ctx, "❌ Invalid User ID.").await;
    };
    if state.settings.unban(UserId(id)).await? {
        tracing::info!(user_id = id, "user unbanned");
        reply(state, ctx, &format!("✅ 👤 User <code>{id}</code> has been unbanned.")).await
    } else {
        reply(state, ctx, "ℹ️ User is not banned.").await
    }
}

async fn broadcast_all(state: &AppState, ctx: &Ctx, args: &str) -> Result<()> {
    if args.is_empty() {
        return reply(state, ctx, "💡 Usage: <code>/broadcastall &lt;message&gt;</code>").await;
    }
    let status = state
        .messenger
        .send_html(ctx.chat_id(), "🚀 <b>Global Broadcast Initiated...</b>")
        .await?;

    let mut targets: Vec<ChatId> = state
        .persistence
        .list_users()
        .await?
        .into_iter()
        .map(|u| user_chat(u.id))
        .collect();
    targets.extend(state.persistence.list_groups().await?.into_iter().map(|g| g.id));

    let html = escape_html(args);
    let mut message_ids: Vec<(ChatId, MessageId)> = Vec::new();
    let mut failed = 0u32;
    for chat_id in targets {
        match state.messenger.send_html(chat_id, &html).await {
            Ok(sent) => message_ids.push((sent.chat_id, sent.message_id)),
            Err(e) => {
                tracing::debug!(chat_id = chat_id.0, "broadcast delivery failed: {e}");
                failed += 1;
            }
        }
    }

    let sent = message_ids.len() as u32;
    state
        .persistence
        .record_broadcast(&BroadcastRecord {
            text: args.to_string(),
            target: "all".to_string(),
            sent,
            failed,
            message_ids,
        })
        .await?;
    tracing::info!(sent, failed, "broadcast finished");

    state
        .messenger
        .edit_html(
            status,
            &format!("✨ <b>Broadcast Complete</b>\n\n✅ <b>Sent:</b> {sent}\n❌ <b>Failed:</b> {failed}"),
            None,
        )
        .await
}

#[derive(Clone, Copy)]
enum Target {
    User,
    Chat,
}

impl Target {
    fn command(self) -> &'static str {
        match self {
            Target::User => "broadcastuser",
            Target::Chat => "broadcast",
        }
    }

    fn record_name(self) -> &'static str {
        match self {
            Target::User => "users",
            Target::Chat => "groups",
        }
    }
}

/// `/broadcastuser <id> <msg>` and `/broadcast <chat_id> <msg>`.
async fn broadcast_one(state: &AppState, ctx: &Ctx, args: &str, target: Target) -> Result<()> {
    let parsed = args
        .split_once(char::is_whitespace)
        .and_then(|(id, text)| Some((parse_id(id)?, text.trim())))
        .filter(|(_, text)| !text.is_empty());
    let Some((id, text)) = parsed else {
        let usage = format!(
            "💡 <b>Usage:</b> <code>/{} [id] [msg]</code>",
            target.command()
        );
        return reply(state, ctx, &usage).await;
    };

    let chat_id = ChatId(id);
    let (sent, failed, message_ids, answer) =
        match state.messenger.send_html(chat_id, &escape_html(text)).await {
            Ok(m) => (
                1,
                0,
                vec![(m.chat_id, m.message_id)],
                format!("✅ <b>Message Sent to:</b> <code>{id}</code>"),
            ),
            Err(e) => (
                0,
                1,
                Vec::new(),
                format!(
                    "❌ <b>Delivery Failed:</b>\n<code>{}</code>",
                    escape_html(&e.to_string())
                ),
            ),
        };

    state
        .persistence
        .record_broadcast(&BroadcastRecord {
            text: text.to_string(),
            target: target.record_name().to_string(),
            sent,
            failed,
            message_ids,
        })
        .await?;
    reply(state, ctx, &answer).await
}

/// Copy the replied-to media message into every group. The arguments, when
/// given, replace its caption.
async fn broadcast_media(
    state: &AppState,
    ctx: &Ctx,
    args: &str,
    reply_to: Option<&ReplyRef>,
) -> Result<()> {
    let Some(original) = reply_to else {
        return reply(
            state,
            ctx,
            "💡 Usage: reply to a photo or file with <code>/broadcast_media [caption]</code>",
        )
        .await;
    };
    let source = MessageRef {
        chat_id: ctx.chat_id(),
        message_id: original.message_id,
    };
    let caption = (!args.is_empty()).then(|| escape_html(args));

    let mut message_ids: Vec<(ChatId, MessageId)> = Vec::new();
    let mut failed = 0u32;
    for group in state.persistence.list_groups().await? {
        match state
            .messenger
            .copy_message(group.id, source, caption.as_deref())
            .await
        {
            Ok(sent) => message_ids.push((sent.chat_id, sent.message_id)),
            Err(e) => {
                tracing::debug!(chat_id = group.id.0, "media broadcast failed: {e}");
                failed += 1;
            }
        }
    }

    let sent = message_ids.len() as u32;
    let label: String = args.chars().take(50).collect();
    state
        .persistence
        .record_broadcast(&BroadcastRecord {
            text: format!("[Media] {label}"),
            target: "groups".to_string(),
            sent,
            failed,
            message_ids,
        })
        .await?;
    tracing::info!(sent, failed, "media broadcast finished");
    reply(
        state,
        ctx,
        &format!("✨ <b>Media Blast</b>\n\n✅ <b>Sent:</b> {sent}\n❌ <b>Failed:</b> {failed}"),
    )
    .await
}

async fn download_db(state: &AppState, ctx: &Ctx) -> Result<()> {
    let path = &state.cfg.database_path;
    let exists = tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false);
    if !exists {
        return reply(state, ctx, "❌ <b>Database file not found!</b>").await;
    }
    let caption = "📂 <b>Database Backup</b>\n\n<i>Current state of the bot database.</i>";
    match state
        .messenger
        .send_document(ctx.chat_id(), path, "bot_backup_hinata.db", caption)
        .await
    {
        Ok(_) => {
            tracing::info!(path = %path.display(), "database backup sent");
            Ok(())
        }
        Err(e) => reply(state, ctx, &e.user_html()).await,
    }
}

async fn delete_broadcasts(state: &AppState, ctx: &Ctx) -> Result<()> {
    let ids = state.persistence.drain_broadcast_messages().await?;
    if ids.is_empty() {
        return reply(state, ctx, "ℹ️ No broadcast messages to delete.").await;
    }
    let status = state
        .messenger
        .send_html(
            ctx.chat_id(),
            &format!("🧹 <b>Cleaning up {} messages...</b>", ids.len()),
        )
        .await?;

    let (mut deleted, mut failed) = (0u32, 0u32);
    for (chat_id, message_id) in ids {
        let msg = MessageRef { chat_id, message_id };
        match state.messenger.delete_message(msg).await {
            Ok(()) => deleted += 1,
            Err(e) => {
                tracing::debug!(chat_id = chat_id.0, "broadcast delete failed: {e}");
                failed += 1;
            }
        }
    }
    state
        .messenger
        .edit_html(
            status,
            &format!("✨ <b>Cleanup Complete</b>\n\n🗑 Deleted: {deleted}\n❌ Failed: {failed}"),
            None,
        )
        .await
}

/// `/ban|unban|mute|unmute|kick|addadmin <chat_id> <user_id>`.
async fn moderate(state: &AppState, ctx: &Ctx, action: Moderation, args: &str) -> Result<()> {
    let mut parts = args.split_whitespace().map(parse_id);
    let (Some(Some(chat)), Some(Some(user))) = (parts.next(), parts.next()) else {
        return reply(
            state,
            ctx,
            "💡 Usage: <code>/&lt;ban|unban|mute|unmute|kick|addadmin&gt; &lt;chat_id&gt; &lt;user_id&gt;</code>",
        )
        .await;
    };

    let html = match state.messenger.moderate(ChatId(chat), UserId(user), action).await {
        Ok(()) => {
            tracing::info!(chat_id = chat, user_id = user, action = action.past_tense(), "moderation applied");
            format!(
                "✅ 👤 User <code>{user}</code> {} in <code>{chat}</code>.",
                action.past_tense()
            )
        }
        Err(e) => format!("❌ Failed: {}", escape_html(&e.to_string())),
    };
    reply(state, ctx, &html).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use hnb_core::{
        messaging::recording::Sent,
        ports::Persistence,
        security::BANNED_HTML,
    };

    use crate::handlers::test_support::*;

    #[test]
    fn parses_every_owner_command() {
        for name in [
            "stats", "gban", "ungban", "toggle_access", "broadcastall", "broadcastuser",
            "broadcast", "broadcast_media", "delbroadcast", "ban", "unban", "mute", "unmute",
            "kick", "addadmin", "download_db", "getdb",
        ] {
            assert!(OwnerCommand::parse(name).is_some(), "{name}");
            assert_eq!(
                OwnerCommand::parse(&format!("s_{name}")),
                OwnerCommand::parse(name),
                "s_{name}"
            );
        }
        assert_eq!(OwnerCommand::parse("start"), None);
        assert_eq!(OwnerCommand::parse("s_start"), None);
    }

    #[tokio::test]
    async fn prefixed_owner_command_runs() {
        let h = Harness::new().await;

        h.command(&private_chat(1), &owner(), "/s_gban 60").await;

        assert!(h.state.settings.snapshot().await.is_banned(UserId(60)));
    }

    #[tokio::test]
    async fn addadmin_promotes_in_the_given_chat() {
        let h = Harness::new().await;

        h.command(&private_chat(1), &owner(), "/s_addadmin -100 42").await;

        let sent = h.messenger.sent();
        assert_eq!(sent[0], Sent::Moderation(ChatId(-100), UserId(42), Moderation::Promote));
        assert_eq!(
            sent[1].text(),
            Some("✅ 👤 User <code>42</code> promoted to admin in <code>-100</code>.")
        );
    }

    #[tokio::test]
    async fn media_broadcast_copies_the_replied_message_to_groups() {
        let h = Harness::new().await;
        h.command(&group_chat(-100), &user(20, "Bob"), "/coin").await;
        h.command(&group_chat(-200), &user(20, "Bob"), "/coin").await;
        h.messenger.clear();
        let chat = private_chat(1);

        h.command(&chat, &owner(), "/broadcast_media").await;
        h.command_replying(&chat, &owner(), "/broadcast_media new <b>", MessageId(55), &owner())
            .await;

        let sent = h.messenger.sent();
        assert!(sent[0].text().unwrap().contains("reply to a photo"));
        let copies: Vec<_> = sent
            .iter()
            .filter_map(|s| match s {
                Sent::Copy { to, from, caption } => Some((*to, *from, caption.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(copies.len(), 2);
        for (_, from, caption) in &copies {
            assert_eq!(from.message_id, MessageId(55));
            assert_eq!(from.chat_id, ChatId(1));
            assert_eq!(caption.as_deref(), Some("new &lt;b&gt;"));
        }
        assert!(h.messenger.texts().last().unwrap().contains("<b>Sent:</b> 2"));

        let totals = h.persistence.broadcast_totals().await.unwrap();
        assert_eq!((totals.broadcasts, totals.sent), (1, 2));
    }

    #[tokio::test]
    async fn database_backup_needs_the_file() {
        let dir = std::env::temp_dir().join(format!("hnb-db-backup-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let db = dir.join("bot.db");
        std::fs::write(&db, b"SQLite format 3").unwrap();

        let present = Harness::with_config(|cfg| cfg.database_path = db.clone()).await;
        present.command(&private_chat(1), &owner(), "/getdb").await;
        assert_eq!(
            present.messenger.sent(),
            vec![Sent::Document {
                chat_id: ChatId(1),
                filename: "bot_backup_hinata.db".into(),
                caption: "📂 <b>Database Backup</b>\n\n<i>Current state of the bot database.</i>"
                    .into(),
            }]
        );

        let missing =
            Harness::with_config(|cfg| cfg.database_path = dir.join("missing.db")).await;
        missing.command(&private_chat(1), &owner(), "/s_download_db").await;
        assert_eq!(missing.messenger.texts(), vec!["❌ <b>Database file not found!</b>"]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn gban_locks_the_user_out() {
        let h = Harness::new().await;
        let owner_chat = private_chat(1);

        h.command(&owner_chat, &owner(), "/gban 50").await;
        h.command(&owner_chat, &owner(), "/gban 50").await;
        h.command(&owner_chat, &owner(), "/gban 1").await;
        h.command(&private_chat(50), &user(50, "Zed"), "/start").await;

        let texts = h.messenger.texts();
        assert_eq!(texts[0], "✅ 👤 User <code>50</code> has been globally banned.");
        assert_eq!(texts[1], "ℹ️ User is already banned.");
        assert_eq!(texts[2], "🚫 You cannot ban the owner.");
        assert_eq!(texts[3], BANNED_HTML);

        h.command(&owner_chat, &owner(), "/ungban 50").await;
        assert!(!h.state.settings.snapshot().await.is_banned(UserId(50)));
    }

    #[tokio::test]
    async fn broadcast_reaches_everyone_and_can_be_deleted() {
        let h = Harness::new().await;
        h.command(&private_chat(10), &user(10, "Alice"), "/coin").await;
        h.command(&group_chat(-100), &user(20, "Bob"), "/coin").await;
        h.messenger.clear();

        h.command(&private_chat(1), &owner(), "/broadcastall hello <all>").await;

        let delivered: Vec<ChatId> = h
            .messenger
            .sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Html { chat_id, html, .. } if html == "hello &lt;all&gt;" => Some(chat_id),
                _ => None,
            })
            .collect();
        // Alice, Bob, the owner, and the group.
        assert_eq!(delivered.len(), 4, "{delivered:?}");
        assert!(delivered.contains(&ChatId(-100)));
        assert!(h.messenger.texts().last().unwrap().contains("<b>Sent:</b> 4"));

        let totals = h.persistence.broadcast_totals().await.unwrap();
        assert_eq!((totals.broadcasts, totals.sent, totals.failed), (1, 4, 0));

        h.messenger.clear();
        h.command(&private_chat(1), &owner(), "/delbroadcast").await;
        let deletes = h
            .messenger
            .sent()
            .into_iter()
            .filter(|s| matches!(s, Sent::Delete(_)))
            .count();
        assert_eq!(deletes, 4);
        assert!(h.persistence.drain_broadcast_messages().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn single_target_broadcast_needs_id_and_text() {
        let h = Harness::new().await;
        let chat = private_chat(1);

        h.command(&chat, &owner(), "/broadcastuser 77").await;
        h.command(&chat, &owner(), "/broadcastuser 77 hi there").await;

        let sent = h.messenger.sent();
        assert!(sent[0].text().unwrap().contains("/broadcastuser [id] [msg]"));
        assert_eq!(
            sent[1],
            Sent::Html {
                chat_id: ChatId(77),
                html: "hi there".to_string(),
                keyboard: None,
            }
        );
    }

    #[tokio::test]
    async fn moderation_takes_chat_then_user() {
        let h = Harness::new().await;

        h.command(&private_chat(1), &owner(), "/mute -100 42").await;

        let sent = h.messenger.sent();
        assert_eq!(sent[0], Sent::Moderation(ChatId(-100), UserId(42), Moderation::Mute));
        assert_eq!(
            sent[1].text(),
            Some("✅ 👤 User <code>42</code> muted in <code>-100</code>.")
        );
    }
}
