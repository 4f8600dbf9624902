//! Telegram update types → `hnb-core` update model.

use teloxide::types::{Chat, ChatMemberUpdated, Message, User};

use hnb_core::{
    domain::{ChatId, ChatInfo, ChatKind, MessageId, MessageRef, Sender, UserId},
    messaging::types::{
        CallbackQuery, CommandMessage, IncomingUpdate, MembershipChange, ReplyRef, TextMessage,
    },
};

use crate::router::BotIdentity;

pub(crate) fn chat_info(chat: &Chat) -> ChatInfo {
    let kind = if chat.is_private() {
        ChatKind::Private
    } else if chat.is_supergroup() {
        ChatKind::Supergroup
    } else if chat.is_group() {
        ChatKind::Group
    } else {
        ChatKind::Channel
    };
    ChatInfo {
        id: ChatId(chat.id.0),
        kind,
        title: chat.title().map(str::to_string),
    }
}

pub(crate) fn sender(user: &User) -> Sender {
    Sender {
        id: UserId(user.id.0 as i64),
        first_name: user.first_name.clone(),
        full_name: user.full_name(),
        username: user.username.clone(),
        is_premium: user.is_premium,
        language_code: user.language_code.clone(),
    }
}

/// Text messages only; media and service messages are ignored.
pub(crate) fn message_update(msg: &Message, me: &BotIdentity) -> Option<IncomingUpdate> {
    let user = msg.from()?;
    let text = msg.text()?;
    let chat = chat_info(&msg.chat);
    let sender = sender(user);
    let message_id = MessageId(msg.id.0);

    if text.trim_start().starts_with('/') {
        let mut cmd =
            CommandMessage::parse(chat, sender, message_id, text, me.username.as_deref())?;
        cmd.reply_to = msg.reply_to_message().map(|r| ReplyRef {
            message_id: MessageId(r.id.0),
            author: r.from().map(self::sender),
        });
        return Some(IncomingUpdate::Command(cmd));
    }

    let reply_to_bot = match (me.id, msg.reply_to_message().and_then(|r| r.from())) {
        (Some(bot_id), Some(author)) => author.id.0 as i64 == bot_id.0,
        _ => false,
    };
    Some(IncomingUpdate::Text(TextMessage {
        chat,
        sender,
        message_id,
        text: text.to_string(),
        reply_to_bot,
    }))
}

pub(crate) fn callback_update(q: &teloxide::types::CallbackQuery) -> IncomingUpdate {
    let message = q.message.as_ref().map(|m| MessageRef {
        chat_id: ChatId(m.chat.id.0),
        message_id: MessageId(m.id.0),
    });
    IncomingUpdate::Callback(CallbackQuery {
        sender: sender(&q.from),
        callback_id: q.id.clone(),
        data: q.data.clone().unwrap_or_default(),
        message,
        chat: q.message.as_ref().map(|m| chat_info(&m.chat)),
    })
}

/// The bot's own membership changed. `None` when presence did not flip.
pub(crate) fn membership_update(
    upd: &ChatMemberUpdated,
    member_count: Option<u32>,
) -> Option<IncomingUpdate> {
    let was = upd.old_chat_member.kind.is_present();
    let is = upd.new_chat_member.kind.is_present();
    if was == is {
        return None;
    }
    Some(IncomingUpdate::Membership(MembershipChange {
        chat: chat_info(&upd.chat),
        joined: is,
        member_count,
    }))
}
