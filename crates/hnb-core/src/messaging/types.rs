use crate::{
    actions::CallbackAction,
    domain::{ChatInfo, MessageId, MessageRef, Sender},
};

/// Cross-messenger incoming update model.
///
/// Telegram-specific fields stay in the Telegram adapter.
#[derive(Clone, Debug)]
pub enum IncomingUpdate {
    Command(CommandMessage),
    Text(TextMessage),
    Callback(CallbackQuery),
    Membership(MembershipChange),
}

#[derive(Clone, Debug)]
pub struct CommandMessage {
    pub chat: ChatInfo,
    pub sender: Sender,
    pub message_id: MessageId,
    /// Lower-cased command name without the slash or `@botname`.
    pub name: String,
    pub args: String,
    /// The message this command replies to, when any.
    pub reply_to: Option<ReplyRef>,
}

/// The message a command was sent in reply to.
#[derive(Clone, Debug)]
pub struct ReplyRef {
    pub message_id: MessageId,
    pub author: Option<Sender>,
}

impl CommandMessage {
    /// Parse `/cmd@botname args`. `None` when the text is not a command or is
    /// addressed to another bot.
    pub fn parse(
        chat: ChatInfo,
        sender: Sender,
        message_id: MessageId,
        text: &str,
        bot_username: Option<&str>,
    ) -> Option<Self> {
        let rest = text.trim_start().strip_prefix('/')?;
        let (head, args) = match rest.find(char::is_whitespace) {
            Some(i) => (&rest[..i], rest[i..].trim()),
            None => (rest, ""),
        };
        let (name, target) = match head.split_once('@') {
            Some((n, t)) => (n, Some(t)),
            None => (head, None),
        };
        if name.is_empty() {
            return None;
        }
        if let (Some(target), Some(me)) = (target, bot_username) {
            if !target.eq_ignore_ascii_case(me) {
                return None;
            }
        }
        Some(Self {
            chat,
            sender,
            message_id,
            name: name.to_ascii_lowercase(),
            args: args.to_string(),
            reply_to: None,
        })
    }
}

#[derive(Clone, Debug)]
pub struct TextMessage {
    pub chat: ChatInfo,
    pub sender: Sender,
    pub message_id: MessageId,
    pub text: String,
    /// The message replies to one of the bot's own messages.
    pub reply_to_bot: bool,
}

#[derive(Clone, Debug)]
pub struct CallbackQuery {
    pub sender: Sender,
    pub callback_id: String,
    pub data: String,
    /// Message the button is attached to. Absent for inline-mode messages.
    pub message: Option<MessageRef>,
    pub chat: Option<ChatInfo>,
}

impl CallbackQuery {
    pub fn action(&self) -> Option<CallbackAction> {
        CallbackAction::parse(&self.data)
    }
}

/// The bot's own membership in a chat changed.
#[derive(Clone, Debug)]
pub struct MembershipChange {
    pub chat: ChatInfo,
    pub joined: bool,
    pub member_count: Option<u32>,
}

/// Outgoing "chat action" (typing indicator, etc).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatAction {
    Typing,
    UploadPhoto,
}

/// Owner moderation actions on a group member.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Moderation {
    Ban,
    Unban,
    Mute,
    Unmute,
    Kick,
    /// Grant full admin rights.
    Promote,
}

impl Moderation {
    pub fn past_tense(self) -> &'static str {
        match self {
            Moderation::Ban => "banned",
            Moderation::Unban => "unbanned",
            Moderation::Mute => "muted",
            Moderation::Unmute => "unmuted",
            Moderation::Kick => "kicked",
            Moderation::Promote => "promoted to admin",
        }
    }
}

/// Who to look up: a numeric id or a public `@username`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserLookup {
    Id(i64),
    Username(String),
}

impl UserLookup {
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim().trim_start_matches('@');
        if text.is_empty() {
            return None;
        }
        match text.parse::<i64>() {
            Ok(id) => Some(UserLookup::Id(id)),
            Err(_) => Some(UserLookup::Username(text.to_string())),
        }
    }
}

/// Public profile of a Telegram user.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserProfile {
    pub id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub bio: Option<String>,
    pub is_premium: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ButtonKind {
    Callback(String),
    Url(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    pub kind: ButtonKind,
}

impl InlineButton {
    pub fn action(label: impl Into<String>, action: CallbackAction) -> Self {
        Self {
            label: label.into(),
            kind: ButtonKind::Callback(action.to_data()),
        }
    }

    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            kind: ButtonKind::Url(url.into()),
        }
    }
}

/// Inline keyboard, row by row.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

impl InlineKeyboard {
    pub fn new(rows: Vec<Vec<InlineButton>>) -> Self {
        Self { rows }
    }

    /// Lay buttons out `per_row` at a time.
    pub fn grid(buttons: Vec<InlineButton>, per_row: usize) -> Self {
        let per_row = per_row.max(1);
        let mut rows = Vec::new();
        let mut it = buttons.into_iter().peekable();
        while it.peek().is_some() {
            rows.push(it.by_ref().take(per_row).collect());
        }
        Self { rows }
    }

    pub fn push_row(mut self, row: Vec<InlineButton>) -> Self {
        self.rows.push(row);
        self
    }

    /// Every callback payload, in layout order.
    pub fn callback_data(&self) -> Vec<&str> {
        self.rows
            .iter()
            .flatten()
            .filter_map(|b| match &b.kind {
                ButtonKind::Callback(d) => Some(d.as_str()),
                ButtonKind::Url(_) => None,
            })
            .collect()
    }
}

/// Capabilities / feature flags of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub supports_html: bool,
    pub supports_edit: bool,
    pub supports_inline_keyboards: bool,
    pub max_message_len: usize,
}
