//! In-process messenger that records every outbound call. Used by handler tests.

use std::{
    path::Path,
    sync::{
        atomic::{AtomicI32, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageId, MessageRef, UserId},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{
            ChatAction, InlineKeyboard, MessagingCapabilities, Moderation, UserLookup,
            UserProfile,
        },
    },
    Result,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Sent {
    Html {
        chat_id: ChatId,
        html: String,
        keyboard: Option<InlineKeyboard>,
    },
    Edit {
        msg: MessageRef,
        html: String,
        keyboard: Option<InlineKeyboard>,
    },
    Delete(MessageRef),
    Action(ChatId, ChatAction),
    Photo {
        chat_id: ChatId,
        url: String,
        caption: String,
    },
    Album(ChatId, Vec<String>),
    Document {
        chat_id: ChatId,
        filename: String,
        caption: String,
    },
    Dice(ChatId),
    Copy {
        to: ChatId,
        from: MessageRef,
        caption: Option<String>,
    },
    CallbackAnswer {
        id: String,
        text: Option<String>,
        alert: bool,
    },
    Moderation(ChatId, UserId, Moderation),
    Commands(usize),
}

impl Sent {
    /// Text of a sent or edited message (or photo caption).
    pub fn text(&self) -> Option<&str> {
        match self {
            Sent::Html { html, .. } | Sent::Edit { html, .. } => Some(html),
            Sent::Photo { caption, .. } | Sent::Document { caption, .. } => Some(caption),
            _ => None,
        }
    }

    pub fn keyboard(&self) -> Option<&InlineKeyboard> {
        match self {
            Sent::Html { keyboard, .. } | Sent::Edit { keyboard, .. } => keyboard.as_ref(),
            _ => None,
        }
    }
}

#[derive(Default)]
pub struct RecordingMessenger {
    log: Mutex<Vec<Sent>>,
    next_id: AtomicI32,
    profiles: Mutex<Vec<UserProfile>>,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self {
            log: Mutex::new(Vec::new()),
            next_id: AtomicI32::new(100),
            profiles: Mutex::new(Vec::new()),
        }
    }

    /// Make `profile` visible to `lookup_user`.
    pub fn add_profile(&self, profile: UserProfile) {
        if let Ok(mut p) = self.profiles.lock() {
            p.push(profile);
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Texts of every sent/edited message, in order.
    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .iter()
            .filter_map(|s| s.text().map(str::to_string))
            .collect()
    }

    pub fn last(&self) -> Option<Sent> {
        self.sent().pop()
    }

    pub fn clear(&self) {
        if let Ok(mut l) = self.log.lock() {
            l.clear();
        }
    }

    fn push(&self, s: Sent) {
        if let Ok(mut l) = self.log.lock() {
            l.push(s);
        }
    }

    fn next_ref(&self, chat_id: ChatId) -> MessageRef {
        MessageRef {
            chat_id,
            message_id: MessageId(self.next_id.fetch_add(1, Ordering::SeqCst)),
        }
    }
}

#[async_trait]
impl MessagingPort for RecordingMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_html: true,
            supports_edit: true,
            supports_inline_keyboards: true,
            max_message_len: 4096,
        }
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        self.push(Sent::Html {
            chat_id,
            html: html.to_string(),
            keyboard: None,
        });
        Ok(self.next_ref(chat_id))
    }

    async fn send_keyboard(
        &self,
        chat_id: ChatId,
        html: &str,
        keyboard: InlineKeyboard,
    ) -> Result<MessageRef> {
        self.push(Sent::Html {
            chat_id,
            html: html.to_string(),
            keyboard: Some(keyboard),
        });
        Ok(self.next_ref(chat_id))
    }

    async fn edit_html(
        &self,
        msg: MessageRef,
        html: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<()> {
        self.push(Sent::Edit {
            msg,
            html: html.to_string(),
            keyboard,
        });
        Ok(())
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        self.push(Sent::Delete(msg));
        Ok(())
    }

    async fn send_chat_action(&self, chat_id: ChatId, action: ChatAction) -> Result<()> {
        self.push(Sent::Action(chat_id, action));
        Ok(())
    }

    async fn send_photo(
        &self,
        chat_id: ChatId,
        url: &str,
        caption_html: &str,
    ) -> Result<MessageRef> {
        self.push(Sent::Photo {
            chat_id,
            url: url.to_string(),
            caption: caption_html.to_string(),
        });
        Ok(self.next_ref(chat_id))
    }

    async fn send_photo_group(&self, chat_id: ChatId, urls: &[String]) -> Result<()> {
        self.push(Sent::Album(chat_id, urls.to_vec()));
        Ok(())
    }

    async fn answer_callback_query(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<()> {
        self.push(Sent::CallbackAnswer {
            id: callback_id.to_string(),
            text: text.map(str::to_string),
            alert: show_alert,
        });
        Ok(())
    }

    async fn send_document(
        &self,
        chat_id: ChatId,
        _path: &Path,
        filename: &str,
        caption_html: &str,
    ) -> Result<MessageRef> {
        self.push(Sent::Document {
            chat_id,
            filename: filename.to_string(),
            caption: caption_html.to_string(),
        });
        Ok(self.next_ref(chat_id))
    }

    async fn send_dice(&self, chat_id: ChatId) -> Result<MessageRef> {
        self.push(Sent::Dice(chat_id));
        Ok(self.next_ref(chat_id))
    }

    async fn copy_message(
        &self,
        to: ChatId,
        from: MessageRef,
        caption_html: Option<&str>,
    ) -> Result<MessageRef> {
        self.push(Sent::Copy {
            to,
            from,
            caption: caption_html.map(str::to_string),
        });
        Ok(self.next_ref(to))
    }

    async fn moderate(&self, chat_id: ChatId, user_id: UserId, action: Moderation) -> Result<()> {
        self.push(Sent::Moderation(chat_id, user_id, action));
        Ok(())
    }

    async fn lookup_user(&self, who: &UserLookup) -> Result<UserProfile> {
        let profiles = self.profiles.lock().map(|p| p.clone()).unwrap_or_default();
        profiles
            .into_iter()
            .find(|p| match who {
                UserLookup::Id(id) => p.id == *id,
                UserLookup::Username(name) => p
                    .username
                    .as_deref()
                    .is_some_and(|u| u.eq_ignore_ascii_case(name)),
            })
            .ok_or_else(|| Error::External("Bad Request: chat not found".to_string()))
    }

    async fn set_commands(&self, commands: &[(&'static str, &'static str)]) -> Result<()> {
        self.push(Sent::Commands(commands.len()));
        Ok(())
    }
}
