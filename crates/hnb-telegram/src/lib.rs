//! Telegram adapter (teloxide).
//!
//! This crate implements the `hnb-core` MessagingPort over the Telegram Bot API
//! and routes incoming updates to the handlers.

use std::path::Path;

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{
        BotCommand, ChatPermissions, InlineKeyboardButton, InlineKeyboardMarkup, InputFile,
        InputMedia, InputMediaPhoto, ParseMode, Recipient,
    },
    ApiError, RequestError,
};

use tokio::time::sleep;

mod convert;
pub mod handlers;
pub mod router;

use hnb_core::{
    domain::{ChatId, MessageId, MessageRef, UserId},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{
            ButtonKind, ChatAction, InlineKeyboard, MessagingCapabilities, Moderation, UserLookup,
            UserProfile,
        },
    },
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    fn tg_user(user_id: UserId) -> teloxide::types::UserId {
        teloxide::types::UserId(user_id.0 as u64)
    }

    fn map_err(e: RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    fn parse_url(url: &str) -> Result<reqwest::Url> {
        reqwest::Url::parse(url).map_err(|e| Error::External(format!("invalid url {url:?}: {e}")))
    }

    fn markup(keyboard: InlineKeyboard) -> InlineKeyboardMarkup {
        let rows: Vec<Vec<InlineKeyboardButton>> = keyboard
            .rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .filter_map(|b| match b.kind {
                        ButtonKind::Callback(data) => {
                            Some(InlineKeyboardButton::callback(b.label, data))
                        }
                        ButtonKind::Url(url) => match reqwest::Url::parse(&url) {
                            Ok(url) => Some(InlineKeyboardButton::url(b.label, url)),
                            Err(e) => {
                                tracing::warn!(%url, "dropping url button: {e}");
                                None
                            }
                        },
                    })
                    .collect()
            })
            .filter(|row: &Vec<InlineKeyboardButton>| !row.is_empty())
            .collect();
        InlineKeyboardMarkup::new(rows)
    }

    fn message_ref(chat_id: ChatId, msg: &Message) -> MessageRef {
        MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        }
    }

    /// Run a request, sleeping through one `RetryAfter` flood wait.
    async fn retry_raw<T, Fut>(
        &self,
        mut op: impl FnMut() -> Fut,
    ) -> std::result::Result<T, RequestError>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(RequestError::RetryAfter(d)) if attempts < MAX_RETRIES => {
                    attempts += 1;
                    tracing::warn!(wait_secs = d.as_secs(), "telegram flood wait");
                    sleep(d).await;
                }
                Err(other) => return Err(other),
            }
        }
    }

    async fn with_retry<T, Fut>(&self, op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, RequestError>>,
        Fut::IntoFuture: Send,
    {
        self.retry_raw(op).await.map_err(Self::map_err)
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_html: true,
            supports_edit: true,
            supports_inline_keyboards: true,
            max_message_len: 4096,
        }
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| {
                self.bot
                    .send_message(Self::tg_chat(chat_id), html.to_string())
                    .parse_mode(ParseMode::Html)
                    .disable_web_page_preview(true)
            })
            .await?;
        Ok(Self::message_ref(chat_id, &msg))
    }

    async fn send_keyboard(
        &self,
        chat_id: ChatId,
        html: &str,
        keyboard: InlineKeyboard,
    ) -> Result<MessageRef> {
        let markup = Self::markup(keyboard);
        let msg = self
            .with_retry(|| {
                self.bot
                    .send_message(Self::tg_chat(chat_id), html.to_string())
                    .parse_mode(ParseMode::Html)
                    .disable_web_page_preview(true)
                    .reply_markup(markup.clone())
            })
            .await?;
        Ok(Self::message_ref(chat_id, &msg))
    }

    async fn edit_html(
        &self,
        msg: MessageRef,
        html: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<()> {
        let markup = keyboard.map(Self::markup);
        let res = self
            .retry_raw(|| {
                let req = self
                    .bot
                    .edit_message_text(
                        Self::tg_chat(msg.chat_id),
                        Self::tg_msg_id(msg.message_id),
                        html.to_string(),
                    )
                    .parse_mode(ParseMode::Html)
                    .disable_web_page_preview(true);
                match &markup {
                    Some(m) => req.reply_markup(m.clone()),
                    None => req,
                }
            })
            .await;
        match res {
            Ok(_) => Ok(()),
            // Same text and keyboard as before.
            Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
            Err(e) => Err(Self::map_err(e)),
        }
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        self.with_retry(|| {
            self.bot
                .delete_message(Self::tg_chat(msg.chat_id), Self::tg_msg_id(msg.message_id))
        })
        .await?;
        Ok(())
    }

    async fn send_chat_action(&self, chat_id: ChatId, action: ChatAction) -> Result<()> {
        let tg_action = match action {
            ChatAction::Typing => teloxide::types::ChatAction::Typing,
            ChatAction::UploadPhoto => teloxide::types::ChatAction::UploadPhoto,
        };
        self.with_retry(|| self.bot.send_chat_action(Self::tg_chat(chat_id), tg_action))
            .await?;
        Ok(())
    }

    async fn send_photo(
        &self,
        chat_id: ChatId,
        url: &str,
        caption_html: &str,
    ) -> Result<MessageRef> {
        let photo = InputFile::url(Self::parse_url(url)?);
        let msg = self
            .with_retry(|| {
                self.bot
                    .send_photo(Self::tg_chat(chat_id), photo.clone())
                    .caption(caption_html.to_string())
                    .parse_mode(ParseMode::Html)
            })
            .await?;
        Ok(Self::message_ref(chat_id, &msg))
    }

    async fn send_photo_group(&self, chat_id: ChatId, urls: &[String]) -> Result<()> {
        let media = urls
            .iter()
            .map(|u| {
                Self::parse_url(u)
                    .map(|url| InputMedia::Photo(InputMediaPhoto::new(InputFile::url(url))))
            })
            .collect::<Result<Vec<_>>>()?;
        if media.is_empty() {
            return Ok(());
        }
        self.with_retry(|| {
            self.bot
                .send_media_group(Self::tg_chat(chat_id), media.clone())
        })
        .await?;
        Ok(())
    }

    async fn answer_callback_query(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<()> {
        self.with_retry(|| {
            let mut req = self
                .bot
                .answer_callback_query(callback_id.to_string())
                .show_alert(show_alert);
            if let Some(t) = text {
                req = req.text(t.to_string());
            }
            req
        })
        .await?;
        Ok(())
    }

    async fn send_document(
        &self,
        chat_id: ChatId,
        path: &Path,
        filename: &str,
        caption_html: &str,
    ) -> Result<MessageRef> {
        let file = InputFile::file(path.to_path_buf()).file_name(filename.to_string());
        let msg = self
            .with_retry(|| {
                self.bot
                    .send_document(Self::tg_chat(chat_id), file.clone())
                    .caption(caption_html.to_string())
                    .parse_mode(ParseMode::Html)
            })
            .await?;
        Ok(Self::message_ref(chat_id, &msg))
    }

    async fn send_dice(&self, chat_id: ChatId) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| self.bot.send_dice(Self::tg_chat(chat_id)))
            .await?;
        Ok(Self::message_ref(chat_id, &msg))
    }

    async fn copy_message(
        &self,
        to: ChatId,
        from: MessageRef,
        caption_html: Option<&str>,
    ) -> Result<MessageRef> {
        let id = self
            .with_retry(|| {
                let req = self.bot.copy_message(
                    Self::tg_chat(to),
                    Self::tg_chat(from.chat_id),
                    Self::tg_msg_id(from.message_id),
                );
                match caption_html {
                    Some(c) => req.caption(c.to_string()).parse_mode(ParseMode::Html),
                    None => req,
                }
            })
            .await?;
        Ok(MessageRef {
            chat_id: to,
            message_id: MessageId(id.0),
        })
    }

    async fn moderate(&self, chat_id: ChatId, user_id: UserId, action: Moderation) -> Result<()> {
        let chat = Self::tg_chat(chat_id);
        let user = Self::tg_user(user_id);
        match action {
            Moderation::Ban => {
                self.with_retry(|| self.bot.ban_chat_member(chat, user))
                    .await?;
            }
            Moderation::Unban => {
                self.with_retry(|| self.bot.unban_chat_member(chat, user).only_if_banned(true))
                    .await?;
            }
            Moderation::Mute => {
                self.with_retry(|| {
                    self.bot
                        .restrict_chat_member(chat, user, ChatPermissions::empty())
                })
                .await?;
            }
            Moderation::Unmute => {
                self.with_retry(|| self.bot.restrict_chat_member(chat, user, ChatPermissions::all()))
                    .await?;
            }
            Moderation::Kick => {
                // Ban then lift it: removes the member without blocking a rejoin.
                self.with_retry(|| self.bot.ban_chat_member(chat, user))
                    .await?;
                self.with_retry(|| self.bot.unban_chat_member(chat, user))
                    .await?;
            }
            Moderation::Promote => {
                self.with_retry(|| {
                    self.bot
                        .promote_chat_member(chat, user)
                        .can_manage_chat(true)
                        .can_delete_messages(true)
                        .can_manage_video_chats(true)
                        .can_restrict_members(true)
                        .can_promote_members(true)
                        .can_change_info(true)
                        .can_invite_users(true)
                        .can_pin_messages(true)
                })
                .await?;
            }
        }
        Ok(())
    }

    async fn lookup_user(&self, who: &UserLookup) -> Result<UserProfile> {
        let recipient = match who {
            UserLookup::Id(id) => Recipient::Id(teloxide::types::ChatId(*id)),
            UserLookup::Username(name) => Recipient::ChannelUsername(format!("@{name}")),
        };
        let chat = self
            .with_retry(|| self.bot.get_chat(recipient.clone()))
            .await?;
        Ok(UserProfile {
            id: chat.id.0,
            first_name: chat.first_name().unwrap_or_default().to_string(),
            last_name: chat.last_name().map(str::to_string),
            username: chat.username().map(str::to_string),
            bio: chat.bio().map(str::to_string),
            // Not exposed through getChat.
            is_premium: false,
        })
    }

    async fn set_commands(&self, commands: &[(&'static str, &'static str)]) -> Result<()> {
        let list: Vec<BotCommand> = commands
            .iter()
            .map(|(name, description)| BotCommand::new(*name, *description))
            .collect();
        self.with_retry(|| self.bot.set_my_commands(list.clone()))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hnb_core::{actions::CallbackAction, messaging::types::InlineButton};

    #[test]
    fn keyboard_rows_keep_layout_and_drop_bad_urls() {
        let kb = InlineKeyboard::new(vec![
            vec![
                InlineButton::action("Help", CallbackAction::Help),
                InlineButton::url("Site", "https://example.com"),
            ],
            vec![InlineButton::url("Broken", "not a url")],
        ]);
        let markup = TelegramMessenger::markup(kb);
        assert_eq!(markup.inline_keyboard.len(), 1);
        assert_eq!(markup.inline_keyboard[0].len(), 2);
        assert_eq!(markup.inline_keyboard[0][0].text, "Help");
    }
}
