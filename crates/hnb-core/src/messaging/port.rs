use std::path::Path;

use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef, UserId},
    messaging::types::{
        ChatAction, InlineKeyboard, MessagingCapabilities, Moderation, UserLookup, UserProfile,
    },
    Result,
};

/// Cross-messenger port.
///
/// Telegram is the only implementation; handlers only ever talk to this trait,
/// which keeps them testable against a recording double.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef>;

    async fn send_keyboard(
        &self,
        chat_id: ChatId,
        html: &str,
        keyboard: InlineKeyboard,
    ) -> Result<MessageRef>;

    /// Replace text (and keyboard, when given) of a message the bot sent.
    async fn edit_html(
        &self,
        msg: MessageRef,
        html: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<()>;

    async fn delete_message(&self, msg: MessageRef) -> Result<()>;

    async fn send_chat_action(&self, chat_id: ChatId, action: ChatAction) -> Result<()>;

    async fn send_photo(&self, chat_id: ChatId, url: &str, caption_html: &str)
        -> Result<MessageRef>;

    /// Album of photos by URL.
    async fn send_photo_group(&self, chat_id: ChatId, urls: &[String]) -> Result<()>;

    async fn answer_callback_query(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<()>;

    /// Upload a local file under `filename`.
    async fn send_document(
        &self,
        chat_id: ChatId,
        path: &Path,
        filename: &str,
        caption_html: &str,
    ) -> Result<MessageRef>;

    /// Animated dice; the client rolls it.
    async fn send_dice(&self, chat_id: ChatId) -> Result<MessageRef>;

    /// Re-post an existing message, optionally with a new caption.
    async fn copy_message(
        &self,
        to: ChatId,
        from: MessageRef,
        caption_html: Option<&str>,
    ) -> Result<MessageRef>;

    async fn moderate(&self, chat_id: ChatId, user_id: UserId, action: Moderation) -> Result<()>;

    async fn lookup_user(&self, who: &UserLookup) -> Result<UserProfile>;

    /// Register the command menu shown by clients.
    async fn set_commands(&self, commands: &[(&'static str, &'static str)]) -> Result<()>;
}
