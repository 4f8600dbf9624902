//! Shared fixtures for handler tests: recording messenger, in-memory store and
//! a wiremock server standing in for every upstream API.

use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
};

use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use hnb_core::{
    config::{Config, Endpoints},
    domain::{ChatId, ChatInfo, ChatKind, MessageId, MessageRef, Sender, SessionKey, UserId},
    messaging::{
        recording::RecordingMessenger,
        types::{
            CallbackQuery, CommandMessage, IncomingUpdate, MembershipChange, ReplyRef, TextMessage,
        },
    },
    ports::InMemoryPersistence,
};
use hnb_upstream::Upstream;

use crate::router::{AppState, BotIdentity};

use super::handle_update;

fn scratch_path(name: &str) -> PathBuf {
    static SEQ: AtomicU32 = AtomicU32::new(0);
    let n = SEQ.fetch_add(1, Ordering::SeqCst);
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    std::env::temp_dir().join(format!("hnb-handlers-{}-{ts}-{n}/{name}", std::process::id()))
}

pub fn user(id: i64, name: &str) -> Sender {
    Sender {
        id: UserId(id),
        first_name: name.to_string(),
        full_name: name.to_string(),
        username: Some(name.to_lowercase()),
        is_premium: false,
        language_code: Some("en".to_string()),
    }
}

pub fn owner() -> Sender {
    user(1, "Owner")
}

pub fn private_chat(id: i64) -> ChatInfo {
    ChatInfo {
        id: ChatId(id),
        kind: ChatKind::Private,
        title: None,
    }
}

pub fn group_chat(id: i64) -> ChatInfo {
    ChatInfo {
        id: ChatId(id),
        kind: ChatKind::Supergroup,
        title: Some("Test Group".to_string()),
    }
}

pub struct Harness {
    pub state: AppState,
    pub messenger: Arc<RecordingMessenger>,
    pub persistence: Arc<InMemoryPersistence>,
    pub server: MockServer,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(tweak: impl FnOnce(&mut Config)) -> Self {
        let server = MockServer::start().await;
        let mut cfg = Config::for_tests();
        cfg.settings_path = scratch_path("config.json");
        cfg.audit_log_path = scratch_path("audit.log");
        cfg.endpoints = Endpoints::all_at(&server.uri());
        tweak(&mut cfg);

        let messenger = Arc::new(RecordingMessenger::new());
        let persistence = Arc::new(InMemoryPersistence::new());
        let upstream = Arc::new(Upstream::new(cfg.endpoints.clone()).expect("http client"));
        let state = AppState::new(
            Arc::new(cfg),
            messenger.clone(),
            persistence.clone(),
            upstream,
            BotIdentity {
                id: Some(UserId(999)),
                username: Some("hinata_bot".to_string()),
            },
        );
        Self {
            state,
            messenger,
            persistence,
            server,
        }
    }

    pub fn key(&self, chat: &ChatInfo, sender: &Sender) -> SessionKey {
        SessionKey::new(chat.id, sender.id)
    }

    /// Every ChatGPT request answers with `{"reply": reply}`.
    pub async fn chatgpt_replies(&self, reply: &str) {
        Mock::given(method("GET"))
            .and(path("/chatgpt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "reply": reply })))
            .mount(&self.server)
            .await;
    }

    pub async fn command(&self, chat: &ChatInfo, sender: &Sender, text: &str) {
        let parsed = CommandMessage::parse(
            chat.clone(),
            sender.clone(),
            MessageId(1),
            text,
            self.state.me.username.as_deref(),
        );
        if let Some(cmd) = parsed {
            handle_update(&self.state, IncomingUpdate::Command(cmd)).await;
        }
    }

    /// A command sent in reply to `author`'s message `reply_id`.
    pub async fn command_replying(
        &self,
        chat: &ChatInfo,
        sender: &Sender,
        text: &str,
        reply_id: MessageId,
        author: &Sender,
    ) {
        let parsed = CommandMessage::parse(
            chat.clone(),
            sender.clone(),
            MessageId(1),
            text,
            self.state.me.username.as_deref(),
        );
        if let Some(mut cmd) = parsed {
            cmd.reply_to = Some(ReplyRef {
                message_id: reply_id,
                author: Some(author.clone()),
            });
            handle_update(&self.state, IncomingUpdate::Command(cmd)).await;
        }
    }

    pub async fn text(&self, chat: &ChatInfo, sender: &Sender, text: &str) {
        self.text_reply(chat, sender, text, false).await;
    }

    pub async fn text_reply(&self, chat: &ChatInfo, sender: &Sender, text: &str, reply_to_bot: bool) {
        let msg = TextMessage {
            chat: chat.clone(),
            sender: sender.clone(),
            message_id: MessageId(2),
            text: text.to_string(),
            reply_to_bot,
        };
        handle_update(&self.state, IncomingUpdate::Text(msg)).await;
    }

    pub async fn press(&self, chat: &ChatInfo, sender: &Sender, msg: MessageRef, data: &str) {
        let q = CallbackQuery {
            sender: sender.clone(),
            callback_id: format!("cb-{}", data),
            data: data.to_string(),
            message: Some(msg),
            chat: Some(chat.clone()),
        };
        handle_update(&self.state, IncomingUpdate::Callback(q)).await;
    }

    pub async fn membership(&self, chat: &ChatInfo, joined: bool, member_count: Option<u32>) {
        let change = MembershipChange {
            chat: chat.clone(),
            joined,
            member_count,
        };
        handle_update(&self.state, IncomingUpdate::Membership(change)).await;
    }
}
