use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageId, UserId},
    Result,
};

/// Speaker of a stored chat turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(ChatRole::User),
            "assistant" => Some(ChatRole::Assistant),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub message: String,
}

/// What we learn about a user from an incoming update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserProfile {
    pub id: UserId,
    pub full_name: String,
    pub username: Option<String>,
    pub is_premium: bool,
    pub language_code: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupProfile {
    pub id: ChatId,
    pub title: String,
    /// `group`, `supergroup` or `channel`.
    pub kind: String,
    pub member_count: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub full_name: String,
    pub username: Option<String>,
    pub message_count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupRecord {
    pub id: ChatId,
    pub title: String,
    pub kind: String,
    pub member_count: Option<u32>,
}

/// A finished broadcast run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BroadcastRecord {
    pub text: String,
    /// `all`, `users` or `groups`.
    pub target: String,
    pub sent: u32,
    pub failed: u32,
    pub message_ids: Vec<(ChatId, MessageId)>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BroadcastTotals {
    pub broadcasts: u64,
    pub sent: u64,
    pub failed: u64,
}

/// Durable store for users, groups, broadcasts and conversational memory.
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Insert or refresh a user and bump its message counter. `true` on first sight.
    async fn upsert_user(&self, user: &UserProfile) -> Result<bool>;

    /// Insert or refresh a group. `true` on first sight.
    async fn upsert_group(&self, group: &GroupProfile) -> Result<bool>;

    async fn append_chat_turn(
        &self,
        chat: ChatId,
        user: UserId,
        role: ChatRole,
        message: &str,
    ) -> Result<()>;

    /// The newest `limit` turns of a chat, oldest first.
    async fn get_recent_chat_turns(&self, chat: ChatId, limit: usize) -> Result<Vec<ChatTurn>>;

    async fn record_broadcast(&self, record: &BroadcastRecord) -> Result<i64>;

    async fn list_users(&self) -> Result<Vec<UserRecord>>;

    async fn list_groups(&self) -> Result<Vec<GroupRecord>>;

    async fn broadcast_totals(&self) -> Result<BroadcastTotals>;

    /// Every message id ever broadcast, forgotten once returned.
    async fn drain_broadcast_messages(&self) -> Result<Vec<(ChatId, MessageId)>>;
}

#[derive(Default)]
struct MemoryTables {
    users: Vec<UserRecord>,
    groups: Vec<GroupRecord>,
    history: HashMap<ChatId, Vec<ChatTurn>>,
    broadcasts: Vec<BroadcastRecord>,
}

/// Process-local `Persistence`, for tests and for running without a database file.
#[derive(Default)]
pub struct InMemoryPersistence {
    tables: Mutex<MemoryTables>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut MemoryTables) -> T) -> Result<T> {
        let mut guard = self
            .tables
            .lock()
            .map_err(|_| crate::Error::Storage("in-memory tables poisoned".to_string()))?;
        Ok(f(&mut guard))
    }
}

#[async_trait]
impl Persistence for InMemoryPersistence {
    async fn upsert_user(&self, user: &UserProfile) -> Result<bool> {
        self.with(|t| match t.users.iter_mut().find(|u| u.id == user.id) {
            Some(row) => {
                row.full_name = user.full_name.clone();
                row.username = user.username.clone();
                row.message_count += 1;
                false
            }
            None => {
                t.users.push(UserRecord {
                    id: user.id,
                    full_name: user.full_name.clone(),
                    username: user.username.clone(),
                    message_count: 1,
                });
                true
            }
        })
    }

    async fn upsert_group(&self, group: &GroupProfile) -> Result<bool> {
        self.with(|t| {
            let mut row = GroupRecord {
                id: group.id,
                title: group.title.clone(),
                kind: group.kind.clone(),
                member_count: group.member_count,
            };
            match t.groups.iter_mut().find(|g| g.id == group.id) {
                Some(existing) => {
                    // An unknown count keeps the last one seen.
                    row.member_count = row.member_count.or(existing.member_count);
                    *existing = row;
                    false
                }
                None => {
                    t.groups.push(row);
                    true
                }
            }
        })
    }

    async fn append_chat_turn(
        &self,
        chat: ChatId,
        _user: UserId,
        role: ChatRole,
        message: &str,
    ) -> Result<()> {
        self.with(|t| {
            t.history.entry(chat).or_default().push(ChatTurn {
                role,
                message: message.to_string(),
            })
        })
    }

    async fn get_recent_chat_turns(&self, chat: ChatId, limit: usize) -> Result<Vec<ChatTurn>> {
        self.with(|t| {
            let turns = t.history.get(&chat).map(Vec::as_slice).unwrap_or_default();
            turns[turns.len().saturating_sub(limit)..].to_vec()
        })
    }

    async fn record_broadcast(&self, record: &BroadcastRecord) -> Result<i64> {
        self.with(|t| {
            t.broadcasts.push(record.clone());
            t.broadcasts.len() as i64
        })
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>> {
        self.with(|t| t.users.clone())
    }

    async fn list_groups(&self) -> Result<Vec<GroupRecord>> {
        self.with(|t| t.groups.clone())
    }

    async fn broadcast_totals(&self) -> Result<BroadcastTotals> {
        self.with(|t| BroadcastTotals {
            broadcasts: t.broadcasts.len() as u64,
            sent: t.broadcasts.iter().map(|b| u64::from(b.sent)).sum(),
            failed: t.broadcasts.iter().map(|b| u64::from(b.failed)).sum(),
        })
    }

    async fn drain_broadcast_messages(&self) -> Result<Vec<(ChatId, MessageId)>> {
        self.with(|t| {
            t.broadcasts
                .iter_mut()
                .flat_map(|b| std::mem::take(&mut b.message_ids))
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(id: i64) -> UserProfile {
        UserProfile {
            id: UserId(id),
            full_name: format!("User {id}"),
            username: None,
            is_premium: false,
            language_code: None,
        }
    }

    #[tokio::test]
    async fn first_upsert_is_new() {
        let db = InMemoryPersistence::new();
        assert!(db.upsert_user(&profile(7)).await.unwrap());
        assert!(!db.upsert_user(&profile(7)).await.unwrap());
        let users = db.list_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].message_count, 2);
    }

    #[tokio::test]
    async fn recent_turns_are_limited_and_chronological() {
        let db = InMemoryPersistence::new();
        for i in 0..5 {
            db.append_chat_turn(ChatId(1), UserId(2), ChatRole::User, &format!("m{i}"))
                .await
                .unwrap();
        }
        let turns = db.get_recent_chat_turns(ChatId(1), 2).await.unwrap();
        let msgs: Vec<_> = turns.iter().map(|t| t.message.as_str()).collect();
        assert_eq!(msgs, vec!["m3", "m4"]);
        assert!(db.get_recent_chat_turns(ChatId(9), 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn drained_broadcast_ids_are_forgotten() {
        let db = InMemoryPersistence::new();
        db.record_broadcast(&BroadcastRecord {
            text: "hi".into(),
            target: "all".into(),
            sent: 2,
            failed: 1,
            message_ids: vec![(ChatId(1), MessageId(10)), (ChatId(2), MessageId(11))],
        })
        .await
        .unwrap();

        assert_eq!(db.drain_broadcast_messages().await.unwrap().len(), 2);
        assert!(db.drain_broadcast_messages().await.unwrap().is_empty());
        let totals = db.broadcast_totals().await.unwrap();
        assert_eq!((totals.broadcasts, totals.sent, totals.failed), (1, 2, 1));
    }

    #[test]
    fn roles_round_trip() {
        for r in [ChatRole::User, ChatRole::Assistant] {
            assert_eq!(ChatRole::parse(r.as_str()), Some(r));
        }
        assert_eq!(ChatRole::parse("system"), None);
    }
}
