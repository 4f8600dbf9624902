//! SQLite persistence for users, groups, broadcasts and chat history.
//!
//! Every statement runs on the single `tokio-rusqlite` background thread, so
//! callers never block the runtime.

use std::path::Path;

use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};
use serde_json::{Map, Value};
use tokio_rusqlite::Connection;

use hnb_core::{
    domain::{ChatId, MessageId, UserId},
    errors::Error,
    ports::{
        BroadcastRecord, BroadcastTotals, ChatRole, ChatTurn, GroupProfile, GroupRecord,
        Persistence, UserProfile, UserRecord,
    },
    Result,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    full_name TEXT NOT NULL,
    username TEXT,
    joined_at TEXT NOT NULL,
    last_active_at TEXT NOT NULL,
    message_count INTEGER NOT NULL DEFAULT 0,
    is_premium INTEGER NOT NULL DEFAULT 0,
    language_code TEXT
);
CREATE TABLE IF NOT EXISTS groups (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    type TEXT NOT NULL,
    added_at TEXT NOT NULL,
    last_active_at TEXT NOT NULL,
    member_count INTEGER
);
CREATE TABLE IF NOT EXISTS broadcasts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    text TEXT NOT NULL,
    target TEXT NOT NULL,
    sent_count INTEGER NOT NULL,
    failed_count INTEGER NOT NULL,
    timestamp TEXT NOT NULL,
    message_ids TEXT NOT NULL DEFAULT '{}'
);
CREATE TABLE IF NOT EXISTS chat_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    chat_id INTEGER NOT NULL,
    user_id INTEGER NOT NULL,
    role TEXT NOT NULL,
    message TEXT NOT NULL,
    timestamp TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_chat_history_chat ON chat_history (chat_id, id);
";

fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> Error {
    Error::Storage(e.to_string())
}

fn now() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

/// `{"<chat_id>": <message_id>, ...}`
fn encode_message_ids(ids: &[(ChatId, MessageId)]) -> String {
    let map: Map<String, Value> = ids
        .iter()
        .map(|(chat, msg)| (chat.0.to_string(), Value::from(msg.0)))
        .collect();
    Value::Object(map).to_string()
}

fn decode_message_ids(raw: &str) -> Vec<(ChatId, MessageId)> {
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw) else {
        tracing::warn!("skipping unreadable broadcast message_ids");
        return Vec::new();
    };
    map.iter()
        .filter_map(|(chat, msg)| {
            let chat = chat.parse::<i64>().ok()?;
            let msg = i32::try_from(msg.as_i64()?).ok()?;
            Some((ChatId(chat), MessageId(msg)))
        })
        .collect()
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .await
            .map_err(|e| Error::Storage(format!("open {}: {e}", path.as_ref().display())))?;
        Self::with_connection(conn).await
    }

    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;
        Self::with_connection(conn).await
    }

    async fn with_connection(conn: Connection) -> Result<Self> {
        conn.call(|conn| conn.execute_batch(SCHEMA))
            .await
            .map_err(map_tr_err)?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl Persistence for SqliteStore {
    async fn upsert_user(&self, user: &UserProfile) -> Result<bool> {
        let user = user.clone();
        let ts = now();
        self.conn
            .call(move |conn| {
                let known: Option<i64> = conn
                    .query_row("SELECT id FROM users WHERE id = ?1", params![user.id.0], |r| {
                        r.get(0)
                    })
                    .optional()?;
                conn.execute(
                    "INSERT INTO users (id, full_name, username, joined_at, last_active_at, \
                     message_count, is_premium, language_code) \
                     VALUES (?1, ?2, ?3, ?4, ?4, 1, ?5, ?6) \
                     ON CONFLICT(id) DO UPDATE SET full_name = ?2, username = ?3, \
                     last_active_at = ?4, message_count = message_count + 1, \
                     is_premium = ?5, language_code = ?6",
                    params![
                        user.id.0,
                        user.full_name,
                        user.username,
                        ts,
                        user.is_premium,
                        user.language_code,
                    ],
                )?;
                Ok(known.is_none())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn upsert_group(&self, group: &GroupProfile) -> Result<bool> {
        let chat_id = group.id.0;
        let group = group.clone();
        let ts = now();
        let is_new = self
            .conn
            .call(move |conn| {
                let known: Option<i64> = conn
                    .query_row("SELECT id FROM groups WHERE id = ?1", params![group.id.0], |r| {
                        r.get(0)
                    })
                    .optional()?;
                conn.execute(
                    "INSERT INTO groups (id, title, type, added_at, last_active_at, member_count) \
                     VALUES (?1, ?2, ?3, ?4, ?4, ?5) \
                     ON CONFLICT(id) DO UPDATE SET title = ?2, type = ?3, \
                     last_active_at = ?4, member_count = COALESCE(?5, member_count)",
                    params![group.id.0, group.title, group.kind, ts, group.member_count],
                )?;
                Ok(known.is_none())
            })
            .await
            .map_err(map_tr_err)?;
        if is_new {
            tracing::info!(chat_id, "new group recorded");
        }
        Ok(is_new)
    }

    async fn append_chat_turn(
        &self,
        chat: ChatId,
        user: UserId,
        role: ChatRole,
        message: &str,
    ) -> Result<()> {
        let message = message.to_string();
        let ts = now();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO chat_history (chat_id, user_id, role, message, timestamp) \
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![chat.0, user.0, role.as_str(), message, ts],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn get_recent_chat_turns(&self, chat: ChatId, limit: usize) -> Result<Vec<ChatTurn>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT role, message FROM chat_history WHERE chat_id = ?1 \
                     ORDER BY id DESC LIMIT ?2",
                )?;
                let rows = stmt.query_map(params![chat.0, limit], |r| {
                    Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
                })?;
                let mut turns = Vec::new();
                for row in rows {
                    let (role, message) = row?;
                    if let Some(role) = ChatRole::parse(&role) {
                        turns.push(ChatTurn { role, message });
                    }
                }
                turns.reverse();
                Ok(turns)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn record_broadcast(&self, record: &BroadcastRecord) -> Result<i64> {
        let text = record.text.clone();
        let target = record.target.clone();
        let (sent, failed) = (record.sent, record.failed);
        let ids = encode_message_ids(&record.message_ids);
        let ts = now();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO broadcasts (text, target, sent_count, failed_count, timestamp, \
                     message_ids) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![text, target, sent, failed, ts, ids],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, full_name, username, message_count FROM users ORDER BY joined_at",
                )?;
                let rows = stmt.query_map([], |r| {
                    Ok(UserRecord {
                        id: UserId(r.get(0)?),
                        full_name: r.get(1)?,
                        username: r.get(2)?,
                        message_count: r.get::<_, i64>(3)?.max(0) as u64,
                    })
                })?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .await
            .map_err(map_tr_err)
    }

    async fn list_groups(&self) -> Result<Vec<GroupRecord>> {
        self.conn
            .call(|conn| {
                let mut stmt = conn
                    .prepare("SELECT id, title, type, member_count FROM groups ORDER BY added_at")?;
                let rows = stmt.query_map([], |r| {
                    Ok(GroupRecord {
                        id: ChatId(r.get(0)?),
                        title: r.get(1)?,
                        kind: r.get(2)?,
                        member_count: r.get(3)?,
                    })
                })?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .await
            .map_err(map_tr_err)
    }

    async fn broadcast_totals(&self) -> Result<BroadcastTotals> {
        self.conn
            .call(|conn| {
                conn.query_row(
                    "SELECT COUNT(*), COALESCE(SUM(sent_count), 0), COALESCE(SUM(failed_count), 0) \
                     FROM broadcasts",
                    [],
                    |r| {
                        Ok(BroadcastTotals {
                            broadcasts: r.get::<_, i64>(0)?.max(0) as u64,
                            sent: r.get::<_, i64>(1)?.max(0) as u64,
                            failed: r.get::<_, i64>(2)?.max(0) as u64,
                        })
                    },
                )
            })
            .await
            .map_err(map_tr_err)
    }

    async fn drain_broadcast_messages(&self) -> Result<Vec<(ChatId, MessageId)>> {
        let raw = self
            .conn
            .call(|conn| {
                let tx = conn.transaction()?;
                let raw = {
                    let mut stmt = tx.prepare(
                        "SELECT message_ids FROM broadcasts WHERE message_ids != '{}' ORDER BY id",
                    )?;
                    let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
                    rows.collect::<rusqlite::Result<Vec<_>>>()?
                };
                tx.execute("UPDATE broadcasts SET message_ids = '{}'", [])?;
                tx.commit()?;
                Ok(raw)
            })
            .await
            .map_err(map_tr_err)?;
        Ok(raw.iter().flat_map(|r| decode_message_ids(r)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, name: &str) -> UserProfile {
        UserProfile {
            id: UserId(id),
            full_name: name.to_string(),
            username: Some(name.to_lowercase()),
            is_premium: false,
            language_code: Some("en".into()),
        }
    }

    #[tokio::test]
    async fn user_upsert_reports_first_sight_and_counts() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        assert!(store.upsert_user(&user(1, "Ann")).await.unwrap());
        assert!(!store.upsert_user(&user(1, "Annie")).await.unwrap());

        let users = store.list_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].full_name, "Annie");
        assert_eq!(users[0].message_count, 2);
    }

    #[tokio::test]
    async fn group_upsert_keeps_member_count_when_unknown() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let mut g = GroupProfile {
            id: ChatId(-100),
            title: "Club".into(),
            kind: "supergroup".into(),
            member_count: Some(12),
        };
        assert!(store.upsert_group(&g).await.unwrap());
        g.member_count = None;
        g.title = "Club 2".into();
        assert!(!store.upsert_group(&g).await.unwrap());

        let groups = store.list_groups().await.unwrap();
        assert_eq!(groups[0].title, "Club 2");
        assert_eq!(groups[0].member_count, Some(12));
    }

    #[tokio::test]
    async fn history_is_chronological_and_limited() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let chat = ChatId(5);
        for i in 0..4 {
            store
                .append_chat_turn(chat, UserId(1), ChatRole::User, &format!("q{i}"))
                .await
                .unwrap();
            store
                .append_chat_turn(chat, UserId(1), ChatRole::Assistant, &format!("a{i}"))
                .await
                .unwrap();
        }
        store
            .append_chat_turn(ChatId(6), UserId(2), ChatRole::User, "elsewhere")
            .await
            .unwrap();

        let turns = store.get_recent_chat_turns(chat, 3).await.unwrap();
        let texts: Vec<_> = turns.iter().map(|t| t.message.as_str()).collect();
        assert_eq!(texts, ["a2", "q3", "a3"]);
        assert_eq!(turns[1].role, ChatRole::User);
    }

    #[tokio::test]
    async fn broadcasts_total_and_drain_once() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let id = store
            .record_broadcast(&BroadcastRecord {
                text: "hello".into(),
                target: "all".into(),
                sent: 2,
                failed: 1,
                message_ids: vec![(ChatId(1), MessageId(10)), (ChatId(-5), MessageId(11))],
            })
            .await
            .unwrap();
        assert!(id > 0);

        let totals = store.broadcast_totals().await.unwrap();
        assert_eq!(
            totals,
            BroadcastTotals {
                broadcasts: 1,
                sent: 2,
                failed: 1
            }
        );

        let mut drained = store.drain_broadcast_messages().await.unwrap();
        drained.sort_by_key(|(c, _)| c.0);
        assert_eq!(
            drained,
            vec![(ChatId(-5), MessageId(11)), (ChatId(1), MessageId(10))]
        );
        assert!(store.drain_broadcast_messages().await.unwrap().is_empty());
    }

    #[test]
    fn message_id_json_shape() {
        let raw = encode_message_ids(&[(ChatId(7), MessageId(3))]);
        assert_eq!(raw, r#"{"7":3}"#);
        assert!(decode_message_ids("not json").is_empty());
    }
}
