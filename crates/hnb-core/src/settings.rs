use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{domain::UserId, Result};

/// Owner-controlled switches, persisted as a small JSON file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotSettings {
    #[serde(default = "default_true")]
    pub global_access: bool,
    #[serde(default)]
    pub banned_users: Vec<i64>,
}

fn default_true() -> bool {
    true
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            global_access: true,
            banned_users: Vec::new(),
        }
    }
}

impl BotSettings {
    pub fn is_banned(&self, user: UserId) -> bool {
        self.banned_users.contains(&user.0)
    }
}

/// Settings held in memory and rewritten to disk on every change.
pub struct SettingsStore {
    path: PathBuf,
    inner: Mutex<BotSettings>,
}

impl SettingsStore {
    /// Missing or malformed files fall back to defaults.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = match read_settings(&path) {
            Ok(Some(s)) => s,
            Ok(None) => BotSettings::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), "settings unreadable, using defaults: {e}");
                BotSettings::default()
            }
        };
        Self {
            path,
            inner: Mutex::new(settings),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn snapshot(&self) -> BotSettings {
        self.inner.lock().await.clone()
    }

    /// Returns `true` when the user was not banned before.
    pub async fn ban(&self, user: UserId) -> Result<bool> {
        self.update(|s| {
            if s.is_banned(user) {
                return false;
            }
            s.banned_users.push(user.0);
            true
        })
        .await
    }

    /// Returns `true` when the user was banned before.
    pub async fn unban(&self, user: UserId) -> Result<bool> {
        self.update(|s| {
            let before = s.banned_users.len();
            s.banned_users.retain(|id| *id != user.0);
            before != s.banned_users.len()
        })
        .await
    }

    /// Flips global access and returns the new value.
    pub async fn toggle_access(&self) -> Result<bool> {
        self.update(|s| {
            s.global_access = !s.global_access;
            s.global_access
        })
        .await
    }

    /// Apply `f` to a copy, persist it, then publish it. A failed write leaves
    /// the in-memory settings untouched.
    async fn update<T>(&self, f: impl FnOnce(&mut BotSettings) -> T) -> Result<T> {
        let mut guard = self.inner.lock().await;
        let mut next = guard.clone();
        let out = f(&mut next);
        if next != *guard {
            write_settings_atomic(&self.path, &next)?;
            *guard = next;
        }
        Ok(out)
    }
}

fn read_settings(path: &Path) -> Result<Option<BotSettings>> {
    if !path.exists() {
        return Ok(None);
    }
    let txt = fs::read_to_string(path)?;
    if txt.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(&txt)?))
}

fn write_settings_atomic(path: &Path, settings: &BotSettings) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_string_pretty(settings)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let pid = std::process::id();
        std::env::temp_dir().join(format!("{prefix}-{pid}-{ts}/config.json"))
    }

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let store = SettingsStore::load(tmp("hnb-settings-missing"));
        assert_eq!(store.snapshot().await, BotSettings::default());
    }

    #[tokio::test]
    async fn malformed_file_yields_defaults() {
        let path = tmp("hnb-settings-bad");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{not json").unwrap();

        let store = SettingsStore::load(&path);
        assert_eq!(store.snapshot().await, BotSettings::default());
    }

    #[tokio::test]
    async fn changes_survive_a_reload() {
        let path = tmp("hnb-settings-roundtrip");
        let store = SettingsStore::load(&path);

        assert!(store.ban(UserId(42)).await.unwrap());
        assert!(!store.ban(UserId(42)).await.unwrap());
        assert!(!store.toggle_access().await.unwrap());

        let reloaded = SettingsStore::load(&path).snapshot().await;
        assert!(!reloaded.global_access);
        assert_eq!(reloaded.banned_users, vec![42]);
        assert!(!path.with_extension("json.tmp").exists());

        assert!(store.unban(UserId(42)).await.unwrap());
        assert!(!store.unban(UserId(42)).await.unwrap());
        assert!(SettingsStore::load(&path).snapshot().await.banned_users.is_empty());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s: BotSettings = serde_json::from_str(r#"{"banned_users":[7]}"#).unwrap();
        assert!(s.global_access);
        assert!(s.is_banned(UserId(7)));
    }
}
