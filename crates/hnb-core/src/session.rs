use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::{domain::SessionKey, expiring::ExpiringMap, intent::Intent};

/// Temp-mail account created for a session (mail.tm).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TempMailAccount {
    pub address: String,
    pub password: String,
    pub token: String,
}

#[derive(Clone, Debug, Default)]
struct SessionState {
    intent: Option<Intent>,
    image_prompt: Option<String>,
    temp_mail: Option<TempMailAccount>,
    styles: Vec<String>,
}

/// Pending intent plus scratch data, per user per chat.
///
/// Every operation takes the lock for a single map access and never awaits I/O
/// while holding it.
pub struct SessionStore {
    inner: Mutex<ExpiringMap<SessionKey, SessionState>>,
}

impl SessionStore {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(ExpiringMap::new(idle_ttl)),
        }
    }

    /// Replace whatever was pending.
    pub async fn set_intent(&self, key: SessionKey, intent: Intent) {
        self.set_intent_at(key, intent, Instant::now()).await
    }

    /// Take the pending intent, leaving none behind.
    pub async fn consume_intent(&self, key: SessionKey) -> Option<Intent> {
        self.consume_intent_at(key, Instant::now()).await
    }

    /// Drop the pending intent. Scratch data survives.
    pub async fn clear_all(&self, key: SessionKey) {
        let mut map = self.inner.lock().await;
        if let Some(state) = map.get_mut(&key) {
            state.intent = None;
        }
    }

    pub async fn peek_intent(&self, key: SessionKey) -> Option<Intent> {
        self.peek_intent_at(key, Instant::now()).await
    }

    pub async fn set_intent_at(&self, key: SessionKey, intent: Intent, now: Instant) {
        let mut map = self.inner.lock().await;
        match map.get_mut_at(&key, now) {
            Some(state) => state.intent = Some(intent),
            None => {
                map.put_at(
                    key,
                    SessionState {
                        intent: Some(intent),
                        ..SessionState::default()
                    },
                    now,
                );
            }
        }
    }

    pub async fn consume_intent_at(&self, key: SessionKey, now: Instant) -> Option<Intent> {
        let mut map = self.inner.lock().await;
        map.get_mut_at(&key, now)?.intent.take()
    }

    pub async fn peek_intent_at(&self, key: SessionKey, now: Instant) -> Option<Intent> {
        let mut map = self.inner.lock().await;
        map.get_at(&key, now)?.intent.clone()
    }

    pub async fn set_image_prompt(&self, key: SessionKey, prompt: String) {
        let mut map = self.inner.lock().await;
        match map.get_mut(&key) {
            Some(state) => state.image_prompt = Some(prompt),
            None => {
                map.put(
                    key,
                    SessionState {
                        image_prompt: Some(prompt),
                        ..SessionState::default()
                    },
                );
            }
        }
    }

    pub async fn image_prompt(&self, key: SessionKey) -> Option<String> {
        let mut map = self.inner.lock().await;
        map.get(&key)?.image_prompt.clone()
    }

    /// Styled variants offered by the last style picker.
    pub async fn set_styles(&self, key: SessionKey, styles: Vec<String>) {
        let mut map = self.inner.lock().await;
        match map.get_mut(&key) {
            Some(state) => state.styles = styles,
            None => {
                map.put(
                    key,
                    SessionState {
                        styles,
                        ..SessionState::default()
                    },
                );
            }
        }
    }

    pub async fn style(&self, key: SessionKey, index: usize) -> Option<String> {
        let mut map = self.inner.lock().await;
        map.get(&key)?.styles.get(index).cloned()
    }

    pub async fn set_temp_mail(&self, key: SessionKey, account: TempMailAccount) {
        let mut map = self.inner.lock().await;
        match map.get_mut(&key) {
            Some(state) => state.temp_mail = Some(account),
            None => {
                map.put(
                    key,
                    SessionState {
                        temp_mail: Some(account),
                        ..SessionState::default()
                    },
                );
            }
        }
    }

    pub async fn temp_mail(&self, key: SessionKey) -> Option<TempMailAccount> {
        let mut map = self.inner.lock().await;
        map.get(&key)?.temp_mail.clone()
    }

    pub async fn take_temp_mail(&self, key: SessionKey) -> Option<TempMailAccount> {
        let mut map = self.inner.lock().await;
        map.get_mut(&key)?.temp_mail.take()
    }

    pub async fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Instant::now()).await
    }

    pub async fn sweep_expired_at(&self, now: Instant) -> usize {
        self.inner.lock().await.sweep_expired_at(now)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ChatId, UserId},
        intent::Feature,
    };

    fn key(chat: i64, user: i64) -> SessionKey {
        SessionKey::new(ChatId(chat), UserId(user))
    }

    fn store() -> SessionStore {
        SessionStore::new(Duration::from_secs(60))
    }

    #[tokio::test]
    async fn latest_intent_wins_and_is_consumed_once() {
        let s = store();
        let k = key(1, 1);
        s.set_intent(k, Intent::Feature(Feature::Gemini)).await;
        s.set_intent(k, Intent::Feature(Feature::Roast)).await;

        assert_eq!(
            s.consume_intent(k).await,
            Some(Intent::Feature(Feature::Roast))
        );
        assert_eq!(s.consume_intent(k).await, None);
    }

    #[tokio::test]
    async fn fresh_session_has_nothing_pending() {
        let s = store();
        assert_eq!(s.consume_intent(key(9, 9)).await, None);
        assert_eq!(s.peek_intent(key(9, 9)).await, None);
    }

    #[tokio::test]
    async fn clear_all_is_idempotent_and_keeps_scratch() {
        let s = store();
        let k = key(1, 2);
        s.set_intent(k, Intent::Riddle { answer: "echo".into() }).await;
        s.set_image_prompt(k, "a cat".into()).await;

        s.clear_all(k).await;
        assert_eq!(s.peek_intent(k).await, None);
        s.clear_all(k).await;
        assert_eq!(s.peek_intent(k).await, None);
        assert_eq!(s.image_prompt(k).await.as_deref(), Some("a cat"));
    }

    #[tokio::test]
    async fn sessions_are_scoped_per_chat_and_user() {
        let s = store();
        s.set_intent(key(1, 1), Intent::Feature(Feature::Joke)).await;

        assert_eq!(s.consume_intent(key(2, 1)).await, None);
        assert_eq!(s.consume_intent(key(1, 2)).await, None);
        assert!(s.consume_intent(key(1, 1)).await.is_some());
    }

    #[tokio::test]
    async fn game_intent_carries_its_own_state() {
        let s = store();
        let k = key(3, 3);
        s.set_intent(k, Intent::Guess { secret: 42, attempts: 2 }).await;
        assert_eq!(s.peek_intent(k).await, Some(Intent::Guess { secret: 42, attempts: 2 }));
        s.clear_all(k).await;
        // A new game starts from scratch; nothing of the old one lingers.
        s.set_intent(k, Intent::Trivia { answer: "paris".into() }).await;
        assert_eq!(
            s.consume_intent(k).await,
            Some(Intent::Trivia { answer: "paris".into() })
        );
    }

    #[tokio::test]
    async fn idle_sessions_expire() {
        let s = store();
        let k = key(5, 5);
        let start = Instant::now();
        s.set_intent_at(k, Intent::Feature(Feature::Ask), start).await;

        assert_eq!(
            s.consume_intent_at(k, start + Duration::from_secs(61)).await,
            None
        );

        s.set_intent_at(k, Intent::Feature(Feature::Ask), start).await;
        assert_eq!(s.sweep_expired_at(start + Duration::from_secs(120)).await, 1);
        assert_eq!(s.len().await, 0);
    }

    #[tokio::test]
    async fn style_picks_come_from_the_latest_offer() {
        let s = store();
        let k = key(8, 8);
        s.set_styles(k, vec!["𝓱𝓲".into(), "ʜɪ".into()]).await;
        s.set_styles(k, vec!["ｈｉ".into()]).await;

        assert_eq!(s.style(k, 0).await.as_deref(), Some("ｈｉ"));
        assert_eq!(s.style(k, 1).await, None);
        assert_eq!(s.style(key(8, 9), 0).await, None);
    }

    #[tokio::test]
    async fn temp_mail_take_clears_account() {
        let s = store();
        let k = key(7, 7);
        let acc = TempMailAccount {
            address: "abc@example.com".into(),
            password: "pw".into(),
            token: "tok".into(),
        };
        s.set_temp_mail(k, acc.clone()).await;
        assert_eq!(s.temp_mail(k).await, Some(acc.clone()));
        assert_eq!(s.take_temp_mail(k).await, Some(acc));
        assert_eq!(s.temp_mail(k).await, None);
    }
}
