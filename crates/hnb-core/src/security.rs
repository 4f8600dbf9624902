use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use crate::{domain::UserId, settings::BotSettings};

// ============== Access control ==============

/// Outcome of the permission check run before every command, text and button.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Allowed,
    Banned,
    Maintenance,
}

impl Access {
    pub fn is_allowed(self) -> bool {
        matches!(self, Access::Allowed)
    }
}

/// Owner always passes; a ban beats the maintenance switch.
pub fn check_access(user: UserId, owner: Option<UserId>, settings: &BotSettings) -> Access {
    if owner == Some(user) {
        return Access::Allowed;
    }
    if settings.is_banned(user) {
        return Access::Banned;
    }
    if !settings.global_access {
        return Access::Maintenance;
    }
    Access::Allowed
}

pub const BANNED_HTML: &str = "⛔ <b>Access Denied:</b> You have been globally banned.";
pub const MAINTENANCE_HTML: &str = "🔒 <b>Maintenance Mode:</b> Bot is currently private.";

// ============== Rate Limiter (Token Bucket) ==============

#[derive(Clone, Debug)]
struct Bucket {
    tokens: f64,
    last_update: Instant,
}

#[derive(Clone, Debug)]
pub struct RateLimiter {
    enabled: bool,
    max_tokens: f64,
    refill_per_sec: f64,
    buckets: HashMap<UserId, Bucket>,
}

impl RateLimiter {
    pub fn new(enabled: bool, max_tokens: u32, window: Duration) -> Self {
        let max_tokens_f = max_tokens as f64;
        let window_secs = window.as_secs_f64().max(1e-9);

        Self {
            enabled,
            max_tokens: max_tokens_f,
            refill_per_sec: max_tokens_f / window_secs,
            buckets: HashMap::new(),
        }
    }

    /// `Ok(())` when a token was taken, otherwise the time until the next one.
    pub fn check(&mut self, user_id: UserId) -> Result<(), Duration> {
        self.check_at(user_id, Instant::now())
    }

    pub fn check_at(&mut self, user_id: UserId, now: Instant) -> Result<(), Duration> {
        if !self.enabled {
            return Ok(());
        }

        let bucket = self.buckets.entry(user_id).or_insert_with(|| Bucket {
            tokens: self.max_tokens,
            last_update: now,
        });

        let elapsed = now.saturating_duration_since(bucket.last_update).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.max_tokens);
        bucket.last_update = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            return Ok(());
        }

        let secs = (1.0 - bucket.tokens) / self.refill_per_sec.max(1e-9);
        Err(Duration::from_secs_f64(secs.max(0.0)))
    }

    /// Forget buckets that have refilled completely.
    pub fn prune_at(&mut self, now: Instant) -> usize {
        let before = self.buckets.len();
        let (max, rate) = (self.max_tokens, self.refill_per_sec);
        self.buckets.retain(|_, b| {
            let elapsed = now.saturating_duration_since(b.last_update).as_secs_f64();
            b.tokens + elapsed * rate < max
        });
        before - self.buckets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(global_access: bool, banned: &[i64]) -> BotSettings {
        BotSettings {
            global_access,
            banned_users: banned.to_vec(),
        }
    }

    #[test]
    fn owner_bypasses_ban_and_maintenance() {
        let s = settings(false, &[1]);
        assert_eq!(check_access(UserId(1), Some(UserId(1)), &s), Access::Allowed);
    }

    #[test]
    fn ban_wins_over_maintenance() {
        let s = settings(false, &[5]);
        assert_eq!(check_access(UserId(5), Some(UserId(1)), &s), Access::Banned);
        assert_eq!(check_access(UserId(6), Some(UserId(1)), &s), Access::Maintenance);
    }

    #[test]
    fn public_bot_allows_everyone_not_banned() {
        let s = settings(true, &[5]);
        assert!(check_access(UserId(6), None, &s).is_allowed());
        assert!(!check_access(UserId(5), None, &s).is_allowed());
    }

    #[test]
    fn rate_limiter_basic_refill() {
        let start = Instant::now();
        let mut rl = RateLimiter::new(true, 2, Duration::from_secs(10));
        let u = UserId(1);

        assert!(rl.check_at(u, start).is_ok());
        assert!(rl.check_at(u, start).is_ok());
        let wait = rl.check_at(u, start).unwrap_err();
        assert!(wait <= Duration::from_secs(5));

        // 2 tokens / 10s: one token back after 5s.
        assert!(rl.check_at(u, start + Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn disabled_limiter_always_passes() {
        let start = Instant::now();
        let mut rl = RateLimiter::new(false, 1, Duration::from_secs(60));
        for _ in 0..10 {
            assert!(rl.check_at(UserId(1), start).is_ok());
        }
    }

    #[test]
    fn prune_drops_full_buckets_only() {
        let start = Instant::now();
        let mut rl = RateLimiter::new(true, 2, Duration::from_secs(10));
        rl.check_at(UserId(1), start).unwrap();
        rl.check_at(UserId(2), start + Duration::from_secs(9)).unwrap();

        assert_eq!(rl.prune_at(start + Duration::from_secs(10)), 1);
    }
}
