use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{domain::UserId, errors::Error, Result};

/// Typed configuration, read from the environment (and `.env` when present).
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,
    pub owner_id: Option<UserId>,
    pub bot_name: String,

    // Storage
    pub database_path: PathBuf,
    pub settings_path: PathBuf,

    // Audit
    pub audit_log_path: PathBuf,
    pub audit_log_json: bool,

    // In-memory state lifetimes
    pub session_idle_ttl: Duration,
    pub game_idle_ttl: Duration,
    pub sweep_interval: Duration,
    pub history_turns: usize,

    // Rate limiting
    pub rate_limit_enabled: bool,
    pub rate_limit_requests: u32,
    pub rate_limit_window: Duration,

    // Telegram limits
    pub telegram_safe_limit: usize,

    pub endpoints: Endpoints,
}

/// Base URLs of every third-party service. Overridable so tests and mirrors can
/// point the bot somewhere else.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    pub chatgpt: String,
    pub gemini: String,
    pub prexzy: String,
    pub free_fire: String,
    pub ff_visit: String,
    pub tinyurl: String,
    pub isgd: String,
    pub temp_mail: String,
    pub keeper: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            chatgpt: "https://addy-chatgpt-api.vercel.app/".to_string(),
            gemini: "https://shawon-gemini-3-api.onrender.com/api/ask".to_string(),
            prexzy: "https://apis.prexzyvilla.site".to_string(),
            free_fire: "https://sb-x-hacker-all-info.vercel.app/player-info".to_string(),
            ff_visit: "https://top-1-visit-api.vercel.app/visit".to_string(),
            tinyurl: "https://tinyurl.com/api-create.php".to_string(),
            isgd: "https://is.gd/create.php".to_string(),
            temp_mail: "https://api.mail.tm".to_string(),
            keeper: "https://service-keeper-1.onrender.com/api".to_string(),
        }
    }
}

impl Endpoints {
    /// Every base URL points at `base` (mock servers in tests).
    pub fn all_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            chatgpt: format!("{base}/chatgpt"),
            gemini: format!("{base}/gemini"),
            prexzy: base.to_string(),
            free_fire: format!("{base}/player-info"),
            ff_visit: format!("{base}/visit"),
            tinyurl: format!("{base}/api-create.php"),
            isgd: format!("{base}/create.php"),
            temp_mail: base.to_string(),
            keeper: format!("{base}/keeper"),
        }
    }

    fn from_env() -> Self {
        let d = Self::default();
        Self {
            chatgpt: env_non_empty("CHATGPT_API_URL").unwrap_or(d.chatgpt),
            gemini: env_non_empty("GEMINI_API_URL").unwrap_or(d.gemini),
            prexzy: env_non_empty("PREXZY_API_BASE").unwrap_or(d.prexzy),
            free_fire: env_non_empty("FF_API_URL").unwrap_or(d.free_fire),
            ff_visit: env_non_empty("FF_VISIT_API_URL").unwrap_or(d.ff_visit),
            tinyurl: env_non_empty("TINYURL_API_URL").unwrap_or(d.tinyurl),
            isgd: env_non_empty("ISGD_API_URL").unwrap_or(d.isgd),
            temp_mail: env_non_empty("TEMP_MAIL_API_URL").unwrap_or(d.temp_mail),
            keeper: env_non_empty("KEEPER_API_BASE").unwrap_or(d.keeper),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        // Token: env first, then the token file.
        let token_file =
            PathBuf::from(env_str("BOT_TOKEN_FILE").unwrap_or("token.txt".to_string()));
        let telegram_bot_token = env_non_empty("TELEGRAM_BOT_TOKEN")
            .or_else(|| read_token_file(&token_file))
            .ok_or_else(|| {
                Error::Config(format!(
                    "TELEGRAM_BOT_TOKEN is required (env or {})",
                    token_file.display()
                ))
            })?;

        let owner_id = match env_str("OWNER_ID").and_then(non_empty) {
            Some(raw) => Some(UserId(raw.trim().parse::<i64>().map_err(|_| {
                Error::Config(format!("OWNER_ID must be a numeric user id, got {raw:?}"))
            })?)),
            None => None,
        };
        let bot_name = env_non_empty("BOT_NAME").unwrap_or("Hinata".to_string());

        let database_path =
            PathBuf::from(env_str("DATABASE_PATH").unwrap_or("hinata.db".to_string()));
        let settings_path =
            PathBuf::from(env_str("SETTINGS_PATH").unwrap_or("config.json".to_string()));

        let audit_log_path = PathBuf::from(
            env_str("AUDIT_LOG_PATH").unwrap_or("/tmp/hinata-bot-audit.log".to_string()),
        );
        let audit_log_json = env_bool("AUDIT_LOG_JSON").unwrap_or(false);

        let session_idle_ttl =
            Duration::from_secs(env_u64("SESSION_IDLE_TTL_SECS").unwrap_or(1800));
        let game_idle_ttl = Duration::from_secs(env_u64("GAME_IDLE_TTL_SECS").unwrap_or(3600));
        // A zero interval would make tokio's interval panic.
        let sweep_interval =
            Duration::from_secs(env_u64("SWEEP_INTERVAL_SECS").unwrap_or(60).max(1));
        let history_turns = env_usize("HISTORY_TURNS").unwrap_or(6);

        let rate_limit_enabled = env_bool("RATE_LIMIT_ENABLED").unwrap_or(true);
        let rate_limit_requests = env_u32("RATE_LIMIT_REQUESTS").unwrap_or(20);
        let rate_limit_window = Duration::from_secs(env_u64("RATE_LIMIT_WINDOW").unwrap_or(60));

        let telegram_safe_limit = env_usize("TELEGRAM_SAFE_LIMIT").unwrap_or(4000);

        Ok(Self {
            telegram_bot_token,
            owner_id,
            bot_name,
            database_path,
            settings_path,
            audit_log_path,
            audit_log_json,
            session_idle_ttl,
            game_idle_ttl,
            sweep_interval,
            history_turns,
            rate_limit_enabled,
            rate_limit_requests,
            rate_limit_window,
            telegram_safe_limit,
            endpoints: Endpoints::from_env(),
        })
    }

    /// Defaults without touching the environment.
    pub fn for_tests() -> Self {
        Self {
            telegram_bot_token: "test-token".to_string(),
            owner_id: Some(UserId(1)),
            bot_name: "Hinata".to_string(),
            database_path: PathBuf::from(":memory:"),
            settings_path: env::temp_dir().join("hinata-test-settings.json"),
            audit_log_path: env::temp_dir().join("hinata-test-audit.log"),
            audit_log_json: false,
            session_idle_ttl: Duration::from_secs(1800),
            game_idle_ttl: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(60),
            history_turns: 6,
            rate_limit_enabled: false,
            rate_limit_requests: 20,
            rate_limit_window: Duration::from_secs(60),
            telegram_safe_limit: 4000,
            endpoints: Endpoints::default(),
        }
    }

    pub fn is_owner(&self, user: UserId) -> bool {
        self.owner_id == Some(user)
    }
}

fn read_token_file(path: &Path) -> Option<String> {
    let raw = fs::read_to_string(path).ok()?;
    non_empty(raw.trim().to_string())
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_non_empty(key: &str) -> Option<String> {
    env_str(key).and_then(non_empty).map(|s| s.trim().to_string())
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim().trim_start_matches("export ").trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    env_str(key).and_then(|s| s.trim().parse::<u32>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotenv_parsing_skips_comments_and_strips_quotes() {
        let parsed = parse_dotenv(
            "# comment\n\nOWNER_ID=42\nBOT_NAME=\"Hinata Chan\"\nexport HISTORY_TURNS='4'\nbroken line\n=novalue\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("OWNER_ID".to_string(), "42".to_string()),
                ("BOT_NAME".to_string(), "Hinata Chan".to_string()),
                ("HISTORY_TURNS".to_string(), "4".to_string()),
            ]
        );
    }

    #[test]
    fn token_file_is_trimmed_and_empty_file_is_ignored() {
        let dir = env::temp_dir();
        let full = dir.join(format!("hnb-token-{}.txt", std::process::id()));
        fs::write(&full, "  123:abc\n").unwrap();
        assert_eq!(read_token_file(&full).as_deref(), Some("123:abc"));

        fs::write(&full, "\n  \n").unwrap();
        assert_eq!(read_token_file(&full), None);
        let _ = fs::remove_file(&full);

        assert_eq!(read_token_file(&dir.join("definitely-missing-token.txt")), None);
    }

    #[test]
    fn endpoints_all_at_share_one_base() {
        let e = Endpoints::all_at("http://127.0.0.1:9999/");
        assert_eq!(e.prexzy, "http://127.0.0.1:9999");
        assert_eq!(e.chatgpt, "http://127.0.0.1:9999/chatgpt");
        assert_eq!(e.temp_mail, "http://127.0.0.1:9999");
    }

    #[test]
    fn owner_check_requires_configured_owner() {
        let mut cfg = Config::for_tests();
        assert!(cfg.is_owner(UserId(1)));
        assert!(!cfg.is_owner(UserId(2)));
        cfg.owner_id = None;
        assert!(!cfg.is_owner(UserId(1)));
    }
}
