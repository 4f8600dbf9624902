//! Profile lookups, search, web tools and image generation.

use std::time::Duration;

use serde_json::Value;

use hnb_core::{
    actions::AspectRatio,
    errors::Error,
    extract::{first_scalar, lookup, PayloadExtractor},
    formatting::ensure_scheme,
    Result,
};

use crate::{parse_json, truthy, Upstream};

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(30);
const SLOW_TIMEOUT: Duration = Duration::from_secs(60);
const KEEPER_TIMEOUT: Duration = Duration::from_secs(20);
const VISIT_TIMEOUT: Duration = Duration::from_secs(20);
const MAX_STYLES: usize = 24;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DetectorReport {
    pub ai_percentage: String,
    pub classification: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TikTokProfile {
    pub nickname: String,
    pub username: String,
    pub id: String,
    pub private: bool,
    pub verified: bool,
    pub followers: u64,
    pub following: u64,
    pub hearts: u64,
    pub videos: u64,
    pub bio: String,
    pub avatar: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FreeFireProfile {
    pub uid: String,
    pub name: String,
    pub level: String,
    pub exp: String,
    pub region: String,
    pub badge: String,
    pub bio: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VisitReport {
    pub uid: String,
    pub nickname: String,
    pub successful: u64,
    pub failed: u64,
    pub total: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InstaProfile {
    pub full_name: String,
    pub username: String,
    pub id: String,
    pub bio: String,
    pub followers: u64,
    pub following: u64,
    pub posts: u64,
    pub private: bool,
    pub verified: bool,
    pub business: bool,
    pub avatar: Option<String>,
}

/// Bare handle from `@name`, `name` or a profile URL.
pub fn insta_handle(input: &str) -> Option<String> {
    const HOST: &str = "instagram.com/";
    let text = input.trim();
    let text = text.split('?').next().unwrap_or(text);
    let path = match text.find(HOST) {
        Some(i) => &text[i + HOST.len()..],
        None => text,
    };
    path.split('/')
        .find(|seg| !seg.is_empty())
        .map(|seg| seg.trim_start_matches('@').to_string())
        .filter(|h| !h.is_empty())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoHit {
    pub title: String,
    pub url: Option<String>,
}

/// `to|subject|message` as typed by the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailRequest {
    pub to: String,
    pub subject: String,
    pub message: String,
}

impl EmailRequest {
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.splitn(3, '|').map(str::trim);
        let to = parts.next()?.to_string();
        let subject = parts.next()?.to_string();
        let message = parts.next()?.to_string();
        if to.is_empty() || !to.contains('@') {
            return None;
        }
        Some(Self {
            to,
            subject,
            message,
        })
    }
}

/// `url [interval-minutes]` for the uptime keeper.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeeperTarget {
    pub url: String,
    pub interval_mins: String,
}

impl KeeperTarget {
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split_whitespace();
        let url = ensure_scheme(parts.next()?);
        let interval_mins = parts
            .next()
            .filter(|s| s.chars().all(|c| c.is_ascii_digit()))
            .unwrap_or("5")
            .to_string();
        Some(Self { url, interval_mins })
    }
}

fn string_or(v: &Value, key: &str, default: &str) -> String {
    v.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
        .to_string()
}

fn count(v: &Value, key: &str) -> u64 {
    v.get(key).and_then(Value::as_u64).unwrap_or(0)
}

/// First of `keys` holding a count, as a number or a `"1,234"` string.
fn loose_count(v: &Value, keys: &[&str]) -> u64 {
    keys.iter()
        .find_map(|k| match v.get(*k)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.replace(',', "").trim().parse().ok(),
            _ => None,
        })
        .unwrap_or(0)
}

/// `result` or `data`, whichever is present and non-empty.
fn result_or_data(body: &Value) -> Option<&Value> {
    ["result", "data"]
        .into_iter()
        .filter_map(|k| body.get(k))
        .find(|v| truthy(Some(v)))
}

fn failure(service: &'static str, body: &Value, fallback: &str) -> Error {
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or(fallback);
    Error::External(format!("{service}: {message}"))
}

impl Upstream {
    pub async fn detect_ai(&self, text: &str) -> Result<DetectorReport> {
        const SERVICE: &str = "AI Detector";
        let url = self.prexzy("/ai/aidetector");
        let body = self
            .get_json(SERVICE, &url, &[("text", text)], LOOKUP_TIMEOUT)
            .await?;
        if !truthy(body.get("status")) {
            return Err(failure(SERVICE, &body, "Detection failed"));
        }
        let analysis = body.get("analysis").cloned().unwrap_or(Value::Null);
        Ok(DetectorReport {
            ai_percentage: first_scalar(&analysis, &["ai_percentage"]).unwrap_or("0".to_string()),
            classification: first_scalar(&analysis, &["classification"])
                .unwrap_or("Unknown".to_string()),
        })
    }

    pub async fn tiktok_profile(&self, user: &str) -> Result<TikTokProfile> {
        const SERVICE: &str = "TikTok";
        let url = self.prexzy("/stalk/ttstalk");
        let user = user.trim().trim_start_matches('@');
        let body = self
            .get_json(SERVICE, &url, &[("user", user)], LOOKUP_TIMEOUT)
            .await?;

        let (Some(u), Some(s)) = (lookup(&body, &["data", "user"]), lookup(&body, &["data", "stats"]))
        else {
            return Err(Error::NoPayload { service: SERVICE });
        };
        if !truthy(body.get("status")) {
            return Err(Error::NoPayload { service: SERVICE });
        }

        Ok(TikTokProfile {
            nickname: string_or(u, "nickname", ""),
            username: string_or(u, "uniqueId", user),
            id: first_scalar(u, &["id"]).unwrap_or_default(),
            private: truthy(u.get("privateAccount")),
            verified: truthy(u.get("verified")),
            followers: count(s, "followerCount"),
            following: count(s, "followingCount"),
            hearts: count(s, "heartCount"),
            videos: count(s, "videoCount"),
            bio: string_or(u, "signature", "No Bio"),
            avatar: ["avatarLarger", "avatarMedium"]
                .into_iter()
                .find_map(|k| u.get(k).and_then(Value::as_str))
                .map(str::to_string),
        })
    }

    pub async fn free_fire_profile(&self, uid: &str) -> Result<FreeFireProfile> {
        const SERVICE: &str = "Free Fire";
        let uid = uid.trim();
        let body = self
            .get_json(SERVICE, &self.endpoints.free_fire, &[("uid", uid)], LOOKUP_TIMEOUT)
            .await?;
        let res = result_or_data(&body).ok_or(Error::NoPayload { service: SERVICE })?;

        let field = |keys: &[&str], default: &str| {
            first_scalar(res, keys).unwrap_or(default.to_string())
        };
        Ok(FreeFireProfile {
            uid: uid.to_string(),
            name: field(&["nickname", "Name", "name"], "Unknown"),
            level: field(&["level", "Level"], "N/A"),
            exp: field(&["exp", "Exp"], "N/A"),
            region: field(&["region", "Region"], "Global"),
            badge: field(&["badge", "Badge"], "None"),
            bio: field(&["bio", "Bio"], "No signature set"),
        })
    }

    pub async fn free_fire_visit(&self, uid: &str) -> Result<VisitReport> {
        const SERVICE: &str = "FF Visit";
        let uid = uid.trim();
        let body = self
            .get_json(
                SERVICE,
                &self.endpoints.ff_visit,
                &[("uid", uid), ("region", "BD")],
                VISIT_TIMEOUT,
            )
            .await?;
        if body.get("TotalVisits").is_none() {
            return Err(Error::NoPayload { service: SERVICE });
        }
        Ok(VisitReport {
            uid: uid.to_string(),
            nickname: string_or(&body, "PlayerNickname", "Unknown"),
            successful: loose_count(&body, &["SuccessfulVisits"]),
            failed: loose_count(&body, &["FailedVisits"]),
            total: loose_count(&body, &["TotalVisits"]),
        })
    }

    /// Tries each Instagram endpoint in turn; the first one with a profile wins.
    pub async fn insta_profile(&self, handle: &str) -> Result<InstaProfile> {
        const SERVICE: &str = "Instagram";
        let attempts = [
            (self.prexzy("/stalk/ig"), "user"),
            (self.prexzy("/stalk/igstalk"), "username"),
        ];
        let mut profile = None;
        for (url, param) in &attempts {
            match self
                .get_json(SERVICE, url, &[(*param, handle)], LOOKUP_TIMEOUT)
                .await
            {
                Ok(body) => {
                    profile = ["profile", "data", "result"]
                        .into_iter()
                        .filter_map(|k| body.get(k))
                        .find(|v| v.is_object())
                        .cloned();
                    if profile.is_some() {
                        break;
                    }
                }
                Err(e) => tracing::debug!(url = %url, "instagram endpoint failed: {e}"),
            }
        }
        let p = profile.ok_or(Error::NoPayload { service: SERVICE })?;

        Ok(InstaProfile {
            full_name: first_scalar(&p, &["full_name", "full_name_hd"])
                .unwrap_or("Unknown".to_string()),
            username: first_scalar(&p, &["username"]).unwrap_or(handle.to_string()),
            id: first_scalar(&p, &["id", "pk"]).unwrap_or("N/A".to_string()),
            bio: first_scalar(&p, &["biography", "bio"])
                .unwrap_or("No biography set".to_string()),
            followers: loose_count(&p, &["followers", "follower_count"]),
            following: loose_count(&p, &["following", "following_count"]),
            posts: loose_count(&p, &["posts", "media_count"]),
            private: truthy(p.get("is_private")),
            verified: truthy(p.get("is_verified")),
            business: truthy(p.get("is_business_account")) || truthy(p.get("is_business")),
            avatar: ["profile_pic_url_hd", "profile_pic_url"]
                .into_iter()
                .find_map(|k| p.get(k).and_then(Value::as_str))
                .filter(|u| !u.is_empty())
                .map(str::to_string),
        })
    }

    /// Up to 24 decorated renderings of `text`.
    pub async fn style_text(&self, text: &str) -> Result<Vec<String>> {
        const SERVICE: &str = "Style Text";
        let url = self.prexzy("/tools/allstyles");
        let body = self
            .get_json(SERVICE, &url, &[("text", text)], LOOKUP_TIMEOUT)
            .await?;
        let styles: Vec<String> = ["styles", "result", "data"]
            .into_iter()
            .filter_map(|k| body.get(k))
            .find_map(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .take(MAX_STYLES)
                    .filter_map(|it| match it {
                        Value::String(s) => Some(s.as_str()),
                        other => other.get("styled_text").and_then(Value::as_str),
                    })
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        if styles.is_empty() {
            return Err(Error::NoPayload { service: SERVICE });
        }
        Ok(styles)
    }

    /// Top 5 YouTube results.
    pub async fn youtube_search(&self, query: &str) -> Result<Vec<VideoHit>> {
        const SERVICE: &str = "YouTube";
        let url = self.prexzy("/search/youtube");
        let body = self
            .get_json(SERVICE, &url, &[("q", query)], LOOKUP_TIMEOUT)
            .await?;
        let hits: Vec<VideoHit> = result_or_data(&body)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .take(5)
                    .map(|it| VideoHit {
                        title: string_or(it, "title", "Unknown"),
                        url: it.get("url").and_then(Value::as_str).map(str::to_string),
                    })
                    .collect()
            })
            .unwrap_or_default();
        if hits.is_empty() {
            return Err(Error::NoPayload { service: SERVICE });
        }
        Ok(hits)
    }

    /// Up to 10 image URLs.
    pub async fn pinterest_search(&self, query: &str) -> Result<Vec<String>> {
        const SERVICE: &str = "Pinterest";
        let url = self.prexzy("/search/pinterest");
        let body = self
            .get_json(SERVICE, &url, &[("q", query)], SLOW_TIMEOUT)
            .await?;
        let urls: Vec<String> = result_or_data(&body)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|it| match it {
                        Value::String(s) => Some(s.clone()),
                        other => other.get("url").and_then(Value::as_str).map(str::to_string),
                    })
                    .take(10)
                    .collect()
            })
            .unwrap_or_default();
        if urls.is_empty() {
            return Err(Error::NoPayload { service: SERVICE });
        }
        Ok(urls)
    }

    /// Download link of a zipped copy of a website.
    pub async fn web_zip(&self, site: &str) -> Result<String> {
        const SERVICE: &str = "WebZip";
        let url = self.prexzy("/download/saveweb2zip");
        let site = ensure_scheme(site);
        let body = self
            .get_json(SERVICE, &url, &[("url", site.as_str())], SLOW_TIMEOUT)
            .await?;
        PayloadExtractor::keys(SERVICE, &["result", "url", "download_url"]).extract(&body)
    }

    /// URL of a screenshot of `site`. The API either streams the image itself or
    /// answers with JSON pointing at it.
    pub async fn web_screenshot(&self, site: &str) -> Result<String> {
        const SERVICE: &str = "WebSS";
        let site = ensure_scheme(site);
        let api = reqwest::Url::parse_with_params(&self.prexzy("/ssweb/webss"), &[("url", &site)])
            .map_err(|e| Error::upstream_request(SERVICE, e))?;

        let resp = self
            .http
            .get(api.clone())
            .timeout(Duration::from_secs(40))
            .send()
            .await
            .map_err(|e| Error::upstream_request(SERVICE, e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::UpstreamStatus {
                service: SERVICE,
                status: status.as_u16(),
            });
        }
        let is_image = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("image"));
        if is_image {
            return Ok(api.to_string());
        }

        let text = resp
            .text()
            .await
            .map_err(|e| Error::upstream_request(SERVICE, e))?;
        let body = parse_json(SERVICE, &text)?;
        PayloadExtractor::keys(SERVICE, &["result", "url", "download_url"]).extract(&body)
    }

    pub async fn send_email(&self, req: &EmailRequest) -> Result<()> {
        const SERVICE: &str = "Email";
        let url = self.prexzy("/tools/sendemail");
        let body = self
            .get_json(
                SERVICE,
                &url,
                &[
                    ("to", req.to.as_str()),
                    ("subject", req.subject.as_str()),
                    ("message", req.message.as_str()),
                ],
                LOOKUP_TIMEOUT,
            )
            .await?;
        if truthy(body.get("status")) || truthy(body.get("success")) {
            Ok(())
        } else {
            Err(failure(SERVICE, &body, "Service rejected"))
        }
    }

    pub async fn keeper_add(&self, target: &KeeperTarget) -> Result<()> {
        let url = format!("{}/add", self.endpoints.keeper.trim_end_matches('/'));
        self.get_text(
            "Keeper",
            &url,
            &[
                ("url", target.url.as_str()),
                ("interval", target.interval_mins.as_str()),
            ],
            KEEPER_TIMEOUT,
        )
        .await
        .map(drop)
    }

    pub async fn keeper_delete(&self, site: &str) -> Result<()> {
        let url = format!("{}/delete", self.endpoints.keeper.trim_end_matches('/'));
        let site = ensure_scheme(site);
        self.get_text("Keeper", &url, &[("url", site.as_str())], KEEPER_TIMEOUT)
            .await
            .map(drop)
    }

    /// URL of a freshly generated image.
    pub async fn generate_image(&self, prompt: &str, ratio: AspectRatio) -> Result<String> {
        const SERVICE: &str = "Image Studio";
        let url = self.prexzy("/ai/gemimage");
        let body = self
            .get_json(
                SERVICE,
                &url,
                &[("prompt", prompt), ("aspect_ratio", ratio.as_str())],
                SLOW_TIMEOUT,
            )
            .await?;
        if !truthy(body.get("status")) {
            return Err(failure(SERVICE, &body, "Failed to generate image"));
        }
        PayloadExtractor::keys(SERVICE, &["image_url"]).extract(&body)
    }
}
