//! Disposable inbox over the mail.tm API.

use std::{sync::OnceLock, time::Duration};

use rand::{distributions::Alphanumeric, Rng};
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};

use hnb_core::{errors::Error, session::TempMailAccount, Result};

use crate::{parse_json, Upstream};

const SERVICE: &str = "TempMail";
const TIMEOUT: Duration = Duration::from_secs(30);

/// Inbox entry, newest first as returned by the API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MailSummary {
    pub id: String,
    pub from: String,
    pub subject: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MailMessage {
    pub summary: MailSummary,
    pub body: String,
    pub otp: Option<String>,
}

#[derive(Deserialize)]
struct TokenBody {
    token: Option<String>,
}

fn otp_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d{4,8}\b").ok()).as_ref()
}

/// First 4 to 8 digit code in the body, else in the subject.
pub fn find_otp(body: &str, subject: &str) -> Option<String> {
    let re = otp_regex()?;
    re.find(body)
        .or_else(|| re.find(subject))
        .map(|m| m.as_str().to_string())
}

fn random_credentials(rng: &mut impl Rng) -> (String, String) {
    const LOCAL: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let local: String = (0..8)
        .map(|_| LOCAL[rng.gen_range(0..LOCAL.len())] as char)
        .collect();
    let password: String = (0..12).map(|_| rng.sample(Alphanumeric) as char).collect();
    (local, password)
}

fn members(body: &Value) -> Vec<Value> {
    body.get("hydra:member")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn summary(item: &Value) -> Option<MailSummary> {
    Some(MailSummary {
        id: item.get("id")?.as_str()?.to_string(),
        from: item
            .pointer("/from/address")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string(),
        subject: item
            .get("subject")
            .and_then(Value::as_str)
            .unwrap_or("(no subject)")
            .to_string(),
    })
}

impl Upstream {
    fn mail_url(&self, path: &str) -> String {
        format!("{}{}", self.endpoints.temp_mail.trim_end_matches('/'), path)
    }

    /// Create an account on the first offered domain and log in.
    pub async fn create_temp_mail(&self) -> Result<TempMailAccount> {
        let domains = self
            .get_json(SERVICE, &self.mail_url("/domains"), &[], TIMEOUT)
            .await?;
        let domain = members(&domains)
            .first()
            .and_then(|d| d.get("domain"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(Error::NoPayload { service: SERVICE })?;

        let (local, password) = random_credentials(&mut rand::thread_rng());
        let address = format!("{local}@{domain}");

        let resp = self
            .http
            .post(self.mail_url("/accounts"))
            .json(&json!({"address": address, "password": password}))
            .timeout(TIMEOUT)
            .send()
            .await
            .map_err(|e| Error::upstream_request(SERVICE, e))?;
        if !resp.status().is_success() {
            return Err(Error::UpstreamStatus {
                service: SERVICE,
                status: resp.status().as_u16(),
            });
        }

        let token = self.temp_mail_login(&address, &password).await?;
        tracing::info!(%address, "temp mail account created");
        Ok(TempMailAccount {
            address,
            password,
            token,
        })
    }

    async fn temp_mail_login(&self, address: &str, password: &str) -> Result<String> {
        let resp = self
            .http
            .post(self.mail_url("/token"))
            .json(&json!({"address": address, "password": password}))
            .timeout(TIMEOUT)
            .send()
            .await
            .map_err(|e| Error::upstream_request(SERVICE, e))?;
        if !resp.status().is_success() {
            return Err(Error::UpstreamStatus {
                service: SERVICE,
                status: resp.status().as_u16(),
            });
        }
        let body: TokenBody = resp
            .json()
            .await
            .map_err(|e| Error::upstream_request(SERVICE, e))?;
        body.token
            .filter(|t| !t.is_empty())
            .ok_or(Error::NoPayload { service: SERVICE })
    }

    async fn authed_get(&self, account: &mut TempMailAccount, path: &str) -> Result<Value> {
        let url = self.mail_url(path);
        let mut relogged = false;
        loop {
            let resp = self
                .http
                .get(&url)
                .bearer_auth(&account.token)
                .timeout(TIMEOUT)
                .send()
                .await
                .map_err(|e| Error::upstream_request(SERVICE, e))?;

            let status = resp.status();
            if status == reqwest::StatusCode::UNAUTHORIZED && !relogged {
                // Token expired: log in once more and retry.
                account.token = self
                    .temp_mail_login(&account.address, &account.password)
                    .await?;
                relogged = true;
                continue;
            }
            if !status.is_success() {
                return Err(Error::UpstreamStatus {
                    service: SERVICE,
                    status: status.as_u16(),
                });
            }
            let text = resp
                .text()
                .await
                .map_err(|e| Error::upstream_request(SERVICE, e))?;
            return parse_json(SERVICE, &text);
        }
    }

    /// Inbox listing. May refresh `account.token`.
    pub async fn temp_mail_inbox(&self, account: &mut TempMailAccount) -> Result<Vec<MailSummary>> {
        let body = self.authed_get(account, "/messages").await?;
        Ok(members(&body).iter().filter_map(summary).collect())
    }

    /// The newest message with its body and any OTP found in it.
    pub async fn temp_mail_latest(
        &self,
        account: &mut TempMailAccount,
    ) -> Result<Option<MailMessage>> {
        let inbox = self.temp_mail_inbox(account).await?;
        let Some(latest) = inbox.into_iter().next() else {
            return Ok(None);
        };
        let full = self
            .authed_get(account, &format!("/messages/{}", latest.id))
            .await?;
        let body = full
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let otp = find_otp(&body, &latest.subject);
        Ok(Some(MailMessage {
            summary: latest,
            body,
            otp,
        }))
    }
}
