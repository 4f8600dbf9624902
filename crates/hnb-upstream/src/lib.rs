//! HTTP adapter for every third-party API the bot talks to.
//!
//! One GET (or POST) per call, a fixed timeout, JSON in, typed value or
//! `hnb_core::Error` out. No retries.

use std::time::Duration;

use serde_json::Value;

use hnb_core::{config::Endpoints, errors::Error, Result};

pub mod engines;
pub mod lookups;
pub mod shortener;
pub mod tempmail;

pub use engines::Engine;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Shared HTTP client plus the configured base URLs.
#[derive(Clone, Debug)]
pub struct Upstream {
    http: reqwest::Client,
    endpoints: Endpoints,
}

impl Upstream {
    pub fn new(endpoints: Endpoints) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(concat!("hinata-bot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("http client build failed: {e}")))?;
        Ok(Self { http, endpoints })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    fn prexzy(&self, path: &str) -> String {
        format!("{}{}", self.endpoints.prexzy.trim_end_matches('/'), path)
    }

    /// GET and return the raw body of a 2xx response.
    async fn get_text(
        &self,
        service: &'static str,
        url: &str,
        query: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<String> {
        let resp = self
            .http
            .get(url)
            .query(query)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Error::upstream_request(service, e))?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(service, status = status.as_u16(), "upstream returned an error status");
            return Err(Error::UpstreamStatus {
                service,
                status: status.as_u16(),
            });
        }
        resp.text()
            .await
            .map_err(|e| Error::upstream_request(service, e))
    }

    /// GET and parse a 2xx JSON body.
    async fn get_json(
        &self,
        service: &'static str,
        url: &str,
        query: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<Value> {
        let body = self.get_text(service, url, query, timeout).await?;
        parse_json(service, &body)
    }
}

fn parse_json(service: &'static str, body: &str) -> Result<Value> {
    serde_json::from_str(body).map_err(|e| Error::upstream_request(service, e))
}

/// `true` for JSON `true`, non-zero numbers and non-empty strings other than "false".
pub(crate) fn truthy(v: Option<&Value>) -> bool {
    match v {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty() && s != "false",
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
        _ => false,
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    #[test]
    fn truthiness() {
        assert!(truthy(Some(&json!(true))));
        assert!(truthy(Some(&json!(1))));
        assert!(truthy(Some(&json!("ok"))));
        assert!(!truthy(Some(&json!("false"))));
        assert!(!truthy(Some(&json!(0))));
        assert!(!truthy(None));
    }

    #[tokio::test]
    async fn non_success_status_is_typed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/down"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let up = test_support::upstream_for(&server).await;
        let url = format!("{}/down", server.uri());
        match up.get_json("Health", &url, &[], Duration::from_secs(5)).await {
            Err(Error::UpstreamStatus { service, status }) => {
                assert_eq!((service, status), ("Health", 503));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_json_is_a_request_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/html"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let up = test_support::upstream_for(&server).await;
        let url = format!("{}/html", server.uri());
        let err = up
            .get_json("Health", &url, &[], Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UpstreamRequest { service: "Health", .. }));
    }
}
