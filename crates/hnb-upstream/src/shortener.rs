//! URL shortening with a provider fallback chain: Tinube, then TinyURL, then is.gd.

use std::time::Duration;

use hnb_core::formatting::ensure_scheme;

use crate::{parse_json, Upstream};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provider {
    Tinube,
    TinyUrl,
    IsGd,
}

impl Provider {
    pub fn name(self) -> &'static str {
        match self {
            Provider::Tinube => "Tinube",
            Provider::TinyUrl => "TinyURL",
            Provider::IsGd => "is.gd",
        }
    }

    /// Anything after the preferred provider.
    pub fn is_fallback(self) -> bool {
        !matches!(self, Provider::Tinube)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShortLink {
    pub original: String,
    pub short: String,
    pub provider: Provider,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Shortened {
    Link(ShortLink),
    /// Every provider failed; the input may be invalid or all services are down.
    AllFailed,
}

impl Upstream {
    /// Shorten `url` (scheme added when missing), optionally with a custom alias.
    pub async fn shorten(&self, url: &str, alias: Option<&str>) -> Shortened {
        let long = ensure_scheme(url);

        match self.tinube(&long, alias.unwrap_or("")).await {
            Ok(Some(link)) => return Shortened::Link(link),
            Ok(None) => tracing::debug!("tinube returned no short url"),
            Err(e) => tracing::warn!("tinube failed: {e}"),
        }

        let plain = [
            (Provider::TinyUrl, self.endpoints.tinyurl.clone(), false),
            (Provider::IsGd, self.endpoints.isgd.clone(), true),
        ];
        for (provider, endpoint, simple_format) in plain {
            let mut query = vec![("url", long.as_str())];
            if simple_format {
                query.insert(0, ("format", "simple"));
            }
            match self
                .get_text(provider.name(), &endpoint, &query, Duration::from_secs(15))
                .await
            {
                Ok(body) if body.contains("http") => {
                    return Shortened::Link(ShortLink {
                        original: long,
                        short: body.trim().to_string(),
                        provider,
                    });
                }
                Ok(_) => tracing::debug!(provider = provider.name(), "no link in response"),
                Err(e) => tracing::warn!(provider = provider.name(), "shortener failed: {e}"),
            }
        }

        Shortened::AllFailed
    }

    async fn tinube(&self, long: &str, alias: &str) -> hnb_core::Result<Option<ShortLink>> {
        let service = Provider::Tinube.name();
        let url = self.prexzy("/tools/tinube");
        let body = self
            .get_text(
                service,
                &url,
                &[("url", long), ("custom_name", alias)],
                Duration::from_secs(20),
            )
            .await?;
        let json = parse_json(service, &body)?;
        let Some(short) = json
            .get("short_url")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
        else {
            return Ok(None);
        };
        let original = json
            .get("original_url")
            .and_then(|v| v.as_str())
            .unwrap_or(long);
        Ok(Some(ShortLink {
            original: original.to_string(),
            short: short.to_string(),
            provider: Provider::Tinube,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::upstream_for;
    use serde_json::json;
    use wiremock::{
        matchers::{method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    #[tokio::test]
    async fn preferred_provider_wins() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tools/tinube"))
            .and(query_param("url", "https://example.com"))
            .and(query_param("custom_name", "ex"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"short_url": "https://tinu.be/ex"})),
            )
            .mount(&server)
            .await;

        let up = upstream_for(&server).await;
        match up.shorten("example.com", Some("ex")).await {
            Shortened::Link(link) => {
                assert_eq!(link.short, "https://tinu.be/ex");
                assert_eq!(link.original, "https://example.com");
                assert!(!link.provider.is_fallback());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn falls_through_to_the_next_provider() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tools/tinube"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api-create.php"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Error"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/create.php"))
            .and(query_param("format", "simple"))
            .respond_with(ResponseTemplate::new(200).set_body_string("https://is.gd/abc\n"))
            .mount(&server)
            .await;

        let up = upstream_for(&server).await;
        match up.shorten("http://example.com/long", None).await {
            Shortened::Link(link) => {
                assert_eq!(link.provider, Provider::IsGd);
                assert_eq!(link.short, "https://is.gd/abc");
                assert_eq!(link.original, "http://example.com/long");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn all_failed_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let up = upstream_for(&server).await;
        assert_eq!(up.shorten("x.io", None).await, Shortened::AllFailed);
    }
}
