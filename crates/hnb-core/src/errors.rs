/// Core error type for the bot.
///
/// Adapter crates map their specific errors into this type so handlers can turn
/// any failure into a user-facing message instead of a crash.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),

    /// Upstream answered with a non-2xx status.
    #[error("{service} returned HTTP {status}")]
    UpstreamStatus { service: &'static str, status: u16 },

    /// Request never produced a usable body (timeout, connect error, malformed JSON).
    #[error("{service} request failed: {reason}")]
    UpstreamRequest {
        service: &'static str,
        reason: String,
    },

    /// Body parsed but none of the extractors found a payload.
    #[error("{service} returned no usable payload")]
    NoPayload { service: &'static str },

    #[error("storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Inline HTML shown to the user in place of a reply.
    pub fn user_html(&self) -> String {
        match self {
            Error::UpstreamStatus { service, status } => {
                format!("❌ <b>{service} Error:</b> Status Code {status}")
            }
            Error::NoPayload { service } => {
                format!("⚠️ <b>Empty Pulse:</b> {service} returned no data.")
            }
            other => format!(
                "❌ <b>Error:</b> {}",
                crate::formatting::escape_html(&other.to_string())
            ),
        }
    }

    pub fn upstream_request(service: &'static str, err: impl std::fmt::Display) -> Self {
        Error::UpstreamRequest {
            service,
            reason: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_facing_messages() {
        let status = Error::UpstreamStatus {
            service: "Gemini",
            status: 502,
        };
        assert_eq!(status.user_html(), "❌ <b>Gemini Error:</b> Status Code 502");

        let empty = Error::NoPayload { service: "Dolphin" };
        assert_eq!(
            empty.user_html(),
            "⚠️ <b>Empty Pulse:</b> Dolphin returned no data."
        );

        let other = Error::upstream_request("Copilot", "timed out <30s>");
        assert_eq!(
            other.user_html(),
            "❌ <b>Error:</b> Copilot request failed: timed out &lt;30s&gt;"
        );
    }
}
