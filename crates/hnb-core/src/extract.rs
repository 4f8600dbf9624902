//! Ordered payload extraction from loosely shaped upstream JSON.
//!
//! Third-party endpoints disagree on where the answer lives (`reply`, `result`,
//! `data.response`, ...). An extractor tries its steps in order and the first
//! non-empty string wins.

use serde_json::Value;

use crate::{errors::Error, Result};

#[derive(Clone, Copy)]
pub enum Step {
    /// Top-level key.
    Key(&'static str),
    /// Nested keys, outermost first.
    Path(&'static [&'static str]),
    Custom(fn(&Value) -> Option<String>),
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Key(k) => write!(f, "Key({k})"),
            Step::Path(p) => write!(f, "Path({})", p.join(".")),
            Step::Custom(_) => f.write_str("Custom"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PayloadExtractor {
    service: &'static str,
    steps: Vec<Step>,
}

impl PayloadExtractor {
    pub fn new(service: &'static str) -> Self {
        Self {
            service,
            steps: Vec::new(),
        }
    }

    /// Shorthand for a list of top-level keys.
    pub fn keys(service: &'static str, keys: &[&'static str]) -> Self {
        keys.iter().fold(Self::new(service), |acc, k| acc.key(*k))
    }

    pub fn key(mut self, key: &'static str) -> Self {
        self.steps.push(Step::Key(key));
        self
    }

    pub fn path(mut self, path: &'static [&'static str]) -> Self {
        self.steps.push(Step::Path(path));
        self
    }

    pub fn custom(mut self, f: fn(&Value) -> Option<String>) -> Self {
        self.steps.push(Step::Custom(f));
        self
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    pub fn try_extract(&self, body: &Value) -> Option<String> {
        self.steps.iter().find_map(|step| match step {
            Step::Key(k) => body.get(*k).and_then(non_empty_str),
            Step::Path(p) => lookup(body, p).and_then(non_empty_str),
            Step::Custom(f) => f(body).filter(|s| !s.trim().is_empty()),
        })
    }

    pub fn extract(&self, body: &Value) -> Result<String> {
        self.try_extract(body).ok_or(Error::NoPayload {
            service: self.service,
        })
    }
}

/// Walk nested object keys.
pub fn lookup<'a>(body: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(body, |v, k| v.get(*k))
}

fn non_empty_str(v: &Value) -> Option<String> {
    let s = v.as_str()?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// First of `keys` that holds a string or a number, rendered as text.
pub fn first_scalar(obj: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match obj.get(*k)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_order_decides_the_winner() {
        let ex = PayloadExtractor::keys("Gemini", &["reply", "response", "answer"]);
        let body = json!({"answer": "third", "response": "second"});
        assert_eq!(ex.extract(&body).unwrap(), "second");
    }

    #[test]
    fn empty_and_non_string_values_are_skipped() {
        let ex = PayloadExtractor::keys("X", &["reply", "result", "text"]);
        let body = json!({"reply": "   ", "result": {"nested": true}, "text": "ok"});
        assert_eq!(ex.extract(&body).unwrap(), "ok");
    }

    #[test]
    fn nothing_found_is_no_payload() {
        let ex = PayloadExtractor::keys("Copilot", &["reply"]);
        match ex.extract(&json!({"status": false})) {
            Err(Error::NoPayload { service }) => assert_eq!(service, "Copilot"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn paths_and_custom_steps() {
        fn first_item(v: &Value) -> Option<String> {
            v.get("items")?.get(0)?.as_str().map(str::to_string)
        }
        let ex = PayloadExtractor::new("Y")
            .path(&["data", "response"])
            .custom(first_item);

        assert_eq!(
            ex.extract(&json!({"data": {"response": "deep"}})).unwrap(),
            "deep"
        );
        assert_eq!(ex.extract(&json!({"items": ["a", "b"]})).unwrap(), "a");
    }

    #[test]
    fn scalar_lookup_renders_numbers() {
        let v = json!({"Level": 70, "name": ""});
        assert_eq!(first_scalar(&v, &["name", "level", "Level"]).as_deref(), Some("70"));
        assert_eq!(first_scalar(&v, &["missing"]), None);
    }
}
