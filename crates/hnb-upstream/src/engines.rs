//! AI chat engines. Each takes one prompt string and answers with text.

use std::time::Duration;

use hnb_core::{
    extract::PayloadExtractor,
    intent::Feature,
    ports::ChatTurn,
    prompts::{build_transcript, clean_reply, deepseek_prompt, gemini_prompt},
    Result,
};

use crate::{parse_json, Upstream};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Engine {
    ChatGpt,
    Gemini,
    DeepSeek,
    Copilot,
    Dolphin,
    Mistral,
    Granite,
    Llama4,
}

impl Engine {
    pub fn service(self) -> &'static str {
        match self {
            Engine::ChatGpt => "ChatGPT",
            Engine::Gemini => "Gemini",
            Engine::DeepSeek => "DeepSeek",
            Engine::Copilot => "Copilot",
            Engine::Dolphin => "Dolphin",
            Engine::Mistral => "Mistral",
            Engine::Granite => "Granite",
            Engine::Llama4 => "Llama 4",
        }
    }

    /// Engine answering a plain engine feature.
    pub fn for_feature(feature: Feature) -> Option<Self> {
        Some(match feature {
            Feature::ChatGpt => Engine::ChatGpt,
            Feature::Gemini => Engine::Gemini,
            Feature::DeepSeek => Engine::DeepSeek,
            Feature::Copilot => Engine::Copilot,
            Feature::Dolphin => Engine::Dolphin,
            Feature::Mistral => Engine::Mistral,
            Feature::Granite => Engine::Granite,
            Feature::Llama4 => Engine::Llama4,
            _ => return None,
        })
    }

    fn timeout(self) -> Duration {
        match self {
            Engine::ChatGpt => Duration::from_secs(50),
            _ => Duration::from_secs(60),
        }
    }

    fn extractor(self) -> PayloadExtractor {
        let keys: &[&'static str] = match self {
            Engine::ChatGpt => &["reply", "text", "answer", "response"],
            Engine::Gemini => &["reply", "response", "answer", "result", "message"],
            Engine::DeepSeek | Engine::Copilot => &["reply", "result", "data", "response", "answer"],
            Engine::Dolphin | Engine::Mistral | Engine::Granite | Engine::Llama4 => {
                &["reply", "result", "response", "text"]
            }
        };
        PayloadExtractor::keys(self.service(), keys)
    }
}

impl Upstream {
    fn engine_request(&self, engine: Engine, prompt: &str) -> (String, Vec<(&'static str, String)>) {
        let cf = |model: &str| self.prexzy(&format!("/ai/chat--cf-{model}"));
        match engine {
            Engine::ChatGpt => (self.endpoints.chatgpt.clone(), vec![("text", prompt.to_string())]),
            Engine::Gemini => (
                self.endpoints.gemini.clone(),
                vec![("prompt", gemini_prompt(prompt))],
            ),
            Engine::DeepSeek => (
                self.prexzy("/ai/deepseekchat"),
                vec![("prompt", deepseek_prompt(prompt)), ("image?", String::new())],
            ),
            Engine::Copilot => (self.prexzy("/ai/copilot"), vec![("text", prompt.to_string())]),
            Engine::Dolphin => (self.prexzy("/ai/creative"), vec![("text", prompt.to_string())]),
            Engine::Mistral => (
                cf("mistralai-mistral-small-3-1-24b-instruct"),
                vec![("prompt", prompt.to_string()), ("search?", String::new())],
            ),
            Engine::Granite => (
                cf("ibm-granite-granite-4-0-h-micro"),
                vec![("prompt", prompt.to_string()), ("search?", String::new())],
            ),
            Engine::Llama4 => (
                cf("meta-llama-4-scout-17b-16e-instruct"),
                vec![("prompt", prompt.to_string()), ("search?", String::new())],
            ),
        }
    }

    /// Send `prompt` to `engine` and return its answer.
    pub async fn chat(&self, engine: Engine, prompt: &str) -> Result<String> {
        let service = engine.service();
        let (url, params) = self.engine_request(engine, prompt);
        let query: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();

        let body = self.get_text(service, &url, &query, engine.timeout()).await?;
        let reply = match parse_json(service, &body) {
            Ok(json) => engine.extractor().extract(&json)?,
            // The ChatGPT proxy sometimes answers with bare text.
            Err(_) if engine == Engine::ChatGpt && !body.trim().is_empty() => {
                body.trim().to_string()
            }
            Err(e) => return Err(e),
        };

        let reply = match engine {
            Engine::ChatGpt => clean_reply(&reply),
            _ => reply.trim().to_string(),
        };
        tracing::debug!(service, chars = reply.chars().count(), "engine replied");
        Ok(reply)
    }

    /// ChatGPT with an optional system prompt and prior turns folded into one transcript.
    pub async fn chatgpt_with(
        &self,
        system: Option<&str>,
        history: &[ChatTurn],
        prompt: &str,
    ) -> Result<String> {
        let transcript = build_transcript(system, history, prompt);
        self.chat(Engine::ChatGpt, &transcript).await
    }

    /// ChatGPT and Gemini side by side.
    pub async fn compare(&self, prompt: &str) -> (Result<String>, Result<String>) {
        tokio::join!(
            self.chat(Engine::ChatGpt, prompt),
            self.chat(Engine::Gemini, prompt)
        )
    }
}
