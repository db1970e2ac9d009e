// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Non-streaming OpenRouter chat-completions driver. Modeled on the shared
//! OpenAI-compatible request builder: one POST per call, JSON body in,
//! first choice's message content out.
use anyhow::{bail, Context};
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::provider::{GenerationMessage, GenerationProvider, GenerationRequest, GenerationRole};

const CHAT_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

pub struct OpenRouterProvider {
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenRouterProvider {
    pub fn new(model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self { model: model.into(), api_key: api_key.into(), client: reqwest::Client::new() }
    }
}

fn role_str(role: GenerationRole) -> &'static str {
    match role {
        GenerationRole::System => "system",
        GenerationRole::User => "user",
        GenerationRole::Assistant => "assistant",
    }
}

fn build_messages(messages: &[GenerationMessage]) -> Vec<Value> {
    messages.iter().map(|m| json!({ "role": role_str(m.role), "content": m.content })).collect()
}

#[async_trait]
impl GenerationProvider for OpenRouterProvider {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, req: &GenerationRequest) -> anyhow::Result<String> {
        let body = json!({
            "model": self.model,
            "messages": build_messages(&req.messages),
            "temperature": req.temperature,
            "max_tokens": req.max_tokens,
            "stream": false,
        });

        let resp = self
            .client
            .post(CHAT_URL)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", "https://court.local")
            .json(&body)
            .send()
            .await
            .with_context(|| format!("openrouter request failed for model {}", self.model))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            bail!("openrouter error {status} for model {}: {text}", self.model);
        }

        let body: Value = resp.json().await.context("openrouter response was not valid json")?;
        let content = body["choices"][0]["message"]["content"].as_str().unwrap_or("").trim();
        if content.is_empty() {
            bail!("openrouter returned empty content for model {}", self.model);
        }
        Ok(content.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_messages_maps_roles() {
        let msgs = vec![
            GenerationMessage { role: GenerationRole::System, content: "you are a judge".into() },
            GenerationMessage { role: GenerationRole::User, content: "proceed".into() },
        ];
        let json = build_messages(&msgs);
        assert_eq!(json[0]["role"], "system");
        assert_eq!(json[1]["role"], "user");
        assert_eq!(json[1]["content"], "proceed");
    }

    #[test]
    fn name_returns_configured_model() {
        let p = OpenRouterProvider::new("anthropic/claude-3-haiku", "sk-test");
        assert_eq!(p.name(), "anthropic/claude-3-haiku");
    }
}
