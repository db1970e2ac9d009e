// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;

/// A single chat-style message sent to a generation provider.
#[derive(Debug, Clone)]
pub struct GenerationMessage {
    pub role: GenerationRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationRole {
    System,
    User,
    Assistant,
}

/// Input to a single generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub messages: Vec<GenerationMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A dialogue-generation backend. One model in the fallback chain.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Identifier used in logs when this provider fails (e.g. the model id).
    fn name(&self) -> &str;

    /// Issue a single completion call. Returns `Ok(text)` on a non-empty
    /// 2xx response, `Err` on transport error, non-2xx status, or empty
    /// content — callers treat all three identically as "this model failed".
    async fn complete(&self, req: &GenerationRequest) -> anyhow::Result<String>;
}
