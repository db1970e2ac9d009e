// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Mutex;
use tracing::warn;

use crate::mock::mock_reply;
use crate::provider::{GenerationProvider, GenerationRequest};
use crate::sanitize::sanitize;

/// Iterates a fallback chain of providers, sanitizing and returning the
/// first non-empty response. Falls back to the mock path if every
/// configured provider fails (or none are configured). Per the contract,
/// this call never returns an error — `generate` always produces text.
pub struct GenerationClient {
    providers: Vec<Box<dyn GenerationProvider>>,
    force_mock: bool,
    rng: Mutex<StdRng>,
}

impl GenerationClient {
    pub fn new(providers: Vec<Box<dyn GenerationProvider>>, force_mock: bool) -> Self {
        Self { providers, force_mock, rng: Mutex::new(StdRng::from_os_rng()) }
    }

    /// Construct a client with a seeded rng, for reproducible mock-path tests.
    pub fn with_seed(providers: Vec<Box<dyn GenerationProvider>>, force_mock: bool, seed: u64) -> Self {
        Self { providers, force_mock, rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }

    pub async fn generate(&self, req: GenerationRequest) -> String {
        if !self.force_mock {
            for provider in &self.providers {
                match provider.complete(&req).await {
                    Ok(text) => {
                        let cleaned = sanitize(&text);
                        if !cleaned.is_empty() {
                            return cleaned;
                        }
                        warn!(model = provider.name(), "provider returned empty content after sanitization");
                    }
                    Err(err) => {
                        warn!(model = provider.name(), error = %err, "generation provider failed, trying next");
                    }
                }
            }
        }
        let mut rng = self.rng.lock().unwrap();
        mock_reply(&req, &mut *rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{GenerationMessage, GenerationRole};
    use async_trait::async_trait;

    struct FailingProvider;
    #[async_trait]
    impl GenerationProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }
        async fn complete(&self, _req: &GenerationRequest) -> anyhow::Result<String> {
            anyhow::bail!("boom")
        }
    }

    struct EchoProvider;
    #[async_trait]
    impl GenerationProvider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }
        async fn complete(&self, _req: &GenerationRequest) -> anyhow::Result<String> {
            Ok("**The court** finds in favor of the plaintiff.".to_string())
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            messages: vec![GenerationMessage { role: GenerationRole::User, content: "proceed".into() }],
            temperature: 0.5,
            max_tokens: 100,
        }
    }

    #[tokio::test]
    async fn falls_back_to_mock_when_no_providers_configured() {
        let client = GenerationClient::with_seed(vec![], false, 7);
        let text = client.generate(request()).await;
        assert!(!text.is_empty());
    }

    #[tokio::test]
    async fn force_mock_skips_configured_providers() {
        let client = GenerationClient::with_seed(vec![Box::new(EchoProvider)], true, 7);
        let text = client.generate(request()).await;
        assert_ne!(text, "The court finds in favor of the plaintiff.");
    }

    #[tokio::test]
    async fn falls_through_failing_provider_to_working_one() {
        let client = GenerationClient::with_seed(vec![Box::new(FailingProvider), Box::new(EchoProvider)], false, 7);
        let text = client.generate(request()).await;
        assert_eq!(text, "The court finds in favor of the plaintiff.");
    }

    #[tokio::test]
    async fn falls_back_to_mock_when_every_provider_fails() {
        let client = GenerationClient::with_seed(vec![Box::new(FailingProvider)], false, 7);
        let text = client.generate(request()).await;
        assert!(!text.is_empty());
    }
}
