// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Organic objections: a two-layer hook run
//! after any adversarial attorney turn.
use court_generation::{GenerationClient, GenerationMessage, GenerationRequest, GenerationRole};

const CLASSIFIER_PROMPT: &str =
    "You are a courtroom objection classifier. Given the attorney's last line, respond with exactly \
     \"yes: <type>\" (e.g. \"yes: hearsay\") if it warrants an objection, or \"no\" otherwise.";

/// Strip a leading `OBJECTION:` (case-insensitive) and return the remainder
/// trimmed, or `None` if the dialogue does not start with that marker.
fn literal_objection_type(dialogue: &str) -> Option<String> {
    let trimmed = dialogue.trim_start();
    let prefix = "OBJECTION:";
    if trimmed.len() >= prefix.len() && trimmed[..prefix.len()].eq_ignore_ascii_case(prefix) {
        let remainder = trimmed[prefix.len()..].trim();
        return Some(if remainder.is_empty() { "unspecified".to_string() } else { remainder.to_string() });
    }
    None
}

fn parse_classifier_reply(reply: &str) -> Option<String> {
    let reply = reply.trim();
    let lower = reply.to_ascii_lowercase();
    if let Some(rest) = lower.strip_prefix("yes:") {
        let start = reply.len() - rest.len();
        return Some(reply[start..].trim().to_string());
    }
    None
}

/// (1) a literal `OBJECTION:` prefix, case-insensitive; (2) else ask the
/// generation client to classify the dialogue. Returns the objection type
/// if either layer fires.
pub async fn detect_objection(dialogue: &str, generation: &GenerationClient) -> Option<String> {
    if let Some(objection_type) = literal_objection_type(dialogue) {
        return Some(objection_type);
    }

    let request = GenerationRequest {
        messages: vec![
            GenerationMessage { role: GenerationRole::System, content: CLASSIFIER_PROMPT.to_string() },
            GenerationMessage { role: GenerationRole::User, content: dialogue.to_string() },
        ],
        temperature: 0.0,
        max_tokens: 16,
    };
    let reply = generation.generate(request).await;
    parse_classifier_reply(&reply)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_prefix_is_captured_case_insensitively() {
        assert_eq!(literal_objection_type("objection: hearsay"), Some("hearsay".to_string()));
        assert_eq!(literal_objection_type("OBJECTION: Leading the witness"), Some("Leading the witness".to_string()));
        assert_eq!(literal_objection_type("Objection:"), Some("unspecified".to_string()));
    }

    #[test]
    fn non_objection_dialogue_has_no_literal_match() {
        assert_eq!(literal_objection_type("The defendant was present that night."), None);
    }

    #[test]
    fn classifier_reply_is_parsed_when_affirmative() {
        assert_eq!(parse_classifier_reply("yes: hearsay"), Some("hearsay".to_string()));
        assert_eq!(parse_classifier_reply("YES: Leading"), Some("Leading".to_string()));
    }

    #[test]
    fn classifier_reply_is_none_when_negative() {
        assert_eq!(parse_classifier_reply("no"), None);
        assert_eq!(parse_classifier_reply("unrelated text"), None);
    }

    #[tokio::test]
    async fn literal_prefix_short_circuits_the_generation_client() {
        let generation = GenerationClient::new(vec![], true);
        let result = detect_objection("OBJECTION: speculation", &generation).await;
        assert_eq!(result, Some("speculation".to_string()));
    }
}
