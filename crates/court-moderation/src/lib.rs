// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Pattern-based content moderation.
//!
//! `moderate` is a pure function: no I/O, no shared state. It runs the
//! input against an ordered catalog of named regex rules and reports every
//! rule that fired, in catalog order, plus a redacted copy of the text.
use once_cell::sync::Lazy;
use regex::Regex;

/// A single named moderation rule.
pub struct Rule {
    pub reason: &'static str,
    pattern: Regex,
}

impl Rule {
    fn new(reason: &'static str, pattern: &str) -> Self {
        Self {
            reason,
            pattern: Regex::new(pattern).expect("moderation rule pattern is valid regex"),
        }
    }
}

/// The fixed placeholder substituted for flagged dialogue.
pub const REDACTION_PLACEHOLDER: &str = "[redacted by content moderation]";

/// Ordered, deterministic catalog of moderation rules. Order matters: it
/// determines the order `reasons` is reported in.
static DEFAULT_CATALOG: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule::new("slur", r"(?i)\b(n[i1]gg(?:er|a)|sp[i1]c|k[i1]ke|ch[i1]nk|f[a4]gg?ot)\b"),
        Rule::new(
            "hate_speech",
            r"(?i)\b(all \w+ (?:are|should be) (?:killed|exterminated|subhuman)|racial(?:ly)? inferior)\b",
        ),
        Rule::new(
            "violence",
            r"(?i)\b(kill (?:you|him|her|them)|slit (?:his|her|your|their) throat|mass shooting|bomb the)\b",
        ),
        Rule::new(
            "harassment",
            r"(?i)\b(kill yourself|kys\b|you should die|i will find (?:you|your family))\b",
        ),
        Rule::new(
            "sexual_content",
            r"(?i)\b(explicit sexual|child (?:porn|sexual abuse)|rape (?:scene|fantasy))\b",
        ),
    ]
});

/// Result of running `moderate` on a piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationResult {
    pub flagged: bool,
    pub reasons: Vec<String>,
    pub sanitized: String,
}

/// Run `text` against the default rule catalog.
pub fn moderate(text: &str) -> ModerationResult {
    moderate_with_catalog(text, &DEFAULT_CATALOG)
}

fn moderate_with_catalog(text: &str, catalog: &[Rule]) -> ModerationResult {
    let mut reasons = Vec::new();
    for rule in catalog {
        if rule.pattern.is_match(text) {
            reasons.push(rule.reason.to_string());
        }
    }
    let flagged = !reasons.is_empty();
    let sanitized = if flagged { REDACTION_PLACEHOLDER.to_string() } else { text.to_string() };
    ModerationResult { flagged, reasons, sanitized }
}

/// A moderation catalog built from caller-supplied rules, for tests that
/// want to probe catalog-order behavior without depending on the exact
/// production ruleset.
pub struct ModerationCatalog {
    rules: Vec<Rule>,
}

impl ModerationCatalog {
    pub fn custom(rules: Vec<(&'static str, &str)>) -> Self {
        Self { rules: rules.into_iter().map(|(reason, pattern)| Rule::new(reason, pattern)).collect() }
    }

    pub fn moderate(&self, text: &str) -> ModerationResult {
        moderate_with_catalog(text, &self.rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_passes_through_unmodified() {
        let r = moderate("Did the defendant replace all office coffee with soup?");
        assert!(!r.flagged);
        assert!(r.reasons.is_empty());
        assert_eq!(r.sanitized, "Did the defendant replace all office coffee with soup?");
    }

    #[test]
    fn slur_is_flagged_and_redacted() {
        let r = moderate("that kike stole my parking spot");
        assert!(r.flagged);
        assert_eq!(r.reasons, vec!["slur"]);
        assert_eq!(r.sanitized, REDACTION_PLACEHOLDER);
    }

    #[test]
    fn multiple_rules_contribute_reasons_in_catalog_order() {
        let catalog = ModerationCatalog::custom(vec![
            ("first", r"(?i)alpha"),
            ("second", r"(?i)beta"),
            ("third", r"(?i)gamma"),
        ]);
        let r = catalog.moderate("gamma then alpha then beta");
        assert_eq!(r.reasons, vec!["first", "second", "third"]);
    }

    #[test]
    fn each_rule_contributes_its_reason_only_once() {
        let catalog = ModerationCatalog::custom(vec![("dup", r"(?i)bad")]);
        let r = catalog.moderate("bad bad bad");
        assert_eq!(r.reasons, vec!["dup"]);
    }

    #[test]
    fn topic_moderation_uses_same_primitive() {
        // The gateway calls `moderate` on the session topic before creating
        // it; there is no separate code path.
        let r = moderate("a perfectly ordinary civil dispute about a fence");
        assert!(!r.flagged);
    }
}
