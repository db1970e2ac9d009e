// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Cleans up raw model output before it is spoken by a courtroom agent:
//! strips markdown emphasis, URLs, tag-like markup, and quoting, then
//! collapses whitespace.
use once_cell::sync::Lazy;
use regex::Regex;

static MARKDOWN_EMPHASIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[*_`~]+").unwrap());
static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").unwrap());
static TAG_LIKE: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?[A-Za-z][A-Za-z0-9_-]*\s*/?>").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

pub fn sanitize(text: &str) -> String {
    let no_urls = URL.replace_all(text, "");
    let no_tags = TAG_LIKE.replace_all(&no_urls, "");
    let no_emphasis = MARKDOWN_EMPHASIS.replace_all(&no_tags, "");
    let collapsed = WHITESPACE.replace_all(no_emphasis.trim(), " ");
    collapsed.trim_matches(|c| c == '"' || c == '\'').trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markdown_emphasis() {
        assert_eq!(sanitize("**objection!** that's *hearsay*"), "objection! that's hearsay");
    }

    #[test]
    fn strips_urls() {
        assert_eq!(sanitize("see https://example.com/exhibit for details"), "see for details");
    }

    #[test]
    fn strips_tag_like_markup() {
        assert_eq!(sanitize("<think>reasoning</think>the witness lied"), "reasoningthe witness lied");
    }

    #[test]
    fn strips_surrounding_quotes() {
        assert_eq!(sanitize("\"I object, your honor\""), "I object, your honor");
    }

    #[test]
    fn collapses_internal_whitespace() {
        assert_eq!(sanitize("the   defendant\n\nwas   present"), "the defendant was present");
    }

    #[test]
    fn leaves_plain_text_unchanged() {
        assert_eq!(sanitize("the defendant was present"), "the defendant was present");
    }
}
