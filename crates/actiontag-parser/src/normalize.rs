//! Alias normalization: every recognized tag spelling becomes canonical.
//!
//! Runs as a single left-to-right scan over `<name` and `</name` tokens.
//! The body of a closed content-bearing tag is copied through as-is, so a
//! payload that happens to contain `<Read>` or `<read_file>` is preserved.

use regex::Regex;
use std::sync::LazyLock;

use crate::isolate::{code_shadow, hunk_shadow};
use crate::registry::TagRegistry;

static TAG_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(/?)([a-z][\w-]*)").unwrap());

static CLOSE_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</([a-z][\w-]*)\s*>").unwrap());

/// Rewrite tag names to their canonical spelling. Idempotent.
pub fn normalize_tags(content: &str, tags: &TagRegistry) -> String {
    if tags.is_empty() || !content.contains('<') {
        return content.to_string();
    }

    let mut out = String::with_capacity(content.len());
    let mut copied = 0;
    let mut pos = 0;

    while let Some(caps) = TAG_TOKEN_RE.captures_at(content, pos) {
        let (Some(slash), Some(name)) = (caps.get(1), caps.get(2)) else {
            break;
        };
        pos = name.end();
        let Some(canonical) = tags.canonical(name.as_str()) else {
            continue;
        };

        out.push_str(&content[copied..name.start()]);
        out.push_str(canonical);
        copied = name.end();

        let opens_content = slash.as_str().is_empty()
            && tags.is_content_tag(canonical)
            && !is_self_closing(content, name.end());
        if !opens_content {
            continue;
        }
        if let Some((close_start, close_end)) = find_content_closer(content, pos, canonical, tags) {
            out.push_str(&content[copied..close_start]);
            out.push_str(canonical);
            copied = close_end;
            pos = close_end;
        }
    }

    out.push_str(&content[copied..]);
    out
}

/// Whether the tag whose name ends at `from` closes itself with `/>`.
fn is_self_closing(content: &str, from: usize) -> bool {
    let mut quote: Option<char> = None;
    let mut last_significant = None;
    for c in content[from..].chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '>') => return last_significant == Some('/'),
            (None, '<') => return false,
            (None, c) if c.is_whitespace() => {}
            (None, c) => last_significant = Some(c),
        }
    }
    false
}

/// Name span of the first closer at or after `from` resolving to
/// `canonical`. Closers shadowed by code or an unfinished hunk are skipped,
/// matching where the isolator ends the same block.
fn find_content_closer(
    content: &str,
    from: usize,
    canonical: &str,
    tags: &TagRegistry,
) -> Option<(usize, usize)> {
    let mut search = from;
    while let Some(caps) = CLOSE_TOKEN_RE.captures_at(content, search) {
        let (whole, name) = (caps.get(0)?, caps.get(1)?);
        if tags.canonical(name.as_str()) != Some(canonical) {
            search = whole.end();
            continue;
        }
        let shadow = code_shadow(content, from, whole.start())
            .or_else(|| hunk_shadow(content, from, whole.start()));
        match shadow {
            Some(resume) => search = resume,
            None => return Some((name.start(), name.end())),
        }
    }
    None
}
