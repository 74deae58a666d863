//! Attribute extraction and payload helpers handed to every sub-parser.

use regex::Regex;
use std::sync::LazyLock;

use actiontag_core::config::ParserSettings;

use crate::corruption::CorruptionDetector;

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_][\w:-]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|((?:/?[^\s"'<>/]+)+))"#)
        .unwrap()
});

static QUOTED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""[^"]*"|'[^']*'"#).unwrap());

fn same_attr_name(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a.bytes().zip(b.bytes()).all(|(x, y)| {
            let x = if x == b'-' { b'_' } else { x.to_ascii_lowercase() };
            let y = if y == b'-' { b'_' } else { y.to_ascii_lowercase() };
            x == y
        })
}

/// Value of attribute `name` in a raw tag string.
///
/// Accepts `"double"`, `'single'` and bare unquoted values, in any order.
/// Names compare case-insensitively and treat `-` and `_` as equal. The
/// first occurrence wins.
pub fn extract_attr(tag: &str, name: &str) -> Option<String> {
    ATTR_RE.captures_iter(tag).find_map(|caps| {
        let attr = caps.get(1)?.as_str();
        if !same_attr_name(attr, name) {
            return None;
        }
        caps.get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map(|m| m.as_str().to_string())
    })
}

/// True when the attribute's value is `true`, `1` or `yes`, or when the
/// attribute is present as a bare flag (`<list recursive/>`).
pub fn extract_bool_attr(tag: &str, name: &str) -> bool {
    match extract_attr(tag, name) {
        Some(value) => matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes"
        ),
        None => has_flag(tag, name),
    }
}

fn has_flag(tag: &str, name: &str) -> bool {
    let unquoted = QUOTED_RE.replace_all(tag, " ");
    unquoted
        .split(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .skip(1)
        .any(|token| same_attr_name(token, name))
}

/// Decode the HTML entities models emit inside payloads.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Drop exactly one leading and one trailing newline.
pub fn trim_one_newline(text: &str) -> &str {
    let text = text
        .strip_prefix("\r\n")
        .or_else(|| text.strip_prefix('\n'))
        .unwrap_or(text);
    text.strip_suffix("\r\n")
        .or_else(|| text.strip_suffix('\n'))
        .unwrap_or(text)
}

/// If `text` is nothing but one fenced code block, return its inside.
pub fn unwrap_sole_fence(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    let marker = if trimmed.starts_with("```") {
        "```"
    } else if trimmed.starts_with("~~~") {
        "~~~"
    } else {
        return None;
    };
    let first_newline = trimmed.find('\n')?;
    let inner = trimmed[first_newline + 1..].strip_suffix(marker)?;
    if inner.contains(marker) {
        return None;
    }
    Some(inner.strip_suffix('\n').unwrap_or(inner))
}

/// Stateless helpers passed to every sub-parser.
#[derive(Debug, Clone, Default)]
pub struct ParserUtils {
    corruption: CorruptionDetector,
}

impl ParserUtils {
    pub fn new(corruption: CorruptionDetector) -> Self {
        Self { corruption }
    }

    pub fn from_settings(settings: &ParserSettings) -> Self {
        Self::new(CorruptionDetector::from_settings(settings))
    }

    pub fn extract_attr(&self, tag: &str, name: &str) -> Option<String> {
        extract_attr(tag, name)
    }

    pub fn extract_bool_attr(&self, tag: &str, name: &str) -> bool {
        extract_bool_attr(tag, name)
    }

    /// Attribute value with surrounding whitespace removed; empty counts as absent.
    pub fn attr_trimmed(&self, tag: &str, name: &str) -> Option<String> {
        extract_attr(tag, name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// First non-empty attribute among `names`.
    pub fn first_attr(&self, tag: &str, names: &[&str]) -> Option<String> {
        names.iter().find_map(|n| self.attr_trimmed(tag, n))
    }

    /// Parse a numeric attribute; malformed numbers count as absent.
    pub fn number_attr<T: std::str::FromStr>(&self, tag: &str, name: &str) -> Option<T> {
        self.attr_trimmed(tag, name)?.parse().ok()
    }

    pub fn decode_entities(&self, text: &str) -> String {
        decode_entities(text)
    }

    /// Normalize a content-bearing body into the payload handed to a handler:
    /// one surrounding newline trimmed, a sole wrapping fence removed, and
    /// entities decoded.
    pub fn clean_payload(&self, body: &str) -> String {
        let body = trim_one_newline(body);
        let body = unwrap_sole_fence(body).unwrap_or(body);
        decode_entities(body)
    }

    /// Screen a raw payload bound for `path`; `Some(reason)` means reject.
    pub fn check_corruption(&self, payload: &str, path: &str) -> Option<String> {
        self.corruption.check(payload, path)
    }

    pub fn corruption(&self) -> &CorruptionDetector {
        &self.corruption
    }
}
