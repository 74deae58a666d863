//! Screening of content-bearing payloads for leaked action syntax.
//!
//! A model that loses track of its own output format tends to write action
//! tags into file content, or to spell newlines as literal `\n` followed by
//! indentation. Payloads showing those symptoms are rejected before they
//! become `write`, `create` or `edit` actions.

use regex::{Regex, RegexSet};
use std::sync::LazyLock;
use tracing::warn;

use actiontag_core::config::ParserSettings;

use crate::attrs::extract_attr;

static NESTED_EDIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<edit\s[^>]*").unwrap());

static ESCAPED_NEWLINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\n[ \t]{2,}").unwrap());

/// Raw action-tag shapes counted by the distinct-pattern rule.
const ACTION_TAG_PATTERNS: &[&str] = &[
    r"(?i)<edit[\s>]",
    r"(?i)</edit>",
    r"(?i)<bash[\s>]",
    r"(?i)</bash>",
    r"(?i)<say>",
    r"(?i)</say>",
    r"(?i)<write[\s>]",
    r"(?i)</write>",
    r"(?i)<create[\s>]",
    r"(?i)</create>",
];

static ACTION_TAG_SET: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new(ACTION_TAG_PATTERNS).expect("Invalid action tag pattern set")
});

/// Heuristic detector; every threshold comes from [`ParserSettings`].
#[derive(Debug, Clone)]
pub struct CorruptionDetector {
    max_distinct_action_tags: usize,
    max_escaped_newlines: usize,
    detect_self_edit: bool,
}

impl Default for CorruptionDetector {
    fn default() -> Self {
        Self::from_settings(&ParserSettings::default())
    }
}

impl CorruptionDetector {
    pub fn from_settings(settings: &ParserSettings) -> Self {
        Self {
            max_distinct_action_tags: settings.max_distinct_action_tags,
            max_escaped_newlines: settings.max_escaped_newlines,
            detect_self_edit: settings.detect_self_edit,
        }
    }

    /// Returns the rejection reason, or `None` if the payload looks sane.
    /// Rejections are logged at `warn`.
    pub fn check(&self, payload: &str, path: &str) -> Option<String> {
        let reason = self
            .self_edit(payload, path)
            .or_else(|| self.action_tag_soup(payload))
            .or_else(|| self.escaped_newlines(payload))?;
        warn!(path = %path, reason = %reason, "Rejected corrupted payload");
        Some(reason)
    }

    fn self_edit(&self, payload: &str, path: &str) -> Option<String> {
        if !self.detect_self_edit {
            return None;
        }
        let target = normalize_path(path);
        NESTED_EDIT_RE.find_iter(payload).find_map(|m| {
            let nested = extract_attr(m.as_str(), "path").or_else(|| extract_attr(m.as_str(), "file"))?;
            (normalize_path(&nested) == target)
                .then(|| format!("payload contains a nested edit of {}", target))
        })
    }

    fn action_tag_soup(&self, payload: &str) -> Option<String> {
        if self.max_distinct_action_tags == 0 {
            return None;
        }
        let distinct = ACTION_TAG_SET.matches(payload).iter().count();
        (distinct >= self.max_distinct_action_tags)
            .then(|| format!("payload contains {} distinct action tag patterns", distinct))
    }

    fn escaped_newlines(&self, payload: &str) -> Option<String> {
        if self.max_escaped_newlines == 0 {
            return None;
        }
        let escaped = ESCAPED_NEWLINE_RE.find_iter(payload).count();
        let real = payload.matches('\n').count();
        (escaped > self.max_escaped_newlines && escaped > real).then(|| {
            format!(
                "payload uses {} escaped newlines against {} real ones",
                escaped, real
            )
        })
    }
}

fn normalize_path(path: &str) -> String {
    let path = path.trim().replace('\\', "/");
    path.strip_prefix("./").unwrap_or(&path).to_string()
}
