//! Built-in action families.
//!
//! Each submodule exposes one constructor per family returning a
//! [`ParserConfig`]. Content-bearing families are listed first, then
//! `plan` (which carves its own blocks out), then the structural ones.

pub mod agent;
pub mod connectors;
pub mod edit;
pub mod files;
pub mod messaging;
pub mod schedule;
pub mod search;
pub mod shell;
pub mod web;

use crate::attrs::ParserUtils;
use crate::isolate::{ScanMode, TagBlock, TagMatcher};
use crate::registry::ParserConfig;

/// Every built-in family in registration order.
pub fn builtin_parsers() -> Vec<ParserConfig> {
    vec![
        files::write_parser(),
        files::create_parser(),
        edit::edit_parser(),
        messaging::say_parser(),
        agent::end_parser(),
        agent::task_parser(),
        agent::plan_parser(),
        files::read_parser(),
        shell::bash_parser(),
        search::grep_parser(),
        search::glob_parser(),
        search::list_parser(),
        web::fetch_parser(),
        schedule::schedule_parser(),
        schedule::unschedule_parser(),
        messaging::notify_parser(),
        agent::skill_parser(),
        connectors::telegram_config_parser(),
        connectors::discord_config_parser(),
    ]
}

pub(crate) fn structural_blocks<'a>(content: &'a str, tags: &[&str]) -> Vec<TagBlock<'a>> {
    TagMatcher::of(tags.iter().copied(), ScanMode::Structural).find_blocks(content)
}

pub(crate) fn content_blocks<'a>(content: &'a str, tags: &[&str]) -> Vec<TagBlock<'a>> {
    TagMatcher::of(tags.iter().copied(), ScanMode::Content).find_blocks(content)
}

/// Trimmed, entity-decoded body of a structural block; empty counts as absent.
pub(crate) fn body_text(block: &TagBlock<'_>, utils: &ParserUtils) -> Option<String> {
    block
        .body
        .map(|b| utils.decode_entities(b.trim()))
        .filter(|b| !b.is_empty())
}

/// Attribute value, falling back to the block body.
pub(crate) fn attr_or_body(
    block: &TagBlock<'_>,
    utils: &ParserUtils,
    names: &[&str],
) -> Option<String> {
    utils
        .first_attr(block.open_tag, names)
        .map(|v| utils.decode_entities(&v))
        .or_else(|| body_text(block, utils))
}

/// Tri-state boolean attribute: `None` when absent.
pub(crate) fn optional_bool(block: &TagBlock<'_>, utils: &ParserUtils, name: &str) -> Option<bool> {
    utils
        .extract_attr(block.open_tag, name)
        .map(|_| utils.extract_bool_attr(block.open_tag, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_families_have_unique_tags() {
        let parsers = builtin_parsers();
        let mut seen = std::collections::HashSet::new();
        for config in &parsers {
            for tag in config.canonical_tags() {
                assert!(seen.insert(tag.to_string()), "duplicate tag {}", tag);
            }
        }
    }

    #[test]
    fn test_content_families_precede_structural() {
        let parsers = builtin_parsers();
        let first_structural = parsers.iter().position(|c| !c.pre_strip).unwrap();
        assert!(parsers[first_structural..].iter().all(|c| !c.pre_strip));
    }

    #[test]
    fn test_attr_or_body() {
        let utils = ParserUtils::default();
        let blocks = structural_blocks("<glob>src/**/*.rs</glob>", &["glob"]);
        assert_eq!(
            attr_or_body(&blocks[0], &utils, &["pattern"]),
            Some("src/**/*.rs".to_string())
        );
    }

    #[test]
    fn test_optional_bool() {
        let utils = ParserUtils::default();
        let blocks = structural_blocks(r#"<x enabled="no"/><x/>"#, &["x"]);
        assert_eq!(optional_bool(&blocks[0], &utils, "enabled"), Some(false));
        assert_eq!(optional_bool(&blocks[1], &utils, "enabled"), None);
    }
}
