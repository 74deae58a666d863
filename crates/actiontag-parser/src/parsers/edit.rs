//! `edit` and the `multi-edit` wrapper.
//!
//! An edit body holds one or more SEARCH/REPLACE hunks:
//!
//! ```text
//! <edit path="src/lib.rs">
//! <<<<<<< SEARCH
//! old
//! =======
//! new
//! >>>>>>> REPLACE
//! </edit>
//! ```
//!
//! or `<search>old</search><replace>new</replace>` pairs. Every hunk becomes
//! its own [`EditAction`] against the block's path.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use actiontag_core::types::{Action, EditAction};

use super::content_blocks;
use crate::attrs::{trim_one_newline, ParserUtils};
use crate::fixup::{stray_quote_after_name, tag_spellings, unterminated_closer};
use crate::isolate::TagBlock;
use crate::registry::ParserConfig;

static HUNK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<{7}\s*SEARCH[ \t]*\r?\n(.*?)\r?\n?={7}[ \t]*\r?\n(.*?)\r?\n?>{7}\s*REPLACE")
        .unwrap()
});

static PAIR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<search>(.*?)</search>\s*<replace>(.*?)</replace>").unwrap()
});

pub fn edit_parser() -> ParserConfig {
    ParserConfig::new(&["edit", "multi-edit"], parse_edit)
        .alias("edit-file", "edit")
        .pre_strip()
        .fixup(stray_quote_after_name(&["search", "replace"]))
        .fixup(unterminated_closer(&["edit", "edit-file", "multi-edit"]))
}

fn parse_edit(content: &str, utils: &ParserUtils) -> Vec<Action> {
    let mut actions = Vec::new();
    for block in content_blocks(content, &["edit", "multi-edit"]) {
        if block.name == "multi-edit" {
            actions.extend(parse_multi_edit(&block, utils));
        } else {
            actions.extend(edits_from_block(&block, None, utils));
        }
    }
    actions
}

fn parse_multi_edit(block: &TagBlock<'_>, utils: &ParserUtils) -> Vec<Action> {
    let Some(body) = block.body else {
        debug!(open_tag = block.open_tag, "Dropping unclosed multi-edit");
        return Vec::new();
    };
    let outer_path = utils.first_attr(block.open_tag, &["path", "file"]);
    // Wrapper bodies are skipped by the normalizer, so inner tags may still
    // carry alias spellings.
    let inner_tags = tag_spellings(&["edit", "edit-file"]);
    let inner_tags: Vec<&str> = inner_tags.iter().map(String::as_str).collect();
    content_blocks(body, &inner_tags)
        .iter()
        .flat_map(|inner| edits_from_block(inner, outer_path.as_deref(), utils))
        .collect()
}

fn edits_from_block(
    block: &TagBlock<'_>,
    inherited_path: Option<&str>,
    utils: &ParserUtils,
) -> Vec<Action> {
    let path = utils
        .first_attr(block.open_tag, &["path", "file"])
        .or_else(|| inherited_path.map(str::to_string));
    let (Some(path), Some(body)) = (path, block.body) else {
        debug!(open_tag = block.open_tag, "Dropping edit without a path or body");
        return Vec::new();
    };
    if utils.check_corruption(body, &path).is_some() {
        return Vec::new();
    }

    let replace_all = utils.extract_bool_attr(block.open_tag, "replace_all");
    let hunks = hunks(body, utils);
    if hunks.is_empty() {
        debug!(path = %path, "Edit block contained no search/replace hunks");
    }
    hunks
        .into_iter()
        .map(|(search, replace)| {
            Action::Edit(EditAction {
                path: path.clone(),
                search,
                replace,
                replace_all,
            })
        })
        .collect()
}

/// Conflict-marker hunks if any, otherwise `<search>/<replace>` pairs.
fn hunks(body: &str, utils: &ParserUtils) -> Vec<(String, String)> {
    let marker_hunks: Vec<(String, String)> = HUNK_RE
        .captures_iter(body)
        .map(|caps| {
            (
                utils.decode_entities(&caps[1]),
                utils.decode_entities(&caps[2]),
            )
        })
        .collect();
    if !marker_hunks.is_empty() {
        return marker_hunks;
    }
    PAIR_RE
        .captures_iter(body)
        .map(|caps| {
            (
                utils.decode_entities(trim_one_newline(&caps[1])),
                utils.decode_entities(trim_one_newline(&caps[2])),
            )
        })
        .collect()
}
