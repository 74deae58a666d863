//! `bash`: run a shell command.

use tracing::debug;

use actiontag_core::types::{Action, BashAction};

use super::{attr_or_body, structural_blocks};
use crate::attrs::ParserUtils;
use crate::fixup::unterminated_closer;
use crate::registry::ParserConfig;

pub fn bash_parser() -> ParserConfig {
    ParserConfig::new(&["bash"], parse_bash)
        .self_closing(&["bash"])
        .alias("shell", "bash")
        .alias("run", "bash")
        .protect(&["bash"])
        .fixup(unterminated_closer(&["bash", "shell", "run"]))
}

fn parse_bash(content: &str, utils: &ParserUtils) -> Vec<Action> {
    structural_blocks(content, &["bash"])
        .into_iter()
        .filter_map(|block| {
            let Some(command) = attr_or_body(&block, utils, &["command", "cmd"]) else {
                debug!(open_tag = block.open_tag, "Dropping bash without a command");
                return None;
            };
            let tag = block.open_tag;
            Some(Action::Bash(BashAction {
                command,
                timeout_ms: utils
                    .number_attr(tag, "timeout")
                    .or_else(|| utils.number_attr(tag, "timeout_ms")),
                background: utils.extract_bool_attr(tag, "background"),
                description: utils.attr_trimmed(tag, "description"),
                cwd: utils.first_attr(tag, &["cwd", "workdir"]),
            }))
        })
        .collect()
}
