//! Agent control: `end`, `task`, `plan` and `skill`.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use actiontag_core::types::{Action, EndAction, PlanAction, SkillAction, TaskAction};

use super::{body_text, content_blocks, structural_blocks};
use crate::attrs::ParserUtils;
use crate::fixup::{unterminated_closer, unterminated_self_closing};
use crate::registry::ParserConfig;

static STEP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<step(?:\s[^>]*)?>(.*?)</step\s*>").unwrap());

static LIST_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[-*+]|\d+[.)])\s+(.+?)\s*$").unwrap());

pub fn end_parser() -> ParserConfig {
    ParserConfig::new(&["end"], parse_end)
        .self_closing(&["end"])
        .alias("done", "end")
        .pre_strip()
        .fixup(unterminated_closer(&["end", "done"]))
}

pub fn task_parser() -> ParserConfig {
    ParserConfig::new(&["task"], parse_task)
        .alias("subtask", "task")
        .pre_strip()
        .fixup(unterminated_closer(&["task", "subtask"]))
}

/// Plan blocks are carved out once parsed, so steps that describe future
/// actions are not picked up by the structural families after it.
pub fn plan_parser() -> ParserConfig {
    ParserConfig::new(&["plan"], parse_plan)
        .strip_after(&["plan"])
        .fixup(unterminated_closer(&["plan"]))
}

pub fn skill_parser() -> ParserConfig {
    ParserConfig::new(&["skill"], parse_skill)
        .self_closing(&["skill"])
        .fixup(unterminated_self_closing(&["skill"]))
        .fixup(unterminated_closer(&["skill"]))
}

fn parse_end(content: &str, utils: &ParserUtils) -> Vec<Action> {
    content_blocks(content, &["end"])
        .into_iter()
        .map(|block| {
            let summary = block
                .body
                .map(|b| utils.clean_payload(b.trim()))
                .filter(|s| !s.is_empty())
                .or_else(|| utils.attr_trimmed(block.open_tag, "summary"));
            Action::End(EndAction { summary })
        })
        .collect()
}

fn parse_task(content: &str, utils: &ParserUtils) -> Vec<Action> {
    content_blocks(content, &["task"])
        .into_iter()
        .filter_map(|block| {
            let prompt = block
                .body
                .map(|b| utils.clean_payload(b.trim()))
                .filter(|p| !p.is_empty());
            let Some(prompt) = prompt else {
                debug!(open_tag = block.open_tag, "Dropping task without a prompt");
                return None;
            };
            Some(Action::Task(TaskAction {
                prompt,
                description: utils.attr_trimmed(block.open_tag, "description"),
                agent: utils.first_attr(block.open_tag, &["agent", "subagent"]),
            }))
        })
        .collect()
}

/// `<step>` children if present, otherwise bulleted or numbered lines.
fn plan_steps(body: &str, utils: &ParserUtils) -> Vec<String> {
    let tagged: Vec<String> = STEP_RE
        .captures_iter(body)
        .map(|caps| utils.decode_entities(caps[1].trim()))
        .filter(|s| !s.is_empty())
        .collect();
    if !tagged.is_empty() {
        return tagged;
    }
    body.lines()
        .filter_map(|line| LIST_ITEM_RE.captures(line))
        .map(|caps| utils.decode_entities(&caps[1]))
        .collect()
}

fn parse_plan(content: &str, utils: &ParserUtils) -> Vec<Action> {
    structural_blocks(content, &["plan"])
        .into_iter()
        .filter_map(|block| {
            let steps = block.body.map(|b| plan_steps(b, utils)).unwrap_or_default();
            if steps.is_empty() {
                debug!(open_tag = block.open_tag, "Dropping plan without steps");
                return None;
            }
            Some(Action::Plan(PlanAction {
                title: utils.attr_trimmed(block.open_tag, "title"),
                steps,
            }))
        })
        .collect()
}

fn parse_skill(content: &str, utils: &ParserUtils) -> Vec<Action> {
    structural_blocks(content, &["skill"])
        .into_iter()
        .filter_map(|block| {
            let Some(name) = utils.attr_trimmed(block.open_tag, "name") else {
                debug!(open_tag = block.open_tag, "Dropping skill without a name");
                return None;
            };
            let args = utils
                .extract_attr(block.open_tag, "args")
                .map(|a| utils.decode_entities(a.trim()))
                .filter(|a| !a.is_empty())
                .or_else(|| body_text(&block, utils));
            Some(Action::Skill(SkillAction { name, args }))
        })
        .collect()
}
