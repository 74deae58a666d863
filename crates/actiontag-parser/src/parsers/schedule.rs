//! `schedule` and `unschedule`.

use tracing::debug;

use actiontag_core::types::{Action, ScheduleAction, ScheduleKind, UnscheduleAction};

use super::{attr_or_body, body_text, structural_blocks};
use crate::attrs::ParserUtils;
use crate::fixup::{unterminated_closer, unterminated_self_closing};
use crate::registry::ParserConfig;

pub fn schedule_parser() -> ParserConfig {
    ParserConfig::new(&["schedule"], parse_schedule)
        .alias("cron", "schedule")
        .fixup(unterminated_closer(&["schedule", "cron"]))
}

pub fn unschedule_parser() -> ParserConfig {
    ParserConfig::new(&["unschedule"], parse_unschedule)
        .self_closing(&["unschedule"])
        .fixup(unterminated_self_closing(&["unschedule"]))
        .fixup(unterminated_closer(&["unschedule"]))
}

/// Standard five-field cron, or six with a leading seconds field.
fn valid_cron(expr: &str) -> bool {
    matches!(expr.split_whitespace().count(), 5 | 6)
}

fn parse_schedule(content: &str, utils: &ParserUtils) -> Vec<Action> {
    structural_blocks(content, &["schedule"])
        .into_iter()
        .filter_map(|block| {
            let tag = block.open_tag;
            let (Some(name), Some(cron), Some(payload)) = (
                utils.attr_trimmed(tag, "name"),
                utils.first_attr(tag, &["cron", "expression"]),
                body_text(&block, utils),
            ) else {
                debug!(open_tag = tag, "Dropping schedule missing name, cron or payload");
                return None;
            };
            if !valid_cron(&cron) {
                debug!(cron = %cron, "Dropping schedule with malformed cron expression");
                return None;
            }
            let kind = ScheduleKind::from_attr(utils.extract_attr(tag, "type").as_deref());
            Some(Action::Schedule(ScheduleAction {
                name,
                cron,
                kind,
                payload,
            }))
        })
        .collect()
}

fn parse_unschedule(content: &str, utils: &ParserUtils) -> Vec<Action> {
    structural_blocks(content, &["unschedule"])
        .into_iter()
        .filter_map(|block| {
            let name = attr_or_body(&block, utils, &["name"]);
            if name.is_none() {
                debug!(open_tag = block.open_tag, "Dropping unschedule without a name");
            }
            name.map(|name| Action::Unschedule(UnscheduleAction { name }))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utils() -> ParserUtils {
        ParserUtils::default()
    }

    #[test]
    fn test_command_schedule() {
        let actions = parse_schedule(
            r#"<schedule cron="0 9 * * 1-5" name="standup">./notify.sh</schedule>"#,
            &utils(),
        );
        assert_eq!(
            actions,
            vec![Action::Schedule(ScheduleAction {
                name: "standup".to_string(),
                cron: "0 9 * * 1-5".to_string(),
                kind: ScheduleKind::Command,
                payload: "./notify.sh".to_string(),
            })]
        );
    }

    #[test]
    fn test_prompt_schedule() {
        for kind in ["prompt", "llm"] {
            let text = format!(
                r#"<schedule cron="*/30 * * * *" name="digest" type="{}">Summarize new issues</schedule>"#,
                kind
            );
            let actions = parse_schedule(&text, &utils());
            assert!(matches!(&actions[0], Action::Schedule(s) if s.kind == ScheduleKind::Prompt));
        }
    }

    #[test]
    fn test_six_field_cron_accepted() {
        let actions = parse_schedule(
            r#"<schedule cron="0 0 9 * * *" name="s">echo</schedule>"#,
            &utils(),
        );
        assert_eq!(actions.len(), 1);
    }

    #[test]
    fn test_malformed_cron_dropped() {
        let text = r#"<schedule cron="every day" name="s">echo</schedule>"#;
        assert!(parse_schedule(text, &utils()).is_empty());
    }

    #[test]
    fn test_missing_name_or_payload_dropped() {
        assert!(parse_schedule(r#"<schedule cron="* * * * *">x</schedule>"#, &utils()).is_empty());
        assert!(parse_schedule(r#"<schedule cron="* * * * *" name="a"></schedule>"#, &utils()).is_empty());
    }

    #[test]
    fn test_unschedule() {
        assert_eq!(
            parse_unschedule(r#"<unschedule name="standup"/>"#, &utils()),
            vec![Action::Unschedule(UnscheduleAction {
                name: "standup".to_string()
            })]
        );
        assert_eq!(parse_unschedule("<unschedule>digest</unschedule>", &utils()).len(), 1);
        assert!(parse_unschedule("<unschedule/>", &utils()).is_empty());
    }
}
