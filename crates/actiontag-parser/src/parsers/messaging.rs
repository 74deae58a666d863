//! `notify` and `say`.

use tracing::debug;

use actiontag_core::types::{Action, NotifyAction, SayAction};

use super::{attr_or_body, content_blocks, structural_blocks};
use crate::attrs::ParserUtils;
use crate::fixup::{unterminated_closer, unterminated_self_closing};
use crate::registry::ParserConfig;

pub fn notify_parser() -> ParserConfig {
    ParserConfig::new(&["notify"], parse_notify)
        .self_closing(&["notify"])
        .fixup(unterminated_self_closing(&["notify"]))
        .fixup(unterminated_closer(&["notify"]))
}

pub fn say_parser() -> ParserConfig {
    ParserConfig::new(&["say"], parse_say)
        .pre_strip()
        .fixup(unterminated_closer(&["say"]))
}

fn parse_notify(content: &str, utils: &ParserUtils) -> Vec<Action> {
    structural_blocks(content, &["notify"])
        .into_iter()
        .filter_map(|block| {
            let Some(message) = attr_or_body(&block, utils, &["message"]) else {
                debug!(open_tag = block.open_tag, "Dropping notify without a message");
                return None;
            };
            Some(Action::Notify(NotifyAction {
                message,
                title: utils.attr_trimmed(block.open_tag, "title"),
                priority: utils.attr_trimmed(block.open_tag, "priority"),
            }))
        })
        .collect()
}

fn parse_say(content: &str, utils: &ParserUtils) -> Vec<Action> {
    content_blocks(content, &["say"])
        .into_iter()
        .filter_map(|block| {
            let text = block.body.map(|b| utils.clean_payload(b.trim()))?;
            (!text.is_empty()).then_some(Action::Say(SayAction { text }))
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
    fn test_notify_body() {
        let actions = parse_notify(
            r#"<notify title="Build" priority="high">Tests are green</notify>"#,
            &utils(),
        );
        assert_eq!(
            actions,
            vec![Action::Notify(NotifyAction {
                message: "Tests are green".to_string(),
                title: Some("Build".to_string()),
                priority: Some("high".to_string()),
            })]
        );
    }

    #[test]
    fn test_notify_message_attr() {
        let actions = parse_notify(r#"<notify message="done"/>"#, &utils());
        assert!(matches!(&actions[0], Action::Notify(n) if n.message == "done" && n.title.is_none()));
    }

    #[test]
    fn test_notify_empty_dropped() {
        assert!(parse_notify("<notify></notify>", &utils()).is_empty());
    }

    #[test]
    fn test_say() {
        let actions = parse_say("<say>\nHello &amp; welcome\n</say>", &utils());
        assert_eq!(
            actions,
            vec![Action::Say(SayAction {
                text: "Hello & welcome".to_string()
            })]
        );
    }

    #[test]
    fn test_say_keeps_inner_markup() {
        let actions = parse_say("<say>Try <read path=\"x\"/> next</say>", &utils());
        assert!(matches!(&actions[0], Action::Say(s) if s.text.contains("<read")));
    }

    #[test]
    fn test_say_empty_dropped() {
        assert!(parse_say("<say>  </say>", &utils()).is_empty());
        assert!(parse_say("<say>no closer", &utils()).is_empty());
    }
}
