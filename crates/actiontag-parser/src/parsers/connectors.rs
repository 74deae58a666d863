//! Messaging connector setup: `telegram-config` and `discord-config`.

use tracing::debug;

use actiontag_core::types::{Action, DiscordConfigAction, TelegramConfigAction};

use super::{optional_bool, structural_blocks};
use crate::attrs::ParserUtils;
use crate::fixup::unterminated_self_closing;
use crate::registry::ParserConfig;

pub fn telegram_config_parser() -> ParserConfig {
    ParserConfig::new(&["telegram-config"], parse_telegram)
        .self_closing(&["telegram-config"])
        .fixup(unterminated_self_closing(&["telegram-config"]))
}

pub fn discord_config_parser() -> ParserConfig {
    ParserConfig::new(&["discord-config"], parse_discord)
        .self_closing(&["discord-config"])
        .fixup(unterminated_self_closing(&["discord-config"]))
}

fn parse_telegram(content: &str, utils: &ParserUtils) -> Vec<Action> {
    structural_blocks(content, &["telegram-config"])
        .into_iter()
        .filter_map(|block| {
            let tag = block.open_tag;
            let action = TelegramConfigAction {
                bot_token: utils.first_attr(tag, &["bot_token", "token"]),
                chat_id: utils.attr_trimmed(tag, "chat_id"),
                enabled: optional_bool(&block, utils, "enabled"),
            };
            if action == TelegramConfigAction::default() {
                debug!(open_tag = tag, "Dropping telegram-config without settings");
                return None;
            }
            Some(Action::TelegramConfig(action))
        })
        .collect()
}

fn parse_discord(content: &str, utils: &ParserUtils) -> Vec<Action> {
    structural_blocks(content, &["discord-config"])
        .into_iter()
        .filter_map(|block| {
            let tag = block.open_tag;
            let action = DiscordConfigAction {
                bot_token: utils.first_attr(tag, &["bot_token", "token"]),
                channel_id: utils.attr_trimmed(tag, "channel_id"),
                webhook_url: utils
                    .first_attr(tag, &["webhook_url", "webhook"])
                    .map(|u| utils.decode_entities(&u)),
                enabled: optional_bool(&block, utils, "enabled"),
            };
            if action == DiscordConfigAction::default() {
                debug!(open_tag = tag, "Dropping discord-config without settings");
                return None;
            }
            Some(Action::DiscordConfig(action))
        })
        .collect()
}
