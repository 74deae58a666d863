//! `fetch`: retrieve a URL.

use tracing::debug;

use actiontag_core::types::{Action, FetchAction};

use super::{body_text, structural_blocks};
use crate::attrs::ParserUtils;
use crate::fixup::{unterminated_closer, unterminated_self_closing};
use crate::registry::ParserConfig;

pub fn fetch_parser() -> ParserConfig {
    ParserConfig::new(&["fetch"], parse_fetch)
        .self_closing(&["fetch"])
        .alias("web-fetch", "fetch")
        .fixup(unterminated_self_closing(&["fetch", "web-fetch"]))
        .fixup(unterminated_closer(&["fetch", "web-fetch"]))
}

fn looks_like_url(text: &str) -> bool {
    (text.starts_with("http://") || text.starts_with("https://"))
        && !text.contains(char::is_whitespace)
}

fn parse_fetch(content: &str, utils: &ParserUtils) -> Vec<Action> {
    structural_blocks(content, &["fetch"])
        .into_iter()
        .filter_map(|block| {
            let body = body_text(&block, utils);
            let action = match utils.first_attr(block.open_tag, &["url", "href"]) {
                Some(url) => FetchAction {
                    url: utils.decode_entities(&url),
                    prompt: body,
                },
                None => match body {
                    Some(url) if looks_like_url(&url) => FetchAction { url, prompt: None },
                    _ => {
                        debug!(open_tag = block.open_tag, "Dropping fetch without a url");
                        return None;
                    }
                },
            };
            Some(Action::Fetch(action))
        })
        .collect()
}
