//! `grep`, `glob` and `list`.

use tracing::debug;

use actiontag_core::types::{Action, GlobAction, GrepAction, ListAction};

use super::{attr_or_body, body_text, structural_blocks};
use crate::attrs::ParserUtils;
use crate::fixup::{unterminated_closer, unterminated_self_closing};
use crate::registry::ParserConfig;

pub fn grep_parser() -> ParserConfig {
    ParserConfig::new(&["grep"], parse_grep)
        .self_closing(&["grep"])
        .alias("search-files", "grep")
        .fixup(unterminated_self_closing(&["grep", "search-files"]))
        .fixup(unterminated_closer(&["grep", "search-files"]))
}

pub fn glob_parser() -> ParserConfig {
    ParserConfig::new(&["glob"], parse_glob)
        .self_closing(&["glob"])
        .alias("find-files", "glob")
        .fixup(unterminated_self_closing(&["glob", "find-files"]))
        .fixup(unterminated_closer(&["glob", "find-files"]))
}

pub fn list_parser() -> ParserConfig {
    ParserConfig::new(&["list"], parse_list)
        .self_closing(&["list"])
        .alias("ls", "list")
        .alias("list-dir", "list")
        .fixup(unterminated_self_closing(&["list", "ls", "list-dir"]))
        .fixup(unterminated_closer(&["list", "ls", "list-dir"]))
}

fn parse_grep(content: &str, utils: &ParserUtils) -> Vec<Action> {
    structural_blocks(content, &["grep"])
        .into_iter()
        .filter_map(|block| {
            let Some(pattern) = attr_or_body(&block, utils, &["pattern", "query"]) else {
                debug!(open_tag = block.open_tag, "Dropping grep without a pattern");
                return None;
            };
            let tag = block.open_tag;
            Some(Action::Grep(GrepAction {
                pattern,
                path: utils.first_attr(tag, &["path", "dir"]),
                include: utils.first_attr(tag, &["include", "glob"]),
                case_insensitive: utils.extract_bool_attr(tag, "case_insensitive")
                    || utils.extract_bool_attr(tag, "ignore_case"),
            }))
        })
        .collect()
}

fn parse_glob(content: &str, utils: &ParserUtils) -> Vec<Action> {
    structural_blocks(content, &["glob"])
        .into_iter()
        .filter_map(|block| {
            let Some(pattern) = attr_or_body(&block, utils, &["pattern"]) else {
                debug!(open_tag = block.open_tag, "Dropping glob without a pattern");
                return None;
            };
            Some(Action::Glob(GlobAction {
                pattern,
                path: utils.first_attr(block.open_tag, &["path", "dir"]),
            }))
        })
        .collect()
}

fn parse_list(content: &str, utils: &ParserUtils) -> Vec<Action> {
    structural_blocks(content, &["list"])
        .into_iter()
        .map(|block| {
            let path = utils
                .first_attr(block.open_tag, &["path", "dir"])
                .or_else(|| body_text(&block, utils))
                .unwrap_or_else(|| ".".to_string());
            Action::List(ListAction {
                path,
                recursive: utils.extract_bool_attr(block.open_tag, "recursive"),
            })
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
    fn test_grep_attributes() {
        let actions = parse_grep(
            r#"<grep pattern="fn main" path="src" include="*.rs" case_insensitive="yes"/>"#,
            &utils(),
        );
        assert_eq!(
            actions,
            vec![Action::Grep(GrepAction {
                pattern: "fn main".to_string(),
                path: Some("src".to_string()),
                include: Some("*.rs".to_string()),
                case_insensitive: true,
            })]
        );
    }

    #[test]
    fn test_grep_body_pattern() {
        let actions = parse_grep(r#"<grep path="src">TODO\(.*\)</grep>"#, &utils());
        assert!(matches!(&actions[0], Action::Grep(g) if g.pattern == r"TODO\(.*\)"));
    }

    #[test]
    fn test_grep_without_pattern_dropped() {
        assert!(parse_grep(r#"<grep path="src"/>"#, &utils()).is_empty());
    }

    #[test]
    fn test_glob() {
        let actions = parse_glob(r#"<glob pattern="**/*.toml" path="crates"/>"#, &utils());
        assert_eq!(
            actions,
            vec![Action::Glob(GlobAction {
                pattern: "**/*.toml".to_string(),
                path: Some("crates".to_string()),
            })]
        );
    }

    #[test]
    fn test_list_defaults_to_current_dir() {
        let actions = parse_list("<list/>", &utils());
        assert_eq!(
            actions,
            vec![Action::List(ListAction {
                path: ".".to_string(),
                recursive: false,
            })]
        );
    }

    #[test]
    fn test_list_recursive_flag() {
        let actions = parse_list(r#"<list path="src" recursive/>"#, &utils());
        assert!(matches!(&actions[0], Action::List(l) if l.path == "src" && l.recursive));
    }

    #[test]
    fn test_list_body_path() {
        let actions = parse_list("<list>crates</list>", &utils());
        assert!(matches!(&actions[0], Action::List(l) if l.path == "crates"));
    }
}
