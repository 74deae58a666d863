//! `read`, `write` and `create`.

use tracing::debug;

use actiontag_core::types::{Action, CreateAction, ReadAction, WriteAction};

use super::{content_blocks, structural_blocks};
use crate::attrs::ParserUtils;
use crate::fixup::{unterminated_closer, unterminated_self_closing};
use crate::registry::ParserConfig;

pub fn read_parser() -> ParserConfig {
    ParserConfig::new(&["read"], parse_read)
        .self_closing(&["read"])
        .alias("read-file", "read")
        .alias("cat", "read")
        .fixup(unterminated_self_closing(&["read", "read-file", "cat"]))
        .fixup(unterminated_closer(&["read", "read-file", "cat"]))
}

pub fn write_parser() -> ParserConfig {
    ParserConfig::new(&["write"], parse_write)
        .alias("write-file", "write")
        .pre_strip()
        .fixup(unterminated_closer(&["write", "write-file"]))
}

pub fn create_parser() -> ParserConfig {
    ParserConfig::new(&["create"], parse_create)
        .alias("create-file", "create")
        .pre_strip()
        .fixup(unterminated_closer(&["create", "create-file"]))
}

fn parse_read(content: &str, utils: &ParserUtils) -> Vec<Action> {
    structural_blocks(content, &["read"])
        .into_iter()
        .filter_map(|block| {
            let path = utils.first_attr(block.open_tag, &["path", "file"]).or_else(|| {
                block
                    .body
                    .map(str::trim)
                    .filter(|b| !b.is_empty() && !b.contains('<'))
                    .map(str::to_string)
            });
            let Some(path) = path else {
                debug!(open_tag = block.open_tag, "Dropping read without a path");
                return None;
            };
            Some(Action::Read(ReadAction {
                path,
                offset: utils.number_attr(block.open_tag, "offset"),
                limit: utils.number_attr(block.open_tag, "limit"),
            }))
        })
        .collect()
}

/// `(path, content)` for every well-formed, uncorrupted block of `tag`.
fn file_payloads(content: &str, tag: &str, utils: &ParserUtils) -> Vec<(String, String)> {
    content_blocks(content, &[tag])
        .into_iter()
        .filter_map(|block| {
            let path = utils.first_attr(block.open_tag, &["path", "file"]);
            let (Some(path), Some(body)) = (path, block.body) else {
                debug!(open_tag = block.open_tag, "Dropping {} without a path or body", tag);
                return None;
            };
            if utils.check_corruption(body, &path).is_some() {
                return None;
            }
            Some((path, utils.clean_payload(body)))
        })
        .collect()
}

fn parse_write(content: &str, utils: &ParserUtils) -> Vec<Action> {
    file_payloads(content, "write", utils)
        .into_iter()
        .map(|(path, content)| Action::Write(WriteAction { path, content }))
        .collect()
}

fn parse_create(content: &str, utils: &ParserUtils) -> Vec<Action> {
    file_payloads(content, "create", utils)
        .into_iter()
        .map(|(path, content)| Action::Create(CreateAction { path, content }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utils() -> ParserUtils {
        ParserUtils::default()
    }

    // ---- read ----

    #[test]
    fn test_read_self_closing() {
        let actions = parse_read(
            r#"<read path="/file1.ts" offset="10" limit=20/>"#,
            &utils(),
        );
        assert_eq!(
            actions,
            vec![Action::Read(ReadAction {
                path: "/file1.ts".to_string(),
                offset: Some(10),
                limit: Some(20),
            })]
        );
    }

    #[test]
    fn test_read_body_path() {
        let actions = parse_read("<read>src/lib.rs</read>", &utils());
        assert!(matches!(&actions[0], Action::Read(r) if r.path == "src/lib.rs"));
    }

    #[test]
    fn test_read_file_attr() {
        let actions = parse_read(r#"<read file='a.txt'/>"#, &utils());
        assert!(matches!(&actions[0], Action::Read(r) if r.path == "a.txt"));
    }

    #[test]
    fn test_read_without_path_dropped() {
        assert!(parse_read("<read/>", &utils()).is_empty());
        assert!(parse_read(r#"<read limit="5"></read>"#, &utils()).is_empty());
    }

    #[test]
    fn test_read_bad_number_ignored() {
        let actions = parse_read(r#"<read path="a" limit="all"/>"#, &utils());
        assert!(matches!(&actions[0], Action::Read(r) if r.limit.is_none()));
    }

    #[test]
    fn test_read_multiple_in_document_order() {
        let actions = parse_read(r#"<read path="/b"/> <read path="/a"/>"#, &utils());
        let paths: Vec<_> = actions
            .iter()
            .filter_map(|a| match a {
                Action::Read(r) => Some(r.path.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(paths, vec!["/b", "/a"]);
    }

    // ---- write / create ----

    #[test]
    fn test_write_payload_cleaned() {
        let actions = parse_write(
            "<write path=\"src/a.rs\">\nif a &lt; b {}\n</write>",
            &utils(),
        );
        assert_eq!(
            actions,
            vec![Action::Write(WriteAction {
                path: "src/a.rs".to_string(),
                content: "if a < b {}".to_string(),
            })]
        );
    }

    #[test]
    fn test_write_keeps_inner_tags_as_text() {
        let actions = parse_write(
            "<write path=\"doc.md\">Use <bash>ls</bash> to list.</write>",
            &utils(),
        );
        assert!(matches!(&actions[0], Action::Write(w) if w.content == "Use <bash>ls</bash> to list."));
    }

    #[test]
    fn test_write_without_path_dropped() {
        assert!(parse_write("<write>text</write>", &utils()).is_empty());
    }

    #[test]
    fn test_write_unclosed_dropped() {
        assert!(parse_write("<write path=\"a\">text", &utils()).is_empty());
    }

    #[test]
    fn test_write_corrupted_payload_rejected() {
        let body = "</edit> <bash>x</bash> <say>hi</say>";
        let text = format!("<write path=\"a.txt\">{}</write>", body);
        assert!(parse_write(&text, &utils()).is_empty());
    }

    #[test]
    fn test_create() {
        let actions = parse_create("<create path='new.txt'>hello</create>", &utils());
        assert_eq!(
            actions,
            vec![Action::Create(CreateAction {
                path: "new.txt".to_string(),
                content: "hello".to_string(),
            })]
        );
    }

    #[test]
    fn test_read_fixup_repairs_missing_self_close() {
        let config = read_parser();
        let fixed = crate::fixup::apply_all(&config.fixups, "<read path=\"a.ts\"\nok");
        assert_eq!(parse_read(&fixed, &utils()).len(), 1);
    }
}
