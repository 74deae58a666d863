//! Tag block scanning and inert-region stripping.
//!
//! Two jobs live here because they share one scanner:
//!
//! - [`TagMatcher`] locates `<tag ...>body</tag>` and `<tag .../>` blocks for a
//!   set of tag names, which sub-parsers use to find their own tags and the
//!   two-phase pipeline uses to carve content-bearing blocks out of the text.
//! - [`strip_inert_regions`] removes fenced code, inline code spans and
//!   `<literal>` blocks, so that example syntax shown by the model can never
//!   become an action. Protected blocks (content-bearing payloads, shell
//!   bodies) are skipped over verbatim so backticks inside them survive.
//!
//! A closer does not end a block while it sits inside a fenced block or an
//! inline code span that opened in the body, or inside an unfinished
//! SEARCH/REPLACE hunk of a content-bearing body.

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::ops::Range;
use std::sync::LazyLock;

static OPEN_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<([A-Za-z][\w-]*)((?:[^<>"']|"[^"]*"|'[^']*')*)>"#).unwrap()
});

static HUNK_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<{7}[ \t]*SEARCH\b").unwrap());

static HUNK_CLOSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">{7}[ \t]*REPLACE\b").unwrap());

const LITERAL_TAG: &str = "literal";

/// How far a block's body extends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// The body runs to the first matching closer outside code and
    /// outside an unfinished SEARCH/REPLACE hunk, whatever else it contains.
    Content,
    /// If another opener of the same tag appears before the closer, the
    /// block is treated as unclosed and ends at its opening tag.
    Structural,
}

/// One located tag block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagBlock<'a> {
    /// Tag name, lowercased.
    pub name: String,
    /// Byte range of the whole block, opener through closer.
    pub span: Range<usize>,
    /// The raw opening tag, attributes included.
    pub open_tag: &'a str,
    /// Text between opener and closer; `None` for self-closing or unclosed tags.
    pub body: Option<&'a str>,
    pub self_closing: bool,
}

/// Finds blocks for a fixed set of tag names.
#[derive(Debug, Clone, Default)]
pub struct TagMatcher {
    modes: HashMap<String, ScanMode>,
}

impl TagMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor for a single scan mode.
    pub fn of<I, S>(names: I, mode: ScanMode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new().with(names, mode)
    }

    /// Add tag names scanned with `mode`. A name already present keeps its
    /// first mode.
    pub fn with<I, S>(mut self, names: I, mode: ScanMode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.modes
                .entry(name.as_ref().to_ascii_lowercase())
                .or_insert(mode);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modes.contains_key(&name.to_ascii_lowercase())
    }

    /// All top-level blocks in document order. Blocks nested inside an
    /// earlier block's span are not reported.
    pub fn find_blocks<'a>(&self, content: &'a str) -> Vec<TagBlock<'a>> {
        if self.is_empty() {
            return Vec::new();
        }
        let lower = content.to_ascii_lowercase();
        let mut blocks = Vec::new();
        let mut pos = 0;
        while pos < content.len() {
            let Some(caps) = OPEN_TAG_RE.captures_at(content, pos) else {
                break;
            };
            let Some(whole) = caps.get(0) else {
                break;
            };
            match self.block_from(content, &lower, &caps) {
                Some(block) => {
                    pos = block.span.end;
                    blocks.push(block);
                }
                None => pos = whole.end(),
            }
        }
        blocks
    }

    /// The block whose opening tag starts exactly at `pos`, if it is one of
    /// ours. `lower` must be `content.to_ascii_lowercase()`.
    pub fn block_at<'a>(&self, content: &'a str, lower: &str, pos: usize) -> Option<TagBlock<'a>> {
        let caps = OPEN_TAG_RE.captures_at(content, pos)?;
        if caps.get(0)?.start() != pos {
            return None;
        }
        self.block_from(content, lower, &caps)
    }

    fn block_from<'a>(
        &self,
        content: &'a str,
        lower: &str,
        caps: &Captures<'a>,
    ) -> Option<TagBlock<'a>> {
        let whole = caps.get(0)?;
        let name = caps.get(1)?.as_str().to_ascii_lowercase();
        let mode = *self.modes.get(&name)?;
        let attrs = caps.get(2).map_or("", |m| m.as_str());
        let open_end = whole.end();

        if attrs.trim_end().ends_with('/') {
            return Some(TagBlock {
                name,
                span: whole.start()..open_end,
                open_tag: whole.as_str(),
                body: None,
                self_closing: true,
            });
        }

        let closed = find_body_closer(content, lower, open_end, &name, mode).filter(
            |(close_start, _)| {
                mode == ScanMode::Content
                    || find_opener(lower, open_end, &name).map_or(true, |o| o > *close_start)
            },
        );

        let (end, body) = match closed {
            Some((close_start, close_end)) => (close_end, Some(&content[open_end..close_start])),
            None => (open_end, None),
        };

        Some(TagBlock {
            name,
            span: whole.start()..end,
            open_tag: whole.as_str(),
            body,
            self_closing: false,
        })
    }
}

/// Position of the first `</name>` (whitespace allowed before `>`) at or
/// after `from`, as `(start, end)`.
pub(crate) fn find_closer(lower: &str, from: usize, name: &str) -> Option<(usize, usize)> {
    let needle = format!("</{}", name);
    let mut search = from;
    while let Some(rel) = lower[search..].find(&needle) {
        let start = search + rel;
        let after = start + needle.len();
        let rest = &lower[after..];
        let trimmed = rest.trim_start();
        if trimmed.starts_with('>') {
            return Some((start, after + (rest.len() - trimmed.len()) + 1));
        }
        search = after;
    }
    None
}

/// Like [`find_closer`], but skips closers shadowed by code regions that
/// open in the body, and for content blocks by an unfinished hunk.
fn find_body_closer(
    content: &str,
    lower: &str,
    body_start: usize,
    name: &str,
    mode: ScanMode,
) -> Option<(usize, usize)> {
    let mut search = body_start;
    loop {
        let (start, end) = find_closer(lower, search, name)?;
        let shadow = match code_shadow(content, body_start, start) {
            None if mode == ScanMode::Content => hunk_shadow(content, body_start, start),
            shadow => shadow,
        };
        match shadow {
            Some(resume) if resume < content.len() => search = resume,
            Some(_) => return None,
            None => return Some((start, end)),
        }
    }
}

/// If `at` lies inside a fenced block or inline code span that opens at or
/// after `from`, the offset where that region ends.
pub(crate) fn code_shadow(content: &str, from: usize, at: usize) -> Option<usize> {
    let bytes = content.as_bytes();
    let mut i = from;
    while i < at {
        if i == 0 || bytes[i - 1] == b'\n' {
            if let Some(end) = fenced_block_end(content, i) {
                if end > at {
                    return Some(end);
                }
                i = end;
                continue;
            }
        }
        if bytes[i] == b'`' {
            let run = backtick_run(bytes, i);
            match inline_code_end(bytes, i, run) {
                Some(end) if end > at => return Some(end),
                Some(end) => i = end,
                None => i += run,
            }
            continue;
        }
        i += 1;
    }
    None
}

/// If more hunks opened than closed between `from` and `at`, the offset just
/// past the `>>>>>>> REPLACE` marker that finishes the open one, or the end
/// of input when it never does.
pub(crate) fn hunk_shadow(content: &str, from: usize, at: usize) -> Option<usize> {
    let body = &content[from..at];
    let opened = HUNK_OPEN_RE.find_iter(body).count();
    let closed = HUNK_CLOSE_RE.find_iter(body).count();
    if opened <= closed {
        return None;
    }
    Some(
        HUNK_CLOSE_RE
            .find_at(content, at)
            .map_or(content.len(), |m| m.end()),
    )
}

/// Position of the next `<name` opener that is a whole tag name.
pub(crate) fn find_opener(lower: &str, from: usize, name: &str) -> Option<usize> {
    let needle = format!("<{}", name);
    let mut search = from;
    while let Some(rel) = lower[search..].find(&needle) {
        let start = search + rel;
        let after = start + needle.len();
        match lower[after..].chars().next() {
            Some(c) if c.is_whitespace() || c == '/' || c == '>' => return Some(start),
            None => return Some(start),
            _ => search = after,
        }
    }
    None
}

/// Remove the given byte ranges. Ranges must be sorted and disjoint.
pub fn remove_spans(content: &str, spans: &[Range<usize>]) -> String {
    let mut out = String::with_capacity(content.len());
    let mut cursor = 0;
    for span in spans {
        if span.start < cursor {
            continue;
        }
        out.push_str(&content[cursor..span.start]);
        cursor = span.end;
    }
    out.push_str(&content[cursor..]);
    out
}

/// Remove every top-level block matched by `matcher`.
pub fn strip_blocks(content: &str, matcher: &TagMatcher) -> String {
    let spans: Vec<Range<usize>> = matcher
        .find_blocks(content)
        .into_iter()
        .map(|b| b.span)
        .collect();
    if spans.is_empty() {
        return content.to_string();
    }
    remove_spans(content, &spans)
}

/// Strip fenced code blocks, inline code spans and `<literal>` blocks.
///
/// Blocks matched by `protected` are copied through untouched, so a code
/// fence inside a file payload or a backtick substitution inside a shell
/// command is not mistaken for markdown.
pub fn strip_inert_regions(content: &str, protected: &TagMatcher) -> String {
    let lower = content.to_ascii_lowercase();
    let bytes = content.as_bytes();
    let mut out = String::with_capacity(content.len());
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        if i == 0 || bytes[i - 1] == b'\n' {
            if let Some(end) = fenced_block_end(content, i) {
                out.push_str(&content[copied..i]);
                i = end;
                copied = end;
                continue;
            }
        }

        match bytes[i] {
            b'`' => {
                let run = backtick_run(bytes, i);
                if let Some(end) = inline_code_end(bytes, i, run) {
                    out.push_str(&content[copied..i]);
                    i = end;
                    copied = end;
                } else {
                    i += run;
                }
                continue;
            }
            b'<' => {
                if is_literal_opener(&lower, i) {
                    out.push_str(&content[copied..i]);
                    let end = find_closer(&lower, i, LITERAL_TAG).map_or(content.len(), |(_, e)| e);
                    i = end;
                    copied = end;
                    continue;
                }
                if let Some(block) = protected.block_at(content, &lower, i) {
                    i = block.span.end;
                    continue;
                }
            }
            _ => {}
        }
        i += 1;
    }

    out.push_str(&content[copied..]);
    out
}

fn is_literal_opener(lower: &str, pos: usize) -> bool {
    let rest = &lower[pos..];
    let needle = "<literal";
    if !rest.starts_with(needle) {
        return false;
    }
    matches!(rest[needle.len()..].chars().next(), Some(c) if c == '>' || c.is_whitespace())
}

fn backtick_run(bytes: &[u8], start: usize) -> usize {
    bytes[start..].iter().take_while(|&&b| b == b'`').count()
}

/// End of an inline code span opened by `run` backticks at `start`. The
/// closer must be a run of exactly the same length on the same line.
fn inline_code_end(bytes: &[u8], start: usize, run: usize) -> Option<usize> {
    let mut j = start + run;
    while j < bytes.len() && bytes[j] != b'\n' {
        if bytes[j] == b'`' {
            let closing = backtick_run(bytes, j);
            if closing == run {
                return Some(j + closing);
            }
            j += closing;
        } else {
            j += 1;
        }
    }
    None
}

/// Opening fence at a line start: up to three spaces, then three or more
/// backticks or tildes. Returns the fence character and run length.
fn fence_open(line: &str) -> Option<(char, usize)> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return None;
    }
    let rest = &line[indent..];
    let marker = rest.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let run = rest.chars().take_while(|c| *c == marker).count();
    if run < 3 {
        return None;
    }
    // A backtick run closed on the same line is an inline span, not a fence.
    if marker == '`' && rest[run..].contains("```") {
        return None;
    }
    Some((marker, run))
}

/// If a fenced block opens at `start`, the byte offset where it ends (just
/// before the closing fence line's newline, or end of input if unterminated).
fn fenced_block_end(content: &str, start: usize) -> Option<usize> {
    let first_line_end = content[start..].find('\n').map_or(content.len(), |n| start + n);
    let (marker, run) = fence_open(&content[start..first_line_end])?;

    let mut line_start = first_line_end + 1;
    while line_start < content.len() {
        let line_end = content[line_start..]
            .find('\n')
            .map_or(content.len(), |n| line_start + n);
        let line = content[line_start..line_end].trim();
        let closing = line.chars().take_while(|c| *c == marker).count();
        if closing >= run && line.chars().all(|c| c == marker) {
            return Some(line_end);
        }
        line_start = line_end + 1;
    }
    Some(content.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structural(names: &[&str]) -> TagMatcher {
        TagMatcher::of(names.iter().copied(), ScanMode::Structural)
    }

    fn content_tags(names: &[&str]) -> TagMatcher {
        TagMatcher::of(names.iter().copied(), ScanMode::Content)
    }

    // ---- TagMatcher ----

    #[test]
    fn test_find_self_closing_blocks() {
        let text = r#"<read path="/a.ts"/> and <read path="/b.ts" />"#;
        let blocks = structural(&["read"]).find_blocks(text);
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].self_closing);
        assert_eq!(blocks[0].open_tag, r#"<read path="/a.ts"/>"#);
        assert!(blocks[1].body.is_none());
    }

    #[test]
    fn test_find_paired_block_body() {
        let text = "before <bash>ls -la</bash> after";
        let blocks = structural(&["bash"]).find_blocks(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].body, Some("ls -la"));
        assert_eq!(&text[blocks[0].span.clone()], "<bash>ls -la</bash>");
    }

    #[test]
    fn test_closer_match_is_case_insensitive() {
        let text = "<BASH>ls</Bash >";
        let blocks = structural(&["bash"]).find_blocks(text);
        assert_eq!(blocks[0].name, "bash");
        assert_eq!(blocks[0].body, Some("ls"));
    }

    #[test]
    fn test_tag_name_must_match_whole_word() {
        let text = "<edit-file path=\"a\">x</edit-file><editor>y</editor>";
        assert!(structural(&["edit"]).find_blocks(text).is_empty());
    }

    #[test]
    fn test_structural_unclosed_block_ends_at_opener() {
        let text = r#"<read path="a"> then <read path="b"></read>"#;
        let blocks = structural(&["read"]).find_blocks(text);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].body, None);
        assert_eq!(blocks[1].body, Some(""));
    }

    #[test]
    fn test_content_block_runs_to_first_closer() {
        let text = r#"<write path="a"><write path="b">x</write></write>"#;
        let blocks = content_tags(&["write"]).find_blocks(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].body, Some(r#"<write path="b">x"#));
    }

    #[test]
    fn test_nested_blocks_are_not_reported() {
        let text = r#"<write path="a"><bash>ls</bash></write><bash>pwd</bash>"#;
        let matcher = content_tags(&["write"]).with(["bash"], ScanMode::Structural);
        let blocks = matcher.find_blocks(text);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].name, "write");
        assert_eq!(blocks[1].body, Some("pwd"));
    }

    #[test]
    fn test_quoted_attribute_may_contain_angle_bracket() {
        let text = r#"<bash description="a > b">echo hi</bash>"#;
        let blocks = structural(&["bash"]).find_blocks(text);
        assert_eq!(blocks[0].body, Some("echo hi"));
    }

    #[test]
    fn test_empty_matcher_finds_nothing() {
        assert!(TagMatcher::new().find_blocks("<read path=\"a\"/>").is_empty());
    }

    #[test]
    fn test_strip_blocks() {
        let text = "a<say>hello</say>b<say>bye</say>c";
        assert_eq!(strip_blocks(text, &content_tags(&["say"])), "abc");
    }

    // ---- strip_inert_regions ----

    #[test]
    fn test_strip_fenced_block() {
        let text = "before\n```xml\n<bash>rm -rf /</bash>\n```\nafter";
        let out = strip_inert_regions(text, &TagMatcher::new());
        assert!(!out.contains("rm -rf"));
        assert!(out.starts_with("before\n"));
        assert!(out.ends_with("\nafter"));
    }

    #[test]
    fn test_strip_tilde_fence() {
        let text = "~~~\n<bash>ls</bash>\n~~~\nok";
        let out = strip_inert_regions(text, &TagMatcher::new());
        assert!(!out.contains("<bash>"));
        assert!(out.contains("ok"));
    }

    #[test]
    fn test_unterminated_fence_strips_to_end() {
        let text = "intro\n```\n<bash>ls</bash>";
        assert_eq!(strip_inert_regions(text, &TagMatcher::new()), "intro\n");
    }

    #[test]
    fn test_strip_inline_code() {
        let text = "`<bash>rm -rf /</bash>` then <bash>ls</bash>";
        assert_eq!(
            strip_inert_regions(text, &TagMatcher::new()),
            " then <bash>ls</bash>"
        );
    }

    #[test]
    fn test_strip_double_backtick_span() {
        let text = "see ``<read path=\"x\"/>`` here";
        assert_eq!(strip_inert_regions(text, &TagMatcher::new()), "see  here");
    }

    #[test]
    fn test_triple_backticks_on_one_line_are_inline() {
        let text = "x ```<bash>ls</bash>``` y\n<say>hi</say>";
        let out = strip_inert_regions(text, &TagMatcher::new());
        assert_eq!(out, "x  y\n<say>hi</say>");
    }

    #[test]
    fn test_lone_backtick_is_kept() {
        let text = "it`s <bash>ls</bash>";
        assert_eq!(strip_inert_regions(text, &TagMatcher::new()), text);
    }

    #[test]
    fn test_strip_literal_block() {
        let text = "<literal><bash>ls</bash></literal><bash>pwd</bash>";
        assert_eq!(
            strip_inert_regions(text, &TagMatcher::new()),
            "<bash>pwd</bash>"
        );
    }

    #[test]
    fn test_unclosed_literal_strips_to_end() {
        let text = "ok <LITERAL> <bash>ls</bash>";
        assert_eq!(strip_inert_regions(text, &TagMatcher::new()), "ok ");
    }

    #[test]
    fn test_protected_block_keeps_backticks() {
        let text = "<bash>echo `date`</bash> and `<bash>rm</bash>`";
        let out = strip_inert_regions(text, &structural(&["bash"]));
        assert_eq!(out, "<bash>echo `date`</bash> and ");
    }

    #[test]
    fn test_protected_content_keeps_fences() {
        let text = "<write path=\"README.md\">\n```sh\ncargo test\n```\n</write>";
        let out = strip_inert_regions(text, &content_tags(&["write"]));
        assert_eq!(out, text);
    }

    #[test]
    fn test_multibyte_text_survives() {
        let text = "héllo `código` wörld <say>ünïcode</say>";
        let out = strip_inert_regions(text, &TagMatcher::new());
        assert_eq!(out, "héllo  wörld <say>ünïcode</say>");
    }

    // ---- closers shadowed by code and hunks ----

    #[test]
    fn test_closer_inside_fence_does_not_end_block() {
        let text = "<bash>echo hi\n```\n</bash>\n<bash>rm -rf /</bash>\n```\n";
        let blocks = structural(&["bash"]).find_blocks(text);
        assert_eq!(blocks[0].body, None);
        assert_eq!(blocks[0].span, 0.."<bash>".len());
    }

    #[test]
    fn test_closer_after_fence_ends_block() {
        let text = "<write path=\"a.md\">\n```\n</write>\n```\n</write>";
        let blocks = content_tags(&["write"]).find_blocks(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].body, Some("\n```\n</write>\n```\n"));
    }

    #[test]
    fn test_closer_inside_inline_span_does_not_end_block() {
        let text = "<say>use `</say>` to stop</say> rest";
        let blocks = content_tags(&["say"]).find_blocks(text);
        assert_eq!(blocks[0].body, Some("use `</say>` to stop"));
    }

    #[test]
    fn test_closer_inside_open_hunk_does_not_end_block() {
        let text = "<edit path=\"a\">\n<<<<<<< SEARCH\nx\n=======\n</edit> y\n>>>>>>> REPLACE\n</edit>";
        let blocks = content_tags(&["edit"]).find_blocks(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].span, 0..text.len());
    }

    #[test]
    fn test_closer_inside_unfinished_hunk_leaves_block_open() {
        let text = "<edit path=\"a\">\n<<<<<<< SEARCH\nx\n</edit>";
        let blocks = content_tags(&["edit"]).find_blocks(text);
        assert_eq!(blocks[0].body, None);
    }

    #[test]
    fn test_structural_closer_ignores_hunks() {
        let text = "<bash>echo '<<<<<<< SEARCH'</bash>";
        let blocks = structural(&["bash"]).find_blocks(text);
        assert_eq!(blocks[0].body, Some("echo '<<<<<<< SEARCH'"));
    }

    #[test]
    fn test_fenced_tags_stay_inert_when_protected_opener_precedes_fence() {
        let text = "<bash>echo hi\n```\n</bash>\n<bash>rm -rf /</bash>\n```\n";
        let out = strip_inert_regions(text, &structural(&["bash"]));
        assert!(!out.contains("rm -rf"));
    }
}
