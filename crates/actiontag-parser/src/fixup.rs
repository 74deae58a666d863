//! Repairs for malformed tags, applied before structural parsing.
//!
//! Each repair is a named constructor returning a [`Fixup`] so configs can
//! opt into exactly the rules that are unambiguous for their own tags.
//! Rules are case-insensitive and only touch the tag spellings they are
//! built for.

use regex::{Captures, Regex};
use std::fmt;
use std::ops::Range;
use std::sync::{Arc, LazyLock};

static ATTR_CONTINUATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[\w-]+\s*=|/?>)").unwrap());

/// A custom repair function.
pub type FixupFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// One repair pass over the whole content.
#[derive(Clone)]
pub enum Fixup {
    /// Declarative `replace_all` rewrite. `to` uses regex replacement syntax.
    Replace { from: Regex, to: String },
    /// Arbitrary rewrite.
    Custom(FixupFn),
}

impl Fixup {
    pub fn replace(from: Regex, to: impl Into<String>) -> Self {
        Fixup::Replace {
            from,
            to: to.into(),
        }
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Fixup::Custom(Arc::new(f))
    }

    pub fn apply(&self, content: &str) -> String {
        match self {
            Fixup::Replace { from, to } => from.replace_all(content, to.as_str()).into_owned(),
            Fixup::Custom(f) => f(content),
        }
    }
}

impl fmt::Debug for Fixup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fixup::Replace { from, to } => f
                .debug_struct("Replace")
                .field("from", &from.as_str())
                .field("to", to)
                .finish(),
            Fixup::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Every spelling of the given tags: as written plus hyphen/underscore swaps.
pub fn tag_spellings(tags: &[&str]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let lower = tag.to_ascii_lowercase();
        for variant in [
            lower.clone(),
            lower.replace('-', "_"),
            lower.replace('_', "-"),
        ] {
            if !out.contains(&variant) {
                out.push(variant);
            }
        }
    }
    out
}

fn alternation(tags: &[&str]) -> String {
    tag_spellings(tags)
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join("|")
}

/// `<search">` / `</replace'>` → `<search>` / `</replace>`.
///
/// Only applies to the named inner tags and only when nothing but quote
/// characters sits between the name and `>`.
pub fn stray_quote_after_name(tags: &[&str]) -> Fixup {
    let pattern = format!(r#"(?i)<(/?)({})["']+>"#, alternation(tags));
    Fixup::replace(
        Regex::new(&pattern).expect("Invalid stray-quote fixup regex"),
        "<${1}${2}>",
    )
}

/// `</edit` at end of input, or followed by whitespace and then something
/// other than `>`, becomes `</edit>`.
pub fn unterminated_closer(tags: &[&str]) -> Fixup {
    let pattern = format!(r"(?i)</({})(?:(\s+)([^\s>])|\s*$)", alternation(tags));
    Fixup::replace(
        Regex::new(&pattern).expect("Invalid unterminated-closer fixup regex"),
        "</${1}>${2}${3}",
    )
}

/// A self-closing tag whose attributes run to the end of the line without
/// `/>` gets one appended: `<read path="a.ts"` → `<read path="a.ts"/>`.
///
/// Requires at least one well-formed attribute and nothing else on the
/// rest of the line. Left alone when the next non-blank line carries on
/// with more attributes or the tag's own `>`.
pub fn unterminated_self_closing(tags: &[&str]) -> Fixup {
    let pattern = format!(
        r#"(?im)(<(?:{})(?:\s+[\w-]+\s*=\s*(?:"[^"\n]*"|'[^'\n]*'|[^\s"'<>/]+))+)[ \t]*$"#,
        alternation(tags)
    );
    let re = Regex::new(&pattern).expect("Invalid self-closing fixup regex");
    Fixup::custom(move |content| {
        re.replace_all(content, |caps: &Captures<'_>| {
            let end = caps.get(0).map_or(content.len(), |m| m.end());
            if ATTR_CONTINUATION_RE.is_match(content[end..].trim_start()) {
                caps[0].to_string()
            } else {
                format!("{}/>", &caps[1])
            }
        })
        .into_owned()
    })
}

/// Run `fixups` over `content` in order.
pub fn apply_all(fixups: &[Fixup], content: &str) -> String {
    let mut out = content.to_string();
    for fixup in fixups {
        out = fixup.apply(&out);
    }
    out
}

/// Run `fixups` over everything except the `skip` ranges, which are copied
/// through untouched. Ranges must be sorted and disjoint.
pub fn apply_outside(fixups: &[Fixup], content: &str, skip: &[Range<usize>]) -> String {
    if skip.is_empty() {
        return apply_all(fixups, content);
    }
    let mut out = String::with_capacity(content.len());
    let mut cursor = 0;
    for span in skip {
        out.push_str(&apply_all(fixups, &content[cursor..span.start]));
        out.push_str(&content[span.clone()]);
        cursor = span.end;
    }
    out.push_str(&apply_all(fixups, &content[cursor..]));
    out
}
