//! Parser configs, the tag registry built from them, and the ordered
//! registry the pipeline runs.
//!
//! Registration takes `&mut self`, so a registry cannot change while a
//! parse borrows it. Build it once at startup, then share it read-only.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::Range;
use std::sync::{Arc, OnceLock};

use tracing::{debug, info};

use actiontag_core::types::Action;

use crate::attrs::ParserUtils;
use crate::fixup::{apply_outside, tag_spellings, Fixup};
use crate::isolate::{ScanMode, TagMatcher};
use crate::normalize::normalize_tags;
use crate::parsers::builtin_parsers;

/// Sub-parser entry point: pure function of the working content.
pub type ParseFn = Arc<dyn Fn(&str, &ParserUtils) -> Vec<Action> + Send + Sync>;

/// One action family's contribution to the pipeline.
#[derive(Clone)]
pub struct ParserConfig {
    /// Canonical tags this family parses.
    pub tags: Vec<String>,
    /// Tags that may appear in `<tag .../>` form.
    pub self_closing_tags: Vec<String>,
    /// Extra `(alias, canonical)` spellings.
    pub aliases: Vec<(String, String)>,
    /// Content-bearing: parsed in phase 1 and carved out before phase 2.
    pub pre_strip: bool,
    /// Tags whose bodies are skipped by the code-span stripper.
    pub protected_tags: Vec<String>,
    pub fixups: Vec<Fixup>,
    /// Tags whose blocks are removed from the working content after this
    /// config has parsed.
    pub strip_after_parse: Vec<String>,
    parse: ParseFn,
}

impl ParserConfig {
    pub fn new<F>(tags: &[&str], parse: F) -> Self
    where
        F: Fn(&str, &ParserUtils) -> Vec<Action> + Send + Sync + 'static,
    {
        Self {
            tags: tags.iter().map(|t| t.to_ascii_lowercase()).collect(),
            self_closing_tags: Vec::new(),
            aliases: Vec::new(),
            pre_strip: false,
            protected_tags: Vec::new(),
            fixups: Vec::new(),
            strip_after_parse: Vec::new(),
            parse: Arc::new(parse),
        }
    }

    pub fn self_closing(mut self, tags: &[&str]) -> Self {
        self.self_closing_tags
            .extend(tags.iter().map(|t| t.to_ascii_lowercase()));
        self
    }

    pub fn alias(mut self, alias: &str, canonical: &str) -> Self {
        self.aliases
            .push((alias.to_ascii_lowercase(), canonical.to_ascii_lowercase()));
        self
    }

    pub fn pre_strip(mut self) -> Self {
        self.pre_strip = true;
        self
    }

    pub fn protect(mut self, tags: &[&str]) -> Self {
        self.protected_tags
            .extend(tags.iter().map(|t| t.to_ascii_lowercase()));
        self
    }

    pub fn fixup(mut self, fixup: Fixup) -> Self {
        self.fixups.push(fixup);
        self
    }

    pub fn strip_after(mut self, tags: &[&str]) -> Self {
        self.strip_after_parse
            .extend(tags.iter().map(|t| t.to_ascii_lowercase()));
        self
    }

    /// Canonical tags owned by this config, self-closing forms included.
    pub fn canonical_tags(&self) -> impl Iterator<Item = &str> {
        let mut seen = HashSet::new();
        self.tags
            .iter()
            .chain(self.self_closing_tags.iter())
            .map(String::as_str)
            .filter(move |t| seen.insert(*t))
    }

    /// Whether `tag` is one of this config's canonical tags.
    pub fn owns_tag(&self, tag: &str) -> bool {
        let tag = tag.to_ascii_lowercase();
        self.canonical_tags().any(|t| t == tag)
    }

    /// Run the sub-parser.
    pub fn parse(&self, content: &str, utils: &ParserUtils) -> Vec<Action> {
        (self.parse)(content, utils)
    }
}

impl fmt::Debug for ParserConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserConfig")
            .field("tags", &self.tags)
            .field("self_closing_tags", &self.self_closing_tags)
            .field("aliases", &self.aliases)
            .field("pre_strip", &self.pre_strip)
            .field("protected_tags", &self.protected_tags)
            .field("fixups", &self.fixups.len())
            .field("strip_after_parse", &self.strip_after_parse)
            .finish()
    }
}

/// Spelling → canonical tag map plus the tag classes the isolator needs.
#[derive(Debug, Clone, Default)]
pub struct TagRegistry {
    canonical: HashMap<String, String>,
    content_tags: HashSet<String>,
    protected_tags: HashSet<String>,
}

impl TagRegistry {
    /// Build from configs in registration order. The first registrant of a
    /// spelling wins.
    pub fn build(configs: &[ParserConfig]) -> Self {
        let mut registry = Self::default();
        for config in configs {
            for tag in config.canonical_tags() {
                registry.insert(tag, tag);
                if config.pre_strip {
                    registry.content_tags.insert(tag.to_string());
                }
            }
            for (alias, canonical) in &config.aliases {
                registry.insert(alias, canonical);
            }
            registry
                .protected_tags
                .extend(config.protected_tags.iter().cloned());
        }
        registry
    }

    fn insert(&mut self, spelling: &str, canonical: &str) {
        for variant in tag_spellings(&[spelling]) {
            self.canonical
                .entry(variant)
                .or_insert_with(|| canonical.to_string());
        }
    }

    /// Canonical spelling for any registered spelling, case-insensitive.
    pub fn canonical(&self, name: &str) -> Option<&str> {
        self.canonical
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn is_content_tag(&self, canonical: &str) -> bool {
        self.content_tags.contains(canonical)
    }

    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    /// Matcher over every content-bearing tag.
    pub fn content_matcher(&self) -> TagMatcher {
        TagMatcher::of(&self.content_tags, ScanMode::Content)
    }

    /// Matcher over every registered spelling of a content-bearing tag, for
    /// text that has not been normalized yet.
    pub fn any_spelling_content_matcher(&self) -> TagMatcher {
        let spellings = self
            .canonical
            .iter()
            .filter(|(_, canonical)| self.content_tags.contains(*canonical))
            .map(|(spelling, _)| spelling);
        TagMatcher::of(spellings, ScanMode::Content)
    }

    /// Blocks the code-span stripper must copy through untouched.
    pub fn protected_matcher(&self) -> TagMatcher {
        self.content_matcher()
            .with(&self.protected_tags, ScanMode::Structural)
    }
}

/// Ordered list of parser configs.
#[derive(Debug, Clone, Default)]
pub struct ParserRegistry {
    configs: Vec<ParserConfig>,
    tags: OnceLock<TagRegistry>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in action family.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for config in builtin_parsers() {
            registry.register_action_parser(config);
        }
        registry
    }

    pub fn register_action_parser(&mut self, config: ParserConfig) {
        debug!(tags = ?config.tags, pre_strip = config.pre_strip, "Registered action parser");
        self.configs.push(config);
        self.tags = OnceLock::new();
    }

    /// Remove every config owning any of `tags`. Aliases and variants are
    /// resolved first, so `shell` removes the `bash` family. Returns the
    /// number of configs removed.
    pub fn unregister_action_parsers_for_tags<S: AsRef<str>>(&mut self, tags: &[S]) -> usize {
        let targets: Vec<String> = tags
            .iter()
            .map(|t| {
                let t = t.as_ref();
                self.tag_registry()
                    .canonical(t)
                    .map(str::to_string)
                    .unwrap_or_else(|| t.to_ascii_lowercase())
            })
            .collect();

        let before = self.configs.len();
        self.configs
            .retain(|c| !targets.iter().any(|t| c.owns_tag(t)));
        let removed = before - self.configs.len();
        if removed > 0 {
            self.tags = OnceLock::new();
            info!(tags = ?targets, removed, "Unregistered action parsers");
        }
        removed
    }

    pub fn configs(&self) -> &[ParserConfig] {
        &self.configs
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// The tag registry, built on first use after any registration change.
    pub fn tag_registry(&self) -> &TagRegistry {
        self.tags.get_or_init(|| TagRegistry::build(&self.configs))
    }

    /// Every canonical tag in registration order.
    pub fn canonical_tags(&self) -> Vec<&str> {
        self.configs
            .iter()
            .flat_map(|c| c.canonical_tags())
            .collect()
    }

    /// Run every config's fixups over `content`, in registration order.
    ///
    /// A config's fixups never touch the body of a closed content-bearing
    /// block it does not own, so file payloads pass through byte for byte.
    pub fn apply_fixups(&self, content: &str) -> String {
        let tags = self.tag_registry();
        let matcher = tags.any_spelling_content_matcher();
        let mut out = content.to_string();
        for config in self.configs.iter().filter(|c| !c.fixups.is_empty()) {
            let foreign: Vec<Range<usize>> = matcher
                .find_blocks(&out)
                .into_iter()
                .filter(|b| b.body.is_some())
                .filter(|b| !tags.canonical(&b.name).is_some_and(|c| config.owns_tag(c)))
                .map(|b| b.span)
                .collect();
            out = apply_outside(&config.fixups, &out, &foreign);
        }
        out
    }

    /// Rewrite every recognized tag spelling to its canonical form.
    pub fn normalize_action_tag_variants(&self, content: &str) -> String {
        normalize_tags(content, self.tag_registry())
    }
}
