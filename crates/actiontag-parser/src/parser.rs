//! The extraction pipeline.
//!
//! `raw → fixups → alias normalization → inert-region stripping →
//! phase 1 (content-bearing) → carve-out → phase 2 (structural)`.
//!
//! Phase 1 hands each content-bearing family a view of the text with every
//! *other* content-bearing block removed, so a `<write>` inside a `<say>`
//! is never parsed. All content-bearing blocks are then removed before the
//! structural families run, which is what keeps an action embedded in a
//! payload from ever executing on its own.

use std::ops::Range;

use tracing::{debug, trace};

use actiontag_core::config::ParserSettings;
use actiontag_core::types::Action;

use crate::attrs::ParserUtils;
use crate::isolate::{remove_spans, strip_blocks, strip_inert_regions, ScanMode, TagMatcher};
use crate::registry::ParserRegistry;

/// Parses model output into actions. Cheap to share; parsing takes `&self`.
#[derive(Debug, Clone)]
pub struct ActionParser {
    registry: ParserRegistry,
    utils: ParserUtils,
}

impl Default for ActionParser {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ActionParser {
    pub fn new(registry: ParserRegistry, utils: ParserUtils) -> Self {
        Self { registry, utils }
    }

    /// Built-in families with default detector thresholds.
    pub fn with_defaults() -> Self {
        Self::new(ParserRegistry::with_builtins(), ParserUtils::default())
    }

    /// Built-in families minus `settings.disabled_tags`, with the
    /// configured detector thresholds.
    pub fn from_settings(settings: &ParserSettings) -> Self {
        let mut registry = ParserRegistry::with_builtins();
        if !settings.disabled_tags.is_empty() {
            registry.unregister_action_parsers_for_tags(&settings.disabled_tags[..]);
        }
        Self::new(registry, ParserUtils::from_settings(settings))
    }

    pub fn registry(&self) -> &ParserRegistry {
        &self.registry
    }

    /// Mutable access for registering extra families before parsing starts.
    pub fn registry_mut(&mut self) -> &mut ParserRegistry {
        &mut self.registry
    }

    pub fn utils(&self) -> &ParserUtils {
        &self.utils
    }

    /// Extract every action from `content`. Never fails; malformed tags
    /// simply produce nothing.
    pub fn parse(&self, content: &str) -> Vec<Action> {
        let tags = self.registry.tag_registry();
        let fixed = self.registry.apply_fixups(content);
        let normalized = self.registry.normalize_action_tag_variants(&fixed);
        let working = strip_inert_regions(&normalized, &tags.protected_matcher());
        trace!(working = %working, "Prepared content for parsing");

        let content_blocks = tags.content_matcher().find_blocks(&working);
        let mut actions = Vec::new();

        for config in self.registry.configs().iter().filter(|c| c.pre_strip) {
            let foreign: Vec<Range<usize>> = content_blocks
                .iter()
                .filter(|b| !config.owns_tag(&b.name))
                .map(|b| b.span.clone())
                .collect();
            let view = remove_spans(&working, &foreign);
            actions.extend(config.parse(&view, &self.utils));
        }

        let spans: Vec<Range<usize>> = content_blocks.iter().map(|b| b.span.clone()).collect();
        let mut remaining = remove_spans(&working, &spans);
        for config in self.registry.configs().iter().filter(|c| c.pre_strip) {
            remaining = strip_extra(&remaining, &config.strip_after_parse);
        }

        for config in self.registry.configs().iter().filter(|c| !c.pre_strip) {
            actions.extend(config.parse(&remaining, &self.utils));
            remaining = strip_extra(&remaining, &config.strip_after_parse);
        }

        debug!(count = actions.len(), "Parsed actions");
        actions
    }
}

fn strip_extra(content: &str, tags: &[String]) -> String {
    if tags.is_empty() {
        return content.to_string();
    }
    strip_blocks(content, &TagMatcher::of(tags, ScanMode::Structural))
}
