//! Extraction of typed actions from tag-annotated model output.
//!
//! The entry point is [`ActionParser::parse`]. Action families are
//! [`ParserConfig`]s held in a [`ParserRegistry`]; the built-in families
//! live in [`parsers`] and extra ones can be registered before parsing.
//!
//! Text inside fenced code, inline code spans and `<literal>` blocks never
//! produces actions, and tags embedded in a content-bearing payload (file
//! contents, spoken text, sub-agent prompts) stay inert data.

pub mod attrs;
pub mod corruption;
pub mod fixup;
pub mod isolate;
pub mod normalize;
pub mod parser;
pub mod parsers;
pub mod registry;

pub use attrs::{decode_entities, extract_attr, extract_bool_attr, ParserUtils};
pub use corruption::CorruptionDetector;
pub use fixup::Fixup;
pub use isolate::{strip_inert_regions, ScanMode, TagBlock, TagMatcher};
pub use parser::ActionParser;
pub use registry::{ParseFn, ParserConfig, ParserRegistry, TagRegistry};
