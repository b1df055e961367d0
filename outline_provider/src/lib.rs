//! Language-model side of the pipeline: prompts, the completion client,
//! response parsing and cross-chunk merging.

pub mod config;
pub mod extractor;
pub mod merge;
pub mod parse;
pub mod prompt;
pub mod provider;

pub use extractor::{ChunkWarning, ExtractOutcome, ExtractorError, OutlineExtractor};
pub use parse::{parse_response, ParseError};
pub use provider::{CompletionProvider, OpenAiConfig, OpenAiProvider, ProviderError};
