use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use toc_model::{Chunk, OutlineEntry};
use tracing::{debug, warn};

use crate::merge::merge_entries;
use crate::parse::parse_response;
use crate::prompt::build_prompt;
use crate::provider::{CompletionProvider, ProviderError};

#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("model call for chunk {chunk} timed out after {after:?}")]
    Timeout { chunk: usize, after: Duration },
    #[error("model call for chunk {chunk} failed: {source}")]
    Provider {
        chunk: usize,
        #[source]
        source: ProviderError,
    },
}

/// A chunk whose answer could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkWarning {
    pub chunk: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ExtractOutcome {
    pub entries: Vec<OutlineEntry>,
    pub warnings: Vec<ChunkWarning>,
    /// Number of model calls made.
    pub calls: usize,
}

/// Runs one completion per chunk and merges the answers into a single outline.
#[derive(Clone)]
pub struct OutlineExtractor {
    provider: Arc<dyn CompletionProvider>,
    page_tolerance: u32,
}

impl OutlineExtractor {
    pub fn new(provider: Arc<dyn CompletionProvider>, page_tolerance: u32) -> Self {
        Self { provider, page_tolerance }
    }

    pub fn model_id(&self) -> &str {
        self.provider.model_id()
    }

    pub fn extract(&self, chunks: &[Chunk]) -> Result<ExtractOutcome, ExtractorError> {
        let mut outcome = ExtractOutcome::default();
        let mut batches = Vec::with_capacity(chunks.len());

        for (index, chunk) in chunks.iter().enumerate() {
            let prompt = build_prompt(chunk, index, chunks.len());
            outcome.calls += 1;
            let answer = match self.provider.complete(&prompt) {
                Ok(answer) => answer,
                Err(ProviderError::Timeout(after)) => return Err(ExtractorError::Timeout { chunk: index, after }),
                Err(source) => return Err(ExtractorError::Provider { chunk: index, source }),
            };
            match parse_response(&answer) {
                Ok(entries) => {
                    debug!(chunk = index, entries = entries.len(), "chunk outline parsed");
                    batches.push(entries);
                }
                Err(err) => {
                    warn!(chunk = index, error = %err, "discarding unparsable chunk response");
                    outcome.warnings.push(ChunkWarning { chunk: index, message: err.to_string() });
                }
            }
        }

        outcome.entries = merge_entries(batches, self.page_tolerance);
        Ok(outcome)
    }
}
