pub mod batch;
pub mod clock;
pub mod config;
pub mod pipeline;
pub mod writer;

use std::sync::Arc;
use std::time::Duration;

use outline_provider::{CompletionProvider, OpenAiProvider, OutlineExtractor, ProviderError};
use toc_model::DocumentState;

use crate::clock::{clock_for, Clock};
use crate::config::PipelineConfig;

pub use batch::{BatchReport, FileReport, FileStatus};
pub use config::{ConfigError, ConfigOverrides};
pub use pipeline::DocumentOutcome;
pub use writer::{OutputToggles, WriteError};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("extraction failed: {0}")]
    Extraction(#[from] paper_chunker::ExtractError),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("model call for chunk {chunk} timed out after {after:?}")]
    ExtractionTimeout { chunk: usize, after: Duration },
    #[error("model provider error: {0}")]
    Provider(String),
    #[error(transparent)]
    Write(#[from] WriteError),
    #[error("io error: {0}")]
    Io(String),
}

impl From<ConfigError> for ServiceError {
    fn from(err: ConfigError) -> Self { Self::Configuration(err.to_string()) }
}

/// Progress events emitted while processing documents.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    BatchStart { total_files: usize },
    State { document_id: String, state: DocumentState },
    ChunkSkipped { document_id: String, chunk: usize, reason: String },
    DocumentFinished { report: FileReport },
}

pub type ProgressFn = dyn Fn(ProgressEvent) + Send + Sync;

/// Turns PDFs into table-of-contents artifacts.
pub struct TocService {
    cfg: PipelineConfig,
    extractor: OutlineExtractor,
    clock: Arc<dyn Clock>,
}

impl TocService {
    /// Build the service with the OpenAI-compatible provider described by `cfg`.
    pub fn new(cfg: PipelineConfig) -> Result<Self, ServiceError> {
        let provider = OpenAiProvider::new(cfg.openai.clone()).map_err(|err| match err {
            ProviderError::NotConfigured(msg) => ServiceError::Configuration(msg),
            other => ServiceError::Provider(other.to_string()),
        })?;
        let clock = clock_for(cfg.fixed_timestamp);
        Ok(Self::with_parts(cfg, Arc::new(provider), clock))
    }

    pub fn with_parts(cfg: PipelineConfig, provider: Arc<dyn CompletionProvider>, clock: Arc<dyn Clock>) -> Self {
        let extractor = OutlineExtractor::new(provider, cfg.page_tolerance);
        Self { cfg, extractor, clock }
    }

    pub fn config(&self) -> &PipelineConfig { &self.cfg }

    pub fn model_id(&self) -> &str { self.extractor.model_id() }
}
