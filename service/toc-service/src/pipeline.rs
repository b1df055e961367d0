use std::path::{Path, PathBuf};

use outline_provider::{ChunkWarning, ExtractorError};
use paper_chunker::{build_chunks, read_pdf_to_blocks, segment};
use toc_model::{DocumentState, ProcessingResult};
use tracing::{debug, info, warn};

use crate::writer::write_result;
use crate::{ProgressEvent, ProgressFn, ServiceError, TocService};

/// Everything produced for one successfully processed PDF.
#[derive(Debug, Clone)]
pub struct DocumentOutcome {
    pub result: ProcessingResult,
    pub sections: usize,
    pub warnings: Vec<ChunkWarning>,
    pub written: Vec<PathBuf>,
}

/// Walks one document through its states, logging and reporting each step.
struct StateTracker<'a> {
    document_id: &'a str,
    state: DocumentState,
    progress: Option<&'a ProgressFn>,
}

impl<'a> StateTracker<'a> {
    fn new(document_id: &'a str, progress: Option<&'a ProgressFn>) -> Self {
        Self { document_id, state: DocumentState::Pending, progress }
    }

    fn advance(&mut self) {
        if !self.state.is_terminal() {
            self.set(self.state.advance());
        }
    }

    fn fail(&mut self, err: &ServiceError) {
        if self.state.is_terminal() {
            return;
        }
        warn!(document = %self.document_id, state = ?self.state, error = %err, "document failed");
        self.set(DocumentState::Failed);
    }

    fn set(&mut self, state: DocumentState) {
        self.state = state;
        debug!(document = %self.document_id, state = ?state, "state change");
        if let Some(cb) = self.progress {
            cb(ProgressEvent::State { document_id: self.document_id.to_string(), state });
        }
    }
}

impl TocService {
    /// Extract, segment, chunk, outline and write one PDF.
    pub fn process_document(
        &self,
        path: &Path,
        document_id: &str,
        progress: Option<&ProgressFn>,
    ) -> Result<DocumentOutcome, ServiceError> {
        let mut tracker = StateTracker::new(document_id, progress);
        let outcome = self.run_stages(path, document_id, &mut tracker);
        if let Err(err) = &outcome {
            tracker.fail(err);
        }
        outcome
    }

    fn run_stages(
        &self,
        path: &Path,
        document_id: &str,
        tracker: &mut StateTracker<'_>,
    ) -> Result<DocumentOutcome, ServiceError> {
        let cfg = self.config();

        tracker.advance();
        let blocks = read_pdf_to_blocks(path, &cfg.reader)?;

        tracker.advance();
        let sections = segment(&blocks, &cfg.segment);
        if sections.iter().all(|s| s.heading.is_none()) {
            debug!(document = %document_id, "no heading cues, using a single section");
        }

        tracker.advance();
        let chunks = build_chunks(&sections, &cfg.chunk);
        debug!(document = %document_id, blocks = blocks.len(), sections = sections.len(), chunks = chunks.len(), "document chunked");

        tracker.advance();
        let extracted = self.extractor.extract(&chunks).map_err(|err| match err {
            ExtractorError::Timeout { chunk, after } => ServiceError::ExtractionTimeout { chunk, after },
            other => ServiceError::Provider(other.to_string()),
        })?;
        if let Some(cb) = tracker.progress {
            for w in &extracted.warnings {
                cb(ProgressEvent::ChunkSkipped {
                    document_id: document_id.to_string(),
                    chunk: w.chunk,
                    reason: w.message.clone(),
                });
            }
        }

        let result = ProcessingResult {
            document_id: document_id.to_string(),
            source_file: path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default(),
            generated_at: self.clock.now(),
            entries: extracted.entries,
            chunks,
        };
        let written = write_result(&cfg.output_dir, &result, &cfg.outputs)?;

        tracker.advance();
        info!(
            document = %document_id,
            entries = result.entries.len(),
            chunks = result.chunks.len(),
            calls = extracted.calls,
            skipped = extracted.warnings.len(),
            "document done"
        );
        Ok(DocumentOutcome { result, sections: sections.len(), warnings: extracted.warnings, written })
    }
}
