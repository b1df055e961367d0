//! PDF text extraction, heading segmentation and chunk packing for academic papers.

pub mod reader_pdf;
#[cfg(feature = "pdfium")] pub mod reader_pdf_pdfium;
#[cfg(feature = "pure-pdf")] pub mod reader_pdf_pure;
pub mod segmenter;
pub mod chunk_builder;

pub use chunk_builder::{build_chunks, ChunkParams, ConfigError};
pub use reader_pdf::{backend_available, backend_name, parse_backend, read_pdf_to_blocks, read_pdf_to_blocks_with, ExtractError, PdfBackend, ReaderOptions};
pub use segmenter::{segment, SegmentParams};

use std::path::Path;

use toc_model::{Chunk, PageBlock, Section};

/// Blocks, sections and chunks for one PDF.
#[derive(Debug, Clone)]
pub struct ChunkOutput {
    pub blocks: Vec<PageBlock>,
    pub sections: Vec<Section>,
    pub chunks: Vec<Chunk>,
}

/// Read, segment and chunk a PDF in one go.
pub fn chunk_pdf_file(
    path: &Path,
    reader: &ReaderOptions,
    segment_params: &SegmentParams,
    chunk_params: &ChunkParams,
) -> Result<ChunkOutput, ExtractError> {
    let blocks = read_pdf_to_blocks(path, reader)?;
    let sections = segment(&blocks, segment_params);
    let chunks = build_chunks(&sections, chunk_params);
    Ok(ChunkOutput { blocks, sections, chunks })
}
