use std::path::{Path, PathBuf};

use toc_model::PageBlock;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfBackend {
    PureRust,
    Pdfium,
}

/// Errors raised while turning a PDF into page blocks.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),
    #[error("not a PDF file: {0}")]
    NotPdf(PathBuf),
    #[error("failed to load PDF: {0}")]
    Load(String),
    #[error("PDF is encrypted and no password was supplied")]
    PasswordRequired,
    #[error("failed to decrypt PDF: {0}")]
    InvalidPassword(String),
    #[error("no extractable text (image-only scan?)")]
    NoText,
    #[error("{0} backend not enabled in this build")]
    BackendUnavailable(&'static str),
}

/// Reader settings shared by all backends.
#[derive(Debug, Clone, Default)]
pub struct ReaderOptions {
    /// Password for encrypted documents.
    pub password: Option<String>,
    /// Keep content-stream order instead of sorting blocks top-to-bottom per page.
    pub keep_stream_order: bool,
    /// Backend override; `None` picks [`default_backend`].
    pub backend: Option<PdfBackend>,
}

/// Select the default backend based on enabled cargo features.
pub fn default_backend() -> PdfBackend {
    if cfg!(feature = "pure-pdf") || !cfg!(feature = "pdfium") { PdfBackend::PureRust } else { PdfBackend::Pdfium }
}

pub fn backend_name(backend: PdfBackend) -> &'static str {
    match backend {
        PdfBackend::PureRust => "pure-pdf",
        PdfBackend::Pdfium => "pdfium",
    }
}

/// Whether `backend` was compiled into this build.
pub fn backend_available(backend: PdfBackend) -> bool {
    match backend {
        PdfBackend::PureRust => cfg!(feature = "pure-pdf"),
        PdfBackend::Pdfium => cfg!(feature = "pdfium"),
    }
}

/// Inverse of [`backend_name`], also accepting "pure" and "lopdf".
pub fn parse_backend(name: &str) -> Option<PdfBackend> {
    match name.trim().to_ascii_lowercase().as_str() {
        "pure-pdf" | "pure" | "lopdf" => Some(PdfBackend::PureRust),
        "pdfium" => Some(PdfBackend::Pdfium),
        _ => None,
    }
}

pub fn read_pdf_to_blocks_with(
    path: &Path,
    options: &ReaderOptions,
    backend: PdfBackend,
) -> Result<Vec<PageBlock>, ExtractError> {
    if !path.exists() {
        return Err(ExtractError::NotFound(path.to_path_buf()));
    }
    if !has_pdf_extension(path) {
        return Err(ExtractError::NotPdf(path.to_path_buf()));
    }

    let raw = match backend {
        PdfBackend::PureRust => read_pure(path, options.password.as_deref())?,
        PdfBackend::Pdfium => read_pdfium(path, options.password.as_deref())?,
    };

    let before = raw.len();
    let mut blocks: Vec<PageBlock> = raw.into_iter().filter(|b| !is_noise(&b.text)).collect();
    debug!(backend = backend_name(backend), blocks = blocks.len(), dropped = before - blocks.len(), "pdf read");

    if blocks.iter().all(|b| b.text.trim().is_empty()) {
        return Err(ExtractError::NoText);
    }
    if !options.keep_stream_order {
        order_blocks(&mut blocks);
    }
    Ok(blocks)
}

/// Read a PDF with the backend chosen in `options`, or the default one.
pub fn read_pdf_to_blocks(path: &Path, options: &ReaderOptions) -> Result<Vec<PageBlock>, ExtractError> {
    read_pdf_to_blocks_with(path, options, options.backend.unwrap_or_else(default_backend))
}

#[cfg(feature = "pure-pdf")]
fn read_pure(path: &Path, password: Option<&str>) -> Result<Vec<PageBlock>, ExtractError> {
    crate::reader_pdf_pure::read_pdf_to_blocks_pure(path, password)
}

#[cfg(not(feature = "pure-pdf"))]
fn read_pure(_path: &Path, _password: Option<&str>) -> Result<Vec<PageBlock>, ExtractError> {
    Err(ExtractError::BackendUnavailable("pure-pdf"))
}

#[cfg(feature = "pdfium")]
fn read_pdfium(path: &Path, password: Option<&str>) -> Result<Vec<PageBlock>, ExtractError> {
    crate::reader_pdf_pdfium::read_pdf_to_blocks_pdfium(path, password)
}

#[cfg(not(feature = "pdfium"))]
fn read_pdfium(_path: &Path, _password: Option<&str>) -> Result<Vec<PageBlock>, ExtractError> {
    Err(ExtractError::BackendUnavailable("pdfium"))
}

fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Stable sort by page, then top-to-bottom. A block without a position inherits the
/// position of the block before it on the same page.
pub fn order_blocks(blocks: &mut Vec<PageBlock>) {
    let mut last: Option<(u32, f32)> = None;
    let mut keyed: Vec<(u32, f32, PageBlock)> = blocks
        .drain(..)
        .map(|b| {
            let y = match (b.y, last) {
                (Some(y), _) => y,
                (None, Some((page, y))) if page == b.page => y,
                _ => f32::NEG_INFINITY,
            };
            last = Some((b.page, y));
            (b.page, y, b)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));
    blocks.extend(keyed.into_iter().map(|(_, _, b)| b));
}

/// Page numbers, stray digits and empty runs.
pub fn is_noise(text: &str) -> bool {
    let t = text.trim();
    if t.is_empty() { return true; }
    t.chars().count() <= 3 && t.chars().all(|c| c.is_ascii_digit() || c == '.' || c == '-')
}
