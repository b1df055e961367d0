//! PDFium-backed PDF reader. Behind feature `pdfium`.
//!
//! PDFium exposes page text without per-run font data here, so blocks carry no
//! font hints; the segmenter falls back to numbered-heading detection.

#![cfg(feature = "pdfium")]

use std::path::{Path, PathBuf};

use pdfium_render::prelude::*;
use toc_model::PageBlock;

use crate::reader_pdf::ExtractError;

fn bind_pdfium_from_env() -> Option<Box<dyn PdfiumLibraryBindings>> {
    // Explicit library path, or a directory holding the platform library
    for var in ["PDFIUM_DLL_PATH", "PDFIUM_DIR"] {
        if let Ok(value) = std::env::var(var) {
            let pb = PathBuf::from(value);
            let lib_path = if pb.is_dir() { Pdfium::pdfium_platform_library_name_at_path(&pb) } else { pb };
            if let Ok(b) = Pdfium::bind_to_library(&lib_path) { return Some(b); }
        }
    }
    None
}

fn bind_pdfium() -> Result<Box<dyn PdfiumLibraryBindings>, ExtractError> {
    if let Some(b) = bind_pdfium_from_env() { return Ok(b); }
    Pdfium::bind_to_system_library().map_err(|err| ExtractError::Load(format!("pdfium bind failed: {err}")))
}

pub fn read_pdf_to_blocks_pdfium(path: &Path, password: Option<&str>) -> Result<Vec<PageBlock>, ExtractError> {
    let pdfium = Pdfium::new(bind_pdfium()?);
    let document = pdfium.load_pdf_from_file(path, password).map_err(|err| {
        let msg = format!("{err:?}");
        if msg.contains("Password") {
            match password {
                Some(_) => ExtractError::InvalidPassword(msg),
                None => ExtractError::PasswordRequired,
            }
        } else {
            ExtractError::Load(msg)
        }
    })?;

    let mut out = Vec::new();
    for (idx, page) in document.pages().iter().enumerate() {
        let page_num = (idx as u32) + 1;
        let text = match page.text() {
            Ok(t) => t.all(),
            Err(_) => continue,
        };
        for para in split_paragraphs(&text) {
            out.push(PageBlock::new(page_num, para));
        }
    }
    Ok(out)
}

/// Splits page text on blank lines and before numbered heading lines, joining
/// hyphenated line breaks.
fn split_paragraphs(raw: &str) -> Vec<String> {
    let raw = raw.replace('\r', "");
    let mut out: Vec<String> = Vec::new();
    let mut current = String::new();
    for line in raw.split('\n').map(str::trim) {
        if line.is_empty() || (starts_numbered(line) && !current.is_empty()) {
            if !current.trim().is_empty() { out.push(std::mem::take(&mut current)); }
            current.clear();
            if line.is_empty() { continue; }
        }
        if current.ends_with('-') && line.starts_with(|c: char| c.is_ascii_lowercase()) {
            current.pop();
        } else if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
    }
    if !current.trim().is_empty() { out.push(current); }
    out
}

fn starts_numbered(line: &str) -> bool {
    let digits = line.chars().take_while(|c| c.is_ascii_digit() || *c == '.').count();
    digits > 0 && line.chars().nth(digits).map(|c| c == ' ').unwrap_or(false)
}
