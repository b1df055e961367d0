use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use toc_model::{Chunk, OutlineEntry, ProcessingResult};
use tracing::debug;

pub const TOC_FILE: &str = "table_of_contents.md";
pub const SUMMARY_FILE: &str = "summary.json";
pub const DOCUMENTS_FILE: &str = "documents.json";

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which artifacts to produce per document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputToggles {
    pub markdown: bool,
    pub summary: bool,
    pub documents: bool,
}

impl Default for OutputToggles {
    fn default() -> Self { Self { markdown: true, summary: true, documents: true } }
}

#[derive(Serialize)]
struct SummaryFile<'a> {
    entries: &'a [OutlineEntry],
    source_file: &'a str,
    generated_at: String,
}

pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Markdown outline, one indented bullet per entry.
pub fn render_markdown(entries: &[OutlineEntry]) -> String {
    let mut out = String::from("# Table of Contents\n\n");
    if entries.is_empty() {
        out.push_str("_No section titles found._\n");
        return out;
    }
    for e in entries {
        let indent = "  ".repeat(e.depth.saturating_sub(1) as usize);
        if e.number.is_empty() {
            out.push_str(&format!("{indent}- {} (p. {})\n", e.title, e.page));
        } else {
            out.push_str(&format!("{indent}- {}. {} (p. {})\n", e.number, e.title, e.page));
        }
    }
    out
}

pub fn render_summary(result: &ProcessingResult) -> Result<String, WriteError> {
    let summary = SummaryFile {
        entries: &result.entries,
        source_file: &result.source_file,
        generated_at: format_timestamp(&result.generated_at),
    };
    Ok(serde_json::to_string_pretty(&summary)? + "\n")
}

pub fn render_documents(chunks: &[Chunk]) -> Result<String, WriteError> {
    Ok(serde_json::to_string_pretty(chunks)? + "\n")
}

/// Write the enabled artifacts into `<output_root>/<document_id>/`.
pub fn write_result(
    output_root: &Path,
    result: &ProcessingResult,
    toggles: &OutputToggles,
) -> Result<Vec<PathBuf>, WriteError> {
    let dir = output_root.join(&result.document_id);
    fs::create_dir_all(&dir).map_err(|source| WriteError::Io { path: dir.clone(), source })?;

    let mut written = Vec::new();
    if toggles.markdown {
        written.push(write_atomic(&dir.join(TOC_FILE), render_markdown(&result.entries).as_bytes())?);
    }
    if toggles.summary {
        written.push(write_atomic(&dir.join(SUMMARY_FILE), render_summary(result)?.as_bytes())?);
    }
    if toggles.documents {
        written.push(write_atomic(&dir.join(DOCUMENTS_FILE), render_documents(&result.chunks)?.as_bytes())?);
    }
    debug!(dir = %dir.display(), files = written.len(), "outputs written");
    Ok(written)
}

/// Write through a hidden temp file in the same directory, then rename over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<PathBuf, WriteError> {
    let wrap = |source: io::Error| WriteError::Io { path: path.to_path_buf(), source };
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let tmp = path.with_file_name(format!(".{name}.tmp"));

    let result = (|| -> io::Result<()> {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();
    if let Err(err) = result {
        let _ = fs::remove_file(&tmp);
        return Err(wrap(err));
    }
    Ok(path.to_path_buf())
}
