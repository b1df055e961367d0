use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use sha2::Digest;
use tracing::{info, warn};

use crate::writer::{format_timestamp, write_atomic, WriteError};
use crate::{ProgressEvent, ProgressFn, ServiceError, TocService};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Success,
    Failed,
}

/// One row of the processing log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub file: String,
    #[serde(skip)]
    pub document_id: String,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped_chunks: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of a directory run, in input order.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub timestamp: DateTime<Utc>,
    pub results: Vec<FileReport>,
}

#[derive(Serialize)]
struct ProcessingLog<'a> {
    timestamp: String,
    total_files: usize,
    successful: usize,
    failed: usize,
    results: &'a [FileReport],
}

impl BatchReport {
    pub fn successful(&self) -> usize {
        self.results.iter().filter(|r| r.status == FileStatus::Success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.successful()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }

    pub fn log_file_name(&self) -> String {
        format!("processing_log_{}.json", self.timestamp.format("%Y%m%d_%H%M%S"))
    }

    pub fn render_log(&self) -> Result<String, WriteError> {
        let log = ProcessingLog {
            timestamp: format_timestamp(&self.timestamp),
            total_files: self.results.len(),
            successful: self.successful(),
            failed: self.failed(),
            results: &self.results,
        };
        Ok(serde_json::to_string_pretty(&log)? + "\n")
    }

    pub fn write_log(&self, output_root: &Path) -> Result<PathBuf, WriteError> {
        fs::create_dir_all(output_root)
            .map_err(|source| WriteError::Io { path: output_root.to_path_buf(), source })?;
        write_atomic(&output_root.join(self.log_file_name()), self.render_log()?.as_bytes())
    }
}

/// `*.pdf` files (any extension case) directly inside `dir`, sorted by name.
pub fn find_pdf_files(dir: &Path) -> Result<Vec<PathBuf>, ServiceError> {
    if !dir.is_dir() {
        return Err(ServiceError::Configuration(format!("input directory not found: {}", dir.display())));
    }
    let entries = fs::read_dir(dir).map_err(|e| ServiceError::Io(format!("{}: {e}", dir.display())))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .filter(|p| p.extension().and_then(|e| e.to_str()).map(|e| e.eq_ignore_ascii_case("pdf")).unwrap_or(false))
        .collect();
    files.sort();
    Ok(files)
}

/// File stems, made unique within the batch with `_2`, `_3`, ... suffixes.
///
/// A stem without any alphanumeric character (empty, `.`, `..`) would not name
/// a folder of its own under the output root, so it becomes `document`.
pub fn assign_document_ids(files: &[PathBuf]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    files
        .iter()
        .map(|path| {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .filter(|s| s.chars().any(char::is_alphanumeric))
                .unwrap_or_else(|| "document".to_string());
            let mut id = stem.clone();
            let mut n = 2;
            while !taken.insert(id.to_lowercase()) {
                id = format!("{stem}_{n}");
                n += 1;
            }
            id
        })
        .collect()
}

pub fn compute_sha256_hex(path: &Path) -> Option<String> {
    let f = File::open(path).ok()?;
    let mut reader = BufReader::new(f);
    let mut hasher = sha2::Sha256::new();
    let mut buf = [0u8; 32 * 1024];
    loop {
        let n = reader.read(&mut buf).ok()?;
        if n == 0 { break; }
        hasher.update(&buf[..n]);
    }
    Some(hex::encode(hasher.finalize()))
}

impl TocService {
    /// Process every PDF in the configured input directory and write the processing log.
    pub fn run_batch(&self, progress: Option<&ProgressFn>) -> Result<BatchReport, ServiceError> {
        let cfg = self.config();
        let files = find_pdf_files(&cfg.input_dir)?;
        let ids = assign_document_ids(&files);
        let timestamp = self.clock.now();
        info!(input = %cfg.input_dir.display(), files = files.len(), jobs = cfg.jobs, "batch start");
        if let Some(cb) = progress {
            cb(ProgressEvent::BatchStart { total_files: files.len() });
        }

        let work: Vec<(&PathBuf, &String)> = files.iter().zip(ids.iter()).collect();
        let results: Vec<FileReport> = if cfg.jobs > 1 && work.len() > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(cfg.jobs)
                .build()
                .map_err(|e| ServiceError::Configuration(format!("thread pool: {e}")))?;
            pool.install(|| work.par_iter().map(|(path, id)| self.process_one(path, id, progress)).collect())
        } else {
            work.iter().map(|(path, id)| self.process_one(path, id, progress)).collect()
        };

        let report = BatchReport { timestamp, results };
        let log_path = report.write_log(&cfg.output_dir)?;
        info!(
            successful = report.successful(),
            failed = report.failed(),
            log = %log_path.display(),
            "batch finished"
        );
        Ok(report)
    }

    fn process_one(&self, path: &Path, document_id: &str, progress: Option<&ProgressFn>) -> FileReport {
        let file = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let report = match self.process_document(path, document_id, progress) {
            Ok(outcome) => FileReport {
                file,
                document_id: document_id.to_string(),
                status: FileStatus::Success,
                entries: Some(outcome.result.entries.len()),
                skipped_chunks: Some(outcome.warnings.len()).filter(|n| *n > 0),
                content_sha256: compute_sha256_hex(path),
                error: None,
            },
            Err(err) => {
                warn!(file = %file, error = %err, "skipping document");
                FileReport {
                    file,
                    document_id: document_id.to_string(),
                    status: FileStatus::Failed,
                    entries: None,
                    skipped_chunks: None,
                    content_sha256: None,
                    error: Some(err.to_string()),
                }
            }
        };
        if let Some(cb) = progress {
            cb(ProgressEvent::DocumentFinished { report: report.clone() });
        }
        report
    }
}
