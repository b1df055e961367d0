//! Shared models used across crates

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One extracted text run tied to a page and a vertical position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageBlock {
    /// 1-based page number.
    pub page: u32,
    pub text: String,
    /// Effective font size in points, when the reader can tell.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    /// Distance from the top of the page in points (smaller = higher up).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
}

impl PageBlock {
    pub fn new(page: u32, text: impl Into<String>) -> Self {
        Self { page, text: text.into(), font_size: None, bold: None, y: None }
    }

    pub fn with_font(mut self, size: f32, bold: bool) -> Self {
        self.font_size = Some(size);
        self.bold = Some(bold);
        self
    }

    pub fn with_y(mut self, y: f32) -> Self {
        self.y = Some(y);
        self
    }
}

/// A heuristically detected heading/body unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Heading text when the section was opened by a heading-like block.
    pub heading: Option<String>,
    pub page_start: u32,
    pub blocks: Vec<PageBlock>,
}

impl Section {
    pub fn new(first: PageBlock, heading: Option<String>) -> Self {
        Self { heading, page_start: first.page, blocks: vec![first] }
    }

    /// Block texts joined with a single newline.
    pub fn text(&self) -> String {
        self.blocks.iter().map(|b| b.text.as_str()).collect::<Vec<_>>().join("\n")
    }

    pub fn page_end(&self) -> u32 {
        self.blocks.last().map(|b| b.page).unwrap_or(self.page_start)
    }
}

/// A bounded text window submitted to the language model.
///
/// `text` starts with `overlap` bytes repeated from the previous chunk; the
/// remainder is the chunk's own (unique) text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    #[serde(skip)]
    pub overlap: usize,
    pub source_sections: Vec<usize>,
    /// Character count of `text`.
    pub size: usize,
    /// `(byte offset into text, page)` wherever the source page changes.
    #[serde(skip)]
    pub page_marks: Vec<(usize, u32)>,
}

impl Chunk {
    pub fn new(text: String, overlap: usize, source_sections: Vec<usize>) -> Self {
        let size = text.chars().count();
        Self { text, overlap, source_sections, size, page_marks: Vec::new() }
    }

    pub fn with_page_marks(mut self, marks: Vec<(usize, u32)>) -> Self {
        self.page_marks = marks;
        self
    }

    /// Text that is not repeated from the previous chunk.
    pub fn unique_text(&self) -> &str {
        &self.text[self.overlap.min(self.text.len())..]
    }

    /// First and last page this chunk draws from.
    pub fn page_range(&self) -> Option<(u32, u32)> {
        let min = self.page_marks.iter().map(|m| m.1).min()?;
        let max = self.page_marks.iter().map(|m| m.1).max()?;
        Some((min, max))
    }
}

/// One table-of-contents row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineEntry {
    pub number: String,
    pub title: String,
    pub page: u32,
    pub depth: u32,
}

impl OutlineEntry {
    /// Builds an entry, deriving the depth from the dotted number.
    pub fn new(number: impl Into<String>, title: impl Into<String>, page: u32) -> Self {
        let number = number.into().trim().trim_end_matches('.').to_string();
        let depth = depth_of(&number);
        Self { number, title: title.into().trim().to_string(), page, depth }
    }
}

/// Nesting depth of a dotted section number: "2" -> 1, "2.1" -> 2.
pub fn depth_of(number: &str) -> u32 {
    let n = number.split('.').filter(|p| !p.trim().is_empty()).count() as u32;
    n.max(1)
}

/// Complete per-document output bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingResult {
    pub document_id: String,
    pub source_file: String,
    pub generated_at: DateTime<Utc>,
    pub entries: Vec<OutlineEntry>,
    pub chunks: Vec<Chunk>,
}

/// Lifecycle of one document through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentState {
    Pending,
    Extracting,
    Segmenting,
    Chunking,
    Summarizing,
    Done,
    Failed,
}

impl DocumentState {
    /// Next state on success; terminal states stay put.
    pub fn advance(self) -> Self {
        match self {
            Self::Pending => Self::Extracting,
            Self::Extracting => Self::Segmenting,
            Self::Segmenting => Self::Chunking,
            Self::Chunking => Self::Summarizing,
            Self::Summarizing => Self::Done,
            Self::Done => Self::Done,
            Self::Failed => Self::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}
