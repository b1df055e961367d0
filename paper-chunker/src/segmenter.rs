use once_cell::sync::Lazy;
use regex::Regex;
use toc_model::{PageBlock, Section};

/// "1. Introduction", "2.1 Setup", "3.2.1. Results" ...
static NUMBERED_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(?:\.\d+)*\.?\s+\p{Lu}").expect("valid heading pattern"));

#[derive(Debug, Clone, Copy)]
pub struct SegmentParams {
    /// A block whose font exceeds the running body median by more than this (pt) opens a section.
    pub font_delta: f32,
    /// Numbered headings longer than this are treated as body text.
    pub max_heading_chars: usize,
    /// Numbered headings shorter than or equal to this are treated as noise.
    pub min_heading_chars: usize,
    /// Body samples needed before a smaller-than-body font vetoes a numbered heading.
    pub min_body_samples: usize,
}

impl Default for SegmentParams {
    fn default() -> Self { Self { font_delta: 1.5, max_heading_chars: 200, min_heading_chars: 5, min_body_samples: 3 } }
}

/// Why a block opened a new section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingCue {
    LargerFont,
    Numbered,
}

/// Group page blocks into sections.
///
/// Every block lands in exactly one section, in input order. When no block
/// looks like a heading the whole document is returned as one section without
/// a heading.
pub fn segment(blocks: &[PageBlock], params: &SegmentParams) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    let mut body_sizes: Vec<f32> = Vec::new();

    for block in blocks {
        let median = median(&body_sizes);
        let cue = heading_cue(block, median, body_sizes.len(), params);

        let page_went_back = sections.last().map(|s| block.page < s.page_end()).unwrap_or(false);
        match sections.last_mut() {
            Some(open) if cue.is_none() && !page_went_back => open.blocks.push(block.clone()),
            _ => {
                let heading = cue.map(|_| heading_text(&block.text));
                sections.push(Section::new(block.clone(), heading));
            }
        }

        if cue.is_none() {
            if let Some(size) = block.font_size {
                let at = body_sizes.partition_point(|s| *s < size);
                body_sizes.insert(at, size);
            }
        }
    }
    sections
}

/// Classify one block against the running body-text median (if any).
pub fn heading_cue(
    block: &PageBlock,
    body_median: Option<f32>,
    body_samples: usize,
    params: &SegmentParams,
) -> Option<HeadingCue> {
    if let (Some(size), Some(median)) = (block.font_size, body_median) {
        if size > median + params.font_delta {
            return Some(HeadingCue::LargerFont);
        }
        // Footnotes and table cells ("1 See ...") sit below body size; bold
        // run-in headings may too
        let bold = block.bold.unwrap_or(false);
        if !bold && body_samples >= params.min_body_samples && size < median - params.font_delta {
            return None;
        }
    }
    let first = first_line(&block.text);
    let len = first.chars().count();
    if len > params.min_heading_chars && len < params.max_heading_chars && NUMBERED_HEADING.is_match(first) {
        return Some(HeadingCue::Numbered);
    }
    None
}

pub fn is_numbered_heading(text: &str) -> bool {
    NUMBERED_HEADING.is_match(first_line(text))
}

fn first_line(text: &str) -> &str {
    text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("")
}

/// First line of a heading block; a bare number like "2.1." picks up the next line.
pub fn heading_text(text: &str) -> String {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    let mut title = lines.first().map(|l| l.to_string()).unwrap_or_default();
    if title.chars().count() < 10 && lines.len() > 1 {
        title = format!("{} {}", title, lines[1]);
    }
    if title.chars().count() > 100 {
        title = format!("{}...", title.chars().take(100).collect::<String>());
    }
    title
}

fn median(sorted: &[f32]) -> Option<f32> {
    match sorted.len() {
        0 => None,
        n if n % 2 == 1 => Some(sorted[n / 2]),
        n => Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0),
    }
}
