use toc_model::{Chunk, Section};

/// Separator placed between consecutive sections in the chunk stream.
pub const SECTION_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,
    #[error("chunk overlap {overlap} exceeds half of chunk size {max_size}")]
    OverlapTooLarge { max_size: usize, overlap: usize },
}

/// Validated chunk size/overlap pair, both in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkParams {
    max_size: usize,
    overlap: usize,
}

impl ChunkParams {
    pub fn new(max_size: usize, overlap: usize) -> Result<Self, ConfigError> {
        if max_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if overlap > max_size / 2 {
            return Err(ConfigError::OverlapTooLarge { max_size, overlap });
        }
        Ok(Self { max_size, overlap })
    }

    pub fn max_size(&self) -> usize { self.max_size }
    pub fn overlap(&self) -> usize { self.overlap }
}

/// A section's text (plus leading separator) still waiting to be placed.
#[derive(Debug)]
struct Piece {
    text: String,
    section: usize,
    marks: Vec<(usize, u32)>,
    /// Still the full section, nothing taken off its head yet.
    whole: bool,
}

impl Piece {
    fn from_section(index: usize, section: &Section) -> Self {
        let mut text = String::new();
        let mut marks = vec![(0, section.page_start)];
        if index > 0 { text.push_str(SECTION_SEPARATOR); }
        for (i, block) in section.blocks.iter().enumerate() {
            if i > 0 { text.push('\n'); }
            if marks.last().map(|m| m.1) != Some(block.page) {
                marks.push((text.len(), block.page));
            }
            text.push_str(&block.text);
        }
        Self { text, section: index, marks, whole: true }
    }

    fn char_len(&self) -> usize { self.text.chars().count() }

    /// Split at byte `cut`, returning the head and keeping the tail in `self`.
    fn take_head(&mut self, cut: usize) -> Piece {
        let tail_text = self.text.split_off(cut);
        let head_text = std::mem::replace(&mut self.text, tail_text);
        let active = self.marks.iter().take_while(|m| m.0 <= cut).last().map(|m| m.1);
        let (head_marks, tail_marks): (Vec<_>, Vec<_>) = self.marks.drain(..).partition(|m| m.0 < cut);
        let mut tail: Vec<(usize, u32)> = tail_marks.into_iter().map(|(o, p)| (o - cut, p)).collect();
        if tail.first().map(|m| m.0) != Some(0) {
            if let Some(page) = active { tail.insert(0, (0, page)); }
        }
        self.marks = tail;
        self.whole = false;
        Piece { text: head_text, section: self.section, marks: head_marks, whole: false }
    }
}

#[derive(Debug, Default)]
struct OpenChunk {
    prefix: String,
    prefix_chars: usize,
    body: String,
    body_chars: usize,
    sections: Vec<usize>,
    marks: Vec<(usize, u32)>,
}

impl OpenChunk {
    fn push(&mut self, piece: Piece) {
        let base = self.prefix.len() + self.body.len();
        self.marks.extend(piece.marks.into_iter().map(|(o, p)| (base + o, p)));
        self.body_chars += piece.text.chars().count();
        self.body.push_str(&piece.text);
        if self.sections.last() != Some(&piece.section) {
            self.sections.push(piece.section);
        }
    }

    /// Drop the head of the overlap prefix so at most `keep` chars remain.
    /// Only valid while the body is empty.
    fn shrink_prefix(&mut self, keep: usize) {
        let kept = tail_chars(&self.prefix, keep);
        let dropped = self.prefix.len() - kept.len();
        if dropped == 0 { return; }
        let active = self.marks.iter().take_while(|m| m.0 <= dropped).last().map(|m| m.1);
        let rest = self.marks.iter().filter(|m| m.0 > dropped).map(|&(o, p)| (o - dropped, p));
        self.marks = if kept.is_empty() {
            Vec::new()
        } else {
            active.map(|p| (0, p)).into_iter().chain(rest).collect()
        };
        self.prefix = kept.to_string();
        self.prefix_chars = self.prefix.chars().count();
    }
}

/// Pack sections into chunks of at most `max_size` characters.
///
/// Chunks break at section edges where possible; only a section longer than
/// `max_size` is split, at the last sentence boundary that fits. Each chunk
/// after the first repeats the trailing `overlap` characters of its
/// predecessor, shortened when that is what keeps a whole section together.
pub fn build_chunks(sections: &[Section], params: &ChunkParams) -> Vec<Chunk> {
    let mut out: Vec<Chunk> = Vec::new();
    let mut open = OpenChunk::default();

    for (index, section) in sections.iter().enumerate() {
        let mut piece = Piece::from_section(index, section);
        loop {
            let limit = params.max_size - open.prefix_chars;
            let len = piece.char_len();
            if open.body_chars + len <= limit {
                open.push(piece);
                break;
            }
            if open.body_chars > 0 {
                open = flush(&mut out, open, params);
                continue;
            }
            if piece.whole && len <= params.max_size {
                open.shrink_prefix(params.max_size - len);
                open.push(piece);
                break;
            }
            let cut = split_point(&piece.text, limit);
            let head = piece.take_head(cut);
            open.push(head);
            open = flush(&mut out, open, params);
            if piece.text.is_empty() {
                break;
            }
        }
    }
    if open.body_chars > 0 {
        flush(&mut out, open, params);
    }
    out
}

/// Close `open` into a chunk and start the next one with the overlap prefix.
fn flush(out: &mut Vec<Chunk>, open: OpenChunk, params: &ChunkParams) -> OpenChunk {
    let overlap_bytes = open.prefix.len();
    let text = format!("{}{}", open.prefix, open.body);
    let mut marks = open.marks;
    if marks.first().map(|m| m.0) != Some(0) {
        if let Some(&(_, page)) = marks.first() { marks.insert(0, (0, page)); }
    }
    let prefix = tail_chars(&text, params.overlap).to_string();
    let prefix_start = text.len() - prefix.len();
    let active = marks.iter().take_while(|m| m.0 <= prefix_start).last().map(|m| m.1);
    let next_marks: Vec<(usize, u32)> = active.map(|p| vec![(0, p)]).unwrap_or_default().into_iter()
        .chain(marks.iter().filter(|m| m.0 > prefix_start).map(|&(o, p)| (o - prefix_start, p)))
        .collect();

    out.push(Chunk::new(text, overlap_bytes, open.sections).with_page_marks(marks));
    OpenChunk {
        prefix_chars: prefix.chars().count(),
        prefix,
        marks: if params.overlap > 0 { next_marks } else { Vec::new() },
        ..OpenChunk::default()
    }
}

fn tail_chars(text: &str, n: usize) -> &str {
    if n == 0 { return ""; }
    match text.char_indices().rev().nth(n - 1) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

/// Byte index at which to cut `text` so the head holds at most `limit` chars.
///
/// Prefers the last sentence end (`.`, `!`, `?` before whitespace) or line
/// break, then the last whitespace, then a hard cut.
pub fn split_point(text: &str, limit: usize) -> usize {
    let max_byte = text.char_indices().nth(limit.max(1)).map(|(b, _)| b).unwrap_or(text.len());
    let window = &text[..max_byte];
    let has_content = |cut: usize| !text[..cut].trim().is_empty();

    let mut sentence: Option<usize> = None;
    let mut space: Option<usize> = None;
    let mut chars = window.char_indices().peekable();
    while let Some((i, ch)) = chars.next() {
        let end = i + ch.len_utf8();
        let next = chars.peek().map(|&(_, c)| c).or_else(|| text[end..].chars().next());
        if matches!(ch, '.' | '!' | '?') && next.map(char::is_whitespace).unwrap_or(true) && has_content(end) {
            sentence = Some(end);
        }
        if ch == '\n' && has_content(end) {
            sentence = Some(end);
        }
        if ch.is_whitespace() && has_content(end) {
            space = Some(end);
        }
    }
    sentence.or(space).unwrap_or(max_byte)
}
