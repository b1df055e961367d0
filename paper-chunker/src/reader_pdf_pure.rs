//! Pure-Rust PDF reader. Behind feature `pure-pdf`.
//!
//! Walks each page content stream with `lopdf`, tracking the graphics/text
//! matrices and the selected font so every shown string can be tagged with its
//! effective font size, a bold flag and its vertical position. Runs sharing a
//! baseline become lines; consecutive lines with the same font become blocks.

#![cfg(feature = "pure-pdf")]

use std::collections::HashMap;
use std::path::Path;

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use toc_model::PageBlock;
use tracing::{debug, warn};

use crate::reader_pdf::ExtractError;

type Matrix = [f32; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
/// Letter size, used when a page declares no MediaBox.
const DEFAULT_PAGE_HEIGHT: f32 = 792.0;
/// TJ adjustments below this (thousandths of an em) are rendered as a space.
const TJ_SPACE_THRESHOLD: f32 = -200.0;

pub fn read_pdf_to_blocks_pure(path: &Path, password: Option<&str>) -> Result<Vec<PageBlock>, ExtractError> {
    let mut doc = Document::load(path).map_err(|err| {
        let msg = err.to_string();
        let lower = msg.to_lowercase();
        if password.is_none() && (lower.contains("encrypt") || lower.contains("password")) {
            ExtractError::PasswordRequired
        } else {
            ExtractError::Load(msg)
        }
    })?;

    if doc.is_encrypted() {
        match password {
            Some(pw) => doc.decrypt(pw).map_err(|e| ExtractError::InvalidPassword(e.to_string()))?,
            None => return Err(ExtractError::PasswordRequired),
        }
    }

    let mut out = Vec::new();
    for (page_num, page_id) in doc.get_pages() {
        let height = page_height(&doc, page_id);
        match page_runs(&doc, page_id, height) {
            Ok(runs) => {
                let lines = runs_to_lines(runs);
                out.extend(lines_to_blocks(page_num, lines));
            }
            Err(err) => warn!(page = page_num, error = %err, "skipping unreadable page"),
        }
    }
    debug!(path = %path.display(), blocks = out.len(), "lopdf extraction finished");
    Ok(out)
}

// --- Content stream walk ----------------------------------------------------

#[derive(Debug, Clone)]
struct Run {
    text: String,
    size: f32,
    bold: bool,
    /// Baseline distance from the page top.
    y: f32,
}

#[derive(Debug, Default)]
struct FontInfo {
    bold: bool,
    to_unicode: Option<ToUnicode>,
}

fn page_runs(doc: &Document, page_id: ObjectId, height: f32) -> Result<Vec<Run>, lopdf::Error> {
    let fonts: HashMap<Vec<u8>, FontInfo> = doc
        .get_page_fonts(page_id)
        .into_iter()
        .map(|(name, dict)| (name, font_info(doc, dict)))
        .collect();
    let content = Content::decode(&doc.get_page_content(page_id)?)?;

    let mut ctm = IDENTITY;
    let mut saved: Vec<Matrix> = Vec::new();
    let mut tm = IDENTITY;
    let mut tlm = IDENTITY;
    let mut font: Option<&FontInfo> = None;
    let mut size = 0.0f32;
    let mut leading = 0.0f32;
    let mut runs = Vec::new();

    for op in &content.operations {
        let args = &op.operands;
        match op.operator.as_str() {
            "q" => saved.push(ctm),
            "Q" => {
                if let Some(m) = saved.pop() { ctm = m; }
            }
            "cm" => {
                if let Some(m) = matrix(args) { ctm = mul(&m, &ctm); }
            }
            "BT" => {
                tm = IDENTITY;
                tlm = IDENTITY;
            }
            "Tf" => {
                font = args.first().and_then(|o| o.as_name().ok()).and_then(|n| fonts.get(n));
                size = args.get(1).and_then(num).unwrap_or(size);
            }
            "TL" => leading = args.first().and_then(num).unwrap_or(leading),
            "Td" | "TD" => {
                let tx = args.first().and_then(num).unwrap_or(0.0);
                let ty = args.get(1).and_then(num).unwrap_or(0.0);
                if op.operator == "TD" { leading = -ty; }
                tlm = mul(&[1.0, 0.0, 0.0, 1.0, tx, ty], &tlm);
                tm = tlm;
            }
            "Tm" => {
                if let Some(m) = matrix(args) {
                    tm = m;
                    tlm = m;
                }
            }
            "T*" => {
                tlm = mul(&[1.0, 0.0, 0.0, 1.0, 0.0, -leading], &tlm);
                tm = tlm;
            }
            "Tj" | "TJ" | "'" | "\"" => {
                if op.operator != "Tj" && op.operator != "TJ" {
                    tlm = mul(&[1.0, 0.0, 0.0, 1.0, 0.0, -leading], &tlm);
                    tm = tlm;
                }
                let operand = if op.operator == "\"" { args.get(2) } else { args.first() };
                let Some(operand) = operand else { continue };
                let text = shown_text(operand, font);
                if text.is_empty() { continue; }
                let rm = mul(&tm, &ctm);
                let scale = (rm[2] * rm[2] + rm[3] * rm[3]).sqrt();
                let effective = if scale > 0.0 { size * scale } else { size.abs() };
                runs.push(Run {
                    text,
                    size: (effective * 10.0).round() / 10.0,
                    bold: font.map(|f| f.bold).unwrap_or(false),
                    y: height - rm[5],
                });
            }
            _ => {}
        }
    }
    Ok(runs)
}

fn shown_text(obj: &Object, font: Option<&FontInfo>) -> String {
    match obj {
        Object::String(bytes, _) => decode_bytes(bytes, font),
        Object::Array(items) => {
            let mut s = String::new();
            for item in items {
                match item {
                    Object::String(bytes, _) => s.push_str(&decode_bytes(bytes, font)),
                    other => {
                        if let Some(adj) = num(other) {
                            if adj < TJ_SPACE_THRESHOLD && !s.ends_with(' ') { s.push(' '); }
                        }
                    }
                }
            }
            s
        }
        _ => String::new(),
    }
}

// --- Line/block grouping ----------------------------------------------------

fn runs_to_lines(runs: Vec<Run>) -> Vec<Run> {
    let mut lines: Vec<(Run, usize, usize)> = Vec::new(); // (line, bold chars, total chars)
    for run in runs {
        let n = run.text.chars().count();
        if let Some((line, bold_chars, total)) = lines.last_mut() {
            let tol = 0.4 * line.size.max(run.size).max(1.0);
            if (line.y - run.y).abs() <= tol {
                let glue = !line.text.ends_with(char::is_whitespace) && !run.text.starts_with(char::is_whitespace);
                if glue { line.text.push(' '); }
                line.text.push_str(&run.text);
                line.size = line.size.max(run.size);
                if run.bold { *bold_chars += n; }
                *total += n;
                continue;
            }
        }
        let bold_chars = if run.bold { n } else { 0 };
        lines.push((run, bold_chars, n));
    }
    lines
        .into_iter()
        .filter_map(|(mut line, bold_chars, total)| {
            line.bold = bold_chars * 2 > total;
            line.text = line.text.split_whitespace().collect::<Vec<_>>().join(" ");
            if line.text.is_empty() { None } else { Some(line) }
        })
        .collect()
}

fn lines_to_blocks(page: u32, lines: Vec<Run>) -> Vec<PageBlock> {
    let mut out: Vec<(PageBlock, f32)> = Vec::new(); // (block, last baseline)
    for line in lines {
        if let Some((block, last_y)) = out.last_mut() {
            let size = block.font_size.unwrap_or(line.size);
            let gap = line.y - *last_y;
            let same_font = (size - line.size).abs() < 0.5 && block.bold == Some(line.bold);
            if same_font && gap > 0.0 && gap <= 2.0 * size.max(1.0) {
                block.text.push('\n');
                block.text.push_str(&line.text);
                *last_y = line.y;
                continue;
            }
        }
        let block = PageBlock::new(page, line.text).with_font(line.size, line.bold).with_y(line.y);
        out.push((block, line.y));
    }
    out.into_iter().map(|(b, _)| b).collect()
}

// --- Fonts ------------------------------------------------------------------

fn font_info(doc: &Document, dict: &Dictionary) -> FontInfo {
    let base = dict
        .get(b"BaseFont")
        .and_then(Object::as_name)
        .map(|n| String::from_utf8_lossy(n).into_owned())
        .unwrap_or_default();
    let to_unicode = dict
        .get(b"ToUnicode")
        .ok()
        .and_then(|o| stream_bytes(doc, o))
        .map(|bytes| parse_to_unicode(&bytes))
        .filter(|c| !c.map.is_empty());
    FontInfo { bold: is_bold_font_name(&base), to_unicode }
}

/// Recognizes bold faces from their PostScript name, including subset prefixes
/// ("ABCDEF+Times-Bold") and TeX names ("CMBX10").
pub fn is_bold_font_name(name: &str) -> bool {
    let base = name.rsplit('+').next().unwrap_or(name);
    let lower = base.to_ascii_lowercase();
    ["bold", "black", "heavy", "semibold", "demi", "-medi"].iter().any(|k| lower.contains(k))
        || base.starts_with("CMBX")
        || base.starts_with("SFBX")
}

fn stream_bytes(doc: &Document, obj: &Object) -> Option<Vec<u8>> {
    let obj = match obj {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let stream = obj.as_stream().ok()?;
    Some(stream.decompressed_content().unwrap_or_else(|_| stream.content.clone()))
}

fn decode_bytes(bytes: &[u8], font: Option<&FontInfo>) -> String {
    if let Some(cmap) = font.and_then(|f| f.to_unicode.as_ref()) {
        return cmap.decode(bytes);
    }
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        return utf16be(&bytes[2..]);
    }
    // Latin-1 / PDFDocEncoding approximation
    bytes.iter().map(|&b| b as char).collect()
}

fn utf16be(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks(2)
        .filter(|c| c.len() == 2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

// --- ToUnicode CMaps ----------------------------------------------------------

#[derive(Debug, Default)]
struct ToUnicode {
    code_bytes: usize,
    map: HashMap<u32, String>,
}

impl ToUnicode {
    fn insert(&mut self, src: &[u8], dst: String) {
        if self.code_bytes == 0 { self.code_bytes = src.len().clamp(1, 4); }
        self.map.insert(be_code(src), dst);
    }

    fn decode(&self, bytes: &[u8]) -> String {
        let width = self.code_bytes.clamp(1, 4);
        bytes
            .chunks(width)
            .map(|c| match self.map.get(&be_code(c)) {
                Some(s) => s.clone(),
                None if width == 1 => (c[0] as char).to_string(),
                None => String::new(),
            })
            .collect()
    }
}

#[derive(Debug)]
enum Tok {
    Hex(Vec<u8>),
    Open,
    Close,
    Word(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CMapSection { Char, Range }

fn parse_to_unicode(bytes: &[u8]) -> ToUnicode {
    let toks = tokenize(&String::from_utf8_lossy(bytes));
    let mut cmap = ToUnicode::default();
    let mut section: Option<CMapSection> = None;
    let mut i = 0usize;
    while i < toks.len() {
        match (&toks[i], section) {
            (Tok::Word(w), _) if w == "beginbfchar" => { section = Some(CMapSection::Char); i += 1; }
            (Tok::Word(w), _) if w == "beginbfrange" => { section = Some(CMapSection::Range); i += 1; }
            (Tok::Word(w), _) if w == "endbfchar" || w == "endbfrange" => { section = None; i += 1; }
            (Tok::Hex(src), Some(CMapSection::Char)) => {
                if let Some(Tok::Hex(dst)) = toks.get(i + 1) {
                    cmap.insert(src, utf16be(dst));
                    i += 2;
                } else {
                    i += 1;
                }
            }
            (Tok::Hex(lo), Some(CMapSection::Range)) => match (toks.get(i + 1), toks.get(i + 2)) {
                (Some(Tok::Hex(hi)), Some(Tok::Hex(dst))) => {
                    let (lo_code, hi_code) = (be_code(lo), be_code(hi));
                    let units: Vec<u16> = dst.chunks(2).filter(|c| c.len() == 2).map(|c| u16::from_be_bytes([c[0], c[1]])).collect();
                    for (offset, code) in (lo_code..=hi_code.min(lo_code.saturating_add(0xFFFF))).enumerate() {
                        let mut u = units.clone();
                        if let Some(last) = u.last_mut() { *last = last.wrapping_add(offset as u16); }
                        let mut src = code.to_be_bytes()[4 - lo.len().clamp(1, 4)..].to_vec();
                        src.truncate(lo.len().clamp(1, 4));
                        cmap.insert(&src, String::from_utf16_lossy(&u));
                    }
                    i += 3;
                }
                (Some(Tok::Hex(_)), Some(Tok::Open)) => {
                    let mut code = be_code(lo);
                    let mut j = i + 3;
                    while let Some(Tok::Hex(dst)) = toks.get(j) {
                        let mut src = code.to_be_bytes()[4 - lo.len().clamp(1, 4)..].to_vec();
                        src.truncate(lo.len().clamp(1, 4));
                        cmap.insert(&src, utf16be(dst));
                        code = code.saturating_add(1);
                        j += 1;
                    }
                    i = j + 1;
                }
                _ => i += 1,
            },
            _ => i += 1,
        }
    }
    cmap
}

fn tokenize(src: &str) -> Vec<Tok> {
    let mut out = Vec::new();
    let mut chars = src.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '<' => {
                let mut hex = String::new();
                for h in chars.by_ref() {
                    if h == '>' { break; }
                    if h.is_ascii_hexdigit() { hex.push(h); }
                }
                out.push(Tok::Hex(hex_bytes(&hex)));
            }
            '[' => out.push(Tok::Open),
            ']' => out.push(Tok::Close),
            '%' => {
                for h in chars.by_ref() {
                    if h == '\n' || h == '\r' { break; }
                }
            }
            c if c.is_whitespace() => {}
            c => {
                let mut word = String::from(c);
                while let Some(&n) = chars.peek() {
                    if n.is_whitespace() || matches!(n, '<' | '[' | ']') { break; }
                    word.push(n);
                    chars.next();
                }
                out.push(Tok::Word(word));
            }
        }
    }
    out
}

fn hex_bytes(hex: &str) -> Vec<u8> {
    let mut padded = hex.to_string();
    if padded.len() % 2 == 1 { padded.push('0'); }
    (0..padded.len())
        .step_by(2)
        .filter_map(|i| u8::from_str_radix(&padded[i..i + 2], 16).ok())
        .collect()
}

fn be_code(bytes: &[u8]) -> u32 {
    bytes.iter().take(4).fold(0u32, |acc, &b| (acc << 8) | b as u32)
}

// --- Geometry helpers -------------------------------------------------------

fn num(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn matrix(args: &[Object]) -> Option<Matrix> {
    if args.len() < 6 { return None; }
    let mut m = [0.0f32; 6];
    for (slot, arg) in m.iter_mut().zip(args.iter()) {
        *slot = num(arg)?;
    }
    Some(m)
}

/// Row-vector product `a × b` as used by PDF (`a` applied first).
fn mul(a: &Matrix, b: &Matrix) -> Matrix {
    [
        a[0] * b[0] + a[1] * b[2],
        a[0] * b[1] + a[1] * b[3],
        a[2] * b[0] + a[3] * b[2],
        a[2] * b[1] + a[3] * b[3],
        a[4] * b[0] + a[5] * b[2] + b[4],
        a[4] * b[1] + a[5] * b[3] + b[5],
    ]
}

fn page_height(doc: &Document, page_id: ObjectId) -> f32 {
    let mut current = doc.get_dictionary(page_id).ok();
    // MediaBox is inheritable; walk up a bounded number of parents.
    for _ in 0..16 {
        let Some(dict) = current else { break };
        if let Some(h) = dict.get(b"MediaBox").ok().and_then(|o| media_box_height(doc, o)) {
            return h;
        }
        current = dict
            .get(b"Parent")
            .and_then(Object::as_reference)
            .and_then(|id| doc.get_dictionary(id))
            .ok();
    }
    DEFAULT_PAGE_HEIGHT
}

fn media_box_height(doc: &Document, obj: &Object) -> Option<f32> {
    let obj = match obj {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let arr = obj.as_array().ok()?;
    if arr.len() < 4 { return None; }
    Some((num(&arr[3])? - num(&arr[1])?).abs())
}
