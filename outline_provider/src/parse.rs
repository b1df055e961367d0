use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use toc_model::OutlineEntry;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unparsable model response: {0}")]
    Unparsable(String),
}

static FENCED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)```").expect("valid fence pattern"));

/// "- 2.1 Setup (Page 2)", "## 3. Results ..... 5", "1 Introduction (p. 1)"
static OUTLINE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:[-*+]\s+)?(?:#{1,6}\s+)?(?:\*\*)?(\d+(?:\.\d+)*)\.?\s+(.+?)\s*$").expect("valid line pattern")
});

static PAGE_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*(?:\(\s*(?:pages?|pp?\.?)\s*(\d+)\s*\)|(?:\.{2,}|…+|\s-\s|\s)\s*(\d+))\s*$")
        .expect("valid page pattern")
});

/// Turn a model answer into outline entries.
///
/// Accepts a JSON array, an object with an `entries` array, either one inside a
/// fenced code block, or plain outline lines carrying a page number. Entries
/// without a title or page are skipped.
pub fn parse_response(text: &str) -> Result<Vec<OutlineEntry>, ParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Unparsable("empty response".into()));
    }

    for candidate in json_candidates(trimmed) {
        if let Some(items) = serde_json::from_str::<Value>(candidate).ok().and_then(entry_array) {
            return Ok(items.iter().filter_map(entry_from_value).collect());
        }
    }

    let entries: Vec<OutlineEntry> = trimmed.lines().filter_map(entry_from_line).collect();
    if entries.is_empty() {
        let preview: String = trimmed.chars().take(80).collect();
        return Err(ParseError::Unparsable(preview));
    }
    Ok(entries)
}

fn json_candidates(text: &str) -> Vec<&str> {
    let mut out: Vec<&str> = FENCED
        .captures_iter(text)
        .filter_map(|c| c.get(1).map(|m| m.as_str().trim()))
        .collect();
    out.push(text);
    for (open, close) in [('[', ']'), ('{', '}')] {
        if let (Some(start), Some(end)) = (text.find(open), text.rfind(close)) {
            if start < end {
                out.push(&text[start..=end]);
            }
        }
    }
    out
}

fn entry_array(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => ["entries", "sections", "toc"]
            .iter()
            .find_map(|k| match map.remove(*k) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            }),
        _ => None,
    }
}

fn entry_from_value(value: &Value) -> Option<OutlineEntry> {
    let title = value.get("title")?.as_str()?.trim();
    if title.is_empty() {
        return None;
    }
    let page = match value.get("page")? {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f as u64))?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    let number = match value.get("number") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    Some(OutlineEntry::new(number, title, u32::try_from(page).ok()?))
}

fn entry_from_line(line: &str) -> Option<OutlineEntry> {
    let caps = OUTLINE_LINE.captures(line)?;
    let number = caps.get(1)?.as_str();
    let rest = caps.get(2)?.as_str();
    let suffix = PAGE_SUFFIX.captures(rest)?;
    let page: u32 = suffix.get(1).or_else(|| suffix.get(2))?.as_str().parse().ok()?;
    let title = rest[..suffix.get(0)?.start()].trim().trim_matches('*').trim().trim_end_matches([':', '.']);
    if title.is_empty() {
        return None;
    }
    Some(OutlineEntry::new(number, title, page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_forms() {
        let e = entry_from_line("- 2.1 Setup (Page 2)").expect("parsed");
        assert_eq!((e.number.as_str(), e.title.as_str(), e.page, e.depth), ("2.1", "Setup", 2, 2));
        let e = entry_from_line("## 3. Results ..... 5").expect("parsed");
        assert_eq!((e.number.as_str(), e.title.as_str(), e.page), ("3", "Results", 5));
        let e = entry_from_line("**1 Introduction** (p. 1)").expect("parsed");
        assert_eq!((e.number.as_str(), e.title.as_str(), e.page), ("1", "Introduction", 1));
        assert!(entry_from_line("Table of Contents").is_none());
        assert!(entry_from_line("2.1 Setup").is_none());
    }
}
