use toc_model::Chunk;

const INSTRUCTIONS: &str = "\
Extract the hierarchical section titles of an academic paper from the excerpt below.

Rules:
- Keep the EXACT order in which the sections appear. Do not reorder or regroup them.
- Use the section number as printed (for example \"2\" or \"2.1\"). Use \"\" for unnumbered sections such as Abstract or References.
- Take each page number from the nearest preceding [Page N] marker.
- If a line looks like a person's name (for example \"David M. Blei\") and it appears multiple times, it is an author line: ignore it.
- Do not invent sections that are not in the excerpt. If there are none, answer [].

Answer with a JSON array only, no prose:
[{\"number\": \"1\", \"title\": \"Introduction\", \"page\": 1}]";

/// Prompt for one chunk of a document split into `total` chunks.
pub fn build_prompt(chunk: &Chunk, index: usize, total: usize) -> String {
    let mut prompt = String::with_capacity(INSTRUCTIONS.len() + chunk.text.len() + 128);
    prompt.push_str(INSTRUCTIONS);
    prompt.push_str("\n\n");
    if total > 1 {
        prompt.push_str(&format!(
            "This is part {} of {} of the paper. The first characters may repeat the end of the previous part.\n\n",
            index + 1,
            total
        ));
    }
    prompt.push_str("Excerpt:\n");
    prompt.push_str(&annotate_pages(chunk));
    prompt.push_str("\n\nSections (JSON):");
    prompt
}

/// Chunk text with a `[Page N]` line inserted wherever the source page changes.
pub fn annotate_pages(chunk: &Chunk) -> String {
    let mut marks: Vec<(usize, u32)> = chunk
        .page_marks
        .iter()
        .copied()
        .filter(|(offset, _)| *offset <= chunk.text.len() && chunk.text.is_char_boundary(*offset))
        .collect();
    marks.sort_by_key(|m| m.0);

    let mut out = String::with_capacity(chunk.text.len() + marks.len() * 12);
    let mut cursor = 0;
    let mut current: Option<u32> = None;
    for (offset, page) in marks {
        if current == Some(page) {
            continue;
        }
        out.push_str(&chunk.text[cursor..offset]);
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&format!("[Page {page}]\n"));
        cursor = offset;
        current = Some(page);
    }
    out.push_str(&chunk.text[cursor..]);
    out
}
