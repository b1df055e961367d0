use paper_chunker::chunk_builder::{build_chunks, split_point, ChunkParams, ConfigError, SECTION_SEPARATOR};
use toc_model::{PageBlock, Section};

fn section(page: u32, texts: &[&str]) -> Section {
    let mut blocks = texts.iter().map(|t| PageBlock::new(page, *t));
    let first = blocks.next().expect("at least one block");
    let mut s = Section::new(first, None);
    s.blocks.extend(blocks);
    s
}

fn joined(sections: &[Section]) -> String {
    sections.iter().map(Section::text).collect::<Vec<_>>().join(SECTION_SEPARATOR)
}

fn sample_sections() -> Vec<Section> {
    vec![
        section(1, &["1. Introduction", "Papers are long. Readers are busy. Outlines help."]),
        section(1, &["2. Methods", "We split text at sentence ends! Does it work? It does."]),
        section(2, &["2.1 Setup", "One lamp, one ruler, and one very patient student."]),
        section(3, &["3. Results", "Everything fit. Nothing broke."]),
    ]
}

#[test]
fn rejects_invalid_parameters() {
    assert_eq!(ChunkParams::new(0, 0), Err(ConfigError::ZeroChunkSize));
    assert_eq!(ChunkParams::new(100, 51), Err(ConfigError::OverlapTooLarge { max_size: 100, overlap: 51 }));
    let ok = ChunkParams::new(100, 50).expect("half is allowed");
    assert_eq!((ok.max_size(), ok.overlap()), (100, 50));
}

#[test]
fn unique_text_round_trips_for_many_sizes() {
    let sections = sample_sections();
    let expected = joined(&sections);
    for (max_size, overlap) in [(4000, 200), (80, 0), (80, 20), (40, 10), (25, 12), (7, 3), (1, 0)] {
        let params = ChunkParams::new(max_size, overlap).expect("valid params");
        let chunks = build_chunks(&sections, &params);
        let rebuilt: String = chunks.iter().map(|c| c.unique_text()).collect();
        assert_eq!(rebuilt, expected, "round trip failed for {max_size}/{overlap}");
        for chunk in &chunks {
            assert!(chunk.size <= max_size, "chunk of {} exceeds {max_size}", chunk.size);
            assert_eq!(chunk.size, chunk.text.chars().count());
            assert!(!chunk.source_sections.is_empty());
        }
    }
}

#[test]
fn whole_document_fits_in_one_chunk() {
    let sections = sample_sections();
    let chunks = build_chunks(&sections, &ChunkParams::new(4000, 200).expect("valid"));
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].overlap, 0);
    assert_eq!(chunks[0].source_sections, vec![0, 1, 2, 3]);
    assert_eq!(chunks[0].page_range(), Some((1, 3)));
}

#[test]
fn section_edges_are_preferred_breaks() {
    let sections = vec![
        section(1, &["a".repeat(30).as_str()]),
        section(1, &["b".repeat(30).as_str()]),
        section(2, &["c".repeat(30).as_str()]),
    ];
    let chunks = build_chunks(&sections, &ChunkParams::new(70, 0).expect("valid"));
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].source_sections, vec![0, 1]);
    assert_eq!(chunks[1].source_sections, vec![2]);
    assert!(chunks[1].text.starts_with("\n\nccc"));
    assert_eq!(chunks[1].page_range(), Some((2, 2)));
}

#[test]
fn long_section_splits_at_sentence_end() {
    let sections = vec![section(1, &["Alpha beta gamma. Delta epsilon zeta. Eta theta iota."])];
    let chunks = build_chunks(&sections, &ChunkParams::new(40, 0).expect("valid"));
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].text, "Alpha beta gamma. Delta epsilon zeta.");
    assert_eq!(chunks[1].text, " Eta theta iota.");
    assert_eq!(chunks[1].source_sections, vec![0]);
}

#[test]
fn overlap_repeats_the_previous_tail() {
    let sections = sample_sections();
    let chunks = build_chunks(&sections, &ChunkParams::new(60, 10).expect("valid"));
    assert!(chunks.len() > 1);
    for pair in chunks.windows(2) {
        let prefix = &pair[1].text[..pair[1].overlap];
        assert!(pair[0].text.ends_with(prefix));
        assert!(prefix.chars().count() <= 10);
    }
    let prev_tail: String = {
        let chars: Vec<char> = chunks[0].text.chars().collect();
        chars[chars.len() - 10..].iter().collect()
    };
    assert_eq!(&chunks[1].text[..chunks[1].overlap], prev_tail);
}

#[test]
fn section_that_fits_is_kept_whole_by_shortening_the_overlap() {
    let sections = vec![section(1, &["a".repeat(80).as_str()]), section(2, &["b".repeat(90).as_str()])];
    let chunks = build_chunks(&sections, &ChunkParams::new(100, 40).expect("valid"));
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].text, "a".repeat(80));
    assert_eq!(chunks[1].size, 100);
    assert_eq!(chunks[1].text, format!("{}\n\n{}", "a".repeat(8), "b".repeat(90)));
    assert_eq!(chunks[1].unique_text(), format!("\n\n{}", "b".repeat(90)));
    assert_eq!(chunks[1].source_sections, vec![1]);
    assert_eq!(chunks[1].page_range(), Some((1, 2)));
}

#[test]
fn section_longer_than_max_size_is_still_split() {
    let sections = vec![section(1, &["a".repeat(80).as_str()]), section(2, &["b".repeat(120).as_str()])];
    let chunks = build_chunks(&sections, &ChunkParams::new(100, 40).expect("valid"));
    assert!(chunks.len() > 2);
    assert!(chunks[1..].iter().all(|c| c.source_sections == vec![1]));
    assert_eq!(chunks[1].overlap, 40);
    let rebuilt: String = chunks.iter().map(|c| c.unique_text()).collect();
    assert_eq!(rebuilt, joined(&sections));
}

#[test]
fn multibyte_text_is_cut_on_char_boundaries() {
    let sections = vec![section(1, &["é".repeat(45).as_str()]), section(2, &["ü".repeat(12).as_str()])];
    let params = ChunkParams::new(10, 2).expect("valid");
    let chunks = build_chunks(&sections, &params);
    let rebuilt: String = chunks.iter().map(|c| c.unique_text()).collect();
    assert_eq!(rebuilt, joined(&sections));
    assert!(chunks.iter().all(|c| c.size <= 10));
}

#[test]
fn empty_input_builds_no_chunks() {
    assert!(build_chunks(&[], &ChunkParams::new(100, 10).expect("valid")).is_empty());
}

#[test]
fn split_point_prefers_sentences_then_spaces() {
    assert_eq!(split_point("One two. Three four five", 15), "One two.".len());
    assert_eq!(split_point("one two three four", 10), "one two ".len());
    assert_eq!(split_point("abcdefghij", 4), 4);
    assert_eq!(split_point("  leading", 3), 3);
}
