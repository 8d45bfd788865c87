//! Tests for recursive chunking.

use proptest::prelude::*;
use sage_rag::chunking::{Chunker, RecursiveChunker};
use sage_rag::document::{Document, META_CHUNK_INDEX, META_SOURCE, META_START_INDEX};

fn texts(chunker: &RecursiveChunker, text: &str) -> Vec<String> {
    chunker.chunk(&Document::new("doc", text)).into_iter().map(|c| c.text).collect()
}

/// Text drawn from a small alphabet so that every separator shows up often.
fn arb_text() -> impl Strategy<Value = String> {
    "[ab é\n]{0,300}"
}

fn arb_sizes() -> impl Strategy<Value = (usize, usize)> {
    (1usize..60).prop_flat_map(|size| (Just(size), 0..size))
}

/// Chunks are trimmed slices of the document that, placed at their
/// `start_index`, cover every character except whitespace.
mod prop_chunk_reconstruction {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn chunks_stitch_back_to_the_document(
            text in arb_text(),
            (size, overlap) in arb_sizes(),
        ) {
            let chunker = RecursiveChunker::new(size, overlap);
            let chars: Vec<char> = text.chars().collect();
            let chunks = chunker.chunk(&Document::new("doc", text.clone()));

            let mut covered = vec![false; chars.len()];
            let mut previous_start = 0;
            for (i, chunk) in chunks.iter().enumerate() {
                prop_assert_eq!(&chunk.id, &format!("doc_{i}"));
                prop_assert_eq!(&chunk.metadata[META_CHUNK_INDEX], &i.to_string());

                let start: usize = chunk.metadata[META_START_INDEX].parse().unwrap();
                let len = chunk.text.chars().count();
                prop_assert!(!chunk.text.trim().is_empty(), "whitespace-only chunk {:?}", chunk.text);
                prop_assert_eq!(chunk.text.trim(), chunk.text.as_str());
                prop_assert!(len <= size, "chunk of {} chars exceeds {}", len, size);
                prop_assert!(start >= previous_start);
                let expected: String = chars[start..start + len].iter().collect();
                prop_assert_eq!(&chunk.text, &expected);

                for flag in &mut covered[start..start + len] {
                    *flag = true;
                }
                previous_start = start;
            }

            for (ch, flag) in chars.iter().zip(&covered) {
                prop_assert!(*flag || ch.is_whitespace(), "uncovered character {:?}", ch);
            }
        }

        #[test]
        fn span_gaps_hold_only_separators(
            text in arb_text(),
            (size, overlap) in arb_sizes(),
        ) {
            let spans = RecursiveChunker::new(size, overlap).split_spans(&text);
            let mut cursor = 0;
            for span in &spans {
                prop_assert!(text.is_char_boundary(span.start));
                prop_assert!(text.is_char_boundary(span.end));
                if span.start > cursor {
                    let gap = &text[cursor..span.start];
                    prop_assert!(gap.chars().all(char::is_whitespace), "gap {:?}", gap);
                }
                prop_assert!(span.end > cursor, "span {:?} adds nothing", span);
                cursor = span.end;
            }
            prop_assert!(text[cursor..].chars().all(char::is_whitespace));
        }

        #[test]
        fn short_text_is_a_single_chunk(
            text in "[a-z .\n]{1,40}",
            overlap in 0usize..10,
        ) {
            let chunker = RecursiveChunker::new(40, overlap);
            let trimmed = text.trim();
            if trimmed.is_empty() {
                prop_assert!(texts(&chunker, &text).is_empty());
            } else {
                prop_assert_eq!(texts(&chunker, &text), vec![trimmed.to_string()]);
            }
        }
    }
}

#[test]
fn empty_text_has_no_chunks() {
    assert!(texts(&RecursiveChunker::new(10, 2), "").is_empty());
}

#[test]
fn paragraphs_split_without_overlap() {
    let chunker = RecursiveChunker::new(4, 0);
    assert_eq!(texts(&chunker, "AAAA\n\nBBBB"), ["AAAA", "BBBB"]);
}

#[test]
fn whitespace_between_paragraphs_is_not_a_chunk() {
    let chunker = RecursiveChunker::new(4, 0);
    assert_eq!(texts(&chunker, "AAAA\n\n \n\nBBBB"), ["AAAA", "BBBB"]);
    assert!(texts(&chunker, " \n\n\t\n ").is_empty());
}

#[test]
fn chunks_are_trimmed_and_offsets_follow() {
    let chunker = RecursiveChunker::new(8, 0);
    let chunks = chunker.chunk(&Document::new("doc", "  GL close\n\n   AP hold  "));
    let found: Vec<(&str, &str)> = chunks
        .iter()
        .map(|c| (c.text.as_str(), c.metadata[META_START_INDEX].as_str()))
        .collect();
    assert_eq!(found, [("GL close", "2"), ("AP hold", "15")]);
}

#[test]
fn overlap_carries_trailing_words() {
    let chunker = RecursiveChunker::new(10, 4);
    assert_eq!(
        texts(&chunker, "one two three four five"),
        ["one two", "two three", "four five"]
    );
}

#[test]
fn oversized_token_is_kept_whole() {
    let chunker = RecursiveChunker::new(5, 0).with_separators(["\n\n", "\n", " "]);
    assert_eq!(texts(&chunker, "tiny ABCDEFGHIJ tail"), ["tiny", "ABCDEFGHIJ", "tail"]);
}

#[test]
fn sizes_count_characters_not_bytes() {
    let chunker = RecursiveChunker::new(4, 1);
    assert_eq!(texts(&chunker, "ääää ööö"), ["ääää", "ööö"]);

    let chunker = RecursiveChunker::new(3, 1);
    assert_eq!(texts(&chunker, "日本語のテキスト"), ["日本語", "語のテ", "テキス", "スト"]);
}

#[test]
fn chunks_inherit_document_metadata() {
    let document = Document::new("ap_setup.pdf#page=2", "Payables Options\n\nInvoice Tolerances")
        .with_metadata(META_SOURCE, "data/ap_setup.pdf");
    let chunks = RecursiveChunker::new(20, 0).chunk(&document);

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[1].id, "ap_setup.pdf#page=2_1");
    assert_eq!(chunks[1].document_id, "ap_setup.pdf#page=2");
    assert_eq!(chunks[1].metadata[META_SOURCE], "data/ap_setup.pdf");
    assert_eq!(chunks[1].metadata[META_START_INDEX], "18");
    assert!(chunks.iter().all(|c| c.embedding.is_empty()));
}

#[test]
fn chunking_is_deterministic() {
    let chunker = RecursiveChunker::new(12, 3);
    let document = Document::new("gl.txt", "Open the period.\nPost journals.\n\nClose the period.");
    assert_eq!(chunker.chunk(&document), chunker.chunk(&document));
}

#[test]
fn invalid_sizes_are_rejected() {
    assert!(RecursiveChunker::try_new(0, 0).is_err());
    assert!(RecursiveChunker::try_new(10, 10).is_err());
    let chunker = RecursiveChunker::try_new(10, 9).unwrap();
    assert_eq!((chunker.chunk_size(), chunker.chunk_overlap()), (10, 9));
}
