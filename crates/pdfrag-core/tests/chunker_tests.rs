use pdfrag_core::chunker::{chunk_document, chunk_text, ChunkingConfig};
use pdfrag_core::Error;

#[test]
fn empty_text_yields_no_windows() {
    let chunks = chunk_text("", 500, 0).expect("chunk");
    assert!(chunks.is_empty());
}

#[test]
fn text_shorter_than_window_is_one_chunk() {
    let chunks = chunk_text("abc", 10, 0).expect("chunk");
    assert_eq!(chunks, vec!["abc".to_string()]);
}

#[test]
fn overlapping_windows_step_by_size_minus_overlap() {
    let chunks = chunk_text("abcdefgh", 4, 2).expect("chunk");
    assert_eq!(chunks, vec!["abcd", "cdef", "efgh", "gh"]);
}

#[test]
fn non_overlapping_windows_cover_text_exactly() {
    let text = "The sky is blue. Grass is green.";
    let chunks = chunk_text(text, 16, 0).expect("chunk");
    assert_eq!(chunks, vec!["The sky is blue.", " Grass is green."]);
    assert_eq!(chunks.concat(), text);
}

#[test]
fn overlap_removal_reconstructs_original_text() {
    let text = "the quick brown fox jumps over the lazy dog and keeps going";
    let (size, overlap) = (12usize, 5usize);
    let step = size - overlap;
    let chunks = chunk_text(text, size, overlap).expect("chunk");

    // Take the first `step` chars of every window, then whatever the last
    // window still adds beyond that.
    let mut rebuilt = String::new();
    for (i, c) in chunks.iter().enumerate() {
        if i + 1 < chunks.len() {
            rebuilt.extend(c.chars().take(step));
        } else {
            rebuilt.push_str(c);
        }
    }
    assert_eq!(rebuilt, text);
}

#[test]
fn same_input_same_output() {
    let text = "determinism matters for repeat ingestion of the same file";
    let a = chunk_text(text, 7, 3).expect("chunk");
    let b = chunk_text(text, 7, 3).expect("chunk");
    assert_eq!(a, b);
}

#[test]
fn overlap_equal_to_size_is_rejected() {
    let err = chunk_text("abcdef", 4, 4).unwrap_err();
    assert!(matches!(err, Error::InvalidConfiguration(_)), "got {err}");
}

#[test]
fn overlap_larger_than_size_is_rejected() {
    assert!(matches!(
        chunk_text("abcdef", 4, 9),
        Err(Error::InvalidConfiguration(_))
    ));
}

#[test]
fn zero_chunk_size_is_rejected() {
    assert!(matches!(
        chunk_text("abcdef", 0, 0),
        Err(Error::InvalidConfiguration(_))
    ));
}

#[test]
fn multibyte_text_never_splits_a_character() {
    // 12 chars, 30 bytes; byte-based slicing would panic mid-sequence.
    let text = "日本語のテキストを分割する";
    let chunks = chunk_text(text, 5, 2).expect("chunk");
    assert!(chunks.len() > 1);
    let rebuilt: String = chunks
        .iter()
        .enumerate()
        .flat_map(|(i, c)| {
            if i + 1 < chunks.len() {
                c.chars().take(3).collect::<Vec<_>>()
            } else {
                c.chars().collect()
            }
        })
        .collect();
    assert_eq!(rebuilt, text);
}

#[test]
fn document_chunks_carry_positions_and_offsets() {
    let cfg = ChunkingConfig { chunk_size: 4, chunk_overlap: 2 };
    let chunks = chunk_document("doc", "abcdefgh", &cfg).expect("chunk");
    assert_eq!(chunks.len(), 4);
    assert_eq!(chunks[0].total_chunks, 4);
    let offsets: Vec<usize> = chunks.iter().map(|c| c.start_offset).collect();
    assert_eq!(offsets, vec![0, 2, 4, 6]);
    for (i, c) in chunks.iter().enumerate() {
        assert_eq!(c.chunk_index, i);
        assert_eq!(c.doc_id, "doc");
    }
}
