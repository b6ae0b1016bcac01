//! Wire-contract tests against the real tool server binary.
//!
//! Every `invoke` spawns a fresh server process, so these also prove that
//! indexed state survives between invocations through the snapshot file.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use pdfrag_core::Error;
use pdfrag_tool::{ContentItem, ServerSpec, ToolChannel};

fn channel_for(snapshot: &Path) -> ToolChannel {
    let mut spec = ServerSpec::new(env!("CARGO_BIN_EXE_pdfrag-toolserver"));
    spec.env = HashMap::from([
        ("APP_USE_FAKE_EMBEDDINGS".to_string(), "1".to_string()),
        ("APP_USE_FAKE_LLM".to_string(), "1".to_string()),
        (
            "APP_SNAPSHOT_PATH".to_string(),
            snapshot.to_string_lossy().to_string(),
        ),
    ]);
    ToolChannel::new(spec, Duration::from_secs(30)).expect("channel")
}

fn texts(items: Vec<ContentItem>) -> Vec<String> {
    items.into_iter().map(ContentItem::into_text).collect()
}

#[test]
fn lists_the_six_contract_tools() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let channel = channel_for(&tmp.path().join("store.json"));
    let tools = channel.list_tools().expect("list_tools");
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    for expected in [
        "answer_question",
        "chunk_text",
        "embed_chunks",
        "extract_pdf_contents",
        "search_embeddings",
        "summarize_text",
    ] {
        assert!(names.contains(&expected), "missing tool {expected} in {names:?}");
    }
}

#[test]
fn chunk_text_windows_match_the_stride_math() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let channel = channel_for(&tmp.path().join("store.json"));
    let items = channel
        .invoke(
            "chunk_text",
            serde_json::json!({"text": "abcdefgh", "chunk_size": 4, "chunk_overlap": 2}),
        )
        .expect("chunk_text");
    assert_eq!(texts(items), vec!["abcd", "cdef", "efgh", "gh"]);
}

#[test]
fn chunk_text_rejects_bad_overlap() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let channel = channel_for(&tmp.path().join("store.json"));
    let err = channel
        .invoke(
            "chunk_text",
            serde_json::json!({"text": "abcdefgh", "chunk_size": 4, "chunk_overlap": 4}),
        )
        .unwrap_err();
    assert!(matches!(err, Error::ToolInvocation(_)), "got {err}");
    assert!(err.to_string().contains("chunk_overlap"), "got {err}");
}

#[test]
fn embed_chunks_returns_one_json_vector_per_chunk() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let channel = channel_for(&tmp.path().join("store.json"));
    let items = channel
        .invoke(
            "embed_chunks",
            serde_json::json!({"text_chunks": ["hello world", "goodbye world"]}),
        )
        .expect("embed_chunks");
    let vectors: Vec<Vec<f32>> = texts(items)
        .iter()
        .map(|t| serde_json::from_str(t).expect("vector json"))
        .collect();
    assert_eq!(vectors.len(), 2);
    assert_eq!(vectors[0].len(), 1536);
    assert_ne!(vectors[0], vectors[1]);
}

#[test]
fn index_then_search_across_separate_invocations() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let snapshot = tmp.path().join("store.json");
    let channel = channel_for(&snapshot);

    // The alternate 'chunks' spelling plus doc_id indexes instead of
    // returning vectors.
    let items = channel
        .invoke(
            "embed_chunks",
            serde_json::json!({
                "chunks": ["The sky is blue.", "Grass is green."],
                "doc_id": "facts"
            }),
        )
        .expect("embed+index");
    assert_eq!(texts(items), vec!["Indexed 2 chunks for doc_id 'facts'"]);
    assert!(snapshot.is_file(), "snapshot written");

    // Fresh process: query with the stored text's own embedding, which must
    // rank that chunk first with similarity ~1.
    let query = channel
        .invoke(
            "embed_chunks",
            serde_json::json!({"text_chunks": ["The sky is blue."]}),
        )
        .expect("embed query");
    let query_vec: Vec<f32> = serde_json::from_str(&texts(query)[0]).expect("vector json");

    let hits = channel
        .invoke(
            "search_embeddings",
            serde_json::json!({"doc_id": "facts", "query_embedding": query_vec, "top_k": 1}),
        )
        .expect("search");
    assert_eq!(texts(hits), vec!["The sky is blue."]);
}

#[test]
fn search_unknown_doc_returns_no_content_items() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let channel = channel_for(&tmp.path().join("store.json"));
    let hits = channel
        .invoke(
            "search_embeddings",
            serde_json::json!({"doc_id": "ghost", "query_embedding": [0.1, 0.2], "top_k": 3}),
        )
        .expect("search");
    assert!(hits.is_empty());
}

#[test]
fn answer_question_uses_supplied_context_verbatim() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let channel = channel_for(&tmp.path().join("store.json"));
    // The fake completer echoes the context it was grounded on.
    let items = channel
        .invoke(
            "answer_question",
            serde_json::json!({"question": "Does context win?", "context": "injected context"}),
        )
        .expect("answer_question");
    assert_eq!(texts(items), vec!["injected context"]);
}

#[test]
fn answer_question_retrieves_from_the_indexed_document() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let snapshot = tmp.path().join("store.json");
    let channel = channel_for(&snapshot);

    channel
        .invoke(
            "embed_chunks",
            serde_json::json!({
                "text_chunks": ["The sky is blue.", "Grass is green."],
                "doc_id": "facts"
            }),
        )
        .expect("embed+index");

    // The question text embeds to exactly the first chunk's vector, so the
    // echoed answer is that chunk.
    let items = channel
        .invoke(
            "answer_question",
            serde_json::json!({"question": "The sky is blue.", "doc_id": "facts", "top_k": 1}),
        )
        .expect("answer_question");
    assert_eq!(texts(items), vec!["The sky is blue."]);
}

#[test]
fn answer_question_without_context_or_doc_id_fails() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let channel = channel_for(&tmp.path().join("store.json"));
    let err = channel
        .invoke("answer_question", serde_json::json!({"question": "hello?"}))
        .unwrap_err();
    assert!(err.to_string().contains("doc_id"), "got {err}");
}

#[test]
fn summarize_text_round_trips() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let channel = channel_for(&tmp.path().join("store.json"));
    let items = channel
        .invoke("summarize_text", serde_json::json!({"text": "abcde"}))
        .expect("summarize_text");
    assert_eq!(texts(items), vec!["Summary (5 chars)"]);
}

#[test]
fn unknown_tool_is_rejected() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let channel = channel_for(&tmp.path().join("store.json"));
    let err = channel
        .invoke("read_minds", serde_json::json!({}))
        .unwrap_err();
    assert!(matches!(err, Error::ToolInvocation(_)));
    assert!(err.to_string().contains("Unknown tool"), "got {err}");
}

#[test]
fn type_mismatched_argument_is_rejected_before_execution() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let channel = channel_for(&tmp.path().join("store.json"));
    let err = channel
        .invoke("chunk_text", serde_json::json!({"text": 42}))
        .unwrap_err();
    assert!(matches!(err, Error::ToolInvocation(_)));
    assert!(err.to_string().contains("must be of type string"), "got {err}");
}
