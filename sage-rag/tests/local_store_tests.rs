//! Tests for the on-disk vector store.

use std::collections::HashMap;

use sage_rag::{Chunk, LocalVectorStore, VectorStore};

fn chunk(id: &str, embedding: Vec<f32>) -> Chunk {
    Chunk {
        id: id.to_string(),
        text: format!("text of {id}"),
        embedding,
        metadata: HashMap::from([("source".to_string(), "ar_receipts.pdf".to_string())]),
        document_id: "ar_receipts.pdf#page=1".to_string(),
    }
}

#[tokio::test]
async fn collections_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();

    {
        let store = LocalVectorStore::open(dir.path()).await.unwrap();
        store.create_collection("oracle_knowledge_base", 2).await.unwrap();
        store
            .upsert(
                "oracle_knowledge_base",
                &[chunk("a", vec![1.0, 0.0]), chunk("b", vec![0.0, 1.0])],
            )
            .await
            .unwrap();
    }

    let store = LocalVectorStore::open(dir.path()).await.unwrap();
    assert!(store.collection_exists("oracle_knowledge_base").await.unwrap());
    assert_eq!(store.list_collections().await.unwrap(), ["oracle_knowledge_base"]);

    let results = store.search("oracle_knowledge_base", &[1.0, 0.1], 1).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chunk.id, "a");
    assert_eq!(results[0].chunk.metadata["source"], "ar_receipts.pdf");
    assert_eq!(results[0].chunk.document_id, "ar_receipts.pdf#page=1");
}

#[tokio::test]
async fn collection_file_is_written_atomically() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalVectorStore::open(dir.path()).await.unwrap();
    store.create_collection("kb", 2).await.unwrap();
    store.upsert("kb", &[chunk("a", vec![1.0, 0.0])]).await.unwrap();

    assert!(dir.path().join("kb.json").is_file());
    assert!(!dir.path().join("kb.json.tmp").exists());

    let raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(dir.path().join("kb.json")).unwrap()).unwrap();
    assert_eq!(raw["dimensions"], 2);
    assert_eq!(raw["records"]["a"]["text"], "text of a");
}

#[tokio::test]
async fn upsert_delete_and_drop() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalVectorStore::open(dir.path().join("nested")).await.unwrap();
    assert!(store.root().is_dir());

    assert!(store.upsert("kb", &[chunk("a", vec![1.0])]).await.is_err());

    store.create_collection("kb", 1).await.unwrap();
    store.upsert("kb", &[chunk("a", vec![1.0]), chunk("b", vec![1.0])]).await.unwrap();
    store.upsert("kb", &[chunk("a", vec![1.0])]).await.unwrap();
    assert_eq!(store.search("kb", &[1.0], 10).await.unwrap().len(), 2);

    store.delete("kb", &["b"]).await.unwrap();
    assert_eq!(store.search("kb", &[1.0], 10).await.unwrap().len(), 1);

    store.delete_collection("kb").await.unwrap();
    store.delete_collection("kb").await.unwrap();
    assert!(!store.collection_exists("kb").await.unwrap());
    assert!(store.list_collections().await.unwrap().is_empty());
}

#[tokio::test]
async fn rejects_path_like_collection_names() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalVectorStore::open(dir.path()).await.unwrap();
    assert!(store.create_collection("../escape", 2).await.is_err());
    assert!(store.create_collection(".hidden", 2).await.is_err());
    assert!(store.create_collection("", 2).await.is_err());
}

#[tokio::test]
async fn failed_write_leaves_the_collection_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalVectorStore::open(dir.path()).await.unwrap();
    store.create_collection("kb", 2).await.unwrap();
    store.upsert("kb", &[chunk("a", vec![1.0, 0.0])]).await.unwrap();

    // A directory in the temp file's place makes every write fail.
    let blocker = dir.path().join("kb.json.tmp");
    std::fs::create_dir(&blocker).unwrap();

    assert!(store.upsert("kb", &[chunk("b", vec![0.0, 1.0])]).await.is_err());
    assert!(store.delete("kb", &["a"]).await.is_err());
    let ids: Vec<String> =
        store.search("kb", &[1.0, 1.0], 10).await.unwrap().into_iter().map(|r| r.chunk.id).collect();
    assert_eq!(ids, ["a"]);

    std::fs::remove_dir(&blocker).unwrap();
    let reopened = LocalVectorStore::open(dir.path()).await.unwrap();
    let ids: Vec<String> = reopened
        .search("kb", &[1.0, 1.0], 10)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.chunk.id)
        .collect();
    assert_eq!(ids, ["a"]);
}

#[tokio::test]
async fn chunk_ids_are_listed_by_source() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalVectorStore::open(dir.path()).await.unwrap();
    assert!(store.source_chunk_ids("kb", "ar_receipts.pdf").await.is_err());

    store.create_collection("kb", 1).await.unwrap();
    let mut other = chunk("c", vec![1.0]);
    other.metadata.insert("source".to_string(), "gl_close.txt".to_string());
    store.upsert("kb", &[chunk("a", vec![1.0]), chunk("b", vec![1.0]), other]).await.unwrap();

    let mut ids = store.source_chunk_ids("kb", "ar_receipts.pdf").await.unwrap();
    ids.sort();
    assert_eq!(ids, ["a", "b"]);
    assert_eq!(store.source_chunk_ids("kb", "gl_close.txt").await.unwrap(), ["c"]);
    assert!(store.source_chunk_ids("kb", "missing.txt").await.unwrap().is_empty());
}
