//! Persistence tests for the interaction history: export/import round
//! trips, atomic replacement, and startup restore.

use relay_engine::memory::MemoryContextManager;
use tempfile::TempDir;

fn model(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_export_import_preserves_content_and_order() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("interactions.json");

    let memory = MemoryContextManager::new(100);
    for i in 0..20 {
        memory.store_interaction(
            &format!("prompt {i}"),
            &format!("response {i}"),
            &model(&["alpha", "beta"]),
        );
    }

    assert_eq!(memory.export_interactions(&path).await.unwrap(), 20);

    let restored = MemoryContextManager::new(100);
    assert_eq!(restored.import_interactions(&path).await.unwrap(), 20);

    let original = memory.recent(100);
    let round_tripped = restored.recent(100);
    assert_eq!(original, round_tripped);

    // Per-model rings were rebuilt with the same ordering
    assert_eq!(
        memory.recent_for_model("alpha", 100),
        restored.recent_for_model("alpha", 100)
    );
}

#[tokio::test]
async fn test_export_file_is_valid_json_with_iso_timestamps() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("interactions.json");

    let memory = MemoryContextManager::new(100);
    memory.store_interaction("p", "r", &model(&["m"]));
    memory.export_interactions(&path).await.unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
    let timestamp = parsed[0]["timestamp"].as_str().unwrap();

    // RFC 3339 / ISO-8601 shape: date, T separator, offset
    assert!(timestamp.contains('T'));
    assert!(timestamp.starts_with("20"));

    // No leftover temp file
    assert!(!temp_dir.path().join("interactions.json.tmp").exists());
}

#[tokio::test]
async fn test_export_overwrites_atomically() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("interactions.json");

    let memory = MemoryContextManager::new(100);
    memory.store_interaction("first", "r", &model(&["m"]));
    memory.export_interactions(&path).await.unwrap();

    memory.store_interaction("second", "r", &model(&["m"]));
    memory.export_interactions(&path).await.unwrap();

    let restored = MemoryContextManager::new(100);
    assert_eq!(restored.import_interactions(&path).await.unwrap(), 2);
    assert_eq!(restored.recent(1)[0].prompt, "second");
}

#[tokio::test]
async fn test_import_clamps_to_capacity() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("interactions.json");

    let big = MemoryContextManager::new(100);
    for i in 0..50 {
        big.store_interaction(&format!("p{i}"), "r", &model(&["m"]));
    }
    big.export_interactions(&path).await.unwrap();

    let small = MemoryContextManager::new(10);
    assert_eq!(small.import_interactions(&path).await.unwrap(), 10);
    assert_eq!(small.len(), 10);
    // The newest entries survive the clamp
    assert_eq!(small.recent(1)[0].prompt, "p49");
}

#[tokio::test]
async fn test_store_persists_in_background() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("interactions.json");

    let memory = MemoryContextManager::new(100).with_persistence(path.clone());
    memory.store_interaction("will survive", "yes", &model(&["m"]));

    for _ in 0..100 {
        if path.exists() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    let reborn = MemoryContextManager::new(100).with_persistence(path);
    assert_eq!(reborn.load_persisted().await.unwrap(), 1);
    assert_eq!(reborn.recent(1)[0].prompt, "will survive");
}
