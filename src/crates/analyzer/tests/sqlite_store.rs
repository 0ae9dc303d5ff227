//! SQLite checkpoint store behaviour

use std::sync::Arc;

use run_checkpoint::{CheckpointError, CheckpointStore, RunCheckpoint};
use sop_analyzer::db::{DatabaseConnection, SqliteCheckpointStore};
use sop_analyzer::execution::{AnalysisRequest, ResumeCoordinator, StreamEmitter};

mod common;
use common::{drain, fast_config, strings, ScriptedScorer};

async fn store() -> SqliteCheckpointStore {
    let db = DatabaseConnection::in_memory().await.unwrap();
    SqliteCheckpointStore::new(db)
}

#[tokio::test]
async fn test_save_inserts_then_updates_in_place() {
    let store = store().await;

    let created = store
        .save(RunCheckpoint::new("run-1", "user-1", "First name", "[]"))
        .await
        .unwrap();
    assert_eq!(created.name, "First name");
    assert!(!created.is_complete);
    assert!(created.last_processed_index.is_none());

    let updated = store
        .save(
            RunCheckpoint::new("run-1", "user-1", "Ignored on update", r#"[{"sop":"S1","analyses":[]}]"#)
                .with_last_processed_index(Some(r#"{"sopIndex":0,"transcriptIndex":0}"#.to_string()))
                .with_complete(true),
        )
        .await
        .unwrap();

    assert_eq!(updated.id, "run-1");
    assert_eq!(updated.name, "First name");
    assert_eq!(updated.results, r#"[{"sop":"S1","analyses":[]}]"#);
    assert!(updated.is_complete);
    assert_eq!(
        updated.last_processed_index.as_deref(),
        Some(r#"{"sopIndex":0,"transcriptIndex":0}"#)
    );
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at >= created.updated_at);

    assert_eq!(store.list("user-1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_save_rejects_another_owner_and_leaves_row_alone() {
    let store = store().await;
    store
        .save(RunCheckpoint::new("run-1", "user-1", "Mine", "[]"))
        .await
        .unwrap();

    let err = store
        .save(RunCheckpoint::new("run-1", "user-2", "Theirs", r#"[{"sop":"X","analyses":[]}]"#))
        .await
        .unwrap_err();
    assert!(err.is_owner_mismatch());

    let record = store.get("run-1").await.unwrap().unwrap();
    assert_eq!(record.user_id, "user-1");
    assert_eq!(record.results, "[]");
}

#[tokio::test]
async fn test_save_rejects_blank_owner() {
    let store = store().await;
    let err = store
        .save(RunCheckpoint::new("run-1", " ", "Nobody", "[]"))
        .await
        .unwrap_err();
    assert!(matches!(err, CheckpointError::Invalid(_)));
}

#[tokio::test]
async fn test_list_is_scoped_and_newest_first() {
    let store = store().await;
    for id in ["a", "b", "c"] {
        store
            .save(RunCheckpoint::new(id, "user-1", id, "[]"))
            .await
            .unwrap();
    }
    store
        .save(RunCheckpoint::new("z", "user-2", "z", "[]"))
        .await
        .unwrap();

    let ids: Vec<String> = store
        .list("user-1")
        .await
        .unwrap()
        .into_iter()
        .map(|record| record.id)
        .collect();
    assert_eq!(ids, vec!["c", "b", "a"]);
    assert_eq!(store.list("user-2").await.unwrap().len(), 1);
    assert!(store.list("user-3").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rename_status_and_delete_require_owner() {
    let store = store().await;
    store
        .save(RunCheckpoint::new("run-1", "user-1", "Old", "[]"))
        .await
        .unwrap();

    assert!(store.rename("run-1", "user-2", "Hijack").await.unwrap().is_none());
    let renamed = store.rename("run-1", "user-1", "New").await.unwrap().unwrap();
    assert_eq!(renamed.name, "New");

    assert!(store.set_complete("run-1", "user-2", true).await.unwrap().is_none());
    let flagged = store.set_complete("run-1", "user-1", true).await.unwrap().unwrap();
    assert!(flagged.is_complete);

    assert!(!store.delete("run-1", "user-2").await.unwrap());
    assert!(store.delete("run-1", "user-1").await.unwrap());
    assert!(store.get("run-1").await.unwrap().is_none());
    assert!(!store.delete("run-1", "user-1").await.unwrap());
}

#[tokio::test]
async fn test_pipeline_checkpoints_through_sqlite() {
    let store = Arc::new(store().await);
    let scorer = Arc::new(ScriptedScorer::new(3).fail_on("S1", "T2"));
    let coordinator = ResumeCoordinator::new(scorer.clone(), store.clone(), fast_config());

    let sops = strings(&["S1"]);
    let transcripts = strings(&["T1", "T2"]);

    let (emitter, receiver) = StreamEmitter::channel(64);
    let outcome = coordinator
        .run(AnalysisRequest::new(sops.clone(), transcripts.clone()), "user-1", &emitter)
        .await
        .unwrap();
    drop(emitter);
    drain(receiver).await;
    let history_id = outcome.history_id().unwrap().to_string();

    scorer.heal();
    let (emitter, receiver) = StreamEmitter::channel(64);
    let request = AnalysisRequest::new(sops, transcripts).with_history_id(history_id.clone());
    let outcome = coordinator.run(request, "user-1", &emitter).await.unwrap();
    drop(emitter);
    drain(receiver).await;

    assert!(outcome.is_completed());
    let record = store.get(&history_id).await.unwrap().unwrap();
    assert!(record.is_complete);
    assert_eq!(
        record.last_processed_index.as_deref(),
        Some(r#"{"sopIndex":0,"transcriptIndex":1}"#)
    );
}
