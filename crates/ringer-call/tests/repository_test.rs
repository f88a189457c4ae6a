mod test_helpers;

use chrono::Duration;
use ringer_call::{CallError, CallRepository, CallState, CallStore, NewCall};
use std::sync::Arc;
use test_helpers::{create_test_db, start_time};

async fn create_repository() -> CallRepository {
    let db = create_test_db().await.expect("Failed to create test database");
    CallRepository::new(Arc::new(db))
}

fn new_call(room: &str) -> NewCall {
    NewCall {
        caller_identity: "alice".to_string(),
        callee_identity: "bob".to_string(),
        room_name: room.to_string(),
    }
}

#[tokio::test]
async fn test_create_and_get() {
    let repo = create_repository().await;
    let at = start_time();

    repo.ensure_room("room-1", at).await.unwrap();
    repo.ensure_room("room-1", at).await.unwrap();

    let call = repo.create(new_call("room-1"), at).await.unwrap();
    assert_eq!(call.state, CallState::Ringing);

    let loaded = repo.get(&call.call_id).await.unwrap().unwrap();
    assert_eq!(loaded, call);
    assert!(repo.get("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_find_ringing_window() {
    let repo = create_repository().await;
    let at = start_time();
    repo.ensure_room("room-1", at).await.unwrap();
    let call = repo.create(new_call("room-1"), at).await.unwrap();

    let found = repo
        .find_ringing("bob", "room-1", at - Duration::seconds(30))
        .await
        .unwrap();
    assert_eq!(found.map(|c| c.call_id), Some(call.call_id.clone()));

    assert!(repo
        .find_ringing("bob", "room-1", at + Duration::seconds(1))
        .await
        .unwrap()
        .is_none());
    assert!(repo
        .find_ringing("carol", "room-1", at - Duration::seconds(30))
        .await
        .unwrap()
        .is_none());

    repo.transition(&call.call_id, CallState::Ended, at).await.unwrap();
    assert!(repo
        .find_ringing("bob", "room-1", at - Duration::seconds(30))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_transitions_are_one_directional() {
    let repo = create_repository().await;
    let at = start_time();
    repo.ensure_room("room-1", at).await.unwrap();
    let call = repo.create(new_call("room-1"), at).await.unwrap();

    let answered = repo
        .transition(&call.call_id, CallState::Answered, at + Duration::seconds(3))
        .await
        .unwrap();
    assert!(answered.applied);
    assert_eq!(answered.call.answered_at, Some(at + Duration::seconds(3)));

    let ended = repo
        .transition(&call.call_id, CallState::Ended, at + Duration::seconds(9))
        .await
        .unwrap();
    assert!(ended.applied);
    assert_eq!(ended.call.ended_at, Some(at + Duration::seconds(9)));

    let repeated = repo
        .transition(&call.call_id, CallState::Ended, at + Duration::seconds(20))
        .await
        .unwrap();
    assert!(!repeated.applied);
    assert_eq!(repeated.call.ended_at, Some(at + Duration::seconds(9)));

    for target in [CallState::Ringing, CallState::Answered] {
        let err = repo
            .transition(&call.call_id, target, at)
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::InvalidTransition { from: CallState::Ended, .. }));
    }
}

#[tokio::test]
async fn test_transition_unknown_call() {
    let repo = create_repository().await;
    let err = repo
        .transition("missing", CallState::Ended, start_time())
        .await
        .unwrap_err();
    assert!(matches!(err, CallError::NotFound(_)));
}
