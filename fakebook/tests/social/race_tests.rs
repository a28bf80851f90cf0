use super::support::*;
use chrono::Utc;
use fakebook::repository::{patch, timestamp};
use serde_json::Value;

fn relationship(id: &str, requester: &str, recipient: &str, status: RelationshipStatus) -> Relationship {
    let now = Utc::now();
    Relationship {
        id: id.to_string(),
        requester: requester.to_string(),
        recipient: recipient.to_string(),
        status,
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn store_refuses_a_second_active_row_for_a_pair() {
    let store = MemoryStore::new();
    let rows = Repo::<_, Relationship>::new(&store);
    rows.insert(&relationship("r1", "a", "b", RelationshipStatus::Pending))
        .await
        .expect("first row");

    for candidate in [
        relationship("r2", "a", "b", RelationshipStatus::Pending),
        relationship("r3", "b", "a", RelationshipStatus::Accepted),
    ] {
        let err = rows.insert(&candidate).await.unwrap_err();
        assert!(err.is_unique_violation(), "{candidate:?} should collide");
    }

    // Rejected rows sit outside the constraint.
    rows.insert(&relationship("r4", "b", "a", RelationshipStatus::Rejected))
        .await
        .expect("rejected row");
    rows.insert(&relationship("r5", "a", "c", RelationshipStatus::Pending))
        .await
        .expect("other pair");
}

#[tokio::test]
async fn losing_an_insert_race_reports_db_duplicate() {
    let store = BlindStore::new("relationships");
    let ana = register(&store, "Ana").await;
    let ben = register(&store, "Ben").await;
    let friendships = FriendshipManager::new(&store);

    let winner = friendships.send_request(&ana.id, &ben.id).await.expect("winner");

    // Ben's lookup misses Ana's row, so the store has the final word.
    store.blind_next(1);
    let err = friendships.send_request(&ben.id, &ana.id).await.unwrap_err();
    match err {
        SocialError::DuplicateRelationship { reason, existing } => {
            assert_eq!(reason, DuplicateReason::DbDuplicate);
            assert_eq!(existing.map(|row| row.id), Some(winner.id));
        }
        other => panic!("expected db duplicate, got {other:?}"),
    }
    assert_eq!(store.inner.len("relationships"), 1);
}

#[tokio::test]
async fn db_duplicate_points_at_the_active_row() {
    let store = BlindStore::new("relationships");
    let ana = register(&store, "Ana").await;
    let ben = register(&store, "Ben").await;
    let rows = Repo::<_, Relationship>::new(&store);
    rows.insert(&relationship("old", &ana.id, &ben.id, RelationshipStatus::Rejected))
        .await
        .expect("rejected row");
    pause();
    rows.insert(&relationship("live", &ben.id, &ana.id, RelationshipStatus::Pending))
        .await
        .expect("pending row");
    pause();
    // A later update to the rejected row makes it the most recent one.
    rows.update_where(
        rows.query().eq("id", "old"),
        patch([("updated_at", timestamp(Utc::now()))]),
    )
    .await
    .expect("touch");

    store.blind_next(1);
    let err = FriendshipManager::new(&store)
        .send_request(&ana.id, &ben.id)
        .await
        .unwrap_err();
    match err {
        SocialError::DuplicateRelationship { reason, existing } => {
            assert_eq!(reason, DuplicateReason::DbDuplicate);
            assert_eq!(existing.map(|row| row.id).as_deref(), Some("live"));
        }
        other => panic!("expected db duplicate, got {other:?}"),
    }
}

#[tokio::test]
async fn answering_a_request_that_is_no_longer_pending_is_refused() {
    let store = MemoryStore::new();
    let ana = register(&store, "Ana").await;
    let ben = register(&store, "Ben").await;
    let friendships = FriendshipManager::new(&store);
    let request = friendships.send_request(&ana.id, &ben.id).await.expect("request");

    // The second answer sees the accepted row and changes nothing.
    let accepted = friendships.accept(&request.id, &ben.id).await.expect("accept");
    let err = friendships.reject(&request.id, &ben.id).await.unwrap_err();
    assert!(matches!(err, SocialError::NotAuthorized { .. }));
    let stored = Repo::<_, Relationship>::new(&store)
        .get(&request.id)
        .await
        .expect("get")
        .expect("row");
    assert_eq!(stored, accepted);
}

/// The patch another client writes when it answers or re-sends first.
fn competing(status: RelationshipStatus, requester: &str, recipient: &str) -> Row {
    patch([
        ("status", Value::from(status)),
        ("requester", Value::from(requester)),
        ("recipient", Value::from(recipient)),
        ("updated_at", timestamp(Utc::now())),
    ])
}

async fn stored(store: &InterleavedStore, id: &str) -> Relationship {
    Repo::<_, Relationship>::new(store)
        .get(id)
        .await
        .expect("get")
        .expect("row")
}

#[tokio::test]
async fn answer_racing_a_concurrent_accept_is_refused() {
    for report_conflict in [false, true] {
        let store = InterleavedStore::new();
        let ana = register(&store, "Ana").await;
        let ben = register(&store, "Ben").await;
        let friendships = FriendshipManager::new(&store);
        let request = friendships.send_request(&ana.id, &ben.id).await.expect("request");

        // Ben's reject reads a pending row, but an accept commits first.
        let accept = competing(RelationshipStatus::Accepted, &ana.id, &ben.id);
        if report_conflict {
            store.conflict_on_next_update(&request.id, accept);
        } else {
            store.before_next_update(&request.id, accept);
        }
        let err = friendships.reject(&request.id, &ben.id).await.unwrap_err();
        assert!(
            matches!(err, SocialError::NotAuthorized { .. }),
            "conflict={report_conflict}: {err:?}"
        );
        assert_eq!(stored(&store, &request.id).await.status, RelationshipStatus::Accepted);
    }
}

#[tokio::test]
async fn resend_racing_a_concurrent_resend_reports_db_duplicate() {
    for report_conflict in [false, true] {
        let store = InterleavedStore::new();
        let ana = register(&store, "Ana").await;
        let ben = register(&store, "Ben").await;
        let friendships = FriendshipManager::new(&store);
        let request = friendships.send_request(&ana.id, &ben.id).await.expect("request");
        friendships.reject(&request.id, &ben.id).await.expect("reject");

        // Ben re-sends from the rejected row while Ana's re-send commits first.
        let resend = competing(RelationshipStatus::Pending, &ana.id, &ben.id);
        if report_conflict {
            store.conflict_on_next_update(&request.id, resend);
        } else {
            store.before_next_update(&request.id, resend);
        }
        let err = friendships.send_request(&ben.id, &ana.id).await.unwrap_err();
        match err {
            SocialError::DuplicateRelationship { reason, existing } => {
                assert_eq!(reason, DuplicateReason::DbDuplicate);
                let existing = existing.expect("winning row");
                assert_eq!(existing.id, request.id);
                assert_eq!(existing.status, RelationshipStatus::Pending);
                assert_eq!(existing.requester, ana.id);
            }
            other => panic!("conflict={report_conflict}: expected db duplicate, got {other:?}"),
        }

        let row = stored(&store, &request.id).await;
        assert_eq!((row.requester, row.recipient), (ana.id.clone(), ben.id.clone()));
    }
}
