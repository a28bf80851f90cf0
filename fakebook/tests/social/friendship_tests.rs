use super::support::*;

#[tokio::test]
async fn duplicate_requests_fail_in_both_directions() {
    let store = MemoryStore::new();
    let ana = register(&store, "Ana").await;
    let ben = register(&store, "Ben").await;
    let friendships = FriendshipManager::new(&store);

    let first = friendships.send_request(&ana.id, &ben.id).await.expect("first request");
    assert_eq!(first.status, RelationshipStatus::Pending);

    for (from, to) in [(&ana, &ben), (&ben, &ana)] {
        let err = friendships.send_request(&from.id, &to.id).await.unwrap_err();
        assert_eq!(err.duplicate_reason(), Some(DuplicateReason::Pending));
        match err {
            SocialError::DuplicateRelationship { existing, .. } => {
                assert_eq!(existing.map(|row| row.id), Some(first.id.clone()));
            }
            other => panic!("expected duplicate, got {other:?}"),
        }
    }

    friendships.accept(&first.id, &ben.id).await.expect("accept");
    for (from, to) in [(&ana, &ben), (&ben, &ana)] {
        let err = friendships.send_request(&from.id, &to.id).await.unwrap_err();
        assert_eq!(err.duplicate_reason(), Some(DuplicateReason::Accepted));
    }
    assert_eq!(store.len("relationships"), 1);
}

#[tokio::test]
async fn self_requests_are_refused_before_any_lookup() {
    let store = MemoryStore::new();
    let friendships = FriendshipManager::new(&store);
    // No such user exists, so reaching the store would yield NotFound instead.
    let err = friendships.send_request("ghost", "ghost").await.unwrap_err();
    assert!(matches!(err, SocialError::SelfRequest));
}

#[tokio::test]
async fn requests_to_unknown_users_are_not_found() {
    let store = MemoryStore::new();
    let ana = register(&store, "Ana").await;
    let friendships = FriendshipManager::new(&store);

    let err = friendships.send_request(&ana.id, "nobody").await.unwrap_err();
    assert!(matches!(err, SocialError::NotFound { entity: "user", .. }));
    let err = friendships
        .send_request_by_email(&ana.id, "nobody@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, SocialError::NotFound { .. }));
    assert!(store.is_empty("relationships"));
}

#[tokio::test]
async fn requests_by_email_ignore_case() {
    let store = MemoryStore::new();
    let ana = register(&store, "Ana").await;
    let ben = register(&store, "Ben").await;
    let friendships = FriendshipManager::new(&store);

    let request = friendships
        .send_request_by_email(&ana.id, " BEN@Example.com ")
        .await
        .expect("request");
    assert_eq!(request.recipient, ben.id);
}

#[tokio::test]
async fn only_the_recipient_accepts_a_pending_request() {
    let store = MemoryStore::new();
    let ana = register(&store, "Ana").await;
    let ben = register(&store, "Ben").await;
    let cat = register(&store, "Cat").await;
    let friendships = FriendshipManager::new(&store);
    let request = friendships.send_request(&ana.id, &ben.id).await.expect("request");

    for outsider in [&ana, &cat] {
        let err = friendships.accept(&request.id, &outsider.id).await.unwrap_err();
        assert!(matches!(err, SocialError::NotAuthorized { .. }));
    }

    let accepted = friendships.accept(&request.id, &ben.id).await.expect("accept");
    assert_eq!(accepted.status, RelationshipStatus::Accepted);
    assert_eq!(accepted.id, request.id);

    let err = friendships.accept(&request.id, &ben.id).await.unwrap_err();
    assert!(matches!(err, SocialError::NotAuthorized { .. }));
    let err = friendships.accept("missing", &ben.id).await.unwrap_err();
    assert!(matches!(err, SocialError::NotFound { entity: "relationship", .. }));
}

#[tokio::test]
async fn rejected_requests_are_reused_when_asked_again() {
    let store = MemoryStore::new();
    let ana = register(&store, "Ana").await;
    let ben = register(&store, "Ben").await;
    let friendships = FriendshipManager::new(&store);

    let request = friendships.send_request(&ana.id, &ben.id).await.expect("request");
    let rejected = friendships.reject(&request.id, &ben.id).await.expect("reject");
    assert_eq!(rejected.status, RelationshipStatus::Rejected);

    pause();
    // The rejected party may ask in the other direction; the row flips around.
    let resent = friendships.send_request(&ben.id, &ana.id).await.expect("resend");
    assert_eq!(resent.id, request.id);
    assert_eq!(resent.status, RelationshipStatus::Pending);
    assert_eq!(resent.requester, ben.id);
    assert_eq!(resent.recipient, ana.id);
    assert_eq!(resent.created_at, request.created_at);
    assert!(resent.updated_at > request.updated_at);
    assert_eq!(store.len("relationships"), 1);

    let err = friendships.accept(&resent.id, &ben.id).await.unwrap_err();
    assert!(matches!(err, SocialError::NotAuthorized { .. }));
    friendships.accept(&resent.id, &ana.id).await.expect("accept");
}

#[tokio::test]
async fn either_party_rejects_and_only_the_requester_cancels() {
    let store = MemoryStore::new();
    let ana = register(&store, "Ana").await;
    let ben = register(&store, "Ben").await;
    let cat = register(&store, "Cat").await;
    let friendships = FriendshipManager::new(&store);

    let request = friendships.send_request(&ana.id, &ben.id).await.expect("request");
    let err = friendships.reject(&request.id, &cat.id).await.unwrap_err();
    assert!(matches!(err, SocialError::NotAuthorized { .. }));
    let err = friendships.cancel(&request.id, &ben.id).await.unwrap_err();
    assert!(matches!(err, SocialError::NotAuthorized { .. }));

    let cancelled = friendships.cancel(&request.id, &ana.id).await.expect("cancel");
    assert_eq!(cancelled.status, RelationshipStatus::Rejected);
    assert_eq!(friendships.list_outgoing(&ana.id).await.expect("outgoing").len(), 0);

    let again = friendships.send_request(&ana.id, &ben.id).await.expect("ask again");
    let rejected = friendships.reject(&again.id, &ana.id).await.expect("requester rejects own");
    assert_eq!(rejected.status, RelationshipStatus::Rejected);
}

#[tokio::test]
async fn unfriend_needs_an_accepted_friendship() {
    let store = MemoryStore::new();
    let ana = register(&store, "Ana").await;
    let ben = register(&store, "Ben").await;
    let cat = register(&store, "Cat").await;
    let friendships = FriendshipManager::new(&store);

    let request = friendships.send_request(&ana.id, &ben.id).await.expect("request");
    let err = friendships.unfriend(&request.id, &ana.id).await.unwrap_err();
    assert!(matches!(err, SocialError::NotAuthorized { .. }));

    friendships.accept(&request.id, &ben.id).await.expect("accept");
    let err = friendships.unfriend(&request.id, &cat.id).await.unwrap_err();
    assert!(matches!(err, SocialError::NotAuthorized { .. }));

    friendships.unfriend(&request.id, &ben.id).await.expect("unfriend");
    assert!(friendships.list_friends(&ana.id).await.expect("friends").next().is_none());
    assert!(friendships.list_friends(&ben.id).await.expect("friends").next().is_none());
    assert!(store.is_empty("relationships"));

    let err = friendships.unfriend(&request.id, &ana.id).await.unwrap_err();
    assert!(matches!(err, SocialError::NotFound { .. }));
}

#[tokio::test]
async fn full_friendship_lifecycle() {
    let store = MemoryStore::new();
    let ana = register(&store, "Ana").await;
    let ben = register(&store, "Ben").await;
    let friendships = FriendshipManager::new(&store);

    let request = friendships.send_request(&ana.id, &ben.id).await.expect("request");
    assert_eq!(request.requester, ana.id);

    let incoming: Vec<_> = friendships.list_incoming(&ben.id).await.expect("incoming").collect();
    assert_eq!(incoming.len(), 1);
    assert_eq!(incoming[0].counterpart.as_ref().map(|p| p.name.as_str()), Some("Ana"));

    friendships.reject(&request.id, &ben.id).await.expect("reject");
    assert_eq!(friendships.list_incoming(&ben.id).await.expect("incoming").len(), 0);

    let resent = friendships.send_request(&ana.id, &ben.id).await.expect("resend");
    assert_eq!((resent.id.as_str(), resent.requester.as_str()), (request.id.as_str(), ana.id.as_str()));

    friendships.accept(&resent.id, &ben.id).await.expect("accept");
    assert!(friendships.are_friends(&ana.id, &ben.id).await.expect("friends"));
    assert!(friendships.are_friends(&ben.id, &ana.id).await.expect("friends"));
    assert_eq!(friendships.friend_ids(&ben.id).await.expect("ids"), vec![ana.id.clone()]);

    friendships.unfriend(&resent.id, &ana.id).await.expect("unfriend");
    assert_eq!(friendships.list_friends(&ana.id).await.expect("friends").len(), 0);
    assert_eq!(friendships.list_friends(&ben.id).await.expect("friends").len(), 0);
}

#[tokio::test]
async fn pending_lists_are_newest_first() {
    let store = MemoryStore::new();
    let ana = register(&store, "Ana").await;
    let ben = register(&store, "Ben").await;
    let cat = register(&store, "Cat").await;
    let friendships = FriendshipManager::new(&store);

    friendships.send_request(&ben.id, &ana.id).await.expect("ben asks");
    pause();
    friendships.send_request(&cat.id, &ana.id).await.expect("cat asks");
    friendships.send_request(&ana.id, &cat.id).await.unwrap_err();

    let names: Vec<_> = friendships
        .list_incoming(&ana.id)
        .await
        .expect("incoming")
        .filter_map(|entry| entry.counterpart.map(|profile| profile.name))
        .collect();
    assert_eq!(names, vec!["Cat".to_string(), "Ben".to_string()]);
    assert_eq!(friendships.list_outgoing(&ben.id).await.expect("outgoing").len(), 1);
}

#[tokio::test]
async fn relation_view_covers_every_state() {
    let store = MemoryStore::new();
    let ana = register(&store, "Ana").await;
    let ben = register(&store, "Ben").await;
    let friendships = FriendshipManager::new(&store);

    let view = async |viewer: Option<&str>| friendships.relation_view(viewer, &ana.id).await.expect("view");
    assert_eq!(view(None).await, RelationView::Anonymous);
    assert_eq!(view(Some(&ana.id)).await, RelationView::Own);
    assert_eq!(view(Some(&ben.id)).await, RelationView::Strangers);

    let request = friendships.send_request(&ben.id, &ana.id).await.expect("request");
    let relationship_id = request.id.clone();
    assert_eq!(
        view(Some(&ben.id)).await,
        RelationView::RequestSent {
            relationship_id: relationship_id.clone()
        }
    );
    assert_eq!(
        friendships.relation_view(Some(&ana.id), &ben.id).await.expect("view"),
        RelationView::RequestReceived {
            relationship_id: relationship_id.clone()
        }
    );

    friendships.reject(&request.id, &ana.id).await.expect("reject");
    assert_eq!(
        view(Some(&ben.id)).await,
        RelationView::Rejected {
            relationship_id: relationship_id.clone()
        }
    );

    friendships.send_request(&ben.id, &ana.id).await.expect("resend");
    friendships.accept(&request.id, &ana.id).await.expect("accept");
    assert_eq!(
        view(Some(&ben.id)).await,
        RelationView::Friends { relationship_id }
    );
}

#[tokio::test]
async fn friends_visibility_holds_in_both_directions() {
    let store = MemoryStore::new();
    let ana = register(&store, "Ana").await;
    let ben = register(&store, "Ben").await;
    let cat = register(&store, "Cat").await;
    let friendships = FriendshipManager::new(&store);
    let posts = PostService::new(&store);

    let by_ana = posts
        .create_post(&ana.id, text_post("ana only friends", Visibility::Friends))
        .await
        .expect("post");
    let by_ben = posts
        .create_post(&ben.id, text_post("ben only friends", Visibility::Friends))
        .await
        .expect("post");
    let private = posts
        .create_post(&ana.id, text_post("diary", Visibility::Private))
        .await
        .expect("post");
    let public = posts
        .create_post(&ana.id, text_post("hello", Visibility::Public))
        .await
        .expect("post");

    assert!(!friendships.can_view_post(Some(&ben.id), &by_ana).await.expect("check"));
    befriend(&store, &ana, &ben).await;

    assert!(friendships.can_view_post(Some(&ben.id), &by_ana).await.expect("check"));
    assert!(friendships.can_view_post(Some(&ana.id), &by_ben).await.expect("check"));
    assert!(!friendships.can_view_post(Some(&cat.id), &by_ana).await.expect("check"));
    assert!(!friendships.can_view_post(None, &by_ana).await.expect("check"));

    assert!(!friendships.can_view_post(Some(&ben.id), &private).await.expect("check"));
    assert!(friendships.can_view_post(Some(&ana.id), &private).await.expect("check"));
    for viewer in [None, Some(cat.id.as_str()), Some(ben.id.as_str())] {
        assert!(friendships.can_view_post(viewer, &public).await.expect("check"));
    }
}
