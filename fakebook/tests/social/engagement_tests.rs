use super::support::*;

#[tokio::test]
async fn one_like_per_user_and_post() {
    let store = MemoryStore::new();
    let ana = register(&store, "Ana").await;
    let ben = register(&store, "Ben").await;
    let post = PostService::new(&store)
        .create_post(&ana.id, text_post("hi", Visibility::Public))
        .await
        .expect("post");
    let engagement = Engagement::new(&store);

    assert_eq!(engagement.toggle_like(&post.id, &ana.id).await.expect("like"), LikeState::Liked);
    assert_eq!(engagement.toggle_like(&post.id, &ben.id).await.expect("like"), LikeState::Liked);
    let mut likers = engagement.likers(&post.id).await.expect("likers");
    likers.sort();
    let mut expected = vec![ana.id.clone(), ben.id.clone()];
    expected.sort();
    assert_eq!(likers, expected);

    assert_eq!(engagement.toggle_like(&post.id, &ana.id).await.expect("unlike"), LikeState::Unliked);
    assert_eq!(engagement.likers(&post.id).await.expect("likers"), vec![ben.id.clone()]);
    assert_eq!(store.len("likes"), 1);
}

#[tokio::test]
async fn a_like_that_lost_the_race_still_counts_as_liked() {
    let store = BlindStore::new("likes");
    let ana = register(&store, "Ana").await;
    let post = PostService::new(&store)
        .create_post(&ana.id, text_post("hi", Visibility::Public))
        .await
        .expect("post");
    let engagement = Engagement::new(&store);
    engagement.toggle_like(&post.id, &ana.id).await.expect("like");

    // The second toggle cannot see the first like, so its insert collides.
    store.blind_next(1);
    let state = engagement.toggle_like(&post.id, &ana.id).await.expect("toggle");
    assert_eq!(state, LikeState::Liked);
    assert_eq!(store.inner.len("likes"), 1);
}

#[tokio::test]
async fn comments_come_back_oldest_first() {
    let store = MemoryStore::new();
    let ana = register(&store, "Ana").await;
    let ben = register(&store, "Ben").await;
    let post = PostService::new(&store)
        .create_post(&ana.id, text_post("hi", Visibility::Friends))
        .await
        .expect("post");
    let engagement = Engagement::new(&store);

    engagement.add_comment(&post.id, &ben.id, "one").await.expect("comment");
    pause();
    engagement.add_comment(&post.id, &ana.id, "two").await.expect("comment");

    let thread: Vec<_> = engagement
        .comments(&post.id)
        .await
        .expect("comments")
        .into_iter()
        .map(|comment| (comment.author_id, comment.content))
        .collect();
    assert_eq!(
        thread,
        vec![(ben.id.clone(), "one".to_string()), (ana.id.clone(), "two".to_string())]
    );

    let err = engagement.add_comment("ghost", &ben.id, "hello?").await.unwrap_err();
    assert!(matches!(err, SocialError::NotFound { entity: "post", .. }));
}

#[tokio::test]
async fn projection_rolls_back_failed_writes() {
    let store = FlakyStore::new();
    let ana = register(&store, "Ana").await;
    let ben = register(&store, "Ben").await;
    let posts = PostService::new(&store);
    let post = posts
        .create_post(&ana.id, text_post("hi", Visibility::Public))
        .await
        .expect("post");
    let engagement = Engagement::new(&store);
    engagement.toggle_like(&post.id, &ana.id).await.expect("like");

    let mut projection = EngagementProjection::from_feed(&posts.feed(Some(&ben.id)).await.expect("feed"));
    assert!(projection.is_liked(&post.id, &ana.id));
    assert_eq!(projection.like_count(&post.id), 1);

    store.set_failing(true);
    let err = projection.toggle_like(&engagement, &post.id, &ben.id).await.unwrap_err();
    assert!(matches!(err, SocialError::Remote(_)));
    let err = projection
        .add_comment(&engagement, &post.id, &ben.id, "nice")
        .await
        .unwrap_err();
    assert!(matches!(err, SocialError::Remote(_)));
    assert!(!projection.is_liked(&post.id, &ben.id));
    assert_eq!(projection.like_count(&post.id), 1);
    assert!(projection.comments(&post.id).is_empty());
    assert_eq!(projection.pending_comments(), 0);
    assert!(store.inner.is_empty("comments"));

    store.set_failing(false);
    let state = projection.toggle_like(&engagement, &post.id, &ben.id).await.expect("like");
    assert_eq!(state, LikeState::Liked);
    assert_eq!(projection.like_count(&post.id), 2);
    let comment = projection
        .add_comment(&engagement, &post.id, &ben.id, "  nice  ")
        .await
        .expect("comment");
    assert_eq!(comment.content, "nice");
    assert_eq!(projection.comments(&post.id), std::slice::from_ref(&comment));
    assert_eq!(projection.pending_comments(), 0);
}
