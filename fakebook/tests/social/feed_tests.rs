use super::support::*;

fn contents(feed: &[fakebook::social::FeedPost]) -> Vec<&str> {
    feed.iter().filter_map(|item| item.post.content.as_deref()).collect()
}

#[tokio::test]
async fn feed_follows_visibility_and_friendship() {
    let store = MemoryStore::new();
    let ana = register(&store, "Ana").await;
    let ben = register(&store, "Ben").await;
    let cat = register(&store, "Cat").await;
    let posts = PostService::new(&store);

    for (content, visibility) in [
        ("ana public", Visibility::Public),
        ("ana friends", Visibility::Friends),
        ("ana private", Visibility::Private),
    ] {
        posts.create_post(&ana.id, text_post(content, visibility)).await.expect("post");
        pause();
    }
    posts
        .create_post(&cat.id, text_post("cat friends", Visibility::Friends))
        .await
        .expect("post");
    befriend(&store, &ana, &ben).await;

    let anonymous = posts.feed(None).await.expect("feed");
    assert_eq!(contents(&anonymous), vec!["ana public"]);

    let as_ben = posts.feed(Some(&ben.id)).await.expect("feed");
    assert_eq!(contents(&as_ben), vec!["ana friends", "ana public"]);

    let as_cat = posts.feed(Some(&cat.id)).await.expect("feed");
    assert_eq!(contents(&as_cat), vec!["cat friends", "ana public"]);

    let as_ana = posts.feed(Some(&ana.id)).await.expect("feed");
    assert_eq!(contents(&as_ana), vec!["ana private", "ana friends", "ana public"]);
}

#[tokio::test]
async fn unfriending_hides_friends_posts_again() {
    let store = MemoryStore::new();
    let ana = register(&store, "Ana").await;
    let ben = register(&store, "Ben").await;
    let posts = PostService::new(&store);
    posts
        .create_post(&ana.id, text_post("for friends", Visibility::Friends))
        .await
        .expect("post");

    let friendship = befriend(&store, &ana, &ben).await;
    assert_eq!(posts.feed(Some(&ben.id)).await.expect("feed").len(), 1);

    FriendshipManager::new(&store)
        .unfriend(&friendship.id, &ben.id)
        .await
        .expect("unfriend");
    assert!(posts.feed(Some(&ben.id)).await.expect("feed").is_empty());
}

#[tokio::test]
async fn feed_is_limited_and_newest_first() {
    let store = MemoryStore::new();
    let ana = register(&store, "Ana").await;
    let posts = PostService::new(&store).with_feed_limit(2);
    for n in 1..=3 {
        posts
            .create_post(&ana.id, text_post(&format!("post {n}"), Visibility::Public))
            .await
            .expect("post");
        pause();
    }

    let feed = posts.feed(None).await.expect("feed");
    assert_eq!(contents(&feed), vec!["post 3", "post 2"]);
}

#[tokio::test]
async fn feed_items_carry_author_likes_and_comments() {
    let store = MemoryStore::new();
    let ana = register(&store, "Ana").await;
    let ben = register(&store, "Ben").await;
    let posts = PostService::new(&store);
    let engagement = Engagement::new(&store);

    let post = posts
        .create_post(&ana.id, text_post("hello", Visibility::Public))
        .await
        .expect("post");
    engagement.toggle_like(&post.id, &ben.id).await.expect("like");
    engagement.add_comment(&post.id, &ben.id, "first!").await.expect("comment");
    pause();
    engagement.add_comment(&post.id, &ana.id, "thanks").await.expect("comment");

    let feed = posts.feed(Some(&ben.id)).await.expect("feed");
    let item = &feed[0];
    assert_eq!(item.author.as_ref().map(|a| a.name.as_str()), Some("Ana"));
    assert!(item.liked_by(&ben.id));
    assert!(!item.liked_by(&ana.id));

    let thread: Vec<_> = item
        .comments
        .iter()
        .map(|view| {
            (
                view.comment.content.as_str(),
                view.author.as_ref().map(|a| a.name.as_str()),
            )
        })
        .collect();
    assert_eq!(thread, vec![("first!", Some("Ben")), ("thanks", Some("Ana"))]);
}

#[tokio::test]
async fn posts_need_text_or_a_valid_image() {
    let store = MemoryStore::new();
    let ana = register(&store, "Ana").await;
    let posts = PostService::new(&store);

    let empty = NewPost {
        content: Some("   ".to_string()),
        image_url: None,
        visibility: Visibility::Public,
    };
    let err = posts.create_post(&ana.id, empty).await.unwrap_err();
    assert!(matches!(err, SocialError::Validation(_)));

    let bad_image = NewPost {
        content: None,
        image_url: Some("not a url".to_string()),
        visibility: Visibility::Public,
    };
    let err = posts.create_post(&ana.id, bad_image).await.unwrap_err();
    match err {
        SocialError::Validation(validation) => assert_eq!(validation.issues[0].field, "image_url"),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(store.is_empty("posts"));

    let image_only = NewPost {
        content: None,
        image_url: Some("https://img.example.com/cat.png".to_string()),
        visibility: Visibility::Friends,
    };
    let post = posts.create_post(&ana.id, image_only).await.expect("image post");
    assert_eq!(post.content, None);
    assert_eq!(posts.get_post(&post.id).await.expect("stored post"), post);
    let err = posts.get_post("missing").await.unwrap_err();
    assert!(matches!(err, SocialError::NotFound { entity: "post", .. }));

    let err = posts
        .create_post("ghost", text_post("hi", Visibility::Public))
        .await
        .unwrap_err();
    assert!(matches!(err, SocialError::NotFound { entity: "user", .. }));
}

#[tokio::test]
async fn profile_view_filters_posts_by_relation() {
    let store = MemoryStore::new();
    let ana = register(&store, "Ana").await;
    let ben = register(&store, "Ben").await;
    let cat = register(&store, "Cat").await;
    let posts = PostService::new(&store);
    for (content, visibility) in [
        ("public", Visibility::Public),
        ("friends", Visibility::Friends),
        ("private", Visibility::Private),
    ] {
        posts.create_post(&ana.id, text_post(content, visibility)).await.expect("post");
        pause();
    }
    befriend(&store, &ana, &ben).await;

    let own = posts.profile_view(Some(&ana.id), &ana.id).await.expect("own");
    assert_eq!(own.relation, RelationView::Own);
    assert_eq!(contents(&own.posts), vec!["private", "friends", "public"]);

    let friend = posts.profile_view(Some(&ben.id), &ana.id).await.expect("friend");
    assert!(matches!(friend.relation, RelationView::Friends { .. }));
    assert_eq!(contents(&friend.posts), vec!["friends", "public"]);

    let stranger = posts.profile_view(Some(&cat.id), &ana.id).await.expect("stranger");
    assert_eq!(stranger.relation, RelationView::Strangers);
    assert_eq!(contents(&stranger.posts), vec!["public"]);

    let anonymous = posts.profile_view(None, &ana.id).await.expect("anonymous");
    assert_eq!(anonymous.relation, RelationView::Anonymous);
    assert_eq!(anonymous.profile.name, "Ana");
    assert_eq!(contents(&anonymous.posts), vec!["public"]);

    let err = posts.profile_view(None, "ghost").await.unwrap_err();
    assert!(matches!(err, SocialError::NotFound { entity: "user", .. }));
}
