use fakebook::{AuthProvider, SessionUser, config::SocialSettings, social::AdminPanel};

use super::support::*;

struct NoSession;

impl AuthProvider for NoSession {
    async fn current_user(&self) -> Option<SessionUser> {
        None
    }

    async fn sign_out(&self) {}
}

fn settings() -> SocialSettings {
    SocialSettings {
        admin_emails: vec!["Root@Example.com".into()],
        ..Default::default()
    }
}

#[tokio::test]
async fn panel_is_closed_without_an_admin_session() {
    let store = MemoryStore::new();
    let settings = settings();
    register(&store, "Ana").await;

    let anonymous = AdminPanel::new(&store, &NoSession, &settings);
    let err = anonymous.list_users().await.unwrap_err();
    assert!(matches!(err, SocialError::NotAuthorized { .. }));

    let auth = Authenticator::new(&store);
    auth.sign_in("ana@example.com", "password-1").await.expect("sign in");
    let regular = AdminPanel::new(&store, &auth, &settings);
    for err in [
        regular.list_users().await.unwrap_err(),
        regular.list_posts().await.unwrap_err(),
        regular.delete_post("anything").await.unwrap_err(),
    ] {
        assert!(matches!(err, SocialError::NotAuthorized { .. }), "{err:?}");
    }
    assert_eq!(store.len("users"), 1);
}

#[tokio::test]
async fn admin_lists_everything_and_deletes_posts() {
    let store = MemoryStore::new();
    let settings = settings();
    let root = register(&store, "Root").await;
    let ana = register(&store, "Ana").await;
    let posts = PostService::new(&store);
    let engagement = Engagement::new(&store);

    let hidden = posts
        .create_post(&ana.id, text_post("only me", Visibility::Private))
        .await
        .expect("post");
    let kept = posts
        .create_post(&ana.id, text_post("hello", Visibility::Public))
        .await
        .expect("post");
    for post in [&hidden, &kept] {
        engagement.toggle_like(&post.id, &root.id).await.expect("like");
        engagement.add_comment(&post.id, &root.id, "seen").await.expect("comment");
    }

    let auth = Authenticator::new(&store);
    let admin = auth.sign_in("root@example.com", "password-1").await.expect("sign in");
    let panel = AdminPanel::new(&store, &auth, &settings);
    assert_eq!(panel.require_admin().await.expect("admin").id, admin.id);

    assert_eq!(panel.list_users().await.expect("users").len(), 2);
    assert_eq!(panel.list_posts().await.expect("posts").len(), 2);

    panel.delete_post(&hidden.id).await.expect("delete");
    let remaining = panel.list_posts().await.expect("posts");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].post.id, kept.id);
    assert_eq!(store.len("likes"), 1);
    assert_eq!(store.len("comments"), 1);

    let err = panel.delete_post(&hidden.id).await.unwrap_err();
    assert!(matches!(err, SocialError::NotFound { entity: "post", .. }));
}

#[tokio::test]
async fn deleting_a_user_removes_their_footprint() {
    let store = MemoryStore::new();
    let settings = settings();
    register(&store, "Root").await;
    let ana = register(&store, "Ana").await;
    let ben = register(&store, "Ben").await;
    let cat = register(&store, "Cat").await;
    let posts = PostService::new(&store);
    let engagement = Engagement::new(&store);

    let anas = posts
        .create_post(&ana.id, text_post("ana's", Visibility::Friends))
        .await
        .expect("post");
    let bens = posts
        .create_post(&ben.id, text_post("ben's", Visibility::Public))
        .await
        .expect("post");
    engagement.toggle_like(&anas.id, &ben.id).await.expect("like");
    engagement.add_comment(&anas.id, &ben.id, "hey").await.expect("comment");
    engagement.toggle_like(&bens.id, &ana.id).await.expect("like");
    engagement.add_comment(&bens.id, &ana.id, "hi").await.expect("comment");
    engagement.add_comment(&bens.id, &cat.id, "yo").await.expect("comment");
    befriend(&store, &ana, &ben).await;
    FriendshipManager::new(&store)
        .send_request(&cat.id, &ana.id)
        .await
        .expect("pending request");

    let auth = Authenticator::new(&store);
    auth.sign_in("root@example.com", "password-1").await.expect("sign in");
    let panel = AdminPanel::new(&store, &auth, &settings);
    panel.delete_user(&ana.id).await.expect("delete user");

    assert_eq!(store.len("users"), 3);
    assert_eq!(store.len("credentials"), 3);
    assert_eq!(store.len("posts"), 1);
    assert!(store.is_empty("likes"));
    assert!(store.is_empty("relationships"));
    let left: Vec<_> = engagement
        .comments(&bens.id)
        .await
        .expect("comments")
        .into_iter()
        .map(|comment| comment.content)
        .collect();
    assert_eq!(left, vec!["yo".to_string()]);
    assert_eq!(store.len("comments"), 1);

    let err = Authenticator::new(&store)
        .sign_in("ana@example.com", "password-1")
        .await
        .unwrap_err();
    assert!(matches!(err, fakebook::AuthError::InvalidCredentials));

    let err = panel.delete_user(&ana.id).await.unwrap_err();
    assert!(matches!(err, SocialError::NotFound { entity: "user", .. }));
}
