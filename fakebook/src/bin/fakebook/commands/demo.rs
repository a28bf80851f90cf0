use anyhow::{Context, Result, ensure};
use fakebook::{
    Authenticator, MemoryStore,
    models::{RelationshipStatus, Visibility},
    social::{FriendshipManager, NewPost, NewUser, PostService, UserDirectory},
};

use crate::{examples::ExampleGroup, output::OutputManager};

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Walkthrough",
    commands: &[
        "fakebook demo",
        "fakebook --output json demo",
    ],
}];

fn demo_user(name: &str, email: &str) -> NewUser {
    NewUser {
        name: name.to_string(),
        email: email.to_string(),
        password: "demo-password".to_string(),
        avatar_url: None,
    }
}

/// Walk two users through request, rejection, re-send, acceptance and
/// unfriending on a throwaway in-memory store.
pub async fn handle_demo(output: &OutputManager) -> Result<()> {
    let store = MemoryStore::new();
    let auth = Authenticator::new(&store);
    let users = UserDirectory::new(&store);
    let friendships = FriendshipManager::new(&store);
    let posts = PostService::new(&store);

    output.heading("Users");
    let ana = users.register(&auth, demo_user("Ana", "ana@example.com")).await?;
    let ben = users.register(&auth, demo_user("Ben", "ben@example.com")).await?;
    output.bullet(&format!("{} <{}>", ana.name, ana.email));
    output.bullet(&format!("{} <{}>", ben.name, ben.email));

    output.heading("Friendship");
    let request = friendships.send_request(&ana.id, &ben.id).await?;
    output.key_value("Ana asks Ben", request.status.as_str());

    let rejected = friendships.reject(&request.id, &ben.id).await?;
    output.key_value("Ben rejects", rejected.status.as_str());

    let resent = friendships.send_request(&ana.id, &ben.id).await?;
    ensure!(resent.id == request.id, "a re-sent request should reuse the relationship");
    output.key_value("Ana asks again", &format!("{} (same id {})", resent.status, resent.id));

    let accepted = friendships.accept(&resent.id, &ben.id).await?;
    ensure!(accepted.status == RelationshipStatus::Accepted, "request should be accepted");
    output.key_value("Ben accepts", accepted.status.as_str());

    output.heading("Visibility");
    posts
        .create_post(
            &ana.id,
            NewPost {
                content: Some("Hello everyone".to_string()),
                ..Default::default()
            },
        )
        .await?;
    posts
        .create_post(
            &ana.id,
            NewPost {
                content: Some("Only for friends".to_string()),
                visibility: Visibility::Friends,
                ..Default::default()
            },
        )
        .await?;
    let anonymous = posts.feed(None).await?;
    let as_friend = posts.feed(Some(&ben.id)).await?;
    output.key_value("Anonymous feed", &format!("{} posts", anonymous.len()));
    output.key_value("Ben's feed", &format!("{} posts", as_friend.len()));

    output.heading("Unfriend");
    friendships.unfriend(&accepted.id, &ana.id).await?;
    let remaining = friendships.list_friends(&ben.id).await?.len();
    ensure!(remaining == 0, "unfriended users should not list each other");
    let after = posts.feed(Some(&ben.id)).await?;
    output.key_value("Ben's friends", &remaining.to_string());
    output.key_value("Ben's feed", &format!("{} posts", after.len()));

    let page = posts
        .profile_view(Some(&ben.id), &ana.id)
        .await
        .context("Failed to load Ana's profile")?;
    output.display(&page)?;
    output.success("Demo finished");
    Ok(())
}
