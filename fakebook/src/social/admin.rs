use log::{info, warn};

use super::{
    posts::{FeedPost, PostService},
    users::UserDirectory,
};
use crate::{
    auth::{AuthProvider, SessionUser},
    config::SocialSettings,
    errors::{SocialError, SocialResult},
    models::{Comment, Credential, Like, Relationship, UserProfile},
    query::Filter,
    repository::Repo,
    store::DataStore,
};

/// User and post moderation, open only to the configured admin accounts.
pub struct AdminPanel<'s, S, A> {
    auth: &'s A,
    settings: &'s SocialSettings,
    users: UserDirectory<'s, S>,
    posts: PostService<'s, S>,
    credentials: Repo<'s, S, Credential>,
    likes: Repo<'s, S, Like>,
    comments: Repo<'s, S, Comment>,
    relationships: Repo<'s, S, Relationship>,
}

impl<'s, S: DataStore, A: AuthProvider> AdminPanel<'s, S, A> {
    pub fn new(store: &'s S, auth: &'s A, settings: &'s SocialSettings) -> Self {
        Self {
            auth,
            settings,
            users: UserDirectory::new(store),
            posts: PostService::new(store),
            credentials: Repo::new(store),
            likes: Repo::new(store),
            comments: Repo::new(store),
            relationships: Repo::new(store),
        }
    }

    /// The session user, provided it is an admin.
    pub async fn require_admin(&self) -> SocialResult<SessionUser> {
        let Some(user) = self.auth.current_user().await else {
            return Err(SocialError::not_authorized("sign in as an admin first"));
        };
        if !self.settings.is_admin(&user.email) {
            warn!("{} tried to use the admin panel", user.email);
            return Err(SocialError::not_authorized("admin access required"));
        }
        Ok(user)
    }

    pub async fn list_users(&self) -> SocialResult<Vec<UserProfile>> {
        self.require_admin().await?;
        self.users.list_users().await
    }

    pub async fn list_posts(&self) -> SocialResult<Vec<FeedPost>> {
        self.require_admin().await?;
        self.posts.all_posts().await
    }

    pub async fn delete_post(&self, post_id: &str) -> SocialResult<()> {
        let admin = self.require_admin().await?;
        self.posts.remove_post(post_id).await?;
        info!("admin {} deleted post {post_id}", admin.email);
        Ok(())
    }

    /// Remove a user and everything they own or took part in.
    pub async fn delete_user(&self, user_id: &str) -> SocialResult<()> {
        let admin = self.require_admin().await?;
        if !self.users.exists(user_id).await? {
            return Err(SocialError::not_found("user", user_id));
        }

        for post_id in self.posts.post_ids_by(user_id).await? {
            self.posts.remove_post(&post_id).await?;
        }
        let likes = self.likes.delete_where(self.likes.query().eq("user_id", user_id)).await?;
        let comments = self
            .comments
            .delete_where(self.comments.query().eq("author_id", user_id))
            .await?;
        let relationships = self
            .relationships
            .delete_where(
                self.relationships
                    .query()
                    .filter(Filter::or([Filter::eq("requester", user_id), Filter::eq("recipient", user_id)])),
            )
            .await?;
        self.users.delete(user_id).await?;
        self.credentials
            .delete_where(self.credentials.query().eq("id", user_id))
            .await?;

        info!(
            "admin {} deleted user {user_id} ({likes} likes, {comments} comments, {relationships} relationships)",
            admin.email
        );
        Ok(())
    }
}
