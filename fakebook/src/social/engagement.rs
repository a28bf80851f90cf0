use chrono::Utc;
use log::{debug, info};
use serde::Serialize;

use crate::{
    errors::{SocialError, SocialResult, ValidationError},
    id::generate_row_id,
    models::{Comment, Like, Post},
    query::SortOrder,
    repository::Repo,
    store::DataStore,
    validators::non_blank,
};

/// Where a like stands after a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeState {
    Liked,
    Unliked,
}

impl LikeState {
    pub fn is_liked(self) -> bool {
        self == LikeState::Liked
    }
}

/// Likes and comments on posts.
pub struct Engagement<'s, S> {
    posts: Repo<'s, S, Post>,
    likes: Repo<'s, S, Like>,
    comments: Repo<'s, S, Comment>,
}

impl<'s, S: DataStore> Engagement<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self {
            posts: Repo::new(store),
            likes: Repo::new(store),
            comments: Repo::new(store),
        }
    }

    async fn ensure_post(&self, post_id: &str) -> SocialResult<()> {
        if self.posts.exists(post_id).await? {
            Ok(())
        } else {
            Err(SocialError::not_found("post", post_id))
        }
    }

    /// Like the post, or remove the like when `user_id` already likes it.
    ///
    /// Losing an insert race against another like by the same user still
    /// leaves the post liked, so that outcome is reported as `Liked`.
    pub async fn toggle_like(&self, post_id: &str, user_id: &str) -> SocialResult<LikeState> {
        self.ensure_post(post_id).await?;

        let mine = self.likes.query().eq("post_id", post_id).eq("user_id", user_id);
        if self.likes.exists_where(mine.clone()).await? {
            let removed = self.likes.delete_where(mine).await?;
            debug!("user {user_id} unliked post {post_id} ({removed} rows)");
            return Ok(LikeState::Unliked);
        }

        let like = Like {
            id: generate_row_id(),
            post_id: post_id.to_string(),
            user_id: user_id.to_string(),
            created_at: Utc::now(),
        };
        match self.likes.insert(&like).await {
            Ok(_) => {
                debug!("user {user_id} liked post {post_id}");
                Ok(LikeState::Liked)
            }
            Err(err) if err.is_unique_violation() => Ok(LikeState::Liked),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn add_comment(&self, post_id: &str, author_id: &str, content: &str) -> SocialResult<Comment> {
        let Some(content) = non_blank(Some(content)) else {
            return Err(ValidationError::single("content", "required", "comment cannot be empty").into());
        };
        self.ensure_post(post_id).await?;

        let comment = Comment {
            id: generate_row_id(),
            post_id: post_id.to_string(),
            author_id: author_id.to_string(),
            content,
            created_at: Utc::now(),
        };
        let stored = self.comments.insert(&comment).await?;
        info!("comment {} added to post {post_id} by {author_id}", stored.id);
        Ok(stored)
    }

    /// Ids of the users who like `post_id`.
    pub async fn likers(&self, post_id: &str) -> SocialResult<Vec<String>> {
        let likes = self
            .likes
            .fetch_all(self.likes.query().eq("post_id", post_id).order_by("created_at", SortOrder::Asc))
            .await?;
        Ok(likes.into_iter().map(|like| like.user_id).collect())
    }

    /// Comments on `post_id`, oldest first.
    pub async fn comments(&self, post_id: &str) -> SocialResult<Vec<Comment>> {
        Ok(self
            .comments
            .fetch_all(self.comments.query().eq("post_id", post_id).order_by("created_at", SortOrder::Asc))
            .await?)
    }
}
