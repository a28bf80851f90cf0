//! Client-side view of likes and comments.
//!
//! The projection is built from a feed snapshot and updated optimistically:
//! a toggle or a new comment shows up immediately and is rolled back when the
//! store refuses the write.

use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use log::warn;

use super::{
    engagement::{Engagement, LikeState},
    posts::FeedPost,
};
use crate::{errors::SocialResult, models::Comment, store::DataStore};

const PENDING_COMMENT_PREFIX: &str = "pending-";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngagementProjection {
    likes: HashMap<String, BTreeSet<String>>,
    comments: HashMap<String, Vec<Comment>>,
    pending: u64,
}

impl EngagementProjection {
    pub fn from_feed(feed: &[FeedPost]) -> Self {
        let mut projection = Self::default();
        for item in feed {
            projection
                .likes
                .insert(item.post.id.clone(), item.likes.iter().cloned().collect());
            projection.comments.insert(
                item.post.id.clone(),
                item.comments.iter().map(|view| view.comment.clone()).collect(),
            );
        }
        projection
    }

    pub fn is_liked(&self, post_id: &str, user_id: &str) -> bool {
        self.likes.get(post_id).is_some_and(|likers| likers.contains(user_id))
    }

    pub fn like_count(&self, post_id: &str) -> usize {
        self.likes.get(post_id).map_or(0, BTreeSet::len)
    }

    pub fn comments(&self, post_id: &str) -> &[Comment] {
        self.comments.get(post_id).map_or(&[], Vec::as_slice)
    }

    fn set_like(&mut self, post_id: &str, user_id: &str, liked: bool) {
        let likers = self.likes.entry(post_id.to_string()).or_default();
        if liked {
            likers.insert(user_id.to_string());
        } else {
            likers.remove(user_id);
        }
    }

    /// Flip the like locally, then persist it.
    ///
    /// On success the local state follows what the store reports. On failure
    /// the flip is undone and the error returned.
    pub async fn toggle_like<S: DataStore>(
        &mut self,
        engagement: &Engagement<'_, S>,
        post_id: &str,
        user_id: &str,
    ) -> SocialResult<LikeState> {
        let was_liked = self.is_liked(post_id, user_id);
        self.set_like(post_id, user_id, !was_liked);

        match engagement.toggle_like(post_id, user_id).await {
            Ok(state) => {
                self.set_like(post_id, user_id, state.is_liked());
                Ok(state)
            }
            Err(err) => {
                warn!("like toggle on {post_id} failed, reverting: {err}");
                self.set_like(post_id, user_id, was_liked);
                Err(err)
            }
        }
    }

    /// Show the comment at once, then persist it.
    ///
    /// The placeholder is swapped for the stored comment on success and
    /// dropped on failure.
    pub async fn add_comment<S: DataStore>(
        &mut self,
        engagement: &Engagement<'_, S>,
        post_id: &str,
        author_id: &str,
        content: &str,
    ) -> SocialResult<Comment> {
        self.pending += 1;
        let placeholder_id = format!("{PENDING_COMMENT_PREFIX}{}", self.pending);
        self.comments.entry(post_id.to_string()).or_default().push(Comment {
            id: placeholder_id.clone(),
            post_id: post_id.to_string(),
            author_id: author_id.to_string(),
            content: content.trim().to_string(),
            created_at: Utc::now(),
        });

        let result = engagement.add_comment(post_id, author_id, content).await;
        let thread = self.comments.entry(post_id.to_string()).or_default();
        let slot = thread.iter().position(|comment| comment.id == placeholder_id);
        match (result, slot) {
            (Ok(stored), Some(index)) => {
                thread[index] = stored.clone();
                Ok(stored)
            }
            (Ok(stored), None) => {
                thread.push(stored.clone());
                Ok(stored)
            }
            (Err(err), slot) => {
                warn!("comment on {post_id} failed, removing placeholder: {err}");
                if let Some(index) = slot {
                    thread.remove(index);
                }
                Err(err)
            }
        }
    }

    /// Comments not yet confirmed by the store.
    pub fn pending_comments(&self) -> usize {
        self.comments
            .values()
            .flatten()
            .filter(|comment| comment.id.starts_with(PENDING_COMMENT_PREFIX))
            .count()
    }
}
