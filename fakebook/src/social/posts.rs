use std::collections::HashMap;

use chrono::Utc;
use log::{debug, info};
use serde::Serialize;

use super::{
    friendship::{FriendshipManager, RelationView},
    users::UserDirectory,
    visibility::can_view_post,
};
use crate::{
    errors::{SocialError, SocialResult, ValidationError, ValidationIssue},
    id::generate_row_id,
    models::{Comment, Like, Post, PublicProfile, UserProfile, Visibility},
    query::{Filter, SortOrder},
    repository::Repo,
    store::DataStore,
    validators::{is_valid_url, non_blank},
};

/// Default number of posts a feed returns.
pub const DEFAULT_FEED_LIMIT: usize = 100;

#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub author: Option<PublicProfile>,
}

/// A post with its author, the ids of users who liked it and its comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedPost {
    #[serde(flatten)]
    pub post: Post,
    pub author: Option<PublicProfile>,
    pub likes: Vec<String>,
    pub comments: Vec<CommentView>,
}

impl FeedPost {
    pub fn liked_by(&self, user_id: &str) -> bool {
        self.likes.iter().any(|liker| liker == user_id)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfilePage {
    pub profile: UserProfile,
    pub relation: RelationView,
    pub posts: Vec<FeedPost>,
}

pub struct PostService<'s, S> {
    posts: Repo<'s, S, Post>,
    likes: Repo<'s, S, Like>,
    comments: Repo<'s, S, Comment>,
    users: UserDirectory<'s, S>,
    friendships: FriendshipManager<'s, S>,
    feed_limit: usize,
}

impl<'s, S: DataStore> PostService<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self {
            posts: Repo::new(store),
            likes: Repo::new(store),
            comments: Repo::new(store),
            users: UserDirectory::new(store),
            friendships: FriendshipManager::new(store),
            feed_limit: DEFAULT_FEED_LIMIT,
        }
    }

    pub fn with_feed_limit(mut self, feed_limit: usize) -> Self {
        self.feed_limit = feed_limit;
        self
    }

    pub async fn create_post(&self, author_id: &str, new_post: NewPost) -> SocialResult<Post> {
        let content = non_blank(new_post.content.as_deref());
        let image_url = non_blank(new_post.image_url.as_deref());

        let mut issues = Vec::new();
        if content.is_none() && image_url.is_none() {
            issues.push(ValidationIssue::new("content", "empty_post", "a post needs text or an image"));
        }
        if let Some(url) = image_url.as_deref()
            && !is_valid_url(url)
        {
            issues.push(ValidationIssue::new("image_url", "invalid_url", "image must be a valid URL"));
        }
        ValidationError::new(issues).into_result()?;

        if !self.users.exists(author_id).await? {
            return Err(SocialError::not_found("user", author_id));
        }

        let post = Post {
            id: generate_row_id(),
            author_id: author_id.to_string(),
            content,
            image_url,
            visibility: new_post.visibility,
            created_at: Utc::now(),
        };
        let stored = self.posts.insert(&post).await?;
        info!("post {} created by {author_id} ({})", stored.id, stored.visibility);
        Ok(stored)
    }

    pub async fn get_post(&self, post_id: &str) -> SocialResult<Post> {
        self.posts
            .get(post_id)
            .await?
            .ok_or_else(|| SocialError::not_found("post", post_id))
    }

    /// Posts `viewer_id` may see, newest first.
    ///
    /// Signed-in viewers get public posts, their own posts and the
    /// friends-only posts of accepted friends. Anonymous viewers get public
    /// posts only.
    pub async fn feed(&self, viewer_id: Option<&str>) -> SocialResult<Vec<FeedPost>> {
        let visible = match viewer_id {
            None => Filter::eq("visibility", Visibility::Public),
            Some(viewer) => {
                let friends = self.friendships.friend_ids(viewer).await?;
                let mut groups = vec![Filter::eq("visibility", Visibility::Public), Filter::eq("author_id", viewer)];
                if !friends.is_empty() {
                    groups.push(Filter::and([
                        Filter::eq("visibility", Visibility::Friends),
                        Filter::in_("author_id", friends),
                    ]));
                }
                Filter::or(groups)
            }
        };
        let query = self
            .posts
            .query()
            .filter(visible)
            .order_by("created_at", SortOrder::Desc)
            .limit(self.feed_limit);
        let posts = self.posts.fetch_all(query).await?;
        debug!("feed for {viewer_id:?} holds {} posts", posts.len());
        self.hydrate(posts).await
    }

    /// A user's profile with the posts `viewer_id` may see on it.
    pub async fn profile_view(&self, viewer_id: Option<&str>, owner_id: &str) -> SocialResult<ProfilePage> {
        let profile = self.users.profile(owner_id).await?;
        let relation = self.friendships.relation_view(viewer_id, owner_id).await?;

        let mut query = self
            .posts
            .query()
            .eq("author_id", owner_id)
            .order_by("created_at", SortOrder::Desc);
        let are_friends = matches!(relation, RelationView::Friends { .. });
        query = match &relation {
            RelationView::Own => query,
            RelationView::Friends { .. } => query.in_("visibility", [Visibility::Public, Visibility::Friends]),
            _ => query.eq("visibility", Visibility::Public),
        };

        let posts = self
            .posts
            .fetch_all(query)
            .await?
            .into_iter()
            .filter(|post| can_view_post(viewer_id, post, are_friends))
            .collect();
        Ok(ProfilePage {
            profile,
            relation,
            posts: self.hydrate(posts).await?,
        })
    }

    /// Every post, newest first, joined with its author.
    pub async fn all_posts(&self) -> SocialResult<Vec<FeedPost>> {
        let posts = self
            .posts
            .fetch_all(self.posts.query().order_by("created_at", SortOrder::Desc))
            .await?;
        self.hydrate(posts).await
    }

    /// Ids of every post `author_id` wrote.
    pub async fn post_ids_by(&self, author_id: &str) -> SocialResult<Vec<String>> {
        let posts = self.posts.fetch_all(self.posts.query().eq("author_id", author_id)).await?;
        Ok(posts.into_iter().map(|post| post.id).collect())
    }

    /// Delete a post together with its likes and comments.
    pub async fn remove_post(&self, post_id: &str) -> SocialResult<()> {
        let likes = self.likes.delete_where(self.likes.query().eq("post_id", post_id)).await?;
        let comments = self.comments.delete_where(self.comments.query().eq("post_id", post_id)).await?;
        let removed = self.posts.delete_where(self.posts.query().eq("id", post_id)).await?;
        if removed == 0 {
            return Err(SocialError::not_found("post", post_id));
        }
        info!("post {post_id} removed with {likes} likes and {comments} comments");
        Ok(())
    }

    async fn hydrate(&self, posts: Vec<Post>) -> SocialResult<Vec<FeedPost>> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }
        let post_ids: Vec<&str> = posts.iter().map(|post| post.id.as_str()).collect();

        let likes = self.likes.fetch_all(self.likes.query().in_("post_id", post_ids.iter().copied())).await?;
        let comments = self
            .comments
            .fetch_all(
                self.comments
                    .query()
                    .in_("post_id", post_ids.iter().copied())
                    .order_by("created_at", SortOrder::Asc),
            )
            .await?;
        let profiles = self
            .users
            .public_profiles(
                posts
                    .iter()
                    .map(|post| post.author_id.as_str())
                    .chain(comments.iter().map(|comment| comment.author_id.as_str())),
            )
            .await?;

        let mut likes_by_post: HashMap<&str, Vec<String>> = HashMap::new();
        for like in &likes {
            likes_by_post.entry(like.post_id.as_str()).or_default().push(like.user_id.clone());
        }
        let mut comments_by_post: HashMap<String, Vec<CommentView>> = HashMap::new();
        for comment in comments {
            let author = profiles.get(&comment.author_id).cloned();
            comments_by_post
                .entry(comment.post_id.clone())
                .or_default()
                .push(CommentView { comment, author });
        }

        Ok(posts
            .into_iter()
            .map(|post| FeedPost {
                author: profiles.get(&post.author_id).cloned(),
                likes: likes_by_post.remove(post.id.as_str()).unwrap_or_default(),
                comments: comments_by_post.remove(&post.id).unwrap_or_default(),
                post,
            })
            .collect())
    }
}
