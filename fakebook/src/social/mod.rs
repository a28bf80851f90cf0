//! Social services over a [`DataStore`](crate::store::DataStore).
//!
//! Every operation takes the acting user id explicitly. Nothing caches state
//! between calls except [`EngagementProjection`], which callers rebuild after
//! each reload.

mod admin;
mod engagement;
mod friendship;
mod posts;
mod projection;
mod users;
mod visibility;

pub use admin::AdminPanel;
pub use engagement::{Engagement, LikeState};
pub use friendship::{FriendshipManager, RelationView, RelationshipEntry, Snapshot};
pub use posts::{CommentView, FeedPost, NewPost, PostService, ProfilePage};
pub use projection::EngagementProjection;
pub use users::{NewUser, ProfileUpdate, UserDirectory};
pub use visibility::can_view_post;
