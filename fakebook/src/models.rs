//! Stored records.
//!
//! Each struct maps one table through `#[derive(Record)]`. `PublicProfile` is a
//! narrower view over `users`: reading it only fetches the columns it names.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Record;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Record)]
#[record(table = "users")]
pub struct UserProfile {
    #[record(id)]
    pub id: String,
    pub name: String,
    /// Stored lowercase.
    #[record(unique(case_insensitive))]
    pub email: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Profile fields other users may see next to a relationship, post or comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Record)]
#[record(table = "users")]
pub struct PublicProfile {
    #[record(id)]
    pub id: String,
    pub name: String,
    #[record(unique(case_insensitive))]
    pub email: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl From<UserProfile> for PublicProfile {
    fn from(profile: UserProfile) -> Self {
        Self {
            id: profile.id,
            name: profile.name,
            email: profile.email,
            avatar_url: profile.avatar_url,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Record)]
#[record(table = "credentials")]
pub struct Credential {
    #[record(id)]
    pub id: String,
    #[record(unique(case_insensitive))]
    pub email: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipStatus {
    Pending,
    Accepted,
    Rejected,
}

impl RelationshipStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            RelationshipStatus::Pending => "pending",
            RelationshipStatus::Accepted => "accepted",
            RelationshipStatus::Rejected => "rejected",
        }
    }

    /// Pending and accepted rows occupy the pair; rejected ones do not.
    pub const fn is_active(self) -> bool {
        matches!(self, RelationshipStatus::Pending | RelationshipStatus::Accepted)
    }
}

impl fmt::Display for RelationshipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<RelationshipStatus> for Value {
    fn from(status: RelationshipStatus) -> Self {
        Value::String(status.as_str().to_string())
    }
}

/// A directed friendship record between two users.
///
/// At most one pending or accepted row may exist per unordered pair. A rejected
/// row stays behind and is reused when either user asks again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Record)]
#[record(table = "relationships")]
#[record(unique(
    name = "relationships_active_pair",
    columns = ["requester", "recipient"],
    unordered,
    scope = "status",
    active = ["pending", "accepted"],
))]
pub struct Relationship {
    #[record(id)]
    pub id: String,
    pub requester: String,
    pub recipient: String,
    pub status: RelationshipStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Relationship {
    pub fn involves(&self, user_id: &str) -> bool {
        self.requester == user_id || self.recipient == user_id
    }

    /// The other party, when `user_id` is one of the two.
    pub fn counterpart(&self, user_id: &str) -> Option<&str> {
        if self.requester == user_id {
            Some(&self.recipient)
        } else if self.recipient == user_id {
            Some(&self.requester)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Friends,
    Private,
}

impl Visibility {
    pub const fn as_str(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Friends => "friends",
            Visibility::Private => "private",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(Visibility::Public),
            "friends" => Ok(Visibility::Friends),
            "private" => Ok(Visibility::Private),
            other => Err(format!("unknown visibility '{other}' (expected public, friends or private)")),
        }
    }
}

impl From<Visibility> for Value {
    fn from(visibility: Visibility) -> Self {
        Value::String(visibility.as_str().to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Record)]
#[record(table = "posts")]
pub struct Post {
    #[record(id)]
    pub id: String,
    pub author_id: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Record)]
#[record(table = "likes")]
#[record(unique(name = "likes_post_user", columns = ["post_id", "user_id"]))]
pub struct Like {
    #[record(id)]
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Record)]
#[record(table = "comments")]
pub struct Comment {
    #[record(id)]
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
