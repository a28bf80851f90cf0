//! Friend requests and friendships.
//!
//! A relationship row moves through `pending -> accepted` or
//! `pending -> rejected`. A rejected row is reused when either user asks again,
//! so the pair keeps one identifier. Unfriending deletes the row.
//!
//! The store's `relationships_active_pair` constraint is what ultimately keeps
//! a pair down to one pending or accepted row; the lookups done here only turn
//! the common cases into friendlier errors before writing.

use chrono::Utc;
use log::{debug, info, warn};
use serde::Serialize;

use super::{
    users::UserDirectory,
    visibility::{can_view_post, needs_friendship},
};
use crate::{
    errors::{DuplicateReason, SocialError, SocialResult, StoreError},
    id::generate_row_id,
    models::{Post, PublicProfile, Relationship, RelationshipStatus},
    query::{Filter, Query, SortOrder},
    repository::{Repo, patch, timestamp},
    store::DataStore,
};

/// A relationship together with the other user's public profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationshipEntry {
    #[serde(flatten)]
    pub relationship: Relationship,
    /// `None` when the other user has no profile any more.
    pub counterpart: Option<PublicProfile>,
}

/// A list read once from the store.
///
/// It yields each entry a single time and cannot be restarted; read the list
/// again after a state change to see the new state.
#[derive(Debug)]
pub struct Snapshot<T> {
    items: std::vec::IntoIter<T>,
}

impl<T> Snapshot<T> {
    fn new(items: Vec<T>) -> Self {
        Self {
            items: items.into_iter(),
        }
    }
}

impl<T> Iterator for Snapshot<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.items.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.items.size_hint()
    }
}

impl<T> ExactSizeIterator for Snapshot<T> {}

/// Where a viewer stands relative to a profile owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RelationView {
    /// Nobody is signed in.
    Anonymous,
    /// The viewer is the owner.
    Own,
    Friends { relationship_id: String },
    /// The viewer asked and the owner has not answered yet.
    RequestSent { relationship_id: String },
    /// The owner asked and the viewer has not answered yet.
    RequestReceived { relationship_id: String },
    Rejected { relationship_id: String },
    Strangers,
}

pub struct FriendshipManager<'s, S> {
    relationships: Repo<'s, S, Relationship>,
    users: UserDirectory<'s, S>,
}

/// Both directions of the pair `(a, b)`.
fn pair_filter(a: &str, b: &str) -> Filter {
    Filter::or([
        Filter::and([Filter::eq("requester", a), Filter::eq("recipient", b)]),
        Filter::and([Filter::eq("requester", b), Filter::eq("recipient", a)]),
    ])
}

impl<'s, S: DataStore> FriendshipManager<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self {
            relationships: Repo::new(store),
            users: UserDirectory::new(store),
        }
    }

    fn pair_query(&self, a: &str, b: &str) -> Query {
        self.relationships
            .query()
            .filter(pair_filter(a, b))
            .order_by("updated_at", SortOrder::Desc)
    }

    async fn pair_rows(&self, a: &str, b: &str) -> SocialResult<Vec<Relationship>> {
        Ok(self.relationships.fetch_all(self.pair_query(a, b)).await?)
    }

    async fn load(&self, relationship_id: &str) -> SocialResult<Relationship> {
        self.relationships
            .get(relationship_id)
            .await?
            .ok_or_else(|| SocialError::not_found("relationship", relationship_id))
    }

    /// Ask `recipient_id` to become friends with `requester_id`.
    ///
    /// A rejected relationship between the two is reset to pending with the
    /// new direction instead of inserting a second row.
    pub async fn send_request(&self, requester_id: &str, recipient_id: &str) -> SocialResult<Relationship> {
        if requester_id == recipient_id {
            return Err(SocialError::SelfRequest);
        }
        if !self.users.exists(recipient_id).await? {
            return Err(SocialError::not_found("user", recipient_id));
        }

        let rows = self.pair_rows(requester_id, recipient_id).await?;
        if let Some(active) = rows.iter().find(|row| row.status.is_active()) {
            let reason = match active.status {
                RelationshipStatus::Accepted => DuplicateReason::Accepted,
                _ => DuplicateReason::Pending,
            };
            debug!("request {requester_id} -> {recipient_id} refused: {reason}");
            return Err(SocialError::duplicate(reason, Some(active.clone())));
        }

        let now = Utc::now();
        if let Some(rejected) = rows.into_iter().next() {
            return self.resubmit(rejected, requester_id, recipient_id).await;
        }

        let relationship = Relationship {
            id: generate_row_id(),
            requester: requester_id.to_string(),
            recipient: recipient_id.to_string(),
            status: RelationshipStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        match self.relationships.insert(&relationship).await {
            Ok(stored) => {
                info!("friend request {} sent: {requester_id} -> {recipient_id}", stored.id);
                Ok(stored)
            }
            Err(err) if err.is_unique_violation() => {
                warn!("friend request {requester_id} -> {recipient_id} lost a race: {err}");
                Err(self.race_duplicate(requester_id, recipient_id).await)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Reset a rejected row to pending, keeping its id.
    async fn resubmit(&self, rejected: Relationship, requester_id: &str, recipient_id: &str) -> SocialResult<Relationship> {
        let changes = patch([
            ("requester", serde_json::Value::from(requester_id)),
            ("recipient", serde_json::Value::from(recipient_id)),
            ("status", RelationshipStatus::Pending.into()),
            ("updated_at", timestamp(Utc::now())),
        ]);
        let target = self
            .relationships
            .query()
            .eq("id", rejected.id.as_str())
            .eq("status", RelationshipStatus::Rejected);

        match self.relationships.update_where(target, changes).await {
            Ok(mut updated) => match updated.pop() {
                Some(stored) => {
                    info!("friend request {} re-sent: {requester_id} -> {recipient_id}", stored.id);
                    Ok(stored)
                }
                // The row left the rejected state between our read and write.
                None => {
                    warn!("relationship {} changed before it could be re-sent", rejected.id);
                    Err(self.race_duplicate(requester_id, recipient_id).await)
                }
            },
            Err(err) if err.is_unique_violation() || matches!(err, StoreError::Conflict { .. }) => {
                warn!("re-sending relationship {} lost a race: {err}", rejected.id);
                Err(self.race_duplicate(requester_id, recipient_id).await)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// The duplicate error for a write the store refused, with the winning row if it can be read.
    async fn race_duplicate(&self, a: &str, b: &str) -> SocialError {
        let existing = match self.pair_rows(a, b).await {
            Ok(rows) => rows
                .iter()
                .find(|row| row.status.is_active())
                .or(rows.first())
                .cloned(),
            Err(err) => {
                debug!("could not read back relationship {a} / {b}: {err}");
                None
            }
        };
        SocialError::duplicate(DuplicateReason::DbDuplicate, existing)
    }

    /// Send a request to the user registered under `email`.
    pub async fn send_request_by_email(&self, requester_id: &str, email: &str) -> SocialResult<Relationship> {
        let target = self
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(|| SocialError::not_found("user", email.trim()))?;
        self.send_request(requester_id, &target.id).await
    }

    /// Move a pending row to `status`, guarded on it still being pending.
    async fn answer(&self, relationship: Relationship, status: RelationshipStatus) -> SocialResult<Relationship> {
        let changes = patch([
            ("status", serde_json::Value::from(status)),
            ("updated_at", timestamp(Utc::now())),
        ]);
        let target = self
            .relationships
            .query()
            .eq("id", relationship.id.as_str())
            .eq("status", RelationshipStatus::Pending);
        let stored = match self.relationships.update_where(target, changes).await {
            Ok(mut updated) => updated.pop(),
            // Another writer changed the row after our read.
            Err(StoreError::Conflict { row_id }) => {
                warn!("relationship {row_id} changed before it could become {status}");
                None
            }
            Err(err) => return Err(err.into()),
        };
        let stored = stored.ok_or_else(|| SocialError::not_authorized("the request is no longer pending"))?;
        info!("relationship {} is now {}", stored.id, stored.status);
        Ok(stored)
    }

    /// Accept a pending request. Only its recipient may.
    pub async fn accept(&self, relationship_id: &str, acting_user_id: &str) -> SocialResult<Relationship> {
        let relationship = self.load(relationship_id).await?;
        if relationship.recipient != acting_user_id {
            return Err(SocialError::not_authorized("only the recipient can accept a request"));
        }
        if relationship.status != RelationshipStatus::Pending {
            return Err(SocialError::not_authorized("only pending requests can be accepted"));
        }
        self.answer(relationship, RelationshipStatus::Accepted).await
    }

    /// Reject a pending request. Either party may.
    pub async fn reject(&self, relationship_id: &str, acting_user_id: &str) -> SocialResult<Relationship> {
        let relationship = self.load(relationship_id).await?;
        if !relationship.involves(acting_user_id) {
            return Err(SocialError::not_authorized("only a party to the request can reject it"));
        }
        if relationship.status != RelationshipStatus::Pending {
            return Err(SocialError::not_authorized("only pending requests can be rejected"));
        }
        self.answer(relationship, RelationshipStatus::Rejected).await
    }

    /// Withdraw a request the acting user sent.
    pub async fn cancel(&self, relationship_id: &str, acting_user_id: &str) -> SocialResult<Relationship> {
        let relationship = self.load(relationship_id).await?;
        if relationship.requester != acting_user_id {
            return Err(SocialError::not_authorized("only the requester can cancel a request"));
        }
        if relationship.status != RelationshipStatus::Pending {
            return Err(SocialError::not_authorized("only pending requests can be cancelled"));
        }
        self.answer(relationship, RelationshipStatus::Rejected).await
    }

    /// End a friendship. The row is deleted outright.
    pub async fn unfriend(&self, relationship_id: &str, acting_user_id: &str) -> SocialResult<()> {
        let relationship = self.load(relationship_id).await?;
        if relationship.status != RelationshipStatus::Accepted {
            return Err(SocialError::not_authorized("only accepted friendships can be removed"));
        }
        if !relationship.involves(acting_user_id) {
            return Err(SocialError::not_authorized("only a friend can remove the friendship"));
        }

        let target = self
            .relationships
            .query()
            .eq("id", relationship_id)
            .eq("status", RelationshipStatus::Accepted);
        if self.relationships.delete_where(target).await? == 0 {
            return Err(SocialError::not_authorized("the friendship no longer exists"));
        }
        info!("relationship {relationship_id} removed by {acting_user_id}");
        Ok(())
    }

    async fn entries(&self, user_id: &str, query: Query) -> SocialResult<Snapshot<RelationshipEntry>> {
        let rows = self.relationships.fetch_all(query).await?;
        let profiles = self
            .users
            .public_profiles(rows.iter().filter_map(|row| row.counterpart(user_id)))
            .await?;
        let entries = rows
            .into_iter()
            .map(|relationship| {
                let counterpart = relationship
                    .counterpart(user_id)
                    .and_then(|other| profiles.get(other).cloned());
                RelationshipEntry {
                    relationship,
                    counterpart,
                }
            })
            .collect();
        Ok(Snapshot::new(entries))
    }

    /// Pending requests addressed to `user_id`, newest first.
    pub async fn list_incoming(&self, user_id: &str) -> SocialResult<Snapshot<RelationshipEntry>> {
        let query = self
            .relationships
            .query()
            .eq("recipient", user_id)
            .eq("status", RelationshipStatus::Pending)
            .order_by("updated_at", SortOrder::Desc);
        self.entries(user_id, query).await
    }

    /// Pending requests `user_id` sent, newest first.
    pub async fn list_outgoing(&self, user_id: &str) -> SocialResult<Snapshot<RelationshipEntry>> {
        let query = self
            .relationships
            .query()
            .eq("requester", user_id)
            .eq("status", RelationshipStatus::Pending)
            .order_by("updated_at", SortOrder::Desc);
        self.entries(user_id, query).await
    }

    /// Accepted relationships `user_id` takes part in, in either role.
    pub async fn list_friends(&self, user_id: &str) -> SocialResult<Snapshot<RelationshipEntry>> {
        let query = self
            .relationships
            .query()
            .or([Filter::eq("requester", user_id), Filter::eq("recipient", user_id)])
            .eq("status", RelationshipStatus::Accepted)
            .order_by("updated_at", SortOrder::Desc);
        self.entries(user_id, query).await
    }

    /// Ids of everyone `user_id` is friends with.
    pub async fn friend_ids(&self, user_id: &str) -> SocialResult<Vec<String>> {
        Ok(self
            .list_friends(user_id)
            .await?
            .filter_map(|entry| entry.relationship.counterpart(user_id).map(str::to_string))
            .collect())
    }

    /// The relationship between `a` and `b`: the active one if there is
    /// one, otherwise the most recently updated.
    pub async fn relationship_between(&self, a: &str, b: &str) -> SocialResult<Option<Relationship>> {
        let rows = self.pair_rows(a, b).await?;
        let active = rows.iter().position(|row| row.status.is_active());
        Ok(match active {
            Some(index) => rows.into_iter().nth(index),
            None => rows.into_iter().next(),
        })
    }

    pub async fn are_friends(&self, a: &str, b: &str) -> SocialResult<bool> {
        if a == b {
            return Ok(false);
        }
        let probe = self
            .relationships
            .query()
            .filter(pair_filter(a, b))
            .eq("status", RelationshipStatus::Accepted);
        Ok(self.relationships.exists_where(probe).await?)
    }

    pub async fn relation_view(&self, viewer_id: Option<&str>, owner_id: &str) -> SocialResult<RelationView> {
        let Some(viewer_id) = viewer_id else {
            return Ok(RelationView::Anonymous);
        };
        if viewer_id == owner_id {
            return Ok(RelationView::Own);
        }
        let Some(relationship) = self.relationship_between(viewer_id, owner_id).await? else {
            return Ok(RelationView::Strangers);
        };
        let relationship_id = relationship.id;
        Ok(match relationship.status {
            RelationshipStatus::Accepted => RelationView::Friends { relationship_id },
            RelationshipStatus::Pending if relationship.requester == viewer_id => {
                RelationView::RequestSent { relationship_id }
            }
            RelationshipStatus::Pending => RelationView::RequestReceived { relationship_id },
            RelationshipStatus::Rejected => RelationView::Rejected { relationship_id },
        })
    }

    /// Whether `viewer_id` may see `post`, looking up the friendship only
    /// when the post's visibility depends on it.
    pub async fn can_view_post(&self, viewer_id: Option<&str>, post: &Post) -> SocialResult<bool> {
        let are_friends = match viewer_id {
            Some(viewer) if needs_friendship(viewer_id, post) => self.are_friends(viewer, &post.author_id).await?,
            _ => false,
        };
        Ok(can_view_post(viewer_id, post, are_friends))
    }
}
