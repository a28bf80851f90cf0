pub(crate) use fakebook::{
    Authenticator, DataStore, DuplicateReason, MemoryStore, Query, Repo, Row, SocialError, StoreError,
    models::{Relationship, RelationshipStatus, UserProfile, Visibility},
    social::{
        Engagement, EngagementProjection, FriendshipManager, LikeState, NewPost, NewUser, PostService, RelationView,
        UserDirectory,
    },
};
pub(crate) use std::sync::{
    Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

pub(crate) async fn register<S: DataStore>(store: &S, name: &str) -> UserProfile {
    let auth = Authenticator::new(store);
    UserDirectory::new(store)
        .register(
            &auth,
            NewUser {
                name: name.to_string(),
                email: format!("{}@example.com", name.to_lowercase()),
                password: "password-1".to_string(),
                avatar_url: None,
            },
        )
        .await
        .expect("register user")
}

/// Accepted friendship between `a` and `b`.
pub(crate) async fn befriend<S: DataStore>(store: &S, a: &UserProfile, b: &UserProfile) -> Relationship {
    let friendships = FriendshipManager::new(store);
    let request = friendships.send_request(&a.id, &b.id).await.expect("send request");
    friendships.accept(&request.id, &b.id).await.expect("accept")
}

pub(crate) fn text_post(content: &str, visibility: Visibility) -> NewPost {
    NewPost {
        content: Some(content.to_string()),
        image_url: None,
        visibility,
    }
}

/// Keeps consecutive timestamps apart so newest-first assertions are stable.
pub(crate) fn pause() {
    std::thread::sleep(std::time::Duration::from_millis(2));
}

/// A store that answers the next few selects on one table with no rows,
/// as if another writer had not committed yet.
pub(crate) struct BlindStore {
    pub(crate) inner: MemoryStore,
    table: &'static str,
    blind_selects: AtomicUsize,
}

impl BlindStore {
    pub(crate) fn new(table: &'static str) -> Self {
        Self {
            inner: MemoryStore::new(),
            table,
            blind_selects: AtomicUsize::new(0),
        }
    }

    pub(crate) fn blind_next(&self, selects: usize) {
        self.blind_selects.store(selects, Ordering::SeqCst);
    }
}

impl DataStore for BlindStore {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        if query.table == self.table
            && self
                .blind_selects
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_ok()
        {
            return Ok(Vec::new());
        }
        self.inner.select(query).await
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError> {
        self.inner.insert(table, row).await
    }

    async fn update(&self, query: &Query, patch: Row) -> Result<Vec<Row>, StoreError> {
        self.inner.update(query, patch).await
    }

    async fn delete(&self, query: &Query) -> Result<u64, StoreError> {
        self.inner.delete(query).await
    }
}

/// A store whose writes fail while `failing` is set.
pub(crate) struct FlakyStore {
    pub(crate) inner: MemoryStore,
    failing: AtomicBool,
}

impl FlakyStore {
    pub(crate) fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            failing: AtomicBool::new(false),
        }
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Remote {
                code: "503".to_string(),
                message: "service unavailable".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

impl DataStore for FlakyStore {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        self.inner.select(query).await
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError> {
        self.check()?;
        self.inner.insert(table, row).await
    }

    async fn update(&self, query: &Query, patch: Row) -> Result<Vec<Row>, StoreError> {
        self.check()?;
        self.inner.update(query, patch).await
    }

    async fn delete(&self, query: &Query) -> Result<u64, StoreError> {
        self.check()?;
        self.inner.delete(query).await
    }
}

/// A write another client commits between our read and our next update.
struct CompetingWrite {
    query: Query,
    patch: Row,
    report_conflict: bool,
}

/// A store where a competing write lands just before the next update.
///
/// With `report_conflict` the update then fails the way a compare-and-set
/// store reports a stale row image, instead of simply matching nothing.
pub(crate) struct InterleavedStore {
    pub(crate) inner: MemoryStore,
    competing: Mutex<Option<CompetingWrite>>,
}

impl InterleavedStore {
    pub(crate) fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            competing: Mutex::new(None),
        }
    }

    /// Apply `patch` to relationship `id` right before the next update.
    pub(crate) fn before_next_update(&self, id: &str, patch: Row) {
        self.arm(id, patch, false);
    }

    /// Like `before_next_update`, then fail that update with a conflict.
    pub(crate) fn conflict_on_next_update(&self, id: &str, patch: Row) {
        self.arm(id, patch, true);
    }

    fn arm(&self, id: &str, patch: Row, report_conflict: bool) {
        *self.competing.lock().expect("competing write lock") = Some(CompetingWrite {
            query: Query::table("relationships").eq("id", id),
            patch,
            report_conflict,
        });
    }
}

impl DataStore for InterleavedStore {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        self.inner.select(query).await
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError> {
        self.inner.insert(table, row).await
    }

    async fn update(&self, query: &Query, patch: Row) -> Result<Vec<Row>, StoreError> {
        let competing = self.competing.lock().expect("competing write lock").take();
        if let Some(write) = competing {
            let written = self.inner.update(&write.query, write.patch).await?;
            if write.report_conflict {
                let row_id = written
                    .first()
                    .and_then(|row| row.get("id"))
                    .and_then(|id| id.as_str())
                    .unwrap_or_default()
                    .to_string();
                return Err(StoreError::Conflict { row_id });
            }
        }
        self.inner.update(query, patch).await
    }

    async fn delete(&self, query: &Query) -> Result<u64, StoreError> {
        self.inner.delete(query).await
    }
}
