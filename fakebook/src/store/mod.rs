//! Structured-data store collaborator.
//!
//! The social services never talk to a backend directly: every read and write
//! goes through [`DataStore`], which offers projection/filter/order/limit
//! selects, a "single row or none" fetch, insert, update and delete. Stores
//! enforce the unique constraints registered for each table and report
//! violations as [`StoreError::UniqueViolation`].

mod memory;
mod redis_store;
mod scripts;

pub use self::memory::MemoryStore;
pub use self::redis_store::RedisStore;

use std::collections::HashMap;

use serde_json::Value;

use crate::{
    errors::StoreError,
    query::{Query, Row},
    registry,
    types::UniqueConstraint,
};

#[allow(async_fn_in_trait)]
pub trait DataStore {
    /// Rows matching `query`, sorted, limited and projected.
    async fn select(&self, query: &Query) -> Result<Vec<Row>, StoreError>;

    /// The single row matching `query`, or `None`.
    ///
    /// More than one match is an error rather than an arbitrary pick.
    async fn maybe_single(&self, query: &Query) -> Result<Option<Row>, StoreError> {
        let probe = query.clone().limit(2);
        let mut rows = self.select(&probe).await?;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(rows.pop()),
            found => Err(StoreError::MultipleRows {
                table: query.table.clone(),
                found,
            }),
        }
    }

    /// Insert `row` into `table`. The row must carry a string `id`.
    async fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError>;

    /// Merge `patch` into every row matching `query`; returns the updated rows.
    async fn update(&self, query: &Query, patch: Row) -> Result<Vec<Row>, StoreError>;

    /// Delete every row matching `query`; returns how many were removed.
    async fn delete(&self, query: &Query) -> Result<u64, StoreError>;
}

/// The `id` column of a row.
pub(crate) fn row_id(row: &Row) -> Result<&str, StoreError> {
    row.get("id").and_then(Value::as_str).ok_or_else(|| StoreError::InvalidRequest {
        message: "row is missing a string `id` column".to_string(),
    })
}

/// Apply `patch` on top of `row`. The id column is immutable.
pub(crate) fn merge_patch(row: &Row, patch: &Row) -> Result<Row, StoreError> {
    if let Some(new_id) = patch.get("id")
        && Some(new_id) != row.get("id")
    {
        return Err(StoreError::InvalidRequest {
            message: "the `id` column cannot be updated".to_string(),
        });
    }
    let mut merged = row.clone();
    for (column, value) in patch {
        merged.insert(column.clone(), value.clone());
    }
    Ok(merged)
}

/// Constraint catalog a store enforces, starting from the registered records.
#[derive(Debug, Clone, Default)]
pub struct ConstraintSet {
    by_table: HashMap<String, Vec<UniqueConstraint>>,
}

impl ConstraintSet {
    pub fn from_registry() -> Self {
        Self {
            by_table: registry::constraint_catalog().clone(),
        }
    }

    pub fn add(&mut self, table: impl Into<String>, constraint: UniqueConstraint) {
        let constraints = self.by_table.entry(table.into()).or_default();
        constraints.retain(|existing| existing.name != constraint.name);
        constraints.push(constraint);
    }

    pub fn for_table(&self, table: &str) -> &[UniqueConstraint] {
        self.by_table.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `(constraint name, claim key)` pairs held by `row`.
    pub fn claims(&self, table: &str, row: &Row) -> Vec<(String, String)> {
        self.for_table(table)
            .iter()
            .filter_map(|constraint| constraint.key_for(row).map(|key| (constraint.name.clone(), key)))
            .collect()
    }

    /// First violation `candidate` would cause against `others`.
    pub(crate) fn find_violation<'a, I>(&self, table: &str, candidate: &Row, others: I) -> Option<StoreError>
    where
        I: IntoIterator<Item = &'a Row> + Clone,
    {
        let candidate_id = candidate.get("id");
        for constraint in self.for_table(table) {
            let Some(key) = constraint.key_for(candidate) else {
                continue;
            };
            let clash = others
                .clone()
                .into_iter()
                .filter(|other| other.get("id") != candidate_id)
                .find(|other| constraint.key_for(other).as_deref() == Some(key.as_str()));
            if let Some(existing) = clash {
                return Some(StoreError::UniqueViolation {
                    constraint: constraint.name.clone(),
                    existing_id: existing.get("id").and_then(Value::as_str).map(str::to_string),
                });
            }
        }
        None
    }
}
