use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::debug;

use super::{ConstraintSet, DataStore, merge_patch, row_id};
use crate::{
    errors::StoreError,
    query::{Query, Row},
    types::UniqueConstraint,
};

/// In-process store. Tables keep insertion order.
#[derive(Debug)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<Row>>>,
    constraints: ConstraintSet,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Empty store enforcing the constraints of every registered record.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            constraints: ConstraintSet::from_registry(),
        }
    }

    /// Enforce an extra constraint on `table`.
    pub fn with_constraint(mut self, table: impl Into<String>, constraint: UniqueConstraint) -> Self {
        self.constraints.add(table, constraint);
        self
    }

    /// Number of rows currently held in `table`.
    pub fn len(&self, table: &str) -> usize {
        self.read().map(|tables| tables.get(table).map_or(0, Vec::len)).unwrap_or(0)
    }

    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Vec<Row>>>, StoreError> {
        self.tables.read().map_err(|_| StoreError::Other {
            message: "memory store lock poisoned".into(),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Vec<Row>>>, StoreError> {
        self.tables.write().map_err(|_| StoreError::Other {
            message: "memory store lock poisoned".into(),
        })
    }
}

impl DataStore for MemoryStore {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        debug!("memory select from {} ({} filters)", query.table, query.filters.len());
        let tables = self.read()?;
        let rows = tables.get(&query.table).map(|rows| rows.iter().cloned()).into_iter().flatten();
        Ok(query.apply(rows))
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError> {
        let id = row_id(&row)?.to_string();
        let mut tables = self.write()?;
        let rows = tables.entry(table.to_string()).or_default();

        if rows.iter().any(|existing| existing.get("id") == row.get("id")) {
            return Err(StoreError::UniqueViolation {
                constraint: format!("{table}_pkey"),
                existing_id: Some(id),
            });
        }
        if let Some(violation) = self.constraints.find_violation(table, &row, rows.iter()) {
            return Err(violation);
        }

        debug!("memory insert into {table} ({id})");
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, query: &Query, patch: Row) -> Result<Vec<Row>, StoreError> {
        let mut tables = self.write()?;
        let Some(rows) = tables.get_mut(&query.table) else {
            return Ok(Vec::new());
        };

        // Build the post-update table first so a violation leaves nothing half-applied.
        let mut staged = rows.clone();
        let mut touched = Vec::new();
        for (index, row) in rows.iter().enumerate() {
            if query.matches(row) {
                staged[index] = merge_patch(row, &patch)?;
                touched.push(index);
            }
        }
        for index in &touched {
            if let Some(violation) = self.constraints.find_violation(&query.table, &staged[*index], staged.iter()) {
                return Err(violation);
            }
        }

        debug!("memory update on {} touched {} rows", query.table, touched.len());
        let updated = touched.iter().map(|index| staged[*index].clone()).collect();
        *rows = staged;
        Ok(updated)
    }

    async fn delete(&self, query: &Query) -> Result<u64, StoreError> {
        let mut tables = self.write()?;
        let Some(rows) = tables.get_mut(&query.table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|row| !query.matches(row));
        let removed = (before - rows.len()) as u64;
        debug!("memory delete on {} removed {removed} rows", query.table);
        Ok(removed)
    }
}
