use std::borrow::Cow;
use std::collections::HashSet;

use ::redis::{AsyncCommands, aio::ConnectionManager, cmd};
use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;

use super::{ConstraintSet, DataStore, merge_patch, row_id, scripts::ROW_WRITE_SCRIPT};
use crate::{
    errors::StoreError,
    keys::KeySpace,
    query::{Query, Row},
    types::UniqueConstraint,
};

/// Redis-backed store.
///
/// Rows are JSON strings under `{prefix}:{table}:{id}`; a sorted set per table
/// keeps ids in insertion order. Every write runs through one Lua script that
/// checks the previous row image, takes the unique claims the new row needs and
/// drops the ones it no longer holds, so a row write is atomic even when
/// several clients share the database.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    prefix: String,
    constraints: ConstraintSet,
}

#[derive(Serialize)]
struct ClaimArg<'a> {
    key: String,
    constraint: &'a str,
}

#[derive(Serialize)]
struct RowWrite<'a> {
    op: &'static str,
    row_key: String,
    index_key: String,
    seq_key: String,
    row_id: &'a str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    expect_absent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    expected: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    row: Option<String>,
    claims: Vec<ClaimArg<'a>>,
    releases: Vec<String>,
}

/// Stored row alongside the exact JSON it was read from.
struct StoredRow {
    raw: String,
    row: Row,
}

enum WriteOutcome {
    Written,
    Missing,
}

impl RedisStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        Self {
            conn,
            prefix: prefix.into(),
            constraints: ConstraintSet::from_registry(),
        }
    }

    pub async fn connect(url: &str, prefix: impl Into<String>) -> Result<Self, StoreError> {
        let client = ::redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::new(conn, prefix))
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn with_constraint(mut self, table: impl Into<String>, constraint: UniqueConstraint) -> Self {
        self.constraints.add(table, constraint);
        self
    }

    /// Delete every key under the prefix. Returns the number of keys removed.
    pub async fn cleanup(&self) -> Result<u64, StoreError> {
        const SCAN_COUNT: usize = 1000;
        let mut conn = self.conn.clone();
        let pattern = KeySpace::new(&self.prefix).all();
        let mut cursor: u64 = 0;
        let mut total_deleted: u64 = 0;

        loop {
            let (next_cursor, keys): (u64, Vec<String>) = cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                let deleted: u64 = cmd("DEL").arg(&keys).query_async(&mut conn).await?;
                total_deleted += deleted;
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        debug!("redis cleanup removed {total_deleted} keys under {}", self.prefix);
        Ok(total_deleted)
    }

    async fn load_table(&self, table: &str) -> Result<Vec<StoredRow>, StoreError> {
        let keys = KeySpace::new(&self.prefix);
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn.zrange(keys.row_index(table), 0, -1).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let row_keys: Vec<String> = ids.iter().map(|id| keys.row(table, id)).collect();
        let raws: Vec<Option<String>> = cmd("MGET").arg(&row_keys).query_async(&mut conn).await?;

        let mut rows = Vec::with_capacity(raws.len());
        for (id, raw) in ids.iter().zip(raws) {
            // Indexed but gone: deleted between ZRANGE and MGET.
            let Some(raw) = raw else {
                continue;
            };
            match serde_json::from_str::<Value>(&raw).map_err(StoreError::serialization)? {
                Value::Object(row) => rows.push(StoredRow { raw, row }),
                _ => warn!("skipping non-object row {table}:{id}"),
            }
        }
        Ok(rows)
    }

    fn claim_args<'c>(&'c self, table: &str, row: &Row) -> Vec<ClaimArg<'c>> {
        let keys = KeySpace::new(&self.prefix);
        self.constraints
            .for_table(table)
            .iter()
            .filter_map(|constraint| {
                constraint.key_for(row).map(|value| ClaimArg {
                    key: keys.unique(table, &constraint.name, &value),
                    constraint: constraint.name.as_str(),
                })
            })
            .collect()
    }

    async fn run_write(&self, table: &str, write: &RowWrite<'_>) -> Result<WriteOutcome, StoreError> {
        let payload = serde_json::to_string(write).map_err(|err| StoreError::Other {
            message: Cow::Owned(format!("failed to serialize row write: {err}")),
        })?;

        let mut conn = self.conn.clone();
        let mut invocation = ROW_WRITE_SCRIPT.prepare_invoke();
        invocation.arg(payload);
        let raw: String = invocation.invoke_async(&mut conn).await?;

        let value: Value = serde_json::from_str(&raw).map_err(|err| StoreError::Other {
            message: Cow::Owned(format!("failed to parse lua response: {err}")),
        })?;

        let Some(error) = value.get("error") else {
            return Ok(WriteOutcome::Written);
        };
        let text = |field: &str| value.get(field).and_then(Value::as_str).map(str::to_string);
        match error.as_str() {
            Some("unique_constraint_violation") => {
                let constraint = match text("constraint").as_deref() {
                    Some("pkey") | None => format!("{table}_pkey"),
                    Some(name) => name.to_string(),
                };
                Err(StoreError::UniqueViolation {
                    constraint,
                    existing_id: text("existing_id"),
                })
            }
            Some("conflict") => Err(StoreError::Conflict {
                row_id: text("row_id").unwrap_or_else(|| write.row_id.to_string()),
            }),
            Some("row_not_found") => Ok(WriteOutcome::Missing),
            Some(other) => Err(StoreError::Other {
                message: Cow::Owned(other.to_string()),
            }),
            None => Err(StoreError::Other {
                message: Cow::Borrowed("lua_error"),
            }),
        }
    }
}

impl DataStore for RedisStore {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        let rows = self.load_table(&query.table).await?;
        debug!("redis select from {} scanned {} rows", query.table, rows.len());
        Ok(query.apply(rows.into_iter().map(|stored| stored.row)))
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError> {
        let id = row_id(&row)?;
        let keys = KeySpace::new(&self.prefix);
        let write = RowWrite {
            op: "put",
            row_key: keys.row(table, id),
            index_key: keys.row_index(table),
            seq_key: keys.row_sequence(table),
            row_id: id,
            expect_absent: true,
            expected: None,
            row: Some(serde_json::to_string(&row).map_err(StoreError::serialization)?),
            claims: self.claim_args(table, &row),
            releases: Vec::new(),
        };
        self.run_write(table, &write).await?;
        debug!("redis insert into {table} ({id})");
        Ok(row)
    }

    async fn update(&self, query: &Query, patch: Row) -> Result<Vec<Row>, StoreError> {
        let table = query.table.as_str();
        let keys = KeySpace::new(&self.prefix);
        let mut updated = Vec::new();

        for stored in self.load_table(table).await? {
            if !query.matches(&stored.row) {
                continue;
            }
            let merged = merge_patch(&stored.row, &patch)?;
            let id = row_id(&merged)?.to_string();
            let claims = self.claim_args(table, &merged);
            let kept: HashSet<&str> = claims.iter().map(|claim| claim.key.as_str()).collect();
            let releases = self
                .claim_args(table, &stored.row)
                .into_iter()
                .map(|claim| claim.key)
                .filter(|key| !kept.contains(key.as_str()))
                .collect();

            let write = RowWrite {
                op: "put",
                row_key: keys.row(table, &id),
                index_key: keys.row_index(table),
                seq_key: keys.row_sequence(table),
                row_id: &id,
                expect_absent: false,
                expected: Some(&stored.raw),
                row: Some(serde_json::to_string(&merged).map_err(StoreError::serialization)?),
                claims,
                releases,
            };
            match self.run_write(table, &write).await? {
                WriteOutcome::Written => updated.push(merged),
                // Deleted since we read it: the write raced a delete.
                WriteOutcome::Missing => {
                    return Err(StoreError::Conflict { row_id: id.clone() });
                }
            }
        }

        debug!("redis update on {table} touched {} rows", updated.len());
        Ok(updated)
    }

    async fn delete(&self, query: &Query) -> Result<u64, StoreError> {
        let table = query.table.as_str();
        let keys = KeySpace::new(&self.prefix);
        let mut removed = 0;

        for stored in self.load_table(table).await? {
            if !query.matches(&stored.row) {
                continue;
            }
            let id = row_id(&stored.row)?;
            let write = RowWrite {
                op: "delete",
                row_key: keys.row(table, id),
                index_key: keys.row_index(table),
                seq_key: keys.row_sequence(table),
                row_id: id,
                expect_absent: false,
                expected: Some(&stored.raw),
                row: None,
                claims: Vec::new(),
                releases: self
                    .claim_args(table, &stored.row)
                    .into_iter()
                    .map(|claim| claim.key)
                    .collect(),
            };
            if let WriteOutcome::Written = self.run_write(table, &write).await? {
                removed += 1;
            }
        }

        debug!("redis delete on {table} removed {removed} rows");
        Ok(removed)
    }
}
