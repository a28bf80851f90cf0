//! Typed access to a [`DataStore`] table.
//!
//! `Repo<S, T>` converts between JSON rows and a [`Record`] type. Reads are
//! projected onto `T::COLUMNS` unless the query already selects columns.

use std::marker::PhantomData;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    errors::StoreError,
    query::{Query, Row},
    store::DataStore,
    types::Record,
};

/// Serialize a value into a row. Fails for anything that is not a JSON object.
pub fn to_row<T: Serialize>(value: &T) -> Result<Row, StoreError> {
    match serde_json::to_value(value).map_err(StoreError::serialization)? {
        Value::Object(row) => Ok(row),
        other => Err(StoreError::InvalidRequest {
            message: format!("expected a JSON object row, got {other}"),
        }),
    }
}

pub fn from_row<T: DeserializeOwned>(row: Row) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(row)).map_err(StoreError::serialization)
}

/// Build a patch row from `(column, value)` pairs.
pub fn patch<I, K, V>(pairs: I) -> Row
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs.into_iter().map(|(column, value)| (column.into(), value.into())).collect()
}

/// A timestamp column value, formatted the way `DateTime<Utc>` serializes.
pub fn timestamp(at: DateTime<Utc>) -> Value {
    Value::String(at.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

pub struct Repo<'s, S, T> {
    store: &'s S,
    marker: PhantomData<fn() -> T>,
}

impl<S, T> Clone for Repo<'_, S, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S, T> Copy for Repo<'_, S, T> {}

impl<'s, S, T> Repo<'s, S, T>
where
    S: DataStore,
    T: Record,
{
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            marker: PhantomData,
        }
    }

    /// Query over the record's table.
    pub fn query(&self) -> Query {
        Query::table(T::TABLE)
    }

    fn projected(query: Query) -> Query {
        if query.columns.is_some() {
            query
        } else {
            query.select(T::COLUMNS.iter().copied())
        }
    }

    pub async fn fetch_all(&self, query: Query) -> Result<Vec<T>, StoreError> {
        let rows = self.store.select(&Self::projected(query)).await?;
        rows.into_iter().map(from_row).collect()
    }

    pub async fn fetch_optional(&self, query: Query) -> Result<Option<T>, StoreError> {
        self.store.maybe_single(&Self::projected(query)).await?.map(from_row).transpose()
    }

    pub async fn get(&self, id: &str) -> Result<Option<T>, StoreError> {
        self.fetch_optional(self.query().eq("id", id)).await
    }

    pub async fn exists(&self, id: &str) -> Result<bool, StoreError> {
        let probe = self.query().select(["id"]).eq("id", id);
        Ok(self.store.maybe_single(&probe).await?.is_some())
    }

    /// Whether any row matches `query`.
    pub async fn exists_where(&self, query: Query) -> Result<bool, StoreError> {
        let probe = query.select(["id"]).limit(1);
        Ok(!self.store.select(&probe).await?.is_empty())
    }

    pub async fn insert(&self, record: &T) -> Result<T, StoreError> {
        let stored = self.store.insert(T::TABLE, to_row(record)?).await?;
        from_row(stored)
    }

    pub async fn update_where(&self, query: Query, patch: Row) -> Result<Vec<T>, StoreError> {
        let rows = self.store.update(&query, patch).await?;
        rows.into_iter().map(from_row).collect()
    }

    pub async fn delete_where(&self, query: Query) -> Result<u64, StoreError> {
        self.store.delete(&query).await
    }
}
