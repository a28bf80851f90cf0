//! # Row queries
//!
//! A small structured-query model shared by every [`DataStore`](crate::store::DataStore):
//! column projection, filter predicates, ordering and a row limit.
//!
//! | Builder call                 | Meaning                                  |
//! |------------------------------|------------------------------------------|
//! | `select(["id", "name"])`     | Project the returned rows onto columns   |
//! | `eq("status", "pending")`    | Column equals value                      |
//! | `in_("id", ids)`             | Column is one of the values              |
//! | `or([group, group])`         | Any of the predicate groups matches      |
//! | `order_by("created_at", Desc)` | Sort (later calls break ties)          |
//! | `limit(100)`                 | Keep at most N rows after sorting        |
//!
//! Every predicate added to a query is ANDed with the others.
//!
//! ```
//! use fakebook::query::{Filter, Query, SortOrder};
//!
//! // (requester = a AND recipient = b) OR (requester = b AND recipient = a)
//! let query = Query::table("relationships")
//!     .or([
//!         Filter::and([Filter::eq("requester", "a"), Filter::eq("recipient", "b")]),
//!         Filter::and([Filter::eq("requester", "b"), Filter::eq("recipient", "a")]),
//!     ])
//!     .order_by("updated_at", SortOrder::Desc)
//!     .limit(1);
//! assert_eq!(query.limit, Some(1));
//! ```

use std::cmp::Ordering;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A stored row: column name to JSON value.
pub type Row = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// A composable row predicate.
///
/// Missing columns compare as `null`. An empty `And` matches every row, an
/// empty `Or` or `In` matches none.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { column: String, value: Value },
    In { column: String, values: Vec<Value> },
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    #[inline]
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            column: column.into(),
            value: value.into(),
        }
    }

    #[inline]
    pub fn in_<V: Into<Value>>(column: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    #[inline]
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        Self::And(filters.into_iter().collect())
    }

    #[inline]
    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        Self::Or(filters.into_iter().collect())
    }

    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Filter::Eq { column, value } => row.get(column).unwrap_or(&Value::Null) == value,
            Filter::In { column, values } => {
                let current = row.get(column).unwrap_or(&Value::Null);
                values.iter().any(|candidate| candidate == current)
            }
            Filter::And(filters) => filters.iter().all(|filter| filter.matches(row)),
            Filter::Or(filters) => filters.iter().any(|filter| filter.matches(row)),
        }
    }
}

/// A select (or mutation target) over one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    /// `None` selects every column.
    pub columns: Option<Vec<String>>,
    pub filters: Vec<Filter>,
    pub order: Vec<(String, SortOrder)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: None,
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Filter::eq(column, value))
    }

    pub fn in_<V: Into<Value>>(self, column: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        self.filter(Filter::in_(column, values))
    }

    pub fn or(self, groups: impl IntoIterator<Item = Filter>) -> Self {
        self.filter(Filter::or(groups))
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.order.push((column.into(), order));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.filters.iter().all(|filter| filter.matches(row))
    }

    /// Filter, sort, truncate and project `rows`.
    ///
    /// Sorting is stable, so rows that compare equal keep their input order.
    pub fn apply<I>(&self, rows: I) -> Vec<Row>
    where
        I: IntoIterator<Item = Row>,
    {
        let mut selected: Vec<Row> = rows.into_iter().filter(|row| self.matches(row)).collect();
        if !self.order.is_empty() {
            let chronological: Vec<bool> = self
                .order
                .iter()
                .map(|(column, _)| is_timestamp_column(&selected, column))
                .collect();
            selected.sort_by(|left, right| {
                for ((column, order), &chronological) in self.order.iter().zip(&chronological) {
                    let ordering = compare_values(left.get(column), right.get(column), chronological);
                    let ordering = match order {
                        SortOrder::Asc => ordering,
                        SortOrder::Desc => ordering.reverse(),
                    };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
        }
        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected.into_iter().map(|row| self.project(row)).collect()
    }

    /// Keep only the selected columns of `row`.
    pub fn project(&self, row: Row) -> Row {
        match &self.columns {
            None => row,
            Some(columns) => row.into_iter().filter(|(key, _)| columns.contains(key)).collect(),
        }
    }
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value).ok()
}

/// Whether every string `column` holds across `rows` is an RFC 3339 timestamp.
fn is_timestamp_column(rows: &[Row], column: &str) -> bool {
    rows.iter()
        .filter_map(|row| row.get(column).and_then(Value::as_str))
        .all(|value| parse_timestamp(value).is_some())
}

/// Total order used for sorting column values.
///
/// Nulls sort first. With `chronological` set, strings compare as RFC 3339
/// timestamps, since serialized timestamps vary in fractional digits. The flag
/// must hold for the whole column or not at all; otherwise strings compare
/// lexically.
pub fn compare_values(left: Option<&Value>, right: Option<&Value>, chronological: bool) -> Ordering {
    match (left, right) {
        (Some(Value::String(a)), Some(Value::String(b))) => {
            if chronological && let (Some(a), Some(b)) = (parse_timestamp(a), parse_timestamp(b)) {
                a.cmp(&b)
            } else {
                a.cmp(b)
            }
        }
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let a = a.as_f64().unwrap_or(f64::NAN);
            let b = b.as_f64().unwrap_or(f64::NAN);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (a, b) => type_rank(a).cmp(&type_rank(b)),
    }
}
