use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

/// A row type stored in one table of a [`DataStore`](crate::store::DataStore).
///
/// This trait is implemented by `#[derive(Record)]`. `COLUMNS` doubles as the
/// column projection used whenever the typed layer reads the table, so a
/// narrower struct over the same table (for example a public profile) reads
/// only the columns it declares.
pub trait Record: Serialize + DeserializeOwned {
    /// Table the rows live in.
    const TABLE: &'static str;

    /// Column names, in declaration order.
    const COLUMNS: &'static [&'static str];

    /// Identifier of this row.
    fn record_id(&self) -> &str;

    /// Unique constraints declared on the table through this record type.
    fn unique_constraints() -> Vec<UniqueConstraint> {
        Vec::new()
    }
}

/// Restricts a unique constraint to rows whose `column` holds one of `active`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintScope {
    pub column: String,
    pub active: Vec<String>,
}

/// Describes a unique constraint on one or more columns.
///
/// `unordered` makes the key independent of column order, so `(a, b)` and
/// `(b, a)` collide. With a `scope`, only rows whose scope column holds an
/// active value take part; other rows never conflict. Null column values never
/// conflict either.
///
/// ```
/// use fakebook::types::UniqueConstraint;
/// use serde_json::json;
///
/// let pair = UniqueConstraint::new("active_pair", ["requester", "recipient"])
///     .unordered()
///     .scoped("status", ["pending", "accepted"]);
///
/// let row = json!({"requester": "b", "recipient": "a", "status": "pending"});
/// assert_eq!(pair.key_for(row.as_object().unwrap()).as_deref(), Some("a|b"));
///
/// let rejected = json!({"requester": "b", "recipient": "a", "status": "rejected"});
/// assert_eq!(pair.key_for(rejected.as_object().unwrap()), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueConstraint {
    pub name: String,
    pub columns: Vec<String>,
    pub case_insensitive: bool,
    pub unordered: bool,
    pub scope: Option<ConstraintScope>,
}

impl UniqueConstraint {
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            case_insensitive: false,
            unordered: false,
            scope: None,
        }
    }

    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    pub fn unordered(mut self) -> Self {
        self.unordered = true;
        self
    }

    pub fn scoped<I, S>(mut self, column: impl Into<String>, active: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scope = Some(ConstraintScope {
            column: column.into(),
            active: active.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// The claim key this row holds under the constraint, if it takes part.
    pub fn key_for(&self, row: &Map<String, Value>) -> Option<String> {
        if let Some(scope) = &self.scope {
            let current = row.get(&scope.column).and_then(Value::as_str)?;
            if !scope.active.iter().any(|active| active == current) {
                return None;
            }
        }

        let mut parts = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let part = match row.get(column) {
                None | Some(Value::Null) => return None,
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            };
            parts.push(if self.case_insensitive { part.to_lowercase() } else { part });
        }
        if self.unordered {
            parts.sort();
        }
        Some(parts.join("|"))
    }
}
