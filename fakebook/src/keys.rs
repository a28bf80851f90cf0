/// Redis key layout for stored tables.
#[derive(Debug, Clone)]
pub struct KeySpace<'a> {
    pub prefix: &'a str,
}

impl<'a> KeySpace<'a> {
    pub fn new(prefix: &'a str) -> Self {
        Self { prefix }
    }

    pub fn row(&self, table: &str, row_id: &str) -> String {
        format!("{}:{}:{}", self.prefix, table, row_id)
    }

    /// Set holding every row id of a table.
    pub fn row_index(&self, table: &str) -> String {
        format!("{}:{}:_ids", self.prefix, table)
    }

    /// Counter giving each inserted row its position in the index.
    pub fn row_sequence(&self, table: &str) -> String {
        format!("{}:{}:_seq", self.prefix, table)
    }

    /// Claim key for one value of a unique constraint.
    /// Format: prefix:table:unique:constraint:value
    pub fn unique(&self, table: &str, constraint: &str, value: &str) -> String {
        format!("{}:{}:unique:{}:{}", self.prefix, table, constraint, value)
    }

    /// Pattern matching every key under the prefix.
    pub fn all(&self) -> String {
        format!("{}:*", self.prefix)
    }
}
