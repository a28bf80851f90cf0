//! Table auto-registration via the inventory crate.
//!
//! `#[derive(Record)]` submits a [`TableRegistration`] for every record type.
//! Stores read the merged catalog at construction to learn which unique
//! constraints they must enforce.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::types::UniqueConstraint;

/// Metadata submitted to the inventory by the `Record` derive macro.
pub struct TableRegistration {
    /// The name of the record type (e.g., "Relationship")
    pub type_name: &'static str,
    /// The table the record is stored in
    pub table: &'static str,
    /// Function returning the constraints declared on the record
    pub constraints_fn: fn() -> Vec<UniqueConstraint>,
}

inventory::collect!(TableRegistration);

static CATALOG: OnceLock<HashMap<String, Vec<UniqueConstraint>>> = OnceLock::new();

/// All registered record types.
pub fn registered_tables() -> impl Iterator<Item = &'static TableRegistration> {
    inventory::iter::<TableRegistration>()
}

/// Get a registration by record type name.
pub fn get_table_by_type(type_name: &str) -> Option<&'static TableRegistration> {
    registered_tables().find(|entry| entry.type_name == type_name)
}

/// Unique constraints per table, merged across every record type of the table.
///
/// Several record types may project the same table; constraints are
/// de-duplicated by name.
pub fn constraint_catalog() -> &'static HashMap<String, Vec<UniqueConstraint>> {
    CATALOG.get_or_init(|| {
        let mut catalog: HashMap<String, Vec<UniqueConstraint>> = HashMap::new();
        for entry in registered_tables() {
            let constraints = catalog.entry(entry.table.to_string()).or_default();
            for constraint in (entry.constraints_fn)() {
                if !constraints.iter().any(|existing| existing.name == constraint.name) {
                    constraints.push(constraint);
                }
            }
        }
        catalog
    })
}

/// Constraints declared for `table`.
pub fn constraints_for(table: &str) -> Vec<UniqueConstraint> {
    constraint_catalog().get(table).cloned().unwrap_or_default()
}
