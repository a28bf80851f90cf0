use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod record;

use record::ParsedRecord;

/// Derive `fakebook::types::Record` and register the table.
///
/// ```text
/// #[derive(Serialize, Deserialize, Record)]
/// #[record(table = "relationships")]
/// #[record(unique(
///     name = "relationships_active_pair",
///     columns = ["requester", "recipient"],
///     unordered,
///     scope = "status",
///     active = ["pending", "accepted"],
/// ))]
/// pub struct Relationship {
///     #[record(id)]
///     pub id: String,
///     pub requester: String,
///     pub recipient: String,
///     pub status: RelationshipStatus,
/// }
/// ```
///
/// Fields may also carry `#[record(unique)]` or
/// `#[record(unique(case_insensitive))]` for a single-column constraint named
/// `{table}_{column}`. Column names follow `#[serde(rename = "...")]` and
/// fields marked `#[serde(skip)]` are not columns.
#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match ParsedRecord::from_input(&input) {
        Ok(parsed) => parsed.emit().into(),
        Err(err) => err.to_compile_error().into(),
    }
}
