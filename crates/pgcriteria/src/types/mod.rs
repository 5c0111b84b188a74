//! JSON ↔ Postgres value conversion for the execution adapter.
//!
//! Parameters are bound with [`PgValue`], which encodes a JSON value for
//! whatever type the server inferred for its placeholder. Result rows are
//! decoded column by column into JSON with [`row_to_json`].

mod array;
mod row;
mod value;

pub use array::parse_array_literal;
pub use row::{JsonCell, row_to_json};
pub use value::{PgValue, bind_params};
