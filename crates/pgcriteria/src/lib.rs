//! # pgcriteria
//!
//! Compile JSON criteria objects into parameterized PostgreSQL.
//!
//! ## Features
//!
//! - **Criteria as data**: `{"age >": 21, "or": [...]}` becomes a WHERE clause with `$n` placeholders
//! - **JSON traversal**: `"body.name"` and `"body.tags[0]"` keys address into `json`/`jsonb` columns
//! - **Statement builders**: SELECT (offset and keyset paging), INSERT (batch and deep), UPDATE, DELETE
//! - **Document tables**: treat a single `jsonb` column as the record body
//! - **Decomposition**: fold joined result rows back into nested objects
//! - **Transaction-friendly**: pass a transaction anywhere a `GenericClient` is expected
//!
//! ## Criteria
//!
//! ```rust
//! use pgcriteria::where_clause;
//! use serde_json::json;
//!
//! let w = where_clause(&json!({"name ilike": "a%", "tags @>": ["x"]}))?;
//! assert_eq!(w.conditions, r#""name" ILIKE $1 AND "tags" @> $2"#);
//!
//! let w = where_clause(&json!({"body.name": "x", "body.tags[0]": "y"}))?;
//! assert_eq!(w.conditions, r##""body"->>'name' = $1 AND "body"#>>'{tags,0}' = $2"##);
//! # Ok::<(), pgcriteria::SqlError>(())
//! ```
//!
//! ## Statements
//!
//! ```ignore
//! use pgcriteria::{exec, Entity, ExecConfig};
//! use pgcriteria::statement::{Options, OrderBy, Select, Update};
//! use serde_json::json;
//!
//! let users = Entity::table("public", "users").with_pk(&["id"]);
//!
//! // SELECT
//! let page = Select::new(
//!     &users,
//!     &json!({"status": "active"}),
//!     Options::new().with_order(OrderBy::field("created_at").desc()).with_limit(10),
//! )?;
//! let rows = exec::run(&client, &page, &ExecConfig::new()).await?.into_rows();
//!
//! // UPDATE
//! let update = Update::new(&users, &json!({"status": "inactive"}), &json!({"id": 7}), Options::new())?;
//! exec::run(&client, &update, &ExecConfig::new()).await?;
//! ```

pub mod client;
pub mod config;
pub mod criteria;
pub mod decompose;
pub mod entity;
pub mod error;
pub mod exec;
pub mod ident;
pub mod statement;
pub mod types;

pub use client::{GenericClient, RowStream, StreamingClient};
pub use config::ExecConfig;
pub use criteria::{Criteria, CriteriaItem, Generator, WhereClause, compile_where, where_clause};
pub use decompose::{DecomposeSchema, decompose};
pub use entity::Entity;
pub use error::{SqlError, SqlResult};
pub use exec::{JsonRowStream, Output, run, stream};
pub use ident::{Ident, quote_ident};
pub use statement::{Delete, Insert, Options, OrderBy, Select, Statement, StatementKind, Update};
pub use types::{PgValue, bind_params, row_to_json};
