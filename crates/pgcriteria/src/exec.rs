//! Running compiled statements against a client.
//!
//! ```ignore
//! use pgcriteria::{exec, ExecConfig, Entity};
//! use pgcriteria::statement::{Options, Select};
//! use serde_json::json;
//!
//! let users = Entity::table("public", "users").with_pk(&["id"]);
//! let select = Select::new(&users, &json!({"status": "active"}), Options::new())?;
//!
//! match exec::run(&client, &select, &ExecConfig::new()).await? {
//!     exec::Output::Rows(rows) => println!("{} users", rows.len()),
//!     _ => unreachable!(),
//! }
//! ```

use crate::client::{GenericClient, RowStream, StreamingClient};
use crate::config::ExecConfig;
use crate::decompose::decompose;
use crate::error::{SqlError, SqlResult};
use crate::statement::Statement;
use crate::types::{bind_params, row_to_json};
use futures_core::Stream;
use serde_json::Value;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio_postgres::types::ToSql;
use tracing::Level;

/// Result of [`run`].
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    /// `build` was set: the statement was not executed.
    Sql { sql: String, params: Vec<Value> },
    /// `single` was set: the first row, if any.
    One(Option<Value>),
    Rows(Vec<Value>),
}

impl Output {
    /// All returned rows; empty for [`Output::Sql`].
    pub fn into_rows(self) -> Vec<Value> {
        match self {
            Output::Sql { .. } => Vec::new(),
            Output::One(row) => row.into_iter().collect(),
            Output::Rows(rows) => rows,
        }
    }
}

/// Execute `stmt` and decode the result into JSON.
///
/// Honors the statement's `build`, `single` and `decompose` options.
pub async fn run<C, S>(conn: &C, stmt: &S, config: &ExecConfig) -> SqlResult<Output>
where
    C: GenericClient,
    S: Statement,
{
    let sql = stmt.format();
    let options = stmt.options();
    if options.build {
        return Ok(Output::Sql {
            sql,
            params: stmt.params().to_vec(),
        });
    }

    let bound = bind_params(stmt.params());
    let params: Vec<&(dyn ToSql + Sync)> = bound.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

    let start = Instant::now();
    let result = with_timeout(conn, config, conn.query(&sql, &params)).await;
    let elapsed = start.elapsed();
    log_statement(config, stmt, &sql, elapsed, result.as_ref().map(Vec::len).ok());
    let rows = result?;

    let objects = rows.iter().map(row_to_json).collect::<SqlResult<Vec<_>>>()?;
    let values = match &options.decompose {
        Some(schema) => decompose(schema, &objects)?,
        None => objects.into_iter().map(Value::Object).collect(),
    };

    if options.single {
        Ok(Output::One(values.into_iter().next()))
    } else {
        Ok(Output::Rows(values))
    }
}

/// Execute `stmt` and stream decoded rows.
///
/// Decomposition needs the whole result set, so it is rejected here.
pub async fn stream<C, S>(conn: &C, stmt: &S, config: &ExecConfig) -> SqlResult<JsonRowStream>
where
    C: StreamingClient,
    S: Statement,
{
    let options = stmt.options();
    if options.build {
        return Err(SqlError::usage("a build-only statement cannot be streamed"));
    }
    if options.decompose.is_some() {
        return Err(SqlError::usage("decompose is not available for streamed results"));
    }

    let sql = stmt.format();
    let bound = bind_params(stmt.params());
    let params: Vec<&(dyn ToSql + Sync)> = bound.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

    let start = Instant::now();
    let result = with_timeout(conn, config, conn.query_stream(&sql, &params)).await;
    log_statement(config, stmt, &sql, start.elapsed(), None);
    Ok(JsonRowStream { inner: result? })
}

async fn with_timeout<C, T, F>(conn: &C, config: &ExecConfig, future: F) -> SqlResult<T>
where
    C: GenericClient,
    F: std::future::Future<Output = SqlResult<T>> + Send,
{
    match config.query_timeout {
        Some(timeout) => {
            tokio::pin!(future);
            tokio::select! {
                result = &mut future => result,
                _ = tokio::time::sleep(timeout) => {
                    if let Some(cancel_token) = conn.cancel_token() {
                        tokio::spawn(async move {
                            let _ = cancel_token.cancel_query(tokio_postgres::NoTls).await;
                        });
                    }
                    Err(SqlError::Timeout(timeout))
                }
            }
        }
        None => future.await,
    }
}

fn log_statement<S: Statement>(config: &ExecConfig, stmt: &S, sql: &str, elapsed: Duration, rows: Option<usize>) {
    // Dispatch at a runtime-chosen level.
    macro_rules! emit_at_level {
        ($level:expr, $($field:tt)*) => {
            match $level {
                Level::ERROR => tracing::error!($($field)*),
                Level::WARN  => tracing::warn!($($field)*),
                Level::INFO  => tracing::info!($($field)*),
                Level::DEBUG => tracing::debug!($($field)*),
                Level::TRACE => tracing::trace!($($field)*),
            }
        };
    }

    let sql = config.truncate_sql(sql);
    let elapsed_ms = elapsed.as_millis() as u64;
    let level = if config.is_slow(elapsed) { Level::WARN } else { config.log_level };
    emit_at_level!(
        level,
        target: "pgcriteria.sql",
        kind = %stmt.kind(),
        param_count = stmt.params().len(),
        rows = ?rows,
        elapsed_ms,
        slow = config.is_slow(elapsed),
        sql = %sql,
    );
}

/// Rows of a streamed statement, decoded into JSON objects.
#[must_use]
pub struct JsonRowStream {
    inner: RowStream,
}

impl Stream for JsonRowStream {
    type Item = SqlResult<Value>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match Pin::new(&mut self.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(row))) => Poll::Ready(Some(row_to_json(&row).map(Value::Object))),
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(e))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use crate::statement::{Options, Select};
    use serde_json::json;
    use tokio_postgres::Row;

    /// A client that must never be reached.
    struct Unreachable;

    impl GenericClient for Unreachable {
        async fn query(&self, _: &str, _: &[&(dyn ToSql + Sync)]) -> SqlResult<Vec<Row>> {
            Err(SqlError::usage("query should not run"))
        }

        async fn execute(&self, _: &str, _: &[&(dyn ToSql + Sync)]) -> SqlResult<u64> {
            Err(SqlError::usage("execute should not run"))
        }
    }

    /// A client whose queries never finish.
    struct Hang;

    impl GenericClient for Hang {
        async fn query(&self, _: &str, _: &[&(dyn ToSql + Sync)]) -> SqlResult<Vec<Row>> {
            std::future::pending().await
        }

        async fn execute(&self, _: &str, _: &[&(dyn ToSql + Sync)]) -> SqlResult<u64> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn build_returns_sql_without_querying() {
        let users = Entity::table("public", "users").with_pk(&["id"]);
        let select = Select::new(&users, &json!({"id >": 3}), Options::new().build_only()).unwrap();
        let out = run(&Unreachable, &select, &ExecConfig::new()).await.unwrap();
        assert_eq!(
            out,
            Output::Sql {
                sql: r#"SELECT * FROM "public"."users" WHERE "id" > $1 ORDER BY "id""#.to_string(),
                params: vec![json!(3)],
            }
        );
        assert!(out.into_rows().is_empty());
    }

    #[tokio::test]
    async fn query_errors_propagate() {
        let users = Entity::table("public", "users").with_pk(&["id"]);
        let select = Select::new(&users, &json!({}), Options::new()).unwrap();
        let err = run(&Unreachable, &select, &ExecConfig::new()).await.unwrap_err();
        assert!(err.is_usage());
    }

    #[tokio::test]
    async fn timeout_fires() {
        let users = Entity::table("public", "users").with_pk(&["id"]);
        let select = Select::new(&users, &json!({}), Options::new()).unwrap();
        let config = ExecConfig::new().with_query_timeout(Duration::from_millis(10));
        let err = run(&Hang, &select, &config).await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn output_rows() {
        assert_eq!(Output::One(Some(json!({"a": 1}))).into_rows(), vec![json!({"a": 1})]);
        assert!(Output::One(None).into_rows().is_empty());
    }
}
