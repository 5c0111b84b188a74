//! INSERT statement, including batch and deep (junction) inserts.

use crate::entity::Entity;
use crate::error::{SqlError, SqlResult};
use crate::ident::{Ident, quote_ident};
use crate::statement::options::Options;
use crate::statement::{Statement, StatementKind, returning};
use serde_json::{Map, Value};

/// Rows chained after the parent insert of a deep insert.
#[derive(Debug, Clone)]
struct Junction {
    table: String,
    columns: Vec<String>,
    /// Per column: `None` takes the parent's primary key, `Some(n)` is `$n`.
    rows: Vec<Vec<Option<usize>>>,
}

/// INSERT of one record or a batch.
///
/// The column list is the union of keys across all records in first-seen
/// order; a record missing a key binds `NULL` at that position.
#[derive(Debug, Clone)]
pub struct Insert {
    source: String,
    columns: Vec<String>,
    /// Number of VALUES tuples; zero columns with one row is `DEFAULT VALUES`.
    rows: usize,
    junctions: Vec<Junction>,
    parent_pk: Option<String>,
    params: Vec<Value>,
    options: Options,
}

impl Insert {
    /// `records` is a single object or an array of objects.
    pub fn new(entity: &Entity, records: &Value, options: Options) -> SqlResult<Self> {
        let records: Vec<&Map<String, Value>> = match records {
            Value::Object(map) => vec![map],
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_object()
                        .ok_or_else(|| SqlError::invalid(format!("insert records must be objects, got {item}")))
                })
                .collect::<SqlResult<_>>()?,
            other => {
                return Err(SqlError::invalid(format!(
                    "insert needs an object or an array of objects, got {other}"
                )));
            }
        };
        if records.is_empty() {
            return Err(SqlError::usage("insert needs at least one record"));
        }

        let document = options.document || entity.is_document;
        let mut insert = Self {
            source: entity.delimited_full_name(),
            columns: Vec::new(),
            rows: records.len(),
            junctions: Vec::new(),
            parent_pk: None,
            params: Vec::new(),
            options,
        };

        if insert.options.deep_insert {
            if records.len() > 1 {
                return Err(SqlError::usage("deep insert accepts a single record"));
            }
            insert.build_deep(entity, records[0])?;
        } else if document {
            insert.columns.push("body".to_string());
            insert
                .params
                .extend(records.iter().map(|r| Value::Object((*r).clone())));
        } else {
            insert.build_rows(&records)?;
        }

        tracing::trace!(
            target: "pgcriteria.sql",
            source = %insert.source,
            rows = insert.rows,
            junctions = insert.junctions.len(),
            "built insert"
        );
        Ok(insert)
    }

    fn build_rows(&mut self, records: &[&Map<String, Value>]) -> SqlResult<()> {
        for record in records {
            for key in record.keys() {
                if !self.columns.contains(key) {
                    self.columns.push(key.clone());
                }
            }
        }
        if self.columns.is_empty() && records.len() > 1 {
            return Err(SqlError::usage("cannot insert a batch of empty records"));
        }
        for record in records {
            for column in &self.columns {
                self.params.push(record.get(column).cloned().unwrap_or(Value::Null));
            }
        }
        Ok(())
    }

    /// Split the record into parent columns and junction arrays. Keys that
    /// are not columns of the entity name junction tables.
    fn build_deep(&mut self, entity: &Entity, record: &Map<String, Value>) -> SqlResult<()> {
        let [pk] = entity.pk.as_slice() else {
            return Err(SqlError::usage(format!(
                "deep insert into {} needs a single-column primary key",
                entity.delimited_full_name()
            )));
        };
        if entity.columns.is_empty() {
            return Err(SqlError::usage(format!(
                "deep insert into {} needs the entity's column list to tell junctions from columns",
                entity.delimited_full_name()
            )));
        }
        self.parent_pk = Some(pk.clone());

        let mut parent = Map::new();
        let mut junction_values = Vec::new();
        for (key, value) in record {
            if entity.has_column(key) {
                parent.insert(key.clone(), value.clone());
            } else {
                junction_values.push((key, value));
            }
        }
        self.build_rows(&[&parent])?;

        for (key, value) in junction_values {
            let Value::Array(items) = value else {
                return Err(SqlError::invalid(format!(
                    "junction '{key}' must be an array of objects"
                )));
            };
            let mut rows_in = Vec::with_capacity(items.len());
            let mut columns: Vec<String> = Vec::new();
            for item in items {
                let Value::Object(fields) = item else {
                    return Err(SqlError::invalid(format!(
                        "junction '{key}' must be an array of objects, got {item}"
                    )));
                };
                for column in fields.keys() {
                    if !columns.contains(column) {
                        columns.push(column.clone());
                    }
                }
                rows_in.push(fields);
            }

            let mut junction = Junction {
                table: Ident::parse(key)?.to_sql(),
                rows: Vec::with_capacity(rows_in.len()),
                columns,
            };
            for fields in rows_in {
                let mut row = Vec::with_capacity(junction.columns.len());
                for column in &junction.columns {
                    match fields.get(column) {
                        Some(Value::Null) => row.push(None),
                        value => {
                            self.params.push(value.cloned().unwrap_or(Value::Null));
                            row.push(Some(self.params.len()));
                        }
                    }
                }
                junction.rows.push(row);
            }
            self.junctions.push(junction);
        }
        Ok(())
    }

    fn format_insert(&self) -> String {
        let mut sql = format!("INSERT INTO {}", self.source);
        if self.columns.is_empty() {
            sql.push_str(" DEFAULT VALUES");
        } else {
            let columns: Vec<String> = self.columns.iter().map(|c| quote_ident(c)).collect();
            sql.push_str(&format!(" ({}) VALUES ", columns.join(", ")));
            let width = self.columns.len();
            let tuples: Vec<String> = (0..self.rows)
                .map(|row| {
                    let placeholders: Vec<String> =
                        (1..=width).map(|col| format!("${}", row * width + col)).collect();
                    format!("({})", placeholders.join(", "))
                })
                .collect();
            sql.push_str(&tuples.join(", "));
        }
        if self.options.on_conflict_ignore {
            sql.push_str(" ON CONFLICT DO NOTHING");
        }
        sql
    }

    fn format_deep(&self, parent_pk: &str) -> String {
        let mut ctes = vec![format!("inserted AS ({} RETURNING *)", self.format_insert())];
        let pk = quote_ident(parent_pk);
        for (j, junction) in self.junctions.iter().enumerate() {
            let columns: Vec<String> = junction.columns.iter().map(|c| quote_ident(c)).collect();
            for (r, row) in junction.rows.iter().enumerate() {
                let values: Vec<String> = row
                    .iter()
                    .map(|slot| match slot {
                        Some(n) => format!("${n}"),
                        None => pk.clone(),
                    })
                    .collect();
                ctes.push(format!(
                    "q_{j}_{r} AS (INSERT INTO {} ({}) SELECT {} FROM inserted)",
                    junction.table,
                    columns.join(", "),
                    values.join(", ")
                ));
            }
        }
        format!(
            "WITH {} SELECT {} FROM inserted",
            ctes.join(", "),
            self.options.projection()
        )
    }
}

impl Statement for Insert {
    fn format(&self) -> String {
        match &self.parent_pk {
            Some(pk) => self.format_deep(pk),
            None => format!("{}{}", self.format_insert(), returning(&self.options)),
        }
    }

    fn params(&self) -> &[Value] {
        &self.params
    }

    fn options(&self) -> &Options {
        &self.options
    }

    fn kind(&self) -> StatementKind {
        StatementKind::Insert
    }
}
