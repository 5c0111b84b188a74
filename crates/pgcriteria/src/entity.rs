use crate::ident::write_quoted;

/// Read-only description of a table or view the statement builders target.
///
/// Builders only borrow the descriptor; whatever discovers the schema owns it.
///
/// # Example
///
/// ```rust
/// use pgcriteria::Entity;
///
/// let users = Entity::table("public", "users")
///     .with_pk(&["id"])
///     .with_columns(&["id", "name", "email"]);
///
/// assert_eq!(users.delimited_full_name(), r#""public"."users""#);
/// assert!(users.has_column("email"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub schema: String,
    pub name: String,
    pub pk: Vec<String>,
    pub columns: Vec<String>,
    /// Document table: semantic fields live in the JSON `body` column.
    pub is_document: bool,
}

impl Entity {
    /// A table in `schema`. Add the primary key with [`Entity::with_pk`].
    pub fn table(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            pk: Vec::new(),
            columns: Vec::new(),
            is_document: false,
        }
    }

    /// A view; views carry no primary key.
    pub fn view(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self::table(schema, name)
    }

    /// A document table: `id` primary key plus a JSONB `body` column.
    pub fn document(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            is_document: true,
            ..Self::table(schema, name)
                .with_pk(&["id"])
                .with_columns(&["id", "body", "search", "created_at", "updated_at"])
        }
    }

    pub fn with_pk(mut self, pk: &[&str]) -> Self {
        self.pk = pk.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|s| s.to_string()).collect();
        self
    }

    /// `"schema"."name"`, or just `"name"` when the schema is empty.
    pub fn delimited_full_name(&self) -> String {
        let mut out = String::with_capacity(self.schema.len() + self.name.len() + 5);
        if !self.schema.is_empty() {
            write_quoted(&self.schema, &mut out);
            out.push('.');
        }
        write_quoted(&self.name, &mut out);
        out
    }

    /// Views (and anything else without a primary key).
    pub fn is_view(&self) -> bool {
        self.pk.is_empty()
    }

    pub fn is_pk(&self, field: &str) -> bool {
        self.pk.iter().any(|pk| pk == field)
    }

    /// Whether `field` is a known column. An entity without a column list
    /// accepts every name.
    pub fn has_column(&self, field: &str) -> bool {
        self.columns.is_empty() || self.columns.iter().any(|c| c == field)
    }

    /// Quoted, comma-separated primary key list: `"a", "b"`.
    pub(crate) fn delimited_pk(&self) -> String {
        let mut out = String::new();
        for (i, pk) in self.pk.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            write_quoted(pk, &mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_without_schema() {
        let e = Entity::table("", "things");
        assert_eq!(e.delimited_full_name(), r#""things""#);
    }

    #[test]
    fn view_has_no_pk() {
        let v = Entity::view("public", "active_users");
        assert!(v.is_view());
        assert_eq!(v.delimited_pk(), "");
    }

    #[test]
    fn composite_pk_list() {
        let e = Entity::table("public", "memberships").with_pk(&["user_id", "group_id"]);
        assert_eq!(e.delimited_pk(), r#""user_id", "group_id""#);
        assert!(e.is_pk("group_id"));
        assert!(!e.is_pk("id"));
    }

    #[test]
    fn empty_column_list_accepts_anything() {
        let e = Entity::table("public", "t");
        assert!(e.has_column("whatever"));
        let e = e.with_columns(&["a"]);
        assert!(!e.has_column("whatever"));
    }

    #[test]
    fn document_table_defaults() {
        let d = Entity::document("public", "docs");
        assert!(d.is_document);
        assert_eq!(d.pk, vec!["id".to_string()]);
        assert!(d.has_column("body"));
    }
}
