use crate::criteria::key::ParsedKey;
use crate::criteria::ops::Operation;
use serde_json::Value;

/// One predicate in the middle of compilation.
///
/// Created per criteria key, threaded through a mutator and a generator, and
/// dropped once its fragment and parameters have been collected.
#[derive(Debug, Clone)]
pub struct Condition {
    pub key: ParsedKey,
    /// Left-hand side SQL expression.
    pub field: String,
    pub operation: Operation,
    /// The caller's value.
    pub value: Value,
    /// Right-hand side SQL once rendered (`$3`, `($1, $2)`, `NULL`, ...).
    pub rhs: Option<String>,
    /// Parameters this condition appends.
    pub params: Vec<Value>,
    /// 1-based ordinal of the next placeholder.
    pub offset: usize,
}

impl Condition {
    pub fn new(key: ParsedKey, operation: Operation, value: Value, offset: usize) -> Self {
        Self {
            field: key.field.clone(),
            key,
            operation,
            value,
            rhs: None,
            params: Vec::new(),
            offset,
        }
    }

    /// Bind `value` as the next placeholder and return the placeholder text.
    pub(crate) fn bind(&mut self, value: Value) -> String {
        let placeholder = format!("${}", self.offset);
        self.params.push(value);
        self.offset += 1;
        placeholder
    }

    /// The finished `lhs operator rhs` fragment. A condition with no
    /// operator is a constant (`TRUE`/`FALSE`) held in `field`.
    pub fn predicate(&self) -> String {
        match (self.operation.operator, &self.rhs) {
            ("", _) => self.field.clone(),
            (op, Some(rhs)) => format!("{} {} {}", self.field, op, rhs),
            (op, None) => format!("{} {}", self.field, op),
        }
    }
}
