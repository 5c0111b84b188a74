//! Operator registry.
//!
//! Maps the operator text left over after key parsing onto SQL operator text
//! plus an optional value mutator.

use crate::criteria::mutators::{Mutator, build_between, build_is, equality, literalize_array};

/// A resolved operator.
#[derive(Debug, Clone, Copy)]
pub struct Operation {
    pub operator: &'static str,
    pub mutator: Option<Mutator>,
}

impl Operation {
    const fn new(operator: &'static str, mutator: Option<Mutator>) -> Self {
        Self { operator, mutator }
    }

    /// Plain equality with the IN/IS-aware mutator.
    pub const fn equality() -> Self {
        Self::new("=", Some(equality))
    }
}

/// Registered tokens, in lookup order.
pub static OPERATIONS: &[(&str, Operation)] = &[
    ("=", Operation::new("=", Some(equality))),
    ("!", Operation::new("<>", Some(equality))),
    (">", Operation::new(">", None)),
    ("<", Operation::new("<", None)),
    (">=", Operation::new(">=", None)),
    ("<=", Operation::new("<=", None)),
    ("!=", Operation::new("<>", Some(equality))),
    ("<>", Operation::new("<>", Some(equality))),
    ("between", Operation::new("BETWEEN", Some(build_between))),
    ("@>", Operation::new("@>", Some(literalize_array))),
    ("<@", Operation::new("<@", Some(literalize_array))),
    ("&&", Operation::new("&&", Some(literalize_array))),
    ("~~", Operation::new("LIKE", None)),
    ("like", Operation::new("LIKE", None)),
    ("!~~", Operation::new("NOT LIKE", None)),
    ("not like", Operation::new("NOT LIKE", None)),
    ("~~*", Operation::new("ILIKE", None)),
    ("ilike", Operation::new("ILIKE", None)),
    ("!~~*", Operation::new("NOT ILIKE", None)),
    ("not ilike", Operation::new("NOT ILIKE", None)),
    ("similar to", Operation::new("SIMILAR TO", None)),
    ("not similar to", Operation::new("NOT SIMILAR TO", None)),
    ("~", Operation::new("~", None)),
    ("!~", Operation::new("!~", None)),
    ("~*", Operation::new("~*", None)),
    ("!~*", Operation::new("!~*", None)),
    ("is", Operation::new("IS", Some(build_is))),
    ("is not", Operation::new("IS NOT", Some(build_is))),
    ("is distinct from", Operation::new("IS DISTINCT FROM", None)),
    ("is not distinct from", Operation::new("IS NOT DISTINCT FROM", None)),
];

/// Resolve normalized operator text.
///
/// Every registered token occurring anywhere in `text` is a candidate; the
/// candidate whose SQL operator text is longest wins. Equal operator lengths
/// fall back to the longer token, then to registration order. No candidate
/// means equality.
pub fn resolve(text: &str) -> Operation {
    let text = text.trim();
    if text.is_empty() {
        return Operation::equality();
    }
    let text = text.to_lowercase();

    let mut found: Option<(&str, Operation)> = None;
    for (token, op) in OPERATIONS {
        if !text.contains(token) {
            continue;
        }
        let better = match found {
            None => true,
            Some((best_token, best)) => {
                op.operator.len() > best.operator.len()
                    || (op.operator.len() == best.operator.len() && token.len() > best_token.len())
            }
        };
        if better {
            found = Some((token, *op));
        }
    }

    found.map_or_else(Operation::equality, |(_, op)| op)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(text: &str) -> &'static str {
        resolve(text).operator
    }

    #[test]
    fn empty_is_equality() {
        let o = resolve("");
        assert_eq!(o.operator, "=");
        assert!(o.mutator.is_some());
    }

    #[test]
    fn unknown_text_is_equality() {
        assert_eq!(op("frobnicate"), "=");
    }

    #[test]
    fn comparisons() {
        assert_eq!(op(">"), ">");
        assert_eq!(op(">="), ">=");
        assert_eq!(op("<="), "<=");
        assert_eq!(op("!"), "<>");
        assert_eq!(op("!="), "<>");
        assert_eq!(op("<>"), "<>");
    }

    #[test]
    fn longest_operator_wins() {
        assert_eq!(op("~~*"), "ILIKE");
        assert_eq!(op("!~~*"), "NOT ILIKE");
        assert_eq!(op("!~~"), "NOT LIKE");
        assert_eq!(op("not ilike"), "NOT ILIKE");
        assert_eq!(op("is not distinct from"), "IS NOT DISTINCT FROM");
        assert_eq!(op("not similar to"), "NOT SIMILAR TO");
    }

    #[test]
    fn regex_operators() {
        assert_eq!(op("~"), "~");
        assert_eq!(op("~*"), "~*");
        assert_eq!(op("!~*"), "!~*");
        // `!` (rendered `<>`) ties `!~` on operator length; the longer token wins.
        assert_eq!(op("!~"), "!~");
    }

    #[test]
    fn array_operators_literalize() {
        for t in ["@>", "<@", "&&"] {
            let o = resolve(t);
            assert_eq!(o.operator, t);
            assert!(o.mutator.is_some());
        }
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(op("ILIKE"), "ILIKE");
        assert_eq!(op("Between"), "BETWEEN");
        assert_eq!(op("IS NOT"), "IS NOT");
    }
}
