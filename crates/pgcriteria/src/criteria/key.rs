//! Predicate key tokenizer.
//!
//! A criteria key such as `"json field".array[1].nested::boolean <=` carries a
//! column, an optional JSON path, an optional cast, and trailing operator text.
//! [`parse_key`] splits it in one left-to-right pass.

use crate::criteria::mutators::literalize_element;
use crate::ident::{quote_ident, write_quoted};

/// Shape of a JSON path step, decided by the separator that introduced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathToken {
    /// Introduced by `.`: an object key, always rendered quoted.
    Key(String),
    /// Introduced by `[`: an array index.
    Index(String),
}

impl PathToken {
    pub fn text(&self) -> &str {
        match self {
            PathToken::Key(s) | PathToken::Index(s) => s,
        }
    }
}

/// The result of tokenizing one predicate key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedKey {
    /// The column name exactly as written (quotes removed).
    pub raw_field: String,
    /// The rendered SQL expression: quoted column, JSON path and cast.
    pub field: String,
    /// Remaining operator text, lowercased and single-spaced. Empty means equality.
    pub operation_text: String,
    pub is_json: bool,
    pub path: Vec<PathToken>,
    pub cast: Option<String>,
}

impl ParsedKey {
    /// Render the JSON path (without cast) against the document `body`
    /// column: the column name becomes the first path step.
    pub fn body_path(&self) -> String {
        let mut path = Vec::with_capacity(self.path.len() + 1);
        path.push(PathToken::Key(self.raw_field.clone()));
        path.extend(self.path.iter().cloned());
        render_path(&quote_ident("body"), &path)
    }

    /// Like [`ParsedKey::body_path`], with the key's own cast applied.
    pub fn body_field(&self) -> String {
        apply_cast(self.body_path(), true, self.cast.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Field,
    Key,
    Index,
    Cast,
}

/// Tokenize a predicate key. Never fails: unparseable remainders simply
/// become operator text that resolves to equality.
pub fn parse_key(key: &str) -> ParsedKey {
    let key = key.trim();
    let mut raw_field = String::new();
    let mut path: Vec<PathToken> = Vec::new();
    let mut cast: Option<String> = None;

    let mut slot = Slot::Field;
    let mut buf = String::new();
    let mut in_quotes = false;
    let mut rest_at = key.len();

    let mut chars = key.char_indices().peekable();
    while let Some((i, ch)) = chars.next() {
        if in_quotes {
            if ch == '"' {
                in_quotes = false;
            } else {
                buf.push(ch);
            }
            continue;
        }

        match ch {
            '"' => in_quotes = true,
            '.' => {
                flush(slot, &mut buf, &mut raw_field, &mut path, &mut cast);
                slot = Slot::Key;
            }
            '[' | ']' if slot == Slot::Cast => buf.push(ch),
            '[' => {
                flush(slot, &mut buf, &mut raw_field, &mut path, &mut cast);
                slot = Slot::Index;
            }
            ']' => {
                flush(slot, &mut buf, &mut raw_field, &mut path, &mut cast);
            }
            ':' if matches!(chars.peek(), Some((_, ':'))) && cast.is_none() => {
                chars.next();
                flush(slot, &mut buf, &mut raw_field, &mut path, &mut cast);
                slot = Slot::Cast;
            }
            c if c.is_whitespace() => {
                rest_at = i;
                break;
            }
            c => buf.push(c),
        }
    }
    flush(slot, &mut buf, &mut raw_field, &mut path, &mut cast);

    let operation_text = key[rest_at..]
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    let base = render_path(&quote_ident(&raw_field), &path);
    let field = apply_cast(base, !path.is_empty(), cast.as_deref());

    ParsedKey {
        raw_field,
        field,
        operation_text,
        is_json: !path.is_empty(),
        path,
        cast,
    }
}

fn flush(
    slot: Slot,
    buf: &mut String,
    raw_field: &mut String,
    path: &mut Vec<PathToken>,
    cast: &mut Option<String>,
) {
    let token = std::mem::take(buf);
    match slot {
        Slot::Field => raw_field.push_str(&token),
        _ if token.is_empty() => {}
        Slot::Key => path.push(PathToken::Key(token)),
        Slot::Index => path.push(PathToken::Index(token)),
        Slot::Cast => *cast = Some(token),
    }
}

/// `"col"->>'key'`, `"col"->>0`, or `"col"#>>'{a,b,c}'` for deeper paths.
pub(crate) fn render_path(base: &str, path: &[PathToken]) -> String {
    match path {
        [] => base.to_string(),
        [PathToken::Key(k)] => format!("{base}->>{}", quote_literal(k)),
        [PathToken::Index(idx)] if is_index(idx) => format!("{base}->>{idx}"),
        [PathToken::Index(idx)] => format!("{base}->>{}", quote_literal(idx)),
        _ => {
            let steps: Vec<String> = path
                .iter()
                .map(|t| literalize_element(t.text()))
                .collect();
            format!("{base}#>>{}", quote_literal(&format!("{{{}}}", steps.join(","))))
        }
    }
}

fn apply_cast(expr: String, wrap: bool, cast: Option<&str>) -> String {
    let Some(ty) = cast else { return expr };
    let ty = cast_type(ty);
    if wrap {
        format!("({expr})::{ty}")
    } else {
        format!("{expr}::{ty}")
    }
}

/// Cast names made of ordinary type-name characters pass through; anything
/// else is delimited so it can only ever name a (likely missing) type.
fn cast_type(ty: &str) -> String {
    let plain = !ty.is_empty()
        && ty
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '[' | ']' | '(' | ')' | ','));
    if plain {
        ty.to_string()
    } else {
        let mut out = String::new();
        write_quoted(ty, &mut out);
        out
    }
}

fn is_index(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

/// Single-quoted SQL string literal.
pub(crate) fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}
