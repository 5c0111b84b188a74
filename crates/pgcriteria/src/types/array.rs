//! Postgres array-literal parsing (`{a,"b c",NULL}`).

use serde_json::Value;

/// Parse an array literal into JSON: elements become strings, unquoted
/// `NULL` becomes `null`, nested braces become nested arrays.
///
/// Returns `None` when `s` is not a well-formed literal.
pub fn parse_array_literal(s: &str) -> Option<Vec<Value>> {
    let mut chars = s.trim().chars().peekable();
    if chars.next() != Some('{') {
        return None;
    }
    let items = parse_items(&mut chars)?;
    if chars.next().is_some() {
        return None;
    }
    Some(items)
}

type Chars<'a> = std::iter::Peekable<std::str::Chars<'a>>;

/// Parse after an opening `{` through the matching `}`.
fn parse_items(chars: &mut Chars<'_>) -> Option<Vec<Value>> {
    let mut items = Vec::new();
    if chars.peek() == Some(&'}') {
        chars.next();
        return Some(items);
    }
    loop {
        let item = match chars.peek()? {
            '{' => {
                chars.next();
                Value::Array(parse_items(chars)?)
            }
            '"' => {
                chars.next();
                let mut out = String::new();
                loop {
                    match chars.next()? {
                        '\\' => out.push(chars.next()?),
                        '"' => break,
                        c => out.push(c),
                    }
                }
                Value::String(out)
            }
            _ => {
                let mut out = String::new();
                while let Some(&c) = chars.peek() {
                    if c == ',' || c == '}' {
                        break;
                    }
                    out.push(c);
                    chars.next();
                }
                let out = out.trim();
                if out.eq_ignore_ascii_case("null") {
                    Value::Null
                } else {
                    Value::String(out.to_string())
                }
            }
        };
        items.push(item);
        match chars.next()? {
            ',' => continue,
            '}' => return Some(items),
            _ => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::mutators::array_literal;
    use serde_json::json;

    #[test]
    fn parses_plain_and_quoted() {
        assert_eq!(
            parse_array_literal(r#"{a,"b c",NULL,"null","q\"x"}"#),
            Some(vec![json!("a"), json!("b c"), Value::Null, json!("null"), json!("q\"x")])
        );
    }

    #[test]
    fn parses_empty_and_nested() {
        assert_eq!(parse_array_literal("{}"), Some(vec![]));
        assert_eq!(
            parse_array_literal("{{1,2},{3}}"),
            Some(vec![json!(["1", "2"]), json!(["3"])])
        );
    }

    #[test]
    fn rejects_malformed() {
        assert_eq!(parse_array_literal("a,b"), None);
        assert_eq!(parse_array_literal("{a,b"), None);
        assert_eq!(parse_array_literal("{a}x"), None);
    }

    #[test]
    fn reads_what_the_literalizer_writes() {
        let lit = array_literal(&[json!("with space"), json!(""), json!("a,b"), json!("back\\slash")]);
        assert_eq!(
            parse_array_literal(&lit),
            Some(vec![json!("with space"), json!(""), json!("a,b"), json!("back\\slash")])
        );
    }
}
