//! Transform text parsing.
//!
//! `Verb` or `Verb(arg, arg, ...)`. Arguments are trimmed unless quoted;
//! inside quotes `""` is a literal quote.

use super::operations::Transform;
use crate::error::{ConfigError, ConfigResult};

impl Transform {
    /// Parse and check a transform written on `field`'s mapping.
    pub fn parse(text: &str, field: &str) -> ConfigResult<Transform> {
        let text = text.trim();
        let syntax_error = |message: &str| ConfigError::TransformSyntax {
            field: field.to_string(),
            text: text.to_string(),
            message: message.to_string(),
        };

        let (verb, args) = match text.find('(') {
            None => (text, Vec::new()),
            Some(open) => {
                let inner = text[open + 1..]
                    .strip_suffix(')')
                    .ok_or_else(|| syntax_error("missing closing ')'"))?;
                let args = split_args(inner).map_err(|m| syntax_error(m))?;
                (text[..open].trim(), args)
            }
        };

        if verb.is_empty() {
            return Err(syntax_error("missing transform name"));
        }

        let arity = |expected: &str| ConfigError::TransformArity {
            field: field.to_string(),
            verb: verb.to_string(),
            expected: expected.to_string(),
            actual: args.len(),
        };

        let lower = verb.to_lowercase();
        let transform = match lower.as_str() {
            "trim" | "upper" | "uppercase" | "lower" | "lowercase" | "zip5" | "phone10" => {
                if !args.is_empty() {
                    return Err(arity("0"));
                }
                match lower.as_str() {
                    "trim" => Transform::Trim,
                    "upper" | "uppercase" => Transform::Upper,
                    "lower" | "lowercase" => Transform::Lower,
                    "zip5" => Transform::Zip5,
                    _ => Transform::Phone10,
                }
            }
            "left" | "right" => {
                if args.len() != 1 {
                    return Err(arity("1"));
                }
                let n = args[0]
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| ConfigError::TransformArgument {
                        field: field.to_string(),
                        verb: verb.to_string(),
                        value: args[0].clone(),
                    })?;
                if lower == "left" {
                    Transform::Left(n)
                } else {
                    Transform::Right(n)
                }
            }
            "replace" => {
                if args.len() != 2 {
                    return Err(arity("2"));
                }
                let mut args = args.into_iter();
                Transform::Replace {
                    search: args.next().unwrap_or_default(),
                    replacement: args.next().unwrap_or_default(),
                }
            }
            "concat" => {
                if args.is_empty() {
                    return Err(arity("at least 1"));
                }
                Transform::Concat(args)
            }
            _ => {
                return Err(ConfigError::UnknownTransform {
                    field: field.to_string(),
                    verb: verb.to_string(),
                })
            }
        };

        Ok(transform)
    }
}

/// Split a comma-separated argument list, honouring double quotes.
fn split_args(inner: &str) -> Result<Vec<String>, &'static str> {
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut args = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut was_quoted = false;
    let mut chars = inner.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    quoted = false;
                }
            }
            '"' if current.trim().is_empty() && !was_quoted => {
                current.clear();
                quoted = true;
                was_quoted = true;
            }
            ',' if !quoted => {
                args.push(finish_arg(&current, was_quoted));
                current.clear();
                was_quoted = false;
            }
            _ if was_quoted && !quoted => {
                if !c.is_whitespace() {
                    return Err("unexpected text after quoted argument");
                }
            }
            _ => current.push(c),
        }
    }

    if quoted {
        return Err("unterminated quote");
    }
    args.push(finish_arg(&current, was_quoted));
    Ok(args)
}

fn finish_arg(raw: &str, was_quoted: bool) -> String {
    if was_quoted {
        raw.to_string()
    } else {
        raw.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_verbs() {
        assert_eq!(Transform::parse("Trim", "f").unwrap(), Transform::Trim);
        assert_eq!(Transform::parse("uppercase", "f").unwrap(), Transform::Upper);
        assert_eq!(Transform::parse(" PHONE10 ", "f").unwrap(), Transform::Phone10);
        assert_eq!(Transform::parse("Zip5()", "f").unwrap(), Transform::Zip5);
    }

    #[test]
    fn test_parse_numeric_argument() {
        assert_eq!(Transform::parse("Left(3)", "f").unwrap(), Transform::Left(3));
        assert_eq!(Transform::parse("right( 4 )", "f").unwrap(), Transform::Right(4));

        let err = Transform::parse("Left(-1)", "Zip").unwrap_err();
        assert!(matches!(err, ConfigError::TransformArgument { ref field, .. } if field == "Zip"));
        assert!(Transform::parse("Left(abc)", "f").is_err());
    }

    #[test]
    fn test_parse_quoted_arguments() {
        assert_eq!(
            Transform::parse(r#"Concat(" ", Last Name)"#, "f").unwrap(),
            Transform::Concat(vec![" ".into(), "Last Name".into()])
        );
        assert_eq!(
            Transform::parse(r#"Replace("a,b", "say ""hi""")"#, "f").unwrap(),
            Transform::Replace {
                search: "a,b".into(),
                replacement: "say \"hi\"".into()
            }
        );
        assert_eq!(
            Transform::parse("Replace(-, )", "f").unwrap(),
            Transform::Replace {
                search: "-".into(),
                replacement: "".into()
            }
        );
    }

    #[test]
    fn test_unknown_verb() {
        let err = Transform::parse("Titlecase", "Name").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownTransform { ref verb, .. } if verb == "Titlecase"));
    }

    #[test]
    fn test_wrong_arity() {
        assert!(matches!(
            Transform::parse("Trim(1)", "f"),
            Err(ConfigError::TransformArity { actual: 1, .. })
        ));
        assert!(matches!(
            Transform::parse("Replace(a)", "f"),
            Err(ConfigError::TransformArity { actual: 1, .. })
        ));
        assert!(matches!(
            Transform::parse("Concat()", "f"),
            Err(ConfigError::TransformArity { actual: 0, .. })
        ));
        assert!(matches!(
            Transform::parse("Left()", "f"),
            Err(ConfigError::TransformArity { actual: 0, .. })
        ));
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(
            Transform::parse("Left(3", "f"),
            Err(ConfigError::TransformSyntax { .. })
        ));
        assert!(matches!(
            Transform::parse(r#"Concat("abc)"#, "f"),
            Err(ConfigError::TransformSyntax { .. })
        ));
        assert!(matches!(
            Transform::parse("(3)", "f"),
            Err(ConfigError::TransformSyntax { .. })
        ));
    }

    #[test]
    fn test_display_parses_back() {
        let t = Transform::Replace {
            search: " St".into(),
            replacement: "Street, North".into(),
        };
        assert_eq!(Transform::parse(&t.to_string(), "f").unwrap(), t);
    }
}
