//! DSL Operations for cell values
//!
//! Each mapping may carry one transform, applied to the extracted cell text.
//! `Replace` and `Concat` arguments are looked up as row columns first and
//! fall back to their literal text. The lookup ignores case but not
//! whitespace, and blank arguments are always literal.

use regex::{NoExpand, RegexBuilder};
use std::fmt;

use crate::models::RowView;

/// A compiled transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transform {
    /// Remove leading and trailing whitespace
    Trim,

    /// Convert to uppercase
    Upper,

    /// Convert to lowercase
    Lower,

    /// Digits only, first five kept
    Zip5,

    /// Digits only, last ten kept
    Phone10,

    /// First N characters
    Left(usize),

    /// Last N characters
    Right(usize),

    /// Case-insensitive literal replacement
    Replace { search: String, replacement: String },

    /// Append each argument in order
    Concat(Vec<String>),
}

impl Transform {
    /// Apply this transform to a cell value.
    pub fn apply(&self, value: &str, row: &RowView<'_>) -> String {
        match self {
            Transform::Trim => value.trim().to_string(),
            Transform::Upper => value.to_uppercase(),
            Transform::Lower => value.to_lowercase(),
            Transform::Zip5 => digits(value).chars().take(5).collect(),
            Transform::Phone10 => apply_phone10(value),
            Transform::Left(n) => value.chars().take(*n).collect(),
            Transform::Right(n) => apply_right(value, *n),
            Transform::Replace { search, replacement } => {
                apply_replace(value, resolve_arg(search, row), resolve_arg(replacement, row))
            }
            Transform::Concat(args) => {
                let mut out = value.to_string();
                for arg in args {
                    out.push_str(resolve_arg(arg, row));
                }
                out
            }
        }
    }

    /// Verb name as written in profiles.
    pub fn verb(&self) -> &'static str {
        match self {
            Transform::Trim => "Trim",
            Transform::Upper => "Upper",
            Transform::Lower => "Lower",
            Transform::Zip5 => "Zip5",
            Transform::Phone10 => "Phone10",
            Transform::Left(_) => "Left",
            Transform::Right(_) => "Right",
            Transform::Replace { .. } => "Replace",
            Transform::Concat(_) => "Concat",
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::Left(n) | Transform::Right(n) => write!(f, "{}({})", self.verb(), n),
            Transform::Replace { search, replacement } => {
                write!(f, "Replace({}, {})", quote(search), quote(replacement))
            }
            Transform::Concat(args) => {
                let args: Vec<String> = args.iter().map(|a| quote(a)).collect();
                write!(f, "Concat({})", args.join(", "))
            }
            _ => f.write_str(self.verb()),
        }
    }
}

/// Row value when the argument names a column exactly, else the argument itself.
fn resolve_arg<'a>(arg: &'a str, row: &RowView<'a>) -> &'a str {
    row.get_exact(arg).unwrap_or(arg)
}

fn digits(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn apply_phone10(value: &str) -> String {
    let d = digits(value);
    if d.len() <= 10 {
        d
    } else {
        d[d.len() - 10..].to_string()
    }
}

fn apply_right(value: &str, n: usize) -> String {
    let count = value.chars().count();
    if count <= n {
        return value.to_string();
    }
    value.chars().skip(count - n).collect()
}

fn apply_replace(value: &str, search: &str, replacement: &str) -> String {
    if search.is_empty() {
        return value.to_string();
    }
    match RegexBuilder::new(&regex::escape(search))
        .case_insensitive(true)
        .build()
    {
        Ok(re) => re.replace_all(value, NoExpand(replacement)).into_owned(),
        Err(_) => value.to_string(),
    }
}

fn quote(arg: &str) -> String {
    if arg.is_empty() || arg.trim() != arg || arg.contains(',') || arg.contains('"') {
        format!("\"{}\"", arg.replace('"', "\"\""))
    } else {
        arg.to_string()
    }
}

/// Description of all transforms, for `crmload transforms`.
pub fn transforms_description() -> String {
    r#"Available transforms (one per mapping, verbs are case-insensitive):

| Transform | Description |
|-----------|-------------|
| Trim | Remove leading/trailing whitespace |
| Upper | Convert to uppercase |
| Lower | Convert to lowercase |
| Zip5 | Keep digits, first 5 ("12345-6789" -> "12345") |
| Phone10 | Keep digits, last 10 ("+1 (555) 123-4567" -> "5551234567") |
| Left(n) | First n characters |
| Right(n) | Last n characters |
| Replace(search, replacement) | Case-insensitive literal replace |
| Concat(arg, ...) | Append each argument to the value |

Replace and Concat arguments that name an input column are replaced by that
row's value; anything else is used literally. Quote arguments to keep
spaces or commas:

  Concat(" ", Last Name)
  Replace("St.", "Street")"#
        .to_string()
}
