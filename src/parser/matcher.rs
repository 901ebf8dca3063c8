//! Syntax matchers for column text
//!
//! Pure functions: they only look at the text, never at a registry.

use std::sync::OnceLock;

use regex::Regex;

const FUNCTION_PATTERN: &str =
    r"^(?P<function>[^\(]+)\((?P<columns>.*)\)( (as|AS) (?P<alias>\w+))?$";
const TYPED_TAG_PATTERN: &str = r"^tags\[(?P<name>.*),\s*(?P<type>.*)\]$";
const TAG_PATTERN: &str = r"^tags\[(?P<name>.*)\]$";

fn compiled(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static pattern is a valid regex"))
}

/// A function call: `name(raw arguments) [as alias]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionMatch {
    pub function: String,
    /// Raw argument text between the parentheses
    pub columns: String,
    pub alias: Option<String>,
}

/// A free-form tag reference: `tags[name]` or `tags[name,type]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMatch {
    pub name: String,
    pub type_label: Option<String>,
}

/// Matches function-call syntax
pub fn match_function(text: &str) -> Option<FunctionMatch> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let captures = compiled(&PATTERN, FUNCTION_PATTERN).captures(text)?;

    Some(FunctionMatch {
        function: captures.name("function")?.as_str().to_string(),
        columns: captures
            .name("columns")
            .map_or_else(String::new, |m| m.as_str().to_string()),
        alias: captures.name("alias").map(|m| m.as_str().to_string()),
    })
}

/// Matches `tags[...]` syntax, trying the typed form first
pub fn match_tag(text: &str) -> Option<TagMatch> {
    static TYPED: OnceLock<Regex> = OnceLock::new();
    static UNTYPED: OnceLock<Regex> = OnceLock::new();

    if let Some(captures) = compiled(&TYPED, TYPED_TAG_PATTERN).captures(text) {
        return Some(TagMatch {
            name: captures.name("name")?.as_str().to_string(),
            type_label: captures.name("type").map(|m| m.as_str().to_string()),
        });
    }

    let captures = compiled(&UNTYPED, TAG_PATTERN).captures(text)?;
    Some(TagMatch {
        name: captures.name("name")?.as_str().to_string(),
        type_label: None,
    })
}

/// Splits raw argument text on top-level commas.
///
/// Commas inside double quotes or `[...]` do not split. Arguments are
/// trimmed and empty ones dropped.
pub fn parse_arguments(columns: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut escaped = false;
    let mut bracket_depth = 0usize;

    for c in columns.chars() {
        if quoted {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                quoted = false;
            }
            continue;
        }

        match c {
            '"' => {
                quoted = true;
                current.push(c);
            }
            '[' => {
                bracket_depth += 1;
                current.push(c);
            }
            ']' => {
                bracket_depth = bracket_depth.saturating_sub(1);
                current.push(c);
            }
            ',' if bracket_depth == 0 => {
                args.push(std::mem::take(&mut current));
            }
            c => current.push(c),
        }
    }
    args.push(current);

    args.into_iter()
        .map(|arg| arg.trim().to_string())
        .filter(|arg| !arg.is_empty())
        .collect()
}
