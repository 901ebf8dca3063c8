//! Glob-to-LIKE pattern translation
//!
//! Search values use `*` as the only wildcard. The downstream matcher
//! speaks SQL LIKE, where `%` and `_` are special and `\` escapes.

/// Returns true if `value` contains a `*` not preceded by a backslash
pub fn is_wildcard(value: &str) -> bool {
    let mut escaped = false;
    for c in value.chars() {
        match c {
            '\\' if !escaped => escaped = true,
            '*' if !escaped => return true,
            _ => escaped = false,
        }
    }
    false
}

/// Translates a glob pattern into a LIKE pattern.
///
/// `*` becomes `%`, `\*` becomes a literal `*`, and LIKE metacharacters
/// in the input are escaped.
pub fn glob_to_like(pattern: &str) -> String {
    let mut output = String::with_capacity(pattern.len() + 4);
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.peek() {
                Some('*') => {
                    chars.next();
                    output.push('*');
                }
                Some('\\') => {
                    chars.next();
                    output.push_str("\\\\");
                }
                _ => output.push_str("\\\\"),
            },
            '*' => output.push('%'),
            '%' => output.push_str("\\%"),
            '_' => output.push_str("\\_"),
            c => output.push(c),
        }
    }

    output
}
