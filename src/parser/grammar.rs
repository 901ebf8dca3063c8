//! Event search grammar
//!
//! ```text
//! query      := term*
//! term       := "(" query ")" | "AND" | "OR" | filter
//! filter     := ["!"] key ":" [operator] value
//! operator   := ">=" | "<=" | "!=" | ">" | "<" | "="
//! value      := quoted | list | bare
//! list       := "[" value ("," value)* "]"
//! ```
//!
//! Keys in function-call syntax produce aggregate comparisons. Plain keys
//! ask the field-type callback how to type their values.

use serde_json::Value;

use crate::search::{
    AggregateFilter, BooleanOperator, ParsedTerm, SearchFilter, SearchResult, SearchType,
};

use super::matcher::match_function;
use super::{ParseError, SearchParser};

/// Deepest parenthesis nesting the grammar descends into
pub const MAX_GROUP_DEPTH: usize = 100;

/// Default grammar parser
#[derive(Debug, Clone, Copy, Default)]
pub struct EventSearchParser;

impl EventSearchParser {
    pub fn new() -> Self {
        Self
    }
}

impl SearchParser for EventSearchParser {
    fn parse(
        &self,
        query: &str,
        get_field_type: &dyn Fn(&str) -> SearchResult<SearchType>,
    ) -> Result<Vec<ParsedTerm>, ParseError> {
        let mut cursor = Cursor {
            chars: query.chars().collect(),
            pos: 0,
            get_field_type,
        };
        cursor.parse_sequence(0)
    }
}

/// Raw value before typing
enum RawValue {
    Scalar { text: String, column: usize },
    List(Vec<(String, usize)>),
}

struct Cursor<'a> {
    chars: Vec<char>,
    pos: usize,
    get_field_type: &'a dyn Fn(&str) -> SearchResult<SearchType>,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().map_or(false, char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn slice(&self, start: usize, end: usize) -> String {
        self.chars[start..end].iter().collect()
    }

    /// Text from `start` up to the next whitespace, used as an error token
    fn token_at(&self, start: usize) -> String {
        let end = (start..self.chars.len())
            .find(|&i| self.chars[i].is_whitespace())
            .unwrap_or(self.chars.len());
        self.slice(start, end)
    }

    fn error_at(&self, start: usize, message: &str) -> ParseError {
        let token = if start < self.chars.len() {
            self.token_at(start)
        } else {
            String::from("end of query")
        };
        ParseError::syntax(message, token, start)
    }

    fn parse_sequence(&mut self, depth: usize) -> Result<Vec<ParsedTerm>, ParseError> {
        let mut terms = Vec::new();
        let open = self.pos.saturating_sub(1);

        loop {
            self.skip_whitespace();
            match self.peek() {
                None => {
                    if depth > 0 {
                        return Err(self.error_at(open, "Missing closing parenthesis"));
                    }
                    return Ok(terms);
                }
                Some(')') => {
                    if depth == 0 {
                        return Err(self.error_at(self.pos, "Unexpected closing parenthesis"));
                    }
                    self.pos += 1;
                    return Ok(terms);
                }
                Some('(') => {
                    if depth >= MAX_GROUP_DEPTH {
                        return Err(self.error_at(self.pos, "Too many nested parentheses"));
                    }
                    self.pos += 1;
                    let children = self.parse_sequence(depth + 1)?;
                    terms.push(ParsedTerm::ParenGroup(children));
                }
                Some(_) => {
                    if let Some(op) = self.take_connective() {
                        terms.push(ParsedTerm::Connective(op));
                    } else {
                        terms.push(self.parse_filter()?);
                    }
                }
            }
        }
    }

    /// Consumes `AND`/`OR` when it stands alone as a word
    fn take_connective(&mut self) -> Option<BooleanOperator> {
        for (word, op) in [("AND", BooleanOperator::And), ("OR", BooleanOperator::Or)] {
            let len = word.len();
            if self.pos + len > self.chars.len() || self.slice(self.pos, self.pos + len) != word {
                continue;
            }
            let boundary = self
                .peek_at(len)
                .map_or(true, |c| c.is_whitespace() || c == '(' || c == ')');
            if boundary {
                self.pos += len;
                return Some(op);
            }
        }
        None
    }

    fn parse_filter(&mut self) -> Result<ParsedTerm, ParseError> {
        let start = self.pos;
        let negated = self.peek() == Some('!');
        if negated {
            self.pos += 1;
        }

        let key = self.read_key(start)?;
        let column = self.pos;
        let mut operator = self.read_operator();
        let value = self.read_value(column)?;

        if negated {
            operator = negate(operator).ok_or_else(|| {
                self.error_at(start, "Negation is not supported for this operator")
            })?;
        }

        if match_function(&key).is_some() {
            return match value {
                RawValue::Scalar { text, column } => {
                    let number = parse_number(&text).ok_or_else(|| {
                        ParseError::syntax("Invalid aggregate value", text.clone(), column)
                    })?;
                    Ok(ParsedTerm::AggregateComparison(AggregateFilter::new(
                        key,
                        operator,
                        number_value(number),
                    )))
                }
                RawValue::List(_) => Err(self.error_at(column, "Aggregates cannot be compared to a list")),
            };
        }

        let field_type = (self.get_field_type)(&key)?;
        let numeric = field_type.is_numeric();

        match value {
            RawValue::Scalar { text, column } => {
                let raw = typed_value(&text, column, numeric)?;
                Ok(ParsedTerm::Comparison(SearchFilter::new(key, operator, raw)))
            }
            RawValue::List(items) => {
                let operator = match operator {
                    "=" => "IN",
                    "!=" => "NOT IN",
                    _ => return Err(self.error_at(column, "Lists only support equality")),
                };
                let values = items
                    .iter()
                    .map(|(text, column)| typed_value(text, *column, numeric))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ParsedTerm::Comparison(SearchFilter::new(
                    key,
                    operator,
                    Value::Array(values),
                )))
            }
        }
    }

    /// Reads a key up to its `:` separator. Parentheses and brackets nest,
    /// so `count():` and `tags[a,b]:` are single keys.
    fn read_key(&mut self, start: usize) -> Result<String, ParseError> {
        let key_start = self.pos;
        let mut depth = 0usize;

        while let Some(c) = self.peek() {
            match c {
                '(' | '[' => depth += 1,
                ')' | ']' if depth > 0 => depth -= 1,
                ':' if depth == 0 => {
                    let key = self.slice(key_start, self.pos);
                    if key.is_empty() {
                        return Err(self.error_at(start, "Missing key"));
                    }
                    self.pos += 1;
                    return Ok(key);
                }
                c if depth == 0 && (c.is_whitespace() || c == ')') => break,
                _ => {}
            }
            self.pos += 1;
        }

        Err(self.error_at(start, "Free text search is not supported"))
    }

    fn read_operator(&mut self) -> &'static str {
        for op in [">=", "<=", "!=", ">", "<", "="] {
            let len = op.len();
            if self.pos + len <= self.chars.len() && self.slice(self.pos, self.pos + len) == op {
                self.pos += len;
                return op;
            }
        }
        "="
    }

    fn read_value(&mut self, column: usize) -> Result<RawValue, ParseError> {
        match self.peek() {
            Some('[') => {
                self.pos += 1;
                self.read_list(column)
            }
            Some('"') => {
                let start = self.pos;
                let text = self.read_quoted()?;
                Ok(RawValue::Scalar { text, column: start })
            }
            Some(c) if !c.is_whitespace() && c != ')' => {
                let start = self.pos;
                let text = self.read_bare(&[')']);
                Ok(RawValue::Scalar { text, column: start })
            }
            _ => Err(self.error_at(column, "Missing value")),
        }
    }

    fn read_list(&mut self, column: usize) -> Result<RawValue, ParseError> {
        let mut items = Vec::new();

        loop {
            self.skip_whitespace();
            let start = self.pos;
            let text = match self.peek() {
                Some('"') => self.read_quoted()?,
                Some(']') if items.is_empty() => {
                    return Err(self.error_at(column, "Lists cannot be empty"));
                }
                Some(_) => self.read_bare(&[',', ']']),
                None => return Err(self.error_at(column, "Missing closing bracket")),
            };
            items.push((text.trim().to_string(), start));

            self.skip_whitespace();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(']') => {
                    self.pos += 1;
                    return Ok(RawValue::List(items));
                }
                _ => return Err(self.error_at(column, "Missing closing bracket")),
            }
        }
    }

    /// Reads a double-quoted string; `\"` and `\\` are unescaped, other
    /// escapes (such as `\*`) are kept for the wildcard translator
    fn read_quoted(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        self.pos += 1;
        let mut text = String::new();

        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                '\\' => match self.peek() {
                    Some(next @ ('"' | '\\')) => {
                        text.push(next);
                        self.pos += 1;
                    }
                    _ => text.push('\\'),
                },
                '"' => return Ok(text),
                c => text.push(c),
            }
        }

        Err(self.error_at(start, "Missing closing quote"))
    }

    fn read_bare(&mut self, terminators: &[char]) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_whitespace() || terminators.contains(&c) {
                break;
            }
            self.pos += 1;
        }
        self.slice(start, self.pos)
    }
}

fn negate(operator: &'static str) -> Option<&'static str> {
    match operator {
        "=" => Some("!="),
        "!=" => Some("="),
        ">" => Some("<="),
        ">=" => Some("<"),
        "<" => Some(">="),
        "<=" => Some(">"),
        _ => None,
    }
}

fn parse_number(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn number_value(number: f64) -> Value {
    serde_json::Number::from_f64(number).map_or(Value::Null, Value::Number)
}

/// Numeric fields receive numbers (always floats); everything else keeps
/// the text
fn typed_value(text: &str, column: usize, numeric: bool) -> Result<Value, ParseError> {
    if !numeric {
        return Ok(Value::String(text.to_string()));
    }
    parse_number(text)
        .map(number_value)
        .ok_or_else(|| ParseError::syntax("Invalid number", text, column))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field_type(column: &str) -> SearchResult<SearchType> {
        Ok(match column {
            "count" | "span.duration" => SearchType::Double,
            "is_transaction" => SearchType::Boolean,
            _ => SearchType::String,
        })
    }

    fn parse(query: &str) -> Result<Vec<ParsedTerm>, ParseError> {
        EventSearchParser::new().parse(query, &field_type)
    }

    fn cmp(key: &str, op: &str, value: Value) -> ParsedTerm {
        ParsedTerm::Comparison(SearchFilter::new(key, op, value))
    }

    #[test]
    fn test_simple_filters() {
        let terms = parse("status:ok span.op:!=db").unwrap();
        assert_eq!(
            terms,
            vec![cmp("status", "=", json!("ok")), cmp("span.op", "!=", json!("db"))]
        );
    }

    #[test]
    fn test_numeric_values_are_floats() {
        let terms = parse("span.duration:>=100").unwrap();
        assert_eq!(terms, vec![cmp("span.duration", ">=", json!(100.0))]);
    }

    #[test]
    fn test_aggregate_filter() {
        let terms = parse("count():>5").unwrap();
        assert_eq!(
            terms,
            vec![ParsedTerm::AggregateComparison(AggregateFilter::new(
                "count()",
                ">",
                json!(5.0)
            ))]
        );
    }

    #[test]
    fn test_groups_and_connectives() {
        let terms = parse("(a:1 OR a:2) AND b:3").unwrap();
        assert_eq!(
            terms,
            vec![
                ParsedTerm::ParenGroup(vec![
                    cmp("a", "=", json!("1")),
                    ParsedTerm::Connective(BooleanOperator::Or),
                    cmp("a", "=", json!("2")),
                ]),
                ParsedTerm::Connective(BooleanOperator::And),
                cmp("b", "=", json!("3")),
            ]
        );
    }

    #[test]
    fn test_lists_become_in() {
        let terms = parse(r#"span.op:[db, "http client"] !status:[ok]"#).unwrap();
        assert_eq!(
            terms,
            vec![
                cmp("span.op", "IN", json!(["db", "http client"])),
                cmp("status", "NOT IN", json!(["ok"])),
            ]
        );
    }

    #[test]
    fn test_quoted_values() {
        let terms = parse(r#"span.description:"select \"x\" from t" status:"""#).unwrap();
        assert_eq!(
            terms,
            vec![
                cmp("span.description", "=", json!("select \"x\" from t")),
                cmp("status", "=", json!("")),
            ]
        );
    }

    #[test]
    fn test_tag_keys_keep_brackets() {
        let terms = parse("tags[foo,number]:bar").unwrap();
        assert_eq!(terms, vec![cmp("tags[foo,number]", "=", json!("bar"))]);
    }

    #[test]
    fn test_free_text_rejected_with_locator() {
        let err = parse("status:ok oops").unwrap_err();
        assert_eq!(
            err,
            ParseError::syntax("Free text search is not supported", "oops", 10)
        );
    }

    #[test]
    fn test_unbalanced_parens() {
        assert!(parse("(a:1").is_err());
        assert!(parse("a:1)").is_err());
    }

    #[test]
    fn test_invalid_number() {
        let err = parse("span.duration:>fast").unwrap_err();
        assert_eq!(err, ParseError::syntax("Invalid number", "fast", 15));
    }

    #[test]
    fn test_field_type_errors_propagate() {
        let failing = |_: &str| -> SearchResult<SearchType> {
            Err(crate::search::SearchError::invalid("nope is too long"))
        };
        let err = EventSearchParser::new().parse("nope:1", &failing).unwrap_err();
        assert!(matches!(err, ParseError::Search(_)));
    }

    #[test]
    fn test_group_depth_bounded() {
        let nested = |depth: usize| format!("{}a:1{}", "(".repeat(depth), ")".repeat(depth));

        assert!(parse(&nested(MAX_GROUP_DEPTH)).is_ok());

        let err = parse(&nested(MAX_GROUP_DEPTH + 1)).unwrap_err();
        match err {
            ParseError::Syntax { message, locator } => {
                assert_eq!(message, "Too many nested parentheses");
                assert_eq!(locator.unwrap().column, MAX_GROUP_DEPTH);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_connective_needs_word_boundary() {
        let terms = parse("ORDER:1").unwrap();
        assert_eq!(terms, vec![cmp("ORDER", "=", json!("1"))]);
    }
}
