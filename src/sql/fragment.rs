//! Tagged SQL fragments.
//!
//! Templates are assembled from fragments rather than by string
//! concatenation. Trusted SQL text can only enter through
//! [`SqlFragment::Keyword`], which takes a `&'static str`; everything derived
//! from tool arguments goes through a validating constructor first.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use super::ArgumentError;

/// Characters that may never appear in identifiers or values.
const FORBIDDEN_CHARS: &[char] = &['\'', '"', '`', ';', '\\'];

/// Rejects text containing quotes, statement terminators, backslashes or
/// control characters.
pub fn check_text(field: &str, value: &str) -> Result<(), ArgumentError> {
    match value
        .chars()
        .find(|c| FORBIDDEN_CHARS.contains(c) || c.is_control())
    {
        Some(character) => Err(ArgumentError::ForbiddenCharacter {
            field: field.to_string(),
            character,
        }),
        None => Ok(()),
    }
}

/// A validated identifier (catalog, schema, table or column name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(field: &str, value: &str) -> Result<Self, ArgumentError> {
        if value.trim().is_empty() {
            return Err(ArgumentError::Empty {
                field: field.to_string(),
            });
        }
        check_text(field, value)?;
        Ok(Self(value.to_string()))
    }

    /// A fixed identifier taken from template text.
    pub(crate) fn system(name: &'static str) -> Self {
        Self(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}`", self.0)
    }
}

/// A validated column type such as `INT`, `DECIMAL(10, 2)` or `ARRAY<STRING>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeName(String);

/// Deepest accepted nesting of `<...>` type arguments.
const MAX_TYPE_NESTING: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeToken {
    Word,
    Number,
    Symbol(char),
}

fn type_token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^ *(?:([A-Za-z][A-Za-z0-9_]*)|([0-9]+)|([(),<>:]))")
            .expect("type token pattern is valid")
    })
}

/// Splits a type into tokens, or `None` if it contains anything else.
fn tokenize_type(value: &str) -> Option<Vec<TypeToken>> {
    let pattern = type_token_pattern();
    let mut tokens = Vec::new();
    let mut rest = value.trim_end();

    while !rest.is_empty() {
        let captures = pattern.captures(rest)?;
        let token = if captures.get(1).is_some() {
            TypeToken::Word
        } else if captures.get(2).is_some() {
            TypeToken::Number
        } else {
            TypeToken::Symbol(captures.get(3)?.as_str().chars().next()?)
        };
        tokens.push(token);
        rest = &rest[captures.get(0)?.end()..];
    }
    Some(tokens)
}

/// Recursive-descent check of column type syntax:
///
/// ```text
/// type := word+ [ "(" number ("," number)* ")" | "<" arg ("," arg)* ">" ]
/// arg  := word ":" type | type
/// ```
///
/// Brackets must nest and commas only occur inside them, so a type can never
/// close the surrounding column list.
struct TypeSyntax<'t> {
    tokens: &'t [TypeToken],
    pos: usize,
}

impl<'t> TypeSyntax<'t> {
    fn accepts(tokens: &'t [TypeToken]) -> bool {
        let mut syntax = Self { tokens, pos: 0 };
        syntax.data_type(0) && syntax.pos == tokens.len()
    }

    fn eat(&mut self, token: TypeToken) -> bool {
        if self.tokens.get(self.pos) == Some(&token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn data_type(&mut self, depth: usize) -> bool {
        if depth > MAX_TYPE_NESTING || !self.eat(TypeToken::Word) {
            return false;
        }
        // Multi-word types, e.g. INTERVAL DAY TO SECOND
        while self.eat(TypeToken::Word) {}

        if self.eat(TypeToken::Symbol('(')) {
            self.separated(|s| s.eat(TypeToken::Number)) && self.eat(TypeToken::Symbol(')'))
        } else if self.eat(TypeToken::Symbol('<')) {
            self.separated(|s| s.type_argument(depth + 1)) && self.eat(TypeToken::Symbol('>'))
        } else {
            true
        }
    }

    fn type_argument(&mut self, depth: usize) -> bool {
        let start = self.pos;
        if self.eat(TypeToken::Word) && self.eat(TypeToken::Symbol(':')) {
            return self.data_type(depth);
        }
        self.pos = start;
        self.data_type(depth)
    }

    fn separated(&mut self, mut item: impl FnMut(&mut Self) -> bool) -> bool {
        loop {
            if !item(self) {
                return false;
            }
            if !self.eat(TypeToken::Symbol(',')) {
                return true;
            }
        }
    }
}

impl TypeName {
    pub fn new(field: &str, value: &str) -> Result<Self, ArgumentError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ArgumentError::Empty {
                field: field.to_string(),
            });
        }
        check_text(field, value)?;

        let well_formed = tokenize_type(value)
            .map(|tokens| TypeSyntax::accepts(&tokens))
            .unwrap_or(false);
        if !well_formed {
            return Err(ArgumentError::InvalidTypeName {
                field: field.to_string(),
                value: value.to_string(),
            });
        }
        Ok(Self(value.to_uppercase()))
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
}

impl SqlValue {
    /// Builds a string literal, rejecting unsafe characters.
    pub fn string(field: &str, value: &str) -> Result<Self, ArgumentError> {
        check_text(field, value)?;
        Ok(Self::String(value.to_string()))
    }

    /// Converts a scalar JSON value into a literal.
    pub fn from_json(field: &str, value: &serde_json::Value) -> Result<Self, ArgumentError> {
        match value {
            serde_json::Value::Null => Ok(Self::Null),
            serde_json::Value::Bool(b) => Ok(Self::Bool(*b)),
            serde_json::Value::Number(n) => Ok(Self::Number(n.clone())),
            serde_json::Value::String(s) => Self::string(field, s),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                Err(ArgumentError::WrongType {
                    field: field.to_string(),
                    expected: "a string, number, boolean or null",
                })
            }
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(true) => f.write_str("TRUE"),
            Self::Bool(false) => f.write_str("FALSE"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "'{s}'"),
        }
    }
}

/// One piece of a SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlFragment {
    /// Trusted template text.
    Keyword(&'static str),
    Identifier(Identifier),
    /// Dot-separated identifiers, e.g. `` `main`.`sales`.`orders` ``.
    QualifiedName(Vec<Identifier>),
    Value(SqlValue),
    TypeName(TypeName),
    /// Fragments separated by spaces.
    Sequence(Vec<SqlFragment>),
    /// Comma-separated fragments inside parentheses.
    Tuple(Vec<SqlFragment>),
    /// Comma-separated fragments.
    List(Vec<SqlFragment>),
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[impl fmt::Display], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for SqlFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keyword(text) => f.write_str(text),
            Self::Identifier(ident) => write!(f, "{ident}"),
            Self::QualifiedName(parts) => write_joined(f, parts, "."),
            Self::Value(value) => write!(f, "{value}"),
            Self::TypeName(ty) => write!(f, "{ty}"),
            Self::Sequence(items) => write_joined(f, items, " "),
            Self::Tuple(items) => {
                f.write_str("(")?;
                write_joined(f, items, ", ")?;
                f.write_str(")")
            }
            Self::List(items) => write_joined(f, items, ", "),
        }
    }
}

/// Accumulates fragments into one statement.
#[derive(Debug, Clone, Default)]
pub struct SqlBuilder {
    fragments: Vec<SqlFragment>,
}

impl SqlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keyword(self, text: &'static str) -> Self {
        self.push(SqlFragment::Keyword(text))
    }

    pub fn qualified(self, parts: Vec<Identifier>) -> Self {
        self.push(SqlFragment::QualifiedName(parts))
    }

    pub fn value(self, value: SqlValue) -> Self {
        self.push(SqlFragment::Value(value))
    }

    pub fn push(mut self, fragment: SqlFragment) -> Self {
        self.fragments.push(fragment);
        self
    }

    /// Renders the statement, joining fragments with single spaces.
    pub fn build(self) -> String {
        SqlFragment::Sequence(self.fragments).to_string()
    }
}
