//! Table and column names as they appear in generated SQL.
//!
//! A name is either bare (`reference_id`) or double-quoted (`"Api Key"`) and
//! may carry one qualifier: a schema in front of a table (`public.tags`) or a
//! join alias in front of a column (`p.name`).
//!
//! - Bare names match `[A-Za-z_][A-Za-z0-9_$]*`
//! - Quoted names may hold anything but NUL; `"` is written `""`
//! - Bare reserved words (`order`, `value`, ...) are rendered quoted
//!
//! ```ignore
//! use relmap::Ident;
//!
//! assert_eq!(Ident::parse("p.order")?.to_sql(), r#"p."order""#);
//! # Ok::<(), relmap::OrmError>(())
//! ```

use crate::error::{OrmError, OrmResult};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Name {
    text: String,
    quoted: bool,
}

impl Name {
    fn write(&self, out: &mut String) {
        if !self.quoted && !is_reserved_word(&self.text) {
            out.push_str(&self.text);
            return;
        }
        let text = if self.quoted {
            self.text.replace('"', "\"\"")
        } else {
            self.text.to_ascii_lowercase()
        };
        out.push('"');
        out.push_str(&text);
        out.push('"');
    }
}

/// A validated table or column name, optionally qualified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    qualifier: Option<Name>,
    name: Name,
}

impl Ident {
    /// Parse `name`, `qualifier.name`, or either with quoted parts.
    pub fn parse(s: &str) -> OrmResult<Self> {
        if s.is_empty() {
            return Err(OrmError::invalid_argument("Identifier cannot be empty"));
        }
        if s.contains('\0') {
            return Err(OrmError::invalid_argument(
                "Identifier cannot contain NUL character",
            ));
        }
        let (first, rest) = take_name(s)?;
        let Some(rest) = rest else {
            return Ok(Self {
                qualifier: None,
                name: first,
            });
        };
        match take_name(rest)? {
            (name, None) => Ok(Self {
                qualifier: Some(first),
                name,
            }),
            (_, Some(_)) => Err(OrmError::invalid_argument(format!(
                "{s:?}: at most one qualifier is allowed"
            ))),
        }
    }

    /// Whether the name carries a schema or alias qualifier.
    pub fn is_qualified(&self) -> bool {
        self.qualifier.is_some()
    }

    pub fn to_sql(&self) -> String {
        let mut out = String::with_capacity(self.name.text.len() + 8);
        self.write_sql(&mut out);
        out
    }

    pub(crate) fn write_sql(&self, out: &mut String) {
        if let Some(qualifier) = &self.qualifier {
            qualifier.write(out);
            out.push('.');
        }
        self.name.write(out);
    }
}

/// Split one name off the front of `s`. The remainder, if any, follows a `.`.
fn take_name(s: &str) -> OrmResult<(Name, Option<&str>)> {
    let (name, rest) = match s.strip_prefix('"') {
        Some(body) => {
            let mut text = String::new();
            let mut chars = body.char_indices();
            let end = loop {
                match chars.next() {
                    Some((i, '"')) if body[i + 1..].starts_with('"') => {
                        text.push('"');
                        chars.next();
                    }
                    Some((i, '"')) => break i + 1,
                    Some((_, c)) => text.push(c),
                    None => {
                        return Err(OrmError::invalid_argument("Unclosed quoted identifier"));
                    }
                }
            };
            if text.is_empty() {
                return Err(OrmError::invalid_argument("Empty quoted identifier"));
            }
            (Name { text, quoted: true }, &body[end..])
        }
        None => {
            let end = s.find('.').unwrap_or(s.len());
            let text = &s[..end];
            validate_bare(text)?;
            (
                Name {
                    text: text.to_string(),
                    quoted: false,
                },
                &s[end..],
            )
        }
    };
    if rest.is_empty() {
        return Ok((name, None));
    }
    match rest.strip_prefix('.') {
        Some("") => Err(OrmError::invalid_argument("Trailing '.' in identifier")),
        Some(next) => Ok((name, Some(next))),
        None => Err(OrmError::invalid_argument(format!(
            "Expected '.' after identifier, got {rest:?}"
        ))),
    }
}

fn validate_bare(text: &str) -> OrmResult<()> {
    let mut chars = text.chars();
    match chars.next() {
        None => return Err(OrmError::invalid_argument("Empty identifier segment")),
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        Some(c) => {
            return Err(OrmError::invalid_argument(format!(
                "Invalid identifier start character: '{c}'"
            )));
        }
    }
    match chars.find(|&c| !(c == '_' || c == '$' || c.is_ascii_alphanumeric())) {
        Some(c) => Err(OrmError::invalid_argument(format!(
            "Invalid character in identifier: '{c}'"
        ))),
        None => Ok(()),
    }
}

/// PostgreSQL keywords that cannot stand bare as a column or table name.
///
/// Sorted; looked up case-insensitively.
const RESERVED_WORDS: &[&str] = &[
    "all", "analyse", "analyze", "and", "any", "array", "as", "asc", "asymmetric", "both",
    "case", "cast", "check", "collate", "column", "condition", "constraint", "create",
    "current_catalog", "current_date", "current_role", "current_time", "current_timestamp",
    "current_user", "default", "deferrable", "desc", "distinct", "do", "else", "end", "except",
    "false", "fetch", "for", "foreign", "from", "grant", "group", "having", "in", "initially",
    "intersect", "into", "key", "lateral", "leading", "limit", "localtime", "localtimestamp",
    "not", "null", "offset", "on", "only", "or", "order", "placing", "primary", "references",
    "returning", "select", "session_user", "some", "symmetric", "table", "then", "to",
    "trailing", "true", "union", "unique", "user", "using", "value", "variadic", "when",
    "where", "window", "with",
];

pub fn is_reserved_word(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    RESERVED_WORDS.binary_search(&lower.as_str()).is_ok()
}

/// Quote `name` if it is a reserved word, otherwise return it unchanged.
///
/// ```ignore
/// assert_eq!(relmap::escape_reserved_word("order"), r#""order""#);
/// assert_eq!(relmap::escape_reserved_word("name"), "name");
/// ```
pub fn escape_reserved_word(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    Name {
        text: name.to_string(),
        quoted: false,
    }
    .write(&mut out);
    out
}

/// Names accepted where an identifier is expected (columns in conditions,
/// sort fields).
pub trait IntoIdent {
    fn into_ident(self) -> OrmResult<Ident>;
}

impl IntoIdent for &str {
    fn into_ident(self) -> OrmResult<Ident> {
        Ident::parse(self)
    }
}

impl IntoIdent for String {
    fn into_ident(self) -> OrmResult<Ident> {
        Ident::parse(&self)
    }
}
