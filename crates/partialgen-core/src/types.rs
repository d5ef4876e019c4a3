//! Type handles
//!
//! [`TypeSyntax`] is the parsed but unresolved shape of a piece of type text
//! (`ValueNotifier<int>`, `AssetReferenceT<Sprite>[]`). [`TypeRef`] is the
//! resolved, opaque handle the semantic model hands out; it compares and
//! hashes structurally so it can key caches.

use serde::{Deserialize, Serialize};
use std::fmt;

/// C# keyword aliases and the `System` types they stand for
const KEYWORD_ALIASES: &[(&str, &str)] = &[
    ("bool", "Boolean"),
    ("byte", "Byte"),
    ("sbyte", "SByte"),
    ("char", "Char"),
    ("short", "Int16"),
    ("ushort", "UInt16"),
    ("int", "Int32"),
    ("uint", "UInt32"),
    ("long", "Int64"),
    ("ulong", "UInt64"),
    ("float", "Single"),
    ("double", "Double"),
    ("decimal", "Decimal"),
    ("string", "String"),
    ("object", "Object"),
    ("void", "Void"),
];

/// Map a keyword such as `int` to its `System` type name
pub fn keyword_type(keyword: &str) -> Option<&'static str> {
    KEYWORD_ALIASES
        .iter()
        .find(|(k, _)| *k == keyword)
        .map(|(_, name)| *name)
}

fn keyword_alias(system_name: &str) -> Option<&'static str> {
    KEYWORD_ALIASES
        .iter()
        .find(|(_, name)| *name == system_name)
        .map(|(k, _)| *k)
}

/// Unresolved type text: a possibly dotted name, generic arguments and array rank
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSyntax {
    pub name: String,
    pub args: Vec<TypeSyntax>,
    pub array_rank: u8,
}

impl TypeSyntax {
    /// Parse type text. Returns `None` for anything malformed.
    pub fn parse(text: &str) -> Option<TypeSyntax> {
        let mut parser = TypeParser {
            chars: text.trim().chars().collect(),
            pos: 0,
        };
        let parsed = parser.parse_type()?;
        parser.skip_whitespace();
        if parser.pos == parser.chars.len() {
            Some(parsed)
        } else {
            None
        }
    }
}

struct TypeParser {
    chars: Vec<char>,
    pos: usize,
}

impl TypeParser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().map_or(false, char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_identifier(&mut self) -> Option<String> {
        self.skip_whitespace();
        let start = self.pos;
        while let Some(c) = self.peek() {
            let valid = if self.pos == start {
                c == '_' || c == '@' || c.is_alphabetic()
            } else {
                c == '_' || c.is_alphanumeric()
            };
            if !valid {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return None;
        }
        let ident: String = self.chars[start..self.pos].iter().collect();
        Some(ident.trim_start_matches('@').to_string())
    }

    fn parse_type(&mut self) -> Option<TypeSyntax> {
        let mut name = self.parse_identifier()?;

        // `global::Foo.Bar`
        if name == "global" {
            self.skip_whitespace();
            if self.chars.get(self.pos..self.pos + 2) == Some(&[':', ':'][..]) {
                self.pos += 2;
                name = self.parse_identifier()?;
            }
        }

        while self.eat('.') {
            let segment = self.parse_identifier()?;
            name.push('.');
            name.push_str(&segment);
        }

        let mut args = Vec::new();
        if self.eat('<') {
            loop {
                args.push(self.parse_type()?);
                if self.eat(',') {
                    continue;
                }
                if self.eat('>') {
                    break;
                }
                return None;
            }

            // Nested type of a generic type is not supported
            self.skip_whitespace();
            if self.peek() == Some('.') {
                return None;
            }
        }

        // Nullable annotations carry no identity here
        self.eat('?');

        let mut array_rank = 0u8;
        while self.eat('[') {
            if !self.eat(']') {
                return None;
            }
            array_rank = array_rank.checked_add(1)?;
        }

        Some(TypeSyntax {
            name,
            args,
            array_rank,
        })
    }
}

/// Resolved type handle
///
/// Keyword types are normalised to their `System` names so that `int` and
/// `System.Int32` compare equal. Nested types carry the outer type in
/// `name` (`InputAction.CallbackContext`). Type parameters have no namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeRef {
    pub namespace: Option<String>,
    pub name: String,
    #[serde(default)]
    pub args: Vec<TypeRef>,
    #[serde(default)]
    pub array_rank: u8,
}

impl TypeRef {
    /// Create a non-generic type handle
    pub fn new<S: Into<String>>(namespace: Option<&str>, name: S) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            name: name.into(),
            args: Vec::new(),
            array_rank: 0,
        }
    }

    /// Handle for a keyword type, e.g. `TypeRef::keyword("int")`
    pub fn keyword(keyword: &str) -> Option<Self> {
        keyword_type(keyword).map(|name| Self::new(Some("System"), name))
    }

    /// Handle for a generic type parameter
    pub fn type_parameter<S: Into<String>>(name: S) -> Self {
        Self::new(None, name)
    }

    pub fn with_args(mut self, args: Vec<TypeRef>) -> Self {
        self.args = args;
        self
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// Match against a namespace, name and arity, ignoring arrays
    pub fn is(&self, namespace: &str, name: &str, arity: usize) -> bool {
        self.array_rank == 0
            && self.namespace.as_deref() == Some(namespace)
            && self.name == name
            && self.args.len() == arity
    }

    /// Innermost simple name, `CallbackContext` for `InputAction.CallbackContext`
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// Namespace-qualified name without type arguments
    pub fn qualified_name(&self) -> String {
        match &self.namespace {
            Some(namespace) => format!("{}.{}", namespace, self.name),
            None => self.name.clone(),
        }
    }

    /// The keyword spelling of this type if it has one
    pub fn keyword_alias(&self) -> Option<&'static str> {
        if self.namespace.as_deref() == Some("System") && self.args.is_empty() {
            keyword_alias(&self.name)
        } else {
            None
        }
    }

    /// Replace references to `parameters` with the matching `arguments`
    pub fn substitute(&self, parameters: &[String], arguments: &[TypeRef]) -> TypeRef {
        if self.namespace.is_none() && self.args.is_empty() {
            if let Some(index) = parameters.iter().position(|p| *p == self.name) {
                if let Some(argument) = arguments.get(index) {
                    let mut replaced = argument.clone();
                    replaced.array_rank = replaced.array_rank.saturating_add(self.array_rank);
                    return replaced;
                }
            }
        }

        TypeRef {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            args: self
                .args
                .iter()
                .map(|arg| arg.substitute(parameters, arguments))
                .collect(),
            array_rank: self.array_rank,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.keyword_alias() {
            Some(keyword) => f.write_str(keyword)?,
            None => {
                f.write_str(&self.qualified_name())?;
                if !self.args.is_empty() {
                    f.write_str("<")?;
                    for (i, arg) in self.args.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{}", arg)?;
                    }
                    f.write_str(">")?;
                }
            }
        }
        for _ in 0..self.array_rank {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

/// A type known to the compilation through a metadata reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeInfo {
    #[serde(default)]
    pub namespace: Option<String>,
    pub name: String,
    #[serde(default)]
    pub type_parameters: Vec<String>,
    /// Base type as written, resolved in the type's own namespace
    #[serde(default)]
    pub base: Option<String>,
}

impl TypeInfo {
    pub fn new<S: Into<String>>(namespace: &str, name: S) -> Self {
        Self {
            namespace: Some(namespace.to_string()),
            name: name.into(),
            type_parameters: Vec::new(),
            base: None,
        }
    }

    pub fn generic<S: Into<String>>(namespace: &str, name: S, parameters: &[&str]) -> Self {
        let mut info = Self::new(namespace, name);
        info.type_parameters = parameters.iter().map(|p| p.to_string()).collect();
        info
    }

    pub fn with_base<S: Into<String>>(mut self, base: S) -> Self {
        self.base = Some(base.into());
        self
    }
}
