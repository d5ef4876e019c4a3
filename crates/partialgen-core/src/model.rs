//! Host syntax model
//!
//! A read-only description of the host project's source: syntax trees,
//! type declarations, their members and the attributes applied to them.
//! Hosts export this model (usually as JSON) and partialgen never mutates
//! it; code fixes produce a modified copy instead.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A position in a source file. Lines and columns are 1-based; zero means unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

impl Location {
    /// Create a location
    pub fn new<P: Into<String>>(path: P, line: u32, column: u32) -> Self {
        Self {
            path: path.into(),
            line,
            column,
        }
    }

    /// Whether the location carries no information at all
    pub fn is_unknown(&self) -> bool {
        self.path.is_empty() && self.line == 0 && self.column == 0
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "<unknown>" } else { &self.path };
        write!(f, "{}:{}:{}", path, self.line, self.column)
    }
}

/// One source file of the host project
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyntaxTree {
    pub path: String,
    /// `using` directives in scope for every declaration of the file
    #[serde(default)]
    pub usings: Vec<String>,
    #[serde(default)]
    pub declarations: Vec<DeclarationSyntax>,
}

impl SyntaxTree {
    /// Create an empty tree for `path`
    pub fn new<P: Into<String>>(path: P) -> Self {
        Self {
            path: path.into(),
            usings: Vec::new(),
            declarations: Vec::new(),
        }
    }

    /// Add a `using` directive
    pub fn with_using<S: Into<String>>(mut self, namespace: S) -> Self {
        self.usings.push(namespace.into());
        self
    }

    /// Add a declaration
    pub fn with_declaration(mut self, declaration: DeclarationSyntax) -> Self {
        self.declarations.push(declaration);
        self
    }

    /// Fill in the file path of every location that does not carry one
    pub fn normalize_locations(&mut self) {
        let path = self.path.clone();
        let fill = |location: &mut Location| {
            if location.path.is_empty() {
                location.path = path.clone();
            }
        };

        for declaration in &mut self.declarations {
            fill(&mut declaration.location);
            for member in &mut declaration.members {
                fill(&mut member.location);
                for attribute in &mut member.attributes {
                    fill(&mut attribute.location);
                }
            }
        }
    }
}

/// Kind keyword of a type declaration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationKind {
    #[default]
    Class,
    Struct,
}

impl DeclarationKind {
    /// The C# keyword for this kind
    pub fn keyword(self) -> &'static str {
        match self {
            DeclarationKind::Class => "class",
            DeclarationKind::Struct => "struct",
        }
    }
}

/// An outer type of a nested declaration
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainingType {
    pub name: String,
    #[serde(default)]
    pub kind: DeclarationKind,
}

/// One syntactic part of a class or struct declaration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeclarationSyntax {
    pub name: String,
    #[serde(default)]
    pub kind: DeclarationKind,
    #[serde(default)]
    pub namespace: Option<String>,
    /// Outer types, outermost first
    #[serde(default)]
    pub containing_types: Vec<ContainingType>,
    #[serde(default)]
    pub modifiers: Vec<String>,
    #[serde(default)]
    pub type_parameters: Vec<String>,
    #[serde(default)]
    pub base_list: Vec<String>,
    #[serde(default)]
    pub members: Vec<MemberSyntax>,
    #[serde(default)]
    pub location: Location,
}

impl DeclarationSyntax {
    /// Create a class declaration
    pub fn class<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Create a struct declaration
    pub fn structure<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            kind: DeclarationKind::Struct,
            ..Self::default()
        }
    }

    pub fn in_namespace<S: Into<String>>(mut self, namespace: S) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn nested_in<S: Into<String>>(mut self, name: S, kind: DeclarationKind) -> Self {
        self.containing_types.push(ContainingType {
            name: name.into(),
            kind,
        });
        self
    }

    pub fn with_modifier<S: Into<String>>(mut self, modifier: S) -> Self {
        self.modifiers.push(modifier.into());
        self
    }

    /// Shorthand for `public partial`
    pub fn partial(self) -> Self {
        self.with_modifier("public").with_modifier("partial")
    }

    pub fn with_type_parameter<S: Into<String>>(mut self, name: S) -> Self {
        self.type_parameters.push(name.into());
        self
    }

    pub fn with_base<S: Into<String>>(mut self, base: S) -> Self {
        self.base_list.push(base.into());
        self
    }

    pub fn with_member(mut self, member: MemberSyntax) -> Self {
        self.members.push(member);
        self
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    /// Whether this part carries the `partial` modifier
    pub fn is_partial(&self) -> bool {
        self.modifiers.iter().any(|m| m == "partial")
    }

    /// Name including outer types, e.g. `Outer.Inner`
    pub fn nested_name(&self) -> String {
        let mut name = String::new();
        for outer in &self.containing_types {
            name.push_str(&outer.name);
            name.push('.');
        }
        name.push_str(&self.name);
        name
    }
}

/// Kind of a declaration member
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    #[default]
    Field,
    Property,
    Method,
}

/// A method parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSyntax {
    pub name: String,
    pub type_name: String,
}

/// A field, property or method of a declaration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemberSyntax {
    #[serde(default)]
    pub kind: MemberKind,
    pub name: String,
    /// Field or property type, or method return type
    #[serde(default)]
    pub type_name: String,
    #[serde(default)]
    pub parameters: Vec<ParameterSyntax>,
    #[serde(default)]
    pub modifiers: Vec<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeSyntax>,
    #[serde(default)]
    pub location: Location,
}

impl MemberSyntax {
    pub fn field<N: Into<String>, T: Into<String>>(name: N, type_name: T) -> Self {
        Self {
            kind: MemberKind::Field,
            name: name.into(),
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    pub fn property<N: Into<String>, T: Into<String>>(name: N, type_name: T) -> Self {
        Self {
            kind: MemberKind::Property,
            name: name.into(),
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    pub fn method<N: Into<String>, T: Into<String>>(name: N, return_type: T) -> Self {
        Self {
            kind: MemberKind::Method,
            name: name.into(),
            type_name: return_type.into(),
            ..Self::default()
        }
    }

    pub fn with_parameter<N: Into<String>, T: Into<String>>(mut self, name: N, type_name: T) -> Self {
        self.parameters.push(ParameterSyntax {
            name: name.into(),
            type_name: type_name.into(),
        });
        self
    }

    pub fn with_modifier<S: Into<String>>(mut self, modifier: S) -> Self {
        self.modifiers.push(modifier.into());
        self
    }

    pub fn with_attribute(mut self, attribute: AttributeSyntax) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    /// Fields and properties are the only members annotations apply to
    pub fn is_data_member(&self) -> bool {
        matches!(self.kind, MemberKind::Field | MemberKind::Property)
    }
}

/// An attribute as written in source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeSyntax {
    pub name: String,
    #[serde(default)]
    pub arguments: Vec<AttributeArgument>,
    #[serde(default)]
    pub location: Location,
}

impl AttributeSyntax {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add a positional argument
    pub fn with_argument(mut self, value: AttributeValue) -> Self {
        self.arguments.push(AttributeArgument { name: None, value });
        self
    }

    /// Add a named argument (`Name = value`)
    pub fn with_named_argument<S: Into<String>>(mut self, name: S, value: AttributeValue) -> Self {
        self.arguments.push(AttributeArgument {
            name: Some(name.into()),
            value,
        });
        self
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    /// Positional arguments in order
    pub fn positional(&self) -> impl Iterator<Item = &AttributeValue> {
        self.arguments.iter().filter(|a| a.name.is_none()).map(|a| &a.value)
    }

    /// Look up a named argument, case-sensitively
    pub fn named(&self, name: &str) -> Option<&AttributeValue> {
        self.arguments
            .iter()
            .find(|a| a.name.as_deref() == Some(name))
            .map(|a| &a.value)
    }
}

/// One attribute argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeArgument {
    #[serde(default)]
    pub name: Option<String>,
    pub value: AttributeValue,
}

/// Value of an attribute argument. Anything that is not a literal is kept as
/// expression text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Number(i64),
    String(String),
    Expression { expr: String },
}

impl AttributeValue {
    pub fn string<S: Into<String>>(value: S) -> Self {
        AttributeValue::String(value.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_builders() {
        let declaration = DeclarationSyntax::class("Inner")
            .in_namespace("Game")
            .nested_in("Outer", DeclarationKind::Class)
            .partial()
            .with_member(MemberSyntax::field("health", "ValueNotifier<int>"));

        assert!(declaration.is_partial());
        assert_eq!(declaration.nested_name(), "Outer.Inner");
        assert_eq!(declaration.members.len(), 1);
        assert!(declaration.members[0].is_data_member());
    }

    #[test]
    fn test_normalize_locations() {
        let mut tree = SyntaxTree::new("Assets/Player.cs").with_declaration(
            DeclarationSyntax::class("Player").with_member(
                MemberSyntax::field("health", "int")
                    .with_attribute(AttributeSyntax::new("GenerateSubscribeMethods").at(Location::new("", 4, 6))),
            ),
        );
        tree.normalize_locations();

        let attribute = &tree.declarations[0].members[0].attributes[0];
        assert_eq!(attribute.location, Location::new("Assets/Player.cs", 4, 6));
        assert_eq!(tree.declarations[0].location.path, "Assets/Player.cs");
    }

    #[test]
    fn test_attribute_arguments_from_json() {
        let json = r#"{
            "name": "GenerateInputCallbacks",
            "arguments": [
                { "value": "Jump" },
                { "name": "Started", "value": true },
                { "name": "Map", "value": { "expr": "nameof(Controls)" } }
            ]
        }"#;
        let attribute: AttributeSyntax = serde_json::from_str(json).unwrap();

        assert_eq!(attribute.positional().next().and_then(|v| v.as_str()), Some("Jump"));
        assert_eq!(attribute.named("Started").and_then(|v| v.as_bool()), Some(true));
        assert!(matches!(attribute.named("Map"), Some(AttributeValue::Expression { .. })));
        assert!(attribute.named("Performed").is_none());
    }

    #[test]
    fn test_location_display() {
        assert_eq!(Location::new("A.cs", 3, 9).to_string(), "A.cs:3:9");
        assert!(Location::default().is_unknown());
        assert_eq!(Location::default().to_string(), "<unknown>:0:0");
    }
}
