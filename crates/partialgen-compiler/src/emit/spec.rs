//! Declarative headers for emission scopes

use partialgen_core::model::DeclarationKind;

/// How a block scope is closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStyle {
    /// `header { ... }`
    Braces,
    /// `header { ... };`, for lambdas assigned or passed in a statement
    Lambda,
}

/// Header of a class or struct declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationSpec {
    pub modifiers: Vec<String>,
    pub kind: DeclarationKind,
    pub name: String,
    pub type_parameters: Vec<String>,
}

impl DeclarationSpec {
    /// A `partial class` / `partial struct` declaration
    pub fn partial<S: Into<String>>(kind: DeclarationKind, name: S) -> Self {
        Self {
            modifiers: vec!["partial".to_string()],
            kind,
            name: name.into(),
            type_parameters: Vec::new(),
        }
    }

    pub fn with_type_parameters(mut self, parameters: &[String]) -> Self {
        self.type_parameters.extend(parameters.iter().cloned());
        self
    }

    pub(crate) fn header(&self) -> String {
        let mut header = String::new();
        for modifier in &self.modifiers {
            header.push_str(modifier);
            header.push(' ');
        }
        header.push_str(self.kind.keyword());
        header.push(' ');
        header.push_str(&self.name);
        if !self.type_parameters.is_empty() {
            header.push('<');
            header.push_str(&self.type_parameters.join(", "));
            header.push('>');
        }
        header
    }
}

/// A method parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSpec {
    pub type_name: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberShape {
    Field {
        type_name: String,
        initializer: Option<String>,
    },
    Method {
        return_type: String,
        parameters: Vec<ParameterSpec>,
    },
}

/// Header of a field or method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSpec {
    pub attributes: Vec<String>,
    pub accessibility: Option<String>,
    pub modifiers: Vec<String>,
    pub name: String,
    pub shape: MemberShape,
}

impl MemberSpec {
    pub fn field<T: Into<String>, N: Into<String>>(type_name: T, name: N) -> Self {
        Self {
            attributes: Vec::new(),
            accessibility: None,
            modifiers: Vec::new(),
            name: name.into(),
            shape: MemberShape::Field {
                type_name: type_name.into(),
                initializer: None,
            },
        }
    }

    pub fn method<T: Into<String>, N: Into<String>>(return_type: T, name: N) -> Self {
        Self {
            attributes: Vec::new(),
            accessibility: None,
            modifiers: Vec::new(),
            name: name.into(),
            shape: MemberShape::Method {
                return_type: return_type.into(),
                parameters: Vec::new(),
            },
        }
    }

    pub fn public(self) -> Self {
        self.with_accessibility("public")
    }

    pub fn private(self) -> Self {
        self.with_accessibility("private")
    }

    pub fn with_accessibility<S: Into<String>>(mut self, accessibility: S) -> Self {
        self.accessibility = Some(accessibility.into());
        self
    }

    pub fn with_modifier<S: Into<String>>(mut self, modifier: S) -> Self {
        self.modifiers.push(modifier.into());
        self
    }

    /// Mark as a `partial` method; without a body it renders as a forward declaration
    pub fn partial(self) -> Self {
        self.with_modifier("partial")
    }

    /// Attribute text without brackets, e.g. `System.NonSerialized`
    pub fn with_attribute<S: Into<String>>(mut self, attribute: S) -> Self {
        self.attributes.push(attribute.into());
        self
    }

    pub fn with_parameter<T: Into<String>, N: Into<String>>(mut self, type_name: T, name: N) -> Self {
        if let MemberShape::Method { parameters, .. } = &mut self.shape {
            parameters.push(ParameterSpec {
                type_name: type_name.into(),
                name: name.into(),
            });
        }
        self
    }

    pub fn with_initializer<S: Into<String>>(mut self, value: S) -> Self {
        if let MemberShape::Field { initializer, .. } = &mut self.shape {
            *initializer = Some(value.into());
        }
        self
    }

    pub fn is_field(&self) -> bool {
        matches!(self.shape, MemberShape::Field { .. })
    }

    /// Members that may legally end in `;` instead of a body
    pub(crate) fn is_forward_declarable(&self) -> bool {
        self.modifiers
            .iter()
            .any(|m| m == "partial" || m == "abstract" || m == "extern")
    }

    /// Signature line without terminator
    pub(crate) fn signature(&self) -> String {
        let mut signature = String::new();
        if let Some(accessibility) = &self.accessibility {
            signature.push_str(accessibility);
            signature.push(' ');
        }
        for modifier in &self.modifiers {
            signature.push_str(modifier);
            signature.push(' ');
        }
        match &self.shape {
            MemberShape::Field { type_name, initializer } => {
                signature.push_str(type_name);
                signature.push(' ');
                signature.push_str(&self.name);
                if let Some(value) = initializer {
                    signature.push_str(" = ");
                    signature.push_str(value);
                }
            }
            MemberShape::Method {
                return_type,
                parameters,
            } => {
                signature.push_str(return_type);
                signature.push(' ');
                signature.push_str(&self.name);
                signature.push('(');
                let rendered: Vec<String> = parameters
                    .iter()
                    .map(|p| format!("{} {}", p.type_name, p.name))
                    .collect();
                signature.push_str(&rendered.join(", "));
                signature.push(')');
            }
        }
        signature
    }
}
