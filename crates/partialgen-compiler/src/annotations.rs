//! Annotation surface
//!
//! The three attributes of the `Partialgen` runtime namespace that trigger
//! generation, and parsing of `[GenerateInputCallbacks]` arguments.

use crate::facts::CallbackPhases;
use crate::naming::{is_valid_identifier, to_label};
use partialgen_core::model::{AttributeSyntax, AttributeValue};
use partialgen_core::references::RUNTIME_NAMESPACE;
use partialgen_core::types::TypeRef;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Which generator an annotation requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    /// `[GenerateLoader]`
    Loader,
    /// `[GenerateSubscribeMethods]`
    Subscribe,
    /// `[GenerateInputCallbacks("Action")]`
    InputCallbacks,
}

impl AnnotationKind {
    pub const ALL: [AnnotationKind; 3] = [
        AnnotationKind::Loader,
        AnnotationKind::Subscribe,
        AnnotationKind::InputCallbacks,
    ];

    /// Attribute class name, including the `Attribute` suffix
    pub fn attribute_name(self) -> &'static str {
        match self {
            AnnotationKind::Loader => "GenerateLoaderAttribute",
            AnnotationKind::Subscribe => "GenerateSubscribeMethodsAttribute",
            AnnotationKind::InputCallbacks => "GenerateInputCallbacksAttribute",
        }
    }

    /// Name as usually written in source
    pub fn short_name(self) -> &'static str {
        self.attribute_name().trim_end_matches("Attribute")
    }

    /// Map a resolved attribute type to the annotation it stands for
    pub fn from_attribute_type(ty: &TypeRef) -> Option<AnnotationKind> {
        AnnotationKind::ALL
            .into_iter()
            .find(|kind| ty.is(RUNTIME_NAMESPACE, kind.attribute_name(), 0))
    }
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.short_name())
    }
}

/// Problems with `[GenerateInputCallbacks]` arguments
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    #[error("the input action name is missing")]
    MissingActionName,

    #[error("argument '{argument}' {reason}")]
    Invalid { argument: String, reason: String },
}

/// Named boolean flags accepted by `[GenerateInputCallbacks]`
const PHASE_FLAGS: &[&str] = &["Started", "Performed", "Canceled", "All"];

/// Parse `[GenerateInputCallbacks("Action", Started = true, ...)]`
///
/// The action name is the first positional argument, or the named `Action`
/// argument, and must label to a valid identifier (`Gameplay/Jump` labels to
/// `GameplayJump`, `1st` does not label at all). No phase flag selects
/// `Performed` and `All = true` selects every phase. Flags that are given but
/// all false are rejected since they would disable every callback.
pub fn parse_input_arguments(attribute: &AttributeSyntax) -> Result<(String, CallbackPhases), ArgumentError> {
    let mut positional = attribute.positional();
    let action_value = positional.next().or_else(|| attribute.named("Action"));
    if let Some(extra) = positional.next() {
        return Err(ArgumentError::Invalid {
            argument: describe(extra),
            reason: "is not expected; only the action name is positional".to_string(),
        });
    }

    let action = match action_value {
        None => return Err(ArgumentError::MissingActionName),
        Some(AttributeValue::String(name)) if name.trim().is_empty() => return Err(ArgumentError::MissingActionName),
        Some(AttributeValue::String(name)) if !is_valid_identifier(&to_label(name)) => {
            return Err(ArgumentError::Invalid {
                argument: format!("\"{}\"", name),
                reason: "does not form a valid identifier".to_string(),
            })
        }
        Some(AttributeValue::String(name)) => name.trim().to_string(),
        Some(other) => {
            return Err(ArgumentError::Invalid {
                argument: describe(other),
                reason: "must be a string literal naming the input action".to_string(),
            })
        }
    };

    let mut selected = CallbackPhases {
        started: false,
        performed: false,
        canceled: false,
    };
    let mut all = false;
    let mut flagged = false;

    for argument in &attribute.arguments {
        let Some(name) = argument.name.as_deref() else {
            continue;
        };
        if name == "Action" {
            continue;
        }
        if !PHASE_FLAGS.contains(&name) {
            return Err(ArgumentError::Invalid {
                argument: name.to_string(),
                reason: "is not a known option".to_string(),
            });
        }
        let Some(enabled) = argument.value.as_bool() else {
            return Err(ArgumentError::Invalid {
                argument: name.to_string(),
                reason: "must be true or false".to_string(),
            });
        };
        flagged = true;
        match name {
            "Started" => selected.started = enabled,
            "Performed" => selected.performed = enabled,
            "Canceled" => selected.canceled = enabled,
            _ => all = enabled,
        }
    }

    let phases = if all {
        CallbackPhases::all()
    } else if selected.iter().next().is_some() {
        selected
    } else if flagged {
        return Err(ArgumentError::Invalid {
            argument: PHASE_FLAGS.join(", "),
            reason: "are all false; at least one callback phase must be enabled".to_string(),
        });
    } else {
        CallbackPhases::default()
    };

    Ok((action, phases))
}

fn describe(value: &AttributeValue) -> String {
    match value {
        AttributeValue::Bool(b) => b.to_string(),
        AttributeValue::Number(n) => n.to_string(),
        AttributeValue::String(s) => format!("\"{}\"", s),
        AttributeValue::Expression { expr } => expr.clone(),
    }
}
