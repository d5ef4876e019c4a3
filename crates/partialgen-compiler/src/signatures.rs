//! Callback signatures shared by the drivers and the analyzers
//!
//! Every generated `partial void` hook and the analyzer that checks it is
//! implemented come from [`expected_callbacks`], so the two cannot drift.

use crate::annotations::AnnotationKind;
use crate::emit::MemberSpec;
use crate::facts::{AnnotatedMember, CapabilityKind, InputPhase};
use partialgen_core::references::INPUT_SYSTEM_NAMESPACE;
use partialgen_core::types::TypeRef;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallbackParameter {
    pub name: &'static str,
    pub ty: TypeRef,
}

/// A `partial void` hook the user is expected to implement
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallbackSignature {
    pub name: String,
    pub parameters: Vec<CallbackParameter>,
}

impl CallbackSignature {
    fn new(name: String, parameters: Vec<CallbackParameter>) -> Self {
        Self { name, parameters }
    }

    /// `partial void` declaration with parameter types rendered by `render`
    pub fn to_member_spec<F: Fn(&TypeRef) -> String>(&self, render: F) -> MemberSpec {
        self.parameters.iter().fold(
            MemberSpec::method("void", self.name.clone()).partial(),
            |spec, parameter| spec.with_parameter(render(&parameter.ty), parameter.name),
        )
    }
}

impl fmt::Display for CallbackSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, parameter) in self.parameters.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} {}", parameter.ty, parameter.name)?;
        }
        f.write_str(")")
    }
}

/// `UnityEngine.InputSystem.InputAction.CallbackContext`
pub fn callback_context_type() -> TypeRef {
    TypeRef::new(Some(INPUT_SYSTEM_NAMESPACE), "InputAction.CallbackContext")
}

fn unity_object() -> TypeRef {
    TypeRef::new(Some("UnityEngine"), "Object")
}

/// Hooks generated for `member` under annotation `kind`, in emission order
pub fn expected_callbacks(kind: AnnotationKind, member: &AnnotatedMember) -> Vec<CallbackSignature> {
    let label = &member.unique_name;
    match kind {
        AnnotationKind::Loader => {
            let asset = member.payload_type.clone().unwrap_or_else(unity_object);
            vec![CallbackSignature::new(
                format!("On{}Loaded", label),
                vec![CallbackParameter { name: "asset", ty: asset }],
            )]
        }
        AnnotationKind::Subscribe => {
            let payload = || member.payload_type.clone().unwrap_or_else(unity_object);
            match member.capability {
                CapabilityKind::None => Vec::new(),
                CapabilityKind::ValueNotifier => vec![CallbackSignature::new(
                    format!("On{}Changed", label),
                    vec![
                        CallbackParameter {
                            name: "previous",
                            ty: payload(),
                        },
                        CallbackParameter {
                            name: "current",
                            ty: payload(),
                        },
                    ],
                )],
                CapabilityKind::EventNotifier => {
                    vec![CallbackSignature::new(format!("On{}Raised", label), Vec::new())]
                }
                CapabilityKind::GenericEventNotifier => vec![CallbackSignature::new(
                    format!("On{}Raised", label),
                    vec![CallbackParameter {
                        name: "value",
                        ty: payload(),
                    }],
                )],
            }
        }
        AnnotationKind::InputCallbacks => match &member.requests.input {
            Some(request) => request
                .phases
                .iter()
                .map(|phase| input_callback(label, phase))
                .collect(),
            None => Vec::new(),
        },
    }
}

fn input_callback(label: &str, phase: InputPhase) -> CallbackSignature {
    CallbackSignature::new(
        format!("On{}{}", label, phase.label()),
        vec![CallbackParameter {
            name: "context",
            ty: callback_context_type(),
        }],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::{CallbackPhases, InputRequest, InputSourceKind, MemberRequests};

    fn member(capability: CapabilityKind, payload: Option<TypeRef>) -> AnnotatedMember {
        AnnotatedMember {
            source_name: "health".to_string(),
            derived_name: "Health".to_string(),
            unique_name: "Health".to_string(),
            member_type: TypeRef::new(Some("Partialgen"), "ValueNotifier"),
            payload_type: payload,
            capability,
            asset_reference: false,
            requests: MemberRequests::default(),
        }
    }

    #[test]
    fn test_subscription_callbacks() {
        let int = TypeRef::keyword("int");
        let changed = expected_callbacks(AnnotationKind::Subscribe, &member(CapabilityKind::ValueNotifier, int.clone()));
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].to_string(), "OnHealthChanged(int previous, int current)");

        let raised = expected_callbacks(AnnotationKind::Subscribe, &member(CapabilityKind::EventNotifier, None));
        assert_eq!(raised[0].to_string(), "OnHealthRaised()");

        let raised = expected_callbacks(AnnotationKind::Subscribe, &member(CapabilityKind::GenericEventNotifier, int));
        assert_eq!(raised[0].to_string(), "OnHealthRaised(int value)");
    }

    #[test]
    fn test_input_callbacks_follow_phases() {
        let mut jump = member(CapabilityKind::None, None);
        jump.unique_name = "Jump".to_string();
        jump.requests.input = Some(InputRequest {
            action: "Jump".to_string(),
            source: InputSourceKind::ActionAsset,
            phases: CallbackPhases {
                started: true,
                performed: false,
                canceled: true,
            },
        });

        let names: Vec<_> = expected_callbacks(AnnotationKind::InputCallbacks, &jump)
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["OnJumpStarted", "OnJumpCanceled"]);
    }

    #[test]
    fn test_member_spec_rendering() {
        let loaded = expected_callbacks(
            AnnotationKind::Loader,
            &member(CapabilityKind::None, Some(TypeRef::new(Some("UnityEngine"), "Sprite"))),
        );
        let spec = loaded[0].to_member_spec(|ty| ty.simple_name().to_string());
        assert_eq!(spec.signature(), "partial void OnHealthLoaded(Sprite asset)");
    }
}
