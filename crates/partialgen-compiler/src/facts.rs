//! Fact snapshots
//!
//! A [`FactSnapshot`] is everything a generation driver may look at for one
//! declaration. It is a plain value: no source locations, no references into
//! the host model. Two passes that extract equal snapshots produce identical
//! output, which is what the incremental cache relies on.

use partialgen_core::model::{ContainingType, DeclarationKind};
use partialgen_core::types::TypeRef;
use serde::Serialize;

/// What the classifier recognised a member type as
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    #[default]
    None,
    /// `ValueNotifier<T>`: raises `ValueChanged(T previous, T current)`
    ValueNotifier,
    /// `EventNotifier`: raises `Raised()`
    EventNotifier,
    /// `EventNotifier<T>`: raises `Raised(T value)`
    GenericEventNotifier,
}

impl CapabilityKind {
    pub fn is_notifier(self) -> bool {
        self != CapabilityKind::None
    }

    /// Name of the event the generated code subscribes to
    pub fn event_name(self) -> Option<&'static str> {
        match self {
            CapabilityKind::None => None,
            CapabilityKind::ValueNotifier => Some("ValueChanged"),
            CapabilityKind::EventNotifier | CapabilityKind::GenericEventNotifier => Some("Raised"),
        }
    }
}

/// Container an input action is looked up in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSourceKind {
    /// `InputActionAsset`, searched with `FindAction`
    ActionAsset,
    /// `PlayerInput`, searched through its `actions`
    PlayerInput,
}

/// One phase of an input action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum InputPhase {
    Started,
    Performed,
    Canceled,
}

impl InputPhase {
    pub const ALL: [InputPhase; 3] = [InputPhase::Started, InputPhase::Performed, InputPhase::Canceled];

    /// Label used in callback names and attribute flags
    pub fn label(self) -> &'static str {
        match self {
            InputPhase::Started => "Started",
            InputPhase::Performed => "Performed",
            InputPhase::Canceled => "Canceled",
        }
    }

    /// The `InputAction` event raised for this phase
    pub fn event_name(self) -> &'static str {
        match self {
            InputPhase::Started => "started",
            InputPhase::Performed => "performed",
            InputPhase::Canceled => "canceled",
        }
    }
}

/// Selected input phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CallbackPhases {
    pub started: bool,
    pub performed: bool,
    pub canceled: bool,
}

impl Default for CallbackPhases {
    fn default() -> Self {
        Self {
            started: false,
            performed: true,
            canceled: false,
        }
    }
}

impl CallbackPhases {
    pub fn all() -> Self {
        Self {
            started: true,
            performed: true,
            canceled: true,
        }
    }

    pub fn contains(&self, phase: InputPhase) -> bool {
        match phase {
            InputPhase::Started => self.started,
            InputPhase::Performed => self.performed,
            InputPhase::Canceled => self.canceled,
        }
    }

    /// Selected phases in `Started`, `Performed`, `Canceled` order
    pub fn iter(&self) -> impl Iterator<Item = InputPhase> + '_ {
        InputPhase::ALL.into_iter().filter(move |phase| self.contains(*phase))
    }
}

/// Parsed `[GenerateInputCallbacks]` arguments
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct InputRequest {
    pub action: String,
    pub source: InputSourceKind,
    pub phases: CallbackPhases,
}

/// Which annotations a member carries
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct MemberRequests {
    pub loader: bool,
    pub subscribe: bool,
    pub input: Option<InputRequest>,
}

/// One member a driver generates code for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AnnotatedMember {
    /// Member name as written
    pub source_name: String,
    /// PascalCase label before disambiguation
    pub derived_name: String,
    /// Label unique within the snapshot, e.g. `Health_1`
    pub unique_name: String,
    pub member_type: TypeRef,
    pub payload_type: Option<TypeRef>,
    pub capability: CapabilityKind,
    /// The member is a loadable asset reference; generated code targets the loaded asset
    pub asset_reference: bool,
    pub requests: MemberRequests,
}

/// The declaration a snapshot belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DeclarationInfo {
    pub identity: TypeRef,
    pub name: String,
    pub namespace: Option<String>,
    /// Outer types, outermost first
    pub containing: Vec<ContainingType>,
    pub kind: DeclarationKind,
    pub type_parameters: Vec<String>,
}

impl DeclarationInfo {
    /// `Namespace.Outer.Name`, plus a `` `N `` arity marker for generic types
    pub fn qualified_name(&self) -> String {
        let mut name = self.identity.qualified_name();
        if !self.type_parameters.is_empty() {
            name.push('`');
            name.push_str(&self.type_parameters.len().to_string());
        }
        name
    }
}

/// Immutable per-declaration input to a generation driver
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FactSnapshot {
    pub declaration: DeclarationInfo,
    pub members: Vec<AnnotatedMember>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_selection_order() {
        let phases = CallbackPhases {
            started: true,
            performed: false,
            canceled: true,
        };
        let selected: Vec<_> = phases.iter().collect();
        assert_eq!(selected, vec![InputPhase::Started, InputPhase::Canceled]);
        assert_eq!(CallbackPhases::default().iter().count(), 1);
        assert_eq!(CallbackPhases::all().iter().count(), 3);
    }

    #[test]
    fn test_qualified_names() {
        let declaration = DeclarationInfo {
            identity: TypeRef::new(Some("Game"), "Outer.Player")
                .with_args(vec![TypeRef::type_parameter("T")]),
            name: "Player".to_string(),
            namespace: Some("Game".to_string()),
            containing: vec![ContainingType {
                name: "Outer".to_string(),
                kind: DeclarationKind::Class,
            }],
            kind: DeclarationKind::Class,
            type_parameters: vec!["T".to_string()],
        };
        assert_eq!(declaration.qualified_name(), "Game.Outer.Player`1");
    }

    #[test]
    fn test_event_names() {
        assert_eq!(CapabilityKind::ValueNotifier.event_name(), Some("ValueChanged"));
        assert_eq!(CapabilityKind::GenericEventNotifier.event_name(), Some("Raised"));
        assert!(!CapabilityKind::None.is_notifier());
    }
}
