//! Candidate extraction
//!
//! Two stages: a cheap syntactic pre-filter that rejects declarations without
//! any attributed member, then a semantic walk over every partial part of the
//! declared type that resolves annotations and member types and turns each
//! qualifying member into an [`AnnotatedMember`].

use crate::annotations::{parse_input_arguments, AnnotationKind, ArgumentError};
use crate::classifier::{Classifier, TypeFacts};
use crate::facts::{
    AnnotatedMember, CallbackPhases, CapabilityKind, DeclarationInfo, FactSnapshot, InputRequest, MemberRequests,
};
use crate::naming::{is_valid_identifier, strip_suffix, to_label, NameAllocator};
use partialgen_core::cancellation::{CancellationToken, Cancelled};
use partialgen_core::model::{AttributeSyntax, DeclarationSyntax, MemberSyntax};
use partialgen_core::semantic::DeclarationRef;
use partialgen_core::types::TypeRef;
use thiserror::Error;

/// Suffixes dropped from asset reference member names
const ASSET_REFERENCE_SUFFIXES: &[&str] = &["Reference", "Ref"];

/// Why a member was left out of a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemberSkip {
    #[error("type '{type_name}' could not be resolved")]
    UnresolvedType { type_name: String },

    #[error("type '{type_name}' cannot be used with {annotation}")]
    UnsupportedType {
        type_name: String,
        annotation: AnnotationKind,
    },

    #[error("the input action name is missing")]
    MissingActionName,

    #[error("argument '{argument}' {reason}")]
    InvalidArgument { argument: String, reason: String },

    #[error("asset reference '{member}' must also be annotated with [GenerateLoader] to be subscribed")]
    AssetRequiresLoader { member: String },
}

impl From<ArgumentError> for MemberSkip {
    fn from(error: ArgumentError) -> Self {
        match error {
            ArgumentError::MissingActionName => MemberSkip::MissingActionName,
            ArgumentError::Invalid { argument, reason } => MemberSkip::InvalidArgument { argument, reason },
        }
    }
}

/// Syntactic pre-filter: does any member carry at least one attribute?
pub fn has_annotated_members(declaration: &DeclarationSyntax, cancel: &CancellationToken) -> Result<bool, Cancelled> {
    for member in &declaration.members {
        cancel.check()?;
        if !member.attributes.is_empty() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// One use of a partialgen annotation on a member
#[derive(Debug, Clone)]
pub struct AnnotationUse<'a> {
    pub kind: AnnotationKind,
    pub attribute: &'a AttributeSyntax,
    pub outcome: Result<AnnotatedMember, MemberSkip>,
}

/// A data member carrying at least one partialgen annotation
#[derive(Debug, Clone)]
pub struct MemberCandidate<'a> {
    /// The declaration part the member is written in
    pub part: DeclarationRef<'a>,
    pub syntax: &'a MemberSyntax,
    pub member_type: Option<TypeRef>,
    pub unique_name: String,
    pub annotations: Vec<AnnotationUse<'a>>,
}

impl<'a> MemberCandidate<'a> {
    pub fn annotation(&self, kind: AnnotationKind) -> Option<&AnnotationUse<'a>> {
        self.annotations.iter().find(|a| a.kind == kind)
    }

    pub fn has(&self, kind: AnnotationKind) -> bool {
        self.annotation(kind).is_some()
    }
}

/// Every annotated data member of a declared type, across all its parts
#[derive(Debug, Clone)]
pub struct CollectedMembers<'a> {
    pub declaration: DeclarationInfo,
    pub parts: Vec<DeclarationRef<'a>>,
    pub candidates: Vec<MemberCandidate<'a>>,
}

impl<'a> CollectedMembers<'a> {
    /// Members that qualify for `kind`, in declaration order
    pub fn qualifying(
        &self,
        kind: AnnotationKind,
    ) -> impl Iterator<Item = (&MemberCandidate<'a>, &AnnotatedMember)> + '_ {
        self.candidates.iter().filter_map(move |candidate| {
            let member = candidate.annotation(kind)?.outcome.as_ref().ok()?;
            Some((candidate, member))
        })
    }

    /// Build the snapshot for `kind`, `None` if no member qualifies
    pub fn snapshot(&self, kind: AnnotationKind) -> Option<FactSnapshot> {
        let members: Vec<AnnotatedMember> = self.qualifying(kind).map(|(_, member)| member.clone()).collect();
        if members.is_empty() {
            return None;
        }
        Some(FactSnapshot {
            declaration: self.declaration.clone(),
            members,
        })
    }
}

/// Semantic walk over the members of the type declared by `declaration`
///
/// Returns `None` when the declaration does not declare a resolvable type.
pub fn collect_members<'a>(
    classifier: &Classifier<'a>,
    declaration: DeclarationRef<'a>,
    cancel: &CancellationToken,
) -> Result<Option<CollectedMembers<'a>>, Cancelled> {
    let model = classifier.model();
    let Some(identity) = model.declared_type(declaration) else {
        return Ok(None);
    };

    let mut parts = model.declaration_parts(&identity);
    if parts.is_empty() {
        parts.push(declaration);
    }

    let syntax = declaration.syntax;
    let info = DeclarationInfo {
        identity,
        name: syntax.name.clone(),
        namespace: syntax.namespace.clone(),
        containing: syntax.containing_types.clone(),
        kind: syntax.kind,
        type_parameters: syntax.type_parameters.clone(),
    };

    let mut names = NameAllocator::new();
    let mut candidates = Vec::new();

    for part in &parts {
        for member in &part.syntax.members {
            cancel.check()?;
            if !member.is_data_member() || member.attributes.is_empty() {
                continue;
            }

            let uses: Vec<(AnnotationKind, &AttributeSyntax)> = member
                .attributes
                .iter()
                .filter_map(|attribute| {
                    let ty = model.resolve_attribute(attribute, *part)?;
                    AnnotationKind::from_attribute_type(&ty).map(|kind| (kind, attribute))
                })
                .collect();
            if uses.is_empty() {
                continue;
            }

            candidates.push(build_candidate(classifier, *part, member, &uses, &mut names));
        }
    }

    log::debug!(
        "Collected {} annotated members of {} across {} parts",
        candidates.len(),
        info.identity,
        parts.len()
    );

    Ok(Some(CollectedMembers {
        declaration: info,
        parts,
        candidates,
    }))
}

fn build_candidate<'a>(
    classifier: &Classifier<'a>,
    part: DeclarationRef<'a>,
    member: &'a MemberSyntax,
    uses: &[(AnnotationKind, &'a AttributeSyntax)],
    names: &mut NameAllocator,
) -> MemberCandidate<'a> {
    let member_type = classifier.model().resolve_type(&member.type_name, part);
    let facts = member_type.as_ref().map(|ty| classifier.facts(ty)).unwrap_or_default();

    let has = |kind: AnnotationKind| uses.iter().any(|(k, _)| *k == kind);
    let input_arguments = uses
        .iter()
        .find(|(kind, _)| *kind == AnnotationKind::InputCallbacks)
        .map(|(_, attribute)| parse_input_arguments(attribute));

    let input = match (&input_arguments, facts.input_source) {
        (Some(Ok((action, phases))), Some(source)) => Some(InputRequest {
            action: action.clone(),
            source,
            phases: *phases,
        }),
        _ => None,
    };

    let derived_name = match (&input_arguments, &facts.asset_payload) {
        (Some(Ok((action, _))), _) => to_label(action),
        (_, Some(_)) => strip_suffix(&to_label(&member.name), ASSET_REFERENCE_SUFFIXES).to_string(),
        _ => to_label(&member.name),
    };
    // Action names are validated while parsing; member names like `_` or `_1` are not
    let derived_name = if is_valid_identifier(&derived_name) {
        derived_name
    } else {
        format!("Member{}", derived_name)
    };

    let requests = MemberRequests {
        loader: has(AnnotationKind::Loader),
        subscribe: has(AnnotationKind::Subscribe),
        input,
    };
    let base = BaseMember {
        member,
        member_type: member_type.as_ref(),
        facts: &facts,
        derived_name: &derived_name,
        requests: &requests,
    };

    let mut annotations: Vec<AnnotationUse<'a>> = uses
        .iter()
        .map(|(kind, attribute)| {
            let outcome = match kind {
                AnnotationKind::Loader => base.loader(),
                AnnotationKind::Subscribe => base.subscribe(classifier),
                AnnotationKind::InputCallbacks => base.input(input_arguments.clone()),
            };
            AnnotationUse {
                kind: *kind,
                attribute,
                outcome,
            }
        })
        .collect();

    // Skipped members generate nothing, so they never claim a name
    let unique_name = if annotations.iter().any(|a| a.outcome.is_ok()) {
        names.allocate(&derived_name)
    } else {
        derived_name
    };
    for generated in annotations.iter_mut().filter_map(|a| a.outcome.as_mut().ok()) {
        generated.unique_name = unique_name.clone();
    }

    MemberCandidate {
        part,
        syntax: member,
        member_type,
        unique_name,
        annotations,
    }
}

/// Shared inputs for evaluating each annotation of one member
struct BaseMember<'m> {
    member: &'m MemberSyntax,
    member_type: Option<&'m TypeRef>,
    facts: &'m TypeFacts,
    derived_name: &'m str,
    requests: &'m MemberRequests,
}

impl BaseMember<'_> {
    fn resolved(&self) -> Result<&TypeRef, MemberSkip> {
        self.member_type.ok_or_else(|| MemberSkip::UnresolvedType {
            type_name: self.member.type_name.clone(),
        })
    }

    fn unsupported(&self, annotation: AnnotationKind) -> MemberSkip {
        MemberSkip::UnsupportedType {
            type_name: self.member.type_name.clone(),
            annotation,
        }
    }

    fn build(
        &self,
        member_type: &TypeRef,
        capability: CapabilityKind,
        payload_type: Option<TypeRef>,
        asset_reference: bool,
    ) -> AnnotatedMember {
        AnnotatedMember {
            source_name: self.member.name.clone(),
            derived_name: self.derived_name.to_string(),
            unique_name: self.derived_name.to_string(),
            member_type: member_type.clone(),
            payload_type,
            capability,
            asset_reference,
            requests: self.requests.clone(),
        }
    }

    fn loader(&self) -> Result<AnnotatedMember, MemberSkip> {
        let member_type = self.resolved()?;
        let payload = self
            .facts
            .asset_payload
            .clone()
            .ok_or_else(|| self.unsupported(AnnotationKind::Loader))?;
        Ok(self.build(member_type, CapabilityKind::None, Some(payload), true))
    }

    fn subscribe(&self, classifier: &Classifier<'_>) -> Result<AnnotatedMember, MemberSkip> {
        let member_type = self.resolved()?;

        let classification = &self.facts.classification;
        if classification.capability.is_notifier() {
            return Ok(self.build(
                member_type,
                classification.capability,
                classification.payload.clone(),
                false,
            ));
        }

        // A reference to a notifier asset subscribes to the loaded asset
        let asset = self
            .facts
            .asset_payload
            .as_ref()
            .ok_or_else(|| self.unsupported(AnnotationKind::Subscribe))?;
        let loaded = classifier.classify(asset);
        if !loaded.capability.is_notifier() {
            return Err(self.unsupported(AnnotationKind::Subscribe));
        }
        if !self.requests.loader {
            return Err(MemberSkip::AssetRequiresLoader {
                member: self.member.name.clone(),
            });
        }
        Ok(self.build(member_type, loaded.capability, loaded.payload, true))
    }

    fn input(&self, arguments: Option<Result<(String, CallbackPhases), ArgumentError>>) -> Result<AnnotatedMember, MemberSkip> {
        let member_type = self.resolved()?;
        if let Some(Err(error)) = arguments {
            return Err(error.into());
        }
        if self.facts.input_source.is_none() || self.requests.input.is_none() {
            return Err(self.unsupported(AnnotationKind::InputCallbacks));
        }
        Ok(self.build(member_type, CapabilityKind::None, None, false))
    }
}

/// Extract the snapshot `kind` needs for the type declared by `declaration`
///
/// `Ok(None)` means there is nothing to generate.
pub fn extract(
    classifier: &Classifier<'_>,
    declaration: DeclarationRef<'_>,
    kind: AnnotationKind,
    cancel: &CancellationToken,
) -> Result<Option<FactSnapshot>, Cancelled> {
    Ok(collect_members(classifier, declaration, cancel)?.and_then(|collected| collected.snapshot(kind)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ClassificationCache;
    use crate::facts::{InputPhase, InputSourceKind};
    use partialgen_core::model::{AttributeValue, SyntaxTree};
    use partialgen_core::semantic::{Compilation, SemanticModel};

    fn player(members: Vec<MemberSyntax>) -> Compilation {
        let mut declaration = DeclarationSyntax::class("Player").in_namespace("Game").partial();
        declaration.members = members;
        Compilation::new(vec![SyntaxTree::new("Player.cs")
            .with_using("Partialgen")
            .with_using("UnityEngine")
            .with_using("UnityEngine.AddressableAssets")
            .with_using("UnityEngine.InputSystem")
            .with_declaration(declaration)])
    }

    fn subscribe() -> AttributeSyntax {
        AttributeSyntax::new("GenerateSubscribeMethods")
    }

    fn collect(compilation: &Compilation) -> CollectedMembers<'_> {
        let cache: &'static ClassificationCache = Box::leak(Box::new(ClassificationCache::new()));
        let classifier = Classifier::new(compilation, cache);
        let declaration = compilation.declarations()[0];
        collect_members(&classifier, declaration, &CancellationToken::none())
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_prefilter() {
        let cancel = CancellationToken::new();
        let plain = DeclarationSyntax::class("Plain").with_member(MemberSyntax::field("x", "int"));
        assert!(!has_annotated_members(&plain, &cancel).unwrap());

        let annotated = plain.with_member(MemberSyntax::field("y", "int").with_attribute(subscribe()));
        assert!(has_annotated_members(&annotated, &cancel).unwrap());

        cancel.cancel();
        assert_eq!(has_annotated_members(&annotated, &cancel), Err(Cancelled));
    }

    #[test]
    fn test_value_notifier_member() {
        let compilation = player(vec![
            MemberSyntax::field("health", "ValueNotifier<int>").with_attribute(subscribe()),
            MemberSyntax::field("speed", "float"),
        ]);
        let collected = collect(&compilation);
        let snapshot = collected.snapshot(AnnotationKind::Subscribe).unwrap();

        assert_eq!(snapshot.declaration.identity, TypeRef::new(Some("Game"), "Player"));
        assert_eq!(snapshot.members.len(), 1);
        let member = &snapshot.members[0];
        assert_eq!(member.source_name, "health");
        assert_eq!(member.unique_name, "Health");
        assert_eq!(member.capability, CapabilityKind::ValueNotifier);
        assert_eq!(member.payload_type, TypeRef::keyword("int"));
        assert!(!member.asset_reference);
        assert!(collected.snapshot(AnnotationKind::Loader).is_none());
    }

    #[test]
    fn test_names_are_disambiguated_across_fields_and_properties() {
        let compilation = player(vec![
            MemberSyntax::field("health", "ValueNotifier<int>").with_attribute(subscribe()),
            MemberSyntax::property("Health", "EventNotifier").with_attribute(subscribe()),
            MemberSyntax::field("_health", "EventNotifier<int>").with_attribute(subscribe()),
        ]);
        let snapshot = collect(&compilation).snapshot(AnnotationKind::Subscribe).unwrap();
        let names: Vec<_> = snapshot.members.iter().map(|m| m.unique_name.as_str()).collect();
        assert_eq!(names, vec!["Health", "Health_1", "Health_2"]);
    }

    #[test]
    fn test_member_skips() {
        let compilation = player(vec![
            MemberSyntax::field("missing", "Missing").with_attribute(subscribe()),
            MemberSyntax::field("count", "int").with_attribute(subscribe()),
            MemberSyntax::field("channelRef", "AssetReferenceT<EventNotifier>").with_attribute(subscribe()),
            MemberSyntax::field("controls", "InputActionAsset")
                .with_attribute(AttributeSyntax::new("GenerateInputCallbacks")),
            MemberSyntax::field("ok", "EventNotifier").with_attribute(subscribe()),
        ]);
        let collected = collect(&compilation);
        let outcome = |index: usize, kind| collected.candidates[index].annotation(kind).unwrap().outcome.clone();

        assert!(matches!(outcome(0, AnnotationKind::Subscribe), Err(MemberSkip::UnresolvedType { .. })));
        assert!(matches!(outcome(1, AnnotationKind::Subscribe), Err(MemberSkip::UnsupportedType { .. })));
        assert!(matches!(outcome(2, AnnotationKind::Subscribe), Err(MemberSkip::AssetRequiresLoader { .. })));
        assert_eq!(outcome(3, AnnotationKind::InputCallbacks), Err(MemberSkip::MissingActionName));

        // Only the valid member survives
        let snapshot = collected.snapshot(AnnotationKind::Subscribe).unwrap();
        assert_eq!(snapshot.members.len(), 1);
        assert_eq!(snapshot.members[0].source_name, "ok");
    }

    #[test]
    fn test_asset_reference_with_loader_and_subscription() {
        let compilation = player(vec![MemberSyntax::field("channelReference", "AssetReferenceT<ValueNotifier<float>>")
            .with_attribute(AttributeSyntax::new("GenerateLoader"))
            .with_attribute(subscribe())]);
        let collected = collect(&compilation);

        let loader = collected.snapshot(AnnotationKind::Loader).unwrap();
        assert_eq!(loader.members[0].unique_name, "Channel");
        assert_eq!(
            loader.members[0].payload_type.as_ref().map(|t| t.to_string()),
            Some("Partialgen.ValueNotifier<float>".to_string())
        );

        let subscriptions = collected.snapshot(AnnotationKind::Subscribe).unwrap();
        let member = &subscriptions.members[0];
        assert!(member.asset_reference);
        assert!(member.requests.loader);
        assert_eq!(member.capability, CapabilityKind::ValueNotifier);
        assert_eq!(member.payload_type, TypeRef::keyword("float"));
    }

    #[test]
    fn test_input_callbacks_member() {
        let compilation = player(vec![MemberSyntax::field("playerInput", "PlayerInput").with_attribute(
            AttributeSyntax::new("GenerateInputCallbacksAttribute")
                .with_argument(AttributeValue::string("Jump"))
                .with_named_argument("All", AttributeValue::Bool(true)),
        )]);
        let snapshot = collect(&compilation).snapshot(AnnotationKind::InputCallbacks).unwrap();
        let member = &snapshot.members[0];
        assert_eq!(member.unique_name, "Jump");

        let request = member.requests.input.as_ref().unwrap();
        assert_eq!(request.source, InputSourceKind::PlayerInput);
        assert_eq!(request.phases.iter().collect::<Vec<_>>(), InputPhase::ALL.to_vec());
    }

    #[test]
    fn test_map_qualified_action_labels() {
        let input = |action: &str| AttributeSyntax::new("GenerateInputCallbacks").with_argument(AttributeValue::string(action));
        let compilation = player(vec![
            MemberSyntax::field("controls", "InputActionAsset").with_attribute(input("Gameplay/Jump")),
            MemberSyntax::field("fallback", "InputActionAsset").with_attribute(input("1st")),
        ]);
        let collected = collect(&compilation);

        let snapshot = collected.snapshot(AnnotationKind::InputCallbacks).unwrap();
        assert_eq!(snapshot.members.len(), 1);
        let member = &snapshot.members[0];
        assert_eq!(member.unique_name, "GameplayJump");
        assert_eq!(member.requests.input.as_ref().unwrap().action, "Gameplay/Jump");

        assert!(matches!(
            &collected.candidates[1].annotation(AnnotationKind::InputCallbacks).unwrap().outcome,
            Err(MemberSkip::InvalidArgument { argument, .. }) if argument == "\"1st\""
        ));
    }

    #[test]
    fn test_skipped_members_do_not_claim_names() {
        let compilation = player(vec![
            MemberSyntax::field("health", "Missing").with_attribute(subscribe()),
            MemberSyntax::property("Health", "ValueNotifier<int>").with_attribute(subscribe()),
            MemberSyntax::field("_health", "EventNotifier").with_attribute(subscribe()),
        ]);
        let collected = collect(&compilation);
        let snapshot = collected.snapshot(AnnotationKind::Subscribe).unwrap();
        let names: Vec<_> = snapshot.members.iter().map(|m| m.unique_name.as_str()).collect();
        assert_eq!(names, vec!["Health", "Health_1"]);
        assert_eq!(collected.candidates[1].unique_name, "Health");
    }

    #[test]
    fn test_members_without_identifier_labels() {
        let compilation = player(vec![
            MemberSyntax::field("_", "EventNotifier").with_attribute(subscribe()),
            MemberSyntax::field("_1", "EventNotifier").with_attribute(subscribe()),
        ]);
        let snapshot = collect(&compilation).snapshot(AnnotationKind::Subscribe).unwrap();
        let names: Vec<_> = snapshot.members.iter().map(|m| m.unique_name.as_str()).collect();
        assert_eq!(names, vec!["Member", "Member1"]);
    }

    #[test]
    fn test_members_are_gathered_from_every_part() {
        let compilation = Compilation::new(vec![
            SyntaxTree::new("Player.cs").with_using("Partialgen").with_declaration(
                DeclarationSyntax::class("Player")
                    .partial()
                    .with_member(MemberSyntax::field("health", "ValueNotifier<int>").with_attribute(subscribe())),
            ),
            SyntaxTree::new("Player.Events.cs").with_using("Partialgen").with_declaration(
                DeclarationSyntax::class("Player")
                    .partial()
                    .with_member(MemberSyntax::field("died", "EventNotifier").with_attribute(subscribe())),
            ),
        ]);
        let cache = ClassificationCache::new();
        let classifier = Classifier::new(&compilation, &cache);

        for declaration in compilation.declarations() {
            let snapshot = extract(&classifier, declaration, AnnotationKind::Subscribe, &CancellationToken::none())
                .unwrap()
                .unwrap();
            let names: Vec<_> = snapshot.members.iter().map(|m| m.source_name.as_str()).collect();
            assert_eq!(names, vec!["health", "died"]);
        }
    }

    #[test]
    fn test_cancellation_stops_extraction() {
        let compilation = player(vec![MemberSyntax::field("health", "ValueNotifier<int>").with_attribute(subscribe())]);
        let cache = ClassificationCache::new();
        let classifier = Classifier::new(&compilation, &cache);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = extract(&classifier, compilation.declarations()[0], AnnotationKind::Subscribe, &cancel);
        assert_eq!(result, Err(Cancelled));
    }
}
