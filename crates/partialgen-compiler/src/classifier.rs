//! Capability classifier
//!
//! Decides what a member type *is* from the generators' point of view by
//! walking the type and its base chain and matching the well-known runtime,
//! Addressables and Input System types. Classification never fails; anything
//! unrecognised is `CapabilityKind::None`.

use crate::facts::{CapabilityKind, InputSourceKind};
use partialgen_core::references::{ADDRESSABLES_NAMESPACE, INPUT_SYSTEM_NAMESPACE, RUNTIME_NAMESPACE};
use partialgen_core::semantic::{SemanticModel, MAX_BASE_DEPTH};
use partialgen_core::types::TypeRef;
use std::collections::HashMap;
use std::sync::Mutex;

/// Notifier capability of a type and the payload it carries
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Classification {
    pub capability: CapabilityKind,
    pub payload: Option<TypeRef>,
}

/// Everything one base-chain walk learns about a type
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TypeFacts {
    pub classification: Classification,
    /// Loaded type when the type is an Addressables asset reference
    pub asset_payload: Option<TypeRef>,
    pub input_source: Option<InputSourceKind>,
}

/// Per-pass memo of type facts, keyed by the exact type handle
#[derive(Debug, Default)]
pub struct ClassificationCache {
    entries: Mutex<HashMap<TypeRef, TypeFacts>>,
}

impl ClassificationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, ty: &TypeRef) -> Option<TypeFacts> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(ty)
            .cloned()
    }

    fn insert(&self, ty: TypeRef, facts: TypeFacts) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(ty, facts);
    }
}

/// Classifier bound to one semantic model and one pass cache
#[derive(Clone, Copy)]
pub struct Classifier<'a> {
    model: &'a dyn SemanticModel,
    cache: &'a ClassificationCache,
}

impl<'a> Classifier<'a> {
    pub fn new(model: &'a dyn SemanticModel, cache: &'a ClassificationCache) -> Self {
        Self { model, cache }
    }

    pub fn model(&self) -> &'a dyn SemanticModel {
        self.model
    }

    /// Notifier capability and payload of `ty`
    pub fn classify(&self, ty: &TypeRef) -> Classification {
        self.facts(ty).classification
    }

    /// The type an Addressables reference loads
    pub fn asset_payload(&self, ty: &TypeRef) -> Option<TypeRef> {
        self.facts(ty).asset_payload
    }

    pub fn input_source(&self, ty: &TypeRef) -> Option<InputSourceKind> {
        self.facts(ty).input_source
    }

    /// All facts about `ty`, memoised for the pass
    pub fn facts(&self, ty: &TypeRef) -> TypeFacts {
        if let Some(facts) = self.cache.get(ty) {
            return facts;
        }
        let facts = self.walk(ty);
        self.cache.insert(ty.clone(), facts.clone());
        facts
    }

    fn walk(&self, ty: &TypeRef) -> TypeFacts {
        let mut facts = TypeFacts::default();
        let mut current = Some(ty.clone());
        let mut depth = 0;

        while let Some(candidate) = current {
            if facts.classification.capability == CapabilityKind::None {
                if let Some(classification) = match_notifier(&candidate) {
                    facts.classification = classification;
                }
            }
            if facts.asset_payload.is_none() {
                facts.asset_payload = match_asset_reference(&candidate);
            }
            if facts.input_source.is_none() {
                facts.input_source = match_input_source(&candidate);
            }

            depth += 1;
            if depth >= MAX_BASE_DEPTH {
                log::warn!("Base chain of {} exceeds {} levels, stopping", ty, MAX_BASE_DEPTH);
                break;
            }
            current = self.model.base_type(&candidate);
        }

        facts
    }
}

fn match_notifier(ty: &TypeRef) -> Option<Classification> {
    if ty.is(RUNTIME_NAMESPACE, "ValueNotifier", 1) {
        Some(Classification {
            capability: CapabilityKind::ValueNotifier,
            payload: ty.args.first().cloned(),
        })
    } else if ty.is(RUNTIME_NAMESPACE, "EventNotifier", 0) {
        Some(Classification {
            capability: CapabilityKind::EventNotifier,
            payload: None,
        })
    } else if ty.is(RUNTIME_NAMESPACE, "EventNotifier", 1) {
        Some(Classification {
            capability: CapabilityKind::GenericEventNotifier,
            payload: ty.args.first().cloned(),
        })
    } else {
        None
    }
}

fn match_asset_reference(ty: &TypeRef) -> Option<TypeRef> {
    if ty.is(ADDRESSABLES_NAMESPACE, "AssetReferenceT", 1) {
        ty.args.first().cloned()
    } else if ty.is(ADDRESSABLES_NAMESPACE, "AssetReference", 0) {
        Some(TypeRef::new(Some("UnityEngine"), "Object"))
    } else {
        None
    }
}

fn match_input_source(ty: &TypeRef) -> Option<InputSourceKind> {
    if ty.is(INPUT_SYSTEM_NAMESPACE, "InputActionAsset", 0) {
        Some(InputSourceKind::ActionAsset)
    } else if ty.is(INPUT_SYSTEM_NAMESPACE, "PlayerInput", 0) {
        Some(InputSourceKind::PlayerInput)
    } else {
        None
    }
}
