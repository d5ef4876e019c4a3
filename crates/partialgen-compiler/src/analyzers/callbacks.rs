//! Missing hand-written callbacks (`PG0001`-`PG0003`)

use super::{
    annotation_location, properties, AnalysisContext, Analyzer, MISSING_INPUT_CALLBACK, MISSING_LOADER_CALLBACK,
    MISSING_SUBSCRIPTION_CALLBACK,
};
use crate::annotations::AnnotationKind;
use crate::extraction::CollectedMembers;
use crate::signatures::{expected_callbacks, CallbackSignature};
use partialgen_core::cancellation::Cancelled;
use partialgen_core::diagnostics::{Diagnostic, DiagnosticCollector, DiagnosticDescriptor};
use partialgen_core::model::MemberKind;
use partialgen_core::semantic::{DeclarationRef, SemanticModel};

/// Reports generated hooks that have no implementation
#[derive(Debug, Clone, Copy)]
pub struct MissingCallbackAnalyzer {
    kind: AnnotationKind,
}

impl MissingCallbackAnalyzer {
    pub fn new(kind: AnnotationKind) -> Self {
        Self { kind }
    }

    /// `PG0001`: `On<Name>Loaded`
    pub fn loader() -> Self {
        Self::new(AnnotationKind::Loader)
    }

    /// `PG0002`: `On<Name>Changed` / `On<Name>Raised`
    pub fn subscription() -> Self {
        Self::new(AnnotationKind::Subscribe)
    }

    /// `PG0003`: `On<Name>Started` / `Performed` / `Canceled`
    pub fn input() -> Self {
        Self::new(AnnotationKind::InputCallbacks)
    }

    pub fn kind(&self) -> AnnotationKind {
        self.kind
    }
}

/// Descriptor reported for a missing callback of `kind`
pub fn missing_callback_descriptor(kind: AnnotationKind) -> &'static DiagnosticDescriptor {
    match kind {
        AnnotationKind::Loader => &MISSING_LOADER_CALLBACK,
        AnnotationKind::Subscribe => &MISSING_SUBSCRIPTION_CALLBACK,
        AnnotationKind::InputCallbacks => &MISSING_INPUT_CALLBACK,
    }
}

/// Annotation kind behind a missing-callback diagnostic id
pub fn missing_callback_kind(id: &str) -> Option<AnnotationKind> {
    AnnotationKind::ALL
        .into_iter()
        .find(|kind| missing_callback_descriptor(*kind).id == id)
}

/// Whether any part declares a method matching `expected` by name, arity and
/// resolved parameter types
pub fn has_callback(model: &dyn SemanticModel, parts: &[DeclarationRef<'_>], expected: &CallbackSignature) -> bool {
    parts.iter().any(|part| {
        part.syntax.members.iter().any(|member| {
            member.kind == MemberKind::Method
                && member.name == expected.name
                && member.parameters.len() == expected.parameters.len()
                && member
                    .parameters
                    .iter()
                    .zip(&expected.parameters)
                    .all(|(actual, wanted)| model.resolve_type(&actual.type_name, *part).as_ref() == Some(&wanted.ty))
        })
    })
}

impl Analyzer for MissingCallbackAnalyzer {
    fn descriptors(&self) -> Vec<&'static DiagnosticDescriptor> {
        vec![missing_callback_descriptor(self.kind)]
    }

    fn analyze(
        &self,
        context: &AnalysisContext<'_>,
        collected: &CollectedMembers<'_>,
        sink: &mut DiagnosticCollector,
    ) -> Result<(), Cancelled> {
        let descriptor = missing_callback_descriptor(self.kind);

        for (candidate, member) in collected.qualifying(self.kind) {
            context.cancel.check()?;
            let Some(annotation) = candidate.annotation(self.kind) else {
                continue;
            };
            let location = annotation_location(&annotation.attribute.location, &candidate.syntax.location);
            let declaration = candidate.part.syntax.nested_name();

            for callback in expected_callbacks(self.kind, member) {
                if has_callback(context.model, &collected.parts, &callback) {
                    continue;
                }
                sink.add(
                    Diagnostic::new(
                        descriptor,
                        location.clone(),
                        vec![declaration.clone(), callback.to_string(), member.source_name.clone()],
                    )
                    .with_property(properties::TREE, candidate.part.tree.path.clone())
                    .with_property(properties::DECLARATION, declaration.clone())
                    .with_property(properties::MEMBER, member.source_name.clone())
                    .with_property(properties::CALLBACK, callback.name.clone()),
                );
            }
        }
        Ok(())
    }
}
