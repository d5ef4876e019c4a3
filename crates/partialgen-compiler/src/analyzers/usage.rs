//! Misused annotations (`PG0004`, `PG0005`) and non-partial declarations (`PG0006`)

use super::{
    annotation_location, AnalysisContext, Analyzer, DECLARATION_NOT_PARTIAL, INVALID_ANNOTATION_ARGUMENTS,
    INVALID_ANNOTATION_TARGET,
};
use crate::extraction::{CollectedMembers, MemberSkip};
use partialgen_core::cancellation::Cancelled;
use partialgen_core::diagnostics::{Diagnostic, DiagnosticCollector, DiagnosticDescriptor};
use partialgen_core::semantic::DeclarationRef;
use partialgen_core::types::TypeRef;

/// `PG0004`: annotation on a member whose type cannot support it
#[derive(Debug, Clone, Copy, Default)]
pub struct InvalidTargetAnalyzer;

impl Analyzer for InvalidTargetAnalyzer {
    fn descriptors(&self) -> Vec<&'static DiagnosticDescriptor> {
        vec![&INVALID_ANNOTATION_TARGET]
    }

    fn analyze(
        &self,
        context: &AnalysisContext<'_>,
        collected: &CollectedMembers<'_>,
        sink: &mut DiagnosticCollector,
    ) -> Result<(), Cancelled> {
        for candidate in &collected.candidates {
            context.cancel.check()?;
            for annotation in &candidate.annotations {
                let Err(skip) = &annotation.outcome else {
                    continue;
                };
                if !matches!(skip, MemberSkip::UnsupportedType { .. } | MemberSkip::AssetRequiresLoader { .. }) {
                    continue;
                }
                sink.add(Diagnostic::new(
                    &INVALID_ANNOTATION_TARGET,
                    annotation_location(&annotation.attribute.location, &candidate.syntax.location),
                    vec![
                        annotation.kind.to_string(),
                        candidate.syntax.name.clone(),
                        skip.to_string(),
                    ],
                ));
            }
        }
        Ok(())
    }
}

/// `PG0005`: missing or mistyped `[GenerateInputCallbacks]` arguments
#[derive(Debug, Clone, Copy, Default)]
pub struct InvalidArgumentsAnalyzer;

impl Analyzer for InvalidArgumentsAnalyzer {
    fn descriptors(&self) -> Vec<&'static DiagnosticDescriptor> {
        vec![&INVALID_ANNOTATION_ARGUMENTS]
    }

    fn analyze(
        &self,
        context: &AnalysisContext<'_>,
        collected: &CollectedMembers<'_>,
        sink: &mut DiagnosticCollector,
    ) -> Result<(), Cancelled> {
        for candidate in &collected.candidates {
            context.cancel.check()?;
            for annotation in &candidate.annotations {
                let Err(skip) = &annotation.outcome else {
                    continue;
                };
                if !matches!(skip, MemberSkip::MissingActionName | MemberSkip::InvalidArgument { .. }) {
                    continue;
                }
                sink.add(Diagnostic::new(
                    &INVALID_ANNOTATION_ARGUMENTS,
                    annotation_location(&annotation.attribute.location, &candidate.syntax.location),
                    vec![
                        annotation.kind.to_string(),
                        candidate.syntax.name.clone(),
                        skip.to_string(),
                    ],
                ));
            }
        }
        Ok(())
    }
}

/// `PG0006`: a type receiving generated members, or one of its containing
/// types, has a part without the `partial` modifier
#[derive(Debug, Clone, Copy, Default)]
pub struct PartialDeclarationAnalyzer;

impl PartialDeclarationAnalyzer {
    fn report_parts(parts: &[DeclarationRef<'_>], sink: &mut DiagnosticCollector) {
        for part in parts.iter().filter(|part| !part.syntax.is_partial()) {
            sink.add(Diagnostic::new(
                &DECLARATION_NOT_PARTIAL,
                part.syntax.location.clone(),
                vec![part.syntax.nested_name()],
            ));
        }
    }
}

impl Analyzer for PartialDeclarationAnalyzer {
    fn descriptors(&self) -> Vec<&'static DiagnosticDescriptor> {
        vec![&DECLARATION_NOT_PARTIAL]
    }

    fn analyze(
        &self,
        context: &AnalysisContext<'_>,
        collected: &CollectedMembers<'_>,
        sink: &mut DiagnosticCollector,
    ) -> Result<(), Cancelled> {
        let generates = collected
            .candidates
            .iter()
            .flat_map(|candidate| &candidate.annotations)
            .any(|annotation| annotation.outcome.is_ok());
        if !generates {
            return Ok(());
        }

        Self::report_parts(&collected.parts, sink);

        // Containing types are re-opened as partial declarations too
        let declaration = &collected.declaration;
        let mut outer = String::new();
        for containing in &declaration.containing {
            context.cancel.check()?;
            if !outer.is_empty() {
                outer.push('.');
            }
            outer.push_str(&containing.name);
            let ty = TypeRef::new(declaration.namespace.as_deref(), outer.clone());
            Self::report_parts(&context.model.declaration_parts(&ty), sink);
        }
        Ok(())
    }
}
