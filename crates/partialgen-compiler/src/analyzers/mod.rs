//! Diagnostic analyzers
//!
//! Analyzers are a read-only pass over the same annotations the drivers
//! consume. They never see generated output: a missing-callback analyzer
//! derives the hook a driver would forward-declare and looks for the
//! hand-written implementation among the declaration's own members.

pub mod callbacks;
pub mod fixes;
pub mod usage;

pub use callbacks::MissingCallbackAnalyzer;
pub use fixes::{AddCallbackStubFix, CodeFix};
pub use usage::{InvalidArgumentsAnalyzer, InvalidTargetAnalyzer, PartialDeclarationAnalyzer};

use crate::classifier::{ClassificationCache, Classifier};
use crate::config::AnalysisSettings;
use crate::extraction::{collect_members, has_annotated_members, CollectedMembers};
use partialgen_core::cancellation::{CancellationToken, Cancelled};
use partialgen_core::diagnostics::{Diagnostic, DiagnosticCollector, DiagnosticDescriptor, Severity};
use partialgen_core::model::Location;
use partialgen_core::semantic::{DeclarationRef, SemanticModel};
use std::collections::HashSet;

const CATEGORY: &str = "Partialgen";

pub static MISSING_LOADER_CALLBACK: DiagnosticDescriptor = DiagnosticDescriptor {
    id: "PG0001",
    title: "Missing asset loaded callback",
    message_format: "'{0}' must implement 'partial void {1}' for [GenerateLoader] member '{2}'",
    category: CATEGORY,
    severity: Severity::Error,
};

pub static MISSING_SUBSCRIPTION_CALLBACK: DiagnosticDescriptor = DiagnosticDescriptor {
    id: "PG0002",
    title: "Missing subscription callback",
    message_format: "'{0}' must implement 'partial void {1}' for [GenerateSubscribeMethods] member '{2}'",
    category: CATEGORY,
    severity: Severity::Error,
};

pub static MISSING_INPUT_CALLBACK: DiagnosticDescriptor = DiagnosticDescriptor {
    id: "PG0003",
    title: "Missing input callback",
    message_format: "'{0}' must implement 'partial void {1}' for [GenerateInputCallbacks] member '{2}'",
    category: CATEGORY,
    severity: Severity::Error,
};

pub static INVALID_ANNOTATION_TARGET: DiagnosticDescriptor = DiagnosticDescriptor {
    id: "PG0004",
    title: "Invalid annotation target",
    message_format: "{0} cannot be applied to '{1}': {2}",
    category: CATEGORY,
    severity: Severity::Error,
};

pub static INVALID_ANNOTATION_ARGUMENTS: DiagnosticDescriptor = DiagnosticDescriptor {
    id: "PG0005",
    title: "Invalid annotation arguments",
    message_format: "Invalid {0} arguments on '{1}': {2}",
    category: CATEGORY,
    severity: Severity::Error,
};

pub static DECLARATION_NOT_PARTIAL: DiagnosticDescriptor = DiagnosticDescriptor {
    id: "PG0006",
    title: "Declaration is not partial",
    message_format: "'{0}' must be declared partial because generated members are added to it",
    category: CATEGORY,
    severity: Severity::Error,
};

/// Diagnostic property keys read by code fixes
pub mod properties {
    /// Path of the syntax tree holding the diagnosed declaration part
    pub const TREE: &str = "tree";
    /// Nested name of the diagnosed declaration part
    pub const DECLARATION: &str = "declaration";
    /// Source name of the annotated member
    pub const MEMBER: &str = "member";
    /// Name of the expected callback
    pub const CALLBACK: &str = "callback";
}

/// Per-pass state handed to every analyzer
pub struct AnalysisContext<'a> {
    pub model: &'a dyn SemanticModel,
    pub classifier: Classifier<'a>,
    pub cancel: &'a CancellationToken,
}

/// A read-only check over the annotated members of one declared type
pub trait Analyzer: Send + Sync {
    /// Descriptors this analyzer may report
    fn descriptors(&self) -> Vec<&'static DiagnosticDescriptor>;

    fn analyze(
        &self,
        context: &AnalysisContext<'_>,
        collected: &CollectedMembers<'_>,
        sink: &mut DiagnosticCollector,
    ) -> Result<(), Cancelled>;
}

/// Location of an attribute, falling back to its member when unknown
pub(crate) fn annotation_location(attribute: &Location, member: &Location) -> Location {
    if attribute.is_unknown() {
        member.clone()
    } else {
        attribute.clone()
    }
}

/// Built-in analyzers in id order
pub fn default_analyzers() -> Vec<Box<dyn Analyzer>> {
    vec![
        Box::new(MissingCallbackAnalyzer::loader()),
        Box::new(MissingCallbackAnalyzer::subscription()),
        Box::new(MissingCallbackAnalyzer::input()),
        Box::new(InvalidTargetAnalyzer),
        Box::new(InvalidArgumentsAnalyzer),
        Box::new(PartialDeclarationAnalyzer),
    ]
}

/// Runs analyzers over every annotated type of a compilation
pub struct AnalysisHost {
    analyzers: Vec<Box<dyn Analyzer>>,
    settings: AnalysisSettings,
}

impl Default for AnalysisHost {
    fn default() -> Self {
        Self::new(default_analyzers(), AnalysisSettings::default())
    }
}

impl AnalysisHost {
    pub fn new(analyzers: Vec<Box<dyn Analyzer>>, settings: AnalysisSettings) -> Self {
        Self { analyzers, settings }
    }

    /// Host with the built-in analyzers
    pub fn with_settings(settings: AnalysisSettings) -> Self {
        Self::new(default_analyzers(), settings)
    }

    pub fn descriptors(&self) -> Vec<&'static DiagnosticDescriptor> {
        self.analyzers.iter().flat_map(|a| a.descriptors()).collect()
    }

    /// Analyze sequentially or in parallel, as configured
    pub fn analyze(&self, model: &dyn SemanticModel, cancel: &CancellationToken) -> Result<Vec<Diagnostic>, Cancelled> {
        if self.settings.parallel {
            self.run_parallel(model, cancel, self.settings.worker_threads())
        } else {
            self.run(model, cancel)
        }
    }

    /// Analyze every annotated type on the calling thread
    pub fn run(&self, model: &dyn SemanticModel, cancel: &CancellationToken) -> Result<Vec<Diagnostic>, Cancelled> {
        let targets = self.targets(model, cancel)?;
        let cache = ClassificationCache::new();
        let mut sink = DiagnosticCollector::new();
        for declaration in targets {
            sink.extend(self.analyze_type(model, &cache, declaration, cancel)?);
        }
        Ok(finish(sink))
    }

    /// Analyze annotated types across up to `threads` scoped threads
    ///
    /// The result is sorted, so it equals what [`AnalysisHost::run`] returns.
    pub fn run_parallel(
        &self,
        model: &dyn SemanticModel,
        cancel: &CancellationToken,
        threads: usize,
    ) -> Result<Vec<Diagnostic>, Cancelled> {
        let targets = self.targets(model, cancel)?;
        let threads = threads.max(1).min(targets.len().max(1));
        let chunk_size = targets.len().div_ceil(threads).max(1);
        let cache = ClassificationCache::new();

        log::debug!("Analyzing {} types on {} threads", targets.len(), threads);

        let results: Vec<Result<DiagnosticCollector, Cancelled>> = std::thread::scope(|scope| {
            let handles: Vec<_> = targets
                .chunks(chunk_size)
                .map(|chunk| {
                    let cache = &cache;
                    scope.spawn(move || -> Result<DiagnosticCollector, Cancelled> {
                        let mut sink = DiagnosticCollector::new();
                        for declaration in chunk {
                            sink.extend(self.analyze_type(model, cache, *declaration, cancel)?);
                        }
                        Ok(sink)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
                .collect()
        });

        let mut sink = DiagnosticCollector::new();
        for result in results {
            sink.extend(result?);
        }
        Ok(finish(sink))
    }

    /// One declaration part per distinct annotated type
    fn targets<'m>(
        &self,
        model: &'m dyn SemanticModel,
        cancel: &CancellationToken,
    ) -> Result<Vec<DeclarationRef<'m>>, Cancelled> {
        let mut seen = HashSet::new();
        let mut targets = Vec::new();
        for declaration in model.declarations() {
            cancel.check()?;
            if !has_annotated_members(declaration.syntax, cancel)? {
                continue;
            }
            let Some(identity) = model.declared_type(declaration) else {
                continue;
            };
            if seen.insert(identity) {
                targets.push(declaration);
            }
        }
        Ok(targets)
    }

    fn analyze_type(
        &self,
        model: &dyn SemanticModel,
        cache: &ClassificationCache,
        declaration: DeclarationRef<'_>,
        cancel: &CancellationToken,
    ) -> Result<DiagnosticCollector, Cancelled> {
        let context = AnalysisContext {
            model,
            classifier: Classifier::new(model, cache),
            cancel,
        };
        let mut sink = DiagnosticCollector::new();
        let Some(collected) = collect_members(&context.classifier, declaration, cancel)? else {
            return Ok(sink);
        };
        for analyzer in &self.analyzers {
            cancel.check()?;
            analyzer.analyze(&context, &collected, &mut sink)?;
        }
        Ok(sink)
    }
}

fn finish(sink: DiagnosticCollector) -> Vec<Diagnostic> {
    let mut diagnostics = sink.into_sorted();
    diagnostics.dedup();
    diagnostics
}
