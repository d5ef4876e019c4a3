//! Generation pipeline
//!
//! One pass: pre-filter every declaration, extract a fact snapshot per
//! annotated type and driver, run each driver's incremental cache and
//! collect the artifacts. The pipeline keeps its caches between passes; a
//! cancelled pass returns `Err(Cancelled)` and leaves them untouched.

use crate::classifier::{ClassificationCache, Classifier};
use crate::config::GeneratorConfig;
use crate::debug_log::DebugLog;
use crate::drivers::{default_drivers, GenerationDriver};
use crate::emit::{BufferPool, GeneratedArtifact};
use crate::extraction::{collect_members, has_annotated_members};
use crate::facts::FactSnapshot;
use crate::incremental::{CacheStats, IncrementalCache};
use partialgen_core::cancellation::{CancellationToken, Cancelled};
use partialgen_core::semantic::{DeclarationRef, SemanticModel};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// Counters for one pipeline pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    /// Declaration parts seen by the pre-filter
    pub declarations_scanned: usize,
    /// Distinct types with at least one attributed member
    pub types_matched: usize,
    /// Snapshots handed to the drivers
    pub snapshots: usize,
    pub cache: CacheStats,
}

/// Artifacts of one pass, sorted by hint name
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub artifacts: Vec<GeneratedArtifact>,
    pub report: PassReport,
}

/// Runs the enabled drivers over a semantic model, pass after pass
pub struct GenerationPipeline {
    config: GeneratorConfig,
    drivers: Vec<Box<dyn GenerationDriver>>,
    caches: Vec<IncrementalCache>,
    debug_log: Option<DebugLog>,
}

impl GenerationPipeline {
    /// Create a pipeline with the drivers enabled in `config`
    pub fn new(config: GeneratorConfig) -> Self {
        let pool = Arc::new(BufferPool::new());
        let drivers = default_drivers(&config.drivers, pool);
        Self::with_drivers(config, drivers)
    }

    /// Create a pipeline with custom drivers
    pub fn with_drivers(config: GeneratorConfig, drivers: Vec<Box<dyn GenerationDriver>>) -> Self {
        if drivers.is_empty() {
            log::warn!("No generation drivers are enabled");
        }
        let caches = drivers.iter().map(|_| IncrementalCache::new()).collect();
        let debug_log = DebugLog::from_settings(&config.debug_log);
        Self {
            config,
            drivers,
            caches,
            debug_log,
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn drivers(&self) -> impl Iterator<Item = &dyn GenerationDriver> + '_ {
        self.drivers.iter().map(|driver| driver.as_ref())
    }

    /// Snapshots currently cached across all drivers
    pub fn cached_snapshots(&self) -> usize {
        self.caches.iter().map(IncrementalCache::len).sum()
    }

    /// Forget every cached artifact
    pub fn clear_caches(&mut self) {
        self.caches.iter_mut().for_each(IncrementalCache::clear);
    }

    fn trace(&self, stage: &str, message: &str) {
        if let Some(debug_log) = &self.debug_log {
            debug_log.record(stage, message);
        }
    }

    /// Run one generation pass
    pub fn run(&mut self, model: &dyn SemanticModel, cancel: &CancellationToken) -> Result<PipelineOutput, Cancelled> {
        self.trace("pass", "started");
        match self.run_pass(model, cancel) {
            Ok(output) => {
                self.trace(
                    "pass",
                    &format!(
                        "finished: {} artifacts, {} generated, {} reused",
                        output.artifacts.len(),
                        output.report.cache.generated,
                        output.report.cache.reused
                    ),
                );
                Ok(output)
            }
            Err(cancelled) => {
                log::info!("Generation pass cancelled");
                self.trace("pass", "cancelled");
                Err(cancelled)
            }
        }
    }

    fn run_pass(&mut self, model: &dyn SemanticModel, cancel: &CancellationToken) -> Result<PipelineOutput, Cancelled> {
        let mut report = PassReport::default();
        let targets = select_targets(model, cancel, &mut report)?;
        report.types_matched = targets.len();

        let cache = ClassificationCache::new();
        let classifier = Classifier::new(model, &cache);
        let mut per_driver: Vec<Vec<FactSnapshot>> = self.drivers.iter().map(|_| Vec::new()).collect();

        for declaration in targets {
            cancel.check()?;
            let Some(collected) = collect_members(&classifier, declaration, cancel)? else {
                continue;
            };
            for (driver, snapshots) in self.drivers.iter().zip(per_driver.iter_mut()) {
                if let Some(snapshot) = collected.snapshot(driver.annotation()) {
                    snapshots.push(snapshot);
                }
            }
        }
        report.snapshots = per_driver.iter().map(Vec::len).sum();
        self.trace("extract", &format!("{} snapshots from {} types", report.snapshots, report.types_matched));

        let emit = &self.config.emit;
        let mut refreshes = Vec::with_capacity(self.drivers.len());
        for ((driver, cache), snapshots) in self.drivers.iter().zip(&self.caches).zip(per_driver) {
            let refresh = cache.refresh(snapshots, cancel, |snapshot| {
                log::debug!("{} driver generating {}", driver.name(), snapshot.declaration.identity);
                driver.generate(snapshot, emit)
            })?;
            refreshes.push(refresh);
        }

        let mut artifacts = Vec::new();
        for (cache, refresh) in self.caches.iter_mut().zip(refreshes) {
            let (driver_artifacts, stats) = cache.commit(refresh);
            report.cache += stats;
            artifacts.extend(driver_artifacts);
        }
        artifacts.sort_by(|a, b| a.hint_name.cmp(&b.hint_name));

        log::info!(
            "Generated {} artifacts ({} regenerated, {} reused, {} evicted)",
            artifacts.len(),
            report.cache.generated,
            report.cache.reused,
            report.cache.evicted
        );

        Ok(PipelineOutput { artifacts, report })
    }
}

/// One declaration part per distinct type that passes the pre-filter
fn select_targets<'m>(
    model: &'m dyn SemanticModel,
    cancel: &CancellationToken,
    report: &mut PassReport,
) -> Result<Vec<DeclarationRef<'m>>, Cancelled> {
    let mut seen = HashSet::new();
    let mut targets = Vec::new();
    for declaration in model.declarations() {
        cancel.check()?;
        report.declarations_scanned += 1;
        if !has_annotated_members(declaration.syntax, cancel)? {
            continue;
        }
        match model.declared_type(declaration) {
            Some(identity) => {
                if seen.insert(identity) {
                    targets.push(declaration);
                }
            }
            None => log::debug!("Skipping unresolved declaration {}", declaration.syntax.nested_name()),
        }
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use partialgen_core::model::{AttributeSyntax, DeclarationSyntax, MemberSyntax, SyntaxTree};
    use partialgen_core::semantic::Compilation;

    fn compilation(extra_member: Option<MemberSyntax>) -> Compilation {
        let mut player = DeclarationSyntax::class("Player")
            .in_namespace("Game")
            .partial()
            .with_member(
                MemberSyntax::field("health", "ValueNotifier<int>")
                    .with_attribute(AttributeSyntax::new("GenerateSubscribeMethods")),
            );
        if let Some(member) = extra_member {
            player = player.with_member(member);
        }
        let enemy = DeclarationSyntax::class("Enemy").in_namespace("Game").partial().with_member(
            MemberSyntax::field("died", "EventNotifier").with_attribute(AttributeSyntax::new("GenerateSubscribeMethods")),
        );
        Compilation::new(vec![
            SyntaxTree::new("Player.cs").with_using("Partialgen").with_declaration(player),
            SyntaxTree::new("Enemy.cs").with_using("Partialgen").with_declaration(enemy),
        ])
    }

    #[test]
    fn test_pass_produces_sorted_artifacts() {
        let mut pipeline = GenerationPipeline::new(GeneratorConfig::default());
        let output = pipeline.run(&compilation(None), &CancellationToken::none()).unwrap();

        let names: Vec<_> = output.artifacts.iter().map(|a| a.hint_name.as_str()).collect();
        assert_eq!(names, vec!["Game.Enemy.Subscriptions.g.cs", "Game.Player.Subscriptions.g.cs"]);
        assert_eq!(output.report.declarations_scanned, 2);
        assert_eq!(output.report.types_matched, 2);
        assert_eq!(output.report.cache.generated, 2);
    }

    #[test]
    fn test_unrelated_edit_reuses_artifacts() {
        let mut pipeline = GenerationPipeline::new(GeneratorConfig::default());
        let cancel = CancellationToken::none();
        let first = pipeline.run(&compilation(None), &cancel).unwrap();

        // A hand-written method does not change any snapshot
        let edited = compilation(Some(MemberSyntax::method("Heal", "void")));
        let second = pipeline.run(&edited, &cancel).unwrap();

        assert_eq!(second.report.cache.generated, 0);
        assert_eq!(second.report.cache.reused, 2);
        assert_eq!(first.artifacts, second.artifacts);
    }

    #[test]
    fn test_disabled_driver_emits_nothing() {
        let mut config = GeneratorConfig::default();
        config.drivers.subscriptions = false;
        let mut pipeline = GenerationPipeline::new(config);
        let output = pipeline.run(&compilation(None), &CancellationToken::none()).unwrap();
        assert!(output.artifacts.is_empty());
    }

    #[test]
    fn test_cancelled_pass_keeps_caches() {
        let mut pipeline = GenerationPipeline::new(GeneratorConfig::default());
        pipeline.run(&compilation(None), &CancellationToken::none()).unwrap();
        let cached = pipeline.cached_snapshots();

        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(pipeline.run(&compilation(None), &cancel).unwrap_err(), Cancelled);
        assert_eq!(pipeline.cached_snapshots(), cached);
    }
}
