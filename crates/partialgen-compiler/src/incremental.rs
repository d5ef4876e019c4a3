//! Incremental aggregation
//!
//! Each driver keeps an [`IncrementalCache`] from fact snapshot to generated
//! artifact. Snapshots are compared by value, so a pass whose snapshot for a
//! declaration equals the previous pass's reuses the old artifact without
//! calling the driver. Updates are two-phase: [`IncrementalCache::refresh`]
//! computes the next state without touching the cache and
//! [`IncrementalCache::commit`] installs it, so a cancelled pass leaves the
//! cache exactly as it was.

use crate::emit::GeneratedArtifact;
use crate::facts::FactSnapshot;
use partialgen_core::cancellation::{CancellationToken, Cancelled};
use serde::Serialize;
use std::collections::HashMap;

/// Counters for one cache refresh
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Snapshots the driver was called for
    pub generated: usize,
    /// Snapshots served from the previous pass
    pub reused: usize,
    /// Previous snapshots with no equal snapshot in this pass
    pub evicted: usize,
}

impl std::ops::AddAssign for CacheStats {
    fn add_assign(&mut self, other: Self) {
        self.generated += other.generated;
        self.reused += other.reused;
        self.evicted += other.evicted;
    }
}

/// The next state of a cache, not yet committed
#[derive(Debug)]
pub struct CacheRefresh {
    entries: HashMap<FactSnapshot, GeneratedArtifact>,
    artifacts: Vec<GeneratedArtifact>,
    stats: CacheStats,
}

impl CacheRefresh {
    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

#[derive(Debug, Default)]
pub struct IncrementalCache {
    entries: HashMap<FactSnapshot, GeneratedArtifact>,
}

impl IncrementalCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, snapshot: &FactSnapshot) -> bool {
        self.entries.contains_key(snapshot)
    }

    /// Compute artifacts for `snapshots`, calling `generate` only for
    /// snapshots not cached by the previous pass
    ///
    /// Duplicate snapshots are generated once. Artifacts keep the order of
    /// first appearance.
    pub fn refresh<F>(
        &self,
        snapshots: Vec<FactSnapshot>,
        cancel: &CancellationToken,
        mut generate: F,
    ) -> Result<CacheRefresh, Cancelled>
    where
        F: FnMut(&FactSnapshot) -> GeneratedArtifact,
    {
        let mut entries = HashMap::with_capacity(snapshots.len());
        let mut artifacts = Vec::with_capacity(snapshots.len());
        let mut stats = CacheStats::default();

        for snapshot in snapshots {
            cancel.check()?;
            if entries.contains_key(&snapshot) {
                continue;
            }
            let artifact = match self.entries.get(&snapshot) {
                Some(cached) => {
                    stats.reused += 1;
                    cached.clone()
                }
                None => {
                    stats.generated += 1;
                    generate(&snapshot)
                }
            };
            artifacts.push(artifact.clone());
            entries.insert(snapshot, artifact);
        }

        stats.evicted = self.entries.keys().filter(|key| !entries.contains_key(*key)).count();

        Ok(CacheRefresh {
            entries,
            artifacts,
            stats,
        })
    }

    /// Install a refresh, returning its artifacts
    pub fn commit(&mut self, refresh: CacheRefresh) -> (Vec<GeneratedArtifact>, CacheStats) {
        self.entries = refresh.entries;
        (refresh.artifacts, refresh.stats)
    }

    /// Refresh and commit in one step
    pub fn update<F>(
        &mut self,
        snapshots: Vec<FactSnapshot>,
        cancel: &CancellationToken,
        generate: F,
    ) -> Result<(Vec<GeneratedArtifact>, CacheStats), Cancelled>
    where
        F: FnMut(&FactSnapshot) -> GeneratedArtifact,
    {
        let refresh = self.refresh(snapshots, cancel, generate)?;
        Ok(self.commit(refresh))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::{AnnotatedMember, CapabilityKind, DeclarationInfo, MemberRequests};
    use partialgen_core::model::DeclarationKind;
    use partialgen_core::types::TypeRef;

    fn snapshot(name: &str, member: &str) -> FactSnapshot {
        FactSnapshot {
            declaration: DeclarationInfo {
                identity: TypeRef::new(None, name),
                name: name.to_string(),
                namespace: None,
                containing: Vec::new(),
                kind: DeclarationKind::Class,
                type_parameters: Vec::new(),
            },
            members: vec![AnnotatedMember {
                source_name: member.to_string(),
                derived_name: member.to_string(),
                unique_name: member.to_string(),
                member_type: TypeRef::new(Some("Partialgen"), "EventNotifier"),
                payload_type: None,
                capability: CapabilityKind::EventNotifier,
                asset_reference: false,
                requests: MemberRequests::default(),
            }],
        }
    }

    fn render(snapshot: &FactSnapshot) -> GeneratedArtifact {
        GeneratedArtifact {
            hint_name: format!("{}.g.cs", snapshot.declaration.name),
            text: snapshot.members[0].source_name.clone(),
        }
    }

    #[test]
    fn test_equal_snapshots_are_not_regenerated() {
        let mut cache = IncrementalCache::new();
        let cancel = CancellationToken::none();
        let mut calls = 0;

        let (first, stats) = cache
            .update(vec![snapshot("A", "died"), snapshot("B", "hit")], &cancel, |s| {
                calls += 1;
                render(s)
            })
            .unwrap();
        assert_eq!(calls, 2);
        assert_eq!(stats.generated, 2);

        // A value-equal snapshot built from scratch
        let (second, stats) = cache
            .update(vec![snapshot("A", "died"), snapshot("B", "hit")], &cancel, |s| {
                calls += 1;
                render(s)
            })
            .unwrap();
        assert_eq!(calls, 2);
        assert_eq!(stats.reused, 2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_changed_snapshot_regenerates_only_itself() {
        let mut cache = IncrementalCache::new();
        let cancel = CancellationToken::none();
        cache
            .update(vec![snapshot("A", "died"), snapshot("B", "hit")], &cancel, render)
            .unwrap();

        let mut regenerated = Vec::new();
        let (_, stats) = cache
            .update(vec![snapshot("A", "died"), snapshot("B", "healed")], &cancel, |s| {
                regenerated.push(s.declaration.name.clone());
                render(s)
            })
            .unwrap();
        assert_eq!(regenerated, vec!["B".to_string()]);
        assert_eq!(
            stats,
            CacheStats {
                generated: 1,
                reused: 1,
                evicted: 1
            }
        );
        assert!(!cache.contains(&snapshot("B", "hit")));
    }

    #[test]
    fn test_duplicates_are_generated_once() {
        let mut cache = IncrementalCache::new();
        let (artifacts, stats) = cache
            .update(
                vec![snapshot("A", "died"), snapshot("A", "died")],
                &CancellationToken::none(),
                render,
            )
            .unwrap();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(stats.generated, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cancelled_refresh_keeps_cache() {
        let mut cache = IncrementalCache::new();
        cache
            .update(vec![snapshot("A", "died")], &CancellationToken::none(), render)
            .unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = cache.update(vec![snapshot("B", "hit")], &cancel, render);
        assert_eq!(result.unwrap_err(), Cancelled);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&snapshot("A", "died")));
    }
}
