//! Annotation-driven companion code generation
//!
//! This crate turns annotated members of a host compilation into generated
//! C# partial declarations: asset loading, notifier subscriptions and input
//! callback wiring. Analyzers check that the hand-written callbacks the
//! generated code calls actually exist, and a code fix adds stubs for the
//! missing ones.

pub mod analyzers;
pub mod annotations;
pub mod classifier;
pub mod config;
pub mod debug_log;
pub mod drivers;
pub mod emit;
pub mod extraction;
pub mod facts;
pub mod incremental;
pub mod naming;
pub mod pipeline;
pub mod signatures;

pub use analyzers::{AddCallbackStubFix, AnalysisContext, AnalysisHost, Analyzer, CodeFix};
pub use annotations::AnnotationKind;
pub use classifier::{Classification, ClassificationCache, Classifier};
pub use config::{AnalysisSettings, ConfigError, DebugLogSettings, DriverSettings, EmitOptions, GeneratorConfig};
pub use debug_log::DebugLog;
pub use drivers::{default_drivers, AssetLoaderDriver, GenerationDriver, InputCallbacksDriver, SubscriptionsDriver};
pub use emit::{BufferPool, GeneratedArtifact};
pub use extraction::{collect_members, extract, has_annotated_members, MemberSkip};
pub use facts::{AnnotatedMember, CapabilityKind, FactSnapshot};
pub use incremental::{CacheStats, IncrementalCache};
pub use pipeline::{GenerationPipeline, PassReport, PipelineOutput};
pub use signatures::{expected_callbacks, CallbackSignature};
