//! Host model and shared vocabulary for the partialgen code generators
//!
//! This crate describes the host project as the generators see it: syntax
//! trees, declarations and attributes, resolved type handles, the read-only
//! semantic model, cancellation and diagnostics.

pub mod cancellation;
pub mod diagnostics;
pub mod error;
pub mod model;
pub mod prelude;
pub mod references;
pub mod semantic;
pub mod types;

pub use cancellation::{CancellationToken, Cancelled};
pub use diagnostics::*;
pub use error::*;
pub use model::{
    AttributeArgument, AttributeSyntax, AttributeValue, ContainingType, DeclarationKind, DeclarationSyntax,
    Location, MemberKind, MemberSyntax, ParameterSyntax, SyntaxTree,
};
pub use semantic::{Compilation, CompilationSnapshot, DeclarationRef, SemanticModel};
pub use types::{TypeInfo, TypeRef, TypeSyntax};
