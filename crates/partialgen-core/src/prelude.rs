//! Prelude module for common partialgen types and traits
//!
//! This module re-exports commonly used types and traits for convenience.

pub use crate::cancellation::{CancellationToken, Cancelled};
pub use crate::diagnostics::*;
pub use crate::error::*;
pub use crate::model::*;
pub use crate::references::RUNTIME_NAMESPACE;
pub use crate::semantic::{Compilation, DeclarationRef, SemanticModel};
pub use crate::types::{TypeRef, TypeSyntax};
