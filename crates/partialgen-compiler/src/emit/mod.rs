//! Code emission DSL
//!
//! Drivers build generated files as an explicit tree of scopes:
//! [`FileScope`] → [`DeclarationScope`] → [`MemberScope`] → [`BlockScope`].
//! Text buffers are borrowed from a [`BufferPool`].

pub mod pool;
pub mod scopes;
pub mod spec;

pub use pool::{BufferPool, PooledBuffer};
pub use scopes::{BlockScope, DeclarationScope, EmitContext, FileScope, Fragment, MemberScope, PROVENANCE_HEADER};
pub use spec::{BlockStyle, DeclarationSpec, MemberShape, MemberSpec, ParameterSpec};

use serde::Serialize;

/// One generated source file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GeneratedArtifact {
    /// Unique name the file is registered under, e.g. `Game.Player.Subscriptions.g.cs`
    pub hint_name: String,
    pub text: String,
}
