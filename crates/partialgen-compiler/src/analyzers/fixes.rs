//! Code fix for missing callbacks
//!
//! The fix works from the diagnostic's properties alone. It re-resolves the
//! diagnosed member against the compilation it is given with a fresh
//! classification cache, so it never depends on state left behind by the
//! analysis pass that reported the diagnostic.

use super::callbacks::missing_callback_kind;
use super::properties;
use crate::classifier::{ClassificationCache, Classifier};
use crate::config::EmitOptions;
use crate::drivers::render_type;
use crate::emit::{BufferPool, Fragment};
use crate::extraction::collect_members;
use crate::signatures::expected_callbacks;
use partialgen_core::cancellation::CancellationToken;
use partialgen_core::diagnostics::Diagnostic;
use partialgen_core::error::{PartialGenError, PartialGenResult};
use partialgen_core::model::MemberSyntax;
use partialgen_core::semantic::{Compilation, SemanticModel};
use serde::Serialize;

/// Body of every generated stub
const STUB_BODY: &str = "throw new System.NotImplementedException();";

/// An edit that adds one member to one declaration part
#[derive(Debug, Clone, Serialize)]
pub struct CodeFix {
    pub title: String,
    pub diagnostic_id: String,
    /// Syntax tree of the declaration part receiving the member
    pub tree_path: String,
    /// Nested name of that declaration part
    pub declaration: String,
    #[serde(skip)]
    pub member: MemberSyntax,
    /// The member as C# text
    pub stub_text: String,
}

impl CodeFix {
    /// Return a copy of `compilation` with the stub inserted
    pub fn apply(&self, compilation: &Compilation) -> PartialGenResult<Compilation> {
        compilation.with_member_added(&self.tree_path, &self.declaration, self.member.clone())
    }
}

/// Adds a `partial void` stub for a `PG0001`-`PG0003` diagnostic
#[derive(Debug, Default)]
pub struct AddCallbackStubFix {
    pool: BufferPool,
}

impl AddCallbackStubFix {
    pub const FIXABLE_IDS: [&'static str; 3] = ["PG0001", "PG0002", "PG0003"];

    pub fn new() -> Self {
        Self::default()
    }

    pub fn can_fix(&self, diagnostic: &Diagnostic) -> bool {
        Self::FIXABLE_IDS.contains(&diagnostic.id())
    }

    /// Build the fix for `diagnostic`
    pub fn compute(
        &self,
        compilation: &Compilation,
        diagnostic: &Diagnostic,
        options: &EmitOptions,
    ) -> PartialGenResult<CodeFix> {
        let id = diagnostic.id();
        let kind = missing_callback_kind(id)
            .ok_or_else(|| PartialGenError::code_fix_for("Diagnostic is not a missing callback", id))?;
        let property = |key: &str| {
            diagnostic
                .property(key)
                .ok_or_else(|| PartialGenError::code_fix_for(format!("Diagnostic has no '{}' property", key), id))
        };
        let tree_path = property(properties::TREE)?;
        let declaration_name = property(properties::DECLARATION)?;
        let member_name = property(properties::MEMBER)?;
        let callback_name = property(properties::CALLBACK)?;

        let part = compilation
            .declarations()
            .into_iter()
            .find(|d| d.tree.path == tree_path && d.syntax.nested_name() == declaration_name)
            .ok_or_else(|| {
                PartialGenError::code_fix_for(
                    format!("Declaration '{}' not found in '{}'", declaration_name, tree_path),
                    id,
                )
            })?;

        let cache = ClassificationCache::new();
        let classifier = Classifier::new(compilation, &cache);
        let collected = collect_members(&classifier, part, &CancellationToken::none())?
            .ok_or_else(|| PartialGenError::code_fix_for(format!("'{}' does not declare a type", declaration_name), id))?;

        let member = collected
            .candidates
            .iter()
            .find(|candidate| candidate.syntax.name == member_name)
            .and_then(|candidate| candidate.annotation(kind))
            .and_then(|annotation| annotation.outcome.as_ref().ok())
            .ok_or_else(|| {
                PartialGenError::code_fix_for(format!("Member '{}' no longer qualifies for {}", member_name, kind), id)
            })?;
        let callback = expected_callbacks(kind, member)
            .into_iter()
            .find(|callback| callback.name == callback_name)
            .ok_or_else(|| PartialGenError::code_fix_for(format!("'{}' is not expected", callback_name), id))?;

        let usings: Vec<&str> = part.tree.usings.iter().map(String::as_str).collect();
        let render = |ty: &partialgen_core::types::TypeRef| render_type(ty, &usings);

        let mut fragment = Fragment::new(&self.pool, options);
        let mut stub = fragment.open_member(callback.to_member_spec(render));
        stub.write_line(STUB_BODY);
        stub.close();
        let stub_text = fragment.into_text();

        let member_syntax = callback.parameters.iter().fold(
            MemberSyntax::method(callback.name.clone(), "void").with_modifier("partial"),
            |method, parameter| method.with_parameter(parameter.name, render(&parameter.ty)),
        );

        log::debug!("Computed stub fix for {} in {}", callback, declaration_name);

        Ok(CodeFix {
            title: format!("Add 'partial void {}'", callback),
            diagnostic_id: id.to_string(),
            tree_path: tree_path.to_string(),
            declaration: declaration_name.to_string(),
            member: member_syntax,
            stub_text,
        })
    }
}
