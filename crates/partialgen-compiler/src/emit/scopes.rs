//! Nested emission scopes
//!
//! A [`FileScope`] owns the indentation counter and a [`BufferPool`]. Every
//! child scope mutably borrows its parent for as long as it is open, so only
//! the innermost scope can be written to, and `close(self)` consumes the
//! scope and flushes its rendered text into the parent. A scope raises the
//! shared indentation level by one when its body is first written and lowers
//! it again on close.
//!
//! Dropping a scope that was never closed is a bug in the caller and panics.

use super::pool::{BufferPool, PooledBuffer};
use super::spec::{BlockStyle, DeclarationSpec, MemberSpec};
use super::GeneratedArtifact;
use crate::config::EmitOptions;
use std::collections::BTreeSet;

/// First lines of every generated file
pub const PROVENANCE_HEADER: &[&str] = &[
    "// <auto-generated>",
    "//     This code was generated by {tool}.",
    "//     Changes to this file may cause incorrect behavior and will be lost if",
    "//     the code is regenerated.",
    "// </auto-generated>",
];

/// State shared by all scopes of one file or fragment
#[derive(Debug)]
pub struct EmitContext<'p> {
    pool: &'p BufferPool,
    unit: String,
    depth: usize,
}

impl<'p> EmitContext<'p> {
    fn new(pool: &'p BufferPool, options: &EmitOptions) -> Self {
        Self {
            pool,
            unit: " ".repeat(options.indent_width),
            depth: 0,
        }
    }

    fn indent(&self, depth: usize) -> String {
        self.unit.repeat(depth)
    }

    /// Current indentation level
    pub fn depth(&self) -> usize {
        self.depth
    }
}

pub(crate) trait ScopeSink<'p> {
    fn context(&mut self) -> &mut EmitContext<'p>;

    /// Open this scope's body, raising the indentation level once
    fn begin_body(&mut self);
}

/// Parent of a block: a member or another block
pub(crate) trait BodySink<'p>: ScopeSink<'p> {
    fn append_body(&mut self, text: &str);
}

/// Parent of a member: a declaration or a fragment
pub(crate) trait MemberSink<'p>: ScopeSink<'p> {
    fn push_field(&mut self, text: &str);
    fn push_member(&mut self, text: &str);
}

/// Parent of a declaration: a file, a declaration or a fragment
pub(crate) trait DeclarationSink<'p>: ScopeSink<'p> {
    fn push_declaration(&mut self, text: &str);
}

fn assert_closed(closed: bool, scope: &str) {
    if !closed && !std::thread::panicking() {
        panic!("{} scope dropped without being closed", scope);
    }
}

/// Statement text of a member or block body
struct Body<'p> {
    text: PooledBuffer<'p>,
    at_line_start: bool,
}

impl<'p> Body<'p> {
    fn new(pool: &'p BufferPool) -> Self {
        Self {
            text: pool.acquire(),
            at_line_start: true,
        }
    }

    fn write(&mut self, indent: &str, text: &str) {
        if text.is_empty() {
            return;
        }
        if self.at_line_start {
            self.text.push_str(indent);
        }
        self.text.push_str(text);
        self.at_line_start = false;
    }

    fn end_line(&mut self) {
        self.text.push('\n');
        self.at_line_start = true;
    }

    fn append_rendered(&mut self, rendered: &str) {
        if !self.at_line_start {
            self.end_line();
        }
        self.text.push_str(rendered);
    }
}

/// Root scope of one generated file
pub struct FileScope<'p> {
    ctx: EmitContext<'p>,
    hint_name: String,
    tool_name: String,
    usings: BTreeSet<String>,
    namespace: Option<String>,
    declarations: PooledBuffer<'p>,
    namespace_open: bool,
    closed: bool,
}

impl<'p> FileScope<'p> {
    /// Open a file that will be registered as `hint_name`
    pub fn open<S: Into<String>>(
        pool: &'p BufferPool,
        options: &EmitOptions,
        hint_name: S,
        namespace: Option<&str>,
    ) -> Self {
        Self {
            ctx: EmitContext::new(pool, options),
            hint_name: hint_name.into(),
            tool_name: options.tool_name.clone(),
            usings: BTreeSet::new(),
            namespace: namespace.map(str::to_string),
            declarations: pool.acquire(),
            namespace_open: false,
            closed: false,
        }
    }

    /// Add a `using` directive; duplicates are ignored and output is sorted
    pub fn add_using<S: Into<String>>(&mut self, namespace: S) {
        self.usings.insert(namespace.into());
    }

    pub fn open_declaration(&mut self, spec: DeclarationSpec) -> DeclarationScope<'_, 'p> {
        DeclarationScope::open(self, spec)
    }

    /// Render the file. Panics if the indentation is unbalanced.
    pub fn finish(mut self) -> GeneratedArtifact {
        self.closed = true;
        if self.namespace_open {
            self.ctx.depth -= 1;
        }
        assert_eq!(self.ctx.depth, 0, "unbalanced indentation at end of {}", self.hint_name);

        let mut text = String::with_capacity(self.declarations.len() + 512);
        for line in PROVENANCE_HEADER {
            text.push_str(&line.replace("{tool}", &self.tool_name));
            text.push('\n');
        }
        text.push('\n');

        if !self.usings.is_empty() {
            for using in &self.usings {
                text.push_str("using ");
                text.push_str(using);
                text.push_str(";\n");
            }
            text.push('\n');
        }

        match &self.namespace {
            Some(namespace) => {
                text.push_str("namespace ");
                text.push_str(namespace);
                text.push_str("\n{\n");
                text.push_str(&self.declarations);
                text.push_str("}\n");
            }
            None => text.push_str(&self.declarations),
        }

        GeneratedArtifact {
            hint_name: std::mem::take(&mut self.hint_name),
            text,
        }
    }
}

impl<'p> ScopeSink<'p> for FileScope<'p> {
    fn context(&mut self) -> &mut EmitContext<'p> {
        &mut self.ctx
    }

    fn begin_body(&mut self) {
        if self.namespace.is_some() && !self.namespace_open {
            self.namespace_open = true;
            self.ctx.depth += 1;
        }
    }
}

impl<'p> DeclarationSink<'p> for FileScope<'p> {
    fn push_declaration(&mut self, text: &str) {
        if !self.declarations.is_empty() {
            self.declarations.push('\n');
        }
        self.declarations.push_str(text);
    }
}

impl Drop for FileScope<'_> {
    fn drop(&mut self) {
        assert_closed(self.closed, "file");
    }
}

/// Root scope for rendering members outside of any file
pub struct Fragment<'p> {
    ctx: EmitContext<'p>,
    text: PooledBuffer<'p>,
}

impl<'p> Fragment<'p> {
    pub fn new(pool: &'p BufferPool, options: &EmitOptions) -> Self {
        Self {
            ctx: EmitContext::new(pool, options),
            text: pool.acquire(),
        }
    }

    pub fn open_member(&mut self, spec: MemberSpec) -> MemberScope<'_, 'p> {
        MemberScope::open(self, spec)
    }

    pub fn open_declaration(&mut self, spec: DeclarationSpec) -> DeclarationScope<'_, 'p> {
        DeclarationScope::open(self, spec)
    }

    /// Everything rendered into the fragment
    pub fn into_text(self) -> String {
        assert_eq!(self.ctx.depth, 0, "unbalanced indentation in fragment");
        self.text.to_string()
    }
}

impl<'p> ScopeSink<'p> for Fragment<'p> {
    fn context(&mut self) -> &mut EmitContext<'p> {
        &mut self.ctx
    }

    fn begin_body(&mut self) {}
}

impl<'p> MemberSink<'p> for Fragment<'p> {
    fn push_field(&mut self, text: &str) {
        self.push_member(text);
    }

    fn push_member(&mut self, text: &str) {
        if !self.text.is_empty() {
            self.text.push('\n');
        }
        self.text.push_str(text);
    }
}

impl<'p> DeclarationSink<'p> for Fragment<'p> {
    fn push_declaration(&mut self, text: &str) {
        self.push_member(text);
    }
}

/// A class or struct declaration
pub struct DeclarationScope<'s, 'p> {
    parent: &'s mut dyn DeclarationSink<'p>,
    header: String,
    depth: usize,
    fields: PooledBuffer<'p>,
    members: PooledBuffer<'p>,
    body_open: bool,
    closed: bool,
}

impl<'s, 'p> DeclarationScope<'s, 'p> {
    fn open(parent: &'s mut dyn DeclarationSink<'p>, spec: DeclarationSpec) -> Self {
        parent.begin_body();
        let ctx = parent.context();
        let (depth, pool) = (ctx.depth, ctx.pool);
        Self {
            header: spec.header(),
            depth,
            fields: pool.acquire(),
            members: pool.acquire(),
            parent,
            body_open: false,
            closed: false,
        }
    }

    pub fn open_member(&mut self, spec: MemberSpec) -> MemberScope<'_, 'p> {
        MemberScope::open(self, spec)
    }

    /// Open a nested declaration; it is rendered among the members
    pub fn open_declaration(&mut self, spec: DeclarationSpec) -> DeclarationScope<'_, 'p> {
        DeclarationScope::open(self, spec)
    }

    /// Add a field, shorthand for opening and closing a field member
    pub fn add_field(&mut self, spec: MemberSpec) {
        self.open_member(spec).close();
    }

    pub fn close(mut self) {
        self.closed = true;
        let ctx = self.parent.context();
        if self.body_open {
            ctx.depth -= 1;
        }
        let indent = ctx.indent(self.depth);
        let pool = ctx.pool;
        let mut out = pool.acquire();

        out.push_str(&indent);
        out.push_str(&self.header);
        out.push('\n');
        out.push_str(&indent);
        out.push_str("{\n");
        out.push_str(&self.fields);
        if !self.fields.is_empty() && !self.members.is_empty() {
            out.push('\n');
        }
        out.push_str(&self.members);
        out.push_str(&indent);
        out.push_str("}\n");

        self.parent.push_declaration(&out);
    }
}

impl<'p> ScopeSink<'p> for DeclarationScope<'_, 'p> {
    fn context(&mut self) -> &mut EmitContext<'p> {
        self.parent.context()
    }

    fn begin_body(&mut self) {
        if !self.body_open {
            self.body_open = true;
            self.parent.context().depth += 1;
        }
    }
}

impl<'p> MemberSink<'p> for DeclarationScope<'_, 'p> {
    fn push_field(&mut self, text: &str) {
        self.fields.push_str(text);
    }

    fn push_member(&mut self, text: &str) {
        if !self.members.is_empty() {
            self.members.push('\n');
        }
        self.members.push_str(text);
    }
}

impl<'p> DeclarationSink<'p> for DeclarationScope<'_, 'p> {
    fn push_declaration(&mut self, text: &str) {
        self.push_member(text);
    }
}

impl Drop for DeclarationScope<'_, '_> {
    fn drop(&mut self) {
        assert_closed(self.closed, "declaration");
    }
}

/// A field or method
pub struct MemberScope<'s, 'p> {
    parent: &'s mut dyn MemberSink<'p>,
    spec: MemberSpec,
    depth: usize,
    body: Body<'p>,
    body_open: bool,
    closed: bool,
}

impl<'s, 'p> MemberScope<'s, 'p> {
    fn open(parent: &'s mut dyn MemberSink<'p>, spec: MemberSpec) -> Self {
        parent.begin_body();
        let ctx = parent.context();
        let (depth, pool) = (ctx.depth, ctx.pool);
        Self {
            spec,
            depth,
            body: Body::new(pool),
            parent,
            body_open: false,
            closed: false,
        }
    }

    /// Append text to the current body line
    pub fn write(&mut self, text: &str) {
        self.begin_body();
        let ctx = self.parent.context();
        let indent = ctx.indent(ctx.depth);
        self.body.write(&indent, text);
    }

    /// Append a complete body line
    pub fn write_line(&mut self, text: &str) {
        self.write(text);
        self.body.end_line();
    }

    /// Append an empty body line
    pub fn blank_line(&mut self) {
        self.begin_body();
        self.body.append_rendered("\n");
    }

    pub fn open_block<S: Into<String>>(&mut self, style: BlockStyle, header: S) -> BlockScope<'_, 'p> {
        BlockScope::open(self, style, header.into())
    }

    pub fn close(mut self) {
        self.closed = true;
        let ctx = self.parent.context();
        if self.body_open {
            ctx.depth -= 1;
        }
        let indent = ctx.indent(self.depth);
        let pool = ctx.pool;
        let mut out = pool.acquire();

        for attribute in &self.spec.attributes {
            out.push_str(&indent);
            out.push('[');
            out.push_str(attribute);
            out.push_str("]\n");
        }
        out.push_str(&indent);
        out.push_str(&self.spec.signature());

        if self.spec.is_field() {
            assert!(!self.body_open, "field '{}' cannot have a body", self.spec.name);
            out.push_str(";\n");
            self.parent.push_field(&out);
            return;
        }

        if !self.body_open && self.spec.is_forward_declarable() {
            out.push_str(";\n");
        } else {
            out.push('\n');
            out.push_str(&indent);
            out.push_str("{\n");
            if !self.body.at_line_start {
                self.body.end_line();
            }
            out.push_str(&self.body.text);
            out.push_str(&indent);
            out.push_str("}\n");
        }
        self.parent.push_member(&out);
    }
}

impl<'p> ScopeSink<'p> for MemberScope<'_, 'p> {
    fn context(&mut self) -> &mut EmitContext<'p> {
        self.parent.context()
    }

    fn begin_body(&mut self) {
        if !self.body_open {
            self.body_open = true;
            self.parent.context().depth += 1;
        }
    }
}

impl<'p> BodySink<'p> for MemberScope<'_, 'p> {
    fn append_body(&mut self, text: &str) {
        self.body.append_rendered(text);
    }
}

impl Drop for MemberScope<'_, '_> {
    fn drop(&mut self) {
        assert_closed(self.closed, "member");
    }
}

/// A braced statement block such as an `if` or a lambda body
pub struct BlockScope<'s, 'p> {
    parent: &'s mut dyn BodySink<'p>,
    style: BlockStyle,
    header: String,
    depth: usize,
    body: Body<'p>,
    body_open: bool,
    closed: bool,
}

impl<'s, 'p> BlockScope<'s, 'p> {
    fn open(parent: &'s mut dyn BodySink<'p>, style: BlockStyle, header: String) -> Self {
        parent.begin_body();
        let ctx = parent.context();
        let (depth, pool) = (ctx.depth, ctx.pool);
        Self {
            style,
            header,
            depth,
            body: Body::new(pool),
            parent,
            body_open: false,
            closed: false,
        }
    }

    pub fn write(&mut self, text: &str) {
        self.begin_body();
        let ctx = self.parent.context();
        let indent = ctx.indent(ctx.depth);
        self.body.write(&indent, text);
    }

    pub fn write_line(&mut self, text: &str) {
        self.write(text);
        self.body.end_line();
    }

    pub fn open_block<S: Into<String>>(&mut self, style: BlockStyle, header: S) -> BlockScope<'_, 'p> {
        BlockScope::open(self, style, header.into())
    }

    pub fn close(mut self) {
        self.closed = true;
        let ctx = self.parent.context();
        if self.body_open {
            ctx.depth -= 1;
        }
        let indent = ctx.indent(self.depth);
        let pool = ctx.pool;
        let mut out = pool.acquire();

        out.push_str(&indent);
        out.push_str(&self.header);
        out.push('\n');
        out.push_str(&indent);
        out.push_str("{\n");
        if !self.body.at_line_start {
            self.body.end_line();
        }
        out.push_str(&self.body.text);
        out.push_str(&indent);
        out.push_str(match self.style {
            BlockStyle::Braces => "}\n",
            BlockStyle::Lambda => "};\n",
        });

        self.parent.append_body(&out);
    }
}

impl<'p> ScopeSink<'p> for BlockScope<'_, 'p> {
    fn context(&mut self) -> &mut EmitContext<'p> {
        self.parent.context()
    }

    fn begin_body(&mut self) {
        if !self.body_open {
            self.body_open = true;
            self.parent.context().depth += 1;
        }
    }
}

impl<'p> BodySink<'p> for BlockScope<'_, 'p> {
    fn append_body(&mut self, text: &str) {
        self.body.append_rendered(text);
    }
}

impl Drop for BlockScope<'_, '_> {
    fn drop(&mut self) {
        assert_closed(self.closed, "block");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use partialgen_core::model::DeclarationKind;

    fn options() -> EmitOptions {
        EmitOptions::default()
    }

    #[test]
    fn test_file_with_namespace_and_members() {
        let pool = BufferPool::new();
        let mut file = FileScope::open(&pool, &options(), "Game.Player.Test.g.cs", Some("Game"));
        file.add_using("UnityEngine");
        file.add_using("System");
        file.add_using("UnityEngine");

        let mut declaration = file.open_declaration(DeclarationSpec::partial(DeclarationKind::Class, "Player"));
        declaration.add_field(MemberSpec::field("bool", "_ready").private());

        let mut method = declaration.open_member(MemberSpec::method("void", "Prepare").public());
        let mut guard = method.open_block(BlockStyle::Braces, "if (!_ready)");
        guard.write_line("_ready = true;");
        guard.close();
        method.close();

        declaration
            .open_member(MemberSpec::method("void", "OnPrepared").partial())
            .close();
        declaration.close();

        let artifact = file.finish();
        assert_eq!(artifact.hint_name, "Game.Player.Test.g.cs");
        let expected = "\
// <auto-generated>
//     This code was generated by partialgen.
//     Changes to this file may cause incorrect behavior and will be lost if
//     the code is regenerated.
// </auto-generated>

using System;
using UnityEngine;

namespace Game
{
    partial class Player
    {
        private bool _ready;

        public void Prepare()
        {
            if (!_ready)
            {
                _ready = true;
            }
        }

        partial void OnPrepared();
    }
}
";
        assert_eq!(artifact.text, expected);
    }

    #[test]
    fn test_lambda_block_and_nested_declarations() {
        let pool = BufferPool::new();
        let mut file = FileScope::open(&pool, &options(), "Outer.Inner.g.cs", None);

        let mut outer = file.open_declaration(DeclarationSpec::partial(DeclarationKind::Class, "Outer"));
        let mut inner = outer.open_declaration(DeclarationSpec::partial(DeclarationKind::Struct, "Inner"));
        let mut method = inner.open_member(MemberSpec::method("void", "Load"));
        let mut lambda = method.open_block(BlockStyle::Lambda, "_handle.Completed += handle =>");
        lambda.write("Use(");
        lambda.write("handle);");
        lambda.close();
        method.close();
        inner.close();
        outer.close();

        let text = file.finish().text;
        let body = text.split_once("\n\n").map(|(_, rest)| rest).unwrap();
        assert_eq!(
            body,
            "\
partial class Outer
{
    partial struct Inner
    {
        void Load()
        {
            _handle.Completed += handle =>
            {
                Use(handle);
            };
        }
    }
}
"
        );
    }

    #[test]
    fn test_depth_is_restored_after_each_scope() {
        let pool = BufferPool::new();
        let mut file = FileScope::open(&pool, &options(), "A.g.cs", Some("Ns"));
        {
            let mut declaration = file.open_declaration(DeclarationSpec::partial(DeclarationKind::Class, "A"));
            let depth_before = declaration.context().depth();
            let mut member = declaration.open_member(MemberSpec::method("void", "M"));
            member.write_line("return;");
            member.close();
            assert_eq!(declaration.context().depth(), depth_before + 1);
            declaration.close();
        }
        let artifact = file.finish();
        assert!(artifact.text.contains("        void M()\n        {\n            return;\n        }\n"));
    }

    #[test]
    fn test_fragment_renders_single_member() {
        let pool = BufferPool::new();
        let mut fragment = Fragment::new(&pool, &options());
        let mut stub = fragment.open_member(
            MemberSpec::method("void", "OnHealthChanged")
                .partial()
                .with_parameter("int", "previous")
                .with_parameter("int", "current"),
        );
        stub.write_line("throw new System.NotImplementedException();");
        stub.close();

        assert_eq!(
            fragment.into_text(),
            "partial void OnHealthChanged(int previous, int current)\n{\n    throw new System.NotImplementedException();\n}\n"
        );
    }

    #[test]
    #[should_panic(expected = "member scope dropped without being closed")]
    fn test_unclosed_scope_panics() {
        let pool = BufferPool::new();
        let mut fragment = Fragment::new(&pool, &options());
        let member = fragment.open_member(MemberSpec::method("void", "Leak"));
        drop(member);
    }

    #[test]
    fn test_buffers_return_to_pool() {
        let pool = BufferPool::new();
        {
            let mut file = FileScope::open(&pool, &options(), "A.g.cs", None);
            file.open_declaration(DeclarationSpec::partial(DeclarationKind::Class, "A"))
                .close();
            file.finish();
        }
        let idle = pool.idle();
        assert!(idle > 0);

        let mut file = FileScope::open(&pool, &options(), "B.g.cs", None);
        file.open_declaration(DeclarationSpec::partial(DeclarationKind::Class, "B"))
            .close();
        let text = file.finish().text;
        assert!(!text.contains("class A"));
    }
}
