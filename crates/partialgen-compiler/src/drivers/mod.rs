//! Generation drivers
//!
//! A driver turns one [`FactSnapshot`] into one generated file. Drivers are
//! pure: the same snapshot and options always give byte-identical text.

pub mod asset_loader;
pub mod input_callbacks;
pub mod subscriptions;

pub use asset_loader::AssetLoaderDriver;
pub use input_callbacks::InputCallbacksDriver;
pub use subscriptions::SubscriptionsDriver;

use crate::annotations::AnnotationKind;
use crate::config::{DriverSettings, EmitOptions};
use crate::emit::{BufferPool, DeclarationScope, DeclarationSpec, FileScope, GeneratedArtifact};
use crate::facts::FactSnapshot;
use partialgen_core::model::ContainingType;
use partialgen_core::types::TypeRef;
use std::sync::Arc;

/// A generator for one annotation kind
pub trait GenerationDriver: Send + Sync {
    /// Human-readable driver name
    fn name(&self) -> &'static str;

    /// The annotation whose members this driver consumes
    fn annotation(&self) -> AnnotationKind;

    /// Middle part of the artifact name, `Player.<suffix>.g.cs`
    fn artifact_suffix(&self) -> &'static str;

    /// Namespaces imported by every generated file
    fn usings(&self) -> &'static [&'static str];

    fn generate(&self, snapshot: &FactSnapshot, options: &EmitOptions) -> GeneratedArtifact;
}

/// The enabled built-in drivers, sharing one buffer pool
pub fn default_drivers(settings: &DriverSettings, pool: Arc<BufferPool>) -> Vec<Box<dyn GenerationDriver>> {
    let mut drivers: Vec<Box<dyn GenerationDriver>> = Vec::new();
    if settings.asset_loader {
        drivers.push(Box::new(AssetLoaderDriver::new(pool.clone())));
    }
    if settings.subscriptions {
        drivers.push(Box::new(SubscriptionsDriver::new(pool.clone())));
    }
    if settings.input_callbacks {
        drivers.push(Box::new(InputCallbacksDriver::new(pool)));
    }
    drivers
}

/// `<Namespace.Containing.Name>.<Suffix>.g.<ext>`
pub fn artifact_name(snapshot: &FactSnapshot, suffix: &str, options: &EmitOptions) -> String {
    format!(
        "{}.{}.g.{}",
        snapshot.declaration.qualified_name(),
        suffix,
        options.file_extension
    )
}

/// Render a type for generated code, dropping namespaces the file imports
pub fn render_type(ty: &TypeRef, imported: &[&str]) -> String {
    let mut out = String::new();
    match ty.keyword_alias() {
        Some(keyword) => out.push_str(keyword),
        None => {
            if let Some(namespace) = ty.namespace.as_deref() {
                if !imported.contains(&namespace) {
                    out.push_str(namespace);
                    out.push('.');
                }
            }
            out.push_str(&ty.name);
            if !ty.args.is_empty() {
                let args: Vec<String> = ty.args.iter().map(|arg| render_type(arg, imported)).collect();
                out.push('<');
                out.push_str(&args.join(", "));
                out.push('>');
            }
        }
    }
    for _ in 0..ty.array_rank {
        out.push_str("[]");
    }
    out
}

/// C# string literal for `value`
pub fn string_literal(value: &str) -> String {
    let mut literal = String::with_capacity(value.len() + 2);
    literal.push('"');
    for c in value.chars() {
        match c {
            '"' => literal.push_str("\\\""),
            '\\' => literal.push_str("\\\\"),
            '\n' => literal.push_str("\\n"),
            '\r' => literal.push_str("\\r"),
            '\t' => literal.push_str("\\t"),
            _ => literal.push(c),
        }
    }
    literal.push('"');
    literal
}

/// Open the file for `snapshot`, re-open its containing types and run `body`
/// inside the partial declaration
pub(crate) fn emit_partial_file<F>(
    pool: &BufferPool,
    driver: &dyn GenerationDriver,
    snapshot: &FactSnapshot,
    options: &EmitOptions,
    body: F,
) -> GeneratedArtifact
where
    F: FnOnce(&mut DeclarationScope<'_, '_>),
{
    let declaration = &snapshot.declaration;
    let mut file = FileScope::open(
        pool,
        options,
        artifact_name(snapshot, driver.artifact_suffix(), options),
        declaration.namespace.as_deref(),
    );
    for using in driver.usings() {
        file.add_using(*using);
    }

    let target = DeclarationSpec::partial(declaration.kind, declaration.name.clone())
        .with_type_parameters(&declaration.type_parameters);

    match declaration.containing.split_first() {
        None => {
            let mut scope = file.open_declaration(target);
            body(&mut scope);
            scope.close();
        }
        Some((outermost, rest)) => {
            let mut scope = file.open_declaration(containing_spec(outermost));
            within_containing(&mut scope, rest, target, body);
            scope.close();
        }
    }

    file.finish()
}

fn within_containing<F>(scope: &mut DeclarationScope<'_, '_>, containing: &[ContainingType], target: DeclarationSpec, body: F)
where
    F: FnOnce(&mut DeclarationScope<'_, '_>),
{
    match containing.split_first() {
        None => {
            let mut inner = scope.open_declaration(target);
            body(&mut inner);
            inner.close();
        }
        Some((outer, rest)) => {
            let mut inner = scope.open_declaration(containing_spec(outer));
            within_containing(&mut inner, rest, target, body);
            inner.close();
        }
    }
}

fn containing_spec(outer: &ContainingType) -> DeclarationSpec {
    DeclarationSpec::partial(outer.kind, outer.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_type() {
        let handle = TypeRef::new(Some("UnityEngine.ResourceManagement.AsyncOperations"), "AsyncOperationHandle")
            .with_args(vec![TypeRef::new(Some("UnityEngine"), "Sprite")]);
        assert_eq!(
            render_type(&handle, &["UnityEngine.ResourceManagement.AsyncOperations"]),
            "AsyncOperationHandle<UnityEngine.Sprite>"
        );
        assert_eq!(render_type(&handle, &[]), handle.to_string());

        let mut ints = TypeRef::keyword("int").unwrap();
        ints.array_rank = 1;
        assert_eq!(render_type(&ints, &[]), "int[]");
    }

    #[test]
    fn test_string_literal() {
        assert_eq!(string_literal("Jump"), "\"Jump\"");
        assert_eq!(string_literal("a\"b\\c"), "\"a\\\"b\\\\c\"");
    }

    #[test]
    fn test_default_drivers_follow_settings() {
        let pool = Arc::new(BufferPool::new());
        let all = default_drivers(&DriverSettings::default(), pool.clone());
        let suffixes: Vec<_> = all.iter().map(|d| d.artifact_suffix()).collect();
        assert_eq!(suffixes, vec!["AssetLoader", "Subscriptions", "InputCallbacks"]);

        let settings = DriverSettings {
            asset_loader: false,
            subscriptions: true,
            input_callbacks: false,
        };
        let some = default_drivers(&settings, pool);
        assert_eq!(some.len(), 1);
        assert_eq!(some[0].annotation(), AnnotationKind::Subscribe);
    }
}
