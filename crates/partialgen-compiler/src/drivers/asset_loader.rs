//! `[GenerateLoader]`: Addressables load/release boilerplate

use super::{emit_partial_file, render_type, GenerationDriver};
use crate::annotations::AnnotationKind;
use crate::config::EmitOptions;
use crate::emit::{BlockStyle, BufferPool, DeclarationScope, GeneratedArtifact, MemberSpec};
use crate::facts::{AnnotatedMember, FactSnapshot};
use crate::naming::{escape_keyword, to_camel_case};
use crate::signatures::expected_callbacks;
use partialgen_core::references::{ADDRESSABLES_NAMESPACE, ASYNC_OPERATIONS_NAMESPACE};
use partialgen_core::types::TypeRef;
use std::sync::Arc;

const USINGS: &[&str] = &[ADDRESSABLES_NAMESPACE, ASYNC_OPERATIONS_NAMESPACE];

/// Generates `LoadAssets`/`ReleaseAssets` and an `On<Name>Loaded` hook per asset reference
#[derive(Debug, Default)]
pub struct AssetLoaderDriver {
    pool: Arc<BufferPool>,
}

impl AssetLoaderDriver {
    pub fn new(pool: Arc<BufferPool>) -> Self {
        Self { pool }
    }
}

/// Backing field names for one loaded member
struct LoaderFields {
    handle: String,
    requested: String,
    asset: String,
}

impl LoaderFields {
    fn for_member(member: &AnnotatedMember) -> Self {
        let camel = to_camel_case(&member.unique_name);
        Self {
            handle: format!("_{}Handle", camel),
            requested: format!("_{}LoadRequested", camel),
            asset: format!("_{}Asset", camel),
        }
    }
}

/// Name of the field holding the loaded asset, shared with the subscription driver
pub fn loaded_asset_field(member: &AnnotatedMember) -> String {
    LoaderFields::for_member(member).asset
}

fn payload(member: &AnnotatedMember) -> String {
    let payload = member
        .payload_type
        .clone()
        .unwrap_or_else(|| TypeRef::new(Some("UnityEngine"), "Object"));
    render_type(&payload, USINGS)
}

impl GenerationDriver for AssetLoaderDriver {
    fn name(&self) -> &'static str {
        "asset loader"
    }

    fn annotation(&self) -> AnnotationKind {
        AnnotationKind::Loader
    }

    fn artifact_suffix(&self) -> &'static str {
        "AssetLoader"
    }

    fn usings(&self) -> &'static [&'static str] {
        USINGS
    }

    fn generate(&self, snapshot: &FactSnapshot, options: &EmitOptions) -> GeneratedArtifact {
        emit_partial_file(&self.pool, self, snapshot, options, |declaration| {
            emit_fields(declaration, &snapshot.members);
            emit_load(declaration, &snapshot.members);
            emit_release(declaration, &snapshot.members);
            for member in &snapshot.members {
                for callback in expected_callbacks(AnnotationKind::Loader, member) {
                    declaration
                        .open_member(callback.to_member_spec(|ty| render_type(ty, USINGS)))
                        .close();
                }
            }
        })
    }
}

fn emit_fields(declaration: &mut DeclarationScope<'_, '_>, members: &[AnnotatedMember]) {
    for member in members {
        let fields = LoaderFields::for_member(member);
        let payload = payload(member);
        declaration.add_field(MemberSpec::field(format!("AsyncOperationHandle<{}>", payload), fields.handle).private());
        declaration.add_field(MemberSpec::field("bool", fields.requested).private());
        declaration.add_field(MemberSpec::field(payload, fields.asset).private());
    }
}

fn emit_load(declaration: &mut DeclarationScope<'_, '_>, members: &[AnnotatedMember]) {
    let mut method = declaration.open_member(MemberSpec::method("void", "LoadAssets").public());
    for member in members {
        let fields = LoaderFields::for_member(member);
        let payload = payload(member);
        let loaded = expected_callbacks(AnnotationKind::Loader, member);

        let mut guard = method.open_block(BlockStyle::Braces, format!("if (!{})", fields.requested));
        guard.write_line(&format!("{} = true;", fields.requested));
        guard.write_line(&format!(
            "{} = {}.LoadAssetAsync<{}>();",
            fields.handle,
            escape_keyword(&member.source_name),
            payload
        ));
        {
            let mut completed = guard.open_block(BlockStyle::Lambda, format!("{}.Completed += handle =>", fields.handle));
            let mut succeeded =
                completed.open_block(BlockStyle::Braces, "if (handle.Status == AsyncOperationStatus.Succeeded)");
            succeeded.write_line(&format!("{} = handle.Result;", fields.asset));
            for callback in &loaded {
                succeeded.write_line(&format!("{}({});", callback.name, fields.asset));
            }
            succeeded.close();
            completed.close();
        }
        guard.close();
    }
    method.close();
}

fn emit_release(declaration: &mut DeclarationScope<'_, '_>, members: &[AnnotatedMember]) {
    let mut method = declaration.open_member(MemberSpec::method("void", "ReleaseAssets").public());
    for member in members {
        let fields = LoaderFields::for_member(member);

        let mut guard = method.open_block(BlockStyle::Braces, format!("if ({})", fields.requested));
        guard.write_line(&format!("{} = false;", fields.requested));
        guard.write_line(&format!("{} = default;", fields.asset));
        let mut valid = guard.open_block(BlockStyle::Braces, format!("if ({}.IsValid())", fields.handle));
        valid.write_line(&format!("Addressables.Release({});", fields.handle));
        valid.close();
        guard.close();
    }
    method.close();
}
