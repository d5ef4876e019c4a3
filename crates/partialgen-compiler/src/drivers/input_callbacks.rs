//! `[GenerateInputCallbacks]`: input action phase registration

use super::{emit_partial_file, render_type, string_literal, GenerationDriver};
use crate::annotations::AnnotationKind;
use crate::config::EmitOptions;
use crate::emit::{BlockStyle, BufferPool, DeclarationScope, GeneratedArtifact, MemberSpec};
use crate::facts::{AnnotatedMember, FactSnapshot, InputPhase, InputRequest, InputSourceKind};
use crate::naming::{escape_keyword, to_camel_case};
use crate::signatures::expected_callbacks;
use partialgen_core::references::INPUT_SYSTEM_NAMESPACE;
use std::sync::Arc;

const USINGS: &[&str] = &[INPUT_SYSTEM_NAMESPACE];

#[derive(Debug, Default)]
pub struct InputCallbacksDriver {
    pool: Arc<BufferPool>,
}

impl InputCallbacksDriver {
    pub fn new(pool: Arc<BufferPool>) -> Self {
        Self { pool }
    }
}

struct Registration<'m> {
    member: &'m AnnotatedMember,
    request: &'m InputRequest,
    action_field: String,
    registered_field: String,
}

impl<'m> Registration<'m> {
    fn for_member(member: &'m AnnotatedMember) -> Option<Self> {
        let request = member.requests.input.as_ref()?;
        let camel = to_camel_case(&member.unique_name);
        Some(Self {
            member,
            request,
            action_field: format!("_{}Action", camel),
            registered_field: format!("_{}CallbacksRegistered", camel),
        })
    }

    fn lookup(&self) -> String {
        let source = escape_keyword(&self.member.source_name);
        let action = string_literal(&self.request.action);
        match self.request.source {
            InputSourceKind::ActionAsset => format!("{}.FindAction({}, true)", source, action),
            InputSourceKind::PlayerInput => format!("{}.actions.FindAction({}, true)", source, action),
        }
    }

    fn handlers(&self) -> impl Iterator<Item = (InputPhase, String)> + '_ {
        let label = &self.member.unique_name;
        self.request
            .phases
            .iter()
            .map(move |phase| (phase, format!("On{}{}", label, phase.label())))
    }
}

impl GenerationDriver for InputCallbacksDriver {
    fn name(&self) -> &'static str {
        "input callbacks"
    }

    fn annotation(&self) -> AnnotationKind {
        AnnotationKind::InputCallbacks
    }

    fn artifact_suffix(&self) -> &'static str {
        "InputCallbacks"
    }

    fn usings(&self) -> &'static [&'static str] {
        USINGS
    }

    fn generate(&self, snapshot: &FactSnapshot, options: &EmitOptions) -> GeneratedArtifact {
        let registrations: Vec<Registration<'_>> =
            snapshot.members.iter().filter_map(Registration::for_member).collect();

        emit_partial_file(&self.pool, self, snapshot, options, |declaration| {
            for registration in &registrations {
                declaration.add_field(MemberSpec::field("InputAction", registration.action_field.clone()).private());
                declaration.add_field(MemberSpec::field("bool", registration.registered_field.clone()).private());
            }
            emit_register(declaration, &registrations);
            emit_unregister(declaration, &registrations);
            for registration in &registrations {
                for callback in expected_callbacks(AnnotationKind::InputCallbacks, registration.member) {
                    declaration
                        .open_member(callback.to_member_spec(|ty| render_type(ty, USINGS)))
                        .close();
                }
            }
        })
    }
}

fn emit_register(declaration: &mut DeclarationScope<'_, '_>, registrations: &[Registration<'_>]) {
    let mut method = declaration.open_member(MemberSpec::method("void", "RegisterInputCallbacks").public());
    for registration in registrations {
        let mut guard = method.open_block(BlockStyle::Braces, format!("if (!{})", registration.registered_field));
        guard.write_line(&format!("{} = true;", registration.registered_field));
        guard.write_line(&format!("{} = {};", registration.action_field, registration.lookup()));
        for (phase, handler) in registration.handlers() {
            guard.write_line(&format!(
                "{}.{} += {};",
                registration.action_field,
                phase.event_name(),
                handler
            ));
        }
        guard.close();
    }
    method.close();
}

fn emit_unregister(declaration: &mut DeclarationScope<'_, '_>, registrations: &[Registration<'_>]) {
    let mut method = declaration.open_member(MemberSpec::method("void", "UnregisterInputCallbacks").public());
    for registration in registrations {
        let mut guard = method.open_block(BlockStyle::Braces, format!("if ({})", registration.registered_field));
        guard.write_line(&format!("{} = false;", registration.registered_field));
        for (phase, handler) in registration.handlers() {
            guard.write_line(&format!(
                "{}.{} -= {};",
                registration.action_field,
                phase.event_name(),
                handler
            ));
        }
        guard.write_line(&format!("{} = null;", registration.action_field));
        guard.close();
    }
    method.close();
}
