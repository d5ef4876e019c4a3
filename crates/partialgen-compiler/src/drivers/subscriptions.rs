//! `[GenerateSubscribeMethods]`: guarded subscribe/unsubscribe pairs

use super::asset_loader::loaded_asset_field;
use super::{emit_partial_file, render_type, GenerationDriver};
use crate::annotations::AnnotationKind;
use crate::config::EmitOptions;
use crate::emit::{BlockStyle, BufferPool, DeclarationScope, GeneratedArtifact, MemberSpec};
use crate::facts::{AnnotatedMember, FactSnapshot};
use crate::naming::escape_keyword;
use crate::signatures::expected_callbacks;
use std::sync::Arc;

/// Generates `SubscribeTo<Name>`/`UnsubscribeFrom<Name>` per notifier member
#[derive(Debug, Default)]
pub struct SubscriptionsDriver {
    pool: Arc<BufferPool>,
}

impl SubscriptionsDriver {
    pub fn new(pool: Arc<BufferPool>) -> Self {
        Self { pool }
    }
}

/// Names used by one member's subscribe pair
struct Subscription {
    flag: String,
    target: String,
    event: &'static str,
    handler: String,
    /// Asset-backed targets may not be loaded yet
    null_checked: bool,
}

impl Subscription {
    fn for_member(member: &AnnotatedMember) -> Option<Self> {
        let event = member.capability.event_name()?;
        let handler = expected_callbacks(AnnotationKind::Subscribe, member).into_iter().next()?.name;
        let target = if member.asset_reference {
            loaded_asset_field(member)
        } else {
            escape_keyword(&member.source_name)
        };
        Some(Self {
            flag: format!("_subscribedTo{}", member.unique_name),
            target,
            event,
            handler,
            null_checked: member.asset_reference,
        })
    }

    fn guard(&self, subscribed: bool) -> String {
        let flag = if subscribed {
            self.flag.clone()
        } else {
            format!("!{}", self.flag)
        };
        if self.null_checked {
            format!("if ({} && {} != null)", flag, self.target)
        } else {
            format!("if ({})", flag)
        }
    }
}

fn subscribe_method(member: &AnnotatedMember) -> String {
    format!("SubscribeTo{}", member.unique_name)
}

fn unsubscribe_method(member: &AnnotatedMember) -> String {
    format!("UnsubscribeFrom{}", member.unique_name)
}

impl GenerationDriver for SubscriptionsDriver {
    fn name(&self) -> &'static str {
        "subscriptions"
    }

    fn annotation(&self) -> AnnotationKind {
        AnnotationKind::Subscribe
    }

    fn artifact_suffix(&self) -> &'static str {
        "Subscriptions"
    }

    fn usings(&self) -> &'static [&'static str] {
        &[]
    }

    fn generate(&self, snapshot: &FactSnapshot, options: &EmitOptions) -> GeneratedArtifact {
        let subscribed: Vec<(&AnnotatedMember, Subscription)> = snapshot
            .members
            .iter()
            .filter_map(|member| Subscription::for_member(member).map(|s| (member, s)))
            .collect();

        emit_partial_file(&self.pool, self, snapshot, options, |declaration| {
            for (_, subscription) in &subscribed {
                declaration.add_field(MemberSpec::field("bool", subscription.flag.clone()).private());
            }
            for (member, subscription) in &subscribed {
                emit_pair(declaration, member, subscription);
            }
            emit_all(declaration, "SubscribeAll", subscribed.iter().map(|(m, _)| subscribe_method(m)));
            emit_all(declaration, "UnsubscribeAll", subscribed.iter().map(|(m, _)| unsubscribe_method(m)));
            for (member, _) in &subscribed {
                for callback in expected_callbacks(AnnotationKind::Subscribe, member) {
                    declaration
                        .open_member(callback.to_member_spec(|ty| render_type(ty, &[])))
                        .close();
                }
            }
        })
    }
}

fn emit_pair(declaration: &mut DeclarationScope<'_, '_>, member: &AnnotatedMember, subscription: &Subscription) {
    let mut subscribe = declaration.open_member(MemberSpec::method("void", subscribe_method(member)).public());
    let mut guard = subscribe.open_block(BlockStyle::Braces, subscription.guard(false));
    guard.write_line(&format!("{} = true;", subscription.flag));
    guard.write_line(&format!(
        "{}.{} += {};",
        subscription.target, subscription.event, subscription.handler
    ));
    guard.close();
    subscribe.close();

    let mut unsubscribe = declaration.open_member(MemberSpec::method("void", unsubscribe_method(member)).public());
    let mut guard = unsubscribe.open_block(BlockStyle::Braces, subscription.guard(true));
    guard.write_line(&format!("{} = false;", subscription.flag));
    guard.write_line(&format!(
        "{}.{} -= {};",
        subscription.target, subscription.event, subscription.handler
    ));
    guard.close();
    unsubscribe.close();
}

fn emit_all<I: Iterator<Item = String>>(declaration: &mut DeclarationScope<'_, '_>, name: &str, calls: I) {
    let mut method = declaration.open_member(MemberSpec::method("void", name).public());
    for call in calls {
        method.write_line(&format!("{}();", call));
    }
    method.close();
}
