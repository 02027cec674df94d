//! Use classification: a priority-ordered decision procedure over syntactic
//! shape plus resolved type information.
//!
//! Rules are an ordered sequence of predicate/handler pairs; the first match
//! wins, so a node is never classified twice. Nested nodes are classified
//! independently, never merged. A candidate node no rule matches fails with
//! an unclassifiable condition that the correlator downgrades to a SKIP
//! status entry.

use crate::callgraph::CallGraphIndex;
use crate::resolver::TypeResolver;
use crate::tracer::ReflectTracer;
use protoscan_core::config::AnalysisConfig;
use protoscan_core::entry::{
    Constructor, ConstructorType, Conversion, ConversionContext, Embedding, Expression,
    FieldAccess, FuncArg, MethodCall, MethodCallType, ShallowCopy, ShallowCopyType, TypeAssertion,
    TypeDefinition, TypeName, Use,
};
use protoscan_core::error::{Error, Result};
use protoscan_core::program::{
    package_base, Callee, Node, NodeDetail, NodeKind, SourceFile, TypeRef,
};
use tracing::trace;

/// A successful classification of one node
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub type_name: TypeName,
    pub expr: Expression,
    pub usage: Use,
}

/// Per-snapshot classifier; holds the snapshot-scoped context objects and
/// is safe to share across concurrent classification tasks
pub struct Classifier<'a> {
    resolver: &'a TypeResolver,
    tracer: ReflectTracer<'a>,
    config: &'a AnalysisConfig,
}

/// Everything a rule may inspect for one node
struct RuleCtx<'a> {
    file: &'a SourceFile,
    node: &'a Node,
    parent: Option<&'a Node>,
    resolver: &'a TypeResolver,
    tracer: &'a ReflectTracer<'a>,
    config: &'a AnalysisConfig,
}

struct Rule {
    name: &'static str,
    apply: for<'a> fn(&RuleCtx<'a>) -> Option<(TypeName, Use)>,
}

/// Priority-ordered rule list; order is part of the classification contract
const RULES: &[Rule] = &[
    Rule {
        name: "type_assertion",
        apply: type_assertion,
    },
    Rule {
        name: "type_definition",
        apply: type_definition,
    },
    Rule {
        name: "embedding",
        apply: embedding,
    },
    Rule {
        name: "constructor",
        apply: constructor,
    },
    Rule {
        name: "method_call",
        apply: method_call,
    },
    Rule {
        name: "field_access",
        apply: field_access,
    },
    Rule {
        name: "conversion",
        apply: conversion,
    },
    Rule {
        name: "shallow_copy",
        apply: shallow_copy,
    },
    Rule {
        name: "reflect_call",
        apply: reflect_call,
    },
    Rule {
        name: "build_dependency",
        apply: build_dependency,
    },
];

impl<'a> Classifier<'a> {
    pub fn new(
        resolver: &'a TypeResolver,
        index: &'a CallGraphIndex,
        config: &'a AnalysisConfig,
    ) -> Self {
        Self {
            resolver,
            tracer: ReflectTracer::new(index, config),
            config,
        }
    }

    /// Classifies one candidate node. Classification is pure: the same node
    /// against the same snapshot always yields the same output.
    pub fn classify(&self, file: &SourceFile, node: &Node) -> Result<Classification> {
        let parent = file.parent_of(node);
        let ctx = RuleCtx {
            file,
            node,
            parent,
            resolver: self.resolver,
            tracer: &self.tracer,
            config: self.config,
        };
        for rule in RULES {
            if let Some((type_name, usage)) = (rule.apply)(&ctx) {
                trace!(
                    rule = rule.name,
                    file = %file.path,
                    line = node.start.line,
                    "classified node"
                );
                return Ok(Classification {
                    type_name,
                    expr: Expression {
                        kind: node.kind.to_string(),
                        parent_kind: parent.map(|p| p.kind.to_string()).unwrap_or_default(),
                    },
                    usage,
                });
            }
        }
        Err(Error::unclassifiable(format!(
            "{} at {}:{}",
            node.kind, file.path, node.start.line
        )))
    }

    /// Selects the nodes of a file that involve a generated type in a
    /// classifiable position
    pub fn collect_candidates<'f>(&self, file: &'f SourceFile) -> Vec<&'f Node> {
        file.nodes
            .iter()
            .filter(|node| self.is_candidate(file, node))
            .collect()
    }

    fn is_candidate(&self, file: &SourceFile, node: &Node) -> bool {
        match node.kind {
            NodeKind::TypeAssertExpr | NodeKind::TypeSwitchCase => match &node.detail {
                NodeDetail::TypeAssert { asserted, src } => {
                    asserted.is_message() || src.is_message()
                }
                _ => false,
            },
            NodeKind::TypeSpec => match &node.detail {
                NodeDetail::TypeDecl { underlying, .. } => underlying.is_message(),
                _ => false,
            },
            NodeKind::EmbeddedField => node.ty.as_ref().is_some_and(TypeRef::is_message),
            NodeKind::CompositeLit => {
                node.ty.as_ref().is_some_and(TypeRef::is_message)
                    || self.builder_base(node.ty.as_ref()).is_some()
            }
            NodeKind::CallExpr => match &node.detail {
                NodeDetail::Convert { dest, src } => dest.is_message() || src.is_message(),
                NodeDetail::Call {
                    callee: Some(callee),
                } => {
                    let on_message = callee.receiver.as_ref().is_some_and(TypeRef::is_message);
                    let on_builder = callee
                        .receiver
                        .as_ref()
                        .and_then(|r| self.builder_base(Some(r)))
                        .is_some();
                    let builder_fn = callee.receiver.is_none()
                        && callee.name.starts_with("New")
                        && callee.ret.as_ref().is_some_and(TypeRef::is_message);
                    let reflective = self.config.is_reflection_package(&callee.package)
                        && subtree_message(file, node, self.resolver).is_some();
                    on_message || on_builder || builder_fn || reflective
                }
                _ => false,
            },
            NodeKind::SelectorExpr => match &node.detail {
                NodeDetail::Selector {
                    is_method: false,
                    declared_on: Some(declared_on),
                    ..
                } => declared_on.is_message(),
                _ => value_copy_context(node, file.parent_of(node)),
            },
            NodeKind::Ident | NodeKind::StarExpr | NodeKind::UnaryExpr => {
                value_copy_context(node, file.parent_of(node))
            }
            NodeKind::ImportSpec => matches!(
                &node.detail,
                NodeDetail::Import {
                    generated: true,
                    ..
                }
            ),
            NodeKind::Other => node.ty.as_ref().is_some_and(TypeRef::is_message),
            _ => false,
        }
    }

    fn builder_base<'t>(&self, ty: Option<&'t TypeRef>) -> Option<(&'t str, &'t str)> {
        builder_base(ty, &self.config.builder_suffix)
    }
}

/// Builder types follow the generated `<Message><suffix>` naming convention
fn builder_base<'t>(ty: Option<&'t TypeRef>, suffix: &str) -> Option<(&'t str, &'t str)> {
    match ty.map(TypeRef::unwrap_indirection) {
        Some(TypeRef::Named { package, name, .. }) => name
            .strip_suffix(suffix)
            .filter(|base| !base.is_empty())
            .map(|base| (package.as_str(), base)),
        _ => None,
    }
}

/// True when the node is a value-typed (non-pointer) generated expression
/// read in a whole-value copy position
fn value_copy_context(node: &Node, parent: Option<&Node>) -> bool {
    if node.lvalue {
        return false;
    }
    let value_message = matches!(node.ty.as_ref(), Some(TypeRef::Named { message: true, .. }));
    value_message
        && matches!(
            parent.map(|p| p.kind),
            Some(
                NodeKind::AssignStmt
                    | NodeKind::ValueSpec
                    | NodeKind::CallExpr
                    | NodeKind::ReturnStmt
                    | NodeKind::CompositeLit
                    | NodeKind::SendStmt
            )
        )
}

fn type_assertion(ctx: &RuleCtx) -> Option<(TypeName, Use)> {
    if !matches!(
        ctx.node.kind,
        NodeKind::TypeAssertExpr | NodeKind::TypeSwitchCase
    ) {
        return None;
    }
    let NodeDetail::TypeAssert { asserted, src } = &ctx.node.detail else {
        return None;
    };
    let target = ctx.resolver.resolve_ref(asserted)?;
    Some((
        target,
        Use::TypeAssertion(TypeAssertion {
            src_type: src.render(),
        }),
    ))
}

fn type_definition(ctx: &RuleCtx) -> Option<(TypeName, Use)> {
    if ctx.node.kind != NodeKind::TypeSpec {
        return None;
    }
    let NodeDetail::TypeDecl { name, underlying } = &ctx.node.detail else {
        return None;
    };
    let target = ctx.resolver.resolve_ref(underlying)?;
    Some((
        target,
        Use::TypeDefinition(TypeDefinition {
            new_type: name.clone(),
        }),
    ))
}

fn embedding(ctx: &RuleCtx) -> Option<(TypeName, Use)> {
    if ctx.node.kind != NodeKind::EmbeddedField {
        return None;
    }
    let NodeDetail::Embedded { index } = &ctx.node.detail else {
        return None;
    };
    let target = ctx.resolver.resolve(ctx.node)?;
    Some((
        target,
        Use::Embedding(Embedding {
            field_index: *index,
        }),
    ))
}

fn constructor(ctx: &RuleCtx) -> Option<(TypeName, Use)> {
    match ctx.node.kind {
        NodeKind::CompositeLit => {
            let elems = match &ctx.node.detail {
                NodeDetail::CompositeLit { elems } => *elems,
                _ => 0,
            };
            if let Some(target) = ctx.resolver.resolve(ctx.node) {
                let kind = if elems == 0 {
                    ConstructorType::EmptyLiteral
                } else {
                    ConstructorType::NonemptyLiteral
                };
                return Some((target, Use::Constructor(Constructor { kind })));
            }
            // a builder literal constructs the message it is named after
            let (package, base) = builder_base(ctx.node.ty.as_ref(), &ctx.config.builder_suffix)?;
            let target = ctx.resolver.type_name(package, base);
            Some((
                target,
                Use::Constructor(Constructor {
                    kind: ConstructorType::Builder,
                }),
            ))
        }
        NodeKind::CallExpr => {
            let NodeDetail::Call {
                callee: Some(callee),
            } = &ctx.node.detail
            else {
                return None;
            };
            if callee.receiver.is_some() || !callee.name.starts_with("New") {
                return None;
            }
            let target = callee
                .ret
                .as_ref()
                .and_then(|ret| ctx.resolver.resolve_ref(ret))?;
            Some((
                target,
                Use::Constructor(Constructor {
                    kind: ConstructorType::Builder,
                }),
            ))
        }
        _ => None,
    }
}

fn method_call(ctx: &RuleCtx) -> Option<(TypeName, Use)> {
    if ctx.node.kind != NodeKind::CallExpr {
        return None;
    }
    let NodeDetail::Call {
        callee: Some(callee),
    } = &ctx.node.detail
    else {
        return None;
    };
    let receiver = callee.receiver.as_ref()?;

    // Builder methods finalize or fill the message the builder is named
    // after; only Build is part of the well-known surface.
    if let Some((package, base)) = builder_base(Some(receiver), &ctx.config.builder_suffix) {
        let kind = if callee.name == "Build" {
            MethodCallType::GetBuild
        } else {
            MethodCallType::Invalid
        };
        let target = callee
            .ret
            .as_ref()
            .and_then(|ret| ctx.resolver.resolve_ref(ret))
            .unwrap_or_else(|| ctx.resolver.type_name(package, base));
        return Some((
            target,
            Use::MethodCall(MethodCall {
                method: callee.name.clone(),
                kind,
            }),
        ));
    }

    let target = ctx.resolver.resolve_ref(receiver)?;
    let kind = if is_oneof_accessor(callee) {
        MethodCallType::GetOneof
    } else {
        MethodCallType::Invalid
    };
    Some((
        target,
        Use::MethodCall(MethodCall {
            method: callee.name.clone(),
            kind,
        }),
    ))
}

/// Generated oneof accessors return the `is*` wrapper interface or follow
/// the `Which*` naming convention
fn is_oneof_accessor(callee: &Callee) -> bool {
    match callee.ret.as_ref() {
        Some(TypeRef::Boxed { iface, .. }) => iface.starts_with("is"),
        Some(TypeRef::Named { name, .. }) => name.starts_with("is"),
        _ => callee.name.starts_with("Which"),
    }
}

fn field_access(ctx: &RuleCtx) -> Option<(TypeName, Use)> {
    if ctx.node.kind != NodeKind::SelectorExpr {
        return None;
    }
    let NodeDetail::Selector {
        field,
        exported,
        is_method: false,
        declared_on: Some(declared_on),
    } = &ctx.node.detail
    else {
        return None;
    };
    let target = ctx.resolver.resolve_ref(declared_on)?;
    let payload = FieldAccess {
        field_name: field.clone(),
        field_type: ctx
            .node
            .ty
            .as_ref()
            .map(TypeRef::render)
            .unwrap_or_default(),
    };
    let usage = if *exported {
        Use::DirectFieldAccess(payload)
    } else {
        // implementation-only fields are architecturally riskier to migrate
        Use::InternalFieldAccess(payload)
    };
    Some((target, usage))
}

fn conversion(ctx: &RuleCtx) -> Option<(TypeName, Use)> {
    let NodeDetail::Convert { dest, src } = &ctx.node.detail else {
        return None;
    };
    let target = ctx
        .resolver
        .resolve_ref(src)
        .or_else(|| ctx.resolver.resolve_ref(dest))?;
    let (context, func_arg) = conversion_role(ctx);
    Some((
        target,
        Use::Conversion(Conversion {
            dest_type_name: dest.render(),
            context,
            func_arg,
        }),
    ))
}

/// Derives the conversion context from the syntactic role of the node
fn conversion_role(ctx: &RuleCtx) -> (ConversionContext, Option<FuncArg>) {
    match ctx.parent.map(|p| p.kind) {
        Some(NodeKind::CallExpr) => {
            let func_arg = match ctx.parent.map(|p| &p.detail) {
                Some(NodeDetail::Call {
                    callee: Some(callee),
                }) => FuncArg {
                    function_name: callee.name.clone(),
                    package_path: callee.package.clone(),
                    signature: callee.signature.clone(),
                },
                // indirect call through a variable: statically unknown
                _ => FuncArg::default(),
            };
            (ConversionContext::CallArgument, Some(func_arg))
        }
        Some(NodeKind::ReturnStmt) => (ConversionContext::ReturnValue, None),
        Some(NodeKind::AssignStmt | NodeKind::ValueSpec) => (ConversionContext::Assignment, None),
        Some(NodeKind::ExprStmt) => (ConversionContext::Explicit, None),
        Some(NodeKind::CompositeLit) => (ConversionContext::CompositeLiteralElement, None),
        Some(NodeKind::SendStmt) => (ConversionContext::ChanSend, None),
        Some(NodeKind::FuncDecl) => (ConversionContext::FuncRet, None),
        _ => (ConversionContext::Unspecified, None),
    }
}

fn shallow_copy(ctx: &RuleCtx) -> Option<(TypeName, Use)> {
    if ctx.node.lvalue {
        return None;
    }
    // pointer and interface-typed expressions copy a reference, not the value
    if !matches!(
        ctx.node.ty.as_ref(),
        Some(TypeRef::Named { message: true, .. })
    ) {
        return None;
    }
    let kind = match ctx.parent.map(|p| p.kind)? {
        NodeKind::AssignStmt | NodeKind::ValueSpec => ShallowCopyType::Assign,
        NodeKind::CallExpr => ShallowCopyType::CallArgument,
        NodeKind::ReturnStmt => ShallowCopyType::FuncRet,
        NodeKind::CompositeLit => ShallowCopyType::CompositeLiteralElement,
        NodeKind::SendStmt => ShallowCopyType::ChanSend,
        _ => return None,
    };
    let target = ctx.resolver.resolve(ctx.node)?;
    Some((target, Use::ShallowCopy(ShallowCopy { kind })))
}

fn reflect_call(ctx: &RuleCtx) -> Option<(TypeName, Use)> {
    if ctx.node.kind != NodeKind::CallExpr {
        return None;
    }
    let NodeDetail::Call {
        callee: Some(callee),
    } = &ctx.node.detail
    else {
        return None;
    };
    if !ctx.config.is_reflection_package(&callee.package) {
        return None;
    }
    let target = callee
        .receiver
        .as_ref()
        .and_then(|receiver| ctx.resolver.resolve_ref(receiver))
        .or_else(|| subtree_message(ctx.file, ctx.node, ctx.resolver))?;
    let reflect = ctx.tracer.trace(ctx.file, ctx.node, callee);
    Some((target, Use::ReflectCall(reflect)))
}

/// First generated type reachable in the call expression's subtree; covers
/// arguments and receivers derived from them transitively
fn subtree_message(file: &SourceFile, node: &Node, resolver: &TypeResolver) -> Option<TypeName> {
    file.descendants(node.id)
        .into_iter()
        .find_map(|descendant| resolver.resolve(descendant))
}

fn build_dependency(ctx: &RuleCtx) -> Option<(TypeName, Use)> {
    if ctx.node.kind != NodeKind::ImportSpec {
        return None;
    }
    let NodeDetail::Import {
        module,
        generated: true,
    } = &ctx.node.detail
    else {
        return None;
    };
    Some((
        TypeName {
            short_name: package_base(module).to_string(),
            long_name: module.clone(),
        },
        Use::BuildDependency,
    ))
}
