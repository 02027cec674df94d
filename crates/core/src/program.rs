//! Type-checked program representation consumed from the external front end.
//!
//! The engine never parses source text or runs type inference; it consumes a
//! snapshot exported by the front end, one per rewrite level. A snapshot is a
//! flat node arena per file plus the function table and callee→caller edges
//! the call-graph provider derived for that level.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::entry::Position;

/// Syntactic node kinds, as reported by the front end
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Ident,
    SelectorExpr,
    StarExpr,
    UnaryExpr,
    CallExpr,
    CompositeLit,
    TypeAssertExpr,
    TypeSwitchCase,
    TypeSpec,
    EmbeddedField,
    AssignStmt,
    ReturnStmt,
    SendStmt,
    ExprStmt,
    ValueSpec,
    ImportSpec,
    FuncDecl,
    Other,
}

/// Last segment of a package import path
pub fn package_base(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// A resolved static type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeRef {
    /// A named type. `message` marks the generated data-interchange
    /// convention (the marker capability).
    Named {
        package: String,
        name: String,
        #[serde(default)]
        message: bool,
    },
    /// Pointer indirection
    Pointer { inner: Box<TypeRef> },
    /// A value boxed in an interface or generic container
    Boxed { iface: String, inner: Box<TypeRef> },
    /// A builtin type
    Builtin { name: String },
}

impl TypeRef {
    pub fn named(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Named {
            package: package.into(),
            name: name.into(),
            message: false,
        }
    }

    pub fn message(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Named {
            package: package.into(),
            name: name.into(),
            message: true,
        }
    }

    pub fn pointer(inner: TypeRef) -> Self {
        Self::Pointer {
            inner: Box::new(inner),
        }
    }

    pub fn boxed(iface: impl Into<String>, inner: TypeRef) -> Self {
        Self::Boxed {
            iface: iface.into(),
            inner: Box::new(inner),
        }
    }

    pub fn builtin(name: impl Into<String>) -> Self {
        Self::Builtin { name: name.into() }
    }

    /// Strips pointer and boxing indirection down to the underlying type
    pub fn unwrap_indirection(&self) -> &TypeRef {
        match self {
            Self::Pointer { inner } | Self::Boxed { inner, .. } => inner.unwrap_indirection(),
            other => other,
        }
    }

    /// True when the underlying type carries the generated-type marker
    pub fn is_message(&self) -> bool {
        matches!(
            self.unwrap_indirection(),
            Self::Named { message: true, .. }
        )
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Self::Pointer { .. })
    }

    /// Short, human-readable rendering used in entry payload strings
    pub fn render(&self) -> String {
        match self {
            Self::Named { package, name, .. } => {
                format!("{}.{name}", package_base(package))
            }
            Self::Pointer { inner } => format!("*{}", inner.render()),
            Self::Boxed { iface, .. } => iface.clone(),
            Self::Builtin { name } => name.clone(),
        }
    }

    /// Collects the packages of all named types reachable through this type
    pub fn collect_packages<'a>(&'a self, out: &mut std::collections::BTreeSet<&'a str>) {
        match self {
            Self::Named { package, .. } => {
                out.insert(package.as_str());
            }
            Self::Pointer { inner } | Self::Boxed { inner, .. } => inner.collect_packages(out),
            Self::Builtin { .. } => {}
        }
    }
}

/// A statically resolved call target
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Callee {
    pub package: String,
    pub name: String,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub receiver: Option<TypeRef>,
    #[serde(default)]
    pub ret: Option<TypeRef>,
}

/// Checker-resolved facts attached to a node, one per syntactic family
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeDetail {
    #[default]
    None,
    /// Field or method selection
    Selector {
        field: String,
        exported: bool,
        #[serde(default)]
        is_method: bool,
        #[serde(default)]
        declared_on: Option<TypeRef>,
    },
    /// Function or method call; `callee` is absent for indirect calls
    Call {
        #[serde(default)]
        callee: Option<Callee>,
    },
    /// Checker-identified explicit conversion
    Convert { dest: TypeRef, src: TypeRef },
    /// Composite literal with its element count
    CompositeLit {
        #[serde(default)]
        elems: u32,
    },
    /// Type assertion or type-switch case
    TypeAssert { asserted: TypeRef, src: TypeRef },
    /// Type declaration
    TypeDecl { name: String, underlying: TypeRef },
    /// Anonymous struct member at the given ordinal
    Embedded { index: u32 },
    /// Build/dependency declaration
    Import {
        module: String,
        #[serde(default)]
        generated: bool,
    },
}

impl NodeDetail {
    /// All type references carried by this detail
    pub fn type_refs(&self) -> Vec<&TypeRef> {
        match self {
            Self::None | Self::CompositeLit { .. } | Self::Embedded { .. } | Self::Import { .. } => {
                Vec::new()
            }
            Self::Selector { declared_on, .. } => declared_on.iter().collect(),
            Self::Call { callee } => callee
                .iter()
                .flat_map(|c| c.receiver.iter().chain(c.ret.iter()))
                .collect(),
            Self::Convert { dest, src } | Self::TypeAssert { asserted: dest, src } => {
                vec![dest, src]
            }
            Self::TypeDecl { underlying, .. } => vec![underlying],
        }
    }
}

/// One node of a type-checked syntax tree, stored in a flat per-file arena
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: u32,
    #[serde(default)]
    pub parent: Option<u32>,
    pub kind: NodeKind,
    #[serde(default)]
    pub start: Position,
    #[serde(default)]
    pub end: Position,
    /// Resolved static type of the expression, when it has one
    #[serde(default)]
    pub ty: Option<TypeRef>,
    #[serde(default)]
    pub detail: NodeDetail,
    /// Key into the snapshot's function table for the enclosing function
    #[serde(default)]
    pub enclosing_fn: Option<String>,
    /// True when the node is a write target
    #[serde(default)]
    pub lvalue: bool,
}

/// One type-checked source file of a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: String,
    /// Import path of the containing package; always non-empty
    pub package: String,
    #[serde(default)]
    pub generated: bool,
    /// Set when the front end failed to load or type-check this file
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl SourceFile {
    pub fn node(&self, id: u32) -> Option<&Node> {
        self.nodes.get(id as usize)
    }

    pub fn parent_of(&self, node: &Node) -> Option<&Node> {
        node.parent.and_then(|id| self.node(id))
    }

    /// Direct children of a node, in arena order
    pub fn children_of(&self, id: u32) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.parent == Some(id))
    }

    /// All transitive descendants of a node, in arena order
    pub fn descendants(&self, id: u32) -> Vec<&Node> {
        let mut out = Vec::new();
        let mut frontier = vec![id];
        while let Some(current) = frontier.pop() {
            for child in self.children_of(current) {
                frontier.push(child.id);
                out.push(child);
            }
        }
        out
    }
}

/// A function or method of a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    /// Stable key, e.g. `corp/billing.Post` or `reflect.ValueOf`
    pub key: String,
    pub name: String,
    pub package: String,
    #[serde(default)]
    pub exported: bool,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub line: u32,
}

/// One call site: `caller` invokes `callee` at `file:line`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallEdge {
    pub caller: String,
    pub callee: String,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub line: u32,
}

/// The type-checked program representation of one rewrite-level snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Provenance of this snapshot (module path or export file)
    pub module: String,
    #[serde(default)]
    pub files: Vec<SourceFile>,
    #[serde(default)]
    pub functions: Vec<Function>,
    #[serde(default)]
    pub call_edges: Vec<CallEdge>,
}
