//! Shared builders for unit tests.

use protoscan_core::entry::Position;
use protoscan_core::program::{
    CallEdge, Function, Node, NodeDetail, NodeKind, Snapshot, SourceFile, TypeRef,
};

use crate::callgraph::split_function_key;

/// The message type most tests classify against
pub(crate) fn msg() -> TypeRef {
    TypeRef::message("corp/billing/pb", "Invoice")
}

pub(crate) fn node_of(id: u32, kind: NodeKind, ty: Option<TypeRef>) -> Node {
    Node {
        id,
        parent: None,
        kind,
        start: Position::new(id + 1, 1),
        end: Position::new(id + 1, 20),
        ty,
        detail: NodeDetail::None,
        enclosing_fn: None,
        lvalue: false,
    }
}

pub(crate) fn file(path: &str, package: &str, nodes: Vec<Node>) -> SourceFile {
    SourceFile {
        path: path.to_string(),
        package: package.to_string(),
        generated: false,
        error: None,
        nodes,
    }
}

pub(crate) fn func(key: &str, file: &str, line: u32) -> Function {
    let (package, name) = split_function_key(key);
    let exported = name
        .rsplit('.')
        .next()
        .and_then(|tail| tail.chars().find(|c| c.is_alphabetic()))
        .is_some_and(|c| c.is_uppercase());
    Function {
        key: key.to_string(),
        name: name.to_string(),
        package: package.to_string(),
        exported,
        file: file.to_string(),
        line,
    }
}

pub(crate) fn edge(caller: &str, callee: &str, file: &str, line: u32) -> CallEdge {
    CallEdge {
        caller: caller.to_string(),
        callee: callee.to_string(),
        file: file.to_string(),
        line,
    }
}

pub(crate) fn snapshot(files: Vec<SourceFile>) -> Snapshot {
    snapshot_with_graph(files, Vec::new(), Vec::new())
}

pub(crate) fn snapshot_with_graph(
    files: Vec<SourceFile>,
    functions: Vec<Function>,
    call_edges: Vec<CallEdge>,
) -> Snapshot {
    Snapshot {
        module: "corp/billing@test".to_string(),
        files,
        functions,
        call_edges,
    }
}
