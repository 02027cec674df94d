//! End-to-end analyze runs over snapshot export fixtures.

use protoscan::analyze::{run_analyze, AnalyzeOptions};
use protoscan_analysis::correlate;
use protoscan_core::entry::{Entry, Position, RewriteLevel, StatusType, UseType};
use protoscan_core::program::{Callee, Node, NodeDetail, NodeKind, Snapshot, SourceFile, TypeRef};
use std::path::{Path, PathBuf};

fn invoice() -> TypeRef {
    TypeRef::message("corp/billing/pb", "Invoice")
}

fn node(id: u32, kind: NodeKind) -> Node {
    Node {
        id,
        parent: None,
        kind,
        start: Position::new(id + 1, 1),
        end: Position::new(id + 1, 20),
        ty: None,
        detail: NodeDetail::None,
        enclosing_fn: None,
        lvalue: false,
    }
}

fn source_file(path: &str, package: &str, nodes: Vec<Node>) -> SourceFile {
    SourceFile {
        path: path.to_string(),
        package: package.to_string(),
        generated: false,
        error: None,
        nodes,
    }
}

/// NONE snapshot: a direct field read plus a generated file
fn none_snapshot() -> Snapshot {
    let nodes = vec![
        node(0, NodeKind::AssignStmt),
        Node {
            parent: Some(0),
            ty: Some(TypeRef::builtin("int64")),
            detail: NodeDetail::Selector {
                field: "Amount".to_string(),
                exported: true,
                is_method: false,
                declared_on: Some(TypeRef::pointer(invoice())),
            },
            ..node(1, NodeKind::SelectorExpr)
        },
    ];
    let mut generated = source_file("billing/pb/invoice.pb.go", "corp/billing/pb", Vec::new());
    generated.generated = true;
    Snapshot {
        module: "corp/billing@none".to_string(),
        files: vec![
            source_file("billing/invoice.go", "corp/billing", nodes),
            generated,
        ],
        functions: Vec::new(),
        call_edges: Vec::new(),
    }
}

/// GREEN snapshot: the rewrite turned the field read into a getter call at
/// the identical position
fn green_snapshot() -> Snapshot {
    let nodes = vec![
        node(0, NodeKind::AssignStmt),
        Node {
            parent: Some(0),
            detail: NodeDetail::Call {
                callee: Some(Callee {
                    package: "corp/billing/pb".to_string(),
                    name: "GetAmount".to_string(),
                    signature: "func() int64".to_string(),
                    receiver: Some(TypeRef::pointer(invoice())),
                    ret: Some(TypeRef::builtin("int64")),
                }),
            },
            ..node(1, NodeKind::CallExpr)
        },
    ];
    Snapshot {
        module: "corp/billing@green".to_string(),
        files: vec![source_file("billing/invoice.go", "corp/billing", nodes)],
        functions: Vec::new(),
        call_edges: Vec::new(),
    }
}

fn write_snapshot(dir: &Path, name: &str, snapshot: &Snapshot) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string(snapshot).unwrap()).unwrap();
    path
}

fn read_entries(path: &Path) -> Vec<Entry> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn analyze_correlates_two_levels_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("entries.jsonl");
    let opts = AnalyzeOptions {
        none: Some(write_snapshot(dir.path(), "none.json", &none_snapshot())),
        green: Some(write_snapshot(dir.path(), "green.json", &green_snapshot())),
        out: Some(out.clone()),
        ..AnalyzeOptions::default()
    };

    let summary = run_analyze(opts).await.unwrap();
    assert_eq!(summary.reports().len(), 2);
    assert_eq!(summary.entries_emitted(), 3);
    assert_eq!(summary.skip_count(), 1);
    assert_eq!(summary.fail_count(), 0);
    assert_eq!(summary.distinct_sites(), 1);

    let entries = read_entries(&out);
    assert_eq!(entries.len(), 3);
    for entry in &entries {
        entry.validate().unwrap();
    }

    // the generated file became a SKIP entry
    let skip = entries
        .iter()
        .find(|e| e.status.is_some())
        .expect("skip entry");
    assert_eq!(skip.status.as_ref().unwrap().kind, StatusType::Skip);
    assert!(skip.location.is_generated_file);

    // the same call site was observed at both levels with different uses
    let successes: Vec<Entry> = entries.iter().filter(|e| e.is_success()).cloned().collect();
    let sites = correlate(&successes);
    assert_eq!(sites.len(), 1);
    let mut observed: Vec<(RewriteLevel, UseType)> = sites
        .values()
        .next()
        .unwrap()
        .iter()
        .map(|e| (e.level, e.usage.as_ref().unwrap().use_type()))
        .collect();
    observed.sort_by_key(|(level, _)| *level);
    assert_eq!(
        observed,
        vec![
            (RewriteLevel::None, UseType::DirectFieldAccess),
            (RewriteLevel::Green, UseType::MethodCall),
        ]
    );
}

#[tokio::test]
async fn analyze_requires_at_least_one_snapshot() {
    let err = run_analyze(AnalyzeOptions::default()).await.unwrap_err();
    assert!(err.to_string().contains("at least one snapshot"));
}

#[tokio::test]
async fn missing_snapshot_export_is_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("entries.jsonl");
    let opts = AnalyzeOptions {
        none: Some(dir.path().join("absent.json")),
        green: Some(write_snapshot(dir.path(), "green.json", &green_snapshot())),
        out: Some(out.clone()),
        ..AnalyzeOptions::default()
    };

    let summary = run_analyze(opts).await.unwrap();
    let none_report = &summary.reports()[0];
    assert_eq!(none_report.level(), RewriteLevel::None);
    assert!(none_report.load_error().is_some());

    // the green pass still produced its entry
    let entries = read_entries(&out);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].level, RewriteLevel::Green);
}
