//! Reflective-call stack reconstruction.
//!
//! Walks the call-graph index backward from a reflection entry point to
//! assemble an ordered frame stack: index 0 is the reflection-library frame
//! itself and increasing indices move toward the ultimate caller. The walk
//! is a bounded traversal with an explicit visited set, so recursive and
//! cyclic call graphs terminate; exceeding the depth bound truncates the
//! stack and still yields a non-empty frame list.

use crate::callgraph::{split_function_key, CallGraphIndex};
use protoscan_core::config::AnalysisConfig;
use protoscan_core::entry::{Frame, ReflectCall};
use protoscan_core::program::{Callee, Node, SourceFile};
use std::collections::HashSet;
use tracing::trace;

/// Per-snapshot tracer; reads the index only, safe to invoke concurrently
pub struct ReflectTracer<'a> {
    index: &'a CallGraphIndex,
    config: &'a AnalysisConfig,
}

impl<'a> ReflectTracer<'a> {
    pub fn new(index: &'a CallGraphIndex, config: &'a AnalysisConfig) -> Self {
        Self { index, config }
    }

    /// Reconstructs the stack for a call into the reflection library.
    ///
    /// `fn` is the nearest frame outside the reflection library; `caller`
    /// is the nearest ancestor outside `fn`'s own package. Either may be
    /// absent when the call graph does not extend that far.
    pub fn trace(&self, file: &SourceFile, node: &Node, callee: &Callee) -> ReflectCall {
        let mut frames = Vec::new();

        // Frame 0: the reflection-library function being entered.
        let callee_key = if callee.package.is_empty() {
            callee.name.clone()
        } else {
            format!("{}.{}", callee.package, callee.name)
        };
        frames.push(match self.index.function(&callee_key) {
            Some(f) => raw_frame(&f.name, &f.package, f.exported, &f.file, f.line),
            None => raw_frame(
                &callee.name,
                &callee.package,
                is_exported_name(&callee.name),
                "",
                0,
            ),
        });

        // Walk callee→caller edges outward from the enclosing function. The
        // walk stops once it has left the reflection library and crossed the
        // first non-library frame's package boundary, or when the graph is
        // exhausted, revisited, or the depth bound is hit. Branches take the
        // first caller in index order.
        let mut visited: HashSet<String> = HashSet::new();
        let mut current = node
            .enclosing_fn
            .clone()
            .map(|key| (key, file.path.clone(), node.start.line));
        let mut fn_package: Option<String> = None;

        while let Some((key, site_file, site_line)) = current.take() {
            if frames.len() >= self.config.max_trace_depth {
                trace!(key, "trace depth bound reached, truncating stack");
                break;
            }
            if !visited.insert(key.clone()) {
                break;
            }

            let frame = match self.index.function(&key) {
                Some(f) => raw_frame(&f.name, &f.package, f.exported, &site_file, site_line),
                None => {
                    let (package, name) = split_function_key(&key);
                    raw_frame(name, package, is_exported_name(name), &site_file, site_line)
                }
            };
            let package = frame.package.clone();
            frames.push(frame);

            if !self.config.is_reflection_package(&package) {
                match &fn_package {
                    None => fn_package = Some(package),
                    Some(p) if *p != package => break,
                    Some(_) => {}
                }
            }

            current = self
                .index
                .callers_of(&key)
                .first()
                .map(|site| (site.caller.clone(), site.file.clone(), site.line));
        }

        for i in 0..frames.len() {
            frames[i].index = i as u32;
            frames[i].pkg_index = if i > 0 && frames[i].package == frames[i - 1].package {
                frames[i - 1].pkg_index + 1
            } else {
                0
            };
        }

        let func = frames
            .iter()
            .find(|f| !self.config.is_reflection_package(&f.package))
            .cloned();
        let caller = func.as_ref().and_then(|f| {
            frames
                .iter()
                .skip(f.index as usize + 1)
                .find(|c| c.package != f.package)
                .cloned()
        });

        ReflectCall {
            frames,
            func,
            caller,
        }
    }
}

fn raw_frame(function: &str, package: &str, is_exported: bool, file: &str, line: u32) -> Frame {
    Frame {
        function: function.to_string(),
        is_exported,
        package: package.to_string(),
        file: file.to_string(),
        line,
        index: 0,
        pkg_index: 0,
    }
}

/// Exportedness by naming convention: uppercase initial on the final name
/// segment
fn is_exported_name(name: &str) -> bool {
    name.rsplit('.')
        .next()
        .and_then(|tail| tail.chars().find(|c| c.is_alphabetic()))
        .is_some_and(|c| c.is_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{edge, file, func, node_of, snapshot_with_graph};
    use pretty_assertions::assert_eq;
    use protoscan_core::program::NodeKind;

    fn reflect_callee() -> Callee {
        Callee {
            package: "reflect".to_string(),
            name: "ValueOf".to_string(),
            signature: "func(any) reflect.Value".to_string(),
            receiver: None,
            ret: None,
        }
    }

    fn call_node(enclosing: &str) -> protoscan_core::program::Node {
        let mut node = node_of(0, NodeKind::CallExpr, None);
        node.enclosing_fn = Some(enclosing.to_string());
        node
    }

    #[test]
    fn reconstructs_fn_and_caller_across_packages() {
        let snap = snapshot_with_graph(
            Vec::new(),
            vec![
                func("corp/billing.Post", "billing/invoice.go", 3),
                func("corp/api.Serve", "api/serve.go", 80),
            ],
            vec![edge("corp/api.Serve", "corp/billing.Post", "api/serve.go", 90)],
        );
        let index = CallGraphIndex::build(&snap);
        let config = AnalysisConfig::default();
        let tracer = ReflectTracer::new(&index, &config);

        let source = file("billing/invoice.go", "corp/billing", Vec::new());
        let node = call_node("corp/billing.Post");
        let reflect = tracer.trace(&source, &node, &reflect_callee());

        assert_eq!(reflect.frames.len(), 3);
        assert_eq!(reflect.frames[0].package, "reflect");
        assert_eq!(reflect.frames[1].function, "Post");
        assert_eq!(reflect.frames[2].function, "Serve");
        // frame 1 records where the library was entered
        assert_eq!(reflect.frames[1].file, "billing/invoice.go");
        // frame 2 records where Post was called
        assert_eq!(reflect.frames[2].line, 90);

        let func_frame = reflect.func.unwrap();
        assert_eq!(func_frame.package, "corp/billing");
        let caller_frame = reflect.caller.unwrap();
        assert_eq!(caller_frame.package, "corp/api");
    }

    #[test]
    fn frame_indexes_are_dense_and_pkg_index_resets() {
        let snap = snapshot_with_graph(
            Vec::new(),
            vec![
                func("reflect.wrapValue", "value.go", 10),
                func("corp/billing.Post", "billing/invoice.go", 3),
            ],
            vec![edge(
                "corp/billing.Post",
                "reflect.wrapValue",
                "billing/invoice.go",
                7,
            )],
        );
        let index = CallGraphIndex::build(&snap);
        let config = AnalysisConfig::default();
        let tracer = ReflectTracer::new(&index, &config);

        let source = file("value.go", "reflect", Vec::new());
        let node = call_node("reflect.wrapValue");
        let reflect = tracer.trace(&source, &node, &reflect_callee());

        let indexes: Vec<u32> = reflect.frames.iter().map(|f| f.index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
        // two consecutive reflect frames, then a package change
        let pkg_indexes: Vec<u32> = reflect.frames.iter().map(|f| f.pkg_index).collect();
        assert_eq!(pkg_indexes, vec![0, 1, 0]);

        assert_eq!(reflect.func.unwrap().package, "corp/billing");
        assert!(reflect.caller.is_none());
    }

    #[test]
    fn depth_bound_truncates_but_returns_frames() {
        let functions = (0..10)
            .map(|i| func(&format!("corp/chain.F{i}"), "chain.go", i + 1))
            .collect();
        let edges = (0..9)
            .map(|i| {
                edge(
                    &format!("corp/chain.F{}", i + 1),
                    &format!("corp/chain.F{i}"),
                    "chain.go",
                    i + 1,
                )
            })
            .collect();
        let snap = snapshot_with_graph(Vec::new(), functions, edges);
        let index = CallGraphIndex::build(&snap);
        let config = AnalysisConfig {
            max_trace_depth: 4,
            ..AnalysisConfig::default()
        };
        let tracer = ReflectTracer::new(&index, &config);

        let source = file("chain.go", "corp/chain", Vec::new());
        let node = call_node("corp/chain.F0");
        let reflect = tracer.trace(&source, &node, &reflect_callee());
        assert_eq!(reflect.frames.len(), 4);
    }

    #[test]
    fn cyclic_call_graphs_terminate() {
        let snap = snapshot_with_graph(
            Vec::new(),
            vec![
                func("corp/a.Ping", "a.go", 1),
                func("corp/a.Pong", "a.go", 9),
            ],
            vec![
                edge("corp/a.Pong", "corp/a.Ping", "a.go", 12),
                edge("corp/a.Ping", "corp/a.Pong", "a.go", 4),
            ],
        );
        let index = CallGraphIndex::build(&snap);
        let config = AnalysisConfig::default();
        let tracer = ReflectTracer::new(&index, &config);

        let source = file("a.go", "corp/a", Vec::new());
        let node = call_node("corp/a.Ping");
        let reflect = tracer.trace(&source, &node, &reflect_callee());
        // ValueOf, Ping, Pong, then the cycle is cut
        assert_eq!(reflect.frames.len(), 3);
    }

    #[test]
    fn entry_point_call_site_has_library_frame_only() {
        let snap = snapshot_with_graph(Vec::new(), Vec::new(), Vec::new());
        let index = CallGraphIndex::build(&snap);
        let config = AnalysisConfig::default();
        let tracer = ReflectTracer::new(&index, &config);

        let source = file("main.go", "corp/main", Vec::new());
        let node = node_of(0, NodeKind::CallExpr, None);
        let reflect = tracer.trace(&source, &node, &reflect_callee());
        assert_eq!(reflect.frames.len(), 1);
        assert!(reflect.func.is_none());
        assert!(reflect.caller.is_none());
    }
}
