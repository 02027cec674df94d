//! Read-only call-graph index for one snapshot.
//!
//! Built once per rewrite-level pass from the call-graph provider's edges
//! and queried by the reflective-call tracer for callee→caller traversal.
//! The index is immutable after construction and safe to share across
//! concurrent classification tasks.

use protoscan_core::program::{Function, Snapshot};
use std::collections::HashMap;
use tracing::debug;

/// One inbound call site of a function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    /// Key of the calling function
    pub caller: String,
    pub file: String,
    pub line: u32,
}

/// Precomputed callee→callers mapping plus the snapshot's function table
pub struct CallGraphIndex {
    callers: HashMap<String, Vec<CallSite>>,
    functions: HashMap<String, Function>,
}

impl CallGraphIndex {
    /// Builds the index for one snapshot. Caller lists are sorted so the
    /// backward walk is deterministic.
    pub fn build(snapshot: &Snapshot) -> Self {
        let mut callers: HashMap<String, Vec<CallSite>> = HashMap::new();
        for edge in &snapshot.call_edges {
            callers.entry(edge.callee.clone()).or_default().push(CallSite {
                caller: edge.caller.clone(),
                file: edge.file.clone(),
                line: edge.line,
            });
        }
        for sites in callers.values_mut() {
            sites.sort_by(|a, b| {
                (&a.caller, &a.file, a.line).cmp(&(&b.caller, &b.file, b.line))
            });
        }

        let functions = snapshot
            .functions
            .iter()
            .map(|f| (f.key.clone(), f.clone()))
            .collect();

        debug!(
            edges = snapshot.call_edges.len(),
            functions = snapshot.functions.len(),
            "built call-graph index"
        );
        Self { callers, functions }
    }

    /// Call sites that invoke `callee`, in deterministic order
    pub fn callers_of(&self, callee: &str) -> &[CallSite] {
        self.callers.get(callee).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Function table lookup by key
    pub fn function(&self, key: &str) -> Option<&Function> {
        self.functions.get(key)
    }
}

/// Splits a function key into its package path and function name.
///
/// Keys look like `corp/billing.Post`, `reflect.ValueOf` or
/// `corp/billing.(*Invoice).Validate`: the package ends at the first dot
/// after the last slash.
pub(crate) fn split_function_key(key: &str) -> (&str, &str) {
    let tail_start = key.rfind('/').map(|i| i + 1).unwrap_or(0);
    match key[tail_start..].find('.') {
        Some(dot) => (&key[..tail_start + dot], &key[tail_start + dot + 1..]),
        None => ("", key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{edge, func, snapshot_with_graph};
    use pretty_assertions::assert_eq;

    #[test]
    fn callers_are_indexed_and_sorted() {
        let snap = snapshot_with_graph(
            Vec::new(),
            vec![func("corp/billing.Post", "billing/invoice.go", 3)],
            vec![
                edge("corp/web.Handle", "corp/billing.Post", "web/handler.go", 22),
                edge("corp/api.Serve", "corp/billing.Post", "api/serve.go", 90),
            ],
        );
        let index = CallGraphIndex::build(&snap);
        let sites = index.callers_of("corp/billing.Post");
        assert_eq!(sites.len(), 2);
        // sorted by caller key, not insertion order
        assert_eq!(sites[0].caller, "corp/api.Serve");
        assert_eq!(sites[1].caller, "corp/web.Handle");
        assert!(index.callers_of("corp/billing.Refund").is_empty());
        assert!(index.function("corp/billing.Post").is_some());
    }

    #[test]
    fn function_keys_split_into_package_and_name() {
        assert_eq!(
            split_function_key("corp/billing.Post"),
            ("corp/billing", "Post")
        );
        assert_eq!(split_function_key("reflect.ValueOf"), ("reflect", "ValueOf"));
        assert_eq!(
            split_function_key("corp/billing.(*Invoice).Validate"),
            ("corp/billing", "(*Invoice).Validate")
        );
        assert_eq!(split_function_key("main"), ("", "main"));
    }
}
