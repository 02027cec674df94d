//! Generated-type resolution.
//!
//! Maps a node's resolved static type to the two renderings of its identity:
//! a short name unambiguous within the compilation unit and a globally
//! unique long name. Non-generated types resolve to nothing.

use protoscan_core::entry::TypeName;
use protoscan_core::program::{package_base, Node, Snapshot, TypeRef};
use std::collections::{BTreeSet, HashMap};

/// Per-snapshot type resolver.
///
/// Scoped to one snapshot and passed explicitly into every classification
/// call; the four rewrite-level passes each build their own.
pub struct TypeResolver {
    /// Import path → unambiguous short package alias
    aliases: HashMap<String, String>,
}

impl TypeResolver {
    /// Builds the resolver for one snapshot, assigning deterministic short
    /// aliases to every package a named type is drawn from
    pub fn new(snapshot: &Snapshot) -> Self {
        let mut packages: BTreeSet<&str> = BTreeSet::new();
        for file in &snapshot.files {
            packages.insert(file.package.as_str());
            for node in &file.nodes {
                if let Some(ty) = &node.ty {
                    ty.collect_packages(&mut packages);
                }
                for ty in node.detail.type_refs() {
                    ty.collect_packages(&mut packages);
                }
            }
        }
        for function in &snapshot.functions {
            packages.insert(function.package.as_str());
        }

        let mut aliases = HashMap::new();
        let mut taken: BTreeSet<String> = BTreeSet::new();
        for package in packages {
            let base = package_base(package);
            let mut alias = base.to_string();
            let mut n = 2usize;
            while taken.contains(&alias) {
                alias = format!("{base}{n}");
                n += 1;
            }
            taken.insert(alias.clone());
            aliases.insert(package.to_string(), alias);
        }

        Self { aliases }
    }

    /// Resolves a node's static type, if it is a generated type (including
    /// through pointer and interface/generic indirection)
    pub fn resolve(&self, node: &Node) -> Option<TypeName> {
        node.ty.as_ref().and_then(|ty| self.resolve_ref(ty))
    }

    /// Resolves a type reference, if its underlying type is generated
    pub fn resolve_ref(&self, ty: &TypeRef) -> Option<TypeName> {
        match ty.unwrap_indirection() {
            TypeRef::Named {
                package,
                name,
                message: true,
            } => Some(self.type_name(package, name)),
            _ => None,
        }
    }

    /// Renders a named type's identity without requiring the generated
    /// marker (used for builder types and dependency modules)
    pub fn type_name(&self, package: &str, name: &str) -> TypeName {
        TypeName {
            short_name: format!("{}.{name}", self.package_alias(package)),
            long_name: format!("{package}.{name}"),
        }
    }

    fn package_alias<'a>(&'a self, package: &'a str) -> &'a str {
        self.aliases
            .get(package)
            .map(String::as_str)
            .unwrap_or_else(|| package_base(package))
    }
}
