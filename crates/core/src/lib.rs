//! Core types for the protoscan migration-analysis engine
//!
//! This crate provides the foundational abstractions shared by the protoscan
//! workspace:
//!
//! - **Entries**: the wire-stable observation records the engine emits
//! - **Program model**: the type-checked program representation consumed
//!   from the external front end
//! - **Configuration**: system configuration management
//! - **Error handling**: unified error types
//! - **Identity**: stable source-location keys for cross-level correlation
//!

pub mod config;
pub mod entry;
pub mod error;
pub mod identity;
pub mod program;

// Re-export main types for convenience
pub use config::{AnalysisConfig, Config, OutputConfig};
pub use entry::{
    Entry, EntryBuilder, Expression, Frame, Location, Position, ReflectCall, RewriteLevel, Source,
    Status, StatusType, TypeName, Use, UseType,
};
pub use error::{Error, Result, ResultExt};
pub use identity::location_key;
pub use program::{
    CallEdge, Callee, Function, Node, NodeDetail, NodeKind, Snapshot, SourceFile, TypeRef,
};

/// Version of the core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::entry::{Entry, RewriteLevel, Use};
    pub use crate::error::{Result, ResultExt};
}
