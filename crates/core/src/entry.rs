//! Wire-stable observation records emitted by the analysis engine.
//!
//! Enum discriminants are the wire tag numbers and must not be reordered.
//! `RewriteLevel` ordinal order is migration-progress order.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::{Error, Result};
use crate::identity::location_key;

/// Rewrite level of the snapshot an entry was observed in.
///
/// `None` is the unmodified baseline; `Green`/`Yellow`/`Red` are successive,
/// strictly more aggressive automated rewrites of the same logical source.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RewriteLevel {
    #[default]
    Unspecified = 0,
    None = 1,
    Green = 2,
    Yellow = 3,
    Red = 4,
}

impl RewriteLevel {
    /// Wire tag of this level
    pub fn tag(self) -> u32 {
        self as u32
    }

    /// The four analyzable levels, in migration-progress order
    pub fn all() -> [RewriteLevel; 4] {
        [Self::None, Self::Green, Self::Yellow, Self::Red]
    }
}

/// Outcome class of an entry
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusType {
    #[default]
    Unspecified = 0,
    Ok = 1,
    Skip = 2,
    Fail = 3,
}

impl StatusType {
    pub fn tag(self) -> u32 {
        self as u32
    }
}

/// Status of a failed or skipped observation. `error` is empty iff `type`
/// is OK or UNSPECIFIED.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    #[serde(rename = "type")]
    pub kind: StatusType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}

impl Status {
    pub fn skip(reason: impl Into<String>) -> Self {
        Self {
            kind: StatusType::Skip,
            error: reason.into(),
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            kind: StatusType::Fail,
            error: error.into(),
        }
    }
}

/// A position in a source file, zero-based and non-negative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Source location of an observation. `package` is always non-empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub package: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file: String,
    #[serde(default)]
    pub is_generated_file: bool,
    #[serde(default)]
    pub start: Position,
    #[serde(default)]
    pub end: Position,
}

impl Location {
    /// Location carrying only the package, for failure entries
    pub fn package_only(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            ..Self::default()
        }
    }

    /// Stable identity of this location across rewrite-level snapshots
    pub fn identity(&self) -> String {
        location_key(&self.file, self.start.line, self.start.column)
    }
}

/// Two renderings of one resolved type identity; never independently
/// meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeName {
    pub short_name: String,
    pub long_name: String,
}

/// Syntactic-node kind descriptors used as classification evidence
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Expression {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "parent_type", default, skip_serializing_if = "String::is_empty")]
    pub parent_kind: String,
}

/// Direct or internal field access payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldAccess {
    pub field_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub field_type: String,
}

/// Method call subtype
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MethodCallType {
    #[default]
    Invalid = 0,
    GetOneof = 1,
    GetBuild = 2,
}

/// Call to a method on the generated type's surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(rename = "type")]
    pub kind: MethodCallType,
}

/// Constructor subtype
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ConstructorType {
    #[default]
    Unspecified = 0,
    EmptyLiteral = 1,
    NonemptyLiteral = 2,
    Builder = 3,
}

/// Construction of a generated-type value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constructor {
    #[serde(rename = "type")]
    pub kind: ConstructorType,
}

/// Syntactic role of a conversion
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversionContext {
    #[default]
    Unspecified = 0,
    CallArgument = 1,
    ReturnValue = 2,
    Assignment = 3,
    Explicit = 4,
    CompositeLiteralElement = 5,
    ChanSend = 6,
    FuncRet = 7,
}

/// The function a converted value is passed to. Empty strings mean the
/// callee could not be statically determined (indirect call through a
/// variable).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FuncArg {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub function_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub package_path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub signature: String,
}

/// Conversion of a generated-type value to/from another type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversion {
    pub dest_type_name: String,
    pub context: ConversionContext,
    /// Set iff `context` is CALL_ARGUMENT
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub func_arg: Option<FuncArg>,
}

/// Type assertion payload; carries the asserted-from type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeAssertion {
    pub src_type: String,
}

/// Declaration of a new type whose underlying type is generated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDefinition {
    pub new_type: String,
}

/// Anonymous embedding of a generated type in a struct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embedding {
    /// 0-based position of the embedded member
    pub field_index: u32,
}

/// Shallow copy subtype; mirrors the conversion context taxonomy minus
/// EXPLICIT
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ShallowCopyType {
    #[default]
    Unspecified = 0,
    Assign = 1,
    CallArgument = 2,
    FuncRet = 3,
    CompositeLiteralElement = 4,
    ChanSend = 5,
}

/// Whole-value copy of a generated-type value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShallowCopy {
    #[serde(rename = "type")]
    pub kind: ShallowCopyType,
}

/// One reconstructed call-stack frame.
///
/// `index` is a dense 0-based sequence over the owning frame list;
/// `pkg_index` resets to 0 whenever `package` changes relative to the
/// previous frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub function: String,
    #[serde(default)]
    pub is_exported: bool,
    pub package: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub pkg_index: u32,
}

/// Reflective access to a generated type, with the reconstructed stack.
///
/// `frames` is never empty and index 0 is the reflection-library frame
/// itself; increasing indices move toward the ultimate caller. `fn` is the
/// last non-library frame before entering the library; `caller` is the last
/// frame belonging to a different package than `fn`'s. Both are absent when
/// the call graph does not extend that far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReflectCall {
    pub frames: Vec<Frame>,
    #[serde(rename = "fn", default, skip_serializing_if = "Option::is_none")]
    pub func: Option<Frame>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller: Option<Frame>,
}

/// Discriminant of the Use oneof
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum UseType {
    #[default]
    Unspecified = 0,
    DirectFieldAccess = 1,
    MethodCall = 2,
    Constructor = 3,
    Conversion = 4,
    TypeAssertion = 5,
    TypeDefinition = 6,
    Embedding = 7,
    InternalFieldAccess = 8,
    ReflectCall = 9,
    ShallowCopy = 10,
    BuildDependency = 11,
}

impl UseType {
    pub fn tag(self) -> u32 {
        self as u32
    }
}

/// How a generated type was used: a sealed tagged union with exactly one
/// payload, matching its discriminant. Consumers must match exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "UseRepr", try_from = "UseRepr")]
pub enum Use {
    DirectFieldAccess(FieldAccess),
    MethodCall(MethodCall),
    Constructor(Constructor),
    Conversion(Conversion),
    TypeAssertion(TypeAssertion),
    TypeDefinition(TypeDefinition),
    Embedding(Embedding),
    InternalFieldAccess(FieldAccess),
    ReflectCall(ReflectCall),
    ShallowCopy(ShallowCopy),
    BuildDependency,
}

impl Use {
    /// The oneof discriminant
    pub fn use_type(&self) -> UseType {
        match self {
            Self::DirectFieldAccess(_) => UseType::DirectFieldAccess,
            Self::MethodCall(_) => UseType::MethodCall,
            Self::Constructor(_) => UseType::Constructor,
            Self::Conversion(_) => UseType::Conversion,
            Self::TypeAssertion(_) => UseType::TypeAssertion,
            Self::TypeDefinition(_) => UseType::TypeDefinition,
            Self::Embedding(_) => UseType::Embedding,
            Self::InternalFieldAccess(_) => UseType::InternalFieldAccess,
            Self::ReflectCall(_) => UseType::ReflectCall,
            Self::ShallowCopy(_) => UseType::ShallowCopy,
            Self::BuildDependency => UseType::BuildDependency,
        }
    }

    /// Wire tag of the oneof case
    pub fn tag(&self) -> u32 {
        self.use_type().tag()
    }
}

/// Wire representation of [`Use`]: the discriminant plus one payload field
/// keyed by the case name. Deserialization rejects payloads that do not
/// match the discriminant, or more than one populated payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct UseRepr {
    #[serde(rename = "type")]
    kind: UseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    direct_field_access: Option<FieldAccess>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    method_call: Option<MethodCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    constructor: Option<Constructor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    conversion: Option<Conversion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    type_assertion: Option<TypeAssertion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    type_definition: Option<TypeDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    embedding: Option<Embedding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    internal_field_access: Option<FieldAccess>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reflect_call: Option<ReflectCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    shallow_copy: Option<ShallowCopy>,
}

impl UseRepr {
    fn payload_count(&self) -> usize {
        [
            self.direct_field_access.is_some(),
            self.method_call.is_some(),
            self.constructor.is_some(),
            self.conversion.is_some(),
            self.type_assertion.is_some(),
            self.type_definition.is_some(),
            self.embedding.is_some(),
            self.internal_field_access.is_some(),
            self.reflect_call.is_some(),
            self.shallow_copy.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }
}

impl From<Use> for UseRepr {
    fn from(value: Use) -> Self {
        let mut repr = UseRepr {
            kind: value.use_type(),
            ..UseRepr::default()
        };
        match value {
            Use::DirectFieldAccess(p) => repr.direct_field_access = Some(p),
            Use::MethodCall(p) => repr.method_call = Some(p),
            Use::Constructor(p) => repr.constructor = Some(p),
            Use::Conversion(p) => repr.conversion = Some(p),
            Use::TypeAssertion(p) => repr.type_assertion = Some(p),
            Use::TypeDefinition(p) => repr.type_definition = Some(p),
            Use::Embedding(p) => repr.embedding = Some(p),
            Use::InternalFieldAccess(p) => repr.internal_field_access = Some(p),
            Use::ReflectCall(p) => repr.reflect_call = Some(p),
            Use::ShallowCopy(p) => repr.shallow_copy = Some(p),
            Use::BuildDependency => {}
        }
        repr
    }
}

impl TryFrom<UseRepr> for Use {
    type Error = String;

    fn try_from(repr: UseRepr) -> std::result::Result<Self, String> {
        let expected = if repr.kind == UseType::BuildDependency {
            0
        } else {
            1
        };
        if repr.payload_count() != expected {
            return Err(format!(
                "use of type {} must carry exactly {expected} payload(s)",
                repr.kind
            ));
        }
        let kind = repr.kind;
        let mismatch = move || format!("payload does not match use type {kind}");
        match kind {
            UseType::Unspecified => Err("use type must be specified".to_string()),
            UseType::DirectFieldAccess => repr
                .direct_field_access
                .map(Use::DirectFieldAccess)
                .ok_or_else(mismatch),
            UseType::MethodCall => repr.method_call.map(Use::MethodCall).ok_or_else(mismatch),
            UseType::Constructor => repr.constructor.map(Use::Constructor).ok_or_else(mismatch),
            UseType::Conversion => repr.conversion.map(Use::Conversion).ok_or_else(mismatch),
            UseType::TypeAssertion => repr
                .type_assertion
                .map(Use::TypeAssertion)
                .ok_or_else(mismatch),
            UseType::TypeDefinition => repr
                .type_definition
                .map(Use::TypeDefinition)
                .ok_or_else(mismatch),
            UseType::Embedding => repr.embedding.map(Use::Embedding).ok_or_else(mismatch),
            UseType::InternalFieldAccess => repr
                .internal_field_access
                .map(Use::InternalFieldAccess)
                .ok_or_else(mismatch),
            UseType::ReflectCall => repr.reflect_call.map(Use::ReflectCall).ok_or_else(mismatch),
            UseType::ShallowCopy => repr.shallow_copy.map(Use::ShallowCopy).ok_or_else(mismatch),
            UseType::BuildDependency => Ok(Use::BuildDependency),
        }
    }
}

/// Provenance of the analyzer pass that produced an entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub file: String,
}

/// One observation of a generated-type use.
///
/// Invariant: `status` absent ⇔ `location`, `type`, `expr` and `use` are all
/// populated and meaningful; `status` present ⇒ only `location.package` is
/// guaranteed meaningful. Entries are immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(setter(into))]
pub struct Entry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub status: Option<Status>,

    pub location: Location,

    #[builder(default)]
    pub level: RewriteLevel,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub type_name: Option<TypeName>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub expr: Option<Expression>,

    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub usage: Option<Use>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub source: Option<Source>,
}

impl Entry {
    /// A failure entry; only `location.package` is meaningful beyond the
    /// status itself
    pub fn failure(location: Location, level: RewriteLevel, error: impl Into<String>) -> Self {
        Self {
            status: Some(Status::fail(error)),
            location,
            level,
            type_name: None,
            expr: None,
            usage: None,
            source: None,
        }
    }

    /// A skip entry for a location that is intentionally not analyzable
    pub fn skip(location: Location, level: RewriteLevel, reason: impl Into<String>) -> Self {
        Self {
            status: Some(Status::skip(reason)),
            location,
            level,
            type_name: None,
            expr: None,
            usage: None,
            source: None,
        }
    }

    /// True when the entry describes a successful classification
    pub fn is_success(&self) -> bool {
        self.status.is_none()
    }

    /// Checks the record-level invariants
    pub fn validate(&self) -> Result<()> {
        if self.location.package.is_empty() {
            return Err(Error::invalid_input("entry location.package is empty"));
        }
        match &self.status {
            None => {
                if self.type_name.is_none() || self.expr.is_none() || self.usage.is_none() {
                    return Err(Error::invalid_input(
                        "successful entry must populate type, expr and use",
                    ));
                }
            }
            Some(status) => {
                let wants_error =
                    !matches!(status.kind, StatusType::Ok | StatusType::Unspecified);
                if wants_error == status.error.is_empty() {
                    return Err(Error::invalid_input(
                        "status error must be set exactly for SKIP/FAIL",
                    ));
                }
            }
        }
        Ok(())
    }
}
