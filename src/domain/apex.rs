// Declaration records for Apex source units.
// These types represent scanned Apex code in a form suitable for static analysis.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

/// Apex access and behavior modifiers, parsed from free-form tokens.
///
/// Unrecognized tokens degrade to `Unknown` instead of failing the
/// declaration that carries them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Modifier {
    Private,
    Public,
    Global,
    Protected,
    Static,
    Virtual,
    Abstract,
    Override,
    TestMethod,
    WithSharing,
    WithoutSharing,
    InheritedSharing,
    Unknown(String),
}

impl Modifier {
    /// Parse a single modifier token. Sharing modifiers are two words and
    /// arrive pre-joined (e.g. `with sharing`).
    pub fn from_token(token: &str) -> Modifier {
        match token.to_lowercase().as_str() {
            "private" => Modifier::Private,
            "public" => Modifier::Public,
            "global" => Modifier::Global,
            "protected" => Modifier::Protected,
            "static" => Modifier::Static,
            "virtual" => Modifier::Virtual,
            "abstract" => Modifier::Abstract,
            "override" => Modifier::Override,
            "testmethod" => Modifier::TestMethod,
            "with sharing" => Modifier::WithSharing,
            "without sharing" => Modifier::WithoutSharing,
            "inherited sharing" => Modifier::InheritedSharing,
            _ => Modifier::Unknown(token.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Modifier::Private => "private",
            Modifier::Public => "public",
            Modifier::Global => "global",
            Modifier::Protected => "protected",
            Modifier::Static => "static",
            Modifier::Virtual => "virtual",
            Modifier::Abstract => "abstract",
            Modifier::Override => "override",
            Modifier::TestMethod => "testmethod",
            Modifier::WithSharing => "with sharing",
            Modifier::WithoutSharing => "without sharing",
            Modifier::InheritedSharing => "inherited sharing",
            Modifier::Unknown(token) => token,
        }
    }
}

/// An annotation and its parameters, e.g. `@InvocableMethod(label='x')`.
/// A single unnamed parameter is stored under the key `value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub name: String,
    pub parameters: BTreeMap<String, String>,
}

/// The collection shape of a parameter type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CollectionKind {
    List,
    Set,
    Map,
    Array,
}

impl CollectionKind {
    pub fn from_token(token: &str) -> Option<CollectionKind> {
        match token {
            "List" => Some(CollectionKind::List),
            "Set" => Some(CollectionKind::Set),
            "Map" => Some(CollectionKind::Map),
            _ => None,
        }
    }
}

/// One parameter of a method signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    pub name: String,
    /// The declared type. For collections this is the full inner type,
    /// e.g. `String, List<Account>` for `Map<String, List<Account>>`.
    pub type_name: String,
    pub is_collection: bool,
    pub collection_kind: Option<CollectionKind>,
}

/// The DML operation keywords Apex supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum DmlKind {
    Insert,
    Update,
    Delete,
    Upsert,
    Merge,
}

impl DmlKind {
    pub fn from_keyword(keyword: &str) -> Option<DmlKind> {
        match keyword.to_lowercase().as_str() {
            "insert" => Some(DmlKind::Insert),
            "update" => Some(DmlKind::Update),
            "delete" => Some(DmlKind::Delete),
            "upsert" => Some(DmlKind::Upsert),
            "merge" => Some(DmlKind::Merge),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DmlKind::Insert => "insert",
            DmlKind::Update => "update",
            DmlKind::Delete => "delete",
            DmlKind::Upsert => "upsert",
            DmlKind::Merge => "merge",
        }
    }
}

impl std::fmt::Display for DmlKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A data-operation statement recovered from a method body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataOperation {
    pub kind: DmlKind,
    /// The object-type name the statement targets, e.g. `Account`.
    pub object_type: String,
    /// True when the target expression carries a collection/array marker.
    pub is_bulk: bool,
    /// Absolute line in the source unit.
    pub line: usize,
}

/// An embedded SOQL query recovered from a method body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryStatement {
    pub query: String,
    /// Primary FROM target first, then any further FROM/JOIN names.
    pub referenced_objects: Vec<String>,
    pub line: usize,
}

/// A method of an Apex class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodDeclaration {
    pub name: String,
    pub return_type: String,
    pub parameters: Vec<Parameter>,
    pub modifiers: Vec<Modifier>,
    pub annotations: Vec<Annotation>,
    pub body: String,
    /// Every identifier segment observed at a call site, unresolved.
    /// `Foo.bar(x)` contributes both `Foo` and `bar`.
    pub calls: BTreeSet<String>,
    pub data_operations: Vec<DataOperation>,
    pub queries: Vec<QueryStatement>,
    pub line: usize,
    pub doc_comment: Option<String>,
}

/// A property with optional accessor bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyDeclaration {
    pub name: String,
    pub type_name: String,
    pub modifiers: Vec<Modifier>,
    pub getter: Option<String>,
    pub setter: Option<String>,
    pub line: usize,
}

/// A complete Apex class, including nested class declarations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassDeclaration {
    pub name: String,
    pub source_path: String,
    pub modifiers: Vec<Modifier>,
    pub annotations: Vec<Annotation>,
    pub methods: Vec<MethodDeclaration>,
    pub properties: Vec<PropertyDeclaration>,
    pub superclass: Option<String>,
    pub interfaces: Vec<String>,
    pub inner_classes: Vec<ClassDeclaration>,
    pub doc_comment: Option<String>,
}

/// The trigger timing contexts Apex defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum TriggerTiming {
    BeforeInsert,
    AfterInsert,
    BeforeUpdate,
    AfterUpdate,
    BeforeDelete,
    AfterDelete,
    AfterUndelete,
}

impl TriggerTiming {
    pub const ALL: [TriggerTiming; 7] = [
        TriggerTiming::BeforeInsert,
        TriggerTiming::AfterInsert,
        TriggerTiming::BeforeUpdate,
        TriggerTiming::AfterUpdate,
        TriggerTiming::BeforeDelete,
        TriggerTiming::AfterDelete,
        TriggerTiming::AfterUndelete,
    ];

    /// Parse a timing phrase such as `before insert`. Whitespace between
    /// the two words is normalized; unknown phrases are a soft miss.
    pub fn parse(phrase: &str) -> Option<TriggerTiming> {
        let normalized = phrase.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.to_lowercase().as_str() {
            "before insert" => Some(TriggerTiming::BeforeInsert),
            "after insert" => Some(TriggerTiming::AfterInsert),
            "before update" => Some(TriggerTiming::BeforeUpdate),
            "after update" => Some(TriggerTiming::AfterUpdate),
            "before delete" => Some(TriggerTiming::BeforeDelete),
            "after delete" => Some(TriggerTiming::AfterDelete),
            "after undelete" => Some(TriggerTiming::AfterUndelete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerTiming::BeforeInsert => "before insert",
            TriggerTiming::AfterInsert => "after insert",
            TriggerTiming::BeforeUpdate => "before update",
            TriggerTiming::AfterUpdate => "after update",
            TriggerTiming::BeforeDelete => "before delete",
            TriggerTiming::AfterDelete => "after delete",
            TriggerTiming::AfterUndelete => "after undelete",
        }
    }
}

impl std::fmt::Display for TriggerTiming {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A trigger declaration and its raw body text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerDeclaration {
    pub name: String,
    pub object_name: String,
    pub timings: BTreeSet<TriggerTiming>,
    pub body: String,
}

/// The (object, timing, trigger) tuple under which a trigger body runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerContext {
    pub object_name: String,
    pub timing: TriggerTiming,
    pub trigger_name: String,
}
