//! Schema tree handed to the generator
//!
//! Built once per run from the request's descriptors and read-only
//! afterwards. Names are the ones written in the schema; Rust spellings are
//! derived at emission time.

/// Every file in the request
#[derive(Debug, Clone, Default)]
pub struct Schema {
    /// Files in request order, imports included
    pub files: Vec<SchemaFile>,
}

impl Schema {
    /// Every message across all files, in declaration order
    pub fn messages(&self) -> impl Iterator<Item = &MessageSchema> {
        self.files.iter().flat_map(|f| f.messages.iter())
    }

    /// Look up a message by full name
    pub fn message(&self, full_name: &str) -> Option<&MessageSchema> {
        self.messages().find(|m| m.full_name == full_name)
    }

    /// Whether `full_name` is a persisted message
    pub fn is_persisted(&self, full_name: &str) -> bool {
        self.message(full_name).is_some_and(|m| m.model.ormable)
    }
}

/// One schema file
#[derive(Debug, Clone, Default)]
pub struct SchemaFile {
    /// Path as given to protoc, e.g. `blog/post.proto`
    pub name: String,

    /// Protobuf package
    pub package: String,

    /// Whether protoc asked for output for this file
    pub generate: bool,

    /// Top-level messages
    pub messages: Vec<MessageSchema>,
}

/// A message type
#[derive(Debug, Clone, Default)]
pub struct MessageSchema {
    /// Name as declared
    pub name: String,

    /// Fully qualified name without a leading dot
    pub full_name: String,

    /// Package the message belongs to
    pub package: String,

    /// File declaring the message
    pub file: String,

    /// Fields in declaration order
    pub fields: Vec<FieldSchema>,

    /// `(persist.model)` options
    pub model: ModelAnnotations,
}

impl MessageSchema {
    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A message field
#[derive(Debug, Clone)]
pub struct FieldSchema {
    /// Name as declared
    pub name: String,

    /// Field number
    pub number: u32,

    /// Declared type
    pub kind: FieldKind,

    /// Singular or repeated
    pub cardinality: Cardinality,

    /// Presence semantics
    pub optionality: Optionality,

    /// Containing oneof, if it is a real (non-synthetic) one
    pub oneof: Option<String>,

    /// `(persist.field)` options
    pub annotations: ColumnAnnotations,
}

impl FieldSchema {
    /// Whether the field is repeated (maps included)
    pub fn is_repeated(&self) -> bool {
        self.cardinality == Cardinality::Repeated
    }

    /// Full name of the message type, for message fields
    pub fn message_type(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Message(name) => Some(name),
            _ => None,
        }
    }
}

/// Declared field type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Protobuf scalar
    Scalar(ScalarType),
    /// Enum, by full name
    Enum(String),
    /// Message, by full name
    Message(String),
    /// `map<key, value>`
    Map {
        /// Key type
        key: ScalarType,
        /// Value type
        value: Box<FieldKind>,
    },
    /// proto2 group
    Group,
}

/// Protobuf scalar types
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
}

/// Field cardinality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// One value
    Singular,
    /// `repeated`, or a map
    Repeated,
}

/// Presence semantics of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Optionality {
    /// proto3 `optional` or proto2 `optional`
    Optional,
    /// proto2 `required`
    Required,
    /// Nothing declared; treated as required
    Unspecified,
}

impl Optionality {
    /// Whether the storage column may be `NULL`
    pub fn is_nullable(self) -> bool {
        self == Optionality::Optional
    }
}

/// `(persist.model)` options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelAnnotations {
    /// Generate persistence bindings
    pub ormable: bool,

    /// Table name override
    pub table: Option<String>,
}

/// `(persist.field)` options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnAnnotations {
    /// Column name override
    pub column: Option<String>,

    /// Explicit primary key
    pub primary_key: bool,

    /// Exclude the field from the record
    pub drop: bool,

    /// Association declaration
    pub association: Option<AssociationDecl>,
}

/// An association as declared on a field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssociationDecl {
    /// Declared kind; `None` means infer from cardinality
    pub kind: Option<AssociationKind>,

    /// Update policy
    pub strategy: MutationStrategy,

    /// Explicit foreign-key nullability
    pub nullable: Option<bool>,

    /// Foreign key, or the owner column of a join table
    pub foreign_key: Option<String>,

    /// Target column of a join table
    pub association_foreign_key: Option<String>,

    /// Join table name
    pub join_table: Option<String>,
}

/// Relationship kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationKind {
    /// Foreign key on the owner
    EmbeddedOne,
    /// Foreign key on each child
    HasMany,
    /// Join record with two foreign keys
    ManyToMany,
}

/// How an update treats an associated collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationStrategy {
    /// Delete every linked row, then store the provided ones
    #[default]
    Default,
    /// Store the provided rows and delete the linked rows not among them
    Replace,
    /// Store the provided rows and delete nothing
    Append,
    /// Delete every linked row and ignore the provided ones
    Clear,
}
