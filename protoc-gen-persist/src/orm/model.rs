//! Record models
//!
//! One model per persisted message: the columns of its storage record, its
//! primary key, and the associations and join records it owns. Building a
//! model is a pure function of the schema and the resolved associations, so
//! identical input always yields an identical model.

use std::collections::{HashMap, HashSet};

use proc_macro2::TokenStream;
use quote::quote;
use syn::Ident;

use super::association::{Association, JoinModel, Link, Resolution};
use super::naming;
use super::types::{self, ColumnType, Mapping, Marshal, StorageScalar};
use crate::error::SchemaError;
use crate::ir::{FieldKind, FieldSchema, MessageSchema, Optionality, ScalarType, Schema};
use crate::options::persist::UUID_MESSAGE;

/// Types a primary key may have
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Int32,
    Int64,
    UInt32,
    UInt64,
    String,
    Uuid,
}

impl KeyKind {
    /// Key kind of a field type, if it can be a key at all
    pub fn of(kind: &FieldKind) -> Option<Self> {
        Some(match kind {
            FieldKind::Scalar(scalar) => match scalar {
                ScalarType::Int32 | ScalarType::Sint32 | ScalarType::Sfixed32 => KeyKind::Int32,
                ScalarType::Int64 | ScalarType::Sint64 | ScalarType::Sfixed64 => KeyKind::Int64,
                ScalarType::Uint32 | ScalarType::Fixed32 => KeyKind::UInt32,
                ScalarType::Uint64 | ScalarType::Fixed64 => KeyKind::UInt64,
                ScalarType::String => KeyKind::String,
                _ => return None,
            },
            FieldKind::Message(name) if name == UUID_MESSAGE => KeyKind::Uuid,
            _ => return None,
        })
    }

    /// Storage scalar of the key column
    pub fn storage(self) -> StorageScalar {
        match self {
            KeyKind::Int32 => StorageScalar::I32,
            KeyKind::Int64 => StorageScalar::I64,
            KeyKind::UInt32 => StorageScalar::U32,
            KeyKind::UInt64 => StorageScalar::U64,
            KeyKind::String => StorageScalar::String,
            KeyKind::Uuid => StorageScalar::Uuid,
        }
    }

    /// How an unidentified key looks
    pub fn emptiness(self) -> Emptiness {
        match self {
            KeyKind::String => Emptiness::EmptyString,
            KeyKind::Uuid => Emptiness::Null,
            _ => Emptiness::Zero,
        }
    }

    /// Column type of the key itself. Generated identifiers are nullable.
    pub fn key_type(self) -> ColumnType {
        ColumnType {
            scalar: self.storage(),
            nullable: self == KeyKind::Uuid,
            marshal: if self == KeyKind::Uuid {
                Marshal::Uuid
            } else {
                Marshal::Direct
            },
        }
    }

    /// Column type of a foreign key referencing this kind of key
    pub fn foreign_key_type(self, nullable: bool) -> ColumnType {
        ColumnType::direct(self.storage(), nullable || self == KeyKind::Uuid)
    }

    /// Whether a foreign key of this kind wraps the key value in `Some`
    ///
    /// UUID keys are already optional, so their foreign keys hold the key
    /// value as is.
    pub fn wraps_foreign_key(self, nullable: bool) -> bool {
        nullable && self != KeyKind::Uuid
    }
}

/// Emptiness predicate of a primary key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emptiness {
    /// Numeric zero
    Zero,
    /// The empty string
    EmptyString,
    /// No identifier, or the nil UUID
    Null,
}

impl Emptiness {
    /// Expression testing `value` for emptiness
    pub fn test(self, value: TokenStream) -> TokenStream {
        match self {
            Emptiness::Zero => quote!(#value == 0),
            Emptiness::EmptyString => quote!(#value.is_empty()),
            Emptiness::Null => quote!(#value.is_none_or(|id| id.is_nil())),
        }
    }
}

/// Primary key of a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKeyModel {
    /// Schema field holding the key
    pub field: String,
    /// Column name
    pub column: String,
    /// Key type
    pub kind: KeyKind,
    /// Whether the message field is `Copy`
    pub pb_copy: bool,
}

impl PrimaryKeyModel {
    /// Identifier of the key on both the message and the record
    pub fn ident(&self) -> Ident {
        naming::field_ident(&self.field)
    }

    /// Rust type of the key on the record
    pub fn tokens(&self, rt: &syn::Path) -> TokenStream {
        self.kind.key_type().tokens(rt)
    }
}

/// Find the primary key of `message`
///
/// The key is the field annotated `primary_key`, or else the field named
/// `id`. A message may have no key at all.
pub fn primary_key(message: &MessageSchema) -> Result<Option<PrimaryKeyModel>, SchemaError> {
    let annotated: Vec<&FieldSchema> = message
        .fields
        .iter()
        .filter(|f| f.annotations.primary_key)
        .collect();
    let field = match annotated.as_slice() {
        [] => match message.field("id") {
            Some(id) if !id.annotations.drop => id,
            _ => return Ok(None),
        },
        [field] => *field,
        [first, second, ..] => {
            return Err(SchemaError::malformed(
                &message.full_name,
                format!(
                    "both `{}` and `{}` are marked primary_key",
                    first.name, second.name
                ),
            ));
        }
    };

    let target = format!("{}.{}", message.full_name, field.name);
    if field.annotations.drop {
        return Err(SchemaError::malformed(target, "a primary key cannot be dropped"));
    }
    if field.is_repeated() {
        return Err(SchemaError::malformed(target, "a primary key cannot be repeated"));
    }
    if field.oneof.is_some() {
        return Err(SchemaError::malformed(target, "a primary key cannot be a oneof member"));
    }
    let kind = KeyKind::of(&field.kind).ok_or_else(|| {
        SchemaError::malformed(
            &target,
            "a primary key must be an integer, a string or a persist.types.UUID",
        )
    })?;
    if kind != KeyKind::Uuid && field.optionality == Optionality::Optional {
        return Err(SchemaError::malformed(target, "a primary key cannot be optional"));
    }

    Ok(Some(PrimaryKeyModel {
        field: field.name.clone(),
        column: column_name(field),
        kind,
        pb_copy: types::message_field_is_copy(field),
    }))
}

/// Column name of a schema field
pub fn column_name(field: &FieldSchema) -> String {
    field
        .annotations
        .column
        .clone()
        .unwrap_or_else(|| naming::snake(&field.name))
}

/// Where a record field comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldOrigin {
    /// Copied from a schema field
    Schema {
        /// Schema field name
        field: String,
    },
    /// Foreign key of an embedded-one association declared on this message
    OwnedForeignKey {
        /// Declaring field
        association: String,
    },
    /// Foreign key pointing back at the owner of a has-many association
    BackReference {
        /// Owning message
        owner: String,
        /// Declaring field on the owner
        association: String,
    },
}

/// One field of a storage record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordField {
    /// Rust field name
    pub name: String,
    /// Column name
    pub column: String,
    /// Storage type
    pub ty: ColumnType,
    /// Provenance
    pub origin: FieldOrigin,
}

impl RecordField {
    /// Identifier of the record field
    pub fn ident(&self) -> Ident {
        naming::ident(&self.name)
    }

    /// Schema field this column is copied from, if any
    pub fn schema_field(&self) -> Option<&str> {
        match &self.origin {
            FieldOrigin::Schema { field } => Some(field),
            _ => None,
        }
    }
}

/// Storage-facing model of a persisted message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordModel {
    /// Full name of the message
    pub message: String,
    /// Short name of the message
    pub name: String,
    /// Package of the message
    pub package: String,
    /// File declaring the message
    pub file: String,
    /// Table name
    pub table: String,
    /// Schema columns in declaration order, then owned foreign keys, then
    /// back references
    pub fields: Vec<RecordField>,
    /// Primary key, if the message has one
    pub primary_key: Option<PrimaryKeyModel>,
    /// Associations declared on this message
    pub associations: Vec<Association>,
}

impl RecordModel {
    /// Identifier of the record struct, e.g. `BlogPostOrm`
    pub fn record_ident(&self) -> Ident {
        naming::ident(&format!("{}Orm", naming::camel(&self.name)))
    }

    /// Look up a record field by Rust name
    pub fn field(&self, name: &str) -> Option<&RecordField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Join records owned by this message
    pub fn joins(&self) -> impl Iterator<Item = &JoinModel> {
        self.associations.iter().filter_map(|a| match &a.link {
            Link::ManyToMany(join) => Some(join),
            _ => None,
        })
    }

    /// Foreign keys this record holds for other messages' has-many associations
    pub fn back_references(&self) -> impl Iterator<Item = &RecordField> {
        self.fields
            .iter()
            .filter(|f| matches!(f.origin, FieldOrigin::BackReference { .. }))
    }
}

/// Build the record model of `message`
pub fn build(
    schema: &Schema,
    message: &MessageSchema,
    keys: &HashMap<String, PrimaryKeyModel>,
    resolution: &Resolution,
) -> Result<RecordModel, SchemaError> {
    let primary_key = keys.get(&message.full_name).cloned();
    let mut fields = Vec::new();

    for field in &message.fields {
        match types::map_field(schema, message, field)? {
            Mapping::Column(ty) => {
                fields.push(RecordField {
                    name: naming::snake(&field.name),
                    column: column_name(field),
                    ty,
                    origin: FieldOrigin::Schema {
                        field: field.name.clone(),
                    },
                });
            }
            Mapping::Association { .. } | Mapping::Dropped => {}
        }
    }

    let associations: Vec<Association> = resolution.owned_by(&message.full_name).cloned().collect();
    for association in &associations {
        if let Link::EmbeddedOne {
            foreign_key,
            nullable,
            target_key,
        } = &association.link
        {
            fields.push(RecordField {
                name: foreign_key.clone(),
                column: foreign_key.clone(),
                ty: target_key.foreign_key_type(*nullable),
                origin: FieldOrigin::OwnedForeignKey {
                    association: association.field.clone(),
                },
            });
        }
    }

    for association in resolution.children_of(&message.full_name) {
        if let Link::HasMany {
            foreign_key,
            nullable,
            reused: false,
            owner_key,
        } = &association.link
        {
            fields.push(RecordField {
                name: foreign_key.clone(),
                column: foreign_key.clone(),
                ty: owner_key.foreign_key_type(*nullable),
                origin: FieldOrigin::BackReference {
                    owner: association.owner.clone(),
                    association: association.field.clone(),
                },
            });
        }
    }

    let mut seen = HashSet::new();
    for field in &fields {
        if !seen.insert(field.column.as_str()) {
            return Err(SchemaError::malformed(
                &message.full_name,
                format!("column `{}` is used by more than one field", field.column),
            ));
        }
    }

    Ok(RecordModel {
        message: message.full_name.clone(),
        name: message.name.clone(),
        package: message.package.clone(),
        file: message.file.clone(),
        table: message
            .model
            .table
            .clone()
            .unwrap_or_else(|| naming::table_name(&message.name)),
        fields,
        primary_key,
        associations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::fixtures::*;
    use crate::ir::{AssociationDecl, AssociationKind};
    use crate::orm::association;

    fn keys_of(schema: &Schema) -> HashMap<String, PrimaryKeyModel> {
        schema
            .messages()
            .filter_map(|m| primary_key(m).unwrap().map(|pk| (m.full_name.clone(), pk)))
            .collect()
    }

    fn build_all(schema: &Schema) -> Result<Vec<RecordModel>, SchemaError> {
        let keys = keys_of(schema);
        let resolution = association::resolve(schema, &keys)?;
        schema
            .messages()
            .map(|m| build(schema, m, &keys, &resolution))
            .collect()
    }

    #[test]
    fn test_primary_key_defaults_to_id() {
        let pk = primary_key(&blog_post()).unwrap().unwrap();
        assert_eq!(pk.field, "id");
        assert_eq!(pk.kind, KeyKind::UInt64);
        assert_eq!(pk.kind.emptiness(), Emptiness::Zero);
        assert!(pk.pb_copy);

        let keyless = message("Note", vec![scalar("body", 1, ScalarType::String)]);
        assert_eq!(primary_key(&keyless).unwrap(), None);
    }

    #[test]
    fn test_annotated_primary_key() {
        let mut slug = scalar("slug", 2, ScalarType::String);
        slug.annotations.primary_key = true;
        slug.annotations.column = Some("page_slug".into());
        let page = message("Page", vec![scalar("id", 1, ScalarType::Uint64), slug]);
        let pk = primary_key(&page).unwrap().unwrap();
        assert_eq!((pk.field.as_str(), pk.column.as_str()), ("slug", "page_slug"));
        assert_eq!(pk.kind.emptiness(), Emptiness::EmptyString);
    }

    #[test]
    fn test_invalid_primary_keys() {
        let mut a = scalar("a", 1, ScalarType::Uint64);
        a.annotations.primary_key = true;
        let mut b = scalar("b", 2, ScalarType::Uint64);
        b.annotations.primary_key = true;
        let err = primary_key(&message("Two", vec![a, b])).unwrap_err();
        assert!(err.to_string().contains("both `a` and `b`"));

        let err = primary_key(&message("F", vec![scalar("id", 1, ScalarType::Double)])).unwrap_err();
        assert!(matches!(err, SchemaError::MalformedAnnotation { .. }));

        let err = primary_key(&message("O", vec![optional(scalar("id", 1, ScalarType::Int64))]))
            .unwrap_err();
        assert!(err.to_string().contains("cannot be optional"));

        let uuid = primary_key(&message("U", vec![message_field("id", 1, UUID_MESSAGE)]))
            .unwrap()
            .unwrap();
        assert_eq!(uuid.kind.emptiness(), Emptiness::Null);
        assert!(uuid.kind.key_type().nullable);
    }

    #[test]
    fn test_record_fields_and_table() {
        let schema = schema(vec![blog_post()]);
        let records = build_all(&schema).unwrap();
        let post = &records[0];
        assert_eq!(post.table, "blog_posts");
        assert_eq!(post.record_ident().to_string(), "BlogPostOrm");
        assert_eq!(
            post.fields.iter().map(|f| f.column.as_str()).collect::<Vec<_>>(),
            vec!["id", "title", "author"]
        );
        assert_eq!(post.field("title").unwrap().schema_field(), Some("title"));
    }

    #[test]
    fn test_foreign_keys_follow_schema_columns() {
        let author = message("Author", vec![scalar("id", 1, ScalarType::Uint64)]);
        let comment = message(
            "Comment",
            vec![
                scalar("id", 1, ScalarType::Uint64),
                scalar("body", 2, ScalarType::String),
            ],
        );
        let article = message(
            "Article",
            vec![
                message_field("id", 1, UUID_MESSAGE),
                optional(message_field("writer", 2, "blog.Author")),
                repeated(message_field("comments", 3, "blog.Comment")),
                associated(
                    repeated(message_field("tags", 4, "blog.Author")),
                    AssociationDecl {
                        kind: Some(AssociationKind::ManyToMany),
                        ..Default::default()
                    },
                ),
            ],
        );
        let schema = schema(vec![author, comment, article]);
        let records = build_all(&schema).unwrap();

        let article = &records[2];
        let columns: Vec<&str> = article.fields.iter().map(|f| f.column.as_str()).collect();
        assert_eq!(columns, vec!["id", "writer_id"]);
        assert!(article.fields[0].ty.nullable);
        assert_eq!(article.fields[1].ty, ColumnType::direct(StorageScalar::U64, true));
        assert_eq!(article.joins().count(), 1);

        let comment = &records[1];
        let back: Vec<&RecordField> = comment.back_references().collect();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].column, "article_id");
        assert_eq!(back[0].ty, ColumnType::direct(StorageScalar::Uuid, true));
    }

    #[test]
    fn test_duplicate_columns_are_rejected() {
        let mut title = scalar("title", 2, ScalarType::String);
        title.annotations.column = Some("id".into());
        let schema = schema(vec![message("Post", vec![scalar("id", 1, ScalarType::Uint64), title])]);
        let err = build_all(&schema).unwrap_err();
        assert!(err.to_string().contains("column `id`"));
    }

    #[test]
    fn test_build_is_deterministic() {
        let schema = schema(vec![blog_post()]);
        assert_eq!(build_all(&schema).unwrap(), build_all(&schema).unwrap());
    }
}
