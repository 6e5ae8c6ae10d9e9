//! Type mapping from schema fields to record columns
//!
//! Every field ends up as exactly one of: a column with a storage type and a
//! marshalling strategy, an association handled by the CRUD layer, or a
//! field dropped by annotation. Anything else is a schema error.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use proc_macro2::TokenStream;
use quote::quote;
use tracing::warn;

use crate::error::SchemaError;
use crate::ir::{FieldKind, FieldSchema, MessageSchema, Optionality, ScalarType, Schema};
use crate::options::persist::UUID_MESSAGE;

/// Rust type of a record column, before nullability
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageScalar {
    Bool,
    I32,
    I64,
    U32,
    U64,
    F32,
    F64,
    String,
    Bytes,
    DateTime,
    Uuid,
}

impl StorageScalar {
    /// Whether the Rust type is `Copy`
    pub fn is_copy(self) -> bool {
        !matches!(self, StorageScalar::String | StorageScalar::Bytes)
    }

    /// The Rust type, with runtime re-exports reached through `rt`
    pub fn tokens(self, rt: &syn::Path) -> TokenStream {
        match self {
            StorageScalar::Bool => quote!(bool),
            StorageScalar::I32 => quote!(i32),
            StorageScalar::I64 => quote!(i64),
            StorageScalar::U32 => quote!(u32),
            StorageScalar::U64 => quote!(u64),
            StorageScalar::F32 => quote!(f32),
            StorageScalar::F64 => quote!(f64),
            StorageScalar::String => quote!(::prost::alloc::string::String),
            StorageScalar::Bytes => quote!(::prost::alloc::vec::Vec<u8>),
            StorageScalar::DateTime => quote!(#rt::chrono::DateTime<#rt::chrono::Utc>),
            StorageScalar::Uuid => quote!(#rt::uuid::Uuid),
        }
    }

    fn from_scalar(scalar: ScalarType) -> Self {
        match scalar {
            ScalarType::Double => StorageScalar::F64,
            ScalarType::Float => StorageScalar::F32,
            ScalarType::Int32 | ScalarType::Sint32 | ScalarType::Sfixed32 => StorageScalar::I32,
            ScalarType::Int64 | ScalarType::Sint64 | ScalarType::Sfixed64 => StorageScalar::I64,
            ScalarType::Uint32 | ScalarType::Fixed32 => StorageScalar::U32,
            ScalarType::Uint64 | ScalarType::Fixed64 => StorageScalar::U64,
            ScalarType::Bool => StorageScalar::Bool,
            ScalarType::String => StorageScalar::String,
            ScalarType::Bytes => StorageScalar::Bytes,
        }
    }
}

/// How a value moves between the message field and the record column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marshal {
    /// Same Rust type on both sides
    Direct,
    /// `prost_types::Timestamp` to `DateTime<Utc>`
    Timestamp,
    /// `persist.types.UUID` to `Uuid`
    Uuid,
    /// Repeated scalars or a scalar map as JSON text
    Json,
    /// Embedded message as its protobuf encoding
    Message,
    /// Repeated embedded messages, length-delimited
    Messages,
}

/// Storage type of one record column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnType {
    /// Rust type of a non-null value
    pub scalar: StorageScalar,
    /// Wrapped in `Option`
    pub nullable: bool,
    /// Conversion from the message field
    pub marshal: Marshal,
}

impl ColumnType {
    /// A plain column with no conversion
    pub fn direct(scalar: StorageScalar, nullable: bool) -> Self {
        Self {
            scalar,
            nullable,
            marshal: Marshal::Direct,
        }
    }

    /// Whether the record field is `Copy`
    pub fn is_copy(&self) -> bool {
        self.scalar.is_copy()
    }

    /// Full Rust type of the record field
    pub fn tokens(&self, rt: &syn::Path) -> TokenStream {
        let inner = self.scalar.tokens(rt);
        if self.nullable {
            quote!(::core::option::Option<#inner>)
        } else {
            inner
        }
    }
}

/// Result of mapping one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mapping {
    /// Stored in a column of the owning record
    Column(ColumnType),
    /// A persisted message, stored through a foreign key or join record
    Association {
        /// Full name of the associated message
        target: String,
    },
    /// Excluded from the record
    Dropped,
}

#[derive(Debug, Clone, Copy)]
enum WellKnown {
    Timestamp,
    Uuid,
    Wrapper(StorageScalar),
    Unsupported,
}

static WELL_KNOWN: Lazy<HashMap<&'static str, WellKnown>> = Lazy::new(|| {
    HashMap::from([
        ("google.protobuf.Timestamp", WellKnown::Timestamp),
        (UUID_MESSAGE, WellKnown::Uuid),
        ("google.protobuf.DoubleValue", WellKnown::Wrapper(StorageScalar::F64)),
        ("google.protobuf.FloatValue", WellKnown::Wrapper(StorageScalar::F32)),
        ("google.protobuf.Int64Value", WellKnown::Wrapper(StorageScalar::I64)),
        ("google.protobuf.UInt64Value", WellKnown::Wrapper(StorageScalar::U64)),
        ("google.protobuf.Int32Value", WellKnown::Wrapper(StorageScalar::I32)),
        ("google.protobuf.UInt32Value", WellKnown::Wrapper(StorageScalar::U32)),
        ("google.protobuf.BoolValue", WellKnown::Wrapper(StorageScalar::Bool)),
        ("google.protobuf.StringValue", WellKnown::Wrapper(StorageScalar::String)),
        ("google.protobuf.BytesValue", WellKnown::Wrapper(StorageScalar::Bytes)),
        // prost maps Empty to `()`, which has no encoding
        ("google.protobuf.Empty", WellKnown::Unsupported),
    ])
});

/// Map one field of `message`
pub fn map_field(
    schema: &Schema,
    message: &MessageSchema,
    field: &FieldSchema,
) -> Result<Mapping, SchemaError> {
    if field.annotations.drop {
        warn!(
            message = %message.full_name,
            field = %field.name,
            "field marked drop; it is not stored"
        );
        return Ok(Mapping::Dropped);
    }

    let unmappable = |ty: &str| SchemaError::UnmappableType {
        message: message.full_name.clone(),
        field: field.name.clone(),
        ty: ty.to_string(),
    };

    if let Some(oneof) = &field.oneof {
        return Err(unmappable(&format!("member of oneof `{}`", oneof)));
    }

    let nullable = field.optionality == Optionality::Optional;
    let mapping = match &field.kind {
        FieldKind::Group => return Err(unmappable("group")),
        FieldKind::Map { value, .. } => match value.as_ref() {
            FieldKind::Scalar(_) | FieldKind::Enum(_) => json(),
            _ => return Err(unmappable("map with message values")),
        },
        FieldKind::Scalar(_) | FieldKind::Enum(_) if field.is_repeated() => json(),
        FieldKind::Scalar(scalar) => {
            Mapping::Column(ColumnType::direct(StorageScalar::from_scalar(*scalar), nullable))
        }
        FieldKind::Enum(_) => Mapping::Column(ColumnType::direct(StorageScalar::I32, nullable)),
        FieldKind::Message(name) => {
            if schema.is_persisted(name) {
                Mapping::Association {
                    target: name.clone(),
                }
            } else {
                match (WELL_KNOWN.get(name.as_str()).copied(), field.is_repeated()) {
                    (Some(WellKnown::Unsupported), _) => return Err(unmappable(name)),
                    (Some(WellKnown::Wrapper(_)), true) => json(),
                    (_, true) => Mapping::Column(ColumnType {
                        scalar: StorageScalar::Bytes,
                        nullable: false,
                        marshal: Marshal::Messages,
                    }),
                    (Some(WellKnown::Wrapper(scalar)), false) => {
                        Mapping::Column(ColumnType::direct(scalar, true))
                    }
                    // singular message fields always track presence
                    (Some(WellKnown::Timestamp), false) => Mapping::Column(ColumnType {
                        scalar: StorageScalar::DateTime,
                        nullable: true,
                        marshal: Marshal::Timestamp,
                    }),
                    (Some(WellKnown::Uuid), false) => Mapping::Column(ColumnType {
                        scalar: StorageScalar::Uuid,
                        nullable: true,
                        marshal: Marshal::Uuid,
                    }),
                    (None, false) => Mapping::Column(ColumnType {
                        scalar: StorageScalar::Bytes,
                        nullable: true,
                        marshal: Marshal::Message,
                    }),
                }
            }
        }
    };
    Ok(mapping)
}

fn json() -> Mapping {
    Mapping::Column(ColumnType {
        scalar: StorageScalar::String,
        nullable: false,
        marshal: Marshal::Json,
    })
}

/// Whether the prost field for `field` is `Copy`
pub fn message_field_is_copy(field: &FieldSchema) -> bool {
    if field.is_repeated() {
        return false;
    }
    match &field.kind {
        FieldKind::Scalar(scalar) => StorageScalar::from_scalar(*scalar).is_copy(),
        FieldKind::Enum(_) => true,
        FieldKind::Message(name) => {
            matches!(WELL_KNOWN.get(name.as_str()), Some(WellKnown::Wrapper(s)) if s.is_copy())
        }
        FieldKind::Map { .. } | FieldKind::Group => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::fixtures::*;

    fn map_one(field: FieldSchema) -> Result<Mapping, SchemaError> {
        let message = message("Probe", vec![field.clone()]);
        let schema = schema(vec![message.clone(), message_with_name("Author")]);
        map_field(&schema, &message, &field)
    }

    fn message_with_name(name: &str) -> MessageSchema {
        message(name, vec![scalar("id", 1, ScalarType::Uint64)])
    }

    fn column(mapping: Mapping) -> ColumnType {
        match mapping {
            Mapping::Column(column) => column,
            other => panic!("expected a column, got {:?}", other),
        }
    }

    #[test]
    fn test_scalars_map_directly() {
        let col = column(map_one(scalar("n", 1, ScalarType::Sint64)).unwrap());
        assert_eq!(col, ColumnType::direct(StorageScalar::I64, false));

        let col = column(map_one(optional(scalar("s", 1, ScalarType::String))).unwrap());
        assert_eq!(col, ColumnType::direct(StorageScalar::String, true));
        assert!(!col.is_copy());
    }

    #[test]
    fn test_enum_keeps_numeric_value() {
        let mut field = scalar("status", 1, ScalarType::Bool);
        field.kind = FieldKind::Enum("blog.Status".into());
        assert_eq!(
            column(map_one(field.clone()).unwrap()),
            ColumnType::direct(StorageScalar::I32, false)
        );
        assert_eq!(column(map_one(repeated(field)).unwrap()).marshal, Marshal::Json);
    }

    #[test]
    fn test_well_known_types() {
        let ts = column(map_one(message_field("at", 1, "google.protobuf.Timestamp")).unwrap());
        assert_eq!(ts.scalar, StorageScalar::DateTime);
        assert_eq!(ts.marshal, Marshal::Timestamp);
        assert!(ts.nullable);

        let id = column(map_one(message_field("ref", 1, UUID_MESSAGE)).unwrap());
        assert_eq!((id.scalar, id.nullable, id.marshal), (StorageScalar::Uuid, true, Marshal::Uuid));

        let wrapped = column(map_one(message_field("w", 1, "google.protobuf.Int32Value")).unwrap());
        assert_eq!(wrapped, ColumnType::direct(StorageScalar::I32, true));

        assert!(matches!(
            map_one(message_field("e", 1, "google.protobuf.Empty")),
            Err(SchemaError::UnmappableType { .. })
        ));
    }

    #[test]
    fn test_repeated_fields_are_serialized() {
        let tags = column(map_one(repeated(scalar("tags", 1, ScalarType::String))).unwrap());
        assert_eq!(tags.marshal, Marshal::Json);
        assert!(!tags.nullable);

        let nested = column(map_one(repeated(message_field("m", 1, "blog.Metadata"))).unwrap());
        assert_eq!(nested.marshal, Marshal::Messages);

        let single = column(map_one(message_field("m", 1, "blog.Metadata")).unwrap());
        assert_eq!((single.scalar, single.marshal), (StorageScalar::Bytes, Marshal::Message));
        assert!(single.nullable);
    }

    #[test]
    fn test_maps() {
        let mut field = scalar("attrs", 1, ScalarType::String);
        field.kind = FieldKind::Map {
            key: ScalarType::String,
            value: Box::new(FieldKind::Scalar(ScalarType::Int64)),
        };
        field.cardinality = crate::ir::Cardinality::Repeated;
        assert_eq!(column(map_one(field.clone()).unwrap()).marshal, Marshal::Json);

        field.kind = FieldKind::Map {
            key: ScalarType::String,
            value: Box::new(FieldKind::Message("blog.Metadata".into())),
        };
        let err = map_one(field).unwrap_err();
        assert!(err.to_string().contains("map with message values"));
    }

    #[test]
    fn test_associations_drops_and_oneofs() {
        assert_eq!(
            map_one(message_field("writer", 1, "blog.Author")).unwrap(),
            Mapping::Association {
                target: "blog.Author".into()
            }
        );

        let mut dropped = scalar("scratch", 2, ScalarType::String);
        dropped.annotations.drop = true;
        assert_eq!(map_one(dropped).unwrap(), Mapping::Dropped);

        let mut member = scalar("a", 3, ScalarType::String);
        member.oneof = Some("choice".into());
        let err = map_one(member.clone()).unwrap_err();
        assert!(err.to_string().contains("oneof `choice`"));

        member.annotations.drop = true;
        assert_eq!(map_one(member).unwrap(), Mapping::Dropped);
    }

    #[test]
    fn test_message_field_copy() {
        assert!(message_field_is_copy(&scalar("n", 1, ScalarType::Uint64)));
        assert!(!message_field_is_copy(&scalar("s", 1, ScalarType::String)));
        assert!(message_field_is_copy(&message_field("w", 1, "google.protobuf.BoolValue")));
        assert!(!message_field_is_copy(&repeated(scalar("n", 1, ScalarType::Uint64))));
    }
}
