//! Reading the schema out of a `CodeGeneratorRequest`
//!
//! prost drops unknown extension fields when it decodes descriptor protos,
//! so the request is decoded with the descriptor files left as raw bytes and
//! loaded into a prost-reflect pool, which keeps the `(persist.*)` options.

use std::collections::HashSet;

use prost::Message;
use prost_reflect::{
    Cardinality as ReflectCardinality, DescriptorPool, DynamicMessage, ExtensionDescriptor,
    FieldDescriptor, FileDescriptor, Kind, MessageDescriptor, Value,
};
use tracing::{debug, warn};

use crate::error::GeneratorError;
use crate::ir::{
    AssociationDecl, AssociationKind, Cardinality, ColumnAnnotations, FieldKind, FieldSchema,
    MessageSchema, ModelAnnotations, MutationStrategy, Optionality, ScalarType, Schema,
    SchemaFile,
};
use crate::options::persist;

/// `CodeGeneratorRequest` with the descriptor files kept as bytes
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawCodeGeneratorRequest {
    /// Files protoc wants output for
    #[prost(string, repeated, tag = "1")]
    pub file_to_generate: ::prost::alloc::vec::Vec<String>,
    /// Everything after `--persist_out=` and before the colon
    #[prost(string, optional, tag = "2")]
    pub parameter: Option<String>,
    /// Encoded `FileDescriptorProto`s, dependencies first
    #[prost(bytes = "vec", repeated, tag = "15")]
    pub proto_file: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
struct RawFileDescriptorSet {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub file: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
}

/// Decode the request envelope
pub fn decode_request(bytes: &[u8]) -> Result<RawCodeGeneratorRequest, GeneratorError> {
    RawCodeGeneratorRequest::decode(bytes).map_err(|e| GeneratorError::DecodeError(e.to_string()))
}

/// Load every descriptor file of the request into a pool
pub fn build_descriptor_pool(
    request: &RawCodeGeneratorRequest,
) -> Result<DescriptorPool, GeneratorError> {
    let fds = RawFileDescriptorSet {
        file: request.proto_file.clone(),
    };
    DescriptorPool::decode(fds.encode_to_vec().as_slice())
        .map_err(|e| GeneratorError::DecodeError(e.to_string()))
}

/// Decode extension `ext` of an options message into its prost type
fn decode_extension<T: Message + Default>(
    opts: &DynamicMessage,
    ext: Option<&ExtensionDescriptor>,
) -> Result<Option<T>, GeneratorError> {
    let Some(ext) = ext else {
        return Ok(None);
    };
    if !opts.has_extension(ext) {
        return Ok(None);
    }
    let value = opts.get_extension(ext);
    if let Value::Message(msg) = value.as_ref() {
        return T::decode(msg.encode_to_vec().as_slice())
            .map(Some)
            .map_err(|e| GeneratorError::DecodeError(format!("{}: {}", ext.full_name(), e)));
    }
    Ok(None)
}

/// Build the schema tree for every file in the pool
pub fn read_schema(
    pool: &DescriptorPool,
    request: &RawCodeGeneratorRequest,
) -> Result<Schema, GeneratorError> {
    let targets: HashSet<&str> = request
        .file_to_generate
        .iter()
        .map(String::as_str)
        .collect();
    let model_ext = pool.get_extension_by_name(persist::MODEL_EXTENSION);
    let field_ext = pool.get_extension_by_name(persist::FIELD_EXTENSION);
    if model_ext.is_none() {
        debug!("persist options not imported by any file; nothing is ormable");
    }

    let mut schema = Schema::default();
    for file in pool.files() {
        let generate = targets.contains(file.name());
        let mut messages = Vec::new();
        for message in file.messages() {
            messages.push(read_message(&file, &message, model_ext.as_ref(), field_ext.as_ref())?);
            if generate {
                warn_nested_models(&message, model_ext.as_ref())?;
            }
        }
        schema.files.push(SchemaFile {
            name: file.name().to_string(),
            package: file.package_name().to_string(),
            generate,
            messages,
        });
    }
    Ok(schema)
}

fn read_message(
    file: &FileDescriptor,
    message: &MessageDescriptor,
    model_ext: Option<&ExtensionDescriptor>,
    field_ext: Option<&ExtensionDescriptor>,
) -> Result<MessageSchema, GeneratorError> {
    let model = decode_extension::<persist::ModelOptions>(&message.options(), model_ext)?
        .map(|opts| ModelAnnotations {
            ormable: opts.ormable,
            table: non_empty(opts.table),
        })
        .unwrap_or_default();

    let proto2 = matches!(
        file.file_descriptor_proto().syntax.as_deref(),
        None | Some("proto2") | Some("")
    );
    let fields = message
        .fields()
        .map(|field| read_field(&field, proto2, field_ext))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(MessageSchema {
        name: message.name().to_string(),
        full_name: message.full_name().to_string(),
        package: message.package_name().to_string(),
        file: file.name().to_string(),
        fields,
        model,
    })
}

fn read_field(
    field: &FieldDescriptor,
    proto2: bool,
    field_ext: Option<&ExtensionDescriptor>,
) -> Result<FieldSchema, GeneratorError> {
    let annotations = decode_extension::<persist::FieldOptions>(&field.options(), field_ext)?
        .map(column_annotations)
        .unwrap_or_default();

    let cardinality = if field.is_list() || field.is_map() {
        Cardinality::Repeated
    } else {
        Cardinality::Singular
    };

    let proto3_optional = field
        .field_descriptor_proto()
        .proto3_optional
        .unwrap_or(false);
    let optionality = if proto3_optional {
        Optionality::Optional
    } else if proto2 {
        match field.cardinality() {
            ReflectCardinality::Optional => Optionality::Optional,
            ReflectCardinality::Required => Optionality::Required,
            ReflectCardinality::Repeated => Optionality::Unspecified,
        }
    } else {
        Optionality::Unspecified
    };

    let oneof = field
        .containing_oneof()
        .filter(|_| !proto3_optional)
        .map(|oneof| oneof.name().to_string());

    Ok(FieldSchema {
        name: field.name().to_string(),
        number: field.number(),
        kind: field_kind(field),
        cardinality,
        optionality,
        oneof,
        annotations,
    })
}

fn field_kind(field: &FieldDescriptor) -> FieldKind {
    if field.is_group() {
        return FieldKind::Group;
    }
    if field.is_map() {
        if let Kind::Message(entry) = field.kind() {
            let key = scalar_type(&entry.map_entry_key_field().kind()).unwrap_or(ScalarType::String);
            let value = kind_of(&entry.map_entry_value_field().kind());
            return FieldKind::Map {
                key,
                value: Box::new(value),
            };
        }
    }
    kind_of(&field.kind())
}

fn kind_of(kind: &Kind) -> FieldKind {
    match kind {
        Kind::Message(message) => FieldKind::Message(message.full_name().to_string()),
        Kind::Enum(enumeration) => FieldKind::Enum(enumeration.full_name().to_string()),
        other => FieldKind::Scalar(scalar_type(other).unwrap_or(ScalarType::Bytes)),
    }
}

fn scalar_type(kind: &Kind) -> Option<ScalarType> {
    Some(match kind {
        Kind::Double => ScalarType::Double,
        Kind::Float => ScalarType::Float,
        Kind::Int32 => ScalarType::Int32,
        Kind::Int64 => ScalarType::Int64,
        Kind::Uint32 => ScalarType::Uint32,
        Kind::Uint64 => ScalarType::Uint64,
        Kind::Sint32 => ScalarType::Sint32,
        Kind::Sint64 => ScalarType::Sint64,
        Kind::Fixed32 => ScalarType::Fixed32,
        Kind::Fixed64 => ScalarType::Fixed64,
        Kind::Sfixed32 => ScalarType::Sfixed32,
        Kind::Sfixed64 => ScalarType::Sfixed64,
        Kind::Bool => ScalarType::Bool,
        Kind::String => ScalarType::String,
        Kind::Bytes => ScalarType::Bytes,
        Kind::Message(_) | Kind::Enum(_) => return None,
    })
}

fn column_annotations(opts: persist::FieldOptions) -> ColumnAnnotations {
    ColumnAnnotations {
        column: non_empty(opts.column),
        primary_key: opts.primary_key,
        drop: opts.drop,
        association: opts.association.map(|assoc| AssociationDecl {
            kind: match assoc.kind() {
                persist::AssociationKind::Unspecified => None,
                persist::AssociationKind::EmbeddedOne => Some(AssociationKind::EmbeddedOne),
                persist::AssociationKind::HasMany => Some(AssociationKind::HasMany),
                persist::AssociationKind::ManyToMany => Some(AssociationKind::ManyToMany),
            },
            strategy: match assoc.strategy() {
                persist::MutationStrategy::Default => MutationStrategy::Default,
                persist::MutationStrategy::Replace => MutationStrategy::Replace,
                persist::MutationStrategy::Append => MutationStrategy::Append,
                persist::MutationStrategy::Clear => MutationStrategy::Clear,
            },
            nullable: assoc.nullable,
            foreign_key: non_empty(assoc.foreign_key),
            association_foreign_key: non_empty(assoc.association_foreign_key),
            join_table: non_empty(assoc.join_table),
        }),
    }
}

/// Nested messages are generated by prost into child modules this plugin does
/// not emit into, so an ormable nested message is reported and skipped.
fn warn_nested_models(
    message: &MessageDescriptor,
    model_ext: Option<&ExtensionDescriptor>,
) -> Result<(), GeneratorError> {
    for child in message.child_messages() {
        if child.is_map_entry() {
            continue;
        }
        let ormable = decode_extension::<persist::ModelOptions>(&child.options(), model_ext)?
            .is_some_and(|opts| opts.ormable);
        if ormable {
            warn!(
                message = child.full_name(),
                "nested ormable messages are not supported; skipping"
            );
        }
        warn_nested_models(&child, model_ext)?;
    }
    Ok(())
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}
