//! Build script for persist-demo
//!
//! Runs the protoc-gen-persist pipeline over the schema of
//! `proto/blog.proto` and writes `blog.persist.rs` to `OUT_DIR`. The schema
//! is described in the generator's input form, so no protoc is needed.

use std::env;
use std::fs;
use std::path::PathBuf;

use protoc_gen_persist::PluginConfig;
use protoc_gen_persist::ir::{
    AssociationDecl, AssociationKind, Cardinality, ColumnAnnotations, FieldKind, FieldSchema,
    MessageSchema, ModelAnnotations, MutationStrategy, Optionality, ScalarType, Schema,
    SchemaFile,
};
use protoc_gen_persist::options::persist::UUID_MESSAGE;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=proto/blog.proto");

    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    let files = protoc_gen_persist::orm::generate(&blog_schema(), &PluginConfig::default())?;
    for file in files {
        let (Some(name), Some(content)) = (file.name, file.content) else {
            continue;
        };
        fs::write(out_dir.join(name), content)?;
    }
    Ok(())
}

fn field(name: &str, number: u32, kind: FieldKind) -> FieldSchema {
    FieldSchema {
        name: name.to_string(),
        number,
        kind,
        cardinality: Cardinality::Singular,
        optionality: Optionality::Unspecified,
        oneof: None,
        annotations: ColumnAnnotations::default(),
    }
}

fn scalar(name: &str, number: u32, ty: ScalarType) -> FieldSchema {
    field(name, number, FieldKind::Scalar(ty))
}

fn message_field(name: &str, number: u32, type_name: &str) -> FieldSchema {
    field(name, number, FieldKind::Message(type_name.to_string()))
}

fn repeated(mut field: FieldSchema) -> FieldSchema {
    field.cardinality = Cardinality::Repeated;
    field
}

fn optional(mut field: FieldSchema) -> FieldSchema {
    field.optionality = Optionality::Optional;
    field
}

fn association(
    mut field: FieldSchema,
    kind: AssociationKind,
    strategy: MutationStrategy,
) -> FieldSchema {
    field.annotations.association = Some(AssociationDecl {
        kind: Some(kind),
        strategy,
        ..AssociationDecl::default()
    });
    field
}

fn message(name: &str, ormable: bool, fields: Vec<FieldSchema>) -> MessageSchema {
    MessageSchema {
        name: name.to_string(),
        full_name: format!("blog.{}", name),
        package: "blog".to_string(),
        file: "blog.proto".to_string(),
        fields,
        model: ModelAnnotations {
            ormable,
            table: None,
        },
    }
}

fn blog_schema() -> Schema {
    let mut label = scalar("label", 2, ScalarType::String);
    label.annotations.column = Some("label_text".to_string());
    let mut tag = message(
        "Tag",
        true,
        vec![scalar("id", 1, ScalarType::String), label],
    );
    tag.model.table = Some("labels".to_string());

    let messages = vec![
        message(
            "BlogPost",
            true,
            vec![
                scalar("id", 1, ScalarType::Uint64),
                scalar("title", 2, ScalarType::String),
                scalar("author", 3, ScalarType::String),
            ],
        ),
        message(
            "Author",
            true,
            vec![
                scalar("id", 1, ScalarType::Uint64),
                scalar("name", 2, ScalarType::String),
                optional(scalar("email", 3, ScalarType::String)),
            ],
        ),
        message(
            "Comment",
            true,
            vec![
                scalar("id", 1, ScalarType::Uint64),
                scalar("body", 2, ScalarType::String),
                repeated(scalar("flags", 3, ScalarType::String)),
            ],
        ),
        tag,
        message(
            "Metadata",
            false,
            vec![
                scalar("source", 1, ScalarType::String),
                scalar("revision", 2, ScalarType::Int32),
            ],
        ),
        message(
            "Article",
            true,
            vec![
                message_field("id", 1, UUID_MESSAGE),
                scalar("title", 2, ScalarType::String),
                optional(message_field("writer", 3, "blog.Author")),
                association(
                    repeated(message_field("comments", 4, "blog.Comment")),
                    AssociationKind::HasMany,
                    MutationStrategy::Replace,
                ),
                association(
                    repeated(message_field("tags", 5, "blog.Tag")),
                    AssociationKind::ManyToMany,
                    MutationStrategy::Append,
                ),
                message_field("published_at", 6, "google.protobuf.Timestamp"),
                field("status", 7, FieldKind::Enum("blog.Status".to_string())),
                repeated(scalar("keywords", 8, ScalarType::String)),
                message_field("meta", 9, "blog.Metadata"),
                optional(scalar("rating", 10, ScalarType::Double)),
            ],
        ),
        message(
            "Reply",
            true,
            vec![
                scalar("id", 1, ScalarType::Uint64),
                scalar("text", 2, ScalarType::String),
            ],
        ),
        message(
            "Thread",
            true,
            vec![
                scalar("id", 1, ScalarType::Uint64),
                scalar("title", 2, ScalarType::String),
                association(
                    repeated(message_field("replies", 3, "blog.Reply")),
                    AssociationKind::HasMany,
                    MutationStrategy::Default,
                ),
                association(
                    repeated(message_field("topics", 4, "blog.Tag")),
                    AssociationKind::ManyToMany,
                    MutationStrategy::Default,
                ),
            ],
        ),
        message(
            "Digest",
            true,
            vec![
                scalar("id", 1, ScalarType::Uint64),
                association(
                    repeated(message_field("entries", 2, "blog.Reply")),
                    AssociationKind::HasMany,
                    MutationStrategy::Clear,
                ),
                association(
                    repeated(message_field("featured", 3, "blog.Tag")),
                    AssociationKind::ManyToMany,
                    MutationStrategy::Replace,
                ),
                association(
                    repeated(message_field("hidden", 4, "blog.Tag")),
                    AssociationKind::ManyToMany,
                    MutationStrategy::Clear,
                ),
            ],
        ),
    ];

    Schema {
        files: vec![SchemaFile {
            name: "blog.proto".to_string(),
            package: "blog".to_string(),
            generate: true,
            messages,
        }],
    }
}
