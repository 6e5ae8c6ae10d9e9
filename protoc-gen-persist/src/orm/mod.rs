//! Persistence binding generation
//!
//! The pipeline runs in three pure stages: primary keys and associations are
//! resolved over the whole schema, a [`model::RecordModel`] is built per
//! persisted message, and each model is emitted as tokens by the emitters
//! below. [`generate`] drives them and renders one file per schema file.

pub mod association;
pub mod conversion;
pub mod crud;
pub mod field_mask;
pub mod generator;
pub mod graph;
pub mod hooks;
pub mod model;
pub mod naming;
pub mod record;
pub mod scope;
pub mod types;

pub use generator::generate;

#[cfg(test)]
pub(crate) mod tests {
    //! Blog schema shared by the emitter tests

    use proc_macro2::TokenStream;

    use super::generator;
    use super::scope::Scope;
    use crate::config::{MaskCase, PluginConfig};
    use crate::ir::fixtures::*;
    use crate::ir::{
        AssociationDecl, AssociationKind, FieldKind, MutationStrategy, ScalarType, Schema,
    };
    use crate::options::persist::UUID_MESSAGE;

    /// `BlogPost`, `Author`, `Comment`, `Tag`, `Article` and `Note` are
    /// persisted; `Metadata` is not.
    pub fn blog_schema() -> Schema {
        let author = message(
            "Author",
            vec![
                scalar("id", 1, ScalarType::Uint64),
                scalar("name", 2, ScalarType::String),
                optional(scalar("email", 3, ScalarType::String)),
            ],
        );
        let comment = message(
            "Comment",
            vec![
                scalar("id", 1, ScalarType::Uint64),
                scalar("body", 2, ScalarType::String),
                repeated(scalar("flags", 3, ScalarType::String)),
            ],
        );
        let mut label = scalar("label", 2, ScalarType::String);
        label.annotations.column = Some("label_text".into());
        let mut tag = message("Tag", vec![scalar("id", 1, ScalarType::String), label]);
        tag.model.table = Some("labels".into());

        let mut metadata = message(
            "Metadata",
            vec![
                scalar("source", 1, ScalarType::String),
                scalar("revision", 2, ScalarType::Int32),
            ],
        );
        metadata.model.ormable = false;

        let mut status = scalar("status", 7, ScalarType::Bool);
        status.kind = FieldKind::Enum("blog.Status".into());
        let article = message(
            "Article",
            vec![
                message_field("id", 1, UUID_MESSAGE),
                scalar("title", 2, ScalarType::String),
                optional(message_field("writer", 3, "blog.Author")),
                associated(
                    repeated(message_field("comments", 4, "blog.Comment")),
                    AssociationDecl {
                        strategy: MutationStrategy::Replace,
                        ..Default::default()
                    },
                ),
                associated(
                    repeated(message_field("tags", 5, "blog.Tag")),
                    AssociationDecl {
                        kind: Some(AssociationKind::ManyToMany),
                        strategy: MutationStrategy::Append,
                        ..Default::default()
                    },
                ),
                message_field("published_at", 6, "google.protobuf.Timestamp"),
                status,
                repeated(scalar("keywords", 8, ScalarType::String)),
                message_field("meta", 9, "blog.Metadata"),
                optional(scalar("rating", 10, ScalarType::Double)),
            ],
        );
        let note = message("Note", vec![scalar("body", 1, ScalarType::String)]);

        schema(vec![
            blog_post(),
            author,
            comment,
            tag,
            metadata,
            article,
            note,
        ])
    }

    /// Emit `full_name` of the blog schema with `f` and render the tokens
    pub fn tokens(full_name: &str, f: impl FnOnce(&Scope<'_>) -> TokenStream) -> String {
        tokens_with(full_name, MaskCase::Camel, f)
    }

    /// [`tokens`] with a field-mask spelling
    pub fn tokens_with(
        full_name: &str,
        mask_case: MaskCase,
        f: impl FnOnce(&Scope<'_>) -> TokenStream,
    ) -> String {
        let schema = blog_schema();
        let config = PluginConfig {
            mask_case,
            ..PluginConfig::default()
        };
        let models = generator::build_models(&schema).unwrap();
        let scope = Scope {
            schema: &schema,
            config: &config,
            records: &models.records,
            message: schema.message(full_name).unwrap(),
            record: &models.records[full_name],
        };
        f(&scope).to_string()
    }
}
