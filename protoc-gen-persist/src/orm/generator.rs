//! Code generation orchestration
//!
//! Resolves the whole schema once, then emits every persisted message of
//! each requested file in dependency order and renders the result.

use std::collections::HashMap;

use proc_macro2::TokenStream;
use prost_types::compiler::code_generator_response::File;
use quote::quote;
use tracing::debug;

use super::association::{self, Resolution};
use super::model::{self, RecordModel};
use super::scope::Scope;
use super::{conversion, crud, field_mask, hooks, record};
use crate::config::PluginConfig;
use crate::error::{GeneratorError, SchemaError};
use crate::ir::{Schema, SchemaFile};

/// First line of every generated file
pub const GENERATED_HEADER: &str = "// @generated by protoc-gen-persist. DO NOT EDIT.";

/// Record models of a schema, with the order they are emitted in
#[derive(Debug, Clone)]
pub struct Models {
    /// Resolved associations and dependency order
    pub resolution: Resolution,
    /// Record model of every persisted message, by full name
    pub records: HashMap<String, RecordModel>,
}

/// Resolve keys and associations, then build every record model
pub fn build_models(schema: &Schema) -> Result<Models, SchemaError> {
    let mut keys = HashMap::new();
    for message in schema.messages().filter(|m| m.model.ormable) {
        if let Some(key) = model::primary_key(message)? {
            keys.insert(message.full_name.clone(), key);
        }
    }

    let resolution = association::resolve(schema, &keys)?;
    let mut records = HashMap::new();
    for name in &resolution.order {
        let Some(message) = schema.message(name) else {
            continue;
        };
        let record = model::build(schema, message, &keys, &resolution)?;
        records.insert(name.clone(), record);
    }
    Ok(Models {
        resolution,
        records,
    })
}

/// Generate one output file per requested schema file with persisted messages
pub fn generate(schema: &Schema, config: &PluginConfig) -> Result<Vec<File>, GeneratorError> {
    let models = build_models(schema)?;
    let mut files = Vec::new();

    for file in schema.files.iter().filter(|f| f.generate) {
        let mut items = Vec::new();
        for name in &models.resolution.order {
            let Some(message) = schema.message(name).filter(|m| m.file == file.name) else {
                continue;
            };
            let record = &models.records[name];
            debug!(message = %name, table = %record.table, "generating message");
            let scope = Scope {
                schema,
                config,
                records: &models.records,
                message,
                record,
            };
            items.push(generate_message(&scope));
        }

        if items.is_empty() {
            debug!(file = %file.name, "no persisted messages");
            continue;
        }
        debug!(file = %file.name, messages = items.len(), "rendering file");
        files.push(render(config, file, items)?);
    }

    Ok(files)
}

/// Everything emitted for one message
fn generate_message(scope: &Scope<'_>) -> TokenStream {
    let message = scope.message_ident();
    let record_ident = scope.record_ident();
    let types = hooks::HookTypes {
        rt: scope.rt(),
        message: &message,
        record: &record_ident,
    };

    let record = record::generate(scope);
    let conversion = conversion::generate(scope);
    let hooks = hooks::generate_trait(
        &scope.hooks_ident(),
        &types,
        scope.record.primary_key.is_some(),
    );
    let field_mask = field_mask::generate(scope);
    let crud = crud::generate(scope);

    quote! {
        #record
        #conversion
        #hooks
        #field_mask
        #crud
    }
}

fn render(
    config: &PluginConfig,
    file: &SchemaFile,
    items: Vec<TokenStream>,
) -> Result<File, GeneratorError> {
    let tokens = quote!(#(#items)*);
    let parsed = syn::parse2::<syn::File>(tokens)
        .map_err(|e| GeneratorError::CodeGenError(format!("{}: {}", file.name, e)))?;
    let content = format!(
        "{}\n// source: {}\n\n{}",
        GENERATED_HEADER,
        file.name,
        prettyplease::unparse(&parsed)
    );

    Ok(File {
        name: Some(config.output_name(&file.name)),
        content: Some(content),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ScalarType;
    use crate::ir::fixtures::*;
    use crate::orm::tests::blog_schema;

    #[test]
    fn test_one_file_per_schema_file() {
        let files = generate(&blog_schema(), &PluginConfig::default()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name.as_deref(), Some("blog.persist.rs"));

        let content = files[0].content.as_deref().unwrap();
        assert!(content.starts_with(GENERATED_HEADER));
        assert!(content.contains("// source: blog.proto"));
        assert!(content.contains("pub struct BlogPostOrm {"));
        assert!(content.contains("pub trait ArticleHooks: Send + Sync {"));
        assert!(content.contains("pub async fn default_patch_article<S, H>("));
        assert!(!content.contains("MetadataOrm"));
    }

    #[test]
    fn test_dependencies_are_emitted_first() {
        let files = generate(&blog_schema(), &PluginConfig::default()).unwrap();
        let content = files[0].content.as_deref().unwrap();
        let position = |name: &str| content.find(&format!("pub struct {} {{", name)).unwrap();
        assert!(position("AuthorOrm") < position("ArticleOrm"));
        assert!(position("ArticleOrm") < position("CommentOrm"));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let first = generate(&blog_schema(), &PluginConfig::default()).unwrap();
        let second = generate(&blog_schema(), &PluginConfig::default()).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            build_models(&blog_schema()).unwrap().records,
            build_models(&blog_schema()).unwrap().records
        );
    }

    #[test]
    fn test_files_without_persisted_messages_are_skipped() {
        let mut schema = blog_schema();
        for message in &mut schema.files[0].messages {
            message.model.ormable = false;
        }
        assert!(generate(&schema, &PluginConfig::default()).unwrap().is_empty());

        let mut schema = blog_schema();
        schema.files[0].generate = false;
        assert!(generate(&schema, &PluginConfig::default()).unwrap().is_empty());
    }

    #[test]
    fn test_schema_errors_abort_generation() {
        let parent = message(
            "Parent",
            vec![
                scalar("id", 1, ScalarType::Uint64),
                message_field("child", 2, "blog.Child"),
            ],
        );
        let child = message(
            "Child",
            vec![
                scalar("id", 1, ScalarType::Uint64),
                message_field("parent", 2, "blog.Parent"),
            ],
        );
        let err = generate(&schema(vec![parent, child]), &PluginConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            GeneratorError::Schema(SchemaError::CyclicAssociation { .. })
        ));
    }
}
