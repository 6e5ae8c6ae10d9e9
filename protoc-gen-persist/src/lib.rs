//! protoc-gen-persist
//!
//! A protoc plugin that turns protobuf messages annotated with
//! `(persist.model)` into storage records, converters, CRUD operations and
//! hook traits built on the `persist-runtime` crate.
//!
//! Usage:
//!   protoc --persist_out=./gen proto/*.proto
//!   protoc --persist_out=runtime=crate::persist,mask_case=proto:./gen proto/*.proto

#![warn(missing_docs)]

pub mod config;
pub mod descriptor;
pub mod error;
pub mod ir;
pub mod options;
pub mod orm;

use prost_types::compiler::CodeGeneratorResponse;
use tracing::{debug, info};

pub use config::PluginConfig;
pub use error::{GeneratorError, SchemaError};

/// `CodeGeneratorResponse.Feature.FEATURE_PROTO3_OPTIONAL`
pub const FEATURE_PROTO3_OPTIONAL: u64 = 1;

/// Run the plugin over an encoded `CodeGeneratorRequest`
pub fn generate_from_bytes(bytes: &[u8]) -> Result<CodeGeneratorResponse, GeneratorError> {
    let request = descriptor::decode_request(bytes)?;
    let config = PluginConfig::parse(request.parameter.as_deref().unwrap_or_default())?;
    debug!(?config, files = request.file_to_generate.len(), "decoded request");

    let pool = descriptor::build_descriptor_pool(&request)?;
    let schema = descriptor::read_schema(&pool, &request)?;
    let file = orm::generate(&schema, &config)?;
    info!(files = file.len(), "generated persistence bindings");

    Ok(CodeGeneratorResponse {
        file,
        supported_features: Some(FEATURE_PROTO3_OPTIONAL),
        ..Default::default()
    })
}
