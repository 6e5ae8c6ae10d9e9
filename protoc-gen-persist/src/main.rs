//! protoc-gen-persist
//!
//! Reads a `CodeGeneratorRequest` from stdin and writes the response to
//! stdout. Logs go to stderr, filtered by `PROTOC_GEN_PERSIST_LOG`.

#![deny(missing_docs)]

use std::io::{self, Read, Write};
use std::process::ExitCode;

use prost::Message;
use prost_types::compiler::CodeGeneratorResponse;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    // stdout carries the response, so logs go to stderr
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("PROTOC_GEN_PERSIST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let mut input = Vec::new();
    io::stdin().read_to_end(&mut input)?;

    let (response, code) = match protoc_gen_persist::generate_from_bytes(&input) {
        Ok(response) => (response, ExitCode::SUCCESS),
        Err(e) => {
            error!(error = %e, "generation failed");
            let response = CodeGeneratorResponse {
                error: Some(e.to_string()),
                supported_features: Some(protoc_gen_persist::FEATURE_PROTO3_OPTIONAL),
                ..Default::default()
            };
            (response, ExitCode::FAILURE)
        }
    };

    io::stdout().write_all(&response.encode_to_vec())?;
    Ok(code)
}
