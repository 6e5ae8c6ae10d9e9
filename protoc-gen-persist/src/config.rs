//! Plugin parameters
//!
//! protoc hands the plugin everything after `--persist_out=` and before the
//! colon as one comma-separated `key=value` string.

use tracing::warn;

use crate::error::GeneratorError;

/// How field-mask paths spell field names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaskCase {
    /// `PublishedAt`
    #[default]
    Camel,
    /// `published_at`, as written in the schema
    Proto,
}

/// Parsed plugin parameters
#[derive(Debug, Clone)]
pub struct PluginConfig {
    /// Path of the runtime crate in generated code
    pub runtime: syn::Path,
    /// Spelling of field-mask paths
    pub mask_case: MaskCase,
    /// Output file suffix, replacing `.proto`
    pub suffix: String,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            runtime: syn::parse_quote!(::persist_runtime),
            mask_case: MaskCase::default(),
            suffix: ".persist.rs".to_string(),
        }
    }
}

impl PluginConfig {
    /// Parse the protoc parameter string
    pub fn parse(parameter: &str) -> Result<Self, GeneratorError> {
        let mut config = Self::default();
        for part in parameter.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part.split_once('=').unwrap_or((part, ""));
            match key {
                "runtime" => {
                    config.runtime =
                        syn::parse_str(value).map_err(|e| GeneratorError::InvalidParameter {
                            key: key.to_string(),
                            reason: format!("`{}` is not a path: {}", value, e),
                        })?;
                }
                "mask_case" => {
                    config.mask_case = match value {
                        "camel" => MaskCase::Camel,
                        "proto" => MaskCase::Proto,
                        other => {
                            return Err(GeneratorError::InvalidParameter {
                                key: key.to_string(),
                                reason: format!("expected `camel` or `proto`, got `{}`", other),
                            });
                        }
                    };
                }
                "suffix" => {
                    if value.is_empty() {
                        return Err(GeneratorError::InvalidParameter {
                            key: key.to_string(),
                            reason: "suffix cannot be empty".to_string(),
                        });
                    }
                    config.suffix = value.to_string();
                }
                _ => warn!(parameter = part, "ignoring unknown plugin parameter"),
            }
        }
        Ok(config)
    }

    /// Output file name for an input schema file
    pub fn output_name(&self, proto_file: &str) -> String {
        let stem = proto_file.strip_suffix(".proto").unwrap_or(proto_file);
        format!("{}{}", stem, self.suffix)
    }
}
