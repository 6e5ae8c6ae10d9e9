//! Error types for code generation
//!
//! `SchemaError` covers everything wrong with the input schema itself and is
//! always fatal. `GeneratorError` wraps it together with plumbing failures.

/// Error type for code generation
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// The schema cannot be turned into persistence bindings
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A plugin parameter has an unusable value
    #[error("invalid plugin parameter `{key}`: {reason}")]
    InvalidParameter {
        /// Parameter key
        key: String,
        /// What is wrong with it
        reason: String,
    },

    /// Failed to decode the request or its descriptors
    #[error("decode error: {0}")]
    DecodeError(String),

    /// Generated tokens did not form a valid Rust file
    #[error("code generation error: {0}")]
    CodeGenError(String),
}

/// A defect in the input schema, reported with the offending names
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// A cycle of associations with no nullable foreign key to break it
    #[error(
        "cyclic association: `{from}` depends on `{to}` through field `{field}` and no nullable foreign key breaks the cycle"
    )]
    CyclicAssociation {
        /// Message holding the unbreakable edge
        from: String,
        /// Message the edge points at
        to: String,
        /// Field that declares the edge
        field: String,
    },

    /// An association whose settings contradict each other or the field
    #[error("contradictory association on `{message}.{field}`: {reason}")]
    ContradictoryAssociation {
        /// Owning message
        message: String,
        /// Declaring field
        field: String,
        /// The contradiction
        reason: String,
    },

    /// A field type with no storage representation
    #[error("field `{message}.{field}` has type {ty} which cannot be stored; mark it `drop` to exclude it")]
    UnmappableType {
        /// Owning message
        message: String,
        /// Field name
        field: String,
        /// Description of the type
        ty: String,
    },

    /// A persistence annotation that cannot be honored
    #[error("malformed annotation on `{target}`: {reason}")]
    MalformedAnnotation {
        /// Annotated message or field
        target: String,
        /// What is wrong
        reason: String,
    },

    /// An association points at a message without a primary key
    #[error("`{message}` has no primary key but is used by association `{owner}.{field}`")]
    MissingPrimaryKey {
        /// Message lacking a key
        message: String,
        /// Message declaring the association
        owner: String,
        /// Field declaring the association
        field: String,
    },
}

impl SchemaError {
    /// Shorthand for [`SchemaError::MalformedAnnotation`].
    pub fn malformed(target: impl Into<String>, reason: impl Into<String>) -> Self {
        SchemaError::MalformedAnnotation {
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for [`SchemaError::ContradictoryAssociation`].
    pub fn contradictory(
        message: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        SchemaError::ContradictoryAssociation {
            message: message.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }
}
