//! Error types surfaced by generated operations
//!
//! Argument errors are raised by the generated code itself. Hook and store
//! errors are opaque and passed through exactly as they were returned.

/// Boxed error carried by hook and store failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Invalid input handed to a generated operation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgumentError {
    /// The operation was called without an input object.
    #[error("nil argument")]
    NilArgument,

    /// The primary key of the input object is empty.
    #[error("primary key is empty")]
    EmptyId,

    /// A patch batch had a different number of masks than objects.
    #[error("patch request had {masks} update masks, but {objects} objects")]
    BadRepeatedFieldMask {
        /// Number of field masks supplied
        masks: usize,
        /// Number of objects supplied
        objects: usize,
    },

    /// A required embedded association was absent.
    #[error("required association `{0}` is missing")]
    MissingAssociation(&'static str),
}

/// Error returned by every generated operation
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// Invalid input
    #[error(transparent)]
    Argument(#[from] ArgumentError),

    /// No row matched the primary key.
    #[error("record not found")]
    NotFound,

    /// A hook returned an error.
    #[error(transparent)]
    Hook(BoxError),

    /// The store returned an error.
    #[error(transparent)]
    Store(BoxError),

    /// A well-known value could not be converted.
    #[error("cannot convert field `{field}`: {reason}")]
    Conversion {
        /// Schema field name
        field: &'static str,
        /// What went wrong
        reason: String,
    },

    /// The execution context was cancelled or timed out.
    #[error("operation cancelled")]
    Cancelled,
}

impl PersistError {
    /// Wrap a store-specific error.
    pub fn store<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        PersistError::Store(Box::new(err))
    }

    /// Build a conversion error for `field`.
    pub fn conversion(field: &'static str, reason: impl std::fmt::Display) -> Self {
        PersistError::Conversion {
            field,
            reason: reason.to_string(),
        }
    }

    /// Whether this is the not-found condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PersistError::NotFound)
    }

    /// The argument error, if this is one.
    pub fn as_argument(&self) -> Option<&ArgumentError> {
        match self {
            PersistError::Argument(err) => Some(err),
            _ => None,
        }
    }
}
