//! Message types from `persist/types.proto`

/// A UUID in canonical hyphenated form (`persist.types.UUID`).
#[derive(Clone, PartialEq, Eq, Hash, ::prost::Message)]
pub struct Uuid {
    /// Hyphenated UUID text
    #[prost(string, tag = "1")]
    pub value: ::prost::alloc::string::String,
}
