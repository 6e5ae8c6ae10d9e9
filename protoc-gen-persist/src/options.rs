//! Rust types for the persistence options in `proto/persist/options.proto`
//!
//! Extension values are decoded from the request's descriptors into these
//! types, mirroring the layout prost-build gives the `persist` package.

#![allow(missing_docs)]

pub mod persist {
    /// Message-level persistence options.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ModelOptions {
        #[prost(bool, tag = "1")]
        pub ormable: bool,
        #[prost(string, tag = "2")]
        pub table: ::prost::alloc::string::String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct AssociationOptions {
        #[prost(enumeration = "AssociationKind", tag = "1")]
        pub kind: i32,
        #[prost(enumeration = "MutationStrategy", tag = "2")]
        pub strategy: i32,
        #[prost(bool, optional, tag = "3")]
        pub nullable: ::core::option::Option<bool>,
        #[prost(string, tag = "4")]
        pub foreign_key: ::prost::alloc::string::String,
        #[prost(string, tag = "5")]
        pub association_foreign_key: ::prost::alloc::string::String,
        #[prost(string, tag = "6")]
        pub join_table: ::prost::alloc::string::String,
    }

    /// Field-level persistence options.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct FieldOptions {
        #[prost(string, tag = "1")]
        pub column: ::prost::alloc::string::String,
        #[prost(bool, tag = "2")]
        pub primary_key: bool,
        #[prost(bool, tag = "3")]
        pub drop: bool,
        #[prost(message, optional, tag = "4")]
        pub association: ::core::option::Option<AssociationOptions>,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum MutationStrategy {
        Default = 0,
        Replace = 1,
        Append = 2,
        Clear = 3,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum AssociationKind {
        Unspecified = 0,
        EmbeddedOne = 1,
        HasMany = 2,
        ManyToMany = 3,
    }

    /// `(persist.model)` extension name
    pub const MODEL_EXTENSION: &str = "persist.model";
    /// `(persist.field)` extension name
    pub const FIELD_EXTENSION: &str = "persist.field";
    /// Full name of the UUID message
    pub const UUID_MESSAGE: &str = "persist.types.UUID";
}
