//! persist-demo
//!
//! The message types of `proto/blog.proto` as prost lays them out, with the
//! protoc-gen-persist bindings for them included alongside.

pub mod blog {
    #![allow(missing_docs)]

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct BlogPost {
        #[prost(uint64, tag = "1")]
        pub id: u64,
        #[prost(string, tag = "2")]
        pub title: ::prost::alloc::string::String,
        #[prost(string, tag = "3")]
        pub author: ::prost::alloc::string::String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Author {
        #[prost(uint64, tag = "1")]
        pub id: u64,
        #[prost(string, tag = "2")]
        pub name: ::prost::alloc::string::String,
        #[prost(string, optional, tag = "3")]
        pub email: ::core::option::Option<::prost::alloc::string::String>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Comment {
        #[prost(uint64, tag = "1")]
        pub id: u64,
        #[prost(string, tag = "2")]
        pub body: ::prost::alloc::string::String,
        #[prost(string, repeated, tag = "3")]
        pub flags: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Tag {
        #[prost(string, tag = "1")]
        pub id: ::prost::alloc::string::String,
        #[prost(string, tag = "2")]
        pub label: ::prost::alloc::string::String,
    }

    /// Not persisted on its own; stored encoded inside the article row.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Metadata {
        #[prost(string, tag = "1")]
        pub source: ::prost::alloc::string::String,
        #[prost(int32, tag = "2")]
        pub revision: i32,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Article {
        #[prost(message, optional, tag = "1")]
        pub id: ::core::option::Option<::persist_runtime::types::Uuid>,
        #[prost(string, tag = "2")]
        pub title: ::prost::alloc::string::String,
        #[prost(message, optional, tag = "3")]
        pub writer: ::core::option::Option<Author>,
        #[prost(message, repeated, tag = "4")]
        pub comments: ::prost::alloc::vec::Vec<Comment>,
        #[prost(message, repeated, tag = "5")]
        pub tags: ::prost::alloc::vec::Vec<Tag>,
        #[prost(message, optional, tag = "6")]
        pub published_at: ::core::option::Option<::prost_types::Timestamp>,
        #[prost(enumeration = "Status", tag = "7")]
        pub status: i32,
        #[prost(string, repeated, tag = "8")]
        pub keywords: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
        #[prost(message, optional, tag = "9")]
        pub meta: ::core::option::Option<Metadata>,
        #[prost(double, optional, tag = "10")]
        pub rating: ::core::option::Option<f64>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Reply {
        #[prost(uint64, tag = "1")]
        pub id: u64,
        #[prost(string, tag = "2")]
        pub text: ::prost::alloc::string::String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Thread {
        #[prost(uint64, tag = "1")]
        pub id: u64,
        #[prost(string, tag = "2")]
        pub title: ::prost::alloc::string::String,
        #[prost(message, repeated, tag = "3")]
        pub replies: ::prost::alloc::vec::Vec<Reply>,
        #[prost(message, repeated, tag = "4")]
        pub topics: ::prost::alloc::vec::Vec<Tag>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Digest {
        #[prost(uint64, tag = "1")]
        pub id: u64,
        #[prost(message, repeated, tag = "2")]
        pub entries: ::prost::alloc::vec::Vec<Reply>,
        #[prost(message, repeated, tag = "3")]
        pub featured: ::prost::alloc::vec::Vec<Tag>,
        #[prost(message, repeated, tag = "4")]
        pub hidden: ::prost::alloc::vec::Vec<Tag>,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Status {
        Unspecified = 0,
        Draft = 1,
        Published = 2,
    }

    include!(concat!(env!("OUT_DIR"), "/blog.persist.rs"));
}
