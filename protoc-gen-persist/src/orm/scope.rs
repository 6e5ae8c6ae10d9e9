//! Emission context of one message
//!
//! Generated code for a message refers to its own types by bare name and to
//! types of other packages through `super::` paths, the way prost lays out
//! nested package modules.

use std::collections::HashMap;

use proc_macro2::TokenStream;
use quote::quote;
use syn::Ident;

use super::association::Association;
use super::hooks;
use super::model::RecordModel;
use super::naming;
use crate::config::PluginConfig;
use crate::ir::{MessageSchema, Schema};

/// Everything an emitter needs to know about the message it generates
pub struct Scope<'a> {
    /// The whole schema
    pub schema: &'a Schema,
    /// Plugin parameters
    pub config: &'a PluginConfig,
    /// Record models of every persisted message, by full name
    pub records: &'a HashMap<String, RecordModel>,
    /// Message being generated
    pub message: &'a MessageSchema,
    /// Its record model
    pub record: &'a RecordModel,
}

impl<'a> Scope<'a> {
    /// Path of the runtime crate
    pub fn rt(&self) -> &'a syn::Path {
        &self.config.runtime
    }

    /// The prost message type
    pub fn message_ident(&self) -> Ident {
        naming::type_ident(&self.message.name)
    }

    /// The record type
    pub fn record_ident(&self) -> Ident {
        self.record.record_ident()
    }

    /// The hook trait
    pub fn hooks_ident(&self) -> Ident {
        hooks::trait_ident(&self.message.name)
    }

    /// Record model of another persisted message
    pub fn target(&self, full_name: &str) -> Option<&'a RecordModel> {
        self.records.get(full_name)
    }

    fn relative(&self, target: &RecordModel, ident: &Ident) -> TokenStream {
        naming::path_to(&self.record.package, &target.package, ident)
    }

    /// Path of the prost type of `target`
    pub fn message_path(&self, target: &RecordModel) -> TokenStream {
        self.relative(target, &naming::type_ident(&target.name))
    }

    /// Path of the record type of `target`
    pub fn record_path(&self, target: &RecordModel) -> TokenStream {
        self.relative(target, &target.record_ident())
    }

    /// Path of the hook trait of `target`
    pub fn hooks_path(&self, target: &RecordModel) -> TokenStream {
        self.relative(target, &hooks::trait_ident(&target.name))
    }

    /// Path of a function generated for `target`
    pub fn fn_path(&self, target: &RecordModel, prefix: &str, suffix: &str) -> TokenStream {
        self.relative(target, &naming::fn_ident(prefix, &target.name, suffix))
    }

    /// Associations of this message whose targets have record models
    pub fn associations(&self) -> impl Iterator<Item = (&'a Association, &'a RecordModel)> + '_ {
        self.record
            .associations
            .iter()
            .filter_map(|a| self.target(&a.target).map(|target| (a, target)))
    }

    /// Hook bound of the CRUD operations: this message's hooks plus the hooks
    /// of every associated message, each named once
    pub fn hooks_bound(&self) -> TokenStream {
        let own = self.hooks_ident();
        let mut seen = vec![self.record.message.as_str()];
        let mut bounds = vec![quote!(#own)];
        for (association, target) in self.associations() {
            if seen.contains(&association.target.as_str()) {
                continue;
            }
            seen.push(&association.target);
            bounds.push(self.hooks_path(target));
        }
        quote!(#(#bounds)+* + ?Sized)
    }
}
