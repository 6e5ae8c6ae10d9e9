//! Converter emission
//!
//! `to_orm` and `to_pb` copy every mapped field, wrapped in the conversion
//! hooks. Foreign keys and associated messages are left alone; the CRUD
//! layer owns them.

use proc_macro2::TokenStream;
use quote::quote;

use super::hooks;
use super::model::RecordField;
use super::naming;
use super::scope::Scope;
use super::types::{ColumnType, Marshal};

/// Converter pair of the message in `scope`
pub fn generate(scope: &Scope<'_>) -> TokenStream {
    let rt = scope.rt();
    let message = scope.message_ident();
    let record = scope.record_ident();
    let hooks_trait = scope.hooks_ident();
    let hooks_path = quote!(#hooks_trait);

    let columns: Vec<(&RecordField, &str)> = scope
        .record
        .fields
        .iter()
        .filter_map(|f| f.schema_field().map(|name| (f, name)))
        .collect();

    let to_record = columns.iter().map(|(field, name)| {
        let ident = field.ident();
        let value = to_record_value(rt, &field.ty, name);
        quote!(to.#ident = #value;)
    });
    let to_message = columns.iter().map(|(field, name)| {
        let ident = field.ident();
        let value = to_message_value(rt, &field.ty, name);
        quote!(to.#ident = #value;)
    });

    let before_to_orm = hooks::call_named(rt, &hooks_path, "before_to_orm", &[quote!(self), quote!(&mut to)]);
    let after_to_orm = hooks::call_named(rt, &hooks_path, "after_to_orm", &[quote!(self), quote!(&mut to)]);
    let before_to_pb = hooks::call_named(rt, &hooks_path, "before_to_pb", &[quote!(self), quote!(&mut to)]);
    let after_to_pb = hooks::call_named(rt, &hooks_path, "after_to_pb", &[quote!(self), quote!(&mut to)]);

    quote! {
        impl #message {
            /// Convert to the storage record.
            pub fn to_orm<H: #hooks_trait + ?Sized>(
                &self,
                ctx: &#rt::Context,
                hooks: &H,
            ) -> ::core::result::Result<#record, #rt::PersistError> {
                let mut to = #record::default();
                #before_to_orm
                #(#to_record)*
                #after_to_orm
                Ok(to)
            }
        }

        impl #record {
            /// Convert back to the message.
            pub fn to_pb<H: #hooks_trait + ?Sized>(
                &self,
                ctx: &#rt::Context,
                hooks: &H,
            ) -> ::core::result::Result<#message, #rt::PersistError> {
                let mut to = #message::default();
                #before_to_pb
                #(#to_message)*
                #after_to_pb
                Ok(to)
            }
        }
    }
}

fn copy(ty: &ColumnType, ident: &syn::Ident) -> TokenStream {
    if ty.is_copy() {
        quote!(self.#ident)
    } else {
        quote!(self.#ident.clone())
    }
}

/// Expression reading message field `name` as the record column type
fn to_record_value(rt: &syn::Path, ty: &ColumnType, name: &str) -> TokenStream {
    let ident = naming::field_ident(name);
    let convert = quote!(#rt::convert);
    match ty.marshal {
        Marshal::Direct => copy(ty, &ident),
        Marshal::Timestamp => quote! {
            self.#ident
                .as_ref()
                .map(|value| #convert::timestamp_to_datetime(value, #name))
                .transpose()?
        },
        Marshal::Uuid => quote!(#convert::uuid_from_proto(self.#ident.as_ref(), #name)?),
        Marshal::Json => quote!(#convert::encode_json(&self.#ident, #name)?),
        Marshal::Message => quote!(self.#ident.as_ref().map(#convert::encode_message)),
        Marshal::Messages => quote!(#convert::encode_messages(&self.#ident)),
    }
}

/// Expression reading record column `name` as the message field type
fn to_message_value(rt: &syn::Path, ty: &ColumnType, name: &str) -> TokenStream {
    let ident = naming::field_ident(name);
    let convert = quote!(#rt::convert);
    match ty.marshal {
        Marshal::Direct => copy(ty, &ident),
        Marshal::Timestamp => quote!(self.#ident.as_ref().map(#convert::datetime_to_timestamp)),
        Marshal::Uuid => quote!(self.#ident.as_ref().map(#convert::uuid_to_proto)),
        Marshal::Json => quote!(#convert::decode_json(&self.#ident, #name)?),
        Marshal::Message => quote! {
            self.#ident
                .as_deref()
                .map(|column| #convert::decode_message(column, #name))
                .transpose()?
        },
        Marshal::Messages => quote!(#convert::decode_messages(&self.#ident, #name)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::tests::tokens;

    #[test]
    fn test_scalar_fields_copy_both_ways() {
        let code = tokens("blog.BlogPost", generate);
        assert!(code.contains("pub fn to_orm < H : BlogPostHooks + ? Sized >"));
        assert!(code.contains("pub fn to_pb < H : BlogPostHooks + ? Sized >"));
        assert!(code.contains("let mut to = BlogPostOrm :: default () ;"));
        assert!(code.contains("to . id = self . id ;"));
        assert!(code.contains("to . title = self . title . clone () ;"));
        assert!(code.contains("BlogPostHooks :: before_to_orm (hooks , ctx , self , & mut to)"));
        assert!(code.contains("BlogPostHooks :: after_to_pb (hooks , ctx , self , & mut to)"));
    }

    #[test]
    fn test_well_known_and_serialized_fields() {
        let code = tokens("blog.Article", generate);
        assert!(code.contains(
            "to . id = :: persist_runtime :: convert :: uuid_from_proto (self . id . as_ref () , \"id\") ?"
        ));
        assert!(code.contains(
            "to . published_at = self . published_at . as_ref () . map (| value | :: persist_runtime :: convert :: timestamp_to_datetime (value , \"published_at\")) . transpose () ?"
        ));
        assert!(code.contains(
            "to . keywords = :: persist_runtime :: convert :: encode_json (& self . keywords , \"keywords\") ?"
        ));
        assert!(code.contains(
            "to . meta = self . meta . as_deref () . map (| column | :: persist_runtime :: convert :: decode_message (column , \"meta\")) . transpose () ?"
        ));
        assert!(code.contains(
            "to . meta = self . meta . as_ref () . map (:: persist_runtime :: convert :: encode_message) ;"
        ));
        assert!(code.contains(
            "to . published_at = self . published_at . as_ref () . map (:: persist_runtime :: convert :: datetime_to_timestamp) ;"
        ));
        assert!(code.contains("to . rating = self . rating ;"));
        assert!(code.contains("to . id = self . id . as_ref () . map (:: persist_runtime :: convert :: uuid_to_proto) ;"));
    }

    #[test]
    fn test_associations_are_not_converted() {
        let code = tokens("blog.Article", generate);
        assert!(!code.contains("to . writer"));
        assert!(!code.contains("to . comments"));
        assert!(!code.contains("writer_id"));
    }
}
