//! Storage record emission
//!
//! Emits the record struct of a message, its `Record` implementation, and
//! the join records of its many-to-many associations.

use proc_macro2::TokenStream;
use quote::quote;

use super::association::JoinModel;
use super::model::{KeyKind, RecordModel};
use super::naming;
use super::scope::Scope;

/// Record struct, table binding and join records of the message in `scope`
pub fn generate(scope: &Scope<'_>) -> TokenStream {
    let rt = scope.rt();
    let record = scope.record;
    let ident = scope.record_ident();
    let doc = format!(" Storage record of `{}`.", record.message);

    let fields = record.fields.iter().map(|field| {
        let name = field.ident();
        let ty = field.ty.tokens(rt);
        quote!(pub #name: #ty)
    });

    let table = &record.table;
    let binding = match &record.primary_key {
        Some(_) => record_impl(scope),
        None => quote! {
            impl #ident {
                /// Table the record lives in
                pub const TABLE_NAME: &'static str = #table;
            }
        },
    };
    let joins = record.joins().map(|join| join_record(rt, record, join));

    quote! {
        #[doc = #doc]
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct #ident {
            #(#fields,)*
        }

        #binding

        #(#joins)*
    }
}

fn record_impl(scope: &Scope<'_>) -> TokenStream {
    let rt = scope.rt();
    let record = scope.record;
    let Some(pk) = &record.primary_key else {
        return TokenStream::new();
    };
    let ident = scope.record_ident();
    let table = &record.table;
    let pk_column = &pk.column;
    let pk_ident = pk.ident();
    let key_type = pk.tokens(rt);
    let key = if pk.kind == KeyKind::String {
        quote!(self.#pk_ident.clone())
    } else {
        quote!(self.#pk_ident)
    };
    let empty = pk.kind.emptiness().test(quote!(self.#pk_ident));

    let columns = record.fields.iter().map(|f| &f.column);
    let arms = record.fields.iter().map(|field| {
        let column = &field.column;
        let name = field.ident();
        let value = if field.ty.is_copy() {
            quote!(self.#name)
        } else {
            quote!(self.#name.clone())
        };
        quote!(#column => ::core::option::Option::Some(#rt::Value::from(#value)))
    });
    let resets = record.fields.iter().map(|field| {
        let column = &field.column;
        let name = field.ident();
        quote!(#column => self.#name = ::core::default::Default::default())
    });

    quote! {
        impl #rt::Record for #ident {
            type Key = #key_type;

            const TABLE_NAME: &'static str = #table;
            const PRIMARY_KEY: &'static str = #pk_column;
            const COLUMNS: &'static [&'static str] = &[#(#columns),*];

            fn primary_key(&self) -> Self::Key {
                #key
            }

            fn set_primary_key(&mut self, key: Self::Key) {
                self.#pk_ident = key;
            }

            fn column(&self, column: &str) -> ::core::option::Option<#rt::Value> {
                match column {
                    #(#arms,)*
                    _ => ::core::option::Option::None,
                }
            }

            fn reset_column(&mut self, column: &str) -> bool {
                match column {
                    #(#resets,)*
                    _ => return false,
                }
                true
            }

            fn key_is_empty(&self) -> bool {
                #empty
            }
        }
    }
}

/// Identifier of a join record
pub fn join_ident(join: &JoinModel) -> syn::Ident {
    naming::ident(&join.name)
}

fn join_record(rt: &syn::Path, owner: &RecordModel, join: &JoinModel) -> TokenStream {
    let ident = join_ident(join);
    let doc = format!(
        " Join record linking `{}` to its associated rows.",
        owner.message
    );
    let table = &join.table;
    let owner_column = &join.owner_column;
    let target_column = &join.target_column;
    let owner_field = naming::ident(owner_column);
    let target_field = naming::ident(target_column);
    let owner_type = join.owner_key.key_type().tokens(rt);
    let target_type = join.target_key.key_type().tokens(rt);
    let read = |kind: KeyKind, field: &syn::Ident| {
        if kind == KeyKind::String {
            quote!(self.#field.clone())
        } else {
            quote!(self.#field)
        }
    };
    let owner_value = read(join.owner_key, &owner_field);
    let target_value = read(join.target_key, &target_field);

    quote! {
        #[doc = #doc]
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct #ident {
            pub #owner_field: #owner_type,
            pub #target_field: #target_type,
        }

        impl #rt::Record for #ident {
            type Key = (#owner_type, #target_type);

            const TABLE_NAME: &'static str = #table;
            const PRIMARY_KEY: &'static str = #owner_column;
            const COLUMNS: &'static [&'static str] = &[#owner_column, #target_column];

            fn primary_key(&self) -> Self::Key {
                (#owner_value, #target_value)
            }

            fn set_primary_key(&mut self, key: Self::Key) {
                (self.#owner_field, self.#target_field) = key;
            }

            fn column(&self, column: &str) -> ::core::option::Option<#rt::Value> {
                match column {
                    #owner_column => ::core::option::Option::Some(#rt::Value::from(#owner_value)),
                    #target_column => ::core::option::Option::Some(#rt::Value::from(#target_value)),
                    _ => ::core::option::Option::None,
                }
            }

            fn reset_column(&mut self, column: &str) -> bool {
                match column {
                    #owner_column => self.#owner_field = ::core::default::Default::default(),
                    #target_column => self.#target_field = ::core::default::Default::default(),
                    _ => return false,
                }
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::tests::tokens;

    #[test]
    fn test_record_struct_and_binding() {
        let code = tokens("blog.BlogPost", generate);
        assert!(code.contains("pub struct BlogPostOrm { pub id : u64 ,"));
        assert!(code.contains("pub title : :: prost :: alloc :: string :: String ,"));
        assert!(code.contains("impl :: persist_runtime :: Record for BlogPostOrm"));
        assert!(code.contains("type Key = u64 ;"));
        assert!(code.contains("const TABLE_NAME : & 'static str = \"blog_posts\" ;"));
        assert!(code.contains(
            "const COLUMNS : & 'static [& 'static str] = & [\"id\" , \"title\" , \"author\"] ;"
        ));
        assert!(code.contains("fn key_is_empty (& self) -> bool { self . id == 0 }"));
        assert!(code.contains(
            "\"title\" => self . title = :: core :: default :: Default :: default () ,"
        ));
        assert!(code.contains("_ => return false , } true"));
        assert!(code.contains(
            "\"author\" => :: core :: option :: Option :: Some (:: persist_runtime :: Value :: from (self . author . clone ()))"
        ));
    }

    #[test]
    fn test_uuid_key_and_join_record() {
        let code = tokens("blog.Article", generate);
        assert!(code.contains(
            "type Key = :: core :: option :: Option < :: persist_runtime :: uuid :: Uuid > ;"
        ));
        assert!(code.contains("self . id . is_none_or (| id | id . is_nil ())"));
        assert!(code.contains("pub writer_id : :: core :: option :: Option < u64 > ,"));
        assert!(code.contains(
            "pub meta : :: core :: option :: Option < :: prost :: alloc :: vec :: Vec < u8 > > ,"
        ));
        assert!(code.contains("pub struct ArticleTagsJoin {"));
        assert!(code.contains("const TABLE_NAME : & 'static str = \"article_tags\" ;"));
        assert!(code.contains("const PRIMARY_KEY : & 'static str = \"article_id\" ;"));
        assert!(code.contains("(self . article_id , self . tag_id . clone ())"));
    }

    #[test]
    fn test_back_reference_columns() {
        let code = tokens("blog.Comment", generate);
        assert!(code.contains(
            "pub article_id : :: core :: option :: Option < :: persist_runtime :: uuid :: Uuid > ,"
        ));
        assert!(code.contains("\"article_id\" => :: core :: option :: Option :: Some (:: persist_runtime :: Value :: from (self . article_id))"));
    }

    #[test]
    fn test_keyless_record_gets_table_constant() {
        let code = tokens("blog.Note", generate);
        assert!(code.contains("pub const TABLE_NAME : & 'static str = \"notes\" ;"));
        assert!(!code.contains("Record for NoteOrm"));
    }
}
