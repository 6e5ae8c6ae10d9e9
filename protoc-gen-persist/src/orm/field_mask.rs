//! Field-mask merge emission
//!
//! `default_apply_field_mask_<m>(patchee, patcher, paths, prefix)` copies
//! every field of `patcher` whose path is listed onto `patchee`. Paths are
//! matched against schema field names, never record columns. Unknown paths
//! are ignored.

use proc_macro2::TokenStream;
use quote::quote;

use super::naming;
use super::scope::Scope;
use super::types;
use crate::config::MaskCase;
use crate::ir::FieldSchema;

/// A path segment and the prost field it writes
struct Entry {
    segment: String,
    field: syn::Ident,
    copy: bool,
    /// Merge function of the persisted message the field holds, for
    /// singular fields that accept `Segment.` sub-paths
    nested: Option<TokenStream>,
}

/// Path segment naming `name`
pub fn segment(name: &str, case: MaskCase) -> String {
    match case {
        MaskCase::Camel => naming::camel(name),
        MaskCase::Proto => name.to_string(),
    }
}

fn entries(scope: &Scope<'_>) -> Vec<Entry> {
    let case = scope.config.mask_case;
    let mut entries: Vec<Entry> = Vec::new();
    for field in &scope.message.fields {
        if let Some(oneof) = &field.oneof {
            let segment = segment(oneof, case);
            if entries.iter().all(|e| e.segment != segment) {
                entries.push(Entry {
                    segment,
                    field: naming::field_ident(oneof),
                    copy: false,
                    nested: None,
                });
            }
            continue;
        }
        entries.push(Entry {
            segment: segment(&field.name, case),
            field: naming::field_ident(&field.name),
            copy: types::message_field_is_copy(field),
            nested: nested_merge(scope, field),
        });
    }
    entries
}

fn nested_merge(scope: &Scope<'_>, field: &FieldSchema) -> Option<TokenStream> {
    if field.is_repeated() {
        return None;
    }
    let target = scope.target(field.message_type()?)?;
    Some(scope.fn_path(target, "default_apply_field_mask_", ""))
}

/// Merge function of the message in `scope`
pub fn generate(scope: &Scope<'_>) -> TokenStream {
    let message = scope.message_ident();
    let name = naming::fn_ident("default_apply_field_mask_", &scope.message.name, "");
    let entries = entries(scope);

    let signature = quote! {
        /// Copy the fields of `patcher` named by `paths` onto `patchee`.
        ///
        /// Each path is `prefix` followed by a field name; `Field.` sub-paths
        /// merge into nested persisted messages.
        pub fn #name(
            patchee: &mut #message,
            patcher: &#message,
            paths: &[::prost::alloc::string::String],
            prefix: &str,
        )
    };
    if entries.is_empty() {
        return quote! {
            #signature {
                let _ = (patchee, patcher, paths, prefix);
            }
        };
    }

    let mut flags = Vec::new();
    let mut nested = Vec::new();
    let mut arms = Vec::new();
    for entry in &entries {
        let segment = &entry.segment;
        let field = &entry.field;
        let value = if entry.copy {
            quote!(patcher.#field)
        } else {
            quote!(patcher.#field.clone())
        };
        let Some(merge) = &entry.nested else {
            arms.push(quote!(#segment => patchee.#field = #value,));
            continue;
        };

        let flag = naming::ident(&format!(
            "updated_{}",
            field.to_string().trim_start_matches("r#")
        ));
        let sub = format!("{}.", segment);
        let sub_prefix = format!("{{}}{}.", segment);
        nested.push(quote! {
            if !#flag && field.starts_with(#sub) {
                #flag = true;
                match &patcher.#field {
                    Some(source) => #merge(
                        patchee.#field.get_or_insert_with(::core::default::Default::default),
                        source,
                        &paths[i..],
                        &::prost::alloc::format!(#sub_prefix, prefix),
                    ),
                    None => patchee.#field = None,
                }
                continue;
            }
        });
        arms.push(quote! {
            #segment => {
                #flag = true;
                patchee.#field = #value;
            }
        });
        flags.push(flag);
    }

    let iterate = if flags.is_empty() {
        quote!(for path in paths)
    } else {
        quote!(for (i, path) in paths.iter().enumerate())
    };

    quote! {
        #signature {
            #(let mut #flags = false;)*
            #iterate {
                let Some(field) = path.strip_prefix(prefix) else {
                    continue;
                };
                #(#nested)*
                match field {
                    #(#arms)*
                    _ => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::tests::{tokens, tokens_with};

    #[test]
    fn test_scalar_fields_match_camel_paths() {
        let code = tokens("blog.BlogPost", generate);
        assert!(code.contains("pub fn default_apply_field_mask_blog_post (patchee : & mut BlogPost , patcher : & BlogPost , paths : & [:: prost :: alloc :: string :: String] , prefix : & str ,)"));
        assert!(code.contains("\"Id\" => patchee . id = patcher . id ,"));
        assert!(code.contains("\"Title\" => patchee . title = patcher . title . clone () ,"));
        assert!(code.contains("for path in paths {"));
        assert!(code.contains("let Some (field) = path . strip_prefix (prefix) else { continue ; } ;"));
        assert!(code.contains("_ => { }"));
    }

    #[test]
    fn test_proto_case_paths() {
        let code = tokens_with("blog.Article", MaskCase::Proto, generate);
        assert!(code.contains("\"published_at\" => patchee . published_at = patcher . published_at . clone () ,"));
        assert!(!code.contains("\"PublishedAt\""));
    }

    #[test]
    fn test_nested_persisted_message_recurses_once() {
        let code = tokens("blog.Article", generate);
        assert!(code.contains("let mut updated_writer = false ;"));
        assert!(code.contains("for (i , path) in paths . iter () . enumerate ()"));
        assert!(code.contains("if ! updated_writer && field . starts_with (\"Writer.\")"));
        assert!(code.contains(
            "Some (source) => default_apply_field_mask_author (patchee . writer . get_or_insert_with (:: core :: default :: Default :: default) , source , & paths [i ..] , & :: prost :: alloc :: format ! (\"{}Writer.\" , prefix) ,)"
        ));
        assert!(code.contains("None => patchee . writer = None ,"));
        assert!(code.contains("\"Writer\" => { updated_writer = true ; patchee . writer = patcher . writer . clone () ; }"));
    }

    #[test]
    fn test_collections_and_serialized_fields_copy_whole() {
        let code = tokens("blog.Article", generate);
        assert!(code.contains("\"Comments\" => patchee . comments = patcher . comments . clone () ,"));
        assert!(code.contains("\"Meta\" => patchee . meta = patcher . meta . clone () ,"));
        assert!(code.contains("\"Rating\" => patchee . rating = patcher . rating ,"));
        assert!(!code.contains("updated_meta"));
        assert!(!code.contains("updated_comments"));
    }
}
