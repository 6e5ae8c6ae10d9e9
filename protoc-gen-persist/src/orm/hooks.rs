//! Hook catalog
//!
//! Every extension point of the generated code is listed in [`CATALOG`].
//! The per-message hook trait and every call site are produced from it, so
//! a phase cannot be declared without being called or called without being
//! declared.

use proc_macro2::TokenStream;
use quote::quote;
use syn::Ident;

use super::naming;

/// Operation a phase belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Stage {
    Conversion,
    Create,
    Read,
    Delete,
    DeleteSet,
    StrictUpdate,
    Patch,
    List,
}

/// Argument of a hook method, after the context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    /// `&Message`
    Message,
    /// `&mut Message`
    MessageMut,
    /// `&[Message]`
    Messages,
    /// `&MessageOrm`
    Record,
    /// `&mut MessageOrm`
    RecordMut,
    /// `&mut Vec<MessageOrm>`
    RecordsMut,
    /// `&mut Query<MessageOrm>`
    QueryMut,
    /// `&FieldMask`
    Mask,
}

/// One named extension point
#[derive(Debug, Clone, Copy)]
pub struct Phase {
    /// Method name on the hook trait
    pub name: &'static str,
    /// Operation the phase belongs to
    pub stage: Stage,
    /// Parameter names and types, after `ctx`
    pub params: &'static [(&'static str, Param)],
    /// Doc line of the trait method
    pub doc: &'static str,
}

macro_rules! phase {
    ($name:ident, $stage:ident, [$($param:ident: $kind:ident),*], $doc:literal) => {
        Phase {
            name: stringify!($name),
            stage: Stage::$stage,
            params: &[$((stringify!($param), Param::$kind)),*],
            doc: $doc,
        }
    };
}

/// Every hook phase, in the order the trait declares them
pub const CATALOG: &[Phase] = &[
    phase!(before_to_orm, Conversion, [from: Message, to: RecordMut],
        "Runs before the message fields are copied into the record."),
    phase!(after_to_orm, Conversion, [from: Message, to: RecordMut],
        "Runs after the message fields are copied into the record."),
    phase!(before_to_pb, Conversion, [from: Record, to: MessageMut],
        "Runs before the record fields are copied into the message."),
    phase!(after_to_pb, Conversion, [from: Record, to: MessageMut],
        "Runs after the record fields are copied into the message."),
    phase!(before_create, Create, [record: RecordMut],
        "Runs before the row is inserted."),
    phase!(after_create, Create, [record: Record],
        "Runs after the row and its associations are stored."),
    phase!(before_read_apply_query, Read, [record: Record, query: QueryMut],
        "Runs before the field selection is applied to the read query."),
    phase!(before_read_find, Read, [record: Record, query: QueryMut],
        "Runs right before the read query is executed."),
    phase!(after_read_find, Read, [record: RecordMut],
        "Runs on the row found by a read."),
    phase!(before_delete, Delete, [record: Record, query: QueryMut],
        "Runs before the row is deleted."),
    phase!(after_delete, Delete, [record: Record],
        "Runs after the row is deleted."),
    phase!(before_delete_set, DeleteSet, [objects: Messages, query: QueryMut],
        "Runs before the batched delete, once every key is validated."),
    phase!(after_delete_set, DeleteSet, [objects: Messages],
        "Runs after the batched delete."),
    phase!(before_strict_update_cleanup, StrictUpdate, [record: RecordMut],
        "Runs after the row is locked and before associations are pruned."),
    phase!(before_strict_update_save, StrictUpdate, [record: RecordMut],
        "Runs right before the row is saved."),
    phase!(after_strict_update_save, StrictUpdate, [record: Record],
        "Runs after the row and its associations are saved."),
    phase!(before_patch_read, Patch, [patch: Message, mask: Mask],
        "Runs before the current state is read."),
    phase!(before_patch_apply_field_mask, Patch, [current: Message, patch: Message, mask: Mask],
        "Runs before the masked fields are merged into the current state."),
    phase!(before_patch_save, Patch, [merged: MessageMut, patch: Message, mask: Mask],
        "Runs on the merged object before it is saved."),
    phase!(after_patch_save, Patch, [saved: Message, patch: Message, mask: Mask],
        "Runs after the merged object is saved."),
    phase!(before_list_apply_query, List, [query: QueryMut],
        "Runs before the collection operators are applied."),
    phase!(before_list_find, List, [query: QueryMut],
        "Runs right before the list query is executed."),
    phase!(after_list_find, List, [records: RecordsMut],
        "Runs on the rows found by a list, before conversion."),
];

/// Look up a phase by name
pub fn phase(name: &str) -> Option<&'static Phase> {
    CATALOG.iter().find(|p| p.name == name)
}

/// Types the hook signatures refer to
pub struct HookTypes<'a> {
    /// Path of the runtime crate
    pub rt: &'a syn::Path,
    /// The prost message type
    pub message: &'a Ident,
    /// Its record type
    pub record: &'a Ident,
}

impl Param {
    fn tokens(self, types: &HookTypes<'_>) -> TokenStream {
        let HookTypes {
            rt,
            message,
            record,
        } = types;
        match self {
            Param::Message => quote!(&#message),
            Param::MessageMut => quote!(&mut #message),
            Param::Messages => quote!(&[#message]),
            Param::Record => quote!(&#record),
            Param::RecordMut => quote!(&mut #record),
            Param::RecordsMut => quote!(&mut ::prost::alloc::vec::Vec<#record>),
            Param::QueryMut => quote!(&mut #rt::Query<#record>),
            Param::Mask => quote!(&#rt::FieldMask),
        }
    }
}

/// Identifier of the hook trait of a message, e.g. `BlogPostHooks`
pub fn trait_ident(message: &str) -> Ident {
    naming::ident(&format!("{}Hooks", naming::camel(message)))
}

/// Declare the hook trait of a message and implement it for `NoHooks`
///
/// Messages without a primary key have no CRUD operations and get only the
/// conversion phases.
pub fn generate_trait(trait_name: &Ident, types: &HookTypes<'_>, crud: bool) -> TokenStream {
    let rt = types.rt;
    let methods = CATALOG
        .iter()
        .filter(|phase| crud || phase.stage == Stage::Conversion)
        .map(|phase| {
            let name = naming::ident(phase.name);
            let doc = phase.doc;
            let params = phase.params.iter().map(|(param, kind)| {
                let param = naming::ident(&format!("_{}", param));
                let ty = kind.tokens(types);
                quote!(#param: #ty)
            });
            quote! {
                #[doc = #doc]
                fn #name(&self, _ctx: &#rt::Context, #(#params),*) -> #rt::HookResult {
                    Ok(())
                }
            }
        });
    let message = types.message;
    let doc = format!(
        " Extension points of the `{}` operations. Every method defaults to doing nothing.",
        message
    );

    quote! {
        #[doc = #doc]
        pub trait #trait_name: Send + Sync {
            #(#methods)*
        }

        impl #trait_name for #rt::NoHooks {}
    }
}

/// Call `phase` on `hooks`, propagating its error unchanged
pub fn call(
    rt: &syn::Path,
    hooks_trait: &TokenStream,
    phase: &Phase,
    args: &[TokenStream],
) -> TokenStream {
    debug_assert_eq!(phase.params.len(), args.len(), "arity of {}", phase.name);
    let name = naming::ident(phase.name);
    quote! {
        #hooks_trait::#name(hooks, ctx, #(#args),*).map_err(#rt::PersistError::Hook)?;
    }
}

/// [`call`] by phase name
///
/// The name must come from [`CATALOG`].
pub(crate) fn call_named(
    rt: &syn::Path,
    hooks_trait: &TokenStream,
    name: &str,
    args: &[TokenStream],
) -> TokenStream {
    match phase(name) {
        Some(phase) => call(rt, hooks_trait, phase, args),
        None => unreachable!("hook phase `{}` is not in the catalog", name),
    }
}
