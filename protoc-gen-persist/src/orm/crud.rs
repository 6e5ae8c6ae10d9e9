//! CRUD emission
//!
//! Every persisted message with a primary key gets eight async operations
//! over a `Store`: create, read, strict update, patch, patch set, delete,
//! delete set and list. Associations are synchronized inline by create and
//! strict update and loaded back by a private helper shared by every
//! operation that returns messages.

use proc_macro2::TokenStream;
use quote::quote;
use syn::Ident;

use super::association::{Association, JoinModel, Link};
use super::hooks;
use super::model::{FieldOrigin, KeyKind, PrimaryKeyModel, RecordField, RecordModel};
use super::naming;
use super::record;
use super::scope::Scope;
use crate::ir::MutationStrategy;

/// CRUD operations of the message in `scope`, or nothing if it has no key
pub fn generate(scope: &Scope<'_>) -> TokenStream {
    let Some(pk) = &scope.record.primary_key else {
        return TokenStream::new();
    };
    let crud = Crud::new(scope, pk);

    let load = crud.load_associations();
    let create = crud.create();
    let read = crud.read();
    let strict_update = crud.strict_update();
    let patch = crud.patch();
    let patch_set = crud.patch_set();
    let delete = crud.delete();
    let delete_set = crud.delete_set();
    let list = crud.list();

    quote! {
        #create
        #read
        #strict_update
        #patch
        #patch_set
        #delete
        #delete_set
        #list
        #load
    }
}

/// One association with everything its emission needs
struct Linked<'a> {
    association: &'a Association,
    target: &'a RecordModel,
    /// Field on the message
    field: Ident,
    /// Local holding the converted records during create and update
    local: Ident,
    target_record: TokenStream,
}

struct Crud<'a> {
    scope: &'a Scope<'a>,
    rt: &'a syn::Path,
    pk: &'a PrimaryKeyModel,
    message: Ident,
    record: Ident,
    hooks_trait: TokenStream,
    bound: TokenStream,
    linked: Vec<Linked<'a>>,
}

impl<'a> Crud<'a> {
    fn new(scope: &'a Scope<'a>, pk: &'a PrimaryKeyModel) -> Self {
        let hooks_ident = scope.hooks_ident();
        let linked = scope
            .associations()
            .filter(|(_, target)| target.primary_key.is_some())
            .map(|(association, target)| Linked {
                association,
                target,
                field: naming::field_ident(&association.field),
                local: naming::ident(&format!("linked_{}", naming::snake(&association.field))),
                target_record: scope.record_path(target),
            })
            .collect();
        Self {
            scope,
            rt: scope.rt(),
            pk,
            message: scope.message_ident(),
            record: scope.record_ident(),
            hooks_trait: quote!(#hooks_ident),
            bound: scope.hooks_bound(),
            linked,
        }
    }

    fn fn_name(&self, prefix: &str, suffix: &str) -> Ident {
        naming::fn_ident(prefix, &self.scope.record.name, suffix)
    }

    fn hook(&self, phase: &str, args: &[TokenStream]) -> TokenStream {
        hooks::call_named(self.rt, &self.hooks_trait, phase, args)
    }

    fn nil_check(&self, input: &Ident) -> TokenStream {
        let rt = self.rt;
        quote! {
            let Some(#input) = #input else {
                return Err(#rt::ArgumentError::NilArgument.into());
            };
        }
    }

    fn empty_check(&self, orm: TokenStream) -> TokenStream {
        let rt = self.rt;
        let record = &self.record;
        quote! {
            if <#record as #rt::Record>::key_is_empty(&#orm) {
                return Err(#rt::ArgumentError::EmptyId.into());
            }
        }
    }

    /// Query matching the row with the key of `orm`
    fn by_key(&self, orm: TokenStream) -> TokenStream {
        let rt = self.rt;
        let record = &self.record;
        let column = &self.pk.column;
        let key = self.pk.ident();
        quote! {
            #rt::Query::<#record>::new()
                .filter(#rt::Condition::eq(#column, #rt::PrimaryKey::to_value(&#orm.#key)))
        }
    }

    fn signature_bounds(&self) -> TokenStream {
        let rt = self.rt;
        let bound = &self.bound;
        quote! {
            where
                S: #rt::Store,
                H: #bound,
        }
    }

    fn has_collections(&self) -> bool {
        self.linked
            .iter()
            .any(|l| !matches!(l.association.link, Link::EmbeddedOne { .. }))
    }

    /// Embedded-one associations under `clear` never carry their target
    fn carried(&self) -> impl Iterator<Item = &Linked<'a>> {
        self.linked.iter().filter(|l| {
            !(matches!(l.association.link, Link::EmbeddedOne { .. })
                && l.association.strategy == MutationStrategy::Clear)
        })
    }

    /// Convert the associated messages of `input` into records
    fn collect_links(&self) -> TokenStream {
        let steps = self.carried().map(|l| {
            let field = &l.field;
            let local = &l.local;
            match l.association.link {
                Link::EmbeddedOne { .. } => quote! {
                    let mut #local = input
                        .#field
                        .as_ref()
                        .map(|value| value.to_orm(ctx, hooks))
                        .transpose()?;
                },
                _ => quote! {
                    let mut #local = input
                        .#field
                        .iter()
                        .map(|value| value.to_orm(ctx, hooks))
                        .collect::<::core::result::Result<::prost::alloc::vec::Vec<_>, _>>()?;
                },
            }
        });
        quote!(#(#steps)*)
    }

    /// Upsert embedded-one targets and point the foreign keys at them
    fn prepare_references(&self) -> TokenStream {
        let rt = self.rt;
        let steps = self.linked.iter().filter_map(|l| {
            let Link::EmbeddedOne {
                foreign_key,
                nullable,
                target_key,
            } = &l.association.link
            else {
                return None;
            };
            let fk = naming::ident(foreign_key);
            if l.association.strategy == MutationStrategy::Clear {
                return Some(quote!(orm.#fk = None;));
            }
            let local = &l.local;
            let target_record = &l.target_record;
            let key = quote!(<#target_record as #rt::Record>::primary_key(target));
            let assign = if target_key.wraps_foreign_key(*nullable) {
                quote!(Some(#key))
            } else {
                key
            };
            let absent = if *nullable {
                quote!(orm.#fk = None)
            } else {
                let name = &l.association.field;
                quote!(return Err(#rt::ArgumentError::MissingAssociation(#name).into()))
            };
            Some(quote! {
                match #local.as_mut() {
                    Some(target) => {
                        store.save(ctx, target).await?;
                        orm.#fk = #assign;
                    }
                    None => #absent,
                }
            })
        });
        quote!(#(#steps)*)
    }

    /// Delete the collection rows the strategies remove; runs before the save
    fn prune_collections(&self) -> TokenStream {
        let rt = self.rt;
        let record = &self.record;
        let parent = quote!(#rt::PrimaryKey::to_value(&<#record as #rt::Record>::primary_key(&orm)));
        let steps: Vec<TokenStream> = self
            .linked
            .iter()
            .filter_map(|l| {
                let strategy = strategy_tokens(rt, l.association.strategy);
                match &l.association.link {
                    Link::EmbeddedOne { .. } => None,
                    Link::HasMany { foreign_key, .. } => {
                        let (_, column) = child_key(l.target, foreign_key);
                        let local = &l.local;
                        Some(quote! {
                            #rt::association::prune_children(
                                ctx,
                                store,
                                #strategy,
                                #column,
                                #parent,
                                #local.as_slice(),
                            )
                            .await?;
                        })
                    }
                    Link::ManyToMany(join) => {
                        let join_ident = record::join_ident(join);
                        let owner_column = &join.owner_column;
                        Some(quote! {
                            #rt::association::prune_links::<_, #join_ident>(
                                ctx,
                                store,
                                #strategy,
                                #owner_column,
                                #parent,
                            )
                            .await?;
                        })
                    }
                }
            })
            .collect();
        if steps.is_empty() {
            return TokenStream::new();
        }
        quote! {
            if !<#record as #rt::Record>::key_is_empty(&orm) {
                #(#steps)*
            }
        }
    }

    /// Store the collections and point them at the saved parent
    fn save_collections(&self) -> TokenStream {
        if !self.has_collections() {
            return TokenStream::new();
        }
        let rt = self.rt;
        let record = &self.record;
        let parent_key = read_key(self.pk.kind, quote!(parent_key));
        let steps = self.linked.iter().filter_map(|l| {
            let strategy = strategy_tokens(rt, l.association.strategy);
            let local = &l.local;
            let target_record = &l.target_record;
            match &l.association.link {
                Link::EmbeddedOne { .. } => None,
                Link::HasMany {
                    foreign_key,
                    nullable,
                    owner_key,
                    ..
                } => {
                    let (fk, _) = child_key(l.target, foreign_key);
                    let value = if owner_key.wraps_foreign_key(*nullable) {
                        quote!(Some(#parent_key))
                    } else {
                        parent_key.clone()
                    };
                    Some(quote! {
                        #rt::association::save_children(
                            ctx,
                            store,
                            #strategy,
                            #local.as_mut_slice(),
                            |child: &mut #target_record| child.#fk = #value,
                        )
                        .await?;
                    })
                }
                Link::ManyToMany(join) => {
                    let link = link_record(rt, join, target_record, &parent_key);
                    Some(quote! {
                        #rt::association::save_links(
                            ctx,
                            store,
                            #strategy,
                            #local.as_mut_slice(),
                            |target: &#target_record| #link,
                        )
                        .await?;
                    })
                }
            }
        });
        quote! {
            let parent_key = <#record as #rt::Record>::primary_key(&orm);
            #(#steps)*
        }
    }

    fn load_fn(&self) -> Ident {
        self.fn_name("load_", "_associations")
    }

    /// Convert `orm` back and fill in its associations
    fn respond(&self, orm: TokenStream, output: &Ident) -> TokenStream {
        if self.linked.is_empty() {
            return quote!(let #output = #orm.to_pb(ctx, hooks)?;);
        }
        let load = self.load_fn();
        quote! {
            let mut #output = #orm.to_pb(ctx, hooks)?;
            #load(ctx, store, hooks, &#orm, &mut #output).await?;
        }
    }

    fn load_associations(&self) -> TokenStream {
        if self.linked.is_empty() {
            return TokenStream::new();
        }
        let rt = self.rt;
        let record = &self.record;
        let message = &self.message;
        let name = self.load_fn();
        let bounds = self.signature_bounds();
        let parent = self.has_collections().then(|| {
            quote! {
                let key = #rt::PrimaryKey::to_value(&<#record as #rt::Record>::primary_key(orm));
            }
        });

        let steps = self.linked.iter().map(|l| {
            let field = &l.field;
            let target_record = &l.target_record;
            let convert = quote! {
                .iter()
                .map(|row| row.to_pb(ctx, hooks))
                .collect::<::core::result::Result<_, _>>()?
            };
            match &l.association.link {
                Link::EmbeddedOne { foreign_key, .. } => {
                    let fk = naming::ident(foreign_key);
                    quote! {
                        object.#field = if #rt::PrimaryKey::is_empty(&orm.#fk) {
                            None
                        } else {
                            #rt::association::load_one::<_, #target_record>(
                                ctx,
                                store,
                                #rt::PrimaryKey::to_value(&orm.#fk),
                            )
                            .await?
                            .map(|row| row.to_pb(ctx, hooks))
                            .transpose()?
                        };
                    }
                }
                Link::HasMany { foreign_key, .. } => {
                    let (_, column) = child_key(l.target, foreign_key);
                    quote! {
                        object.#field = #rt::association::load_children::<_, #target_record>(
                            ctx,
                            store,
                            #column,
                            key.clone(),
                        )
                        .await?
                        #convert;
                    }
                }
                Link::ManyToMany(join) => {
                    let join_ident = record::join_ident(join);
                    let owner_column = &join.owner_column;
                    let target_column = &join.target_column;
                    quote! {
                        object.#field = #rt::association::load_linked::<_, #join_ident, #target_record>(
                            ctx,
                            store,
                            #owner_column,
                            key.clone(),
                            #target_column,
                        )
                        .await?
                        #convert;
                    }
                }
            }
        });

        quote! {
            async fn #name<S, H>(
                ctx: &#rt::Context,
                store: &S,
                hooks: &H,
                orm: &#record,
                object: &mut #message,
            ) -> ::core::result::Result<(), #rt::PersistError>
            #bounds
            {
                #parent
                #(#steps)*
                Ok(())
            }
        }
    }

    fn create(&self) -> TokenStream {
        let rt = self.rt;
        let message = &self.message;
        let name = self.fn_name("default_create_", "");
        let bounds = self.signature_bounds();
        let input = naming::ident("input");
        let nil = self.nil_check(&input);
        let collect = self.collect_links();
        let before = self.hook("before_create", &[quote!(&mut orm)]);
        let prepare = self.prepare_references();
        let save = self.save_collections();
        let after = self.hook("after_create", &[quote!(&orm)]);
        let output = naming::ident("output");
        let respond = self.respond(quote!(orm), &output);

        quote! {
            /// Insert a new row and store its associations.
            pub async fn #name<S, H>(
                ctx: &#rt::Context,
                input: ::core::option::Option<&#message>,
                store: &S,
                hooks: &H,
            ) -> ::core::result::Result<#message, #rt::PersistError>
            #bounds
            {
                #nil
                let mut orm = input.to_orm(ctx, hooks)?;
                #collect
                #before
                #prepare
                store.create(ctx, &mut orm).await?;
                #save
                #after
                #respond
                Ok(#output)
            }
        }
    }

    fn read(&self) -> TokenStream {
        let rt = self.rt;
        let message = &self.message;
        let name = self.fn_name("default_read_", "");
        let bounds = self.signature_bounds();
        let input = naming::ident("input");
        let nil = self.nil_check(&input);
        let empty = self.empty_check(quote!(orm));
        let query = self.by_key(quote!(orm));
        let apply_query = self.hook("before_read_apply_query", &[quote!(&orm), quote!(&mut query)]);
        let find = self.hook("before_read_find", &[quote!(&orm), quote!(&mut query)]);
        let after = self.hook("after_read_find", &[quote!(&mut found)]);
        let output = naming::ident("output");
        let respond = self.respond(quote!(found), &output);

        quote! {
            /// Read the row with the key of `input`.
            ///
            /// An empty key is an argument error; a key matching no row is
            /// `PersistError::NotFound`.
            pub async fn #name<S, H>(
                ctx: &#rt::Context,
                input: ::core::option::Option<&#message>,
                store: &S,
                hooks: &H,
                fields: ::core::option::Option<&#rt::FieldSelection>,
            ) -> ::core::result::Result<#message, #rt::PersistError>
            #bounds
            {
                #nil
                let orm = input.to_orm(ctx, hooks)?;
                #empty
                let mut query = #query;
                #apply_query
                store.apply_field_selection(&mut query, fields)?;
                #find
                let Some(mut found) = store.first(ctx, &query).await? else {
                    return Err(#rt::PersistError::NotFound);
                };
                #after
                #respond
                Ok(#output)
            }
        }
    }

    /// Foreign keys other messages keep on this record survive a full-row save
    fn keep_back_references(&self) -> (TokenStream, TokenStream) {
        let query = self.by_key(quote!(orm));
        let back: Vec<&RecordField> = self.scope.record.back_references().collect();
        if back.is_empty() {
            return (
                quote! {
                    let created = store.count(ctx, &#query.for_update()).await? == 0;
                },
                TokenStream::new(),
            );
        }
        let copies = back.iter().map(|field| {
            let ident = field.ident();
            if field.ty.is_copy() {
                quote!(orm.#ident = locked.#ident;)
            } else {
                quote!(orm.#ident = locked.#ident.clone();)
            }
        });
        (
            quote! {
                let locked = store.first(ctx, &#query.for_update()).await?;
                let created = locked.is_none();
            },
            quote! {
                if let Some(locked) = &locked {
                    #(#copies)*
                }
            },
        )
    }

    fn strict_update(&self) -> TokenStream {
        let rt = self.rt;
        let message = &self.message;
        let name = self.fn_name("default_strict_update_", "");
        let bounds = self.signature_bounds();
        let input = naming::ident("input");
        let nil = self.nil_check(&input);
        let collect = self.collect_links();
        let (lock, restore) = self.keep_back_references();
        let cleanup = self.hook("before_strict_update_cleanup", &[quote!(&mut orm)]);
        let prepare = self.prepare_references();
        let prune = self.prune_collections();
        let before = self.hook("before_strict_update_save", &[quote!(&mut orm)]);
        let save = self.save_collections();
        let after = self.hook("after_strict_update_save", &[quote!(&orm)]);
        let value = naming::ident("value");
        let respond = self.respond(quote!(orm), &value);

        quote! {
            /// Replace the whole row with `input`, creating it if no row has its key.
            ///
            /// The matching row is locked before it is counted, so `created`
            /// is exact even against concurrent writers.
            pub async fn #name<S, H>(
                ctx: &#rt::Context,
                input: ::core::option::Option<&#message>,
                store: &S,
                hooks: &H,
            ) -> ::core::result::Result<#rt::Upserted<#message>, #rt::PersistError>
            #bounds
            {
                #nil
                let mut orm = input.to_orm(ctx, hooks)?;
                #collect
                #lock
                #restore
                #cleanup
                #prepare
                #prune
                #before
                store.save(ctx, &mut orm).await?;
                #save
                #after
                #respond
                Ok(#rt::Upserted { value, created })
            }
        }
    }

    fn patch(&self) -> TokenStream {
        let rt = self.rt;
        let message = &self.message;
        let name = self.fn_name("default_patch_", "");
        let read = self.fn_name("default_read_", "");
        let update = self.fn_name("default_strict_update_", "");
        let apply = self.fn_name("default_apply_field_mask_", "");
        let bounds = self.signature_bounds();
        let input = naming::ident("input");
        let nil = self.nil_check(&input);
        let key = self.pk.ident();
        let key_value = if self.pk.pb_copy {
            quote!(input.#key)
        } else {
            quote!(input.#key.clone())
        };
        let before_read = self.hook("before_patch_read", &[quote!(input), quote!(mask)]);
        let before_apply = self.hook(
            "before_patch_apply_field_mask",
            &[quote!(&current), quote!(input), quote!(mask)],
        );
        let before_save = self.hook(
            "before_patch_save",
            &[quote!(&mut current), quote!(input), quote!(mask)],
        );
        let after_save = self.hook("after_patch_save", &[quote!(&saved), quote!(input), quote!(mask)]);

        quote! {
            /// Read the current state, copy the masked fields of `input` onto it
            /// and save the result with a strict update.
            pub async fn #name<S, H>(
                ctx: &#rt::Context,
                input: ::core::option::Option<&#message>,
                mask: &#rt::FieldMask,
                store: &S,
                hooks: &H,
            ) -> ::core::result::Result<#message, #rt::PersistError>
            #bounds
            {
                #nil
                #before_read
                let key_only = #message {
                    #key: #key_value,
                    ..::core::default::Default::default()
                };
                let mut current = #read(ctx, Some(&key_only), store, hooks, None).await?;
                #before_apply
                #apply(&mut current, input, &mask.paths, "");
                #before_save
                let saved = #update(ctx, Some(&current), store, hooks).await?.value;
                #after_save
                Ok(saved)
            }
        }
    }

    fn patch_set(&self) -> TokenStream {
        let rt = self.rt;
        let message = &self.message;
        let name = self.fn_name("default_patch_set_", "");
        let patch = self.fn_name("default_patch_", "");
        let bounds = self.signature_bounds();
        let objects = naming::ident("objects");
        let nil = self.nil_check(&objects);

        quote! {
            /// Patch each object with the mask at the same position.
            ///
            /// Stops at the first failure. Objects patched before it stay saved.
            pub async fn #name<S, H>(
                ctx: &#rt::Context,
                objects: ::core::option::Option<&[#message]>,
                masks: &[#rt::FieldMask],
                store: &S,
                hooks: &H,
            ) -> ::core::result::Result<::prost::alloc::vec::Vec<#message>, #rt::PersistError>
            #bounds
            {
                #nil
                if objects.len() != masks.len() {
                    return Err(#rt::ArgumentError::BadRepeatedFieldMask {
                        masks: masks.len(),
                        objects: objects.len(),
                    }
                    .into());
                }
                let mut results = ::prost::alloc::vec::Vec::with_capacity(objects.len());
                for (object, mask) in objects.iter().zip(masks) {
                    results.push(#patch(ctx, Some(object), mask, store, hooks).await?);
                }
                Ok(results)
            }
        }
    }

    fn delete(&self) -> TokenStream {
        let rt = self.rt;
        let message = &self.message;
        let name = self.fn_name("default_delete_", "");
        let bounds = self.signature_bounds();
        let input = naming::ident("input");
        let nil = self.nil_check(&input);
        let empty = self.empty_check(quote!(orm));
        let query = self.by_key(quote!(orm));
        let before = self.hook("before_delete", &[quote!(&orm), quote!(&mut query)]);
        let after = self.hook("after_delete", &[quote!(&orm)]);

        quote! {
            /// Delete the row with the key of `input`.
            pub async fn #name<S, H>(
                ctx: &#rt::Context,
                input: ::core::option::Option<&#message>,
                store: &S,
                hooks: &H,
            ) -> ::core::result::Result<(), #rt::PersistError>
            #bounds
            {
                #nil
                let orm = input.to_orm(ctx, hooks)?;
                #empty
                let mut query = #query;
                #before
                store.delete(ctx, &query).await?;
                #after
                Ok(())
            }
        }
    }

    fn delete_set(&self) -> TokenStream {
        let rt = self.rt;
        let message = &self.message;
        let record = &self.record;
        let name = self.fn_name("default_delete_", "_set");
        let bounds = self.signature_bounds();
        let objects = naming::ident("objects");
        let nil = self.nil_check(&objects);
        let empty = self.empty_check(quote!(orm));
        let column = &self.pk.column;
        let key = self.pk.ident();
        let before = self.hook("before_delete_set", &[quote!(objects), quote!(&mut query)]);
        let after = self.hook("after_delete_set", &[quote!(objects)]);

        quote! {
            /// Delete every row keyed by `objects` in one batch.
            ///
            /// Every key is validated first; one empty key deletes nothing.
            pub async fn #name<S, H>(
                ctx: &#rt::Context,
                objects: ::core::option::Option<&[#message]>,
                store: &S,
                hooks: &H,
            ) -> ::core::result::Result<(), #rt::PersistError>
            #bounds
            {
                #nil
                let mut keys = ::prost::alloc::vec::Vec::with_capacity(objects.len());
                for object in objects {
                    let orm = object.to_orm(ctx, hooks)?;
                    #empty
                    keys.push(#rt::PrimaryKey::to_value(&orm.#key));
                }
                let mut query = #rt::Query::<#record>::new()
                    .filter(#rt::Condition::is_in(#column, keys));
                #before
                store.delete(ctx, &query).await?;
                #after
                Ok(())
            }
        }
    }

    fn list(&self) -> TokenStream {
        let rt = self.rt;
        let message = &self.message;
        let record = &self.record;
        let name = self.fn_name("default_list_", "");
        let bounds = self.signature_bounds();
        let column = &self.pk.column;
        let apply_query = self.hook("before_list_apply_query", &[quote!(&mut query)]);
        let find = self.hook("before_list_find", &[quote!(&mut query)]);
        let after = self.hook("after_list_find", &[quote!(&mut found)]);
        let object = naming::ident("object");
        let respond = self.respond(quote!(row), &object);

        quote! {
            /// Every row matching the collection operators, with ties broken
            /// by primary key.
            pub async fn #name<S, H>(
                ctx: &#rt::Context,
                store: &S,
                hooks: &H,
                operators: &#rt::CollectionOperators,
            ) -> ::core::result::Result<::prost::alloc::vec::Vec<#message>, #rt::PersistError>
            #bounds
            {
                let mut query = #rt::Query::<#record>::new();
                #apply_query
                store.apply_collection_operators(&mut query, operators)?;
                #find
                let query = query.order_by(#column);
                let mut found = store.find(ctx, &query).await?;
                #after
                let mut results = ::prost::alloc::vec::Vec::with_capacity(found.len());
                for row in &found {
                    #respond
                    results.push(#object);
                }
                Ok(results)
            }
        }
    }
}

fn strategy_tokens(rt: &syn::Path, strategy: MutationStrategy) -> TokenStream {
    match strategy {
        MutationStrategy::Default => quote!(#rt::MutationStrategy::Default),
        MutationStrategy::Replace => quote!(#rt::MutationStrategy::Replace),
        MutationStrategy::Append => quote!(#rt::MutationStrategy::Append),
        MutationStrategy::Clear => quote!(#rt::MutationStrategy::Clear),
    }
}

/// A key value that may be used more than once
fn read_key(kind: KeyKind, value: TokenStream) -> TokenStream {
    if kind == KeyKind::String {
        quote!(#value.clone())
    } else {
        value
    }
}

/// Record field and column holding a has-many foreign key on the child
fn child_key(child: &RecordModel, foreign_key: &str) -> (Ident, String) {
    child
        .fields
        .iter()
        .find(|f| match &f.origin {
            FieldOrigin::BackReference { .. } => f.name == foreign_key,
            FieldOrigin::Schema { field } => field == foreign_key,
            FieldOrigin::OwnedForeignKey { .. } => false,
        })
        .map(|f| (f.ident(), f.column.clone()))
        .unwrap_or_else(|| (naming::ident(foreign_key), foreign_key.to_string()))
}

/// Join record linking the saved parent to `target`
fn link_record(
    rt: &syn::Path,
    join: &JoinModel,
    target_record: &TokenStream,
    parent_key: &TokenStream,
) -> TokenStream {
    let join_ident = record::join_ident(join);
    let owner_field = naming::ident(&join.owner_column);
    let target_field = naming::ident(&join.target_column);
    quote! {
        #join_ident {
            #owner_field: #parent_key,
            #target_field: <#target_record as #rt::Record>::primary_key(target),
        }
    }
}
