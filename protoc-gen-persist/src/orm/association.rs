//! Association resolution
//!
//! Classifies every field that points at a persisted message, decides where
//! its foreign keys live, and orders the persisted messages so that each one
//! comes after the messages it requires.

use std::collections::{HashMap, HashSet};

use heck::ToSnakeCase;
use tracing::debug;

use super::graph::{DependencyGraph, Edge};
use super::model::{KeyKind, PrimaryKeyModel};
use super::naming;
use super::types::{self, Mapping};
use crate::error::SchemaError;
use crate::ir::{
    AssociationDecl, AssociationKind, FieldSchema, MessageSchema, MutationStrategy, Schema,
};

/// A synthesized many-to-many join record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinModel {
    /// Record type name, e.g. `ArticleTagsJoin`
    pub name: String,
    /// Table name
    pub table: String,
    /// Column referencing the owner
    pub owner_column: String,
    /// Column referencing the target
    pub target_column: String,
    /// Key type of the owner
    pub owner_key: KeyKind,
    /// Key type of the target
    pub target_key: KeyKind,
}

/// Storage layout of an association
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Link {
    /// Foreign key on the owner
    EmbeddedOne {
        /// Record field and column holding the target's key
        foreign_key: String,
        /// The field is optional, so the key may be `NULL`
        nullable: bool,
        /// Key type of the target
        target_key: KeyKind,
    },
    /// Foreign key on each child
    HasMany {
        /// Field on the child holding the owner's key
        foreign_key: String,
        /// Whether that field may be `NULL`
        nullable: bool,
        /// The child declares the foreign key as a schema field of its own
        reused: bool,
        /// Key type of the owner
        owner_key: KeyKind,
    },
    /// Join record
    ManyToMany(JoinModel),
}

/// A resolved association
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Association {
    /// Full name of the declaring message
    pub owner: String,
    /// Declaring field
    pub field: String,
    /// Full name of the associated message
    pub target: String,
    /// Update policy
    pub strategy: MutationStrategy,
    /// Storage layout
    pub link: Link,
}

impl Association {
    /// Kind of the association
    pub fn kind(&self) -> AssociationKind {
        match self.link {
            Link::EmbeddedOne { .. } => AssociationKind::EmbeddedOne,
            Link::HasMany { .. } => AssociationKind::HasMany,
            Link::ManyToMany(_) => AssociationKind::ManyToMany,
        }
    }
}

/// Every association of the schema plus the message order
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Associations in declaration order
    pub associations: Vec<Association>,
    /// Persisted messages, dependencies first
    pub order: Vec<String>,
}

impl Resolution {
    /// Associations declared on `owner`
    pub fn owned_by<'a>(&'a self, owner: &'a str) -> impl Iterator<Item = &'a Association> {
        self.associations.iter().filter(move |a| a.owner == owner)
    }

    /// Has-many associations whose children are `child`
    pub fn children_of<'a>(&'a self, child: &'a str) -> impl Iterator<Item = &'a Association> {
        self.associations
            .iter()
            .filter(move |a| a.target == child && matches!(a.link, Link::HasMany { .. }))
    }
}

/// Resolve every association between persisted messages
pub fn resolve(
    schema: &Schema,
    keys: &HashMap<String, PrimaryKeyModel>,
) -> Result<Resolution, SchemaError> {
    let persisted: Vec<&MessageSchema> = schema.messages().filter(|m| m.model.ormable).collect();
    let mut graph = DependencyGraph::new(persisted.iter().map(|m| m.full_name.clone()));
    let mut associations = Vec::new();
    let mut child_keys: HashSet<(String, String)> = HashSet::new();

    for owner in &persisted {
        for field in &owner.fields {
            if field.annotations.drop || field.oneof.is_some() {
                continue;
            }
            let decl = field.annotations.association.as_ref();
            let target = match field.message_type() {
                Some(target) if schema.is_persisted(target) => target,
                _ => {
                    if decl.is_some() {
                        return Err(SchemaError::malformed(
                            format!("{}.{}", owner.full_name, field.name),
                            "associations can only be declared on fields of a persisted message type",
                        ));
                    }
                    continue;
                }
            };
            let Some(target_message) = schema.message(target) else {
                continue;
            };

            let resolver = Resolver {
                schema,
                keys,
                owner,
                field,
                target: target_message,
                decl,
            };
            let association = resolver.resolve(&mut graph, &mut child_keys)?;
            debug!(
                owner = %association.owner,
                field = %association.field,
                kind = ?association.kind(),
                "resolved association"
            );
            associations.push(association);
        }
    }

    let order = graph.order()?;
    Ok(Resolution {
        associations,
        order,
    })
}

struct Resolver<'a> {
    schema: &'a Schema,
    keys: &'a HashMap<String, PrimaryKeyModel>,
    owner: &'a MessageSchema,
    field: &'a FieldSchema,
    target: &'a MessageSchema,
    decl: Option<&'a AssociationDecl>,
}

impl Resolver<'_> {
    fn resolve(
        &self,
        graph: &mut DependencyGraph,
        child_keys: &mut HashSet<(String, String)>,
    ) -> Result<Association, SchemaError> {
        let implicit = if self.field.is_repeated() {
            AssociationKind::HasMany
        } else {
            AssociationKind::EmbeddedOne
        };
        let kind = self.decl.and_then(|d| d.kind).unwrap_or(implicit);
        if (kind == AssociationKind::EmbeddedOne) == self.field.is_repeated() {
            return Err(SchemaError::malformed(
                format!("{}.{}", self.owner.full_name, self.field.name),
                format!(
                    "{:?} association does not match the field's cardinality",
                    kind
                ),
            ));
        }

        let target_key = self.key_of(self.target)?;
        let link = match kind {
            AssociationKind::EmbeddedOne => self.embedded_one(target_key, graph)?,
            AssociationKind::HasMany => {
                let owner_key = self.key_of(self.owner)?;
                self.has_many(owner_key, graph, child_keys)?
            }
            AssociationKind::ManyToMany => {
                let owner_key = self.key_of(self.owner)?;
                self.many_to_many(owner_key, target_key)?
            }
        };

        Ok(Association {
            owner: self.owner.full_name.clone(),
            field: self.field.name.clone(),
            target: self.target.full_name.clone(),
            strategy: self.decl.map(|d| d.strategy).unwrap_or_default(),
            link,
        })
    }

    fn key_of(&self, message: &MessageSchema) -> Result<KeyKind, SchemaError> {
        self.keys
            .get(&message.full_name)
            .map(|pk| pk.kind)
            .ok_or_else(|| SchemaError::MissingPrimaryKey {
                message: message.full_name.clone(),
                owner: self.owner.full_name.clone(),
                field: self.field.name.clone(),
            })
    }

    fn contradictory(&self, reason: impl Into<String>) -> SchemaError {
        SchemaError::contradictory(&self.owner.full_name, &self.field.name, reason)
    }

    fn embedded_one(
        &self,
        target_key: KeyKind,
        graph: &mut DependencyGraph,
    ) -> Result<Link, SchemaError> {
        let foreign_key = self
            .decl
            .and_then(|d| d.foreign_key.clone())
            .unwrap_or_else(|| format!("{}_id", naming::snake(&self.field.name)));
        let nullable = self.field.optionality.is_nullable();

        match self.decl.and_then(|d| d.nullable) {
            Some(true) if !nullable => {
                return Err(self.contradictory(
                    "nullable foreign key on a required field; declare the field optional",
                ));
            }
            Some(false) if nullable => {
                return Err(self.contradictory("non-nullable foreign key on an optional field"));
            }
            _ => {}
        }
        if !nullable && self.decl.is_some_and(|d| d.strategy == MutationStrategy::Clear) {
            return Err(self.contradictory("clear strategy needs a nullable foreign key"));
        }
        let collides = self.owner.fields.iter().any(|f| {
            naming::snake(&f.name) == foreign_key
                || f.annotations.column.as_deref() == Some(foreign_key.as_str())
        });
        if collides {
            return Err(self.contradictory(format!(
                "foreign key `{}` collides with an existing field",
                foreign_key
            )));
        }

        graph.add_edge(Edge {
            from: self.owner.full_name.clone(),
            to: self.target.full_name.clone(),
            field: self.field.name.clone(),
            nullable,
        });
        Ok(Link::EmbeddedOne {
            foreign_key,
            nullable,
            target_key,
        })
    }

    fn has_many(
        &self,
        owner_key: KeyKind,
        graph: &mut DependencyGraph,
        child_keys: &mut HashSet<(String, String)>,
    ) -> Result<Link, SchemaError> {
        let foreign_key = self
            .decl
            .and_then(|d| d.foreign_key.clone())
            .unwrap_or_else(|| format!("{}_id", self.owner.name.to_snake_case()));
        let declared = self.decl.and_then(|d| d.nullable);

        let (nullable, reused) = match self.target.field(&foreign_key) {
            Some(existing) => {
                let nullable = existing.optionality.is_nullable();
                if declared.is_some_and(|d| d != nullable) {
                    return Err(self.contradictory(format!(
                        "nullability of `{}` contradicts the field `{}.{}`",
                        foreign_key, self.target.full_name, existing.name
                    )));
                }
                let expected = owner_key.foreign_key_type(nullable);
                let fits = matches!(
                    types::map_field(self.schema, self.target, existing)?,
                    Mapping::Column(ty) if ty.scalar == expected.scalar && ty.nullable == expected.nullable
                );
                if !fits {
                    return Err(self.contradictory(format!(
                        "field `{}.{}` cannot hold a key of `{}`",
                        self.target.full_name, existing.name, self.owner.full_name
                    )));
                }
                (nullable, true)
            }
            None => (declared.unwrap_or(true), false),
        };

        if !child_keys.insert((self.target.full_name.clone(), foreign_key.clone())) {
            return Err(self.contradictory(format!(
                "foreign key `{}` on `{}` is already used by another association",
                foreign_key, self.target.full_name
            )));
        }

        graph.add_edge(Edge {
            from: self.target.full_name.clone(),
            to: self.owner.full_name.clone(),
            field: self.field.name.clone(),
            nullable,
        });
        Ok(Link::HasMany {
            foreign_key,
            nullable,
            reused,
            owner_key,
        })
    }

    fn many_to_many(&self, owner_key: KeyKind, target_key: KeyKind) -> Result<Link, SchemaError> {
        let owner = self.owner.name.to_snake_case();
        let target = self.target.name.to_snake_case();
        let owner_column = self
            .decl
            .and_then(|d| d.foreign_key.clone())
            .unwrap_or_else(|| format!("{}_id", owner));
        let target_column = self
            .decl
            .and_then(|d| d.association_foreign_key.clone())
            .unwrap_or_else(|| {
                if self.owner.full_name == self.target.full_name {
                    format!("related_{}_id", target)
                } else {
                    format!("{}_id", target)
                }
            });
        if owner_column == target_column {
            return Err(self.contradictory(format!(
                "join columns are both named `{}`",
                owner_column
            )));
        }

        Ok(Link::ManyToMany(JoinModel {
            name: format!(
                "{}{}Join",
                naming::camel(&self.owner.name),
                naming::camel(&self.field.name)
            ),
            table: self
                .decl
                .and_then(|d| d.join_table.clone())
                .unwrap_or_else(|| format!("{}_{}", owner, self.field.name.to_snake_case())),
            owner_column,
            target_column,
            owner_key,
            target_key,
        }))
    }
}
