//! The persistence boundary consumed by generated operations

use async_trait::async_trait;

use crate::context::Context;
use crate::error::PersistError;
use crate::query::{CollectionOperators, FieldSelection, Query};
use crate::record::Record;

/// Result of a strict update: the stored object, and whether the row did not
/// exist before the update (the update created it).
#[derive(Debug, Clone, PartialEq)]
pub struct Upserted<T> {
    /// The object as stored
    pub value: T,
    /// No row matched the primary key before the save
    pub created: bool,
}

/// Row-level store primitives.
///
/// Implementations must check the [`Context`] before doing any work and
/// return [`PersistError::Cancelled`] once it is done. Errors specific to the
/// store are reported as [`PersistError::Store`].
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a new row. An empty key is replaced by a store-assigned one
    /// when the key type supports generation.
    async fn create<R: Record>(&self, ctx: &Context, record: &mut R) -> Result<(), PersistError>;

    /// Insert or replace the row with the record's key.
    async fn save<R: Record>(&self, ctx: &Context, record: &mut R) -> Result<(), PersistError>;

    /// Every row matching the query, in query order.
    async fn find<R: Record>(&self, ctx: &Context, query: &Query<R>)
    -> Result<Vec<R>, PersistError>;

    /// Number of rows matching the query's conditions. Honors
    /// `lock_for_update`.
    async fn count<R: Record>(&self, ctx: &Context, query: &Query<R>) -> Result<u64, PersistError>;

    /// Delete the rows matching the query's conditions and return how many
    /// were removed.
    async fn delete<R: Record>(&self, ctx: &Context, query: &Query<R>)
    -> Result<u64, PersistError>;

    /// The first row matching the query.
    async fn first<R: Record>(
        &self,
        ctx: &Context,
        query: &Query<R>,
    ) -> Result<Option<R>, PersistError> {
        let query = query.clone().limit(1);
        Ok(self.find(ctx, &query).await?.into_iter().next())
    }

    /// Attach a projection to a read.
    fn apply_field_selection<R: Record>(
        &self,
        query: &mut Query<R>,
        fields: Option<&FieldSelection>,
    ) -> Result<(), PersistError> {
        if let Some(fields) = fields {
            query.selection = Some(fields.clone());
        }
        Ok(())
    }

    /// Apply the caller's filter, sort, page and projection to a list query.
    fn apply_collection_operators<R: Record>(
        &self,
        query: &mut Query<R>,
        operators: &CollectionOperators,
    ) -> Result<(), PersistError> {
        query.conditions.extend(operators.filter.iter().cloned());
        query.order_by.extend(operators.sorting.iter().cloned());
        if let Some(pagination) = operators.pagination {
            query.pagination = Some(pagination);
        }
        if let Some(fields) = &operators.fields {
            query.selection = Some(fields.clone());
        }
        Ok(())
    }
}
