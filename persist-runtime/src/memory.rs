//! In-memory [`Store`] for tests and examples
//!
//! Rows are kept per table behind a single `RwLock`, which also makes
//! `lock_for_update` trivially satisfied. Numeric and UUID keys are assigned
//! from a store-wide sequence on insert. The sequence never falls behind an
//! explicit numeric key. Selections reset the unselected columns of each
//! returned row.

use std::any::Any;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use async_trait::async_trait;
use tracing::trace;

use crate::context::Context;
use crate::error::PersistError;
use crate::query::{Condition, FieldSelection, Query};
use crate::record::{PrimaryKey, Record, Value};
use crate::store::Store;

type Row = Box<dyn Any + Send + Sync>;

/// Errors raised by [`MemoryStore`]
#[derive(Debug, thiserror::Error)]
pub enum MemoryStoreError {
    /// A query named a column the record does not have.
    #[error("table `{table}` has no column `{column}`")]
    UnknownColumn {
        /// Table queried
        table: &'static str,
        /// Column requested
        column: String,
    },

    /// An insert collided with an existing key.
    #[error("duplicate key in table `{table}`")]
    DuplicateKey {
        /// Table written
        table: &'static str,
    },

    /// The record's key type cannot be generated and none was given.
    #[error("table `{table}` requires an explicit primary key")]
    MissingKey {
        /// Table written
        table: &'static str,
    },

    /// A previous writer panicked while holding the lock.
    #[error("store lock poisoned")]
    Poisoned,
}

/// A [`Store`] that keeps every table in memory.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<&'static str, Vec<Row>>>,
    sequence: AtomicU64,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently in `R`'s table.
    pub fn len<R: Record>(&self) -> usize {
        self.tables
            .read()
            .map(|tables| tables.get(R::TABLE_NAME).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    fn assign_key<R: Record>(&self, record: &mut R) -> Result<(), PersistError> {
        if !record.key_is_empty() {
            self.observe_key(&record.primary_key().to_value());
            return Ok(());
        }
        let sequence = self.sequence.fetch_add(1, AtomicOrdering::SeqCst) + 1;
        let key = R::Key::generate(sequence).ok_or_else(|| {
            PersistError::store(MemoryStoreError::MissingKey {
                table: R::TABLE_NAME,
            })
        })?;
        record.set_primary_key(key);
        Ok(())
    }

    /// Keep generated numeric keys clear of keys chosen by callers.
    fn observe_key(&self, key: &Value) {
        let taken = match key {
            Value::UInt(n) => *n,
            Value::Int(n) => u64::try_from(*n).unwrap_or(0),
            _ => return,
        };
        self.sequence.fetch_max(taken, AtomicOrdering::SeqCst);
    }

    fn select<R: Record>(
        rows: Option<&Vec<Row>>,
        conditions: &[Condition],
    ) -> Result<Vec<(usize, R)>, PersistError> {
        let mut selected = Vec::new();
        for (index, row) in rows.into_iter().flatten().enumerate() {
            let Some(record) = row.downcast_ref::<R>() else {
                continue;
            };
            if matches_all(record, conditions)? {
                selected.push((index, record.clone()));
            }
        }
        Ok(selected)
    }
}

fn column_of<R: Record>(record: &R, column: &str) -> Result<Value, PersistError> {
    record.column(column).ok_or_else(|| {
        PersistError::store(MemoryStoreError::UnknownColumn {
            table: R::TABLE_NAME,
            column: column.to_string(),
        })
    })
}

fn matches_all<R: Record>(record: &R, conditions: &[Condition]) -> Result<bool, PersistError> {
    for condition in conditions {
        if !condition.matches(&column_of(record, condition.column())?) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Reset every column outside `selection`. The primary key is always kept.
fn project<R: Record>(
    records: &mut [R],
    selection: &FieldSelection,
) -> Result<(), PersistError> {
    if let Some(unknown) = selection
        .fields
        .iter()
        .find(|field| !R::COLUMNS.contains(&field.as_str()))
    {
        return Err(PersistError::store(MemoryStoreError::UnknownColumn {
            table: R::TABLE_NAME,
            column: unknown.clone(),
        }));
    }
    let dropped: Vec<&str> = R::COLUMNS
        .iter()
        .copied()
        .filter(|column| {
            *column != R::PRIMARY_KEY && !selection.fields.iter().any(|f| f == column)
        })
        .collect();
    for record in records {
        for column in &dropped {
            record.reset_column(column);
        }
    }
    Ok(())
}

fn poisoned<T>(_: T) -> PersistError {
    PersistError::store(MemoryStoreError::Poisoned)
}

#[async_trait]
impl Store for MemoryStore {
    async fn create<R: Record>(&self, ctx: &Context, record: &mut R) -> Result<(), PersistError> {
        ctx.check()?;
        self.assign_key(record)?;
        let mut tables = self.tables.write().map_err(poisoned)?;
        let rows = tables.entry(R::TABLE_NAME).or_default();
        let key = record.primary_key().to_value();
        let duplicate = rows
            .iter()
            .filter_map(|row| row.downcast_ref::<R>())
            .any(|existing| existing.primary_key().to_value() == key);
        if duplicate {
            return Err(PersistError::store(MemoryStoreError::DuplicateKey {
                table: R::TABLE_NAME,
            }));
        }
        rows.push(Box::new(record.clone()));
        trace!(table = R::TABLE_NAME, ?key, "created");
        Ok(())
    }

    async fn save<R: Record>(&self, ctx: &Context, record: &mut R) -> Result<(), PersistError> {
        ctx.check()?;
        self.assign_key(record)?;
        let mut tables = self.tables.write().map_err(poisoned)?;
        let rows = tables.entry(R::TABLE_NAME).or_default();
        let key = record.primary_key().to_value();
        let position = rows.iter().position(|row| {
            row.downcast_ref::<R>()
                .is_some_and(|existing| existing.primary_key().to_value() == key)
        });
        match position {
            Some(index) => rows[index] = Box::new(record.clone()),
            None => rows.push(Box::new(record.clone())),
        }
        trace!(table = R::TABLE_NAME, ?key, "saved");
        Ok(())
    }

    async fn find<R: Record>(
        &self,
        ctx: &Context,
        query: &Query<R>,
    ) -> Result<Vec<R>, PersistError> {
        ctx.check()?;
        let tables = self.tables.read().map_err(poisoned)?;
        let mut found: Vec<R> = Self::select::<R>(tables.get(R::TABLE_NAME), &query.conditions)?
            .into_iter()
            .map(|(_, record)| record)
            .collect();
        drop(tables);

        if let Some(probe) = found.first() {
            for key in &query.order_by {
                column_of(probe, &key.column)?;
            }
        }
        found.sort_by(|a, b| {
            for key in &query.order_by {
                let ordering = a
                    .column(&key.column)
                    .partial_cmp(&b.column(&key.column))
                    .unwrap_or(Ordering::Equal);
                let ordering = if key.descending {
                    ordering.reverse()
                } else {
                    ordering
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });

        if let Some(page) = query.pagination {
            let rows = found.into_iter().skip(page.offset);
            found = match page.limit {
                Some(limit) => rows.take(limit).collect(),
                None => rows.collect(),
            };
        }
        if let Some(selection) = &query.selection {
            project(&mut found, selection)?;
        }
        Ok(found)
    }

    async fn count<R: Record>(&self, ctx: &Context, query: &Query<R>) -> Result<u64, PersistError> {
        ctx.check()?;
        let tables = self.tables.read().map_err(poisoned)?;
        let selected = Self::select::<R>(tables.get(R::TABLE_NAME), &query.conditions)?;
        Ok(selected.len() as u64)
    }

    async fn delete<R: Record>(
        &self,
        ctx: &Context,
        query: &Query<R>,
    ) -> Result<u64, PersistError> {
        ctx.check()?;
        let mut tables = self.tables.write().map_err(poisoned)?;
        let Some(rows) = tables.get_mut(R::TABLE_NAME) else {
            return Ok(0);
        };
        let doomed: Vec<usize> = Self::select::<R>(Some(&*rows), &query.conditions)?
            .into_iter()
            .map(|(index, _)| index)
            .collect();
        for index in doomed.iter().rev() {
            rows.remove(*index);
        }
        trace!(table = R::TABLE_NAME, removed = doomed.len(), "deleted");
        Ok(doomed.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{CollectionOperators, Pagination, SortKey};

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Book {
        id: u64,
        title: String,
        rank: i32,
    }

    impl Record for Book {
        type Key = u64;
        const TABLE_NAME: &'static str = "books";
        const PRIMARY_KEY: &'static str = "id";
        const COLUMNS: &'static [&'static str] = &["id", "title", "rank"];

        fn primary_key(&self) -> u64 {
            self.id
        }

        fn set_primary_key(&mut self, key: u64) {
            self.id = key;
        }

        fn column(&self, column: &str) -> Option<Value> {
            match column {
                "id" => Some(Value::from(self.id)),
                "title" => Some(Value::from(self.title.clone())),
                "rank" => Some(Value::from(self.rank)),
                _ => None,
            }
        }

        fn reset_column(&mut self, column: &str) -> bool {
            match column {
                "id" => self.id = 0,
                "title" => self.title.clear(),
                "rank" => self.rank = 0,
                _ => return false,
            }
            true
        }
    }

    fn book(title: &str, rank: i32) -> Book {
        Book {
            id: 0,
            title: title.to_string(),
            rank,
        }
    }

    async fn seeded() -> (MemoryStore, Context) {
        let store = MemoryStore::new();
        let ctx = Context::new();
        for (title, rank) in [("b", 2), ("a", 1), ("c", 2)] {
            store.create(&ctx, &mut book(title, rank)).await.unwrap();
        }
        (store, ctx)
    }

    #[tokio::test]
    async fn test_create_assigns_keys() {
        let (store, ctx) = seeded().await;
        let all = store.find(&ctx, &Query::<Book>::new().order_by("id")).await.unwrap();
        assert_eq!(all.iter().map(|b| b.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(store.len::<Book>(), 3);

        let mut duplicate = all[0].clone();
        let err = store.create(&ctx, &mut duplicate).await.unwrap_err();
        assert!(err.to_string().contains("duplicate key"));
    }

    #[tokio::test]
    async fn test_generated_keys_skip_explicit_ones() {
        let store = MemoryStore::new();
        let ctx = Context::new();
        let mut chosen = Book {
            id: 2,
            ..book("chosen", 0)
        };
        store.save(&ctx, &mut chosen).await.unwrap();

        let mut next = book("next", 0);
        store.create(&ctx, &mut next).await.unwrap();
        assert_eq!(next.id, 3);

        let mut explicit = Book {
            id: 10,
            ..book("explicit", 0)
        };
        store.create(&ctx, &mut explicit).await.unwrap();
        let mut after = book("after", 0);
        store.create(&ctx, &mut after).await.unwrap();
        assert_eq!(after.id, 11);
        assert_eq!(store.len::<Book>(), 4);
    }

    #[tokio::test]
    async fn test_selection_projects_columns() {
        let (store, ctx) = seeded().await;
        let mut query = Query::<Book>::new().filter(Condition::eq("title", "b"));
        let fields = FieldSelection {
            fields: vec!["title".to_string()],
        };
        store.apply_field_selection(&mut query, Some(&fields)).unwrap();

        let found = store.first(&ctx, &query).await.unwrap().unwrap();
        assert_eq!(found.title, "b");
        assert_eq!(found.rank, 0);
        assert_ne!(found.id, 0);

        query.selection = Some(FieldSelection {
            fields: vec!["missing".to_string()],
        });
        let err = store.find(&ctx, &query).await.unwrap_err();
        assert!(err.to_string().contains("no column `missing`"));
    }

    #[tokio::test]
    async fn test_save_replaces_by_key() {
        let (store, ctx) = seeded().await;
        let mut first = store
            .first(&ctx, &Query::<Book>::new().filter(Condition::eq("id", 1u64)))
            .await
            .unwrap()
            .unwrap();
        first.title = "b, revised".into();
        store.save(&ctx, &mut first).await.unwrap();
        assert_eq!(store.len::<Book>(), 3);

        let again = store
            .first(&ctx, &Query::<Book>::new().filter(Condition::eq("id", 1u64)))
            .await
            .unwrap();
        assert_eq!(again.map(|b| b.title), Some("b, revised".to_string()));
    }

    #[tokio::test]
    async fn test_ordering_and_pagination() {
        let (store, ctx) = seeded().await;
        let mut query = Query::<Book>::new();
        let operators = CollectionOperators {
            sorting: vec![SortKey::desc("rank")],
            pagination: Some(Pagination {
                offset: 1,
                limit: Some(2),
            }),
            ..Default::default()
        };
        store.apply_collection_operators(&mut query, &operators).unwrap();
        let query = query.order_by("id");

        let page = store.find(&ctx, &query).await.unwrap();
        assert_eq!(
            page.iter().map(|b| b.title.as_str()).collect::<Vec<_>>(),
            vec!["c", "a"]
        );
    }

    #[tokio::test]
    async fn test_unknown_column_is_a_store_error() {
        let (store, ctx) = seeded().await;
        let query = Query::<Book>::new().filter(Condition::eq("missing", 1u64));
        let err = store.find(&ctx, &query).await.unwrap_err();
        assert!(matches!(err, PersistError::Store(_)));
    }

    #[tokio::test]
    async fn test_delete_and_count() {
        let (store, ctx) = seeded().await;
        let ranked_two = Query::<Book>::new().filter(Condition::eq("rank", 2));
        assert_eq!(store.count(&ctx, &ranked_two).await.unwrap(), 2);
        assert_eq!(store.delete(&ctx, &ranked_two).await.unwrap(), 2);
        assert_eq!(store.len::<Book>(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_context() {
        let store = MemoryStore::new();
        let ctx = Context::new();
        ctx.cancel();
        let err = store.create(&ctx, &mut book("x", 0)).await.unwrap_err();
        assert!(matches!(err, PersistError::Cancelled));
        assert_eq!(store.len::<Book>(), 0);
    }
}
