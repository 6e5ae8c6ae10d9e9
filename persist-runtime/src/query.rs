//! Queries handed to the store, and the caller's collection operators

use std::fmt;
use std::marker::PhantomData;

use crate::record::{Record, Value};

/// A single predicate on a column.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `column = value`
    Eq(String, Value),
    /// `column <> value`
    Ne(String, Value),
    /// `column < value`
    Lt(String, Value),
    /// `column > value`
    Gt(String, Value),
    /// `column IN (values)`
    In(String, Vec<Value>),
    /// `column NOT IN (values)`
    NotIn(String, Vec<Value>),
    /// `column IS NULL`
    IsNull(String),
}

impl Condition {
    /// `column = value`
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::Eq(column.into(), value.into())
    }

    /// `column IN (values)`
    pub fn is_in(column: impl Into<String>, values: Vec<Value>) -> Self {
        Condition::In(column.into(), values)
    }

    /// `column NOT IN (values)`
    pub fn not_in(column: impl Into<String>, values: Vec<Value>) -> Self {
        Condition::NotIn(column.into(), values)
    }

    /// The column this condition reads.
    pub fn column(&self) -> &str {
        match self {
            Condition::Eq(column, _)
            | Condition::Ne(column, _)
            | Condition::Lt(column, _)
            | Condition::Gt(column, _)
            | Condition::In(column, _)
            | Condition::NotIn(column, _)
            | Condition::IsNull(column) => column,
        }
    }

    /// Evaluate against a column value.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Condition::Eq(_, expected) => value == expected,
            Condition::Ne(_, expected) => value != expected,
            Condition::Lt(_, bound) => value < bound,
            Condition::Gt(_, bound) => value > bound,
            Condition::In(_, values) => values.contains(value),
            Condition::NotIn(_, values) => !values.contains(value),
            Condition::IsNull(_) => value.is_null(),
        }
    }
}

/// One ordering term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// Column to order by
    pub column: String,
    /// Descending instead of ascending
    pub descending: bool,
}

impl SortKey {
    /// Ascending order on `column`.
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }

    /// Descending order on `column`.
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }
}

/// Offset/limit window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pagination {
    /// Rows to skip
    pub offset: usize,
    /// Maximum rows to return
    pub limit: Option<usize>,
}

/// Projection onto a subset of columns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldSelection {
    /// Selected columns
    pub fields: Vec<String>,
}

/// Filter, sort, page and field-selection parameters supplied by the caller
/// of a list operation. Generated code passes them to the store untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CollectionOperators {
    /// Conditions ANDed onto the query
    pub filter: Vec<Condition>,
    /// Ordering, applied before the implicit primary-key ordering
    pub sorting: Vec<SortKey>,
    /// Window
    pub pagination: Option<Pagination>,
    /// Projection
    pub fields: Option<FieldSelection>,
}

/// A query against the table of `R`.
pub struct Query<R> {
    /// Conditions, ANDed together
    pub conditions: Vec<Condition>,
    /// Ordering terms, most significant first
    pub order_by: Vec<SortKey>,
    /// Projection
    pub selection: Option<FieldSelection>,
    /// Window
    pub pagination: Option<Pagination>,
    /// Acquire row locks on the matched rows
    pub lock_for_update: bool,
    record: PhantomData<fn() -> R>,
}

impl<R: Record> Query<R> {
    /// An unfiltered query.
    pub fn new() -> Self {
        Self {
            conditions: Vec::new(),
            order_by: Vec::new(),
            selection: None,
            pagination: None,
            lock_for_update: false,
            record: PhantomData,
        }
    }

    /// Add a condition.
    pub fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Append an ascending order on `column`.
    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order_by.push(SortKey::asc(column));
        self
    }

    /// Request row locks.
    pub fn for_update(mut self) -> Self {
        self.lock_for_update = true;
        self
    }

    /// Restrict to at most `limit` rows.
    pub fn limit(mut self, limit: usize) -> Self {
        let mut page = self.pagination.unwrap_or_default();
        page.limit = Some(limit);
        self.pagination = Some(page);
        self
    }
}

impl<R: Record> Default for Query<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Clone for Query<R> {
    fn clone(&self) -> Self {
        Self {
            conditions: self.conditions.clone(),
            order_by: self.order_by.clone(),
            selection: self.selection.clone(),
            pagination: self.pagination,
            lock_for_update: self.lock_for_update,
            record: PhantomData,
        }
    }
}

impl<R: Record> fmt::Debug for Query<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("table", &R::TABLE_NAME)
            .field("conditions", &self.conditions)
            .field("order_by", &self.order_by)
            .field("selection", &self.selection)
            .field("pagination", &self.pagination)
            .field("lock_for_update", &self.lock_for_update)
            .finish()
    }
}
