//! Storage records, their primary keys and column values

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A column value as seen by the store.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub enum Value {
    /// SQL `NULL`
    Null,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Unsigned integer
    UInt(u64),
    /// Floating point
    Float(f64),
    /// Text
    String(String),
    /// Binary
    Bytes(Vec<u8>),
    /// UUID
    Uuid(Uuid),
    /// UTC timestamp
    Timestamp(DateTime<Utc>),
    /// Composite value, used for multi-column keys
    List(Vec<Value>),
}

impl Value {
    /// Whether this is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

macro_rules! value_from {
    ($variant:ident: $($ty:ty => $conv:expr),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    let convert: fn($ty) -> _ = $conv;
                    Value::$variant(convert(value))
                }
            }
        )*
    };
}

value_from!(Bool: bool => |v| v);
value_from!(Int: i32 => i64::from, i64 => |v| v);
value_from!(UInt: u32 => u64::from, u64 => |v| v);
value_from!(Float: f32 => f64::from, f64 => |v| v);
value_from!(String: String => |v| v, &str => str::to_owned);
value_from!(Bytes: Vec<u8> => |v| v);
value_from!(Uuid: Uuid => |v| v);
value_from!(Timestamp: DateTime<Utc> => |v| v);

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// A primary-key type with an explicit emptiness predicate.
///
/// Empty means "this record is not identified yet": zero for numeric keys,
/// the empty string for text keys, and null (or the nil UUID) for generated
/// identifiers.
pub trait PrimaryKey: Clone + Send + Sync + 'static {
    /// Whether the key identifies nothing.
    fn is_empty(&self) -> bool;

    /// The key as a column value.
    fn to_value(&self) -> Value;

    /// A fresh key for a store that assigns identifiers, if this key type
    /// supports generation. `sequence` is a store-wide counter starting at 1.
    fn generate(sequence: u64) -> Option<Self>;
}

macro_rules! numeric_key {
    ($($ty:ty),*) => {
        $(
            impl PrimaryKey for $ty {
                fn is_empty(&self) -> bool {
                    *self == 0
                }

                fn to_value(&self) -> Value {
                    Value::from(*self)
                }

                fn generate(sequence: u64) -> Option<Self> {
                    <$ty>::try_from(sequence).ok()
                }
            }
        )*
    };
}

numeric_key!(u32, u64, i32, i64);

impl PrimaryKey for String {
    fn is_empty(&self) -> bool {
        self.is_empty()
    }

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }

    fn generate(_sequence: u64) -> Option<Self> {
        None
    }
}

impl PrimaryKey for Uuid {
    fn is_empty(&self) -> bool {
        self.is_nil()
    }

    fn to_value(&self) -> Value {
        Value::Uuid(*self)
    }

    fn generate(_sequence: u64) -> Option<Self> {
        Some(Uuid::new_v4())
    }
}

/// Nullable key, e.g. a UUID column or a nullable foreign key.
impl<K: PrimaryKey> PrimaryKey for Option<K> {
    fn is_empty(&self) -> bool {
        self.as_ref().is_none_or(PrimaryKey::is_empty)
    }

    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, PrimaryKey::to_value)
    }

    fn generate(sequence: u64) -> Option<Self> {
        K::generate(sequence).map(Some)
    }
}

/// Composite key of a join record.
impl<A: PrimaryKey, B: PrimaryKey> PrimaryKey for (A, B) {
    fn is_empty(&self) -> bool {
        self.0.is_empty() || self.1.is_empty()
    }

    fn to_value(&self) -> Value {
        Value::List(vec![self.0.to_value(), self.1.to_value()])
    }

    fn generate(_sequence: u64) -> Option<Self> {
        None
    }
}

/// A storage record bound to a table.
pub trait Record: Clone + Send + Sync + 'static {
    /// Primary-key type
    type Key: PrimaryKey;

    /// Table the record lives in
    const TABLE_NAME: &'static str;

    /// Column used to address the record by key. For join records this is
    /// the owner column; the full key is both columns.
    const PRIMARY_KEY: &'static str;

    /// Every column, in declaration order
    const COLUMNS: &'static [&'static str];

    /// The record's key.
    fn primary_key(&self) -> Self::Key;

    /// Replace the record's key, e.g. with one assigned by the store.
    fn set_primary_key(&mut self, key: Self::Key);

    /// Value of `column`, or `None` if the record has no such column.
    fn column(&self, column: &str) -> Option<Value>;

    /// Reset `column` to its default value. Returns `false` if the record
    /// has no such column.
    fn reset_column(&mut self, column: &str) -> bool;

    /// Whether the record is not identified yet.
    ///
    /// Generated records override this with the predicate of their key
    /// type: numeric zero, empty string, or null identifier.
    fn key_is_empty(&self) -> bool {
        self.primary_key().is_empty()
    }
}
