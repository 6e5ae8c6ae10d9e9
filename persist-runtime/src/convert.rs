//! Field conversions used by generated converters
//!
//! Every fallible helper takes the schema field name so the resulting
//! [`PersistError::Conversion`] points at the offending field.

use chrono::{DateTime, Utc};
use prost::Message;
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::PersistError;
use crate::types;

/// Protobuf timestamp to a UTC date-time.
pub fn timestamp_to_datetime(
    timestamp: &prost_types::Timestamp,
    field: &'static str,
) -> Result<DateTime<Utc>, PersistError> {
    let nanos = u32::try_from(timestamp.nanos)
        .map_err(|_| PersistError::conversion(field, "negative nanos"))?;
    DateTime::from_timestamp(timestamp.seconds, nanos)
        .ok_or_else(|| PersistError::conversion(field, "timestamp out of range"))
}

/// UTC date-time to a protobuf timestamp.
pub fn datetime_to_timestamp(datetime: &DateTime<Utc>) -> prost_types::Timestamp {
    prost_types::Timestamp {
        seconds: datetime.timestamp(),
        nanos: datetime.timestamp_subsec_nanos() as i32,
    }
}

/// UUID message to its column. Absent or empty stores `NULL`.
pub fn uuid_from_proto(
    value: Option<&types::Uuid>,
    field: &'static str,
) -> Result<Option<Uuid>, PersistError> {
    match value {
        Some(value) if !value.value.is_empty() => Uuid::parse_str(&value.value)
            .map(Some)
            .map_err(|err| PersistError::conversion(field, err)),
        _ => Ok(None),
    }
}

/// UUID column to its protobuf message.
pub fn uuid_to_proto(value: &Uuid) -> types::Uuid {
    types::Uuid {
        value: value.hyphenated().to_string(),
    }
}

/// Serialize repeated scalars or a scalar map into a JSON text column.
pub fn encode_json<T: Serialize + ?Sized>(
    value: &T,
    field: &'static str,
) -> Result<String, PersistError> {
    serde_json::to_string(value).map_err(|err| PersistError::conversion(field, err))
}

/// Read a JSON text column back. An empty column yields the default value.
pub fn decode_json<T: DeserializeOwned + Default>(
    column: &str,
    field: &'static str,
) -> Result<T, PersistError> {
    if column.is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(column).map_err(|err| PersistError::conversion(field, err))
}

/// Encode an embedded message that is not persisted on its own.
pub fn encode_message<M: Message>(message: &M) -> Vec<u8> {
    message.encode_to_vec()
}

/// Decode an embedded message column.
pub fn decode_message<M: Message + Default>(
    column: &[u8],
    field: &'static str,
) -> Result<M, PersistError> {
    M::decode(column).map_err(|err| PersistError::conversion(field, err))
}

/// Encode a list of embedded messages, each length-delimited.
pub fn encode_messages<M: Message>(messages: &[M]) -> Vec<u8> {
    let mut buf = Vec::new();
    for message in messages {
        buf.extend(message.encode_length_delimited_to_vec());
    }
    buf
}

/// Decode a column written by [`encode_messages`].
pub fn decode_messages<M: Message + Default>(
    column: &[u8],
    field: &'static str,
) -> Result<Vec<M>, PersistError> {
    let mut buf = column;
    let mut messages = Vec::new();
    while !buf.is_empty() {
        let message = M::decode_length_delimited(&mut buf)
            .map_err(|err| PersistError::conversion(field, err))?;
        messages.push(message);
    }
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_timestamp_conversion() {
        let ts = prost_types::Timestamp {
            seconds: 1_700_000_000,
            nanos: 250,
        };
        let datetime = timestamp_to_datetime(&ts, "created_at").unwrap();
        assert_eq!(datetime_to_timestamp(&datetime), ts);

        let bad = prost_types::Timestamp {
            seconds: 0,
            nanos: -1,
        };
        let err = timestamp_to_datetime(&bad, "created_at").unwrap_err();
        assert!(err.to_string().contains("created_at"));
    }

    #[test]
    fn test_uuid_conversion() {
        let id = Uuid::new_v4();
        let proto = uuid_to_proto(&id);
        assert_eq!(uuid_from_proto(Some(&proto), "id").unwrap(), Some(id));
        assert_eq!(uuid_from_proto(None, "id").unwrap(), None);
        assert_eq!(
            uuid_from_proto(Some(&types::Uuid::default()), "id").unwrap(),
            None
        );

        let bad = types::Uuid {
            value: "not-a-uuid".into(),
        };
        assert!(matches!(
            uuid_from_proto(Some(&bad), "id"),
            Err(PersistError::Conversion { field: "id", .. })
        ));
    }

    #[test]
    fn test_json_columns() {
        let flags = vec!["pinned".to_string(), "spam".to_string()];
        let column = encode_json(&flags, "flags").unwrap();
        assert_eq!(column, r#"["pinned","spam"]"#);
        assert_eq!(decode_json::<Vec<String>>(&column, "flags").unwrap(), flags);
        assert!(decode_json::<Vec<String>>("", "flags").unwrap().is_empty());

        let mut labels = HashMap::new();
        labels.insert("env".to_string(), 3i64);
        let column = encode_json(&labels, "labels").unwrap();
        assert_eq!(
            decode_json::<HashMap<String, i64>>(&column, "labels").unwrap(),
            labels
        );
    }

    #[test]
    fn test_embedded_messages() {
        let ids = vec![
            types::Uuid { value: "a".into() },
            types::Uuid { value: "b".into() },
        ];
        let column = encode_messages(&ids);
        assert_eq!(decode_messages::<types::Uuid>(&column, "ids").unwrap(), ids);
        assert!(decode_messages::<types::Uuid>(&[], "ids").unwrap().is_empty());

        let column = encode_message(&ids[0]);
        assert_eq!(decode_message::<types::Uuid>(&column, "id").unwrap(), ids[0]);
        assert!(decode_message::<types::Uuid>(&[0xff], "id").is_err());
    }
}
