//! The record carried by every frame

use chrono::{DateTime, Utc};
use serde::{ser::Error as _, Deserialize, Serialize, Serializer};

/// One row of the streamed record set.
///
/// Ids are assigned by the record source and increase monotonically, so the
/// consumer can check ordering without any extra bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,
    pub name: String,
    /// JSON has no NaN or infinity, so non-finite values fail to serialize
    #[serde(serialize_with = "finite")]
    pub value: f64,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Record {
    pub fn new(id: i64, name: impl Into<String>, value: f64, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            value,
            created_at,
        }
    }
}

fn finite<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else {
        Err(S::Error::custom(format!("value {value} is not a finite number")))
    }
}
