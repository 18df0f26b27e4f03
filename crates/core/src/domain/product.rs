use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Storage-assigned identifier. Never reassigned once a row exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub i64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A catalog entry as it travels over the wire and through the gateway.
///
/// None of the fields are required: a payload missing `name` or `price` is accepted
/// and persisted as-is, and a `null` price reads as `0.0`. `id` and `created_at` are
/// assigned by the storage layer on first insert; an inbound `createdAt` is ignored.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(default)]
    pub id: Option<ProductId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub price: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, with = "date_only")]
    pub created_at: Option<NaiveDate>,
}

impl Product {
    pub fn new(name: impl Into<String>, price: f64, description: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
            price,
            description: Some(description.into()),
            created_at: None,
        }
    }

    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    /// Runs right before the record is first written and stamps `created_at` with
    /// `today`, whatever the caller sent. Updates must never call this.
    pub fn prepare_for_insert(&mut self, today: NaiveDate) {
        self.created_at = Some(today);
    }

    pub fn with_id(mut self, id: ProductId) -> Self {
        self.id = Some(id);
        self
    }
}

pub const DATE_FORMAT: &str = "%Y-%m-%d";

fn null_as_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_default())
}

mod date_only {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::DATE_FORMAT;

    pub fn serialize<S>(value: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(date) => serializer.serialize_str(&date.format(DATE_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        raw.map(|value| {
            NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(serde::de::Error::custom)
        })
        .transpose()
    }
}
