//! Typed records for the remote API resources.
//!
//! # Design
//! One record per resource, deserialized permissively: unknown incoming
//! fields are ignored, declared-but-absent fields default to `None`/empty,
//! and the two conventional timestamp fields (`created_at`, `updated_at`)
//! are decoded from epoch seconds into `chrono` date-times. A timestamp that
//! is present but not numeric is a hard decode error.
//!
//! Nested resources arrive either as a full JSON object or as a bare id
//! string depending on the endpoint; [`Embedded`] captures both shapes
//! without coercing one into the other.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A nested resource that is either expanded inline or referenced by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Embedded<T> {
    Full(Box<T>),
    Id(String),
}

impl<T> Embedded<T> {
    pub fn as_full(&self) -> Option<&T> {
        match self {
            Embedded::Full(inner) => Some(inner),
            Embedded::Id(_) => None,
        }
    }

    pub fn as_id(&self) -> Option<&str> {
        match self {
            Embedded::Full(_) => None,
            Embedded::Id(id) => Some(id),
        }
    }
}

/// Anything that can stand in for a resource identifier in a request:
/// a bare id string or an already-fetched record.
pub trait ResourceId {
    fn resource_id(&self) -> &str;
}

impl ResourceId for str {
    fn resource_id(&self) -> &str {
        self
    }
}

impl ResourceId for String {
    fn resource_id(&self) -> &str {
        self.as_str()
    }
}

macro_rules! impl_resource_id {
    ($($entity:ty),*) => {
        $(impl ResourceId for $entity {
            fn resource_id(&self) -> &str {
                self.id.as_deref().unwrap_or("")
            }
        })*
    };
}

impl_resource_id!(
    Client,
    Payment,
    Preauthorization,
    Transaction,
    Refund,
    Subscription,
    Offer,
    Webhook
);

/// A registered buyer, optionally carrying their payment methods and
/// subscription.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Client {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub payment: Option<Vec<Payment>>,
    #[serde(default)]
    pub subscription: Option<Embedded<Subscription>>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A stored payment method: credit card or direct debit account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    #[serde(default)]
    pub id: Option<String>,
    /// `creditcard` or `debit`.
    #[serde(default, rename = "type")]
    pub payment_type: Option<String>,
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub card_type: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub expire_month: Option<String>,
    #[serde(default)]
    pub expire_year: Option<String>,
    #[serde(default)]
    pub card_holder: Option<String>,
    #[serde(default)]
    pub last4: Option<String>,
    /// Bank sorting code (direct debit only).
    #[serde(default)]
    pub code: Option<String>,
    /// Partially masked account number (direct debit only).
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub holder: Option<String>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub app_id: Option<String>,
}

/// A reserved amount that can later be captured by a transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preauthorization {
    #[serde(default)]
    pub id: Option<String>,
    /// Amount reserved, in cents.
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub livemode: Option<bool>,
    #[serde(default)]
    pub payment: Option<Embedded<Payment>>,
    #[serde(default)]
    pub client: Option<Embedded<Client>>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub app_id: Option<String>,
}

/// A single charge against a payment method.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default)]
    pub id: Option<String>,
    /// Formatted amount, as returned by the API (a string).
    #[serde(default)]
    pub amount: Option<String>,
    /// Original amount in the smallest currency unit.
    #[serde(default)]
    pub origin_amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub livemode: Option<bool>,
    #[serde(default)]
    pub is_fraud: Option<bool>,
    #[serde(default)]
    pub refunds: Option<Vec<Refund>>,
    #[serde(default)]
    pub payment: Option<Embedded<Payment>>,
    #[serde(default)]
    pub client: Option<Embedded<Client>>,
    #[serde(default)]
    pub preauthorization: Option<Embedded<Preauthorization>>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub response_code: Option<i64>,
    /// Identifier forwarded to the acquirer for statements.
    #[serde(default)]
    pub short_id: Option<String>,
    #[serde(default)]
    pub invoices: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub fees: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub app_id: Option<String>,
}

/// A full or partial reversal of a transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Refund {
    #[serde(default)]
    pub id: Option<String>,
    /// Id of the transaction being refunded.
    #[serde(default)]
    pub transaction: Option<String>,
    /// Amount refunded, in cents.
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub livemode: Option<bool>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A recurring charge connecting a client, an offer and a payment method.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    #[serde(default)]
    pub id: Option<String>,
    /// Some endpoints send an empty array instead of null when no offer is
    /// attached; both normalize to `None`.
    #[serde(default, deserialize_with = "offer_or_none")]
    pub offer: Option<Embedded<Offer>>,
    #[serde(default)]
    pub livemode: Option<bool>,
    #[serde(default)]
    pub cancel_at_period_end: Option<bool>,
    #[serde(default)]
    pub trial_start: Option<i64>,
    #[serde(default)]
    pub trial_end: Option<i64>,
    #[serde(default)]
    pub next_capture_at: Option<i64>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub canceled_at: Option<i64>,
    #[serde(default)]
    pub payment: Option<Embedded<Payment>>,
    #[serde(default)]
    pub client: Option<Embedded<Client>>,
    #[serde(default)]
    pub app_id: Option<String>,
}

/// A named recurring charge plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Amount charged every interval, in cents.
    #[serde(default)]
    pub amount: Option<i64>,
    /// Charge cadence, e.g. `2 DAY`.
    #[serde(default)]
    pub interval: Option<String>,
    #[serde(default)]
    pub trial_period_days: Option<i64>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Integer when zero, otherwise per-state strings; kept raw.
    #[serde(default)]
    pub subscription_count: Option<serde_json::Value>,
    #[serde(default)]
    pub app_id: Option<String>,
}

/// A registered event notification target (url or email).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Webhook {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub livemode: Option<bool>,
    #[serde(default)]
    pub event_types: Option<Vec<String>>,
    #[serde(default)]
    pub app_id: Option<String>,
}

fn offer_or_none<'de, D>(deserializer: D) -> Result<Option<Embedded<Offer>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(serde_json::Value::Array(items)) if items.is_empty() => Ok(None),
        Some(other) => serde_json::from_value(other)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// One page of records plus the server-side total.
///
/// `data_count` is the total number of matching records on the server, which
/// can exceed `len()` when the listing was limited by `count`/`offset`.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing<T> {
    pub data_count: u64,
    pub items: Vec<T>,
}

impl<T> Listing<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T> std::ops::Deref for Listing<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

impl<T> IntoIterator for Listing<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
