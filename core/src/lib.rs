//! Synchronous client for the Paymill v2 payment API.
//!
//! # Overview
//! Builds signed HTTP requests for the fixed set of REST resources (clients,
//! payment methods, transactions, refunds, preauthorizations, subscriptions,
//! offers, webhooks), serializes request parameters and deserializes JSON
//! responses into typed records. Every operation is a single blocking HTTP
//! round trip.
//!
//! # Design
//! - `Paymill` holds the private key and a boxed [`Transport`]; nothing else
//!   is shared between calls.
//! - Request shaping ([`params`]) and response mapping ([`types`], [`error`])
//!   are pure data transformations; I/O happens only behind the transport
//!   trait, so everything above it is testable with a recording double.
//! - Non-2xx responses become [`PaymillError::Api`] with a code mapped
//!   through the remote API's error tables.
//!
//! # Example
//! ```no_run
//! use paymill_core::{NewTransaction, Paymill};
//!
//! # fn main() -> Result<(), paymill_core::PaymillError> {
//! let api = Paymill::new("your-private-key");
//! let tx = api.new_transaction(&NewTransaction::new(3000).token("tok_1234"))?;
//! if let Some(tx) = tx {
//!     println!("charged: {:?}", tx.id);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod http;
pub mod params;
pub mod transport;
pub mod types;

pub use client::{NewPreauthorization, NewTransaction, Paymill, BASE_URL};
pub use error::PaymillError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use params::{Filters, Params};
pub use transport::{Transport, UreqTransport};
pub use types::{
    Client, Embedded, Listing, Offer, Payment, Preauthorization, Refund, ResourceId, Subscription,
    Transaction, Webhook,
};
