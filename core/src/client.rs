//! The resource methods: one public operation per remote API call.
//!
//! # Design
//! `Paymill` holds the private key, the base URL and a boxed [`Transport`].
//! Every operation follows the same pipeline: validate arguments locally,
//! encode parameters (query string for GET/DELETE, form body for POST/PUT),
//! execute one blocking round trip, map non-2xx responses through the error
//! tables, and decode the `{data, data_count}` envelope into a record or a
//! [`Listing`]. Operations with a zero or absent required amount
//! short-circuit to `Ok(None)` without touching the network, mirroring the
//! remote API conventions.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use log::debug;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{self, PaymillError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::params::{Filters, Params};
use crate::transport::{Transport, UreqTransport};
use crate::types::{
    Client, Listing, Offer, Payment, Preauthorization, Refund, ResourceId, Subscription,
    Transaction, Webhook,
};

/// Production API endpoint.
pub const BASE_URL: &str = "https://api.paymill.com/v2/";

const DEFAULT_CURRENCY: &str = "EUR";

type Result<T> = std::result::Result<T, PaymillError>;

/// Top-level JSON response wrapper.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    data_count: Option<u64>,
}

/// Arguments for [`Paymill::new_transaction`].
///
/// Exactly one payment source is used, in priority order: `payment`, then
/// `token`, then `preauthorization`. With no source, or a zero amount, the
/// call is a no-op.
#[derive(Debug, Clone, Default)]
pub struct NewTransaction {
    pub amount: u64,
    /// Defaults to `EUR` when unset.
    pub currency: Option<String>,
    pub description: Option<String>,
    pub client: Option<String>,
    pub payment: Option<String>,
    pub token: Option<String>,
    pub preauthorization: Option<String>,
}

impl NewTransaction {
    pub fn new(amount: u64) -> Self {
        Self {
            amount,
            ..Self::default()
        }
    }

    pub fn currency(mut self, currency: &str) -> Self {
        self.currency = Some(currency.to_string());
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn client(mut self, client: &(impl ResourceId + ?Sized)) -> Self {
        self.client = Some(client.resource_id().to_string());
        self
    }

    pub fn payment(mut self, payment: &(impl ResourceId + ?Sized)) -> Self {
        self.payment = Some(payment.resource_id().to_string());
        self
    }

    pub fn token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn preauthorization(mut self, preauth: &(impl ResourceId + ?Sized)) -> Self {
        self.preauthorization = Some(preauth.resource_id().to_string());
        self
    }
}

/// Arguments for [`Paymill::preauthorize`]. Exactly one of `token` or
/// `payment` must be set.
#[derive(Debug, Clone, Default)]
pub struct NewPreauthorization {
    pub amount: u64,
    /// Defaults to `EUR` when unset.
    pub currency: Option<String>,
    pub token: Option<String>,
    pub payment: Option<String>,
}

impl NewPreauthorization {
    pub fn new(amount: u64) -> Self {
        Self {
            amount,
            ..Self::default()
        }
    }

    pub fn currency(mut self, currency: &str) -> Self {
        self.currency = Some(currency.to_string());
        self
    }

    pub fn token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn payment(mut self, payment: &(impl ResourceId + ?Sized)) -> Self {
        self.payment = Some(payment.resource_id().to_string());
        self
    }
}

/// Synchronous client for the Paymill v2 API.
pub struct Paymill {
    private_key: String,
    base_url: String,
    transport: Box<dyn Transport>,
}

impl Paymill {
    /// Client against the production endpoint, authenticated with the
    /// caller's private key.
    pub fn new(private_key: impl Into<String>) -> Self {
        Self::with_transport(private_key, UreqTransport::new())
    }

    /// Client with a caller-supplied transport, for tests and doubles.
    pub fn with_transport(private_key: impl Into<String>, transport: impl Transport + 'static) -> Self {
        Self {
            private_key: private_key.into(),
            base_url: BASE_URL.to_string(),
            transport: Box::new(transport),
        }
    }

    /// Point the client at another endpoint (e.g. a local mock server).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = format!("{}/", base_url.trim_end_matches('/'));
        self
    }

    fn auth_header(&self) -> (String, String) {
        let credentials = STANDARD.encode(format!("{}:", self.private_key));
        ("Authorization".to_string(), format!("Basic {credentials}"))
    }

    fn build_request(
        &self,
        method: HttpMethod,
        endpoint: &str,
        params: Params,
        accept: Option<&str>,
    ) -> HttpRequest {
        let mut url = format!("{}{}", self.base_url, endpoint);
        let mut headers = vec![self.auth_header()];
        if let Some(accept) = accept {
            headers.push(("Accept".to_string(), accept.to_string()));
        }

        let mut body = None;
        let encoded = params.encode();
        if !encoded.is_empty() {
            match method {
                HttpMethod::Post | HttpMethod::Put => {
                    headers.push((
                        "Content-Type".to_string(),
                        "application/x-www-form-urlencoded".to_string(),
                    ));
                    body = Some(encoded);
                }
                HttpMethod::Get | HttpMethod::Delete => {
                    url = format!("{url}?{encoded}");
                }
            }
        }

        HttpRequest {
            method,
            url,
            headers,
            body,
        }
    }

    fn call(
        &self,
        method: HttpMethod,
        endpoint: &str,
        params: Params,
        accept: Option<&str>,
    ) -> Result<HttpResponse> {
        let request = self.build_request(method, endpoint, params, accept);
        debug!("{} {}", request.method.as_str(), request.url);
        let response = self.transport.execute(&request)?;
        debug!(
            "{} {} -> {}",
            request.method.as_str(),
            request.url,
            response.status
        );
        if !response.is_success() {
            return Err(error::from_response(response.status, &response.body));
        }
        Ok(response)
    }

    fn envelope_data(response: &HttpResponse) -> Result<(serde_json::Value, Option<u64>)> {
        let envelope: Envelope = serde_json::from_str(&response.body)?;
        let data = envelope.data.ok_or_else(|| {
            PaymillError::UnexpectedPayload("response envelope has no `data` key".to_string())
        })?;
        Ok((data, envelope.data_count))
    }

    fn fetch<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        endpoint: &str,
        params: Params,
    ) -> Result<T> {
        let response = self.call(method, endpoint, params, None)?;
        let (data, _) = Self::envelope_data(&response)?;
        Ok(serde_json::from_value(data)?)
    }

    fn fetch_list<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        endpoint: &str,
        params: Params,
    ) -> Result<Listing<T>> {
        let response = self.call(method, endpoint, params, None)?;
        let (data, data_count) = Self::envelope_data(&response)?;
        let items: Vec<T> = serde_json::from_value(data)?;
        Ok(Listing {
            data_count: data_count.unwrap_or(0),
            items,
        })
    }

    //
    // Payments
    //

    pub fn new_card(&self, token: &str, client: Option<&str>) -> Result<Payment> {
        let mut params = Params::new();
        params.insert("token", token);
        params.insert_opt("client", client);
        self.fetch(HttpMethod::Post, "payments/", params)
    }

    pub fn get_card(&self, card_id: &str) -> Result<Payment> {
        self.fetch(HttpMethod::Get, &format!("payments/{card_id}"), Params::new())
    }

    pub fn get_cards(&self, filters: Filters) -> Result<Listing<Payment>> {
        self.fetch_list(HttpMethod::Get, "payments/", filters.into_params())
    }

    pub fn delete_card(&self, card_id: &str) -> Result<Payment> {
        self.fetch(
            HttpMethod::Delete,
            &format!("payments/{card_id}"),
            Params::new(),
        )
    }

    //
    // Transactions
    //

    /// Charge a payment source. Returns `Ok(None)` without issuing a request
    /// when the amount is zero or no payment source is set.
    pub fn new_transaction(&self, tx: &NewTransaction) -> Result<Option<Transaction>> {
        if tx.amount == 0 {
            return Ok(None);
        }

        let mut params = Params::new();
        params.insert("amount", tx.amount.to_string());
        params.insert("currency", tx.currency.as_deref().unwrap_or(DEFAULT_CURRENCY));
        params.insert_opt("client", tx.client.as_deref());
        params.insert_opt("description", tx.description.as_deref());

        if let Some(payment) = tx.payment.as_deref() {
            params.insert("payment", payment);
        } else if let Some(token) = tx.token.as_deref() {
            params.insert("token", token);
        } else if let Some(preauth) = tx.preauthorization.as_deref() {
            params.insert("preauthorization", preauth);
        } else {
            return Ok(None);
        }

        self.fetch(HttpMethod::Post, "transactions/", params).map(Some)
    }

    pub fn get_transaction(&self, transaction_id: &str) -> Result<Transaction> {
        self.fetch(
            HttpMethod::Get,
            &format!("transactions/{transaction_id}"),
            Params::new(),
        )
    }

    pub fn update_transaction(
        &self,
        transaction_id: &str,
        description: &str,
    ) -> Result<Transaction> {
        let mut params = Params::new();
        params.insert("description", description);
        self.fetch(
            HttpMethod::Put,
            &format!("transactions/{transaction_id}"),
            params,
        )
    }

    pub fn get_transactions(&self, filters: Filters) -> Result<Listing<Transaction>> {
        self.fetch_list(HttpMethod::Get, "transactions/", filters.into_params())
    }

    //
    // Refunds
    //

    /// Refund part or all of a transaction. A zero amount is a no-op.
    pub fn refund(
        &self,
        transaction: &(impl ResourceId + ?Sized),
        amount: u64,
        description: Option<&str>,
    ) -> Result<Option<Refund>> {
        if amount == 0 {
            return Ok(None);
        }
        let mut params = Params::new();
        params.insert("amount", amount.to_string());
        params.insert_opt("description", description);
        self.fetch(
            HttpMethod::Post,
            &format!("refunds/{}", transaction.resource_id()),
            params,
        )
        .map(Some)
    }

    pub fn get_refund(&self, refund_id: &str) -> Result<Refund> {
        self.fetch(HttpMethod::Get, &format!("refunds/{refund_id}"), Params::new())
    }

    pub fn get_refunds(&self, filters: Filters) -> Result<Listing<Refund>> {
        self.fetch_list(HttpMethod::Get, "refunds/", filters.into_params())
    }

    //
    // Preauthorizations
    //

    /// Reserve an amount on a card. The remote API answers with a transaction
    /// wrapping the new preauthorization. A zero amount is a no-op; exactly
    /// one of `token`/`payment` must be set.
    pub fn preauthorize(&self, preauth: &NewPreauthorization) -> Result<Option<Transaction>> {
        if preauth.amount == 0 {
            return Ok(None);
        }
        if preauth.payment.is_some() == preauth.token.is_some() {
            return Err(PaymillError::Validation(
                "provide either token or payment, not both".to_string(),
            ));
        }

        let mut params = Params::new();
        params.insert("amount", preauth.amount.to_string());
        params.insert(
            "currency",
            preauth.currency.as_deref().unwrap_or(DEFAULT_CURRENCY),
        );
        params.insert_opt("payment", preauth.payment.as_deref());
        params.insert_opt("token", preauth.token.as_deref());

        self.fetch(HttpMethod::Post, "preauthorizations/", params)
            .map(Some)
    }

    pub fn get_preauthorization(&self, preauth_id: &str) -> Result<Preauthorization> {
        self.fetch(
            HttpMethod::Get,
            &format!("preauthorizations/{preauth_id}"),
            Params::new(),
        )
    }

    pub fn get_preauthorizations(&self, filters: Filters) -> Result<Listing<Preauthorization>> {
        self.fetch_list(HttpMethod::Get, "preauthorizations/", filters.into_params())
    }

    pub fn delete_preauthorization(&self, preauth_id: &str) -> Result<Preauthorization> {
        self.fetch(
            HttpMethod::Delete,
            &format!("preauthorizations/{preauth_id}"),
            Params::new(),
        )
    }

    //
    // Clients
    //

    /// Register a client. With neither email nor description there is
    /// nothing to send and the call is a no-op.
    pub fn new_client(
        &self,
        email: Option<&str>,
        description: Option<&str>,
    ) -> Result<Option<Client>> {
        if email.is_none() && description.is_none() {
            return Ok(None);
        }
        let mut params = Params::new();
        params.insert_opt("email", email);
        params.insert_opt("description", description);
        self.fetch(HttpMethod::Post, "clients/", params).map(Some)
    }

    pub fn get_client(&self, client_id: &str) -> Result<Client> {
        self.fetch(HttpMethod::Get, &format!("clients/{client_id}"), Params::new())
    }

    pub fn update_client(
        &self,
        client_id: &str,
        email: Option<&str>,
        description: Option<&str>,
    ) -> Result<Option<Client>> {
        if email.is_none() && description.is_none() {
            return Ok(None);
        }
        let mut params = Params::new();
        params.insert_opt("email", email);
        params.insert_opt("description", description);
        self.fetch(HttpMethod::Put, &format!("clients/{client_id}"), params)
            .map(Some)
    }

    pub fn delete_client(&self, client_id: &str) -> Result<Client> {
        self.fetch(
            HttpMethod::Delete,
            &format!("clients/{client_id}"),
            Params::new(),
        )
    }

    pub fn get_clients(&self, filters: Filters) -> Result<Listing<Client>> {
        self.fetch_list(HttpMethod::Get, "clients/", filters.into_params())
    }

    /// Export the client list as CSV. The body comes back unparsed.
    pub fn export_clients(&self, filters: Filters) -> Result<String> {
        let response = self.call(
            HttpMethod::Get,
            "clients/",
            filters.into_params(),
            Some("text/csv"),
        )?;
        Ok(response.body)
    }

    //
    // Offers
    //

    /// Create a recurring charge plan. A zero amount is a no-op. The interval
    /// must match `<number> DAY|WEEK|MONTH|YEAR`, case-insensitive.
    pub fn new_offer(
        &self,
        amount: u64,
        name: &str,
        interval: &str,
        currency: &str,
    ) -> Result<Option<Offer>> {
        if amount == 0 {
            return Ok(None);
        }
        validate_interval(interval)?;

        let mut params = Params::new();
        params.insert("amount", amount.to_string());
        params.insert("interval", interval);
        params.insert("currency", currency);
        params.insert("name", name);
        self.fetch(HttpMethod::Post, "offers/", params).map(Some)
    }

    pub fn get_offer(&self, offer_id: &str) -> Result<Offer> {
        self.fetch(HttpMethod::Get, &format!("offers/{offer_id}"), Params::new())
    }

    pub fn update_offer(&self, offer_id: &str, name: &str) -> Result<Offer> {
        let mut params = Params::new();
        params.insert("name", name);
        self.fetch(HttpMethod::Put, &format!("offers/{offer_id}"), params)
    }

    pub fn delete_offer(&self, offer_id: &str) -> Result<Offer> {
        self.fetch(HttpMethod::Delete, &format!("offers/{offer_id}"), Params::new())
    }

    pub fn get_offers(&self, filters: Filters) -> Result<Listing<Offer>> {
        self.fetch_list(HttpMethod::Get, "offers/", filters.into_params())
    }

    //
    // Subscriptions
    //

    /// Subscribe a client to an offer, charged against a payment method.
    /// Records or bare ids are accepted interchangeably.
    pub fn new_subscription<C, O, P>(
        &self,
        client: &C,
        offer: &O,
        payment: &P,
        start_at: Option<DateTime<Utc>>,
    ) -> Result<Subscription>
    where
        C: ResourceId + ?Sized,
        O: ResourceId + ?Sized,
        P: ResourceId + ?Sized,
    {
        let mut params = Params::new();
        if let Some(start_at) = start_at {
            params.insert("start_at", start_at.timestamp().to_string());
        }
        params.insert("client", client.resource_id());
        params.insert("offer", offer.resource_id());
        params.insert("payment", payment.resource_id());
        self.fetch(HttpMethod::Post, "subscriptions/", params)
    }

    pub fn get_subscription(&self, subscription_id: &str) -> Result<Subscription> {
        self.fetch(
            HttpMethod::Get,
            &format!("subscriptions/{subscription_id}"),
            Params::new(),
        )
    }

    pub fn update_subscription(
        &self,
        subscription_id: &str,
        offer: &(impl ResourceId + ?Sized),
    ) -> Result<Subscription> {
        let mut params = Params::new();
        params.insert("offer", offer.resource_id());
        self.fetch(
            HttpMethod::Put,
            &format!("subscriptions/{subscription_id}"),
            params,
        )
    }

    /// Schedule (or unschedule) cancellation at the end of the current
    /// period.
    pub fn cancel_subscription_after_interval(
        &self,
        subscription_id: &str,
        cancel: bool,
    ) -> Result<Subscription> {
        let mut params = Params::new();
        params.insert("cancel_at_period_end", if cancel { "true" } else { "false" });
        self.fetch(
            HttpMethod::Put,
            &format!("subscriptions/{subscription_id}"),
            params,
        )
    }

    pub fn cancel_subscription_now(&self, subscription_id: &str) -> Result<Subscription> {
        self.fetch(
            HttpMethod::Delete,
            &format!("subscriptions/{subscription_id}"),
            Params::new(),
        )
    }

    pub fn get_subscriptions(&self, filters: Filters) -> Result<Listing<Subscription>> {
        self.fetch_list(HttpMethod::Get, "subscriptions/", filters.into_params())
    }

    //
    // Webhooks
    //

    /// Register a webhook. Exactly one of `url`/`email` must be set.
    pub fn new_webhook(
        &self,
        event_types: &[&str],
        url: Option<&str>,
        email: Option<&str>,
    ) -> Result<Webhook> {
        if url.is_some() == email.is_some() {
            return Err(PaymillError::Validation(
                "provide either url or email, not both".to_string(),
            ));
        }
        let mut params = Params::new();
        params.insert_opt("url", url);
        params.insert_opt("email", email);
        params.insert_seq("event_types", event_types.iter().copied());
        self.fetch(HttpMethod::Post, "webhooks/", params)
    }

    pub fn get_webhook(&self, webhook_id: &str) -> Result<Webhook> {
        self.fetch(HttpMethod::Get, &format!("webhooks/{webhook_id}"), Params::new())
    }

    /// Update a webhook. Setting both `url` and `email` is contradictory;
    /// setting neither leaves the target unchanged.
    pub fn update_webhook(
        &self,
        webhook_id: &str,
        event_types: &[&str],
        url: Option<&str>,
        email: Option<&str>,
    ) -> Result<Webhook> {
        if url.is_some() && email.is_some() {
            return Err(PaymillError::Validation(
                "provide either url or email, not both".to_string(),
            ));
        }
        let mut params = Params::new();
        params.insert_opt("url", url);
        params.insert_opt("email", email);
        params.insert_seq("event_types", event_types.iter().copied());
        self.fetch(HttpMethod::Put, &format!("webhooks/{webhook_id}"), params)
    }

    pub fn delete_webhook(&self, webhook_id: &str) -> Result<Webhook> {
        self.fetch(
            HttpMethod::Delete,
            &format!("webhooks/{webhook_id}"),
            Params::new(),
        )
    }

    pub fn get_webhooks(&self, filters: Filters) -> Result<Listing<Webhook>> {
        self.fetch_list(HttpMethod::Get, "webhooks/", filters.into_params())
    }
}

/// The recurrence interval format accepted by the offers endpoint:
/// optional digits, at most one space, then one of the four units,
/// case-insensitive.
fn validate_interval(interval: &str) -> std::result::Result<(), PaymillError> {
    const UNITS: [&str; 4] = ["DAY", "WEEK", "MONTH", "YEAR"];
    let rest = interval.trim_start_matches(|c: char| c.is_ascii_digit());
    let unit = rest.strip_prefix(' ').unwrap_or(rest);
    if UNITS.iter().any(|u| unit.eq_ignore_ascii_case(u)) {
        return Ok(());
    }
    Err(PaymillError::Validation(
        "interval format: <number> DAY|WEEK|MONTH|YEAR, e.g. `2 DAY`".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    /// Transport double: records every request and replays canned responses.
    #[derive(Clone, Default)]
    struct Recording {
        state: Rc<RefCell<RecordingState>>,
    }

    #[derive(Default)]
    struct RecordingState {
        requests: Vec<HttpRequest>,
        responses: VecDeque<HttpResponse>,
    }

    impl Recording {
        fn respond_with(&self, status: u16, body: &str) {
            self.state.borrow_mut().responses.push_back(HttpResponse {
                status,
                headers: Vec::new(),
                body: body.to_string(),
            });
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.state.borrow().requests.clone()
        }

        fn single_request(&self) -> HttpRequest {
            let requests = self.requests();
            assert_eq!(requests.len(), 1, "expected exactly one request");
            requests.into_iter().next().unwrap()
        }
    }

    impl Transport for Recording {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
            let mut state = self.state.borrow_mut();
            state.requests.push(request.clone());
            Ok(state.responses.pop_front().unwrap_or(HttpResponse {
                status: 200,
                headers: Vec::new(),
                body: r#"{"data":{}}"#.to_string(),
            }))
        }
    }

    fn api() -> (Paymill, Recording) {
        let recording = Recording::default();
        let api = Paymill::with_transport("fake-key", recording.clone());
        (api, recording)
    }

    fn body_pairs(request: &HttpRequest) -> Vec<(String, String)> {
        form_urlencoded::parse(request.body.as_deref().unwrap_or("").as_bytes())
            .into_owned()
            .collect()
    }

    fn sorted(mut pairs: Vec<(String, String)>) -> Vec<(String, String)> {
        pairs.sort();
        pairs
    }

    #[test]
    fn requests_carry_basic_auth_for_the_private_key() {
        let (api, recording) = api();
        api.get_card("pay_1").unwrap();
        let request = recording.single_request();
        let expected = format!("Basic {}", STANDARD.encode("fake-key:"));
        assert!(request
            .headers
            .iter()
            .any(|(name, value)| name == "Authorization" && *value == expected));
    }

    #[test]
    fn new_card_posts_token_and_optional_client() {
        let (api, recording) = api();
        api.new_card("tok_1234", None).unwrap();
        api.new_card("tok_1234", Some("cli_1234")).unwrap();

        let requests = recording.requests();
        assert_eq!(requests[0].method, HttpMethod::Post);
        assert!(requests[0].url.ends_with("payments/"));
        assert_eq!(
            body_pairs(&requests[0]),
            vec![("token".to_string(), "tok_1234".to_string())]
        );
        assert_eq!(
            sorted(body_pairs(&requests[1])),
            vec![
                ("client".to_string(), "cli_1234".to_string()),
                ("token".to_string(), "tok_1234".to_string()),
            ]
        );
    }

    #[test]
    fn get_cards_sends_filters_as_query_string() {
        let (api, recording) = api();
        recording.respond_with(200, r#"{"data":[],"data_count":0}"#);
        api.get_cards(Filters::new().count(1).offset(5)).unwrap();
        let request = recording.single_request();
        assert_eq!(request.method, HttpMethod::Get);
        assert!(request.url.ends_with("payments/?count=1&offset=5"));
        assert!(request.body.is_none());
    }

    #[test]
    fn new_transaction_with_zero_amount_is_a_no_op() {
        let (api, recording) = api();
        let result = api.new_transaction(&NewTransaction::default()).unwrap();
        assert!(result.is_none());
        assert!(recording.requests().is_empty());
    }

    #[test]
    fn new_transaction_without_payment_source_is_a_no_op() {
        let (api, recording) = api();
        let result = api.new_transaction(&NewTransaction::new(3000)).unwrap();
        assert!(result.is_none());
        assert!(recording.requests().is_empty());
    }

    #[test]
    fn new_transaction_posts_amount_currency_and_payment() {
        let (api, recording) = api();
        api.new_transaction(&NewTransaction::new(3000).payment("pay_1234"))
            .unwrap();
        let request = recording.single_request();
        assert_eq!(request.method, HttpMethod::Post);
        assert!(request.url.ends_with("transactions/"));
        assert_eq!(
            sorted(body_pairs(&request)),
            vec![
                ("amount".to_string(), "3000".to_string()),
                ("currency".to_string(), "EUR".to_string()),
                ("payment".to_string(), "pay_1234".to_string()),
            ]
        );
    }

    #[test]
    fn new_transaction_prefers_payment_over_token_and_preauth() {
        let (api, recording) = api();
        let tx = NewTransaction::new(100)
            .payment("pay_1")
            .token("tok_1")
            .preauthorization("preauth_1");
        api.new_transaction(&tx).unwrap();
        let pairs = body_pairs(&recording.single_request());
        assert!(pairs.contains(&("payment".to_string(), "pay_1".to_string())));
        assert!(pairs.iter().all(|(name, _)| name != "token"));
        assert!(pairs.iter().all(|(name, _)| name != "preauthorization"));
    }

    #[test]
    fn new_transaction_accepts_a_preauthorization_record() {
        let (api, recording) = api();
        let preauth = Preauthorization {
            id: Some("preauth_9".to_string()),
            ..Preauthorization::default()
        };
        api.new_transaction(&NewTransaction::new(4000).preauthorization(&preauth))
            .unwrap();
        let pairs = body_pairs(&recording.single_request());
        assert!(pairs.contains(&("preauthorization".to_string(), "preauth_9".to_string())));
    }

    #[test]
    fn update_transaction_puts_description() {
        let (api, recording) = api();
        api.update_transaction("tran_1234", "desc").unwrap();
        let request = recording.single_request();
        assert_eq!(request.method, HttpMethod::Put);
        assert!(request.url.ends_with("transactions/tran_1234"));
        assert_eq!(
            body_pairs(&request),
            vec![("description".to_string(), "desc".to_string())]
        );
    }

    #[test]
    fn refund_posts_to_the_transaction_path() {
        let (api, recording) = api();
        api.refund("tran_1234", 3000, None).unwrap();
        let request = recording.single_request();
        assert_eq!(request.method, HttpMethod::Post);
        assert!(request.url.ends_with("refunds/tran_1234"));
        assert_eq!(
            body_pairs(&request),
            vec![("amount".to_string(), "3000".to_string())]
        );
    }

    #[test]
    fn refund_of_zero_is_a_no_op() {
        let (api, recording) = api();
        assert!(api.refund("tran_1234", 0, None).unwrap().is_none());
        assert!(recording.requests().is_empty());
    }

    #[test]
    fn preauthorize_requires_exactly_one_source() {
        let (api, recording) = api();

        let neither = NewPreauthorization::new(3000);
        assert!(matches!(
            api.preauthorize(&neither),
            Err(PaymillError::Validation(_))
        ));

        let both = NewPreauthorization::new(3000).token("tok_1").payment("pay_1");
        assert!(matches!(
            api.preauthorize(&both),
            Err(PaymillError::Validation(_))
        ));

        assert!(recording.requests().is_empty());
    }

    #[test]
    fn preauthorize_with_zero_amount_is_a_no_op() {
        let (api, recording) = api();
        assert!(api
            .preauthorize(&NewPreauthorization::default())
            .unwrap()
            .is_none());
        assert!(recording.requests().is_empty());
    }

    #[test]
    fn preauthorize_posts_token_amount_and_currency() {
        let (api, recording) = api();
        api.preauthorize(&NewPreauthorization::new(3000).token("tok_1234"))
            .unwrap();
        let request = recording.single_request();
        assert!(request.url.ends_with("preauthorizations/"));
        assert_eq!(
            sorted(body_pairs(&request)),
            vec![
                ("amount".to_string(), "3000".to_string()),
                ("currency".to_string(), "EUR".to_string()),
                ("token".to_string(), "tok_1234".to_string()),
            ]
        );
    }

    #[test]
    fn new_client_without_arguments_is_a_no_op() {
        let (api, recording) = api();
        assert!(api.new_client(None, None).unwrap().is_none());
        assert!(api.update_client("cli_1", None, None).unwrap().is_none());
        assert!(recording.requests().is_empty());
    }

    #[test]
    fn export_clients_requests_csv_and_returns_the_raw_body() {
        let (api, recording) = api();
        recording.respond_with(200, "\"id\";\"email\"\n\"cli_1\";\"a@b\"\n");
        let csv = api.export_clients(Filters::new()).unwrap();
        assert!(csv.starts_with("\"id\";\"email\""));
        let request = recording.single_request();
        assert!(request
            .headers
            .iter()
            .any(|(name, value)| name == "Accept" && value == "text/csv"));
    }

    #[test]
    fn new_offer_validates_the_interval() {
        let (api, recording) = api();
        assert!(matches!(
            api.new_offer(20, "bar", "foo", "EUR"),
            Err(PaymillError::Validation(_))
        ));
        assert!(recording.requests().is_empty());

        for interval in ["month", "2 DAY", "10 week", "YEAR", "3 Month"] {
            api.new_offer(3000, "test", interval, "EUR").unwrap();
        }
        assert_eq!(recording.requests().len(), 5);
    }

    #[test]
    fn new_offer_with_zero_amount_is_a_no_op() {
        let (api, recording) = api();
        assert!(api.new_offer(0, "foo", "month", "EUR").unwrap().is_none());
        assert!(recording.requests().is_empty());
    }

    #[test]
    fn new_subscription_accepts_records_and_ids() {
        let (api, recording) = api();
        let offer = Offer {
            id: Some("offer_1234".to_string()),
            ..Offer::default()
        };
        api.new_subscription("cli_1234", &offer, "pay_1234", None)
            .unwrap();
        let request = recording.single_request();
        assert!(request.url.ends_with("subscriptions/"));
        assert_eq!(
            sorted(body_pairs(&request)),
            vec![
                ("client".to_string(), "cli_1234".to_string()),
                ("offer".to_string(), "offer_1234".to_string()),
                ("payment".to_string(), "pay_1234".to_string()),
            ]
        );
    }

    #[test]
    fn new_subscription_sends_start_at_as_epoch_seconds() {
        use chrono::TimeZone;
        let (api, recording) = api();
        let start_at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        api.new_subscription("cli_1", "offer_1", "pay_1", Some(start_at))
            .unwrap();
        let pairs = body_pairs(&recording.single_request());
        assert!(pairs.contains(&("start_at".to_string(), "1700000000".to_string())));
    }

    #[test]
    fn cancel_subscription_variants_use_put_and_delete() {
        let (api, recording) = api();
        api.cancel_subscription_after_interval("sub_1234", true).unwrap();
        api.cancel_subscription_now("sub_1234").unwrap();
        let requests = recording.requests();
        assert_eq!(requests[0].method, HttpMethod::Put);
        assert_eq!(
            body_pairs(&requests[0]),
            vec![("cancel_at_period_end".to_string(), "true".to_string())]
        );
        assert_eq!(requests[1].method, HttpMethod::Delete);
        assert!(requests[1].url.ends_with("subscriptions/sub_1234"));
    }

    #[test]
    fn new_webhook_encodes_event_types_as_repeated_pairs() {
        let (api, recording) = api();
        api.new_webhook(&["foo", "bar"], Some("http://x/"), None).unwrap();
        let request = recording.single_request();
        assert!(request.url.ends_with("webhooks/"));
        assert_eq!(
            body_pairs(&request),
            vec![
                ("url".to_string(), "http://x/".to_string()),
                ("event_types[]".to_string(), "foo".to_string()),
                ("event_types[]".to_string(), "bar".to_string()),
            ]
        );
    }

    #[test]
    fn new_webhook_requires_exactly_one_target() {
        let (api, recording) = api();
        assert!(matches!(
            api.new_webhook(&["foo"], None, None),
            Err(PaymillError::Validation(_))
        ));
        assert!(matches!(
            api.new_webhook(&["foo"], Some("http://x/"), Some("a@b")),
            Err(PaymillError::Validation(_))
        ));
        assert!(recording.requests().is_empty());
    }

    #[test]
    fn update_webhook_allows_neither_target_but_not_both() {
        let (api, recording) = api();
        api.update_webhook("hook_1", &["foo"], None, None).unwrap();
        assert_eq!(recording.requests().len(), 1);
        assert!(matches!(
            api.update_webhook("hook_1", &["foo"], Some("http://x/"), Some("a@b")),
            Err(PaymillError::Validation(_))
        ));
    }

    #[test]
    fn single_records_decode_from_the_data_envelope() {
        let (api, recording) = api();
        recording.respond_with(
            200,
            r#"{"data":{"id":"tran_1","amount":"3000","currency":"EUR","created_at":1349946151}}"#,
        );
        let tx = api.get_transaction("tran_1").unwrap();
        assert_eq!(tx.id.as_deref(), Some("tran_1"));
        assert_eq!(tx.amount.as_deref(), Some("3000"));
        assert!(tx.created_at.is_some());
    }

    #[test]
    fn listings_carry_the_server_side_total() {
        let (api, recording) = api();
        recording.respond_with(
            200,
            r#"{"data":[{"id":"cli_1"},{"id":"cli_2"}],"data_count":40}"#,
        );
        let clients = api.get_clients(Filters::new()).unwrap();
        assert_eq!(clients.len(), 2);
        assert_eq!(clients.data_count, 40);
        assert_eq!(clients[0].id.as_deref(), Some("cli_1"));
    }

    #[test]
    fn missing_data_key_is_an_unexpected_payload() {
        let (api, recording) = api();
        recording.respond_with(200, r#"{"mode":"test"}"#);
        assert!(matches!(
            api.get_client("cli_1"),
            Err(PaymillError::UnexpectedPayload(_))
        ));
    }

    #[test]
    fn api_errors_surface_code_message_and_data() {
        let (api, recording) = api();
        recording.respond_with(412, r#"{"data":{"response_code":40104}}"#);
        match api.get_transaction("tran_1") {
            Err(PaymillError::Api {
                code,
                message,
                ..
            }) => {
                assert_eq!(code, 40104);
                assert_eq!(message, "Card invalid.");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn server_errors_without_a_body_map_to_generic_text() {
        let (api, recording) = api();
        recording.respond_with(503, "upstream unavailable");
        match api.get_client("cli_1") {
            Err(PaymillError::Api {
                code,
                message,
                data,
            }) => {
                assert_eq!(code, 503);
                assert_eq!(message, "Server Error");
                assert!(data.is_none());
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn base_url_override_normalizes_the_trailing_slash() {
        let recording = Recording::default();
        let api = Paymill::with_transport("fake-key", recording.clone())
            .with_base_url("http://localhost:3000");
        api.get_client("cli_1").unwrap();
        assert_eq!(
            recording.single_request().url,
            "http://localhost:3000/clients/cli_1"
        );
    }
}
