//! In-memory fake of the Paymill v2 API for integration tests.
//!
//! Stores every resource as a raw JSON object in a per-resource map and
//! wraps responses in the `{data, data_count}` envelope the real API uses.
//! Request bodies are `application/x-www-form-urlencoded`, like the wire
//! format the client produces; `name[]` keys collect into arrays. Requests
//! without basic auth are rejected with 401 so the client's auth header is
//! exercised end-to-end.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// resource path segment -> id -> stored object
pub type Store = Arc<RwLock<HashMap<String, HashMap<String, Value>>>>;

const RESOURCES: &[(&str, &str)] = &[
    ("clients", "cli"),
    ("payments", "pay"),
    ("transactions", "tran"),
    ("refunds", "refund"),
    ("preauthorizations", "preauth"),
    ("offers", "offer"),
    ("subscriptions", "sub"),
    ("webhooks", "hook"),
];

pub fn app() -> Router {
    let store: Store = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/refunds/{id}", post(create_refund).get(get_refund))
        .route("/{resource}", get(list).post(create))
        .route("/{resource}/", get(list).post(create))
        .route("/{resource}/{id}", get(get_one).put(update).delete(delete_one))
        .with_state(store)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn id_prefix(resource: &str) -> Option<&'static str> {
    RESOURCES
        .iter()
        .find(|(name, _)| *name == resource)
        .map(|(_, prefix)| *prefix)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": "Access Denied"})),
    )
        .into_response()
}

fn not_found(resource: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"error": format!("{resource} not found")})),
    )
        .into_response()
}

fn has_basic_auth(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Basic "))
}

fn now_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Decode a form body into a JSON object. `name[]` keys accumulate into
/// arrays; `amount`-like fields become numbers except on transactions,
/// where the real API reports the amount as a formatted string.
pub fn form_to_object(resource: &str, body: &str) -> Map<String, Value> {
    let mut object = Map::new();
    for (key, value) in form_urlencoded::parse(body.as_bytes()) {
        if let Some(name) = key.strip_suffix("[]") {
            let entry = object
                .entry(name.to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(items) = entry {
                items.push(Value::String(value.into_owned()));
            }
            continue;
        }

        let numeric_field = matches!(
            key.as_ref(),
            "amount" | "origin_amount" | "trial_period_days"
        ) && resource != "transactions";
        let boolean_field = matches!(key.as_ref(), "cancel_at_period_end" | "livemode");
        let value = if numeric_field {
            value
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::String(value.into_owned()))
        } else if boolean_field {
            Value::Bool(value.as_ref() == "true")
        } else {
            Value::String(value.into_owned())
        };
        object.insert(key.into_owned(), value);
    }
    object
}

fn new_object(resource: &str, prefix: &str, body: &str) -> Value {
    let mut object = form_to_object(resource, body);
    object.insert(
        "id".to_string(),
        Value::String(format!("{prefix}_{}", Uuid::new_v4().simple())),
    );
    object.insert("created_at".to_string(), Value::from(now_epoch()));
    object.insert("updated_at".to_string(), Value::from(now_epoch()));
    if resource == "transactions" {
        object.insert("status".to_string(), Value::String("closed".to_string()));
        object.insert("livemode".to_string(), Value::Bool(false));
    }
    Value::Object(object)
}

async fn create(
    State(store): State<Store>,
    Path(resource): Path<String>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if !has_basic_auth(&headers) {
        return unauthorized();
    }
    let Some(prefix) = id_prefix(&resource) else {
        return not_found(&resource);
    };

    let object = new_object(&resource, prefix, &body);
    let id = object["id"].as_str().unwrap_or_default().to_string();
    store
        .write()
        .await
        .entry(resource)
        .or_default()
        .insert(id, object.clone());
    Json(json!({"data": object, "mode": "test"})).into_response()
}

async fn create_refund(
    State(store): State<Store>,
    Path(transaction_id): Path<String>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if !has_basic_auth(&headers) {
        return unauthorized();
    }

    let mut store = store.write().await;
    let transactions = store.entry("transactions".to_string()).or_default();
    if !transactions.contains_key(&transaction_id) {
        return not_found("transaction");
    }

    let mut refund = match new_object("refunds", "refund", &body) {
        Value::Object(map) => map,
        _ => unreachable!(),
    };
    refund.insert(
        "transaction".to_string(),
        Value::String(transaction_id.clone()),
    );
    refund.insert("status".to_string(), Value::String("refunded".to_string()));
    let refund = Value::Object(refund);
    let id = refund["id"].as_str().unwrap_or_default().to_string();
    store
        .entry("refunds".to_string())
        .or_default()
        .insert(id, refund.clone());
    Json(json!({"data": refund, "mode": "test"})).into_response()
}

/// `/refunds/{id}` shadows the generic `/{resource}/{id}` route, so reads
/// need their own handler here.
async fn get_refund(
    state: State<Store>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    get_one(state, Path(("refunds".to_string(), id)), headers).await
}

async fn list(
    State(store): State<Store>,
    Path(resource): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !has_basic_auth(&headers) {
        return unauthorized();
    }
    if id_prefix(&resource).is_none() {
        return not_found(&resource);
    }

    let store = store.read().await;
    let objects: Vec<Value> = store
        .get(&resource)
        .map(|m| m.values().cloned().collect())
        .unwrap_or_default();

    let wants_csv = headers
        .get("accept")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("text/csv"));
    if wants_csv && resource == "clients" {
        let mut csv = String::from("\"id\";\"email\";\"description\"\n");
        for object in &objects {
            let field = |name: &str| object[name].as_str().unwrap_or_default().to_string();
            csv.push_str(&format!(
                "\"{}\";\"{}\";\"{}\"\n",
                field("id"),
                field("email"),
                field("description")
            ));
        }
        return csv.into_response();
    }

    let data_count = objects.len();
    Json(json!({"data": objects, "data_count": data_count, "mode": "test"})).into_response()
}

async fn get_one(
    State(store): State<Store>,
    Path((resource, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if !has_basic_auth(&headers) {
        return unauthorized();
    }
    let store = store.read().await;
    match store.get(&resource).and_then(|m| m.get(&id)) {
        Some(object) => Json(json!({"data": object, "mode": "test"})).into_response(),
        None => not_found(&resource),
    }
}

async fn update(
    State(store): State<Store>,
    Path((resource, id)): Path<(String, String)>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if !has_basic_auth(&headers) {
        return unauthorized();
    }
    let mut store = store.write().await;
    let Some(object) = store.get_mut(&resource).and_then(|m| m.get_mut(&id)) else {
        return not_found(&resource);
    };
    if let Value::Object(fields) = object {
        for (key, value) in form_to_object(&resource, &body) {
            fields.insert(key, value);
        }
        fields.insert("updated_at".to_string(), Value::from(now_epoch()));
    }
    Json(json!({"data": object, "mode": "test"})).into_response()
}

async fn delete_one(
    State(store): State<Store>,
    Path((resource, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if !has_basic_auth(&headers) {
        return unauthorized();
    }
    let mut store = store.write().await;
    match store.get_mut(&resource).and_then(|m| m.remove(&id)) {
        Some(object) => Json(json!({"data": object, "mode": "test"})).into_response(),
        None => not_found(&resource),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_decoding_collects_bracket_keys_into_arrays() {
        let object = form_to_object("webhooks", "url=http%3A%2F%2Fx%2F&event_types%5B%5D=foo&event_types%5B%5D=bar");
        assert_eq!(object["url"], "http://x/");
        assert_eq!(object["event_types"], json!(["foo", "bar"]));
    }

    #[test]
    fn amounts_are_numeric_except_on_transactions() {
        let refund = form_to_object("refunds", "amount=2000");
        assert_eq!(refund["amount"], json!(2000));

        let transaction = form_to_object("transactions", "amount=3000&currency=EUR");
        assert_eq!(transaction["amount"], "3000");
        assert_eq!(transaction["currency"], "EUR");
    }
}
