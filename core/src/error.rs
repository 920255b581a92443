//! Error types and the API error mapper.
//!
//! # Design
//! `Validation` errors are raised locally before any network call. Non-2xx
//! responses go through [`from_response`], which extracts the effective error
//! code from the JSON body (a nested `response_code` overrides the HTTP
//! status) and maps it to a human-readable message via two static tables: a
//! coarse HTTP-status table consulted first, then the fine-grained business
//! codes returned by the remote API. Any server-class code maps to the
//! generic "Server Error" text regardless of a more specific table entry.

use thiserror::Error;

/// Errors returned by [`Paymill`](crate::client::Paymill) operations.
#[derive(Debug, Error)]
pub enum PaymillError {
    /// Malformed or contradictory arguments, detected before any request.
    #[error("{0}")]
    Validation(String),

    /// The server answered with a non-2xx status, mapped per the code tables.
    /// `data` carries the structured `error`/`data` payload from the body,
    /// when one could be parsed.
    #[error("API error {code}: {message}")]
    Api {
        code: u64,
        message: String,
        data: Option<serde_json::Value>,
    },

    /// The HTTP round trip itself failed (connection, TLS, I/O).
    #[error("transport error: {0}")]
    Transport(String),

    /// The response envelope was well-formed JSON but missing the `data` key.
    #[error("unexpected payload: {0}")]
    UnexpectedPayload(String),

    /// The response body could not be decoded into the expected type. Also
    /// raised when a timestamp field is present but not numeric.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Coarse meanings for the HTTP statuses the API uses.
const STATUS_ERRORS: &[(u64, &str)] = &[
    (401, "Unauthorized"),
    (403, "Transaction Error"),
    (404, "Not Found"),
    (412, "Precondition Failed"),
    (500, "Server Error"),
];

/// Fine-grained business error codes returned in `data.response_code`.
const RESPONSE_CODE_ERRORS: &[(u64, &str)] = &[
    (40000, "General problem with data."),
    (40001, "General problem with payment data."),
    (40100, "Problem with credit card data."),
    (40101, "Problem with cvv."),
    (40102, "Card expired or not yet valid."),
    (40103, "Limit exceeded."),
    (40104, "Card invalid."),
    (40105, "Expiry date not valid."),
    (40106, "Credit card brand required."),
    (40200, "Problem with bank account data."),
    (40201, "Bank account data combination mismatch."),
    (40202, "User authentication failed."),
    (40300, "Problem with 3d secure data."),
    (40301, "Currency / amount mismatch"),
    (40400, "Problem with input data."),
    (40401, "Amount too low or zero."),
    (40402, "Usage field too long."),
    (40403, "Currency not allowed."),
    (50000, "General problem with backend."),
    (50001, "Country blacklisted."),
    (50100, "Technical error with credit card."),
    (50101, "Error limit exceeded."),
    (50102, "Card declined by authorization system."),
    (50103, "Manipulation or stolen card."),
    (50104, "Card restricted."),
    (50105, "Invalid card configuration data."),
    (50200, "Technical error with bank account."),
    (50201, "Card blacklisted."),
    (50300, "Technical error with 3D secure."),
    (50400, "Decline because of risk issues."),
    (50500, "General timeout."),
    (50501, "Timeout on side of the acquirer."),
    (50502, "Risk management transaction timeout."),
    (50600, "Duplicate transaction."),
];

const SERVER_ERROR: &str = "Server Error";

fn lookup(table: &[(u64, &'static str)], code: u64) -> Option<&'static str> {
    table.iter().find(|(c, _)| *c == code).map(|(_, m)| *m)
}

/// Server-class codes: 5xx HTTP statuses and 5xxxx business codes. These
/// always map to the generic server-error message, even when the fine table
/// has a more specific entry.
fn is_server_class(code: u64) -> bool {
    code / 100 == 5 || code / 10_000 == 5
}

/// Map a non-2xx response to [`PaymillError::Api`].
///
/// The body is parsed as JSON on a best-effort basis: an `error` key is kept
/// as auxiliary data, a `data` key is kept as auxiliary data and its nested
/// `response_code` becomes the effective code. An unparseable body leaves the
/// HTTP status as the code and no auxiliary data.
pub(crate) fn from_response(status: u16, body: &str) -> PaymillError {
    let mut code = u64::from(status);
    let mut data = None;

    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(error) = json.get("error") {
            data = Some(error.clone());
        }
        if let Some(payload) = json.get("data") {
            data = Some(payload.clone());
            if let Some(response_code) = payload.get("response_code").and_then(|v| v.as_u64()) {
                code = response_code;
            }
        }
    }

    let mut message = lookup(STATUS_ERRORS, code)
        .or_else(|| lookup(RESPONSE_CODE_ERRORS, code))
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {status}"));

    if is_server_class(code) {
        message = SERVER_ERROR.to_string();
    }

    PaymillError::Api {
        code,
        message,
        data,
    }
}
