//! Request parameter encoding.
//!
//! # Design
//! `Params` is an ordered list of name/value pairs that encodes to an
//! `application/x-www-form-urlencoded` string, used both as a query string
//! (GET/DELETE) and as a request body (POST/PUT). The encoder drops null-like
//! values rather than sending empty fields, and sequence values become
//! repeated `name[]=elem` pairs, which is how the remote API expects arrays.

/// A single parameter value: either one string or a sequence of strings.
#[derive(Debug, Clone)]
enum Value {
    Single(String),
    Seq(Vec<String>),
}

/// Ordered request parameters for one API call.
#[derive(Debug, Clone, Default)]
pub struct Params {
    pairs: Vec<(String, Value)>,
}

/// A value is null-like when it is empty or the literal string `"None"`.
/// Null-like values never reach the wire.
fn is_null_like(value: &str) -> bool {
    value.is_empty() || value == "None"
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.pairs.push((name.to_string(), Value::Single(value.into())));
    }

    pub fn insert_opt(&mut self, name: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.insert(name, value);
        }
    }

    pub fn insert_seq<I, S>(&mut self, name: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.pairs.push((name.to_string(), Value::Seq(values)));
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Encode to a form-urlencoded string.
    ///
    /// Null-like single values and empty sequences are dropped entirely.
    /// Sequence values are emitted as repeated pairs under a key suffixed
    /// with `[]` (added only if not already present), with null-like elements
    /// filtered out first. Order and multiplicity per key are preserved.
    pub fn encode(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (name, value) in &self.pairs {
            match value {
                Value::Single(v) => {
                    if !is_null_like(v) {
                        serializer.append_pair(name, v);
                    }
                }
                Value::Seq(items) => {
                    let kept: Vec<&str> = items
                        .iter()
                        .map(String::as_str)
                        .filter(|v| !is_null_like(v))
                        .collect();
                    if kept.is_empty() {
                        continue;
                    }
                    let key = if name.ends_with("[]") {
                        name.clone()
                    } else {
                        format!("{name}[]")
                    };
                    for item in kept {
                        serializer.append_pair(&key, item);
                    }
                }
            }
        }
        serializer.finish()
    }
}

/// Query parameters accepted by every listing operation.
///
/// The remote API takes an open-ended filter set (`count`, `offset`,
/// `order`, per-resource filters like `created_at`); `param` covers anything
/// without a dedicated helper.
#[derive(Debug, Clone, Default)]
pub struct Filters {
    params: Params,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(mut self, count: u32) -> Self {
        self.params.insert("count", count.to_string());
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.params.insert("offset", offset.to_string());
        self
    }

    pub fn order(mut self, order: &str) -> Self {
        self.params.insert("order", order);
        self
    }

    pub fn param(mut self, name: &str, value: &str) -> Self {
        self.params.insert(name, value);
        self
    }

    pub(crate) fn into_params(self) -> Params {
        self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Decode an encoded string back into pairs for assertions.
    fn decode(encoded: &str) -> Vec<(String, String)> {
        form_urlencoded::parse(encoded.as_bytes())
            .into_owned()
            .collect()
    }

    #[test]
    fn encode_keeps_only_non_empty_entries() {
        let mut params = Params::new();
        params.insert("amount", "3000");
        params.insert("description", "");
        params.insert("client", "None");
        params.insert("currency", "EUR");
        assert_eq!(
            decode(&params.encode()),
            vec![
                ("amount".to_string(), "3000".to_string()),
                ("currency".to_string(), "EUR".to_string()),
            ]
        );
    }

    #[test]
    fn insert_opt_skips_absent_values() {
        let mut params = Params::new();
        params.insert_opt("email", Some("test@example.net"));
        params.insert_opt("description", None);
        assert_eq!(params.encode(), "email=test%40example.net");
    }

    #[test]
    fn sequences_become_repeated_bracket_pairs() {
        let mut params = Params::new();
        params.insert("url", "http://x/");
        params.insert_seq("event_types", ["foo", "bar"]);
        assert_eq!(
            decode(&params.encode()),
            vec![
                ("url".to_string(), "http://x/".to_string()),
                ("event_types[]".to_string(), "foo".to_string()),
                ("event_types[]".to_string(), "bar".to_string()),
            ]
        );
    }

    #[test]
    fn bracket_suffix_is_not_doubled() {
        let mut params = Params::new();
        params.insert_seq("event_types[]", ["foo"]);
        assert_eq!(params.encode(), "event_types%5B%5D=foo");
    }

    #[test]
    fn empty_sequences_and_elements_are_dropped() {
        let mut params = Params::new();
        params.insert_seq("event_types", Vec::<String>::new());
        params.insert_seq("tags", ["", "a", "None", "b"]);
        assert_eq!(
            decode(&params.encode()),
            vec![
                ("tags[]".to_string(), "a".to_string()),
                ("tags[]".to_string(), "b".to_string()),
            ]
        );
    }

    #[test]
    fn order_is_preserved_per_key() {
        let mut params = Params::new();
        params.insert_seq("ids", ["z", "a", "m"]);
        let pairs = decode(&params.encode());
        let values: Vec<&str> = pairs.iter().map(|(_, v)| v.as_str()).collect();
        assert_eq!(values, ["z", "a", "m"]);
    }

    #[test]
    fn values_are_percent_encoded() {
        let mut params = Params::new();
        params.insert("description", "a b&c=d");
        assert_eq!(params.encode(), "description=a+b%26c%3Dd");
    }

    #[test]
    fn filters_build_listing_params() {
        let filters = Filters::new().count(1).offset(5).order("created_at_desc");
        assert_eq!(
            filters.into_params().encode(),
            "count=1&offset=5&order=created_at_desc"
        );
    }
}
