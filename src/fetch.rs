use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::errors::BotError;
use crate::record::{Record, records_from_value};

/// Produces one run's batch of observations for a single source.
///
/// Implementations own everything source-specific (endpoints, payload
/// shapes, page scraping); the merger and store only ever see the flat
/// records this trait yields.
pub trait Fetcher {
    /// Fetch the current batch, or fail with [`BotError::Fetch`].
    fn fetch(&self) -> Result<Vec<Record>, BotError>;
}

/// Generic fetcher for sources that serve a JSON array of flat records.
///
/// Issues one GET with optional query parameters and headers; an optional
/// JSON pointer selects the record array inside a larger response body.
#[derive(Clone, Debug)]
pub struct JsonApiFetcher {
    url: String,
    params: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    records_pointer: Option<String>,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl JsonApiFetcher {
    /// Create a fetcher for `url` with default timeouts.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            params: Vec::new(),
            headers: Vec::new(),
            records_pointer: None,
            connect_timeout: Duration::from_secs(2),
            read_timeout: Duration::from_secs(30),
        }
    }

    /// Append one query parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Append one request header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Select the record array at a JSON pointer (e.g. `/features`)
    /// instead of expecting the whole body to be the array.
    pub fn with_records_pointer(mut self, pointer: impl Into<String>) -> Self {
        self.records_pointer = Some(pointer.into());
        self
    }

    /// Override the connect/read timeouts.
    pub fn with_timeouts(mut self, connect: Duration, read: Duration) -> Self {
        self.connect_timeout = connect;
        self.read_timeout = read;
        self
    }

    /// Extract the record array from a decoded response body.
    fn shape_records(&self, body: Value) -> Result<Vec<Record>, BotError> {
        let rows = match &self.records_pointer {
            Some(pointer) => body
                .pointer(pointer)
                .cloned()
                .ok_or_else(|| self.fetch_err(format!("no records at pointer '{pointer}'")))?,
            None => body,
        };
        records_from_value(rows, &self.url).map_err(|err| match err {
            // A surprising payload is a source-format change, not a
            // corrupted local store.
            BotError::MalformedHistory { reason, .. } => {
                self.fetch_err(format!("unexpected payload shape: {reason}"))
            }
            other => other,
        })
    }

    fn fetch_err(&self, reason: String) -> BotError {
        BotError::Fetch {
            url: self.url.clone(),
            reason,
        }
    }
}

impl Fetcher for JsonApiFetcher {
    fn fetch(&self) -> Result<Vec<Record>, BotError> {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(self.connect_timeout)
            .timeout_read(self.read_timeout)
            .build();
        let mut request = agent.get(&self.url);
        for (name, value) in &self.headers {
            request = request.set(name, value);
        }
        for (name, value) in &self.params {
            request = request.query(name, value);
        }
        // 4xx/5xx statuses surface as errors here, like transport failures.
        let response = request.call().map_err(|err| self.fetch_err(err.to_string()))?;
        let body: Value = response
            .into_json()
            .map_err(|err| self.fetch_err(format!("body is not valid JSON: {err}")))?;
        let records = self.shape_records(body)?;
        debug!(url = %self.url, records = records.len(), "fetched source batch");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn shapes_a_bare_array_body() {
        let fetcher = JsonApiFetcher::new("https://example.com/feed");
        let records = fetcher
            .shape_records(json!([{"date": "2024-01-01", "close": 181.06}]))
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["close"], json!(181.06));
    }

    #[test]
    fn pointer_selects_a_nested_array() {
        let fetcher =
            JsonApiFetcher::new("https://example.com/query").with_records_pointer("/features");
        let body = json!({"features": [{"id": 1, "affected": 120}], "crs": "EPSG:4326"});
        let records = fetcher.shape_records(body).unwrap();
        assert_eq!(records[0]["affected"], json!(120));
    }

    #[test]
    fn missing_pointer_target_is_a_fetch_error() {
        let fetcher =
            JsonApiFetcher::new("https://example.com/query").with_records_pointer("/features");
        let err = fetcher.shape_records(json!({"error": "throttled"})).unwrap_err();
        assert!(matches!(err, BotError::Fetch { .. }));
    }

    #[test]
    fn surprising_payload_shape_is_a_fetch_error() {
        let fetcher = JsonApiFetcher::new("https://example.com/feed");
        let err = fetcher.shape_records(json!({"rows": 3})).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("payload shape"), "unexpected message: {text}");
    }
}
