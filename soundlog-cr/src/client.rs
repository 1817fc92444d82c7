//! HTTP client for the query service
//!
//! Thin wrapper over `reqwest` speaking the query service's wire
//! contract: windowed event fetches and the class map. Errors separate
//! transport failures from non-2xx responses from undecodable bodies so
//! the reconciler can log them distinctly.

use std::time::Duration;

use soundlog_common::api::WindowResponse;
use soundlog_common::ClassMapEntry;
use thiserror::Error;

const USER_AGENT: &str = concat!("soundlog-cr/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (HTTP {0}): {1}")]
    Api(u16, String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Parameters for one windowed fetch, mirroring the query string of
/// `GET /api/audio_logs`. Unset fields are omitted from the request.
#[derive(Debug, Clone, Default)]
pub struct WindowRequest {
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub hours: Option<f64>,
    pub offset_hours: Option<f64>,
    pub bin_seconds: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl WindowRequest {
    /// Server-anchored window reaching `hours` back from its "now".
    pub fn hours_back(hours: f64) -> Self {
        Self {
            hours: Some(hours),
            ..Self::default()
        }
    }

    /// Explicit half-open window `[start, end)`.
    pub fn range(start: f64, end: f64) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            ..Self::default()
        }
    }

    /// Ask the server to reduce each `bin_seconds` bucket to its winner.
    pub fn binned(mut self, bin_seconds: i64) -> Self {
        self.bin_seconds = Some(bin_seconds);
        self
    }

    fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(start) = self.start {
            pairs.push(("start", start.to_string()));
        }
        if let Some(end) = self.end {
            pairs.push(("end", end.to_string()));
        }
        if let Some(hours) = self.hours {
            pairs.push(("hours", hours.to_string()));
        }
        if let Some(offset_hours) = self.offset_hours {
            pairs.push(("offsetHours", offset_hours.to_string()));
        }
        if let Some(bin_seconds) = self.bin_seconds {
            pairs.push(("binSeconds", bin_seconds.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset", offset.to_string()));
        }
        pairs
    }
}

pub struct LogClient {
    http: reqwest::Client,
    base_url: String,
}

impl LogClient {
    /// Create a client for a query service at `base_url`
    /// (e.g. `http://127.0.0.1:5750`).
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch one window of events.
    pub async fn fetch_window(&self, request: &WindowRequest) -> Result<WindowResponse, FetchError> {
        let url = format!("{}/api/audio_logs", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&request.to_query_pairs())
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Api(status.as_u16(), body));
        }

        response
            .json::<WindowResponse>()
            .await
            .map_err(|e| FetchError::MalformedResponse(e.to_string()))
    }

    /// Fetch the class index to display name mapping.
    pub async fn fetch_class_map(&self) -> Result<Vec<ClassMapEntry>, FetchError> {
        let url = format!("{}/api/yamnet_class_map", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Api(status.as_u16(), body));
        }

        response
            .json::<Vec<ClassMapEntry>>()
            .await
            .map_err(|e| FetchError::MalformedResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_pairs_use_wire_names() {
        let request = WindowRequest {
            start: Some(100.0),
            end: Some(200.5),
            hours: None,
            offset_hours: Some(1.5),
            bin_seconds: Some(300),
            limit: Some(50),
            offset: Some(10),
        };

        let pairs = request.to_query_pairs();
        assert_eq!(
            pairs,
            vec![
                ("start", "100".to_string()),
                ("end", "200.5".to_string()),
                ("offsetHours", "1.5".to_string()),
                ("binSeconds", "300".to_string()),
                ("limit", "50".to_string()),
                ("offset", "10".to_string()),
            ]
        );
    }

    #[test]
    fn test_unset_fields_are_omitted() {
        let pairs = WindowRequest::hours_back(24.0).to_query_pairs();
        assert_eq!(pairs, vec![("hours", "24".to_string())]);
    }

    #[test]
    fn test_range_and_binned_builders() {
        let request = WindowRequest::range(10.0, 20.0).binned(60);
        assert_eq!(request.start, Some(10.0));
        assert_eq!(request.end, Some(20.0));
        assert_eq!(request.bin_seconds, Some(60));
        assert_eq!(request.hours, None);
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = LogClient::new("http://127.0.0.1:5750/").unwrap();
        assert_eq!(client.base_url, "http://127.0.0.1:5750");
    }
}
