use std::future::Future;

use serde::Deserialize;

use crate::models::MovieDetails;

#[derive(Debug, thiserror::Error)]
pub enum LookupFailure {
    #[error("lookup disabled, no OMDB_API_KEY configured")]
    Disabled,
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed response body: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("not found: {0}")]
    NotFound(String),
}

impl LookupFailure {
    /// Failures that say nothing is wrong with the provider or the network.
    pub fn is_expected(&self) -> bool {
        matches!(self, LookupFailure::Disabled | LookupFailure::NotFound(_))
    }
}

pub type LookupResult = Result<MovieDetails, LookupFailure>;

/// Lookup of extra movie metadata by exact title.
pub trait MovieLookup {
    fn fetch_details(&self, title: &str) -> impl Future<Output = LookupResult> + Send;

    /// Whether lookups reach the provider at all. Disabled lookups are not paced.
    fn is_enabled(&self) -> bool {
        true
    }
}

pub struct OmdbClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OmdbClient {
    pub fn new(client: reqwest::Client, api_key: String, base_url: String) -> Self {
        if api_key.trim().is_empty() {
            tracing::warn!("No OMDB_API_KEY provided, movies will be loaded without details");
        }
        Self { client, api_key, base_url }
    }
}

impl MovieLookup for OmdbClient {
    fn is_enabled(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    async fn fetch_details(&self, title: &str) -> LookupResult {
        if !self.is_enabled() {
            return Err(LookupFailure::Disabled);
        }

        let url = format!("{}/", self.base_url.trim_end_matches('/'));
        let resp = self
            .client
            .get(url)
            .query(&[("apikey", self.api_key.as_str()), ("t", title)])
            .send()
            .await
            .map_err(LookupFailure::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(LookupFailure::Status(status));
        }

        let body = resp.text().await.map_err(LookupFailure::Transport)?;
        parse_details(&body)
    }
}

fn parse_details(body: &str) -> LookupResult {
    let resp: LookupResponse = serde_json::from_str(body).map_err(LookupFailure::Malformed)?;
    if resp.response != "True" {
        return Err(LookupFailure::NotFound(
            resp.error.unwrap_or_else(|| "no error message".to_string()),
        ));
    }
    Ok(MovieDetails {
        director: present(resp.director),
        plot: present(resp.plot),
        box_office: present(resp.box_office),
    })
}

// OMDb reports missing fields as "N/A".
fn present(value: Option<String>) -> Option<String> {
    value.and_then(|s| {
        let s = s.trim();
        (!s.is_empty() && s != "N/A").then(|| s.to_string())
    })
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Director")]
    director: Option<String>,
    #[serde(rename = "Plot")]
    plot: Option<String>,
    #[serde(rename = "BoxOffice")]
    box_office: Option<String>,
    #[serde(rename = "Error")]
    error: Option<String>,
}
