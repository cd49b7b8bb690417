//! Destination search through SerpAPI's Google engine.

use std::fmt;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const SERPAPI_URL: &str = "https://serpapi.com/search.json";

/// Shown when a result has no thumbnail of its own.
pub const PLACEHOLDER_THUMBNAIL: &str = "https://via.placeholder.com/150";

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Preset searches offered on the destinations screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationKind {
    Popular,
    Beaches,
    Mountains,
    Historical,
}

impl DestinationKind {
    pub const ALL: [DestinationKind; 4] = [
        DestinationKind::Popular,
        DestinationKind::Beaches,
        DestinationKind::Mountains,
        DestinationKind::Historical,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DestinationKind::Popular => "Popular",
            DestinationKind::Beaches => "Beaches",
            DestinationKind::Mountains => "Mountains",
            DestinationKind::Historical => "Historical",
        }
    }

    pub fn query(&self) -> &'static str {
        match self {
            DestinationKind::Popular => "Best travel destinations",
            DestinationKind::Beaches => "Best beach destinations",
            DestinationKind::Mountains => "Best mountain destinations",
            DestinationKind::Historical => "Best historical destinations",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.label().eq_ignore_ascii_case(label.trim()))
    }
}

impl fmt::Display for DestinationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub title: String,
    pub link: String,
    pub snippet: Option<String>,
    pub thumbnail_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic_results: Option<Vec<OrganicResult>>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: Option<String>,
    #[serde(default)]
    thumbnail: Option<String>,
}

impl From<OrganicResult> for Destination {
    fn from(result: OrganicResult) -> Self {
        Destination {
            title: result.title,
            link: result.link,
            snippet: result.snippet,
            thumbnail_url: result
                .thumbnail
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| PLACEHOLDER_THUMBNAIL.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct SearchClient {
    client: Client,
    api_key: String,
}

impl SearchClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
        })
    }

    pub async fn fetch_destinations(&self, kind: DestinationKind) -> Result<Vec<Destination>> {
        let response = self
            .client
            .get(SERPAPI_URL)
            .query(&[("engine", "google"), ("q", kind.query()), ("api_key", self.api_key.as_str())])
            .send()
            .await
            .context("Failed to send destination search request")?;

        let status = response.status();
        let text = response
            .text()
            .await
            .context("Failed to read destination search response")?;
        if !status.is_success() {
            return Err(anyhow!(
                "Destination search failed ({}): {}",
                status,
                text.chars().take(200).collect::<String>()
            ));
        }

        let destinations = parse_destinations(&text)?;
        debug!(kind = %kind, count = destinations.len(), "Destinations fetched");
        Ok(destinations)
    }
}

fn parse_destinations(text: &str) -> Result<Vec<Destination>> {
    let parsed: SearchResponse =
        serde_json::from_str(text).context("Failed to parse destination search response")?;
    let results = parsed
        .organic_results
        .ok_or_else(|| anyhow!("No results found"))?;
    Ok(results.into_iter().map(Destination::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_organic_results() {
        let json = r#"{
            "search_metadata": {"status": "Success"},
            "organic_results": [
                {"position": 1, "title": "25 Best Beaches in India", "link": "https://example.com/beaches",
                 "snippet": "From Goa to the Andamans", "thumbnail": "https://img.example.com/t1.jpg"},
                {"position": 2, "title": "Beach guide", "link": "https://example.com/guide"}
            ]
        }"#;
        let destinations = parse_destinations(json).unwrap();
        assert_eq!(destinations.len(), 2);
        assert_eq!(destinations[0].thumbnail_url, "https://img.example.com/t1.jpg");
        assert_eq!(destinations[1].thumbnail_url, PLACEHOLDER_THUMBNAIL);
        assert!(destinations[1].snippet.is_none());
    }

    #[test]
    fn test_missing_results_is_an_error() {
        let err = parse_destinations(r#"{"error": "Invalid API key"}"#).unwrap_err();
        assert_eq!(err.to_string(), "No results found");
    }

    #[test]
    fn test_kind_from_label() {
        assert_eq!(DestinationKind::from_label("beaches"), Some(DestinationKind::Beaches));
        assert_eq!(DestinationKind::from_label(" Historical "), Some(DestinationKind::Historical));
        assert_eq!(DestinationKind::from_label("deserts"), None);
        assert_eq!(DestinationKind::Mountains.query(), "Best mountain destinations");
    }
}
