//! HTTP client for the venue vector-index service
//!
//! The index service ranks venue records by semantic similarity and returns
//! their metadata plus a distance score. Responses are decoded into typed
//! structs at this boundary; a record without an id or name is a hard
//! error, and optional metadata stays `None` rather than defaulting to
//! zero.

use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::config::SearchSettings;
use crate::domain::{SearchPort, VenueFilter, VenueSummary};

pub struct VenueIndexClient {
    client: reqwest::Client,
    base_url: String,
    collection: String,
}

impl VenueIndexClient {
    pub fn new(settings: &SearchSettings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .context("failed to build venue index HTTP client")?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            collection: settings.collection.clone(),
        })
    }
}

#[async_trait]
impl SearchPort for VenueIndexClient {
    async fn search(
        &self,
        query: &str,
        limit: usize,
        filter: Option<&VenueFilter>,
    ) -> anyhow::Result<Vec<VenueSummary>> {
        let url = format!("{}/collections/{}/query", self.base_url, self.collection);
        let mut body = json!({
            "query": query,
            "limit": limit,
        });
        if let Some(filter) = filter {
            body["filter"] = serde_json::to_value(filter)?;
        }

        tracing::debug!(%query, limit, "querying venue index");
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("venue index request failed")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("venue index returned {}: {}", status, text);
        }

        let decoded: QueryResponse = response
            .json()
            .await
            .context("failed to decode venue index response")?;

        decode_results(decoded)
    }
}

fn decode_results(response: QueryResponse) -> anyhow::Result<Vec<VenueSummary>> {
    response
        .results
        .into_iter()
        .map(VenueRecord::into_summary)
        .collect()
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    results: Vec<VenueRecord>,
}

#[derive(Debug, Deserialize)]
struct VenueRecord {
    metadata: VenueMetadata,
    distance: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct VenueMetadata {
    /// The index stores ids as strings or numbers depending on how the
    /// collection was built; both are accepted.
    resy_id: Option<serde_json::Value>,
    name: Option<String>,
    #[serde(rename = "type")]
    venue_type: Option<String>,
    description: Option<String>,
    neighborhood: Option<String>,
    locality: Option<String>,
    address: Option<String>,
    rating: Option<f64>,
    price_range_id: Option<u32>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl VenueRecord {
    fn into_summary(self) -> anyhow::Result<VenueSummary> {
        let resy_id = match self.metadata.resy_id {
            Some(serde_json::Value::String(s)) if !s.is_empty() => s,
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => bail!("venue record is missing a usable `resy_id`"),
        };
        let name = match self.metadata.name {
            Some(name) if !name.trim().is_empty() => name,
            _ => bail!("venue record {} is missing a `name`", resy_id),
        };

        Ok(VenueSummary {
            resy_id,
            name,
            venue_type: self.metadata.venue_type,
            description: self.metadata.description,
            neighborhood: self.metadata.neighborhood,
            locality: self.metadata.locality,
            address: self.metadata.address,
            rating: self.metadata.rating,
            price_range_id: self.metadata.price_range_id,
            latitude: self.metadata.latitude,
            longitude: self.metadata.longitude,
            distance_score: self.distance,
        })
    }
}
