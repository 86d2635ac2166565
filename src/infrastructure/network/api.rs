//! Public API transaction source (`GET {api}/transactions/{hash}`)

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;

use super::TransactionSource;
use crate::infrastructure::abi::EventLog;

pub const DEFAULT_API_URL: &str = "https://api.multiversx.com";

#[derive(Debug, Default, Deserialize)]
struct TransactionResponse {
    #[serde(default)]
    logs: Option<LogsResponse>,
    /// Contract results (smart contract results) of the transaction
    #[serde(default)]
    results: Vec<ContractResultResponse>,
}

#[derive(Debug, Deserialize)]
struct ContractResultResponse {
    #[serde(default)]
    logs: Option<LogsResponse>,
}

#[derive(Debug, Deserialize)]
struct LogsResponse {
    #[serde(default)]
    events: Vec<EventResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventResponse {
    #[serde(default)]
    address: String,
    identifier: String,
    #[serde(default)]
    topics: Vec<Option<String>>,
    #[serde(default)]
    data: Option<String>,
    /// Newer API versions carry every data block here, `data` being the first
    #[serde(default)]
    additional_data: Vec<String>,
}

/// Reads transactions from the public REST API
pub struct ApiTransactionSource {
    http: reqwest::Client,
    base_url: String,
}

impl ApiTransactionSource {
    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait::async_trait]
impl TransactionSource for ApiTransactionSource {
    async fn fetch_events(&self, tx_hash: &str) -> Result<Vec<EventLog>> {
        let url = format!("{}/transactions/{}", self.base_url, tx_hash.trim());
        tracing::debug!(%url, "fetching transaction");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to query {url}"))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            anyhow::bail!("Transaction not found: {tx_hash}");
        }
        let transaction: TransactionResponse = response
            .error_for_status()
            .with_context(|| format!("Request to {url} failed"))?
            .json()
            .await
            .context("Failed to parse transaction response")?;

        let logs = collect_events(transaction)?;
        tracing::debug!(events = logs.len(), "transaction events collected");
        Ok(logs)
    }
}

fn collect_events(transaction: TransactionResponse) -> Result<Vec<EventLog>> {
    transaction
        .logs
        .into_iter()
        .chain(transaction.results.into_iter().filter_map(|result| result.logs))
        .flat_map(|logs| logs.events)
        .map(convert_event)
        .collect()
}

fn convert_event(event: EventResponse) -> Result<EventLog> {
    let topics = event
        .topics
        .iter()
        .map(|topic| decode_base64(topic.as_deref().unwrap_or_default()))
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("Bad topics in event '{}'", event.identifier))?;

    let blocks: Vec<&str> = if event.additional_data.is_empty() {
        event.data.as_deref().into_iter().collect()
    } else {
        event.additional_data.iter().map(String::as_str).collect()
    };
    let data = blocks
        .into_iter()
        .map(decode_base64)
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("Bad data in event '{}'", event.identifier))?;

    Ok(EventLog {
        address: event.address,
        identifier: event.identifier,
        topics,
        data,
    })
}

fn decode_base64(value: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(value)
        .with_context(|| format!("'{value}' is not base64"))
}
