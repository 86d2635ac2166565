//! Event decoding for a transaction fetched from a transaction source

use anyhow::{Context, Result};

use super::{decode_failure, ToolResult};
use crate::domain::abi::AbiRegistry;
use crate::infrastructure::abi::{BinaryCodec, CodecConfig, ResultsParser};
use crate::infrastructure::network::{find_event, TransactionSource};

/// Find the first `event` log of `tx_hash` and decode it
pub async fn decode_event(
    registry: &AbiRegistry,
    config: CodecConfig,
    source: &dyn TransactionSource,
    event: &str,
    tx_hash: &str,
) -> Result<ToolResult> {
    let definition = registry.get_event(event)?;
    let logs = source
        .fetch_events(tx_hash)
        .await
        .with_context(|| format!("Failed to fetch transaction {tx_hash}"))?;
    let log = find_event(&logs, event).with_context(|| format!("Event not found: {event}"))?;

    let parser = ResultsParser::with_codec(BinaryCodec::new(registry).with_config(config));
    let value = parser
        .parse_event_log(log, definition)
        .map_err(|err| decode_failure(err, format_args!("event '{event}'")))?;
    ToolResult::json(&value)
}
