//! Network collaborators - where event logs come from

mod api;

use anyhow::Result;

use crate::infrastructure::abi::EventLog;

pub use api::{ApiTransactionSource, DEFAULT_API_URL};

/// Source of the event logs emitted by a transaction
///
/// Logs are returned already decoded to bytes, transaction logs first and
/// then the logs of its contract results.
#[async_trait::async_trait]
pub trait TransactionSource: Send + Sync {
    async fn fetch_events(&self, tx_hash: &str) -> Result<Vec<EventLog>>;
}

/// First log whose identifier (or first topic) is `identifier`
pub fn find_event<'a>(logs: &'a [EventLog], identifier: &str) -> Option<&'a EventLog> {
    logs.iter()
        .find(|log| log.identifier == identifier)
        .or_else(|| {
            logs.iter().find(|log| {
                log.topics
                    .first()
                    .is_some_and(|topic| topic.as_slice() == identifier.as_bytes())
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(identifier: &str, first_topic: &str) -> EventLog {
        EventLog {
            identifier: identifier.into(),
            topics: vec![first_topic.as_bytes().to_vec()],
            ..EventLog::default()
        }
    }

    #[test]
    fn test_find_event_prefers_identifier() {
        let logs = vec![
            log("transferValueOnly", "deposit"),
            log("deposit", "deposit"),
            log("completedTxEvent", "x"),
        ];
        let found = find_event(&logs, "deposit").unwrap();
        assert_eq!(found.identifier, "deposit");

        let found = find_event(&logs, "x").unwrap();
        assert_eq!(found.identifier, "completedTxEvent");
        assert!(find_event(&logs, "missing").is_none());
    }
}
