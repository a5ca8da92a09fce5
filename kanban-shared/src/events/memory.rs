/// In-process publisher that records events

use super::{EventBusError, EventPublisher};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryPublisher {
    events: Mutex<Vec<(String, Value)>>,
    failing: AtomicBool,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent publishes fail as if the broker were down
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Recorded `(routing_key, payload)` pairs, oldest first
    pub fn events(&self) -> Vec<(String, Value)> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn count(&self, routing_key: &str) -> usize {
        self.events().iter().filter(|(key, _)| key == routing_key).count()
    }
}

#[async_trait]
impl EventPublisher for MemoryPublisher {
    async fn publish(&self, routing_key: &str, payload: Vec<u8>) -> Result<(), EventBusError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EventBusError::Closed);
        }
        let value: Value = serde_json::from_slice(&payload)?;
        self.events
            .lock()
            .map_err(|_| EventBusError::Closed)?
            .push((routing_key.to_string(), value));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{publish_event, routing};
    use serde_json::json;

    #[tokio::test]
    async fn test_records_and_fails() {
        let publisher = MemoryPublisher::new();
        publish_event(&publisher, routing::LIST_DELETE, &json!({"id": 3}))
            .await
            .unwrap();
        assert_eq!(publisher.events(), vec![("list.delete".to_string(), json!({"id": 3}))]);

        publisher.set_failing(true);
        assert!(publish_event(&publisher, routing::LIST_DELETE, &json!({"id": 4}))
            .await
            .is_err());
        assert_eq!(publisher.count(routing::LIST_DELETE), 1);
    }
}
