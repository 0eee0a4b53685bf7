use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// Emitted after a sub-service write has been persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubServiceEvent {
    pub kind: ChangeKind,
    pub id: Uuid,
    pub service_id: Uuid,
}

#[derive(Debug, Error)]
#[error("Failed to publish sub-service event: {0}")]
pub struct EventError(pub String);

/// Outbound sink for sub-service change events.
#[async_trait]
pub trait SubServiceEventPublisher: Send + Sync {
    async fn publish(&self, event: &SubServiceEvent) -> Result<(), EventError>;
}

/// Publisher that only records events in the log.
pub struct LogEventPublisher;

#[async_trait]
impl SubServiceEventPublisher for LogEventPublisher {
    async fn publish(&self, event: &SubServiceEvent) -> Result<(), EventError> {
        tracing::info!(kind = ?event.kind, id = %event.id, service_id = %event.service_id, "sub-service changed");
        Ok(())
    }
}
