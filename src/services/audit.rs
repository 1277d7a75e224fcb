use async_trait::async_trait;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

/// One audit trail entry, shaped for the platform's central audit store.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub business_id: Uuid,
    pub actor_id: Uuid,
    pub action: String,
    pub entity_type: String,
    pub entity_ids: Vec<Uuid>,
    pub description: String,
    pub metadata: Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Destination for audit records. Persistence lives outside this service;
/// callers treat delivery as best-effort.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record_event(&self, record: AuditRecord) -> anyhow::Result<()>;
}

/// Default sink: emits the record into the structured log stream, which the
/// platform's log shipper picks up.
#[derive(Debug, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record_event(&self, record: AuditRecord) -> anyhow::Result<()> {
        info!(
            business_id = %record.business_id,
            actor_id = %record.actor_id,
            action = %record.action,
            entity_type = %record.entity_type,
            description = %record.description,
            "audit"
        );
        Ok(())
    }
}
