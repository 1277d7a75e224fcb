use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::services::audit::{AuditRecord, AuditSink};
use crate::services::notifications::{NotificationSink, TransferNotification};

/// Who triggered an event, as supplied by the gateway. Carried on the event
/// so the audit sink can record origin details after the fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorContext {
    pub actor_id: Uuid,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ActorContext {
    pub fn from_actor(actor: &crate::access::AuthenticatedActor) -> Self {
        Self {
            actor_id: actor.id,
            ip_address: actor.ip_address.clone(),
            user_agent: actor.user_agent.clone(),
        }
    }
}

/// Domain events published after a mutation commits.
///
/// Observers (audit, notifications) consume these outside the transaction, so
/// a slow or failing sink can never roll the mutation back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    TransferCreated {
        transfer_id: Uuid,
        business_id: Uuid,
        transfer_number: String,
        source_location_id: Uuid,
        destination_location_id: Uuid,
        actor: ActorContext,
    },
    TransferChecked {
        transfer_id: Uuid,
        business_id: Uuid,
        transfer_number: String,
        actor: ActorContext,
    },
    TransferDispatched {
        transfer_id: Uuid,
        business_id: Uuid,
        transfer_number: String,
        actor: ActorContext,
    },
    TransferArrived {
        transfer_id: Uuid,
        business_id: Uuid,
        transfer_number: String,
        actor: ActorContext,
    },
    TransferVerified {
        transfer_id: Uuid,
        business_id: Uuid,
        transfer_number: String,
        actor: ActorContext,
    },
    TransferCompleted {
        transfer_id: Uuid,
        business_id: Uuid,
        transfer_number: String,
        actor: ActorContext,
    },
    TransferCancelled {
        transfer_id: Uuid,
        business_id: Uuid,
        transfer_number: String,
        /// True when cancellation had to restore already-deducted stock.
        stock_restored: bool,
        actor: ActorContext,
    },
    TransferUpdated {
        transfer_id: Uuid,
        business_id: Uuid,
        transfer_number: String,
        actor: ActorContext,
    },
    StockAdjusted {
        business_id: Uuid,
        variation_id: Uuid,
        location_id: Uuid,
        quantity: rust_decimal::Decimal,
        actor: ActorContext,
    },
}

impl Event {
    pub fn business_id(&self) -> Uuid {
        match self {
            Event::TransferCreated { business_id, .. }
            | Event::TransferChecked { business_id, .. }
            | Event::TransferDispatched { business_id, .. }
            | Event::TransferArrived { business_id, .. }
            | Event::TransferVerified { business_id, .. }
            | Event::TransferCompleted { business_id, .. }
            | Event::TransferCancelled { business_id, .. }
            | Event::TransferUpdated { business_id, .. }
            | Event::StockAdjusted { business_id, .. } => *business_id,
        }
    }

    pub fn actor(&self) -> &ActorContext {
        match self {
            Event::TransferCreated { actor, .. }
            | Event::TransferChecked { actor, .. }
            | Event::TransferDispatched { actor, .. }
            | Event::TransferArrived { actor, .. }
            | Event::TransferVerified { actor, .. }
            | Event::TransferCompleted { actor, .. }
            | Event::TransferCancelled { actor, .. }
            | Event::TransferUpdated { actor, .. }
            | Event::StockAdjusted { actor, .. } => actor,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Event::TransferCreated { .. } => "transfer.created",
            Event::TransferChecked { .. } => "transfer.checked",
            Event::TransferDispatched { .. } => "transfer.dispatched",
            Event::TransferArrived { .. } => "transfer.arrived",
            Event::TransferVerified { .. } => "transfer.verified",
            Event::TransferCompleted { .. } => "transfer.completed",
            Event::TransferCancelled { .. } => "transfer.cancelled",
            Event::TransferUpdated { .. } => "transfer.updated",
            Event::StockAdjusted { .. } => "stock.adjusted",
        }
    }

    fn description(&self) -> String {
        match self {
            Event::TransferCreated {
                transfer_number, ..
            } => format!("Created stock transfer {}", transfer_number),
            Event::TransferChecked {
                transfer_number, ..
            } => format!("Checked stock transfer {}", transfer_number),
            Event::TransferDispatched {
                transfer_number, ..
            } => format!("Dispatched stock transfer {}", transfer_number),
            Event::TransferArrived {
                transfer_number, ..
            } => format!("Marked stock transfer {} as arrived", transfer_number),
            Event::TransferVerified {
                transfer_number, ..
            } => format!("Verified stock transfer {}", transfer_number),
            Event::TransferCompleted {
                transfer_number, ..
            } => format!("Completed stock transfer {}", transfer_number),
            Event::TransferCancelled {
                transfer_number,
                stock_restored,
                ..
            } => {
                if *stock_restored {
                    format!(
                        "Cancelled stock transfer {} and restored stock to source",
                        transfer_number
                    )
                } else {
                    format!("Cancelled stock transfer {}", transfer_number)
                }
            }
            Event::TransferUpdated {
                transfer_number, ..
            } => format!("Updated stock transfer {}", transfer_number),
            Event::StockAdjusted {
                variation_id,
                location_id,
                quantity,
                ..
            } => format!(
                "Adjusted stock of variation {} at location {} by {}",
                variation_id, location_id, quantity
            ),
        }
    }

    fn entity_ids(&self) -> Vec<Uuid> {
        match self {
            Event::TransferCreated { transfer_id, .. }
            | Event::TransferChecked { transfer_id, .. }
            | Event::TransferDispatched { transfer_id, .. }
            | Event::TransferArrived { transfer_id, .. }
            | Event::TransferVerified { transfer_id, .. }
            | Event::TransferCompleted { transfer_id, .. }
            | Event::TransferCancelled { transfer_id, .. }
            | Event::TransferUpdated { transfer_id, .. } => vec![*transfer_id],
            Event::StockAdjusted {
                variation_id,
                location_id,
                ..
            } => vec![*variation_id, *location_id],
        }
    }

    fn entity_type(&self) -> &'static str {
        match self {
            Event::StockAdjusted { .. } => "stock_ledger_entry",
            _ => "stock_transfer",
        }
    }

    fn to_audit_record(&self) -> AuditRecord {
        let actor = self.actor();
        AuditRecord {
            business_id: self.business_id(),
            actor_id: actor.actor_id,
            action: self.action().to_string(),
            entity_type: self.entity_type().to_string(),
            entity_ids: self.entity_ids(),
            description: self.description(),
            metadata: serde_json::to_value(self).unwrap_or(serde_json::Value::Null),
            ip_address: actor.ip_address.clone(),
            user_agent: actor.user_agent.clone(),
        }
    }

    fn to_notification(&self) -> Option<TransferNotification> {
        let transfer_id = match self {
            Event::TransferCreated { transfer_id, .. }
            | Event::TransferChecked { transfer_id, .. }
            | Event::TransferDispatched { transfer_id, .. }
            | Event::TransferArrived { transfer_id, .. }
            | Event::TransferVerified { transfer_id, .. }
            | Event::TransferCompleted { transfer_id, .. }
            | Event::TransferCancelled { transfer_id, .. } => *transfer_id,
            // Edits and ledger adjustments do not notify operators.
            Event::TransferUpdated { .. } | Event::StockAdjusted { .. } => return None,
        };

        Some(TransferNotification {
            business_id: self.business_id(),
            transfer_id,
            action: self.action().to_string(),
            message: self.description(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Drains the event channel, fanning each event out to the audit and
/// notification sidecars. Sink failures are logged and swallowed; they must
/// never surface into the mutation path.
pub async fn process_events(
    mut rx: mpsc::Receiver<Event>,
    audit: Arc<dyn AuditSink>,
    notifier: Arc<dyn NotificationSink>,
) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        info!(action = event.action(), "Processing event");

        if let Err(e) = audit.record_event(event.to_audit_record()).await {
            warn!(
                action = event.action(),
                error = %e,
                "audit sink rejected event"
            );
        }

        if let Some(notification) = event.to_notification() {
            if let Err(e) = notifier.notify(notification).await {
                warn!(
                    action = event.action(),
                    error = %e,
                    "notification sink rejected event"
                );
            }
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::audit::MockAuditSink;
    use crate::services::notifications::MockNotificationSink;

    fn actor_ctx() -> ActorContext {
        ActorContext {
            actor_id: Uuid::new_v4(),
            ip_address: Some("10.0.0.9".to_string()),
            user_agent: Some("storeflow-test".to_string()),
        }
    }

    #[test]
    fn audit_record_carries_actor_origin() {
        let event = Event::TransferDispatched {
            transfer_id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            transfer_number: "TR-202608-0001".to_string(),
            actor: actor_ctx(),
        };

        let record = event.to_audit_record();
        assert_eq!(record.action, "transfer.dispatched");
        assert_eq!(record.entity_type, "stock_transfer");
        assert_eq!(record.ip_address.as_deref(), Some("10.0.0.9"));
        assert_eq!(record.entity_ids.len(), 1);
    }

    #[test]
    fn updates_do_not_notify() {
        let event = Event::TransferUpdated {
            transfer_id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            transfer_number: "TR-202608-0001".to_string(),
            actor: actor_ctx(),
        };
        assert!(event.to_notification().is_none());
    }

    #[tokio::test]
    async fn failing_sinks_do_not_stop_the_loop() {
        let (tx, rx) = mpsc::channel(8);

        let mut audit = MockAuditSink::new();
        audit
            .expect_record_event()
            .times(2)
            .returning(|_| Err(anyhow::anyhow!("audit store down")));
        let mut notifier = MockNotificationSink::new();
        notifier
            .expect_notify()
            .times(2)
            .returning(|_| Err(anyhow::anyhow!("webhook down")));

        let handle = tokio::spawn(process_events(rx, Arc::new(audit), Arc::new(notifier)));

        for _ in 0..2 {
            tx.send(Event::TransferCompleted {
                transfer_id: Uuid::new_v4(),
                business_id: Uuid::new_v4(),
                transfer_number: "TR-202608-0002".to_string(),
                actor: actor_ctx(),
            })
            .await
            .unwrap();
        }

        drop(tx);
        handle.await.unwrap();
    }
}
