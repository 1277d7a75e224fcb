//! Segregation-of-duties policy for the transfer workflow.
//!
//! A pure, table-driven decision: given the step being attempted, the roles
//! the actor already played on this transfer, and the business settings,
//! decide whether the same person may go ahead. No side effects; the engine
//! consults this before every transition.

use std::fmt;

use crate::entities::{sod_settings, transfer_step_event, transfer_step_event::TransferStep};
use uuid::Uuid;

/// Roles an actor has already performed on one transfer, derived from the
/// step-event log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActorRoles {
    pub is_creator: bool,
    pub is_checker: bool,
    pub is_sender: bool,
    pub is_arrival_marker: bool,
    pub is_verifier: bool,
}

impl ActorRoles {
    pub fn from_events(actor_id: Uuid, events: &[transfer_step_event::Model]) -> Self {
        let mut roles = ActorRoles::default();
        for event in events.iter().filter(|e| e.actor_id == actor_id) {
            match event.step {
                TransferStep::Create => roles.is_creator = true,
                TransferStep::Check => roles.is_checker = true,
                TransferStep::Send => roles.is_sender = true,
                TransferStep::Arrive => roles.is_arrival_marker = true,
                TransferStep::Verify => roles.is_verifier = true,
                TransferStep::Complete | TransferStep::Cancel => {}
            }
        }
        roles
    }

    /// "Receiver" for completion purposes: whoever took delivery, i.e. marked
    /// arrival or verified the counts.
    fn is_receiver(&self) -> bool {
        self.is_arrival_marker || self.is_verifier
    }
}

/// Refusal with the rule that tripped, for the 403 message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SodViolation {
    pub step: TransferStep,
    pub rule: &'static str,
}

impl fmt::Display for SodViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "segregation of duties forbids the {} of this transfer to {} it",
            self.rule, self.step
        )
    }
}

/// Decides whether an actor with `roles` may perform `step` under `settings`.
pub fn may_perform(
    step: TransferStep,
    roles: &ActorRoles,
    settings: &sod_settings::Model,
) -> Result<(), SodViolation> {
    if !settings.enforce_transfer_sod {
        return Ok(());
    }

    let deny = |rule: &'static str| Err(SodViolation { step, rule });

    match step {
        TransferStep::Check => {
            if roles.is_creator && !settings.allow_creator_check {
                return deny("creator");
            }
        }
        TransferStep::Send => {
            if roles.is_creator && !settings.allow_creator_send {
                return deny("creator");
            }
            if roles.is_checker && !settings.allow_checker_send {
                return deny("checker");
            }
        }
        TransferStep::Arrive | TransferStep::Verify => {
            if roles.is_creator && !settings.allow_creator_receive {
                return deny("creator");
            }
        }
        TransferStep::Complete => {
            if roles.is_creator && !settings.allow_creator_complete {
                return deny("creator");
            }
            if roles.is_sender && !settings.allow_sender_complete {
                return deny("sender");
            }
            if roles.is_receiver() && !settings.allow_receiver_complete {
                return deny("receiver");
            }
        }
        // Anyone with the permission bit may open or abort a transfer.
        TransferStep::Create | TransferStep::Cancel => {}
    }

    Ok(())
}
