//! Notifications emitted to off-chain indexers.

use quorate_types::{ActionKey, Epoch, Principal, RoleKind, RoundId};
use serde::Serialize;

/// Governance-level events observers can subscribe to via the [`EventBus`].
///
/// Events are delivered only after the transaction that produced them
/// commits; a failed call emits nothing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GovernanceEvent {
    /// A vote was recorded.
    VoteCast {
        key: ActionKey,
        round: RoundId,
        round_number: u64,
        voter: Principal,
        votes: u64,
        threshold: u64,
    },
    /// A stale round was discarded before a new vote opened its successor.
    ProposalExpired {
        key: ActionKey,
        round: RoundId,
        round_number: u64,
        votes: u64,
    },
    /// A stale active session was released for another proposal.
    SessionReleased { key: ActionKey, round: RoundId },
    /// An action took effect. `votes` is zero for direct mutations.
    ActionExecuted {
        key: ActionKey,
        votes: u64,
        threshold: u64,
        epoch: Epoch,
    },
    /// Local management of a role was permanently handed to its delegates.
    DomainRevoked { role: RoleKind },
}

/// Synchronous fan-out event bus.
///
/// Listeners run inline on the calling thread; keep handlers fast.
pub struct EventBus {
    listeners: Vec<Box<dyn Fn(&GovernanceEvent) + Send + Sync>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&GovernanceEvent) + Send + Sync>) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &GovernanceEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn every_listener_sees_every_event() {
        let mut bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second"] {
            let seen = Arc::clone(&seen);
            bus.subscribe(Box::new(move |e| {
                if let GovernanceEvent::DomainRevoked { role } = e {
                    seen.lock().unwrap().push(format!("{tag}:{role}"));
                }
            }));
        }
        bus.emit(&GovernanceEvent::DomainRevoked {
            role: RoleKind::Overlord,
        });
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["first:overlord".to_string(), "second:overlord".to_string()]
        );
    }
}
