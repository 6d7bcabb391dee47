//! Principal registry: role sets with local and delegated membership.
//!
//! Each role keeps an insertion-ordered local list plus zero or more external
//! delegates. Delegates are read-only membership sources: they are asked for
//! their own members and nothing else, so aggregation is always exactly one
//! hop deep.

use quorate_types::{Principal, RoleKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::aggregator;
use crate::error::DelegateError;

/// Read-only membership capability implemented by external delegates.
pub trait MembershipSource: Send + Sync {
    /// All principals this source vouches for in `role`.
    fn members(&self, role: RoleKind) -> Result<Vec<Principal>, DelegateError>;

    /// Whether `who` holds `role` according to this source.
    fn is_member(&self, role: RoleKind, who: &Principal) -> Result<bool, DelegateError>;
}

/// Resolves delegate identifiers to live membership sources.
///
/// This is the host ledger's "contract at address" lookup.
pub trait DelegateDirectory: Send + Sync {
    fn resolve(&self, id: &Principal) -> Option<Arc<dyn MembershipSource>>;
}

/// A registered delegate: its identifier and the source it resolved to.
#[derive(Clone)]
pub struct Delegate {
    pub id: Principal,
    source: Arc<dyn MembershipSource>,
}

impl Delegate {
    pub fn new(id: Principal, source: Arc<dyn MembershipSource>) -> Self {
        Self { id, source }
    }

    pub fn source(&self) -> &dyn MembershipSource {
        self.source.as_ref()
    }
}

impl fmt::Debug for Delegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delegate").field("id", &self.id).finish()
    }
}

/// Membership of a single role.
#[derive(Clone, Debug, Default)]
pub struct RoleSet {
    local: Vec<Principal>,
    delegates: Vec<Delegate>,
    revoked: bool,
}

impl RoleSet {
    pub fn local_members(&self) -> &[Principal] {
        &self.local
    }

    pub fn delegates(&self) -> &[Delegate] {
        &self.delegates
    }

    pub fn delegate_ids(&self) -> Vec<Principal> {
        self.delegates.iter().map(|d| d.id).collect()
    }

    pub fn has_delegate(&self, id: &Principal) -> bool {
        self.delegates.iter().any(|d| &d.id == id)
    }

    pub fn contains_local(&self, who: &Principal) -> bool {
        self.local.contains(who)
    }

    /// Whether management of this role has been permanently handed to its delegates.
    pub fn is_revoked(&self) -> bool {
        self.revoked
    }

    pub(crate) fn insert_local(&mut self, who: Principal) {
        if !self.local.contains(&who) {
            self.local.push(who);
        }
    }

    pub(crate) fn remove_local(&mut self, who: &Principal) -> bool {
        let before = self.local.len();
        self.local.retain(|p| p != who);
        self.local.len() != before
    }

    pub(crate) fn attach_delegate(&mut self, delegate: Delegate) {
        if !self.has_delegate(&delegate.id) {
            self.delegates.push(delegate);
        }
    }

    pub(crate) fn mark_revoked(&mut self) {
        self.revoked = true;
    }
}

/// Serializable form of a [`RoleSet`]; delegates are kept by id only.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RoleSnapshot {
    pub local: Vec<Principal>,
    pub delegates: Vec<Principal>,
    pub revoked: bool,
}

/// All role sets of one governance instance.
#[derive(Clone, Debug, Default)]
pub struct PrincipalRegistry {
    sets: BTreeMap<RoleKind, RoleSet>,
}

impl PrincipalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn role(&self, role: RoleKind) -> &RoleSet {
        static EMPTY: RoleSet = RoleSet {
            local: Vec::new(),
            delegates: Vec::new(),
            revoked: false,
        };
        self.sets.get(&role).unwrap_or(&EMPTY)
    }

    pub(crate) fn role_mut(&mut self, role: RoleKind) -> &mut RoleSet {
        self.sets.entry(role).or_default()
    }

    /// Local members followed by each delegate's members.
    pub fn effective_members(&self, role: RoleKind) -> Vec<Principal> {
        aggregator::effective_members(self.role(role), role)
    }

    pub fn is_effective_member(&self, role: RoleKind, who: &Principal) -> bool {
        aggregator::is_effective_member(self.role(role), role, who)
    }

    pub(crate) fn snapshot(&self) -> Vec<(RoleKind, RoleSnapshot)> {
        self.sets
            .iter()
            .map(|(role, set)| {
                (
                    *role,
                    RoleSnapshot {
                        local: set.local.clone(),
                        delegates: set.delegate_ids(),
                        revoked: set.revoked,
                    },
                )
            })
            .collect()
    }

    /// Rebuild the registry from a snapshot, re-resolving delegates by id.
    pub(crate) fn restore(
        roles: Vec<(RoleKind, RoleSnapshot)>,
        directory: &dyn DelegateDirectory,
    ) -> Result<Self, Principal> {
        let mut registry = Self::new();
        for (role, snapshot) in roles {
            let set = registry.role_mut(role);
            set.local = snapshot.local;
            set.revoked = snapshot.revoked;
            for id in snapshot.delegates {
                let source = directory.resolve(&id).ok_or(id)?;
                set.delegates.push(Delegate::new(id, source));
            }
        }
        Ok(registry)
    }
}
