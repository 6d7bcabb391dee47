//! Nullable delegates: in-memory membership sources and directory.

use quorate_governance::{DelegateDirectory, DelegateError, MembershipSource};
use quorate_types::{Principal, RoleKind};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Listing {
    members: BTreeMap<RoleKind, Vec<Principal>>,
    failing: bool,
}

/// An external membership registry whose lists and availability are scripted.
///
/// Thread-safe so it can be shared between a test and the engine's directory.
#[derive(Default)]
pub struct NullDelegate {
    inner: Mutex<Listing>,
}

impl NullDelegate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with an initial member list for one role.
    pub fn with_members(role: RoleKind, members: Vec<Principal>) -> Self {
        let delegate = Self::new();
        delegate.set_members(role, members);
        delegate
    }

    pub fn set_members(&self, role: RoleKind, members: Vec<Principal>) {
        self.inner.lock().unwrap().members.insert(role, members);
    }

    pub fn add(&self, role: RoleKind, who: Principal) {
        self.inner
            .lock()
            .unwrap()
            .members
            .entry(role)
            .or_default()
            .push(who);
    }

    pub fn remove(&self, role: RoleKind, who: &Principal) {
        if let Some(list) = self.inner.lock().unwrap().members.get_mut(&role) {
            list.retain(|p| p != who);
        }
    }

    /// Make every read fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.inner.lock().unwrap().failing = failing;
    }
}

impl MembershipSource for NullDelegate {
    fn members(&self, role: RoleKind) -> Result<Vec<Principal>, DelegateError> {
        let inner = self.inner.lock().unwrap();
        if inner.failing {
            return Err(DelegateError::Unavailable("null delegate set to fail".into()));
        }
        Ok(inner.members.get(&role).cloned().unwrap_or_default())
    }

    fn is_member(&self, role: RoleKind, who: &Principal) -> Result<bool, DelegateError> {
        let inner = self.inner.lock().unwrap();
        if inner.failing {
            return Err(DelegateError::Unavailable("null delegate set to fail".into()));
        }
        Ok(inner.members.get(&role).is_some_and(|m| m.contains(who)))
    }
}

/// A shared directory of deployed delegates.
///
/// Clones share the same deployments, so a test can keep a handle after
/// giving one to the engine.
#[derive(Clone, Default)]
pub struct NullDirectory {
    deployed: Arc<Mutex<HashMap<Principal, Arc<dyn MembershipSource>>>>,
}

impl NullDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `source` resolvable at `id`.
    pub fn deploy(&self, id: Principal, source: Arc<dyn MembershipSource>) {
        self.deployed.lock().unwrap().insert(id, source);
    }

    pub fn undeploy(&self, id: &Principal) {
        self.deployed.lock().unwrap().remove(id);
    }
}

impl DelegateDirectory for NullDirectory {
    fn resolve(&self, id: &Principal) -> Option<Arc<dyn MembershipSource>> {
        self.deployed.lock().unwrap().get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_membership() {
        let d = NullDelegate::with_members(RoleKind::Voter, vec![Principal::derive("a")]);
        d.add(RoleKind::Voter, Principal::derive("b"));
        d.remove(RoleKind::Voter, &Principal::derive("a"));
        assert_eq!(d.members(RoleKind::Voter).unwrap(), vec![Principal::derive("b")]);
        assert!(d.members(RoleKind::Overlord).unwrap().is_empty());
    }

    #[test]
    fn failing_mode() {
        let d = NullDelegate::new();
        d.set_failing(true);
        assert!(d.members(RoleKind::Voter).is_err());
        assert!(d.is_member(RoleKind::Voter, &Principal::derive("a")).is_err());
        d.set_failing(false);
        assert!(d.members(RoleKind::Voter).is_ok());
    }

    #[test]
    fn directory_clones_share_deployments() {
        let dir = NullDirectory::new();
        let handle = dir.clone();
        handle.deploy(Principal::derive("d"), Arc::new(NullDelegate::new()));
        assert!(dir.resolve(&Principal::derive("d")).is_some());
        dir.undeploy(&Principal::derive("d"));
        assert!(handle.resolve(&Principal::derive("d")).is_none());
    }
}
