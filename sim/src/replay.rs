//! Drives an instance through a scenario's steps.

use anyhow::Context;
use quorate_domains::{ImplementationSlot, Instance};
use quorate_governance::{DomainEffects, GovernanceError, GovernanceEvent, MembershipOnly};
use quorate_nullables::{NullClock, NullDelegate, NullDirectory};
use quorate_types::{Epoch, RoleKind};
use quorate_utils::{Outcome, OutcomeCounter, OutcomeTally};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::scenario::{action_key, principal, Expect, InstanceKind, Scenario, Step};

/// What a replay ended with.
#[derive(Debug, Serialize)]
pub struct Summary {
    pub instance: InstanceKind,
    pub epoch: Epoch,
    pub counters: OutcomeTally,
    /// Instance-specific end state (validators, fee schedule, implementation).
    pub domain: serde_json::Value,
    #[serde(skip)]
    pub snapshot: Vec<u8>,
}

impl Summary {
    pub fn mismatches(&self) -> u64 {
        self.counters.mismatches
    }
}

type Sink = Box<dyn Fn(&GovernanceEvent) + Send + Sync>;

/// Replay `scenario`, handing every committed event to `sink`.
///
/// Steps whose outcome differs from their `expect` are counted, not fatal;
/// malformed steps abort the replay.
pub fn replay(scenario: &Scenario, sink: Sink) -> anyhow::Result<Summary> {
    let directory = NullDirectory::new();
    let mut delegates = HashMap::new();
    for spec in &scenario.delegates {
        let delegate = Arc::new(NullDelegate::new());
        for (role, members) in &spec.members {
            let role: RoleKind = role.parse()?;
            let members = members
                .iter()
                .map(|m| principal(m))
                .collect::<anyhow::Result<_>>()?;
            delegate.set_members(role, members);
        }
        directory.deploy(principal(&spec.id)?, delegate.clone());
        delegates.insert(spec.id.clone(), delegate);
    }

    let config = scenario.resolved_config();
    let genesis = scenario.genesis.resolve()?;
    let directory = Box::new(directory);
    let stats = Arc::new(OutcomeCounter::new());

    let (epoch, domain, snapshot) = match scenario.instance {
        InstanceKind::ValidatorAllowList => {
            let mut instance = Instance::new(config, &genesis, directory, MembershipOnly)?;
            drive(&mut instance, &scenario.steps, &delegates, sink, &stats)?;
            let domain = serde_json::json!({ "validators": instance.validators() });
            (instance.epoch(), domain, instance.save_state()?)
        }
        InstanceKind::FeeRegistry => {
            let mut instance = Instance::new(config, &genesis, directory, scenario.fees.clone())?;
            drive(&mut instance, &scenario.steps, &delegates, sink, &stats)?;
            let domain = serde_json::to_value(instance.schedule())?;
            (instance.epoch(), domain, instance.save_state()?)
        }
        InstanceKind::UpgradeProxy => {
            let label = scenario
                .implementation
                .as_deref()
                .context("upgrade_proxy scenarios need an initial implementation")?;
            let slot = ImplementationSlot::new(principal(label)?);
            let mut instance = Instance::new(config, &genesis, directory, slot)?;
            drive(&mut instance, &scenario.steps, &delegates, sink, &stats)?;
            let domain = serde_json::to_value(instance.effects())?;
            (instance.epoch(), domain, instance.save_state()?)
        }
    };

    Ok(Summary {
        instance: scenario.instance,
        epoch,
        counters: stats.snapshot(),
        domain,
        snapshot,
    })
}

fn drive<E: DomainEffects>(
    instance: &mut Instance<E>,
    steps: &[Step],
    delegates: &HashMap<String, Arc<NullDelegate>>,
    sink: Sink,
    stats: &Arc<OutcomeCounter>,
) -> anyhow::Result<()> {
    let counting = Arc::clone(stats);
    instance.subscribe(Box::new(move |event: &GovernanceEvent| {
        counting.record(Outcome::Event);
        sink(event);
    }));

    let clock = NullClock::default();
    for (index, step) in steps.iter().enumerate() {
        stats.record(Outcome::Step);
        match step {
            Step::Vote {
                at,
                caller,
                action,
                target,
                value,
                expect,
            } => {
                if *at < clock.now().as_u64() {
                    anyhow::bail!("step {index}: tick {at} is before {}", clock.now());
                }
                clock.set(*at);
                let key = action_key(*action, target.as_deref(), *value)?;
                let caller = principal(caller)?;
                stats.record(Outcome::Vote);
                let result = instance
                    .vote(&caller, key, clock.now())
                    .map(|receipt| receipt.executed);
                settle(index, *expect, result, stats);
            }
            Step::Direct {
                caller,
                action,
                target,
                value,
                expect,
            } => {
                let key = action_key(*action, target.as_deref(), *value)?;
                let caller = principal(caller)?;
                stats.record(Outcome::Direct);
                let result = instance.apply_direct(&caller, key).map(|_| true);
                settle(index, *expect, result, stats);
            }
            Step::SetMembers {
                delegate,
                role,
                members,
            } => {
                let members = members
                    .iter()
                    .map(|m| principal(m))
                    .collect::<anyhow::Result<_>>()?;
                lookup(delegates, delegate)?.set_members(*role, members);
                tracing::debug!(step = index, %delegate, %role, "delegate membership changed");
            }
            Step::SetFailing { delegate, failing } => {
                lookup(delegates, delegate)?.set_failing(*failing);
                tracing::debug!(step = index, %delegate, failing, "delegate availability changed");
            }
        }
    }
    Ok(())
}

fn lookup<'a>(
    delegates: &'a HashMap<String, Arc<NullDelegate>>,
    label: &str,
) -> anyhow::Result<&'a NullDelegate> {
    delegates
        .get(label)
        .map(|d| d.as_ref())
        .with_context(|| format!("no delegate {label:?} in scenario"))
}

fn settle(index: usize, expect: Expect, result: Result<bool, GovernanceError>, stats: &OutcomeCounter) {
    match &result {
        Ok(true) => stats.record(Outcome::Executed),
        Ok(false) => {}
        Err(_) => stats.record(Outcome::Rejected),
    }
    if outcome_matches(expect, &result) {
        tracing::debug!(step = index, ?expect, "step outcome as expected");
    } else {
        stats.record(Outcome::Mismatch);
        match result {
            Ok(executed) => {
                tracing::error!(step = index, ?expect, executed, "unexpected step outcome")
            }
            Err(e) => tracing::error!(step = index, ?expect, error = %e, "unexpected step outcome"),
        }
    }
}

fn outcome_matches(expect: Expect, result: &Result<bool, GovernanceError>) -> bool {
    match (expect, result) {
        (Expect::Success, Ok(_)) => true,
        (Expect::Executed, Ok(executed)) => *executed,
        (Expect::Pending, Ok(executed)) => !*executed,
        (_, Ok(_)) => false,
        (expected, Err(e)) => error_kind(e) == Some(expected),
    }
}

fn error_kind(e: &GovernanceError) -> Option<Expect> {
    match e {
        GovernanceError::Unauthorized { .. } => Some(Expect::Unauthorized),
        GovernanceError::InvalidTarget(_) => Some(Expect::InvalidTarget),
        GovernanceError::AlreadyVoted { .. } => Some(Expect::AlreadyVoted),
        GovernanceError::SessionBusy { .. } => Some(Expect::SessionBusy),
        GovernanceError::CapacityExceeded { .. } => Some(Expect::CapacityExceeded),
        GovernanceError::PreconditionFailed(_) => Some(Expect::PreconditionFailed),
        GovernanceError::ActionExecutionFailed(_) => Some(Expect::ActionExecutionFailed),
        GovernanceError::Config(_) | GovernanceError::Snapshot(_) => None,
    }
}
