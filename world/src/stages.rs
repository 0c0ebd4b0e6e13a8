//! Stage aggregation: partitions a roster into weeks-until-deadline buckets.

use std::collections::BTreeMap;

use deadline_orbit_core::{EntityId, RosterEntry, StageKey, Timestamp};

/// Members of a single stage in roster order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StageMembership {
    /// Number of members.
    pub total: u32,
    /// Members in roster order.
    pub members: Vec<EntityId>,
}

/// Outcome of classifying a roster snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Classification {
    /// Populated stages keyed by weeks until deadline.
    pub stages: BTreeMap<StageKey, StageMembership>,
    /// Entities whose deadline already elapsed, in roster order.
    pub expired: Vec<EntityId>,
}

impl Classification {
    /// Nearest non-expired stage, if any entity is still orbiting.
    #[must_use]
    pub fn smallest(&self) -> Option<StageKey> {
        self.stages.keys().next().copied()
    }
}

/// Buckets every roster record by whole weeks until its deadline.
///
/// Records whose deadline is at or before `now` are expired. Entity
/// identifiers equal roster positions.
#[must_use]
pub fn classify(roster: &[RosterEntry], now: Timestamp) -> Classification {
    let mut classification = Classification::default();
    for (index, entry) in roster.iter().enumerate() {
        let id = EntityId::new(index as u32);
        if entry.deadline <= now {
            classification.expired.push(id);
            continue;
        }

        let key = StageKey::new(now.weeks_until(entry.deadline));
        let membership = classification.stages.entry(key).or_default();
        membership.total += 1;
        membership.members.push(id);
    }
    classification
}
