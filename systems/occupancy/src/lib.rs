#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Live occupancy mirror: which occupant currently holds which physical slot.
//!
//! The map is fed by join/leave events pushed from the server. A leave clears
//! the occupant but keeps the slot key, so lookups never need an existence
//! check and no entry is ever deleted.

pub mod wire;

use std::collections::BTreeMap;

use deadline_orbit_core::{profile_url, SlotId, DEFAULT_PORTRAIT};
use thiserror::Error;

pub use self::wire::{decode, OccupancyMessage, Subscription};

/// Person currently holding a slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Occupant {
    /// Handle of the occupant.
    pub login: String,
    /// Portrait address of the occupant.
    pub portrait: String,
}

/// Join or leave notification for a single slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OccupancyEvent {
    /// Slot the event refers to.
    pub slot: SlotId,
    /// Handle of the person joining or leaving.
    pub login: String,
    /// Portrait of the person joining; ignored on leave.
    pub portrait: String,
    /// Whether the person left the slot.
    pub left: bool,
}

impl From<OccupancyMessage> for OccupancyEvent {
    fn from(message: OccupancyMessage) -> Self {
        Self {
            slot: SlotId::new(message.host),
            login: message.login,
            portrait: message.image,
            left: message.left,
        }
    }
}

/// Effect of applying an event to the map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OccupancyChange {
    /// The slot now holds the provided occupant.
    Joined {
        /// Slot that changed.
        slot: SlotId,
    },
    /// The slot was cleared.
    Left {
        /// Slot that changed.
        slot: SlotId,
    },
}

/// Errors raised while applying occupancy events.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OccupancyError {
    /// The event did not name a slot.
    #[error("occupancy event for `{login}` has no slot identifier")]
    MissingSlot {
        /// Handle carried by the rejected event.
        login: String,
    },
}

/// Data shown when hovering an occupied slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OccupancyPopup {
    /// Slot being hovered.
    pub slot: SlotId,
    /// Handle of the occupant.
    pub login: String,
    /// Portrait of the occupant.
    pub portrait: String,
    /// Profile page of the occupant.
    pub profile_url: String,
}

/// Authoritative mapping from slot to current occupant.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OccupancyMap {
    slots: BTreeMap<SlotId, Option<Occupant>>,
}

impl OccupancyMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a join or leave event.
    ///
    /// A join replaces the slot's occupant wholesale; a leave clears it while
    /// keeping the key. Joins without a portrait use the default portrait.
    pub fn apply_event(&mut self, event: OccupancyEvent) -> Result<OccupancyChange, OccupancyError> {
        if event.slot.as_str().trim().is_empty() {
            return Err(OccupancyError::MissingSlot { login: event.login });
        }

        if event.left {
            let _ = self.slots.insert(event.slot.clone(), None);
            return Ok(OccupancyChange::Left { slot: event.slot });
        }

        let portrait = if event.portrait.trim().is_empty() {
            DEFAULT_PORTRAIT.to_owned()
        } else {
            event.portrait
        };
        let occupant = Occupant {
            login: event.login,
            portrait,
        };
        let _ = self.slots.insert(event.slot.clone(), Some(occupant));
        Ok(OccupancyChange::Joined { slot: event.slot })
    }

    /// Current occupant of a slot; `None` when unoccupied or never seen.
    #[must_use]
    pub fn lookup(&self, slot: &SlotId) -> Option<&Occupant> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Reports whether the slot has ever been reported.
    #[must_use]
    pub fn knows_slot(&self, slot: &SlotId) -> bool {
        self.slots.contains_key(slot)
    }

    /// Every slot ever reported, in identifier order.
    pub fn slots(&self) -> impl Iterator<Item = &SlotId> {
        self.slots.keys()
    }

    /// Number of slots currently occupied.
    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.slots.values().filter(|slot| slot.is_some()).count()
    }

    /// Popup data for a hovered slot, only while it is occupied.
    #[must_use]
    pub fn popup(&self, slot: &SlotId) -> Option<OccupancyPopup> {
        self.lookup(slot).map(|occupant| OccupancyPopup {
            slot: slot.clone(),
            login: occupant.login.clone(),
            portrait: occupant.portrait.clone(),
            profile_url: profile_url(&occupant.login),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn join(slot: &str, login: &str) -> OccupancyEvent {
        OccupancyEvent {
            slot: SlotId::new(slot),
            login: login.to_owned(),
            portrait: format!("https://cdn.example/{login}.jpg"),
            left: false,
        }
    }

    fn leave(slot: &str, login: &str) -> OccupancyEvent {
        OccupancyEvent {
            left: true,
            portrait: String::new(),
            ..join(slot, login)
        }
    }

    #[test]
    fn join_populates_lookup() {
        let mut map = OccupancyMap::new();
        let change = map.apply_event(join("e1r1p1", "alice")).expect("valid event");

        assert_eq!(
            change,
            OccupancyChange::Joined {
                slot: SlotId::new("e1r1p1")
            }
        );
        let occupant = map.lookup(&SlotId::new("e1r1p1")).expect("occupied");
        assert_eq!(occupant.login, "alice");
    }

    #[test]
    fn leave_clears_occupant_but_keeps_slot() {
        let mut map = OccupancyMap::new();
        let slot = SlotId::new("e1r1p1");
        let _ = map.apply_event(join("e1r1p1", "alice")).expect("join");
        let _ = map.apply_event(leave("e1r1p1", "alice")).expect("leave");

        assert!(map.lookup(&slot).is_none());
        assert!(map.knows_slot(&slot));
        assert_eq!(map.slots().count(), 1);
        assert_eq!(map.occupied_count(), 0);
    }

    #[test]
    fn rejoin_overwrites_cleanly() {
        let mut map = OccupancyMap::new();
        let slot = SlotId::new("e2r4p7");
        let _ = map.apply_event(join("e2r4p7", "alice")).expect("join");
        let _ = map.apply_event(leave("e2r4p7", "alice")).expect("leave");
        let _ = map.apply_event(join("e2r4p7", "bob")).expect("join");

        let occupant = map.lookup(&slot).expect("occupied");
        assert_eq!(occupant.login, "bob");
        assert_eq!(occupant.portrait, "https://cdn.example/bob.jpg");
    }

    #[test]
    fn leave_for_unknown_slot_registers_the_key() {
        let mut map = OccupancyMap::new();
        let slot = SlotId::new("e3r1p2");
        let _ = map.apply_event(leave("e3r1p2", "ghost")).expect("leave");
        assert!(map.knows_slot(&slot));
        assert!(map.lookup(&slot).is_none());
    }

    #[test]
    fn empty_slot_is_rejected() {
        let mut map = OccupancyMap::new();
        let error = map.apply_event(join(" ", "alice")).expect_err("missing slot");
        assert_eq!(
            error,
            OccupancyError::MissingSlot {
                login: "alice".to_owned()
            }
        );
        assert_eq!(map.slots().count(), 0);
    }

    #[test]
    fn join_without_portrait_uses_default() {
        let mut map = OccupancyMap::new();
        let event = OccupancyEvent {
            portrait: String::new(),
            ..join("e1r1p1", "alice")
        };
        let _ = map.apply_event(event).expect("join");
        let occupant = map.lookup(&SlotId::new("e1r1p1")).expect("occupied");
        assert_eq!(occupant.portrait, DEFAULT_PORTRAIT);
    }

    #[test]
    fn popup_only_for_occupied_slots() {
        let mut map = OccupancyMap::new();
        let slot = SlotId::new("e1r1p1");
        assert!(map.popup(&slot).is_none());

        let _ = map.apply_event(join("e1r1p1", "alice")).expect("join");
        let popup = map.popup(&slot).expect("popup");
        assert_eq!(popup.profile_url, "https://profile.intra.42.fr/users/alice");

        let _ = map.apply_event(leave("e1r1p1", "alice")).expect("leave");
        assert!(map.popup(&slot).is_none());
    }
}
