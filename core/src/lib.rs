#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Deadline Orbit engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! snapshots, and respond exclusively with new command batches.

use std::{fmt, sync::Arc};

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Length of a single stage bucket expressed in milliseconds.
pub const WEEK_MS: i64 = 7 * 24 * 3600 * 1000;

/// Portrait used when a roster record arrives without one.
pub const DEFAULT_PORTRAIT: &str =
    "https://cdn.intra.42.fr/users/a58fb999e453e72955ab3d926d5cf872/small_sheldon.jpeg";

/// Base address of public profile pages.
pub const PROFILE_BASE_URL: &str = "https://profile.intra.42.fr/users/";

/// Emphasis scale applied to entities nobody is hovering.
pub const NEUTRAL_SCALE: f32 = 1.0;

/// Height of the expired overview grid above the orbital plane. The grid sits
/// between the rings and the camera so it is drawn and hit first.
pub const OVERVIEW_PLANE_Z: f32 = 6.0;

/// Builds the profile page address for the provided login.
#[must_use]
pub fn profile_url(login: &str) -> String {
    format!("{PROFILE_BASE_URL}{login}")
}

/// Point in time expressed as milliseconds since the Unix epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from epoch milliseconds.
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Epoch milliseconds represented by the timestamp.
    #[must_use]
    pub const fn millis(&self) -> i64 {
        self.0
    }

    /// Returns a timestamp shifted by the provided signed number of milliseconds.
    #[must_use]
    pub const fn offset_by(self, millis: i64) -> Self {
        Self(self.0.saturating_add(millis))
    }

    /// Whole weeks from `self` until `deadline`, rounded toward negative infinity.
    #[must_use]
    pub const fn weeks_until(self, deadline: Timestamp) -> i64 {
        deadline.0.saturating_sub(self.0).div_euclid(WEEK_MS)
    }
}

/// Unique identifier assigned to a roster entity, equal to its roster position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates a new entity identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Whole weeks remaining until the deadline of every member of a stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StageKey(i64);

impl StageKey {
    /// Creates a stage key from a weeks-until-deadline value.
    #[must_use]
    pub const fn new(diff: i64) -> Self {
        Self(diff)
    }

    /// Weeks-until-deadline value carried by the key.
    #[must_use]
    pub const fn diff(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for StageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}w", self.0)
    }
}

/// Identifier of a physical slot (workstation host name) in the occupancy map.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(String);

impl SlotId {
    /// Creates a slot identifier from its textual form.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Textual form of the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Roster record describing one person approaching the deadline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Handle used for display and search.
    pub login: String,
    /// Address of the portrait image.
    pub portrait: String,
    /// Instant at which the person's deadline elapses.
    pub deadline: Timestamp,
    /// Physical slot currently associated with the person, if known.
    pub slot: Option<SlotId>,
}

impl RosterEntry {
    /// Creates a roster record, substituting [`DEFAULT_PORTRAIT`] for an empty portrait.
    #[must_use]
    pub fn new(login: impl Into<String>, portrait: impl Into<String>, deadline: Timestamp) -> Self {
        let portrait = portrait.into();
        let portrait = if portrait.trim().is_empty() {
            DEFAULT_PORTRAIT.to_owned()
        } else {
            portrait
        };
        Self {
            login: login.into(),
            portrait,
            deadline,
            slot: None,
        }
    }

    /// Associates the record with a physical slot.
    #[must_use]
    pub fn with_slot(mut self, slot: SlotId) -> Self {
        self.slot = Some(slot);
        self
    }
}

/// Stage currently emphasised by navigation and listed in the side panel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Focus {
    /// A numeric stage of orbiting entities.
    Stage(StageKey),
    /// The synthetic pseudo-bucket holding every expired entity.
    Expired,
}

impl Focus {
    /// Returns the numeric stage behind the focus, if any.
    #[must_use]
    pub const fn stage(&self) -> Option<StageKey> {
        match self {
            Self::Stage(key) => Some(*key),
            Self::Expired => None,
        }
    }
}

/// Discrete visibility mode shared by picking and the render driver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum VisibilityMode {
    /// Stages orbit normally; expired entities are hidden.
    #[default]
    Orbiting,
    /// The expired pseudo-bucket is focused and its members are shown.
    ExpiredOverview,
}

impl VisibilityMode {
    /// Derives the visibility mode implied by a focus.
    #[must_use]
    pub const fn for_focus(focus: Option<Focus>) -> Self {
        match focus {
            Some(Focus::Expired) => Self::ExpiredOverview,
            _ => Self::Orbiting,
        }
    }
}

/// Emphasis level applied to a stage's path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Emphasis {
    /// Default appearance.
    #[default]
    Resting,
    /// Highlighted because the stage is focused.
    Raised,
}

/// Closed loop of points shared by every member of a stage.
///
/// The final point duplicates the first, so valid phases lie in
/// `0..=len - 2`. Cloning shares the underlying storage.
#[derive(Clone, Debug, PartialEq)]
pub struct OrbitPath {
    points: Arc<[Vec2]>,
}

impl OrbitPath {
    /// Wraps the provided points without copying them again on clone.
    #[must_use]
    pub fn from_points(points: Vec<Vec2>) -> Self {
        Self {
            points: points.into(),
        }
    }

    /// Number of points, including the closing duplicate.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Reports whether the path has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Largest valid phase index.
    #[must_use]
    pub fn last_phase(&self) -> usize {
        self.points.len().saturating_sub(2)
    }

    /// Point at the provided phase, if it exists.
    #[must_use]
    pub fn point(&self, phase: usize) -> Option<Vec2> {
        self.points.get(phase).copied()
    }

    /// All points in traversal order.
    #[must_use]
    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    /// Reports whether both handles share the same storage.
    #[must_use]
    pub fn shares_storage_with(&self, other: &OrbitPath) -> bool {
        Arc::ptr_eq(&self.points, &other.points)
    }
}

/// Half-line used for pointer hit testing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    origin: Vec3,
    direction: Vec3,
}

impl Ray {
    /// Creates a ray; the direction is normalised, falling back to `-Z` when degenerate.
    #[must_use]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        let direction = direction.try_normalize().unwrap_or(Vec3::NEG_Z);
        Self { origin, direction }
    }

    /// Starting point of the ray.
    #[must_use]
    pub const fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Unit direction of travel.
    #[must_use]
    pub const fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Point reached after travelling `distance` along the ray.
    #[must_use]
    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }

    /// Distance to the nearest intersection with a sphere, if any lies ahead.
    #[must_use]
    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        let offset = self.origin - center;
        let b = offset.dot(self.direction);
        let c = offset.length_squared() - radius * radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        let root = discriminant.sqrt();
        let near = -b - root;
        if near >= 0.0 {
            return Some(near);
        }
        let far = -b + root;
        (far >= 0.0).then_some(far)
    }
}

/// Bitmask of pointer buttons held during a pointer event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PointerButtons(u8);

impl PointerButtons {
    /// No buttons held.
    pub const NONE: Self = Self(0);
    /// Primary (usually left) button.
    pub const PRIMARY: Self = Self(1);
    /// Secondary (usually right) button.
    pub const SECONDARY: Self = Self(2);
    /// Auxiliary (usually middle) button.
    pub const AUXILIARY: Self = Self(4);

    /// Creates a mask from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Raw bits of the mask.
    #[must_use]
    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// Reports whether every bit of `other` is set.
    #[must_use]
    pub const fn contains(&self, other: Self) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    /// Reports whether no button is held.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// Stage of a pointer interaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PointerPhase {
    /// Pointer moved without changing buttons.
    Move,
    /// A button was pressed.
    Down,
    /// A button was released.
    Up,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Classifies a roster snapshot into stages and schedules every orbit.
    LoadRoster {
        /// Records in roster order.
        roster: Vec<RosterEntry>,
        /// Instant used for the weeks-until-deadline math.
        now: Timestamp,
    },
    /// Advances every orbiting entity by one phase step.
    AdvanceOrbits,
    /// Moves the focus to the provided stage, or clears it.
    SetFocus {
        /// Focus to activate; `None` leaves the scene without a focus.
        focus: Option<Focus>,
    },
    /// Applies an emphasis scale to a single entity.
    EmphasizeEntity {
        /// Entity receiving the scale.
        entity: EntityId,
        /// Scale factor; [`NEUTRAL_SCALE`] restores the default size.
        scale: f32,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Confirms that a roster snapshot was classified.
    RosterClassified {
        /// Populated stage keys in ascending order.
        stages: Vec<StageKey>,
        /// Number of entities routed to the expired pseudo-bucket.
        expired: usize,
        /// Nearest non-expired stage, the initial navigation focus.
        smallest: Option<StageKey>,
    },
    /// Reports that a stage received its shared path.
    StagePathCreated {
        /// Stage owning the path.
        stage: StageKey,
        /// Number of points including the closing duplicate.
        point_count: usize,
    },
    /// Indicates that every orbiting entity advanced one phase step.
    OrbitsAdvanced {
        /// Number of advance ticks processed so far.
        tick: u64,
    },
    /// Announces that the focused stage changed.
    FocusChanged {
        /// Focus active before the change.
        previous: Option<Focus>,
        /// Focus active after the change.
        current: Option<Focus>,
        /// Members of the newly focused bucket in roster order.
        members: Vec<EntityId>,
    },
    /// Reports a change to a stage path's emphasis.
    StageEmphasisChanged {
        /// Stage whose path changed appearance.
        stage: StageKey,
        /// Emphasis now applied.
        emphasis: Emphasis,
    },
    /// Reports that the shared visibility mode switched.
    VisibilityModeChanged {
        /// Mode now in effect.
        mode: VisibilityMode,
    },
    /// Reports a change to an entity's emphasis scale.
    EntityEmphasisChanged {
        /// Entity whose scale changed.
        entity: EntityId,
        /// Scale now applied.
        scale: f32,
    },
}

/// Ordered index of populated stage keys used by navigation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StageIndex {
    keys: Vec<StageKey>,
    has_expired: bool,
}

impl StageIndex {
    /// Creates an index from stage keys in any order.
    #[must_use]
    pub fn new(mut keys: Vec<StageKey>, has_expired: bool) -> Self {
        keys.sort_unstable();
        keys.dedup();
        Self { keys, has_expired }
    }

    /// Populated keys in ascending order.
    #[must_use]
    pub fn keys(&self) -> &[StageKey] {
        &self.keys
    }

    /// Reports whether the expired pseudo-bucket has members.
    #[must_use]
    pub const fn has_expired(&self) -> bool {
        self.has_expired
    }

    /// Nearest non-expired stage.
    #[must_use]
    pub fn smallest(&self) -> Option<StageKey> {
        self.keys.first().copied()
    }

    /// Farthest populated stage.
    #[must_use]
    pub fn largest(&self) -> Option<StageKey> {
        self.keys.last().copied()
    }

    /// Reports whether the key is populated.
    #[must_use]
    pub fn contains(&self, key: StageKey) -> bool {
        self.keys.binary_search(&key).is_ok()
    }

    /// Snaps an arbitrary candidate to the nearest populated key.
    ///
    /// Candidates below the range snap to the smallest key, candidates above
    /// snap to the largest, and gaps resolve to the closer neighbour with ties
    /// going to the smaller key. Returns `None` when no stage exists.
    #[must_use]
    pub fn clamp(&self, candidate: i64) -> Option<StageKey> {
        match self.keys.binary_search(&StageKey::new(candidate)) {
            Ok(index) => Some(self.keys[index]),
            Err(0) => self.smallest(),
            Err(index) if index == self.keys.len() => self.largest(),
            Err(index) => {
                let below = self.keys[index - 1];
                let above = self.keys[index];
                if candidate - below.diff() <= above.diff() - candidate {
                    Some(below)
                } else {
                    Some(above)
                }
            }
        }
    }
}

/// Immutable representation of a single entity used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct EntitySnapshot {
    /// Identifier of the entity.
    pub id: EntityId,
    /// Handle of the entity.
    pub login: String,
    /// Portrait address of the entity.
    pub portrait: String,
    /// Physical slot associated with the entity, if any.
    pub slot: Option<SlotId>,
    /// Stage the entity orbits on; `None` for expired entities.
    pub stage: Option<StageKey>,
    /// Current phase along the stage path; `None` for expired entities.
    pub phase: Option<usize>,
    /// Current position in the orbital plane.
    pub position: Vec2,
    /// Emphasis scale currently applied.
    pub scale: f32,
}

impl EntitySnapshot {
    /// Reports whether the entity belongs to the expired pseudo-bucket.
    #[must_use]
    pub const fn is_expired(&self) -> bool {
        self.stage.is_none()
    }

    /// Position in scene space: orbiting entities lie in the `z = 0` plane,
    /// expired entities on the overview plane.
    #[must_use]
    pub fn scene_position(&self) -> Vec3 {
        let z = if self.is_expired() { OVERVIEW_PLANE_Z } else { 0.0 };
        self.position.extend(z)
    }
}

/// Immutable representation of a single stage used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct StageSnapshot {
    /// Key of the stage.
    pub key: StageKey,
    /// Number of members.
    pub total: u32,
    /// Members in roster order.
    pub members: Vec<EntityId>,
    /// Shared orbit path.
    pub path: OrbitPath,
    /// Emphasis applied to the path.
    pub emphasis: Emphasis,
}

/// Searchable handle, listed in ascending stage order then roster order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchEntry {
    /// Entity carrying the handle.
    pub entity: EntityId,
    /// Handle to match against.
    pub login: String,
    /// Stage the entity belongs to.
    pub stage: StageKey,
}
