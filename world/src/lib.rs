#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative stage and orbit state for Deadline Orbit.

pub mod orbit;
pub mod path;
pub mod stages;

use std::collections::BTreeMap;

use deadline_orbit_core::{
    Command, Emphasis, EntityId, Event, Focus, OrbitPath, RosterEntry, StageKey, Timestamp,
    VisibilityMode, NEUTRAL_SCALE,
};
use glam::Vec2;
use tracing::debug;

pub use self::stages::{classify, Classification, StageMembership};

/// Represents the authoritative Deadline Orbit world state.
#[derive(Debug)]
pub struct World {
    orbit: orbit::Config,
    entities: Vec<Entity>,
    stages: BTreeMap<StageKey, Stage>,
    expired: Vec<EntityId>,
    focus: Option<Focus>,
    mode: VisibilityMode,
    tick_index: u64,
}

impl World {
    /// Creates an empty world using the default orbit configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_orbit_config(orbit::Config::default())
    }

    /// Creates an empty world using the provided orbit configuration.
    #[must_use]
    pub fn with_orbit_config(orbit: orbit::Config) -> Self {
        Self {
            orbit,
            entities: Vec::new(),
            stages: BTreeMap::new(),
            expired: Vec::new(),
            focus: None,
            mode: VisibilityMode::Orbiting,
            tick_index: 0,
        }
    }

    fn load_roster(&mut self, roster: Vec<RosterEntry>, now: Timestamp, out: &mut Vec<Event>) {
        let classification = classify(&roster, now);
        let expired_count = classification.expired.len();

        self.entities = roster
            .into_iter()
            .enumerate()
            .map(|(index, record)| Entity::new(EntityId::new(index as u32), record))
            .collect();
        self.stages.clear();
        self.focus = None;
        self.mode = VisibilityMode::Orbiting;
        self.tick_index = 0;

        for (position, id) in classification.expired.iter().enumerate() {
            if let Some(entity) = self.entities.get_mut(id.get() as usize) {
                entity.position = orbit::overview_position(position, expired_count);
            }
        }
        self.expired = classification.expired;

        for (key, membership) in classification.stages {
            let path = orbit::stage_path(&self.orbit, key, membership.total);
            let mut stage = Stage {
                total: membership.total,
                members: membership.members,
                path,
                cursor: 0,
                emphasis: Emphasis::Resting,
            };
            for id in &stage.members {
                let Some(entity) = self.entities.get_mut(id.get() as usize) else {
                    continue;
                };
                let phase = orbit::initial_phase(stage.path.len(), stage.total, stage.cursor);
                stage.cursor += 1;
                entity.stage = Some(key);
                entity.phase = phase;
                entity.position = stage.path.point(phase).unwrap_or(Vec2::ZERO);
            }
            out.push(Event::StagePathCreated {
                stage: key,
                point_count: stage.path.len(),
            });
            let _ = self.stages.insert(key, stage);
        }

        let keys: Vec<StageKey> = self.stages.keys().copied().collect();
        let smallest = keys.first().copied();
        debug!(
            stages = keys.len(),
            expired = expired_count,
            smallest = ?smallest,
            "roster classified"
        );
        out.push(Event::RosterClassified {
            stages: keys,
            expired: expired_count,
            smallest,
        });
    }

    fn advance_orbits(&mut self, out: &mut Vec<Event>) {
        for entity in &mut self.entities {
            let Some(key) = entity.stage else {
                continue;
            };
            let Some(stage) = self.stages.get(&key) else {
                continue;
            };
            if let Some(point) = stage.path.point(entity.phase) {
                entity.position = point;
            }
            entity.phase = orbit::advance_phase(entity.phase, &stage.path);
        }
        self.tick_index = self.tick_index.saturating_add(1);
        out.push(Event::OrbitsAdvanced {
            tick: self.tick_index,
        });
    }

    fn set_focus(&mut self, focus: Option<Focus>, out: &mut Vec<Event>) {
        if focus == self.focus {
            return;
        }
        if let Some(Focus::Stage(key)) = focus {
            if !self.stages.contains_key(&key) {
                debug!(stage = %key, "ignoring focus on unpopulated stage");
                return;
            }
        }

        let previous = self.focus;
        if let Some(key) = previous.and_then(|focus| focus.stage()) {
            if let Some(stage) = self.stages.get_mut(&key) {
                stage.emphasis = Emphasis::Resting;
                out.push(Event::StageEmphasisChanged {
                    stage: key,
                    emphasis: Emphasis::Resting,
                });
            }
        }
        if let Some(key) = focus.and_then(|focus| focus.stage()) {
            if let Some(stage) = self.stages.get_mut(&key) {
                stage.emphasis = Emphasis::Raised;
                out.push(Event::StageEmphasisChanged {
                    stage: key,
                    emphasis: Emphasis::Raised,
                });
            }
        }

        self.focus = focus;
        let members = query::members(self, focus);
        debug!(previous = ?previous, current = ?focus, members = members.len(), "focus changed");
        out.push(Event::FocusChanged {
            previous,
            current: focus,
            members,
        });

        let mode = VisibilityMode::for_focus(focus);
        if mode != self.mode {
            self.mode = mode;
            out.push(Event::VisibilityModeChanged { mode });
        }
    }

    fn emphasize_entity(&mut self, entity: EntityId, scale: f32, out: &mut Vec<Event>) {
        let Some(target) = self.entities.get_mut(entity.get() as usize) else {
            return;
        };
        if target.scale == scale {
            return;
        }
        target.scale = scale;
        out.push(Event::EntityEmphasisChanged { entity, scale });
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::LoadRoster { roster, now } => world.load_roster(roster, now, out_events),
        Command::AdvanceOrbits => world.advance_orbits(out_events),
        Command::SetFocus { focus } => world.set_focus(focus, out_events),
        Command::EmphasizeEntity { entity, scale } => {
            world.emphasize_entity(entity, scale, out_events)
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use deadline_orbit_core::{
        EntityId, EntitySnapshot, Focus, SearchEntry, StageIndex, StageKey, StageSnapshot,
        VisibilityMode,
    };

    use super::{Entity, Stage, World};

    /// Ordered index of populated stages used by navigation.
    #[must_use]
    pub fn stage_index(world: &World) -> StageIndex {
        StageIndex::new(
            world.stages.keys().copied().collect(),
            !world.expired.is_empty(),
        )
    }

    /// Captures a snapshot of a single stage.
    #[must_use]
    pub fn stage(world: &World, key: StageKey) -> Option<StageSnapshot> {
        world
            .stages
            .get(&key)
            .map(|stage| stage_snapshot(key, stage))
    }

    /// Captures snapshots of every stage in ascending key order.
    #[must_use]
    pub fn stages(world: &World) -> Vec<StageSnapshot> {
        world
            .stages
            .iter()
            .map(|(key, stage)| stage_snapshot(*key, stage))
            .collect()
    }

    /// Captures a snapshot of a single entity.
    #[must_use]
    pub fn entity(world: &World, id: EntityId) -> Option<EntitySnapshot> {
        world.entities.get(id.get() as usize).map(entity_snapshot)
    }

    /// Captures snapshots of every entity in roster order.
    #[must_use]
    pub fn entities(world: &World) -> Vec<EntitySnapshot> {
        world.entities.iter().map(entity_snapshot).collect()
    }

    /// Entities routed to the expired pseudo-bucket, in roster order.
    #[must_use]
    pub fn expired(world: &World) -> &[EntityId] {
        &world.expired
    }

    /// Members of the bucket behind a focus, in roster order.
    #[must_use]
    pub fn members(world: &World, focus: Option<Focus>) -> Vec<EntityId> {
        match focus {
            Some(Focus::Stage(key)) => world
                .stages
                .get(&key)
                .map(|stage| stage.members.clone())
                .unwrap_or_default(),
            Some(Focus::Expired) => world.expired.clone(),
            None => Vec::new(),
        }
    }

    /// Searchable handles of every orbiting entity, ascending by stage then roster order.
    #[must_use]
    pub fn search_entries(world: &World) -> Vec<SearchEntry> {
        world
            .stages
            .iter()
            .flat_map(|(key, stage)| {
                stage.members.iter().filter_map(move |id| {
                    world
                        .entities
                        .get(id.get() as usize)
                        .map(|entity| SearchEntry {
                            entity: *id,
                            login: entity.record.login.clone(),
                            stage: *key,
                        })
                })
            })
            .collect()
    }

    /// Focus currently applied to the world.
    #[must_use]
    pub fn focus(world: &World) -> Option<Focus> {
        world.focus
    }

    /// Visibility mode derived from the current focus.
    #[must_use]
    pub fn visibility_mode(world: &World) -> VisibilityMode {
        world.mode
    }

    /// Number of orbit advance ticks processed since the roster was loaded.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    fn stage_snapshot(key: StageKey, stage: &Stage) -> StageSnapshot {
        StageSnapshot {
            key,
            total: stage.total,
            members: stage.members.clone(),
            path: stage.path.clone(),
            emphasis: stage.emphasis,
        }
    }

    fn entity_snapshot(entity: &Entity) -> EntitySnapshot {
        EntitySnapshot {
            id: entity.id,
            login: entity.record.login.clone(),
            portrait: entity.record.portrait.clone(),
            slot: entity.record.slot.clone(),
            stage: entity.stage,
            phase: entity.stage.map(|_| entity.phase),
            position: entity.position,
            scale: entity.scale,
        }
    }
}

#[derive(Clone, Debug)]
struct Entity {
    id: EntityId,
    record: RosterEntry,
    stage: Option<StageKey>,
    phase: usize,
    position: Vec2,
    scale: f32,
}

impl Entity {
    fn new(id: EntityId, record: RosterEntry) -> Self {
        Self {
            id,
            record,
            stage: None,
            phase: 0,
            position: Vec2::ZERO,
            scale: NEUTRAL_SCALE,
        }
    }
}

#[derive(Clone, Debug)]
struct Stage {
    total: u32,
    members: Vec<EntityId>,
    path: OrbitPath,
    cursor: u32,
    emphasis: Emphasis,
}
