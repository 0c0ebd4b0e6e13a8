#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pointer picking system that resolves rays against entity spheres.
//!
//! The system tracks the hovered entity and the last sampled button mask. Hover
//! changes are published as [`Command::EmphasizeEntity`] requests; releases
//! over an entity produce a [`PickSignal`] describing the profile to open.

use deadline_orbit_core::{
    profile_url, Command, EntityId, EntitySnapshot, Event, PointerButtons, Ray, SlotId,
    VisibilityMode, NEUTRAL_SCALE,
};
pub use deadline_orbit_core::PointerPhase;
use deadline_orbit_system_occupancy::{OccupancyMap, OccupancyPopup};
use glam::Vec3;

const DEFAULT_HOVER_SCALE: f32 = 1.5;
const DEFAULT_PICK_RADIUS: f32 = 0.5;

/// Configuration parameters required to construct the picking system.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    hover_scale: f32,
    pick_radius: f32,
}

impl Config {
    /// Creates a configuration from the hover scale and the sphere radius used
    /// for hit testing. Non-positive values fall back to the defaults.
    #[must_use]
    pub fn new(hover_scale: f32, pick_radius: f32) -> Self {
        let positive_or = |value: f32, fallback: f32| {
            if value.is_finite() && value > 0.0 {
                value
            } else {
                fallback
            }
        };
        Self {
            hover_scale: positive_or(hover_scale, DEFAULT_HOVER_SCALE),
            pick_radius: positive_or(pick_radius, DEFAULT_PICK_RADIUS),
        }
    }

    /// Scale applied to the hovered entity before depth adjustment.
    #[must_use]
    pub const fn hover_scale(&self) -> f32 {
        self.hover_scale
    }

    /// Radius of the sphere each entity occupies for hit testing.
    #[must_use]
    pub const fn pick_radius(&self) -> f32 {
        self.pick_radius
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_HOVER_SCALE, DEFAULT_PICK_RADIUS)
    }
}

/// Pointer event already projected into scene space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerSample {
    /// Ray cast from the camera through the pointer position.
    pub ray: Ray,
    /// Buttons held after the event.
    pub buttons: PointerButtons,
    /// Kind of pointer event.
    pub phase: PointerPhase,
}

/// Entity eligible for hit testing in the current visibility mode.
#[derive(Clone, Debug, PartialEq)]
pub struct PickTarget {
    /// Entity represented by the target.
    pub entity: EntityId,
    /// Handle used to build the profile link.
    pub login: String,
    /// Physical slot of the entity, if known.
    pub slot: Option<SlotId>,
    /// Sphere centre in scene space.
    pub center: Vec3,
    /// Sphere radius in scene space.
    pub radius: f32,
}

/// Collects the entities that can be hit in the provided visibility mode.
///
/// Orbiting entities are always pickable; expired entities only while the
/// expired overview is shown.
#[must_use]
pub fn pick_targets(entities: &[EntitySnapshot], mode: VisibilityMode, config: &Config) -> Vec<PickTarget> {
    entities
        .iter()
        .filter(|entity| !entity.is_expired() || mode == VisibilityMode::ExpiredOverview)
        .map(|entity| PickTarget {
            entity: entity.id,
            login: entity.login.clone(),
            slot: entity.slot.clone(),
            center: entity.scene_position(),
            radius: config.pick_radius,
        })
        .collect()
}

/// Navigation request produced when a pointer is released over an entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PickSignal {
    /// Navigate to the entity's profile.
    OpenProfile {
        /// Entity that was clicked.
        entity: EntityId,
        /// Profile page to open.
        url: String,
    },
    /// Open the entity's profile in a new context (middle click).
    OpenProfileInNewContext {
        /// Entity that was clicked.
        entity: EntityId,
        /// Profile page to open.
        url: String,
    },
}

/// Hover/press state machine over pickable entities.
#[derive(Debug, Default)]
pub struct Picking {
    config: Config,
    hovered: Option<EntityId>,
    hover_scale: f32,
    last_buttons: PointerButtons,
}

impl Picking {
    /// Creates a picking system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            hovered: None,
            hover_scale: NEUTRAL_SCALE,
            last_buttons: PointerButtons::NONE,
        }
    }

    /// Configuration in effect.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Entity currently under the pointer.
    #[must_use]
    pub const fn hovered(&self) -> Option<EntityId> {
        self.hovered
    }

    /// Button mask recorded at the last pointer event.
    #[must_use]
    pub const fn last_buttons(&self) -> PointerButtons {
        self.last_buttons
    }

    /// Consumes world events. Switching visibility mode drops the hover since
    /// the set of pickable entities changes; a reloaded roster forgets it.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        for event in events {
            match event {
                Event::VisibilityModeChanged { .. } => {
                    if let Some(previous) = self.hovered.take() {
                        out.push(Command::EmphasizeEntity {
                            entity: previous,
                            scale: NEUTRAL_SCALE,
                        });
                    }
                }
                Event::RosterClassified { .. } => {
                    self.hovered = None;
                    self.last_buttons = PointerButtons::NONE;
                }
                _ => {}
            }
        }
    }

    /// Processes a pointer sample against the pickable targets.
    ///
    /// `depth` is the navigation depth; hover emphasis is scaled by it.
    pub fn pointer(
        &mut self,
        sample: PointerSample,
        targets: &[PickTarget],
        depth: f32,
        out: &mut Vec<Command>,
    ) -> Option<PickSignal> {
        let hit = nearest_hit(&sample.ray, targets);
        let hit_id = hit.map(|target| target.entity);

        let scale = self.config.hover_scale * depth.max(1.0);
        if hit_id != self.hovered {
            if let Some(previous) = self.hovered {
                out.push(Command::EmphasizeEntity {
                    entity: previous,
                    scale: NEUTRAL_SCALE,
                });
            }
            if let Some(current) = hit_id {
                out.push(Command::EmphasizeEntity {
                    entity: current,
                    scale,
                });
            }
            self.hovered = hit_id;
            self.hover_scale = scale;
        } else if let Some(current) = hit_id {
            // Depth moved while the pointer rested on the same entity.
            if scale != self.hover_scale {
                out.push(Command::EmphasizeEntity {
                    entity: current,
                    scale,
                });
                self.hover_scale = scale;
            }
        }

        let signal = match (sample.phase, hit) {
            (PointerPhase::Up, Some(target)) if sample.buttons.is_empty() => {
                release_signal(self.last_buttons, target)
            }
            _ => None,
        };
        self.last_buttons = sample.buttons;
        signal
    }

    /// Occupancy popup for the hovered entity, if it sits in an occupied slot.
    #[must_use]
    pub fn popup(&self, targets: &[PickTarget], occupancy: &OccupancyMap) -> Option<OccupancyPopup> {
        let hovered = self.hovered?;
        let slot = targets
            .iter()
            .find(|target| target.entity == hovered)?
            .slot
            .as_ref()?;
        occupancy.popup(slot)
    }
}

fn nearest_hit<'a>(ray: &Ray, targets: &'a [PickTarget]) -> Option<&'a PickTarget> {
    targets
        .iter()
        .filter_map(|target| {
            ray.intersect_sphere(target.center, target.radius)
                .map(|distance| (distance, target))
        })
        .min_by(|(left, _), (right, _)| left.total_cmp(right))
        .map(|(_, target)| target)
}

fn release_signal(buttons: PointerButtons, target: &PickTarget) -> Option<PickSignal> {
    let url = profile_url(&target.login);
    if buttons.contains(PointerButtons::PRIMARY) {
        Some(PickSignal::OpenProfile {
            entity: target.entity,
            url,
        })
    } else if buttons.contains(PointerButtons::AUXILIARY) {
        Some(PickSignal::OpenProfileInNewContext {
            entity: target.entity,
            url,
        })
    } else {
        None
    }
}
