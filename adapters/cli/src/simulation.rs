//! Drives the world and its systems from frame input.

use deadline_orbit_core::{Command, Event, RosterEntry, Timestamp};
use deadline_orbit_rendering::{Camera, FrameInput, PortraitRegistry, Presentation, Scene};
use deadline_orbit_system_navigation::{Navigation, SearchOutcome};
use deadline_orbit_system_occupancy::{OccupancyMap, OccupancyPopup};
use deadline_orbit_system_picking::{pick_targets, PickSignal, Picking, PointerSample};
use deadline_orbit_world::{self as world, query, World};
use tracing::{debug, info};

/// Single owner of every piece of mutable session state.
#[derive(Debug)]
pub(crate) struct Simulation {
    world: World,
    navigation: Navigation,
    picking: Picking,
    camera: Camera,
    portraits: PortraitRegistry,
    occupancy: OccupancyMap,
    signals: Vec<PickSignal>,
    popup: Option<OccupancyPopup>,
}

impl Simulation {
    pub(crate) fn new(
        world: World,
        navigation: Navigation,
        picking: Picking,
        occupancy: OccupancyMap,
    ) -> Self {
        Self {
            world,
            navigation,
            picking,
            camera: Camera::default(),
            portraits: PortraitRegistry::new(),
            occupancy,
            signals: Vec::new(),
            popup: None,
        }
    }

    /// Classifies the roster and lets the systems react.
    pub(crate) fn load(&mut self, roster: Vec<RosterEntry>, now: Timestamp) {
        self.submit(vec![Command::LoadRoster { roster, now }]);
    }

    /// Advances one fixed step using the frame's input.
    pub(crate) fn step(&mut self, input: FrameInput, presentation: &mut Presentation) -> bool {
        let index = query::stage_index(&self.world);
        let mut commands = Vec::new();

        if input.scroll_delta != 0.0 {
            let _ = self
                .navigation
                .apply_delta(input.scroll_delta, &index, &mut commands);
        }

        if let Some(text) = input.search.as_deref() {
            let entries = query::search_entries(&self.world);
            match self.navigation.search(text, &entries, &index, &mut commands) {
                SearchOutcome::Found { entry, change } => {
                    info!(login = %entry.login, stage = %entry.stage, "search matched");
                    if let Some(nudge) = change.and_then(|change| change.camera_nudge) {
                        self.camera.nudge(nudge.steps());
                    }
                }
                SearchOutcome::NotFound => info!(query = text, "search found nothing"),
                SearchOutcome::Restored { focus } => debug!(?focus, "search cleared"),
            }
        }

        commands.push(Command::AdvanceOrbits);
        self.submit(commands);

        for pointer in input.pointer {
            let targets = pick_targets(
                &query::entities(&self.world),
                query::visibility_mode(&self.world),
                self.picking.config(),
            );
            let sample = PointerSample {
                ray: self.camera.screen_ray(pointer.position, presentation.viewport),
                buttons: pointer.buttons,
                phase: pointer.phase,
            };
            let mut commands = Vec::new();
            let depth = self.navigation.depth();
            if let Some(signal) = self.picking.pointer(sample, &targets, depth, &mut commands) {
                info!(?signal, "profile requested");
                self.signals.push(signal);
            }
            self.submit(commands);
            self.popup = self.picking.popup(&targets, &self.occupancy);
        }

        presentation.scene = self.capture();
        true
    }

    /// Marks every roster portrait as drawable. Backends that show handles
    /// instead of images have nothing left to load.
    pub(crate) fn resolve_portraits(&mut self) {
        for entity in query::entities(&self.world) {
            self.portraits.mark_ready(entity.portrait);
        }
    }

    /// Scene for the current state.
    pub(crate) fn capture(&self) -> Scene {
        Scene::capture(
            &query::stages(&self.world),
            &query::entities(&self.world),
            query::focus(&self.world),
            query::visibility_mode(&self.world),
            &self.portraits,
        )
    }

    pub(crate) fn signals(&self) -> &[PickSignal] {
        &self.signals
    }

    pub(crate) fn popup(&self) -> Option<&OccupancyPopup> {
        self.popup.as_ref()
    }

    pub(crate) fn tick(&self) -> u64 {
        query::tick_index(&self.world)
    }

    /// Applies commands and feeds the resulting events back to the systems
    /// until no further commands are produced.
    fn submit(&mut self, mut commands: Vec<Command>) {
        while !commands.is_empty() {
            let mut events: Vec<Event> = Vec::new();
            for command in commands.drain(..) {
                world::apply(&mut self.world, command, &mut events);
            }
            if events.is_empty() {
                break;
            }

            let index = query::stage_index(&self.world);
            self.navigation.handle(&events, &index, &mut commands);
            self.picking.handle(&events, &mut commands);
        }
    }
}
