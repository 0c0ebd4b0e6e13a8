#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for Deadline Orbit adapters.
//!
//! Backends never read world state directly. Each frame the driver captures a
//! [`Scene`] from query snapshots and hands it to a [`RenderingBackend`].

use std::{collections::HashMap, error::Error, fmt, time::Duration};

use anyhow::Result as AnyResult;
use glam::{Mat4, Vec2, Vec3};
use deadline_orbit_core::{
    Emphasis, EntityId, EntitySnapshot, Focus, OrbitPath, PointerButtons, PointerPhase, Ray,
    StageKey, StageSnapshot, VisibilityMode,
};

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Returns the same color with a different alpha.
    #[must_use]
    pub const fn with_alpha(self, alpha: f32) -> Self {
        Self { alpha, ..self }
    }
}

/// Orbit line color used for stages.
pub const ORBIT_COLOR: Color = Color::from_rgb_u8(0x4a, 0x6f, 0xa5);

/// Color applied to an orbit line at the provided emphasis.
#[must_use]
pub const fn orbit_color(emphasis: Emphasis) -> Color {
    match emphasis {
        Emphasis::Resting => ORBIT_COLOR.with_alpha(0.25),
        Emphasis::Raised => ORBIT_COLOR,
    }
}

/// Loading state of a portrait asset.
///
/// Entities are positioned and animated regardless of their portrait state;
/// backends draw a placeholder until the portrait is ready.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PortraitState {
    /// The load has not completed yet.
    #[default]
    Pending,
    /// The asset is available for drawing.
    Ready,
}

/// Tracks portrait loads reported by the backend.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PortraitRegistry {
    states: HashMap<String, PortraitState>,
}

impl PortraitRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of a portrait; unknown portraits are pending.
    #[must_use]
    pub fn state(&self, portrait: &str) -> PortraitState {
        self.states.get(portrait).copied().unwrap_or_default()
    }

    /// Records that a portrait finished loading.
    pub fn mark_ready(&mut self, portrait: impl Into<String>) {
        let _ = self.states.insert(portrait.into(), PortraitState::Ready);
    }
}

/// Availability of the roster feed shown to the user.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum FeedState {
    /// The roster is being fetched.
    #[default]
    Loading,
    /// The roster was loaded.
    Ready,
    /// The roster could not be loaded; a manual retry is offered.
    Unavailable {
        /// Human readable failure description.
        reason: String,
    },
}

impl fmt::Display for FeedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loading => write!(f, "loading roster"),
            Self::Ready => write!(f, "roster ready"),
            Self::Unavailable { reason } => write!(f, "data unavailable: {reason}"),
        }
    }
}

/// Indicator describing the occupancy channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LiveIndicator {
    /// No channel is configured.
    #[default]
    Offline,
    /// A connection attempt is in flight.
    Connecting,
    /// Updates are flowing.
    Live,
    /// The channel dropped and a reconnect is scheduled.
    Paused {
        /// Consecutive failed attempts so far.
        attempt: u32,
        /// Delay before the next attempt.
        retry_in: Duration,
    },
}

impl fmt::Display for LiveIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offline => write!(f, "offline"),
            Self::Connecting => write!(f, "connecting"),
            Self::Live => write!(f, "live"),
            Self::Paused { attempt, retry_in } => write!(
                f,
                "live updates paused (attempt {attempt}, retrying in {}s)",
                retry_in.as_secs()
            ),
        }
    }
}

/// Entity as handed to rendering backends.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityPresentation {
    /// Identifier allocated to the entity by the world.
    pub id: EntityId,
    /// Handle of the entity.
    pub login: String,
    /// Position in scene space; orbits lie in the `z = 0` plane and the
    /// expired overview above it.
    pub position: Vec3,
    /// Whether the entity is drawn in the current visibility mode.
    pub visible: bool,
    /// Emphasis scale applied to the entity.
    pub scale: f32,
    /// Portrait address of the entity.
    pub portrait: String,
    /// Loading state of the portrait.
    pub portrait_state: PortraitState,
}

/// Orbit line of a stage.
#[derive(Clone, Debug, PartialEq)]
pub struct StagePresentation {
    /// Stage owning the line.
    pub key: StageKey,
    /// Shared path traced by the stage's members.
    pub path: OrbitPath,
    /// Emphasis currently applied to the line.
    pub emphasis: Emphasis,
    /// Color derived from the emphasis.
    pub color: Color,
}

/// Row of the side panel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PanelEntry {
    /// Entity listed by the row.
    pub entity: EntityId,
    /// Handle shown in the row.
    pub login: String,
    /// Portrait shown beside the handle.
    pub portrait: String,
}

/// Side panel listing the members of the focused bucket.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SidePanel {
    /// Bucket the panel describes.
    pub focus: Option<Focus>,
    /// Members in roster order.
    pub entries: Vec<PanelEntry>,
}

impl SidePanel {
    /// Heading shown above the entries.
    #[must_use]
    pub fn title(&self) -> String {
        match self.focus {
            Some(Focus::Stage(key)) => format!("{key} ({})", self.entries.len()),
            Some(Focus::Expired) => format!("expired ({})", self.entries.len()),
            None => "no roster".to_owned(),
        }
    }
}

/// Scene description consumed by backends.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scene {
    /// Orbit lines in ascending stage order.
    pub stages: Vec<StagePresentation>,
    /// Every entity of the roster in roster order.
    pub entities: Vec<EntityPresentation>,
    /// Side panel for the focused bucket.
    pub panel: SidePanel,
    /// Visibility mode the scene was captured in.
    pub mode: VisibilityMode,
}

impl Scene {
    /// Captures a scene from world snapshots.
    ///
    /// Orbiting entities are always visible; expired entities are only visible
    /// in the expired overview.
    #[must_use]
    pub fn capture(
        stages: &[StageSnapshot],
        entities: &[EntitySnapshot],
        focus: Option<Focus>,
        mode: VisibilityMode,
        portraits: &PortraitRegistry,
    ) -> Self {
        let stage_lines = stages
            .iter()
            .map(|stage| StagePresentation {
                key: stage.key,
                path: stage.path.clone(),
                emphasis: stage.emphasis,
                color: orbit_color(stage.emphasis),
            })
            .collect();

        let presented = entities
            .iter()
            .map(|entity| EntityPresentation {
                id: entity.id,
                login: entity.login.clone(),
                position: entity.scene_position(),
                visible: !entity.is_expired() || mode == VisibilityMode::ExpiredOverview,
                scale: entity.scale,
                portrait: entity.portrait.clone(),
                portrait_state: portraits.state(&entity.portrait),
            })
            .collect();

        Self {
            stages: stage_lines,
            entities: presented,
            panel: side_panel(stages, entities, focus),
            mode,
        }
    }

    /// Entities drawn in the current mode.
    pub fn visible_entities(&self) -> impl Iterator<Item = &EntityPresentation> {
        self.entities.iter().filter(|entity| entity.visible)
    }
}

fn side_panel(stages: &[StageSnapshot], entities: &[EntitySnapshot], focus: Option<Focus>) -> SidePanel {
    let by_id: HashMap<EntityId, &EntitySnapshot> =
        entities.iter().map(|entity| (entity.id, entity)).collect();
    let members: Vec<EntityId> = match focus {
        Some(Focus::Stage(key)) => stages
            .iter()
            .find(|stage| stage.key == key)
            .map(|stage| stage.members.clone())
            .unwrap_or_default(),
        Some(Focus::Expired) => entities
            .iter()
            .filter(|entity| entity.is_expired())
            .map(|entity| entity.id)
            .collect(),
        None => Vec::new(),
    };

    let entries = members
        .into_iter()
        .filter_map(|id| by_id.get(&id))
        .map(|entity| PanelEntry {
            entity: entity.id,
            login: entity.login.clone(),
            portrait: entity.portrait.clone(),
        })
        .collect();
    SidePanel { focus, entries }
}

/// Perspective camera looking at the orbital plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    position: Vec3,
    target: Vec3,
    fov_y_degrees: f32,
    near: f32,
    far: f32,
}

impl Camera {
    /// Default distance between the camera and the orbital plane.
    pub const DEFAULT_DISTANCE: f32 = 20.0;
    /// Default vertical field of view in degrees.
    pub const DEFAULT_FOV_Y_DEGREES: f32 = 50.0;
    /// Distance moved by one bucket nudge; stage radii grow by one per bucket.
    pub const BUCKET_STEP: f32 = 1.0;

    /// Creates a camera at `distance` above the origin.
    ///
    /// Returns an error when the field of view or clip planes are unusable.
    pub fn new(distance: f32, fov_y_degrees: f32, near: f32, far: f32) -> Result<Self, RenderingError> {
        if !(fov_y_degrees > 0.0 && fov_y_degrees < 180.0) {
            return Err(RenderingError::InvalidFieldOfView { fov_y_degrees });
        }
        if !(near > 0.0 && far > near && distance > near) {
            return Err(RenderingError::InvalidClipPlanes { near, far });
        }
        Ok(Self {
            position: Vec3::new(0.0, 0.0, distance),
            target: Vec3::ZERO,
            fov_y_degrees,
            near,
            far,
        })
    }

    /// Camera position in scene space.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// View matrix looking from the camera towards its target.
    #[must_use]
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    /// Projection matrix for a viewport with the provided aspect ratio.
    #[must_use]
    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_degrees.to_radians(), aspect, self.near, self.far)
    }

    /// Casts a ray through a pointer position given in viewport pixels.
    ///
    /// The origin of the pixel space is the top-left corner. Degenerate
    /// viewports yield a ray straight down the view axis.
    #[must_use]
    pub fn screen_ray(&self, pointer: Vec2, viewport: Vec2) -> Ray {
        if viewport.x <= 0.0 || viewport.y <= 0.0 {
            return Ray::new(self.position, self.target - self.position);
        }
        let ndc = Vec2::new(
            2.0 * pointer.x / viewport.x - 1.0,
            1.0 - 2.0 * pointer.y / viewport.y,
        );
        let inverse = (self.projection(viewport.x / viewport.y) * self.view()).inverse();
        let near = inverse.project_point3(ndc.extend(0.0));
        let far = inverse.project_point3(ndc.extend(1.0));
        Ray::new(near, far - near)
    }

    /// Moves the camera by whole bucket steps along its view axis.
    ///
    /// Positive steps pull the camera away from the plane so farther orbits
    /// come into view. The camera never crosses its near plane.
    pub fn nudge(&mut self, steps: i32) {
        let distance = (self.position.z + steps as f32 * Self::BUCKET_STEP).max(self.near * 2.0);
        self.position.z = distance;
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, Self::DEFAULT_DISTANCE),
            target: Vec3::ZERO,
            fov_y_degrees: Self::DEFAULT_FOV_Y_DEGREES,
            near: 0.1,
            far: 1000.0,
        }
    }
}

/// Pointer event in viewport pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerInput {
    /// Pointer position with the origin at the top-left corner.
    pub position: Vec2,
    /// Buttons held after the event.
    pub buttons: PointerButtons,
    /// Kind of pointer event.
    pub phase: PointerPhase,
}

/// Input snapshot gathered by adapters before updating the scene.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameInput {
    /// Scroll distance accumulated since the previous frame, in bucket pixels.
    pub scroll_delta: f64,
    /// Pointer events observed since the previous frame.
    pub pointer: Vec<PointerInput>,
    /// Search text submitted on this frame, if any.
    pub search: Option<String>,
}

/// Presentation descriptor consumed by rendering backends.
#[derive(Clone, Debug, PartialEq)]
pub struct Presentation {
    /// Title shown by the backend.
    pub title: String,
    /// Viewport size in pixels.
    pub viewport: Vec2,
    /// Roster feed indicator.
    pub feed: FeedState,
    /// Occupancy channel indicator.
    pub live: LiveIndicator,
    /// Scene content that should be displayed.
    pub scene: Scene,
}

impl Presentation {
    /// Constructs a new presentation descriptor.
    #[must_use]
    pub fn new<T>(title: T, viewport: Vec2, scene: Scene) -> Self
    where
        T: Into<String>,
    {
        Self {
            title: title.into(),
            viewport,
            feed: FeedState::default(),
            live: LiveIndicator::default(),
            scene,
        }
    }
}

/// Rendering backend capable of presenting Deadline Orbit scenes.
pub trait RenderingBackend {
    /// Runs the backend until `update` returns `false` or the backend exits.
    ///
    /// `update` receives per-frame input and may mutate the presentation
    /// before it is drawn. Each call is one fixed animation step.
    fn run<F>(self, presentation: Presentation, update: F) -> AnyResult<()>
    where
        F: FnMut(FrameInput, &mut Presentation) -> bool;
}

/// Errors that can occur when constructing rendering descriptors.
#[derive(Debug, PartialEq)]
pub enum RenderingError {
    /// Field of view must lie strictly between 0 and 180 degrees.
    InvalidFieldOfView {
        /// Provided field of view.
        fov_y_degrees: f32,
    },
    /// Clip planes must be positive, ordered and in front of the camera.
    InvalidClipPlanes {
        /// Provided near plane.
        near: f32,
        /// Provided far plane.
        far: f32,
    },
}

impl fmt::Display for RenderingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFieldOfView { fov_y_degrees } => {
                write!(f, "field of view must be within (0, 180) degrees (received {fov_y_degrees})")
            }
            Self::InvalidClipPlanes { near, far } => {
                write!(f, "clip planes must satisfy 0 < near < far (received {near}..{far})")
            }
        }
    }
}

impl Error for RenderingError {}
