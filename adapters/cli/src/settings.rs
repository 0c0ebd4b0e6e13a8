//! Optional TOML settings file. Every key falls back to the system defaults.

use std::{fs, io, path::{Path, PathBuf}, time::Duration};

use deadline_orbit_system_navigation as navigation;
use deadline_orbit_system_picking as picking;
use deadline_orbit_world::orbit;
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while reading the settings file.
#[derive(Debug, Error)]
pub(crate) enum SettingsError {
    /// The file could not be read.
    #[error("failed to read settings at {}", path.display())]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
    /// The file is not valid TOML or has unknown keys.
    #[error("failed to parse settings toml")]
    Parse(#[from] toml::de::Error),
}

/// Parsed settings file.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Settings {
    pub(crate) orbit: OrbitSettings,
    pub(crate) navigation: NavigationSettings,
    pub(crate) picking: PickingSettings,
    pub(crate) live: LiveSettings,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct OrbitSettings {
    pub(crate) base_radius: Option<f32>,
    pub(crate) density: Option<usize>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct NavigationSettings {
    pub(crate) pixels_per_bucket: Option<f64>,
    pub(crate) expired_threshold: Option<i64>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct PickingSettings {
    pub(crate) hover_scale: Option<f32>,
    pub(crate) pick_radius: Option<f32>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct LiveSettings {
    pub(crate) url: Option<String>,
    pub(crate) cluster: Option<u32>,
    pub(crate) initial_delay_ms: Option<u64>,
    pub(crate) max_delay_ms: Option<u64>,
    pub(crate) connect_timeout_ms: Option<u64>,
}

impl Settings {
    /// Reads the file when a path is given; no path means defaults.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    pub(crate) fn parse(contents: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(contents)?)
    }

    pub(crate) fn orbit_config(&self) -> orbit::Config {
        let defaults = orbit::Config::default();
        orbit::Config::new(
            self.orbit.base_radius.unwrap_or(defaults.base_radius()),
            self.orbit.density.unwrap_or(defaults.density()),
        )
    }

    pub(crate) fn navigation_config(&self) -> navigation::Config {
        let defaults = navigation::Config::default();
        navigation::Config::new(
            self.navigation
                .pixels_per_bucket
                .unwrap_or(defaults.pixels_per_bucket()),
            self.navigation
                .expired_threshold
                .unwrap_or(defaults.expired_threshold()),
        )
    }

    pub(crate) fn picking_config(&self) -> picking::Config {
        let defaults = picking::Config::default();
        picking::Config::new(
            self.picking.hover_scale.unwrap_or(defaults.hover_scale()),
            self.picking.pick_radius.unwrap_or(defaults.pick_radius()),
        )
    }

    /// Backoff bounds as durations, if configured.
    pub(crate) fn live_backoff(&self) -> (Option<Duration>, Option<Duration>) {
        (
            self.live.initial_delay_ms.map(Duration::from_millis),
            self.live.max_delay_ms.map(Duration::from_millis),
        )
    }

    pub(crate) fn live_connect_timeout(&self) -> Option<Duration> {
        self.live.connect_timeout_ms.map(Duration::from_millis)
    }
}
