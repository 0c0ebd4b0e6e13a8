#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter for Deadline Orbit.
//!
//! `orbit` runs a headless, scripted session against a roster and prints the
//! side panel; `live` mirrors the occupancy channel to the terminal.

mod backend;
mod feed;
mod live;
mod settings;
mod simulation;

use std::{fs, io, path::PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use deadline_orbit_core::{PointerButtons, PointerPhase, Timestamp};
use deadline_orbit_rendering::{FrameInput, PointerInput, Presentation, RenderingBackend};
use deadline_orbit_system_navigation::Navigation;
use deadline_orbit_system_occupancy::{decode, OccupancyEvent, OccupancyMap};
use deadline_orbit_system_picking::Picking;
use deadline_orbit_world::World;
use glam::Vec2;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::{
    backend::TextBackend,
    feed::{FeedSource, parse_timestamp},
    settings::Settings,
    simulation::Simulation,
};

const TITLE: &str = "Deadline Orbit";

#[derive(Debug, Parser)]
#[command(name = "deadline-orbit", version, about = "Deadline roster orbits and live occupancy")]
struct Cli {
    /// Optional TOML settings file.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Mode,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Runs a scripted session against a roster and prints the side panel.
    Orbit(OrbitArgs),
    /// Mirrors the occupancy channel to the terminal.
    Live(LiveArgs),
}

#[derive(Debug, Args)]
struct OrbitArgs {
    /// Roster JSON file.
    #[arg(long, value_name = "PATH", conflicts_with_all = ["url", "demo"])]
    roster: Option<PathBuf>,
    /// Roster JSON served over HTTP.
    #[arg(long, conflicts_with = "demo")]
    url: Option<String>,
    /// Generates a synthetic roster of this size.
    #[arg(long, value_name = "COUNT")]
    demo: Option<usize>,
    /// Seed for the synthetic roster.
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Reference instant (RFC 3339 or epoch milliseconds); defaults to now.
    #[arg(long)]
    now: Option<String>,
    /// Number of animation ticks to run.
    #[arg(long, default_value_t = 60)]
    ticks: usize,
    /// Scroll deltas in bucket pixels, one per tick.
    #[arg(long = "scroll", allow_hyphen_values = true, value_name = "DELTA")]
    scroll: Vec<f64>,
    /// Search submitted after the scroll deltas.
    #[arg(long)]
    search: Option<String>,
    /// Pointer clicks at viewport pixels, e.g. `640,360`, on the last tick.
    #[arg(long = "click", value_parser = parse_pixel, value_name = "X,Y")]
    clicks: Vec<Vec2>,
    /// Occupancy frames (one JSON message per line) applied before the session.
    #[arg(long, value_name = "PATH")]
    occupancy: Option<PathBuf>,
    /// Overrides `navigation.pixels_per_bucket`.
    #[arg(long)]
    pixels_per_bucket: Option<f64>,
    /// Overrides `navigation.expired_threshold`.
    #[arg(long, allow_hyphen_values = true)]
    expired_threshold: Option<i64>,
}

#[derive(Debug, Args)]
struct LiveArgs {
    /// Occupancy WebSocket address; overrides `live.url`.
    #[arg(long)]
    url: Option<String>,
    /// Cluster to mirror; overrides `live.cluster`.
    #[arg(long)]
    cluster: Option<u32>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Mode::Orbit(args) => run_orbit(args, &settings),
        Mode::Live(args) => live::run(args.url, args.cluster, &settings),
    }
}

fn run_orbit(mut args: OrbitArgs, settings: &Settings) -> Result<()> {
    let now = match args.now.as_deref() {
        Some(text) => parse_instant(text).with_context(|| format!("invalid --now value `{text}`"))?,
        None => Timestamp::from_millis(Utc::now().timestamp_millis()),
    };

    let source = if let Some(path) = args.roster.take() {
        FeedSource::File(path)
    } else if let Some(url) = args.url.take() {
        FeedSource::Url(url)
    } else {
        FeedSource::Demo {
            count: args.demo.unwrap_or(24),
            seed: args.seed,
        }
    };

    let mut navigation_config = settings.navigation_config();
    if args.pixels_per_bucket.is_some() || args.expired_threshold.is_some() {
        navigation_config = deadline_orbit_system_navigation::Config::new(
            args.pixels_per_bucket
                .unwrap_or(navigation_config.pixels_per_bucket()),
            args.expired_threshold
                .unwrap_or(navigation_config.expired_threshold()),
        );
    }

    let occupancy = match args.occupancy.as_deref() {
        Some(path) => load_occupancy(path)?,
        None => OccupancyMap::new(),
    };

    let mut presentation = Presentation::new(TITLE, Vec2::new(1280.0, 720.0), Default::default());
    let roster = {
        let stdin = io::stdin();
        feed::load_with_retry(
            &source,
            now,
            &mut presentation.feed,
            &mut stdin.lock(),
            &mut io::stderr(),
        )
        .context("roster unavailable")?
    };

    let mut simulation = Simulation::new(
        World::with_orbit_config(settings.orbit_config()),
        Navigation::new(navigation_config),
        Picking::new(settings.picking_config()),
        occupancy,
    );
    simulation.load(roster, now);
    simulation.resolve_portraits();
    presentation.scene = simulation.capture();

    let frames = script(&args);
    let backend = TextBackend::new(frames, io::stdout());
    backend.run(presentation, |input, presentation| simulation.step(input, presentation))?;

    for signal in simulation.signals() {
        println!("signal: {signal:?}");
    }
    if let Some(popup) = simulation.popup() {
        println!(
            "popup: {} at {} ({})",
            popup.login, popup.slot, popup.profile_url
        );
    }
    println!("ticks: {}", simulation.tick());
    Ok(())
}

/// Builds the frame script: one scroll delta per frame, then the search,
/// then the clicks on the final frame.
fn script(args: &OrbitArgs) -> Vec<FrameInput> {
    let len = args.ticks.max(args.scroll.len() + 1).max(1);
    let mut frames = vec![FrameInput::default(); len];
    for (frame, delta) in frames.iter_mut().zip(&args.scroll) {
        frame.scroll_delta = *delta;
    }
    if let Some(search) = &args.search {
        let at = args.scroll.len().min(len - 1);
        frames[at].search = Some(search.clone());
    }
    if let Some(last) = frames.last_mut() {
        for position in &args.clicks {
            last.pointer.push(PointerInput {
                position: *position,
                buttons: PointerButtons::PRIMARY,
                phase: PointerPhase::Down,
            });
            last.pointer.push(PointerInput {
                position: *position,
                buttons: PointerButtons::NONE,
                phase: PointerPhase::Up,
            });
        }
    }
    frames
}

fn parse_instant(text: &str) -> Result<Timestamp> {
    if let Ok(millis) = text.trim().parse::<i64>() {
        return Ok(Timestamp::from_millis(millis));
    }
    parse_timestamp(text).context("expected RFC 3339 or epoch milliseconds")
}

fn parse_pixel(text: &str) -> Result<Vec2, String> {
    let (x, y) = text
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got `{text}`"))?;
    let x = x.trim().parse::<f32>().map_err(|error| error.to_string())?;
    let y = y.trim().parse::<f32>().map_err(|error| error.to_string())?;
    Ok(Vec2::new(x, y))
}

fn load_occupancy(path: &std::path::Path) -> Result<OccupancyMap> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read occupancy frames at {}", path.display()))?;
    let mut map = OccupancyMap::new();
    for (line, frame) in contents.lines().enumerate() {
        if frame.trim().is_empty() {
            continue;
        }
        let applied = decode(frame)
            .map_err(anyhow::Error::from)
            .and_then(|message| Ok(map.apply_event(OccupancyEvent::from(message))?));
        if let Err(error) = applied {
            warn!(line = line + 1, %error, "skipping occupancy frame");
        }
    }
    Ok(map)
}
