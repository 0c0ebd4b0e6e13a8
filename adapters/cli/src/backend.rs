//! Headless rendering backend that plays a scripted list of frames and
//! writes the final presentation as text.

use std::io::Write;

use anyhow::{Context, Result};
use deadline_orbit_core::NEUTRAL_SCALE;
use deadline_orbit_rendering::{FrameInput, PortraitState, Presentation, RenderingBackend};

/// Backend that replays frames and reports the side panel.
#[derive(Debug)]
pub(crate) struct TextBackend<W> {
    frames: Vec<FrameInput>,
    out: W,
}

impl<W: Write> TextBackend<W> {
    pub(crate) fn new(frames: Vec<FrameInput>, out: W) -> Self {
        Self { frames, out }
    }
}

impl<W: Write> RenderingBackend for TextBackend<W> {
    fn run<F>(mut self, mut presentation: Presentation, mut update: F) -> Result<()>
    where
        F: FnMut(FrameInput, &mut Presentation) -> bool,
    {
        for frame in self.frames.drain(..) {
            if !update(frame, &mut presentation) {
                break;
            }
        }
        write_presentation(&mut self.out, &presentation).context("failed to write presentation")
    }
}

fn write_presentation<W: Write>(out: &mut W, presentation: &Presentation) -> std::io::Result<()> {
    let scene = &presentation.scene;
    writeln!(
        out,
        "{} | {} | {}",
        presentation.title, presentation.feed, presentation.live
    )?;
    writeln!(out, "{}", scene.panel.title())?;
    for entry in &scene.panel.entries {
        writeln!(out, "  {}", entry.login)?;
    }
    writeln!(
        out,
        "visible: {} of {}",
        scene.visible_entities().count(),
        scene.entities.len()
    )?;
    let ready = scene
        .entities
        .iter()
        .filter(|entity| entity.portrait_state == PortraitState::Ready)
        .count();
    writeln!(out, "portraits ready: {ready} of {}", scene.entities.len())?;
    for entity in scene.entities.iter().filter(|entity| entity.scale != NEUTRAL_SCALE) {
        writeln!(out, "emphasized: {} x{:.2}", entity.login, entity.scale)?;
    }
    out.flush()
}
