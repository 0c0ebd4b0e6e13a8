#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Navigation system that turns scroll gestures and searches into focus commands.
//!
//! Scroll deltas accumulate into a signed scalar; every crossing of a bucket
//! boundary produces exactly one [`Command::SetFocus`]. Searches jump straight
//! to a stage without rewriting the accumulator.

use deadline_orbit_core::{Command, Event, Focus, SearchEntry, StageIndex};
use tracing::debug;

const DEFAULT_PIXELS_PER_BUCKET: f64 = 114.0;
const DEFAULT_EXPIRED_THRESHOLD: i64 = -10;

/// Configuration parameters required to construct the navigation system.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    pixels_per_bucket: f64,
    expired_threshold: i64,
}

impl Config {
    /// Creates a configuration from a bucket height and the expired threshold.
    ///
    /// Candidates strictly below `expired_threshold` focus the expired
    /// pseudo-bucket. Non-positive bucket heights fall back to the default.
    #[must_use]
    pub fn new(pixels_per_bucket: f64, expired_threshold: i64) -> Self {
        let pixels_per_bucket = if pixels_per_bucket.is_finite() && pixels_per_bucket > 0.0 {
            pixels_per_bucket
        } else {
            DEFAULT_PIXELS_PER_BUCKET
        };
        Self {
            pixels_per_bucket,
            expired_threshold,
        }
    }

    /// Scroll distance that spans a single bucket.
    #[must_use]
    pub const fn pixels_per_bucket(&self) -> f64 {
        self.pixels_per_bucket
    }

    /// Candidate below which the expired pseudo-bucket takes focus.
    #[must_use]
    pub const fn expired_threshold(&self) -> i64 {
        self.expired_threshold
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_PIXELS_PER_BUCKET, DEFAULT_EXPIRED_THRESHOLD)
    }
}

/// Explicit navigation state shared by scroll, jump and search handling.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NavigationState {
    scroll_accumulator: f64,
    scroll_bucket: Option<i64>,
    focused: Option<Focus>,
    previous_focus: Option<Focus>,
    focus_before_query: Option<Option<Focus>>,
}

impl NavigationState {
    /// Cumulative scroll distance since the roster was loaded.
    #[must_use]
    pub const fn scroll_accumulator(&self) -> f64 {
        self.scroll_accumulator
    }

    /// Bucket the accumulator last resolved to, `None` before any scroll
    /// has been resolved.
    #[must_use]
    pub const fn scroll_bucket(&self) -> Option<i64> {
        self.scroll_bucket
    }

    /// Bucket currently focused, `None` when no stage exists.
    #[must_use]
    pub const fn focused(&self) -> Option<Focus> {
        self.focused
    }

    /// Bucket focused before the most recent change.
    #[must_use]
    pub const fn previous_focus(&self) -> Option<Focus> {
        self.previous_focus
    }

    /// Reports whether a search is holding a focus to restore.
    #[must_use]
    pub const fn search_active(&self) -> bool {
        self.focus_before_query.is_some()
    }
}

/// One-bucket camera adjustment requested alongside a jump.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraNudge {
    /// Move one bucket step toward farther stages.
    Outward,
    /// Move one bucket step toward nearer stages.
    Inward,
}

impl CameraNudge {
    /// Signed number of bucket steps represented by the nudge.
    #[must_use]
    pub const fn steps(self) -> i32 {
        match self {
            Self::Outward => 1,
            Self::Inward => -1,
        }
    }
}

/// Notification describing a focus transition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FocusChange {
    /// Focus before the transition.
    pub previous: Option<Focus>,
    /// Focus after the transition.
    pub current: Option<Focus>,
    /// Camera adjustment requested by a jump, if any.
    pub camera_nudge: Option<CameraNudge>,
}

/// Result of a search request.
#[derive(Clone, Debug, PartialEq)]
pub enum SearchOutcome {
    /// A handle matched; the focus jumped to its stage.
    Found {
        /// First matching entry.
        entry: SearchEntry,
        /// Focus transition caused by the jump, if the stage was not already focused.
        change: Option<FocusChange>,
    },
    /// Nothing matched; the focus is unchanged.
    NotFound,
    /// The query was empty; the focus held before the search was restored.
    Restored {
        /// Focus in effect after restoring.
        focus: Option<Focus>,
    },
}

/// Pure system that owns the navigation state and emits focus commands.
#[derive(Debug, Default)]
pub struct Navigation {
    config: Config,
    state: NavigationState,
}

impl Navigation {
    /// Creates a navigation system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: NavigationState::default(),
        }
    }

    /// Read-only access to the navigation state.
    #[must_use]
    pub const fn state(&self) -> &NavigationState {
        &self.state
    }

    /// Navigation depth used to scale hover emphasis, never below one.
    #[must_use]
    pub fn depth(&self) -> f32 {
        let buckets = self.state.scroll_accumulator / self.config.pixels_per_bucket;
        (buckets as f32).max(1.0)
    }

    /// Consumes world events; a freshly classified roster resets navigation
    /// and focuses the nearest stage.
    pub fn handle(&mut self, events: &[Event], index: &StageIndex, out: &mut Vec<Command>) {
        for event in events {
            if let Event::RosterClassified { smallest, .. } = event {
                self.state = NavigationState {
                    scroll_bucket: Some(0),
                    ..NavigationState::default()
                };
                let initial = smallest.or_else(|| index.smallest()).map(Focus::Stage);
                let _ = self.transition(initial, None, out);
            }
        }
    }

    /// Adds a scroll delta and refocuses when the accumulator crosses a
    /// bucket boundary.
    ///
    /// Deltas that stay inside the current bucket leave the focus alone, so a
    /// focus set by [`Navigation::jump_to`] survives small scrolls.
    pub fn apply_delta(
        &mut self,
        delta: f64,
        index: &StageIndex,
        out: &mut Vec<Command>,
    ) -> Option<FocusChange> {
        if delta.is_finite() {
            self.state.scroll_accumulator += delta;
        }
        let candidate = (self.state.scroll_accumulator / self.config.pixels_per_bucket).floor();
        let candidate = candidate as i64;
        if self.state.scroll_bucket == Some(candidate) {
            return None;
        }
        self.state.scroll_bucket = Some(candidate);

        let target = if candidate < self.config.expired_threshold && index.has_expired() {
            Some(Focus::Expired)
        } else {
            index.clamp(candidate).map(Focus::Stage)
        };
        self.transition(target, None, out)
    }

    /// Focuses a bucket directly, leaving the scroll accumulator untouched.
    ///
    /// Unknown buckets are ignored. When `nudge_camera` is set the returned
    /// change carries a one-step camera nudge toward the new bucket.
    pub fn jump_to(
        &mut self,
        focus: Focus,
        nudge_camera: bool,
        index: &StageIndex,
        out: &mut Vec<Command>,
    ) -> Option<FocusChange> {
        let known = match focus {
            Focus::Stage(key) => index.contains(key),
            Focus::Expired => index.has_expired(),
        };
        if !known {
            return None;
        }

        let nudge = if nudge_camera {
            nudge_between(self.state.focused, focus)
        } else {
            None
        };
        self.transition(Some(focus), nudge, out)
    }

    /// Returns the first entry whose handle contains `text`, ignoring case.
    ///
    /// Entries are expected in ascending stage order then roster order, as
    /// produced by the world's search query.
    #[must_use]
    pub fn find_by_query<'a>(&self, text: &str, entries: &'a [SearchEntry]) -> Option<&'a SearchEntry> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        entries
            .iter()
            .find(|entry| entry.login.to_lowercase().contains(&needle))
    }

    /// Runs a search: jumps to the first match, or restores the pre-search
    /// focus when the query is empty.
    pub fn search(
        &mut self,
        text: &str,
        entries: &[SearchEntry],
        index: &StageIndex,
        out: &mut Vec<Command>,
    ) -> SearchOutcome {
        if text.trim().is_empty() {
            return match self.state.focus_before_query.take() {
                Some(restore) => {
                    let _ = self.transition(restore, None, out);
                    SearchOutcome::Restored { focus: restore }
                }
                None => SearchOutcome::Restored {
                    focus: self.state.focused,
                },
            };
        }

        if self.state.focus_before_query.is_none() {
            self.state.focus_before_query = Some(self.state.focused);
        }

        let Some(entry) = self.find_by_query(text, entries).cloned() else {
            debug!(query = text, "search found no match");
            return SearchOutcome::NotFound;
        };
        let change = self.jump_to(Focus::Stage(entry.stage), true, index, out);
        SearchOutcome::Found { entry, change }
    }

    fn transition(
        &mut self,
        target: Option<Focus>,
        camera_nudge: Option<CameraNudge>,
        out: &mut Vec<Command>,
    ) -> Option<FocusChange> {
        if target == self.state.focused {
            return None;
        }
        let previous = self.state.focused;
        self.state.previous_focus = previous;
        self.state.focused = target;
        debug!(previous = ?previous, current = ?target, "navigation focus moved");
        out.push(Command::SetFocus { focus: target });
        Some(FocusChange {
            previous,
            current: target,
            camera_nudge,
        })
    }
}

fn nudge_between(from: Option<Focus>, to: Focus) -> Option<CameraNudge> {
    let rank = |focus: Focus| match focus {
        Focus::Stage(key) => key.diff(),
        Focus::Expired => i64::MIN,
    };
    let from = rank(from?);
    let to = rank(to);
    match to.cmp(&from) {
        std::cmp::Ordering::Greater => Some(CameraNudge::Outward),
        std::cmp::Ordering::Less => Some(CameraNudge::Inward),
        std::cmp::Ordering::Equal => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deadline_orbit_core::StageKey;

    #[test]
    fn non_positive_bucket_height_falls_back_to_default() {
        assert_eq!(Config::new(0.0, -3).pixels_per_bucket(), 114.0);
        assert_eq!(Config::new(f64::NAN, -3).pixels_per_bucket(), 114.0);
    }

    #[test]
    fn depth_is_floor_clamped_to_one() {
        let mut navigation = Navigation::default();
        assert_eq!(navigation.depth(), 1.0);
        navigation.state.scroll_accumulator = 114.0 * 3.0;
        assert_eq!(navigation.depth(), 3.0);
        navigation.state.scroll_accumulator = -500.0;
        assert_eq!(navigation.depth(), 1.0);
    }

    #[test]
    fn nudge_follows_stage_order() {
        let near = Focus::Stage(StageKey::new(1));
        let far = Focus::Stage(StageKey::new(4));
        assert_eq!(nudge_between(Some(near), far), Some(CameraNudge::Outward));
        assert_eq!(nudge_between(Some(far), near), Some(CameraNudge::Inward));
        assert_eq!(nudge_between(Some(near), Focus::Expired), Some(CameraNudge::Inward));
        assert_eq!(nudge_between(None, far), None);
    }
}
