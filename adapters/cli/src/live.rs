//! Terminal mirror of the occupancy channel.

use anyhow::{Context, Result};
use deadline_orbit_live::{self as live, LiveStatus};
use deadline_orbit_rendering::LiveIndicator;
use deadline_orbit_system_occupancy::{OccupancyChange, OccupancyEvent, OccupancyMap};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::settings::Settings;

const DEFAULT_URL: &str = "ws://localhost:8080/clusters.live";

/// Maps the client status onto the indicator shown to the user.
pub(crate) fn indicator(status: LiveStatus) -> LiveIndicator {
    match status {
        LiveStatus::Connecting => LiveIndicator::Connecting,
        LiveStatus::Live => LiveIndicator::Live,
        LiveStatus::Paused { attempt, retry_in } => LiveIndicator::Paused { attempt, retry_in },
        LiveStatus::Stopped => LiveIndicator::Offline,
    }
}

/// What a line typed on stdin asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Request {
    Subscribe(u32),
    Quit,
    Ignore,
}

pub(crate) fn parse_request(line: &str) -> Request {
    let line = line.trim();
    if line.eq_ignore_ascii_case("q") || line.eq_ignore_ascii_case("quit") {
        return Request::Quit;
    }
    line.parse().map_or(Request::Ignore, Request::Subscribe)
}

/// Runs the mirror until stdin closes or `q` is entered.
pub(crate) fn run(url: Option<String>, cluster: Option<u32>, settings: &Settings) -> Result<()> {
    let url = url
        .or_else(|| settings.live.url.clone())
        .unwrap_or_else(|| DEFAULT_URL.to_owned());
    let cluster = cluster.or(settings.live.cluster);

    let mut config = live::Config::new(url);
    let (initial, max) = settings.live_backoff();
    if initial.is_some() || max.is_some() {
        let initial = initial.unwrap_or(config.initial_delay());
        let max = max.unwrap_or(config.max_delay());
        config = config.with_backoff(initial, max);
    }
    if let Some(limit) = settings.live_connect_timeout() {
        config = config.with_connect_timeout(limit);
    }

    let runtime = tokio::runtime::Runtime::new().context("failed to start the async runtime")?;
    runtime.block_on(mirror(config, cluster))
}

async fn mirror(config: live::Config, cluster: Option<u32>) -> Result<()> {
    info!(url = config.url(), ?cluster, "connecting to occupancy channel");
    let (handle, mut messages) = live::spawn(config, cluster)?;
    let mut status = handle.status();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut map = OccupancyMap::new();

    println!("{}", indicator(*status.borrow()));
    loop {
        tokio::select! {
            message = messages.recv() => {
                let Some(message) = message else { break };
                match map.apply_event(OccupancyEvent::from(message)) {
                    Ok(OccupancyChange::Joined { slot }) => {
                        if let Some(popup) = map.popup(&slot) {
                            println!("{} joined {} ({})", popup.login, popup.slot, popup.profile_url);
                        }
                    }
                    Ok(OccupancyChange::Left { slot }) => println!("{slot} is free"),
                    Err(error) => warn!(%error, "ignoring occupancy message"),
                }
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *status.borrow_and_update();
                println!("{}", indicator(current));
            }
            line = lines.next_line() => {
                match line.context("failed to read stdin")?.as_deref().map(parse_request) {
                    None | Some(Request::Quit) => break,
                    Some(Request::Subscribe(cluster)) => match handle.subscribe(cluster) {
                        Ok(()) => info!(cluster, "switched scope"),
                        Err(error) => warn!(%error, "scope not switched"),
                    },
                    Some(Request::Ignore) => {}
                }
            }
        }
    }

    info!(occupied = map.occupied_count(), "closing occupancy channel");
    handle.shutdown().await?;
    println!("{}", indicator(LiveStatus::Stopped));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn requests_are_parsed_from_lines() {
        assert_eq!(parse_request(" 199\n"), Request::Subscribe(199));
        assert_eq!(parse_request("Q"), Request::Quit);
        assert_eq!(parse_request("cluster"), Request::Ignore);
    }

    #[test]
    fn paused_status_keeps_retry_details() {
        let shown = indicator(LiveStatus::Paused {
            attempt: 3,
            retry_in: Duration::from_secs(8),
        });
        assert_eq!(shown.to_string(), "live updates paused (attempt 3, retrying in 8s)");
        assert_eq!(indicator(LiveStatus::Stopped), LiveIndicator::Offline);
    }
}
