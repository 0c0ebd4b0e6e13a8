#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Long-lived WebSocket client that mirrors occupancy pushes.
//!
//! The client owns the socket on a tokio task and forwards every decoded
//! [`OccupancyMessage`] over an unbounded channel, so the occupancy map stays
//! with a single consumer. Dropped connections are retried with bounded
//! exponential backoff and the last subscription is replayed on every
//! reconnect.

mod session;

use std::time::Duration;

use deadline_orbit_system_occupancy::{OccupancyMessage, Subscription};
use thiserror::Error;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};

const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection parameters for the occupancy channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    url: String,
    initial_delay: Duration,
    max_delay: Duration,
    connect_timeout: Duration,
}

impl Config {
    /// Creates a configuration for the provided `ws://` or `wss://` address.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            initial_delay: DEFAULT_INITIAL_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Replaces the limit on a single connection attempt, including the
    /// WebSocket handshake. Zero is raised to one millisecond.
    #[must_use]
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout.max(Duration::from_millis(1));
        self
    }

    /// Replaces the backoff bounds. A zero initial delay is raised to one
    /// millisecond and the cap never drops below the initial delay.
    #[must_use]
    pub fn with_backoff(mut self, initial_delay: Duration, max_delay: Duration) -> Self {
        self.initial_delay = initial_delay.max(Duration::from_millis(1));
        self.max_delay = max_delay.max(self.initial_delay);
        self
    }

    /// Address of the occupancy endpoint.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Delay before the first reconnect attempt.
    #[must_use]
    pub const fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Upper bound for any reconnect delay.
    #[must_use]
    pub const fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Limit on a single connection attempt.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Delay after `failures` consecutive failures: `initial * 2^failures`,
    /// capped at the maximum delay.
    #[must_use]
    pub fn backoff_delay(&self, failures: u32) -> Duration {
        let factor = 2u32.checked_pow(failures).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

/// Health of the occupancy channel, published on a watch channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LiveStatus {
    /// A connection attempt is in flight.
    Connecting,
    /// The socket is open and the subscription was sent.
    Live,
    /// The connection failed; the next attempt is scheduled.
    Paused {
        /// Consecutive failures so far.
        attempt: u32,
        /// Delay before the next attempt.
        retry_in: Duration,
    },
    /// The client shut down and will not reconnect.
    Stopped,
}

/// Errors raised by the live client.
#[derive(Debug, Error)]
pub enum LiveError {
    /// Cluster `0` is ignored by the server and therefore rejected locally.
    #[error("cluster id 0 does not name a scope")]
    InvalidCluster,
    /// The background task is no longer running.
    #[error("live client task has stopped")]
    Stopped,
    /// The connection attempt did not complete in time.
    #[error("connection attempt timed out after {0:?}")]
    ConnectTimeout(Duration),
    /// The server closed the socket.
    #[error("occupancy channel closed by the server")]
    ClosedByServer,
    /// The subscription could not be encoded.
    #[error("failed to encode subscription: {0}")]
    Encode(#[from] serde_json::Error),
    /// Transport level failure.
    #[error("websocket failure: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Validates a cluster id and turns it into a subscription handshake.
pub fn subscription_for(cluster: u32) -> Result<Subscription, LiveError> {
    if cluster == 0 {
        return Err(LiveError::InvalidCluster);
    }
    Ok(Subscription { cluster })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LiveCommand {
    Subscribe(Subscription),
    Shutdown,
}

/// Handle used to steer a running live client.
#[derive(Debug)]
pub struct LiveHandle {
    commands: mpsc::UnboundedSender<LiveCommand>,
    status: watch::Receiver<LiveStatus>,
    task: JoinHandle<()>,
}

impl LiveHandle {
    /// Switches the mirrored scope. The new subscription is sent right away
    /// when connected and replayed after every reconnect.
    pub fn subscribe(&self, cluster: u32) -> Result<(), LiveError> {
        let subscription = subscription_for(cluster)?;
        self.commands
            .send(LiveCommand::Subscribe(subscription))
            .map_err(|_| LiveError::Stopped)
    }

    /// Receiver observing the channel health.
    #[must_use]
    pub fn status(&self) -> watch::Receiver<LiveStatus> {
        self.status.clone()
    }

    /// Stops the client and waits for the socket to close.
    pub async fn shutdown(self) -> Result<(), LiveError> {
        let _ = self.commands.send(LiveCommand::Shutdown);
        self.task.await.map_err(|_| LiveError::Stopped)
    }
}

/// Spawns the live client on the current tokio runtime.
///
/// Returns the steering handle and the receiver of decoded occupancy
/// messages. The initial subscription is optional; without one the client
/// stays connected but silent until [`LiveHandle::subscribe`] is called.
pub fn spawn(
    config: Config,
    cluster: Option<u32>,
) -> Result<(LiveHandle, mpsc::UnboundedReceiver<OccupancyMessage>), LiveError> {
    let subscription = cluster.map(subscription_for).transpose()?;
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (message_tx, message_rx) = mpsc::unbounded_channel();
    let (status_tx, status_rx) = watch::channel(LiveStatus::Connecting);

    let task = tokio::spawn(session::run(
        config,
        subscription,
        command_rx,
        message_tx,
        status_tx,
    ));

    Ok((
        LiveHandle {
            commands: command_tx,
            status: status_rx,
            task,
        },
        message_rx,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_until_capped() {
        let config = Config::new("ws://localhost/ws")
            .with_backoff(Duration::from_secs(1), Duration::from_secs(60));

        let delays: Vec<u64> = (0..8).map(|failures| config.backoff_delay(failures).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 32, 60, 60]);
        assert_eq!(config.backoff_delay(200), Duration::from_secs(60));
    }

    #[test]
    fn backoff_bounds_are_sanitised() {
        let config = Config::new("ws://localhost/ws")
            .with_backoff(Duration::ZERO, Duration::ZERO)
            .with_connect_timeout(Duration::ZERO);
        assert_eq!(config.initial_delay(), Duration::from_millis(1));
        assert_eq!(config.max_delay(), Duration::from_millis(1));
        assert_eq!(config.connect_timeout(), Duration::from_millis(1));
    }

    #[test]
    fn cluster_zero_is_rejected() {
        assert!(matches!(subscription_for(0), Err(LiveError::InvalidCluster)));
        assert_eq!(
            subscription_for(199).expect("valid cluster"),
            Subscription { cluster: 199 }
        );
    }
}
