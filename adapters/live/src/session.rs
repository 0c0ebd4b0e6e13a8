use deadline_orbit_system_occupancy::{decode, OccupancyMessage, Subscription};
use futures::{SinkExt, StreamExt};
use tokio::{
    net::TcpStream,
    sync::{mpsc, watch},
};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::{Config, LiveCommand, LiveError, LiveStatus};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How a connected session ended.
enum SessionEnd {
    /// Shutdown was requested or every consumer went away.
    Shutdown,
    /// The connection dropped and should be retried.
    Dropped(LiveError),
}

pub(crate) async fn run(
    config: Config,
    mut subscription: Option<Subscription>,
    mut commands: mpsc::UnboundedReceiver<LiveCommand>,
    messages: mpsc::UnboundedSender<OccupancyMessage>,
    status: watch::Sender<LiveStatus>,
) {
    let mut failures: u32 = 0;

    loop {
        let _ = status.send_replace(LiveStatus::Connecting);
        let error = match open(&config, &mut subscription, &mut commands).await {
            Ok(Opened::Socket(socket)) => {
                let _ = status.send_replace(LiveStatus::Live);
                info!(url = config.url(), "occupancy channel live");
                match pump(socket, &mut subscription, &mut commands, &messages, &mut failures).await {
                    SessionEnd::Shutdown => break,
                    SessionEnd::Dropped(error) => error,
                }
            }
            Ok(Opened::Shutdown) => break,
            Err(error) => error,
        };

        let retry_in = config.backoff_delay(failures);
        failures = failures.saturating_add(1);
        warn!(
            url = config.url(),
            attempt = failures,
            retry_in_ms = retry_in.as_millis() as u64,
            %error,
            "occupancy channel paused"
        );
        let _ = status.send_replace(LiveStatus::Paused {
            attempt: failures,
            retry_in,
        });

        if !backoff_drain(&mut commands, &mut subscription, retry_in).await {
            break;
        }
    }

    let _ = status.send_replace(LiveStatus::Stopped);
    info!(url = config.url(), "occupancy channel stopped");
}

/// Result of a connection attempt that was not a failure.
enum Opened {
    Socket(Socket),
    /// Shutdown was requested while connecting.
    Shutdown,
}

/// Connects and replays the current subscription.
///
/// The attempt is bounded by the connect timeout and keeps honouring
/// commands, so a scope switch or shutdown never waits on a dead host.
async fn open(
    config: &Config,
    subscription: &mut Option<Subscription>,
    commands: &mut mpsc::UnboundedReceiver<LiveCommand>,
) -> Result<Opened, LiveError> {
    let limit = config.connect_timeout();
    let connect = tokio::time::timeout(limit, connect_async(config.url()));
    tokio::pin!(connect);

    let mut socket = loop {
        tokio::select! {
            connected = &mut connect => {
                let (socket, _response) = connected.map_err(|_| LiveError::ConnectTimeout(limit))??;
                break socket;
            }
            command = commands.recv() => match command {
                Some(LiveCommand::Subscribe(next)) => *subscription = Some(next),
                Some(LiveCommand::Shutdown) | None => return Ok(Opened::Shutdown),
            },
        }
    };

    if let Some(subscription) = *subscription {
        socket.send(Message::Text(subscription.encode()?.into())).await?;
        debug!(cluster = subscription.cluster, "subscription sent");
    }
    Ok(Opened::Socket(socket))
}

async fn pump(
    socket: Socket,
    subscription: &mut Option<Subscription>,
    commands: &mut mpsc::UnboundedReceiver<LiveCommand>,
    messages: &mpsc::UnboundedSender<OccupancyMessage>,
    failures: &mut u32,
) -> SessionEnd {
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => match decode(text.as_str()) {
                    Ok(message) => {
                        // Only a session that delivers data counts as recovered.
                        if *failures > 0 {
                            debug!(failures = *failures, "occupancy channel recovered");
                            *failures = 0;
                        }
                        if messages.send(message).is_err() {
                            let _ = sink.close().await;
                            return SessionEnd::Shutdown;
                        }
                    }
                    Err(error) => warn!(%error, "skipping malformed occupancy frame"),
                },
                Some(Ok(Message::Close(_))) | None => {
                    return SessionEnd::Dropped(LiveError::ClosedByServer);
                }
                Some(Ok(_)) => {}
                Some(Err(error)) => return SessionEnd::Dropped(error.into()),
            },
            command = commands.recv() => match command {
                Some(LiveCommand::Subscribe(next)) => {
                    *subscription = Some(next);
                    let frame = match next.encode() {
                        Ok(frame) => frame,
                        Err(error) => return SessionEnd::Dropped(error.into()),
                    };
                    if let Err(error) = sink.send(Message::Text(frame.into())).await {
                        return SessionEnd::Dropped(error.into());
                    }
                    debug!(cluster = next.cluster, "subscription switched");
                }
                Some(LiveCommand::Shutdown) | None => {
                    let _ = sink.close().await;
                    return SessionEnd::Shutdown;
                }
            },
        }
    }
}

/// Waits out a backoff delay while still honouring commands.
///
/// Returns `false` when the client should stop instead of reconnecting.
async fn backoff_drain(
    commands: &mut mpsc::UnboundedReceiver<LiveCommand>,
    subscription: &mut Option<Subscription>,
    delay: std::time::Duration,
) -> bool {
    let backoff = tokio::time::sleep(delay);
    tokio::pin!(backoff);
    loop {
        tokio::select! {
            _ = &mut backoff => return true,
            command = commands.recv() => match command {
                Some(LiveCommand::Subscribe(next)) => *subscription = Some(next),
                Some(LiveCommand::Shutdown) | None => return false,
            },
        }
    }
}
