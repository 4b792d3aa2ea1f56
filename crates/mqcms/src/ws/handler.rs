//! Websocket upgrade handler and per-connection transport tasks.

use std::future;
use std::time::Duration;

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{CloseFrame, Message, WebSocket, rejection::WebSocketUpgradeRejection},
    },
    response::Response,
};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use mqcms_protocol::ClientFrame;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, interval_at};
use tracing::{debug, info, warn};

use crate::api::{ApiError, AppState};

use super::connection::Payload;
use super::hub::{Departure, HubHandle};

/// Websocket upgrade handler.
///
/// GET /ws
pub async fn ws_handler(
    State(state): State<AppState>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, ApiError> {
    let ws = upgrade.map_err(|rejection| {
        debug!("Rejected websocket handshake: {}", rejection.body_text());
        ApiError::upgrade_required(rejection.body_text())
    })?;
    Ok(upgrade_to_hub(&state, ws))
}

/// Complete the handshake and attach the socket to the default hub.
pub fn upgrade_to_hub(state: &AppState, ws: WebSocketUpgrade) -> Response {
    let hub = state.hubs.default_hub();
    let config = state.hubs.config();
    let buffer = config.connection_buffer.max(1);
    let heartbeat = config.heartbeat_interval();

    ws.on_upgrade(move |socket| handle_socket(socket, hub, buffer, heartbeat))
}

/// Drive one websocket until it ends, then report its departure to the hub.
///
/// A writer task drains the connection's outbound queue into the socket and
/// sends heartbeat pings. The reader forwards data frames to the hub. Whichever
/// side finishes first decides the departure, which is reported exactly once.
///
/// With a heartbeat, a peer that sends nothing (not even a pong) for two
/// intervals is treated as dead.
pub async fn handle_socket(
    socket: WebSocket,
    hub: HubHandle,
    buffer: usize,
    heartbeat: Option<Duration>,
) {
    let (mut sink, mut stream) = socket.split();
    let (outbound, mut queue) = mpsc::channel::<Payload>(buffer);

    let id = match hub.connect(outbound).await {
        Ok(id) => id,
        Err(e) => {
            warn!("Failed to register websocket with hub '{}': {}", hub.name(), e);
            let _ = sink.close().await;
            return;
        }
    };
    info!("Websocket {} connected to hub '{}'", id, hub.name());

    let mut writer = tokio::spawn(async move {
        let mut pings = heartbeat.map(every);
        loop {
            tokio::select! {
                next = queue.recv() => match next {
                    Some(payload) => sink.send(Message::Text(payload.to_string().into())).await?,
                    // The hub dropped this connection.
                    None => {
                        let _ = sink.close().await;
                        return Ok::<_, axum::Error>(());
                    }
                },
                _ = tick(&mut pings) => sink.send(Message::Ping(Bytes::new())).await?,
            }
        }
    });

    let mut liveness = heartbeat.map(every);
    let timeout = heartbeat.map(|period| period * 2);
    let mut last_seen = Instant::now();

    let departure = loop {
        tokio::select! {
            frame = stream.next() => {
                if matches!(frame, Some(Ok(_))) {
                    last_seen = Instant::now();
                }
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        let frame = ClientFrame::Text(text.as_str().to_owned());
                        if let Err(e) = hub.client_frame(id, frame).await {
                            break Departure::Errored(e.to_string());
                        }
                    }
                    Some(Ok(Message::Binary(data))) => {
                        let frame = ClientFrame::Binary(data.to_vec());
                        if let Err(e) = hub.client_frame(id, frame).await {
                            break Departure::Errored(e.to_string());
                        }
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                    Some(Ok(Message::Close(frame))) => break closed(frame),
                    Some(Err(e)) => break Departure::Errored(e.to_string()),
                    None => break Departure::closed(),
                }
            },
            result = &mut writer => break match result {
                Ok(Ok(())) => Departure::Errored("dropped by hub".to_string()),
                Ok(Err(e)) => Departure::Errored(e.to_string()),
                Err(e) => Departure::Errored(e.to_string()),
            },
            _ = tick(&mut liveness) => {
                if timeout.is_some_and(|limit| last_seen.elapsed() > limit) {
                    warn!("Websocket {} missed its heartbeat, dropping", id);
                    break Departure::Errored("heartbeat timeout".to_string());
                }
            },
        }
    };

    writer.abort();
    debug!("Websocket {} ended: {:?}", id, departure);
    if let Err(e) = hub.disconnect(id, departure).await {
        warn!("Failed to report departure of {}: {}", id, e);
    }
}

fn every(period: Duration) -> Interval {
    interval_at(Instant::now() + period, period)
}

fn closed(frame: Option<CloseFrame>) -> Departure {
    match frame {
        Some(frame) => Departure::Closed {
            code: Some(frame.code),
            reason: frame.reason.as_str().to_owned(),
        },
        None => Departure::closed(),
    }
}

async fn tick(pings: &mut Option<Interval>) {
    match pings {
        Some(interval) => {
            interval.tick().await;
        }
        None => future::pending().await,
    }
}
