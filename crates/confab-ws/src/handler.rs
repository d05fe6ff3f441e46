use axum::extract::ws::{CloseFrame, Message, WebSocket};
use confab_core::presence::PresenceTransition;
use confab_core::AppState;
use confab_models::{ClientEvent, ServerEvent};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration, Instant, MissedTickBehavior};

use crate::session::Session;

const HEARTBEAT_INTERVAL_MS: u64 = 30_000;
const HEARTBEAT_TIMEOUT: Duration = Duration::from_millis(75_000);
const IDENTIFY_TIMEOUT: Duration = Duration::from_secs(30);
const PING_INTERVAL: Duration = Duration::from_secs(20);
/// A stuck socket gets this long per write before the connection is torn
/// down, so one dead consumer never stalls its writer task.
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn handle_connection(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let hello = ServerEvent::Hello {
        heartbeat_interval_ms: HEARTBEAT_INTERVAL_MS,
    };
    if send_event(&mut sender, &hello).await.is_err() {
        return;
    }

    let user_id = match timeout(IDENTIFY_TIMEOUT, wait_for_identify(&mut receiver, &state)).await
    {
        Ok(Some(user_id)) => user_id,
        _ => {
            let _ = sender
                .send(Message::Close(Some(CloseFrame {
                    code: 4001,
                    reason: "identify failed or timed out".into(),
                })))
                .await;
            return;
        }
    };

    let session = Session::new(user_id);
    let (conn_id, events) = state.mux.register(user_id);
    tracing::info!(
        user_id,
        conn_id,
        session_id = %session.session_id,
        "gateway connection identified"
    );

    // Snapshot taken before our own presence edge: the list describes the
    // peers, the connecting user learns its own state from `ready` itself.
    let ready = ServerEvent::Ready {
        user_id,
        online_user_ids: state.presence.snapshot(),
    };
    if send_event(&mut sender, &ready).await.is_err() {
        state.mux.unregister(user_id, conn_id);
        return;
    }

    if state.presence.on_connect(user_id, conn_id) == PresenceTransition::CameOnline {
        state
            .mux
            .broadcast(&ServerEvent::presence_changed(user_id, true), Some(conn_id));
    }

    let reason = run_session(&mut sender, &mut receiver, events, &session).await;
    tracing::info!(user_id, conn_id, reason, "gateway connection closed");

    state.mux.unregister(user_id, conn_id);
    if state.presence.on_disconnect(user_id, conn_id) == PresenceTransition::WentOffline {
        state
            .mux
            .broadcast(&ServerEvent::presence_changed(user_id, false), None);
    }
}

async fn wait_for_identify(
    receiver: &mut (impl StreamExt<Item = Result<Message, axum::Error>> + Unpin),
    state: &AppState,
) -> Option<i64> {
    while let Some(Ok(frame)) = receiver.next().await {
        let Message::Text(text) = frame else {
            continue;
        };
        let Ok(event) = serde_json::from_str::<ClientEvent>(&text) else {
            tracing::debug!("ignoring unparseable frame before identify");
            continue;
        };
        if let ClientEvent::Identify { token } = event {
            match confab_core::auth::validate_token(&token, &state.config.jwt_secret) {
                Ok(claims) => return Some(claims.sub),
                Err(err) => {
                    tracing::debug!(error = %err, "gateway identify rejected");
                    return None;
                }
            }
        }
    }
    None
}

async fn run_session(
    sender: &mut (impl SinkExt<Message> + Unpin),
    receiver: &mut (impl StreamExt<Item = Result<Message, axum::Error>> + Unpin),
    mut events: mpsc::Receiver<ServerEvent>,
    session: &Session,
) -> &'static str {
    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    ping_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let heartbeat_sleep = tokio::time::sleep(HEARTBEAT_TIMEOUT);
    tokio::pin!(heartbeat_sleep);

    loop {
        tokio::select! {
            frame = receiver.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientEvent>(&text) {
                            Ok(ClientEvent::Heartbeat) => {
                                heartbeat_sleep
                                    .as_mut()
                                    .reset(Instant::now() + HEARTBEAT_TIMEOUT);
                                if send_event(sender, &ServerEvent::HeartbeatAck).await.is_err() {
                                    return "websocket send error";
                                }
                            }
                            // Already identified; a repeat identify changes nothing.
                            Ok(ClientEvent::Identify { .. }) => {}
                            Err(_) => {
                                tracing::debug!(
                                    user_id = session.user_id,
                                    "ignoring malformed client frame"
                                );
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => return "client close frame",
                    Some(Err(_)) => return "websocket receive error",
                    None => return "websocket stream ended",
                    _ => {}
                }
            }
            event = events.recv() => {
                // Events arrive in router-issue order and leave in the same
                // order: this task is the queue's only consumer.
                let Some(event) = event else {
                    return "event queue closed";
                };
                if send_event(sender, &event).await.is_err() {
                    return "websocket send error";
                }
            }
            () = &mut heartbeat_sleep => return "heartbeat timeout",
            _ = ping_interval.tick() => {
                if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                    return "websocket ping send error";
                }
            }
        }
    }
}

async fn send_event(
    sender: &mut (impl SinkExt<Message> + Unpin),
    event: &ServerEvent,
) -> Result<(), ()> {
    let payload = match serde_json::to_string(event) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::error!(error = %err, "failed to serialize server event");
            return Ok(());
        }
    };
    match timeout(WRITE_TIMEOUT, sender.send(Message::Text(payload.into()))).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(_)) => Err(()),
        Err(_) => {
            tracing::warn!("websocket write timed out");
            Err(())
        }
    }
}
