//! Live order WebSocket endpoint
//!
//! GET /api/live/ws?token=<JWT>
//! Auth: JWT as query parameter (browser WebSockets cannot set headers)
//!
//! Protocol: server → client `LiveMessage` only. Staff see every order,
//! customers only their own.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::live::LiveMessage;
use shared::models::OrderStatus;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::broadcast;
use tokio::time::Duration;
use uuid::Uuid;

use crate::auth::session;
use crate::db;
use crate::live::Viewer;
use crate::services::{closure, orders};
use crate::state::AppState;

/// Maximum concurrent live sockets per user
const MAX_LIVE_WS_PER_USER: usize = 5;

#[derive(Deserialize)]
pub struct WsAuthQuery {
    token: String,
}

pub async fn handle_live_ws(
    State(state): State<AppState>,
    Query(query): Query<WsAuthQuery>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, AppError> {
    let identity = session::verify_token(&query.token, &state.auth_jwt_secret)?;
    let user_id = identity.user_id;

    let viewer = match session::load_staff(&state, user_id).await? {
        Some(_) => Viewer::Staff,
        None => Viewer::Customer(user_id),
    };

    if let Err(open) = acquire(&state.live_connections, user_id) {
        return Err(AppError::with_message(
            ErrorCode::RateLimited,
            format!("Too many live connections ({open}/{MAX_LIVE_WS_PER_USER})"),
        ));
    }

    let connections = state.live_connections.clone();
    Ok(ws
        .on_failed_upgrade(move |e| {
            tracing::warn!(user_id = %user_id, error = %e, "Live WS upgrade failed");
            release(&connections, user_id);
        })
        .on_upgrade(move |socket| live_ws_session(socket, state, user_id, viewer)))
}

/// Count a new socket for `user_id`, or return how many are already open
fn acquire(connections: &DashMap<Uuid, AtomicUsize>, user_id: Uuid) -> Result<(), usize> {
    // Incremented under the entry lock so concurrent upgrades cannot both pass the cap
    let counter = connections
        .entry(user_id)
        .or_insert_with(|| AtomicUsize::new(0));
    let prev = counter.fetch_add(1, Ordering::SeqCst);
    if prev >= MAX_LIVE_WS_PER_USER {
        counter.fetch_sub(1, Ordering::SeqCst);
        return Err(prev);
    }
    Ok(())
}

/// Undo `acquire`; the entry goes away with the user's last socket
fn release(connections: &DashMap<Uuid, AtomicUsize>, user_id: Uuid) {
    if let Some(counter) = connections.get(&user_id) {
        let _ = counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }
    connections.remove_if(&user_id, |_, counter| counter.load(Ordering::SeqCst) == 0);
}

async fn live_ws_session(socket: WebSocket, state: AppState, user_id: Uuid, viewer: Viewer) {
    let (mut sink, mut stream) = socket.split();
    tracing::info!(user_id = %user_id, ?viewer, "Live WS connected");

    // Subscribe before the snapshot so no update falls in between
    let mut hub_rx = state.live_orders.subscribe();

    match snapshot(&state, viewer).await {
        Ok(ready) => {
            if send_message(&mut sink, &ready).await.is_err() {
                release(&state.live_connections, user_id);
                return;
            }
        }
        Err(e) => {
            tracing::error!(user_id = %user_id, error = %e, "Failed to load live snapshot");
            release(&state.live_connections, user_id);
            return;
        }
    }

    let mut ping_interval = tokio::time::interval(Duration::from_secs(30));
    ping_interval.tick().await; // skip immediate

    loop {
        tokio::select! {
            _ = ping_interval.tick() => {
                if sink.send(Message::Ping(vec![].into())).await.is_err() {
                    break;
                }
            }

            event = hub_rx.recv() => {
                match event {
                    Ok(msg) => {
                        if viewer.can_see(&msg) && send_message(&mut sink, &msg).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(user_id = %user_id, lagged = n, "Live subscriber lagged, resending snapshot");
                        hub_rx = state.live_orders.subscribe();
                        let Ok(ready) = snapshot(&state, viewer).await else {
                            break;
                        };
                        if send_message(&mut sink, &ready).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    release(&state.live_connections, user_id);
    tracing::info!(user_id = %user_id, "Live WS disconnected");
}

/// Active orders visible to `viewer` plus the current closure state
async fn snapshot(state: &AppState, viewer: Viewer) -> Result<LiveMessage, sqlx::Error> {
    let list = match viewer {
        Viewer::Staff => db::orders::list_by_statuses(&state.pool, &OrderStatus::ACTIVE).await?,
        Viewer::Customer(user_id) => db::orders::list_active_for_user(&state.pool, user_id).await?,
    };
    let orders = orders::load_details(&state.pool, list).await?;
    let closure = closure::current_status(&state.pool).await?;
    Ok(LiveMessage::Ready { orders, closure })
}

async fn send_message(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &LiveMessage,
) -> Result<(), ()> {
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize live message");
            return Err(());
        }
    };
    sink.send(Message::Text(json.into())).await.map_err(|_| ())
}
