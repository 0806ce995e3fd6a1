use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::response::IntoResponse;
use axum::Json;
use tokio_stream::wrappers::{BroadcastStream, IntervalStream};
use tokio_stream::StreamExt;
use tracing::{debug, info};

use crate::api::dtos::requests::NotificationQuery;
use crate::api::dtos::responses::MarkAllReadResponse;
use crate::api::extractors::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Query(query): Query<NotificationQuery>,
) -> Result<impl IntoResponse, AppError> {
    let notifications = state.notification_repo
        .list_for(principal.role, &principal.id, query.unread_only)
        .await?;
    Ok(Json(notifications))
}

pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Path(notification_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let notification = state.notification_repo.find_by_id(&notification_id).await?
        .filter(|n| n.is_visible_to(principal.role, &principal.id))
        .ok_or(AppError::NotFound("Notification not found".into()))?;

    state.notification_repo.mark_read(&notification.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let updated = state.notification_repo.mark_all_read(principal.role, &principal.id).await?;
    info!("Marked {} notifications read for {} {}", updated, principal.role, principal.id);
    Ok(Json(MarkAllReadResponse { updated }))
}

/// Live feed of notifications addressed to the caller, as `notification` events.
pub async fn stream(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.notification_service.subscribe();
    debug!("SSE subscriber connected: {} {}", principal.role, principal.id);

    let live_stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(notification) if notification.is_visible_to(principal.role, &principal.id) => {
            let data = serde_json::to_string(&notification).unwrap_or_default();
            Some(Ok(Event::default().data(data).event("notification").id(notification.id)))
        }
        Ok(_) => None,
        Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(_)) => None,
    });

    let keepalive_stream = StreamExt::map(
        IntervalStream::new(tokio::time::interval(KEEPALIVE_INTERVAL)),
        |_| Ok(Event::default().comment("keepalive")),
    );

    Sse::new(StreamExt::merge(live_stream, keepalive_stream))
}
