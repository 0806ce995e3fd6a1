use axum::{extract::{State, Path, Query}, response::IntoResponse, Json, http::StatusCode};
use crate::state::AppState;
use crate::api::extractors::auth::RequireCustomer;
use crate::api::dtos::requests::{BookingStatusQuery, CreateBookingRequest, RateBookingRequest};
use crate::domain::models::auth::Role;
use crate::domain::models::booking::{Booking, BookingStatus, NewBookingParams};
use crate::domain::models::job::{Job, JOB_BOOKING_CREATED};
use crate::domain::models::notification::Notification;
use crate::domain::models::rating::Rating;
use crate::domain::models::user::User;
use crate::error::AppError;
use std::sync::Arc;
use chrono::{NaiveDate, NaiveTime, Utc};
use tracing::{info, warn};

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    RequireCustomer(principal): RequireCustomer,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = ensure_active_customer(&state, &principal.id).await?;

    let service = state.service_repo.find_by_id(&payload.service_id).await?
        .ok_or(AppError::NotFound("Service not found".into()))?;
    if !service.is_active {
        return Err(AppError::Validation("Service is not available for booking".into()));
    }

    let date = NaiveDate::parse_from_str(payload.date.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation("Invalid date format (YYYY-MM-DD)".into()))?;
    if date < Utc::now().date_naive() {
        return Err(AppError::Validation("Cannot book in the past".into()));
    }

    let time = NaiveTime::parse_from_str(payload.time.trim(), "%H:%M")
        .map_err(|_| AppError::Validation("Invalid time format (HH:MM)".into()))?;

    let address = payload.address.trim().to_string();
    if address.is_empty() {
        return Err(AppError::Validation("Address is required".into()));
    }

    let booking = Booking::new(NewBookingParams {
        user_id: user.id.clone(),
        service_id: service.id.clone(),
        service_name: service.name.clone(),
        date,
        time: time.format("%H:%M").to_string(),
        address,
        notes: payload.notes.filter(|n| !n.trim().is_empty()),
        amount: service.price,
    });

    let jobs = vec![Job::new(JOB_BOOKING_CREATED, booking.id.clone(), Utc::now())];
    let created = state.booking_repo.create(&booking, jobs).await?;

    state.notification_service.notify_quietly(vec![
        Notification::new(
            Role::Admin,
            None,
            "New booking",
            format!("{} booked {} on {} at {}.", user.name, created.service_name, created.date, created.time),
        ).for_booking(&created.id),
    ]).await;

    info!("Booking created: {} by customer {}", created.id, user.id);
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_my_bookings(
    State(state): State<Arc<AppState>>,
    RequireCustomer(principal): RequireCustomer,
    Query(query): Query<BookingStatusQuery>,
) -> Result<impl IntoResponse, AppError> {
    let bookings = state.booking_repo.list_by_user(&principal.id, query.status).await?;
    Ok(Json(bookings))
}

pub async fn get_my_booking(
    State(state): State<Arc<AppState>>,
    RequireCustomer(principal): RequireCustomer,
    Path(booking_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let booking = find_owned(&state, &principal.id, &booking_id).await?;
    let details = state.booking_repo.find_details(&booking.id).await?
        .ok_or(AppError::NotFound("Booking not found".into()))?;
    Ok(Json(details))
}

pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    RequireCustomer(principal): RequireCustomer,
    Path(booking_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let booking = find_owned(&state, &principal.id, &booking_id).await?;

    if !matches!(booking.status, BookingStatus::Pending | BookingStatus::Scheduled) {
        warn!("Customer {} tried to cancel booking {} in status {}", principal.id, booking.id, booking.status);
        return Err(AppError::Validation(format!("Cannot cancel a booking that is {}", booking.status)));
    }

    let updated = state.booking_workflow.transition(booking, BookingStatus::Cancelled, Role::User).await?;
    Ok(Json(updated))
}

pub async fn rate_booking(
    State(state): State<Arc<AppState>>,
    RequireCustomer(principal): RequireCustomer,
    Path(booking_id): Path<String>,
    Json(payload): Json<RateBookingRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !(1..=5).contains(&payload.rating) {
        return Err(AppError::Validation("Rating must be between 1 and 5".into()));
    }

    let mut booking = find_owned(&state, &principal.id, &booking_id).await?;

    if booking.status != BookingStatus::Completed {
        return Err(AppError::Validation("Only completed bookings can be rated".into()));
    }
    if booking.rating.is_some() {
        return Err(AppError::Validation("Booking has already been rated".into()));
    }
    let technician_id = booking.technician_id.clone()
        .ok_or(AppError::Validation("Booking has no technician to rate".into()))?;

    let review = payload.review.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
    let rating = Rating::new(booking.id.clone(), principal.id.clone(), technician_id.clone(), payload.rating, review.clone());

    booking.rating = Some(payload.rating);
    booking.review = review;
    let updated = state.booking_repo.rate(&booking, &rating).await?;

    state.notification_service.notify_quietly(vec![
        Notification::new(
            Role::Technician,
            Some(technician_id),
            "New rating",
            format!("You received {} stars for {} on {}.", payload.rating, updated.service_name, updated.date),
        ).for_booking(&updated.id),
    ]).await;

    info!("Booking {} rated {} by customer {}", updated.id, payload.rating, principal.id);
    Ok(Json(updated))
}

/// Loads a booking of `user_id`. Bookings of other customers are reported as missing.
async fn find_owned(state: &AppState, user_id: &str, booking_id: &str) -> Result<Booking, AppError> {
    ensure_active_customer(state, user_id).await?;
    state.booking_repo.find_by_id(booking_id).await?
        .filter(|b| b.user_id == user_id)
        .ok_or(AppError::NotFound("Booking not found".into()))
}

async fn ensure_active_customer(state: &AppState, user_id: &str) -> Result<User, AppError> {
    let user = state.user_repo.find_by_id(user_id).await?
        .ok_or(AppError::Unauthorized)?;
    if !user.is_active {
        warn!("Deactivated customer {} tried to use bookings", user_id);
        return Err(AppError::Forbidden("Account deactivated".into()));
    }
    Ok(user)
}
