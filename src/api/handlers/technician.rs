use axum::{extract::{State, Path, Query}, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::extractors::auth::RequireTechnician;
use crate::api::dtos::requests::{BookingStatusQuery, GenerateOtpRequest, VerifyOtpRequest};
use crate::api::dtos::responses::{AvailabilityResponse, OtpIssuedResponse};
use crate::domain::models::auth::{Principal, Role};
use crate::domain::models::booking::{Booking, BookingStatus};
use crate::domain::models::otp::OtpType;
use crate::error::AppError;
use std::sync::Arc;
use tracing::{info, warn};

pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    RequireTechnician(principal): RequireTechnician,
    Query(query): Query<BookingStatusQuery>,
) -> Result<impl IntoResponse, AppError> {
    let jobs = state.booking_repo.list_by_technician(&principal.id, query.status).await?;
    Ok(Json(jobs))
}

pub async fn accept_job(
    State(state): State<Arc<AppState>>,
    RequireTechnician(principal): RequireTechnician,
    Path(booking_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let booking = find_assigned(&state, &principal, &booking_id).await?;
    let updated = state.booking_workflow.transition(booking, BookingStatus::Accepted, Role::Technician).await?;
    Ok(Json(updated))
}

pub async fn cancel_job(
    State(state): State<Arc<AppState>>,
    RequireTechnician(principal): RequireTechnician,
    Path(booking_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let booking = find_assigned(&state, &principal, &booking_id).await?;
    let updated = state.booking_workflow.transition(booking, BookingStatus::Cancelled, Role::Technician).await?;
    Ok(Json(updated))
}

/// Issues a START or COMPLETION code and emails it to the customer, who reads it out
/// to the technician on site.
pub async fn generate_otp(
    State(state): State<Arc<AppState>>,
    RequireTechnician(principal): RequireTechnician,
    Path(booking_id): Path<String>,
    Json(payload): Json<GenerateOtpRequest>,
) -> Result<impl IntoResponse, AppError> {
    let booking = find_assigned(&state, &principal, &booking_id).await?;

    let customer = state.user_repo.find_by_id(&booking.user_id).await?
        .ok_or(AppError::NotFound("Customer not found".into()))?;

    let code = state.otp_service.generate(&booking, payload.otp_type).await?;

    let action = match payload.otp_type {
        OtpType::Start => "start",
        OtpType::Completion => "complete",
    };

    let mut context = tera::Context::new();
    context.insert("customer_name", &customer.name);
    context.insert("action", action);
    context.insert("service_name", &booking.service_name);
    context.insert("code", &code);
    context.insert("ttl_minutes", &state.otp_service.ttl_minutes());

    let body = state.templates.render("otp.html", &context)
        .map_err(|e| AppError::InternalWithMsg(format!("Tera render error: {:?}", e)))?;
    let subject = format!("Code to {} your {} booking", action, booking.service_name);

    state.email_service.send(&customer.email, &subject, &body).await?;

    Ok(Json(OtpIssuedResponse {
        otp_type: payload.otp_type,
        sent_to: customer.email,
        expires_in_minutes: state.otp_service.ttl_minutes(),
    }))
}

pub async fn verify_otp(
    State(state): State<Arc<AppState>>,
    RequireTechnician(principal): RequireTechnician,
    Path(booking_id): Path<String>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<impl IntoResponse, AppError> {
    let booking = find_assigned(&state, &principal, &booking_id).await?;

    state.otp_service.verify(&booking, payload.otp_type, &payload.code).await?;
    info!("{} OTP verified for booking {}", payload.otp_type.as_str(), booking.id);

    let updated = state.booking_workflow
        .transition(booking, payload.otp_type.target_status(), Role::Technician)
        .await?;
    Ok(Json(updated))
}

pub async fn toggle_availability(
    State(state): State<Arc<AppState>>,
    RequireTechnician(principal): RequireTechnician,
) -> Result<impl IntoResponse, AppError> {
    let mut technician = state.technician_repo.find_by_id(&principal.id).await?
        .ok_or(AppError::NotFound("Technician not found".into()))?;

    technician.is_available = !technician.is_available;
    let updated = state.technician_repo.update(&technician).await?;

    info!("Technician {} availability set to {}", updated.id, updated.is_available);
    Ok(Json(AvailabilityResponse { is_available: updated.is_available }))
}

pub async fn my_stats(
    State(state): State<Arc<AppState>>,
    RequireTechnician(principal): RequireTechnician,
) -> Result<impl IntoResponse, AppError> {
    let stats = state.technician_repo.stats(&principal.id).await?;
    Ok(Json(stats))
}

pub async fn my_ratings(
    State(state): State<Arc<AppState>>,
    RequireTechnician(principal): RequireTechnician,
) -> Result<impl IntoResponse, AppError> {
    let ratings = state.rating_repo.list_by_technician(&principal.id).await?;
    Ok(Json(ratings))
}

/// Loads a booking assigned to the calling technician, whose account must still be active.
async fn find_assigned(state: &AppState, principal: &Principal, booking_id: &str) -> Result<Booking, AppError> {
    let technician = state.technician_repo.find_by_id(&principal.id).await?
        .ok_or(AppError::Unauthorized)?;
    if !technician.is_active {
        warn!("Deactivated technician {} tried to act on booking {}", technician.id, booking_id);
        return Err(AppError::Forbidden("Account deactivated".into()));
    }

    let booking = state.booking_repo.find_by_id(booking_id).await?
        .ok_or(AppError::NotFound("Booking not found".into()))?;

    if !booking.is_assigned_to(&principal.id) {
        warn!("Technician {} is not assigned to booking {}", principal.id, booking.id);
        return Err(AppError::Forbidden("Booking is not assigned to you".into()));
    }
    Ok(booking)
}
