//! Back-office endpoints. Every handler requires an admin principal.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use crate::state::AppState;
use crate::api::extractors::auth::RequireAdmin;
use crate::api::dtos::requests::{
    AssignTechnicianRequest, CreateServiceRequest, CreateTechnicianRequest, UpdateServiceRequest,
    UpdateStatusRequest, UpdateTechnicianRequest,
};
use crate::domain::models::auth::Role;
use crate::domain::models::booking::BookingFilter;
use crate::domain::models::service::Service;
use crate::domain::models::technician::Technician;
use crate::domain::services::auth_service::{hash_password, normalize_email, validate_password};
use crate::domain::services::csv_export::bookings_to_csv;
use crate::error::AppError;
use std::sync::Arc;
use chrono::Utc;
use serde_json::json;
use sqlx::types::Json as SqlJson;
use tracing::{info, warn};
use uuid::Uuid;

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
) -> Result<impl IntoResponse, AppError> {
    let stats = state.analytics_repo.dashboard().await?;
    Ok(Json(stats))
}

// --- Bookings ---

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Query(filter): Query<BookingFilter>,
) -> Result<impl IntoResponse, AppError> {
    let bookings = state.booking_repo.list_details(&filter).await?;
    Ok(Json(bookings))
}

pub async fn export_bookings(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
    Query(filter): Query<BookingFilter>,
) -> Result<impl IntoResponse, AppError> {
    let bookings = state.booking_repo.list_details(&filter).await?;
    let csv = bookings_to_csv(&bookings);

    info!("Admin {} exported {} bookings", admin.id, bookings.len());

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"bookings.csv\""),
        ],
        csv,
    ))
}

pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Path(booking_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let details = state.booking_repo.find_details(&booking_id).await?
        .ok_or(AppError::NotFound("Booking not found".into()))?;
    Ok(Json(details))
}

pub async fn update_booking_status(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Path(booking_id): Path<String>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let booking = state.booking_repo.find_by_id(&booking_id).await?
        .ok_or(AppError::NotFound("Booking not found".into()))?;

    let updated = state.booking_workflow.transition(booking, payload.status, Role::Admin).await?;
    Ok(Json(updated))
}

pub async fn assign_technician(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Path(booking_id): Path<String>,
    Json(payload): Json<AssignTechnicianRequest>,
) -> Result<impl IntoResponse, AppError> {
    let booking = state.booking_repo.find_by_id(&booking_id).await?
        .ok_or(AppError::NotFound("Booking not found".into()))?;
    let technician = state.technician_repo.find_by_id(&payload.technician_id).await?
        .ok_or(AppError::NotFound("Technician not found".into()))?;

    let updated = state.booking_workflow.assign(booking, &technician).await?;
    Ok(Json(updated))
}

pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
    Path(booking_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.booking_repo.delete(&booking_id).await?;
    info!("Booking {} deleted by admin {}", booking_id, admin.id);
    Ok(StatusCode::NO_CONTENT)
}

// --- Users ---

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
) -> Result<impl IntoResponse, AppError> {
    let users = state.user_repo.list().await?;
    Ok(Json(users))
}

pub async fn toggle_user_active(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let mut user = state.user_repo.find_by_id(&user_id).await?
        .ok_or(AppError::NotFound("User not found".into()))?;

    user.is_active = !user.is_active;
    let updated = state.user_repo.update(&user).await?;

    if !updated.is_active {
        state.auth_service.revoke_all(&updated.id).await?;
    }

    info!("User {} active = {}", updated.id, updated.is_active);
    Ok(Json(updated))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if state.user_repo.find_by_id(&user_id).await?.is_none() {
        return Err(AppError::NotFound("User not found".into()));
    }
    if state.booking_repo.count_by_user(&user_id).await? > 0 {
        warn!("Refused to delete user {} with bookings", user_id);
        return Err(AppError::Conflict("User has bookings; deactivate the account instead".into()));
    }

    state.auth_service.revoke_all(&user_id).await?;
    state.user_repo.delete(&user_id).await?;

    info!("User deleted: {}", user_id);
    Ok(StatusCode::NO_CONTENT)
}

// --- Technicians ---

pub async fn list_technicians(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
) -> Result<impl IntoResponse, AppError> {
    let technicians = state.technician_repo.list_with_stats().await?;
    Ok(Json(technicians))
}

pub async fn create_technician(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Json(payload): Json<CreateTechnicianRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = normalize_email(&payload.email)?;
    validate_password(&payload.password)?;

    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::Validation("Name is required".into()));
    }
    if state.technician_repo.find_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("A technician with this email already exists".into()));
    }

    let technician = Technician::new(
        name,
        email,
        payload.phone.trim().to_string(),
        clean_specialties(payload.specialties),
        hash_password(&payload.password)?,
    );
    let created = state.technician_repo.create(&technician).await?;

    info!("Technician created: {}", created.id);
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_technician(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Path(technician_id): Path<String>,
    Json(payload): Json<UpdateTechnicianRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut technician = state.technician_repo.find_by_id(&technician_id).await?
        .ok_or(AppError::NotFound("Technician not found".into()))?;

    if let Some(name) = payload.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::Validation("Name cannot be empty".into()));
        }
        technician.name = name;
    }
    if let Some(phone) = payload.phone { technician.phone = phone.trim().to_string(); }
    if let Some(specialties) = payload.specialties {
        technician.specialties = SqlJson(clean_specialties(specialties));
    }
    if let Some(password) = payload.password {
        validate_password(&password)?;
        technician.password_hash = hash_password(&password)?;
    }

    let updated = state.technician_repo.update(&technician).await?;
    info!("Technician updated: {}", updated.id);
    Ok(Json(updated))
}

pub async fn toggle_technician_active(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Path(technician_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let mut technician = state.technician_repo.find_by_id(&technician_id).await?
        .ok_or(AppError::NotFound("Technician not found".into()))?;

    technician.is_active = !technician.is_active;
    let updated = state.technician_repo.update(&technician).await?;

    if !updated.is_active {
        state.auth_service.revoke_all(&updated.id).await?;
    }

    info!("Technician {} active = {}", updated.id, updated.is_active);
    Ok(Json(updated))
}

pub async fn delete_technician(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Path(technician_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if state.technician_repo.find_by_id(&technician_id).await?.is_none() {
        return Err(AppError::NotFound("Technician not found".into()));
    }
    if state.booking_repo.count_active_by_technician(&technician_id).await? > 0 {
        warn!("Refused to delete technician {} with active bookings", technician_id);
        return Err(AppError::Conflict("Technician has active bookings".into()));
    }

    state.auth_service.revoke_all(&technician_id).await?;
    state.technician_repo.delete(&technician_id).await?;

    info!("Technician deleted: {}", technician_id);
    Ok(StatusCode::NO_CONTENT)
}

fn clean_specialties(specialties: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for s in specialties.into_iter().map(|s| s.trim().to_string()) {
        if !s.is_empty() && !out.contains(&s) {
            out.push(s);
        }
    }
    out
}

// --- Services ---

pub async fn list_all_services(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
) -> Result<impl IntoResponse, AppError> {
    let services = state.service_repo.list(false, None).await?;
    Ok(Json(services))
}

pub async fn create_service(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Json(payload): Json<CreateServiceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = payload.name.trim().to_string();
    let category = payload.category.trim().to_string();
    if name.is_empty() || category.is_empty() {
        return Err(AppError::Validation("Name and category are required".into()));
    }
    validate_price(payload.price)?;

    let service = Service::new(name, payload.description.trim().to_string(), category, payload.price);
    let created = state.service_repo.create(&service).await?;

    info!("Service created: {}", created.id);
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_service(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Path(service_id): Path<String>,
    Json(payload): Json<UpdateServiceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut service = find_service(&state, &service_id).await?;

    if let Some(name) = payload.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::Validation("Name cannot be empty".into()));
        }
        service.name = name;
    }
    if let Some(description) = payload.description { service.description = description.trim().to_string(); }
    if let Some(category) = payload.category {
        let category = category.trim().to_string();
        if category.is_empty() {
            return Err(AppError::Validation("Category cannot be empty".into()));
        }
        service.category = category;
    }
    if let Some(price) = payload.price {
        validate_price(price)?;
        service.price = price;
    }
    service.updated_at = Utc::now();

    let updated = state.service_repo.update(&service).await?;
    info!("Service updated: {}", updated.id);
    Ok(Json(updated))
}

pub async fn toggle_service_active(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Path(service_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let mut service = find_service(&state, &service_id).await?;

    service.is_active = !service.is_active;
    service.updated_at = Utc::now();
    let updated = state.service_repo.update(&service).await?;

    info!("Service {} active = {}", updated.id, updated.is_active);
    Ok(Json(updated))
}

pub async fn delete_service(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Path(service_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let service = find_service(&state, &service_id).await?;

    if state.booking_repo.count_active_by_service(&service.id).await? > 0 {
        warn!("Refused to delete service {} with active bookings", service.id);
        return Err(AppError::Conflict("Service is referenced by active bookings".into()));
    }

    state.service_repo.delete(&service.id).await?;
    if let Some(image_url) = &service.image_url {
        remove_upload(&state, image_url).await;
    }

    info!("Service deleted: {}", service.id);
    Ok(StatusCode::NO_CONTENT)
}

/// Stores the multipart `image` field under `UPLOAD_DIR` and points the service at it.
pub async fn upload_service_image(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Path(service_id): Path<String>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut service = find_service(&state, &service_id).await?;

    let mut stored = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.to_string()))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        let Some(extension) = image_extension(&content_type) else {
            return Err(AppError::Validation("Only image uploads are allowed".into()));
        };

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(e.to_string()))?;
        if data.is_empty() {
            return Err(AppError::Validation("Uploaded image is empty".into()));
        }

        let filename = format!("{}-{}.{}", service.id, Uuid::new_v4(), extension);
        let path = std::path::Path::new(&state.config.upload_dir).join(&filename);
        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| AppError::InternalWithMsg(format!("Failed to store upload {:?}: {}", path, e)))?;

        stored = Some(filename);
        break;
    }

    let filename = stored.ok_or(AppError::Validation("Missing 'image' field".into()))?;

    if let Some(previous) = service.image_url.replace(format!("/uploads/{}", filename)) {
        remove_upload(&state, &previous).await;
    }
    service.updated_at = Utc::now();
    let updated = state.service_repo.update(&service).await?;

    info!("Image uploaded for service {}: {}", updated.id, filename);
    Ok(Json(json!({ "image_url": updated.image_url, "service": updated })))
}

async fn find_service(state: &AppState, service_id: &str) -> Result<Service, AppError> {
    state.service_repo.find_by_id(service_id).await?
        .ok_or(AppError::NotFound("Service not found".into()))
}

fn validate_price(price: f64) -> Result<(), AppError> {
    if !price.is_finite() || price < 0.0 {
        return Err(AppError::Validation("Price must be a non-negative number".into()));
    }
    Ok(())
}

fn image_extension(content_type: &str) -> Option<&'static str> {
    let subtype = content_type.strip_prefix("image/")?;
    match subtype.split(';').next().unwrap_or_default().trim() {
        "png" => Some("png"),
        "jpeg" | "jpg" => Some("jpg"),
        "gif" => Some("gif"),
        "webp" => Some("webp"),
        // SVG can carry script and would run same-origin under /uploads.
        "" | "svg+xml" => None,
        _ => Some("img"),
    }
}

async fn remove_upload(state: &AppState, image_url: &str) {
    let Some(filename) = image_url.strip_prefix("/uploads/") else { return };
    let path = std::path::Path::new(&state.config.upload_dir).join(filename);
    if let Err(e) = tokio::fs::remove_file(&path).await {
        warn!("Failed to remove old upload {:?}: {}", path, e);
    }
}
