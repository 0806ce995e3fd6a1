use axum::{extract::State, response::IntoResponse, Json};
use crate::state::AppState;
use crate::error::AppError;
use crate::api::extractors::auth::{AuthUser, RequireCustomer};
use crate::api::dtos::requests::UpdateProfileRequest;
use crate::api::dtos::responses::ProfileResponse;
use crate::domain::models::auth::Role;
use std::sync::Arc;
use tracing::info;

pub async fn me(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let not_found = || AppError::NotFound("Account not found".into());

    let profile = match principal.role {
        Role::User => ProfileResponse::User(
            state.user_repo.find_by_id(&principal.id).await?.ok_or_else(not_found)?
        ),
        Role::Technician => ProfileResponse::Technician(
            state.technician_repo.find_by_id(&principal.id).await?.ok_or_else(not_found)?
        ),
        Role::Admin => ProfileResponse::Admin(
            state.admin_repo.find_by_id(&principal.id).await?.ok_or_else(not_found)?
        ),
    };

    Ok(Json(profile))
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    RequireCustomer(principal): RequireCustomer,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut user = state.user_repo.find_by_id(&principal.id).await?
        .ok_or(AppError::NotFound("Account not found".into()))?;

    if let Some(name) = payload.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::Validation("Name cannot be empty".into()));
        }
        user.name = name;
    }
    if let Some(phone) = payload.phone { user.phone = phone.trim().to_string(); }
    if let Some(address) = payload.address {
        let address = address.trim().to_string();
        user.address = if address.is_empty() { None } else { Some(address) };
    }

    let updated = state.user_repo.update(&user).await?;
    info!("Profile updated: {}", updated.id);
    Ok(Json(ProfileResponse::User(updated)))
}
