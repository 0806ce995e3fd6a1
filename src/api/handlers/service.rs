use axum::{extract::{State, Path, Query}, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::dtos::requests::ServiceQuery;
use crate::error::AppError;
use std::sync::Arc;

/// Active catalogue entries, optionally narrowed to one category.
pub async fn list_services(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ServiceQuery>,
) -> Result<impl IntoResponse, AppError> {
    let category = query.category.as_deref().map(str::trim).filter(|c| !c.is_empty());
    let services = state.service_repo.list(true, category).await?;
    Ok(Json(services))
}

pub async fn get_service(
    State(state): State<Arc<AppState>>,
    Path(service_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let service = state.service_repo.find_by_id(&service_id).await?
        .filter(|s| s.is_active)
        .ok_or(AppError::NotFound("Service not found".into()))?;
    Ok(Json(service))
}
