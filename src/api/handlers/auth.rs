use axum::{extract::State, response::IntoResponse, Json, http::StatusCode};
use crate::state::AppState;
use crate::error::AppError;
use crate::api::dtos::requests::{LoginRequest, RegisterRequest};
use crate::domain::models::auth::{AuthResponse, Principal, RefreshTokenRecord, Role};
use crate::domain::models::user::User;
use crate::domain::services::auth_service::{hash_password, normalize_email, validate_password, verify_password};
use std::sync::Arc;
use tower_cookies::{Cookies, Cookie};
use tower_cookies::cookie::SameSite;
use time::Duration;
use tracing::{info, warn};

pub async fn register(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = normalize_email(&payload.email)?;
    validate_password(&payload.password)?;

    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::Validation("Name is required".into()));
    }

    if state.user_repo.find_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("An account with this email already exists".into()));
    }

    let user = User::new(
        name,
        email,
        payload.phone.trim().to_string(),
        payload.address.map(|a| a.trim().to_string()).filter(|a| !a.is_empty()),
        hash_password(&payload.password)?,
    );
    let user = state.user_repo.create(&user).await?;

    let principal = principal_of_user(&user);
    let (access_jwt, refresh_token, csrf_token) = state.auth_service.login(&principal).await?;
    set_cookies(&cookies, &access_jwt, &refresh_token);

    info!("Customer registered: {}", user.id);

    Ok((StatusCode::CREATED, Json(AuthResponse { csrf_token, user: principal })))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = payload.email.trim().to_lowercase();
    let user = state.user_repo.find_by_email(&email).await?
        .ok_or(AppError::Unauthorized)?;

    verify_password(&payload.password, &user.password_hash)?;
    ensure_active(user.is_active, &user.id)?;

    complete_login(&state, &cookies, principal_of_user(&user)).await
}

pub async fn technician_login(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = payload.email.trim().to_lowercase();
    let technician = state.technician_repo.find_by_email(&email).await?
        .ok_or(AppError::Unauthorized)?;

    verify_password(&payload.password, &technician.password_hash)?;
    ensure_active(technician.is_active, &technician.id)?;

    let principal = Principal {
        id: technician.id,
        role: Role::Technician,
        name: technician.name,
        email: technician.email,
    };
    complete_login(&state, &cookies, principal).await
}

pub async fn admin_login(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = payload.email.trim().to_lowercase();
    let admin = state.admin_repo.find_by_email(&email).await?
        .ok_or(AppError::Unauthorized)?;

    verify_password(&payload.password, &admin.password_hash)?;

    let principal = Principal {
        id: admin.id,
        role: Role::Admin,
        name: admin.name,
        email: admin.email,
    };
    complete_login(&state, &cookies, principal).await
}

pub async fn refresh(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
) -> Result<impl IntoResponse, AppError> {
    let refresh_cookie = cookies.get("refresh_token").ok_or(AppError::Unauthorized)?;
    let record = state.auth_service.find_refresh(refresh_cookie.value()).await?;

    let principal = match current_principal(&state, &record).await {
        Ok(principal) => principal,
        Err(e @ (AppError::Unauthorized | AppError::Forbidden(_))) => {
            state.auth_service.revoke_all(&record.subject_id).await?;
            return Err(e);
        }
        Err(e) => return Err(e),
    };

    let (new_access, new_refresh, new_csrf) = state.auth_service.refresh(record, &principal).await?;

    set_cookies(&cookies, &new_access, &new_refresh);

    info!("Token refreshed for {} {}", principal.role, principal.id);

    Ok(Json(AuthResponse {
        csrf_token: new_csrf,
        user: principal,
    }))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
) -> Result<impl IntoResponse, AppError> {
    if let Some(cookie) = cookies.get("refresh_token") {
        let _ = state.auth_service.logout(cookie.value()).await;
    }

    cookies.remove(Cookie::build(("access_token", "")).path("/").into());
    cookies.remove(Cookie::build(("refresh_token", "")).path("/").into());

    info!("User logged out");

    Ok(StatusCode::OK)
}

async fn complete_login(state: &AppState, cookies: &Cookies, principal: Principal) -> Result<Json<AuthResponse>, AppError> {
    let (access_jwt, refresh_token, csrf_token) = state.auth_service.login(&principal).await?;

    set_cookies(cookies, &access_jwt, &refresh_token);

    info!("{} logged in: {}", principal.role, principal.id);

    Ok(Json(AuthResponse { csrf_token, user: principal }))
}

/// Reloads the account behind a refresh token so renamed or deactivated accounts are picked up.
async fn current_principal(state: &AppState, record: &RefreshTokenRecord) -> Result<Principal, AppError> {
    let id = &record.subject_id;
    match record.role {
        Role::User => {
            let user = state.user_repo.find_by_id(id).await?.ok_or(AppError::Unauthorized)?;
            ensure_active(user.is_active, id)?;
            Ok(principal_of_user(&user))
        }
        Role::Technician => {
            let technician = state.technician_repo.find_by_id(id).await?.ok_or(AppError::Unauthorized)?;
            ensure_active(technician.is_active, id)?;
            Ok(Principal { id: technician.id, role: Role::Technician, name: technician.name, email: technician.email })
        }
        Role::Admin => {
            let admin = state.admin_repo.find_by_id(id).await?.ok_or(AppError::Unauthorized)?;
            Ok(Principal { id: admin.id, role: Role::Admin, name: admin.name, email: admin.email })
        }
    }
}

fn principal_of_user(user: &User) -> Principal {
    Principal {
        id: user.id.clone(),
        role: Role::User,
        name: user.name.clone(),
        email: user.email.clone(),
    }
}

fn ensure_active(is_active: bool, id: &str) -> Result<(), AppError> {
    if !is_active {
        warn!("Rejected deactivated account {}", id);
        return Err(AppError::Forbidden("Account deactivated".into()));
    }
    Ok(())
}

fn set_cookies(cookies: &Cookies, access: &str, refresh: &str) {
    let mut access_c = Cookie::new("access_token", access.to_string());
    access_c.set_http_only(true);
    access_c.set_secure(true);
    access_c.set_same_site(SameSite::Strict);
    access_c.set_path("/");
    access_c.set_max_age(Duration::minutes(15));
    cookies.add(access_c);

    let mut refresh_c = Cookie::new("refresh_token", refresh.to_string());
    refresh_c.set_http_only(true);
    refresh_c.set_secure(true);
    refresh_c.set_same_site(SameSite::Strict);
    refresh_c.set_path("/");
    refresh_c.set_max_age(Duration::days(7));
    cookies.add(refresh_c);
}
