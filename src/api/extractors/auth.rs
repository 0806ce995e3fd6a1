use axum::{
    extract::{FromRequestParts, FromRef},
    http::request::Parts,
};
use crate::state::AppState;
use crate::error::AppError;
use crate::domain::models::auth::{Claims, Principal, Role};
use crate::domain::services::auth_service::ACCESS_TOKEN_AUDIENCE;
use std::sync::Arc;
use tower_cookies::Cookies;
use jsonwebtoken::{decode, DecodingKey, Validation, Algorithm};
use tracing::{warn, Span};

/// Any authenticated caller, read from the `access_token` cookie.
///
/// Non-safe methods must carry the CSRF token issued at login in `X-CSRF-Token`.
pub struct AuthUser(pub Principal);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let cookies = parts.extensions.get::<Cookies>()
            .ok_or(AppError::Internal)?;

        let access_token = cookies.get("access_token")
            .ok_or(AppError::Unauthorized)?
            .value()
            .to_string();

        let app_state = <Arc<AppState> as FromRef<S>>::from_ref(state);

        let decoding_key = DecodingKey::from_ed_pem(app_state.config.jwt_public_key.as_bytes())
            .map_err(|_| AppError::InternalWithMsg("Invalid JWT public key".into()))?;

        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.set_audience(&[ACCESS_TOKEN_AUDIENCE]);

        let token_data = decode::<Claims>(&access_token, &decoding_key, &validation)
            .map_err(|_| AppError::Unauthorized)?;

        let method = &parts.method;
        if method != "GET" && method != "HEAD" && method != "OPTIONS" {
            let csrf_header_val = parts.headers.get("X-CSRF-Token")
                .ok_or(AppError::Forbidden("Missing CSRF token".into()))?
                .to_str()
                .map_err(|_| AppError::Forbidden("Invalid CSRF token".into()))?;

            if csrf_header_val != token_data.claims.csrf_token {
                warn!("CSRF token mismatch for {}", token_data.claims.sub);
                return Err(AppError::Forbidden("Invalid CSRF token".into()));
            }
        }

        let claims = token_data.claims;
        let principal = Principal {
            id: claims.sub,
            role: claims.role,
            name: claims.name,
            email: claims.email,
        };

        Span::current().record("user_id", &principal.id);
        Span::current().record("role", principal.role.as_str());

        Ok(AuthUser(principal))
    }
}

async fn require_role<S>(parts: &mut Parts, state: &S, role: Role) -> Result<Principal, AppError>
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    let AuthUser(principal) = AuthUser::from_request_parts(parts, state).await?;
    if principal.role != role {
        warn!("{} {} tried to reach a {} route", principal.role, principal.id, role);
        return Err(AppError::Forbidden(format!("{} access required", role)));
    }
    Ok(principal)
}

pub struct RequireAdmin(pub Principal);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        require_role(parts, state, Role::Admin).await.map(RequireAdmin)
    }
}

pub struct RequireTechnician(pub Principal);

impl<S> FromRequestParts<S> for RequireTechnician
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        require_role(parts, state, Role::Technician).await.map(RequireTechnician)
    }
}

/// A signed-in customer.
pub struct RequireCustomer(pub Principal);

impl<S> FromRequestParts<S> for RequireCustomer
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        require_role(parts, state, Role::User).await.map(RequireCustomer)
    }
}
