use axum::{
    body::Body,
    extract::Request,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use crate::state::AppState;
use crate::api::handlers::{health, auth, profile, service, booking, technician, admin, notification};
use tower_http::{
    services::ServeDir,
    trace::TraceLayer,
    classify::ServerErrorsFailureClass,
};
use tower_cookies::CookieManagerLayer;
use tracing::{info_span, Span, error, info};
use uuid::Uuid;

pub fn create_router(state: Arc<AppState>) -> Router {
    let uploads = ServeDir::new(&state.config.upload_dir);

    Router::new()
        .route("/health", get(health::health_check))

        // Auth
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/technician/login", post(auth::technician_login))
        .route("/api/v1/auth/admin/login", post(auth::admin_login))
        .route("/api/v1/auth/refresh", post(auth::refresh))
        .route("/api/v1/auth/logout", post(auth::logout))
        .route("/api/v1/auth/me", get(profile::me).put(profile::update_profile))

        // Public Catalogue
        .route("/api/v1/services", get(service::list_services))
        .route("/api/v1/services/{service_id}", get(service::get_service))

        // Customer Bookings
        .route("/api/v1/bookings", post(booking::create_booking).get(booking::list_my_bookings))
        .route("/api/v1/bookings/{booking_id}", get(booking::get_my_booking))
        .route("/api/v1/bookings/{booking_id}/cancel", put(booking::cancel_booking))
        .route("/api/v1/bookings/{booking_id}/rating", post(booking::rate_booking))

        // Technician
        .route("/api/v1/technician/jobs", get(technician::list_jobs))
        .route("/api/v1/technician/jobs/{booking_id}/accept", put(technician::accept_job))
        .route("/api/v1/technician/jobs/{booking_id}/cancel", put(technician::cancel_job))
        .route("/api/v1/technician/jobs/{booking_id}/otp", post(technician::generate_otp))
        .route("/api/v1/technician/jobs/{booking_id}/otp/verify", post(technician::verify_otp))
        .route("/api/v1/technician/availability", put(technician::toggle_availability))
        .route("/api/v1/technician/stats", get(technician::my_stats))
        .route("/api/v1/technician/ratings", get(technician::my_ratings))

        // Notifications
        .route("/api/v1/notifications", get(notification::list_notifications))
        .route("/api/v1/notifications/read-all", put(notification::mark_all_read))
        .route("/api/v1/notifications/stream", get(notification::stream))
        .route("/api/v1/notifications/{notification_id}/read", put(notification::mark_read))

        // Admin
        .route("/api/v1/admin/dashboard", get(admin::dashboard))
        .route("/api/v1/admin/bookings", get(admin::list_bookings))
        .route("/api/v1/admin/bookings/export", get(admin::export_bookings))
        .route("/api/v1/admin/bookings/{booking_id}", get(admin::get_booking).delete(admin::delete_booking))
        .route("/api/v1/admin/bookings/{booking_id}/status", put(admin::update_booking_status))
        .route("/api/v1/admin/bookings/{booking_id}/assign", put(admin::assign_technician))
        .route("/api/v1/admin/users", get(admin::list_users))
        .route("/api/v1/admin/users/{user_id}", delete(admin::delete_user))
        .route("/api/v1/admin/users/{user_id}/toggle-active", put(admin::toggle_user_active))
        .route("/api/v1/admin/technicians", get(admin::list_technicians).post(admin::create_technician))
        .route("/api/v1/admin/technicians/{technician_id}", put(admin::update_technician).delete(admin::delete_technician))
        .route("/api/v1/admin/technicians/{technician_id}/toggle-active", put(admin::toggle_technician_active))
        .route("/api/v1/admin/services", get(admin::list_all_services).post(admin::create_service))
        .route("/api/v1/admin/services/{service_id}", put(admin::update_service).delete(admin::delete_service))
        .route("/api/v1/admin/services/{service_id}/toggle-active", put(admin::toggle_service_active))
        .route("/api/v1/admin/services/{service_id}/image", post(admin::upload_service_image))

        .nest_service("/uploads", uploads)

        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = Uuid::new_v4().to_string();
                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        version = ?request.version(),
                        user_id = tracing::field::Empty,
                        role = tracing::field::Empty,
                    )
                })
                .on_request(|request: &Request<Body>, _span: &Span| {
                    info!("started processing request: {} {}", request.method(), request.uri().path());
                })
                .on_response(|response: &axum::http::Response<Body>, latency: Duration, _span: &Span| {
                    info!(
                        status = response.status().as_u16(),
                        latency_ms = latency.as_millis(),
                        "finished processing request"
                    );
                })
                .on_failure(|error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                    error!("request failed: {:?}", error);
                })
        )
        .layer(CookieManagerLayer::new())
        .with_state(state)
}
