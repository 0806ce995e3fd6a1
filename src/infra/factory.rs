use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use sqlx::sqlite::{SqlitePoolOptions, SqliteJournalMode, SqliteConnectOptions};
use sqlx::{SqlitePool, ConnectOptions};
use tracing::{info, warn};
use tracing::log::LevelFilter;
use tera::Tera;

use crate::config::Config;
use crate::state::AppState;
use crate::domain::models::admin::Admin;
use crate::domain::ports::EmailService;
use crate::domain::services::{
    auth_service::{hash_password, normalize_email, AuthService},
    booking_workflow::BookingWorkflow,
    notification_service::NotificationService,
    otp_service::OtpService,
};
use crate::infra::email::http_email_service::HttpEmailService;
use crate::infra::repositories::{
    sqlite_admin_repo::SqliteAdminRepo, sqlite_analytics_repo::SqliteAnalyticsRepo,
    sqlite_auth_repo::SqliteAuthRepo, sqlite_booking_repo::SqliteBookingRepo,
    sqlite_job_repo::SqliteJobRepo, sqlite_notification_repo::SqliteNotificationRepo,
    sqlite_otp_repo::SqliteOtpRepo, sqlite_rating_repo::SqliteRatingRepo,
    sqlite_service_repo::SqliteServiceRepo, sqlite_technician_repo::SqliteTechnicianRepo,
    sqlite_user_repo::SqliteUserRepo,
};

pub async fn bootstrap_state(config: &Config) -> AppState {
    info!("Initializing SQLite connection with WAL Mode...");

    let opts = SqliteConnectOptions::from_str(&config.database_url)
        .expect("Invalid SQLite connection string")
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .log_statements(LevelFilter::Debug)
        .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(opts)
        .await
        .expect("Failed to connect to SQLite");

    run_migrations(&pool).await;

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .expect("Failed to create upload directory");

    let email_service = Arc::new(HttpEmailService::new(
        config.mail_service_url.clone(),
        config.mail_service_token.clone(),
    ));

    let state = build_state(config.clone(), pool, email_service, Arc::new(load_templates()));

    if let Err(e) = seed_admin(&state).await {
        warn!("Admin bootstrap failed: {:?}", e);
    }

    state
}

/// Wires the SQLite repositories and domain services around an open pool.
pub fn build_state(config: Config, pool: SqlitePool, email_service: Arc<dyn EmailService>, templates: Arc<Tera>) -> AppState {
    let auth_repo = Arc::new(SqliteAuthRepo::new(pool.clone()));
    let auth_service = Arc::new(AuthService::new(auth_repo.clone(), config.clone()));

    let booking_repo = Arc::new(SqliteBookingRepo::new(pool.clone()));
    let notification_repo = Arc::new(SqliteNotificationRepo::new(pool.clone()));
    let notification_service = Arc::new(NotificationService::new(notification_repo.clone()));
    let booking_workflow = Arc::new(BookingWorkflow::new(booking_repo.clone(), notification_service.clone()));
    let otp_service = Arc::new(OtpService::new(
        Arc::new(SqliteOtpRepo::new(pool.clone())),
        config.otp_ttl_minutes,
        config.otp_max_attempts,
    ));

    AppState {
        config,
        user_repo: Arc::new(SqliteUserRepo::new(pool.clone())),
        technician_repo: Arc::new(SqliteTechnicianRepo::new(pool.clone())),
        admin_repo: Arc::new(SqliteAdminRepo::new(pool.clone())),
        service_repo: Arc::new(SqliteServiceRepo::new(pool.clone())),
        booking_repo,
        rating_repo: Arc::new(SqliteRatingRepo::new(pool.clone())),
        notification_repo,
        auth_repo,
        job_repo: Arc::new(SqliteJobRepo::new(pool.clone())),
        analytics_repo: Arc::new(SqliteAnalyticsRepo::new(pool)),
        auth_service,
        otp_service,
        notification_service,
        booking_workflow,
        email_service,
        templates,
    }
}

pub fn load_templates() -> Tera {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        ("booking_created.html", include_str!("../templates/booking_created.html")),
        ("status_changed.html", include_str!("../templates/status_changed.html")),
        ("technician_assigned.html", include_str!("../templates/technician_assigned.html")),
        ("otp.html", include_str!("../templates/otp.html")),
    ])
        .expect("Failed to load email templates");
    tera
}

/// Creates the configured admin account on first start.
pub async fn seed_admin(state: &AppState) -> Result<(), crate::error::AppError> {
    let (Some(email), Some(password)) = (&state.config.admin_email, &state.config.admin_password) else {
        return Ok(());
    };
    let email = normalize_email(email)?;

    if state.admin_repo.find_by_email(&email).await?.is_some() {
        return Ok(());
    }

    let admin = Admin::new("Administrator".to_string(), email, hash_password(password)?);
    let created = state.admin_repo.create(&admin).await?;
    info!("Bootstrapped admin account {}", created.email);
    Ok(())
}

async fn run_migrations(pool: &SqlitePool) {
    sqlx::migrate!("./migrations/sqlite")
        .run(pool)
        .await
        .expect("Failed to run SQLite migrations");
}
