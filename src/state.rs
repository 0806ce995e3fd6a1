use std::sync::Arc;
use crate::domain::ports::{
    AdminRepository, AnalyticsRepository, AuthRepository, BookingRepository, EmailService,
    JobRepository, NotificationRepository, RatingRepository, ServiceRepository,
    TechnicianRepository, UserRepository,
};
use crate::domain::services::{
    auth_service::AuthService, booking_workflow::BookingWorkflow,
    notification_service::NotificationService, otp_service::OtpService,
};
use crate::config::Config;
use tera::Tera;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub user_repo: Arc<dyn UserRepository>,
    pub technician_repo: Arc<dyn TechnicianRepository>,
    pub admin_repo: Arc<dyn AdminRepository>,
    pub service_repo: Arc<dyn ServiceRepository>,
    pub booking_repo: Arc<dyn BookingRepository>,
    pub rating_repo: Arc<dyn RatingRepository>,
    pub notification_repo: Arc<dyn NotificationRepository>,
    pub auth_repo: Arc<dyn AuthRepository>,
    pub job_repo: Arc<dyn JobRepository>,
    pub analytics_repo: Arc<dyn AnalyticsRepository>,
    pub auth_service: Arc<AuthService>,
    pub otp_service: Arc<OtpService>,
    pub notification_service: Arc<NotificationService>,
    pub booking_workflow: Arc<BookingWorkflow>,
    pub email_service: Arc<dyn EmailService>,
    pub templates: Arc<Tera>,
}
