use crate::domain::models::{
    admin::Admin,
    analytics::DashboardStats,
    auth::RefreshTokenRecord,
    booking::{Booking, BookingDetails, BookingFilter, BookingStatus},
    job::Job,
    notification::Notification,
    otp::{Otp, OtpType},
    rating::Rating,
    service::Service,
    technician::{Technician, TechnicianStats, TechnicianWithStats},
    user::User,
    auth::Role,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::NaiveDate;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> Result<User, AppError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError>;
    async fn list(&self) -> Result<Vec<User>, AppError>;
    async fn update(&self, user: &User) -> Result<User, AppError>;
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait TechnicianRepository: Send + Sync {
    async fn create(&self, technician: &Technician) -> Result<Technician, AppError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Technician>, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Technician>, AppError>;
    async fn list_with_stats(&self) -> Result<Vec<TechnicianWithStats>, AppError>;
    async fn stats(&self, id: &str) -> Result<TechnicianStats, AppError>;
    async fn update(&self, technician: &Technician) -> Result<Technician, AppError>;
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait AdminRepository: Send + Sync {
    async fn create(&self, admin: &Admin) -> Result<Admin, AppError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Admin>, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Admin>, AppError>;
}

#[async_trait]
pub trait ServiceRepository: Send + Sync {
    async fn create(&self, service: &Service) -> Result<Service, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Service>, AppError>;
    async fn list(&self, active_only: bool, category: Option<&str>) -> Result<Vec<Service>, AppError>;
    async fn update(&self, service: &Service) -> Result<Service, AppError>;
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Inserts the booking together with its notification jobs.
    async fn create(&self, booking: &Booking, jobs: Vec<Job>) -> Result<Booking, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, AppError>;
    async fn find_details(&self, id: &str) -> Result<Option<BookingDetails>, AppError>;
    async fn list_by_user(&self, user_id: &str, status: Option<BookingStatus>) -> Result<Vec<Booking>, AppError>;
    async fn list_by_technician(&self, technician_id: &str, status: Option<BookingStatus>) -> Result<Vec<BookingDetails>, AppError>;
    async fn list_details(&self, filter: &BookingFilter) -> Result<Vec<BookingDetails>, AppError>;
    /// Persists status/technician of `booking`, optionally flips the assigned technician's
    /// availability and enqueues `jobs`, all in one transaction.
    ///
    /// The write only applies while the stored status is still `expected`; otherwise
    /// `Conflict` is returned and nothing is written.
    async fn save_transition(&self, booking: &Booking, expected: BookingStatus, technician_available: Option<bool>, jobs: Vec<Job>) -> Result<Booking, AppError>;
    /// Another booking holding `technician_id` at the same date and time, if any.
    async fn find_technician_conflict(&self, technician_id: &str, date: NaiveDate, time: &str, exclude_booking_id: &str) -> Result<Option<Booking>, AppError>;
    async fn rate(&self, booking: &Booking, rating: &Rating) -> Result<Booking, AppError>;
    /// Deletes the booking, releasing its technician when the job was holding them.
    async fn delete(&self, id: &str) -> Result<(), AppError>;
    async fn count_by_user(&self, user_id: &str) -> Result<i64, AppError>;
    async fn count_active_by_technician(&self, technician_id: &str) -> Result<i64, AppError>;
    async fn count_active_by_service(&self, service_id: &str) -> Result<i64, AppError>;
}

#[async_trait]
pub trait OtpRepository: Send + Sync {
    /// Stores `otp`, discarding any earlier code for the same booking and type.
    async fn replace(&self, otp: &Otp) -> Result<Otp, AppError>;
    async fn find(&self, booking_id: &str, otp_type: OtpType) -> Result<Option<Otp>, AppError>;
    async fn increment_attempts(&self, id: &str) -> Result<i32, AppError>;
    /// Deletes the code only if it still exists with `code_hash`. `false` means another
    /// request used or replaced it first.
    async fn consume(&self, id: &str, code_hash: &str) -> Result<bool, AppError>;
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait RatingRepository: Send + Sync {
    async fn list_by_technician(&self, technician_id: &str) -> Result<Vec<Rating>, AppError>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: &Notification) -> Result<Notification, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Notification>, AppError>;
    async fn list_for(&self, role: Role, subject_id: &str, unread_only: bool) -> Result<Vec<Notification>, AppError>;
    async fn mark_read(&self, id: &str) -> Result<(), AppError>;
    async fn mark_all_read(&self, role: Role, subject_id: &str) -> Result<u64, AppError>;
}

#[async_trait]
pub trait AuthRepository: Send + Sync {
    async fn create_refresh_token(&self, record: &RefreshTokenRecord) -> Result<(), AppError>;
    async fn find_refresh_token(&self, token_hash: &str) -> Result<Option<RefreshTokenRecord>, AppError>;
    async fn delete_refresh_token(&self, token_hash: &str) -> Result<(), AppError>;
    /// Flags an unused token as rotated. `false` when it was already used.
    async fn mark_refresh_token_used(&self, token_hash: &str) -> Result<bool, AppError>;
    async fn delete_refresh_family(&self, family_id: &str) -> Result<(), AppError>;
    async fn delete_refresh_tokens_for(&self, subject_id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn find_pending(&self, limit: i32) -> Result<Vec<Job>, AppError>;
    async fn update_status(&self, id: &str, status: &str, error_message: Option<String>) -> Result<(), AppError>;
}

#[async_trait]
pub trait AnalyticsRepository: Send + Sync {
    async fn dashboard(&self) -> Result<DashboardStats, AppError>;
}

#[async_trait]
pub trait EmailService: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, html_body: &str) -> Result<(), AppError>;
}
