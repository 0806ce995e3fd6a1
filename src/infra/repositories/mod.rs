pub mod sqlite_admin_repo;
pub mod sqlite_analytics_repo;
pub mod sqlite_auth_repo;
pub mod sqlite_booking_repo;
pub mod sqlite_job_repo;
pub mod sqlite_notification_repo;
pub mod sqlite_otp_repo;
pub mod sqlite_rating_repo;
pub mod sqlite_service_repo;
pub mod sqlite_technician_repo;
pub mod sqlite_user_repo;
