pub mod auth_service;
pub mod booking_workflow;
pub mod csv_export;
pub mod notification_service;
pub mod otp_service;
