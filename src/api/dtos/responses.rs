use serde::Serialize;
use crate::domain::models::{admin::Admin, otp::OtpType, technician::Technician, user::User};

/// Profile of the caller, tagged with the role it belongs to.
#[derive(Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ProfileResponse {
    User(User),
    Technician(Technician),
    Admin(Admin),
}

#[derive(Serialize)]
pub struct OtpIssuedResponse {
    #[serde(rename = "type")]
    pub otp_type: OtpType,
    pub sent_to: String,
    pub expires_in_minutes: i64,
}

#[derive(Serialize)]
pub struct AvailabilityResponse {
    pub is_available: bool,
}

#[derive(Serialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}
