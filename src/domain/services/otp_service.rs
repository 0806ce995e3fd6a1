use std::sync::Arc;
use rand::Rng;
use tracing::{info, warn};

use crate::domain::{
    models::{booking::Booking, otp::{Otp, OtpType}},
    ports::OtpRepository,
};
use crate::domain::services::auth_service::hash_token;
use crate::error::AppError;

pub struct OtpService {
    repo: Arc<dyn OtpRepository>,
    ttl_minutes: i64,
    max_attempts: i32,
}

impl OtpService {
    pub fn new(repo: Arc<dyn OtpRepository>, ttl_minutes: i64, max_attempts: i32) -> Self {
        Self { repo, ttl_minutes, max_attempts }
    }

    pub fn ttl_minutes(&self) -> i64 {
        self.ttl_minutes
    }

    /// Issues a fresh six-digit code for `booking`, replacing any earlier code of the same type.
    /// Returns the plain code; only its hash is stored.
    pub async fn generate(&self, booking: &Booking, otp_type: OtpType) -> Result<String, AppError> {
        if booking.status != otp_type.required_status() {
            return Err(AppError::Validation(format!(
                "{} OTP requires booking status {}, current status is {}",
                otp_type.as_str(), otp_type.required_status(), booking.status
            )));
        }

        let code = generate_code();
        let otp = Otp::new(booking.id.clone(), otp_type, hash_token(&code), self.ttl_minutes);
        self.repo.replace(&otp).await?;

        info!("Generated {} OTP for booking {}", otp_type.as_str(), booking.id);
        Ok(code)
    }

    /// Checks `code` against the stored one. A match consumes the code.
    pub async fn verify(&self, booking: &Booking, otp_type: OtpType, code: &str) -> Result<(), AppError> {
        if booking.status != otp_type.required_status() {
            return Err(AppError::Validation(format!(
                "Booking must be {} to verify a {} OTP",
                otp_type.required_status(), otp_type.as_str()
            )));
        }

        let otp = self.repo.find(&booking.id, otp_type).await?
            .ok_or(AppError::Validation("OTP not found or already used. Generate a new one.".into()))?;

        if otp.is_expired() {
            self.repo.delete(&otp.id).await?;
            return Err(AppError::Validation("OTP has expired. Generate a new one.".into()));
        }

        if otp.code_hash != hash_token(code.trim()) {
            let attempts = self.repo.increment_attempts(&otp.id).await?;
            warn!("Invalid {} OTP for booking {} (attempt {})", otp_type.as_str(), booking.id, attempts);
            if attempts >= self.max_attempts {
                self.repo.delete(&otp.id).await?;
                return Err(AppError::TooManyAttempts("Too many invalid attempts. Generate a new OTP.".into()));
            }
            return Err(AppError::Validation("Invalid OTP".into()));
        }

        if !self.repo.consume(&otp.id, &otp.code_hash).await? {
            warn!("{} OTP for booking {} was already used", otp_type.as_str(), booking.id);
            return Err(AppError::Validation("OTP not found or already used. Generate a new one.".into()));
        }
        Ok(())
    }
}

fn generate_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
