use std::sync::Arc;
use crate::domain::{
    models::auth::{Claims, Principal, RefreshTokenRecord},
    ports::AuthRepository
};
use crate::error::AppError;
use crate::config::Config;
use argon2::{password_hash::{SaltString, PasswordHash, PasswordHasher, PasswordVerifier}, Argon2};
use jsonwebtoken::{encode, EncodingKey, Header, Algorithm};
use uuid::Uuid;
use chrono::{Utc, Duration};
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use sha2::{Sha256, Digest};
use tracing::warn;

pub const ACCESS_TOKEN_AUDIENCE: &str = "repair-booking-frontend";

pub struct AuthService {
    repo: Arc<dyn AuthRepository>,
    config: Config,
    encoding_key: EncodingKey,
}

impl AuthService {
    pub fn new(repo: Arc<dyn AuthRepository>, config: Config) -> Self {
        let encoding_key = EncodingKey::from_ed_pem(config.jwt_secret_key.as_bytes())
            .expect("Invalid JWT Private Key PEM");

        Self { repo, config, encoding_key }
    }

    pub async fn login(&self, principal: &Principal) -> Result<(String, String, String), AppError> {
        let family_id = Uuid::new_v4().to_string();
        self.issue_token_pair(principal, family_id, 1).await
    }

    /// Looks up a live refresh token. Expired tokens are removed and rejected; a token that
    /// was already rotated revokes its whole family.
    pub async fn find_refresh(&self, raw_refresh_token: &str) -> Result<RefreshTokenRecord, AppError> {
        let token_hash = hash_token(raw_refresh_token);

        let record = self.repo.find_refresh_token(&token_hash).await?
            .ok_or(AppError::Unauthorized)?;

        if record.used_at.is_some() {
            self.revoke_family(&record).await?;
            return Err(AppError::Unauthorized);
        }

        if record.expires_at < Utc::now() {
            self.repo.delete_refresh_token(&token_hash).await?;
            return Err(AppError::Unauthorized);
        }

        Ok(record)
    }

    pub async fn refresh(&self, record: RefreshTokenRecord, principal: &Principal) -> Result<(String, String, String), AppError> {
        if !self.repo.mark_refresh_token_used(&record.token_hash).await? {
            self.revoke_family(&record).await?;
            return Err(AppError::Unauthorized);
        }
        self.issue_token_pair(principal, record.family_id, record.generation_id + 1).await
    }

    async fn revoke_family(&self, record: &RefreshTokenRecord) -> Result<(), AppError> {
        warn!(
            "Refresh token reuse for {} (family {}, generation {}); revoking family",
            record.subject_id, record.family_id, record.generation_id
        );
        self.repo.delete_refresh_family(&record.family_id).await
    }

    pub async fn logout(&self, raw_refresh_token: &str) -> Result<(), AppError> {
        self.repo.delete_refresh_token(&hash_token(raw_refresh_token)).await
    }

    /// Drops every refresh token of an account, ending its sessions at the next refresh.
    pub async fn revoke_all(&self, subject_id: &str) -> Result<(), AppError> {
        self.repo.delete_refresh_tokens_for(subject_id).await
    }

    async fn issue_token_pair(&self, principal: &Principal, family_id: String, generation_id: i32) -> Result<(String, String, String), AppError> {
        let csrf_token: String = rand::thread_rng().sample_iter(&Alphanumeric).take(32).map(char::from).collect();
        let now = Utc::now();
        let exp = (now + Duration::minutes(15)).timestamp() as usize;

        let claims = Claims {
            iss: self.config.auth_issuer.clone(),
            sub: principal.id.clone(),
            aud: ACCESS_TOKEN_AUDIENCE.to_string(),
            exp,
            iat: now.timestamp() as usize,
            jti: Uuid::new_v4().to_string(),
            role: principal.role,
            name: principal.name.clone(),
            email: principal.email.clone(),
            csrf_token: csrf_token.clone(),
        };

        let access_token = encode(&Header::new(Algorithm::EdDSA), &claims, &self.encoding_key)
            .map_err(|e| {
                tracing::error!("JWT encoding failed: {}", e);
                AppError::Internal
            })?;

        let refresh_token: String = rand::thread_rng().sample_iter(&Alphanumeric).take(64).map(char::from).collect();

        let refresh_record = RefreshTokenRecord {
            token_hash: hash_token(&refresh_token),
            subject_id: principal.id.clone(),
            role: principal.role,
            family_id,
            generation_id,
            used_at: None,
            expires_at: now + Duration::days(7),
            created_at: now,
        };

        self.repo.create_refresh_token(&refresh_record).await?;
        Ok((access_token, refresh_token, csrf_token))
    }
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AppError::Internal)
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<(), AppError> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|_| AppError::Internal)?;

    Argon2::default().verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AppError::Unauthorized)
}

/// Trims and lower-cases an email, rejecting obviously malformed input.
pub fn normalize_email(email: &str) -> Result<String, AppError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(AppError::Validation("Invalid email address".into())),
    }
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < 6 {
        return Err(AppError::Validation("Password must be at least 6 characters".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_normalized() {
        assert_eq!(normalize_email("  Jane.Doe@Example.COM ").unwrap(), "jane.doe@example.com");
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("jane@localhost").is_err());
    }

    #[test]
    fn password_round_trips_through_argon2() {
        let hash = hash_password("s3cret!").unwrap();
        assert!(verify_password("s3cret!", &hash).is_ok());
        assert!(matches!(verify_password("wrong", &hash), Err(AppError::Unauthorized)));
    }

    #[test]
    fn token_hash_is_hex_sha256() {
        let hash = hash_token("abc");
        assert_eq!(hash, "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
    }
}
