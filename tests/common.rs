#![allow(dead_code)]

use repair_booking::{
    api::router::create_router,
    state::AppState,
    config::Config,
    domain::ports::EmailService,
    error::AppError,
    infra::factory::{build_state, load_templates, seed_admin},
};
use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions}, Pool, Sqlite};
use std::sync::{Arc, Mutex};
use uuid::Uuid;
use axum::{
    body::Body,
    http::{Request, header},
    response::Response,
    Router,
};
use std::str::FromStr;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use tower::ServiceExt;
use serde_json::{json, Value};

pub const ADMIN_EMAIL: &str = "admin@repair.test";
pub const ADMIN_PASSWORD: &str = "admin-secret";
pub const DEFAULT_PASSWORD: &str = "secret123";

#[derive(Clone, Debug)]
pub struct SentEmail {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Keeps every message instead of delivering it.
#[derive(Default)]
pub struct RecordingEmailService {
    pub sent: Mutex<Vec<SentEmail>>,
}

#[async_trait]
impl EmailService for RecordingEmailService {
    async fn send(&self, recipient: &str, subject: &str, html_body: &str) -> Result<(), AppError> {
        self.sent.lock().unwrap().push(SentEmail {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: html_body.to_string(),
        });
        Ok(())
    }
}

impl RecordingEmailService {
    pub fn sent_to(&self, recipient: &str) -> Vec<SentEmail> {
        self.sent.lock().unwrap().iter().filter(|m| m.recipient == recipient).cloned().collect()
    }

    /// The six-digit code of the most recent OTP email to `recipient`.
    pub fn last_otp_for(&self, recipient: &str) -> String {
        let mail = self.sent_to(recipient)
            .into_iter()
            .rev()
            .find(|m| m.subject.starts_with("Code to"))
            .expect("No OTP email recorded");
        extract_code(&mail.body).expect("No code in OTP email")
    }
}

fn extract_code(body: &str) -> Option<String> {
    let chars: Vec<char> = body.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_ascii_digit() {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_digit() { i += 1; }
            if i - start == 6 {
                return Some(chars[start..i].iter().collect());
            }
        } else {
            i += 1;
        }
    }
    None
}

pub struct AuthHeaders {
    pub access_token: String,
    pub csrf_token: String,
    pub refresh_token: String,
    pub id: String,
}

pub struct TestApp {
    pub router: Router,
    pub pool: Pool<Sqlite>,
    pub db_filename: String,
    pub upload_dir: String,
    pub state: Arc<AppState>,
    pub emails: Arc<RecordingEmailService>,
}

impl TestApp {
    pub async fn new() -> Self {
        let db_filename = format!("test_{}.db", Uuid::new_v4());
        let db_url = format!("sqlite://{}?mode=rwc", db_filename);
        let upload_dir = format!("test_uploads_{}", Uuid::new_v4());
        std::fs::create_dir_all(&upload_dir).unwrap();

        let connection_options = SqliteConnectOptions::from_str(&db_url)
            .unwrap()
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(connection_options)
            .await
            .expect("Failed to connect to test db");

        sqlx::migrate!("./migrations/sqlite")
            .run(&pool)
            .await
            .expect("Failed to migrate test db");

        let priv_key_pem = include_str!("../tests/keys/test_private.pem");
        let pub_key_pem = include_str!("../tests/keys/test_public.pem");

        let config = Config {
            database_url: db_url.clone(),
            port: 0,
            mail_service_url: "http://localhost".to_string(),
            mail_service_token: "token".to_string(),
            jwt_secret_key: priv_key_pem.to_string(),
            jwt_public_key: pub_key_pem.to_string(),
            auth_issuer: "test-issuer".to_string(),
            frontend_url: "http://frontend.test".to_string(),
            upload_dir: upload_dir.clone(),
            otp_ttl_minutes: 10,
            otp_max_attempts: 3,
            admin_email: Some(ADMIN_EMAIL.to_string()),
            admin_password: Some(ADMIN_PASSWORD.to_string()),
        };

        let emails = Arc::new(RecordingEmailService::default());
        let state = build_state(config, pool.clone(), emails.clone(), Arc::new(load_templates()));
        seed_admin(&state).await.expect("Failed to seed admin");

        let state = Arc::new(state);
        let router = create_router(state.clone());

        Self {
            router,
            pool,
            db_filename,
            upload_dir,
            state,
            emails,
        }
    }

    pub async fn request(&self, method: &str, uri: &str, auth: Option<&AuthHeaders>, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            builder = builder
                .header(header::COOKIE, format!("access_token={}", auth.access_token))
                .header("X-CSRF-Token", &auth.csrf_token);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.router.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
    }

    pub async fn login(&self, path: &str, email: &str, password: &str) -> AuthHeaders {
        let response = self.request("POST", path, None, Some(json!({ "email": email, "password": password }))).await;

        if !response.status().is_success() {
            panic!("Login failed in test helper: status {}", response.status());
        }
        auth_from_response(response).await
    }

    pub async fn admin(&self) -> AuthHeaders {
        self.login("/api/v1/auth/admin/login", ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    pub async fn register_customer(&self, name: &str, email: &str) -> AuthHeaders {
        let response = self.request("POST", "/api/v1/auth/register", None, Some(json!({
            "name": name,
            "email": email,
            "phone": "555-0100",
            "password": DEFAULT_PASSWORD,
            "address": "1 Main Street"
        }))).await;

        if !response.status().is_success() {
            panic!("Registration failed in test helper: status {}", response.status());
        }
        auth_from_response(response).await
    }

    /// Creates a technician through the admin API and logs them in.
    pub async fn create_technician(&self, admin: &AuthHeaders, name: &str, email: &str) -> AuthHeaders {
        let response = self.request("POST", "/api/v1/admin/technicians", Some(admin), Some(json!({
            "name": name,
            "email": email,
            "phone": "555-0200",
            "password": DEFAULT_PASSWORD,
            "specialties": ["AC", "Fridge"]
        }))).await;
        assert!(response.status().is_success(), "technician creation failed: {}", response.status());

        self.login("/api/v1/auth/technician/login", email, DEFAULT_PASSWORD).await
    }

    pub async fn create_service(&self, admin: &AuthHeaders, name: &str, category: &str, price: f64) -> String {
        let response = self.request("POST", "/api/v1/admin/services", Some(admin), Some(json!({
            "name": name,
            "description": "Fix it",
            "category": category,
            "price": price
        }))).await;
        assert!(response.status().is_success(), "service creation failed: {}", response.status());
        parse_body(response).await["id"].as_str().unwrap().to_string()
    }

    pub async fn create_booking(&self, customer: &AuthHeaders, service_id: &str, date: &str, time: &str) -> String {
        let response = self.request("POST", "/api/v1/bookings", Some(customer), Some(json!({
            "service_id": service_id,
            "date": date,
            "time": time,
            "address": "1 Main Street",
            "notes": "Back door"
        }))).await;
        assert!(response.status().is_success(), "booking creation failed: {}", response.status());
        parse_body(response).await["id"].as_str().unwrap().to_string()
    }

    pub async fn assign(&self, admin: &AuthHeaders, booking_id: &str, technician_id: &str) -> Response {
        self.request(
            "PUT",
            &format!("/api/v1/admin/bookings/{}/assign", booking_id),
            Some(admin),
            Some(json!({ "technician_id": technician_id })),
        ).await
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_filename);
        let _ = std::fs::remove_file(format!("{}-wal", self.db_filename));
        let _ = std::fs::remove_file(format!("{}-shm", self.db_filename));
        let _ = std::fs::remove_dir_all(&self.upload_dir);
    }
}

pub async fn parse_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn tomorrow() -> String {
    (Utc::now().date_naive() + Duration::days(1)).format("%Y-%m-%d").to_string()
}

pub fn days_from_now(days: i64) -> String {
    (Utc::now().date_naive() + Duration::days(days)).format("%Y-%m-%d").to_string()
}

fn cookie_value(cookies: &[String], name: &str) -> String {
    let prefix = format!("{}=", name);
    let cookie = cookies.iter()
        .find(|c| c.starts_with(&prefix))
        .unwrap_or_else(|| panic!("No {} cookie returned", name));
    let rest = &cookie[prefix.len()..];
    rest.split(';').next().unwrap().to_string()
}

async fn auth_from_response(response: Response) -> AuthHeaders {
    let cookies: Vec<String> = response.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|h| h.to_str().unwrap().to_string())
        .collect();

    let access_token = cookie_value(&cookies, "access_token");
    let refresh_token = cookie_value(&cookies, "refresh_token");

    let body_json = parse_body(response).await;
    let csrf_token = body_json["csrf_token"].as_str().expect("No csrf_token in body").to_string();
    let id = body_json["user"]["id"].as_str().expect("No user id in body").to_string();

    AuthHeaders {
        access_token,
        csrf_token,
        refresh_token,
        id,
    }
}
