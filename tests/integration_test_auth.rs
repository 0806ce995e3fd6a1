mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use common::{parse_body, TestApp, DEFAULT_PASSWORD};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn test_register_normalizes_email_and_returns_profile() {
    let app = TestApp::new().await;

    let res = app.request("POST", "/api/v1/auth/register", None, Some(json!({
        "name": "Alice",
        "email": "  Alice@Example.COM ",
        "phone": "555-0101",
        "password": DEFAULT_PASSWORD
    }))).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = parse_body(res).await;
    assert_eq!(body["user"]["email"], "alice@example.com");
    assert_eq!(body["user"]["role"], "user");
    assert!(body["csrf_token"].as_str().unwrap().len() == 32);

    let auth = app.login("/api/v1/auth/login", "alice@example.com", DEFAULT_PASSWORD).await;
    let me = app.request("GET", "/api/v1/auth/me", Some(&auth), None).await;
    assert_eq!(me.status(), StatusCode::OK);
    let me = parse_body(me).await;
    assert_eq!(me["role"], "user");
    assert_eq!(me["name"], "Alice");
    assert!(me.get("password_hash").is_none());
}

#[tokio::test]
async fn test_register_validation_and_duplicates() {
    let app = TestApp::new().await;
    app.register_customer("Bob", "bob@example.com").await;

    let dup = app.request("POST", "/api/v1/auth/register", None, Some(json!({
        "name": "Bob Again", "email": "BOB@example.com", "phone": "1", "password": DEFAULT_PASSWORD
    }))).await;
    assert_eq!(dup.status(), StatusCode::CONFLICT);

    let short = app.request("POST", "/api/v1/auth/register", None, Some(json!({
        "name": "Carl", "email": "carl@example.com", "phone": "1", "password": "12345"
    }))).await;
    assert_eq!(short.status(), StatusCode::BAD_REQUEST);

    let bad_email = app.request("POST", "/api/v1/auth/register", None, Some(json!({
        "name": "Dan", "email": "not-an-email", "phone": "1", "password": DEFAULT_PASSWORD
    }))).await;
    assert_eq!(bad_email.status(), StatusCode::BAD_REQUEST);
    assert!(parse_body(bad_email).await["error"].as_str().unwrap().contains("email"));
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let app = TestApp::new().await;
    app.register_customer("Eve", "eve@example.com").await;

    let wrong = app.request("POST", "/api/v1/auth/login", None, Some(json!({
        "email": "eve@example.com", "password": "wrong-password"
    }))).await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let unknown = app.request("POST", "/api/v1/auth/login", None, Some(json!({
        "email": "nobody@example.com", "password": DEFAULT_PASSWORD
    }))).await;
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);

    // Customer credentials do not open the technician or admin doors
    let as_tech = app.request("POST", "/api/v1/auth/technician/login", None, Some(json!({
        "email": "eve@example.com", "password": DEFAULT_PASSWORD
    }))).await;
    assert_eq!(as_tech.status(), StatusCode::UNAUTHORIZED);

    let as_admin = app.request("POST", "/api/v1/auth/admin/login", None, Some(json!({
        "email": "eve@example.com", "password": DEFAULT_PASSWORD
    }))).await;
    assert_eq!(as_admin.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_email_uniqueness_is_per_role() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    app.register_customer("Frank", "frank@example.com").await;

    let tech = app.create_technician(&admin, "Frank Tech", "frank@example.com").await;
    assert!(!tech.id.is_empty());

    let dup_tech = app.request("POST", "/api/v1/admin/technicians", Some(&admin), Some(json!({
        "name": "Other", "email": "frank@example.com", "phone": "1", "password": DEFAULT_PASSWORD
    }))).await;
    assert_eq!(dup_tech.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_deactivated_accounts_are_locked_out() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let customer = app.register_customer("Gina", "gina@example.com").await;
    let tech = app.create_technician(&admin, "Hank", "hank@example.com").await;

    let res = app.request("PUT", &format!("/api/v1/admin/users/{}/toggle-active", customer.id), Some(&admin), None).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(parse_body(res).await["is_active"], false);

    let login = app.request("POST", "/api/v1/auth/login", None, Some(json!({
        "email": "gina@example.com", "password": DEFAULT_PASSWORD
    }))).await;
    assert_eq!(login.status(), StatusCode::FORBIDDEN);
    assert_eq!(parse_body(login).await["error"], "Account deactivated");

    // Existing sessions cannot be refreshed
    let refresh = app.router.clone().oneshot(
        Request::builder().method("POST").uri("/api/v1/auth/refresh")
            .header(header::COOKIE, format!("refresh_token={}", customer.refresh_token))
            .body(Body::empty()).unwrap()
    ).await.unwrap();
    assert_eq!(refresh.status(), StatusCode::UNAUTHORIZED);

    app.request("PUT", &format!("/api/v1/admin/technicians/{}/toggle-active", tech.id), Some(&admin), None).await;
    let tech_login = app.request("POST", "/api/v1/auth/technician/login", None, Some(json!({
        "email": "hank@example.com", "password": DEFAULT_PASSWORD
    }))).await;
    assert_eq!(tech_login.status(), StatusCode::FORBIDDEN);

    // Reactivation restores access
    app.request("PUT", &format!("/api/v1/admin/users/{}/toggle-active", customer.id), Some(&admin), None).await;
    app.login("/api/v1/auth/login", "gina@example.com", DEFAULT_PASSWORD).await;
}

#[tokio::test]
async fn test_refresh_rotates_and_logout_revokes() {
    let app = TestApp::new().await;
    let customer = app.register_customer("Ivy", "ivy@example.com").await;

    let refresh = |token: String| {
        app.router.clone().oneshot(
            Request::builder().method("POST").uri("/api/v1/auth/refresh")
                .header(header::COOKIE, format!("refresh_token={}", token))
                .body(Body::empty()).unwrap()
        )
    };

    let res = refresh(customer.refresh_token.clone()).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let new_refresh = res.headers().get_all(header::SET_COOKIE).iter()
        .map(|h| h.to_str().unwrap().to_string())
        .find(|c| c.starts_with("refresh_token="))
        .unwrap();
    let new_refresh = new_refresh["refresh_token=".len()..].split(';').next().unwrap().to_string();
    assert_ne!(new_refresh, customer.refresh_token);
    assert_eq!(parse_body(res).await["user"]["email"], "ivy@example.com");

    // The rotated-out token is gone
    let replay = refresh(customer.refresh_token.clone()).await.unwrap();
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);

    let logout = app.router.clone().oneshot(
        Request::builder().method("POST").uri("/api/v1/auth/logout")
            .header(header::COOKIE, format!("refresh_token={}", new_refresh))
            .body(Body::empty()).unwrap()
    ).await.unwrap();
    assert_eq!(logout.status(), StatusCode::OK);

    let after_logout = refresh(new_refresh).await.unwrap();
    assert_eq!(after_logout.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_csrf_and_role_guards() {
    let app = TestApp::new().await;
    let customer = app.register_customer("Jack", "jack@example.com").await;

    let no_cookie = app.request("GET", "/api/v1/bookings", None, None).await;
    assert_eq!(no_cookie.status(), StatusCode::UNAUTHORIZED);

    let garbage = app.router.clone().oneshot(
        Request::builder().method("GET").uri("/api/v1/bookings")
            .header(header::COOKIE, "access_token=not-a-jwt")
            .body(Body::empty()).unwrap()
    ).await.unwrap();
    assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);

    // Mutations without the CSRF header are refused
    let no_csrf = app.router.clone().oneshot(
        Request::builder().method("PUT").uri("/api/v1/auth/me")
            .header(header::COOKIE, format!("access_token={}", customer.access_token))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({"name": "Mallory"}).to_string())).unwrap()
    ).await.unwrap();
    assert_eq!(no_csrf.status(), StatusCode::FORBIDDEN);

    let wrong_csrf = app.router.clone().oneshot(
        Request::builder().method("PUT").uri("/api/v1/auth/me")
            .header(header::COOKIE, format!("access_token={}", customer.access_token))
            .header("X-CSRF-Token", "forged")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({"name": "Mallory"}).to_string())).unwrap()
    ).await.unwrap();
    assert_eq!(wrong_csrf.status(), StatusCode::FORBIDDEN);

    let admin_only = app.request("GET", "/api/v1/admin/dashboard", Some(&customer), None).await;
    assert_eq!(admin_only.status(), StatusCode::FORBIDDEN);

    let tech_only = app.request("GET", "/api/v1/technician/jobs", Some(&customer), None).await;
    assert_eq!(tech_only.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_customer_updates_profile() {
    let app = TestApp::new().await;
    let customer = app.register_customer("Kate", "kate@example.com").await;

    let res = app.request("PUT", "/api/v1/auth/me", Some(&customer), Some(json!({
        "name": "Kate Smith", "phone": "555-9999", "address": "  "
    }))).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = parse_body(res).await;
    assert_eq!(body["name"], "Kate Smith");
    assert_eq!(body["phone"], "555-9999");
    assert!(body["address"].is_null());

    let admin = app.admin().await;
    let admin_update = app.request("PUT", "/api/v1/auth/me", Some(&admin), Some(json!({"name": "Root"}))).await;
    assert_eq!(admin_update.status(), StatusCode::FORBIDDEN);

    let admin_me = parse_body(app.request("GET", "/api/v1/auth/me", Some(&admin), None).await).await;
    assert_eq!(admin_me["role"], "admin");
    assert_eq!(admin_me["email"], "admin@repair.test");
}

#[tokio::test]
async fn test_reused_refresh_token_revokes_its_family() {
    let app = TestApp::new().await;
    let customer = app.register_customer("Kim", "kim@example.com").await;
    let other_session = app.login("/api/v1/auth/login", "kim@example.com", DEFAULT_PASSWORD).await;

    let refresh = |token: String| {
        app.router.clone().oneshot(
            Request::builder().method("POST").uri("/api/v1/auth/refresh")
                .header(header::COOKIE, format!("refresh_token={}", token))
                .body(Body::empty()).unwrap()
        )
    };

    let res = refresh(customer.refresh_token.clone()).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let rotated = res.headers().get_all(header::SET_COOKIE).iter()
        .map(|h| h.to_str().unwrap().to_string())
        .find(|c| c.starts_with("refresh_token="))
        .unwrap();
    let rotated = rotated["refresh_token=".len()..].split(';').next().unwrap().to_string();

    // Someone replays the rotated-out token
    let replay = refresh(customer.refresh_token.clone()).await.unwrap();
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);

    // The legitimate successor is revoked with it
    let successor = refresh(rotated).await.unwrap();
    assert_eq!(successor.status(), StatusCode::UNAUTHORIZED);

    // Sessions from other logins are a different family
    let res = refresh(other_session.refresh_token.clone()).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}
