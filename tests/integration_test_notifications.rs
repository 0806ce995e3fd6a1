mod common;

use axum::http::{header, StatusCode};
use common::{parse_body, tomorrow, TestApp};
use std::time::Duration;
use tokio_stream::StreamExt;

#[tokio::test]
async fn test_notifications_follow_the_booking() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let customer = app.register_customer("Alice", "alice@example.com").await;
    let tech = app.create_technician(&admin, "Tom", "tom@example.com").await;
    let service_id = app.create_service(&admin, "AC Repair", "Appliances", 100.0).await;

    let booking_id = app.create_booking(&customer, &service_id, &tomorrow(), "09:00").await;

    let admin_feed = parse_body(app.request("GET", "/api/v1/notifications", Some(&admin), None).await).await;
    let admin_feed = admin_feed.as_array().unwrap();
    assert_eq!(admin_feed.len(), 1);
    assert_eq!(admin_feed[0]["title"], "New booking");
    assert_eq!(admin_feed[0]["booking_id"], booking_id.as_str());

    app.assign(&admin, &booking_id, &tech.id).await;
    app.request("PUT", &format!("/api/v1/technician/jobs/{}/accept", booking_id), Some(&tech), None).await;

    let tech_feed = parse_body(app.request("GET", "/api/v1/notifications", Some(&tech), None).await).await;
    let tech_feed = tech_feed.as_array().unwrap();
    // The technician's own acceptance is not echoed back
    assert_eq!(tech_feed.len(), 1);
    assert_eq!(tech_feed[0]["title"], "New job assigned");

    let feed = parse_body(app.request("GET", "/api/v1/notifications", Some(&customer), None).await).await;
    let feed = feed.as_array().unwrap();
    assert_eq!(feed.len(), 2);
    assert_eq!(feed[0]["title"], "Booking status updated");
    assert!(feed[0]["message"].as_str().unwrap().contains("Accepted"));
    assert_eq!(feed[1]["title"], "Technician assigned");

    let admin_feed = parse_body(app.request("GET", "/api/v1/notifications", Some(&admin), None).await).await;
    assert_eq!(admin_feed.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_mark_read() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let customer = app.register_customer("Alice", "alice@example.com").await;
    let other = app.register_customer("Bob", "bob@example.com").await;
    let tech = app.create_technician(&admin, "Tom", "tom@example.com").await;
    let service_id = app.create_service(&admin, "AC Repair", "Appliances", 100.0).await;

    let booking_id = app.create_booking(&customer, &service_id, &tomorrow(), "09:00").await;
    app.assign(&admin, &booking_id, &tech.id).await;
    app.request("PUT", &format!("/api/v1/technician/jobs/{}/accept", booking_id), Some(&tech), None).await;

    let feed = parse_body(app.request("GET", "/api/v1/notifications", Some(&customer), None).await).await;
    let first_id = feed[0]["id"].as_str().unwrap().to_string();

    // Someone else's notification looks missing
    let res = app.request("PUT", &format!("/api/v1/notifications/{}/read", first_id), Some(&other), None).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let res = app.request("PUT", &format!("/api/v1/notifications/{}/read", first_id), Some(&tech), None).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app.request("PUT", &format!("/api/v1/notifications/{}/read", first_id), Some(&customer), None).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let unread = parse_body(app.request("GET", "/api/v1/notifications?unread_only=true", Some(&customer), None).await).await;
    let unread = unread.as_array().unwrap();
    assert_eq!(unread.len(), 1);
    assert_ne!(unread[0]["id"], first_id.as_str());

    let res = app.request("PUT", "/api/v1/notifications/read-all", Some(&customer), None).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(parse_body(res).await["updated"], 1);

    let unread = parse_body(app.request("GET", "/api/v1/notifications?unread_only=true", Some(&customer), None).await).await;
    assert!(unread.as_array().unwrap().is_empty());

    let all = parse_body(app.request("GET", "/api/v1/notifications", Some(&customer), None).await).await;
    assert_eq!(all.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_stream_delivers_live_notifications() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let customer = app.register_customer("Alice", "alice@example.com").await;
    let tech = app.create_technician(&admin, "Tom", "tom@example.com").await;
    let service_id = app.create_service(&admin, "AC Repair", "Appliances", 100.0).await;
    let booking_id = app.create_booking(&customer, &service_id, &tomorrow(), "09:00").await;

    let res = app.request("GET", "/api/v1/notifications/stream", Some(&customer), None).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers()[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/event-stream"));
    let mut stream = res.into_body().into_data_stream();

    app.assign(&admin, &booking_id, &tech.id).await;

    let received = tokio::time::timeout(Duration::from_secs(5), async {
        let mut buf = String::new();
        while let Some(chunk) = stream.next().await {
            buf.push_str(&String::from_utf8_lossy(&chunk.unwrap()));
            if buf.contains("event: notification") && buf.contains("\n\n") && buf.contains("Technician assigned") {
                break;
            }
        }
        buf
    }).await.expect("No notification arrived on the stream");

    assert!(received.contains("Technician assigned"));
    assert!(!received.contains("New job assigned"));

    let unauthenticated = app.request("GET", "/api/v1/notifications/stream", None, None).await;
    assert_eq!(unauthenticated.status(), StatusCode::UNAUTHORIZED);
}
