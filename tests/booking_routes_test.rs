mod common;

use actix_web::{http::header, test};
use chrono::{Duration, Utc};
use serde_json::json;
use serial_test::serial;

use common::TestApp;
use tour_booking_api::models::profile::Role;

#[actix_rt::test]
#[serial]
async fn test_bookings_require_auth() {
    let test_app = TestApp::new().await;
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::get().uri("/api/bookings").to_request();
    match test::try_call_service(&app, req).await {
        Ok(resp) => assert_eq!(resp.status(), 401),
        Err(err) => assert_eq!(err.error_response().status(), 401),
    }
}

#[actix_rt::test]
#[serial]
async fn test_create_booking_rejects_zero_people() {
    let test_app = TestApp::new().await;
    let app = test::init_service(test_app.create_app()).await;

    let tomorrow = (Utc::now() + Duration::days(1)).date_naive();
    let req = test::TestRequest::post()
        .uri("/api/bookings")
        .insert_header((header::AUTHORIZATION, test_app.bearer(Role::User)))
        .set_json(json!({
            "tour_id": "652f1c2ab1e3f4a5b6c7d8e9",
            "booking_date": tomorrow,
            "number_of_people": "0"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_rt::test]
#[serial]
async fn test_create_booking_rejects_past_date() {
    let test_app = TestApp::new().await;
    let app = test::init_service(test_app.create_app()).await;

    let last_week = (Utc::now() - Duration::days(7)).date_naive();
    let req = test::TestRequest::post()
        .uri("/api/bookings")
        .insert_header((header::AUTHORIZATION, test_app.bearer(Role::User)))
        .set_json(json!({
            "tour_id": "652f1c2ab1e3f4a5b6c7d8e9",
            "booking_date": last_week,
            "number_of_people": 2
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_rt::test]
#[serial]
async fn test_create_booking_rejects_bad_tour_id() {
    let test_app = TestApp::new().await;
    let app = test::init_service(test_app.create_app()).await;

    let tomorrow = (Utc::now() + Duration::days(1)).date_naive();
    let req = test::TestRequest::post()
        .uri("/api/bookings")
        .insert_header((header::AUTHORIZATION, test_app.bearer(Role::User)))
        .set_json(json!({
            "tour_id": "tour-1",
            "booking_date": tomorrow,
            "number_of_people": 2
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_rt::test]
#[serial]
async fn test_chat_rejects_empty_message() {
    let test_app = TestApp::new().await;
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/chat/messages")
        .insert_header((header::AUTHORIZATION, test_app.bearer(Role::User)))
        .set_json(json!({ "message": "   " }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}
