use actix_web::{test, web, App};
use serde_json::json;
use std::sync::Arc;

use pixel_gallery::api::{self, AppState};
use pixel_gallery::store::Store;

const BASE_URL: &str = "http://localhost:3000";

fn bearer(sub: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer sub:{}", sub))
}

/// Helper macro to build the app over a fresh in-memory store
macro_rules! init_app {
    () => {{
        let store = Arc::new(Store::new(":memory:").unwrap());
        test::init_service(
            App::new()
                .app_data(web::Data::new(AppState::new(store, BASE_URL)))
                .configure(api::configure_routes),
        )
        .await
    }};
}

/// Helper macro to create a user for a subject and get its id
macro_rules! create_user {
    ($app:expr, $sub:expr) => {{
        let req = test::TestRequest::post()
            .uri("/users")
            .insert_header(bearer($sub))
            .set_json(json!({ "userinfo": { "name": $sub, "sub": $sub } }))
            .to_request();

        let resp: serde_json::Value = test::call_and_read_body_json(&$app, req).await;
        resp["U_ID"].as_i64().unwrap()
    }};
}

// ==================== Create User Tests ====================

#[actix_web::test]
async fn test_create_user_is_idempotent() {
    let app = init_app!();

    let req = test::TestRequest::post()
        .uri("/users")
        .insert_header(bearer("auth0|123"))
        .set_json(json!({
            "userinfo": {
                "name": "Ann",
                "email": "ann@example.com",
                "picture": "https://img.example/ann.png"
            }
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);

    let first: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(first["U_Auth_Sub"], "auth0|123");
    assert_eq!(first["U_Name"], "Ann");
    assert_eq!(first["U_Email"], "ann@example.com");
    assert_eq!(first["U_Profile"], "https://img.example/ann.png");
    assert_eq!(first["Is_Custom_Time"], false);
    assert!(first["Custom_Time_Alarm"].is_null());
    assert!(first["Today_Time"].is_string());
    assert_eq!(first["Time_Length"], 10);
    assert_eq!(first["Pixel_Amount"], 10);
    assert_eq!(first["U_Friends"], json!([]));
    assert_eq!(
        first["self"],
        format!("{}/users/{}", BASE_URL, first["U_ID"])
    );

    // Second create returns the stored record, ignoring the new profile
    let req = test::TestRequest::post()
        .uri("/users")
        .insert_header(bearer("auth0|123"))
        .set_json(json!({ "userinfo": { "name": "Someone Else" } }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let second: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(second["U_ID"], first["U_ID"]);
    assert_eq!(second["U_Name"], "Ann");
}

#[actix_web::test]
async fn test_create_user_requires_userinfo() {
    let app = init_app!();

    for body in [json!({ "profile": {} }), json!({}), json!({ "userinfo": "Ann" })] {
        let req = test::TestRequest::post()
            .uri("/users")
            .insert_header(bearer("user1"))
            .set_json(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "Error": "BadRequest" }));
    }

    // No body at all
    let req = test::TestRequest::post()
        .uri("/users")
        .insert_header(bearer("user1"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn test_create_user_rejects_malformed_json() {
    let app = init_app!();

    let req = test::TestRequest::post()
        .uri("/users")
        .insert_header(bearer("user1"))
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{\"userinfo\": ")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn test_create_user_sub_mismatch() {
    let app = init_app!();

    let req = test::TestRequest::post()
        .uri("/users")
        .insert_header(bearer("user1"))
        .set_json(json!({ "userinfo": { "sub": "user2" } }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["Error"], "You are not the user");
}

#[actix_web::test]
async fn test_create_user_credentials() {
    let app = init_app!();

    let req = test::TestRequest::post()
        .uri("/users")
        .set_json(json!({ "userinfo": {} }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "no auth header");
    assert_eq!(body["description"], "Authorization header is missing");

    let req = test::TestRequest::post()
        .uri("/users")
        .insert_header(("Authorization", "Bearer totally-wrong"))
        .set_json(json!({ "userinfo": {} }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "invalid_header");
}

// ==================== Read / Delete User Tests ====================

#[actix_web::test]
async fn test_get_user_self_only() {
    let app = init_app!();
    let user1 = create_user!(app, "user1");
    let _user2 = create_user!(app, "user2");

    let req = test::TestRequest::get()
        .uri(&format!("/users/{}", user1))
        .insert_header(bearer("user1"))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["U_ID"], user1);

    let req = test::TestRequest::get()
        .uri(&format!("/users/{}", user1))
        .insert_header(bearer("user2"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["Error"], "You are not the user");

    for uri in ["/users/999", "/users/abc"] {
        let req = test::TestRequest::get()
            .uri(uri)
            .insert_header(bearer("user1"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["Error"], "No user with this user_id exists");
    }
}

#[actix_web::test]
async fn test_get_user_rejects_body() {
    let app = init_app!();
    let user1 = create_user!(app, "user1");

    let req = test::TestRequest::get()
        .uri(&format!("/users/{}", user1))
        .insert_header(bearer("user1"))
        .set_json(json!({ "unexpected": true }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["Error"], "The request should not have any content json");
}

#[actix_web::test]
async fn test_delete_user_cascades() {
    let app = init_app!();
    let user1 = create_user!(app, "user1");
    let user2 = create_user!(app, "user2");

    // user2 befriends user1 and user1 owns an art
    let req = test::TestRequest::patch()
        .uri(&format!("/users/{}/users/{}", user2, user1))
        .insert_header(bearer("user2"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let req = test::TestRequest::post()
        .uri("/arts")
        .insert_header(bearer("user1"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);

    let req = test::TestRequest::delete()
        .uri(&format!("/users/{}", user1))
        .insert_header(bearer("user2"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);

    let req = test::TestRequest::delete()
        .uri(&format!("/users/{}", user1))
        .insert_header(bearer("user1"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 204);

    let req = test::TestRequest::get()
        .uri(&format!("/users/{}", user1))
        .insert_header(bearer("user1"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);

    let req = test::TestRequest::get().uri("/arts").to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["items"], json!([]));

    let req = test::TestRequest::get()
        .uri(&format!("/users/{}", user2))
        .insert_header(bearer("user2"))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["U_Friends"], json!([]));
}

#[actix_web::test]
async fn test_list_users_without_auth() {
    let app = init_app!();
    let user1 = create_user!(app, "user1");
    let user2 = create_user!(app, "user2");

    let req = test::TestRequest::get().uri("/users").to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;

    let users = resp.as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0]["U_ID"], user1);
    assert_eq!(users[1]["U_ID"], user2);
}

// ==================== Friend Tests ====================

#[actix_web::test]
async fn test_friendship_is_directional() {
    let app = init_app!();
    let user1 = create_user!(app, "user1");
    let user2 = create_user!(app, "user2");

    let req = test::TestRequest::patch()
        .uri(&format!("/users/{}/users/{}", user1, user2))
        .insert_header(bearer("user1"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(
        body["U_Friends"],
        json!([{
            "U_ID": user2,
            "U_Name": "user2",
            "self": format!("{}/users/{}", BASE_URL, user2)
        }])
    );

    let req = test::TestRequest::get()
        .uri(&format!("/users/{}", user2))
        .insert_header(bearer("user2"))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["U_Friends"], json!([]));
}

#[actix_web::test]
async fn test_friend_errors() {
    let app = init_app!();
    let user1 = create_user!(app, "user1");
    let user2 = create_user!(app, "user2");

    let cases: [(String, &str, u16, &str); 4] = [
        (format!("/users/{}/users/{}", user1, user1), "user1", 403, "A user cannot friend themselves"),
        (format!("/users/{}/users/{}", user1, 999), "user1", 404, "No user with this user_id exists"),
        (format!("/users/{}/users/{}", user2, user1), "user1", 403, "You are not the user"),
        (format!("/users/x/users/{}", user2), "user1", 404, "No user with this user_id exists"),
    ];

    for (uri, sub, status, message) in cases {
        let req = test::TestRequest::patch()
            .uri(&uri)
            .insert_header(bearer(sub))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), status, "{}", uri);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["Error"], message, "{}", uri);
    }

    let friend_uri = format!("/users/{}/users/{}", user1, user2);

    // Removing an edge that does not exist
    let req = test::TestRequest::delete()
        .uri(&friend_uri)
        .insert_header(bearer("user1"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["Error"], "Friend does not exist");

    // Adding twice
    let req = test::TestRequest::patch()
        .uri(&friend_uri)
        .insert_header(bearer("user1"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    let req = test::TestRequest::patch()
        .uri(&friend_uri)
        .insert_header(bearer("user1"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["Error"], "Friend already exists");

    // Then removing works once
    let req = test::TestRequest::delete()
        .uri(&friend_uri)
        .insert_header(bearer("user1"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["U_Friends"], json!([]));
}

// ==================== Scheduled Maintenance Tests ====================

#[actix_web::test]
async fn test_stamp_today_time() {
    let app = init_app!();
    let user1 = create_user!(app, "user1");

    let req = test::TestRequest::patch()
        .uri("/users")
        .set_json(json!({ "request_method": "automatically" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["ok"], true);
    let stamped = body["Today_Time"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri(&format!("/users/{}", user1))
        .insert_header(bearer("user1"))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(
        chrono::DateTime::parse_from_rfc3339(resp["Today_Time"].as_str().unwrap()).unwrap(),
        chrono::DateTime::parse_from_rfc3339(&stamped).unwrap()
    );
}

#[actix_web::test]
async fn test_stamp_today_time_requires_marker() {
    let app = init_app!();

    let req = test::TestRequest::patch()
        .uri("/users")
        .set_json(json!({ "request_method": "manually" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["Error"], "Should not be triggered manually");
}
