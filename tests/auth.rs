mod common;

use actix_web::http::{header, StatusCode};
use actix_web::test;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

use todo_api::build_app;
use todo_api::config::Environment;
use todo_api::error::ErrorBody;
use todo_api::models::{User, UserRole};
use todo_api::repository::{InMemoryTaskRepository, InMemoryUserRepository};

#[actix_rt::test]
async fn test_register_and_login_flow() {
    let app = test::init_service(build_app(&common::context(Environment::Production))).await;

    let register_payload = json!({
        "username": "integration_user",
        "email": "integration@example.com",
        "password": common::PASSWORD
    });
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(&register_payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    let status = resp.status();
    let body_bytes = test::read_body(resp).await;
    assert_eq!(
        status,
        StatusCode::CREATED,
        "Registration failed. Body: {:?}",
        String::from_utf8_lossy(&body_bytes)
    );
    let registered: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
    assert!(registered["token"].is_string());
    assert!(registered["userId"].is_number());

    // Registering the same email again is a conflict.
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(&register_payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: ErrorBody = test::read_body_json(resp).await;
    assert_eq!(body.message, "Email already registered");

    let session = common::login(&app, "integration@example.com").await;
    assert_eq!(session.user_id, registered["userId"].as_i64().unwrap() as i32);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "integration@example.com", "password": "WrongPassword" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: ErrorBody = test::read_body_json(resp).await;
    assert_eq!(body, ErrorBody::new("Invalid credentials"));
}

#[actix_rt::test]
async fn test_invalid_registration_lists_fields() {
    let app = test::init_service(build_app(&common::context(Environment::Production))).await;

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({ "username": "x!", "email": "not-an-email", "password": "123" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: ErrorBody = test::read_body_json(resp).await;
    let errors = body.errors.expect("field errors");
    for field in ["username", "email", "password"] {
        assert!(errors.get(field).is_some(), "missing {}", field);
    }
}

#[actix_rt::test]
async fn test_user_listing_requires_admin() {
    let users = Arc::new(InMemoryUserRepository::new());
    let context = common::context_with(
        Arc::new(InMemoryTaskRepository::new()),
        users.clone(),
        Environment::Production,
    );
    common::seed_admin(users.as_ref(), "admin@example.com").await;
    let app = test::init_service(build_app(&context)).await;

    let req = test::TestRequest::get().uri("/api/users").to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );

    let regular = common::register(&app, "regular", "regular@example.com").await;
    let req = test::TestRequest::get()
        .uri("/api/users")
        .insert_header(common::bearer(&regular.token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: ErrorBody = test::read_body_json(resp).await;
    assert_eq!(body.message, "You do not have permission to perform this action");

    let admin = common::login(&app, "admin@example.com").await;
    let req = test::TestRequest::get()
        .uri("/api/users")
        .insert_header(common::bearer(&admin.token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let listed: Vec<User> = test::read_body_json(resp).await;
    assert_eq!(listed.len(), 2);
    assert!(listed
        .iter()
        .any(|user| user.email == "admin@example.com" && user.role == UserRole::Admin));
}

#[actix_rt::test]
async fn test_encoded_admin_path_is_forbidden() {
    let app = test::init_service(build_app(&common::context(Environment::Production))).await;
    let regular = common::register(&app, "sneaky", "sneaky@example.com").await;

    for uri in ["/api/%75sers", "/api/%75%73%65%72%73", "/api/users/"] {
        let req = test::TestRequest::get()
            .uri(uri)
            .insert_header(common::bearer(&regular.token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{}", uri);
    }
}

#[actix_rt::test]
async fn test_stale_token_does_not_block_anonymous_routes() {
    let app = test::init_service(build_app(&common::context(Environment::Production))).await;
    let stale = (header::AUTHORIZATION, "Bearer expired.or.garbage");

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .insert_header(stale.clone())
        .set_json(json!({
            "username": "returning",
            "email": "returning@example.com",
            "password": common::PASSWORD
        }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .insert_header(stale.clone())
        .set_json(json!({ "email": "returning@example.com", "password": common::PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let session: serde_json::Value = test::read_body_json(resp).await;
    assert!(session["token"].is_string());

    let req = test::TestRequest::get()
        .uri("/api/tasks")
        .insert_header(stale.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: ErrorBody = test::read_body_json(resp).await;
    assert_eq!(body.message, "Invalid token");
}
