use actix_web::cookie::Cookie;
use actix_web::middleware::Logger;
use actix_web::{test, web, App};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

use taskhive::auth::{SessionGate, TokenCodec, SESSION_COOKIE};
use taskhive::routes;
use taskhive::store::{
    CredentialStore, MemoryCredentialStore, MemoryTaskStore, TaskStore,
};

const TEST_SECRET: &str = "integration-test-secret";

struct TestState {
    credential_data: web::Data<dyn CredentialStore>,
    task_data: web::Data<dyn TaskStore>,
    codec_data: web::Data<TokenCodec>,
    codec: TokenCodec,
}

fn test_state() -> TestState {
    let credential_store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
    let task_store: Arc<dyn TaskStore> = Arc::new(MemoryTaskStore::new());
    let codec = TokenCodec::new(TEST_SECRET, 24);
    TestState {
        credential_data: web::Data::from(credential_store),
        task_data: web::Data::from(task_store),
        codec_data: web::Data::new(codec.clone()),
        codec,
    }
}

macro_rules! test_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data($state.credential_data.clone())
                .app_data($state.task_data.clone())
                .app_data($state.codec_data.clone())
                .wrap(Logger::default())
                .service(routes::health::health)
                .service(
                    web::scope("/api")
                        .wrap(SessionGate::new($state.codec.clone()))
                        .configure(routes::config),
                ),
        )
        .await
    };
}

fn session_cookie_from<B>(resp: &actix_web::dev::ServiceResponse<B>) -> Option<Cookie<'static>> {
    resp.response()
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE)
        .map(|c| c.into_owned())
}

#[actix_rt::test]
async fn test_register_then_profile_with_cookie() {
    let state = test_state();
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "username": "alice",
            "email": "alice@x.com",
            "password": "secret1"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);

    let cookie = session_cookie_from(&resp).expect("registration should set the session cookie");
    // The cookie carries a verifiable token naming the new user.
    let claims = state.codec.verify(cookie.value()).unwrap();

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["username"], "alice");
    assert_eq!(body["email"], "alice@x.com");
    assert_eq!(body["id"].as_i64().unwrap() as i32, claims.sub);
    assert!(body.get("password").is_none());
    assert!(body.get("password_hash").is_none());

    // The cookie alone resolves the profile.
    let req = test::TestRequest::get()
        .uri("/api/auth/profile")
        .cookie(cookie)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let profile: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(profile["username"], "alice");
    assert_eq!(profile["email"], "alice@x.com");
}

#[actix_rt::test]
async fn test_duplicate_registration_gets_conflict_and_no_cookie() {
    let state = test_state();
    let app = test_app!(state);

    let payload = json!({
        "username": "alice",
        "email": "alice@x.com",
        "password": "secret1"
    });

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(&payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(&payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 409);
    assert!(
        session_cookie_from(&resp).is_none(),
        "a failed registration must not establish a session"
    );
}

#[actix_rt::test]
async fn test_login_failures_are_indistinguishable() {
    let state = test_state();
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "username": "alice",
            "email": "alice@x.com",
            "password": "secret1"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);

    // Wrong password for a registered email.
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "alice@x.com", "password": "wrongpw" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let wrong_pw_status = resp.status();
    let wrong_pw_body = test::read_body(resp).await;

    // Unregistered email.
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "nobody@x.com", "password": "wrongpw" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let unknown_status = resp.status();
    let unknown_body = test::read_body(resp).await;

    assert_eq!(wrong_pw_status, 401);
    assert_eq!(wrong_pw_status, unknown_status);
    assert_eq!(
        wrong_pw_body, unknown_body,
        "login failures must not reveal whether the email is registered"
    );

    // The correct password still works and the cookie decodes to the user.
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "alice@x.com", "password": "secret1" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let cookie = session_cookie_from(&resp).expect("login should set the session cookie");
    let body: serde_json::Value = test::read_body_json(resp).await;
    let claims = state.codec.verify(cookie.value()).unwrap();
    assert_eq!(body["id"].as_i64().unwrap() as i32, claims.sub);
}

#[actix_rt::test]
async fn test_protected_routes_reject_missing_invalid_and_expired_tokens() {
    let state = test_state();
    let app = test_app!(state);

    let cases: Vec<(&str, Option<Cookie<'static>>)> = vec![
        ("missing token", None),
        (
            "garbage token",
            Some(Cookie::new(SESSION_COOKIE, "not-a-jwt")),
        ),
        (
            // Correctly signed but already past its expiry.
            "expired token",
            Some(Cookie::new(
                SESSION_COOKIE,
                TokenCodec::new(TEST_SECRET, -1).issue(1).unwrap(),
            )),
        ),
        (
            // Valid shape, wrong signing key.
            "foreign signature",
            Some(Cookie::new(
                SESSION_COOKIE,
                TokenCodec::new("some-other-secret", 24).issue(1).unwrap(),
            )),
        ),
    ];

    for (description, cookie) in cases {
        let mut req = test::TestRequest::get().uri("/api/auth/profile");
        if let Some(cookie) = cookie {
            req = req.cookie(cookie);
        }

        let status = match test::try_call_service(&app, req.to_request()).await {
            Ok(resp) => resp.status(),
            Err(err) => err.error_response().status(),
        };
        assert_eq!(status, 401, "case: {}", description);
    }
}

#[actix_rt::test]
async fn test_change_password_scenario() {
    let state = test_state();
    let app = test_app!(state);

    // register ("alice", "alice@x.com", "secret1")
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "username": "alice",
            "email": "alice@x.com",
            "password": "secret1"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);

    // login with the wrong password fails generically
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "alice@x.com", "password": "wrong1" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);

    // login with the right password succeeds with the same identity
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "alice@x.com", "password": "secret1" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let cookie = session_cookie_from(&resp).unwrap();
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["username"], "alice");
    assert_eq!(body["email"], "alice@x.com");

    // change the password using the session cookie
    let req = test::TestRequest::put()
        .uri("/api/auth/change-password")
        .cookie(cookie.clone())
        .set_json(json!({ "old_password": "secret1", "new_password": "newpass1" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    // the old password no longer logs in
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "alice@x.com", "password": "secret1" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);

    // the new one does
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "alice@x.com", "password": "newpass1" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
}

#[actix_rt::test]
async fn test_change_password_with_wrong_old_password() {
    let state = test_state();
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "username": "alice",
            "email": "alice@x.com",
            "password": "secret1"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let cookie = session_cookie_from(&resp).unwrap();

    let req = test::TestRequest::put()
        .uri("/api/auth/change-password")
        .cookie(cookie)
        .set_json(json!({ "old_password": "not-it", "new_password": "newpass1" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    // Distinguishable from a session failure: 400, not 401.
    assert_eq!(resp.status(), 400);
}

#[actix_rt::test]
async fn test_update_profile_conflict_and_refresh() {
    let state = test_state();
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "username": "alice",
            "email": "alice@x.com",
            "password": "secret1"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let alice_cookie = session_cookie_from(&resp).unwrap();

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "username": "bob",
            "email": "bob@x.com",
            "password": "secret2"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);

    // Taking bob's email is a conflict.
    let req = test::TestRequest::put()
        .uri("/api/auth/profile")
        .cookie(alice_cookie.clone())
        .set_json(json!({ "username": "alice", "email": "bob@x.com" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 409);

    // A fresh email goes through and the profile reflects it.
    let req = test::TestRequest::put()
        .uri("/api/auth/profile")
        .cookie(alice_cookie.clone())
        .set_json(json!({ "username": "alice2", "email": "alice2@x.com" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let req = test::TestRequest::get()
        .uri("/api/auth/profile")
        .cookie(alice_cookie)
        .to_request();
    let resp = test::call_service(&app, req).await;
    let profile: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(profile["username"], "alice2");
    assert_eq!(profile["email"], "alice2@x.com");
}

#[actix_rt::test]
async fn test_logout_clears_cookie_and_is_idempotent() {
    let state = test_state();
    let app = test_app!(state);

    // Works with no session at all.
    let req = test::TestRequest::get().uri("/api/auth/logout").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let cleared = session_cookie_from(&resp).expect("logout should send a removal cookie");
    assert_eq!(cleared.value(), "");

    // And with one.
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "username": "alice",
            "email": "alice@x.com",
            "password": "secret1"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let cookie = session_cookie_from(&resp).unwrap();

    let req = test::TestRequest::get()
        .uri("/api/auth/logout")
        .cookie(cookie)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let cleared = session_cookie_from(&resp).unwrap();
    assert_eq!(cleared.value(), "");
}

#[actix_rt::test]
async fn test_tasks_are_scoped_to_the_session_user() {
    let state = test_state();
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "username": "alice",
            "email": "alice@x.com",
            "password": "secret1"
        }))
        .to_request();
    let alice_cookie = session_cookie_from(&test::call_service(&app, req).await).unwrap();

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "username": "bob",
            "email": "bob@x.com",
            "password": "secret2"
        }))
        .to_request();
    let bob_cookie = session_cookie_from(&test::call_service(&app, req).await).unwrap();

    // Alice creates a task.
    let req = test::TestRequest::post()
        .uri("/api/tasks")
        .cookie(alice_cookie.clone())
        .set_json(json!({ "title": "water the plants" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let task: serde_json::Value = test::read_body_json(resp).await;
    let task_id = task["id"].as_str().unwrap().to_string();

    // She sees it; bob does not.
    let req = test::TestRequest::get()
        .uri("/api/tasks")
        .cookie(alice_cookie.clone())
        .to_request();
    let alice_tasks: serde_json::Value =
        test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(alice_tasks.as_array().unwrap().len(), 1);

    let req = test::TestRequest::get()
        .uri("/api/tasks")
        .cookie(bob_cookie.clone())
        .to_request();
    let bob_tasks: serde_json::Value =
        test::read_body_json(test::call_service(&app, req).await).await;
    assert!(bob_tasks.as_array().unwrap().is_empty());

    // Bob cannot read or delete it; for him it does not exist.
    let req = test::TestRequest::get()
        .uri(&format!("/api/tasks/{}", task_id))
        .cookie(bob_cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/tasks/{}", task_id))
        .cookie(bob_cookie)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/tasks/{}", task_id))
        .cookie(alice_cookie)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 204);
}

#[actix_rt::test]
async fn test_bearer_header_works_as_fallback_transport() {
    let state = test_state();
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "username": "alice",
            "email": "alice@x.com",
            "password": "secret1"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let token = session_cookie_from(&resp).unwrap().value().to_string();

    let req = test::TestRequest::get()
        .uri("/api/auth/profile")
        .append_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let profile: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(profile["username"], "alice");
}
